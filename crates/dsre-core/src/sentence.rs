//! Annotated sentence model
//!
//! Sentences arrive pre-parsed (tokens, NER tags, normalized ids and a
//! dependency parse). This module only reads that structure: token lookup,
//! mention discovery, candidate pair generation and the shortest dependency
//! path between two tokens.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

/// NER tag for tokens outside any mention
pub const OUTSIDE_TAG: &str = "O";

/// A single token of an annotated sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: usize,
    pub word: String,
    pub lemma: String,
    #[serde(default)]
    pub pos: String,
    pub ner: String,
    /// Pipe-delimited canonical ids; several when normalization is ambiguous
    #[serde(default)]
    pub normalized_ner: Option<String>,
}

impl Token {
    /// Create a token without normalization
    pub fn new(
        id: usize,
        word: impl Into<String>,
        lemma: impl Into<String>,
        pos: impl Into<String>,
        ner: impl Into<String>,
    ) -> Self {
        Self {
            id,
            word: word.into(),
            lemma: lemma.into(),
            pos: pos.into(),
            ner: ner.into(),
            normalized_ner: None,
        }
    }

    /// Set the normalized-NER string
    pub fn with_normalized_ner(mut self, normalized: impl Into<String>) -> Self {
        self.normalized_ner = Some(normalized.into());
        self
    }

    /// Canonical ids this token resolves to (empty when not normalized)
    pub fn normalized_ids(&self) -> BTreeSet<String> {
        self.normalized_ner
            .as_deref()
            .map(|s| {
                s.split('|')
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True if the NER tag belongs to the given tag family
    pub fn has_ner_family(&self, family: &str) -> bool {
        self.ner.contains(family)
    }
}

/// A typed dependency edge between two tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(rename = "type")]
    pub dep_type: String,
    pub governor: usize,
    pub dependent: usize,
}

impl Dependency {
    pub fn new(dep_type: impl Into<String>, governor: usize, dependent: usize) -> Self {
        Self {
            dep_type: dep_type.into(),
            governor,
            dependent,
        }
    }
}

/// Contiguous token span referring to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MentionSpan {
    pub first: usize,
    pub last: usize,
}

impl MentionSpan {
    pub fn new(first: usize, last: usize) -> Self {
        Self {
            first: first.min(last),
            last: first.max(last),
        }
    }

    /// Single-token mention
    pub fn single(id: usize) -> Self {
        Self::new(id, id)
    }

    /// Token whose annotations stand for the whole mention
    pub fn head(&self) -> usize {
        self.first
    }

    pub fn contains(&self, token_id: usize) -> bool {
        (self.first..=self.last).contains(&token_id)
    }

    pub fn token_ids(&self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// An entity-pair candidate, in the order the pair was generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPair {
    pub first: MentionSpan,
    pub second: MentionSpan,
}

impl EntityPair {
    pub fn new(first: MentionSpan, second: MentionSpan) -> Self {
        Self { first, second }
    }
}

/// One edge of a dependency path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEdge {
    pub dep_type: String,
    /// Traversed from dependent to governor
    pub upward: bool,
}

impl PathEdge {
    /// Edge label; upward edges carry a leading `-`
    pub fn label(&self) -> String {
        if self.upward {
            format!("-{}", self.dep_type)
        } else {
            self.dep_type.clone()
        }
    }
}

/// Shortest path through the dependency parse
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyPath {
    /// Token ids from start to end, endpoints included
    pub tokens: Vec<usize>,
    /// `edges[i]` joins `tokens[i]` and `tokens[i + 1]`
    pub edges: Vec<PathEdge>,
}

impl DependencyPath {
    /// Tokens strictly inside the path
    pub fn interior(&self) -> &[usize] {
        if self.tokens.len() <= 2 {
            &[]
        } else {
            &self.tokens[1..self.tokens.len() - 1]
        }
    }
}

/// An annotated sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub document_id: String,
    pub sentence_id: String,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub entity_pairs: Vec<EntityPair>,
}

impl Sentence {
    /// Create an empty sentence
    pub fn new(document_id: impl Into<String>, sentence_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            sentence_id: sentence_id.into(),
            tokens: Vec::new(),
            dependencies: Vec::new(),
            entity_pairs: Vec::new(),
        }
    }

    pub fn add_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn add_dependency(&mut self, dependency: Dependency) {
        self.dependencies.push(dependency);
    }

    pub fn add_entity_pair(&mut self, pair: EntityPair) {
        self.entity_pairs.push(pair);
    }

    /// Look up a token by id
    pub fn token(&self, id: usize) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == id)
    }

    /// Maximal runs of consecutive tokens sharing a non-`O` NER tag
    pub fn mentions(&self) -> Vec<(String, MentionSpan)> {
        let mut mentions: Vec<(String, MentionSpan)> = Vec::new();
        for token in &self.tokens {
            if token.ner == OUTSIDE_TAG {
                continue;
            }
            match mentions.last_mut() {
                Some((tag, span)) if *tag == token.ner && span.last + 1 == token.id => {
                    span.last = token.id;
                }
                _ => mentions.push((token.ner.clone(), MentionSpan::single(token.id))),
            }
        }
        mentions
    }

    /// Replace the candidate list with every (type_a mention, type_b mention) pair.
    ///
    /// When both types are the same each unordered pair is produced once,
    /// earlier mention first.
    pub fn generate_entity_pairs(&mut self, type_a: &str, type_b: &str) {
        let mentions = self.mentions();
        let mut pairs = Vec::new();
        for (i, (tag_i, span_i)) in mentions.iter().enumerate() {
            if tag_i != type_a {
                continue;
            }
            for (j, (tag_j, span_j)) in mentions.iter().enumerate() {
                if i == j || tag_j != type_b {
                    continue;
                }
                if type_a == type_b && j < i {
                    continue;
                }
                pairs.push(EntityPair::new(*span_i, *span_j));
            }
        }
        self.entity_pairs = pairs;
    }

    /// Shortest undirected path through the dependency parse
    pub fn dependency_path(&self, from: usize, to: usize) -> Option<DependencyPath> {
        let mut graph: UnGraph<usize, usize> = UnGraph::new_undirected();
        let nodes: HashMap<usize, NodeIndex> = self
            .tokens
            .iter()
            .map(|t| (t.id, graph.add_node(t.id)))
            .collect();

        for (i, dep) in self.dependencies.iter().enumerate() {
            // governor 0 is the artificial root
            if let (Some(&g), Some(&d)) = (nodes.get(&dep.governor), nodes.get(&dep.dependent)) {
                graph.add_edge(g, d, i);
            }
        }

        let start = *nodes.get(&from)?;
        let goal = *nodes.get(&to)?;
        let (_, path) = astar(&graph, start, |n| n == goal, |_| 1usize, |_| 0usize)?;

        let mut edges = Vec::with_capacity(path.len().saturating_sub(1));
        for step in path.windows(2) {
            let edge = graph.find_edge(step[0], step[1])?;
            let dep = &self.dependencies[graph[edge]];
            edges.push(PathEdge {
                dep_type: dep.dep_type.clone(),
                upward: dep.dependent == graph[step[0]] && dep.governor != dep.dependent,
            });
        }

        Some(DependencyPath {
            tokens: path.iter().map(|n| graph[*n]).collect(),
            edges,
        })
    }

    /// Lemmas of tokens strictly between two mentions, in sentence order
    pub fn lemmas_between(&self, a: &MentionSpan, b: &MentionSpan) -> Vec<String> {
        let (lo, hi) = if a.last < b.first {
            (a.last, b.first)
        } else if b.last < a.first {
            (b.last, a.first)
        } else {
            return Vec::new();
        };
        self.tokens
            .iter()
            .filter(|t| t.id > lo && t.id < hi)
            .map(|t| t.lemma.clone())
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// "MAPK1 strongly phosphorylates ELK1 ."
    fn sample_sentence() -> Sentence {
        let mut s = Sentence::new("PMID1", "s0");
        s.add_token(Token::new(1, "MAPK1", "MAPK1", "NN", "GENE").with_normalized_ner("5594"));
        s.add_token(Token::new(2, "strongly", "strongly", "RB", "O"));
        s.add_token(Token::new(3, "phosphorylates", "phosphorylate", "VBZ", "O"));
        s.add_token(Token::new(4, "ELK1", "ELK1", "NN", "GENE").with_normalized_ner("2002|2003"));
        s.add_token(Token::new(5, ".", ".", ".", "O"));
        s.add_dependency(Dependency::new("root", 0, 3));
        s.add_dependency(Dependency::new("nsubj", 3, 1));
        s.add_dependency(Dependency::new("advmod", 3, 2));
        s.add_dependency(Dependency::new("dobj", 3, 4));
        s.add_dependency(Dependency::new("punct", 3, 5));
        s
    }

    #[test]
    fn test_normalized_ids() {
        let s = sample_sentence();
        let ids = s.token(4).unwrap().normalized_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("2002") && ids.contains("2003"));
        assert!(s.token(2).unwrap().normalized_ids().is_empty());
    }

    #[test]
    fn test_mentions_and_pairs() {
        let mut s = sample_sentence();
        let mentions = s.mentions();
        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].1, MentionSpan::single(1));

        s.generate_entity_pairs("GENE", "GENE");
        assert_eq!(s.entity_pairs.len(), 1);
        assert_eq!(s.entity_pairs[0].first, MentionSpan::single(1));
        assert_eq!(s.entity_pairs[0].second, MentionSpan::single(4));
    }

    #[test]
    fn test_multi_token_mention() {
        let mut s = Sentence::new("d", "s");
        s.add_token(Token::new(1, "tumor", "tumor", "NN", "DISEASE"));
        s.add_token(Token::new(2, "necrosis", "necrosis", "NN", "DISEASE"));
        s.add_token(Token::new(3, "and", "and", "CC", "O"));
        s.add_token(Token::new(4, "TP53", "TP53", "NN", "GENE"));
        let mentions = s.mentions();
        assert_eq!(mentions[0], ("DISEASE".to_string(), MentionSpan::new(1, 2)));

        s.generate_entity_pairs("GENE", "DISEASE");
        assert_eq!(s.entity_pairs.len(), 1);
        assert_eq!(s.entity_pairs[0].first, MentionSpan::single(4));
    }

    #[test]
    fn test_dependency_path_directions() {
        let s = sample_sentence();
        let path = s.dependency_path(1, 4).unwrap();
        assert_eq!(path.tokens, vec![1, 3, 4]);
        let labels: Vec<String> = path.edges.iter().map(PathEdge::label).collect();
        assert_eq!(labels, vec!["-nsubj", "dobj"]);
        assert_eq!(path.interior(), &[3]);

        let reverse = s.dependency_path(4, 1).unwrap();
        let labels: Vec<String> = reverse.edges.iter().map(PathEdge::label).collect();
        assert_eq!(labels, vec!["-dobj", "nsubj"]);
    }

    #[test]
    fn test_dependency_path_disconnected() {
        let mut s = sample_sentence();
        s.dependencies.retain(|d| d.dep_type != "dobj");
        assert!(s.dependency_path(1, 4).is_none());
    }

    #[test]
    fn test_lemmas_between() {
        let s = sample_sentence();
        let between = s.lemmas_between(&MentionSpan::single(4), &MentionSpan::single(1));
        assert_eq!(between, vec!["strongly", "phosphorylate"]);
    }

    #[test]
    fn test_sentence_json() {
        let json = r#"{
            "document_id": "PMID9",
            "sentence_id": "1",
            "tokens": [{"id": 1, "word": "A", "lemma": "a", "ner": "GENE", "normalized_ner": "1"}],
            "dependencies": [{"type": "root", "governor": 0, "dependent": 1}]
        }"#;
        let s: Sentence = serde_json::from_str(json).unwrap();
        assert_eq!(s.tokens[0].pos, "");
        assert!(s.entity_pairs.is_empty());
        assert_eq!(s.dependencies[0].dep_type, "root");
    }
}
