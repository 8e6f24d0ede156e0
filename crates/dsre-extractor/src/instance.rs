//! Labeled relation instances

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use dsre_core::{DsreError, Label, LabelVector, MentionSpan, PathEdge, Result, Sentence};

use crate::features::{FeatureEncoder, Features};

/// Token lists derived from the dependency path between two mentions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTokens {
    /// Edge labels along the path, upward edges prefixed with `-`
    pub dependency_types: Vec<String>,
    /// `dependency_types` joined by single spaces
    pub dependency_path: String,
    /// Lemmas of the path's interior tokens
    pub dependency_words: Vec<String>,
    /// Edge labels interleaved with interior lemmas
    pub dependency_elements: Vec<String>,
    /// Lemmas strictly between the two mentions in sentence order
    pub between_words: Vec<String>,
}

impl PathTokens {
    /// Derive the token lists for an ordered mention pair.
    ///
    /// A disconnected parse yields empty path lists.
    pub fn from_sentence(sentence: &Sentence, entity1: &MentionSpan, entity2: &MentionSpan) -> Self {
        let between_words = sentence.lemmas_between(entity1, entity2);
        let Some(path) = sentence.dependency_path(entity1.head(), entity2.head()) else {
            return Self {
                between_words,
                ..Self::default()
            };
        };

        let dependency_types: Vec<String> = path.edges.iter().map(PathEdge::label).collect();
        let dependency_words: Vec<String> = path
            .interior()
            .iter()
            .map(|&id| sentence.token(id).map(|t| t.lemma.clone()).unwrap_or_default())
            .collect();

        let mut dependency_elements = Vec::with_capacity(dependency_types.len() + dependency_words.len());
        for (i, edge) in dependency_types.iter().enumerate() {
            dependency_elements.push(edge.clone());
            if let Some(word) = dependency_words.get(i) {
                dependency_elements.push(word.clone());
            }
        }

        Self {
            dependency_path: dependency_types.join(" "),
            dependency_types,
            dependency_words,
            dependency_elements,
            between_words,
        }
    }
}

/// One ordered entity pair in one sentence, with its labels
#[derive(Debug, Clone)]
pub struct Instance {
    sentence: Arc<Sentence>,
    entity1: MentionSpan,
    entity2: MentionSpan,
    labels: LabelVector,
    tokens: PathTokens,
    features: Option<Features>,
}

impl Instance {
    pub fn new(
        sentence: Arc<Sentence>,
        entity1: MentionSpan,
        entity2: MentionSpan,
        labels: LabelVector,
    ) -> Self {
        let tokens = PathTokens::from_sentence(&sentence, &entity1, &entity2);
        Self {
            sentence,
            entity1,
            entity2,
            labels,
            tokens,
            features: None,
        }
    }

    pub fn sentence(&self) -> &Arc<Sentence> {
        &self.sentence
    }

    pub fn document_id(&self) -> &str {
        &self.sentence.document_id
    }

    pub fn entity1(&self) -> MentionSpan {
        self.entity1
    }

    pub fn entity2(&self) -> MentionSpan {
        self.entity2
    }

    pub fn labels(&self) -> &LabelVector {
        &self.labels
    }

    pub fn set_label(&mut self, index: usize, label: Label) -> Result<()> {
        self.labels.set(index, label)
    }

    pub fn tokens(&self) -> &PathTokens {
        &self.tokens
    }

    pub fn features(&self) -> Option<&Features> {
        self.features.as_ref()
    }

    /// Encode with the given vocabularies, replacing earlier features
    pub fn encode(&mut self, encoder: &dyn FeatureEncoder) {
        self.features = Some(encoder.encode(&self.tokens));
    }

    /// Dense feature row; the instance must have been encoded
    pub fn feature_row(&self) -> Result<Vec<i32>> {
        self.features
            .as_ref()
            .map(Features::to_row)
            .ok_or_else(|| DsreError::MissingFeatures(self.describe()))
    }

    /// `document/sentence:first-last` style identifier for messages
    pub fn describe(&self) -> String {
        format!(
            "{}/{}:{}-{}",
            self.sentence.document_id,
            self.sentence.sentence_id,
            self.entity1.head(),
            self.entity2.head()
        )
    }

    /// Serializable view of the instance
    pub fn record(&self) -> InstanceRecord {
        InstanceRecord {
            document_id: self.sentence.document_id.clone(),
            sentence_id: self.sentence.sentence_id.clone(),
            entity1: self.entity1,
            entity2: self.entity2,
            labels: self.labels.clone(),
            dependency_path: self.tokens.dependency_path.clone(),
            features: self.features.clone(),
        }
    }
}

/// Instance summary written by the command line tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub document_id: String,
    pub sentence_id: String,
    pub entity1: MentionSpan,
    pub entity2: MentionSpan,
    pub labels: LabelVector,
    pub dependency_path: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub features: Option<Features>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsre_core::{Dependency, Token};

    /// "MAPK1 strongly phosphorylates ELK1"
    fn sentence() -> Arc<Sentence> {
        let mut s = Sentence::new("PMID1", "s0");
        s.add_token(Token::new(1, "MAPK1", "MAPK1", "NN", "GENE").with_normalized_ner("5594"));
        s.add_token(Token::new(2, "strongly", "strongly", "RB", "O"));
        s.add_token(Token::new(3, "phosphorylates", "phosphorylate", "VBZ", "O"));
        s.add_token(Token::new(4, "ELK1", "ELK1", "NN", "GENE").with_normalized_ner("2002"));
        s.add_dependency(Dependency::new("root", 0, 3));
        s.add_dependency(Dependency::new("nsubj", 3, 1));
        s.add_dependency(Dependency::new("advmod", 3, 2));
        s.add_dependency(Dependency::new("dobj", 3, 4));
        Arc::new(s)
    }

    #[test]
    fn test_path_tokens_forward() {
        let s = sentence();
        let tokens = PathTokens::from_sentence(&s, &MentionSpan::single(1), &MentionSpan::single(4));
        assert_eq!(tokens.dependency_types, vec!["-nsubj", "dobj"]);
        assert_eq!(tokens.dependency_path, "-nsubj dobj");
        assert_eq!(tokens.dependency_words, vec!["phosphorylate"]);
        assert_eq!(
            tokens.dependency_elements,
            vec!["-nsubj", "phosphorylate", "dobj"]
        );
        assert_eq!(tokens.between_words, vec!["strongly", "phosphorylate"]);
    }

    #[test]
    fn test_path_tokens_reverse() {
        let s = sentence();
        let tokens = PathTokens::from_sentence(&s, &MentionSpan::single(4), &MentionSpan::single(1));
        assert_eq!(tokens.dependency_path, "-dobj nsubj");
        assert_eq!(tokens.between_words, vec!["strongly", "phosphorylate"]);
    }

    #[test]
    fn test_path_tokens_disconnected() {
        let mut s = (*sentence()).clone();
        s.dependencies.clear();
        let tokens = PathTokens::from_sentence(&s, &MentionSpan::single(1), &MentionSpan::single(4));
        assert!(tokens.dependency_types.is_empty());
        assert_eq!(tokens.dependency_path, "");
        assert_eq!(tokens.between_words.len(), 2);
    }

    #[test]
    fn test_feature_row_requires_encoding() {
        let instance = Instance::new(
            sentence(),
            MentionSpan::single(1),
            MentionSpan::single(4),
            LabelVector::filled(1, Label::Negative),
        );
        assert_eq!(instance.document_id(), "PMID1");
        assert!(matches!(
            instance.feature_row(),
            Err(DsreError::MissingFeatures(id)) if id == "PMID1/s0:1-4"
        ));
    }
}
