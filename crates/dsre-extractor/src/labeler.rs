//! Distant-supervision candidate labeling
//!
//! For every entity-pair candidate the labeler builds a forward instance
//! (first, second) and a reverse instance (second, first) and, when a
//! knowledge base is attached, marks the relation columns whose tuple sets
//! contain any (id, id) combination of the two mentions:
//!
//! - symmetric relations mark both directions on either a forward or a
//!   reverse hit
//! - directional relations mark the forward instance on a forward hit,
//!   otherwise the reverse instance on a reverse hit
//!
//! Only gene-to-gene candidates emit both instances; other candidates emit
//! the forward one. Path tokens of both directions always feed the
//! vocabulary corpora.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use dsre_core::{
    DsreError, EntityPair, Label, LabelVector, RelationKind, RelationSchema, Result, Sentence,
};
use dsre_kb::{EntityTuple, KnowledgeBaseIndex, SynonymDictionary};

use crate::instance::Instance;
use crate::vocabulary::VocabularyCorpora;

/// Default NER tag family treated as "gene"
pub const DEFAULT_GENE_TAG: &str = "GENE";

/// Where labels come from
#[derive(Debug, Clone, Copy)]
pub enum Supervision<'a> {
    /// Look tuples up in a knowledge base
    Distant(&'a KnowledgeBaseIndex),
    /// Leave every column unknown (prediction)
    Unlabeled,
}

/// Optional allowlists of canonical ids for each side of a candidate
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    pub first: Option<HashSet<String>>,
    pub second: Option<HashSet<String>>,
}

impl EntityFilter {
    pub fn new(first: Option<HashSet<String>>, second: Option<HashSet<String>>) -> Self {
        Self { first, second }
    }

    /// Each configured list must match its own side and not the other one
    pub fn allows(&self, first: &BTreeSet<String>, second: &BTreeSet<String>) -> bool {
        let side_ok = |list: &Option<HashSet<String>>, own: &BTreeSet<String>, other: &BTreeSet<String>| {
            match list {
                Some(allowed) => {
                    own.iter().any(|id| allowed.contains(id))
                        && !other.iter().any(|id| allowed.contains(id))
                }
                None => true,
            }
        };
        side_ok(&self.first, first, second) && side_ok(&self.second, second, first)
    }
}

/// Both directions of one candidate
#[derive(Debug, Clone)]
pub struct Candidate {
    pub forward: Instance,
    pub reverse: Instance,
    pub gene_to_gene: bool,
}

impl Candidate {
    /// Instances that go into the dataset
    pub fn into_emitted(self) -> Vec<Instance> {
        if self.gene_to_gene {
            vec![self.forward, self.reverse]
        } else {
            vec![self.forward]
        }
    }
}

/// Output of labeling a batch of sentences
#[derive(Debug, Clone, Default)]
pub struct LabeledBatch {
    pub instances: Vec<Instance>,
    pub corpora: VocabularyCorpora,
    /// Candidates dropped by the stop list or entity filter
    pub skipped: usize,
}

/// Labels entity-pair candidates against a relation schema
#[derive(Debug, Clone)]
pub struct CandidateLabeler<'a> {
    schema: &'a RelationSchema,
    supervision: Supervision<'a>,
    stop_ids: HashSet<String>,
    synonyms: Option<&'a SynonymDictionary>,
    filter: EntityFilter,
    gene_tag: String,
}

impl<'a> CandidateLabeler<'a> {
    /// Labeler backed by a knowledge base holding every schema relation
    pub fn supervised(kb: &'a KnowledgeBaseIndex, schema: &'a RelationSchema) -> Result<Self> {
        kb.validate(schema)?;
        Ok(Self::with_supervision(schema, Supervision::Distant(kb)))
    }

    /// Labeler that leaves every column unknown
    pub fn unlabeled(schema: &'a RelationSchema) -> Self {
        Self::with_supervision(schema, Supervision::Unlabeled)
    }

    fn with_supervision(schema: &'a RelationSchema, supervision: Supervision<'a>) -> Self {
        Self {
            schema,
            supervision,
            stop_ids: HashSet::new(),
            synonyms: None,
            filter: EntityFilter::default(),
            gene_tag: DEFAULT_GENE_TAG.to_string(),
        }
    }

    /// Skip candidates whose mentions resolve to any of these ids
    pub fn with_stop_ids(mut self, stop_ids: HashSet<String>) -> Self {
        self.stop_ids = stop_ids;
        self
    }

    /// Expand mention ids with synonyms before the knowledge base lookup
    pub fn with_synonyms(mut self, synonyms: &'a SynonymDictionary) -> Self {
        self.synonyms = Some(synonyms);
        self
    }

    pub fn with_entity_filter(mut self, filter: EntityFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_gene_tag(mut self, tag: impl Into<String>) -> Self {
        self.gene_tag = tag.into();
        self
    }

    /// Same settings, without knowledge base lookups
    pub fn unsupervised(&self) -> Self {
        Self {
            supervision: Supervision::Unlabeled,
            ..self.clone()
        }
    }

    pub fn schema(&self) -> &RelationSchema {
        self.schema
    }

    pub fn is_supervised(&self) -> bool {
        matches!(self.supervision, Supervision::Distant(_))
    }

    fn expanded(&self, ids: &BTreeSet<String>) -> BTreeSet<String> {
        match self.synonyms {
            Some(synonyms) => synonyms.expand_all(ids),
            None => ids.clone(),
        }
    }

    /// Build and label both directions of a candidate.
    ///
    /// Returns `None` when the stop list or entity filter rejects it.
    pub fn label_candidate(
        &self,
        sentence: &Arc<Sentence>,
        pair: &EntityPair,
    ) -> Result<Option<Candidate>> {
        let head_token = |head: usize| {
            sentence.token(head).ok_or_else(|| {
                DsreError::NotFound(format!(
                    "token {head} in sentence {}/{}",
                    sentence.document_id, sentence.sentence_id
                ))
            })
        };
        let token1 = head_token(pair.first.head())?;
        let token2 = head_token(pair.second.head())?;

        let ids1 = token1.normalized_ids();
        let ids2 = token2.normalized_ids();
        if ids1.iter().chain(&ids2).any(|id| self.stop_ids.contains(id)) {
            return Ok(None);
        }
        if !self.filter.allows(&ids1, &ids2) {
            return Ok(None);
        }

        let gene_to_gene =
            token1.has_ner_family(&self.gene_tag) && token2.has_ner_family(&self.gene_tag);
        let fill = if self.is_supervised() {
            Label::Negative
        } else {
            Label::Unknown
        };

        let mut forward = Instance::new(
            Arc::clone(sentence),
            pair.first,
            pair.second,
            LabelVector::filled(self.schema.len(), fill),
        );
        let mut reverse = Instance::new(
            Arc::clone(sentence),
            pair.second,
            pair.first,
            LabelVector::filled(self.schema.len(), fill),
        );

        if let Supervision::Distant(kb) = self.supervision {
            let combos = entity_combos(&self.expanded(&ids1), &self.expanded(&ids2));
            for (column, name, kind) in self.schema.iter() {
                let tuples = kb
                    .get(name)
                    .ok_or_else(|| DsreError::UnknownRelation(name.to_string()))?;
                let forward_hit = tuples.intersects_forward(&combos);
                match kind {
                    RelationKind::Symmetric => {
                        if forward_hit || tuples.intersects_reverse(&combos) {
                            forward.set_label(column, Label::Positive)?;
                            reverse.set_label(column, Label::Positive)?;
                        }
                    }
                    RelationKind::Directional => {
                        if forward_hit {
                            forward.set_label(column, Label::Positive)?;
                        } else if tuples.intersects_reverse(&combos) {
                            reverse.set_label(column, Label::Positive)?;
                        }
                    }
                }
            }
        }

        Ok(Some(Candidate {
            forward,
            reverse,
            gene_to_gene,
        }))
    }

    /// Label every candidate of every sentence, in order
    pub fn label_sentences(&self, sentences: &[Arc<Sentence>]) -> Result<LabeledBatch> {
        let mut batch = LabeledBatch::default();

        for sentence in sentences {
            for pair in &sentence.entity_pairs {
                match self.label_candidate(sentence, pair)? {
                    None => batch.skipped += 1,
                    Some(candidate) => {
                        batch.corpora.absorb(candidate.forward.tokens());
                        batch.corpora.absorb(candidate.reverse.tokens());
                        batch.instances.extend(candidate.into_emitted());
                    }
                }
            }
        }

        tracing::debug!(
            "Labeled {} instances from {} sentences ({} candidates skipped)",
            batch.instances.len(),
            sentences.len(),
            batch.skipped
        );
        Ok(batch)
    }
}

/// Every (first id, second id) combination
fn entity_combos(first: &BTreeSet<String>, second: &BTreeSet<String>) -> BTreeSet<EntityTuple> {
    first
        .iter()
        .flat_map(|a| second.iter().map(move |b| (a.clone(), b.clone())))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
