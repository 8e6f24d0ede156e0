//! Document-grouped fold assignment
//!
//! Folds are cut from the document list, never from sentences, so every
//! sentence of a document lands on the same side of a split.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use dsre_core::{DsreError, Result, Sentence};

/// Contiguous chunks of a de-duplicated document list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFolds {
    documents: Vec<String>,
    chunk_size: usize,
}

impl DocumentFolds {
    /// Split `documents` into chunks of `len / k` documents.
    ///
    /// Repeated ids keep their first position. When `len` is not a multiple
    /// of `k` the final chunk is short and there are more than `k` chunks.
    pub fn new<I, S>(documents: I, k: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut unique = Vec::new();
        for document in documents {
            let document: String = document.into();
            if seen.insert(document.clone()) {
                unique.push(document);
            }
        }
        let documents = unique;

        if k == 0 {
            return Err(DsreError::InvalidFolds("fold count must be positive".to_string()));
        }
        if documents.len() < k {
            return Err(DsreError::InvalidFolds(format!(
                "{} documents cannot fill {k} folds",
                documents.len()
            )));
        }

        Ok(Self {
            chunk_size: documents.len() / k,
            documents,
        })
    }

    /// Number of chunks (one fold per chunk)
    pub fn len(&self) -> usize {
        self.documents.len().div_ceil(self.chunk_size)
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Documents of chunk `index`
    pub fn chunk(&self, index: usize) -> Option<&[String]> {
        self.documents.chunks(self.chunk_size).nth(index)
    }

    /// Hold out chunk `index`; train on the rest
    pub fn fold(&self, index: usize) -> Result<Fold> {
        let test = self.chunk(index).ok_or_else(|| {
            DsreError::InvalidFolds(format!("fold {index} out of range ({} folds)", self.len()))
        })?;
        let test_documents: HashSet<String> = test.iter().cloned().collect();
        let training_documents = self
            .documents
            .iter()
            .filter(|d| !test_documents.contains(*d))
            .cloned()
            .collect();

        Ok(Fold {
            index,
            test_documents,
            training_documents,
        })
    }

    /// Every fold in order
    pub fn iter(&self) -> impl Iterator<Item = Fold> + '_ {
        (0..self.len()).filter_map(move |i| self.fold(i).ok())
    }
}

/// One train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub index: usize,
    pub test_documents: HashSet<String>,
    pub training_documents: HashSet<String>,
}

impl Fold {
    pub fn is_test(&self, document_id: &str) -> bool {
        self.test_documents.contains(document_id)
    }

    /// Split sentences into (training, test) by document membership.
    ///
    /// Sentences from documents outside the test set train.
    pub fn route(&self, sentences: &[Arc<Sentence>]) -> (Vec<Arc<Sentence>>, Vec<Arc<Sentence>>) {
        sentences
            .iter()
            .cloned()
            .partition(|s| !self.is_test(&s.document_id))
    }
}
