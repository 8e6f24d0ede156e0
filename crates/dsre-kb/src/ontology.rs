//! Is-a ontology closures
//!
//! Computes, for a term, every ancestor reachable through is-a links. The
//! traversal is iterative and tracks which terms are on the current path,
//! so a cyclic parent map is reported instead of looping forever.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use dsre_core::{read_to_string, DsreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    OnPath,
    Done,
}

/// Transitive is-a closure over a term -> parents map
#[derive(Debug, Clone, Default)]
pub struct OntologyClosureBuilder {
    parents: HashMap<String, BTreeSet<String>>,
}

impl OntologyClosureBuilder {
    pub fn new(parents: HashMap<String, BTreeSet<String>>) -> Self {
        Self { parents }
    }

    /// Parse OBO stanzas: `id:` opens a term, `is_a:` adds a parent
    pub fn parse_obo(text: &str) -> Self {
        let mut parents: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut current: Option<String> = None;

        for line in text.lines() {
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("id:") => {
                    if let Some(id) = fields.next() {
                        parents.entry(id.to_string()).or_default();
                        current = Some(id.to_string());
                    }
                }
                Some("is_a:") => {
                    if let (Some(term), Some(parent)) = (&current, fields.next()) {
                        parents
                            .entry(term.clone())
                            .or_default()
                            .insert(parent.to_string());
                    }
                }
                _ => {}
            }
        }

        Self { parents }
    }

    /// Read and parse an OBO file
    pub fn from_obo(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::parse_obo(&read_to_string(path)?))
    }

    /// Immediate parents of a term
    pub fn parents(&self, term: &str) -> Option<&BTreeSet<String>> {
        self.parents.get(term)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// The term and all of its transitive ancestors.
    ///
    /// Parents without an entry of their own are treated as roots.
    pub fn closure(&self, term: &str) -> Result<BTreeSet<String>> {
        if !self.parents.contains_key(term) {
            return Err(DsreError::NotFound(term.to_string()));
        }

        let mut state: HashMap<&str, Visit> = HashMap::new();
        let mut reached = BTreeSet::new();
        // (term, leaving) pairs; the leaving marker closes the term's subtree
        let mut stack: Vec<(&str, bool)> = vec![(term, false)];

        while let Some((node, leaving)) = stack.pop() {
            if leaving {
                state.insert(node, Visit::Done);
                continue;
            }
            if state.contains_key(node) {
                continue;
            }

            state.insert(node, Visit::OnPath);
            reached.insert(node.to_string());
            stack.push((node, true));

            for parent in self.parents.get(node).into_iter().flatten() {
                match state.get(parent.as_str()) {
                    Some(Visit::OnPath) => return Err(DsreError::OntologyCycle(parent.clone())),
                    Some(Visit::Done) => {}
                    None => stack.push((parent.as_str(), false)),
                }
            }
        }

        Ok(reached)
    }

    /// Closure of every known term
    pub fn closure_all(&self) -> Result<BTreeMap<String, BTreeSet<String>>> {
        self.parents
            .keys()
            .map(|term| Ok((term.clone(), self.closure(term)?)))
            .collect()
    }
}
