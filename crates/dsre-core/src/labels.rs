//! Label values and label vectors

use serde::{Deserialize, Serialize};

use crate::{DsreError, Result};

/// Distant-supervision label for one relation column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Label {
    /// Not looked up (prediction instances)
    Unknown,
    Negative,
    Positive,
}

impl Label {
    pub fn value(self) -> i8 {
        match self {
            Self::Unknown => -1,
            Self::Negative => 0,
            Self::Positive => 1,
        }
    }
}

impl From<Label> for i8 {
    fn from(label: Label) -> Self {
        label.value()
    }
}

impl TryFrom<i8> for Label {
    type Error = String;

    fn try_from(value: i8) -> std::result::Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Unknown),
            0 => Ok(Self::Negative),
            1 => Ok(Self::Positive),
            other => Err(format!("label value out of range: {other}")),
        }
    }
}

/// Per-relation labels, one column per relation schema entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelVector(Vec<Label>);

impl LabelVector {
    /// Create a vector of `len` copies of `fill`
    pub fn filled(len: usize, fill: Label) -> Self {
        Self(vec![fill; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Label> {
        self.0.get(index).copied()
    }

    /// Set one column
    pub fn set(&mut self, index: usize, label: Label) -> Result<()> {
        let len = self.0.len();
        let slot = self.0.get_mut(index).ok_or(DsreError::LabelLength {
            expected: index + 1,
            actual: len,
        })?;
        *slot = label;
        Ok(())
    }

    pub fn as_slice(&self) -> &[Label] {
        &self.0
    }

    /// Raw `-1/0/1` values, in column order
    pub fn values(&self) -> Vec<i8> {
        self.0.iter().map(|l| l.value()).collect()
    }

    /// True if any column is positive
    pub fn has_positive(&self) -> bool {
        self.0.contains(&Label::Positive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_values() {
        assert_eq!(Label::Unknown.value(), -1);
        assert_eq!(Label::Negative.value(), 0);
        assert_eq!(Label::Positive.value(), 1);
        assert_eq!(Label::try_from(1i8), Ok(Label::Positive));
        assert!(Label::try_from(2i8).is_err());
    }

    #[test]
    fn test_label_vector_set() {
        let mut labels = LabelVector::filled(2, Label::Negative);
        labels.set(1, Label::Positive).unwrap();
        assert_eq!(labels.values(), vec![0, 1]);
        assert!(labels.has_positive());
        assert!(labels.set(2, Label::Positive).is_err());
    }

    #[test]
    fn test_label_vector_serializes_as_integers() {
        let labels = LabelVector::filled(3, Label::Unknown);
        assert_eq!(serde_json::to_string(&labels).unwrap(), "[-1,-1,-1]");
    }
}
