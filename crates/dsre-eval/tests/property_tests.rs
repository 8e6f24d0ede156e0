//! Property-based tests for document folds.
//!
//! - Test sets partition the de-duplicated document list
//! - No document is on both sides of a fold
//! - Sentence routing follows document membership

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use dsre_core::Sentence;
use dsre_eval::DocumentFolds;

fn arb_documents() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("d[0-9]{1,3}", 1..80)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_sets_partition_documents(documents in arb_documents(), k in 1usize..12) {
        let distinct: HashSet<&String> = documents.iter().collect();
        prop_assume!(distinct.len() >= k);

        let folds = DocumentFolds::new(documents.clone(), k).unwrap();
        prop_assert!(folds.len() >= k);
        prop_assert!(folds.len() <= 2 * k);

        let mut covered: Vec<String> = Vec::new();
        for fold in folds.iter() {
            prop_assert!(fold.test_documents.is_disjoint(&fold.training_documents));
            prop_assert_eq!(
                fold.test_documents.len() + fold.training_documents.len(),
                distinct.len()
            );
            covered.extend(fold.test_documents.iter().cloned());
        }

        prop_assert_eq!(covered.len(), distinct.len());
        let covered: HashSet<&String> = covered.iter().collect();
        prop_assert_eq!(covered, distinct);
    }

    #[test]
    fn routing_respects_membership(documents in arb_documents(), k in 1usize..5, fold in 0usize..5) {
        let distinct: HashSet<&String> = documents.iter().collect();
        prop_assume!(distinct.len() >= k);

        let folds = DocumentFolds::new(documents.clone(), k).unwrap();
        prop_assume!(fold < folds.len());
        let fold = folds.fold(fold).unwrap();

        let sentences: Vec<Arc<Sentence>> = documents
            .iter()
            .map(|d| Arc::new(Sentence::new(d.as_str(), "0")))
            .collect();
        let (train, test) = fold.route(&sentences);

        prop_assert_eq!(train.len() + test.len(), sentences.len());
        prop_assert!(test.iter().all(|s| fold.is_test(&s.document_id)));
        prop_assert!(train.iter().all(|s| fold.training_documents.contains(&s.document_id)));
    }
}
