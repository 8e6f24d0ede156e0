//! DSRE KB - Knowledge base access for distant supervision
//!
//! Loads relation files into forward/reverse id-tuple sets per relation,
//! along with the auxiliary id resources used during labeling (synonym
//! dictionary, stop-id and allowlist files) and is-a ontology closures.

pub mod index;
pub mod lists;
pub mod ontology;
pub mod synonyms;

pub use index::{
    load_distant_directories, load_distant_kb, EntityTuple, KbColumns, KnowledgeBaseIndex,
    RelationTuples, PASSIVE_SUFFIX,
};
pub use lists::{load_id_list, load_stop_list};
pub use ontology::OntologyClosureBuilder;
pub use synonyms::SynonymDictionary;
