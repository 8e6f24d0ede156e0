//! JSON-lines sentence reader
//!
//! One serialized `Sentence` per line. Sentences that carry no entity pairs
//! get candidates generated from their NER tags.

use std::path::Path;

use dsre_core::{read_to_string, DsreError, Result, Sentence};

use crate::{Corpus, CorpusLoader};

/// Loader for `*.jsonl` sentence files
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesLoader;

impl JsonLinesLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse sentences from already-read text
    pub fn parse(&self, source: &Path, text: &str, entity_a: &str, entity_b: &str) -> Result<Corpus> {
        let mut corpus = Corpus::new();

        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut sentence: Sentence =
                serde_json::from_str(line).map_err(|e| DsreError::MalformedRecord {
                    path: source.to_path_buf(),
                    line: line_no + 1,
                    message: e.to_string(),
                })?;

            if sentence.entity_pairs.is_empty() {
                sentence.generate_entity_pairs(entity_a, entity_b);
            }
            if !sentence.entity_pairs.is_empty() {
                corpus.push(sentence);
            }
        }

        Ok(corpus)
    }
}

impl CorpusLoader for JsonLinesLoader {
    fn load(&self, path: &Path, entity_a: &str, entity_b: &str) -> Result<Corpus> {
        let text = read_to_string(path)?;
        self.parse(path, &text, entity_a, entity_b)
    }

    fn can_load(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("jsonl")
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_corpus_directory;
    use std::fs;

    const TWO_GENES: &str = r#"{"document_id":"PMID1","sentence_id":"0","tokens":[{"id":1,"word":"p53","lemma":"p53","ner":"GENE","normalized_ner":"7157"},{"id":2,"word":"binds","lemma":"bind","ner":"O"},{"id":3,"word":"MDM2","lemma":"MDM2","ner":"GENE","normalized_ner":"4193"}],"dependencies":[{"type":"nsubj","governor":2,"dependent":1},{"type":"dobj","governor":2,"dependent":3}]}"#;
    const ONE_GENE: &str = r#"{"document_id":"PMID2","sentence_id":"0","tokens":[{"id":1,"word":"p53","lemma":"p53","ner":"GENE","normalized_ner":"7157"}]}"#;

    #[test]
    fn test_parse_generates_pairs_and_drops_empty() {
        let text = format!("{TWO_GENES}\n\n{ONE_GENE}\n");
        let corpus = JsonLinesLoader::new()
            .parse(Path::new("inline.jsonl"), &text, "GENE", "GENE")
            .unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.candidate_count(), 1);
        assert_eq!(corpus.document_list(), vec!["PMID1"]);
    }

    #[test]
    fn test_parse_reports_line() {
        let text = format!("{TWO_GENES}\nnot json\n");
        let err = JsonLinesLoader::new()
            .parse(Path::new("bad.jsonl"), &text, "GENE", "GENE")
            .unwrap_err();
        assert!(matches!(err, DsreError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn test_directory_walk() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("batch1");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("a.jsonl"), TWO_GENES).unwrap();
        fs::write(nested.join("b.jsonl"), TWO_GENES.replace("PMID1", "PMID3")).unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let corpus = load_corpus_directory(&JsonLinesLoader, dir.path(), "GENE", "GENE").unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.document_list(), vec!["PMID1", "PMID3"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_walk_skips_symlink_loop() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jsonl"), TWO_GENES).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("a.jsonl"), dir.path().join("b.jsonl")).unwrap();

        let corpus = load_corpus_directory(&JsonLinesLoader, dir.path(), "GENE", "GENE").unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.document_list(), vec!["PMID1"]);
    }
}
