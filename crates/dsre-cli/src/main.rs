//! DSRE CLI - Command-line interface
//!
//! Usage:
//!   dsre label <corpus> [--output instances.jsonl]
//!   dsre vocab <corpus> --output vocabularies.json
//!   dsre folds <corpus> [--k 10]
//!   dsre mentions <corpus>
//!   dsre ontology <file.obo> [--term GO:0008150]

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use dsre_core::{AppConfig, LoggingConfig, RelationSchema, VocabularyConfig};
use dsre_corpus::{load_corpus_directory, mention_inventory, Corpus, JsonLinesLoader};
use dsre_eval::DocumentFolds;
use dsre_extractor::{
    build_training_set, build_vocabularies, load_embedding_vocabulary, CandidateLabeler,
    EntityFilter, FeatureEncoder, VocabularyBuilder,
};
use dsre_kb::{
    load_id_list, load_stop_list, KbColumns, KnowledgeBaseIndex, OntologyClosureBuilder,
    SynonymDictionary,
};

#[derive(Parser)]
#[command(name = "dsre")]
#[command(about = "Distant-supervision relation extraction dataset toolkit")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Label and encode a corpus against the knowledge base
    Label {
        /// Directory of annotated sentence files
        corpus: PathBuf,
        /// Relation columns, in order (default: every indexed relation)
        #[arg(long, value_delimiter = ',')]
        relations: Option<Vec<String>>,
        /// Instance output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Build vocabularies from a corpus
    Vocab {
        corpus: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Show the document folds of a corpus
    Folds {
        corpus: PathBuf,
        /// Fold count (default: from config)
        #[arg(long)]
        k: Option<usize>,
    },
    /// Count entity mentions by normalized id and lemma phrase
    Mentions { corpus: PathBuf },
    /// Compute is-a closures of an OBO ontology
    Ontology {
        path: PathBuf,
        /// Single term to close (default: all terms)
        #[arg(long)]
        term: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    init_tracing(&config.logging);

    match cli.command {
        Commands::Label {
            corpus,
            relations,
            output,
        } => {
            let resources = Resources::load(&config, relations)?;
            let labeler = resources.labeler(&config)?;
            let corpus = load_corpus(&config, &corpus)?;

            let training =
                build_training_set(&corpus.sentences, &labeler, &vocabulary_builder(&config.vocabulary)?)?;
            tracing::info!(
                width = training.vocabularies.width(),
                "Encoded {} instances",
                training.instances.len()
            );

            let mut writer = open_output(output.as_deref())?;
            for instance in &training.instances {
                serde_json::to_writer(&mut writer, &instance.record())?;
                writeln!(writer)?;
            }
            writer.flush()?;
        }
        Commands::Vocab { corpus, output } => {
            let schema = RelationSchema::new(Vec::<String>::new())?;
            let labeler = vocabulary_labeler(&schema, &config)?;
            let corpus = load_corpus(&config, &corpus)?;

            let vocabularies = build_vocabularies(
                &corpus.sentences,
                &labeler,
                &vocabulary_builder(&config.vocabulary)?,
            )?;
            let mut writer = open_output(Some(output.as_path()))?;
            serde_json::to_writer_pretty(&mut writer, &vocabularies)?;
            writer.flush()?;
            for (name, size) in vocabularies.sizes() {
                println!("{name}: {size}");
            }
        }
        Commands::Folds { corpus, k } => {
            let corpus = load_corpus(&config, &corpus)?;
            let k = k.unwrap_or(config.cross_validation.folds);
            let folds = DocumentFolds::new(corpus.document_list(), k)?;

            let summary: Vec<FoldSummary> = folds
                .iter()
                .map(|fold| {
                    let (train, test) = fold.route(&corpus.sentences);
                    let mut test_documents: Vec<String> =
                        fold.test_documents.iter().cloned().collect();
                    test_documents.sort();
                    FoldSummary {
                        fold: fold.index,
                        test_documents,
                        training_sentences: train.len(),
                        test_sentences: test.len(),
                    }
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Mentions { corpus } => {
            let corpus = load_corpus(&config, &corpus)?;
            let (type_a, type_b) = (&config.labeling.entity_type_a, &config.labeling.entity_type_b);
            let (a, b) = mention_inventory(&corpus, type_a, type_b);
            let summary = if type_a == type_b {
                vec![(type_a, a)]
            } else {
                vec![(type_a, a), (type_b, b)]
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Ontology { path, term } => {
            let ontology = OntologyClosureBuilder::from_obo(&path)?;
            let output = match term {
                Some(term) => serde_json::to_string_pretty(&ontology.closure(&term)?)?,
                None => serde_json::to_string_pretty(&ontology.closure_all()?)?,
            };
            println!("{output}");
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("dsre={}", logging.level).into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[derive(Serialize)]
struct FoldSummary {
    fold: usize,
    test_documents: Vec<String>,
    training_sentences: usize,
    test_sentences: usize,
}

/// Knowledge base and id lists needed for labeling
struct Resources {
    kb: KnowledgeBaseIndex,
    schema: RelationSchema,
    synonyms: SynonymDictionary,
    stop_ids: HashSet<String>,
    filter: EntityFilter,
}

impl Resources {
    fn load(config: &AppConfig, relations: Option<Vec<String>>) -> anyhow::Result<Self> {
        let synonyms = match &config.kb.synonyms_file {
            Some(path) => SynonymDictionary::load(path)?,
            None => SynonymDictionary::new(),
        };
        let kb = KnowledgeBaseIndex::load_directories(
            &config.kb.directional_dir,
            &config.kb.symmetric_dir,
            KbColumns::from(&config.kb),
            &synonyms,
        )
        .context("loading distant supervision knowledge base")?;
        let schema = match relations {
            Some(names) => RelationSchema::new(names)?,
            None => kb.schema()?,
        };

        let stop_ids = match &config.labeling.stop_list {
            Some(path) => load_stop_list(path)?,
            None => HashSet::new(),
        };
        let filter = entity_filter(config)?;

        Ok(Self {
            kb,
            schema,
            synonyms,
            stop_ids,
            filter,
        })
    }

    fn labeler(&self, config: &AppConfig) -> anyhow::Result<CandidateLabeler<'_>> {
        let mut labeler = CandidateLabeler::supervised(&self.kb, &self.schema)?
            .with_stop_ids(self.stop_ids.clone())
            .with_entity_filter(self.filter.clone())
            .with_gene_tag(config.labeling.gene_tag.clone());
        if !self.synonyms.is_empty() {
            labeler = labeler.with_synonyms(&self.synonyms);
        }
        Ok(labeler)
    }
}

/// Allowlists for each side of a candidate, when configured
fn entity_filter(config: &AppConfig) -> anyhow::Result<EntityFilter> {
    let id_list = |path: &Option<PathBuf>| -> anyhow::Result<Option<HashSet<String>>> {
        Ok(match path {
            Some(path) => Some(load_id_list(path, 0)?),
            None => None,
        })
    };
    Ok(EntityFilter::new(
        id_list(&config.labeling.entity_a_list)?,
        id_list(&config.labeling.entity_b_list)?,
    ))
}

/// Unsupervised labeler honoring the configured allowlists
fn vocabulary_labeler<'a>(
    schema: &'a RelationSchema,
    config: &AppConfig,
) -> anyhow::Result<CandidateLabeler<'a>> {
    Ok(CandidateLabeler::unlabeled(schema)
        .with_entity_filter(entity_filter(config)?)
        .with_gene_tag(config.labeling.gene_tag.clone()))
}

fn load_corpus(config: &AppConfig, dir: &Path) -> anyhow::Result<Corpus> {
    load_corpus_directory(
        &JsonLinesLoader::new(),
        dir,
        &config.labeling.entity_type_a,
        &config.labeling.entity_type_b,
    )
    .with_context(|| format!("loading corpus from {}", dir.display()))
}

fn vocabulary_builder(config: &VocabularyConfig) -> anyhow::Result<VocabularyBuilder> {
    let mut builder =
        VocabularyBuilder::new(config.encoding).with_min_occurrence(Some(config.min_occurrence));
    if let Some(path) = &config.pretrained_embeddings {
        builder = builder.with_pretrained_words(load_embedding_vocabulary(path)?);
    }
    Ok(builder)
}

fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use dsre_core::{EntityPair, MentionSpan, Sentence, Token};

    fn pair_sentence(first: &str, second: &str) -> Arc<Sentence> {
        let mut s = Sentence::new("PMID1", "0");
        s.add_token(Token::new(1, first, first, "NN", "GENE").with_normalized_ner(first));
        s.add_token(Token::new(2, second, second, "NN", "GENE").with_normalized_ner(second));
        s.add_entity_pair(EntityPair::new(MentionSpan::single(1), MentionSpan::single(2)));
        Arc::new(s)
    }

    #[test]
    fn test_vocabulary_labeler_applies_allowlists() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("allowed_a.tsv");
        std::fs::write(&list, "P1\n").unwrap();

        let mut config = AppConfig::default();
        config.labeling.entity_a_list = Some(list);
        let schema = RelationSchema::new(Vec::<String>::new()).unwrap();
        let labeler = vocabulary_labeler(&schema, &config).unwrap();

        let batch = labeler
            .label_sentences(&[pair_sentence("P1", "P2"), pair_sentence("P3", "P1")])
            .unwrap();
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.instances.len(), 2);
        assert_eq!(batch.instances[0].describe(), "PMID1/0:1-2");
    }

    #[test]
    fn test_entity_filter_without_lists_allows_all() {
        let filter = entity_filter(&AppConfig::default()).unwrap();
        assert!(filter.first.is_none());
        assert!(filter.second.is_none());
    }
}
