//! Inverted name index over a [`RecordStore`], built on Tantivy.
//!
//! Every record becomes one document carrying its id and, for each of its names, the
//! normalized phrase twice: once in `full_name` (raw tokenizer, the whole phrase is a
//! single term) and once in `tokens` (whitespace tokenizer, one term per token).
//! Names are normalized before they reach Tantivy, so the index never applies its own
//! analysis and the resolver can look terms up verbatim.

use std::path::Path;

use ahash::AHashSet as HashSet;
use itertools::Itertools;
pub use error::IndexError;
use error::Result;
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term,
    collector::DocSetCollector,
    query::{BooleanQuery, FuzzyTermQuery, Occur, Query, TermQuery, TermSetQuery},
    schema::{
        FAST, Field, INDEXED, IndexRecordOption, Schema, SchemaBuilder, TextFieldIndexing,
        TextOptions,
    },
};
use toponym_data::RecordStore;
use tracing::{debug, info, instrument, trace};

use crate::config::IndexOptions;
use crate::normalize::normalize;

const RECORD_ID_FIELD: &str = "record_id";
const FULL_NAME_FIELD: &str = "full_name";
const TOKENS_FIELD: &str = "tokens";

#[derive(Debug, Clone, Copy)]
struct IndexFields {
    record_id: Field,
    full_name: Field,
    tokens: Field,
}

impl IndexFields {
    fn from_schema(schema: &Schema) -> Result<Self> {
        Ok(Self {
            record_id: schema.get_field(RECORD_ID_FIELD)?,
            full_name: schema.get_field(FULL_NAME_FIELD)?,
            tokens: schema.get_field(TOKENS_FIELD)?,
        })
    }
}

fn schema() -> Schema {
    let mut schema_builder = SchemaBuilder::new();

    let text_options = |tokenizer: &str| {
        TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(tokenizer)
                .set_index_option(IndexRecordOption::Basic),
        )
    };

    schema_builder.add_u64_field(RECORD_ID_FIELD, INDEXED | FAST);
    schema_builder.add_text_field(FULL_NAME_FIELD, text_options("raw"));
    schema_builder.add_text_field(TOKENS_FIELD, text_options("whitespace"));
    schema_builder.build()
}

/// A committed, read-only name index.
///
/// The reader never reloads: the index a `GazetteerIndex` was opened on is the index
/// it answers from for its whole life.
#[derive(Clone)]
pub struct GazetteerIndex {
    reader: IndexReader,
    fields: IndexFields,
}

impl std::fmt::Debug for GazetteerIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GazetteerIndex")
            .field("num_docs", &self.num_docs())
            .finish_non_exhaustive()
    }
}

impl GazetteerIndex {
    /// Build an index held entirely in memory.
    #[instrument(
        name = "Build in-memory index",
        skip_all,
        fields(records = store.len()),
        level = "info"
    )]
    pub fn build_in_ram(store: &RecordStore, options: &IndexOptions) -> Result<Self> {
        let index = Index::create_in_ram(schema());
        Self::populate(index, store, options)
    }

    /// Build an index in `dir`, which must exist and be empty.
    #[instrument(
        name = "Build index",
        skip(store, options),
        fields(records = store.len()),
        level = "info"
    )]
    pub fn build_in_dir(store: &RecordStore, dir: &Path, options: &IndexOptions) -> Result<Self> {
        let index = Index::create_in_dir(dir, schema())?;
        Self::populate(index, store, options)
    }

    /// Reopen an index committed by [`GazetteerIndex::build_in_dir`].
    #[instrument(name = "Open index", level = "info")]
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.join("meta.json").exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no index found in {}", dir.display()),
            )
            .into());
        }
        let index = Index::open_in_dir(dir)?;
        let gazetteer_index = Self::with_reader(index)?;
        info!(num_docs = gazetteer_index.num_docs(), "Index opened");
        Ok(gazetteer_index)
    }

    fn populate(index: Index, store: &RecordStore, options: &IndexOptions) -> Result<Self> {
        let fields = IndexFields::from_schema(&index.schema())?;
        let t_index = std::time::Instant::now();

        let mut writer: IndexWriter = index
            .writer_with_num_threads(options.writer_threads.max(1), options.writer_heap_bytes)?;

        let mut phrases = HashSet::new();
        let mut skipped_names = 0_usize;
        for record in store {
            phrases.clear();
            let mut doc = TantivyDocument::default();
            doc.add_u64(fields.record_id, record.id);
            for name in record.names() {
                let normalized = normalize(name);
                if normalized.is_empty() {
                    skipped_names += 1;
                    continue;
                }
                let phrase = normalized.phrase();
                if phrases.insert(phrase.clone()) {
                    doc.add_text(fields.full_name, &phrase);
                    doc.add_text(fields.tokens, &phrase);
                }
            }
            if phrases.is_empty() {
                trace!(id = record.id, "Record has no indexable name");
                continue;
            }
            writer.add_document(doc)?;
        }
        writer.commit()?;
        writer.wait_merging_threads()?;

        let gazetteer_index = Self::with_reader(index)?;
        info!(
            num_docs = gazetteer_index.num_docs(),
            skipped_names,
            elapsed = ?t_index.elapsed(),
            "Index creation complete"
        );
        Ok(gazetteer_index)
    }

    fn with_reader(index: Index) -> Result<Self> {
        let fields = IndexFields::from_schema(&index.schema())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self { reader, fields })
    }

    /// Number of indexed records.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Ids of every record with a name whose normalized phrase is exactly `phrase`.
    pub fn lookup_phrase(&self, phrase: &str) -> Result<Vec<u64>> {
        let term = Term::from_field_text(self.fields.full_name, phrase);
        self.collect_ids(&TermQuery::new(term, IndexRecordOption::Basic))
    }

    /// Ids of every record with at least one name containing any of `tokens`.
    pub fn lookup_any_token(&self, tokens: &[String]) -> Result<Vec<u64>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let terms = tokens
            .iter()
            .map(|token| Term::from_field_text(self.fields.tokens, token));
        self.collect_ids(&TermSetQuery::new(terms))
    }

    /// Ids of every record with a token within `distance` edits of one of `tokens`.
    ///
    /// Tokens shorter than `min_token_len` are ignored.
    pub fn lookup_fuzzy(
        &self,
        tokens: &[String],
        distance: u8,
        min_token_len: usize,
    ) -> Result<Vec<u64>> {
        let clauses: Vec<(Occur, Box<dyn Query>)> = tokens
            .iter()
            .filter(|token| token.chars().count() >= min_token_len)
            .map(|token| {
                let term = Term::from_field_text(self.fields.tokens, token);
                let query: Box<dyn Query> = Box::new(FuzzyTermQuery::new(term, distance, true));
                (Occur::Should, query)
            })
            .collect();
        if clauses.is_empty() {
            return Ok(Vec::new());
        }
        self.collect_ids(&BooleanQuery::new(clauses))
    }

    /// Run `query` and return the matching record ids in ascending order.
    ///
    /// Every match is collected; ranking and truncation happen in the resolver.
    fn collect_ids(&self, query: &dyn Query) -> Result<Vec<u64>> {
        let searcher = self.reader.searcher();
        let addresses = searcher.search(query, &DocSetCollector)?;

        // one record id column per segment, indexed by segment ordinal
        let id_columns = searcher
            .segment_readers()
            .iter()
            .map(|segment_reader| segment_reader.fast_fields().u64(RECORD_ID_FIELD))
            .collect::<tantivy::Result<Vec<_>>>()?;

        let ids: Vec<u64> = addresses
            .into_iter()
            .map(|address| {
                id_columns
                    .get(address.segment_ord as usize)
                    .and_then(|column| column.first(address.doc_id))
                    .ok_or_else(|| {
                        IndexError::from(anyhow::anyhow!(
                            "Indexed document {address:?} has no record id"
                        ))
                    })
            })
            .process_results(|ids| ids.sorted_unstable().dedup().collect())?;
        debug!(num_results = ids.len(), "Index lookup complete");
        Ok(ids)
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum IndexError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Tantivy error: {0}")]
        Tantivy(#[from] tantivy::TantivyError),
        #[error("Index holds {found} records but its manifest lists {expected}")]
        StaleIndex { expected: u64, found: u64 },
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, IndexError>;
}
