//! The gazetteer a caller queries, and the engine that swaps it.
//!
//! A [`Gazetteer`] is one immutable snapshot: a record store, the index built from it,
//! and the resolver settings. The [`GazetteerEngine`] is either Unbuilt (no snapshot,
//! every `resolve` fails with [`GazetteerError::NotReady`]) or Ready. A new snapshot is
//! opened completely before it replaces the current one, and each `resolve` call keeps
//! the snapshot it started with until it returns.
//!
//! ```no_run
//! use toponym::{GazetteerEngine, ResolverConfig};
//!
//! let engine = GazetteerEngine::new(ResolverConfig::default());
//! engine.load(std::path::Path::new("./toponym_data/index"))?;
//!
//! let results = engine.resolve(&["Paris", "Zürich"], 3)?;
//! for (name, locations) in results.iter() {
//!     println!("{name}: {} matches", locations.len());
//! }
//! # Ok::<(), toponym::error::GazetteerError>(())
//! ```
use std::path::Path;
use std::sync::Arc;

use ahash::AHashSet as HashSet;
use parking_lot::RwLock;
use toponym_data::RecordStore;
use tracing::{info, instrument, warn};

use crate::{
    assemble::{ResultSet, assemble},
    build::{IndexManifest, TANTIVY_DIR},
    config::{IndexOptions, ResolverConfig},
    error::{GazetteerError, Result},
    index::{GazetteerIndex, IndexError},
    search::{Query, Resolver, validate_queries},
};

/// A Ready snapshot: records, their index, and how to resolve against them.
#[derive(Debug)]
pub struct Gazetteer {
    store: RecordStore,
    index: GazetteerIndex,
    config: ResolverConfig,
    manifest: Option<IndexManifest>,
}

impl Gazetteer {
    /// Open an index directory written by [`build_index`](crate::build_index).
    pub fn open(dir: &Path) -> Result<Self> {
        Self::open_with_config(dir, ResolverConfig::default())
    }

    #[instrument(name = "Open gazetteer", skip(config), level = "info")]
    pub fn open_with_config(dir: &Path, config: ResolverConfig) -> Result<Self> {
        let t_open = std::time::Instant::now();
        let manifest = IndexManifest::read(dir)?;
        let store = RecordStore::load_parquet(dir, &manifest.store)?;
        let index = GazetteerIndex::open(&dir.join(TANTIVY_DIR))?;

        let found = index.num_docs();
        if found != manifest.indexed_docs {
            return Err(IndexError::StaleIndex {
                expected: manifest.indexed_docs,
                found,
            }
            .into());
        }

        info!(
            records = store.len(),
            indexed_docs = found,
            elapsed = ?t_open.elapsed(),
            "Gazetteer ready"
        );
        Ok(Self {
            store,
            index,
            config,
            manifest: Some(manifest),
        })
    }

    /// Index a store in memory.
    pub fn from_store(store: RecordStore, config: ResolverConfig) -> Result<Self> {
        Self::from_store_with_options(store, config, &IndexOptions::default())
    }

    pub fn from_store_with_options(
        store: RecordStore,
        config: ResolverConfig,
        options: &IndexOptions,
    ) -> Result<Self> {
        let index = GazetteerIndex::build_in_ram(&store, options)?;
        Ok(Self {
            store,
            index,
            config,
            manifest: None,
        })
    }

    /// Resolve every name with the same `count`.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S], count: usize) -> Result<ResultSet> {
        if count == 0 {
            return Err(GazetteerError::InvalidQuery(
                "count must be at least 1".to_string(),
            ));
        }
        let queries: Vec<Query> = names
            .iter()
            .map(|name| Query::new(name.as_ref(), count))
            .collect();
        self.resolve_queries(&queries)
    }

    /// Resolve every name with the configured `default_limit`.
    pub fn resolve_default<S: AsRef<str>>(&self, names: &[S]) -> Result<ResultSet> {
        self.resolve(names, self.config.default_limit)
    }

    /// Resolve each query with its own limit.
    ///
    /// The result has one entry per distinct name; a repeated name is answered with
    /// the limit of its first occurrence.
    #[instrument(name = "Resolve", skip_all, fields(queries = queries.len()), level = "debug")]
    pub fn resolve_queries(&self, queries: &[Query]) -> Result<ResultSet> {
        validate_queries(queries)?;

        let mut seen = HashSet::with_capacity(queries.len());
        let distinct: Vec<Query> = queries
            .iter()
            .filter(|query| seen.insert(query.name.as_str()))
            .cloned()
            .collect();

        let resolver = Resolver::new(&self.store, &self.index, &self.config);
        let resolved = resolver.resolve_all(&distinct)?;

        Ok(assemble(
            distinct
                .into_iter()
                .map(|query| query.name)
                .zip(resolved),
        ))
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn index(&self) -> &GazetteerIndex {
        &self.index
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Manifest of the directory this gazetteer was opened from; `None` when built in memory.
    pub fn manifest(&self) -> Option<&IndexManifest> {
        self.manifest.as_ref()
    }
}

/// Holder of the current [`Gazetteer`] snapshot.
#[derive(Debug, Default)]
pub struct GazetteerEngine {
    current: RwLock<Option<Arc<Gazetteer>>>,
    config: ResolverConfig,
}

impl GazetteerEngine {
    /// An Unbuilt engine. `config` applies to gazetteers it opens itself.
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            current: RwLock::new(None),
            config,
        }
    }

    /// A Ready engine serving `gazetteer`.
    pub fn with_gazetteer(gazetteer: Gazetteer) -> Self {
        let engine = Self::new(gazetteer.config().clone());
        engine.install(gazetteer);
        engine
    }

    /// Make `gazetteer` the current snapshot, returning the one it replaces.
    pub fn install(&self, gazetteer: Gazetteer) -> Option<Arc<Gazetteer>> {
        let next = Arc::new(gazetteer);
        let previous = self.current.write().replace(next);
        info!(replaced = previous.is_some(), "Gazetteer installed");
        previous
    }

    /// Open the index at `dir` and serve it.
    pub fn load(&self, dir: &Path) -> Result<()> {
        self.reload(dir)
    }

    /// Open the index at `dir` and swap it in. On failure the current snapshot, if any,
    /// keeps serving.
    #[instrument(name = "Reload gazetteer", skip(self), level = "info")]
    pub fn reload(&self, dir: &Path) -> Result<()> {
        match Gazetteer::open_with_config(dir, self.config.clone()) {
            Ok(gazetteer) => {
                self.install(gazetteer);
                Ok(())
            }
            Err(e) => {
                warn!(
                    error = %e,
                    ready = self.is_ready(),
                    "Reload failed, keeping current gazetteer"
                );
                Err(e)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    /// The current snapshot. Holding it keeps that snapshot alive across later swaps.
    pub fn snapshot(&self) -> Result<Arc<Gazetteer>> {
        self.current.read().clone().ok_or(GazetteerError::NotReady)
    }

    pub fn resolve<S: AsRef<str>>(&self, names: &[S], count: usize) -> Result<ResultSet> {
        self.snapshot()?.resolve(names, count)
    }

    pub fn resolve_default<S: AsRef<str>>(&self, names: &[S]) -> Result<ResultSet> {
        self.snapshot()?.resolve_default(names)
    }

    pub fn resolve_queries(&self, queries: &[Query]) -> Result<ResultSet> {
        self.snapshot()?.resolve_queries(queries)
    }
}
