use std::path::PathBuf;

use toponym_data::LoadOptions;
use tracing::debug;

use crate::error::GazetteerError;

/// Environment variable naming the directory of a built index.
pub const INDEX_DIR_ENV: &str = "TOPONYM_INDEX_DIR";

/// How names are matched and ranked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Limit used by [`Gazetteer::resolve_default`](crate::Gazetteer::resolve_default).
    pub default_limit: usize,
    /// Fall back to edit-distance matching when neither the phrase nor any token matches.
    pub fuzzy_fallback: bool,
    /// Edit distance for fuzzy matching, 1 or 2. Other values are clamped into range.
    pub fuzzy_distance: u8,
    /// Tokens shorter than this never take part in fuzzy matching.
    pub fuzzy_min_token_len: usize,
    /// Resolve the names of a batch on the rayon pool.
    pub parallel: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_limit: 1,
            fuzzy_fallback: false,
            fuzzy_distance: 1,
            fuzzy_min_token_len: 4,
            parallel: true,
        }
    }
}

impl ResolverConfig {
    pub fn builder() -> ResolverConfigBuilder {
        ResolverConfigBuilder::new()
    }
}

/// Builder for [`ResolverConfig`].
#[derive(Debug, Clone, Default)]
pub struct ResolverConfigBuilder {
    config: ResolverConfig,
}

impl ResolverConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact and token matches only.
    pub fn strict() -> Self {
        let mut builder = Self::new();
        builder.config.fuzzy_fallback = false;
        builder
    }

    /// Also try misspellings, with a lower bar for which tokens qualify.
    pub fn lenient() -> Self {
        let mut builder = Self::new();
        builder.config.fuzzy_fallback = true;
        builder.config.fuzzy_distance = 2;
        builder.config.fuzzy_min_token_len = 3;
        builder
    }

    pub fn default_limit(mut self, limit: usize) -> Self {
        self.config.default_limit = limit;
        self
    }

    pub fn fuzzy_fallback(mut self, enabled: bool) -> Self {
        self.config.fuzzy_fallback = enabled;
        self
    }

    /// Edit distance for fuzzy matching, clamped to what the index supports (1..=2).
    pub fn fuzzy_distance(mut self, distance: u8) -> Self {
        self.config.fuzzy_distance = distance.clamp(1, 2);
        self
    }

    pub fn fuzzy_min_token_len(mut self, len: usize) -> Self {
        self.config.fuzzy_min_token_len = len;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn build(self) -> Result<ResolverConfig, GazetteerError> {
        if self.config.default_limit == 0 {
            return Err(GazetteerError::Config(
                "default_limit must be at least 1".to_string(),
            ));
        }
        Ok(self.config)
    }
}

/// Tantivy writer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    pub writer_heap_bytes: usize,
    /// One thread keeps segment layout (and so doc order) reproducible.
    pub writer_threads: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            writer_heap_bytes: 100_000_000,
            writer_threads: 1,
        }
    }
}

/// Everything [`build_index`](crate::build_index) needs besides the paths.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub load: LoadOptions,
    pub index: IndexOptions,
}

impl BuildOptions {
    pub fn load(mut self, load: LoadOptions) -> Self {
        self.load = load;
        self
    }

    pub fn index(mut self, index: IndexOptions) -> Self {
        self.index = index;
        self
    }
}

/// Directory of the index to serve, from `TOPONYM_INDEX_DIR`.
///
/// With the `system-dirs` feature an unset variable falls back to `index/` under the
/// platform data directory.
pub fn index_dir_from_env() -> Result<PathBuf, GazetteerError> {
    if let Some(dir) = std::env::var_os(INDEX_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    #[cfg(feature = "system-dirs")]
    let fallback = Some(toponym_data::get_data_dir().join("index"));
    #[cfg(not(feature = "system-dirs"))]
    let fallback: Option<PathBuf> = None;

    debug!(env = INDEX_DIR_ENV, fallback = ?fallback, "Index directory not set");
    fallback.ok_or_else(|| GazetteerError::Config(format!("{INDEX_DIR_ENV} is not set")))
}
