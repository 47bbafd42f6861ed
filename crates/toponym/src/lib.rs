//! Toponym - resolve place names against the GeoNames gazetteer
//!
//! Toponym maps free-text place names ("Paris", "Sao Paulo", "NYC") to ranked GeoNames
//! records. An index is built offline from a GeoNames dump, then opened by a
//! [`GazetteerEngine`] that answers batches of names with the best `count` matches each.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use toponym::{BuildOptions, GazetteerEngine, ResolverConfig, build_index};
//!
//! // Offline: dump -> index directory
//! build_index(
//!     Path::new("./toponym_data/cities15000.txt"),
//!     Path::new("./toponym_data/index"),
//!     &BuildOptions::default(),
//! )?;
//!
//! // Online: open and query
//! let engine = GazetteerEngine::new(ResolverConfig::default());
//! engine.load(Path::new("./toponym_data/index"))?;
//!
//! let results = engine.resolve(&["Paris", "London"], 2)?;
//! for location in results.get("Paris").unwrap_or_default() {
//!     println!("{} ({:?}) pop. {}", location.name, location.country_code, location.population);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Ranking
//!
//! Candidates that match a name exactly (after folding case and diacritics) always beat
//! partial matches. Within a tier, better token coverage and string similarity come
//! first, then larger population, then feature importance (country over region over
//! city), and finally the lower GeoNames id.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod assemble;
pub mod build;
pub mod config;
mod core;
pub mod error;
pub mod index;
pub mod normalize;
pub mod search;

pub use crate::core::{Gazetteer, GazetteerEngine};
pub use assemble::{Location, ResultSet, assemble, write_result_json};
pub use build::{BuildSummary, IndexManifest, build_index};
pub use config::{
    BuildOptions, INDEX_DIR_ENV, IndexOptions, ResolverConfig, ResolverConfigBuilder,
    index_dir_from_env,
};
pub use index::GazetteerIndex;
pub use normalize::{NormalizedName, normalize};
pub use search::{MatchTier, Query};
pub use toponym_data;
pub use toponym_data::{Feature, FeatureClass, GeoRecord, LoadOptions, RecordStore};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the toponym library.
///
/// `RUST_LOG` takes precedence over `level` when set. Safe to call more than once;
/// only the first call installs a subscriber.
///
/// ```rust
/// use toponym::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), toponym::error::GazetteerError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::GazetteerError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("tantivy=warn".parse()?)
            .add_directive("hyper_util=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use toponym_data::{TestDataConfig, create_test_data};

    fn setup_test_env() {
        let _ = init_logging(tracing::Level::WARN);
    }

    fn sample_gazetteer() -> Gazetteer {
        let (dump, admin1) = create_test_data(&TestDataConfig::sample()).unwrap();
        let options = LoadOptions::default().admin1_codes(admin1.path());
        let store = RecordStore::load(dump.path(), &options).unwrap();
        Gazetteer::from_store(store, ResolverConfig::default()).unwrap()
    }

    #[test]
    fn test_init_logging_twice() {
        setup_test_env();
        assert!(init_logging(tracing::Level::DEBUG).is_ok());
    }

    #[test]
    fn test_basic_resolve() {
        setup_test_env();
        let gazetteer = sample_gazetteer();

        let results = gazetteer.resolve(&["London", "Tokyo"], 1).unwrap();
        assert_eq!(results.get("London").unwrap()[0].geoname_id, 2643743);
        assert_eq!(results.get("Tokyo").unwrap()[0].geoname_id, 1850147);
    }

    #[test]
    fn test_alternate_name_resolves() {
        setup_test_env();
        let gazetteer = sample_gazetteer();

        let results = gazetteer.resolve(&["NYC", "PDX"], 1).unwrap();
        assert_eq!(results.get("NYC").unwrap()[0].geoname_id, 5128581);
        assert_eq!(results.get("PDX").unwrap()[0].geoname_id, 5746545);
    }

    #[test]
    fn test_admin1_names_are_attached() {
        setup_test_env();
        let gazetteer = sample_gazetteer();

        let results = gazetteer.resolve(&["Paris"], 1).unwrap();
        let paris = &results.get("Paris").unwrap()[0];
        assert_eq!(paris.admin1_name.as_deref(), Some("Île-de-France"));
    }
}
