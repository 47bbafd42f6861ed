//! Integration tests for toponym name resolution
//!
//! These run the public API end to end: a generated GeoNames dump is built into an index
//! directory, opened by an engine, and queried.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use toponym::{
    BuildOptions, Gazetteer, GazetteerEngine, LoadOptions, Query, ResolverConfig,
    ResolverConfigBuilder, ResultSet, build_index, error::GazetteerError, index::IndexError,
    toponym_data::{TestDataConfig, create_test_data},
    write_result_json,
};

fn setup_test_env() {
    let _ = toponym::init_logging(tracing::Level::WARN);
}

/// Build the sample dump into `<tempdir>/index`.
fn built_index() -> (TempDir, std::path::PathBuf) {
    setup_test_env();
    let (dump, admin1) =
        create_test_data(&TestDataConfig::sample()).expect("Should write test data");
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let dest = dir.path().join("index");

    let options = BuildOptions::default().load(LoadOptions::default().admin1_codes(admin1.path()));
    build_index(dump.path(), &dest, &options).expect("Should build index");
    (dir, dest)
}

fn ready_engine(dest: &Path) -> GazetteerEngine {
    let engine = GazetteerEngine::new(ResolverConfig::default());
    engine.load(dest).expect("Should load index");
    engine
}

fn ids(results: &ResultSet, name: &str) -> Vec<u64> {
    results
        .get(name)
        .unwrap_or_else(|| panic!("No entry for '{name}'"))
        .iter()
        .map(|location| location.geoname_id)
        .collect()
}

#[test]
fn test_paris_by_population() {
    let (_dir, dest) = built_index();
    let engine = ready_engine(&dest);

    let results = engine.resolve(&["Paris"], 2).expect("Resolve should work");
    assert_eq!(ids(&results, "Paris"), [2988507, 4717560]);

    let paris = &results.get("Paris").unwrap()[0];
    assert_eq!(paris.country_code.as_deref(), Some("FR"));
    assert_eq!(paris.feature_code.as_deref(), Some("PPLC"));
    assert_eq!(paris.admin1_name.as_deref(), Some("Île-de-France"));
}

#[test]
fn test_unknown_and_empty_names_get_empty_entries() {
    let (_dir, dest) = built_index();
    let engine = ready_engine(&dest);

    let results = engine
        .resolve(&["Zzqxnotaplace", "", "  ,  "], 5)
        .expect("Resolve should work");
    assert_eq!(results.len(), 3);
    for name in ["Zzqxnotaplace", "", "  ,  "] {
        assert!(results.get(name).unwrap().is_empty(), "'{name}' should have no matches");
    }
}

#[test]
fn test_engine_not_ready_before_load() {
    setup_test_env();
    let engine = GazetteerEngine::default();

    let err = engine.resolve(&["Paris"], 1).unwrap_err();
    assert!(matches!(err, GazetteerError::NotReady));
    assert!(err.is_retryable());
}

#[test]
fn test_invalid_requests() {
    let (_dir, dest) = built_index();
    let engine = ready_engine(&dest);

    assert!(matches!(
        engine.resolve(&["Paris"], 0),
        Err(GazetteerError::InvalidQuery(_))
    ));
    let no_names: Vec<String> = Vec::new();
    assert!(matches!(
        engine.resolve(&no_names, 3),
        Err(GazetteerError::InvalidQuery(_))
    ));
}

#[test]
fn test_diacritics_and_case_are_folded() {
    let (_dir, dest) = built_index();
    let engine = ready_engine(&dest);

    let results = engine
        .resolve(&["Sao Paulo", "São Paulo", "zurich", "ZÜRICH", "saint etienne"], 1)
        .expect("Resolve should work");
    assert_eq!(ids(&results, "Sao Paulo"), [3448439]);
    assert_eq!(ids(&results, "São Paulo"), [3448439]);
    assert_eq!(ids(&results, "zurich"), [2657896]);
    assert_eq!(ids(&results, "ZÜRICH"), [2657896]);
    assert_eq!(ids(&results, "saint etienne"), [2980291]);
}

#[test]
fn test_larger_count_extends_smaller_one() {
    let (_dir, dest) = built_index();
    let engine = ready_engine(&dest);
    let names = ["Springfield", "London", "New York", "Portland", "San"];

    for name in names {
        let mut previous: Vec<u64> = Vec::new();
        for count in 1..=5 {
            let results = engine.resolve(&[name], count).expect("Resolve should work");
            let current = ids(&results, name);
            assert!(current.len() <= count);
            assert!(
                current.starts_with(&previous),
                "'{name}': {current:?} should extend {previous:?}"
            );
            previous = current;
        }
    }
}

#[test]
fn test_repeated_calls_agree() {
    let (_dir, dest) = built_index();
    let engine = ready_engine(&dest);
    let names = ["Paris", "New York", "Tokio", "Harbour City"];

    let first = engine.resolve(&names, 3).expect("Resolve should work");
    let second = engine.resolve(&names, 3).expect("Resolve should work");
    assert_eq!(first, second);
}

#[test]
fn test_names_in_a_batch_are_independent() {
    let (_dir, dest) = built_index();
    let engine = ready_engine(&dest);

    let batch = engine
        .resolve(&["Paris", "London", "Berlin"], 2)
        .expect("Resolve should work");
    for name in ["Paris", "London", "Berlin"] {
        let alone = engine.resolve(&[name], 2).expect("Resolve should work");
        assert_eq!(batch.get(name), alone.get(name));
    }
}

#[test]
fn test_every_record_found_by_its_name() {
    let (_dir, dest) = built_index();
    let engine = ready_engine(&dest);
    let gazetteer = engine.snapshot().expect("Engine should be ready");
    let count = gazetteer.store().len();

    for record in gazetteer.store().iter() {
        let results = gazetteer
            .resolve(&[record.name.as_str()], count)
            .expect("Resolve should work");
        assert!(
            ids(&results, &record.name).contains(&record.id),
            "'{}' should resolve to {}",
            record.name,
            record.id
        );
    }
}

#[test]
fn test_per_name_limits() {
    let (_dir, dest) = built_index();
    let engine = ready_engine(&dest);

    let results = engine
        .resolve_queries(&[Query::new("Springfield", 1), Query::new("Portland", 2)])
        .expect("Resolve should work");
    assert_eq!(ids(&results, "Springfield"), [4951788]);
    assert_eq!(ids(&results, "Portland"), [5746545, 4975802]);
}

#[test]
fn test_fuzzy_matching_with_lenient_config() {
    let (_dir, dest) = built_index();
    let strict = ready_engine(&dest);
    let lenient = GazetteerEngine::new(
        ResolverConfigBuilder::lenient()
            .build()
            .expect("Lenient config is valid"),
    );
    lenient.load(&dest).expect("Should load index");

    let typo = ["Portlnad"];
    assert!(strict.resolve(&typo, 1).unwrap().get("Portlnad").unwrap().is_empty());
    assert_eq!(ids(&lenient.resolve(&typo, 1).unwrap(), "Portlnad"), [5746545]);
}

#[test]
fn test_failed_reload_keeps_serving() {
    let (dir, dest) = built_index();
    let engine = ready_engine(&dest);
    let before = engine.resolve(&["Tokyo"], 1).expect("Resolve should work");

    let missing = dir.path().join("missing");
    assert!(engine.reload(&missing).is_err());

    assert!(engine.is_ready());
    assert_eq!(engine.resolve(&["Tokyo"], 1).unwrap(), before);
}

#[test]
fn test_reload_during_resolves() {
    let (_dir, dest) = built_index();
    let engine = Arc::new(ready_engine(&dest));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for _ in 0..20 {
                    let results = engine.resolve(&["Paris"], 2).expect("Resolve should work");
                    assert_eq!(ids(&results, "Paris"), [2988507, 4717560]);
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..3 {
                engine.reload(&dest).expect("Reload should work");
            }
        });
    });
}

#[test]
fn test_stale_index_is_rejected() {
    let (_dir, dest) = built_index();
    let manifest_path = dest.join(toponym::build::MANIFEST_FILE);

    let mut manifest: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&manifest_path).unwrap()).unwrap();
    manifest["indexed_docs"] = serde_json::json!(1);
    std::fs::write(&manifest_path, serde_json::to_vec(&manifest).unwrap()).unwrap();

    let err = Gazetteer::open(&dest).unwrap_err();
    assert!(matches!(
        err,
        GazetteerError::Index(IndexError::StaleIndex { expected: 1, .. })
    ));
}

#[test]
fn test_result_json_round_trip() {
    let (_dir, dest) = built_index();
    let engine = ready_engine(&dest);
    let results = engine
        .resolve(&["New York", "Zzqxnotaplace", "Sydney"], 2)
        .expect("Resolve should work");

    let mut buffer = Vec::new();
    write_result_json(&results, &mut buffer).expect("Should write JSON");
    let parsed: ResultSet = serde_json::from_slice(&buffer).expect("Should parse JSON");

    assert_eq!(parsed, results);
    assert_eq!(parsed.names().collect::<Vec<_>>(), ["New York", "Zzqxnotaplace", "Sydney"]);
}
