//! Basic name resolution
//!
//! This example demonstrates the offline build and online query steps:
//! - Building an index directory from a GeoNames dump
//! - Loading it into an engine
//! - Resolving a batch of names and printing the JSON result
//!
//! Run with an existing index directory, or without arguments to build one from
//! generated sample data:
//!
//! ```text
//! cargo run --example basic_resolve -- ./toponym_data/index
//! ```

use std::path::PathBuf;

use toponym::{
    BuildOptions, GazetteerEngine, LoadOptions, ResolverConfig, ResultSet, build_index,
    toponym_data::{TestDataConfig, create_test_data},
    write_result_json,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    toponym::init_logging(tracing::Level::INFO)?;

    // Keeps the generated sample alive until the end of main
    let mut _sample_dir = None;
    let index_dir = if let Some(dir) = std::env::args().nth(1) {
        PathBuf::from(dir)
    } else {
        let (dump, admin1) = create_test_data(&TestDataConfig::sample())?;
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("index");
        let options =
            BuildOptions::default().load(LoadOptions::default().admin1_codes(admin1.path()));
        let summary = build_index(dump.path(), &dest, &options)?;
        println!(
            "Built index with {} records ({} skipped) in {:?}",
            summary.records, summary.skipped_rows, summary.elapsed
        );
        _sample_dir = Some(dir);
        dest
    };

    let engine = GazetteerEngine::new(ResolverConfig::default());
    engine.load(&index_dir)?;

    let names = ["Paris", "Sao Paulo", "NYC", "Springfield", "Zzqxnotaplace"];
    let results = engine.resolve(&names, 2)?;
    print_results(&results);

    println!("\nAs JSON:");
    write_result_json(&results, std::io::stdout().lock())?;
    println!();

    Ok(())
}

fn print_results(results: &ResultSet) {
    for (name, locations) in results.iter() {
        println!("{name}:");
        if locations.is_empty() {
            println!("  (no matches)");
        }
        for (i, location) in locations.iter().enumerate() {
            println!(
                "  {}. {} [{}] {}, {} - pop. {}",
                i + 1,
                location.name,
                location.geoname_id,
                location.admin1_name.as_deref().unwrap_or("-"),
                location.country_code.as_deref().unwrap_or("-"),
                location.population
            );
        }
    }
}
