//! Name resolution: candidate lookup, ranking and truncation.
//!
//! Lookup escalates through three strategies and stops at the first that yields
//! anything: the exact normalized phrase, the union of the query's tokens, then (when
//! enabled) edit-distance matches on those tokens.

mod rank;

pub use rank::{MatchQuality, MatchTier, RankedCandidate};
use rayon::prelude::*;
use toponym_data::{GeoRecord, RecordStore};
use tracing::{debug, instrument, trace};

use crate::{
    config::ResolverConfig,
    error::{GazetteerError, Result},
    index::GazetteerIndex,
    normalize::{NormalizedName, normalize},
};

/// One name to resolve and the most results wanted for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub name: String,
    pub limit: usize,
}

impl Query {
    pub fn new(name: impl Into<String>, limit: usize) -> Self {
        Self {
            name: name.into(),
            limit,
        }
    }
}

/// Check a batch before any lookup runs.
pub(crate) fn validate_queries(queries: &[Query]) -> Result<()> {
    if queries.is_empty() {
        return Err(GazetteerError::InvalidQuery("no names given".to_string()));
    }
    if let Some(query) = queries.iter().find(|query| query.limit == 0) {
        return Err(GazetteerError::InvalidQuery(format!(
            "limit for '{}' must be at least 1",
            query.name
        )));
    }
    Ok(())
}

/// Read-only view over one store, its index and a config.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Resolver<'a> {
    store: &'a RecordStore,
    index: &'a GazetteerIndex,
    config: &'a ResolverConfig,
}

impl<'a> Resolver<'a> {
    pub(crate) const fn new(
        store: &'a RecordStore,
        index: &'a GazetteerIndex,
        config: &'a ResolverConfig,
    ) -> Self {
        Self {
            store,
            index,
            config,
        }
    }

    /// Resolve every query, keeping input order. Queries never see each other.
    #[instrument(
        name = "Resolve batch",
        skip_all,
        fields(queries = queries.len()),
        level = "debug"
    )]
    pub(crate) fn resolve_all(&self, queries: &[Query]) -> Result<Vec<Vec<&'a GeoRecord>>> {
        if self.config.parallel && queries.len() > 1 {
            queries
                .par_iter()
                .map(|query| self.resolve_one(&query.name, query.limit))
                .collect()
        } else {
            queries
                .iter()
                .map(|query| self.resolve_one(&query.name, query.limit))
                .collect()
        }
    }

    /// Best `limit` records for `raw_name`, best first.
    #[instrument(name = "Resolve name", skip(self), level = "trace")]
    pub(crate) fn resolve_one(&self, raw_name: &str, limit: usize) -> Result<Vec<&'a GeoRecord>> {
        let query = normalize(raw_name);
        if query.is_empty() {
            trace!("Name normalizes to nothing");
            return Ok(Vec::new());
        }

        let candidates = self.candidates(&query)?;
        let ranked = rank::rank_and_truncate(candidates, limit);
        debug!(
            query = %query,
            results = ranked.len(),
            top = ?ranked.first().map(|c| c.record.id),
            "Resolved name"
        );
        Ok(ranked.into_iter().map(|candidate| candidate.record).collect())
    }

    fn candidates(&self, query: &NormalizedName) -> Result<Vec<RankedCandidate<'a>>> {
        let exact = self.index.lookup_phrase(&query.phrase())?;
        if !exact.is_empty() {
            return self.grade(&exact, query, MatchTier::Exact);
        }

        let partial = self.index.lookup_any_token(query.tokens())?;
        if !partial.is_empty() {
            return self.grade(&partial, query, MatchTier::Partial);
        }

        if self.config.fuzzy_fallback {
            // Tantivy's Levenshtein automata only go up to distance 2
            let fuzzy = self.index.lookup_fuzzy(
                query.tokens(),
                self.config.fuzzy_distance.clamp(1, 2),
                self.config.fuzzy_min_token_len,
            )?;
            return self.grade(&fuzzy, query, MatchTier::Fuzzy);
        }
        Ok(Vec::new())
    }

    fn grade(
        &self,
        ids: &[u64],
        query: &NormalizedName,
        tier: MatchTier,
    ) -> Result<Vec<RankedCandidate<'a>>> {
        trace!(candidates = ids.len(), tier = ?tier, "Grading candidates");
        ids.iter()
            .map(|&id| {
                let record = self.store.get(id)?;
                Ok(RankedCandidate::new(
                    record,
                    MatchQuality::grade(record, query, tier),
                ))
            })
            .collect()
    }
}
