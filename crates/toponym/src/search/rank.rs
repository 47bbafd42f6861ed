use std::cmp::{Ordering, Reverse};

use rapidfuzz::distance::levenshtein;
use toponym_data::GeoRecord;

use crate::normalize::{NormalizedName, normalize};

/// How a candidate was found. Later variants rank higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    /// Within edit distance of a query token.
    Fuzzy,
    /// Shares at least one token with the query.
    Partial,
    /// One of its names normalizes to exactly the query.
    Exact,
}

/// Match quality of a candidate, compared field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchQuality {
    pub tier: MatchTier,
    /// Distinct query tokens present in the best matching name.
    pub coverage: usize,
    /// Levenshtein similarity of the best matching name to the query, in thousandths.
    pub similarity: u16,
}

impl MatchQuality {
    const EXACT_SIMILARITY: u16 = 1000;

    /// Grade `record` against `query`, keeping the best of its names.
    pub fn grade(record: &GeoRecord, query: &NormalizedName, tier: MatchTier) -> Self {
        if tier == MatchTier::Exact {
            return Self {
                tier,
                coverage: query.len(),
                similarity: Self::EXACT_SIMILARITY,
            };
        }

        let query_phrase = query.phrase();
        let mut query_tokens = query.tokens().to_vec();
        query_tokens.sort_unstable();
        query_tokens.dedup();

        record
            .names()
            .map(normalize)
            .filter(|name| !name.is_empty())
            .map(|name| {
                let coverage = query_tokens
                    .iter()
                    .filter(|token| name.tokens().contains(token))
                    .count();
                let similarity =
                    levenshtein::normalized_similarity(query_phrase.chars(), name.phrase().chars());
                Self {
                    tier,
                    coverage,
                    similarity: (similarity * 1000.0).round() as u16,
                }
            })
            .max()
            .unwrap_or(Self {
                tier,
                coverage: 0,
                similarity: 0,
            })
    }
}

/// A candidate record together with how well it matched.
#[derive(Debug, Clone, Copy)]
pub struct RankedCandidate<'a> {
    pub record: &'a GeoRecord,
    pub quality: MatchQuality,
}

impl<'a> RankedCandidate<'a> {
    pub const fn new(record: &'a GeoRecord, quality: MatchQuality) -> Self {
        Self { record, quality }
    }

    /// Composite sort key; greater ranks first. The reversed id makes the order total,
    /// with the lower id winning a full tie.
    fn rank_key(&self) -> (MatchQuality, u64, u8, Reverse<u64>) {
        (
            self.quality,
            self.record.population,
            self.record.feature.priority(),
            Reverse(self.record.id),
        )
    }
}

impl PartialEq for RankedCandidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.rank_key() == other.rank_key()
    }
}

impl Eq for RankedCandidate<'_> {}

impl PartialOrd for RankedCandidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedCandidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_key().cmp(&other.rank_key())
    }
}

/// Order candidates best first and keep at most `limit`.
pub fn rank_and_truncate<'a>(
    mut candidates: Vec<RankedCandidate<'a>>,
    limit: usize,
) -> Vec<RankedCandidate<'a>> {
    candidates.sort_unstable_by(|a, b| b.cmp(a));
    candidates.truncate(limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use toponym_data::{Feature, FeatureClass};

    fn record(id: u64, name: &str, population: u64, code: &str) -> GeoRecord {
        GeoRecord {
            id,
            name: name.to_string(),
            ascii_name: None,
            alternate_names: Vec::new(),
            latitude: 0.0,
            longitude: 0.0,
            feature: Feature::new(FeatureClass::from_code(&code[..1]), Some(&code[2..])),
            population,
            country_code: None,
            admin1_code: None,
            admin2_code: None,
            admin1_name: None,
        }
    }

    fn exact() -> MatchQuality {
        MatchQuality {
            tier: MatchTier::Exact,
            coverage: 1,
            similarity: 1000,
        }
    }

    fn ids(ranked: &[RankedCandidate<'_>]) -> Vec<u64> {
        ranked.iter().map(|c| c.record.id).collect()
    }

    #[test]
    fn test_population_breaks_quality_ties() {
        let big = record(2, "Paris", 2_140_000, "P.PPLC");
        let small = record(1, "Paris", 25_000, "P.PPLA2");
        let ranked = rank_and_truncate(
            vec![RankedCandidate::new(&small, exact()), RankedCandidate::new(&big, exact())],
            2,
        );
        assert_eq!(ids(&ranked), [2, 1]);
    }

    #[test]
    fn test_tier_outranks_population() {
        let partial_big = record(1, "Paris Las Vegas", 10_000_000, "P.PPL");
        let exact_small = record(2, "Paris", 10, "P.PPL");
        let query = normalize("Paris");
        let ranked = rank_and_truncate(
            vec![
                RankedCandidate::new(
                    &partial_big,
                    MatchQuality::grade(&partial_big, &query, MatchTier::Partial),
                ),
                RankedCandidate::new(&exact_small, exact()),
            ],
            5,
        );
        assert_eq!(ids(&ranked), [2, 1]);
    }

    #[test]
    fn test_feature_priority_then_id_break_remaining_ties() {
        let admin = record(1, "Springfield", 1000, "A.ADM2");
        let town_high_id = record(9, "Springfield", 1000, "P.PPL");
        let town_low_id = record(3, "Springfield", 1000, "P.PPL");
        let ranked = rank_and_truncate(
            vec![
                RankedCandidate::new(&admin, exact()),
                RankedCandidate::new(&town_high_id, exact()),
                RankedCandidate::new(&town_low_id, exact()),
            ],
            3,
        );
        assert_eq!(ids(&ranked), [3, 9, 1]);
    }

    #[test]
    fn test_truncation_is_a_prefix_of_a_longer_ranking() {
        let records: Vec<_> = (1..=6)
            .map(|id| record(id, "Same", 100 * (id % 3), "P.PPL"))
            .collect();
        let candidates: Vec<_> = records.iter().map(|r| RankedCandidate::new(r, exact())).collect();

        let full = ids(&rank_and_truncate(candidates.clone(), 6));
        for k in 1..=6 {
            assert_eq!(ids(&rank_and_truncate(candidates.clone(), k)), full[..k]);
        }
    }

    #[test]
    fn test_grade_prefers_more_covered_tokens() {
        let query = normalize("new york");
        let one_token = record(1, "York", 0, "P.PPL");
        let two_tokens = record(2, "New York Mills", 0, "P.PPL");

        let a = MatchQuality::grade(&one_token, &query, MatchTier::Partial);
        let b = MatchQuality::grade(&two_tokens, &query, MatchTier::Partial);
        assert_eq!(a.coverage, 1);
        assert_eq!(b.coverage, 2);
        assert!(b > a);
    }
}
