//! Bounded consistency index: `clamp(1 − σ/μ, 0, 1)` over one metric.

use serde::{Deserialize, Serialize};

use crate::clubs::club_sort_key;
use crate::models::{Metric, SessionId, ShotRecord};
use crate::stats::{mean, population_std_dev};

pub const DEFAULT_MIN_SAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    pub min_samples: usize,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InsufficientReason {
    TooFewSamples { required: usize },
    /// CV is undefined for a mean `<= 0`.
    NonPositiveMean,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConsistencyOutcome {
    Index {
        /// In `[0, 1]`.
        value: f64,
        mean: f64,
        std_dev: f64,
        cv: f64,
        samples: usize,
    },
    InsufficientData {
        samples: usize,
        #[serde(flatten)]
        reason: InsufficientReason,
    },
}

impl ConsistencyOutcome {
    pub fn index(&self) -> Option<f64> {
        match self {
            ConsistencyOutcome::Index { value, .. } => Some(*value),
            ConsistencyOutcome::InsufficientData { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClubConsistency {
    pub club: String,
    #[serde(flatten)]
    pub outcome: ConsistencyOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClubSessionConsistency {
    pub club: String,
    pub session_id: SessionId,
    #[serde(flatten)]
    pub outcome: ConsistencyOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyReport {
    pub metric: Metric,
    /// In bag order.
    pub by_club: Vec<ClubConsistency>,
    /// Bag order, then sessions in order of first appearance.
    pub by_club_session: Vec<ClubSessionConsistency>,
}

/// Consistency index of a set of values.
pub fn consistency_index(values: &[f64], config: &ConsistencyConfig) -> ConsistencyOutcome {
    let samples = values.len();
    if samples < config.min_samples.max(1) {
        return ConsistencyOutcome::InsufficientData {
            samples,
            reason: InsufficientReason::TooFewSamples {
                required: config.min_samples,
            },
        };
    }
    let (Some(m), Some(sd)) = (mean(values), population_std_dev(values)) else {
        return ConsistencyOutcome::InsufficientData {
            samples,
            reason: InsufficientReason::TooFewSamples {
                required: config.min_samples,
            },
        };
    };
    if m <= 0.0 {
        return ConsistencyOutcome::InsufficientData {
            samples,
            reason: InsufficientReason::NonPositiveMean,
        };
    }
    let cv = sd / m;
    ConsistencyOutcome::Index {
        value: (1.0 - cv).clamp(0.0, 1.0),
        mean: m,
        std_dev: sd,
        cv,
        samples,
    }
}

/// Per-club and per-(club, session) consistency with the default sample floor.
pub fn compute_consistency(records: &[ShotRecord], metric: Metric) -> ConsistencyReport {
    compute_consistency_with(records, metric, &ConsistencyConfig::default())
}

pub fn compute_consistency_with(
    records: &[ShotRecord],
    metric: Metric,
    config: &ConsistencyConfig,
) -> ConsistencyReport {
    // Groups keep first-appearance order; clubs are sorted afterwards.
    let mut clubs: Vec<(String, Vec<f64>)> = Vec::new();
    let mut pairs: Vec<(String, SessionId, Vec<f64>)> = Vec::new();

    for record in records {
        let club_pos = match clubs.iter().position(|(c, _)| *c == record.club) {
            Some(i) => i,
            None => {
                clubs.push((record.club.clone(), Vec::new()));
                clubs.len() - 1
            }
        };
        let pair_pos = match pairs
            .iter()
            .position(|(c, s, _)| *c == record.club && *s == record.session_id)
        {
            Some(i) => i,
            None => {
                pairs.push((record.club.clone(), record.session_id.clone(), Vec::new()));
                pairs.len() - 1
            }
        };
        // Unrecorded values are dropped, but the group still exists.
        if let Some(v) = record.metric(metric) {
            clubs[club_pos].1.push(v);
            pairs[pair_pos].2.push(v);
        }
    }

    clubs.sort_by_cached_key(|(club, _)| club_sort_key(club));
    pairs.sort_by_cached_key(|(club, _, _)| club_sort_key(club));

    ConsistencyReport {
        metric,
        by_club: clubs
            .into_iter()
            .map(|(club, values)| ClubConsistency {
                outcome: consistency_index(&values, config),
                club,
            })
            .collect(),
        by_club_session: pairs
            .into_iter()
            .map(|(club, session_id, values)| ClubSessionConsistency {
                outcome: consistency_index(&values, config),
                club,
                session_id,
            })
            .collect(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::shot;

    // ── consistency_index ────────────────────────────────────────────────────

    #[test]
    fn test_index_of_known_values() {
        // mean 5, population σ 2 → cv 0.4 → index 0.6
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        match consistency_index(&values, &ConsistencyConfig::default()) {
            ConsistencyOutcome::Index {
                value, cv, samples, ..
            } => {
                assert!((cv - 0.4).abs() < 1e-12);
                assert!((value - 0.6).abs() < 1e-12);
                assert_eq!(samples, 8);
            }
            other => panic!("expected index, got {other:?}"),
        }
    }

    #[test]
    fn test_identical_values_are_perfectly_consistent() {
        let outcome = consistency_index(&[150.0, 150.0, 150.0], &ConsistencyConfig::default());
        assert_eq!(outcome.index(), Some(1.0));
    }

    #[test]
    fn test_index_clamped_at_zero() {
        // σ larger than μ
        let outcome = consistency_index(&[1.0, 1.0, 100.0], &ConsistencyConfig::default());
        assert_eq!(outcome.index(), Some(0.0));
    }

    #[test]
    fn test_too_few_samples() {
        let outcome = consistency_index(&[150.0, 152.0], &ConsistencyConfig::default());
        assert_eq!(
            outcome,
            ConsistencyOutcome::InsufficientData {
                samples: 2,
                reason: InsufficientReason::TooFewSamples { required: 3 },
            }
        );
    }

    #[test]
    fn test_non_positive_mean() {
        let outcome = consistency_index(&[-2.0, 0.0, 2.0], &ConsistencyConfig::default());
        assert!(matches!(
            outcome,
            ConsistencyOutcome::InsufficientData {
                reason: InsufficientReason::NonPositiveMean,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_min_samples_still_needs_one_value() {
        let config = ConsistencyConfig { min_samples: 0 };
        assert!(consistency_index(&[], &config).index().is_none());
    }

    // ── compute_consistency ──────────────────────────────────────────────────

    #[test]
    fn test_two_shots_is_insufficient() {
        let records = vec![shot("s1", 0, "7 Iron", 150.0), shot("s1", 1, "7 Iron", 152.0)];
        let report = compute_consistency(&records, Metric::CarryDistance);
        assert_eq!(report.by_club.len(), 1);
        assert!(report.by_club[0].outcome.index().is_none());
        assert!(report.by_club_session[0].outcome.index().is_none());
    }

    #[test]
    fn test_per_club_and_per_session_are_independent() {
        let records = vec![
            shot("s1", 0, "7 Iron", 150.0),
            shot("s1", 1, "7 Iron", 150.0),
            shot("s1", 2, "7 Iron", 150.0),
            shot("s2", 0, "7 Iron", 160.0),
            shot("s2", 1, "7 Iron", 140.0),
            shot("s1", 3, "Driver", 230.0),
        ];
        let report = compute_consistency(&records, Metric::CarryDistance);

        let clubs: Vec<&str> = report.by_club.iter().map(|c| c.club.as_str()).collect();
        assert_eq!(clubs, vec!["Driver", "7 Iron"]);

        let iron_s1 = report
            .by_club_session
            .iter()
            .find(|r| r.club == "7 Iron" && r.session_id == "s1")
            .unwrap();
        assert_eq!(iron_s1.outcome.index(), Some(1.0));

        let iron_s2 = report
            .by_club_session
            .iter()
            .find(|r| r.club == "7 Iron" && r.session_id == "s2")
            .unwrap();
        assert!(iron_s2.outcome.index().is_none());

        // Pooled over both sessions: five samples, some spread.
        let pooled = report.by_club[1].outcome.index().unwrap();
        assert!(pooled > 0.9 && pooled < 1.0);
    }

    #[test]
    fn test_unrecorded_metric_values_are_dropped() {
        let records = vec![
            shot("s1", 0, "7 Iron", 150.0),
            shot("s1", 1, "7 Iron", 151.0),
            shot("s1", 2, "7 Iron", 152.0),
        ];
        let report = compute_consistency(&records, Metric::ApexHeight);
        assert_eq!(
            report.by_club[0].outcome,
            ConsistencyOutcome::InsufficientData {
                samples: 0,
                reason: InsufficientReason::TooFewSamples { required: 3 },
            }
        );
    }

    #[test]
    fn test_empty_input() {
        let report = compute_consistency(&[], Metric::CarryDistance);
        assert!(report.by_club.is_empty());
        assert!(report.by_club_session.is_empty());
    }

    #[test]
    fn test_serializes_with_status_tag() {
        let records = vec![shot("s1", 0, "7 Iron", 150.0)];
        let json = serde_json::to_value(compute_consistency(&records, Metric::CarryDistance))
            .unwrap();
        assert_eq!(json["metric"], "carry_distance");
        assert_eq!(json["by_club"][0]["status"], "insufficient_data");
        assert_eq!(json["by_club"][0]["reason"], "too_few_samples");
        assert_eq!(json["by_club"][0]["required"], 3);
    }
}
