//! Smash-factor efficiency against each club's ideal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clubs::{club_sort_key, ClubProfiles};
use crate::models::{ShotKey, ShotRecord};
use crate::stats::mean;

/// Upper bound applied to `smash_factor / ideal`.
pub const DEFAULT_MAX_EFFICIENCY: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyConfig {
    pub max_ratio: f64,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        Self {
            max_ratio: DEFAULT_MAX_EFFICIENCY,
        }
    }
}

/// Why no efficiency could be computed for a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    ZeroClubSpeed,
    UnresolvedClubProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShotEfficiency {
    Available {
        smash_factor: f64,
        ideal_smash_factor: f64,
        efficiency: f64,
    },
    Unavailable {
        reason: UnavailableReason,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShotEfficiencyEntry {
    pub shot: ShotKey,
    pub club: String,
    #[serde(flatten)]
    pub outcome: ShotEfficiency,
}

/// Mean over the shots that produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AggregateEfficiency {
    Available {
        mean_smash_factor: f64,
        mean_efficiency: f64,
        available_shots: usize,
        unavailable_shots: usize,
    },
    Unavailable {
        unavailable_shots: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClubEfficiency {
    pub club: String,
    #[serde(flatten)]
    pub aggregate: AggregateEfficiency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyReport {
    pub shots: Vec<ShotEfficiencyEntry>,
    pub overall: AggregateEfficiency,
    /// In bag order.
    pub by_club: Vec<ClubEfficiency>,
}

/// Efficiency of one shot.
pub fn shot_efficiency(
    record: &ShotRecord,
    profiles: &ClubProfiles,
    config: &EfficiencyConfig,
) -> ShotEfficiency {
    let Some(smash_factor) = record.smash_factor() else {
        return ShotEfficiency::Unavailable {
            reason: UnavailableReason::ZeroClubSpeed,
        };
    };
    if !record.known_club {
        return ShotEfficiency::Unavailable {
            reason: UnavailableReason::UnresolvedClubProfile,
        };
    }
    let Some(profile) = profiles.resolve_ideal_smash_factor(&record.club).profile() else {
        return ShotEfficiency::Unavailable {
            reason: UnavailableReason::UnresolvedClubProfile,
        };
    };
    let ideal = profile.ideal_smash_factor;
    ShotEfficiency::Available {
        smash_factor,
        ideal_smash_factor: ideal,
        efficiency: (smash_factor / ideal).clamp(0.0, config.max_ratio.max(0.0)),
    }
}

/// Per-shot, overall and per-club efficiency with the default clamp.
pub fn compute_efficiency(records: &[ShotRecord], profiles: &ClubProfiles) -> EfficiencyReport {
    compute_efficiency_with(records, profiles, &EfficiencyConfig::default())
}

pub fn compute_efficiency_with(
    records: &[ShotRecord],
    profiles: &ClubProfiles,
    config: &EfficiencyConfig,
) -> EfficiencyReport {
    let shots: Vec<ShotEfficiencyEntry> = records
        .iter()
        .map(|r| ShotEfficiencyEntry {
            shot: r.key(),
            club: r.club.clone(),
            outcome: shot_efficiency(r, profiles, config),
        })
        .collect();

    let mut per_club: BTreeMap<&str, Vec<ShotEfficiency>> = BTreeMap::new();
    for entry in &shots {
        per_club.entry(entry.club.as_str()).or_default().push(entry.outcome);
    }
    let mut per_club: Vec<(&str, Vec<ShotEfficiency>)> = per_club.into_iter().collect();
    per_club.sort_by_cached_key(|(club, _)| club_sort_key(club));

    let overall = aggregate(shots.iter().map(|e| e.outcome));
    let by_club = per_club
        .into_iter()
        .map(|(club, outcomes)| ClubEfficiency {
            club: club.to_string(),
            aggregate: aggregate(outcomes.into_iter()),
        })
        .collect();

    EfficiencyReport {
        shots,
        overall,
        by_club,
    }
}

fn aggregate(outcomes: impl Iterator<Item = ShotEfficiency>) -> AggregateEfficiency {
    let mut smash = Vec::new();
    let mut eff = Vec::new();
    let mut unavailable_shots = 0;
    for outcome in outcomes {
        match outcome {
            ShotEfficiency::Available {
                smash_factor,
                efficiency,
                ..
            } => {
                smash.push(smash_factor);
                eff.push(efficiency);
            }
            ShotEfficiency::Unavailable { .. } => unavailable_shots += 1,
        }
    }
    match (mean(&smash), mean(&eff)) {
        (Some(mean_smash_factor), Some(mean_efficiency)) => AggregateEfficiency::Available {
            mean_smash_factor,
            mean_efficiency,
            available_shots: smash.len(),
            unavailable_shots,
        },
        _ => AggregateEfficiency::Unavailable { unavailable_shots },
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clubs::ClubProfile;
    use crate::models::test_support::shot;

    fn iron_profiles() -> ClubProfiles {
        let mut profiles = ClubProfiles::empty();
        profiles.insert("7 Iron", ClubProfile::new(1.33).unwrap());
        profiles
    }

    // ── shot_efficiency ──────────────────────────────────────────────────────

    #[test]
    fn test_seven_iron_efficiency() {
        let s = shot("s1", 0, "7 Iron", 160.0);
        match shot_efficiency(&s, &iron_profiles(), &EfficiencyConfig::default()) {
            ShotEfficiency::Available {
                smash_factor,
                efficiency,
                ..
            } => {
                assert!((smash_factor - 1.317).abs() < 0.001);
                assert!((efficiency - 0.990).abs() < 0.001);
            }
            other => panic!("expected available, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_club_speed_unavailable() {
        let mut s = shot("s1", 0, "7 Iron", 160.0);
        s.club_speed = 0.0;
        assert_eq!(
            shot_efficiency(&s, &iron_profiles(), &EfficiencyConfig::default()),
            ShotEfficiency::Unavailable {
                reason: UnavailableReason::ZeroClubSpeed
            }
        );
    }

    #[test]
    fn test_unresolved_profile_unavailable() {
        let s = shot("s1", 0, "Driver", 230.0);
        assert_eq!(
            shot_efficiency(&s, &iron_profiles(), &EfficiencyConfig::default()),
            ShotEfficiency::Unavailable {
                reason: UnavailableReason::UnresolvedClubProfile
            }
        );
    }

    #[test]
    fn test_efficiency_clamped_to_max_ratio() {
        let mut s = shot("s1", 0, "7 Iron", 160.0);
        s.ball_speed = 400.0;
        let config = EfficiencyConfig { max_ratio: 1.2 };
        match shot_efficiency(&s, &iron_profiles(), &config) {
            ShotEfficiency::Available { efficiency, .. } => assert_eq!(efficiency, 1.2),
            other => panic!("expected available, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_ball_speed_is_zero_efficiency() {
        let mut s = shot("s1", 0, "7 Iron", 160.0);
        s.ball_speed = 0.0;
        match shot_efficiency(&s, &iron_profiles(), &EfficiencyConfig::default()) {
            ShotEfficiency::Available { efficiency, .. } => assert_eq!(efficiency, 0.0),
            other => panic!("expected available, got {other:?}"),
        }
    }

    // ── compute_efficiency ───────────────────────────────────────────────────

    #[test]
    fn test_aggregate_over_available_shots_only() {
        let mut zero = shot("s1", 1, "7 Iron", 150.0);
        zero.club_speed = 0.0;
        let records = vec![shot("s1", 0, "7 Iron", 160.0), zero, shot("s1", 2, "Driver", 230.0)];
        let report = compute_efficiency(&records, &iron_profiles());

        assert_eq!(report.shots.len(), 3);
        match report.overall {
            AggregateEfficiency::Available {
                mean_efficiency,
                available_shots,
                unavailable_shots,
                ..
            } => {
                assert_eq!(available_shots, 1);
                assert_eq!(unavailable_shots, 2);
                assert!((mean_efficiency - 0.990).abs() < 0.001);
            }
            other => panic!("expected available, got {other:?}"),
        }
    }

    #[test]
    fn test_aggregate_unavailable_when_no_shot_available() {
        let records = vec![shot("s1", 0, "Driver", 230.0)];
        let report = compute_efficiency(&records, &iron_profiles());
        assert_eq!(
            report.overall,
            AggregateEfficiency::Unavailable { unavailable_shots: 1 }
        );
    }

    #[test]
    fn test_empty_input_is_unavailable() {
        let report = compute_efficiency(&[], &ClubProfiles::with_defaults());
        assert!(report.shots.is_empty());
        assert!(report.by_club.is_empty());
        assert_eq!(
            report.overall,
            AggregateEfficiency::Unavailable { unavailable_shots: 0 }
        );
    }

    #[test]
    fn test_unknown_club_is_unresolved_even_with_matching_name() {
        // A record flagged unknown never borrows a catalog profile.
        let mut s = shot("s1", 0, "7 Iron", 160.0);
        s.known_club = false;
        assert_eq!(
            shot_efficiency(&s, &ClubProfiles::with_defaults(), &EfficiencyConfig::default()),
            ShotEfficiency::Unavailable {
                reason: UnavailableReason::UnresolvedClubProfile
            }
        );
    }

    #[test]
    fn test_by_club_in_bag_order() {
        let mut unknown = shot("s1", 3, "Mini Driver", 200.0);
        unknown.known_club = false;
        let records = vec![
            shot("s1", 0, "Pitching Wedge", 120.0),
            unknown,
            shot("s1", 1, "7 Iron", 160.0),
            shot("s1", 2, "Driver", 230.0),
        ];
        let report = compute_efficiency(&records, &ClubProfiles::with_defaults());
        let clubs: Vec<&str> = report.by_club.iter().map(|c| c.club.as_str()).collect();
        assert_eq!(clubs, vec!["Driver", "7 Iron", "Pitching Wedge", "Mini Driver"]);
        assert!(matches!(
            report.by_club[3].aggregate,
            AggregateEfficiency::Unavailable { unavailable_shots: 1 }
        ));
    }

    #[test]
    fn test_report_serializes_with_status_tags() {
        let report = compute_efficiency(&[shot("s1", 0, "Driver", 230.0)], &iron_profiles());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["overall"]["status"], "unavailable");
        assert_eq!(json["shots"][0]["status"], "unavailable");
        assert_eq!(json["shots"][0]["reason"], "unresolved_club_profile");
    }
}
