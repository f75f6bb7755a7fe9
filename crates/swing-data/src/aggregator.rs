//! Per-(session, club) indicator table and the first-vs-last smash trend.

use serde::Serialize;
use swing_core::clubs::{club_sort_key, ClubProfiles};
use swing_core::consistency::{consistency_index, ConsistencyConfig, ConsistencyOutcome};
use swing_core::models::{Metric, SessionId, ShotRecord};
use swing_core::stats::{mean, sample_std_dev};

/// Smash difference below which a club counts as stable.
pub const DEFAULT_SMASH_TREND_THRESHOLD: f64 = 0.01;

// ── Rows ──────────────────────────────────────────────────────────────────────

/// Indicators for one club within one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionClubSummary {
    pub session_id: SessionId,
    pub club: String,
    pub shots: usize,
    /// `None` when no shot had a positive club speed.
    pub smash_avg: Option<f64>,
    /// Sample standard deviation; `None` below two shots.
    pub smash_std: Option<f64>,
    /// Ideal smash factor; `None` for clubs without a profile.
    pub target_smash: Option<f64>,
    pub smash_diff: Option<f64>,
    pub consistency: ConsistencyOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Flat,
}

/// Change in mean smash factor between a club's first and last session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmashTrend {
    pub club: String,
    pub first_session: SessionId,
    pub last_session: SessionId,
    pub first_smash: f64,
    pub last_smash: f64,
    pub diff: f64,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub base_metric: Metric,
    pub rows: Vec<SessionClubSummary>,
    pub trends: Vec<SmashTrend>,
}

// ── SummaryAggregator ─────────────────────────────────────────────────────────

/// Groups records by session and club and computes the indicator table.
pub struct SummaryAggregator<'a> {
    profiles: &'a ClubProfiles,
    base_metric: Metric,
    trend_threshold: f64,
    consistency: ConsistencyConfig,
}

impl<'a> SummaryAggregator<'a> {
    pub fn new(profiles: &'a ClubProfiles) -> Self {
        Self {
            profiles,
            base_metric: Metric::CarryDistance,
            trend_threshold: DEFAULT_SMASH_TREND_THRESHOLD,
            consistency: ConsistencyConfig::default(),
        }
    }

    /// Metric the consistency column is computed on.
    pub fn base_metric(mut self, metric: Metric) -> Self {
        self.base_metric = metric;
        self
    }

    pub fn trend_threshold(mut self, threshold: f64) -> Self {
        self.trend_threshold = threshold;
        self
    }

    pub fn consistency(mut self, config: ConsistencyConfig) -> Self {
        self.consistency = config;
        self
    }

    /// Build the table. Sessions keep the order in which they first appear in
    /// `records`; clubs within a session follow bag order.
    pub fn summarize(&self, records: &[ShotRecord]) -> SummaryReport {
        let mut session_order: Vec<&str> = Vec::new();
        let mut groups: Vec<(usize, &str, Vec<&ShotRecord>)> = Vec::new();

        for record in records {
            let session_pos = match session_order.iter().position(|s| *s == record.session_id) {
                Some(i) => i,
                None => {
                    session_order.push(&record.session_id);
                    session_order.len() - 1
                }
            };
            match groups
                .iter_mut()
                .find(|(s, club, _)| *s == session_pos && *club == record.club)
            {
                Some((_, _, shots)) => shots.push(record),
                None => groups.push((session_pos, &record.club, vec![record])),
            }
        }
        groups.sort_by_cached_key(|(session_pos, club, _)| (*session_pos, club_sort_key(club)));

        let rows: Vec<SessionClubSummary> = groups
            .into_iter()
            .map(|(session_pos, club, shots)| self.summarize_group(session_order[session_pos], club, &shots))
            .collect();
        let trends = self.smash_trends(&rows);

        SummaryReport {
            base_metric: self.base_metric,
            rows,
            trends,
        }
    }

    fn summarize_group(&self, session_id: &str, club: &str, shots: &[&ShotRecord]) -> SessionClubSummary {
        let smash: Vec<f64> = shots.iter().filter_map(|s| s.smash_factor()).collect();
        let base: Vec<f64> = shots.iter().filter_map(|s| s.metric(self.base_metric)).collect();

        let smash_avg = mean(&smash);
        let target_smash = self
            .profiles
            .resolve_ideal_smash_factor(club)
            .profile()
            .map(|p| p.ideal_smash_factor);
        let smash_diff = match (smash_avg, target_smash) {
            (Some(avg), Some(target)) => Some(avg - target),
            _ => None,
        };

        SessionClubSummary {
            session_id: session_id.to_string(),
            club: club.to_string(),
            shots: shots.len(),
            smash_avg,
            smash_std: sample_std_dev(&smash),
            target_smash,
            smash_diff,
            consistency: consistency_index(&base, &self.consistency),
        }
    }

    /// Rows must already be in session order.
    fn smash_trends(&self, rows: &[SessionClubSummary]) -> Vec<SmashTrend> {
        let mut clubs: Vec<&str> = rows.iter().map(|r| r.club.as_str()).collect();
        clubs.sort_by_cached_key(|c| (club_sort_key(c), c.to_string()));
        clubs.dedup();

        clubs
            .into_iter()
            .filter_map(|club| {
                let mut measured = rows
                    .iter()
                    .filter(|r| r.club == club)
                    .filter_map(|r| Some((r, r.smash_avg?)));
                let (first, first_smash) = measured.next()?;
                let (last, last_smash) = measured.last()?;
                let diff = last_smash - first_smash;
                let direction = if diff > self.trend_threshold {
                    TrendDirection::Improving
                } else if diff < -self.trend_threshold {
                    TrendDirection::Declining
                } else {
                    TrendDirection::Flat
                };
                Some(SmashTrend {
                    club: club.to_string(),
                    first_session: first.session_id.clone(),
                    last_session: last.session_id.clone(),
                    first_smash,
                    last_smash,
                    diff,
                    direction,
                })
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn shot(session: &str, sequence: usize, club: &str, ball: f64, club_speed: f64, carry: f64) -> ShotRecord {
        ShotRecord {
            session_id: session.to_string(),
            sequence,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 4, 10, 0, 0).unwrap(),
            club: club.to_string(),
            known_club: true,
            ball_speed: ball,
            club_speed,
            carry_distance: carry,
            total_distance: carry + 10.0,
            spin_rate: None,
            launch_angle: None,
            curve_distance: None,
            apex_height: None,
        }
    }

    #[test]
    fn test_rows_grouped_and_ordered() {
        let records = vec![
            shot("s1", 0, "7 Iron", 108.0, 82.0, 160.0),
            shot("s1", 1, "Driver", 150.0, 102.0, 230.0),
            shot("s1", 2, "7 Iron", 110.0, 82.0, 162.0),
            shot("s2", 0, "Driver", 151.0, 101.0, 232.0),
        ];
        let profiles = ClubProfiles::with_defaults();
        let report = SummaryAggregator::new(&profiles).summarize(&records);

        let keys: Vec<(&str, &str)> = report
            .rows
            .iter()
            .map(|r| (r.session_id.as_str(), r.club.as_str()))
            .collect();
        assert_eq!(keys, vec![("s1", "Driver"), ("s1", "7 Iron"), ("s2", "Driver")]);

        let iron = &report.rows[1];
        assert_eq!(iron.shots, 2);
        let avg = iron.smash_avg.unwrap();
        assert!((avg - (108.0 / 82.0 + 110.0 / 82.0) / 2.0).abs() < 1e-12);
        assert!((iron.target_smash.unwrap() - 1.33).abs() < 1e-12);
        assert!((iron.smash_diff.unwrap() - (avg - 1.33)).abs() < 1e-12);
        assert!(iron.smash_std.unwrap() > 0.0);
        // Two carries is below the consistency floor.
        assert!(iron.consistency.index().is_none());
    }

    #[test]
    fn test_single_shot_has_no_std() {
        let records = vec![shot("s1", 0, "Driver", 150.0, 100.0, 230.0)];
        let profiles = ClubProfiles::with_defaults();
        let report = SummaryAggregator::new(&profiles).summarize(&records);
        assert_eq!(report.rows[0].smash_std, None);
        assert!((report.rows[0].smash_avg.unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_club_has_no_target() {
        let records = vec![shot("s1", 0, "Mini Driver", 140.0, 100.0, 210.0)];
        let profiles = ClubProfiles::with_defaults();
        let report = SummaryAggregator::new(&profiles).summarize(&records);
        assert_eq!(report.rows[0].target_smash, None);
        assert_eq!(report.rows[0].smash_diff, None);
    }

    #[test]
    fn test_consistency_on_base_metric() {
        let records = vec![
            shot("s1", 0, "7 Iron", 108.0, 82.0, 150.0),
            shot("s1", 1, "7 Iron", 108.0, 82.0, 150.0),
            shot("s1", 2, "7 Iron", 108.0, 82.0, 150.0),
        ];
        let profiles = ClubProfiles::with_defaults();
        let report = SummaryAggregator::new(&profiles)
            .base_metric(Metric::BallSpeed)
            .summarize(&records);
        assert_eq!(report.base_metric, Metric::BallSpeed);
        assert_eq!(report.rows[0].consistency.index(), Some(1.0));
    }

    // ── smash trend ──────────────────────────────────────────────────────────

    #[test]
    fn test_smash_trend_directions() {
        let records = vec![
            shot("s1", 0, "Driver", 140.0, 100.0, 220.0),
            shot("s1", 1, "7 Iron", 110.0, 82.0, 160.0),
            shot("s1", 2, "Pitching Wedge", 90.0, 72.0, 120.0),
            shot("s2", 0, "Driver", 145.0, 100.0, 225.0),
            shot("s3", 0, "Driver", 148.0, 100.0, 230.0),
            shot("s3", 1, "7 Iron", 105.0, 82.0, 155.0),
            shot("s3", 2, "Pitching Wedge", 90.2, 72.0, 121.0),
        ];
        let profiles = ClubProfiles::with_defaults();
        let report = SummaryAggregator::new(&profiles).summarize(&records);

        assert_eq!(report.trends.len(), 3);
        let driver = &report.trends[0];
        assert_eq!(driver.club, "Driver");
        assert_eq!(driver.first_session, "s1");
        assert_eq!(driver.last_session, "s3");
        assert!((driver.diff - 0.08).abs() < 1e-12);
        assert_eq!(driver.direction, TrendDirection::Improving);
        assert_eq!(report.trends[1].direction, TrendDirection::Declining);
        assert_eq!(report.trends[2].direction, TrendDirection::Flat);
    }

    #[test]
    fn test_club_in_one_session_has_no_trend() {
        let records = vec![
            shot("s1", 0, "Driver", 140.0, 100.0, 220.0),
            shot("s2", 0, "7 Iron", 110.0, 82.0, 160.0),
        ];
        let profiles = ClubProfiles::with_defaults();
        let report = SummaryAggregator::new(&profiles).summarize(&records);
        assert!(report.trends.is_empty());
    }

    #[test]
    fn test_empty_records() {
        let profiles = ClubProfiles::with_defaults();
        let report = SummaryAggregator::new(&profiles).summarize(&[]);
        assert!(report.rows.is_empty());
        assert!(report.trends.is_empty());
    }
}
