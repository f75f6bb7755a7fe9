use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a recorded session (the export file stem).
pub type SessionId = String;

/// Numeric shot fields that the analyzers can be pointed at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Metric {
    /// Ball speed off the face.
    BallSpeed,
    /// Club head speed at impact.
    ClubSpeed,
    /// `ball_speed / club_speed`; undefined when club speed is zero.
    SmashFactor,
    /// Distance in the air before first ground contact.
    CarryDistance,
    /// Carry plus roll.
    TotalDistance,
    /// `total_distance - carry_distance`.
    RollDistance,
    /// Back spin.
    SpinRate,
    /// Vertical launch angle (signed).
    LaunchAngle,
    /// Lateral offset at landing (signed, negative = left).
    CurveDistance,
    /// Peak height of the flight.
    ApexHeight,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::BallSpeed,
        Metric::ClubSpeed,
        Metric::SmashFactor,
        Metric::CarryDistance,
        Metric::TotalDistance,
        Metric::RollDistance,
        Metric::SpinRate,
        Metric::LaunchAngle,
        Metric::CurveDistance,
        Metric::ApexHeight,
    ];

    /// The canonical snake_case identifier for this metric.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::BallSpeed => "ball_speed",
            Metric::ClubSpeed => "club_speed",
            Metric::SmashFactor => "smash_factor",
            Metric::CarryDistance => "carry_distance",
            Metric::TotalDistance => "total_distance",
            Metric::RollDistance => "roll_distance",
            Metric::SpinRate => "spin_rate",
            Metric::LaunchAngle => "launch_angle",
            Metric::CurveDistance => "curve_distance",
            Metric::ApexHeight => "apex_height",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one shot: its session and its row position inside that session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShotKey {
    pub session_id: SessionId,
    pub sequence: usize,
}

/// One recorded swing after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    /// Session this shot belongs to.
    pub session_id: SessionId,
    /// 0-based row position inside the session file (ingestion order).
    pub sequence: usize,
    /// UTC time of the shot.
    pub timestamp: DateTime<Utc>,
    /// Canonical club name, or the trimmed raw name when unrecognised.
    pub club: String,
    /// Whether `club` resolved to the canonical club catalog.
    pub known_club: bool,
    pub ball_speed: f64,
    pub club_speed: f64,
    pub carry_distance: f64,
    pub total_distance: f64,
    /// `None` when the export did not record it.
    pub spin_rate: Option<f64>,
    pub launch_angle: Option<f64>,
    pub curve_distance: Option<f64>,
    pub apex_height: Option<f64>,
}

impl ShotRecord {
    pub fn key(&self) -> ShotKey {
        ShotKey {
            session_id: self.session_id.clone(),
            sequence: self.sequence,
        }
    }

    /// Ball speed over club speed. `None` when club speed is not positive.
    pub fn smash_factor(&self) -> Option<f64> {
        if self.club_speed > 0.0 {
            Some(self.ball_speed / self.club_speed)
        } else {
            None
        }
    }

    pub fn roll_distance(&self) -> f64 {
        self.total_distance - self.carry_distance
    }

    /// Value of `metric` for this shot, `None` when not recorded or undefined.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::BallSpeed => Some(self.ball_speed),
            Metric::ClubSpeed => Some(self.club_speed),
            Metric::SmashFactor => self.smash_factor(),
            Metric::CarryDistance => Some(self.carry_distance),
            Metric::TotalDistance => Some(self.total_distance),
            Metric::RollDistance => Some(self.roll_distance()),
            Metric::SpinRate => self.spin_rate,
            Metric::LaunchAngle => self.launch_angle,
            Metric::CurveDistance => self.curve_distance,
            Metric::ApexHeight => self.apex_height,
        }
    }
}

/// An ingested session: shots in file order plus display metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Human-readable label derived from the file name.
    pub label: String,
    /// Calendar date of the earliest shot.
    pub date: NaiveDate,
    pub shots: Vec<ShotRecord>,
}

impl Session {
    /// Build a session from its normalized shots.
    ///
    /// Returns `None` when `shots` is empty, since an empty session has no date.
    pub fn new(
        id: impl Into<SessionId>,
        label: impl Into<String>,
        shots: Vec<ShotRecord>,
    ) -> Option<Self> {
        let date = shots.iter().map(|s| s.timestamp).min()?.date_naive();
        Some(Self {
            id: id.into(),
            label: label.into(),
            date,
            shots,
        })
    }

    /// Earliest shot timestamp; used to order sessions chronologically.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.shots.iter().map(|s| s.timestamp).min()
    }
}

/// Compact per-session description returned by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub label: String,
    pub date: NaiveDate,
    pub shots: usize,
    /// Canonical clubs used, in catalog order.
    pub clubs: Vec<String>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    /// Minimal 7-iron shot used across the crate's unit tests.
    pub fn shot(session: &str, sequence: usize, club: &str, carry: f64) -> ShotRecord {
        ShotRecord {
            session_id: session.to_string(),
            sequence,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 4, 10, 0, 0).unwrap()
                + chrono::Duration::seconds(sequence as i64 * 30),
            club: club.to_string(),
            known_club: true,
            ball_speed: 108.0,
            club_speed: 82.0,
            carry_distance: carry,
            total_distance: carry + 8.0,
            spin_rate: Some(6500.0),
            launch_angle: Some(17.5),
            curve_distance: Some(0.0),
            apex_height: None,
        }
    }
}
