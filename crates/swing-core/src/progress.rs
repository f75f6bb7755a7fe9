//! Cross-session progress of one club on one metric.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::clubs::canonicalize_club;
use crate::models::{Metric, SessionId, ShotRecord};
use crate::stats::{linear_regression_slope, mean, trailing_moving_average};

pub const DEFAULT_WINDOW: usize = 3;
pub const DEFAULT_TREND_THRESHOLD: f64 = 0.01;

/// One session's aggregate in the series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressPoint {
    pub session_id: SessionId,
    pub date: NaiveDate,
    /// Mean of the metric over the session's shots with this club.
    pub value: f64,
    pub moving_average: f64,
    pub shots: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Trend {
    Improving { slope: f64 },
    Declining { slope: f64 },
    Flat { slope: f64 },
    InsufficientData { sessions: usize },
}

impl Trend {
    /// Classify a least-squares slope; `|slope| < threshold` is flat.
    pub fn classify(slope: f64, threshold: f64) -> Trend {
        if slope.abs() < threshold {
            Trend::Flat { slope }
        } else if slope > 0.0 {
            Trend::Improving { slope }
        } else {
            Trend::Declining { slope }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub club: String,
    pub metric: Metric,
    pub window: usize,
    /// Ordered by session date.
    pub points: Vec<ProgressPoint>,
    pub trend: Trend,
}

/// Per-session means of `metric` for `club`, their trailing moving average
/// and the trend of the means across sessions.
///
/// Sessions with no recorded value for the metric are left out of the series.
pub fn compute_progress(
    records: &[ShotRecord],
    club: &str,
    metric: Metric,
    window: usize,
    threshold: f64,
) -> ProgressReport {
    let club = canonicalize_club(club).name;
    let window = window.max(1);

    struct Acc {
        session_id: SessionId,
        started: DateTime<Utc>,
        values: Vec<f64>,
    }
    let mut sessions: Vec<Acc> = Vec::new();
    for record in records.iter().filter(|r| r.club == club) {
        let Some(value) = record.metric(metric) else {
            continue;
        };
        match sessions.iter_mut().find(|a| a.session_id == record.session_id) {
            Some(acc) => {
                acc.started = acc.started.min(record.timestamp);
                acc.values.push(value);
            }
            None => sessions.push(Acc {
                session_id: record.session_id.clone(),
                started: record.timestamp,
                values: vec![value],
            }),
        }
    }
    sessions.sort_by(|a, b| {
        a.started
            .cmp(&b.started)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });

    let means: Vec<f64> = sessions
        .iter()
        .filter_map(|acc| mean(&acc.values))
        .collect();
    let averages = trailing_moving_average(&means, window);

    let points: Vec<ProgressPoint> = sessions
        .into_iter()
        .zip(means.iter().zip(averages))
        .map(|(acc, (&value, moving_average))| ProgressPoint {
            date: acc.started.date_naive(),
            shots: acc.values.len(),
            session_id: acc.session_id,
            value,
            moving_average,
        })
        .collect();

    let trend = match linear_regression_slope(&means) {
        Some(slope) => Trend::classify(slope, threshold),
        None => Trend::InsufficientData {
            sessions: points.len(),
        },
    };

    ProgressReport {
        club,
        metric,
        window,
        points,
        trend,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
