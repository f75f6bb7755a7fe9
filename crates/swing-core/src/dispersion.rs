//! Two-metric shot dispersion: centroid, covariance and Mahalanobis outliers.

use serde::Serialize;

use crate::models::{Metric, ShotKey, ShotRecord};
use crate::stats::Bivariate;

pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 2.5;
pub const DEFAULT_X_METRIC: Metric = Metric::CurveDistance;
pub const DEFAULT_Y_METRIC: Metric = Metric::CarryDistance;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outlier {
    pub shot: ShotKey,
    pub distance: f64,
}

/// Result of the outlier pass over a cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutlierScan {
    Scanned { outliers: Vec<Outlier> },
    /// Every usable shot sits on the same point, so no distances exist.
    DegenerateCovariance,
}

impl OutlierScan {
    pub fn outlier_keys(&self) -> Vec<ShotKey> {
        match self {
            OutlierScan::Scanned { outliers } => outliers.iter().map(|o| o.shot.clone()).collect(),
            OutlierScan::DegenerateCovariance => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispersionOutcome {
    Cluster {
        centroid: Centroid,
        /// `[[var_x, cov_xy], [cov_xy, var_y]]`, population normalised.
        covariance: [[f64; 2]; 2],
        samples: usize,
        outlier_scan: OutlierScan,
    },
    InsufficientData {
        samples: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispersionReport {
    pub x_metric: Metric,
    pub y_metric: Metric,
    pub threshold: f64,
    #[serde(flatten)]
    pub outcome: DispersionOutcome,
}

/// Dispersion of `records` in the `(x, y)` metric plane.
///
/// Shots lacking either metric are not usable. Outliers are the shots whose
/// Mahalanobis distance from the centroid exceeds `threshold`, in input order.
/// A singular covariance uses its pseudo-inverse, so collinear shots or a
/// constant metric still yield distances along the axis that varies.
pub fn compute_dispersion(
    records: &[ShotRecord],
    x: Metric,
    y: Metric,
    threshold: f64,
) -> DispersionReport {
    let usable: Vec<(&ShotRecord, (f64, f64))> = records
        .iter()
        .filter_map(|r| Some((r, (r.metric(x)?, r.metric(y)?))))
        .collect();
    let points: Vec<(f64, f64)> = usable.iter().map(|(_, p)| *p).collect();

    let outcome = match Bivariate::from_points(&points) {
        None => DispersionOutcome::InsufficientData {
            samples: points.len(),
        },
        Some(stats) => {
            let outlier_scan = match stats.precision() {
                None => OutlierScan::DegenerateCovariance,
                Some(inverse) => OutlierScan::Scanned {
                    outliers: usable
                        .iter()
                        .filter_map(|(record, (px, py))| {
                            let distance = stats.mahalanobis(&inverse, *px, *py);
                            (distance > threshold).then(|| Outlier {
                                shot: record.key(),
                                distance,
                            })
                        })
                        .collect(),
                },
            };
            DispersionOutcome::Cluster {
                centroid: Centroid {
                    x: stats.mean_x,
                    y: stats.mean_y,
                },
                covariance: stats.covariance,
                samples: points.len(),
                outlier_scan,
            }
        }
    };

    DispersionReport {
        x_metric: x,
        y_metric: y,
        threshold,
        outcome,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
