//! Raw tabular rows → validated [`ShotRecord`]s.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::clubs::canonicalize_club;
use crate::models::ShotRecord;
use crate::schema::{ColumnBinding, FieldKind, ShotField, ShotSchema};
use crate::time_utils::TimezoneHandler;

// ── Raw input ─────────────────────────────────────────────────────────────────

/// One data row of a session file: raw header → raw cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    /// 0-based index of the data row within its file.
    pub position: usize,
    pub cells: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            cells: BTreeMap::new(),
        }
    }

    /// Builder used by readers and tests. The first value for a header wins.
    pub fn with_cell(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.cells.entry(header.into()).or_insert_with(|| value.into());
        self
    }

    fn get(&self, header: &str) -> Option<&str> {
        self.cells.get(header).map(String::as_str)
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Why a row was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowErrorKind {
    /// Required field absent or blank.
    Missing,
    /// Not a finite number.
    NotANumber { value: String },
    /// Negative value in a field that must be `>= 0`.
    Negative { value: f64 },
    /// Timestamp in no recognised format.
    BadTimestamp { value: String },
    /// `total_distance < carry_distance`.
    BelowCarry { total: f64, carry: f64 },
}

impl fmt::Display for RowErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowErrorKind::Missing => write!(f, "is missing"),
            RowErrorKind::NotANumber { value } => write!(f, "is not a number: {value:?}"),
            RowErrorKind::Negative { value } => write!(f, "must not be negative: {value}"),
            RowErrorKind::BadTimestamp { value } => {
                write!(f, "has an unrecognised timestamp: {value:?}")
            }
            RowErrorKind::BelowCarry { total, carry } => {
                write!(f, "{total} is below carry distance {carry}")
            }
        }
    }
}

/// A skipped row: which field failed, where, and why.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("session {session_id}, row {position}: {field} {kind}")]
pub struct RowValidationError {
    pub session_id: String,
    pub position: usize,
    pub field: ShotField,
    pub kind: RowErrorKind,
}

/// Outcome of normalizing a batch of rows.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub records: Vec<ShotRecord>,
    pub skipped: Vec<RowValidationError>,
}

// ── Normalizer ────────────────────────────────────────────────────────────────

/// Cell values that mean "not recorded" in optional columns.
const UNAVAILABLE_MARKERS: &[&str] = &["", "-", "--", "n/a", "na", "null"];

/// Converts raw rows into shot records according to a [`ShotSchema`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    schema: ShotSchema,
    timezone: TimezoneHandler,
}

impl Normalizer {
    pub fn new(schema: ShotSchema, timezone: TimezoneHandler) -> Self {
        Self { schema, timezone }
    }

    pub fn schema(&self) -> &ShotSchema {
        &self.schema
    }

    /// Bind headers to fields for one file.
    pub fn bind<'h, I>(&self, headers: I) -> ColumnBinding
    where
        I: IntoIterator<Item = &'h str>,
    {
        self.schema.bind(headers)
    }

    /// Bind the union of headers seen across `rows`.
    pub fn bind_rows(&self, rows: &[RawRow]) -> ColumnBinding {
        let headers: BTreeSet<&str> = rows
            .iter()
            .flat_map(|r| r.cells.keys().map(String::as_str))
            .collect();
        self.bind(headers)
    }

    /// Normalize every row of one session. Invalid rows are skipped and
    /// reported; they never abort the batch.
    ///
    /// `session_id` is used for rows whose file has no session column (or a
    /// blank cell in it).
    pub fn normalize_session(&self, session_id: &str, rows: &[RawRow]) -> NormalizedBatch {
        if rows.is_empty() {
            return NormalizedBatch::default();
        }
        let binding = self.bind_rows(rows);

        let mut batch = NormalizedBatch::default();
        for row in rows {
            match self.normalize_row(&binding, row, Some(session_id)) {
                Ok(record) => batch.records.push(record),
                Err(e) => {
                    warn!("Skipping row: {}", e);
                    batch.skipped.push(e);
                }
            }
        }

        debug!(
            "Session {}: {} rows, {} valid, {} skipped",
            session_id,
            rows.len(),
            batch.records.len(),
            batch.skipped.len()
        );
        batch
    }

    /// Normalize one row against an existing binding.
    pub fn normalize_row(
        &self,
        binding: &ColumnBinding,
        row: &RawRow,
        fallback_session_id: Option<&str>,
    ) -> Result<ShotRecord, RowValidationError> {
        let session_id = match self.text(binding, row, ShotField::SessionId) {
            Some(id) => id.to_string(),
            None => fallback_session_id
                .map(str::to_string)
                .ok_or_else(|| invalid(String::new(), row, ShotField::SessionId, RowErrorKind::Missing))?,
        };
        let fail = |field: ShotField, kind: RowErrorKind| invalid(session_id.clone(), row, field, kind);

        let timestamp = self.timestamp(binding, row).map_err(|k| fail(ShotField::Timestamp, k))?;
        let club_raw = self
            .text(binding, row, ShotField::Club)
            .ok_or_else(|| fail(ShotField::Club, RowErrorKind::Missing))?;
        let club = canonicalize_club(club_raw);

        let required = |field: ShotField| -> Result<f64, RowValidationError> {
            self.number(binding, row, field)
                .map_err(|k| fail(field, k))?
                .ok_or_else(|| fail(field, RowErrorKind::Missing))
        };
        let optional = |field: ShotField| -> Result<Option<f64>, RowValidationError> {
            self.number(binding, row, field).map_err(|k| fail(field, k))
        };

        let ball_speed = required(ShotField::BallSpeed)?;
        let club_speed = required(ShotField::ClubSpeed)?;
        let carry_distance = required(ShotField::CarryDistance)?;
        let total_distance = required(ShotField::TotalDistance)?;
        if total_distance < carry_distance {
            return Err(fail(
                ShotField::TotalDistance,
                RowErrorKind::BelowCarry {
                    total: total_distance,
                    carry: carry_distance,
                },
            ));
        }

        Ok(ShotRecord {
            session_id: session_id.clone(),
            sequence: row.position,
            timestamp,
            known_club: club.is_known(),
            club: club.name,
            ball_speed,
            club_speed,
            carry_distance,
            total_distance,
            spin_rate: optional(ShotField::SpinRate)?,
            launch_angle: optional(ShotField::LaunchAngle)?,
            curve_distance: optional(ShotField::CurveDistance)?,
            apex_height: optional(ShotField::ApexHeight)?,
        })
    }

    // ── Private helpers ──────────────────────────────────────────────────────

    /// Trimmed, non-blank text of a bound column.
    fn text<'r>(&self, binding: &ColumnBinding, row: &'r RawRow, field: ShotField) -> Option<&'r str> {
        let header = binding.header(field)?;
        let value = row.get(header)?.trim();
        (!value.is_empty()).then_some(value)
    }

    fn timestamp(&self, binding: &ColumnBinding, row: &RawRow) -> Result<DateTime<Utc>, RowErrorKind> {
        let raw = self
            .text(binding, row, ShotField::Timestamp)
            .ok_or(RowErrorKind::Missing)?;
        self.timezone
            .parse_timestamp(raw)
            .ok_or_else(|| RowErrorKind::BadTimestamp { value: raw.to_string() })
    }

    /// `Ok(None)` when the column is absent or holds an "unavailable" marker.
    fn number(
        &self,
        binding: &ColumnBinding,
        row: &RawRow,
        field: ShotField,
    ) -> Result<Option<f64>, RowErrorKind> {
        let Some(header) = binding.header(field) else {
            return Ok(None);
        };
        let raw = row.get(header).unwrap_or("").trim();
        if UNAVAILABLE_MARKERS.iter().any(|m| raw.eq_ignore_ascii_case(m)) {
            return Ok(None);
        }
        let value = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| RowErrorKind::NotANumber { value: raw.to_string() })?;
        if field.kind() == FieldKind::NonNegative && value < 0.0 {
            return Err(RowErrorKind::Negative { value });
        }
        Ok(Some(value))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(ShotSchema::default(), TimezoneHandler::default())
    }
}

fn invalid(
    session_id: String,
    row: &RawRow,
    field: ShotField,
    kind: RowErrorKind,
) -> RowValidationError {
    RowValidationError {
        session_id,
        position: row.position,
        field,
        kind,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
