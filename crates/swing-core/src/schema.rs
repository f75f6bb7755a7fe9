//! Canonical shot fields and the header aliases that map export columns onto them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A field of [`crate::models::ShotRecord`] that is read from a raw row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotField {
    SessionId,
    Timestamp,
    Club,
    BallSpeed,
    ClubSpeed,
    CarryDistance,
    TotalDistance,
    SpinRate,
    LaunchAngle,
    CurveDistance,
    ApexHeight,
}

/// How a field's raw text is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Timestamp,
    /// Finite and `>= 0`.
    NonNegative,
    /// Any finite number.
    Signed,
}

impl ShotField {
    pub const ALL: [ShotField; 11] = [
        ShotField::SessionId,
        ShotField::Timestamp,
        ShotField::Club,
        ShotField::BallSpeed,
        ShotField::ClubSpeed,
        ShotField::CarryDistance,
        ShotField::TotalDistance,
        ShotField::SpinRate,
        ShotField::LaunchAngle,
        ShotField::CurveDistance,
        ShotField::ApexHeight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShotField::SessionId => "session_id",
            ShotField::Timestamp => "timestamp",
            ShotField::Club => "club",
            ShotField::BallSpeed => "ball_speed",
            ShotField::ClubSpeed => "club_speed",
            ShotField::CarryDistance => "carry_distance",
            ShotField::TotalDistance => "total_distance",
            ShotField::SpinRate => "spin_rate",
            ShotField::LaunchAngle => "launch_angle",
            ShotField::CurveDistance => "curve_distance",
            ShotField::ApexHeight => "apex_height",
        }
    }

    /// Rows lacking a required field are rejected.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            ShotField::SessionId
                | ShotField::Timestamp
                | ShotField::Club
                | ShotField::BallSpeed
                | ShotField::ClubSpeed
                | ShotField::CarryDistance
                | ShotField::TotalDistance
        )
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            ShotField::SessionId | ShotField::Club => FieldKind::Text,
            ShotField::Timestamp => FieldKind::Timestamp,
            ShotField::LaunchAngle | ShotField::CurveDistance => FieldKind::Signed,
            _ => FieldKind::NonNegative,
        }
    }
}

impl fmt::Display for ShotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-case a header and collapse runs of whitespace.
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ── ShotSchema ────────────────────────────────────────────────────────────────

/// Canonical field → accepted header aliases.
#[derive(Debug, Clone)]
pub struct ShotSchema {
    aliases: BTreeMap<ShotField, Vec<String>>,
}

impl Default for ShotSchema {
    /// Aliases for the launch-monitor CSV export plus plain snake_case names.
    fn default() -> Self {
        let table: &[(ShotField, &[&str])] = &[
            (ShotField::SessionId, &["session_id", "session", "session id"]),
            (
                ShotField::Timestamp,
                &["timestamp", "date", "date/time", "datetime", "date time", "shot time"],
            ),
            (ShotField::Club, &["club", "club type", "club name"]),
            (
                ShotField::BallSpeed,
                &["ball_speed", "ball speed", "ball (mph)", "ball speed (mph)", "ball (m/s)", "ball speed (m/s)"],
            ),
            (
                ShotField::ClubSpeed,
                &["club_speed", "club speed", "club (mph)", "club speed (mph)", "club (m/s)", "club speed (m/s)"],
            ),
            (
                ShotField::CarryDistance,
                &["carry_distance", "carry", "carry distance", "carry (yds)", "carry (m)"],
            ),
            (
                ShotField::TotalDistance,
                &["total_distance", "total", "total distance", "total (yds)", "total (m)"],
            ),
            (
                ShotField::SpinRate,
                &["spin_rate", "spin", "spin rate", "spin (rpm)", "total spin (rpm)"],
            ),
            (
                ShotField::LaunchAngle,
                &["launch_angle", "launch angle", "launch v (°)", "launch angle (°)", "vla", "vla (°)"],
            ),
            (
                ShotField::CurveDistance,
                &["curve_distance", "curve", "curve distance", "curve dist (yds)", "curve dist (m)", "lateral (yds)"],
            ),
            (
                ShotField::ApexHeight,
                &["apex_height", "apex", "apex (ft)", "height (ft)", "height (m)", "max height"],
            ),
        ];

        let aliases = table
            .iter()
            .map(|(field, names)| {
                (*field, names.iter().map(|n| normalize_header(n)).collect())
            })
            .collect();
        Self { aliases }
    }
}

impl ShotSchema {
    /// Accept an additional header spelling for `field`.
    pub fn with_alias(mut self, field: ShotField, alias: &str) -> Self {
        let alias = normalize_header(alias);
        let entry = self.aliases.entry(field).or_default();
        if !entry.contains(&alias) {
            entry.push(alias);
        }
        self
    }

    /// The canonical field a header maps to, if any.
    pub fn field_for_header(&self, header: &str) -> Option<ShotField> {
        let key = normalize_header(header);
        self.aliases
            .iter()
            .find(|(_, names)| names.contains(&key))
            .map(|(field, _)| *field)
    }

    /// Resolve a file's headers against the schema once, up front.
    ///
    /// When two headers map to the same field the first one wins. Headers that
    /// match no alias are ignored.
    pub fn bind<'h, I>(&self, headers: I) -> ColumnBinding
    where
        I: IntoIterator<Item = &'h str>,
    {
        let mut columns: BTreeMap<ShotField, String> = BTreeMap::new();
        for header in headers {
            if let Some(field) = self.field_for_header(header) {
                columns.entry(field).or_insert_with(|| header.to_string());
            }
        }
        ColumnBinding { columns }
    }
}

/// Which raw header supplies each canonical field for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnBinding {
    columns: BTreeMap<ShotField, String>,
}

impl ColumnBinding {
    /// Raw header bound to `field`.
    pub fn header(&self, field: ShotField) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    /// Required fields with no bound column. `session_id` is excluded when the
    /// caller can supply it from outside the row.
    pub fn missing_required(&self, session_id_supplied: bool) -> Vec<ShotField> {
        ShotField::ALL
            .into_iter()
            .filter(|f| f.is_required())
            .filter(|f| !(session_id_supplied && *f == ShotField::SessionId))
            .filter(|f| !self.columns.contains_key(f))
            .collect()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Carry   (yds) "), "carry (yds)");
        assert_eq!(normalize_header("BALL (MPH)"), "ball (mph)");
    }

    #[test]
    fn test_field_for_export_headers() {
        let schema = ShotSchema::default();
        assert_eq!(schema.field_for_header("Ball (mph)"), Some(ShotField::BallSpeed));
        assert_eq!(schema.field_for_header("Club (mph)"), Some(ShotField::ClubSpeed));
        assert_eq!(schema.field_for_header("Carry (yds)"), Some(ShotField::CarryDistance));
        assert_eq!(schema.field_for_header("Curve Dist (yds)"), Some(ShotField::CurveDistance));
        assert_eq!(schema.field_for_header("Height (ft)"), Some(ShotField::ApexHeight));
        assert_eq!(schema.field_for_header("club"), Some(ShotField::Club));
    }

    #[test]
    fn test_field_for_header_is_case_insensitive() {
        let schema = ShotSchema::default();
        assert_eq!(schema.field_for_header("CARRY_DISTANCE"), Some(ShotField::CarryDistance));
        assert_eq!(schema.field_for_header("Timestamp"), Some(ShotField::Timestamp));
    }

    #[test]
    fn test_unknown_headers_ignored() {
        let schema = ShotSchema::default();
        assert_eq!(schema.field_for_header("Smash"), None);
        assert_eq!(schema.field_for_header("Time (s)"), None);
        let binding = schema.bind(["Shot", "club", "Smash"]);
        assert_eq!(binding.header(ShotField::Club), Some("club"));
        assert_eq!(binding.header(ShotField::BallSpeed), None);
    }

    #[test]
    fn test_with_alias() {
        let schema = ShotSchema::default().with_alias(ShotField::CarryDistance, "Flight Distance");
        assert_eq!(
            schema.field_for_header("flight distance"),
            Some(ShotField::CarryDistance)
        );
    }

    #[test]
    fn test_bind_first_header_wins() {
        let schema = ShotSchema::default();
        let binding = schema.bind(["Carry (yds)", "carry"]);
        assert_eq!(binding.header(ShotField::CarryDistance), Some("Carry (yds)"));
    }

    #[test]
    fn test_missing_required() {
        let schema = ShotSchema::default();
        let binding = schema.bind(["club", "Ball (mph)", "Club (mph)", "Carry (yds)", "Total (yds)"]);
        assert_eq!(binding.missing_required(true), vec![ShotField::Timestamp]);
        assert_eq!(
            binding.missing_required(false),
            vec![ShotField::SessionId, ShotField::Timestamp]
        );
    }

    #[test]
    fn test_required_fields() {
        let required: Vec<ShotField> =
            ShotField::ALL.into_iter().filter(|f| f.is_required()).collect();
        assert_eq!(required.len(), 7);
        assert!(!ShotField::ApexHeight.is_required());
        assert!(!ShotField::SpinRate.is_required());
    }
}
