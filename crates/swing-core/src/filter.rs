//! Deterministic record selection by session, club and date.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::clubs::canonicalize_club;
use crate::models::ShotRecord;

/// Inclusive calendar-date range; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |f| date >= f) && self.to.map_or(true, |t| date <= t)
    }

    /// Overlap of two ranges. An inverted result simply matches nothing.
    fn intersect(self, other: DateRange) -> DateRange {
        DateRange {
            from: self.from.max(other.from),
            to: match (self.to, other.to) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
        }
    }
}

/// Selection criteria. `None` for a criterion matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotFilter {
    pub session_ids: Option<BTreeSet<String>>,
    /// Canonical club names.
    pub clubs: Option<BTreeSet<String>>,
    pub date_range: Option<DateRange>,
    /// Zone whose calendar dates `date_range` refers to; UTC when unset.
    #[serde(skip)]
    pub timezone: Option<Tz>,
}

impl ShotFilter {
    /// A filter that matches everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn sessions<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.session_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict to clubs; names are canonicalized so `"7i"` selects `"7 Iron"`.
    pub fn clubs<I, S>(mut self, clubs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.clubs = Some(
            clubs
                .into_iter()
                .map(|c| canonicalize_club(c.as_ref()).name)
                .collect(),
        );
        self
    }

    pub fn dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_range = Some(DateRange::new(from, to));
        self
    }

    /// Compare dates in `tz` instead of UTC.
    pub fn in_timezone(mut self, tz: Tz) -> Self {
        self.timezone = Some(tz);
        self
    }

    /// Conjunction: a record passes only if it passes both filters.
    pub fn and(self, other: ShotFilter) -> ShotFilter {
        fn both<T: Ord + Clone>(
            a: Option<BTreeSet<T>>,
            b: Option<BTreeSet<T>>,
        ) -> Option<BTreeSet<T>> {
            match (a, b) {
                (Some(a), Some(b)) => Some(a.intersection(&b).cloned().collect()),
                (a, b) => a.or(b),
            }
        }

        ShotFilter {
            session_ids: both(self.session_ids, other.session_ids),
            clubs: both(self.clubs, other.clubs),
            date_range: match (self.date_range, other.date_range) {
                (Some(a), Some(b)) => Some(a.intersect(b)),
                (a, b) => a.or(b),
            },
            timezone: self.timezone.or(other.timezone),
        }
    }

    /// Calendar date of `record` in the filter's zone.
    fn local_date(&self, record: &ShotRecord) -> NaiveDate {
        match self.timezone {
            Some(tz) => record.timestamp.with_timezone(&tz).date_naive(),
            None => record.timestamp.date_naive(),
        }
    }

    pub fn matches(&self, record: &ShotRecord) -> bool {
        self.session_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&record.session_id))
            && self
                .clubs
                .as_ref()
                .map_or(true, |clubs| clubs.contains(&record.club))
            && self
                .date_range
                .map_or(true, |range| range.contains(self.local_date(record)))
    }

    /// Matching records ordered by `(timestamp, session_id)`; ties keep their
    /// input order.
    pub fn apply(&self, records: &[ShotRecord]) -> Vec<ShotRecord> {
        let mut selected: Vec<ShotRecord> =
            records.iter().filter(|r| self.matches(r)).cloned().collect();
        selected.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        selected
    }
}

/// Functional form of [`ShotFilter::apply`].
pub fn filter(
    records: &[ShotRecord],
    session_ids: Option<&[String]>,
    clubs: Option<&[String]>,
    date_range: Option<DateRange>,
) -> Vec<ShotRecord> {
    let mut f = ShotFilter::all();
    if let Some(ids) = session_ids {
        f = f.sessions(ids.iter().cloned());
    }
    if let Some(clubs) = clubs {
        f = f.clubs(clubs);
    }
    f.date_range = date_range;
    f.apply(records)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::shot;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<ShotRecord> {
        let a = shot("b-session", 0, "7 Iron", 160.0);
        let mut b = shot("a-session", 0, "Driver", 230.0);
        let c = shot("a-session", 1, "7 Iron", 158.0);
        let mut d = shot("c-session", 0, "7 Iron", 162.0);
        // a and b share a timestamp; d is a day later.
        b.timestamp = a.timestamp;
        d.timestamp += chrono::Duration::days(1);
        vec![d, a, b, c]
    }

    // ── apply ────────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_filter_orders_everything() {
        let out = ShotFilter::all().apply(&sample());
        let ids: Vec<(&str, usize)> =
            out.iter().map(|r| (r.session_id.as_str(), r.sequence)).collect();
        assert_eq!(
            ids,
            vec![("a-session", 0), ("b-session", 0), ("a-session", 1), ("c-session", 0)]
        );
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let mut first = shot("s", 5, "7 Iron", 150.0);
        let second = shot("s", 2, "7 Iron", 151.0);
        first.timestamp = second.timestamp;
        let out = ShotFilter::all().apply(&[first.clone(), second.clone()]);
        assert_eq!(out, vec![first, second]);
    }

    #[test]
    fn test_filter_by_session() {
        let out = ShotFilter::all().sessions(["a-session"]).apply(&sample());
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.session_id == "a-session"));
    }

    #[test]
    fn test_filter_by_club_is_canonicalized() {
        let out = ShotFilter::all().clubs(["7i"]).apply(&sample());
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|r| r.club == "7 Iron"));
    }

    #[test]
    fn test_filter_by_unknown_club_matches_nothing() {
        let out = ShotFilter::all().clubs(["Mini Driver"]).apply(&sample());
        assert!(out.is_empty());
    }

    #[test]
    fn test_date_range_inclusive() {
        let day = date(2024, 5, 4);
        let out = ShotFilter::all().dates(Some(day), Some(day)).apply(&sample());
        assert_eq!(out.len(), 3);

        let open_start = ShotFilter::all().dates(None, Some(day)).apply(&sample());
        assert_eq!(open_start.len(), 3);

        let open_end = ShotFilter::all()
            .dates(Some(date(2024, 5, 5)), None)
            .apply(&sample());
        assert_eq!(open_end.len(), 1);
        assert_eq!(open_end[0].session_id, "c-session");
    }

    #[test]
    fn test_date_range_uses_filter_timezone() {
        // 22:30 UTC on May 4 is 00:30 on May 5 in Madrid.
        let mut late = shot("s", 0, "7 Iron", 160.0);
        late.timestamp = "2024-05-04T22:30:00Z".parse().unwrap();
        let may5 = date(2024, 5, 5);

        let utc = ShotFilter::all().dates(Some(may5), None);
        assert!(!utc.matches(&late));

        let madrid = utc.in_timezone(chrono_tz::Europe::Madrid);
        assert!(madrid.matches(&late));
        assert!(!madrid.clone().dates(None, Some(date(2024, 5, 4))).matches(&late));
    }

    #[test]
    fn test_and_keeps_timezone() {
        let f = ShotFilter::all()
            .clubs(["7i"])
            .and(ShotFilter::all().in_timezone(chrono_tz::Asia::Tokyo));
        assert_eq!(f.timezone, Some(chrono_tz::Asia::Tokyo));
    }

    #[test]
    fn test_empty_input() {
        assert!(ShotFilter::all().clubs(["Driver"]).apply(&[]).is_empty());
    }

    // ── Properties ───────────────────────────────────────────────────────────

    #[test]
    fn test_filter_is_idempotent() {
        let f = ShotFilter::all().clubs(["7 Iron"]).dates(Some(date(2024, 5, 4)), None);
        let once = f.apply(&sample());
        let twice = f.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_composition_equals_conjunction() {
        let c1 = ShotFilter::all().clubs(["7 Iron", "Driver"]);
        let c2 = ShotFilter::all()
            .sessions(["a-session", "c-session"])
            .dates(None, Some(date(2024, 5, 4)));
        let nested = c2.apply(&c1.apply(&sample()));
        let combined = c1.and(c2).apply(&sample());
        assert_eq!(nested, combined);
        assert_eq!(combined.len(), 2);
    }

    #[test]
    fn test_and_intersects_sets() {
        let f = ShotFilter::all()
            .clubs(["Driver", "7 Iron"])
            .and(ShotFilter::all().clubs(["7i"]));
        assert_eq!(f.clubs.unwrap().into_iter().collect::<Vec<_>>(), vec!["7 Iron"]);
    }

    #[test]
    fn test_filter_function() {
        let clubs = vec!["driver".to_string()];
        let out = filter(&sample(), None, Some(&clubs), None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].club, "Driver");
    }
}
