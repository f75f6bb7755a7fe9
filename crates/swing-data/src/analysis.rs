//! Main analysis pipeline.
//!
//! Loads every session from a [`SessionStore`], normalizes its rows and
//! returns one combined, ordered record set together with the diagnostics
//! needed to explain what was left out.

use chrono::Utc;
use serde::Serialize;
use swing_core::clubs::sort_clubs;
use swing_core::error::Result;
use swing_core::filter::ShotFilter;
use swing_core::models::{Session, SessionId, SessionInfo, ShotRecord};
use swing_core::normalize::{Normalizer, RowValidationError};
use tracing::{debug, info, warn};

use crate::store::SessionStore;

// ── Public types ──────────────────────────────────────────────────────────────

/// A session that contributed no records, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionLoadFailure {
    pub session_id: SessionId,
    pub reason: String,
}

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    pub sessions_found: usize,
    pub sessions_loaded: usize,
    pub rows_read: usize,
    pub rows_skipped: usize,
    /// Wall-clock seconds spent reading and normalizing.
    pub load_time_seconds: f64,
}

/// The complete output of [`load_shots`].
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// Every valid record, ordered by `(timestamp, session_id)`.
    pub records: Vec<ShotRecord>,
    /// Loaded sessions in chronological order.
    pub sessions: Vec<SessionInfo>,
    /// Rows that were skipped.
    pub diagnostics: Vec<RowValidationError>,
    /// Sessions that were excluded.
    pub failures: Vec<SessionLoadFailure>,
    pub metadata: AnalysisMetadata,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full ingestion pipeline over `store`.
///
/// Only a failure to enumerate the store is an error. A session that cannot
/// be read, lacks required columns or holds no valid shot is reported in
/// [`AnalysisResult::failures`] and the remaining sessions still load.
pub fn load_shots<S: SessionStore + ?Sized>(
    store: &S,
    normalizer: &Normalizer,
) -> Result<AnalysisResult> {
    let load_start = std::time::Instant::now();
    let ids = store.list_sessions()?;

    let mut sessions: Vec<Session> = Vec::new();
    let mut diagnostics = Vec::new();
    let mut failures = Vec::new();
    let mut rows_read = 0usize;

    for id in &ids {
        let rows = match store.load_session(id) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Excluding session {}: {}", id, e);
                failures.push(SessionLoadFailure {
                    session_id: id.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        rows_read += rows.len();

        let missing = normalizer.bind_rows(&rows).missing_required(true);
        if !rows.is_empty() && !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
            let reason = format!("missing required columns: {}", names.join(", "));
            warn!("Excluding session {}: {}", id, reason);
            failures.push(SessionLoadFailure {
                session_id: id.clone(),
                reason,
            });
            continue;
        }

        let batch = normalizer.normalize_session(id, &rows);
        diagnostics.extend(batch.skipped);

        match Session::new(id.clone(), store.session_label(id), batch.records) {
            Some(session) => sessions.push(session),
            None => {
                warn!("Excluding session {}: no valid shot records", id);
                failures.push(SessionLoadFailure {
                    session_id: id.clone(),
                    reason: "no valid shot records".to_string(),
                });
            }
        }
    }

    sessions.sort_by(|a, b| {
        a.started_at()
            .cmp(&b.started_at())
            .then_with(|| a.id.cmp(&b.id))
    });

    let infos: Vec<SessionInfo> = sessions.iter().map(session_info).collect();
    let all: Vec<ShotRecord> = sessions.into_iter().flat_map(|s| s.shots).collect();
    let records = ShotFilter::all().apply(&all);

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        sessions_found: ids.len(),
        sessions_loaded: infos.len(),
        rows_read,
        rows_skipped: diagnostics.len(),
        load_time_seconds: load_start.elapsed().as_secs_f64(),
    };

    info!(
        "Loaded {} records from {} of {} sessions ({} rows skipped)",
        records.len(),
        metadata.sessions_loaded,
        metadata.sessions_found,
        metadata.rows_skipped
    );
    debug!("Load took {:.3}s", metadata.load_time_seconds);

    Ok(AnalysisResult {
        records,
        sessions: infos,
        diagnostics,
        failures,
        metadata,
    })
}

fn session_info(session: &Session) -> SessionInfo {
    let mut clubs: Vec<String> = session.shots.iter().map(|s| s.club.clone()).collect();
    clubs.sort();
    clubs.dedup();
    sort_clubs(&mut clubs);
    SessionInfo {
        id: session.id.clone(),
        label: session.label.clone(),
        date: session.date,
        shots: session.shots.len(),
        clubs,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
