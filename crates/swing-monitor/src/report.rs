use serde::Serialize;
use serde_json::Value;
use swing_core::clubs::{sort_clubs, ClubProfiles};
use swing_core::consistency::compute_consistency_with;
use swing_core::dispersion::compute_dispersion;
use swing_core::efficiency::compute_efficiency_with;
use swing_core::filter::ShotFilter;
use swing_core::models::{SessionInfo, ShotRecord};
use swing_core::normalize::RowValidationError;
use swing_core::progress::compute_progress;
use swing_core::settings::{Settings, View};
use swing_data::aggregator::SummaryAggregator;
use swing_data::analysis::{AnalysisMetadata, AnalysisResult, SessionLoadFailure};
use tracing::{debug, info};

/// Everything printed for one run.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub view: View,
    pub filter: ShotFilter,
    /// Records left after filtering.
    pub records: usize,
    pub report: Value,
    pub failures: &'a [SessionLoadFailure],
    pub diagnostics: &'a [RowValidationError],
    pub metadata: &'a AnalysisMetadata,
}

/// Filter the loaded records and compute the requested view.
pub fn build_report<'a>(
    settings: &Settings,
    analysis: &'a AnalysisResult,
    profiles: &ClubProfiles,
) -> anyhow::Result<Envelope<'a>> {
    let filter = settings.shot_filter();
    let records = filter.apply(&analysis.records);
    debug!(
        "{} of {} records selected",
        records.len(),
        analysis.records.len()
    );

    let report = match settings.view {
        View::Sessions => serde_json::to_value(selected_sessions(&analysis.sessions, &records))?,
        View::Summary => {
            let summary = SummaryAggregator::new(profiles)
                .base_metric(settings.metric)
                .trend_threshold(settings.trend_threshold)
                .consistency(settings.consistency_config())
                .summarize(&records);
            serde_json::to_value(summary)?
        }
        View::Efficiency => serde_json::to_value(compute_efficiency_with(
            &records,
            profiles,
            &settings.efficiency_config(),
        ))?,
        View::Consistency => serde_json::to_value(compute_consistency_with(
            &records,
            settings.metric,
            &settings.consistency_config(),
        ))?,
        View::Progress => {
            let reports: Vec<_> = progress_clubs(settings, &records)
                .iter()
                .map(|club| {
                    compute_progress(
                        &records,
                        club,
                        settings.metric,
                        settings.window,
                        settings.trend_threshold,
                    )
                })
                .collect();
            serde_json::to_value(reports)?
        }
        View::Dispersion => serde_json::to_value(compute_dispersion(
            &records,
            settings.x_metric,
            settings.y_metric,
            settings.outlier_threshold,
        ))?,
    };

    info!("Built {:?} report over {} records", settings.view, records.len());

    Ok(Envelope {
        view: settings.view,
        filter,
        records: records.len(),
        report,
        failures: &analysis.failures,
        diagnostics: &analysis.diagnostics,
        metadata: &analysis.metadata,
    })
}

/// Sessions that still have at least one record after filtering.
fn selected_sessions<'a>(sessions: &'a [SessionInfo], records: &[ShotRecord]) -> Vec<&'a SessionInfo> {
    sessions
        .iter()
        .filter(|s| records.iter().any(|r| r.session_id == s.id))
        .collect()
}

/// `--club` values when given, otherwise every club present, in bag order.
fn progress_clubs(settings: &Settings, records: &[ShotRecord]) -> Vec<String> {
    if !settings.clubs.is_empty() {
        return settings.clubs.clone();
    }
    let mut clubs: Vec<String> = records.iter().map(|r| r.club.clone()).collect();
    clubs.sort();
    clubs.dedup();
    sort_clubs(&mut clubs);
    clubs
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use swing_core::normalize::Normalizer;
    use swing_data::analysis::load_shots;
    use swing_data::store::DirectorySessionStore;
    use tempfile::TempDir;

    const SESSION_A: &str = "\
Date,Club,Ball (mph),Club (mph),Carry (yds),Total (yds),Curve Dist (yds)
2024-05-04 17:46:00,Driver,148,100,228,250,-4
2024-05-04 17:47:00,7i,108,82,160,168,1
2024-05-04 17:48:00,7i,107,81,158,166,-1
2024-05-04 17:49:00,7i,109,82,162,170,2
";

    const SESSION_B: &str = "\
Date,Club,Ball (mph),Club (mph),Carry (yds),Total (yds),Curve Dist (yds)
2024-05-11 09:00:00,7i,110,82,165,172,0
2024-05-11 09:01:00,7i,111,82,166,174,-2
";

    fn analysis() -> (TempDir, AnalysisResult) {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.csv"), SESSION_A).unwrap();
        std::fs::write(tmp.path().join("b.csv"), SESSION_B).unwrap();
        let store = DirectorySessionStore::new(tmp.path(), 100);
        let result = load_shots(&store, &Normalizer::default()).unwrap();
        (tmp, result)
    }

    fn settings(args: &[&str]) -> Settings {
        let mut argv = vec!["swing-monitor"];
        argv.extend_from_slice(args);
        Settings::parse_from(argv)
    }

    #[test]
    fn test_sessions_view_respects_filter() {
        let (_tmp, result) = analysis();
        let profiles = ClubProfiles::with_defaults();
        let envelope =
            build_report(&settings(&["--view", "sessions", "--from", "2024-05-10"]), &result, &profiles)
                .unwrap();
        assert_eq!(envelope.records, 2);
        let ids: Vec<&str> = envelope.report.as_array().unwrap().iter().map(|s| s["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_progress_view_per_club() {
        let (_tmp, result) = analysis();
        let profiles = ClubProfiles::with_defaults();

        let all = build_report(&settings(&["--view", "progress"]), &result, &profiles).unwrap();
        let clubs: Vec<&str> = all.report.as_array().unwrap().iter().map(|r| r["club"].as_str().unwrap()).collect();
        assert_eq!(clubs, vec!["Driver", "7 Iron"]);

        let iron = build_report(&settings(&["--view", "progress", "--club", "7i"]), &result, &profiles).unwrap();
        let reports = iron.report.as_array().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0]["club"], "7 Iron");
        assert_eq!(reports[0]["points"].as_array().unwrap().len(), 2);
        assert_eq!(reports[0]["trend"]["status"], "improving");
    }

    #[test]
    fn test_summary_and_efficiency_views() {
        let (_tmp, result) = analysis();
        let profiles = ClubProfiles::with_defaults();

        let summary = build_report(&settings(&["--view", "summary"]), &result, &profiles).unwrap();
        assert_eq!(summary.report["rows"].as_array().unwrap().len(), 3);
        assert_eq!(summary.report["trends"][0]["club"], "7 Iron");

        let efficiency = build_report(&settings(&["--view", "efficiency"]), &result, &profiles).unwrap();
        assert_eq!(efficiency.report["shots"].as_array().unwrap().len(), 6);
        assert_eq!(efficiency.report["overall"]["status"], "available");
    }

    #[test]
    fn test_dispersion_and_consistency_views() {
        let (_tmp, result) = analysis();
        let profiles = ClubProfiles::with_defaults();

        let dispersion = build_report(&settings(&["--view", "dispersion", "--club", "7i"]), &result, &profiles).unwrap();
        assert_eq!(dispersion.report["status"], "cluster");
        assert_eq!(dispersion.report["samples"], 5);

        let consistency = build_report(
            &settings(&["--view", "consistency", "--metric", "ball_speed"]),
            &result,
            &profiles,
        )
        .unwrap();
        assert_eq!(consistency.report["metric"], "ball_speed");
    }

    #[test]
    fn test_envelope_serializes() {
        let (_tmp, result) = analysis();
        let profiles = ClubProfiles::with_defaults();
        let envelope = build_report(&settings(&[]), &result, &profiles).unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["view"], "sessions");
        assert_eq!(json["records"], 6);
        assert!(json["failures"].as_array().unwrap().is_empty());
        assert_eq!(json["metadata"]["sessions_loaded"], 2);
    }
}
