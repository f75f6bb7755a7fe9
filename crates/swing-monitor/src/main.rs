mod bootstrap;
mod report;

use anyhow::{Context, Result};
use swing_core::clubs::ClubProfiles;
use swing_core::normalize::Normalizer;
use swing_core::schema::ShotSchema;
use swing_core::settings::Settings;
use swing_core::time_utils::TimezoneHandler;
use swing_data::analysis::load_shots;
use swing_data::store::DirectorySessionStore;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();
    settings.validate()?;

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("swing-monitor v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "View: {:?}, Metric: {}, Timezone: {}",
        settings.view,
        settings.metric,
        settings.timezone
    );

    let overrides = ClubProfiles::load_overrides(&settings.clubs_path())
        .context("loading club profile overrides")?;
    let profiles = ClubProfiles::with_defaults().with_overrides(&overrides)?;

    let store = DirectorySessionStore::new(settings.sessions_dir(), settings.max_records);
    for source in &settings.import {
        store
            .import_file(source)
            .with_context(|| format!("importing {}", source.display()))?;
    }

    let normalizer = Normalizer::new(
        ShotSchema::default(),
        TimezoneHandler::try_new(&settings.timezone)?,
    );
    let analysis = load_shots(&store, &normalizer)
        .with_context(|| format!("loading sessions from {}", store.root().display()))?;

    let envelope = report::build_report(&settings, &analysis, &profiles)?;
    let output = if settings.pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    println!("{}", output);

    Ok(())
}
