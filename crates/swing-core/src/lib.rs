//! Core model and analytics for launch-monitor sessions.
//!
//! Raw rows are normalized into [`models::ShotRecord`]s, selected with a
//! [`filter::ShotFilter`] and handed to the calculators. Every calculator is
//! a pure function returning a serializable report whose "unavailable" and
//! "insufficient data" cases are explicit enum variants.

pub mod clubs;
pub mod consistency;
pub mod dispersion;
pub mod efficiency;
pub mod error;
pub mod filter;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod schema;
pub mod settings;
pub mod stats;
pub mod time_utils;

pub use consistency::compute_consistency;
pub use dispersion::compute_dispersion;
pub use efficiency::compute_efficiency;
pub use error::{Result, SwingError};
pub use progress::compute_progress;
