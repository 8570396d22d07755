pub mod fire_control;
pub mod fusion;
pub mod track;

pub use fire_control::{FireControlResponse, FireControlStatus};
pub use fusion::{association_score, now_seconds, FusionTracker, UpdateSummary, TRACK_TTL_S};
pub use track::{Track, TrackSource};

use std::sync::{Arc, Mutex};

/// The one lock guarding the track table between the tick and receive paths.
pub type SharedTracker = Arc<Mutex<FusionTracker>>;

pub fn shared(tracker: FusionTracker) -> SharedTracker {
    Arc::new(Mutex::new(tracker))
}
