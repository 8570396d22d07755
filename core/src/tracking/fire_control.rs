use crate::tracking::track::Track;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FireControlStatus {
    Ok,
    NoTarget,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireControlResponse {
    pub requested: u8,
    pub status: FireControlStatus,
    pub track: Option<Track>,
}

impl FireControlResponse {
    pub fn selected(&self) -> Option<u8> {
        self.track.as_ref().map(|track| track.id)
    }

    pub fn describe(&self) -> String {
        match &self.track {
            Some(track) => format!(
                "request {} -> {} ({:?}) at {:.1} m / {:.1} deg",
                self.requested, track.id, self.status, track.distance_m, track.azimuth_deg
            ),
            None => format!("request {} -> none ({:?})", self.requested, self.status),
        }
    }
}

pub fn resolve(tracks: &BTreeMap<u8, Track>, requested: u8) -> FireControlResponse {
    if let Some(track) = tracks.get(&requested) {
        return FireControlResponse {
            requested,
            status: FireControlStatus::Ok,
            track: Some(track.clone()),
        };
    }

    match tracks
        .values()
        .min_by(|a, b| a.distance_m.total_cmp(&b.distance_m))
    {
        Some(nearest) => FireControlResponse {
            requested,
            status: FireControlStatus::Fallback,
            track: Some(nearest.clone()),
        },
        None => FireControlResponse {
            requested,
            status: FireControlStatus::NoTarget,
            track: None,
        },
    }
}
