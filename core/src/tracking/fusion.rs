//! Track table maintenance: association, smoothing, aging and threat scoring.
//!
//! Per update:
//! 1. image detections with an existing track blend into it (α = 0.6);
//! 2. radar detections blend into their track, or start one;
//! 3. the remaining image detections are associated with the closest radar
//!    detection and fused into that track (α = 0.5) when the combined
//!    distance/azimuth score is under the gate, or tracked on their own;
//! 4. tracks untouched for more than [`TRACK_TTL_S`] are evicted;
//! 5. every surviving track is re-scored.

use crate::math::{AngleHelper, StatsHelper};
use crate::protocol::{Frame, ImageTarget, RadarMode, RadarTarget};
use crate::telemetry::LogManager;
use crate::tracking::fire_control::{self, FireControlResponse};
use crate::tracking::track::{Track, TrackSource};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

pub const IMAGE_ALPHA: f64 = 0.6;
pub const RADAR_ALPHA: f64 = 0.6;
pub const FUSION_ALPHA: f64 = 0.5;
pub const FUSION_GATE: f64 = 0.15;
pub const TRACK_TTL_S: f64 = 5.0;

pub fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}

pub fn association_score(image: &ImageTarget, radar: &RadarTarget) -> f64 {
    StatsHelper::normalized_difference(image.distance_m, radar.distance_m)
        + AngleHelper::circular_difference(image.azimuth_deg, radar.azimuth_deg) / 180.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub created: usize,
    pub updated: usize,
    pub fused: usize,
    pub evicted: usize,
}

pub struct FusionTracker {
    tracks: BTreeMap<u8, Track>,
    mode: RadarMode,
    updates: u64,
    logger: LogManager,
}

impl FusionTracker {
    pub fn new() -> Self {
        Self {
            tracks: BTreeMap::new(),
            mode: RadarMode::default(),
            updates: 0,
            logger: LogManager::new("tracker"),
        }
    }

    pub fn mode(&self) -> RadarMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RadarMode) {
        self.mode = mode;
    }

    pub fn update_count(&self) -> u64 {
        self.updates
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, id: u8) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn get_tracks(&self) -> Vec<Track> {
        self.tracks.values().cloned().collect()
    }

    pub fn update(&mut self, images: &[ImageTarget], radars: &[RadarTarget]) -> UpdateSummary {
        self.update_at(images, radars, now_seconds())
    }

    pub fn update_at(
        &mut self,
        images: &[ImageTarget],
        radars: &[RadarTarget],
        now: f64,
    ) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        let mut touched = BTreeSet::new();
        let mut unmatched = Vec::new();

        for image in images {
            match self.tracks.get_mut(&image.id) {
                Some(track) => {
                    track.blend(
                        image.distance_m,
                        image.azimuth_deg,
                        image.speed_m_s,
                        IMAGE_ALPHA,
                        TrackSource::Image,
                        now,
                    );
                    touched.insert(image.id);
                    summary.updated += 1;
                }
                None => unmatched.push(image),
            }
        }

        for radar in radars {
            match self.tracks.get_mut(&radar.id) {
                Some(track) => {
                    track.blend(
                        radar.distance_m,
                        radar.azimuth_deg,
                        radar.velocity_m_s,
                        RADAR_ALPHA,
                        TrackSource::Radar,
                        now,
                    );
                    track.rcs_db = Some(radar.rcs_db);
                    summary.updated += 1;
                }
                None => {
                    self.tracks.insert(radar.id, Track::from_radar(radar, now));
                    summary.created += 1;
                }
            }
            touched.insert(radar.id);
        }

        for image in unmatched {
            let best = radars
                .iter()
                .map(|radar| (radar, association_score(image, radar)))
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match best {
                Some((radar, score)) if score < FUSION_GATE => {
                    self.fuse(image, radar, now);
                    touched.insert(radar.id);
                    summary.fused += 1;
                }
                _ => {
                    let same_id_rcs = radars
                        .iter()
                        .find(|radar| radar.id == image.id)
                        .map(|radar| radar.rcs_db);
                    match self.tracks.get_mut(&image.id) {
                        // Started by a radar detection earlier in this update.
                        Some(track) => {
                            track.blend(
                                image.distance_m,
                                image.azimuth_deg,
                                image.speed_m_s,
                                IMAGE_ALPHA,
                                TrackSource::Image,
                                now,
                            );
                            summary.updated += 1;
                        }
                        None => {
                            self.tracks.insert(
                                image.id,
                                Track::from_image(
                                    image.id,
                                    image,
                                    TrackSource::Image,
                                    same_id_rcs,
                                    now,
                                ),
                            );
                            summary.created += 1;
                        }
                    }
                    touched.insert(image.id);
                }
            }
        }

        let before = self.tracks.len();
        self.tracks
            .retain(|id, track| touched.contains(id) || track.age(now) <= TRACK_TTL_S);
        summary.evicted = before - self.tracks.len();

        let mode = self.mode;
        for track in self.tracks.values_mut() {
            track.threat_score = track.compute_threat(mode);
        }

        self.updates += 1;
        self.logger.detail(&format!(
            "update {}: {} tracks ({:?})",
            self.updates,
            self.tracks.len(),
            summary
        ));
        if summary.evicted > 0 {
            self.logger
                .record(&format!("evicted {} stale tracks", summary.evicted));
        }
        summary
    }

    fn fuse(&mut self, image: &ImageTarget, radar: &RadarTarget, now: f64) {
        match self.tracks.get_mut(&radar.id) {
            Some(track) => {
                track.blend(
                    image.distance_m,
                    image.azimuth_deg,
                    image.speed_m_s,
                    FUSION_ALPHA,
                    TrackSource::Fused,
                    now,
                );
                if track.rcs_db.is_none() {
                    track.rcs_db = Some(radar.rcs_db);
                }
            }
            None => {
                self.tracks.insert(
                    radar.id,
                    Track::from_image(
                        radar.id,
                        image,
                        TrackSource::Fused,
                        Some(radar.rcs_db),
                        now,
                    ),
                );
            }
        }
    }

    pub fn query(&self, requested_ids: &[u8]) -> Vec<FireControlResponse> {
        requested_ids
            .iter()
            .map(|&requested| fire_control::resolve(&self.tracks, requested))
            .collect()
    }

    pub fn ingest_frame(&mut self, frame: &Frame, now: f64) -> Vec<FireControlResponse> {
        self.update_at(&frame.image_targets, &frame.radar_targets, now);
        self.query(&frame.requested_ids())
    }
}

impl Default for FusionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::fire_control::FireControlStatus;

    fn image(id: u8, distance_m: f64, azimuth_deg: f64) -> ImageTarget {
        ImageTarget {
            id,
            type_code: 1,
            distance_m,
            azimuth_deg,
            frequency_hz: 0.0,
            predicted_distance_m: distance_m,
            predicted_azimuth_deg: azimuth_deg,
            speed_m_s: 150.0,
            heading_deg: 0.0,
        }
    }

    fn radar(id: u8, distance_m: f64, azimuth_deg: f64) -> RadarTarget {
        RadarTarget {
            id,
            distance_m,
            azimuth_deg,
            rcs_db: 4.0,
            velocity_m_s: 120.0,
        }
    }

    #[test]
    fn image_update_crosses_north_the_short_way() {
        let mut tracker = FusionTracker::new();
        tracker.update_at(&[image(7, 10_000.0, 359.0)], &[], 0.0);
        tracker.update_at(&[image(7, 10_000.0, 1.0)], &[], 0.1);
        let azimuth = tracker.track(7).unwrap().azimuth_deg;
        assert!(
            AngleHelper::circular_difference(azimuth, 0.0) < 1.0,
            "azimuth drifted to {}",
            azimuth
        );
    }

    #[test]
    fn radar_update_crosses_north_the_short_way() {
        let mut tracker = FusionTracker::new();
        tracker.update_at(&[], &[radar(9, 10_000.0, 1.0)], 0.0);
        tracker.update_at(&[], &[radar(9, 10_000.0, 359.0)], 0.1);
        let track = tracker.track(9).unwrap();
        assert!(AngleHelper::circular_difference(track.azimuth_deg, 0.0) < 1.0);
        assert_eq!(track.source, TrackSource::Radar);
        assert!((track.speed_m_s - 120.0).abs() < 1e-9);
    }

    #[test]
    fn nearby_image_fuses_into_radar_track() {
        let mut tracker = FusionTracker::new();
        tracker.update_at(&[image(30, 10_050.0, 50.2)], &[radar(200, 10_000.0, 50.0)], 0.0);
        let tracks = tracker.get_tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, 200);
        assert_eq!(tracks[0].source, TrackSource::Fused);
        assert!((tracks[0].distance_m - 10_025.0).abs() < 1e-9);
        assert!((tracks[0].azimuth_deg - 50.1).abs() < 1e-6);
        assert_eq!(tracks[0].rcs_db, Some(4.0));
    }

    #[test]
    fn distant_image_gets_its_own_track() {
        let mut tracker = FusionTracker::new();
        let summary =
            tracker.update_at(&[image(30, 30_000.0, 200.0)], &[radar(200, 10_000.0, 50.0)], 0.0);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.fused, 0);
        let image_track = tracker.track(30).unwrap();
        assert_eq!(image_track.source, TrackSource::Image);
        assert_eq!(image_track.rcs_db, None);
    }

    #[test]
    fn association_considers_all_radar_targets() {
        let image_target = image(30, 10_050.0, 50.2);
        let matched = radar(200, 10_000.0, 50.0);
        let score = association_score(&image_target, &matched);
        assert!(score < FUSION_GATE);
        let wrapped = association_score(&image(1, 5_000.0, 359.5), &radar(2, 5_000.0, 0.5));
        assert!((wrapped - 1.0 / 180.0).abs() < 1e-9);
    }

    #[test]
    fn stale_tracks_are_evicted_after_ttl() {
        let mut tracker = FusionTracker::new();
        tracker.update_at(&[image(1, 8_000.0, 10.0)], &[], 0.0);

        tracker.update_at(&[], &[], 4.9);
        assert_eq!(tracker.get_tracks().len(), 1);

        let summary = tracker.update_at(&[], &[], 5.1);
        assert_eq!(summary.evicted, 1);
        assert!(tracker.get_tracks().is_empty());
    }

    #[test]
    fn refreshed_tracks_survive() {
        let mut tracker = FusionTracker::new();
        tracker.update_at(&[image(1, 8_000.0, 10.0)], &[], 0.0);
        tracker.update_at(&[image(1, 8_100.0, 10.0)], &[], 4.0);
        tracker.update_at(&[], &[], 8.9);
        assert!(tracker.track(1).is_some());
        tracker.update_at(&[], &[], 9.1);
        assert!(tracker.track(1).is_none());
    }

    #[test]
    fn threat_scores_follow_mode() {
        let mut tracker = FusionTracker::new();
        tracker.update_at(&[], &[radar(3, 25_000.0, 0.0)], 0.0);
        let normal = tracker.track(3).unwrap().threat_score;
        tracker.set_mode(RadarMode::AirCombat);
        tracker.update_at(&[], &[], 0.5);
        let combat = tracker.track(3).unwrap().threat_score;
        assert!((combat - normal * 1.5).abs() < 1e-9);
    }

    #[test]
    fn query_falls_back_without_mutating() {
        let mut tracker = FusionTracker::new();
        assert_eq!(tracker.query(&[42])[0].status, FireControlStatus::NoTarget);

        tracker.update_at(&[], &[radar(3, 25_000.0, 0.0)], 0.0);
        let before = tracker.get_tracks();
        let responses = tracker.query(&[42, 3]);
        assert_eq!(responses[0].status, FireControlStatus::Fallback);
        assert_eq!(responses[0].selected(), Some(3));
        assert_eq!(responses[1].status, FireControlStatus::Ok);
        assert_eq!(tracker.get_tracks(), before);
    }

    #[test]
    fn ingest_frame_updates_and_answers_requests() {
        let mut tracker = FusionTracker::new();
        let frame = Frame::new(
            1,
            vec![image(101, 12_000.0, 45.0)],
            vec![radar(101, 12_000.0, 45.0)],
            vec![101.into()],
        );
        let responses = tracker.ingest_frame(&frame, 0.0);
        assert_eq!(tracker.len(), 1);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status, FireControlStatus::Ok);
        assert_eq!(tracker.update_count(), 1);
    }
}
