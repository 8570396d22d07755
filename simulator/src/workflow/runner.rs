//! Tick loop and receive path joining generator, codec, transport and tracker.

use crate::gui_bridge::model::StatusReport;
use crate::workflow::config::{Role, SimulatorConfig};
use anyhow::Context;
use log::{debug, info, warn};
use radarcore::generator::{MotionMode, TargetGenerator};
use radarcore::protocol::{hexdump, Frame, FrameCodec, RadarMode};
use radarcore::telemetry::LinkMetrics;
use radarcore::tracking::{self, now_seconds, FireControlResponse, FusionTracker, SharedTracker, Track};
use radarcore::transport::Transport;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub frame: Frame,
    pub sent: Option<bool>,
    pub responses: Vec<FireControlResponse>,
}

#[derive(Clone)]
pub struct Runner {
    config: SimulatorConfig,
    generator: Arc<Mutex<TargetGenerator>>,
    tracker: SharedTracker,
    transport: Arc<Transport>,
    metrics: Arc<LinkMetrics>,
    stop: Arc<watch::Sender<bool>>,
    ticks: Arc<AtomicU64>,
}

impl Runner {
    pub fn new(config: SimulatorConfig) -> Self {
        let mut generator = TargetGenerator::new(config.generator.clone());
        generator.set_mode(config.mode);
        generator.set_motion_mode(config.motion);
        let mut tracker = FusionTracker::new();
        tracker.set_mode(config.mode);
        let (stop, _) = watch::channel(false);
        Self {
            config,
            generator: Arc::new(Mutex::new(generator)),
            tracker: tracking::shared(tracker),
            transport: Arc::new(Transport::new()),
            metrics: Arc::new(LinkMetrics::new()),
            stop: Arc::new(stop),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn tracker(&self) -> SharedTracker {
        Arc::clone(&self.tracker)
    }

    pub fn metrics(&self) -> Arc<LinkMetrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn connect(&self) -> anyhow::Result<Option<SocketAddr>> {
        self.install_receive_path();
        let host = self.config.host.as_str();
        let port = self.config.port;
        let endpoint = match self.config.role {
            Role::Standalone => None,
            Role::Server => Some(
                self.transport
                    .start_server(host, port)
                    .await
                    .with_context(|| format!("starting server on {}:{}", host, port))?,
            ),
            Role::Client => Some(
                self.transport
                    .connect_client(host, port)
                    .await
                    .with_context(|| format!("connecting to {}:{}", host, port))?,
            ),
        };
        if let Some(addr) = endpoint {
            info!("link up as {:?} on {}", self.config.role, addr);
        }
        Ok(endpoint)
    }

    fn install_receive_path(&self) {
        let tracker = Arc::clone(&self.tracker);
        let metrics = Arc::clone(&self.metrics);
        let track_remote = self.config.track_remote;
        self.transport.set_receive_callback(move |payload| {
            let frame = match FrameCodec::try_decode(&payload) {
                Ok(frame) => frame,
                Err(err) => {
                    metrics.record_malformed();
                    warn!("discarding malformed frame ({}): {}", err, hexdump(&payload, 16));
                    return;
                }
            };
            metrics.record_received();
            debug!("received {}", frame.summary());
            if !track_remote {
                return;
            }
            let responses = match tracker.lock() {
                Ok(mut tracker) => tracker.ingest_frame(&frame, now_seconds()),
                Err(_) => {
                    warn!("track table lock poisoned; frame dropped");
                    return;
                }
            };
            for response in &responses {
                debug!("remote {}", response.describe());
            }
        });
    }

    pub async fn tick(&self) -> anyhow::Result<TickReport> {
        let output = {
            let mut generator = self
                .generator
                .lock()
                .map_err(|_| anyhow::anyhow!("generator lock poisoned"))?;
            generator.generate_tick()
        };
        let frame = output.to_frame(self.config.stream_id);
        let bytes = FrameCodec::encode(&frame);

        let sent = if self.config.role == Role::Standalone {
            None
        } else {
            let ok = self.transport.send(&bytes).await;
            if ok {
                self.metrics.record_sent();
            } else {
                self.metrics.record_send_failure();
            }
            Some(ok)
        };

        let responses = if self.config.track_local {
            let mut tracker = self
                .tracker
                .lock()
                .map_err(|_| anyhow::anyhow!("track table lock poisoned"))?;
            tracker.update(&output.image_targets, &output.radar_targets);
            tracker.query(&frame.requested_ids())
        } else {
            Vec::new()
        };

        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("tick {}: {} ({} bytes)", tick, frame.summary(), bytes.len());
        for response in &responses {
            debug!("local {}", response.describe());
        }
        Ok(TickReport {
            tick,
            frame,
            sent,
            responses,
        })
    }

    pub async fn run(&self) -> anyhow::Result<u64> {
        let mut stop = self.stop.subscribe();
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut completed = 0u64;

        while !*stop.borrow_and_update() {
            if self.config.ticks.is_some_and(|limit| completed >= limit) {
                break;
            }
            tokio::select! {
                _ = stop.changed() => break,
                _ = interval.tick() => {
                    let report = self.tick().await.context("running simulation tick")?;
                    if report.sent == Some(false) {
                        warn!("tick {} was not delivered to every peer", report.tick);
                    }
                    completed += 1;
                }
            }
        }

        info!("tick loop finished after {} ticks", completed);
        Ok(completed)
    }

    pub fn stop(&self) {
        if !self.stop.send_replace(true) {
            info!("stopping tick loop");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    pub async fn stopped(&self) {
        let mut stop = self.stop.subscribe();
        while !*stop.borrow_and_update() {
            if stop.changed().await.is_err() {
                return;
            }
        }
    }

    pub async fn shutdown(&self) {
        self.stop();
        self.transport.disconnect().await;
    }

    pub fn set_mode(&self, mode: RadarMode) {
        if let Ok(mut generator) = self.generator.lock() {
            generator.set_mode(mode);
        }
        if let Ok(mut tracker) = self.tracker.lock() {
            tracker.set_mode(mode);
        }
    }

    pub fn set_motion_mode(&self, motion: MotionMode) {
        if let Ok(mut generator) = self.generator.lock() {
            generator.set_motion_mode(motion);
        }
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.tracker
            .lock()
            .map(|tracker| tracker.get_tracks())
            .unwrap_or_default()
    }

    pub fn query(&self, ids: &[u8]) -> Vec<FireControlResponse> {
        self.tracker
            .lock()
            .map(|tracker| tracker.query(ids))
            .unwrap_or_default()
    }

    pub async fn status(&self) -> anyhow::Result<StatusReport> {
        let (mode, motion, radar) = {
            let generator = self
                .generator
                .lock()
                .map_err(|_| anyhow::anyhow!("generator lock poisoned"))?;
            (generator.mode(), generator.motion_mode(), generator.status().clone())
        };
        Ok(StatusReport {
            role: self.config.role,
            link_active: self.transport.is_active().await,
            peers: self.transport.peer_count().await,
            mode,
            motion,
            ticks: self.ticks.load(Ordering::SeqCst),
            tracks: self.tracks().len(),
            radar,
            metrics: self.metrics.snapshot(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radarcore::generator::GeneratorConfig;
    use radarcore::tracking::FireControlStatus;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    fn config(role: Role, motion: MotionMode) -> SimulatorConfig {
        SimulatorConfig {
            role,
            port: 0,
            motion,
            tick_interval_ms: 5,
            generator: GeneratorConfig {
                seed: Some(11),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn eventually<F: Fn() -> bool>(check: F) {
        timeout(Duration::from_secs(5), async {
            while !check() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition never held");
    }

    #[tokio::test]
    async fn standalone_run_tracks_roster() {
        let runner = Runner::new(SimulatorConfig {
            ticks: Some(3),
            ..config(Role::Standalone, MotionMode::Linear)
        });
        assert_eq!(runner.connect().await.unwrap(), None);
        assert_eq!(runner.run().await.unwrap(), 3);

        let tracks = runner.tracks();
        assert_eq!(tracks.len(), 6);
        assert!(tracks.iter().all(|track| track.id >= 101));
        assert_eq!(runner.metrics().snapshot().frames_sent, 0);
    }

    #[tokio::test]
    async fn roster_requests_resolve_exactly() {
        let runner = Runner::new(config(Role::Standalone, MotionMode::Circular));
        for _ in 0..5 {
            let report = runner.tick().await.unwrap();
            assert_eq!(report.sent, None);
            assert_eq!(report.responses.len(), report.frame.requests.len());
            for response in &report.responses {
                assert_eq!(response.status, FireControlStatus::Ok);
            }
        }
    }

    #[tokio::test]
    async fn mode_changes_reach_generator_and_tracker() {
        let runner = Runner::new(config(Role::Standalone, MotionMode::Random));
        runner.set_mode(RadarMode::AirCombat);
        runner.set_motion_mode(MotionMode::Circular);
        let status = runner.status().await.unwrap();
        assert_eq!(status.mode, RadarMode::AirCombat);
        assert_eq!(status.motion, MotionMode::Circular);
        assert_eq!(status.radar.scan_rate_deg_s, 180.0);
        assert_eq!(runner.tracker().lock().unwrap().mode(), RadarMode::AirCombat);
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_ends_run() {
        let runner = Runner::new(config(Role::Standalone, MotionMode::Random));
        runner.stop();
        runner.stop();
        assert!(runner.is_stopped());
        assert_eq!(runner.run().await.unwrap(), 0);
        runner.stopped().await;
    }

    #[tokio::test]
    async fn stop_during_run_leaves_link_up() {
        let server = Runner::new(config(Role::Server, MotionMode::Random));
        server.connect().await.unwrap();
        let background = server.clone();
        let handle = tokio::spawn(async move { background.run().await });
        sleep(Duration::from_millis(30)).await;
        server.stop();
        let ticks = handle.await.unwrap().unwrap();
        assert!(ticks > 0);
        assert!(server.status().await.unwrap().link_active);
        server.shutdown().await;
        assert!(!server.status().await.unwrap().link_active);
    }

    #[tokio::test]
    async fn client_tracks_frames_from_server() {
        let server = Runner::new(SimulatorConfig {
            track_local: false,
            ..config(Role::Server, MotionMode::Linear)
        });
        let addr = server.connect().await.unwrap().unwrap();

        let client = Runner::new(SimulatorConfig {
            port: addr.port(),
            track_local: false,
            ..config(Role::Client, MotionMode::Random)
        });
        client.connect().await.unwrap();
        timeout(Duration::from_secs(5), async {
            while server.status().await.unwrap().peers < 1 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("client never connected");

        let report = server.tick().await.unwrap();
        assert_eq!(report.sent, Some(true));
        assert!(server.tracks().is_empty());

        eventually(|| client.tracks().len() == 6).await;
        assert_eq!(client.metrics().snapshot().frames_received, 1);

        client.shutdown().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_frames_are_counted_and_dropped() {
        let server = Runner::new(config(Role::Server, MotionMode::Random));
        let addr = server.connect().await.unwrap().unwrap();

        let raw = Transport::new();
        raw.connect_client("127.0.0.1", addr.port()).await.unwrap();
        assert!(raw.send(&[0xDE, 0xAD, 0xBE]).await);

        let metrics = server.metrics();
        eventually(|| metrics.snapshot().malformed_frames == 1).await;
        assert_eq!(metrics.snapshot().frames_received, 0);
        assert!(server.tracks().is_empty());

        raw.disconnect().await;
        server.shutdown().await;
    }
}
