use anyhow::Context;
use clap::Parser;
use log::info;
use radarcore::generator::MotionMode;
use radarcore::protocol::RadarMode;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::{Role, SimulatorConfig};
use workflow::runner::Runner;

mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Radar interface hardware-in-the-loop simulator")]
struct Args {
    /// Load a simulator config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    role: Option<Role>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    stream_id: Option<u8>,
    /// Radar mode, e.g. range-search or air-combat
    #[arg(long)]
    mode: Option<RadarMode>,
    /// random, linear or circular
    #[arg(long)]
    motion: Option<MotionMode>,
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Stop after this many ticks instead of waiting for Ctrl+C
    #[arg(long)]
    ticks: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    /// Serve the JSON status bridge on this address
    #[arg(long)]
    bridge: Option<SocketAddr>,
}

impl Args {
    fn apply(&self, config: &mut SimulatorConfig) {
        if let Some(role) = self.role {
            config.role = role;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(stream_id) = self.stream_id {
            config.stream_id = stream_id;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(motion) = self.motion {
            config.motion = motion;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_interval_ms = tick_ms;
        }
        if self.ticks.is_some() {
            config.ticks = self.ticks;
        }
        if self.seed.is_some() {
            config.generator.seed = self.seed;
        }
        if self.bridge.is_some() {
            config.bridge = self.bridge;
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulatorConfig::load(path)?,
        None => SimulatorConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("validating simulator config")?;

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating simulator runtime")?;
    runtime.block_on(simulate(config))
}

async fn simulate(config: SimulatorConfig) -> anyhow::Result<()> {
    info!(
        "radarsim: role {:?}, mode {}, motion {}, tick {} ms",
        config.role, config.mode, config.motion, config.tick_interval_ms
    );
    let bridge_addr = config.bridge;
    let runner = Runner::new(config);
    runner.connect().await?;

    let bridge = match bridge_addr {
        Some(addr) => Some(
            gui_bridge::bridge::spawn(runner.clone(), addr).context("starting status bridge")?,
        ),
        None => None,
    };

    let ticking = runner.clone();
    let mut tick_loop = tokio::spawn(async move { ticking.run().await });

    let ticks = tokio::select! {
        finished = &mut tick_loop => finished.context("tick loop panicked")??,
        interrupted = signal::ctrl_c() => {
            interrupted.context("awaiting Ctrl+C to exit")?;
            info!("interrupted, stopping");
            runner.stop();
            tick_loop.await.context("tick loop panicked")??
        }
    };

    runner.shutdown().await;
    if let Some((_, handle)) = bridge {
        handle.await.context("status bridge panicked")?;
    }

    let tracks = runner.tracks();
    let metrics = runner.metrics().snapshot();
    println!(
        "radarsim finished: ticks={} tracks={} sent={} send_failures={} received={} malformed={}",
        ticks,
        tracks.len(),
        metrics.frames_sent,
        metrics.send_failures,
        metrics.frames_received,
        metrics.malformed_frames
    );
    Ok(())
}
