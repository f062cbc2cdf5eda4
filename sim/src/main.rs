mod channel;
mod rng;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use glam::{Quat, Vec3};
use replica::{
    encode_delta_packet, ClientReplicator, Frame, NetworkObject, ObjectId, PacketLimits,
    ReplicatedTransform, ReplicationConfig, ServerReplicator, Time, TransformSettings,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::channel::{LossyChannel, Sent};
use crate::rng::Rng;

#[derive(Parser)]
#[command(
    name = "retrace-sim",
    version,
    about = "Replicate orbiting objects over a lossy channel and measure the error"
)]
struct Cli {
    /// Number of replicated objects.
    #[arg(long, default_value_t = 16)]
    objects: u32,
    /// Number of server ticks to simulate.
    #[arg(long, default_value_t = 300)]
    ticks: u32,
    /// RNG seed for deterministic results.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Packet loss in percent.
    #[arg(long, default_value_t = 10.0)]
    loss: f64,
    /// One-way latency in ticks.
    #[arg(long, default_value_t = 2)]
    latency: u32,
    /// Maximum extra random delay in ticks.
    #[arg(long, default_value_t = 1)]
    jitter: u32,
    /// Client frames per server tick.
    #[arg(long, default_value_t = 4)]
    substeps: u32,
    /// JSON file with replication settings; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the summary as JSON to this file.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Fail if the mean position error exceeds this value.
    #[arg(long)]
    max_mean_error: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let summary = run(&cli, &config)?;

    info!(
        sent = summary.packets_sent,
        dropped = summary.packets_dropped,
        mean_error = summary.mean_position_error,
        max_error = summary.max_position_error,
        "simulation finished"
    );
    if let Some(path) = &cli.out {
        write_summary_json(path, &summary)?;
    }
    summary.assert_budget(cli.max_mean_error)?;

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ReplicationConfig> {
    let config: ReplicationConfig = match path {
        Some(path) => {
            let contents =
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => ReplicationConfig::default(),
    };
    config.validate().context("invalid replication config")?;
    Ok(config)
}

fn write_summary_json(path: &Path, summary: &Summary) -> Result<()> {
    let contents = serde_json::to_string_pretty(summary).context("serialize summary")?;
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

fn replicated_object(id: u32, config: &ReplicationConfig) -> Result<NetworkObject> {
    NetworkObject::new(ObjectId::new(id))
        .with_behavior(ReplicatedTransform::new(config, TransformSettings::default()))
        .with_context(|| format!("build object {id}"))
}

fn run(cli: &Cli, config: &ReplicationConfig) -> Result<Summary> {
    let mut rng = Rng::new(cli.seed);
    let orbits: Vec<Orbit> = (0..cli.objects).map(|_| Orbit::random(&mut rng)).collect();

    let mut server = ServerReplicator::new(config.clone()).context("create server")?;
    let mut client =
        ClientReplicator::new(config, PacketLimits::default()).context("create client")?;
    for id in 0..cli.objects {
        server.add_object(replicated_object(id, config)?)?;
        client.add_object(replicated_object(id, config)?)?;
    }

    let mut channel = LossyChannel::new(cli.loss, cli.latency, cli.jitter);
    let mut summary = Summary::new(cli);
    let substeps = cli.substeps.max(1);
    let time_step = config.tick_duration() / substeps as f32;

    for tick in 0..i64::from(cli.ticks) {
        let frame = Frame::new(tick);
        for (id, orbit) in (0..cli.objects).zip(&orbits) {
            let transform = server
                .behavior_mut::<ReplicatedTransform>(ObjectId::new(id))
                .context("server object missing")?;
            transform.record(frame, orbit.position(tick as f64), orbit.rotation(tick as f64));
        }

        let packet = server.tick(frame).context("build delta packet")?;
        let bytes = encode_delta_packet(&packet).context("encode delta packet")?;
        summary.packets_sent += 1;
        summary.bytes_total += bytes.len() as u64;
        if channel.send(tick as f64, bytes, &mut rng) == Sent::Dropped {
            summary.packets_dropped += 1;
        }

        for step in 0..substeps {
            let now = tick as f64 + f64::from(step) / f64::from(substeps);
            for bytes in channel.receive(now) {
                let applied = client.apply_packet(&bytes).context("apply packet")?;
                debug!(frame = applied.raw(), "packet delivered");
                summary.packets_delivered += 1;
            }

            // The client only learns about the server through packets, so its
            // estimate of server time lags by the nominal latency.
            let estimated = Time::from_f64(now - f64::from(cli.latency));
            let replica_time = client.interpolate(time_step, estimated);
            if client.latest_frame().is_none() || replica_time.as_f64() < 0.0 {
                continue;
            }
            for (id, orbit) in (0..cli.objects).zip(&orbits) {
                let transform = client
                    .object(ObjectId::new(id))
                    .and_then(|object| object.behavior::<ReplicatedTransform>())
                    .context("client object missing")?;
                let t = replica_time.as_f64();
                summary.push_error(
                    transform.position().distance(orbit.position(t)),
                    transform.rotation().angle_between(orbit.rotation(t)),
                );
            }
        }
    }

    summary.finalize();
    Ok(summary)
}

/// Circular motion around a center that jumps every `teleport_period` ticks.
#[derive(Debug, Clone)]
struct Orbit {
    center: Vec3,
    radius: f32,
    speed: f32,
    phase: f32,
    teleport_period: f64,
}

impl Orbit {
    fn random(rng: &mut Rng) -> Self {
        Self {
            center: Vec3::new(
                rng.range_f32(-50.0, 50.0),
                0.0,
                rng.range_f32(-50.0, 50.0),
            ),
            radius: rng.range_f32(2.0, 10.0),
            speed: rng.range_f32(0.01, 0.1),
            phase: rng.range_f32(0.0, std::f32::consts::TAU),
            teleport_period: f64::from(rng.range_f32(100.0, 400.0)),
        }
    }

    fn angle(&self, t: f64) -> f32 {
        self.phase + self.speed * t as f32
    }

    fn position(&self, t: f64) -> Vec3 {
        let jumps = (t / self.teleport_period).floor() as f32;
        let angle = self.angle(t);
        self.center
            + Vec3::new(20.0 * jumps, 0.0, 0.0)
            + Vec3::new(angle.cos(), 0.0, angle.sin()) * self.radius
    }

    fn rotation(&self, t: f64) -> Quat {
        Quat::from_rotation_y(-self.angle(t))
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    objects: u32,
    ticks: u32,
    seed: u64,
    loss_percent: f64,
    latency_ticks: u32,
    jitter_ticks: u32,
    packets_sent: u64,
    packets_dropped: u64,
    packets_delivered: u64,
    bytes_total: u64,
    avg_packet_bytes: u64,
    samples: u64,
    mean_position_error: f64,
    max_position_error: f64,
    mean_rotation_error_deg: f64,
    #[serde(skip)]
    position_error_total: f64,
    #[serde(skip)]
    rotation_error_total: f64,
}

impl Summary {
    fn new(cli: &Cli) -> Self {
        Self {
            objects: cli.objects,
            ticks: cli.ticks,
            seed: cli.seed,
            loss_percent: cli.loss,
            latency_ticks: cli.latency,
            jitter_ticks: cli.jitter,
            packets_sent: 0,
            packets_dropped: 0,
            packets_delivered: 0,
            bytes_total: 0,
            avg_packet_bytes: 0,
            samples: 0,
            mean_position_error: 0.0,
            max_position_error: 0.0,
            mean_rotation_error_deg: 0.0,
            position_error_total: 0.0,
            rotation_error_total: 0.0,
        }
    }

    fn push_error(&mut self, position: f32, rotation_radians: f32) {
        let position = f64::from(position);
        self.samples += 1;
        self.position_error_total += position;
        self.rotation_error_total += f64::from(rotation_radians.to_degrees());
        self.max_position_error = self.max_position_error.max(position);
    }

    fn finalize(&mut self) {
        if self.packets_sent > 0 {
            self.avg_packet_bytes = self.bytes_total / self.packets_sent;
        }
        if self.samples > 0 {
            self.mean_position_error = self.position_error_total / self.samples as f64;
            self.mean_rotation_error_deg = self.rotation_error_total / self.samples as f64;
        }
    }

    fn assert_budget(&self, max_mean_error: Option<f64>) -> Result<()> {
        if let Some(max) = max_mean_error {
            if self.mean_position_error > max {
                anyhow::bail!(
                    "mean position error {:.4} exceeds budget {:.4}",
                    self.mean_position_error,
                    max
                );
            }
        }
        Ok(())
    }
}
