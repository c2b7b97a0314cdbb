//! Demo harness: drives one [`Tracker`] from synthetic IMU and pose-
//! observation generators and republishes snapshots over a WebSocket
//! server. Not part of the tracker core (spec.md §1) — a real
//! collaborator supplies its own sensor and poser pipelines.

use anyhow::Result;
use lighthouse_pose_tracker::sim::{ImuSampleSource, PoseObservationSource};
use lighthouse_pose_tracker::websocket::WebSocketServer;
use lighthouse_pose_tracker::{telemetry, Tracker, TrackerConfig, TrackerSnapshot, FLT};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Demo-harness configuration: timing and server knobs that have no
/// counterpart inside the tracker core itself.
#[derive(Debug, Clone, Copy)]
struct DemoConfig {
    ws_port: u16,
    timebase_hz: FLT,
    imu_hz: FLT,
    obs_hz: FLT,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            ws_port: 8080,
            timebase_hz: 48_000_000.0,
            imu_hz: 1000.0,
            obs_hz: 60.0,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    info!("starting lighthouse pose tracker demo");

    let config = DemoConfig::default();
    info!(?config, "demo configuration");

    let (tx, _rx) = broadcast::channel::<TrackerSnapshot>(100);
    let tx = Arc::new(tx);

    let tracker_tx = tx.clone();
    let tracker_handle = tokio::spawn(async move {
        if let Err(e) = run_tracker_loop(tracker_tx, config).await {
            error!("tracker loop error: {}", e);
        }
    });

    let ws_server = WebSocketServer::new(config.ws_port, tx.clone());
    let server_handle = tokio::spawn(async move {
        if let Err(e) = ws_server.run().await {
            error!("WebSocket server error: {}", e);
        }
    });

    info!("WebSocket server listening on ws://127.0.0.1:{}", config.ws_port);
    info!(imu_hz = config.imu_hz as f64, obs_hz = config.obs_hz as f64, "streaming synthetic sensor data");

    tokio::select! {
        result = tracker_handle => {
            if let Err(e) = result {
                error!("tracker task panicked: {}", e);
            }
        }
        result = server_handle => {
            if let Err(e) = result {
                error!("server task panicked: {}", e);
            }
        }
    }

    info!("shutting down gracefully");
    Ok(())
}

/// Drives the tracker from interleaved synthetic IMU/observation streams
/// and broadcasts a snapshot after every IMU sample.
async fn run_tracker_loop(tx: Arc<broadcast::Sender<TrackerSnapshot>>, config: DemoConfig) -> Result<()> {
    info!("initializing tracker and synthetic sensor sources");

    let mut tracker = Tracker::new(config.timebase_hz, config.imu_hz, "LHR-DEMO", TrackerConfig::default());
    let mut imu_source = ImuSampleSource::new(config.timebase_hz, config.imu_hz, 42);
    let mut obs_source = PoseObservationSource::new(config.timebase_hz, config.obs_hz, 7);

    let imu_interval = std::time::Duration::from_secs_f64(1.0 / config.imu_hz as f64);
    let obs_interval = std::time::Duration::from_secs_f64(1.0 / config.obs_hz as f64);

    let mut imu_ticker = tokio::time::interval(imu_interval);
    let mut obs_ticker = tokio::time::interval(obs_interval);

    info!("tracker loop running");

    loop {
        tokio::select! {
            _ = imu_ticker.tick() => {
                let sample = imu_source.next();
                tracker.imu_sample(sample);
                let snapshot = tracker.snapshot();
                let _ = tx.send(snapshot);
            }
            _ = obs_ticker.tick() => {
                let obs = obs_source.next();
                tracker.observation(obs);
            }
        }
    }
}