//! CamStream command-line sender.
//!
//! Stands in for the camera capture pipeline: locates a viewer (or takes an
//! explicit endpoint), then streams a file's bytes as paced, length-framed
//! video payloads. Lets a viewer be driven end to end without camera
//! hardware.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use camstream_core::{
    ControlMessage, DiscoveryConfig, Endpoint, TransportConfig, DEFAULT_STREAM_PORT,
};
use camstream_transport_client::{DiscoveryClient, DiscoveryOutcome, SenderState, VideoTransport};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "camstream-sender", version, about = "Stream a file to a CamStream viewer")]
struct Args {
    /// Viewer address. When omitted, the viewer is located by UDP broadcast.
    #[arg(long)]
    host: Option<String>,

    /// Viewer TCP port (used with --host).
    #[arg(long, default_value_t = DEFAULT_STREAM_PORT)]
    port: u16,

    /// File whose bytes are streamed as video payloads.
    #[arg(long)]
    file: PathBuf,

    /// Payload size per frame, in bytes.
    #[arg(long, default_value_t = 32 * 1024)]
    chunk_size: usize,

    /// Pacing rate, frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Send one orientation control frame (degrees) ahead of the stream.
    #[arg(long)]
    orientation: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    info!("CamStream sender v{}", env!("CARGO_PKG_VERSION"));

    if args.chunk_size == 0 {
        bail!("--chunk-size must be at least 1");
    }

    let endpoint = match &args.host {
        Some(host) => Endpoint::new(host.clone(), args.port),
        None => {
            info!("No --host given — broadcasting for a viewer…");
            let discovery = DiscoveryClient::new(DiscoveryConfig::default());
            match discovery.discover().await.context("discovery failed")? {
                DiscoveryOutcome::Found(endpoint) => endpoint,
                DiscoveryOutcome::NotFound => {
                    bail!("no viewer responded; pass --host to connect directly")
                }
            }
        }
    };

    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    info!(
        "Streaming {} ({} bytes, {}-byte chunks at {} fps) to {}",
        args.file.display(),
        data.len(),
        args.chunk_size,
        args.fps,
        endpoint
    );

    let mut transport = VideoTransport::new(endpoint, TransportConfig::default());
    let mut status_rx = transport.take_status().expect("fresh transport");
    tokio::spawn(async move {
        while let Some(status) = status_rx.recv().await {
            info!("{status}");
        }
    });

    transport.start();
    if let Some(degrees) = args.orientation {
        transport.enqueue_control(ControlMessage::orientation(degrees));
    }

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / args.fps.max(1) as f64));
    for chunk in data.chunks(args.chunk_size) {
        ticker.tick().await;
        transport.enqueue_video(Bytes::copy_from_slice(chunk));
    }

    // Let the sender drain before tearing down; anything still queued at
    // stop is discarded.
    let drained = tokio::time::timeout(Duration::from_secs(10), async {
        while transport.pending() > 0 && transport.state() == SenderState::Running {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        warn!("Drain timed out with {} payloads still pending", transport.pending());
    }
    if transport.evicted() > 0 {
        warn!("{} payloads were dropped under back-pressure", transport.evicted());
    }

    transport.stop();
    info!("Done");
    Ok(())
}
