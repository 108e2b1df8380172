//! DGR counter demo.
//!
//! Run one master and any number of slaves:
//!
//! ```text
//! DGR_MODE=slave  DGR_SLAVE_LISTEN_PORT=5700 cargo run -p dgr-counter
//! DGR_MODE=master DGR_MASTER_DEST_IP=127.0.0.1 DGR_MASTER_DEST_PORT=5700 cargo run -p dgr-counter
//! ```
//!
//! The master advances a frame counter and a position every frame; slaves
//! log the values they receive. `RUST_LOG=info` shows the session logs.

#![forbid(unsafe_code)]

use std::time::Duration;

use dgr::{DgrError, Session};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const FRAMES: u64 = 600;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        tracing::error!("dgr-counter aborted: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), DgrError> {
    let mut session = Session::from_env().await?;
    tracing::info!(mode = ?session.mode(), state = ?session.state(), "session ready");

    let mut frame = 0u64.to_ne_bytes();
    let mut position = [0.0f32; 3].map(f32::to_ne_bytes).concat();
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);

    for n in 0..FRAMES {
        ticker.tick().await;

        if session.is_master() {
            frame = n.to_ne_bytes();
            let t = n as f32 * FRAME_INTERVAL.as_secs_f32();
            position = [t.cos(), t.sin(), 0.0].map(f32::to_ne_bytes).concat();
        }

        session.set_or_get("frame", &mut frame)?;
        session.set_or_get("position", &mut position)?;
        session.update().await?;

        if !session.is_master() && n % 60 == 0 {
            tracing::info!(
                frame = u64::from_ne_bytes(frame),
                position = ?decode_position(&position),
                "received"
            );
        }
    }

    session.log_records();
    Ok(())
}

fn decode_position(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
