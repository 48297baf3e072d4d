//! Constant-load driver with Prometheus export.
//!
//! Offers requests at a fixed rate for a while, goes quiet for the same
//! amount of time, and repeats. After every tick the registry is dumped in
//! the Prometheus text format so the capacity can be watched climbing
//! under load and sinking while idle.
//!
//! Configuration comes from the environment:
//!
//! ```text
//! RAMPER_MAX_CAPACITY=100 RAMPER_RAMP_PERIOD_MINUTES=5 RAMPER_TICK_INTERVAL_MS=1000 \
//! RAMPER_DEMO_RPM=90 RUST_LOG=ramper=debug cargo run --example constant_rpm
//! ```
//!
//! With a shortened tick interval the offered rate is scaled by the same
//! factor, so the bucket sees the load it would see in real time.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use ramper::{AdaptiveBucketBuilder, BucketConfig, SharedBucket};
use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Ticks spent offering load, then the same number spent idle.
const PHASE_TICKS: u32 = 60;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BucketConfig::from_env();
    let rpm: u64 = std::env::var("RAMPER_DEMO_RPM")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&v| v > 0)
        .unwrap_or(90);

    let registry = Registry::new();
    let accepted = IntCounter::new(
        "requests_accepted",
        "Requests that the bucket allowed to pass through",
    )?;
    let rejected = IntCounter::new(
        "requests_rejected",
        "Requests that the bucket blocked from passing through",
    )?;
    let capacity = IntGauge::new("bucket_capacity", "Current admission capacity per minute")?;
    registry.register(Box::new(accepted.clone()))?;
    registry.register(Box::new(rejected.clone()))?;
    registry.register(Box::new(capacity.clone()))?;

    let bucket: SharedBucket = Arc::new(
        AdaptiveBucketBuilder::from_config(config)
            .capacity_gauge(capacity)
            .build()?,
    );

    let tick = bucket.tick_interval();
    let minute = tick * bucket.ticks_per_minute() as u32;
    let request_gap = minute / rpm.min(u32::MAX as u64) as u32;
    let phase = tick * PHASE_TICKS;

    info!(
        max_capacity = bucket.max_capacity(),
        ramp_period_minutes = bucket.ramp_period_minutes(),
        rpm,
        ?request_gap,
        "driving bucket at constant rate"
    );

    bucket.start()?;

    let driver = bucket.clone();
    thread::Builder::new()
        .name("constant-rpm".into())
        .spawn(move || drive(&driver, &accepted, &rejected, request_gap, phase))?;

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    loop {
        thread::sleep(tick);

        buffer.clear();
        encoder.encode(&registry.gather(), &mut buffer)?;
        println!("{}", String::from_utf8_lossy(&buffer));
        println!("# {}\n", bucket.metrics());
    }
}

fn drive(
    bucket: &SharedBucket,
    accepted: &IntCounter,
    rejected: &IntCounter,
    request_gap: Duration,
    phase: Duration,
) {
    let mut phase_start = Instant::now();
    loop {
        if bucket.accept() {
            accepted.inc();
        } else {
            rejected.inc();
        }
        thread::sleep(request_gap);

        if phase_start.elapsed() > phase {
            info!("load phase over, going idle");
            thread::sleep(phase);
            info!("resuming load");
            phase_start = Instant::now();
        }
    }
}
