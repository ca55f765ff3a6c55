//! Brings up the process-wide OpenCL context, reports what was selected and
//! tears it down again.
//!
//! `cargo run --example device_probe --features opencl`

use compute_context::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Compute Context Probe ===\n");

    if let Err(err) = compute_context::initialize() {
        eprintln!("initialization failed: {err}");
        if let Some(status) = err.status() {
            eprintln!("  native status: {} ({})", status.name(), status.code());
        }
        std::process::exit(1);
    }

    if let Some(ctx) = compute_context::get() {
        println!("Platform: {:?}", ctx.platform());
        println!("Device:   {:?}", ctx.device());
        println!("Name:     {}", ctx.device_name().unwrap_or("<unknown>"));
        println!("Profiling queue: {}", ctx.config().profiling);
    }

    compute_context::teardown();
    println!("\n✓ Context released");
}
