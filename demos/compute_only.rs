//! Example: Add two 1024-element arrays on the GPU and print a sample of the result.
//!
//! Run with:
//!     cargo run --example compute_only --no-default-features

use compute_view::{init_logging, run_compute_phase, AcceleratorContext, LoggingConfig, PipelineConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default());

    let config = PipelineConfig::minimal();

    let ctx = AcceleratorContext::new().await?;
    println!("alloc_sz = {}", ctx.device_allocated_size());
    let queue = ctx.new_command_queue();

    let outcome = run_compute_phase(&ctx, &queue, &config)?;
    println!(
        "{} elements in {} groups of {}",
        outcome.plan.grid_size, outcome.plan.group_count, outcome.plan.threads_per_group
    );
    for line in outcome.diagnostic_lines(config.diagnostic_divisor) {
        println!("{}", line);
    }

    println!("alloc_sz = {}", ctx.device_allocated_size());
    Ok(())
}
