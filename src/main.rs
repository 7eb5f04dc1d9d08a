//! Display variant: add two arrays on the GPU, normalize the sum into a
//! 512x512 grayscale image and show it in a window.

use anyhow::{Context, Result};

use compute_view::host::{self, HostConfig};
use compute_view::{
    init_logging, prepare_display, run_compute_phase, AcceleratorContext, LoggingConfig,
    PipelineConfig,
};

fn main() {
    init_logging(LoggingConfig::default());

    if let Err(err) = run() {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = PipelineConfig::default();

    let ctx = AcceleratorContext::new_blocking().context("no usable GPU")?;
    println!("alloc_sz = {}", ctx.device_allocated_size());
    let queue = ctx.new_command_queue();

    let outcome = run_compute_phase(&ctx, &queue, &config).context("compute phase failed")?;
    for line in outcome.diagnostic_lines(config.diagnostic_divisor) {
        println!("{}", line);
    }

    let display =
        prepare_display(&ctx, &queue, &config, &outcome).context("display setup failed")?;
    ctx.log_allocated_size();

    let renderer = display.renderer();
    host::run(HostConfig::from_pipeline(&config), &ctx, &renderer).context("window host failed")?;

    Ok(())
}
