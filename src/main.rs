mod cli;

use llhls::{config, export, synth::SyntheticSource, HlsStreamer};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn simulate(
    config_path: Option<&Path>,
    output: &Path,
    seconds: u64,
    realtime: bool,
    audio: bool,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    config.simulate.audio |= audio;

    tracing::info!(
        renditions = config.simulate.resolutions.len(),
        seconds,
        realtime,
        "Starting simulation"
    );

    let stop = CancellationToken::new();
    let (hls, worker) = HlsStreamer::start(&config.hls, stop.clone());
    let mut source = SyntheticSource::new(&config.simulate);

    for second in 1..=seconds {
        for packet in source.take_until(Duration::from_secs(second)) {
            hls.write_packet(packet).await?;
        }
        if realtime {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted");
                    break;
                }
            }
        }
    }
    hls.flush().await?;

    let summary = export::export(&hls, output)
        .await
        .with_context(|| format!("Failed to write output to {:?}", output))?;

    tracing::info!("Shutting down...");
    hls.stop();
    if let Err(e) = worker.await {
        tracing::warn!(error = %e, "Writer task failed");
    }

    println!("Wrote {:?}", output.join(export::MASTER_FILE));
    println!("  Renditions: {}", summary.renditions);
    println!("  Segments: {}", summary.segments);
    println!("  Parts: {}", summary.parts);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "llhls=trace,llhls_media=trace,llhls_common=debug".to_string()
        } else {
            "llhls=info,llhls_media=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Simulate {
            output,
            seconds,
            realtime,
            audio,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(simulate(
                cli.config.as_deref(),
                &output,
                seconds,
                realtime,
                audio,
            ))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("llhls {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let hls = &config.hls;
    println!("  Writer id: {}", hls.writer_id);
    println!("  Segment duration: {} ms", hls.segment_duration_ms);
    println!("  Fragment duration: {} ms", hls.fragment_duration_ms);
    println!("  Part target: {} ms", hls.part_target_ms);
    println!("  Segments retained: {}", hls.segment_count);
    println!("  Read timeout: {} ms", hls.read_timeout_ms);
    println!("  Simulated renditions: {}", config.simulate.resolutions.len());

    Ok(())
}
