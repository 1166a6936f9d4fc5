use anyhow::Context;
use clap::Parser;
use colored::*;
use seaglider_og1::MissionProcessor;
use seaglider_og1::cli::{Args, setup_logging};
use std::process;

fn main() {
    let args = Args::parse();
    setup_logging(&args);

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = run(&args) => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(anyhow::anyhow!("Processing interrupted by user"))
            }
        }
    });

    match result {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let mut processor = MissionProcessor::new(&args.source, args.output.clone())
        .with_context(|| format!("Cannot use source '{}'", args.source))?
        .with_config(args.to_config());

    let stats = processor
        .process()
        .await
        .with_context(|| format!("Conversion of '{}' failed", args.source))?;

    if !stats.output_path.as_os_str().is_empty() {
        println!(
            "\n{} {}",
            "OG1 file written:".bright_green().bold(),
            stats.output_path.display()
        );
    }
    Ok(())
}
