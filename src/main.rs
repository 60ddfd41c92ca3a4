mod cli;
mod config;
mod orchestrator;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::{generate, Shell};
use config::Config;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "splitdl")]
#[command(author, version, about = "splitdl: download one file over parallel HTTP range requests")]
struct Args {
    #[arg(short, long, help = "URL of the file to download")]
    url: Option<String>,

    #[arg(short, long, help = "Number of byte ranges to fetch concurrently (default: 4)")]
    chunks: Option<usize>,

    #[arg(short, long, help = "Output directory (default: current directory)")]
    output: Option<PathBuf>,

    #[arg(long, help = "Read settings from this file instead of the user config")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Suppress announcements and progress output")]
    quiet: bool,

    #[arg(short, long, help = "Detailed logging")]
    verbose: bool,

    #[arg(long, value_enum, help = "Generate shell completions")]
    completions: Option<ShellCompletion>,
}

#[derive(Clone, ValueEnum)]
enum ShellCompletion {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        let shell = match shell {
            ShellCompletion::Bash => Shell::Bash,
            ShellCompletion::Zsh => Shell::Zsh,
            ShellCompletion::Fish => Shell::Fish,
            ShellCompletion::Powershell => Shell::PowerShell,
        };
        generate(shell, &mut Args::command(), "splitdl", &mut io::stdout());
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    // A missing URL is a usage hint, not a failure: exit status stays 0.
    let Some(url) = args.url else {
        println!("URL is required. Please set it with --url <URL>");
        return Ok(());
    };

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    let output_dir = args
        .output
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let report = cli::download(
        &url,
        cli::DownloadArgs {
            chunks: args.chunks.unwrap_or(config.chunks),
            output_dir,
            client: config.client_options(),
            write_buffer: config.write_buffer_size(),
            quiet: args.quiet,
            progress: config.progress,
        },
    )?;

    tracing::debug!(
        path = %report.path.display(),
        bytes = report.bytes,
        chunks = report.chunks,
        "finished"
    );
    println!("File downloaded successfully");

    Ok(())
}
