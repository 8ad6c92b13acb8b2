//! presentator-migrate CLI - incremental Presentator v2 to v3 migration.

use clap::Parser;
use presentator_migrate::{Config, MigrateError, MigrationResult, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "presentator-migrate")]
#[command(about = "Incremental Presentator v2 to v3 migration")]
#[command(version)]
struct Cli {
    /// Path to JSON or YAML configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let orchestrator = Orchestrator::new(&config).await?;
    let result = orchestrator.run().await;
    orchestrator.close().await;
    let result = result?;

    if cli.output_json {
        println!("{}", result.to_json()?);
    } else {
        print_summary(&result);
    }

    Ok(())
}

fn print_summary(result: &MigrationResult) {
    println!("Migration {} ({})", result.status, result.run_id);
    for report in &result.entities {
        println!(
            "  {:<26} {:>6} new {:>6} changed {:>6} unchanged {:>6} deleted {:>6} files",
            report.kind.label(),
            report.inserted,
            report.updated,
            report.unchanged,
            report.pruned.deleted,
            report.files.copied
        );
    }
    if result.files_failed > 0 {
        println!("  {} files failed to copy, see the log", result.files_failed);
    }
    println!("Finished in {:.1}s", result.duration_seconds);
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout is reserved for the summary
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
