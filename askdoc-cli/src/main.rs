use std::process::ExitCode;

use askdoc_cli::output::{render_answer, render_health};
use askdoc_cli::telemetry::init_tracing;
use askdoc_cli::{Cli, Commands, build_pipeline};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let pipeline = build_pipeline(&cli)?;

    match cli.command {
        Commands::Ask { question, document, json } => {
            let answer = pipeline.process_query(&question, document.as_deref()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("{}", render_answer(&answer));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Clear => {
            pipeline.clear_index().await?;
            info!("index cleared");
            println!("Index cleared.");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Health { json } => {
            let report = pipeline.health().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_health(&report));
            }
            Ok(if report.is_healthy() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}
