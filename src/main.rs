use std::env;

use clap::Parser;
use livsplan::api::{ApiError, Cli, run_cli, run_http_server};
use livsplan::core::ParameterTable;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        if let Err(e) = run_http_server(port, ParameterTable::swedish_2025()).await {
            error!(error = %e, "server error");
            std::process::exit(1);
        }
        return;
    }

    let cli = Cli::parse();
    match run_cli(cli) {
        Ok(output) => println!("{output}"),
        Err(ApiError::Validation(report)) => {
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            for err in &report.errors {
                eprintln!("error: {err}");
            }
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
