use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Management CLI for dependency-guard", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show aggregate and per-dependency health
    Health,
    /// List every circuit breaker
    Breakers,
    /// Inspect one circuit breaker
    Breaker { name: String },
    /// Force a breaker closed, clearing its window
    Close { name: String },
    /// Force a breaker open
    Open { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match &cli.command {
        Commands::Health => client.get(format!("{base}/health")),
        Commands::Breakers => client.get(format!("{base}/admin/breakers")),
        Commands::Breaker { name } => client.get(format!("{base}/admin/breakers/{name}")),
        Commands::Close { name } => client.post(format!("{base}/admin/breakers/{name}/close")),
        Commands::Open { name } => client.post(format!("{base}/admin/breakers/{name}/open")),
    };

    let res = request.send().await?;
    // /health answers 503 with a body when a critical dependency is down.
    let accept_unavailable = matches!(cli.command, Commands::Health);
    print_response(res, accept_unavailable).await
}

async fn print_response(
    res: reqwest::Response,
    accept_unavailable: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let readable = status.is_success()
        || (accept_unavailable && status == reqwest::StatusCode::SERVICE_UNAVAILABLE);
    if !readable {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
