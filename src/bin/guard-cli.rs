use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Management CLI for Backend Guard", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "BACKEND_GUARD_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show guard status and retry settings
    Status,
    /// Show the last known backend health
    Health,
    /// Probe the backend now
    Check,
    /// List queued errors
    Errors {
        /// Only errors at or above this severity (low, medium, high, critical)
        #[arg(long)]
        min_severity: Option<String>,
        /// Most recent N errors
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Error counts by severity and kind
    Stats,
    /// Empty the error queue
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", base)),
        Commands::Health => client.get(format!("{}/admin/health", base)),
        Commands::Check => client.post(format!("{}/admin/health/check", base)),
        Commands::Errors { min_severity, limit } => {
            let mut query = Vec::new();
            if let Some(severity) = min_severity {
                query.push(("min_severity", severity));
            }
            if let Some(limit) = limit {
                query.push(("limit", limit.to_string()));
            }
            client.get(format!("{}/admin/errors", base)).query(&query)
        }
        Commands::Stats => client.get(format!("{}/admin/errors/stats", base)),
        Commands::Clear => client.delete(format!("{}/admin/errors", base)),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if status == reqwest::StatusCode::NO_CONTENT {
        println!("OK");
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
