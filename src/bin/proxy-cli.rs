use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Management CLI for the chain data proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxy system status
    Status,
    /// Show cache backend state and hit counters
    Cache,
    /// Drop every cached entry
    FlushCache,
    /// Drop a single cache key
    DeleteKey { key: String },
    /// Show limiter state, or one client's bucket
    RateLimit { identity: Option<String> },
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

    let request = match &cli.command {
        Commands::Status => client.get(format!("{}/admin/status", base)),
        Commands::Cache => client.get(format!("{}/admin/cache", base)),
        Commands::FlushCache => client.delete(format!("{}/admin/cache", base)),
        Commands::DeleteKey { key } => client.delete(format!("{}/admin/cache/{}", base, key)),
        Commands::RateLimit { identity: None } => client.get(format!("{}/admin/rate-limit", base)),
        Commands::RateLimit {
            identity: Some(identity),
        } => client.get(format!("{}/admin/rate-limit/{}", base, identity)),
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
