use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Number;

use resilient_api::client::{ApiReply, IdempotencyKeyManager, ProductsClient};
use resilient_api::observability::logging;
use resilient_api::products::NewProduct;
use resilient_api::{ResilienceConfig, ResilientClient};

#[derive(Parser)]
#[command(name = "resilient-cli")]
#[command(about = "Retrying client for the product API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Retries after the first attempt.
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Exponential backoff base in milliseconds.
    #[arg(long, default_value_t = 250)]
    base_delay_ms: u64,

    /// Per-attempt timeout in milliseconds.
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,

    /// Disable backoff jitter.
    #[arg(long)]
    no_jitter: bool,

    /// Correlation id for every attempt (generated when omitted).
    #[arg(long)]
    request_id: Option<String>,

    /// File remembering payload hash → idempotency key between runs.
    #[arg(long, default_value = ".idempotency-keys.json")]
    key_store: PathBuf,

    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a product (idempotent per payload)
    Create {
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        kind: String,
        #[arg(long)]
        brand: String,
        #[arg(long)]
        price: f64,
    },
    /// List all products
    List,
    /// Fetch one product
    Get { id: String },
    /// Check server liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let config = ResilienceConfig {
        retries: cli.retries,
        base_delay_ms: cli.base_delay_ms,
        jitter: !cli.no_jitter,
        timeout_ms: cli.timeout_ms,
        idempotency_key: None,
        request_id: cli.request_id,
    };
    let keys = IdempotencyKeyManager::with_file(&cli.key_store)?;
    let client = ProductsClient::new(&cli.url, ResilientClient::new(), keys, config)?;

    let reply = match cli.command {
        Commands::Create {
            name,
            kind,
            brand,
            price,
        } => {
            let price = price_number(price).ok_or("price must be a finite number")?;
            client
                .create(&NewProduct::new(name, kind, brand, price))
                .await?
        }
        Commands::List => client.list().await?,
        Commands::Get { id } => client.get(&id).await?,
        Commands::Health => client.health().await?,
    };

    print_reply(&reply)
}

/// Whole prices stay integers on the wire (`100`, not `100.0`).
fn price_number(price: f64) -> Option<Number> {
    if price.fract() == 0.0 && price.abs() < i64::MAX as f64 {
        Some(Number::from(price as i64))
    } else {
        Number::from_f64(price)
    }
}

fn print_reply(reply: &ApiReply) -> Result<(), Box<dyn std::error::Error>> {
    let request_id = reply.request_id.as_deref().unwrap_or("-");
    if reply.is_success() {
        println!("{} (request {})", reply.status, request_id);
    } else {
        eprintln!("Error: server returned {} (request {})", reply.status, request_id);
    }
    println!("{}", serde_json::to_string_pretty(&reply.body)?);
    Ok(())
}
