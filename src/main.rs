use checkout::application::orchestrator::{CheckoutOrchestrator, Ports};
use checkout::application::reconciler::Reconciler;
use checkout::config::{CheckoutConfig, GatewayKind, init_tracing};
use checkout::domain::customer::CustomerId;
use checkout::domain::money::Currency;
use checkout::domain::ports::{
    ChargeIntentStore, CustomerVault, GatewayRef, IntentStoreRef, OrderStore, OrderStoreRef,
    VaultRef,
};
use checkout::infrastructure::in_memory::InMemoryStore;
#[cfg(feature = "storage-rocksdb")]
use checkout::infrastructure::rocksdb::RocksDBStore;
use checkout::infrastructure::sandbox::SandboxGateway;
use checkout::infrastructure::stripe::{DEFAULT_API_BASE, StripeGateway};
use checkout::interfaces::csv::order_writer::OrderWriter;
use checkout::interfaces::json::handle_checkout;
use checkout::interfaces::json::request_reader::RequestReader;
use checkout::interfaces::json::response::CheckoutResponse;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use secrecy::SecretString;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
#[cfg(not(feature = "storage-rocksdb"))]
use tracing::warn;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Payment gateway to charge through.
    #[arg(long, value_enum, default_value_t = GatewayKind::Sandbox, global = true)]
    gateway: GatewayKind,

    /// Stripe secret key, required with `--gateway stripe`.
    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true, global = true)]
    stripe_key: Option<String>,

    #[arg(long, default_value = DEFAULT_API_BASE, global = true)]
    stripe_api_base: String,

    /// Currency for requests that do not name one.
    #[arg(long, default_value = "usd", global = true)]
    currency: String,

    /// Statement description sent with every charge.
    #[arg(long, global = true)]
    description: Option<String>,

    #[arg(long, default_value_t = 30_000, global = true)]
    gateway_timeout_ms: u64,

    /// Age after which reconciliation picks up an unfinished charge intent.
    #[arg(long, default_value_t = 300, global = true)]
    stale_after_secs: u64,

    /// Default log filter; `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Run checkout requests from a JSON-lines file, printing one response per line.
    Run {
        /// Input file, one checkout request object per line
        input: PathBuf,
    },
    /// Print a customer's order history as CSV.
    Orders {
        #[arg(long)]
        customer: u64,
    },
    /// Complete charged-but-unrecorded checkouts and list those needing review.
    Reconcile,
}

/// The storage ports, all backed by the same store.
struct Storage {
    vault: VaultRef,
    orders: OrderStoreRef,
    intents: IntentStoreRef,
}

impl Storage {
    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CustomerVault + OrderStore + ChargeIntentStore + 'static,
    {
        Self {
            vault: store.clone(),
            orders: store.clone(),
            intents: store,
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_storage(db_path: Option<&Path>) -> Result<Storage> {
    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            info!(path = %path.display(), "using persistent storage");
            Ok(Storage::from_store(Arc::new(store)))
        }
        None => {
            info!("using in-memory storage");
            Ok(Storage::from_store(Arc::new(InMemoryStore::new())))
        }
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_storage(db_path: Option<&Path>) -> Result<Storage> {
    if db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    info!("using in-memory storage");
    Ok(Storage::from_store(Arc::new(InMemoryStore::new())))
}

fn open_gateway(cli: &Cli) -> Result<GatewayRef> {
    match cli.gateway {
        GatewayKind::Sandbox => Ok(Arc::new(SandboxGateway::new())),
        GatewayKind::Stripe => {
            let key = cli.stripe_key.clone().ok_or_else(|| {
                miette!("--stripe-key or STRIPE_SECRET_KEY is required with --gateway stripe")
            })?;
            Ok(Arc::new(StripeGateway::new(
                SecretString::from(key),
                cli.stripe_api_base.clone(),
            )))
        }
    }
}

fn build_config(cli: &Cli) -> Result<CheckoutConfig> {
    let mut config = CheckoutConfig::default()
        .with_default_currency(Currency::new(&cli.currency).into_diagnostic()?)
        .with_gateway_timeout(Duration::from_millis(cli.gateway_timeout_ms))
        .with_stale_after(Duration::from_secs(cli.stale_after_secs));
    if let Some(description) = &cli.description {
        config = config.with_description(description.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level).into_diagnostic()?;

    let config = build_config(&cli)?;
    let storage = open_storage(cli.db_path.as_deref())?;

    match &cli.command {
        Command::Run { input } => {
            let orchestrator = CheckoutOrchestrator::new(
                Ports {
                    vault: storage.vault,
                    orders: storage.orders,
                    intents: storage.intents,
                    gateway: open_gateway(&cli)?,
                },
                &config,
            );

            let file = File::open(input).into_diagnostic()?;
            let reader = RequestReader::new(BufReader::new(file));
            for payload in reader.requests() {
                let response = match payload {
                    Ok(payload) => handle_checkout(&orchestrator, payload, &config).await,
                    Err(e) => {
                        error!(error = %e, "Error reading checkout request");
                        CheckoutResponse::from_error(&e)
                    }
                };
                println!("{}", serde_json::to_string(&response).into_diagnostic()?);
            }
        }
        Command::Orders { customer } => {
            let orders = storage
                .orders
                .orders_for_customer(CustomerId(*customer))
                .await
                .into_diagnostic()?;
            let mut writer = OrderWriter::new(io::stdout().lock());
            writer.write_orders(&orders).into_diagnostic()?;
        }
        Command::Reconcile => {
            let reconciler = Reconciler::new(storage.intents, storage.orders, config.stale_after);
            let report = reconciler.run_once().await.into_diagnostic()?;
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
    }

    Ok(())
}
