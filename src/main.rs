use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use paysync::application::backend::LocalBackend;
use paysync::application::notification::{GatewayNotification, NotificationHandler};
use paysync::application::reconciler::Reconciler;
use paysync::config::{HintPolicy, MidtransConfig, PollPolicy, ReconcileConfig};
use paysync::domain::outcome::FlowState;
use paysync::domain::ports::{
    PaymentBackendRef, PaymentGatewayRef, PaymentStore, PaymentStoreRef, RegistrationStoreRef,
};
use paysync::domain::redirect::RedirectParams;
use paysync::infrastructure::http_backend::HttpBackend;
use paysync::infrastructure::in_memory::{InMemoryPaymentStore, InMemoryRegistrationStore};
use paysync::infrastructure::midtrans::MidtransGateway;
use paysync::infrastructure::scripted::ScriptedGateway;
use paysync::interfaces::csv::gateway_script_reader::GatewayScriptReader;
use paysync::interfaces::csv::payment_reader::PaymentReader;
use std::fs::File;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile a payment after the gateway redirected the customer back
    Reconcile(ReconcileArgs),
    /// Apply a gateway notification (JSON file) to the local payment store
    Notify(NotifyArgs),
}

#[derive(Args)]
struct StoreArgs {
    /// Payments CSV used to seed the local store
    #[arg(long)]
    payments: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[derive(Args)]
struct ReconcileArgs {
    /// Redirect URL or query string carrying order_id, status_code, transaction_status
    redirect: String,

    #[command(flatten)]
    store: StoreArgs,

    /// CSV of gateway statuses to replay instead of calling the real gateway
    #[arg(long)]
    gateway_script: Option<PathBuf>,

    /// Base URL of a remote payment backend. Local store options are ignored when set.
    #[arg(long, env = "PAYSYNC_API_URL")]
    api_url: Option<String>,

    /// Bearer token for the remote payment backend
    #[arg(long, env = "PAYSYNC_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    #[arg(
        long,
        env = "PAYSYNC_POLL_INTERVAL_MS",
        default_value_t = 3000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval_ms: u64,

    #[arg(long, env = "PAYSYNC_MAX_POLL_ATTEMPTS", default_value_t = 40)]
    max_poll_attempts: u32,

    /// Only report success once the local payment record reads PAID
    #[arg(long)]
    require_local_confirmation: bool,
}

#[derive(Args)]
struct NotifyArgs {
    /// Gateway notification body (JSON)
    notification: PathBuf,

    #[command(flatten)]
    store: StoreArgs,
}

struct Stores {
    payments: PaymentStoreRef,
    registrations: RegistrationStoreRef,
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(args: &StoreArgs) -> Result<Stores> {
    use paysync::infrastructure::rocksdb::RocksDBStore;

    match &args.db_path {
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(Stores {
                payments: Arc::new(store.clone()),
                registrations: Arc::new(store),
            })
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(args: &StoreArgs) -> Result<Stores> {
    if args.db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

fn in_memory_stores() -> Stores {
    Stores {
        payments: Arc::new(InMemoryPaymentStore::new()),
        registrations: Arc::new(InMemoryRegistrationStore::new()),
    }
}

async fn seed_payments(stores: &Stores, path: &Path) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    for payment in PaymentReader::new(file).payments() {
        match payment {
            Ok(payment) => {
                // A persistent store keeps what earlier runs recorded.
                if stores.payments.get(&payment.id).await.into_diagnostic()?.is_some() {
                    tracing::debug!(payment_id = %payment.id, "payment already stored, not reseeding");
                    continue;
                }
                let order_id = payment.order_id.clone();
                if let Err(e) = stores.payments.insert(payment).await {
                    tracing::warn!(order_id = %order_id, "Error storing payment: {}", e);
                }
            }
            Err(e) => tracing::warn!("Error reading payment: {}", e),
        }
    }
    Ok(())
}

async fn local_stores(args: &StoreArgs) -> Result<Stores> {
    let stores = open_stores(args)?;
    if let Some(path) = &args.payments {
        seed_payments(&stores, path).await?;
    }
    Ok(stores)
}

fn gateway(script: Option<&Path>) -> Result<PaymentGatewayRef> {
    let Some(path) = script else {
        return Ok(Arc::new(MidtransGateway::new(MidtransConfig::from_env())));
    };
    let gateway = ScriptedGateway::new();
    let file = File::open(path).into_diagnostic()?;
    for status in GatewayScriptReader::new(file).statuses() {
        match status {
            Ok(status) => gateway.push(status),
            Err(e) => tracing::warn!("Error reading gateway script: {}", e),
        }
    }
    Ok(Arc::new(gateway))
}

async fn reconcile(args: ReconcileArgs) -> Result<ExitCode> {
    let params = RedirectParams::parse(&args.redirect).into_diagnostic()?;

    let backend: PaymentBackendRef = if let Some(url) = &args.api_url {
        let mut http = HttpBackend::new(url.as_str());
        if let Some(token) = &args.api_token {
            http = http.with_token(token.as_str());
        }
        Arc::new(http)
    } else {
        let stores = local_stores(&args.store).await?;
        Arc::new(LocalBackend::new(
            stores.payments,
            stores.registrations,
            gateway(args.gateway_script.as_deref())?,
        ))
    };

    let config = ReconcileConfig {
        poll: PollPolicy::new(
            Duration::from_millis(args.poll_interval_ms),
            args.max_poll_attempts,
            PollPolicy::default().tick_timeout,
        )
        .into_diagnostic()?,
        hint_policy: if args.require_local_confirmation {
            HintPolicy::RequireLocalConfirmation
        } else {
            HintPolicy::Trust
        },
    };
    let reconciler = Reconciler::new(backend, config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let state = reconciler.run(&params, &cancel).await;
    println!("{}", serde_json::to_string_pretty(&state).into_diagnostic()?);

    Ok(match state {
        FlowState::Success { .. } => ExitCode::SUCCESS,
        FlowState::Failed { .. } => ExitCode::from(1),
        FlowState::Pending { .. } | FlowState::Loading => ExitCode::from(2),
    })
}

async fn notify(args: NotifyArgs) -> Result<ExitCode> {
    let body = std::fs::read_to_string(&args.notification).into_diagnostic()?;
    let notification: GatewayNotification = serde_json::from_str(&body).into_diagnostic()?;

    let midtrans = MidtransConfig::from_env();
    let server_key = Some(midtrans.server_key.clone());
    let stores = local_stores(&args.store).await?;
    let backend = LocalBackend::new(
        stores.payments,
        stores.registrations,
        Arc::new(MidtransGateway::new(midtrans)),
    );
    let handler = NotificationHandler::new(
        backend.sync_service().clone(),
        backend.registration_service().clone(),
        server_key,
    );

    let payment = handler.handle(&notification).await.into_diagnostic()?;
    println!("{}", serde_json::to_string_pretty(&payment).into_diagnostic()?);
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Reconcile(args) => reconcile(args).await,
        Command::Notify(args) => notify(args).await,
    }
}
