use bapal::application::deposit_service::DepositService;
use bapal::application::event_replay::EventReplayer;
use bapal::config::Settings;
use bapal::domain::deposit::{PaymentMethod, UserDeposit};
use bapal::domain::money::Amount;
use bapal::domain::policy::RefundScenario;
use bapal::domain::ports::{DepositStoreBox, PaymentGatewayBox, PointsLedgerBox};
use bapal::infrastructure::in_memory::{InMemoryDepositStore, InMemoryPointsLedger};
use bapal::infrastructure::rest_gateway::RestPaymentGateway;
use bapal::infrastructure::simulated_gateway::SimulatedPaymentGateway;
use bapal::interfaces::csv::event_reader::EventReader;
use bapal::interfaces::csv::report_writer::ReportWriter;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra configuration file layered over config/default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a CSV of meetup events and print deposit and point balances
    Settle {
        /// Input events CSV file
        input: PathBuf,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Decline every card and KakaoPay payment
        #[arg(long, conflicts_with = "live_gateway")]
        decline_payments: bool,

        /// Send payments and refunds to the payment server at gateway.base_url
        #[arg(long)]
        live_gateway: bool,
    },
    /// Compute the refund for a single deposit
    Quote {
        #[arg(long)]
        amount: Decimal,

        /// One of normal_attendance_with_review, normal_attendance_without_review,
        /// no_show, cancellation
        #[arg(long)]
        scenario: String,

        /// Hours left before the meetup when cancelling
        #[arg(long)]
        hours: Option<Decimal>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bapal=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).into_diagnostic()?;

    match cli.command {
        Command::Quote {
            amount,
            scenario,
            hours,
        } => quote(&settings, amount, &scenario, hours),
        Command::Settle {
            input,
            db_path,
            decline_payments,
            live_gateway,
        } => {
            let db_path = db_path.or_else(|| settings.storage.db_path.clone());
            let gateway: PaymentGatewayBox = if live_gateway {
                Box::new(RestPaymentGateway::new(&settings.gateway).into_diagnostic()?)
            } else {
                let gateway = SimulatedPaymentGateway::new();
                gateway.set_declining(decline_payments);
                Box::new(gateway)
            };
            settle(&settings, input, db_path, gateway).await
        }
    }
}

fn quote(settings: &Settings, amount: Decimal, scenario: &str, hours: Option<Decimal>) -> Result<()> {
    let scenario: RefundScenario = scenario.parse().into_diagnostic()?;
    let deposit = UserDeposit::new(
        "quote",
        "quote",
        "quote",
        Amount::new(amount).into_diagnostic()?,
        PaymentMethod::Card,
    );
    let calc = settings
        .policy
        .calculate_refund_amount(&deposit, scenario, hours)
        .into_diagnostic()?;
    println!("refund_amount,reason,rate");
    println!(
        "{},{},{}",
        calc.refund_amount.normalize(),
        calc.reason,
        calc.refund_rate.value().normalize()
    );
    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn stores(db_path: Option<PathBuf>) -> Result<(DepositStoreBox, PointsLedgerBox)> {
    use bapal::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(db_path) => {
            let store = RocksDBStore::open(db_path).into_diagnostic()?;
            let deposits: DepositStoreBox = Box::new(store.clone());
            let ledger: PointsLedgerBox = Box::new(store);
            Ok((deposits, ledger))
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn stores(db_path: Option<PathBuf>) -> Result<(DepositStoreBox, PointsLedgerBox)> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

fn in_memory_stores() -> (DepositStoreBox, PointsLedgerBox) {
    let deposits: DepositStoreBox = Box::new(InMemoryDepositStore::new());
    let ledger: PointsLedgerBox = Box::new(InMemoryPointsLedger::new());
    (deposits, ledger)
}

async fn settle(
    settings: &Settings,
    input: PathBuf,
    db_path: Option<PathBuf>,
    gateway: PaymentGatewayBox,
) -> Result<()> {
    let (deposits, ledger) = stores(db_path)?;
    let service = DepositService::new(
        settings.policy.clone(),
        settings.points.clone(),
        deposits,
        ledger,
        gateway,
    );
    let mut replayer = EventReplayer::new(service);

    let file = File::open(input).into_diagnostic()?;
    let reader = EventReader::new(file);
    for (line, event) in reader.events().enumerate() {
        match event {
            Ok(event) => {
                if let Err(e) = replayer.apply(event).await {
                    tracing::error!(row = line + 1, "Error processing event: {}", e);
                }
            }
            Err(e) => {
                tracing::error!(row = line + 1, "Error reading event: {}", e);
            }
        }
    }

    let service = replayer.into_service();
    let deposits = service.all_deposits().await.into_diagnostic()?;
    let balances = service.all_balances().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_report(deposits, balances).into_diagnostic()?;

    Ok(())
}
