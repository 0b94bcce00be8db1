use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use transfer_ledger::application::accounts::AccountService;
use transfer_ledger::application::engine::TransferEngine;
use transfer_ledger::domain::account::Amount;
use transfer_ledger::domain::ports::{Database, DatabaseRef};
use transfer_ledger::infrastructure::in_memory::InMemoryDatabase;
use transfer_ledger::interfaces::csv::account_writer::{AccountWriter, LedgerWriter};
use transfer_ledger::interfaces::csv::record_reader::{AccountSeed, RecordReader, TransferRequest};
use transfer_ledger::logging::init_logging;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input transfers CSV file (`source, destination, amount`)
    transfers: PathBuf,

    /// Accounts to open before the transfers run (`account_id, balance`)
    #[arg(long)]
    accounts: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Write the committed ledger entries to this CSV file
    #[arg(long)]
    ledger_out: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[cfg(feature = "storage-rocksdb")]
fn open_database(db_path: Option<PathBuf>) -> Result<DatabaseRef> {
    use transfer_ledger::infrastructure::rocksdb::RocksDBDatabase;

    Ok(match db_path {
        Some(path) => Arc::new(RocksDBDatabase::open(path).into_diagnostic()?),
        None => Arc::new(InMemoryDatabase::new()),
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_database(db_path: Option<PathBuf>) -> Result<DatabaseRef> {
    if db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    Ok(Arc::new(InMemoryDatabase::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json);

    let database = open_database(cli.db_path)?;
    let accounts = AccountService::new(Arc::clone(&database));
    let engine = TransferEngine::new(Arc::clone(&database));

    if let Some(path) = cli.accounts {
        let file = File::open(path).into_diagnostic()?;
        for seed in RecordReader::new(file).records::<AccountSeed>() {
            match seed {
                Ok(seed) => {
                    if let Err(e) = accounts.create_account(seed.account_id, seed.balance).await {
                        error!(account_id = seed.account_id, error = %e, "Error opening account");
                    }
                }
                Err(e) => error!(error = %e, "Error reading account"),
            }
        }
    }

    let file = File::open(cli.transfers).into_diagnostic()?;
    let (mut completed, mut rejected) = (0usize, 0usize);
    for request in RecordReader::new(file).records::<TransferRequest>() {
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "Error reading transfer");
                rejected += 1;
                continue;
            }
        };
        let outcome = match Amount::new(request.amount) {
            Ok(amount) => {
                engine
                    .execute(request.source, request.destination, amount)
                    .await
            }
            Err(e) => Err(e),
        };
        match outcome {
            Ok(_) => completed += 1,
            Err(e) if e.is_precondition() => {
                warn!(
                    source = request.source,
                    destination = request.destination,
                    error = %e,
                    "Transfer rejected"
                );
                rejected += 1;
            }
            Err(e) => {
                error!(
                    source = request.source,
                    destination = request.destination,
                    error = %e,
                    "Transfer failed"
                );
                rejected += 1;
            }
        }
    }
    info!(completed, rejected, "All transfers processed");

    let final_accounts = database.accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(final_accounts).into_diagnostic()?;

    if let Some(path) = cli.ledger_out {
        let entries = database.ledger_entries().await.into_diagnostic()?;
        let file = File::create(path).into_diagnostic()?;
        LedgerWriter::new(file)
            .write_entries(&entries)
            .into_diagnostic()?;
    }

    Ok(())
}
