//! Developer CLI for the contacts core.
//!
//! # Responsibility
//! - Drive the same session service the app uses against a database file.
//! - Keep output deterministic for quick local sanity checks.

use clap::{Args, Parser, Subcommand};
use contacts_core::{
    init_logging, Contact, ContactRepository, ContactService, SqliteContactStore,
    StaticPermissionGate,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Handle;

#[derive(Debug, Parser)]
#[command(name = "contacts", version, about = "Inspect and edit a contacts database")]
struct Cli {
    /// SQLite database file; created when missing.
    #[arg(long, env = "CONTACTS_DB_PATH", default_value = "contacts.sqlite3")]
    db: PathBuf,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, env = "CONTACTS_LOG_DIR")]
    log_dir: Option<String>,

    #[arg(long, default_value_t = contacts_core::default_log_level().to_string())]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core linkage info.
    Ping,
    /// List contacts sorted by name.
    List,
    /// Insert a contact; an existing id is left untouched.
    Add(ContactArgs),
    /// Replace every field of an existing contact.
    Update(ContactArgs),
    /// Delete a contact by id.
    Delete {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Debug, Args)]
struct ContactArgs {
    #[arg(long)]
    id: i64,
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    image: Option<String>,
}

impl From<ContactArgs> for Contact {
    fn from(args: ContactArgs) -> Self {
        Contact {
            id: args.id,
            name: args.name,
            phone_number: args.phone,
            image_reference: args.image,
        }
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 1)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(&cli.log_level, log_dir)?;
    }

    if let Command::Ping = cli.command {
        println!("contacts_core ping={}", contacts_core::ping());
        println!("contacts_core version={}", contacts_core::core_version());
        return Ok(());
    }

    let store = SqliteContactStore::open(&cli.db).map_err(|err| err.to_string())?;
    // The terminal user owns the database file; no prompt is needed.
    let service = ContactService::activate(
        ContactRepository::new(store),
        Handle::current(),
        &mut StaticPermissionGate::granted(),
    )
    .map_err(|err| err.to_string())?;

    let pending = match cli.command {
        Command::Ping | Command::List => None,
        Command::Add(args) => Some(service.insert(args.into())),
        Command::Update(args) => Some(service.update(args.into())),
        Command::Delete { id } => Some(service.delete_by_id(id)),
    };

    if let Some(pending) = pending {
        let op = pending.op();
        let contact_id = pending.contact_id();
        let outcome = pending.outcome().await.map_err(|err| err.to_string())?;
        println!("{op} id={contact_id} outcome={}", outcome.as_str());
        if !outcome.is_applied() {
            eprintln!("note: {op} id={contact_id} matched no row to change");
        }
    }

    let snapshot = service.all_contacts().current();
    for contact in snapshot.contacts() {
        println!(
            "{}\t{}\t{}\t{}",
            contact.id,
            contact.name,
            contact.phone_number,
            contact.image_reference.as_deref().unwrap_or("-")
        );
    }
    println!("total={} version={}", snapshot.len(), snapshot.version());
    service.shutdown().await.map_err(|err| err.to_string())
}
