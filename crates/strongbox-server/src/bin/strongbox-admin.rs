//! Admin console: a `clap` entry point for one-shot subcommands, and a
//! line-oriented REPL reading the same commands from stdin when invoked
//! with none.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use strongbox_catalog::Catalog;
use strongbox_core::model::Salt;

#[derive(Parser, Debug)]
#[command(name = "strongbox-admin", about = "Administer a strongbox catalog")]
struct AdminArgs {
    /// Path to the catalog database, overriding `USER_DATABASE_FILE_PATH`.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<AdminCommand>,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Provision a new account reservation with the given quota.
    NewUser { quota: String },
    /// List claimed accounts.
    ViewUsers,
    /// List unclaimed reservations.
    ViewUnclaimedUsers,
}

const DOUBLE_INTERRUPT_WINDOW: Duration = Duration::from_secs(2);

fn main() -> anyhow::Result<()> {
    strongbox_server::setup_tracing(0);
    let args = AdminArgs::parse();

    let db_path = args.db_path.unwrap_or_else(|| {
        std::env::var("USER_DATABASE_FILE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/databases/userdata.db"))
    });
    let catalog = Catalog::open(&db_path)?;

    match args.command {
        Some(command) => run_one_shot(&catalog, command),
        None => run_repl(&catalog),
    }
}

fn run_one_shot(catalog: &Catalog, command: AdminCommand) -> anyhow::Result<()> {
    let line = match command {
        AdminCommand::NewUser { quota } => format!("newuser {quota}"),
        AdminCommand::ViewUsers => "viewusers".to_string(),
        AdminCommand::ViewUnclaimedUsers => "viewunclaimedusers".to_string(),
    };
    dispatch(&line, catalog)?;
    Ok(())
}

fn run_repl(catalog: &Catalog) -> anyhow::Result<()> {
    install_double_interrupt_handler();

    println!("strongbox-admin: type `help` for commands");
    prompt();
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            match dispatch(line, catalog) {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => println!("error: {err}"),
            }
        }
        prompt();
    }
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

/// Returns `Ok(true)` when the REPL should exit.
fn dispatch(line: &str, catalog: &Catalog) -> anyhow::Result<bool> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    match command {
        "help" => {
            println!("commands: help, exit, newuser <quota>, viewusers, viewunclaimedusers");
            Ok(false)
        }
        "exit" => Ok(true),
        "newuser" => {
            let quota_arg = parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("usage: newuser <quota>"))?;
            let quota = strongbox_server::quota::parse_quota_bytes(quota_arg)
                .map_err(|e| anyhow::anyhow!(e))?;
            let salts = (Salt::random(), Salt::random(), Salt::random());
            let code = catalog.reserve_account(quota, salts)?;
            println!("claim code: {code}");
            Ok(false)
        }
        "viewusers" => {
            for user in catalog.list_users()? {
                println!(
                    "{}\t{}\tquota={}",
                    user.id, user.username, user.storage_quota_bytes
                );
            }
            Ok(false)
        }
        "viewunclaimedusers" => {
            for reservation in catalog.list_reservations()? {
                println!(
                    "{}\tquota={}",
                    reservation.claim_code, reservation.storage_quota_bytes
                );
            }
            Ok(false)
        }
        other => {
            println!("unknown command: {other}");
            Ok(false)
        }
    }
}

/// Arms a Ctrl-C handler that exits the process on its second press
/// within `DOUBLE_INTERRUPT_WINDOW`, printing a warning on the first.
fn install_double_interrupt_handler() {
    let last_press_millis = Arc::new(AtomicU64::new(0));
    let start = Instant::now();
    ctrlc::set_handler(move || {
        let now_millis = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let previous = last_press_millis.swap(now_millis, Ordering::SeqCst);
        if now_millis.saturating_sub(previous) <= DOUBLE_INTERRUPT_WINDOW.as_millis() as u64 {
            println!("\nexiting");
            std::process::exit(0);
        }
        println!("\n(press Ctrl-C again within 2s to exit)");
        prompt();
    })
    .expect("failed to install SIGINT handler");
}
