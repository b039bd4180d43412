//! vaultsync - Encrypted note vault sync CLI
//!
//! Back up, encrypt and publish note vaults through one umbrella repository.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use vaultsync::{GitCli, SevenZip, SyncReport, Syncer};
use vaultsync_core::{Config, Layout};

#[derive(Parser)]
#[command(name = "vaultsync")]
#[command(about = "Sync your note vaults to a remote repository, encrypted")]
#[command(version)]
#[command(after_help = r#"WORKFLOW:
    Run every command from the umbrella repository root, the directory
    holding your vaults. A vault is any folder containing .obsidian/.

    vaultsync init     # Create the encryption password and .gitignore
    vaultsync push     # Back up, encrypt each vault's history, push
    vaultsync pull     # Back up, pull, decrypt, merge local work back

STORAGE:
    .pwd/7z_password   Shared password. Never committed. Losing it makes
                       every published archive unreadable.
    .backup/           Snapshot of every vault, rebuilt on each run.
    <vault>.7z         Encrypted history of <vault>, committed and pushed.

CONFLICTS:
    When local work conflicts with what was pulled, the vault is left
    mid-merge and listed at the end of the run. Resolve it with git inside
    that vault; the pre-pull snapshot stays in .backup/ until the next run.

CONFIG:
    Optional .vaultsync.json at the root: git, archiver, remote, branch.
"#)]
struct Cli {
    /// Show every command's captured output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the encryption password and prepare the ignore-list
    Init,

    /// Pull latest changes from the remote repository
    Pull,

    /// Push current changes to the remote repository
    Push,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    if let Err(err) = run(cli.command) {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(vaultsync::error::exit_code(&err));
    }
}

fn run(command: Commands) -> Result<()> {
    let layout = Layout::current().context("Failed to resolve the working directory")?;

    match command {
        Commands::Init => cmd_init(&layout),
        Commands::Pull => {
            let report = with_syncer(&layout, |syncer| syncer.pull())?;
            print_summary("Pull", &report);
            Ok(())
        }
        Commands::Push => {
            let report = with_syncer(&layout, |syncer| syncer.push())?;
            print_summary("Push", &report);
            Ok(())
        }
    }
}

fn with_syncer<T>(layout: &Layout, f: impl FnOnce(&Syncer<'_>) -> Result<T>) -> Result<T> {
    let config = Config::load(layout)?;
    let git = GitCli::new(&config.git);
    let archiver = SevenZip::new(&config.archiver);
    let syncer = Syncer::new(layout, &config, &git, &archiver);
    f(&syncer)
}

fn cmd_init(layout: &Layout) -> Result<()> {
    vaultsync::init(layout)?;
    println!("{} Password created at {}", "✓".green(), layout.credential_file().display());
    println!(
        "  {}",
        "Keep a copy somewhere safe: without it your archives cannot be decrypted.".dimmed()
    );
    Ok(())
}

fn print_summary(action: &str, report: &SyncReport) {
    println!();
    if report.is_clean() {
        println!(
            "{} {} complete ({} vaults)",
            "✓".green(),
            action,
            report.vaults.len()
        );
    } else {
        println!(
            "{} {} finished with problems ({} vaults)",
            "!".yellow().bold(),
            action,
            report.vaults.len()
        );
    }

    if !report.ignored.is_empty() {
        println!("  {} ignored failures (see log above)", report.ignored.len());
    }

    for vault in &report.restore_failures {
        println!(
            "  {} {}: notes could not be restored, check .backup/{}",
            "✗".red(),
            vault.bold(),
            vault
        );
    }

    if !report.conflicts.is_empty() {
        println!();
        println!("{}", "MERGE CONFLICTS - resolve these vaults manually:".red().bold());
        for vault in &report.conflicts {
            println!("  {} {}", "✗".red(), vault.bold());
        }
    }
}
