//! ChainBank CLI
//!
//! Operator entry point for the account provisioning core. Stands in
//! for the surrounding web/auth layer: registers identities, completes
//! one-time onboarding, queries status, and performs the privileged
//! regenerate recovery.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use uuid::Uuid;

use chainbank::config::{load_config, resolve_path};
use chainbank::onboarding::OnboardingService;
use chainbank::store::{Database, DatabaseAdapter};
use chainbank::types::{
    default_config, LogLevel, OnboardingApi, OnboardingData, OnboardingError, ProfileStatus,
    ProfileStore,
};

const VERSION: &str = "0.1.0";

/// ChainBank -- Account Provisioning Core
#[derive(Parser, Debug)]
#[command(
    name = "chainbank",
    version = VERSION,
    about = "ChainBank -- account provisioning core",
    long_about = "Assigns a registered identity its account number and key pair, \
                  disclosing the private key exactly once."
)]
struct Cli {
    /// Register a new identity and print its id (auth-layer stand-in)
    #[arg(long)]
    register: bool,

    /// Complete one-time onboarding for an identity
    #[arg(long, value_name = "IDENTITY_ID")]
    onboard: Option<String>,

    /// Show onboarding status and public data for an identity
    #[arg(long, value_name = "IDENTITY_ID")]
    status: Option<String>,

    /// Regenerate and overwrite onboarding data (privileged; prompts)
    #[arg(long, value_name = "IDENTITY_ID")]
    regenerate: Option<String>,

    /// Override the database path from the config file
    #[arg(long, value_name = "PATH")]
    db: Option<String>,
}

fn tracing_level(level: &LogLevel) -> tracing::Level {
    match level {
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Error => tracing::Level::ERROR,
    }
}

// ---- Output ----------------------------------------------------------------

/// Display the one-time key disclosure after a successful onboarding.
fn show_disclosure_panel(data: &OnboardingData) {
    let w = 60;

    let pad = |s: &str| -> String {
        let padding = if s.len() < w { w - s.len() } else { 0 };
        format!("{}{}", s, " ".repeat(padding))
    };
    let line = |s: &str| format!("  \u{2502}{}\u{2502}", pad(s));

    let border_top = format!("  {}{}{}", "\u{256D}", "\u{2500}".repeat(w), "\u{256E}");
    let border_bot = format!("  {}{}{}", "\u{2570}", "\u{2500}".repeat(w), "\u{256F}");

    println!();
    println!("{}", border_top.green());
    println!("{}", line("  Onboarding complete").green());
    println!("{}", line("").green());
    println!(
        "{}",
        line(&format!("  Account number: {}", data.account_number)).green()
    );
    println!(
        "{}",
        line(&format!("  Wallet address: {}", data.wallet_address)).green()
    );
    println!("{}", border_bot.green());
    println!();
    println!("  Public key:  {}", data.public_key);
    println!();
    println!(
        "{}",
        "  Private key (disclosed once, unrecoverable):".red().bold()
    );
    println!("  {}", data.private_key.expose());
    println!();
    println!(
        "{}",
        "  Save this key now. It is never stored and will not be shown again.".yellow()
    );
    println!();
}

// ---- Commands --------------------------------------------------------------

fn register(registrar: &DatabaseAdapter) -> Result<()> {
    let identity_id = Uuid::new_v4().to_string();
    registrar
        .create_profile(&identity_id)
        .context("Failed to register identity")?;

    println!(
        "{}",
        serde_json::json!({
            "identityId": identity_id,
            "status": "registered",
        })
    );
    Ok(())
}

async fn onboard(service: &OnboardingService, identity_id: &str) -> Result<()> {
    match service.complete_onboarding(identity_id).await {
        Ok(data) => {
            show_disclosure_panel(&data);
            Ok(())
        }
        Err(OnboardingError::AlreadyOnboarded) => {
            println!(
                "{}",
                "Identity has already completed onboarding; nothing to do.".yellow()
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn status(service: &OnboardingService, identity_id: &str) -> Result<()> {
    match service.status(identity_id).await? {
        ProfileStatus::Unknown => {
            println!("No profile exists for {identity_id}.");
        }
        ProfileStatus::Registered => {
            println!("Identity {identity_id} is registered but not yet onboarded.");
        }
        ProfileStatus::Onboarded => {
            let public = service
                .public_data(identity_id)
                .await?
                .context("Onboarded profile has no public data")?;
            println!("{}", serde_json::to_string_pretty(&public)?);
        }
    }
    Ok(())
}

async fn regenerate(service: &OnboardingService, identity_id: &str) -> Result<()> {
    println!(
        "{}",
        format!(
            "This permanently overwrites the account number and key material for {identity_id}."
        )
        .red()
    );
    println!(
        "{}",
        "The previously disclosed private key becomes unusable.".red()
    );

    let confirmed = dialoguer::Confirm::new()
        .with_prompt("Continue?")
        .default(false)
        .interact()?;

    if !confirmed {
        println!("Aborted.");
        return Ok(());
    }

    let data = service.regenerate_onboarding(identity_id).await?;
    show_disclosure_panel(&data);
    Ok(())
}

// ---- Entry Point -----------------------------------------------------------

async fn run(cli: Cli) -> Result<()> {
    let config = load_config().unwrap_or_else(default_config);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level(&config.log_level))
        .init();

    let db_path = resolve_path(cli.db.as_deref().unwrap_or(&config.db_path));
    let db = Database::open(&db_path).context("Failed to open profile database")?;
    let db = Arc::new(Mutex::new(db));

    let registrar = DatabaseAdapter::new(db.clone());
    let service = OnboardingService::new(Box::new(DatabaseAdapter::new(db.clone())));

    if cli.register {
        return register(&registrar);
    }

    if let Some(identity_id) = cli.onboard.as_deref() {
        return onboard(&service, identity_id).await;
    }

    if let Some(identity_id) = cli.status.as_deref() {
        return status(&service, identity_id).await;
    }

    if let Some(identity_id) = cli.regenerate.as_deref() {
        return regenerate(&service, identity_id).await;
    }

    // Default: show usage hints
    println!("Run \"chainbank --help\" for usage information.");
    println!("Run \"chainbank --register\" to create an identity, then");
    println!("\"chainbank --onboard <IDENTITY_ID>\" to provision it.");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Fatal: {e:#}");
        std::process::exit(1);
    }
}
