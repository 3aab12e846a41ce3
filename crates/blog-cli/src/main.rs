//! Blog CLI - operator commands
//!
//! Usage:
//!   blog promote <user-id>
//!   blog purge-sessions [--grace-days N]
//!   blog check-config

use anyhow::{bail, Context};
use blog_core::{AppConfig, ErrorKind, PgStore, SessionRepository, UserId, UserRepository};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;

#[derive(Parser)]
#[command(name = "blog")]
#[command(about = "Blog backend operator CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grant the admin role to a user
    Promote {
        /// User id
        user_id: UserId,
    },
    /// Delete sessions that expired more than the grace period ago
    PurgeSessions {
        /// Days to keep expired sessions around
        #[arg(long, default_value_t = 7)]
        grace_days: i64,
    },
    /// Load the configuration and print it with the secret redacted
    CheckConfig,
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgStore> {
    PgStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("connecting to PostgreSQL")
}

async fn promote(config: &AppConfig, user_id: UserId) -> anyhow::Result<()> {
    let store = connect(config).await?;

    let Some(mut user) = UserRepository::get_by_id(&store, user_id).await? else {
        bail!("user {user_id} not found");
    };
    if let Err(kind) = user.promote_to_admin() {
        if kind == ErrorKind::AlreadyAdmin {
            bail!("user {} ({}) is already an admin", user.id, user.username);
        }
        bail!("cannot promote user {user_id}: {kind}");
    }
    UserRepository::update(&store, &user).await?;

    tracing::info!(target: "audit", event_type = "role_elevated", user_id, "Promoted from CLI");
    println!("Promoted {} ({}) to admin", user.username, user.id);
    Ok(())
}

const MAX_GRACE_DAYS: i64 = 36_500;

/// Sessions that expired before the returned instant are purged
fn grace_cutoff(now: DateTime<Utc>, grace_days: i64) -> Option<DateTime<Utc>> {
    if !(0..=MAX_GRACE_DAYS).contains(&grace_days) {
        return None;
    }
    Duration::try_days(grace_days).and_then(|grace| now.checked_sub_signed(grace))
}

async fn purge_sessions(config: &AppConfig, grace_days: i64) -> anyhow::Result<()> {
    let Some(cutoff) = grace_cutoff(Utc::now(), grace_days) else {
        bail!("--grace-days must be between 0 and {MAX_GRACE_DAYS}");
    };
    let store = connect(config).await?;

    let removed = store.delete_expired(cutoff).await?;

    tracing::info!(removed, %cutoff, "Purged expired sessions");
    println!("Removed {removed} session(s) that expired before {cutoff}");
    Ok(())
}

fn check_config(config: &AppConfig) {
    let auth = &config.auth;
    println!("server:   {}:{}", config.server.host, config.server.port);
    println!("timeout:  {}s", config.server.request_timeout_secs);
    println!("database: max {} connection(s)", config.database.max_connections);
    println!("issuer:   {}", auth.issuer);
    println!(
        "secret:   [redacted, {} bytes]",
        auth.jwt_secret.expose_secret().len()
    );
    println!("access:   {}s", auth.access_token_ttl_secs);
    println!("refresh:  {} day(s)", auth.refresh_token_ttl_days);
    println!(
        "argon2:   m={} KiB, t={}, p={}",
        auth.password.memory_cost_kib, auth.password.time_cost, auth.password.parallelism
    );
    println!(
        "revoke sessions on password change: {}",
        auth.revoke_sessions_on_password_change
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_cli=info,blog_core=info,audit=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;
    if config.auth.has_short_secret() {
        tracing::warn!("JWT_SECRET is shorter than 32 bytes");
    }

    match cli.command {
        Commands::Promote { user_id } => promote(&config, user_id).await?,
        Commands::PurgeSessions { grace_days } => purge_sessions(&config, grace_days).await?,
        Commands::CheckConfig => check_config(&config),
    }

    Ok(())
}
