//! `tokenvault`: operator CLI for the authentication backend.
//!
//! Provisions accounts, drives the login/refresh/logout flows and runs the
//! expired-token sweep against the configured SQLite database.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokenvault::auth::sweep::{spawn_sweeper, sweep_once};
use tokenvault::auth::{AuthError, NewUser, RefreshTokenStore};
use tokenvault::config::config_json_schema;
use tokenvault::{
    AuthService, Clock, Config, Database, SqliteRefreshTokenStore, SqliteUserStore, SystemClock,
    TokenCodec,
};

/// Authentication backend with rotating refresh tokens.
#[derive(Parser, Debug)]
#[command(name = "tokenvault", version, about)]
struct Cli {
    /// Path to config file (default: platform config dir/tokenvault/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Account provisioning.
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Log in with email + password; prints the new session.
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        user_agent: Option<String>,
        #[arg(long)]
        ip: Option<String>,
    },

    /// Exchange a refresh token for a new token pair.
    Refresh {
        #[arg(long)]
        token: String,
        #[arg(long)]
        user_agent: Option<String>,
        #[arg(long)]
        ip: Option<String>,
    },

    /// Revoke a refresh token. Always succeeds.
    Logout {
        #[arg(long)]
        token: Option<String>,
    },

    /// Verify an access token and print its claims.
    Verify {
        #[arg(long)]
        token: String,
    },

    /// Revoke every refresh token of a user.
    RevokeAll {
        #[arg(long)]
        subject: String,
    },

    /// List a user's active refresh tokens.
    Sessions {
        #[arg(long)]
        subject: String,
    },

    /// Delete expired refresh tokens.
    Sweep {
        /// Keep running, sweeping every `sweep.interval_secs`.
        #[arg(long)]
        watch: bool,
    },

    /// Configuration helpers.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum UserAction {
    /// Create a user together with its profile.
    Add {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Replace a user's password.
    Passwd {
        #[arg(long)]
        id: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the JSON schema of the config file.
    Schema,
}

/// Everything a command may need, built once from config.
struct Runtime {
    config: Config,
    users: Arc<SqliteUserStore>,
    tokens: Arc<SqliteRefreshTokenStore>,
    auth: AuthService,
}

impl Runtime {
    fn build(config: Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let db_path = config.database_path();
        let db = Database::open(&db_path)?;
        tracing::debug!("Database opened at {}", db_path.display());

        let users = Arc::new(SqliteUserStore::new(db.clone(), clock.clone()));
        let tokens = Arc::new(SqliteRefreshTokenStore::new(db, clock.clone()));
        let codec = TokenCodec::new(
            config.auth.jwt_secret()?,
            config.auth.access_token_ttl(),
            clock.clone(),
        )?;
        let auth = AuthService::new(
            users.clone(),
            tokens.clone(),
            codec,
            clock,
            config.auth.refresh_token_ttl(),
        );

        Ok(Self {
            config,
            users,
            tokens,
            auth,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tokenvault=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Config {
        action: ConfigAction::Schema,
    } = cli.command
    {
        println!("{}", config_json_schema()?);
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let rt = Runtime::build(config)?;
    run(rt, cli.command).await
}

async fn run(rt: Runtime, command: Commands) -> Result<()> {
    match command {
        Commands::User { action } => match action {
            UserAction::Add {
                email,
                password,
                role,
                full_name,
            } => {
                let password = password_or_stdin(password)?;
                let (user, profile) = rt.users.create_user_with_profile(NewUser {
                    email,
                    password,
                    role,
                    full_name,
                    ..NewUser::default()
                })?;
                print_json(&serde_json::json!({ "user": user, "profile": profile }))
            }
            UserAction::Passwd { id, password } => {
                let password = password_or_stdin(password)?;
                if !rt.users.set_password(&id, &password)? {
                    anyhow::bail!("No user with id {id}");
                }
                print_json(&serde_json::json!({ "status": "updated", "user_id": id }))
            }
        },

        Commands::Login {
            email,
            password,
            user_agent,
            ip,
        } => {
            let password = password_or_stdin(password)?;
            let session = rt
                .auth
                .login(&email, &password, user_agent.as_deref(), ip.as_deref())
                .await
                .map_err(auth_failure)?;
            print_json(&session)
        }

        Commands::Refresh {
            token,
            user_agent,
            ip,
        } => {
            let session = rt
                .auth
                .refresh_tokens(&token, user_agent.as_deref(), ip.as_deref())
                .await
                .map_err(auth_failure)?;
            print_json(&session)
        }

        Commands::Logout { token } => {
            rt.auth.logout(token.as_deref()).await;
            print_json(&serde_json::json!({ "status": "logged_out" }))
        }

        Commands::Verify { token } => {
            let claims = rt.auth.authenticate(&token).map_err(auth_failure)?;
            print_json(&claims)
        }

        Commands::RevokeAll { subject } => {
            let revoked = rt
                .auth
                .revoke_all_sessions(&subject)
                .await
                .map_err(auth_failure)?;
            print_json(&serde_json::json!({ "subject": subject, "revoked": revoked }))
        }

        Commands::Sessions { subject } => {
            let sessions = rt
                .auth
                .active_sessions(&subject)
                .await
                .map_err(auth_failure)?;
            print_json(&sessions)
        }

        Commands::Sweep { watch } => {
            if !watch {
                let removed = sweep_once(rt.tokens.as_ref()).await?;
                return print_json(&serde_json::json!({ "removed": removed }));
            }

            let every = Duration::from_secs(rt.config.sweep.interval_secs);
            tracing::info!(interval_secs = rt.config.sweep.interval_secs, "Sweeper started");
            let store: Arc<dyn RefreshTokenStore> = rt.tokens.clone();
            let handle = spawn_sweeper(store, every);
            tokio::signal::ctrl_c().await?;
            handle.abort();
            tracing::info!("Sweeper stopped");
            Ok(())
        }

        Commands::Config { .. } => Ok(()),
    }
}

/// Print the structured error body to stdout, then fail the command.
fn auth_failure(err: AuthError) -> anyhow::Error {
    if let Ok(body) = serde_json::to_string_pretty(&err.to_body()) {
        println!("{body}");
    }
    anyhow::Error::new(err)
}

fn password_or_stdin(arg: Option<String>) -> Result<String> {
    match arg {
        Some(password) => Ok(password),
        None => read_password(std::io::stdin().lock()),
    }
}

/// First line of `input`, without the line terminator.
fn read_password(mut input: impl BufRead) -> Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        anyhow::bail!("No password given (pass --password or pipe it on stdin)");
    }
    Ok(password.to_string())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
