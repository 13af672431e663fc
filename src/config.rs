use crate::services::{
    credential_store::HashingConfig,
    subject_verifier::VerifierConfig,
    token_authority::{DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS, TokenConfig},
};
use anyhow::{Context, Result, bail};
use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use reqwest::Url;
use std::{env, str::FromStr, time::Duration};

const DEFAULT_IDENTITY_URL: &str = "http://localhost:8001";
const DEFAULT_VERIFY_TIMEOUT_MS: u64 = 3000;

/// Command-line + environment configuration.
#[derive(Parser)]
#[command(author, version, about = "Car rental identity and inventory services")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve accounts, logins and subject verification
    Identity(IdentityArgs),
    /// Serve the car catalog and rentals
    Inventory(InventoryArgs),
}

/// Flags shared by both services.
#[derive(clap::Args)]
pub struct CommonArgs {
    /// Host to bind to (overrides CAR_RENTAL_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CAR_RENTAL_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides CAR_RENTAL_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// HS256 signing secret shared by both services (overrides CAR_RENTAL_JWT_SECRET)
    #[arg(long)]
    pub jwt_secret: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

#[derive(clap::Args)]
pub struct IdentityArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Token validity in seconds (overrides CAR_RENTAL_TOKEN_TTL_SECS)
    #[arg(long)]
    pub token_ttl_secs: Option<i64>,

    /// Argon2 memory cost in KiB
    #[arg(long)]
    pub hash_memory_kib: Option<u32>,

    /// Argon2 iteration count
    #[arg(long)]
    pub hash_iterations: Option<u32>,

    /// Argon2 lanes
    #[arg(long)]
    pub hash_parallelism: Option<u32>,
}

#[derive(clap::Args)]
pub struct InventoryArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Base URL of the identity service (overrides CAR_RENTAL_IDENTITY_URL)
    #[arg(long)]
    pub identity_url: Option<String>,

    /// Deadline for one remote verification (overrides CAR_RENTAL_VERIFY_TIMEOUT_MS)
    #[arg(long)]
    pub verify_timeout_ms: Option<u64>,
}

/// Where and how one service listens.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub name: &'static str,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub migrate: bool,
}

impl ServiceConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Centralized application configuration for the selected service.
#[derive(Debug, Clone)]
pub enum AppConfig {
    Identity {
        service: ServiceConfig,
        token: TokenConfig,
        hashing: HashingConfig,
    },
    Inventory {
        service: ServiceConfig,
        token: TokenConfig,
        verifier: VerifierConfig,
    },
}

impl AppConfig {
    /// Parse CLI args and the process environment.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |key| env::var(key).ok())
    }

    /// Merge `args` over `env` over defaults.
    pub fn resolve(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        match args.command {
            Command::Identity(args) => {
                let (service, secret) = resolve_common(
                    args.common,
                    &env,
                    "identity",
                    8001,
                    "sqlite://./data/identity.db",
                )?;

                let ttl_secs = match args.token_ttl_secs {
                    Some(ttl) => ttl,
                    None => env_parsed(&env, "CAR_RENTAL_TOKEN_TTL_SECS")?
                        .unwrap_or(DEFAULT_TOKEN_TTL_SECS),
                };
                if !(1..=MAX_TOKEN_TTL_SECS).contains(&ttl_secs) {
                    bail!("token TTL must be 1..={MAX_TOKEN_TTL_SECS}s, got {ttl_secs}s");
                }
                let ttl = TimeDelta::try_seconds(ttl_secs)
                    .with_context(|| format!("token TTL {ttl_secs}s is out of range"))?;

                let defaults = HashingConfig::default();
                let hashing = HashingConfig {
                    memory_kib: args.hash_memory_kib.unwrap_or(defaults.memory_kib),
                    iterations: args.hash_iterations.unwrap_or(defaults.iterations),
                    parallelism: args.hash_parallelism.unwrap_or(defaults.parallelism),
                };

                Ok(Self::Identity {
                    service,
                    token: TokenConfig { secret, ttl },
                    hashing,
                })
            }
            Command::Inventory(args) => {
                let (service, secret) = resolve_common(
                    args.common,
                    &env,
                    "inventory",
                    8000,
                    "sqlite://./data/inventory.db",
                )?;

                let identity_url = args
                    .identity_url
                    .or_else(|| env("CAR_RENTAL_IDENTITY_URL"))
                    .unwrap_or_else(|| DEFAULT_IDENTITY_URL.into());
                let timeout_ms = match args.verify_timeout_ms {
                    Some(ms) => ms,
                    None => env_parsed(&env, "CAR_RENTAL_VERIFY_TIMEOUT_MS")?
                        .unwrap_or(DEFAULT_VERIFY_TIMEOUT_MS),
                };
                if timeout_ms == 0 {
                    bail!("verification timeout must be positive");
                }

                Ok(Self::Inventory {
                    service,
                    token: TokenConfig::new(secret),
                    verifier: VerifierConfig {
                        endpoint: verify_endpoint(&identity_url)?,
                        timeout: Duration::from_millis(timeout_ms),
                    },
                })
            }
        }
    }

    pub fn service(&self) -> &ServiceConfig {
        match self {
            Self::Identity { service, .. } | Self::Inventory { service, .. } => service,
        }
    }
}

fn resolve_common(
    args: CommonArgs,
    env: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default_port: u16,
    default_db: &str,
) -> Result<(ServiceConfig, String)> {
    let env_host = env("CAR_RENTAL_HOST").unwrap_or_else(|| "0.0.0.0".into());
    let env_port = env_parsed(env, "CAR_RENTAL_PORT")?.unwrap_or(default_port);
    let env_db = env("CAR_RENTAL_DATABASE_URL").unwrap_or_else(|| default_db.into());

    let Some(secret) = args
        .jwt_secret
        .or_else(|| env("CAR_RENTAL_JWT_SECRET"))
        .filter(|secret| !secret.is_empty())
    else {
        bail!("a signing secret is required: pass --jwt-secret or set CAR_RENTAL_JWT_SECRET");
    };

    let service = ServiceConfig {
        name,
        host: args.host.unwrap_or(env_host),
        port: args.port.unwrap_or(env_port),
        database_url: args.database_url.unwrap_or(env_db),
        migrate: args.migrate,
    };
    Ok((service, secret))
}

fn env_parsed<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env(key)
        .map(|value| {
            value
                .parse::<T>()
                .with_context(|| format!("parsing {key} value `{value}`"))
        })
        .transpose()
}

/// `{base}/verify_user`, keeping any path prefix on the base URL.
fn verify_endpoint(base: &str) -> Result<Url> {
    let mut base = Url::parse(base).with_context(|| format!("parsing identity URL `{base}`"))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("verify_user")
        .context("building the verification endpoint")
}
