//! Tether activation service and admin tool.
//!
//! Usage:
//!   tether-server serve --bind 0.0.0.0:5000 --key-file tether.key
//!   tether-server keygen --out tether.key
//!   tether-server mint --machine-id <fingerprint> --package 1M --out license.json
//!
//! The service is stateless. The only file it touches is the shared key.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::{fs, net::SocketAddr, path::Path, path::PathBuf, sync::Arc};
use tether_license::{
    ActivationRequest, ActivationResponse, ActivationService, ServiceConfig, SharedKey,
};
use tether_server::build_router;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the base64 shared key.
const KEY_ENV: &str = "TETHER_SHARED_KEY";

#[derive(Parser, Debug)]
#[command(name = "tether-server")]
#[command(about = "Tether license activation service and admin tool")]
struct Args {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP activation service
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:5000")]
        bind: SocketAddr,

        /// Path to the shared key file (created if missing)
        #[arg(short, long, default_value = "tether.key")]
        key_file: PathBuf,

        /// Base64 shared key; takes precedence over the key file
        #[arg(long, env = KEY_ENV, hide_env_values = true)]
        key: Option<String>,

        /// Subject recorded on issued licenses
        #[arg(long, default_value = "licensee")]
        subject: String,

        /// Entitlement recorded on issued licenses
        #[arg(long, default_value = "Standard")]
        entitlement: String,
    },

    /// Generate a new shared key
    Keygen {
        /// Where to write the key
        #[arg(short, long, default_value = "tether.key")]
        out: PathBuf,

        /// Overwrite an existing key file
        #[arg(long)]
        force: bool,
    },

    /// Mint a license offline for a machine
    Mint {
        /// Target machine fingerprint
        #[arg(short, long)]
        machine_id: String,

        /// Package code (1M, 3M, 6M, PERM)
        #[arg(short, long)]
        package: String,

        /// Path to the shared key file
        #[arg(short, long, default_value = "tether.key")]
        key_file: PathBuf,

        /// Write `{"license": ...}` here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Subject recorded on the license
        #[arg(long, default_value = "licensee")]
        subject: String,

        /// Entitlement recorded on the license
        #[arg(long, default_value = "Standard")]
        entitlement: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    match args.command {
        Command::Serve {
            bind,
            key_file,
            key,
            subject,
            entitlement,
        } => {
            let key = match key {
                Some(text) => SharedKey::from_base64(&text).context("invalid key in environment")?,
                None => load_or_generate_key(&key_file)?,
            };
            serve(bind, ActivationService::new(service_config(subject, entitlement), key)).await
        }
        Command::Keygen { out, force } => {
            if out.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", out.display());
            }
            write_key(&out, &SharedKey::generate())?;
            println!("Wrote new shared key to {}", out.display());
            println!("Distribute it to the activation service and every client build.");
            Ok(())
        }
        Command::Mint {
            machine_id,
            package,
            key_file,
            out,
            subject,
            entitlement,
        } => {
            let key = read_key(&key_file)?;
            let service = ActivationService::new(service_config(subject, entitlement), key);
            let encoded = service
                .activate(&ActivationRequest {
                    machine_id,
                    package,
                })
                .context("failed to mint license")?;
            let body = serde_json::to_string_pretty(&ActivationResponse {
                license: encoded.to_base64(),
            })?;
            match out {
                Some(path) => {
                    fs::write(&path, body).context("failed to write license file")?;
                    println!("License written to {}", path.display());
                }
                None => println!("{body}"),
            }
            Ok(())
        }
    }
}

fn service_config(subject: String, entitlement: String) -> ServiceConfig {
    ServiceConfig {
        subject,
        entitlement,
        ..ServiceConfig::default()
    }
}

async fn serve(bind: SocketAddr, service: ActivationService) -> Result<()> {
    let app = build_router(Arc::new(service));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("activation service listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for shutdown signal: {e}");
            }
            info!("shutting down");
        })
        .await
        .context("HTTP server failed")
}

fn load_or_generate_key(path: &Path) -> Result<SharedKey> {
    if path.exists() {
        info!("Loading shared key from {:?}", path);
        read_key(path)
    } else {
        info!("Generating new shared key at {:?}", path);
        let key = SharedKey::generate();
        write_key(path, &key)?;
        Ok(key)
    }
}

fn read_key(path: &Path) -> Result<SharedKey> {
    let text = fs::read_to_string(path).context("Failed to read key file")?;
    SharedKey::from_base64(&text).context("Failed to decode shared key")
}

fn write_key(path: &Path, key: &SharedKey) -> Result<()> {
    fs::write(path, format!("{}\n", key.to_base64())).context("Failed to write key file")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .context("Failed to restrict key file permissions")?;
    }
    Ok(())
}
