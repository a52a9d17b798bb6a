use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use survox_api::Client;
use survox_demodata::account::ACCOUNTS_DIR;
use survox_demodata::{AccountSettings, DataDir, Installer, InstallerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "survox-demodata")]
#[command(about = "Install Survox demo clients, templates, and surveys")]
#[command(version, long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// API host or base URL
    #[arg(long)]
    host: Option<String>,

    #[arg(long, env = "SURVOX_API_KEY")]
    api_key: Option<String>,

    /// Directory holding `config/` and `data/`
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Runtime account owning the demo data
    #[arg(long)]
    account: Option<String>,

    /// Also copy survey files into the account's runtime and configure them
    #[arg(long)]
    runtime_files: bool,

    /// Where `{account}.acct` files live
    #[arg(long, value_name = "DIR", default_value = ACCOUNTS_DIR)]
    accounts_dir: PathBuf,

    /// Log every API request at info level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting survox-demodata");

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => InstallerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => InstallerConfig::default(),
    };
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(key) = cli.api_key {
        config.api.api_key = Some(key);
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(account) = cli.account {
        config.account = account;
    }
    config.api.verbose = config.api.verbose || cli.verbose;

    let client = Client::connect(&config.api)
        .await
        .with_context(|| format!("connecting to {}", config.api.host))?;
    tracing::info!(base_url = %client.base_url(), account = %config.account, "connected");

    let mut installer = Installer::new(&client, DataDir::new(&config.data_dir));
    if cli.runtime_files {
        let account = AccountSettings::load_from(&cli.accounts_dir, &config.account)
            .with_context(|| format!("reading account {}", config.account))?;
        installer = installer.with_account(account);
    }

    installer.run(&config.install).await?;
    tracing::info!("All done");
    Ok(())
}
