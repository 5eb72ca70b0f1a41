use cartwatch::application::cadence::{IntervalTrigger, drive};
use cartwatch::application::store::Store;
use cartwatch::application::watcher::CheckoutWatcher;
use cartwatch::config::StoreConfig;
use cartwatch::domain::cart::{Cart, CartId};
use cartwatch::domain::catalog::Catalog;
use cartwatch::domain::checkout::CheckoutId;
use cartwatch::error::Result as StoreResult;
use cartwatch::infrastructure::in_memory::{LocalCheckoutGateway, ScriptedStatusOracle};
use cartwatch::infrastructure::storefront::StorefrontOracle;
use cartwatch::interfaces::csv::session_reader::{SessionCommand, SessionReader};
use cartwatch::interfaces::csv::summary_writer::SummaryWriter;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON store configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storefront domain. Overrides the configuration file.
    #[arg(long, global = true, env = "CARTWATCH_SHOP_DOMAIN")]
    shop_domain: Option<String>,

    /// Storefront access token. Overrides the configuration file.
    #[arg(long, global = true, env = "CARTWATCH_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a scripted storefront session against an offline catalog
    Session {
        /// Catalog JSON file
        catalog: PathBuf,
        /// Session script CSV file (command,cart,target,value)
        script: PathBuf,
    },
    /// Poll a live checkout until it completes or is abandoned
    Watch {
        /// Checkout global id
        checkout: String,

        /// Seconds between status queries
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: u64,

        /// Give up after this many queries
        #[arg(long)]
        max_polls: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .into_diagnostic()?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Session { catalog, script } => run_session(&config, &catalog, &script).await,
        Command::Watch {
            checkout,
            interval_secs,
            max_polls,
        } => run_watch(&config, &checkout, Duration::from_secs(interval_secs), max_polls).await,
    }
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_path(path).into_diagnostic()?,
        None => StoreConfig::default(),
    };
    if let Some(domain) = &cli.shop_domain {
        config.shop_domain = domain.clone();
    }
    if let Some(token) = &cli.access_token {
        config.access_token = token.clone();
    }
    config.validate().into_diagnostic()?;
    Ok(config)
}

async fn run_session(config: &StoreConfig, catalog_path: &Path, script_path: &Path) -> Result<()> {
    let catalog_file = File::open(catalog_path).into_diagnostic()?;
    let catalog = Catalog::from_json_reader(BufReader::new(catalog_file)).into_diagnostic()?;

    let oracle = ScriptedStatusOracle::new();
    let gateway = LocalCheckoutGateway::new(config.checkout_host());
    let store = Store::new(config, catalog, Arc::new(oracle.clone()), Box::new(gateway))
        .into_diagnostic()?;
    if store.catalog().is_empty() {
        warn!(catalog = %catalog_path.display(), "catalog has no products");
    }
    let limits = store.limits();
    info!(
        products = store.catalog().len(),
        min_quantity = limits.min(),
        max_quantity = limits.max(),
        "session store ready"
    );

    let script = File::open(script_path).into_diagnostic()?;
    for (index, command) in SessionReader::new(script).commands().enumerate() {
        // Row 1 is the header.
        let row = index + 2;
        match command {
            Ok(command) => {
                if let Err(e) = apply(&store, &oracle, command).await {
                    warn!(row, error = %e, "session command failed");
                }
            }
            Err(e) => warn!(row, error = %e, "skipping session row"),
        }
    }
    store.shutdown();

    let carts: Vec<(CartId, Cart)> = store
        .cart_ids()
        .into_iter()
        .map(|id| {
            let cart = store.cart(&id);
            (id, cart)
        })
        .collect();

    let stdout = io::stdout();
    let mut writer = SummaryWriter::new(stdout.lock());
    writer.write_outcomes(&store.outcomes()).into_diagnostic()?;
    writer.write_carts(&carts).into_diagnostic()?;

    Ok(())
}

async fn apply(store: &Store, oracle: &ScriptedStatusOracle, command: SessionCommand) -> StoreResult<()> {
    match command {
        SessionCommand::Add {
            cart,
            variant,
            quantity,
        } => {
            store.add_to_cart(&variant, quantity, &cart)?;
        }
        SessionCommand::Remove {
            cart,
            variant,
            quantity,
        } => {
            store.remove_from_cart(&variant, quantity, &cart)?;
        }
        SessionCommand::Clear { cart } => store.clear_cart(&cart),
        SessionCommand::Checkout { cart } => {
            let session = store.check_out(&cart).await?;
            info!(checkout = %session.id, url = %session.web_url, "customer sent to checkout");
        }
        SessionCommand::Buy { variant, quantity } => {
            let session = store.one_shot_checkout(&variant, quantity).await?;
            info!(checkout = %session.id, url = %session.web_url, "customer sent to checkout");
        }
        SessionCommand::Status { checkout, result } => oracle.push(checkout, result).await,
        SessionCommand::Focus { has_focus } => {
            for query in store.application_focus(has_focus) {
                if query.await.is_err() {
                    warn!("status query task did not finish");
                }
            }
        }
    }
    Ok(())
}

async fn run_watch(
    config: &StoreConfig,
    checkout: &str,
    interval: Duration,
    max_polls: Option<u32>,
) -> Result<()> {
    if !config.has_credentials() {
        return Err(miette!(
            "watching a live checkout needs a shop domain and an access token"
        ));
    }
    let checkout = CheckoutId::new(checkout).into_diagnostic()?;
    let oracle = StorefrontOracle::from_config(config).into_diagnostic()?;
    let watcher = CheckoutWatcher::create(checkout.clone(), Arc::new(oracle));

    let mut trigger = IntervalTrigger::new(interval, max_polls);
    let state = tokio::select! {
        state = drive(&watcher, &mut trigger) => state,
        _ = tokio::signal::ctrl_c() => {
            info!(checkout = %checkout, "interrupted, stopping watch");
            watcher.dispose();
            watcher.state()
        }
    };

    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    writer.write_record(["checkout", "state"]).into_diagnostic()?;
    writer
        .write_record([checkout.as_str(), state.as_str()])
        .into_diagnostic()?;
    writer.flush().into_diagnostic()?;

    Ok(())
}
