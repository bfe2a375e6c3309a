use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

use cafemap::config::{FileConfig, GeocoderProvider, RejectedConfig};
use cafemap::service::DEFAULT_RADIUS_KM;
use cafemap::{CafeLocator, LocatorError, SearchQuery};

/// Find specialty cafés near an address
///
/// Examples:
///   # Cafés within 2 km of an address
///   cafemap search -c "Mar del Plata" -a "Av. Colón 1500"
///
///   # Only cafés serving one roaster, within 5 km
///   cafemap search -c "Mar del Plata" -a "Güemes 2800" -r 5 --roaster "Puerto Blest"
///
///   # Let fate pick a café within 750 m
///   cafemap recommend -c "Rosario" -a "Oroño 1200"
///
///   # Match addresses against the café list only
///   cafemap --offline search -c "La Plata" -a "Calle 7 y 50"
#[derive(Parser, Debug)]
#[command(name = "cafemap")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches cafemap.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Geocoding provider: arcgis, nominatim or disabled
    #[arg(long, global = true)]
    geocoder: Option<GeocoderProvider>,

    /// Skip the remote geocoder (same as --geocoder disabled)
    #[arg(long, global = true)]
    offline: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the supported cities
    Cities,

    /// Every café of a city
    Cafes {
        #[arg(short = 'c', long)]
        city: String,
    },

    /// Roasters, optionally only those serving a city
    Roasters {
        #[arg(short = 'c', long)]
        city: Option<String>,
    },

    /// Cafés near an address, nearest first
    Search {
        #[arg(short = 'c', long)]
        city: String,

        #[arg(short = 'a', long)]
        address: String,

        /// Search radius in kilometers (0 < r <= 10)
        #[arg(short = 'r', long, default_value_t = DEFAULT_RADIUS_KM)]
        radius: f64,

        /// Exact roaster name ("Todos" for any)
        #[arg(long)]
        roaster: Option<String>,
    },

    /// One random café within 750 m of an address
    Recommend {
        #[arg(short = 'c', long)]
        city: String,

        #[arg(short = 'a', long)]
        address: String,
    },

    /// Cafés with exactly this name, in any city
    Lookup {
        #[arg(short = 'n', long)]
        name: String,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<LocatorError>() {
            Some(locator_err) => {
                eprintln!("Error ({}): {}", locator_err.status_code(), locator_err);
                if locator_err.is_client_error() {
                    ExitCode::from(2)
                } else {
                    ExitCode::FAILURE
                }
            }
            None => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn run(args: Args) -> Result<()> {
    // Parse problems are held until the subscriber exists, otherwise they vanish.
    let (mut config, rejected) = match args.config {
        Some(ref path) if path.exists() => (FileConfig::from_path(path)?, Vec::new()),
        Some(ref path) => bail!("Config file not found: {:?}", path),
        None => {
            let search = FileConfig::discover();
            (search.config_or_default(), search.rejected)
        }
    };

    init_logging(args.verbose || config.verbose);
    report_rejected(&rejected);

    if let Some(provider) = args.geocoder {
        config.geocoder.provider = provider;
    }
    if args.offline {
        config.geocoder.provider = GeocoderProvider::Disabled;
    }

    tracing::debug!(
        cities = config.cities.len(),
        geocoder = ?config.geocoder.provider,
        ttl_secs = config.cache_ttl_secs,
        "configuration loaded"
    );

    let locator = CafeLocator::from_config(config)?;

    match args.command {
        Command::Cities => print_json(&locator.cities()),
        Command::Cafes { city } => {
            let cafes = with_spinner(&format!("Loading cafés for {}...", city), || {
                locator.cafes(&city)
            })?;
            print_json(&cafes)
        }
        Command::Roasters { city } => {
            let roasters = with_spinner("Loading roasters...", || {
                Ok(locator.roasters(city.as_deref()))
            })?;
            print_json(&roasters)
        }
        Command::Search {
            city,
            address,
            radius,
            roaster,
        } => {
            let mut query = SearchQuery::new(city, address).with_radius(radius);
            if let Some(roaster) = roaster {
                query = query.with_roaster(roaster);
            }
            let cafes = with_spinner("Searching nearby cafés...", || locator.search(&query))?;
            print_json(&cafes)
        }
        Command::Recommend { city, address } => {
            let pick = with_spinner("Picking a café...", || locator.recommend(&city, &address))?;
            print_json(&pick)
        }
        Command::Lookup { name } => {
            let cafes = with_spinner("Loading every city...", || {
                Ok(locator.lookup_by_name(&name))
            })?;
            print_json(&cafes)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));
    log_subscriber(filter, std::io::stderr).init();
}

fn default_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

fn log_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish()
}

fn report_rejected(rejected: &[RejectedConfig]) {
    for entry in rejected {
        tracing::warn!(
            "Failed to parse config file {:?}, using defaults: {}",
            entry.path,
            entry.error
        );
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run a slow step behind a spinner on stderr.
fn with_spinner<T>(
    message: &str,
    step: impl FnOnce() -> cafemap::Result<T>,
) -> Result<T> {
    let spinner = create_spinner(message);
    let start = Instant::now();
    let result = step();
    spinner.finish_and_clear();
    tracing::debug!(
        elapsed_secs = start.elapsed().as_secs_f32(),
        ok = result.is_ok(),
        "{}",
        message
    );
    Ok(result?)
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
