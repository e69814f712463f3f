//! bm: find a compatible wiper blade for a vehicle.

#![forbid(unsafe_code)]

mod browse;
mod callback;
mod render;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use bladematch_core::catalog::{Catalog, VehicleKey};
use bladematch_core::config::FinderConfig;
use bladematch_core::favorites::InMemoryFavorites;
use bladematch_core::logging::{LogFormat, init_logging};
use bladematch_core::resolver::TypeChoice;
use bladematch_core::search::{Candidate, SearchKind};
use bladematch_core::selection::Side;
use bladematch_core::synonyms::SynonymTable;
use bladematch_core::{LookupError, Navigator, PartsFinder};
use clap::{Parser, Subcommand};
use tracing::debug;

#[derive(Parser)]
#[command(name = "bm", version, about = "Find a compatible wiper blade for a vehicle")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog snapshot (JSON)
    #[arg(long, global = true, env = "BM_CATALOG")]
    catalog: Option<PathBuf>,

    /// Brand synonym table (JSON)
    #[arg(long, global = true, env = "BM_SYNONYMS")]
    synonyms: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "BM_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search vehicles by free text
    Search {
        /// Query words, e.g. `kia rio 2018`
        #[arg(required = true)]
        query: Vec<String>,

        /// Print the raw outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print every frame, blade type and link for one vehicle
    Resolve {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        years: String,
    },

    /// Interactive session over stdin
    Browse {
        /// User id for favorites and conversation state
        #[arg(long, default_value_t = 1)]
        user: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FinderConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FinderConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let finder = Arc::new(build_finder(&cli, config)?);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Search { query, json } => run_search(&finder, &query.join(" "), json, &mut out),
        Commands::Resolve {
            brand,
            model,
            years,
        } => run_resolve(&finder, &VehicleKey::new(brand, model, years), &mut out),
        Commands::Browse { user } => {
            let navigator = Navigator::new(Arc::clone(&finder), Arc::new(InMemoryFavorites::new()));
            let stdin = io::stdin();
            browse::Session::new(&navigator, user, &mut out).run(stdin.lock())?;
            debug!(stats = ?finder.token_stats(), "Session finished");
            Ok(())
        }
    }
}

fn build_finder(cli: &Cli, config: FinderConfig) -> Result<PartsFinder> {
    let Some(catalog_path) = &cli.catalog else {
        bail!("No catalog given. Pass --catalog <FILE> or set BM_CATALOG.");
    };
    let catalog = load_catalog(catalog_path)?;
    let synonyms = match &cli.synonyms {
        Some(path) => SynonymTable::load(path)
            .with_context(|| format!("Failed to load synonyms {}", path.display()))?,
        None => SynonymTable::default(),
    };
    Ok(PartsFinder::new(Arc::new(catalog), Arc::new(synonyms), config))
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    let catalog = Catalog::load(path)
        .with_context(|| format!("Failed to load catalog {}", path.display()))?;
    if catalog.is_empty() {
        tracing::warn!(path = %path.display(), "Catalog has no vehicles");
    }
    Ok(catalog)
}

fn run_search(finder: &PartsFinder, query: &str, json: bool, out: &mut impl Write) -> Result<()> {
    let outcome = finder.search(query);
    if json {
        serde_json::to_writer_pretty(&mut *out, &outcome)?;
        writeln!(out)?;
        return Ok(());
    }
    if outcome.is_empty() {
        writeln!(out, "Nothing found for \"{query}\".")?;
        return Ok(());
    }
    let write_list = |out: &mut dyn Write, title: &str, list: &[Candidate]| -> io::Result<()> {
        if list.is_empty() {
            return Ok(());
        }
        writeln!(out, "{title}:")?;
        for c in list {
            let v = &c.vehicle;
            writeln!(
                out,
                "  {} {} ({})  mount {}  score {:.2}",
                v.brand, v.model, v.years, v.mount, c.score
            )?;
        }
        Ok(())
    };
    let title = if outcome.kind == SearchKind::BrandListing {
        "Brand listing"
    } else {
        "Matches"
    };
    write_list(out, title, &outcome.matches)?;
    write_list(out, "Similar", &outcome.similar)?;
    Ok(())
}

fn run_resolve(finder: &PartsFinder, key: &VehicleKey, out: &mut impl Write) -> Result<()> {
    let (fitment, frames) = match finder.resolve_frames(key) {
        Ok(found) => found,
        Err(err @ LookupError::NotFound(_)) => bail!("{err}"),
        Err(err) => {
            writeln!(out, "{key}: {err}")?;
            return Ok(());
        }
    };
    write!(out, "{key}  mount {}", fitment.mount)?;
    for side in Side::ALL {
        if let Some(size) = fitment.sizes.get(side) {
            write!(out, "  {side} {size} mm")?;
        }
    }
    writeln!(out)?;

    for frame in frames {
        writeln!(out, "Frame {frame}")?;
        let types = match finder.resolve_types(&frame, &fitment) {
            Ok(TypeChoice::Auto(only)) => vec![only],
            Ok(TypeChoice::Choose(many)) => many,
            Err(err) => {
                writeln!(out, "  {err}")?;
                continue;
            }
        };
        for blade_type in types {
            match &blade_type.description {
                Some(description) => writeln!(out, "  Type {} ({description})", blade_type.blade_type)?,
                None => writeln!(out, "  Type {}", blade_type.blade_type)?,
            }
            let resolver = finder.resolver();
            for link in resolver.kit_links(&frame, &blade_type.blade_type, &fitment.mount, fitment.sizes) {
                writeln!(out, "    kit        {}: {}", link.marketplace, link.url)?;
            }
            for side in Side::ALL {
                let Ok(links) = resolver.single_links(
                    &frame,
                    &blade_type.blade_type,
                    &fitment.mount,
                    fitment.sizes,
                    side,
                ) else {
                    continue;
                };
                for link in links {
                    writeln!(out, "    {side:<10} {}: {}", link.marketplace, link.url)?;
                }
            }
        }
    }
    Ok(())
}
