use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::error;

use ygo_catalog::catalog::runtime::CatalogRuntime;
use ygo_catalog::config::CatalogConfig;
use ygo_catalog::rarity::RarityGroup;
use ygo_catalog::state::data::{AggregationMode, CardDisplayEntity, PrintingKey};
use ygo_catalog::state::import::import_cardinfo;
use ygo_catalog::state::library::{CatalogStore, Library};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(name = "ygo-catalog", version, about = "Browse and track a local Yu-Gi-Oh! card catalog")]
struct Cli {
    /// Catalog database (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (default: <config dir>/ygo-catalog/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Filter the catalog and print the visible grid rows
    Browse(BrowseArgs),
    /// List every set in the catalog
    Sets,
    /// Change the owned quantity of one printing
    Adjust(AdjustArgs),
    /// Import a saved YGOPRODeck cardinfo.php response
    Import {
        file: PathBuf,
    },
    /// Report rarity labels no rarity group covers
    Audit,
}

#[derive(Args, Debug)]
struct BrowseArgs {
    /// Card name substring
    #[arg(long)]
    name: Option<String>,

    /// Exact set name
    #[arg(long)]
    set: Option<String>,

    /// Card type substring (e.g. "spell", "effect monster")
    #[arg(long = "type")]
    card_type: Option<String>,

    /// Only show entities with a label in this group (e.g. ultra_rare)
    #[arg(long)]
    rarity: Option<RarityGroup>,

    /// One entity per card instead of one per card and set
    #[arg(long)]
    full: bool,

    #[arg(long, default_value_t = 1280.0)]
    width: f32,

    #[arg(long, default_value_t = 720.0)]
    height: f32,

    /// Vertical scroll offset in pixels
    #[arg(long, default_value_t = 0.0)]
    scroll: f32,
}

#[derive(Args, Debug)]
struct AdjustArgs {
    #[arg(long)]
    card: i64,

    /// Set code of the printing (omit for printings without one)
    #[arg(long)]
    set: Option<String>,

    /// Rarity label exactly as stored
    #[arg(long)]
    rarity: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    delta: i64,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(cli: &Cli) -> CliResult<CatalogConfig> {
    let mut config = CatalogConfig::load_or_default(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        config.database_path = Some(db.clone());
    }
    Ok(config)
}

fn open_library(config: &CatalogConfig) -> CliResult<Library> {
    let path = config
        .database_path()
        .ok_or("could not determine a database location, pass --db")?;
    Ok(Library::open(path)?)
}

fn print_entity(row: usize, entity: &CardDisplayEntity, runtime: &CatalogRuntime<Library>) {
    let rarities = runtime.filter().rarities();
    println!(
        "[{row:>4}] {:>9}  {:<40}  {:<12}  {:<22}  x{}",
        entity.card_id(),
        entity.name(),
        entity.card.set_code.as_deref().unwrap_or("-"),
        entity.top_rarity(rarities).as_str(),
        entity.card.quantity.unwrap_or(0),
    );
}

async fn browse(config: CatalogConfig, args: BrowseArgs) -> CliResult<()> {
    let library = open_library(&config)?;
    let mut runtime = CatalogRuntime::new(library, &config)?;

    runtime.viewport_mut().resize(args.width, args.height);
    runtime.viewport_mut().scroll_to(args.scroll);
    if args.full {
        runtime.set_mode(AggregationMode::Full);
    }

    runtime.audit_rarity_labels().await?;
    runtime.activate();
    runtime.settle().await;

    if let Some(set) = &args.set {
        runtime.set_set_filter(set);
    }
    if let Some(name) = &args.name {
        runtime.set_name_filter(name);
    }
    runtime.settle().await;
    runtime.set_type_filter(args.card_type.as_deref());
    runtime.set_rarity_filter(args.rarity);

    if let Some(e) = runtime.filter().last_error() {
        return Err(e.to_string().into());
    }

    let layout = runtime.layout();
    println!(
        "{} entities, {} columns x {} rows",
        runtime.entities().len(),
        layout.columns(),
        layout.row_count()
    );
    for (row, entities) in runtime.visible_rows() {
        for entity in entities {
            print_entity(row, entity, &runtime);
        }
    }
    Ok(())
}

async fn adjust(config: CatalogConfig, args: AdjustArgs) -> CliResult<()> {
    let library = open_library(&config)?;
    let mut runtime = CatalogRuntime::new(library, &config)?;

    let key = PrintingKey::new(args.card, args.set, args.rarity);
    let quantity = runtime.adjust_quantity(&key, args.delta).await?;
    println!("{key}: {quantity}");
    Ok(())
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Command::Browse(args) => browse(config, args).await,
        Command::Adjust(args) => adjust(config, args).await,
        Command::Sets => {
            let library = open_library(&config)?;
            for set in library.list_all_sets()? {
                println!("{set}");
            }
            Ok(())
        }
        Command::Import { file } => {
            let mut library = open_library(&config)?;
            let reader = BufReader::new(File::open(&file)?);
            let result = import_cardinfo(&mut library, reader)?;
            println!(
                "Imported {} cards, {} printings, {} new images ({} skipped)",
                result.cards, result.printings, result.images, result.skipped
            );
            Ok(())
        }
        Command::Audit => {
            let library = open_library(&config)?;
            let table = config.rarity_table()?;
            let unknown = table.audit_labels(library.list_all_rarity_labels()?);
            if unknown.is_empty() {
                println!("Every rarity label maps to a rarity group");
            }
            for label in unknown {
                println!("{label}");
            }
            Ok(())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
