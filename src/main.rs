use anyhow::Context;
use blendrec::{Engine, EngineConfig, JsonCatalogStore, JsonHistoryStore, ProductId, ProfileQuery};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Hybrid recommendations over a JSON product catalog
#[derive(Parser, Debug)]
#[command(name = "blendrec")]
#[command(about = "A hybrid recommendation engine", long_about = None)]
struct Args {
    /// JSON array of products
    #[arg(short, long)]
    catalog: PathBuf,

    /// JSON object of user histories
    #[arg(long)]
    history: Option<PathBuf>,

    /// JSON engine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for sampling; overrides the configured fallback seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Items similar to a catalog item
    Item {
        id: String,
        #[arg(short)]
        k: Option<usize>,
    },
    /// Personalized items for a user
    User {
        id: String,
        #[arg(short)]
        k: Option<usize>,
    },
    /// Items matching free-form attributes
    Profile {
        #[command(flatten)]
        query: QueryArgs,
        #[arg(short)]
        k: Option<usize>,
    },
    /// Members of the cluster most models agree on
    Consensus {
        #[command(flatten)]
        query: QueryArgs,
        #[arg(short)]
        k: Option<usize>,
    },
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    rating: Option<f64>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    title: Option<String>,
}

impl From<QueryArgs> for ProfileQuery {
    fn from(args: QueryArgs) -> Self {
        ProfileQuery {
            price: args.price,
            rating: args.rating,
            category: args.category,
            title: args.title,
        }
    }
}

/// Numeric ids are integers; anything else is a UUID or a plain string
fn parse_id(raw: &str) -> ProductId {
    if let Ok(n) = raw.parse::<u64>() {
        return ProductId::Integer(n);
    }
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .unwrap_or_else(|_| ProductId::from(raw))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting blendrec v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let engine = Engine::new(config)?;

    let catalog = JsonCatalogStore::new(&args.catalog);
    let snapshot = engine
        .refit(&catalog)
        .with_context(|| format!("fitting on {}", args.catalog.display()))?;
    info!("Catalog fitted: {} items", snapshot.len());

    let top_k = engine.config().top_k;
    let seed = args.seed;
    let result = match args.command {
        Command::Item { id, k } => {
            engine.recommend_for_item_seeded(&parse_id(&id), k.unwrap_or(top_k), seed)?
        }
        Command::User { id, k } => {
            let path = args
                .history
                .as_ref()
                .context("--history is required for user recommendations")?;
            let history = JsonHistoryStore::open(path)?;
            engine.recommend_for_user_seeded(&history, &id, k.unwrap_or(top_k), seed)?
        }
        Command::Profile { query, k } => {
            engine.recommend_for_profile_seeded(&ProfileQuery::from(query), k.unwrap_or(top_k), seed)?
        }
        Command::Consensus { query, k } => {
            engine.recommend_by_consensus(&ProfileQuery::from(query), k.unwrap_or(top_k), seed)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
