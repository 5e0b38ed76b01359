mod analyze;
mod reviews;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "revcmp")]
#[command(about = "Compare product review sentiment across brands")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect, label, and summarise reviews for a product
    Analyze {
        /// Product name, e.g. "headphones"
        #[arg(long)]
        product: String,

        /// Comma-separated brands; inferred via the LLM when omitted
        #[arg(long)]
        brands: Option<String>,

        /// Snippets per brand (5 to 100); defaults to REVCMP_DEFAULT_MAX_SNIPPETS
        #[arg(long)]
        max_snippets: Option<usize>,

        /// Replace snippets with full review page text where available (slower)
        #[arg(long)]
        fulltext: bool,
    },
    /// List stored reviews for a product
    Reviews {
        #[arg(long)]
        product: String,

        /// Restrict to one brand
        #[arg(long)]
        brand: Option<String>,
    },
    /// Export analysed reviews as CSV
    Export {
        #[arg(long)]
        product: String,

        /// Comma-separated brands; all brands for the product when omitted
        #[arg(long)]
        brands: Option<String>,

        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<std::path::PathBuf>,
    },
    /// Database management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Delete every cached review
    Clear,
    /// Check database connectivity
    Ping,
}

impl Commands {
    /// Whether the command reads or writes the `reviews` table.
    fn needs_schema(&self) -> bool {
        !matches!(
            self,
            Commands::Db {
                command: DbCommands::Migrate | DbCommands::Ping
            }
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = revcmp_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(command) = cli.command else {
        println!("revcmp: run `revcmp --help` for available commands");
        return Ok(());
    };

    let pool_config = revcmp_db::PoolConfig::from_app_config(&config);
    let pool = revcmp_db::connect_pool(&config.database_url, pool_config).await?;
    let db = revcmp_db::ReviewDb::new(pool);
    if command.needs_schema() {
        let applied = revcmp_db::run_migrations(db.pool()).await?;
        tracing::debug!(applied, "schema ready");
    }

    match command {
        Commands::Analyze {
            product,
            brands,
            max_snippets,
            fulltext,
        } => {
            let args = analyze::AnalyzeArgs {
                product,
                brands: brands.as_deref().map(revcmp_reviews::parse_brand_list),
                max_snippets: max_snippets.unwrap_or(config.default_max_snippets),
                fulltext,
            };
            analyze::run_analyze(&config, &db, args).await?;
        }
        Commands::Reviews { product, brand } => {
            reviews::run_list(&db, &product, brand.as_deref()).await?;
        }
        Commands::Export {
            product,
            brands,
            out,
        } => {
            let brands = brands
                .as_deref()
                .map(revcmp_reviews::parse_brand_list)
                .unwrap_or_default();
            reviews::run_export(&db, &product, &brands, out.as_deref()).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Migrate => {
                let applied = revcmp_db::run_migrations(db.pool()).await?;
                println!("migrations applied: {applied}");
            }
            DbCommands::Clear => {
                let removed = revcmp_db::clear_reviews(db.pool()).await?;
                println!("cleared {removed} cached reviews");
            }
            DbCommands::Ping => {
                revcmp_db::health_check(db.pool()).await?;
                println!("database ok");
            }
        },
    }

    Ok(())
}
