use anyhow::{bail, Context, Result};
use articles_searcher::config::{
    default_config_path, find_config_file, load_config, write_default_config, Config,
};
use articles_searcher::models::Query;
use articles_searcher::service::{self, ServiceFacade};
use articles_searcher::sources::{ArticleSource, SourceRegistry};
use articles_searcher::utils::HttpClient;
use clap::{Parser, Subcommand};
use http::StatusCode;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Articles Searcher - one contract over several bibliographic-metadata providers
#[derive(Parser, Debug)]
#[command(name = "articles-searcher")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find articles across CrossRef, Scopus, eLibrary RISC and Web of Science", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the provider routes over HTTP
    Serve {
        /// Address to bind (default: server.bind from the configuration)
        #[arg(long, short)]
        bind: Option<String>,
    },

    /// Find one article by identifier
    Article {
        /// Provider id (crossref, scopus, risc, wos)
        provider: String,

        /// Provider identifier of the article (DOI, item id)
        id: String,
    },

    /// Find articles matching field=value pairs
    Articles {
        /// Provider id (crossref, scopus, risc, wos)
        provider: String,

        /// Query fields, e.g. title="clean code" year=2008
        fields: Vec<String>,
    },

    /// Run one facade route, e.g. /scopus/full/affiliations/10.1000/182
    Route {
        /// Path with optional query string
        path: String,
    },

    /// Write the default configuration file
    InitConfig {
        /// Target path (default: the per-user configuration file)
        path: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("articles_searcher={}", level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_config(path: Option<&PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => Some(path.clone()),
        None => find_config_file(),
    };
    if let Some(path) = &path {
        tracing::info!("Using config file: {}", path.display());
    }
    load_config(path.as_deref()).context("failed to load configuration")
}

fn build_registry(config: &Config) -> Result<Arc<SourceRegistry>> {
    let transport = Arc::new(HttpClient::from_config(&config.http)?);
    let registry = SourceRegistry::from_config(config, transport);
    if registry.is_empty() {
        tracing::warn!("No provider is configured; see `articles-searcher init-config`");
    }
    Ok(Arc::new(registry))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_config(path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path.or_else(default_config_path) else {
        bail!("no configuration directory on this platform; pass a path");
    };
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    write_default_config(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn run(command: Commands, config: Config) -> Result<()> {
    let registry = build_registry(&config)?;

    match command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or(config.server.bind);
            service::serve(ServiceFacade::new(registry), &bind)
                .await
                .with_context(|| format!("server on {} failed", bind))?;
        }
        Commands::Article { provider, id } => {
            let source = registry.get_required(&provider)?;
            print_json(&source.find_article(&id).await?)?;
        }
        Commands::Articles { provider, fields } => {
            let source = registry.get_required(&provider)?;
            let articles = source.find_articles(&Query::from_pairs(&fields)).await?;
            print_json(&serde_json::Value::Array(articles))?;
        }
        Commands::Route { path } => {
            let (path, query) = path.split_once('?').unwrap_or((path.as_str(), ""));
            let response = ServiceFacade::new(registry).dispatch(path, query).await;
            match response.status() {
                StatusCode::OK => println!("{}", response.body()),
                status => bail!("{}: {}", status, response.body()),
            }
        }
        Commands::InitConfig { path } => init_config(path)?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::InitConfig { path } => init_config(path),
        command => {
            let config = read_config(cli.config.as_ref())?;
            run(command, config).await
        }
    }
}
