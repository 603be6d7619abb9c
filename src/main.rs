use clap::{Parser, Subcommand};
use simple_folio::config::{self, AppConfig, Credentials};
use simple_folio::db::open_db;
use simple_folio::export::DocumentExporter;
use simple_folio::record::parse_legacy_posts;
use simple_folio::server::{self, AppState};
use simple_folio::store::{RecordStore, SqliteRecordStore};
use simple_folio::{check, logging, output, workflow};
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "simple-folio")]
#[command(about = "Publish competency-evaluation records with image and video evidence")]
#[command(long_about = "\
Publish competency-evaluation records with image and video evidence

One operator logs in to the web UI, fills the evaluation form and attaches
evidence files. Everyone else sees the public page.

Working directory layout (all paths configurable):

  config.toml        # Optional, see 'simple-folio gen-config'
  .env               # FOLIO_USERNAME / FOLIO_PASSWORD (optional file)
  folio.db           # SQLite record store (source of truth)
  uploads/           # Evidence files, images scaled to the configured bound
  posts/             # One markdown document per record (derived)

Run 'simple-folio gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web UI
    Serve,
    /// Print every published record
    List,
    /// Report missing evidence, orphan uploads and stale exports
    Check,
    /// Import legacy post documents (JSON array or one document per line)
    ImportPosts {
        /// Exported post documents
        file: PathBuf,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            let config = prepare(&cli.config_dir)?;
            let credentials = Credentials::from_env()?;
            let state = AppState::open(&config, credentials)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(&config, state))?;
        }
        Command::List => {
            let config = prepare(&cli.config_dir)?;
            let store = open_store(&config.paths.database)?;
            output::print_records(&store.list_all()?);
        }
        Command::Check => {
            let config = prepare(&cli.config_dir)?;
            let store = open_store(&config.paths.database)?;
            let exporter = DocumentExporter::new(&config.paths.posts, config.export.naming);
            let report = check::check(&store.list_all()?, &config.paths.uploads, &exporter)?;
            output::print_check(&report);
            if !report.is_clean() {
                std::process::exit(1);
            }
        }
        Command::ImportPosts { file } => {
            let config = prepare(&cli.config_dir)?;
            let posts = parse_legacy_posts(&std::fs::read_to_string(&file)?)?;
            let mut store = open_store(&config.paths.database)?;
            let exporter = DocumentExporter::new(&config.paths.posts, config.export.naming);
            let summary = workflow::import_legacy(&mut store, &exporter, posts)?;
            output::print_import(&summary);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `.env`, start logging and resolve the effective configuration.
fn prepare(config_dir: &Path) -> Result<AppConfig, config::ConfigError> {
    // Logging is configured after .env, which may set RUST_LOG.
    let env_file = config::optional_env_file(dotenvy::dotenv());
    logging::init();
    match env_file {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "loaded .env"),
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "ignoring malformed .env file"),
    }
    load_config(config_dir)
}

fn load_config(dir: &Path) -> Result<AppConfig, config::ConfigError> {
    let mut config = config::load_config(dir)?;
    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

fn open_store(database: &Path) -> Result<SqliteRecordStore, simple_folio::db::DbError> {
    Ok(SqliteRecordStore::new(open_db(database)?))
}
