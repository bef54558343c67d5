use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use hypercube_spider::{Loader, Spider};
use hypercube_sqlite::{run_checks, uri_cache};
use hypercube_store::SpiderConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "hypercube")]
#[command(about = "Crawl StatsWales2 in English and Welsh into a SQLite warehouse")]
#[command(version)]
struct Cli {
    /// YAML configuration file. Relative paths inside it are resolved
    /// against the file's directory. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or upgrade the database and the blob directories.
    Init(InitArgs),
    /// Fetch the feeds and load every table.
    Load(LoadArgs),
    /// Drop every loaded table, keeping the fetch cache.
    Purge,
    /// Show schema version and cache size.
    Status(OutputArgs),
    /// Run the cross-language consistency views.
    Check(OutputArgs),
    /// Re-hash every cached blob against its digest.
    VerifyCache,
}

#[derive(Debug, Args)]
struct InitArgs {
    /// Also write the effective configuration to this file.
    #[arg(long)]
    write_config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct LoadArgs {
    /// Run only the named loader(s), in the order given.
    #[arg(long)]
    only: Vec<String>,
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => run_init(config, args),
        Command::Load(args) => run_load(config, args),
        Command::Purge => run_purge(config),
        Command::Status(args) => run_status(config, args),
        Command::Check(args) => run_check(config, args),
        Command::VerifyCache => run_verify_cache(config),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<SpiderConfig, String> {
    let Some(path) = path else {
        return Ok(SpiderConfig::default());
    };
    let config = SpiderConfig::load(path)
        .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?;
    let root = path.parent().unwrap_or(Path::new("."));
    Ok(config.rooted_at(root))
}

fn open(config: SpiderConfig) -> Result<Spider, String> {
    let database = config.database.display().to_string();
    Spider::initialise(config).map_err(|e| format!("Failed to open database '{database}': {e}"))
}

fn run_init(config: SpiderConfig, args: InitArgs) -> Result<(), String> {
    if let Some(path) = &args.write_config {
        config
            .save(path)
            .map_err(|e| format!("Failed to write config '{}': {e}", path.display()))?;
        println!("Wrote configuration to '{}'.", path.display());
    }
    let spider = open(config)?;
    let status = spider.schema_status().map_err(|e| e.to_string())?;
    println!(
        "Initialised '{}' at schema version {}.",
        spider.config().database.display(),
        status.version
    );
    spider.close().map_err(|e| e.to_string())
}

fn run_load(config: SpiderConfig, args: LoadArgs) -> Result<(), String> {
    let loaders = args
        .only
        .iter()
        .map(|name| name.parse::<Loader>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            let known: Vec<&str> = Loader::ALL.iter().map(|l| l.name()).collect();
            format!("{e} (known loaders: {})", known.join(", "))
        })?;

    let spider = open(config)?;
    if loaders.is_empty() {
        spider.load_all().map_err(|e| format!("Load failed: {e}"))?;
    } else {
        for loader in loaders {
            loader
                .run(&spider)
                .map_err(|e| format!("Loader {loader} failed: {e}"))?;
        }
    }
    let cached = spider.cache_entries().map_err(|e| e.to_string())?;
    println!("Load complete. {cached} cached responses.");
    spider.close().map_err(|e| e.to_string())
}

fn run_purge(config: SpiderConfig) -> Result<(), String> {
    let spider = open(config)?;
    spider
        .purge_database()
        .map_err(|e| format!("Purge failed: {e}"))?;
    println!(
        "Purged '{}'. The fetch cache was kept.",
        spider.config().database.display()
    );
    spider.close().map_err(|e| e.to_string())
}

fn run_status(config: SpiderConfig, args: OutputArgs) -> Result<(), String> {
    let spider = open(config)?;
    let status = spider.schema_status().map_err(|e| e.to_string())?;
    let cached = spider.cache_entries().map_err(|e| e.to_string())?;

    if args.json {
        let value = serde_json::json!({
            "database": spider.config().database,
            "schema_version": status.version,
            "known_steps": status.known_steps,
            "current": status.is_current(),
            "cache_entries": cached,
        });
        println!("{}", serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?);
    } else {
        println!("Database: {}", spider.config().database.display());
        println!("  Schema version: {}/{}", status.version, status.known_steps);
        println!("  Current: {}", if status.is_current() { "yes" } else { "no" });
        println!("  Cached responses: {cached}");
    }
    Ok(())
}

fn run_check(config: SpiderConfig, args: OutputArgs) -> Result<(), String> {
    let spider = open(config)?;
    let results = run_checks(spider.connection()).map_err(|e| e.to_string())?;
    let failed = results.iter().filter(|r| !r.passed()).count();

    if args.json {
        let value: Vec<_> = results
            .iter()
            .map(|r| serde_json::json!({"view": r.view, "rows": r.rows, "passed": r.passed()}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?);
    } else {
        for r in &results {
            let verdict = match (r.is_check(), r.passed()) {
                (false, _) => "report",
                (true, true) => "ok",
                (true, false) => "FAIL",
            };
            println!("{:<48} {:>8}  {verdict}", r.view, r.rows);
        }
    }

    if failed > 0 {
        return Err(format!("{failed} consistency check(s) failed"));
    }
    Ok(())
}

fn run_verify_cache(config: SpiderConfig) -> Result<(), String> {
    let spider = open(config)?;
    let digests = uri_cache::digests(spider.connection()).map_err(|e| e.to_string())?;

    let mut bad = 0usize;
    for digest in &digests {
        if let Err(err) = spider.blobs().verify(digest) {
            eprintln!("  {digest}: {err}");
            bad += 1;
        }
    }
    println!("Verified {} blob(s), {bad} bad.", digests.len());

    if bad > 0 {
        return Err(format!("{bad} cached blob(s) failed verification"));
    }
    Ok(())
}
