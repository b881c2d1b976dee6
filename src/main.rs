//! No-code Playwright runner - main entry point.
//!
//! Loads an entity bundle, runs one execution through the orchestrator and
//! prints the final record, its results and project statistics as JSON.
//!
//! Usage:
//!   nocode-playwright --bundle entities.json --project <uuid> [--suite <uuid>] [--browser webkit]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use nocode_playwright_lib::config::Config;
use nocode_playwright_lib::db::{EntityBundle, MemoryDb};
use nocode_playwright_lib::error::AppResult;
use nocode_playwright_lib::models::{BrowserType, ExecutionFilter, NewExecution};
use nocode_playwright_lib::services::{ExecutionOrchestrator, TemplateRenderer, start_cleanup_task};

struct Args {
    bundle: PathBuf,
    project_id: Uuid,
    suite_id: Option<Uuid>,
    browser: Option<BrowserType>,
    environment: BTreeMap<String, String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let args = parse_args();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, NCPW_WORK_DIR must be absolute");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  No-code Playwright runner");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    if let Err(e) = run(config, args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config, args: Args) -> AppResult<()> {
    let db = MemoryDb::new();
    db.load_bundle(EntityBundle::read(&args.bundle).await?)
        .await?;

    start_cleanup_task(config.cleanup_config());

    let store = Arc::new(db.clone());
    let orchestrator = ExecutionOrchestrator::new(
        store.clone(),
        store,
        Arc::new(config.runner()),
        TemplateRenderer::default(),
        config.orchestrator_settings(),
    );

    let mut request = match args.suite_id {
        Some(suite_id) => NewExecution::for_suite(args.project_id, suite_id),
        None => NewExecution::for_project(args.project_id),
    }
    .with_browser(args.browser.unwrap_or(config.default_browser));
    request.environment = args.environment;

    let execution = orchestrator.create_execution(request).await?;
    if let Err(e) = orchestrator.submit(execution.id).await {
        error!("Execution task aborted: {}", e);
    }

    let execution = orchestrator.get_execution(execution.id).await?;
    let results = orchestrator.get_results(execution.id).await?;
    let statistics = orchestrator
        .statistics(&ExecutionFilter {
            project_id: Some(args.project_id),
            ..Default::default()
        })
        .await?;

    let report = serde_json::json!({
        "execution": execution,
        "results": results,
        "statistics": statistics,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();

    let mut bundle: Option<PathBuf> = None;
    let mut project_id: Option<Uuid> = None;
    let mut suite_id: Option<Uuid> = None;
    let mut browser: Option<BrowserType> = None;
    let mut environment = BTreeMap::new();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        if matches!(flag, "--help" | "-h") {
            print_usage();
            std::process::exit(0);
        }
        i += 1;
        let Some(value) = args.get(i) else {
            eprintln!("Error: {} needs a value", flag);
            print_usage();
            std::process::exit(1);
        };
        match flag {
            "--bundle" | "-b" => bundle = Some(PathBuf::from(value)),
            "--project" | "-p" => project_id = Some(parse_uuid(flag, value)),
            "--suite" | "-s" => suite_id = Some(parse_uuid(flag, value)),
            "--browser" => match BrowserType::parse(value) {
                Some(b) => browser = Some(b),
                None => {
                    eprintln!(
                        "Error: Invalid browser '{}'. Must be: chromium, firefox, webkit",
                        value
                    );
                    std::process::exit(1);
                }
            },
            "--env" | "-e" => match value.split_once('=') {
                Some((key, val)) => {
                    environment.insert(key.to_string(), val.to_string());
                }
                None => {
                    eprintln!("Error: --env expects KEY=VALUE, got '{}'", value);
                    std::process::exit(1);
                }
            },
            _ => {
                eprintln!("Unknown argument: {}", flag);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let (Some(bundle), Some(project_id)) = (bundle, project_id) else {
        eprintln!("Error: --bundle and --project are required");
        print_usage();
        std::process::exit(1);
    };

    Args {
        bundle,
        project_id,
        suite_id,
        browser,
        environment,
    }
}

fn parse_uuid(flag: &str, value: &str) -> Uuid {
    match Uuid::parse_str(value) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error: {} expects a UUID: {}", flag, e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!();
    eprintln!(
        "Usage: nocode-playwright --bundle <file> --project <uuid> [--suite <uuid>] [--browser <name>] [--env KEY=VALUE]..."
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --bundle, -b      JSON file with projects, pages and suites (required)");
    eprintln!("  --project, -p     Project to run (required)");
    eprintln!("  --suite, -s       Run a single suite of the project");
    eprintln!("  --browser         chromium, firefox or webkit (default: NCPW_DEFAULT_BROWSER)");
    eprintln!("  --env, -e         Extra environment variable for the runner (repeatable)");
    eprintln!("  --help, -h        Show this help");
    eprintln!();
}
