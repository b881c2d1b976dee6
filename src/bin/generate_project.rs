//! CLI tool to generate a Playwright project from an entity bundle.
//!
//! Usage:
//!   cargo run --bin generate-project -- --bundle entities.json --suite <uuid> --out /abs/dir

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use nocode_playwright_lib::db::{EntityBundle, EntitySource, MemoryDb};
use nocode_playwright_lib::services::{ProjectScaffolder, TemplateRenderer};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let args: Vec<String> = env::args().collect();

    let mut bundle: Option<PathBuf> = None;
    let mut out: Option<PathBuf> = None;
    let mut project_id: Option<Uuid> = None;
    let mut suite_ids: Vec<Uuid> = Vec::new();
    let mut overrides: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bundle" | "-b" => {
                i += 1;
                if i < args.len() {
                    bundle = Some(PathBuf::from(&args[i]));
                }
            }
            "--out" | "-o" => {
                i += 1;
                if i < args.len() {
                    out = Some(PathBuf::from(&args[i]));
                }
            }
            "--project" | "-p" => {
                i += 1;
                if i < args.len() {
                    project_id = Some(parse_uuid("--project", &args[i]));
                }
            }
            "--suite" | "-s" => {
                i += 1;
                if i < args.len() {
                    suite_ids.push(parse_uuid("--suite", &args[i]));
                }
            }
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    overrides = Some(args[i].clone());
                }
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let (bundle, out) = match (bundle, out) {
        (Some(b), Some(o)) => (b, o),
        _ => {
            eprintln!("Error: --bundle and --out are required");
            print_usage();
            std::process::exit(1);
        }
    };

    let overrides: Map<String, JsonValue> = match overrides.as_deref().map(serde_json::from_str) {
        None => Map::new(),
        Some(Ok(map)) => map,
        Some(Err(e)) => {
            eprintln!("Error: --config must be a JSON object: {}", e);
            std::process::exit(1);
        }
    };

    let db = MemoryDb::new();
    let entities = match EntityBundle::read(&bundle).await {
        Ok(entities) => entities,
        Err(e) => {
            eprintln!("Error loading bundle: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = db.load_bundle(entities).await {
        eprintln!("Error loading bundle: {}", e);
        std::process::exit(1);
    }

    if let Some(project_id) = project_id {
        match db.get_project(project_id).await {
            Ok(Some(project)) => suite_ids.extend(project.suite_ids),
            Ok(None) => {
                eprintln!("Error: Project {} not found", project_id);
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Error loading project: {}", e);
                std::process::exit(1);
            }
        }
    }

    let scaffolder = ProjectScaffolder::new(Arc::new(db), TemplateRenderer::default());
    let generated = match scaffolder.generate_project(&suite_ids, &out, &overrides).await {
        Ok(generated) => generated,
        Err(e) => {
            eprintln!("Error generating project: {}", e);
            std::process::exit(1);
        }
    };

    println!();
    println!("Generated project at {}", generated.root.display());
    println!();
    for path in generated.all_paths() {
        println!("  {}", path.display());
    }
    println!();
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
        "Usage: generate-project --bundle <file> --out <absolute dir> [--suite <uuid>]... [--project <uuid>] [--config <json>]"
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --bundle, -b      JSON file with projects, pages and suites (required)");
    eprintln!("  --out, -o         Absolute output directory (required)");
    eprintln!("  --suite, -s       Suite to generate (repeatable)");
    eprintln!("  --project, -p     Generate every suite of a project");
    eprintln!("  --config, -c      Runner configuration overrides as a JSON object");
    eprintln!("  --help, -h        Show this help");
    eprintln!();
}
