

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use company_purge::core::events::{Event, EventHandler, INVALIDATE_COUNTS};
use company_purge::{
    CancellationFlag, Caller, EventBus, EventBusNotifier, InMemoryStorage, PurgeConfig, PurgeManager,
    SchemaRegistry, StaticAuthorizer,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

struct Args {
    entity: Option<String>,
    caller: Option<String>,
    roles: Vec<String>,
    schema: Option<PathBuf>,
    data: Option<PathBuf>,
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    dry_run: bool,
    concurrency: Option<usize>,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        entity: None,
        caller: None,
        roles: Vec::new(),
        schema: None,
        data: None,
        config: None,
        out: None,
        dry_run: false,
        concurrency: None,
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).cloned();
        match args[i].as_str() {
            "--entity" | "-e" => {
                parsed.entity = value;
                i += 1;
            }
            "--caller" | "-u" => {
                parsed.caller = value;
                i += 1;
            }
            "--roles" | "-r" => {
                parsed.roles = value
                    .map(|v| v.split(',').map(|r| r.trim().to_string()).filter(|r| !r.is_empty()).collect())
                    .unwrap_or_default();
                i += 1;
            }
            "--schema" | "-s" => {
                parsed.schema = value.map(PathBuf::from);
                i += 1;
            }
            "--data" | "-d" => {
                parsed.data = value.map(PathBuf::from);
                i += 1;
            }
            "--config" | "-c" => {
                parsed.config = value.map(PathBuf::from);
                i += 1;
            }
            "--out" | "-o" => {
                parsed.out = value.map(PathBuf::from);
                i += 1;
            }
            "--concurrency" => {
                parsed.concurrency = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--dry-run" => parsed.dry_run = true,
            "--help" | "-h" => return None,
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("company_purge=info".parse()?))
        .init();

    let Some(args) = parse_args() else {
        print_help();
        return Ok(());
    };

    let mut config = PurgeConfig::load(args.config.as_deref())?;
    if args.dry_run {
        config = config.with_dry_run(true);
    }
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }

    let entity = args
        .entity
        .ok_or_else(|| anyhow::anyhow!("--entity is required"))?;
    let caller = args
        .caller
        .ok_or_else(|| anyhow::anyhow!("--caller is required"))?;
    let schema_path = args
        .schema
        .or_else(|| config.schema_path.clone())
        .ok_or_else(|| anyhow::anyhow!("--schema (or schema_path in config) is required"))?;
    let data_path = args
        .data
        .or_else(|| config.data_path.clone())
        .ok_or_else(|| anyhow::anyhow!("--data (or data_path in config) is required"))?;

    let registry = Arc::new(SchemaRegistry::from_file(&schema_path)?);
    let storage = Arc::new(InMemoryStorage::from_file(&data_path)?);

    let authorizer = args
        .roles
        .iter()
        .fold(StaticAuthorizer::new(), |auth, role| auth.grant(&caller, role));

    let bus = Arc::new(EventBus::new());
    let on_invalidate: EventHandler = Arc::new(|event: &Event| {
        info!("Notification counts invalidated: {}", event.payload);
    });
    bus.subscribe(INVALIDATE_COUNTS, on_invalidate);

    let cancellation = CancellationFlag::new();
    let manager = PurgeManager::new(
        config,
        registry,
        storage.clone(),
        Arc::new(authorizer),
        Arc::new(EventBusNotifier::new(bus)),
    )
    .with_cancellation(cancellation.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupt received, finishing in-flight record types");
            cancellation.cancel();
        }
    });

    let report = manager
        .purge_entity_transactions(&Caller::new(caller), &entity)
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(out) = args.out {
        std::fs::write(&out, serde_json::to_string_pretty(&storage.snapshot())?)?;
        info!("Wrote remaining dataset to {}", out.display());
    }

    if !report.is_clean() {
        std::process::exit(2);
    }
    Ok(())
}

fn print_help() {
    println!("company-purge - delete every transaction of one company");
    println!();
    println!("USAGE:");
    println!("    company-purge --entity <NAME> --caller <USER> --schema <FILE> --data <FILE> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -e, --entity <NAME>       Company whose transactions are purged");
    println!("    -u, --caller <USER>       Identity performing the purge (must own the company)");
    println!("    -r, --roles <LIST>        Comma-separated roles held by the caller");
    println!("    -s, --schema <FILE>       Record type metadata (JSON)");
    println!("    -d, --data <FILE>         Dataset to purge (JSON)");
    println!("    -c, --config <FILE>       Config file, layered under PURGE_* environment");
    println!("    -o, --out <FILE>          Write the remaining dataset here");
    println!("        --dry-run             Count what would be deleted, change nothing");
    println!("        --concurrency <N>     Record types cascaded in parallel");
    println!("    -h, --help                Show this help");
}
