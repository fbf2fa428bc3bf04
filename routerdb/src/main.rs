use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use router_sqlite::{current_version, router_ledger, Db, Runner};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat { Text, Json, Jsonl }

const DEFAULT_DB: &str = "router.db";

#[derive(Debug, Parser)]
#[command(name = "routerdb", version, about = "Router database schema migrations")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./routerdb.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database file (default: router.db, or `database` from config)
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<PathBuf>,
    /// Log filter, e.g. `info` or `router_sqlite=debug`. Overrides ROUTERDB_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Apply ledger steps [from, to); already-applied steps are skipped
    Migrate {
        /// First step index
        #[arg(long, default_value_t = 0)]
        from: usize,
        /// End step index, exclusive (default: whole ledger, or `migrate.target` from config)
        #[arg(long)]
        to: Option<usize>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show which ledger steps are applied
    Status {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List HTTP routes with their resolved certificate
    Routes {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write CSV to this file instead of printing
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// List stored certificates (digests only, no key material)
    Certs {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::try_new(l).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_env("ROUTERDB_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Warnings from config loading go to stderr before the real subscriber exists.
    let boot = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .finish();
    let loaded_cfg = tracing::subscriber::with_default(boot, || config::load_config(cli.config.as_deref()))
        .unwrap_or_default();
    init_logging(cli.log_level.as_deref().or(loaded_cfg.log_level.as_deref()));

    let db_path = cli
        .db
        .clone()
        .or_else(|| loaded_cfg.database.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB));
    let ledger = router_ledger()?;

    match cli.command {
        Commands::Version => {
            println!("routerdb {} (core {}, {} migrations)", env!("CARGO_PKG_VERSION"), routerdb_core::version(), ledger.len());
        }
        Commands::Migrate { from, to, format } => {
            let to = to
                .or_else(|| loaded_cfg.migrate.as_ref().and_then(|m| m.target))
                .unwrap_or(ledger.len());
            let mut db = Db::open(&db_path).with_context(|| format!("opening {}", db_path.display()))?;
            let started = Instant::now();
            let mut runner = Runner::new(&ledger);
            let report = runner
                .apply(&mut db.conn, from, to)
                .with_context(|| format!("migrating {} (steps {}..{})", db_path.display(), from, to))?;
            let duration_ms = started.elapsed().as_millis();
            let version = current_version(&db.conn)?;
            match format {
                OutputFormat::Text => {
                    if report.applied.is_empty() {
                        println!("{}: nothing to apply (version {})", db_path.display(), version);
                    } else {
                        let list = report.applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
                        println!("{}: applied [{}], now at version {} ({} ms)", db_path.display(), list, version, duration_ms);
                    }
                }
                OutputFormat::Json | OutputFormat::Jsonl => {
                    let obj = serde_json::json!({
                        "database": db_path,
                        "run_id": runner.run_id().to_string(),
                        "applied": report.applied,
                        "already_committed": report.already_committed,
                        "version": version,
                        "duration_ms": duration_ms,
                    });
                    println!("{}", serde_json::to_string(&obj)?);
                }
            }
        }
        Commands::Status { format } => {
            let db = Db::open(&db_path).with_context(|| format!("opening {}", db_path.display()))?;
            let status = Runner::new(&ledger).status(&db.conn)?;
            let version = current_version(&db.conn)?;
            match format {
                OutputFormat::Text => {
                    println!("{}: version {} of {}", db_path.display(), version, ledger.len());
                    for s in &status {
                        let state = serde_json::to_value(s.state)?;
                        println!(
                            "  {:>3} {:<18} {:<12} {}",
                            s.version,
                            s.name,
                            state.as_str().unwrap_or_default(),
                            s.applied_at.as_deref().unwrap_or("-"),
                        );
                    }
                }
                OutputFormat::Json => {
                    let obj = serde_json::json!({ "database": db_path, "version": version, "steps": status });
                    println!("{}", serde_json::to_string(&obj)?);
                }
                OutputFormat::Jsonl => {
                    for s in &status { println!("{}", serde_json::to_string(s)?); }
                }
            }
        }
        Commands::Routes { format, csv } => {
            let db = Db::open(&db_path).with_context(|| format!("opening {}", db_path.display()))?;
            let routes = db.list_route_views()?;
            if let Some(path) = csv {
                let mut wtr = csv::Writer::from_writer(std::fs::File::create(&path)?);
                wtr.write_record(["id","parent_ref","service","domain","path","sticky","certificate_id","cert_sha256"])?;
                for r in &routes {
                    wtr.write_record([
                        r.route.id.to_string(),
                        r.route.parent_ref.clone(),
                        r.route.service.clone(),
                        r.route.domain.clone(),
                        r.route.path.clone(),
                        r.route.sticky.to_string(),
                        r.certificate.as_ref().map(|c| c.id.to_string()).unwrap_or_default(),
                        r.certificate.as_ref().map(|c| c.cert_sha256.to_string()).unwrap_or_default(),
                    ])?;
                }
                wtr.flush()?;
                return Ok(());
            }
            match format {
                OutputFormat::Text => {
                    for r in &routes {
                        let cert = r.certificate.as_ref().map(|c| c.cert_sha256.to_string()).unwrap_or_else(|| "none".into());
                        println!("{} {}{} -> {} (cert {})", r.route.id, r.route.domain, r.route.path, r.route.service, cert);
                    }
                }
                OutputFormat::Json | OutputFormat::Jsonl => {
                    for r in &routes {
                        let obj = serde_json::json!({
                            "id": r.route.id,
                            "parent_ref": r.route.parent_ref,
                            "service": r.route.service,
                            "domain": r.route.domain,
                            "path": r.route.path,
                            "sticky": r.route.sticky,
                            "certificate_id": r.certificate.as_ref().map(|c| c.id),
                            "cert_sha256": r.certificate.as_ref().map(|c| c.cert_sha256.as_str()),
                        });
                        println!("{}", serde_json::to_string(&obj)?);
                    }
                }
            }
        }
        Commands::Certs { format } => {
            let db = Db::open(&db_path).with_context(|| format!("opening {}", db_path.display()))?;
            let certs = db.list_certificates()?;
            match format {
                OutputFormat::Text => {
                    println!("certificates ({}):", certs.len());
                    for c in &certs { println!("{} {} routes={}", c.id, c.cert_sha256, c.route_count); }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string(&certs)?),
                OutputFormat::Jsonl => {
                    for c in &certs { println!("{}", serde_json::to_string(c)?); }
                }
            }
        }
    }
    Ok(())
}
