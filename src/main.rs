use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use certflow::cli::{self, Cli};
use certflow::config;
use certflow::models::approval::NewApproval;
use certflow::store::sqlite::SqliteStore;
use certflow::trigger::jenkins::JenkinsClient;
use certflow::{api, certcheck, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "certflow=debug,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let cfg = config::load()?;
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Token { command }) => {
            let cfg = config::load()?;
            let db = SqliteStore::connect(&cfg.database_url).await?;
            db.migrate().await?;
            handle_token_command(&db, command).await
        }
        // Certificate probing needs no Jenkins credentials or database.
        Some(cli::Commands::Cert { command }) => handle_cert_command(command).await,
        None => {
            let cfg = config::load()?;
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to approval store...");
    let db = SqliteStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let jenkins = JenkinsClient::new(cfg.jenkins.clone());

    let state = Arc::new(AppState {
        db,
        jenkins,
        config: cfg,
    });

    let app = api::router(state);

    // Approval links arrive by email and are terminated at a reverse proxy;
    // the server itself only listens on loopback.
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("certflow approval server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_token_command(db: &SqliteStore, cmd: cli::TokenCommands) -> anyhow::Result<()> {
    match cmd {
        cli::TokenCommands::Create { domain, owner, ttl } => {
            let token = uuid::Uuid::new_v4().simple().to_string();
            let now = chrono::Utc::now().timestamp();
            let rec = NewApproval {
                token: token.clone(),
                domain: domain.clone(),
                owner,
                created: now,
                expires_at: now + ttl,
            };
            db.insert_approval(&rec).await?;
            println!(
                "Approval token created:\n  Token:   {}\n  Domain:  {}\n  Expires: {} ({}s from now)\n  Link:    /approve?token={}",
                token, domain, rec.expires_at, ttl, token
            );
        }
        cli::TokenCommands::List => {
            let records = db.list_approvals().await?;
            if records.is_empty() {
                println!("No approval records found.");
            } else {
                println!(
                    "{:<34} {:<24} {:<16} {:<16} EXPIRES",
                    "TOKEN", "DOMAIN", "OWNER", "STATUS"
                );
                for r in records {
                    println!(
                        "{:<34} {:<24} {:<16} {:<16} {}",
                        r.token, r.domain, r.owner, r.status, r.expires_at
                    );
                }
            }
        }
        cli::TokenCommands::Show { token } => match db.get_approval(&token).await? {
            Some(r) => println!("{}", serde_json::to_string_pretty(&r)?),
            None => println!("Token not found."),
        },
    }
    Ok(())
}

async fn handle_cert_command(cmd: cli::CertCommands) -> anyhow::Result<()> {
    match cmd {
        cli::CertCommands::Check {
            host,
            port,
            warn_days,
        } => {
            let report = certcheck::probe(&host, port).await?;
            println!(
                "Certificate for {} expires on {}",
                report.host,
                report.not_after.to_rfc3339()
            );
            println!("Days left: {}", report.days_left);
            if report.days_left <= warn_days {
                // Renewal pipelines key off the exit code.
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
