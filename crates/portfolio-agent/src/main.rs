//! portfolio-agent
//!
//! Ask the portfolio advisor about a user's holdings from the command line,
//! or serve it over HTTP. Structured answers go to stdout as JSON; logs go
//! to stderr.

mod handlers;
mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{LlmProvider, ThreadId};
use agent_runtime::RuntimeConfig;
use portfolio_tools::{AdvisorVariant, PortfolioAdvisor, PortfolioConfig, tool_surface};

use crate::state::AppState;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Parser, Debug)]
#[command(name = "portfolio-agent", version)]
#[command(about = "Stock and crypto portfolio advisor agent", long_about = None)]
struct Cli {
    /// Advisor variant, overrides PORTFOLIO_VARIANT
    #[arg(long, global = true)]
    variant: Option<AdvisorVariant>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one turn per message on a single thread
    Ask {
        /// User the question is about
        #[arg(short, long, default_value = "jake")]
        user: String,

        /// Conversation thread; reuse it to continue a conversation
        #[arg(short, long, default_value = "1")]
        thread: String,

        #[arg(default_value = "What is my stock?")]
        messages: Vec<String>,
    },

    /// Print the tool surface and answer schema as JSON
    Tools,

    /// Serve the advisor over HTTP
    Serve {
        /// Listen address, defaults to BIND_ADDR or 0.0.0.0:3000
        #[arg(long)]
        bind: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,portfolio_tools=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Model provider plus an advisor over the live quote APIs
fn build_advisor(config: &PortfolioConfig) -> anyhow::Result<(PortfolioAdvisor, Arc<dyn LlmProvider>)> {
    let runtime = RuntimeConfig::from_env().context("invalid LLM configuration")?;
    let provider = runtime
        .provider()
        .with_context(|| format!("cannot create {} provider", runtime.kind))?;
    let advisor = PortfolioAdvisor::from_config(config, provider.clone(), runtime.generation())
        .context("cannot create portfolio advisor")?;
    Ok((advisor, provider))
}

async fn ask(config: &PortfolioConfig, user: &str, thread: ThreadId, messages: &[String]) -> anyhow::Result<()> {
    let (advisor, _) = build_advisor(config)?;

    for message in messages {
        let output = advisor
            .ask(user, &thread, message)
            .await
            .with_context(|| format!("turn failed: {message}"))?;
        info!(thread = %output.thread_id, tools = ?output.tool_calls, "turn complete");
        println!("{}", serde_json::to_string(&output.value)?);
    }

    Ok(())
}

async fn serve(config: &PortfolioConfig, bind: Option<String>) -> anyhow::Result<()> {
    let (advisor, provider) = build_advisor(config)?;

    if provider.health_check().await.unwrap_or(false) {
        info!(provider = provider.name(), "model provider reachable");
    } else {
        tracing::warn!(provider = provider.name(), "model provider not reachable; requests will fail");
    }

    let state = AppState {
        advisor: Arc::new(advisor),
        provider,
        variant: config.variant,
    };

    let addr = bind
        .or_else(|| std::env::var("BIND_ADDR").ok())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;

    info!(%addr, variant = %config.variant, "portfolio-agent listening");
    info!("  GET  /health     - Health check");
    info!("  GET  /api/tools  - Tool surface and answer schema");
    info!("  POST /api/ask    - One conversational turn");

    axum::serve(listener, handlers::router(state)).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let mut config = PortfolioConfig::from_env().context("invalid quote configuration")?;
    if let Some(variant) = cli.variant {
        config.variant = variant;
    }

    match cli.command {
        Command::Tools => {
            println!("{}", serde_json::to_string_pretty(&tool_surface(config.variant))?);
        }
        Command::Ask { user, thread, messages } => {
            ask(&config, &user, ThreadId::from_string(thread), &messages).await?;
        }
        Command::Serve { bind } => serve(&config, bind).await?,
    }

    Ok(())
}
