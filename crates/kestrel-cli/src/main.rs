//! kestrel - interactive coding agent CLI

mod config;
mod context;
mod prompt;
mod terminal;
mod tools;
mod utils;

use anyhow::Context as _;
use clap::Parser;
use kestrel_agent::{Agent, AgentConfig, Interrupt, ProviderTransport};
use kestrel_ai::models::{DEFAULT_MODEL_ID, custom_model, get_model};
use kestrel_ai::providers::anthropic::AnthropicProvider;
use kestrel_ai::providers::get_api_key;
use kestrel_ai::{Model, StreamOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::terminal::{Renderer, StdinReader};

/// kestrel - AI-powered coding agent
#[derive(Parser, Debug)]
#[command(name = "kestrel")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: claude-sonnet-4-5-20250929)
    #[arg(short, long)]
    model: Option<String>,

    /// Do not print the cost line after each turn
    #[arg(long)]
    no_cost: bool,

    /// Working directory
    #[arg(short, long)]
    working_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kestrel=debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    if args.init_config {
        let path = Config::init().context("Error creating config")?;
        println!("Config file at: {}", path.display());
        println!("\nExample config:\n{}", config::example_config());
        return Ok(());
    }

    let cfg = Config::load();

    if let Some(ref dir) = args.working_dir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Cannot change to {}", dir.display()))?;
    }
    let working_dir = std::env::current_dir()?;

    let api_key = get_api_key(cfg.api_key.as_deref(), "ANTHROPIC_API_KEY").context(
        "No API key found. Set ANTHROPIC_API_KEY or add api_key to the config (kestrel --init-config)",
    )?;

    let model_id = args
        .model
        .clone()
        .or_else(|| cfg.model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
    let model = resolve_model(&cfg, &model_id);
    tracing::debug!(model = %model.id, base_url = %model.base_url, "resolved model");

    let builtin = tools::builtin_tools();
    let system_prompt = match cfg.system_prompt().context("Failed to read system_prompt_file")? {
        Some(custom) => custom,
        None => {
            let names: Vec<&str> = builtin.iter().map(|t| t.name()).collect();
            let context = context::load_context(&working_dir);
            prompt::build_system_prompt(&names, &working_dir, context.as_deref())
        }
    };

    let transport = ProviderTransport::new(Arc::new(AnthropicProvider::new(api_key)), model.clone())
        .with_options(StreamOptions {
            max_tokens: cfg.max_tokens,
            ..Default::default()
        });

    let config = AgentConfig {
        system_prompt: Some(system_prompt),
        pricing: model.cost,
        report_cost: !(args.no_cost || cfg.disable_cost_message),
    };
    let mut agent = Agent::new(config, Arc::new(transport));
    for tool in builtin {
        agent.add_tool(tool)?;
    }

    spawn_interrupt_handler(&agent);

    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("kestrel ({})", model.id);
        eprintln!();
    }

    let (renderer, prompts) = Renderer::spawn(agent.subscribe());
    let mut reader = StdinReader::new(terminal::spawn_stdin_lines(), prompts);

    let result = run(&mut agent, &mut reader).await;

    drop(reader);
    drop(agent);
    renderer.finish().await;

    result
}

/// Drive the agent until the operator exits or a fatal error occurs
async fn run(agent: &mut Agent, reader: &mut StdinReader) -> anyhow::Result<()> {
    while agent.is_running() {
        agent.step(reader).await?;
    }
    Ok(())
}

/// Look up `model_id`, applying the config's pricing and base URL overrides
fn resolve_model(cfg: &Config, model_id: &str) -> Model {
    let mut model = get_model(model_id).unwrap_or_else(|| {
        tracing::warn!("unknown model {}, pricing defaults to zero", model_id);
        custom_model(model_id)
    });
    if let Some(pricing) = cfg.pricing_for(model_id) {
        model.cost = pricing;
    }
    if let Some(ref base_url) = cfg.base_url {
        model.base_url = base_url.clone();
    }
    model
}

/// Route Ctrl-C to the agent's cancellation controller
fn spawn_interrupt_handler(agent: &Agent) {
    let controller = agent.cancellation();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match controller.interrupt() {
                Interrupt::ForceExit => {
                    eprintln!();
                    std::process::exit(130);
                }
                outcome => tracing::debug!(?outcome, "interrupt"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_ai::CostInfo;

    #[test]
    fn test_resolve_known_model() {
        let model = resolve_model(&Config::default(), DEFAULT_MODEL_ID);
        assert_eq!(model.cost.input, 3.0);
        assert_eq!(model.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn test_resolve_applies_overrides() {
        let mut cfg = Config {
            base_url: Some("http://localhost:8080".into()),
            ..Default::default()
        };
        let pricing = CostInfo {
            input: 1.0,
            output: 2.0,
            cache_write: 0.5,
            cache_read: 0.1,
        };
        cfg.pricing.insert("my-model".into(), pricing);

        let model = resolve_model(&cfg, "my-model");
        assert_eq!(model.id, "my-model");
        assert_eq!(model.cost, pricing);
        assert_eq!(model.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["kestrel", "--model", "m", "--no-cost", "-v"]);
        assert_eq!(args.model.as_deref(), Some("m"));
        assert!(args.no_cost);
        assert!(args.verbose);
        assert!(!args.init_config);
    }
}
