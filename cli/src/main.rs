//! CLI entrypoint for persona-relay
//!
//! Wires the store adapters and guardrails together for inspection
//! commands: listing personas, dry-running the guardrail chain, and
//! showing which config files are in effect.

use anyhow::Result;
use clap::{Parser, Subcommand};
use relay_application::{
    BreakerCheck, BudgetDecision, CascadeCheck, CascadeDecision, CascadeGuard, CircuitBreaker,
    TokenBudgetManager,
};
use relay_infrastructure::{ConfigLoader, InMemoryCascadeStore, InMemoryJobStore, InMemoryUsageStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relay", version, about = "Guarded persona-agent job runtime")]
struct Cli {
    /// Path to a config file (overrides discovered configs)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List configured personas and their limits
    Personas,
    /// Dry-run the guardrail chain for a prospective call
    Check {
        #[arg(long, default_value = "default")]
        workspace: String,
        #[arg(long)]
        persona: String,
        #[arg(long)]
        feature: String,
        /// Tokens the call would request
        #[arg(long)]
        tokens: Option<u64>,
    },
    /// Show which config files are in effect
    ConfigSources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?;
    info!("configuration loaded");

    match cli.command {
        Command::Personas => {
            let registry = config.persona_registry();
            let mut personas: Vec<_> = registry.all().collect();
            personas.sort_by(|a, b| a.name.cmp(&b.name));
            for persona in personas {
                println!(
                    "{:<12} model={} effort={} max_tokens={} rate={}/h daily={} features=[{}]",
                    persona.name,
                    persona.model,
                    persona.reasoning_effort,
                    persona.max_tokens,
                    persona.rate_limit_per_hour,
                    persona.daily_token_limit,
                    persona.features.join(", "),
                );
            }
        }
        Command::Check {
            workspace,
            persona,
            feature,
            tokens,
        } => {
            let registry = config.persona_registry();
            let persona = registry.get(&persona)?.clone();
            let requested = tokens.unwrap_or(persona.max_tokens);

            let jobs = InMemoryJobStore::new();
            let cascade = CascadeGuard::new(
                InMemoryCascadeStore::new(jobs),
                config.cascade_limits(),
            );
            let usage = InMemoryUsageStore::new();
            usage.set_workspace_config(&workspace, config.workspace_budget());
            let budget = TokenBudgetManager::new(usage);
            let breaker = Arc::new(CircuitBreaker::new(config.breaker_config()));

            println!(
                "Checking {} / {} for {} tokens in workspace {}",
                persona.name, feature, requested, workspace
            );

            let decision = cascade
                .check(CascadeCheck {
                    workspace_id: &workspace,
                    persona: &persona,
                    parent_job_id: None,
                    trigger_tags: &[],
                })
                .await?;
            match &decision {
                CascadeDecision::Allowed { depth } => {
                    println!("  cascade: allowed (depth {})", depth)
                }
                CascadeDecision::Denied { reason, .. } => {
                    println!("  cascade: DENIED ({})", reason)
                }
            }

            match budget.check(&workspace, &persona, &feature, requested).await? {
                BudgetDecision::Allowed => println!("  budget:  allowed"),
                BudgetDecision::Denied(denial) => println!("  budget:  DENIED ({})", denial),
            }

            match breaker.check() {
                BreakerCheck::Allowed => println!("  breaker: allowed ({})", breaker.state()),
                BreakerCheck::Rejected { remaining_cooldown } => println!(
                    "  breaker: DENIED (open, retry in {}s)",
                    remaining_cooldown.as_secs()
                ),
            }
        }
        Command::ConfigSources => {
            ConfigLoader::print_config_sources();
        }
    }

    Ok(())
}
