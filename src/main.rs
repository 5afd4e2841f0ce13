//! # LLM Fallback Gateway
//!
//! Sends one prompt through the configured providers, falling back in order
//! until one answers.
//!
//! ## Usage
//!
//! ```bash
//! # Ask with the built-in provider order (keys from the environment or .env)
//! llm-fallback-gateway "Explain TCP slow start in two sentences"
//!
//! # Stream from a specific provider first
//! llm-fallback-gateway --provider groq --stream "Write a haiku about Rust"
//!
//! # Use a config file and list providers
//! llm-fallback-gateway --config gateway.yaml providers
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use gateway_config::{load_config_with, GatewayConfig, LogFormat};
use gateway_core::{ChatMessage, GenerateOptions, ResponseFormat, StreamEvent, DEFAULT_TEMPERATURE};
use gateway_routing::{Gateway, GatewayOutput};
use gateway_telemetry::{init_logging, LoggingConfig};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// Multi-provider LLM gateway with ordered fallback
#[derive(Parser, Debug)]
#[command(name = "llm-fallback-gateway")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Configuration file (YAML or TOML)
    #[arg(short, long, env = "GATEWAY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    prompt: PromptArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured providers, their pricing and availability
    Providers,
}

#[derive(clap::Args, Debug)]
struct PromptArgs {
    /// Provider to try first
    #[arg(short, long)]
    provider: Option<String>,

    /// Stream the response as it is generated
    #[arg(short, long)]
    stream: bool,

    /// Skip the response cache
    #[arg(long)]
    no_cache: bool,

    /// Ask for a single JSON object
    #[arg(long)]
    json_object: bool,

    /// System prompt
    #[arg(long)]
    system: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(short, long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Maximum tokens to generate
    #[arg(short, long)]
    max_tokens: Option<u32>,

    /// Prompt text
    prompt: Option<String>,
}

impl PromptArgs {
    fn messages(&self, prompt: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(ChatMessage::system(system.as_str()));
        }
        messages.push(ChatMessage::user(prompt));
        messages
    }

    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            provider: self.provider.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: self.stream,
            response_format: self.json_object.then_some(ResponseFormat::JsonObject),
            use_cache: !self.no_cache,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = load(&cli)?;

    init_logging(
        &LoggingConfig::new()
            .with_level(config.logging.level.clone())
            .with_json(config.logging.format == LogFormat::Json),
    )?;
    debug!(providers = config.providers.len(), "Configuration loaded");

    let gateway = Gateway::from_config(&config).await?;

    match cli.command {
        Some(Commands::Providers) => list_providers(&gateway, cli.json),
        None => {
            let Some(prompt) = cli.prompt.prompt.as_deref() else {
                bail!("no prompt given; pass PROMPT or use the `providers` subcommand");
            };
            ask(&gateway, &cli.prompt, prompt, cli.json).await
        }
    }
}

fn load(cli: &Cli) -> Result<GatewayConfig> {
    let config_path = cli.config.as_ref().map(|p| p.display().to_string());
    let lookup = |name: &str| {
        if name == "GATEWAY_CONFIG" {
            config_path.clone()
        } else {
            std::env::var(name).ok()
        }
    };
    load_config_with(&lookup).context("failed to load gateway configuration")
}

fn list_providers(gateway: &Gateway, json: bool) -> Result<()> {
    let providers = gateway.available_providers();

    if json {
        let report = serde_json::json!({
            "providers": providers,
            "fallback_order": gateway.fallback_order(),
            "cheapest": gateway.cheapest_provider().map(|p| p.name),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{:<20} {:<40} {:>10} {:>10}  {}",
        "PROVIDER", "MODEL", "IN/1K", "OUT/1K", "STATUS"
    );
    for provider in &providers {
        let status = if provider.is_available {
            "available"
        } else {
            "unavailable"
        };
        println!(
            "{:<20} {:<40} {:>10.5} {:>10.5}  {}",
            provider.name, provider.model, provider.pricing.input_per_1k, provider.pricing.output_per_1k, status
        );
    }
    println!("\nFallback order: {}", gateway.fallback_order().join(" -> "));
    if let Some(cheapest) = gateway.cheapest_provider() {
        println!("Cheapest available: {}", cheapest.name);
    }
    Ok(())
}

async fn ask(gateway: &Gateway, args: &PromptArgs, prompt: &str, json: bool) -> Result<()> {
    let output = gateway
        .generate_response(args.messages(prompt), args.options())
        .await?;

    match output {
        GatewayOutput::Complete(response) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.content);
            }
            info!(
                provider = %response.provider,
                model = %response.model,
                tokens = response.usage.total_tokens,
                cost = response.cost,
                cached = response.cached,
                "Response complete"
            );
        }
        GatewayOutput::Stream(mut events) => {
            let mut stdout = std::io::stdout();
            while let Some(event) = events.next().await {
                if json {
                    println!("{}", serde_json::to_string(&event)?);
                    continue;
                }
                match event {
                    StreamEvent::Chunk { content, .. } => {
                        write!(stdout, "{content}")?;
                        stdout.flush()?;
                    }
                    StreamEvent::Finalized(summary) => {
                        writeln!(stdout)?;
                        info!(
                            provider = %summary.provider,
                            model = %summary.model,
                            tokens = summary.usage.total_tokens,
                            estimated = summary.usage.estimated,
                            cost = summary.cost,
                            "Stream complete"
                        );
                    }
                    StreamEvent::Error { error, provider } => {
                        writeln!(stdout)?;
                        bail!("stream from {provider} failed: {error}");
                    }
                }
            }
        }
    }

    Ok(())
}
