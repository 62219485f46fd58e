//! Configuration management commands.

use clap::{Args, Subcommand};

use dhagent_cli::{Context, mask_api_key};

use super::{get_config, print_success};
use crate::Cli;

/// Manage CLI configuration.
///
/// Contexts allow you to manage multiple DashScope accounts and workspaces,
/// similar to kubectl's context management.
///
/// Configuration is stored in ~/.dhagent/dashscope/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Add a new context
    #[command(name = "add-context")]
    AddContext {
        /// Context name
        name: String,
        /// API key (sk-...)
        #[arg(long)]
        api_key: String,
        /// HTTP base URL
        #[arg(long)]
        base_url: Option<String>,
        /// Workspace id (multimodal dialog)
        #[arg(long)]
        workspace_id: Option<String>,
        /// Application id (multimodal dialog)
        #[arg(long)]
        app_id: Option<String>,
        /// Maximum retries for transient failures
        #[arg(long)]
        max_retries: Option<u32>,
        /// Default chat model
        #[arg(long)]
        default_model: Option<String>,
        /// Default TTS voice
        #[arg(long)]
        default_voice: Option<String>,
    },
    /// Delete a context
    #[command(name = "delete-context")]
    DeleteContext { name: String },
    /// Set the current context
    #[command(name = "use-context")]
    UseContext { name: String },
    /// Display the current context
    #[command(name = "get-context")]
    GetContext,
    /// List all contexts
    #[command(name = "list-contexts", alias = "get-contexts")]
    ListContexts,
    /// View the current configuration
    View,
}

impl ConfigCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::AddContext {
                name,
                api_key,
                base_url,
                workspace_id,
                app_id,
                max_retries,
                default_model,
                default_voice,
            } => {
                let mut cfg = get_config(cli)?;
                let ctx = Context {
                    api_key: api_key.clone(),
                    base_url: base_url.clone().unwrap_or_default(),
                    workspace_id: workspace_id.clone().unwrap_or_default(),
                    app_id: app_id.clone().unwrap_or_default(),
                    max_retries: max_retries.unwrap_or(0),
                    default_model: default_model.clone().unwrap_or_default(),
                    default_voice: default_voice.clone().unwrap_or_default(),
                    ..Default::default()
                };
                cfg.add_context(name, ctx)?;
                print_success(&format!("Context \"{}\" added successfully", name));
                Ok(())
            }

            ConfigSubcommand::DeleteContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.delete_context(name)?;
                print_success(&format!("Context \"{}\" deleted", name));
                Ok(())
            }

            ConfigSubcommand::UseContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.use_context(name)?;
                print_success(&format!("Switched to context \"{}\"", name));
                Ok(())
            }

            ConfigSubcommand::GetContext => {
                let cfg = get_config(cli)?;
                if cfg.current_context.is_empty() {
                    println!("No current context set");
                } else {
                    println!("{}", cfg.current_context);
                }
                Ok(())
            }

            ConfigSubcommand::ListContexts => {
                let cfg = get_config(cli)?;
                if cfg.contexts.is_empty() {
                    println!("No contexts configured");
                    return Ok(());
                }

                println!("{:<8} {:<20} {:<24} {}", "CURRENT", "NAME", "WORKSPACE", "DEFAULT_MODEL");
                for name in cfg.list_contexts() {
                    let Some(ctx) = cfg.get_context(name) else {
                        continue;
                    };
                    let current = if name == cfg.current_context { "*" } else { "" };
                    let workspace = if ctx.workspace_id.is_empty() {
                        "-"
                    } else {
                        &ctx.workspace_id
                    };
                    println!("{:<8} {:<20} {:<24} {}", current, name, workspace, ctx.default_model);
                }
                Ok(())
            }

            ConfigSubcommand::View => {
                let cfg = get_config(cli)?;
                println!("Config file: {}", cfg.path().display());
                println!("Current context: {}", cfg.current_context);
                println!("Contexts: {}", cfg.contexts.len());

                for name in cfg.list_contexts() {
                    let Some(ctx) = cfg.get_context(name) else {
                        continue;
                    };
                    println!("\n  {}:", name);
                    println!("    API Key: {}", mask_api_key(&ctx.api_key));
                    let optional = [
                        ("Base URL", &ctx.base_url),
                        ("Workspace", &ctx.workspace_id),
                        ("App", &ctx.app_id),
                        ("Default Model", &ctx.default_model),
                        ("Default Voice", &ctx.default_voice),
                    ];
                    for (label, value) in optional {
                        if !value.is_empty() {
                            println!("    {}: {}", label, value);
                        }
                    }
                    if ctx.max_retries > 0 {
                        println!("    Max Retries: {}", ctx.max_retries);
                    }
                }
                Ok(())
            }
        }
    }
}
