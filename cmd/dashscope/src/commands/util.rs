//! Helpers shared by the commands.

use dhagent_cli::{Config, Context, Output, OutputFormat, load_config};
use dhagent_dashscope::Client;

use crate::Cli;

const APP_NAME: &str = "dashscope";
const API_KEY_ENV: &str = "DASHSCOPE_API_KEY";

pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(APP_NAME, cli.config.as_deref())
}

/// Resolves the context to use. With no context configured at all, falls
/// back to `DASHSCOPE_API_KEY`.
pub fn get_context(cli: &Cli) -> anyhow::Result<Context> {
    let cfg = get_config(cli)?;

    if let Some(ctx) = cfg.resolve_context(cli.context.as_deref()) {
        return Ok(ctx.clone());
    }
    if let Some(name) = cli.context.as_deref() {
        anyhow::bail!("context '{}' not found", name);
    }
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.is_empty() => Ok(Context {
            name: "env".to_string(),
            api_key: key,
            ..Default::default()
        }),
        _ => anyhow::bail!(
            "no context specified. Use -c flag, set a default context with 'dhagent-dashscope config use-context', or export {}",
            API_KEY_ENV
        ),
    }
}

pub fn create_client(ctx: &Context) -> anyhow::Result<Client> {
    let mut builder = Client::builder(&ctx.api_key);
    if !ctx.base_url.is_empty() {
        builder = builder.http_base_url(&ctx.base_url);
    }
    if !ctx.workspace_id.is_empty() {
        builder = builder.workspace(&ctx.workspace_id);
    }
    if ctx.max_retries > 0 {
        builder = builder.max_retries(ctx.max_retries);
    }
    Ok(builder.build()?)
}

pub fn output(cli: &Cli) -> Output {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Yaml
    };
    Output::new(format, cli.output.clone())
}

pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}

pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Picks the CLI flag, then the context default, then `fallback`.
pub fn pick(flag: Option<&str>, context_default: &str, fallback: &str) -> String {
    match flag {
        Some(v) if !v.is_empty() => v.to_string(),
        _ if !context_default.is_empty() => context_default.to_string(),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick() {
        assert_eq!(pick(Some("a"), "b", "c"), "a");
        assert_eq!(pick(None, "b", "c"), "b");
        assert_eq!(pick(Some(""), "", "c"), "c");
    }
}
