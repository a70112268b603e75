//! Tool command - list and invoke the agent memory tools.

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::Value;

use hippo_agent::ToolContext;

use super::{Context, print_error};

/// Arguments for the tool command.
#[derive(Args, Debug)]
pub struct ToolArgs {
    #[command(subcommand)]
    pub command: ToolCommand,
}

#[derive(Subcommand, Debug)]
pub enum ToolCommand {
    /// List tools with their parameter schemas
    List,

    /// Invoke a tool with JSON parameters
    Call {
        /// Tool name (e.g. memory_recall)
        name: String,

        /// Parameters as a JSON object
        #[arg(default_value = "{}")]
        params: String,
    },
}

/// Run the tool command.
pub async fn run(args: ToolArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ToolCommand::List => cmd_list(ctx).await,
        ToolCommand::Call { name, params } => cmd_call(&name, &params, ctx).await,
    }
}

async fn cmd_list(ctx: &Context) -> Result<()> {
    // Definitions do not touch the store.
    let manager = std::sync::Arc::new(ctx.manager());
    let definitions = manager.tools().definitions();

    if ctx.json_output {
        return ctx.print_json(&serde_json::to_value(&definitions)?);
    }

    let dim = Style::new().dim();
    println!("{}", style("Memory Tools").bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    for def in &definitions {
        println!("  {}", style(&def.name).cyan());
        println!("    {}", dim.apply_to(&def.description));
    }
    Ok(())
}

async fn cmd_call(name: &str, params: &str, ctx: &Context) -> Result<()> {
    let params: Value =
        serde_json::from_str(params).map_err(|e| anyhow!("parameters must be JSON: {}", e))?;
    if !params.is_object() {
        return Err(anyhow!("parameters must be a JSON object"));
    }

    let manager = ctx.open_manager().await?;
    let result = manager
        .tools()
        .execute(name, params, &ToolContext::new())
        .await?;

    if ctx.json_output {
        return ctx.print_json(&result.to_value());
    }
    match result.to_value() {
        Value::Object(map) if result.is_error() => {
            print_error(map.get("error").and_then(Value::as_str).unwrap_or_default());
        }
        value => match value.get("text").and_then(Value::as_str) {
            Some(text) => println!("{}", text),
            None => println!("{}", serde_json::to_string_pretty(&value)?),
        },
    }
    Ok(())
}
