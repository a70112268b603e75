//! Config command - configuration inspection.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::json;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are checked and which were loaded
    Which,

    /// Show the user configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let manager = loaded.config.to_manager_config().resolved();
    let key_source = if loaded.config.has_plaintext_api_key() {
        "config file"
    } else if manager.api_key.is_some() {
        hippo_config::API_KEY_ENV
    } else {
        "none (local embeddings)"
    };

    if ctx.json_output {
        return ctx.print_json(&json!({
            "dimensions": manager.dimensions,
            "store_path": manager.store_path,
            "data_dir": ctx.data_dir.display().to_string(),
            "agent_id": manager.agent_id,
            "auto_recall": manager.auto_recall,
            "auto_capture": manager.auto_capture,
            "recall_limit": manager.recall_limit,
            "recall_min_score": manager.recall_min_score,
            "capture_max_chars": manager.capture_max_chars,
            "duplicate_threshold": manager.duplicate_threshold,
            "chunk_tokens": manager.chunk_tokens,
            "chunk_overlap_tokens": manager.chunk_overlap_tokens,
            "api_key": key_source,
        }));
    }

    let dim = Style::new().dim();
    println!("{}", style("Hippo Configuration").bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!();
    if loaded.loaded_from().is_empty() {
        println!("{}", dim.apply_to("No config files loaded (using defaults)"));
        println!();
    }
    println!("[memory]");
    println!("  store_path:          {}", style(&manager.store_path).cyan());
    println!("  data_dir:            {}", ctx.data_dir.display());
    println!("  agent_id:            {}", style(&manager.agent_id).cyan());
    println!("  auto_recall:         {}", manager.auto_recall);
    println!("  auto_capture:        {}", manager.auto_capture);
    println!("  recall_limit:        {}", manager.recall_limit);
    println!("  recall_min_score:    {}", manager.recall_min_score);
    println!("  capture_max_chars:   {}", manager.capture_max_chars);
    println!("  duplicate_threshold: {}", manager.duplicate_threshold);
    println!();
    println!("[embedding]");
    println!("  dimensions:          {}", style(manager.dimensions).cyan());
    println!("  api_key:             {}", key_source);
    println!();
    println!("[chunking]");
    println!("  tokens:              {}", manager.chunk_tokens);
    println!("  overlap_tokens:      {}", manager.chunk_overlap_tokens);
    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;

    if ctx.json_output {
        let sources: Vec<_> = loaded
            .sources
            .iter()
            .map(|s| json!({ "path": s.path.display().to_string(), "loaded": s.loaded }))
            .collect();
        return ctx.print_json(&json!({ "sources": sources, "warnings": loaded.warnings }));
    }

    let dim = Style::new().dim();
    println!("{}", style("Config sources (lowest precedence first)").bold());
    for source in &loaded.sources {
        let marker = if source.loaded {
            Style::new().green().apply_to("loaded")
        } else {
            dim.apply_to("absent")
        };
        println!("  {} {}", source.path.display(), marker);
    }
    for warning in &loaded.warnings {
        println!("  {} {}", Style::new().yellow().apply_to("warning:"), warning);
    }
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let path = hippo_config::user_config_path();
    if ctx.json_output {
        return ctx.print_json(&json!({
            "path": path.as_ref().map(|p| p.display().to_string())
        }));
    }
    match path {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", Style::new().dim().apply_to("(no config directory)")),
    }
    Ok(())
}
