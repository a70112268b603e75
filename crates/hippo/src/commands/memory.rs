//! Memory command - recall, capture and explicit memory operations.

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::json;

use hippo_agent::{ForgetOutcome, StoreOutcome};
use hippo_memory::Category;

use super::{Context, print_error, truncate};

/// Arguments for the memory command.
#[derive(Args, Debug)]
pub struct MemoryArgs {
    #[command(subcommand)]
    pub command: MemoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum MemoryCommand {
    /// Print the relevant-memories block a prompt would receive
    Recall {
        /// The user prompt
        prompt: String,
    },

    /// Store text if it looks memorable and is not a duplicate
    Capture {
        /// Text from the conversation
        text: String,
    },

    /// Store a memory explicitly
    Store {
        /// The information to remember
        text: String,

        /// preference, fact, decision, entity or other
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Delete a memory by key or by query
    Forget {
        /// Description of the memory to forget
        #[arg(short, long)]
        query: Option<String>,

        /// Exact key of the memory
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Semantic search through memories
    Search {
        /// Search query
        query: String,

        /// Maximum results to return
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Show the number of stored entries
    Count,

    /// Remove every stored entry
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Run the memory command.
pub async fn run(args: MemoryArgs, ctx: &Context) -> Result<()> {
    match args.command {
        MemoryCommand::Recall { prompt } => cmd_recall(&prompt, ctx).await,
        MemoryCommand::Capture { text } => cmd_capture(&text, ctx).await,
        MemoryCommand::Store { text, category } => cmd_store(&text, category, ctx).await,
        MemoryCommand::Forget { query, key } => cmd_forget(query, key, ctx).await,
        MemoryCommand::Search { query, limit } => cmd_search(&query, limit, ctx).await,
        MemoryCommand::Count => cmd_count(ctx).await,
        MemoryCommand::Clear { yes } => cmd_clear(yes, ctx).await,
    }
}

async fn cmd_recall(prompt: &str, ctx: &Context) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let context = manager.recall(prompt).await;

    if ctx.json_output {
        return ctx.print_json(&json!({ "context": context }));
    }
    match context {
        Some(block) => println!("{}", block),
        None => println!("{}", Style::new().dim().apply_to("No relevant memories")),
    }
    Ok(())
}

async fn cmd_capture(text: &str, ctx: &Context) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let stored = manager.capture(text).await;

    if ctx.json_output {
        return ctx.print_json(&json!({ "stored": stored }));
    }
    if stored {
        println!("{}", Style::new().green().apply_to("Captured"));
    } else {
        println!("{}", Style::new().dim().apply_to("Not captured"));
    }
    Ok(())
}

async fn cmd_store(text: &str, category: Option<String>, ctx: &Context) -> Result<()> {
    let category = category
        .map(|raw| raw.parse::<Category>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let manager = ctx.open_manager().await?;

    match manager.store_memory(text, category).await? {
        StoreOutcome::Stored { key, category } => {
            if ctx.json_output {
                ctx.print_json(&json!({
                    "action": "created",
                    "key": key,
                    "category": category.as_str(),
                }))?;
            } else {
                println!(
                    "{} {} {}",
                    Style::new().green().apply_to("Stored"),
                    style(&key).cyan(),
                    Style::new().dim().apply_to(format!("[{}]", category))
                );
            }
        }
        StoreOutcome::Duplicate { existing } => {
            if ctx.json_output {
                ctx.print_json(&json!({
                    "action": "duplicate",
                    "key": existing.key,
                    "text": existing.text,
                }))?;
            } else {
                println!(
                    "{} {}",
                    Style::new().yellow().apply_to("Similar memory exists:"),
                    truncate(&existing.text, 70)
                );
            }
        }
    }
    Ok(())
}

async fn cmd_forget(query: Option<String>, key: Option<String>, ctx: &Context) -> Result<()> {
    if query.is_none() && key.is_none() {
        return Err(anyhow!("provide --query or --key"));
    }
    let manager = ctx.open_manager().await?;
    let outcome = manager.forget(query.as_deref(), key.as_deref()).await?;
    let dim = Style::new().dim();

    match outcome {
        ForgetOutcome::Deleted { key, text } => {
            if ctx.json_output {
                ctx.print_json(&json!({ "action": "deleted", "key": key, "text": text }))?;
            } else {
                println!("{} {}", Style::new().green().apply_to("Forgot"), style(&key).cyan());
            }
        }
        ForgetOutcome::KeyNotFound { key } => {
            if ctx.json_output {
                ctx.print_json(&json!({ "action": "not_found", "key": key }))?;
            } else {
                print_error(format!("no memory with key {}", key));
            }
        }
        ForgetOutcome::Candidates(candidates) => {
            if ctx.json_output {
                let items: Vec<_> = candidates
                    .iter()
                    .map(|c| json!({ "key": c.key, "text": c.text, "score": c.score }))
                    .collect();
                ctx.print_json(&json!({ "action": "candidates", "candidates": items }))?;
            } else {
                println!("{}", style("Several memories match; forget one by key:").bold());
                for c in &candidates {
                    println!(
                        "  {} {} {}",
                        style(&c.key).cyan(),
                        truncate(&c.text, 60),
                        dim.apply_to(format!("({:.0}%)", c.score * 100.0))
                    );
                }
            }
        }
        ForgetOutcome::NoMatch => {
            if ctx.json_output {
                ctx.print_json(&json!({ "action": "none" }))?;
            } else {
                println!("{}", dim.apply_to("No matching memory"));
            }
        }
    }
    Ok(())
}

async fn cmd_search(query: &str, limit: usize, ctx: &Context) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let dim = Style::new().dim();

    if ctx.verbose {
        println!(
            "{}",
            dim.apply_to(format!("Searching: \"{}\" (limit: {})", query, limit))
        );
        println!();
    }

    let results = manager.search_memories(query, limit).await?;
    if ctx.json_output {
        let items: Vec<_> = results
            .iter()
            .map(|r| {
                json!({
                    "key": r.key,
                    "text": r.text,
                    "category": r.category().as_str(),
                    "score": r.score,
                })
            })
            .collect();
        return ctx.print_json(&json!({ "results": items }));
    }

    if results.is_empty() {
        println!("{}", dim.apply_to("No results found"));
        return Ok(());
    }
    println!("{}", style("Memory Search Results").bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!();
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{}] {}",
            style(i + 1).cyan(),
            result.category(),
            truncate(&result.text, 70)
        );
        println!("   {}", dim.apply_to(format!("(score: {:.3})", result.score)));
        println!();
    }
    Ok(())
}

async fn cmd_count(ctx: &Context) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let count = manager.count().await;

    if ctx.json_output {
        ctx.print_json(&json!({ "count": count }))
    } else {
        println!("  Memories:    {}", style(count).cyan());
        Ok(())
    }
}

async fn cmd_clear(yes: bool, ctx: &Context) -> Result<()> {
    if !yes {
        eprint!("Remove every stored memory? [y/N] ");
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{}", Style::new().dim().apply_to("Aborted."));
            return Ok(());
        }
    }

    let manager = ctx.open_manager().await?;
    let cleared = manager.clear().await;
    if ctx.json_output {
        return ctx.print_json(&json!({ "cleared": cleared }));
    }
    if cleared {
        println!("{}", Style::new().green().apply_to("Cleared"));
    } else {
        print_error("the store could not be cleared");
    }
    Ok(())
}
