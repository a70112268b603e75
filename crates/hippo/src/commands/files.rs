//! Files command - workspace memory file indexing and search.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::json;

use super::{Context, print_error, truncate};

/// Arguments for the files command.
#[derive(Args, Debug)]
pub struct FilesArgs {
    #[command(subcommand)]
    pub command: FilesCommand,
}

#[derive(Subcommand, Debug)]
pub enum FilesCommand {
    /// Re-index MEMORY.md and memory/*.md
    Index,

    /// Search indexed memory files
    Search {
        /// Search query
        query: String,

        /// Maximum snippets to return
        #[arg(short, long, default_value = "6")]
        max_results: usize,
    },

    /// Read MEMORY.md or a file under memory/
    Get {
        /// Workspace-relative path
        path: String,

        /// First line to read (1-indexed)
        #[arg(long)]
        from: Option<usize>,

        /// Number of lines to read
        #[arg(long)]
        lines: Option<usize>,
    },
}

/// Run the files command.
pub async fn run(args: FilesArgs, ctx: &Context) -> Result<()> {
    match args.command {
        FilesCommand::Index => cmd_index(ctx).await,
        FilesCommand::Search { query, max_results } => cmd_search(&query, max_results, ctx).await,
        FilesCommand::Get { path, from, lines } => cmd_get(&path, from, lines, ctx).await,
    }
}

async fn cmd_index(ctx: &Context) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let report = manager.index_files().await?;

    if ctx.json_output {
        return ctx.print_json(&json!({
            "indexed": report.indexed,
            "files": report.files,
            "errors": report.errors,
        }));
    }

    println!("{}", style("Index Complete").bold().green());
    println!("  Files:     {}", report.files);
    println!("  Chunks:    {}", style(report.indexed).green());
    for error in &report.errors {
        print_error(error);
    }
    Ok(())
}

async fn cmd_search(query: &str, max_results: usize, ctx: &Context) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let hits = manager.search_files(query, max_results).await?;
    let dim = Style::new().dim();

    let results: Vec<_> = hits
        .iter()
        .map(|hit| {
            let meta = hit.metadata.clone().unwrap_or_default();
            let path = meta.path.unwrap_or_default();
            let start = meta.start_line.unwrap_or(1);
            let end = meta.end_line.unwrap_or(start);
            (format!("{}#L{}-L{}", path, start, end), hit)
        })
        .collect();

    if ctx.json_output {
        let items: Vec<_> = results
            .iter()
            .map(|(citation, hit)| {
                json!({ "citation": citation, "score": hit.score, "snippet": hit.text })
            })
            .collect();
        return ctx.print_json(&json!({ "results": items }));
    }

    if results.is_empty() {
        println!("{}", dim.apply_to("No results found"));
        return Ok(());
    }
    for (citation, hit) in &results {
        println!(
            "{} {}",
            style(citation).cyan(),
            dim.apply_to(format!("(score: {:.3})", hit.score))
        );
        println!("   {}", truncate(&hit.text, 70));
        println!();
    }
    Ok(())
}

async fn cmd_get(path: &str, from: Option<usize>, lines: Option<usize>, ctx: &Context) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let text = manager.read_memory_file(path, from, lines).await?;

    if ctx.json_output {
        ctx.print_json(&json!({ "path": path, "text": text }))
    } else {
        println!("{}", text);
        Ok(())
    }
}
