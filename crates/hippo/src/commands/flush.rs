//! Flush-prompt command - the instruction sent before context compaction.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use hippo_agent::FLUSH_SENTINEL;

use super::Context;

/// Arguments for the flush-prompt command.
#[derive(Args, Debug)]
pub struct FlushArgs {
    /// Date for the target file (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub date: Option<chrono::NaiveDate>,
}

/// Run the flush-prompt command.
pub async fn run(args: FlushArgs, ctx: &Context) -> Result<()> {
    let prompt = match args.date {
        Some(date) => hippo_agent::flush_prompt_for(date),
        None => ctx.manager().flush_prompt(),
    };

    if ctx.json_output {
        ctx.print_json(&json!({ "prompt": prompt, "sentinel": FLUSH_SENTINEL }))
    } else {
        println!("{}", prompt);
        Ok(())
    }
}
