//! Markdown chunking for file indexing.
//!
//! Splits a document into overlapping, line-range tracked chunks sized by
//! an approximate token budget. Every line of a document with any content
//! is covered by at least one chunk.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::FileChunk;

/// Approximate characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Default chunk size in tokens.
pub const DEFAULT_CHUNK_TOKENS: usize = 400;

/// Default overlap between consecutive chunks in tokens.
pub const DEFAULT_OVERLAP_TOKENS: usize = 80;

static HEADER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^#{1,4}\s").ok());

fn is_header(line: &str) -> bool {
    HEADER.as_ref().is_some_and(|re| re.is_match(line))
}

/// A line in the working window. `None` marks a prepended header that
/// belongs to an earlier section.
type WindowLine<'a> = (Option<usize>, &'a str);

fn window_text(window: &[WindowLine<'_>]) -> String {
    window
        .iter()
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn line_cost(line: &str) -> usize {
    line.chars().count() + 1
}

/// Split `text` into chunks of roughly `token_budget` tokens.
///
/// Consecutive chunks share up to `overlap_tokens` tokens of trailing
/// lines, and the most recent header is repeated at the top of a chunk
/// when it is not already inside the overlap.
pub fn chunk_markdown(
    text: &str,
    path: &str,
    token_budget: usize,
    overlap_tokens: usize,
) -> Vec<FileChunk> {
    let max_chars = token_budget.max(1) * CHARS_PER_TOKEN;
    let overlap_chars = (overlap_tokens * CHARS_PER_TOKEN).min(max_chars - 1);

    let lines: Vec<&str> = text.split('\n').collect();
    let total_lines = lines.len();

    let mut chunks: Vec<FileChunk> = Vec::new();
    let mut window: Vec<WindowLine<'_>> = Vec::new();
    let mut window_chars = 0usize;
    // Header and overlap that opened the current window.
    let mut carried: Vec<WindowLine<'_>> = Vec::new();
    let mut carried_chars = 0usize;
    let mut start_line = 1usize;
    let mut last_emitted_end = 0usize;
    let mut last_header: Option<(usize, &str)> = None;

    for (idx, line) in lines.iter().copied().enumerate() {
        let line_no = idx + 1;
        if is_header(line) {
            last_header = Some((line_no, line));
        }
        window.push((Some(line_no), line));
        window_chars += line_cost(line);

        if window_chars < max_chars {
            continue;
        }

        let body = window_text(&window);
        if body.is_empty() {
            // Whitespace only: keep start_line so the next chunk covers it.
            window.clone_from(&carried);
            window_chars = carried_chars;
            continue;
        }

        chunks.push(FileChunk {
            path: path.to_string(),
            start_line,
            end_line: line_no,
            text: body,
        });
        last_emitted_end = line_no;

        let mut overlap: Vec<WindowLine<'_>> = Vec::new();
        let mut overlap_used = 0usize;
        for &(number, content) in window.iter().rev() {
            if number.is_none() {
                break;
            }
            let cost = line_cost(content);
            if overlap_used + cost > overlap_chars {
                break;
            }
            overlap_used += cost;
            overlap.push((number, content));
        }
        overlap.reverse();
        start_line = last_emitted_end + 1 - overlap.len();

        carried.clear();
        carried_chars = overlap_used;
        if let Some((header_no, header)) = last_header
            && !overlap.iter().any(|(n, _)| *n == Some(header_no))
        {
            carried.push((None, header));
            carried_chars += line_cost(header);
        }
        carried.extend(overlap);
        window.clone_from(&carried);
        window_chars = carried_chars;
    }

    if last_emitted_end < total_lines {
        let has_new_content = window.iter().any(|(number, line)| {
            number.is_some_and(|n| n > last_emitted_end) && !line.trim().is_empty()
        });
        if has_new_content {
            chunks.push(FileChunk {
                path: path.to_string(),
                start_line,
                end_line: total_lines,
                text: window_text(&window),
            });
        } else if let Some(last) = chunks.last_mut() {
            last.end_line = total_lines;
        }
    }

    chunks
}
