//! Result files
//!
//! Results are written as a UTF-8 JSON array with two-space indentation and
//! non-ASCII text kept verbatim, one object per entry with the keys
//! `index, title, author, date, aid, ip, content, push_list`. `index` is
//! always the board index, even for search results. Terminal renderings
//! (a table and a detail view) live here as well.

use crate::model::Entry;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing results
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Render entries in the result file format
pub fn render_entries(entries: &[Entry]) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(entries)?)
}

/// Write entries to `path`, creating parent directories as needed
pub fn write_entries(path: &Path, entries: &[Entry]) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, render_entries(entries)?)?;
    Ok(())
}

/// One line per entry: index, date, author, title
pub fn render_table(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return "No entries found\n".to_string();
    }

    let mut out = format!("{:>7}  {:<24}  {:<20}  {}\n", "Index", "Date", "Author", "Title");
    out.push_str(&"-".repeat(80));
    out.push('\n');

    for entry in entries {
        out.push_str(&format!(
            "{:>7}  {:<24}  {:<20}  {}\n",
            entry.index,
            entry.date,
            truncate(&entry.author, 20),
            entry.title
        ));
    }
    out.push_str(&format!("\n{} entries\n", entries.len()));
    out
}

/// Full view of one entry including its comments
pub fn render_detail(entry: &Entry) -> String {
    let mut out = String::new();
    out.push_str(&format!("Index:   {}\n", entry.index));
    out.push_str(&format!("Title:   {}\n", entry.title));
    out.push_str(&format!("Author:  {}\n", entry.author));
    out.push_str(&format!("Date:    {}\n", entry.date));
    if let Some(aid) = &entry.aid {
        out.push_str(&format!("AID:     {}\n", aid));
    }
    if let Some(ip) = &entry.ip {
        out.push_str(&format!("IP:      {}\n", ip));
    }

    out.push('\n');
    out.push_str(&entry.body);
    if !entry.body.ends_with('\n') {
        out.push('\n');
    }

    if !entry.comments.is_empty() {
        out.push_str(&format!("\nComments ({}):\n", entry.comments.len()));
        for comment in &entry.comments {
            out.push_str(&format!(
                "  {} {}: {}  {}\n",
                comment.tag, comment.author, comment.content, comment.time
            ));
        }
    }
    out
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
