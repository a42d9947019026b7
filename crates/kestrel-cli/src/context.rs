//! Hierarchical context file loading
//!
//! Loads context files (AGENTS.md or CLAUDE.md) from:
//! 1. Global: ~/.config/kestrel/AGENTS.md (or CLAUDE.md)
//! 2. Every directory from the filesystem root down to the working directory
//!
//! Later files take higher priority. Content is concatenated and included in
//! the system prompt.

use std::path::{Path, PathBuf};

/// Names of context files to look for (in order of preference)
const CONTEXT_FILE_NAMES: &[&str] = &["AGENTS.md", "CLAUDE.md"];

/// Load all context files for `working_dir` and return their combined content
pub fn load_context(working_dir: &Path) -> Option<String> {
    let global_dir = dirs::config_dir().map(|d| d.join("kestrel"));
    load_context_with_global(global_dir.as_deref(), working_dir)
}

fn load_context_with_global(global_dir: Option<&Path>, working_dir: &Path) -> Option<String> {
    let mut context_parts = Vec::new();

    if let Some(global) = global_dir.and_then(load_context_from_dir) {
        context_parts.push(global);
    }

    for dir in ancestors_root_first(working_dir) {
        if let Some(content) = load_context_from_dir(&dir) {
            context_parts.push(content);
        }
    }

    if context_parts.is_empty() {
        None
    } else {
        Some(context_parts.join("\n\n---\n\n"))
    }
}

/// Directories from the filesystem root down to `dir` inclusive
fn ancestors_root_first(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = dir.ancestors().map(Path::to_path_buf).collect();
    dirs.reverse();
    dirs
}

/// Load context file from a specific directory
fn load_context_from_dir(dir: &Path) -> Option<String> {
    for name in CONTEXT_FILE_NAMES {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }
        if let Ok(content) = std::fs::read_to_string(&path) {
            let content = content.trim();
            if !content.is_empty() {
                return Some(content.to_string());
            }
        }
    }
    None
}
