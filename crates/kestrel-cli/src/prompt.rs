//! System prompt assembly

use std::path::Path;

/// Build the system prompt from the registered tools, the working directory
/// and any project context
pub fn build_system_prompt(tool_names: &[&str], working_dir: &Path, context: Option<&str>) -> String {
    let has = |name: &str| tool_names.iter().any(|t| *t == name);

    let mut prompt = String::from("You are kestrel, an AI-powered coding assistant.\n\n");

    if !tool_names.is_empty() {
        prompt.push_str("Tools:\n");
        for name in tool_names {
            let summary = match *name {
                "shell_execute" => "Execute shell commands",
                "create_file" => "Create a new file",
                "view" => "View a file with line numbers or list a directory",
                "replace_text" => "Replace one exact occurrence of text in a file",
                "insert_lines" => "Insert lines after a given line number",
                _ => continue,
            };
            prompt.push_str(&format!("- {}: {}\n", name, summary));
        }
        prompt.push('\n');
    }

    prompt.push_str("Guidelines:\n");
    prompt.push_str("- Be concise and helpful\n");

    if has("view") && (has("replace_text") || has("insert_lines")) {
        prompt.push_str("- Always view files before editing them\n");
    }
    if has("replace_text") {
        prompt.push_str("- Include enough surrounding text in old_text to match exactly once\n");
    }
    if has("create_file") {
        prompt.push_str("- Use create_file only for files that do not exist yet\n");
    }
    if has("shell_execute") {
        prompt.push_str("- Warn before destructive commands\n");
    }

    prompt.push_str(&format!("\nWorking directory: {}", working_dir.display()));

    match context {
        Some(context) => format!("{}\n\n---\n\n# Project Context\n\n{}", prompt, context),
        None => prompt,
    }
}
