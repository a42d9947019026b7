//! Built-in tools for the agent

mod create;
mod insert;
mod replace;
mod shell;
mod view;

pub use create::CreateFileTool;
pub use insert::InsertLinesTool;
pub use replace::ReplaceTextTool;
pub use shell::ShellTool;
pub use view::ViewTool;

use kestrel_agent::BoxedTool;
use std::path::PathBuf;
use std::sync::Arc;

/// Every built-in tool, in the order they are advertised to the model
pub fn builtin_tools() -> Vec<BoxedTool> {
    vec![
        Arc::new(ShellTool::new()),
        Arc::new(CreateFileTool::new()),
        Arc::new(ViewTool::new()),
        Arc::new(ReplaceTextTool::new()),
        Arc::new(InsertLinesTool::new()),
    ]
}

/// Expand a leading `~/` to the home directory
pub(crate) fn resolve_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Split file content into lines, remembering whether it ended with a newline
fn split_lines(content: &str) -> (Vec<&str>, bool) {
    (content.lines().collect(), content.ends_with('\n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tool_names() {
        let names: Vec<String> = builtin_tools().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(
            names,
            vec!["shell_execute", "create_file", "view", "replace_text", "insert_lines"]
        );
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("src/main.rs"), PathBuf::from("src/main.rs"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(resolve_path("~/notes.txt"), home.join("notes.txt"));
            assert_eq!(resolve_path("~"), home);
        }
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\nb\n"), (vec!["a", "b"], true));
        assert_eq!(split_lines("a\nb"), (vec!["a", "b"], false));
        assert_eq!(split_lines(""), (vec![], false));
    }
}
