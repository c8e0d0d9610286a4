//! Change previews shown at the confirmation gate.

use colored::Colorize;
use similar::TextDiff;

/// Lines of a new file shown before the remainder is summarized.
pub const NEW_FILE_PREVIEW_LINES: usize = 50;

/// Unified line diff of `before` → `after` with three lines of context.
///
/// Returns an empty string when the contents are equal.
pub fn unified_diff(before: &str, after: &str, path: &str) -> String {
    if before == after {
        return String::new();
    }
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

/// Preview of a file that does not exist yet.
pub fn new_file_preview(content: &str, path: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut output = format!("New file: {path}\n");
    for line in lines.iter().take(NEW_FILE_PREVIEW_LINES) {
        output.push_str("+ ");
        output.push_str(line);
        output.push('\n');
    }
    if lines.len() > NEW_FILE_PREVIEW_LINES {
        output.push_str(&format!(
            "... ({} more lines)\n",
            lines.len() - NEW_FILE_PREVIEW_LINES
        ));
    }
    output.push_str(&format!("Total: {} lines\n", lines.len()));
    output
}

/// Terminal colors for a diff: headers bold blue, hunks cyan, removals red,
/// additions green.
pub fn colorize_diff(diff: &str) -> String {
    diff.lines()
        .map(|line| {
            if line.starts_with("---") || line.starts_with("+++") {
                line.blue().bold().to_string()
            } else if line.starts_with("@@") {
                line.cyan().to_string()
            } else if line.starts_with('-') {
                line.red().to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
