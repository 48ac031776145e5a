use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a hint to stderr, next to an error
pub fn hint(msg: &str) {
    eprintln!("{} {}", "hint:".cyan().bold(), msg);
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Step counter, e.g. `[2/5]`
pub fn step_marker(num: usize, total: usize) -> String {
    format!("[{num}/{total}]").blue().bold().to_string()
}

/// Colorize a status label by how healthy it is
pub fn status_label(label: reconcile::StatusLabel) -> String {
    use reconcile::StatusLabel;

    let text = label.as_str();
    match label {
        StatusLabel::InstalledAndLinked => text.green().to_string(),
        StatusLabel::NotPresent => text.dimmed().to_string(),
        StatusLabel::Inconsistent => text.yellow().to_string(),
        StatusLabel::NotConfigured => text.red().to_string(),
    }
}

/// Yes/no marker for a probed fact
pub fn flag(present: bool) -> String {
    if present {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::StatusLabel;

    #[test]
    fn test_status_label_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(
            status_label(StatusLabel::InstalledAndLinked),
            "installed & linked"
        );
        assert_eq!(status_label(StatusLabel::NotPresent), "not present");
        assert_eq!(step_marker(2, 5), "[2/5]");
        assert_eq!(flag(true), "yes");
        colored::control::unset_override();
    }
}
