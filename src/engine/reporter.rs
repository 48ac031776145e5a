//! Terminal reporter: colored step lines and a spinner while a step runs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{Error, ExecuteSummary, OperationPlan, Outcome, Reporter};
use std::io::{self, Stdout, Write};
use std::time::Duration;

use crate::ui;

/// [`Reporter`] that draws plan progress on the terminal
pub struct ConsoleReporter<W: Write = Stdout> {
    out: W,
    quiet: bool,
    show_spinner: bool,
    spinner: Option<ProgressBar>,
    /// Marker and rendered text of the running step
    current: Option<(String, String)>,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            show_spinner: !quiet,
            ..Self::with_writer(io::stdout(), quiet)
        }
    }
}

impl<W: Write> ConsoleReporter<W> {
    /// Reporter writing to `out`, without a spinner
    pub fn with_writer(out: W, quiet: bool) -> Self {
        Self {
            out,
            quiet,
            show_spinner: false,
            spinner: None,
            current: None,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    fn start_spinner(&mut self, message: String) {
        if !self.show_spinner {
            return;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(pb);
    }

    fn stop_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    /// Print the finished step: status symbol on the top line, context dimmed below.
    fn print_step(&mut self, symbol: &str) {
        let Some((marker, rendered)) = self.current.take() else {
            return;
        };
        let mut lines = rendered.lines();
        let top = lines.next().unwrap_or_default();
        self.line(&format!("  {symbol} {marker} {top}"));
        for context in lines {
            self.line(&format!("  {}", context.dimmed()));
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn on_plan_start(&mut self, plan: &OperationPlan, dry_run: bool) {
        if dry_run {
            let title = format!("Plan: {} {}", plan.verb, plan.app);
            self.line("");
            self.line(&title.bold().to_string());
            self.line(&"─".repeat(title.chars().count()).dimmed().to_string());
        } else if !self.quiet {
            self.line(&format!(
                "{} {} {} ({} step(s))",
                "→".cyan(),
                plan.verb.to_string().bold(),
                plan.app,
                plan.len()
            ));
        }
    }

    fn on_preview(&mut self, rendered: &str) {
        for line in rendered.lines() {
            self.line(&format!("  {line}"));
        }
    }

    fn on_step_start(&mut self, index: usize, total: usize, rendered: &str) {
        let marker = ui::step_marker(index, total);
        let top = rendered.lines().next().unwrap_or_default();
        self.start_spinner(format!("{marker} {top}"));
        self.current = Some((marker, rendered.to_string()));
    }

    fn on_step_success(&mut self, message: &str) {
        self.stop_spinner();
        if self.quiet {
            self.current = None;
            return;
        }
        self.print_step(&"✓".green().to_string());
        if !message.is_empty() {
            self.line(&format!("      {}", message.dimmed()));
        }
    }

    fn on_step_failure(&mut self, error: &Error, skipped: usize) {
        self.stop_spinner();
        self.print_step(&"✗".red().to_string());
        for line in error.to_string().lines() {
            self.line(&format!("      {}", line.red()));
        }
        if skipped > 0 {
            let note = format!("{skipped} remaining step(s) not attempted");
            self.line(&format!("  {}", note.dimmed()));
        }
    }

    fn on_plan_complete(&mut self, summary: &ExecuteSummary) {
        match summary.outcome {
            Outcome::Previewed => {
                self.line("");
                self.line(&format!("{} Dry run - no changes made", "ℹ".blue()));
            }
            Outcome::Applied if !self.quiet => {
                self.line(&format!(
                    "{} Done, {} step(s) applied",
                    "✓".green(),
                    summary.completed
                ));
            }
            Outcome::Applied => {}
        }
    }
}
