use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

use crate::app::{PairLabel, Reporter};
use crate::errors::TranslateError;
use crate::locks::OutputState;
use crate::ui::icons::{CHECK, CROSS, DRY_RUN, FILE_DEL, FILE_NEW, SPARKLE, WARN};

/// Terminal output for the l10n commands.
///
/// Per-pair work is tracked with a single `indicatif` bar; result lines are printed
/// above it so they survive once the bar is cleared.
pub struct TerminalReporter {
    bar: Mutex<Option<ProgressBar>>,
    verbose: bool,
}

impl TerminalReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            verbose,
        }
    }

    /// Print a line above the active bar, or directly when none is drawn.
    fn print_line(&self, msg: impl AsRef<str>) {
        match self.current_bar().filter(|bar| !bar.is_hidden()) {
            Some(bar) => bar.println(msg.as_ref()),
            None => println!("{}", msg.as_ref()),
        }
    }

    fn current_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|guard| guard.clone())
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(bar) = self.current_bar() {
            f(&bar);
        }
    }

    fn start_bar(&self, prefix: &str, total: usize) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        // A malformed template only loses styling
        if let Ok(bar_style) = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(bar_style.progress_chars("█▓▒░"));
        }
        bar.set_prefix(prefix.to_string());
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar.clone());
        }
        bar
    }

    /// Clear the bar, if any.
    pub fn finish(&self) {
        if let Ok(mut guard) = self.bar.lock()
            && let Some(bar) = guard.take()
        {
            bar.finish_and_clear();
        }
    }
}

impl Reporter for TerminalReporter {
    fn info(&self, message: &str) {
        if let Some(label) = message.strip_prefix("dry-run ") {
            self.print_line(format!("  {} {}", DRY_RUN, style(label).dim()));
        } else {
            self.print_line(format!("{} {}", SPARKLE, message));
        }
    }

    fn activity(&self, verb: &str, step: usize, total: usize, pair: &PairLabel) {
        let bar = match self.current_bar() {
            Some(bar) => bar,
            None => self.start_bar(verb, total),
        };
        bar.set_position(step.saturating_sub(1) as u64);
        bar.set_message(format!(
            "{} {} {}",
            style(&pair.source_path).cyan(),
            style("→").dim(),
            style(&pair.lang).yellow()
        ));
        if self.verbose {
            self.print_line(format!(
                "  {} [{}/{}] {}",
                style("→").dim(),
                step,
                total,
                style(pair).dim()
            ));
        }
    }

    fn pair_written(&self, pair: &PairLabel) {
        self.with_bar(|bar| bar.inc(1));
        self.print_line(format!(
            "  {} {} {}",
            FILE_NEW,
            style(&pair.output_path).green(),
            style(format!("({})", pair.lang)).dim()
        ));
    }

    fn pair_failed(&self, pair: &PairLabel, error: &TranslateError) {
        self.with_bar(|bar| bar.inc(1));
        self.print_line(format!(
            "  {} {} {}: {}",
            CROSS,
            style(pair).red(),
            style(format!("[{}]", error.tool())).red().bold(),
            error
        ));
    }

    fn status(&self, state: OutputState, pair: &PairLabel) {
        let tag = match state {
            OutputState::UpToDate => style(format!("{:<7}", state.to_string())).green(),
            OutputState::Stale => style(format!("{:<7}", state.to_string())).yellow(),
            OutputState::Missing => style(format!("{:<7}", state.to_string())).red(),
        };
        self.print_line(format!("{} {}", tag, pair));
    }

    fn status_summary(&self, ok: usize, stale: usize, missing: usize) {
        let icon = if stale == 0 && missing == 0 { CHECK } else { WARN };
        self.print_line(format!(
            "\n{}{} ok, {} stale, {} missing",
            icon,
            style(ok).green(),
            style(stale).yellow(),
            style(missing).red()
        ));
    }

    fn clean_removed(&self, path: &str) {
        self.print_line(format!("  {} {}", FILE_DEL, style(path).red()));
    }

    fn clean_missing(&self, path: &str) {
        if self.verbose {
            self.print_line(format!("  {} {}", style("·").dim(), style(path).dim()));
        }
    }

    fn clean_summary(&self, removed: usize, missing: usize, locks_removed: usize) {
        self.print_line(format!(
            "\n{}{} removed, {} missing, {} lock files removed",
            CHECK,
            style(removed).bold(),
            missing,
            locks_removed
        ));
    }

    fn progress_start(&self, label: &str, total: usize) {
        self.start_bar(label, total);
    }

    fn progress_increment(&self, item: &str) {
        self.with_bar(|bar| {
            bar.inc(1);
            bar.set_message(item.to_string());
        });
        if self.verbose {
            self.print_line(format!("  {} {}", style("→").dim(), style(item).dim()));
        }
    }

    fn progress_done(&self) {
        self.finish();
    }
}
