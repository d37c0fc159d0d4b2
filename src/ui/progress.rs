use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::bulk_delete::BulkDeleteReport;
use crate::ui::icons::{CHECK, CROSS, OFFLINE, TRASH};

/// Progress bar for a bulk deletion.
///
/// Driven by the `(done, total)` callback of `Workspace::delete_leads`; the
/// first call after the first delete sizes the bar.
pub struct DeleteProgress {
    bar: ProgressBar,
}

impl DeleteProgress {
    pub fn new(total: u64) -> Self {
        let style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.red/white}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let bar = ProgressBar::new(total);
        bar.set_style(style);
        bar.set_prefix(format!("{}Deleting", TRASH));
        Self { bar }
    }

    /// A bar that renders nothing, for non-interactive output.
    pub fn hidden() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden());
        Self { bar }
    }

    pub fn update(&self, done: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(done as u64);
    }

    /// Close the bar with a one-line verdict.
    pub fn finish(&self, report: &BulkDeleteReport) {
        let msg = if report.aborted {
            format!(
                "{}{}",
                OFFLINE,
                style("backend unreachable, stopped").yellow()
            )
        } else if report.errors > 0 {
            format!("{}{} failed", CROSS, report.errors)
        } else {
            format!("{}done", CHECK)
        };
        self.bar.finish_with_message(msg);
    }
}

/// Summary lines printed after the bar.
pub fn report_lines(report: &BulkDeleteReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Deleted {} of {} lead(s){}",
        report.deleted_count(),
        report.requested,
        if report.already_absent > 0 {
            format!(" ({} were already gone)", report.already_absent)
        } else {
            String::new()
        }
    )];
    if report.errors > 0 {
        lines.push(format!("{} deletion(s) failed:", report.errors));
        for failure in &report.failures {
            lines.push(format!("  - {}: {}", failure.id, failure.error));
        }
    }
    if report.aborted {
        lines.push(format!(
            "Stopped early: the backend is unreachable; {} lead(s) were not attempted",
            report.skipped()
        ));
    }
    lines
}
