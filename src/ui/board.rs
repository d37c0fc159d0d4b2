//! Plain-terminal rendering of the funnel board.
//!
//! Wide terminals get one column per stage side by side; narrow ones get the
//! stages stacked. Column widths are measured with `console::measure_text_width`
//! so emoji and accented names line up.

use console::{Alignment, measure_text_width, pad_str, style};
use leadsflow_common::{Lead, StageOutcome};

use crate::funnel::{FunnelSummary, StageColumn};
use crate::ui::icons::{ROBOT, STAR, TROPHY};

const MIN_COLUMN_WIDTH: usize = 18;
const FALLBACK_WIDTH: usize = 80;
const GUTTER: &str = " │ ";

/// Current terminal width, or 80 when not attached to a terminal.
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(FALLBACK_WIDTH)
}

fn lead_line(lead: &Lead) -> String {
    let mut line = String::new();
    if lead.favorite {
        line.push_str(&STAR.to_string());
    }
    if lead.ai_enabled {
        line.push_str(&ROBOT.to_string());
    }
    line.push_str(&lead.name);
    if let Some(value) = lead.deal_value {
        line.push_str(&format!(" ({:.0})", value));
    }
    line
}

fn header(column: &StageColumn) -> String {
    let marker = match column.stage.outcome {
        StageOutcome::Won => TROPHY.to_string(),
        _ => String::new(),
    };
    format!("{}{} ({})", marker, column.stage.label, column.leads.len())
}

fn truncate(text: &str, width: usize) -> String {
    if measure_text_width(text) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        if measure_text_width(&out) + 1 >= width {
            break;
        }
        out.push(ch);
    }
    out.push('…');
    out
}

/// Render the columns for a terminal `width` characters wide.
pub fn render_board(columns: &[StageColumn], width: usize) -> String {
    if columns.is_empty() {
        return String::new();
    }
    let per_column = width.saturating_sub(GUTTER.len() * (columns.len() - 1)) / columns.len();
    if per_column < MIN_COLUMN_WIDTH {
        return render_stacked(columns);
    }

    let rows = columns.iter().map(|c| c.leads.len()).max().unwrap_or(0);
    let mut out = Vec::with_capacity(rows + 2);

    let cell = |text: &str| {
        pad_str(&truncate(text, per_column), per_column, Alignment::Left, None).into_owned()
    };
    out.push(
        columns
            .iter()
            .map(|c| style(cell(&header(c))).bold().to_string())
            .collect::<Vec<_>>()
            .join(GUTTER),
    );
    out.push(vec!["─".repeat(per_column); columns.len()].join("─┼─"));
    for row in 0..rows {
        out.push(
            columns
                .iter()
                .map(|c| match c.leads.get(row) {
                    Some(lead) => cell(&lead_line(lead)),
                    None => cell(""),
                })
                .collect::<Vec<_>>()
                .join(GUTTER)
                .trim_end()
                .to_string(),
        );
    }
    out.join("\n")
}

fn render_stacked(columns: &[StageColumn]) -> String {
    let mut out = Vec::new();
    for column in columns {
        out.push(style(header(column)).bold().to_string());
        for lead in &column.leads {
            out.push(format!("  {}", lead_line(lead)));
        }
    }
    out.join("\n")
}

pub fn render_summary(summary: &FunnelSummary) -> String {
    let mut out = vec![format!(
        "{} lead(s), total value {:.2}",
        summary.total_leads, summary.total_value
    )];
    for stage in &summary.stages {
        out.push(format!(
            "  {:<20} {:>5} {:>12.2}",
            stage.label, stage.count, stage.value
        ));
    }
    out.push(format!(
        "Won {} ({:.2}), lost {}, conversion {:.1}%",
        summary.won,
        summary.won_value,
        summary.lost,
        summary.conversion_rate * 100.0
    ));
    out.join("\n")
}
