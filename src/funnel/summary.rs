use leadsflow_common::StageOutcome;
use serde::Serialize;

use super::grouping::StageColumn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub id: String,
    pub label: String,
    pub count: usize,
    pub value: f64,
}

/// Funnel analytics computed from grouped columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelSummary {
    pub stages: Vec<StageSummary>,
    pub total_leads: usize,
    pub total_value: f64,
    pub won: usize,
    pub lost: usize,
    pub won_value: f64,
    /// Won leads over all leads, 0.0 for an empty funnel.
    pub conversion_rate: f64,
}

pub fn summarize(columns: &[StageColumn]) -> FunnelSummary {
    let mut summary = FunnelSummary {
        stages: Vec::with_capacity(columns.len()),
        total_leads: 0,
        total_value: 0.0,
        won: 0,
        lost: 0,
        won_value: 0.0,
        conversion_rate: 0.0,
    };

    for column in columns {
        let count = column.leads.len();
        let value: f64 = column.leads.iter().filter_map(|l| l.deal_value).sum();
        summary.total_leads += count;
        summary.total_value += value;
        match column.stage.outcome {
            StageOutcome::Won => {
                summary.won += count;
                summary.won_value += value;
            }
            StageOutcome::Lost => summary.lost += count,
            StageOutcome::Open => {}
        }
        summary.stages.push(StageSummary {
            id: column.stage.id.clone(),
            label: column.stage.label.clone(),
            count,
            value,
        });
    }

    if summary.total_leads > 0 {
        summary.conversion_rate = summary.won as f64 / summary.total_leads as f64;
    }
    summary
}
