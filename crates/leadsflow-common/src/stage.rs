use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Whether a stage ends the sales cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    #[default]
    Open,
    Won,
    Lost,
}

impl StageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

impl FromStr for StageOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            _ => Err(format!("Invalid outcome: {} (expected open, won or lost)", s)),
        }
    }
}

/// One column of the sales funnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub id: String,
    pub label: String,
    pub color: String,
    /// Shipped with the product rather than created by the user.
    #[serde(default)]
    pub builtin: bool,
    #[serde(default)]
    pub outcome: StageOutcome,
}

impl FunnelStage {
    pub fn custom(id: impl Into<String>, label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            color: color.into(),
            builtin: false,
            outcome: StageOutcome::Open,
        }
    }

    /// Status written to a lead dropped onto this stage. Builtin stages
    /// store their id; custom stages store the label the user typed.
    pub fn effective_status(&self) -> &str {
        if self.builtin { &self.id } else { &self.label }
    }

    /// Whether a lead status places the lead in this stage.
    pub fn matches_status(&self, status: &str) -> bool {
        let status = status.trim();
        !status.is_empty()
            && (status.eq_ignore_ascii_case(self.id.trim())
                || status.eq_ignore_ascii_case(self.label.trim()))
    }
}

fn builtin(id: &str, label: &str, color: &str, outcome: StageOutcome) -> FunnelStage {
    FunnelStage {
        id: id.to_string(),
        label: label.to_string(),
        color: color.to_string(),
        builtin: true,
        outcome,
    }
}

/// Stage set used when nothing has been configured on this device.
pub fn default_stages() -> Vec<FunnelStage> {
    vec![
        builtin("novo", "Novo", "#3b82f6", StageOutcome::Open),
        builtin("em_contato", "Em contato", "#8b5cf6", StageOutcome::Open),
        builtin("qualificado", "Qualificado", "#f59e0b", StageOutcome::Open),
        builtin("proposta", "Proposta", "#06b6d4", StageOutcome::Open),
        builtin("convertido", "Convertido", "#22c55e", StageOutcome::Won),
        builtin("perdido", "Perdido", "#ef4444", StageOutcome::Lost),
    ]
}

/// Lowercase ASCII slug used for stage ids: runs of anything that is not
/// alphanumeric collapse to a single `_`.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_sep = false;
    for ch in label.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("stage");
    }
    slug
}
