use leadsflow_common::{FunnelStage, Lead};

/// One funnel column: a stage and the leads placed in it, in list order.
#[derive(Debug, Clone, PartialEq)]
pub struct StageColumn {
    pub stage: FunnelStage,
    pub leads: Vec<Lead>,
}

fn stage_index(stages: &[FunnelStage], status: &str) -> usize {
    stages
        .iter()
        .position(|s| s.matches_status(status))
        .unwrap_or(0)
}

/// The stage a status belongs to, falling back to the first stage.
/// `None` only when `stages` is empty.
pub fn stage_for_status<'a>(stages: &'a [FunnelStage], status: &str) -> Option<&'a FunnelStage> {
    stages.get(stage_index(stages, status))
}

/// Group leads into columns in stage order. Unmatched leads land in the
/// first column.
pub fn group_by_stage(stages: &[FunnelStage], leads: &[Lead]) -> Vec<StageColumn> {
    let mut columns: Vec<StageColumn> = stages
        .iter()
        .map(|stage| StageColumn {
            stage: stage.clone(),
            leads: Vec::new(),
        })
        .collect();
    if columns.is_empty() {
        return columns;
    }
    for lead in leads {
        columns[stage_index(stages, &lead.status)].leads.push(lead.clone());
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::lead;
    use leadsflow_common::default_stages;

    #[test]
    fn test_stage_for_status_matches_id_or_label() {
        let stages = default_stages();
        assert_eq!(stage_for_status(&stages, "proposta").unwrap().id, "proposta");
        assert_eq!(stage_for_status(&stages, " Em Contato ").unwrap().id, "em_contato");
    }

    #[test]
    fn test_unmatched_status_falls_back_to_first_stage() {
        let stages = default_stages();
        assert_eq!(stage_for_status(&stages, "archived").unwrap().id, "novo");
        assert_eq!(stage_for_status(&stages, "").unwrap().id, "novo");
        assert!(stage_for_status(&[], "novo").is_none());
    }

    #[test]
    fn test_group_keeps_stage_and_lead_order() {
        let stages = default_stages();
        let leads = vec![
            lead("1", "proposta"),
            lead("2", "mystery"),
            lead("3", "novo"),
            lead("4", "Proposta"),
        ];
        let columns = group_by_stage(&stages, &leads);
        assert_eq!(columns.len(), stages.len());
        let novo: Vec<&str> = columns[0].leads.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(novo, vec!["2", "3"]);
        let proposta: Vec<&str> = columns[3].leads.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(proposta, vec!["1", "4"]);
        let total: usize = columns.iter().map(|c| c.leads.len()).sum();
        assert_eq!(total, leads.len());
    }

    #[test]
    fn test_custom_stage_matched_by_label() {
        let mut stages = default_stages();
        stages.push(FunnelStage::custom("demo", "Demo agendada", "#000"));
        let columns = group_by_stage(&stages, &[lead("1", "demo agendada")]);
        assert_eq!(columns.last().unwrap().leads.len(), 1);
    }
}
