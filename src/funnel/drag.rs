use leadsflow_common::StageOutcome;
use serde::Serialize;

use super::grouping::stage_for_status;
use super::stages::StageBoard;
use crate::cache::LeadCache;

/// What a finished drag asks the workspace to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DropAction {
    /// A stage column was dragged onto another column.
    ReorderStages { from: usize, to: usize },
    /// A lead card was dropped on a stage with a different status.
    MoveLead {
        lead_id: String,
        from_status: String,
        to_status: String,
        /// The target stage closes the deal as won.
        won: bool,
    },
    None,
}

/// Tracks the item being dragged and the item currently under it.
///
/// Ids are either stage ids or lead ids; stage ids are checked first.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    active: Option<String>,
    over: Option<String>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag_start(&mut self, id: impl Into<String>) {
        self.active = Some(id.into());
        self.over = None;
    }

    pub fn drag_over(&mut self, id: Option<String>) {
        if self.active.is_some() {
            self.over = id;
        }
    }

    pub fn drag_cancel(&mut self) {
        self.active = None;
        self.over = None;
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn over(&self) -> Option<&str> {
        self.over.as_deref()
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Resolve the drop and clear the drag state.
    pub fn drag_end(&mut self, board: &StageBoard, cache: &LeadCache) -> DropAction {
        let (Some(active), Some(over)) = (self.active.take(), self.over.take()) else {
            return DropAction::None;
        };

        if let Some(from) = board.index_of(&active) {
            return match board.index_of(&over) {
                Some(to) if to != from => DropAction::ReorderStages { from, to },
                _ => DropAction::None,
            };
        }

        let Some(lead) = cache.get(&active) else {
            return DropAction::None;
        };

        let target = board.find(&over).or_else(|| {
            cache
                .get(&over)
                .and_then(|other| stage_for_status(board.stages(), &other.status))
        });
        let Some(target) = target else {
            return DropAction::None;
        };

        let to_status = target.effective_status();
        if lead.status == to_status {
            return DropAction::None;
        }
        DropAction::MoveLead {
            lead_id: lead.id.clone(),
            from_status: lead.status.clone(),
            to_status: to_status.to_string(),
            won: target.outcome == StageOutcome::Won,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::lead;

    fn setup() -> (StageBoard, LeadCache) {
        let board = StageBoard::default();
        let cache = LeadCache::new(vec![
            lead("a", "novo"),
            lead("b", "proposta"),
            lead("c", "unknown"),
        ]);
        (board, cache)
    }

    fn drop_on(ctrl: &mut DragController, active: &str, over: &str) -> DropAction {
        let (board, cache) = setup();
        ctrl.drag_start(active);
        ctrl.drag_over(Some(over.to_string()));
        ctrl.drag_end(&board, &cache)
    }

    #[test]
    fn test_lead_onto_stage_moves_lead() {
        let mut ctrl = DragController::new();
        assert_eq!(
            drop_on(&mut ctrl, "a", "convertido"),
            DropAction::MoveLead {
                lead_id: "a".into(),
                from_status: "novo".into(),
                to_status: "convertido".into(),
                won: true,
            }
        );
        assert!(!ctrl.is_dragging());
        assert!(ctrl.over().is_none());
    }

    #[test]
    fn test_lead_onto_lead_uses_that_leads_stage() {
        let mut ctrl = DragController::new();
        match drop_on(&mut ctrl, "a", "b") {
            DropAction::MoveLead { to_status, won, .. } => {
                assert_eq!(to_status, "proposta");
                assert!(!won);
            }
            other => panic!("Expected MoveLead, got {:?}", other),
        }
    }

    #[test]
    fn test_lead_onto_unmatched_lead_targets_first_stage() {
        let mut ctrl = DragController::new();
        match drop_on(&mut ctrl, "b", "c") {
            DropAction::MoveLead { to_status, .. } => assert_eq!(to_status, "novo"),
            other => panic!("Expected MoveLead, got {:?}", other),
        }
    }

    #[test]
    fn test_same_status_is_noop() {
        let mut ctrl = DragController::new();
        assert_eq!(drop_on(&mut ctrl, "a", "novo"), DropAction::None);
    }

    #[test]
    fn test_stage_onto_stage_reorders() {
        let mut ctrl = DragController::new();
        assert_eq!(
            drop_on(&mut ctrl, "novo", "proposta"),
            DropAction::ReorderStages { from: 0, to: 3 }
        );
        assert_eq!(drop_on(&mut ctrl, "novo", "novo"), DropAction::None);
    }

    #[test]
    fn test_custom_stage_uses_label_as_status() {
        let mut board = StageBoard::default();
        board.add("Demo agendada", "#000").unwrap();
        let cache = LeadCache::new(vec![lead("a", "novo")]);
        let mut ctrl = DragController::new();
        ctrl.drag_start("a");
        ctrl.drag_over(Some("demo_agendada".into()));
        match ctrl.drag_end(&board, &cache) {
            DropAction::MoveLead { to_status, .. } => assert_eq!(to_status, "Demo agendada"),
            other => panic!("Expected MoveLead, got {:?}", other),
        }
    }

    #[test]
    fn test_cancel_and_missing_over_resolve_to_none() {
        let (board, cache) = setup();
        let mut ctrl = DragController::new();
        ctrl.drag_start("a");
        assert_eq!(ctrl.drag_end(&board, &cache), DropAction::None);

        ctrl.drag_start("a");
        ctrl.drag_over(Some("novo".into()));
        ctrl.drag_cancel();
        assert_eq!(ctrl.drag_end(&board, &cache), DropAction::None);

        ctrl.drag_start("ghost");
        ctrl.drag_over(Some("novo".into()));
        assert_eq!(ctrl.drag_end(&board, &cache), DropAction::None);
    }
}
