use leadsflow_common::{FunnelStage, StageOutcome, default_stages, slugify};
use tokio::sync::watch;
use tracing::debug;

use crate::errors::StageError;

/// User-configurable, ordered list of funnel stages. Never empty.
///
/// Every mutation publishes the new list to subscribers.
#[derive(Debug)]
pub struct StageBoard {
    stages: Vec<FunnelStage>,
    tx: watch::Sender<Vec<FunnelStage>>,
}

impl Default for StageBoard {
    fn default() -> Self {
        Self::new(default_stages())
    }
}

fn validate_color(color: &str) -> Result<String, StageError> {
    let color = color.trim();
    let hex = color.strip_prefix('#').unwrap_or("");
    if matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(color.to_ascii_lowercase())
    } else {
        Err(StageError::InvalidColor(color.to_string()))
    }
}

fn validate_label(label: &str) -> Result<String, StageError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(StageError::EmptyLabel);
    }
    Ok(label.to_string())
}

impl StageBoard {
    /// An empty list falls back to the default stages.
    pub fn new(stages: Vec<FunnelStage>) -> Self {
        let stages = if stages.is_empty() {
            default_stages()
        } else {
            stages
        };
        let (tx, _) = watch::channel(stages.clone());
        Self { stages, tx }
    }

    pub fn stages(&self) -> &[FunnelStage] {
        &self.stages
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<FunnelStage>> {
        self.tx.subscribe()
    }

    pub fn find(&self, id: &str) -> Option<&FunnelStage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id == id)
    }

    /// The fallback stage for unmatched statuses.
    pub fn first(&self) -> &FunnelStage {
        &self.stages[0]
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    fn publish(&self) {
        self.tx.send_replace(self.stages.clone());
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut FunnelStage, StageError> {
        self.stages
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StageError::NotFound(id.to_string()))
    }

    fn unique_id(&self, label: &str) -> String {
        let base = slugify(label);
        if self.find(&base).is_none() {
            return base;
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| self.find(candidate).is_none())
            .unwrap_or(base)
    }

    /// A label must not match the id or label of another stage. `except` is
    /// the stage being renamed.
    fn check_label_free(&self, label: &str, except: Option<&str>) -> Result<(), StageError> {
        let taken = self
            .stages
            .iter()
            .filter(|s| except != Some(s.id.as_str()))
            .any(|s| s.matches_status(label));
        if taken {
            return Err(StageError::DuplicateLabel(label.to_string()));
        }
        Ok(())
    }

    /// Append a custom stage. Its id is the slug of the label, suffixed when
    /// already taken.
    pub fn add(&mut self, label: &str, color: &str) -> Result<&FunnelStage, StageError> {
        let label = validate_label(label)?;
        let color = validate_color(color)?;
        self.check_label_free(&label, None)?;
        let id = self.unique_id(&label);
        debug!(id = %id, label = %label, "Adding funnel stage");
        self.stages.push(FunnelStage::custom(id, label, color));
        self.publish();
        Ok(&self.stages[self.stages.len() - 1])
    }

    pub fn rename(&mut self, id: &str, label: &str) -> Result<(), StageError> {
        let label = validate_label(label)?;
        self.find(id)
            .ok_or_else(|| StageError::NotFound(id.to_string()))?;
        self.check_label_free(&label, Some(id))?;
        self.find_mut(id)?.label = label;
        self.publish();
        Ok(())
    }

    pub fn recolor(&mut self, id: &str, color: &str) -> Result<(), StageError> {
        let color = validate_color(color)?;
        self.find_mut(id)?.color = color;
        self.publish();
        Ok(())
    }

    pub fn set_outcome(&mut self, id: &str, outcome: StageOutcome) -> Result<(), StageError> {
        self.find_mut(id)?.outcome = outcome;
        self.publish();
        Ok(())
    }

    /// Remove a stage. Leads in it fall back to the first stage on display.
    pub fn remove(&mut self, id: &str) -> Result<FunnelStage, StageError> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| StageError::NotFound(id.to_string()))?;
        if self.stages.len() == 1 {
            return Err(StageError::LastStage);
        }
        let removed = self.stages.remove(idx);
        self.publish();
        Ok(removed)
    }

    /// Move the stage at `from` to position `to`, shifting the ones between.
    pub fn move_stage(&mut self, from: usize, to: usize) -> Result<(), StageError> {
        let len = self.stages.len();
        for index in [from, to] {
            if index >= len {
                return Err(StageError::OutOfRange { index, len });
            }
        }
        if from != to {
            let stage = self.stages.remove(from);
            self.stages.insert(to, stage);
            self.publish();
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.replace(default_stages());
    }

    /// Swap in a stage list saved elsewhere. An empty list falls back to the
    /// default stages.
    pub fn replace(&mut self, stages: Vec<FunnelStage>) {
        self.stages = if stages.is_empty() {
            default_stages()
        } else {
            stages
        };
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(board: &StageBoard) -> Vec<&str> {
        board.stages().iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_empty_list_falls_back_to_defaults() {
        let board = StageBoard::new(vec![]);
        assert_eq!(board.len(), 6);
        assert_eq!(board.first().id, "novo");
    }

    #[test]
    fn test_add_slugifies_and_dedupes_ids() {
        let mut board = StageBoard::default();
        let id = board.add("Demo agendada", "#123ABC").unwrap().id.clone();
        assert_eq!(id, "demo_agendada");
        let second = board.add("Demo  agendada!", "#fff").unwrap();
        assert_eq!(second.id, "demo_agendada_2");
        assert!(!second.builtin);
        assert_eq!(board.find("demo_agendada").unwrap().color, "#123abc");
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let mut board = StageBoard::default();
        assert_eq!(board.add("   ", "#fff").unwrap_err(), StageError::EmptyLabel);
        assert!(matches!(
            board.add("X", "blue"),
            Err(StageError::InvalidColor(_))
        ));
    }

    #[test]
    fn test_label_used_by_another_stage_is_rejected() {
        let mut board = StageBoard::default();
        assert_eq!(
            board.add("Novo", "#fff").unwrap_err(),
            StageError::DuplicateLabel("Novo".into())
        );
        assert!(matches!(
            board.add(" em_contato ", "#fff"),
            Err(StageError::DuplicateLabel(_))
        ));
        assert_eq!(board.len(), 6);

        board.add("Demo", "#fff").unwrap();
        assert!(matches!(
            board.rename("demo", "PROPOSTA"),
            Err(StageError::DuplicateLabel(_))
        ));
        assert!(matches!(
            board.rename("novo", "demo"),
            Err(StageError::DuplicateLabel(_))
        ));
        assert_eq!(board.find("demo").unwrap().label, "Demo");
    }

    #[test]
    fn test_rename_to_own_id_or_case_is_allowed() {
        let mut board = StageBoard::default();
        board.rename("novo", "novo").unwrap();
        board.rename("novo", "NOVO").unwrap();
        assert_eq!(board.find("novo").unwrap().label, "NOVO");
        assert_eq!(
            board.rename("ghost", "X").unwrap_err(),
            StageError::NotFound("ghost".into())
        );
    }

    #[test]
    fn test_replace_publishes_and_defaults_when_empty() {
        let mut board = StageBoard::default();
        let mut rx = board.subscribe();
        board.replace(vec![FunnelStage::custom("x", "X", "#000")]);
        assert_eq!(rx.borrow_and_update().len(), 1);
        board.replace(vec![]);
        assert_eq!(board.len(), 6);
    }

    #[test]
    fn test_remove_rejects_last_stage() {
        let mut board = StageBoard::new(vec![FunnelStage::custom("only", "Only", "#000")]);
        assert_eq!(board.remove("only").unwrap_err(), StageError::LastStage);
        assert_eq!(
            board.remove("ghost").unwrap_err(),
            StageError::NotFound("ghost".into())
        );
    }

    #[test]
    fn test_move_stage_is_array_move() {
        let mut board = StageBoard::default();
        board.move_stage(0, 2).unwrap();
        assert_eq!(
            ids(&board),
            vec!["em_contato", "qualificado", "novo", "proposta", "convertido", "perdido"]
        );
        assert_eq!(
            board.move_stage(1, 6).unwrap_err(),
            StageError::OutOfRange { index: 6, len: 6 }
        );
    }

    #[test]
    fn test_mutations_are_published() {
        let mut board = StageBoard::default();
        let mut rx = board.subscribe();
        board.rename("novo", "Entrada").unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update()[0].label, "Entrada");
        board.reset();
        assert_eq!(rx.borrow_and_update()[0].label, "Novo");
    }

    #[test]
    fn test_set_outcome_and_recolor() {
        let mut board = StageBoard::default();
        board.set_outcome("proposta", StageOutcome::Won).unwrap();
        board.recolor("proposta", "#000000").unwrap();
        let stage = board.find("proposta").unwrap();
        assert_eq!(stage.outcome, StageOutcome::Won);
        assert_eq!(stage.color, "#000000");
    }
}
