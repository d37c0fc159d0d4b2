//! Shared domain types for the LeadsFlow CRM client.
//!
//! | Module  | Types                                                  |
//! |---------|--------------------------------------------------------|
//! | `lead`  | `Lead`, `NewLead`, `LeadPatch`, `LeadFlag`             |
//! | `stage` | `FunnelStage`, `StageOutcome`, `default_stages()`      |
//! | `task`  | `Task`, `NewTask`, `TaskPatch` and the task enums      |

pub mod lead;
pub mod stage;
pub mod task;

pub use lead::{Lead, LeadFlag, LeadPatch, NewLead};
pub use stage::{FunnelStage, StageOutcome, default_stages, slugify};
pub use task::{NewTask, Task, TaskKind, TaskPatch, TaskPriority, TaskStatus};
