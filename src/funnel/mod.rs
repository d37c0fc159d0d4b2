//! Sales funnel: stage configuration, lead grouping and drag/drop.
//!
//! ## Module Map
//!
//! ```text
//! StageBoard ──watch──> subscribers (workspace persists to the store)
//!     │
//!     ├─> grouping::group_by_stage(stages, leads) ──> Vec<StageColumn>
//!     │                                                   │
//!     │                                                   └─> summary::summarize
//!     │
//!     └─> drag::DragController::drag_end(board, cache) ──> DropAction
//! ```
//!
//! | Module     | Responsibility                                         |
//! |------------|--------------------------------------------------------|
//! | `stages`   | `StageBoard`: ordered, non-empty stage list            |
//! | `grouping` | Status → stage mapping with first-stage fallback       |
//! | `summary`  | Per-stage counts and values, conversion rate           |
//! | `drag`     | Resolves a finished drag into a `DropAction`           |
//!
//! A lead belongs to the first stage whose id or label matches its status.
//! Leads whose status matches nothing are shown in the first stage; their
//! stored status is left untouched until the user moves them.

pub mod drag;
pub mod grouping;
pub mod stages;
pub mod summary;

pub use drag::{DragController, DropAction};
pub use grouping::{StageColumn, group_by_stage, stage_for_status};
pub use stages::StageBoard;
pub use summary::{FunnelSummary, StageSummary, summarize};
