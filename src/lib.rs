pub mod api;
pub mod bulk_delete;
pub mod cache;
pub mod config;
pub mod errors;
pub mod funnel;
pub mod leadsflow_config;
pub mod logging;
pub mod optimistic;
pub mod refresh;
pub mod store;
pub mod tasks;
pub mod ui;
pub mod usage;
pub mod validate;
pub mod workspace;

pub use workspace::{Workspace, WorkspaceOptions};
