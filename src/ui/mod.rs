pub mod board;
pub mod icons;
pub mod progress;

pub use board::{render_board, render_summary, terminal_width};
pub use progress::DeleteProgress;
