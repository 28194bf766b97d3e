//! UI module for rdir.
//!
//! Layout computation and all frame rendering. The renderer is stateless:
//! it reads [AppState](crate::app::AppState) and produces widgets, never
//! owning application logic.

pub mod help;
pub mod layout;
pub mod panes;
pub mod render;
pub mod status;

pub use layout::{BinaryMode, LayoutMetrics};
pub use render::render;
