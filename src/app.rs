//! Application module.
//!
//! Contains the reducer-driven application state and the logic that mutates
//! it in response to user input and loader results.

pub mod actions;
pub mod input;
pub mod reducer;
pub mod search;
pub mod state;

pub use actions::Action;
pub use search::GlobalSearchState;
pub use state::{AppState, ExitMode, ExternalRequest};
