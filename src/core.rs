//! Core runtime logic for rdir.
//!
//! This module contains the non-UI engine pieces used by the application:
//! - [text]: grapheme-cluster measurement, tab expansion and sanitization.
//! - [fsx]: directory listing, hidden detection and file-head probes.
//! - [preview]: the [PreviewData] builder.
//! - [format]: Markdown/JSON styled-segment views.
//! - [worker]: background loaders and the action sink.
//! - [external]: clipboard/editor/pager detection and dispatch.
//! - [terminal]: terminal setup/teardown and the main event loop.

pub mod external;
pub mod format;
pub mod fsx;
pub mod preview;
pub mod terminal;
pub mod text;
pub mod worker;

pub use fsx::{FileEntry, TextEncoding, load_directory};
pub use preview::{PreviewData, TextLineMetadata};
pub use worker::{ActionSink, Loaders};
