//! Patch text model, parser and hunk application.

pub mod errors;
pub mod hunk;
pub mod line_ending;
pub mod parser;
pub mod types;

pub use errors::ParseError;
pub use hunk::{apply_hunks, apply_hunks_to_content, find_context};
pub use line_ending::{split_lines, LineEnding};
pub use parser::parse_patch;
pub use types::{ParsedPatch, PatchChange, PatchHunk, PatchOperation};
