use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed declaration on line {line_number}: missing file path in '{line}'")]
    MissingPath { line_number: usize, line: String },

    #[error("Empty context line in hunk for '{path}' on line {line_number}")]
    EmptyContextLine { path: String, line_number: usize },
}
