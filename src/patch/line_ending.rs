use serde::{Deserialize, Serialize};
use std::fmt;

/// Line terminator carried alongside a file's content.
///
/// Detected once when a file is loaded and used to reassemble the line list
/// after hunks are applied. This is a per-file decision, not per-line: a file
/// with mixed endings comes back uniformly terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    #[serde(rename = "crlf")]
    CrLf,
}

impl LineEnding {
    /// Dominant terminator of `content`, or `None` when it has none at all.
    ///
    /// CRLF wins ties against bare LF.
    pub fn detect(content: &str) -> Option<Self> {
        let crlf = content.matches("\r\n").count();
        let bare_lf = content.matches('\n').count() - crlf;

        if crlf == 0 && bare_lf == 0 {
            None
        } else if crlf >= bare_lf {
            Some(LineEnding::CrLf)
        } else {
            Some(LineEnding::Lf)
        }
    }

    /// Detect, falling back to `default` for single-line content.
    pub fn detect_or(content: &str, default: LineEnding) -> Self {
        Self::detect(content).unwrap_or(default)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    pub fn join<S: AsRef<str>>(self, lines: &[S]) -> String {
        let mut out = String::new();
        for (idx, line) in lines.iter().enumerate() {
            if idx > 0 {
                out.push_str(self.as_str());
            }
            out.push_str(line.as_ref());
        }
        out
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineEnding::Lf => write!(f, "lf"),
            LineEnding::CrLf => write!(f, "crlf"),
        }
    }
}

/// Split on both CRLF and LF.
///
/// Splitting is literal: content ending in a terminator yields a trailing
/// empty element, and joining the result restores that terminator.
pub fn split_lines(content: &str) -> Vec<String> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}
