//! Patch engine: the single entry point that turns patch text into
//! filesystem changes.
//!
//! # Pipeline
//!
//! 1. Parse the patch text into operations
//! 2. Validate every declared path against the workspace
//! 3. Enforce the duplicate-path policy
//! 4. Lock every resolved path (all or nothing)
//! 5. Load Update/Delete targets, check Add targets are absent
//! 6. Apply hunks in memory and build the commit
//! 7. Compute statistics
//! 8. Stage and commit, unless this is a dry run
//!
//! Nothing on disk changes before step 8, so any failure up to that point
//! leaves the workspace untouched.

use crate::apply::CommitApplier;
use crate::commit::{Commit, CommitBuilder, ResolvedOperation};
use crate::config::EngineConfig;
use crate::error::{ErrorKind, PatchError};
use crate::loader::{FileLoader, LoadedFile};
use crate::lock::LockManager;
use crate::patch::{parse_patch, ParsedPatch};
use crate::safety::WorkspaceGuard;
use crate::stats::{self, LineStatistics, PatchStatistics};
use crate::summary::{format_outcome, PatchPreview};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const PATCH_TEXT_PARAM: &str = "patchText";
pub const DRY_RUN_PARAM: &str = "dryRun";

pub struct PatchEngine {
    guard: WorkspaceGuard,
    loader: FileLoader,
    config: EngineConfig,
    locks: Arc<LockManager>,
    statistics: Box<dyn LineStatistics>,
}

impl PatchEngine {
    /// Engine rooted at `workspace_root`, using the process-wide lock manager.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, PatchError> {
        let config = EngineConfig::default();
        Ok(Self {
            guard: WorkspaceGuard::new(workspace_root)?,
            loader: FileLoader::new(config.max_file_size),
            statistics: config.statistics.counter(),
            config,
            locks: LockManager::global(),
        })
    }

    /// Engine rooted at the process's current working directory.
    pub fn from_current_dir() -> Result<Self, PatchError> {
        let cwd = std::env::current_dir()
            .map_err(|err| PatchError::io("resolve current directory", ".", err))?;
        Self::new(cwd)
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.loader = FileLoader::new(config.max_file_size);
        self.statistics = config.statistics.counter();
        self.config = config;
        self
    }

    pub fn with_lock_manager(mut self, locks: Arc<LockManager>) -> Self {
        self.locks = locks;
        self
    }

    /// Replace the line counter selected by the config.
    pub fn with_statistics(mut self, statistics: Box<dyn LineStatistics>) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn workspace_root(&self) -> &Path {
        self.guard.workspace_root()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.locks
    }

    /// Parse and summarize without touching the workspace.
    pub fn preview(&self, patch_text: &str) -> Result<PatchPreview, PatchError> {
        let parsed = parse_non_empty(patch_text)?;
        Ok(PatchPreview::from_parsed(&parsed))
    }

    /// Parse and apply `patch_text`; with `dry_run` nothing is written.
    pub fn apply(&self, patch_text: &str, dry_run: bool) -> Result<PatchOutcome, PatchError> {
        let parsed = parse_non_empty(patch_text)?;
        self.apply_parsed(&parsed, dry_run)
    }

    pub fn apply_parsed(
        &self,
        parsed: &ParsedPatch,
        dry_run: bool,
    ) -> Result<PatchOutcome, PatchError> {
        let paths = parsed
            .operations
            .iter()
            .map(|operation| self.guard.validate_path(operation.path()))
            .collect::<Result<Vec<PathBuf>, _>>()?;
        let resolved: Vec<ResolvedOperation<'_>> = parsed
            .operations
            .iter()
            .zip(&paths)
            .map(|(operation, path)| ResolvedOperation { path, operation })
            .collect();

        let builder = CommitBuilder::new(&self.config, parsed.line_ending);
        let warnings = builder.check_duplicates(&resolved)?;

        let _locks = self.locks.try_acquire_all(&paths)?;

        let loaded = self.load_targets(&resolved)?;
        let commit = builder.build(&resolved, &loaded)?;
        let statistics = stats::compute(self.statistics.as_ref(), &commit);

        if dry_run {
            debug!(files = commit.len(), "dry run, skipping apply");
        } else {
            CommitApplier::apply(&commit)?;
        }

        info!(
            files = statistics.file_count(),
            additions = statistics.additions,
            removals = statistics.removals,
            dry_run,
            "patch processed"
        );

        Ok(PatchOutcome {
            dry_run,
            statistics,
            warnings,
            commit,
        })
    }

    /// Existence, size and content checks for every referenced file.
    fn load_targets(
        &self,
        operations: &[ResolvedOperation<'_>],
    ) -> Result<HashMap<PathBuf, LoadedFile>, PatchError> {
        let mut loaded = HashMap::new();
        for resolved in operations {
            if resolved.operation.reads_target() {
                if !loaded.contains_key(resolved.path) {
                    let file = self.loader.load(resolved.path)?;
                    loaded.insert(resolved.path.to_path_buf(), file);
                }
            } else {
                self.loader.ensure_absent(resolved.path)?;
            }
        }
        Ok(loaded)
    }

    /// Tool-framework boundary: never fails, reports errors in the result.
    pub fn invoke(&self, params: &Map<String, Value>) -> ToolResult {
        let result = PatchRequest::from_params(params)
            .and_then(|request| self.apply(&request.patch_text, request.dry_run));

        match result {
            Ok(outcome) => ToolResult::from_outcome(outcome),
            Err(err) => {
                warn!(kind = %err.kind(), error = %err, "patch failed");
                ToolResult::from_error(&err)
            }
        }
    }
}

fn parse_non_empty(patch_text: &str) -> Result<ParsedPatch, PatchError> {
    if patch_text.trim().is_empty() {
        return Err(PatchError::EmptyPatch);
    }
    Ok(parse_patch(patch_text)?)
}

/// Parameters accepted by [`PatchEngine::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRequest {
    pub patch_text: String,
    pub dry_run: bool,
}

impl PatchRequest {
    pub fn from_params(params: &Map<String, Value>) -> Result<Self, PatchError> {
        let patch_text = match params.get(PATCH_TEXT_PARAM) {
            None | Some(Value::Null) => {
                return Err(PatchError::MissingParameter {
                    name: PATCH_TEXT_PARAM,
                });
            }
            Some(Value::String(text)) => text.clone(),
            Some(_) => {
                return Err(PatchError::InvalidParameter {
                    name: PATCH_TEXT_PARAM,
                    expected: "a string",
                });
            }
        };

        let dry_run = match params.get(DRY_RUN_PARAM) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => {
                return Err(PatchError::InvalidParameter {
                    name: DRY_RUN_PARAM,
                    expected: "a boolean",
                });
            }
        };

        Ok(Self {
            patch_text,
            dry_run,
        })
    }
}

/// What a successful run did, or would do in a dry run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOutcome {
    pub dry_run: bool,
    pub statistics: PatchStatistics,
    /// Non-fatal notes such as overwritten duplicate entries
    pub warnings: Vec<String>,
    /// Old and new content of every touched file
    #[serde(skip)]
    pub commit: Commit,
}

impl PatchOutcome {
    pub fn formatted_output(&self) -> String {
        format_outcome(&self.statistics, self.dry_run)
    }
}

/// Result object handed back to the tool framework.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<PatchOutcome>,
    pub formatted_output: String,
}

impl ToolResult {
    pub fn from_outcome(outcome: PatchOutcome) -> Self {
        Self {
            success: true,
            error: None,
            error_kind: None,
            formatted_output: outcome.formatted_output(),
            payload: Some(outcome),
        }
    }

    pub fn from_error(err: &PatchError) -> Self {
        let message = err.to_string();
        Self {
            success: false,
            formatted_output: format!("Error: {message}"),
            error: Some(message),
            error_kind: Some(err.kind()),
            payload: None,
        }
    }
}
