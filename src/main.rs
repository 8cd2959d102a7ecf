use agent_patcher::config::{load_for_workspace, load_from_path};
use agent_patcher::{EngineConfig, PatchEngine, PatchOutcome, ToolResult};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "AGENT_PATCHER_LOG";

#[derive(Parser)]
#[command(name = "agent-patcher")]
#[command(about = "Apply multi-file text patches inside a workspace", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a patch to a workspace
    Apply {
        /// Path to workspace root (current directory if not specified)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Patch file to apply (read from stdin if not specified)
        #[arg(short, long)]
        patch: Option<PathBuf>,

        /// Dry run - validate and report without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Print the tool result as JSON
        #[arg(long)]
        json: bool,

        /// Engine config file (defaults to <workspace>/.agent-patcher.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Summarize a patch without touching any file
    Preview {
        /// Patch file to read (read from stdin if not specified)
        #[arg(short, long)]
        patch: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            workspace,
            patch,
            dry_run,
            diff,
            json,
            config,
        } => cmd_apply(workspace, patch, dry_run, diff, json, config),

        Commands::Preview { patch } => cmd_preview(patch),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Helper: Read patch text from a file, or stdin when no file is given
fn read_patch(patch: Option<&Path>) -> Result<String> {
    match patch {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read patch file {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read patch from stdin")?;
            Ok(text)
        }
    }
}

/// Helper: Resolve workspace root and engine config
fn load_engine(workspace: Option<PathBuf>, config: Option<PathBuf>) -> Result<PatchEngine> {
    let workspace = match workspace {
        Some(path) => path,
        None => std::env::current_dir().context("failed to read current directory")?,
    };

    let config: EngineConfig = match config {
        Some(path) => load_from_path(&path)?,
        None => load_for_workspace(&workspace)?,
    };

    let engine = PatchEngine::new(&workspace)
        .with_context(|| format!("invalid workspace {}", workspace.display()))?;
    Ok(engine.with_config(config))
}

fn cmd_apply(
    workspace: Option<PathBuf>,
    patch: Option<PathBuf>,
    dry_run: bool,
    diff: bool,
    json: bool,
    config: Option<PathBuf>,
) -> Result<()> {
    let engine = load_engine(workspace, config)?;
    let patch_text = read_patch(patch.as_deref())?;

    let result = engine.apply(&patch_text, dry_run);

    if json {
        let tool_result = match result {
            Ok(outcome) => ToolResult::from_outcome(outcome),
            Err(err) => ToolResult::from_error(&err),
        };
        println!("{}", serde_json::to_string_pretty(&tool_result)?);
        if !tool_result.success {
            std::process::exit(1);
        }
        return Ok(());
    }

    match result {
        Ok(outcome) => {
            print_outcome(&outcome, diff);
            Ok(())
        }
        Err(err) => {
            eprintln!("{} {}", "✗".red(), err.to_string().red());
            eprintln!("  {}", format!("kind: {}", err.kind()).dimmed());
            std::process::exit(1);
        }
    }
}

fn cmd_preview(patch: Option<PathBuf>) -> Result<()> {
    let patch_text = read_patch(patch.as_deref())?;
    let engine = PatchEngine::from_current_dir()?;

    match engine.preview(&patch_text) {
        Ok(preview) => {
            println!("{}", preview.to_string().bold());
            Ok(())
        }
        Err(err) => {
            eprintln!("{} {}", "✗".red(), err.to_string().red());
            std::process::exit(1);
        }
    }
}

fn print_outcome(outcome: &PatchOutcome, diff: bool) {
    for warning in &outcome.warnings {
        eprintln!("{}", format!("Warning: {warning}").yellow());
    }

    for file in &outcome.statistics.files {
        println!(
            "  {} {} {}",
            format!("{:?}", file.kind).to_lowercase().cyan(),
            file.path.display(),
            format!("(+{} -{})", file.additions, file.removals).dimmed()
        );
    }

    if diff {
        for (path, change) in outcome.commit.iter() {
            display_diff(path, change.old_text(), change.new_text());
        }
    }

    let summary = outcome.formatted_output();
    if outcome.dry_run {
        println!("\n{}", summary.yellow());
    } else {
        println!("\n{} {}", "✓".green(), summary.green());
    }
}

/// Helper: Show unified diff between original and patched content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{change}").red(),
            ChangeTag::Insert => format!("+{change}").green(),
            ChangeTag::Equal => format!(" {change}").normal(),
        };
        print!("{line}");
        if change.missing_newline() {
            println!();
        }
    }
}
