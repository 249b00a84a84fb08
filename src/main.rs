use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use fuzzpatch::config::discover;
use fuzzpatch::{
    load_from_path, parse_patches_with, validate_file, PatchApplier, PatchError, SearchBackend,
    SearchOutcome, Settings,
};
use fuzzpatch::validate::ValidationError;
use similar::{ChangeTag, TextDiff};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fuzzpatch")]
#[command(about = "Search Python source trees and apply fuzzy patches", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (TOML); defaults to fuzzpatch.toml in the root, if any
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the source tree for a class, method or code snippet
    Search {
        /// What to search for
        #[arg(value_enum)]
        kind: SearchKind,

        /// Class name, method name or literal code
        query: String,

        /// Restrict the search to files ending with this path
        #[arg(short, long)]
        file: Option<String>,

        /// Restrict a method search to this class
        #[arg(long)]
        class: Option<String>,

        /// Root of the source tree
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply the edits of a <modifications> text
    Apply {
        /// File holding the edit text, or `-` for stdin
        edits: PathBuf,

        /// Root of the source tree; relative edit paths resolve against it
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Syntax-check a Python file
    Check {
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchKind {
    Class,
    /// Full code of a class instead of its signature
    ClassFull,
    Method,
    Code,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Search {
            kind,
            query,
            file,
            class,
            root,
            json,
        } => {
            let settings = load_settings(config, &root)?;
            cmd_search(&settings, kind, &query, file, class, &root, json)
        }

        Commands::Apply {
            edits,
            root,
            dry_run,
            diff,
        } => {
            let settings = load_settings(config, &root)?;
            cmd_apply(&settings, &edits, &root, dry_run, diff)
        }

        Commands::Check { file } => cmd_check(&file),
    }
}

fn load_settings(config: Option<&Path>, root: &Path) -> Result<Settings> {
    let settings = match config {
        Some(path) => load_from_path(path)?,
        None => discover(root)?,
    };
    Ok(settings)
}

fn cmd_search(
    settings: &Settings,
    kind: SearchKind,
    query: &str,
    file: Option<String>,
    class: Option<String>,
    root: &Path,
    json: bool,
) -> Result<()> {
    let backend = SearchBackend::new(root, settings)
        .with_context(|| format!("failed to index {}", root.display()))?;

    let outcome = match (kind, file, class) {
        (SearchKind::Class, None, None) => backend.search_class(query)?,
        (SearchKind::Class, Some(file), None) => backend.search_class_in_file(query, &file)?,
        (SearchKind::ClassFull, None, None) => backend.search_class_full(query)?,
        (SearchKind::ClassFull, Some(_), None) => {
            anyhow::bail!("--file does not apply to class-full searches")
        }
        (SearchKind::Method, None, None) => backend.search_method(query)?,
        (SearchKind::Method, Some(file), None) => backend.search_method_in_file(query, &file)?,
        (SearchKind::Method, None, Some(class)) => backend.search_method_in_class(query, &class)?,
        (SearchKind::Code, None, None) => backend.search_code(query)?,
        (SearchKind::Code, Some(file), None) => backend.search_code_in_file(query, &file)?,
        (SearchKind::Method, Some(_), Some(_)) => {
            anyhow::bail!("--file and --class cannot be combined")
        }
        (_, _, Some(_)) => anyhow::bail!("--class only applies to method searches"),
    };

    print_outcome(&outcome, json)?;

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}

fn print_outcome(outcome: &SearchOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else if outcome.success {
        print!("{}", outcome.message);
    } else {
        eprintln!("{}", outcome.message.yellow());
    }
    Ok(())
}

fn cmd_apply(
    settings: &Settings,
    edits: &Path,
    root: &Path,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let text = read_edits(edits)?;
    let patches = parse_patches_with(&text, &settings.edits)?;
    let applier = PatchApplier::new(root, settings)
        .with_context(|| format!("invalid workspace {}", root.display()))?
        .dry_run(dry_run);

    println!("Workspace: {}", applier.root().display());
    if dry_run {
        println!("{}", "[DRY RUN - showing what would be applied]".cyan());
    }
    println!();

    let mut total_applied = 0;
    let mut total_skipped = 0;
    let mut total_failed = 0;

    for (idx, patch) in patches.iter().enumerate() {
        let label = format!("#{} {}", idx + 1, patch.file.display());

        if patch.is_noop() {
            println!("{} {}: Skipped (original and patched are identical)", "⊘".cyan(), label);
            total_skipped += 1;
            continue;
        }

        match applier.apply(patch) {
            Ok(outcome) => {
                let verb = if outcome.written { "Applied" } else { "Would apply" };
                println!(
                    "{} {}: {} at lines {}-{} ({:?} match, {})",
                    "✓".green(),
                    label,
                    verb,
                    outcome.range.start,
                    outcome.range.end,
                    outcome.kind,
                    outcome.strategy
                );
                total_applied += 1;

                if show_diff {
                    display_diff(&outcome.file, &outcome.original, &outcome.patched);
                }
            }
            Err(e) => {
                eprintln!("{} {}: Failed - {}", "✗".red(), label, first_line(&e.to_string()));
                total_failed += 1;

                match &e {
                    PatchError::Locate { .. } => {
                        eprintln!("  {}", "CONFLICT: original snippet not found".red());
                        eprintln!("  Possible causes:");
                        eprintln!("    - The code was changed or moved");
                        eprintln!("    - The edit targets the wrong file");
                    }
                    PatchError::Merge(err) => {
                        eprintln!("  {}", "No indentation repair produced valid syntax".red());
                        eprintln!("  Patched snippet:\n{}", err.after.dimmed());
                    }
                    PatchError::ConcurrentModification { .. } => {
                        eprintln!("  Action: re-run once other writers are done");
                    }
                    _ => {}
                }
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", total_applied).green());
    println!("  {} skipped", format!("{}", total_skipped).cyan());
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn read_edits(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read edits from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or_default()
}

fn cmd_check(file: &Path) -> Result<()> {
    match validate_file(file) {
        Ok(()) => {
            println!("{} {}: OK", "✓".green(), file.display());
            Ok(())
        }
        Err(ValidationError::SyntaxErrors { count, errors }) => {
            eprintln!("{} {}: {} syntax errors", "✗".red(), file.display(), count);
            for error in errors {
                eprintln!("  {}:{}: near `{}`", error.line, error.column, error.context);
            }
            std::process::exit(1);
        }
        Err(e) => Err(e).with_context(|| format!("failed to check {}", file.display())),
    }
}

/// Print the changes between `original` and `modified` as unified-diff
/// hunks with three lines of context.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    let mut unified = diff.unified_diff();
    unified.context_radius(3);

    for hunk in unified.iter_hunks() {
        println!("{}", hunk.header().to_string().cyan());
        for change in hunk.iter_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{}", change).red(),
                ChangeTag::Insert => format!("+{}", change).green(),
                ChangeTag::Equal => format!(" {}", change).normal(),
            };
            print!("{}", line);
            if change.missing_newline() {
                println!();
            }
        }
    }
}
