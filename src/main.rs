use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use coc_codemod::config::{load_workspace, Workspace};
use coc_codemod::discover::discover_files;
use coc_codemod::document::DiskDocuments;
use coc_codemod::rules::CATALOGUE;
use coc_codemod::session::{FileFixSession, FileOutcome, SessionOptions};
use coc_codemod::telemetry::init_tracing;
use coc_codemod::tsserver::{resolve_command, TsServer};
use coc_codemod::CancelToken;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "coc-codemod")]
#[command(about = "Migrate coc.nvim extensions to the current API using tsserver diagnostics", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fix every candidate file in a workspace
    Fix {
        /// Path to workspace root (defaults to CODEMOD_WORKSPACE or the current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Config file (defaults to <workspace>/codemod.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dry run - compute fixes without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Skip the organize-imports pass after fixing a file
        #[arg(long)]
        no_organize_imports: bool,
    },

    /// List the files a fix run would visit
    List {
        /// Path to workspace root (defaults to CODEMOD_WORKSPACE or the current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Config file (defaults to <workspace>/codemod.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print a JSON array instead of one path per line
        #[arg(long)]
        json: bool,
    },

    /// Show the migration rules in priority order
    Rules,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Fix {
            workspace,
            config,
            dry_run,
            diff,
            no_organize_imports,
        } => cmd_fix(workspace, config, dry_run, diff, no_organize_imports),

        Commands::List {
            workspace,
            config,
            json,
        } => cmd_list(workspace, config, json),

        Commands::Rules => cmd_rules(),
    }
}

fn relative<'a>(workspace: &Path, file: &'a Path) -> &'a Path {
    file.strip_prefix(workspace).unwrap_or(file)
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (migrated)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => continue,
        };
        print!("{}", sign);
    }
}

fn cmd_fix(
    workspace: Option<PathBuf>,
    config: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
    no_organize_imports: bool,
) -> Result<()> {
    // 1. Resolve workspace and config
    let Workspace {
        root: workspace,
        config,
    } = load_workspace(workspace.as_deref(), config.as_deref())?;

    println!("Workspace: {}", workspace.display());

    // 2. Find candidate files
    let files = discover_files(&workspace, &config.discovery);
    if files.is_empty() {
        println!("{}", "No file imports coc.nvim, nothing to fix.".yellow());
        return Ok(());
    }
    println!("Candidates: {}", files.len());
    if dry_run {
        println!("{}", "[DRY RUN - files will not be modified]".cyan());
    }
    println!();

    // Snapshot contents for diff output.
    let mut contents_before: BTreeMap<PathBuf, String> = BTreeMap::new();
    if show_diff {
        for file in &files {
            if let Ok(content) = fs::read_to_string(file) {
                contents_before.insert(file.clone(), content);
            }
        }
    }

    // 3. Start the diagnostic service
    let command = resolve_command(&workspace, &config.tsserver.command);
    let mut server = TsServer::spawn(&command, &config.tsserver.args, &workspace)
        .with_context(|| {
            format!(
                "could not start {}; install typescript in the workspace or set [tsserver] command in codemod.toml",
                command.display()
            )
        })?;
    let mut store = DiskDocuments::new(&workspace)?.dry_run(dry_run);

    // 4. Fix files one by one
    let options = SessionOptions {
        organize_imports: config.fix.organize_imports && !no_organize_imports && !dry_run,
        cleanup_delay: config.fix.cleanup_delay(),
    };
    let results = FileFixSession::new(&mut server, &mut store, CancelToken::new())
        .with_options(options)
        .run_all(&files);
    drop(server);

    // 5. Report results
    let mut fixed = 0;
    let mut clean = 0;
    let mut failed = 0;
    for (file, result) in &results {
        let shown = relative(&workspace, file);
        match result {
            Ok(outcome @ FileOutcome::Fixed { .. }) => {
                let verb = if dry_run { "Would fix" } else { "Fixed" };
                println!("{} {} {} ({})", "✓".green(), verb, shown.display(), outcome);
                fixed += 1;
            }
            Ok(outcome) => {
                println!("{} {} ({})", "⊙".yellow(), shown.display(), outcome.to_string().dimmed());
                clean += 1;
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), shown.display(), e);
                failed += 1;
            }
        }
    }

    if show_diff {
        let pending: BTreeMap<&Path, &str> = store.pending().collect();
        for (file, before) in &contents_before {
            let after = match pending.get(file.as_path()) {
                Some(text) => (*text).to_string(),
                None => fs::read_to_string(file).unwrap_or_else(|_| before.clone()),
            };
            if before != &after {
                display_diff(relative(&workspace, file), before, &after);
            }
        }
    }

    // 6. Summary
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} fixed", format!("{}", fixed).green());
    println!("  {} unchanged", format!("{}", clean).yellow());
    println!("  {} failed", format!("{}", failed).red());
    if fixed > 0 {
        println!(
            "{}",
            "Some diagnostics may remain; run `tsc --noEmit` to review what is left.".dimmed()
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(workspace: Option<PathBuf>, config: Option<PathBuf>, json: bool) -> Result<()> {
    let Workspace {
        root: workspace,
        config,
    } = load_workspace(workspace.as_deref(), config.as_deref())?;
    let files = discover_files(&workspace, &config.discovery);

    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!("{}", "No file imports coc.nvim.".yellow());
        return Ok(());
    }
    for file in &files {
        println!("{}", relative(&workspace, file).display());
    }
    Ok(())
}

fn cmd_rules() -> Result<()> {
    println!("{}", "Migration rules (first match wins):".bold());
    for (idx, rule) in CATALOGUE.iter().enumerate() {
        println!("  {}. {} - {}", idx + 1, rule.id.as_str().cyan(), rule.summary);
    }
    Ok(())
}
