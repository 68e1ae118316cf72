use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use ctxweave::config::{discover, load_from_path, WeaveConfig, CONFIG_FILE_NAME};
use ctxweave::hooks::run_hooks;
use ctxweave::syntax::Receiver;
use ctxweave::weave::{FileReport, FileStatus, FunctionContext, RunOptions, RunReport, Weaver};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ctxweave")]
#[command(
    about = "Keep boilerplate statements at the top of context-taking Go functions",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug). CTXWEAVE_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert, update or remove statements in Go files
    Apply {
        /// Files or directories (defaults to the directory holding the config)
        paths: Vec<PathBuf>,

        /// Config file (searched upwards from the current directory if not given)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show what would change without writing files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Remove matching statements instead of inserting them
        #[arg(long)]
        remove: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Worker threads
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Exit non-zero if any file would change
    Check {
        paths: Vec<PathBuf>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the rendered template for a function
    Render {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Function or method name
        #[arg(long = "func")]
        func: String,

        /// Receiver type, for methods
        #[arg(long)]
        receiver: Option<String>,

        /// Pointer receiver
        #[arg(long, requires = "receiver")]
        pointer: bool,

        #[arg(long, default_value = "main")]
        package: String,

        /// Name of the context parameter
        #[arg(long, default_value = "ctx")]
        var: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Apply {
            paths,
            config,
            dry_run,
            diff,
            remove,
            json,
            jobs,
        } => cmd_apply(ApplyArgs {
            paths,
            config,
            dry_run,
            show_diff: diff,
            remove,
            json,
            jobs,
        }),

        Commands::Check { paths, config } => cmd_check(paths, config),

        Commands::Render {
            config,
            func,
            receiver,
            pointer,
            package,
            var,
        } => cmd_render(config, &func, receiver, pointer, &package, &var),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("CTXWEAVE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("ctxweave={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Explicit `--config`, else the nearest `ctxweave.toml` above the current directory.
fn resolve_config(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return path
            .canonicalize()
            .with_context(|| format!("config file {} not found", path.display()));
    }

    let cwd = env::current_dir()?;
    if let Some(path) = discover(&cwd) {
        eprintln!(
            "{}",
            format!("Using config: {}", path.display()).dimmed()
        );
        return Ok(path);
    }

    anyhow::bail!(
        "{}\n{}\n  {}\n  {}",
        format!("Could not find {CONFIG_FILE_NAME}.").red(),
        "Try one of:".bold(),
        format!("1. Create {CONFIG_FILE_NAME} at the root of your Go module"),
        "2. Specify explicitly: ctxweave apply --config path/to/ctxweave.toml"
    )
}

fn load(config: Option<PathBuf>) -> Result<(PathBuf, WeaveConfig, Weaver)> {
    let path = resolve_config(config)?;
    let config = load_from_path(&path)?;
    let weaver = Weaver::from_config(&config)?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((root, config, weaver))
}

/// Absolute targets; the workspace root when none are given.
fn targets(paths: Vec<PathBuf>, root: &Path) -> Result<Vec<PathBuf>> {
    if paths.is_empty() {
        return Ok(vec![root.to_path_buf()]);
    }
    let cwd = env::current_dir()?;
    Ok(paths.into_iter().map(|p| cwd.join(p)).collect())
}

fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (woven)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => continue,
        };
        print!("{}", line);
    }
}

fn print_file(file: &FileReport) {
    let path = file.path.display();
    match file.status {
        FileStatus::Written | FileStatus::Changed => {
            println!("{} {}: {}", "✓".green(), path, file.status);
        }
        FileStatus::Unchanged => {
            if !file.errors.is_empty() {
                println!("{} {}: {}", "⊙".yellow(), path, file.status);
            }
        }
        FileStatus::Skipped(_) => println!("{} {}: {}", "⊘".cyan(), path, file.status),
        FileStatus::Failed => {
            eprintln!(
                "{} {}: {}",
                "✗".red(),
                path,
                file.error.as_deref().unwrap_or("failed")
            );
        }
    }
    for outcome in &file.functions {
        if !outcome.action.is_skip() {
            println!(
                "    {}:{} {:?}",
                outcome.function, outcome.line, outcome.action
            );
        }
    }
    if !file.imports_added.is_empty() {
        println!("    imports added: {}", file.imports_added.join(", "));
    }
    for error in &file.errors {
        eprintln!(
            "    {} {}:{}: {}",
            "✗".red(),
            error.function,
            error.line,
            error.message
        );
    }
}

fn print_summary(report: &RunReport, dry_run: bool) {
    let s = &report.summary;
    println!();
    println!("{}", "Summary:".bold());
    println!(
        "  {} of {} files {}",
        format!("{}", s.changed).green(),
        s.files,
        if dry_run { "would change" } else { "changed" }
    );
    println!(
        "  {} inserted, {} updated, {} removed",
        s.inserted, s.updated, s.removed
    );
    println!("  {} up to date", format!("{}", s.unchanged).yellow());
    println!(
        "  {} failed files, {} function errors",
        format!("{}", s.failed).red(),
        format!("{}", s.function_errors).red()
    );
}

struct ApplyArgs {
    paths: Vec<PathBuf>,
    config: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
    remove: bool,
    json: bool,
    jobs: Option<usize>,
}

fn cmd_apply(args: ApplyArgs) -> Result<()> {
    let (root, config, weaver) = load(args.config)?;
    let weaver = weaver.with_remove(args.remove);
    let paths = targets(args.paths, &root)?;

    if args.dry_run {
        if !args.json {
            println!("{}", "[DRY RUN - no files will be written]".cyan());
        }
    } else {
        run_hooks(&config.hooks.pre, &root, "pre").context("pre hook failed")?;
    }

    let options = RunOptions {
        dry_run: args.dry_run,
        jobs: args.jobs,
        workspace_root: Some(root.clone()),
    };
    let report = weaver.run(&paths, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for file in &report.files {
            print_file(file);
            if args.show_diff {
                if let Some(change) = &file.change {
                    display_diff(&file.path, &change.before, &change.after);
                }
            }
        }
        print_summary(&report, args.dry_run);
    }

    let mut failed = report.has_errors();
    if !args.dry_run {
        if let Err(e) = run_hooks(&config.hooks.post, &root, "post") {
            eprintln!("{} post hook: {}", "✗".red(), e);
            failed = true;
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_check(paths: Vec<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let (root, _config, weaver) = load(config)?;
    let paths = targets(paths, &root)?;
    let options = RunOptions {
        dry_run: true,
        jobs: None,
        workspace_root: Some(root),
    };
    let report = weaver.run(&paths, &options)?;

    for file in &report.files {
        if file.is_changed() || !file.is_clean() {
            print_file(file);
        }
    }

    if report.has_changes() || report.has_errors() {
        println!(
            "\n{}",
            format!(
                "{} file(s) need weaving, {} with errors",
                report.summary.changed,
                report.files.iter().filter(|f| !f.is_clean()).count()
            )
            .red()
        );
        std::process::exit(1);
    }
    println!("{}", "All files up to date".green());
    Ok(())
}

fn cmd_render(
    config: Option<PathBuf>,
    func: &str,
    receiver: Option<String>,
    pointer: bool,
    package: &str,
    var: &str,
) -> Result<()> {
    let (_root, _config, weaver) = load(config)?;
    let receiver = receiver.map(|type_name| Receiver {
        var: None,
        type_name,
        pointer,
        generic: false,
    });
    let function = FunctionContext {
        package,
        name: func,
        receiver: receiver.as_ref(),
        generic: false,
        var,
    };
    let carrier = weaver
        .carriers()
        .first()
        .context("configuration has no carriers")?;

    println!("{}", weaver.render(carrier, &function)?);
    Ok(())
}
