use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use env_logger::Builder;
use log::{info, warn, Level, LevelFilter};
use srpatch::{apply_edits_to_dir, ApplyError, ApplyOptions, BatchReport, Fence};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

// --- Main Application Entry Point ---

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        // {:?} prints the whole `anyhow` context chain.
        eprintln!("{} {:?}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Contains the primary logic of the application.
fn run(args: Args) -> Result<()> {
    setup_logging(args.verbose);

    // --- Argument Validation ---
    if !args.target_dir.is_dir() {
        return Err(anyhow!(
            "Target directory '{}' not found or is not a directory.",
            args.target_dir.display()
        ));
    }

    let content = fs::read_to_string(&args.input_file)
        .with_context(|| format!("Failed to read input file '{}'", args.input_file.display()))?;

    let default_fence = Fence::default();
    let options = ApplyOptions::builder()
        .dry_run(args.dry_run)
        .fence(Fence::new(
            args.fence_open.unwrap_or(default_fence.open),
            args.fence_close.unwrap_or(default_fence.close),
        ))
        .search_other_files(args.search_other_files)
        .build();

    let valid_filenames: Vec<String> = args
        .files
        .iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect();
    if !valid_filenames.is_empty() {
        info!(
            "Resolving filenames against {} known file(s).",
            valid_filenames.len()
        );
    }

    // --- Apply ---
    let result = apply_edits_to_dir(&content, &args.target_dir, &valid_filenames, &options);
    let report = match result {
        Ok(report) => report,
        Err(ApplyError::EditsFailed { message, report }) => {
            print_shell_commands(&report);
            // The failure report goes to stdout so it can be piped back to the model.
            println!("{}", message);
            let failed = report.failed().len();
            warn!("Edits that matched were written; the ones above were not.");
            return Err(anyhow!(
                "{} of {} edit(s) failed to apply.",
                failed,
                report.results.len()
            ));
        }
        Err(e) => {
            return Err(anyhow::Error::from(e)).with_context(|| {
                format!(
                    "A fatal error occurred while applying '{}'",
                    args.input_file.display()
                )
            });
        }
    };

    for preview in &report.previews {
        println!(
            "----- Proposed Changes for {} -----",
            preview.path.display()
        );
        print!("{}", preview.diff);
        println!("------------------------------------");
    }
    print_shell_commands(&report);

    // --- Final Summary ---
    if report.results.is_empty() {
        info!("No SEARCH/REPLACE blocks found in the input file.");
    }
    info!("\n--- Summary ---");
    info!("Applied edits: {}", report.applied().len());
    info!("Failed edits:  {}", report.failed().len());
    if args.dry_run {
        info!("DRY RUN completed. No files were modified.");
        if !report.all_applied() {
            return Err(anyhow!(
                "{} edit(s) would fail to apply.",
                report.failed().len()
            ));
        }
    }

    Ok(())
}

// --- Helper Structs and Functions ---

/// Prints the shell commands found in the input. They are never executed.
fn print_shell_commands(report: &BatchReport) {
    if report.shell_commands.is_empty() {
        return;
    }
    println!(
        "{}",
        "----- Suggested shell commands (not executed) -----".yellow()
    );
    for command in &report.shell_commands {
        print!("{}", command);
    }
    println!("---------------------------------------------------");
}

/// Defines the command-line arguments for the application.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Apply SEARCH/REPLACE edit blocks from a file to a target directory.",
    long_about = "Finds <<<<<<< SEARCH / ======= / >>>>>>> REPLACE blocks in free-form text (such as a model's answer) and applies them, tolerating indentation drift, stray blank lines and elided `...` sections."
)]
struct Args {
    /// Path to the input file containing SEARCH/REPLACE blocks.
    input_file: PathBuf,
    /// Path to the target directory to apply edits in.
    target_dir: PathBuf,
    #[arg(
        short = 'n',
        long,
        help = "Show what would be done, but don't modify files."
    )]
    dry_run: bool,
    /// A file the edits are expected to target, relative to the target
    /// directory. Can be repeated. Used to resolve sloppy filenames.
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    files: Vec<PathBuf>,
    /// The fence that opens quoted code (default: ```).
    #[arg(long, value_name = "S")]
    fence_open: Option<String>,
    /// The fence that closes quoted code (default: ```).
    #[arg(long, value_name = "S")]
    fence_close: Option<String>,
    /// Retry edits that fail against their own file on the other --file paths.
    #[arg(long)]
    search_other_files: bool,
    /// Increase logging verbosity. Can be used multiple times.
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        long_help = "Increase logging verbosity.\n-v for info, -vv for debug, -vvv for trace."
    )]
    verbose: u8,
}

/// Sets up the global logger.
fn setup_logging(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| match record.level() {
            Level::Error => writeln!(buf, "{} {}", "error:".red().bold(), record.args()),
            Level::Warn => writeln!(buf, "{} {}", "warning:".yellow().bold(), record.args()),
            Level::Info => writeln!(buf, "{}", record.args()),
            Level::Debug => writeln!(buf, "{} {}", "debug:".blue().bold(), record.args()),
            Level::Trace => writeln!(buf, "{} {}", "trace:".cyan().bold(), record.args()),
        })
        .init();
}
