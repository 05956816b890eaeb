//! chapterize - split anchor-merged EPUB chapters

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use chapterize::{ChapterOutput, EpubDir, Outcome, StandardizeConfig};

#[derive(Parser, Debug)]
#[command(name = "chapterize")]
#[command(version, about = "Split anchor-merged EPUB chapters into one file each", long_about = None)]
#[command(after_help = "EXAMPLES:
    chapterize book/              Split chapters and rewrite the package
    chapterize --dry-run book/    Show what would change
    chapterize --json book/       Print a JSON report")]
struct Cli {
    /// Directory of an unpacked EPUB (containing META-INF/container.xml)
    #[arg(value_name = "DIR")]
    input: PathBuf,

    /// Report changes without writing anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Keep page-number and dangling-link paragraphs
    #[arg(long)]
    no_sanitize: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress output messages
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    input: String,
    dry_run: bool,
    changed: bool,
    reason: Option<String>,
    chapters: &'a [ChapterOutput],
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let mut book = EpubDir::open(&cli.input).map_err(|e| e.to_string())?;
    let config = StandardizeConfig::default().with_sanitize(!cli.no_sanitize);

    let outcome = if cli.dry_run {
        book.standardize_dry_run(&config)
            .map(|(outcome, _)| outcome)
            .map_err(|e| e.to_string())?
    } else {
        book.standardize(&config).map_err(|e| e.to_string())?
    };

    if let Outcome::Rewritten(_) = outcome
        && !cli.dry_run
    {
        book.save().map_err(|e| e.to_string())?;
    }

    let (reason, chapters) = match outcome {
        Outcome::Rewritten(ref result) => (None, result.chapters.as_slice()),
        Outcome::Unchanged(ref reason) => (Some(reason.to_string()), &[][..]),
    };

    if cli.json {
        let report = Report {
            input: cli.input.display().to_string(),
            dry_run: cli.dry_run,
            changed: reason.is_none(),
            reason,
            chapters,
        };
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{json}");
        return Ok(());
    }

    if cli.quiet {
        return Ok(());
    }

    println!("Book: {}", book.title());
    println!("Navigation: {}", book.nav_path());
    match reason {
        Some(reason) => println!("Unchanged: {reason}"),
        None => {
            let verb = if cli.dry_run { "Would write" } else { "Wrote" };
            println!("{verb} {} chapters:", chapters.len());
            for chapter in chapters {
                let linear = if chapter.linear { "" } else { " (non-linear)" };
                println!(
                    "  {} <- {} [{}]{linear}",
                    chapter.file_path, chapter.source_file_path, chapter.manifest_id
                );
            }
        }
    }

    Ok(())
}
