//! bagit - create and verify BagIt bags from the command line.

use anyhow::{Context, Result};
use bagit::{bagger::BagOutcome, config::Config, utils, validate, Algorithm, Bagger};
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, arg_required_else_help = true)]
struct Args {
    /// Just print out what would have happened
    #[arg(short = 'd', long = "dryrun")]
    dry_run: bool,

    /// Directories to bag. Bagged in place unless --bag-to-directory is given
    #[arg(long, num_args = 0.., value_name = "DIR")]
    bag: Option<Vec<PathBuf>>,

    /// Copy the --bag directories into this directory and bag it
    #[arg(long, value_name = "DIR")]
    bag_to_directory: Option<PathBuf>,

    /// Regenerate the tag manifest(s) of the --bag directories
    #[arg(long)]
    update_tag_manifests: bool,

    /// Checksum algorithm for new manifests (default: md5)
    #[arg(long, value_parser = ["md5", "sha1", "sha256", "sha512"])]
    checksum_algorithm: Option<String>,

    /// Verify that the bag(s) are valid: complete, and every checksum matches
    #[arg(long, num_args = 0.., value_name = "DIR")]
    is_valid: Option<Vec<PathBuf>>,

    /// Verify that the bag(s) are complete
    #[arg(long, num_args = 0.., value_name = "DIR")]
    is_complete: Option<Vec<PathBuf>>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(name) = &args.checksum_algorithm {
        config.bag.checksum_algorithm = name.parse::<Algorithm>()?;
    }

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::debug!("Starting bagit v{}", env!("CARGO_PKG_VERSION"));

    let bagger = Bagger::new(config.bag.bag_options(args.dry_run));

    let all_ok = if let Some(dirs) = &args.bag {
        if let Some(destination) = &args.bag_to_directory {
            report_bagging(destination, bagger.bag_to_directory(dirs, destination))
        } else if args.update_tag_manifests {
            dirs.iter().fold(true, |ok, dir| {
                report_bagging(dir, bagger.update_tag_manifests(dir)) && ok
            })
        } else {
            dirs.iter()
                .fold(true, |ok, dir| report_bagging(dir, bagger.bag_in_place(dir)) && ok)
        }
    } else if let Some(dirs) = &args.is_valid {
        let block_size = config.bag.read_buffer_size;
        dirs.iter().fold(true, |ok, dir| {
            let report = validate::check_valid_with_buffer(dir, block_size);
            report_check(dir, "valid", report) && ok
        })
    } else if let Some(dirs) = &args.is_complete {
        dirs.iter().fold(true, |ok, dir| {
            report_check(dir, "complete", validate::check_complete(dir)) && ok
        })
    } else {
        Args::command().print_help()?;
        return Ok(ExitCode::from(2));
    };

    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn report_bagging(dir: &Path, outcome: bagit::Result<BagOutcome>) -> bool {
    match outcome {
        Ok(outcome) if outcome.dry_run => {
            for action in &outcome.actions {
                println!("Would {}", action);
            }
            true
        }
        Ok(outcome) => {
            println!(
                "Completed {} ({} changes)",
                outcome.bag.root_dir.display(),
                outcome.actions.len()
            );
            true
        }
        Err(e) => {
            eprintln!("Error: {}: {}", dir.display(), e);
            false
        }
    }
}

fn report_check(dir: &Path, check: &str, report: bagit::Result<validate::CheckReport>) -> bool {
    match report {
        Ok(report) => match &report.violation {
            None => {
                println!("Bag {} is {}", dir.display(), check);
                true
            }
            Some(violation) => {
                println!("Bag {} is not {}: {}", dir.display(), check, violation);
                false
            }
        },
        Err(e) => {
            eprintln!("Error: {}: {}", dir.display(), e);
            false
        }
    }
}
