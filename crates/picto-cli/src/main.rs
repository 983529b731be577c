mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::process;

use chrono::DateTime;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, GroupBy};
use dotenv::dotenv;
use picto_core::lifecycle::{Transition, TransitionReport};
use picto_core::storage::grouping::Groups;
use picto_core::{FileType, Library, Visibility};
use progress::CliReporter;
use tracing::{error, info};

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() -> CliResult {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match picto_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();
    let library = Library::new(config);

    let outcome = match args.command {
        Some(Commands::Sync) => run_sync(&library),
        Some(Commands::Group {
            by,
            visibility,
            file_type,
            refresh,
            json,
        }) => run_group(&library, by, &visibility, &file_type, refresh, json),
        Some(Commands::Unlinked) => run_unlinked(&library),
        Some(Commands::Hide { paths }) => run_transition(&library, Transition::Hide, &paths),
        Some(Commands::Unhide { paths }) => run_transition(&library, Transition::Unhide, &paths),
        Some(Commands::Trash { paths }) => run_transition(&library, Transition::Trash, &paths),
        Some(Commands::Restore { paths }) => run_transition(&library, Transition::Restore, &paths),
        Some(Commands::Delete {
            paths,
            classes,
            yes,
        }) => run_delete(&library, &paths, &classes, yes),
        Some(Commands::Info { path }) => run_info(&library, &path),
        Some(Commands::Stats) => run_stats(&library),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", library.config());
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {}", err);
        process::exit(1);
    }

    Ok(())
}

fn run_sync(library: &Library) -> CliResult {
    if library.config().classify && !library.has_classifier() {
        info!("Indexing only: new media stays unlinked until a classifier is attached");
    }
    let reporter = CliReporter::new();
    let report = library.sync(&reporter)?;

    println!();
    info!(
        "Scan: {}, Hash: {}, DB: {}, Classify: {}",
        format!("{:.2}s", report.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.hash_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.reconcile_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.classify_duration.as_secs_f64()).green(),
    );
    info!(
        "{} new, {} moved, {} rewritten, {} duplicates, {} dropped, {} skipped",
        format!("{}", report.inserted).cyan(),
        format!("{}", report.moved).cyan(),
        format!("{}", report.rewritten).cyan(),
        format!("{}", report.duplicates).cyan(),
        format!("{}", report.dropped).cyan(),
        format!("{}", report.skipped).yellow(),
    );
    info!(
        "{} pruned, {} classified, {} classification failures",
        format!("{}", report.pruned_media).red(),
        format!("{}", report.classified).green(),
        format!("{}", report.classification_failures).red(),
    );
    Ok(())
}

fn run_group(
    library: &Library,
    by: GroupBy,
    visibility: &str,
    file_type: &str,
    refresh: bool,
    json: bool,
) -> CliResult {
    let visibility: Visibility = visibility.parse()?;
    let file_type: Option<FileType> = match file_type {
        "any" => None,
        other => Some(other.parse()?),
    };

    if refresh && library.refresh()?.is_none() {
        info!("A sync is already running; showing the last committed index");
    }

    let groups = match by {
        GroupBy::Class => library.group_by_class(visibility, file_type)?,
        GroupBy::Directory => library.group_by_directory(visibility, file_type)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
    } else {
        print_groups(&groups);
    }
    Ok(())
}

fn print_groups(groups: &Groups) {
    if groups.is_empty() {
        println!("{}", "No media found".dimmed());
        return;
    }
    for (name, paths) in groups {
        println!("{} ({})", name.bold(), paths.len());
        for path in paths {
            println!("    {}", path);
        }
    }
}

fn run_unlinked(library: &Library) -> CliResult {
    let unlinked = library.unlinked_media()?;
    for media in &unlinked {
        println!("{} {}", media.file_type.to_string().cyan(), media.path);
    }
    info!("{} media awaiting classification", format!("{}", unlinked.len()).yellow());
    Ok(())
}

fn run_transition(library: &Library, transition: Transition, paths: &[String]) -> CliResult {
    let TransitionReport { requested, applied } = library.transition(transition, paths)?;
    info!(
        "{:?}: {} of {} paths now {}",
        transition,
        format!("{}", applied).green(),
        requested,
        transition.to_state()
    );
    Ok(())
}

fn run_delete(library: &Library, paths: &[String], classes: &[String], yes: bool) -> CliResult {
    let target = if classes.is_empty() {
        format!("{} trashed files", paths.len())
    } else {
        format!("all trashed files tagged {}", classes.join(", "))
    };
    if !yes && !prompt_confirm(&format!("Permanently delete {} from disk?", target), Some(false))? {
        return Ok(());
    }

    let report = if classes.is_empty() {
        library.delete(paths)?
    } else {
        library.delete_by_class(classes)?
    };
    for (path, reason) in &report.unlink_failures {
        error!("Could not delete {}: {}", path, reason);
    }
    info!(
        "{} deleted, {} not in trash, {} failed",
        format!("{}", report.deleted.len()).red(),
        report.skipped,
        report.unlink_failures.len()
    );
    Ok(())
}

fn run_info(library: &Library, path: &str) -> CliResult {
    match library.media_info(path)? {
        Some(info) => {
            let modified = DateTime::from_timestamp(info.media.timestamp, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&info)?);
            println!("modified: {}", modified);
        }
        None => println!("{} is not indexed", path),
    }
    Ok(())
}

fn run_stats(library: &Library) -> CliResult {
    let stats = library.stats()?;
    println!(
        "{} media, {} classes, {} tags, {} unlinked",
        format!("{}", stats.media).cyan(),
        format!("{}", stats.classes).cyan(),
        format!("{}", stats.tags).cyan(),
        format!("{}", stats.unlinked).yellow(),
    );
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
