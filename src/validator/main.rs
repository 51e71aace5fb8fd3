//! Standalone validator for schedule and catalog files.
//!
//! This tool validates the YAML documents of the auto texter, checks that
//! every referenced media file exists, and warns about registry entries
//! that no longer match the catalogs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use telegram_auto_texter::config::{MediaCatalog, ScheduleConfig, StickerCatalog};
use telegram_auto_texter::registry::Registry;
use telegram_auto_texter::scheduler::entries_for;

/// Schedule and catalog validator.
#[derive(Parser, Debug)]
#[command(name = "validate_catalog")]
#[command(about = "Validates schedule and catalog files for the auto texter")]
#[command(version)]
struct Args {
    /// Directory holding schedule.yaml, media.yaml, stickers.yaml and the
    /// media files.
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Show each configured item while validating.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut errors = 0usize;
    let mut warnings = 0usize;

    println!("Validating data directory: {}\n", args.data_dir.display());

    let schedule = check_schedule(&args.data_dir.join("schedule.yaml"), args.verbose, &mut errors);
    let media = check_media_catalog(
        &args.data_dir.join("media.yaml"),
        &args.data_dir.join("media"),
        args.verbose,
        &mut errors,
        &mut warnings,
    );
    check_sticker_catalog(
        &args.data_dir.join("stickers.yaml"),
        &args.data_dir.join("media"),
        args.verbose,
        &mut errors,
        &mut warnings,
    );

    if let (Some(schedule), Some(media)) = (&schedule, &media) {
        check_registry(
            &args.data_dir.join("register.yaml"),
            media,
            &mut warnings,
        );
        report_schedule_summary(schedule);
    }

    println!();
    if errors == 0 {
        println!("✓ Validation passed ({warnings} warning(s))");
        ExitCode::SUCCESS
    } else {
        println!("✗ Validation failed: {errors} error(s), {warnings} warning(s)");
        ExitCode::FAILURE
    }
}

fn check_schedule(path: &Path, verbose: bool, errors: &mut usize) -> Option<ScheduleConfig> {
    println!("Schedule: {}", path.display());

    let schedule = match ScheduleConfig::load_from_file(path) {
        Ok(s) => s,
        Err(e) => {
            println!("  ✗ {e}");
            *errors += 1;
            return None;
        }
    };

    if let Err(e) = schedule.validate() {
        println!("  ✗ {e}");
        *errors += 1;
        return None;
    }

    if verbose {
        for (name, user) in &schedule.users {
            let marker = if *name == schedule.recipient { "→" } else { " " };
            println!("  {marker} {name} (chat {})", user.chat_id);
        }
    }

    println!("  ✓ {} user(s), recipient '{}'", schedule.users.len(), schedule.recipient);
    Some(schedule)
}

fn check_media_catalog(
    path: &Path,
    media_dir: &Path,
    verbose: bool,
    errors: &mut usize,
    warnings: &mut usize,
) -> Option<MediaCatalog> {
    println!("Media catalog: {}", path.display());

    let catalog = match MediaCatalog::load_from_file(path) {
        Ok(c) => c,
        Err(e) => {
            println!("  ✗ {e}");
            *errors += 1;
            return None;
        }
    };

    if let Err(e) = catalog.validate() {
        println!("  ✗ {e}");
        *errors += 1;
        return None;
    }

    for (pool, items) in catalog.pools() {
        if items.is_empty() {
            println!("  ⚠ Pool '{pool}' is empty");
            *warnings += 1;
        }
        for item in items {
            let file = media_dir.join(&item.path);
            if verbose {
                println!("  [{pool}/{}] {}", item.uid, item.path.display());
            }
            if !file.is_file() {
                println!("  ✗ [{pool}/{}] missing file: {}", item.uid, file.display());
                *errors += 1;
            }
        }
    }

    println!(
        "  ✓ {} morning / {} afternoon item(s)",
        catalog.morning_media.len(),
        catalog.afternoon_media.len()
    );
    Some(catalog)
}

fn check_sticker_catalog(
    path: &Path,
    media_dir: &Path,
    verbose: bool,
    errors: &mut usize,
    warnings: &mut usize,
) {
    println!("Sticker catalog: {}", path.display());

    let catalog = match StickerCatalog::load_from_file(path) {
        Ok(c) => c,
        Err(e) => {
            println!("  ✗ {e}");
            *errors += 1;
            return;
        }
    };

    if let Err(e) = catalog.validate() {
        println!("  ✗ {e}");
        *errors += 1;
        return;
    }

    if catalog.morning_stickers.is_empty() {
        println!("  ⚠ No morning stickers configured; greetings go out without one");
        *warnings += 1;
    }

    for sticker in &catalog.morning_stickers {
        let file = media_dir.join(&sticker.path);
        if verbose {
            println!("  [{}] {}", sticker.uid, sticker.path.display());
        }
        if !file.is_file() {
            println!("  ✗ [{}] missing file: {}", sticker.uid, file.display());
            *errors += 1;
        }
    }

    println!("  ✓ {} sticker(s)", catalog.morning_stickers.len());
}

fn check_registry(path: &Path, media: &MediaCatalog, warnings: &mut usize) {
    if !path.exists() {
        return;
    }

    println!("Registry: {}", path.display());

    let registry = match Registry::load(path) {
        Ok(r) => r,
        Err(e) => {
            // A broken registry is recoverable by deleting it, so only warn.
            println!("  ⚠ {e}");
            *warnings += 1;
            return;
        }
    };

    for (pool, items) in media.pools() {
        let known: Vec<u32> = items.iter().map(|i| i.uid).collect();
        for uid in registry.sent_uids(pool) {
            if !known.contains(&uid) {
                println!("  ⚠ Pool '{pool}' has sent uid {uid} not present in the catalog");
                *warnings += 1;
            }
        }
        let stats = registry.stats(pool, items.len());
        println!("  ✓ {pool}: {} of {} remaining", stats.remaining, stats.total);
    }
}

fn report_schedule_summary(schedule: &ScheduleConfig) {
    let Ok(user) = schedule.recipient_schedule() else {
        return;
    };

    let entries = entries_for(user);
    if entries.is_empty() {
        println!("  ⚠ Recipient has no scheduled sends configured");
    } else {
        println!("  ✓ {} scheduled action(s) for '{}'", entries.len(), schedule.recipient);
    }
}
