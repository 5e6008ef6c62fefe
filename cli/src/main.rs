//! `fatinject`: write the boot files into a FAT12 disk image.

mod args;
mod image_file;
mod logger;
mod source;

use args::{Args, ArgsError, USAGE};
use fatinject_core::{inject, FatConfig, Manifest};
use image_file::ImageFile;
use source::DirectorySource;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

const FATAL_ERROR: u8 = 1;
const USAGE_ERROR: u8 = 2;

fn load_manifest(path: Option<&Path>) -> Result<Manifest, String> {
    match path {
        None => Manifest::boot_image().map_err(|e| format!("built-in manifest: {}", e)),
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot read manifest {}: {}", path.display(), e))?;
            Manifest::parse(&text).map_err(|e| format!("{}: {}", path.display(), e))
        }
    }
}

fn run(args: &Args) -> Result<usize, String> {
    let config = FatConfig::BOOT_DISK;

    // A bad manifest must not touch the image
    let manifest = load_manifest(args.manifest.as_deref())?;
    manifest
        .check_placeholders(config.geometry().max_file_size())
        .map_err(|e| e.to_string())?;
    log::debug!("{} manifest entries", manifest.len());

    let mut image = ImageFile::open(&args.image, config.sector_size).map_err(|e| e.to_string())?;
    let mut source = DirectorySource::new(&args.root);
    log::debug!("sources under {}", source.root().display());

    let report = inject(&mut image, &config, &manifest, &mut source)
        .map_err(|e| format!("{}: {}", args.image.display(), e))?;

    if !report.skipped.is_empty() {
        log::warn!("{} manifest entries skipped", report.skipped.len());
    }
    log::debug!("next free cluster {}", report.next_cluster.cluster());
    Ok(report.injected_count())
}

fn main() -> ExitCode {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(ArgsError::Help) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("fatinject: {}", e);
            eprintln!("Try 'fatinject --help' for more information.");
            return ExitCode::from(USAGE_ERROR);
        }
    };

    if let Err(e) = logger::init(args.level) {
        eprintln!("fatinject: {}", e);
    }

    let result = run(&args);
    match &result {
        Ok(count) => println!("{}", summary(*count, &args.image)),
        Err(e) => log::error!("{}", e),
    }
    ExitCode::from(exit_status(&result))
}

fn exit_status(result: &Result<usize, String>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => FATAL_ERROR,
    }
}

fn summary(count: usize, image: &Path) -> String {
    format!("Injected {} file(s) into {}", count, image.display())
}
