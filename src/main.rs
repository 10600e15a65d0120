use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use glasscat::{config, logging, source, sync, verify};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "glasscat", version, about = "Verify and fetch glass catalog (AGF) files")]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Location {
    /// Source manifest (JSON list of [name, sha256, url?, post_body?])
    #[arg(short, long)]
    manifest: Option<PathBuf>,
    /// Directory holding the catalog files
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify catalogs, downloading missing or corrupt ones
    Sync {
        #[command(flatten)]
        location: Location,
        /// Do not download anything
        #[arg(long)]
        offline: bool,
        /// Exit with an error if any catalog could not be verified
        #[arg(long)]
        strict: bool,
    },
    /// Verify catalogs without downloading (corrupt files are still removed)
    Verify {
        #[command(flatten)]
        location: Location,
        /// Exit with an error if any catalog could not be verified
        #[arg(long)]
        strict: bool,
    },
    /// Show catalog status without changing anything
    Status {
        #[command(flatten)]
        location: Location,
    },
    /// Print the SHA256 of files, for writing manifests
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let cfg = config::Config::load()?;

    match cli.command {
        Commands::Sync {
            location,
            offline,
            strict,
        } => sync_catalogs(&cfg, &location, offline, strict)?,
        Commands::Verify { location, strict } => sync_catalogs(&cfg, &location, true, strict)?,
        Commands::Status { location } => show_status(&cfg, &location)?,
        Commands::Hash { files } => hash_files(&files)?,
    }

    Ok(())
}

fn resolve(cfg: &config::Config, location: &Location) -> (PathBuf, PathBuf) {
    let manifest = location.manifest.clone().unwrap_or_else(|| cfg.manifest.clone());
    let dir = location.dir.clone().unwrap_or_else(|| cfg.source_dir.clone());
    (manifest, dir)
}

fn sync_catalogs(
    cfg: &config::Config,
    location: &Location,
    offline: bool,
    strict: bool,
) -> Result<()> {
    let (manifest, dir) = resolve(cfg, location);
    let sources = source::load_manifest(&manifest)?;

    println!(
        "{} Checking {} catalogs in {}...",
        "==>".green().bold(),
        sources.len(),
        dir.display()
    );

    let opts = sync::Options {
        extension: &cfg.extension,
        offline,
    };
    let report = sync::sync_sources(&sources, &dir, opts);

    for (src, status) in &report.entries {
        let label = match status {
            sync::Status::Present => status.to_string().green(),
            sync::Status::Downloaded => status.to_string().blue(),
            _ => status.to_string().red(),
        };
        println!("  {} {:<20} {}", "->".blue(), src.name.bold(), label);
    }

    let verified = report.verified();
    let dropped: Vec<_> = report.dropped().map(|(src, _)| src.name.as_str()).collect();

    println!(
        "{} {} of {} catalogs verified",
        "==>".green().bold(),
        verified.len(),
        sources.len()
    );

    if !dropped.is_empty() {
        println!("{} Unavailable: {}", "==>".yellow().bold(), dropped.join(", "));
        if strict {
            bail!("{} catalogs could not be verified", dropped.len());
        }
    }

    Ok(())
}

fn show_status(cfg: &config::Config, location: &Location) -> Result<()> {
    let (manifest, dir) = resolve(cfg, location);
    let sources = source::load_manifest(&manifest)?;

    if sources.is_empty() {
        println!("No sources in {}", manifest.display());
        return Ok(());
    }

    for src in &sources {
        let status = sync::inspect(src, &dir, &cfg.extension);
        let label = if status.is_verified() {
            status.to_string().green()
        } else {
            status.to_string().yellow()
        };
        let origin = match (&src.url, &src.post_body) {
            (Some(url), Some(_)) => format!("POST {}", url),
            (Some(url), None) => url.clone(),
            (None, _) => "local only".to_string(),
        };
        println!("{:<20} {:<10} {}", src.name.bold(), label, origin.dimmed());
    }
    Ok(())
}

fn hash_files(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let digest = verify::sha256_file(file)?;
        println!("{}  {}", digest, file.display());
    }
    Ok(())
}
