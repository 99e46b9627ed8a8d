//! CLI command definitions and handlers.
//!
//! Each subcommand is implemented as a function that takes the parsed
//! arguments and returns an `anyhow::Result<()>`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::album;
use crate::coerce;
use crate::collab::{self, Collaborators};
use crate::complex;
use crate::config::{self, Overrides, RunConfig};
use crate::report::{AlbumReport, ReportFormat, RunReport, Verdict};
use crate::scanner;

/// Cue Minder CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every run.
#[derive(Args)]
pub struct RunArgs {
    /// Directory to process (an artist/collection directory, or a single
    /// album with --single-album)
    pub path: PathBuf,
    /// Treat the directory itself as one album
    #[arg(long)]
    pub single_album: bool,
    /// Override the album artist
    #[arg(long)]
    pub artist: Option<String>,
    /// Override the album title (requires --single-album)
    #[arg(long)]
    pub album: Option<String>,
    /// Override the composer (implies --unify-composer)
    #[arg(long)]
    pub composer: Option<String>,
    /// Override the release year
    #[arg(long)]
    pub year: Option<i32>,
    /// Override the genre
    #[arg(long)]
    pub genre: Option<String>,
    /// Reconcile the composer field as well
    #[arg(long)]
    pub unify_composer: bool,
    /// Disable title capitalization (for non-English libraries)
    #[arg(long)]
    pub no_cap: bool,
    /// Skip replay-gain verification and computation
    #[arg(long)]
    pub skip_replaygain: bool,
    /// Minimum audio files for a directory to count as an album
    #[arg(long)]
    pub min_tracks: Option<usize>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a collection and report pending corrections
    Scan {
        #[command(flatten)]
        args: RunArgs,
        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Apply the planned corrections
    Coerce {
        #[command(flatten)]
        args: RunArgs,
        /// Apply without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the config file location
    Config {
        /// Write a default config file if none exists yet
        #[arg(long)]
        init: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Scan { args, format } => {
            let format = match format.as_str() {
                "json" => ReportFormat::Json,
                "text" => ReportFormat::Text,
                other => bail!("unknown format '{other}' (expected text or json)"),
            };
            cmd_scan(args, format)
        }
        Commands::Coerce { args, yes } => cmd_coerce(args, *yes),
        Commands::Config { init } => cmd_config(*init),
    }
}

fn cmd_config(init: bool) -> anyhow::Result<()> {
    let Some(path) = config::config_path() else {
        bail!("could not determine the config directory");
    };
    if path.exists() {
        println!("{}", path.display());
        return Ok(());
    }
    if init {
        config::save(&config::FileConfig::default())?;
        println!("Wrote defaults to {}", path.display());
    } else {
        println!("{} (not created yet, use --init)", path.display());
    }
    Ok(())
}

fn build_run_config(args: &RunArgs) -> anyhow::Result<RunConfig> {
    if !args.path.is_dir() {
        bail!("{} is not a directory", args.path.display());
    }
    let file = config::load();
    let run = RunConfig::merge(
        &file,
        args.path.clone(),
        args.single_album,
        args.no_cap,
        args.unify_composer,
        args.skip_replaygain,
        args.min_tracks,
        Overrides {
            artist: args.artist.clone(),
            album: args.album.clone(),
            composer: args.composer.clone(),
            year: args.year,
            genre: args.genre.clone(),
        },
    )?;
    Ok(run)
}

/// The album directories a run covers. In single-album mode the base
/// directory is the one album (or one complex album); otherwise its
/// children are classified.
struct RunTargets {
    albums: Vec<PathBuf>,
    complex_albums: Vec<PathBuf>,
    unclassified: Vec<String>,
}

fn collect_targets(run: &RunConfig) -> anyhow::Result<RunTargets> {
    if run.single_album {
        if scanner::can_be_complex_album(&run.base_dir, run.min_tracks, true) {
            return Ok(RunTargets {
                albums: vec![],
                complex_albums: vec![run.base_dir.clone()],
                unclassified: vec![],
            });
        }
        if !scanner::can_be_album(&run.base_dir, run.min_tracks, true) {
            bail!(
                "{} does not hold enough audio files to be an album",
                run.base_dir.display()
            );
        }
        return Ok(RunTargets {
            albums: vec![run.base_dir.clone()],
            complex_albums: vec![],
            unclassified: vec![],
        });
    }
    let scan = scanner::scan_collection(&run.base_dir, run.min_tracks)?;
    Ok(RunTargets {
        albums: scan.albums,
        complex_albums: scan.complex_albums,
        unclassified: scan
            .unclassified
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
    })
}

fn analyze_all(
    run: &RunConfig,
    collaborators: &Collaborators,
    targets: &RunTargets,
) -> anyhow::Result<RunReport> {
    let mut reports = Vec::new();
    for dir in &targets.albums {
        let analyzed = album::analyze(run, collaborators, dir)?;
        reports.push(AlbumReport::from_album(&analyzed));
    }
    Ok(RunReport::new(
        reports,
        targets
            .complex_albums
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        targets.unclassified.clone(),
    ))
}

fn cmd_scan(args: &RunArgs, format: ReportFormat) -> anyhow::Result<()> {
    let run = build_run_config(args)?;
    let collaborators = Collaborators::live();
    let targets = collect_targets(&run)?;
    let report = analyze_all(&run, &collaborators, &targets)?;
    print!("{}", report.render(format));
    Ok(())
}

fn cmd_coerce(args: &RunArgs, yes: bool) -> anyhow::Result<()> {
    let missing = collab::missing_tools(collab::REQUIRED_TOOLS);
    if !missing.is_empty() {
        eprintln!("Missing required tools: {}", missing.join(", "));
        eprintln!("Install them:");
        eprintln!("  macOS: brew install ffmpeg flac mp3gain");
        eprintln!("  Linux: apt install ffmpeg flac mp3gain");
        bail!("cannot apply corrections without them");
    }

    let run = build_run_config(args)?;
    let collaborators = Collaborators::live();
    let mut targets = collect_targets(&run)?;

    let report = analyze_all(&run, &collaborators, &targets)?;
    print!("{}", report.render(ReportFormat::Text));
    if report.verdict == Verdict::AllOk {
        return Ok(());
    }
    if !yes && !confirm("Apply these corrections?") {
        println!("Nothing changed.");
        return Ok(());
    }

    // Multi-disc directories are flattened first; the flat results join
    // the album list and get the normal treatment.
    for dir in std::mem::take(&mut targets.complex_albums) {
        let plan = complex::plan(&run, &dir)?;
        for diag in &plan.diagnostics {
            println!("  ! {diag}");
        }
        complex::apply(&plan)?;
        let flat_dir = plan.rename_dir_to.unwrap_or(plan.album_dir);
        println!("FLATTENED {}", flat_dir.display());
        targets.albums.push(flat_dir);
    }

    let mut coerced = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;
    for dir in &targets.albums {
        let analyzed = album::analyze(&run, &collaborators, dir)?;
        if analyzed.is_critical() {
            println!("SKIPPED  {} (needs manual attention)", dir.display());
            skipped += 1;
            continue;
        }
        if !analyzed.has_something_to_do() {
            continue;
        }
        let outcome = coerce::coerce_album(&run, &collaborators, &analyzed)?;
        for failure in &outcome.failures {
            eprintln!("  ! {failure}");
        }
        if !outcome.failures.is_empty() || outcome.unresolved > 0 {
            println!(
                "PARTIAL  {} ({} unresolved)",
                outcome.final_dir.display(),
                outcome.unresolved
            );
            failed += 1;
        } else {
            println!("FIXED    {}", outcome.final_dir.display());
            coerced += 1;
        }
    }

    info!(coerced, failed, skipped, "apply pass finished");
    println!("\n{coerced} fixed, {failed} partial, {skipped} skipped");
    Ok(())
}

fn confirm(question: &str) -> bool {
    print!("{question} [y/N] ");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "y" | "Y" | "yes")
}
