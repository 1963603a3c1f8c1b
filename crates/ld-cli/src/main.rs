//! LuckyDraw terminal front end
//!
//! Usage:
//!   luckydraw draw [--times N]        - Draw and award prizes
//!   luckydraw status                  - Show tiers and stock
//!   luckydraw settings [...]          - Change anticipation / logo
//!   luckydraw tier add|update|remove  - Edit prize tiers
//!   luckydraw export <file>           - Save settings document
//!   luckydraw import <file>           - Load settings document
//!   luckydraw check                   - Report unreachable tiers

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ld_core::{MAX_PROBABILITY, MAX_TIER_COUNT, SettingsPatch};
use ld_draw::{DrawEngine, DrawOutcome, tier_reachability};
use ld_state::{
    DrawReport, DrawSession, FileKvStore, ImportMode, ResultConfigPatch, SessionState, TierPatch,
    TierStore,
};

#[derive(Parser)]
#[command(name = "luckydraw", about = "Weighted prize draw with persistent tiers")]
struct Cli {
    /// Storage file (defaults to the platform config directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Seed the draw for reproducible results
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw and award prizes
    Draw {
        /// Number of draws
        #[arg(short, long, default_value_t = 1)]
        times: u32,
    },
    /// Show settings, tiers and stock
    Status,
    /// Change settings
    Settings {
        /// Anticipation length in seconds
        #[arg(long)]
        anticipation: Option<f64>,
        /// Header logo URL
        #[arg(long)]
        logo: Option<String>,
    },
    /// Edit prize tiers
    Tier {
        #[command(subcommand)]
        action: TierAction,
    },
    /// Show or hide the result tally
    ToggleResults,
    /// Restore factory settings and tiers
    Reset,
    /// Write settings and tiers to a document
    Export {
        /// Output file
        #[arg(default_value = ld_state::DOCUMENT_FILE_NAME)]
        file: PathBuf,
    },
    /// Load settings and tiers from a document
    Import {
        file: PathBuf,
        /// Replace the tier list instead of merging by id
        #[arg(long)]
        replace: bool,
    },
    /// Report competitive probability and unreachable tiers
    Check,
}

#[derive(Subcommand)]
enum TierAction {
    /// Append a tier with default weight and stock
    Add,
    /// Change a tier
    Update {
        id: String,
        /// Weight in percent
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_PROBABILITY)))]
        probability: Option<u32>,
        /// Total stock
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_TIER_COUNT)))]
        count: Option<u32>,
        /// Prizes already handed out; capped at the stock
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_TIER_COUNT)))]
        won_count: Option<u32>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        modal_text: Option<String>,
    },
    /// Remove a tier (first and consolation are protected)
    Remove { id: String },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let backend = match &cli.store {
        Some(path) => FileKvStore::open(path)
            .with_context(|| format!("Failed to open storage {}", path.display()))?,
        None => FileKvStore::open_default().with_context(|| {
            format!("Failed to open storage {}", FileKvStore::default_path().display())
        })?,
    };
    log::debug!("Using storage {}", backend.path().display());
    let mut store = TierStore::open(backend);

    match cli.command {
        Commands::Draw { times } => run_draws(store, cli.seed, times, cli.json),
        Commands::Status => {
            print_status(&store);
            Ok(())
        }
        Commands::Settings { anticipation, logo } => {
            store
                .update_settings(SettingsPatch {
                    anticipation_duration: anticipation,
                    logo_url: logo,
                })
                .context("Failed to save settings")?;
            print_status(&store);
            Ok(())
        }
        Commands::Tier { action } => run_tier_action(&mut store, action),
        Commands::ToggleResults => {
            let shown = store.toggle_results_visibility()?;
            println!("Results {}", if shown { "shown" } else { "hidden" });
            Ok(())
        }
        Commands::Reset => {
            store.reset().context("Failed to reset")?;
            println!("Settings and tiers restored to defaults");
            Ok(())
        }
        Commands::Export { file } => {
            store
                .export_document()
                .save(&file)
                .with_context(|| format!("Failed to write {}", file.display()))?;
            println!("Exported to {}", file.display());
            Ok(())
        }
        Commands::Import { file, replace } => {
            let mode = if replace { ImportMode::Replace } else { ImportMode::Merge };
            let json = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            store
                .import_json(&json, mode)
                .context("Settings document rejected")?;
            println!("Imported {}", file.display());
            print_status(&store);
            Ok(())
        }
        Commands::Check => {
            run_check(&store);
            Ok(())
        }
    }
}

fn run_draws(store: TierStore, seed: Option<u64>, times: u32, json: bool) -> Result<()> {
    let engine = match seed {
        Some(seed) => DrawEngine::seeded(seed),
        None => DrawEngine::new(),
    };
    let session = DrawSession::with_engine(store.into_shared(), engine);

    for _ in 0..times {
        if session.state() == SessionState::Completed {
            println!("All prizes have been distributed");
            break;
        }
        let report = session.draw().context("Draw failed")?;
        if json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            print_report(&report);
        }
    }

    if !json {
        let stats = session.stats();
        log::info!(
            "{} draws, {} prizes, {} without prize",
            stats.total_draws,
            stats.total_draws - stats.no_prize,
            stats.no_prize
        );
    }
    Ok(())
}

fn print_report(report: &DrawReport) {
    match (&report.outcome, &report.cue) {
        (DrawOutcome::Prize(id), Some(cue)) => {
            let mark = if cue.grand { "★ " } else { "" };
            println!("{mark}{} ({id})", cue.modal_text);
            for sound in &cue.sounds {
                println!("    ♪ {} @ {:.0}%", sound.url, sound.gain * 100.0);
            }
            if !report.committed {
                println!("    (not recorded: tier ran out)");
            }
        }
        (DrawOutcome::Prize(id), None) => println!("{id}"),
        (DrawOutcome::NoPrize, _) => println!("No prize"),
    }
}

fn run_tier_action(store: &mut TierStore, action: TierAction) -> Result<()> {
    match action {
        TierAction::Add => {
            let id = store.add_tier()?;
            println!("Added tier {id}");
        }
        TierAction::Update {
            id,
            probability,
            count,
            won_count,
            title,
            modal_text,
        } => {
            let config = (title.is_some() || modal_text.is_some()).then(|| ResultConfigPatch {
                title,
                modal_text,
                ..Default::default()
            });
            store.update_tier(
                &id,
                TierPatch {
                    probability,
                    count,
                    won_count,
                    config,
                },
            )?;
            println!("Updated tier {id}");
        }
        TierAction::Remove { id } => {
            let removed = store.remove_tier(&id)?;
            println!("Removed tier {} ({})", removed.id, removed.config.title);
        }
    }
    print_status(store);
    Ok(())
}

fn print_status(store: &TierStore) {
    let settings = store.settings();
    println!("Anticipation: {:.1}s", settings.anticipation_duration);
    println!("Logo:         {}", settings.logo_url);
    println!(
        "Results:      {}",
        if store.show_results() { "shown" } else { "hidden" }
    );
    println!();
    for tier in store.display_order() {
        let weight = if tier.is_consolation() {
            "fallback".to_string()
        } else {
            format!("{}%", tier.probability)
        };
        println!(
            "  {:<16} {:<10} {:>8}  {:>3} / {:<3}{}",
            tier.id,
            tier.config.title,
            weight,
            tier.won_count,
            tier.count,
            if tier.is_exhausted() { "  (out)" } else { "" }
        );
    }
    if store.all_exhausted() {
        println!();
        println!("All prizes have been distributed");
    }
}

fn run_check(store: &TierStore) {
    let total = store.competitive_probability_total();
    println!("Competitive probability: {total}%");
    if total < MAX_PROBABILITY {
        println!("Remaining {}% falls through to consolation", MAX_PROBABILITY - total);
    }

    let unreachable: Vec<_> = tier_reachability(store.tiers())
        .into_iter()
        .filter(|range| !range.is_reachable())
        .collect();
    if unreachable.is_empty() {
        println!("Every competing tier can be drawn");
    } else {
        for range in unreachable {
            println!(
                "Tier {} can never be drawn (range {:.0}-{:.0}%)",
                range.id, range.start, range.end
            );
        }
    }
}
