//! Headless skirmish runner.
//!
//! # Usage
//!
//! ```bash
//! # AI vs AI in one world
//! cargo run -p skirmish_headless -- solo --player hard --enemy normal
//!
//! # Two peers over a lossy-ordered link
//! cargo run -p skirmish_headless -- duel --latency-ms 120 --jitter-ms 200 --seed 7
//!
//! # Same match five times, compare final hashes
//! cargo run -p skirmish_headless -- verify --runs 5
//! ```

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use skirmish_client::logging::LogFormat;
use skirmish_client::transport::LinkProfile;
use skirmish_core::ai::Difficulty;
use skirmish_headless::{run_duel, run_solo, verify_determinism, DuelSettings, SoloSettings};

#[derive(Parser)]
#[command(name = "skirmish_headless")]
#[command(about = "Headless skirmish runner for AI testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log line format: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct MatchArgs {
    /// RON match configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// AI difficulty for the player team
    #[arg(long, default_value = "normal")]
    player: Difficulty,

    /// AI difficulty for the enemy team
    #[arg(long, default_value = "normal")]
    enemy: Difficulty,

    /// Match time limit in minutes
    #[arg(long, default_value = "10")]
    minutes: u64,

    /// Simulated frame length in milliseconds
    #[arg(long, default_value = "16")]
    frame_ms: u64,

    /// Also write the report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Two AIs in a single world
    Solo(MatchArgs),

    /// Two reconciling peers over an in-process link
    Duel {
        #[command(flatten)]
        game: MatchArgs,

        /// One-way link latency in milliseconds
        #[arg(long, default_value = "80")]
        latency_ms: u64,

        /// Extra random delay per message in milliseconds; reorders traffic
        #[arg(long, default_value = "40")]
        jitter_ms: u64,

        /// Seed for the jitter sequence
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Time allowed for traffic to drain after the match, in milliseconds
        #[arg(long, default_value = "5000")]
        settle_ms: u64,
    },

    /// Run the same solo match several times and compare final hashes
    Verify {
        #[command(flatten)]
        game: MatchArgs,

        /// Number of runs
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    skirmish_client::logging::init(cli.log_format, level);

    match cli.command {
        Commands::Solo(game) => {
            let settings = solo_settings(&game);
            let report = run_solo(&settings);
            emit(&report, game.output.as_deref());
        }
        Commands::Duel {
            game,
            latency_ms,
            jitter_ms,
            seed,
            settle_ms,
        } => {
            let settings = DuelSettings {
                solo: solo_settings(&game),
                profile: LinkProfile {
                    latency_ms,
                    jitter_ms,
                    seed,
                },
                settle_ms,
                ..DuelSettings::default()
            };
            let report = run_duel(&settings);
            emit(&report, game.output.as_deref());
            if !report.winners_agree {
                eprintln!("FAIL: peers disagree on the winner");
                std::process::exit(1);
            }
        }
        Commands::Verify { game, runs } => {
            let settings = solo_settings(&game);
            match verify_determinism(&settings, runs) {
                Ok(hash) => eprintln!("PASS: {runs} runs ended with hash {hash:016x}"),
                Err(e) => {
                    eprintln!("FAIL: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

fn solo_settings(game: &MatchArgs) -> SoloSettings {
    let config = match skirmish_headless::load_config(game.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    SoloSettings {
        config,
        player: game.player,
        enemy: game.enemy,
        max_ms: game.minutes.saturating_mul(60_000),
        frame_ms: game.frame_ms,
    }
}

fn emit<T: Serialize>(report: &T, output: Option<&Path>) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to encode report: {e}");
            std::process::exit(1);
        }
    }
    if let Some(path) = output {
        if let Err(e) = skirmish_headless::save(report, path) {
            eprintln!("Failed to save report: {e}");
            std::process::exit(1);
        }
        eprintln!("Report saved to: {}", path.display());
    }
}
