use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use valorant_stats::config::AppConfig;
use valorant_stats::convert::convert_path;
use valorant_stats::pipeline::{rank_players, run_build};
use valorant_stats::storage::{read_player, read_players};

#[derive(Parser)]
#[command(name = "valorant-stats")]
#[command(about = "Career and series statistics for Valorant match files")]
#[command(version)]
struct Cli {
    /// Path to configuration file (defaults are used if it does not exist)
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Match files directory (overrides config)
    #[arg(long)]
    matches_dir: Option<PathBuf>,

    /// Output directory (overrides config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate all match files and write site data
    Build,

    /// Convert raw client captures into match files
    Convert {
        /// Capture file or directory of captures
        input: PathBuf,

        /// Output file, or directory for `converted_<name>` files
        output: PathBuf,
    },

    /// Show players ranked by career rating
    Leaderboard {
        /// Number of players to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show one player's career
    Player {
        /// Player name
        name: String,

        /// Number of recent maps to show
        #[arg(long, default_value = "10")]
        history: usize,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let path = cli.config.exists().then_some(cli.config.as_path());
    let mut config = AppConfig::load(path)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    if let Some(dir) = &cli.matches_dir {
        config.matches_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    Ok(config)
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_tracing(&config.log_level, cli.json_logs);
    tracing::info!("Starting valorant-stats v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Build => {
            let report = run_build(&config)?;

            println!("\n=== Build Results ===");
            println!("Maps loaded:      {}", report.files);
            println!("Series written:   {}", report.series);
            println!("Players written:  {}", report.players);
            if let Some(featured) = &report.featured {
                println!("Featured series:  {}", featured);
            }
            println!("Output:           {:?}", config.output_dir);
        }

        Commands::Convert { input, output } => {
            let summary = convert_path(&input, &output)
                .with_context(|| format!("Failed to convert {:?}", input))?;

            println!("\n=== Conversion Results ===");
            println!("Converted:        {}", summary.converted);
            println!("Failed:           {}", summary.failed);
            println!("Output:           {:?}", output);
            println!("\nNote: nationality is set to 'cn'; kast, fd and round history are placeholders.");
        }

        Commands::Leaderboard { limit } => {
            let players = read_players(&config.storage())?;
            if players.is_empty() {
                println!("No players found. Run `valorant-stats build` first.");
                return Ok(());
            }

            println!(
                "{:<4} {:<20} {:<20} {:>6} {:>5} {:>5} {:>5} {:>6}",
                "#", "Player", "Team", "Rating", "ACS", "ADR", "K/D", "Maps"
            );
            for (rank, p) in rank_players(players, limit).iter().enumerate() {
                println!(
                    "{:<4} {:<20} {:<20} {:>6.2} {:>5} {:>5} {:>5.2} {:>6}",
                    rank + 1,
                    p.name,
                    p.current_team,
                    p.rates.rating,
                    p.rates.acs,
                    p.rates.adr,
                    p.rates.kd,
                    p.matches
                );
            }
        }

        Commands::Player { name, history } => {
            let Some(p) = read_player(&config.storage(), &name)? else {
                bail!("Player not found: {}", name);
            };

            println!("=== {} ({}) ===", p.name, p.nationality);
            println!("Team:             {}", p.current_team);
            println!(
                "Maps:             {} ({} wins, {:.0}%)",
                p.matches,
                p.wins,
                p.rates.win_rate * 100.0
            );
            println!("Rounds:           {}", p.rounds_played);
            println!("Rating:           {:.2}", p.rates.rating);
            println!("ACS / ADR:        {} / {}", p.rates.acs, p.rates.adr);
            println!("K / D / A:        {} / {} / {}", p.k, p.d, p.a);
            println!("K/D:              {:.2}", p.rates.kd);
            println!("KAST / HS%:       {}% / {}%", p.rates.kast, p.rates.hs_percent);
            println!("FK / FD:          {} / {}", p.fk, p.fd);

            if !p.top_agents.is_empty() {
                println!("\nTop agents:");
                for agent in &p.top_agents {
                    println!(
                        "  {:<12} {:>3} maps  rating {:.2}  acs {}  k/d {:.2}  adr {}",
                        agent.agent, agent.use_count, agent.rating, agent.acs, agent.kd, agent.adr
                    );
                }
            }

            if !p.history.is_empty() {
                println!("\nRecent maps:");
                for entry in p.history.iter().take(history) {
                    println!(
                        "  {:<10} {:<10} {:<20} vs {:<20} {:>8} {}",
                        entry.date,
                        entry.map,
                        entry.team,
                        entry.opponent_team,
                        entry.score,
                        if entry.is_win { "W" } else { "L" }
                    );
                }
            }
        }
    }

    Ok(())
}
