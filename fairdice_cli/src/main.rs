use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use fairdice_core::{
    hmac_hex, roll, verify_roll, verify_seed, win_rate, AgentEvent, AgentRunner, BettingAgent,
    ChannelObserver, RollSummary, SeedPair,
};
use fairdice_shared::{AgentConfig, AgentState, BetResult, RollRecord};
use tracing::{info, warn};

/// Bet results the driver keeps for display and export.
const BET_HISTORY_LIMIT: usize = 100;
/// Roll records the driver keeps for the summary.
const ROLL_HISTORY_LIMIT: usize = 50;

#[derive(Parser)]
#[command(name = "fairdice", about = "Provably fair dice roller and betting agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute rolls for a seed pair
    Roll {
        #[arg(long, env = "FAIRDICE_SERVER_SEED")]
        server_seed: String,
        #[arg(long, env = "FAIRDICE_CLIENT_SEED")]
        client_seed: String,
        #[arg(long, default_value_t = 1)]
        nonce: u64,
        /// Number of consecutive nonces to roll
        #[arg(long, default_value_t = 1)]
        count: u64,
    },
    /// Generate a fresh seed pair
    Seed,
    /// Check a claimed roll against its seeds
    Verify {
        #[arg(long)]
        server_seed: String,
        #[arg(long)]
        client_seed: String,
        #[arg(long)]
        nonce: u64,
        #[arg(long)]
        roll: f64,
    },
    /// Run the betting agent
    Train(TrainArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// JSON file with an agent config; flags below override it
    #[arg(long, env = "FAIRDICE_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "FAIRDICE_STARTING_BALANCE")]
    starting_balance: Option<f64>,
    #[arg(long, env = "FAIRDICE_WAGER")]
    wager: Option<f64>,
    /// 0 disables
    #[arg(long, env = "FAIRDICE_PROFIT_GOAL")]
    profit_goal: Option<f64>,
    /// 0 disables
    #[arg(long, env = "FAIRDICE_MAX_LOSS")]
    max_loss: Option<f64>,
    #[arg(long, env = "FAIRDICE_WIN_CHANCE")]
    win_chance: Option<f64>,
    /// Bets per second
    #[arg(long, env = "FAIRDICE_SPEED")]
    speed: Option<f64>,
    #[arg(long, env = "FAIRDICE_SERVER_SEED")]
    server_seed: Option<String>,
    #[arg(long, env = "FAIRDICE_CLIENT_SEED")]
    client_seed: Option<String>,
    /// Seed for the prediction jitter, for reproducible sessions
    #[arg(long)]
    rng_seed: Option<u64>,
    /// Stop after this many bets
    #[arg(long)]
    bets: Option<u64>,
    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,
    /// Write the retained bet results to a CSV file
    #[arg(long)]
    export_csv: Option<PathBuf>,
}

impl TrainArgs {
    fn agent_config(&self) -> anyhow::Result<AgentConfig> {
        let mut cfg = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => AgentConfig::default(),
        };
        if let Some(v) = self.starting_balance {
            cfg.starting_balance = v;
        }
        if let Some(v) = self.wager {
            cfg.wager_size = v;
        }
        if let Some(v) = self.profit_goal {
            cfg.profit_goal = v;
        }
        if let Some(v) = self.max_loss {
            cfg.max_loss = v;
        }
        if let Some(v) = self.win_chance {
            cfg.win_chance_target = v;
        }
        if let Some(v) = self.speed {
            cfg.training_speed = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    fn seeds(&self) -> SeedPair {
        let random = SeedPair::random();
        SeedPair::new(
            self.server_seed.clone().unwrap_or(random.server_seed),
            self.client_seed.clone().unwrap_or(random.client_seed),
        )
    }
}

fn push_bounded<T>(buf: &mut VecDeque<T>, item: T, limit: usize) {
    buf.push_back(item);
    while buf.len() > limit {
        buf.pop_front();
    }
}

fn print_bet(bet: &BetResult) {
    println!(
        "#{:>6} roll={:>6.2} {:<5} {:>5.1} {} net={:>+9.2} balance={:.2}",
        bet.nonce,
        bet.roll,
        bet.prediction,
        bet.target,
        if bet.won { "WIN " } else { "LOSS" },
        bet.payout,
        bet.new_balance
    );
}

fn print_summary(state: &AgentState, rolls: &VecDeque<RollRecord>) {
    let values: Vec<f64> = rolls.iter().map(|r| r.roll).collect();
    let summary = RollSummary::from_rolls(&values);
    println!("--- summary ---");
    println!(
        "bets={} wins={} losses={} win_rate={:.2}%",
        state.total_bets,
        state.wins,
        state.losses,
        win_rate(state)
    );
    println!("balance={:.2} roi={:+.2}%", state.balance, state.roi);
    println!(
        "streak={} longest_win={} longest_loss={}",
        state.current_streak, state.longest_win_streak, state.longest_loss_streak
    );
    println!(
        "strategy={} confidence={:.0}%",
        state.current_strategy, state.confidence
    );
    println!(
        "last {} rolls: avg={:.2} recent over={} under={}",
        summary.count, summary.average, summary.recent_over, summary.recent_under
    );
}

fn export_csv(path: &Path, bets: &VecDeque<BetResult>) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for bet in bets {
        wtr.serialize(bet)?;
    }
    wtr.flush()?;
    println!("Exported {} bets to {}", bets.len(), path.display());
    Ok(())
}

async fn train(args: TrainArgs) -> anyhow::Result<()> {
    let config = args.agent_config()?;
    let seeds = args.seeds();
    println!(
        "server_seed_hash={} client_seed={}",
        seeds.server_seed_hash(),
        seeds.client_seed
    );

    let mut agent = BettingAgent::new(config.clone(), seeds.clone())?;
    if let Some(seed) = args.rng_seed {
        agent = agent.with_rng_seed(seed);
    }
    let (observer, mut events) = ChannelObserver::new();
    let (handle, task) = AgentRunner::spawn(agent, observer);
    handle.activate().await?;
    info!(?config, "training started");

    let deadline = tokio::time::sleep(
        args.duration
            .map(Duration::from_secs)
            .unwrap_or(Duration::MAX / 4),
    );
    tokio::pin!(deadline);
    // a paused agent publishes nothing, so poll its guards
    let mut watchdog = tokio::time::interval(
        config
            .bet_period()
            .saturating_mul(4)
            .max(Duration::from_millis(250)),
    );

    let mut bets: VecDeque<BetResult> = VecDeque::new();
    let mut rolls: VecDeque<RollRecord> = VecDeque::new();
    let mut placed = 0u64;

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(AgentEvent::StateUpdated(_)) => {}
                    Some(AgentEvent::BetResolved(bet)) => {
                        placed += 1;
                        print_bet(&bet);
                        let record = RollRecord {
                            roll: bet.roll,
                            server_seed: seeds.server_seed.clone(),
                            client_seed: seeds.client_seed.clone(),
                            nonce: bet.nonce,
                            created_at: Utc::now(),
                        };
                        push_bounded(&mut rolls, record, ROLL_HISTORY_LIMIT);
                        push_bounded(&mut bets, bet, BET_HISTORY_LIMIT);
                        if args.bets.is_some_and(|limit| placed >= limit) {
                            info!(placed, "bet limit reached");
                            break;
                        }
                    }
                    None => {
                        warn!("agent task ended unexpectedly");
                        break;
                    }
                }
            }
            _ = &mut deadline => {
                info!("time limit reached");
                break;
            }
            _ = watchdog.tick() => {
                let status = handle.status().await?;
                if let Some(block) = status.blocked {
                    info!(?block, "agent paused by guard");
                    break;
                }
            }
        }
    }

    handle.deactivate().await?;
    let state = handle.snapshot().await?;
    handle.shutdown();
    task.await?;

    print_summary(&state, &rolls);
    if let Some(path) = &args.export_csv {
        export_csv(path, &bets)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Roll {
            server_seed,
            client_seed,
            nonce,
            count,
        } => {
            let seeds = SeedPair::new(server_seed, client_seed);
            println!("server_seed_hash={}", seeds.server_seed_hash());
            for n in nonce..nonce.saturating_add(count) {
                let rec = seeds.roll_record(n);
                println!(
                    "nonce={:>6} roll={:>6.2} hmac={}",
                    rec.nonce,
                    rec.roll,
                    hmac_hex(&seeds.server_seed, &seeds.client_seed, n)
                );
            }
        }
        Commands::Seed => {
            let seeds = SeedPair::random();
            println!("server_seed={}", seeds.server_seed);
            println!("server_seed_hash={}", seeds.server_seed_hash());
            println!("client_seed={}", seeds.client_seed);
        }
        Commands::Verify {
            server_seed,
            client_seed,
            nonce,
            roll: claimed,
        } => {
            if !verify_seed(&server_seed) {
                warn!("server seed is shorter than 64 characters");
            }
            let actual = roll(&server_seed, &client_seed, nonce);
            if !verify_roll(&server_seed, &client_seed, nonce, claimed) {
                bail!("roll mismatch: claimed {claimed:.2}, seeds produce {actual:.2}");
            }
            println!("OK: nonce {} rolls {:.2}", nonce, actual);
        }
        Commands::Train(args) => train(args).await?,
    }

    Ok(())
}
