use chrono::Utc;
use fairdice_shared::{AgentConfig, AgentState, BetResult, DiceError, DiceResult, Side};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::{
    observer::BetObserver,
    payout,
    predict::{predict, Prediction},
    rng::SeedPair,
    stats::{apply_bet, SettledBet},
};

/// First nonce used after construction or reset.
pub const INITIAL_NONCE: u64 = 1;

/// Why a scheduled bet was not placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardBlock {
    InsufficientBalance,
    ProfitGoalReached,
    MaxLossReached,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Placed(BetResult),
    Skipped(GuardBlock),
    Inactive,
}

pub fn is_win(side: Side, target: f64, roll: f64) -> bool {
    match side {
        Side::Over => roll > target,
        Side::Under => roll < target,
    }
}

/// Single owner of the betting state. Every call to [`BettingAgent::tick`]
/// is one complete transition; nothing is observable halfway through.
#[derive(Debug)]
pub struct BettingAgent {
    config: AgentConfig,
    seeds: SeedPair,
    nonce: u64,
    state: AgentState,
    active: bool,
    last_block: Option<GuardBlock>,
    // prediction jitter only, never used for rolls
    rng: StdRng,
}

impl BettingAgent {
    pub fn new(config: AgentConfig, seeds: SeedPair) -> DiceResult<Self> {
        config.validate()?;
        Ok(Self {
            state: AgentState::initial(&config),
            config,
            seeds,
            nonce: INITIAL_NONCE,
            active: false,
            last_block: None,
            rng: StdRng::from_entropy(),
        })
    }

    /// Replace the prediction RNG with a seeded one, for reproducible runs.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn seeds(&self) -> &SeedPair {
        &self.seeds
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) -> DiceResult<()> {
        self.config.validate()?;
        if !self.active {
            info!(
                balance = self.state.balance,
                nonce = self.nonce,
                "agent activated"
            );
        }
        self.active = true;
        self.state.is_training = true;
        Ok(())
    }

    pub fn deactivate(&mut self) {
        if self.active {
            info!(total_bets = self.state.total_bets, "agent deactivated");
        }
        self.active = false;
        self.state.is_training = false;
        self.last_block = None;
    }

    /// Back to the configuration-derived initial state, idle, nonce 1.
    pub fn reset(&mut self) {
        self.active = false;
        self.last_block = None;
        self.state = AgentState::initial(&self.config);
        self.nonce = INITIAL_NONCE;
        info!(balance = self.state.balance, "agent reset");
    }

    /// Takes effect from the next tick. Balance is left untouched.
    pub fn configure(&mut self, config: AgentConfig) -> DiceResult<()> {
        config.validate()?;
        info!(?config, "agent configured");
        self.config = config;
        Ok(())
    }

    pub fn set_seeds(&mut self, seeds: SeedPair) {
        info!(server_seed_hash = %seeds.server_seed_hash(), "seed pair replaced");
        self.seeds = seeds;
    }

    /// The first guard that currently forbids betting, if any.
    pub fn guard(&self) -> Option<GuardBlock> {
        let cfg = &self.config;
        let balance = self.state.balance;
        if balance < cfg.wager_size {
            Some(GuardBlock::InsufficientBalance)
        } else if cfg.profit_goal != 0.0 && balance >= cfg.starting_balance + cfg.profit_goal {
            Some(GuardBlock::ProfitGoalReached)
        } else if cfg.max_loss != 0.0 && balance <= cfg.starting_balance - cfg.max_loss {
            Some(GuardBlock::MaxLossReached)
        } else {
            None
        }
    }

    /// One scheduler tick: bet if active and every guard passes.
    pub fn tick(&mut self, observer: &mut dyn BetObserver) -> DiceResult<TickOutcome> {
        if !self.active {
            return Ok(TickOutcome::Inactive);
        }
        if let Some(block) = self.guard() {
            if self.last_block != Some(block) {
                info!(?block, balance = self.state.balance, "betting paused");
                self.last_block = Some(block);
            }
            return Ok(TickOutcome::Skipped(block));
        }
        if self.last_block.take().is_some() {
            info!(balance = self.state.balance, "betting resumed");
        }
        self.execute_bet(observer).map(TickOutcome::Placed)
    }

    /// Predict from history, then place the bet. Guards are not consulted.
    pub fn execute_bet(&mut self, observer: &mut dyn BetObserver) -> DiceResult<BetResult> {
        let prediction = predict(
            &self.state.learning_data,
            self.config.win_chance_target,
            &mut self.rng,
        );
        self.place_bet(prediction, observer)
    }

    /// Resolve a bet for the given prediction at the current nonce, update the
    /// statistics, publish, and advance the nonce.
    ///
    /// The profit and loss guards are not consulted, but a wager the balance
    /// cannot cover is refused before anything changes.
    pub fn place_bet(
        &mut self,
        prediction: Prediction,
        observer: &mut dyn BetObserver,
    ) -> DiceResult<BetResult> {
        let wager = self.config.wager_size;
        if self.state.balance < wager {
            return Err(DiceError::InsufficientBalance {
                balance: self.state.balance,
                wager,
            });
        }
        let roll = self.seeds.roll(self.nonce);
        let won = is_win(prediction.side, prediction.target, roll);
        let gross = payout::settle(prediction.side, prediction.target, won, wager)?;

        let settled = SettledBet {
            prediction,
            roll,
            won,
            wager,
            payout: gross,
        };
        apply_bet(
            &mut self.state,
            self.config.starting_balance,
            &settled,
            Utc::now(),
        );

        let result = BetResult {
            nonce: self.nonce,
            roll,
            prediction: prediction.side,
            target: prediction.target,
            won,
            payout: settled.net(),
            new_balance: self.state.balance,
        };
        debug!(
            nonce = self.nonce,
            roll,
            side = %prediction.side,
            target = prediction.target,
            won,
            balance = self.state.balance,
            "bet resolved"
        );

        observer.on_state_update(&self.state);
        observer.on_bet_result(&result);
        self.nonce += 1;
        Ok(result)
    }
}
