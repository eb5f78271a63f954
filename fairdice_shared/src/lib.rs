use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder strategy text shown before the first bet resolves.
pub const INITIAL_STRATEGY: &str = "Ready to learn...";
/// Confidence reported before any prediction has been made.
pub const INITIAL_CONFIDENCE: f64 = 50.0;
/// Number of learning records the agent retains.
pub const LEARNING_HISTORY_LIMIT: usize = 1000;
/// Longest accepted delay between two scheduled bets.
pub const MAX_BET_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Over,
    Under,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Over => "over",
            Side::Under => "under",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Run parameters supplied by whoever drives the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    pub starting_balance: f64,
    pub wager_size: f64,
    /// 0 disables the profit goal.
    pub profit_goal: f64,
    /// 0 disables the loss limit.
    pub max_loss: f64,
    /// Percent, 1..=98.
    pub win_chance_target: f64,
    /// Bets per second.
    pub training_speed: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            starting_balance: 1000.0,
            wager_size: 10.0,
            profit_goal: 100.0,
            max_loss: 500.0,
            win_chance_target: 67.0,
            training_speed: 2.0,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> DiceResult<()> {
        if !(self.starting_balance.is_finite() && self.starting_balance > 0.0) {
            return Err(DiceError::InvalidConfig(format!(
                "starting balance must be positive, got {}",
                self.starting_balance
            )));
        }
        if !(self.wager_size.is_finite() && self.wager_size > 0.0) {
            return Err(DiceError::InvalidConfig(format!(
                "wager size must be positive, got {}",
                self.wager_size
            )));
        }
        if !(self.profit_goal.is_finite() && self.profit_goal >= 0.0) {
            return Err(DiceError::InvalidConfig(format!(
                "profit goal must be >= 0, got {}",
                self.profit_goal
            )));
        }
        if !(self.max_loss.is_finite() && self.max_loss >= 0.0) {
            return Err(DiceError::InvalidConfig(format!(
                "max loss must be >= 0, got {}",
                self.max_loss
            )));
        }
        if !(1.0..=98.0).contains(&self.win_chance_target) {
            return Err(DiceError::InvalidConfig(format!(
                "win chance target must be within 1..=98, got {}",
                self.win_chance_target
            )));
        }
        if !(self.training_speed.is_finite() && self.training_speed > 0.0) {
            return Err(DiceError::InvalidConfig(format!(
                "training speed must be positive, got {}",
                self.training_speed
            )));
        }
        if 1.0 / self.training_speed > MAX_BET_PERIOD.as_secs_f64() {
            return Err(DiceError::InvalidConfig(format!(
                "training speed must allow at least one bet per {}s, got {}",
                MAX_BET_PERIOD.as_secs(),
                self.training_speed
            )));
        }
        Ok(())
    }

    /// Delay between two scheduled bets, capped at [`MAX_BET_PERIOD`].
    pub fn bet_period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.training_speed)
            .unwrap_or(MAX_BET_PERIOD)
            .clamp(Duration::from_nanos(1), MAX_BET_PERIOD)
    }
}

/// One resolved bet as remembered by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningRecord {
    pub roll: f64,
    pub prediction: Side,
    pub target: f64,
    pub correct: bool,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of the agent's running statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub balance: f64,
    pub total_bets: u64,
    pub wins: u64,
    pub losses: u64,
    pub prediction_accuracy: f64,
    pub confidence: f64,
    pub current_strategy: String,
    /// Positive for a run of wins, negative for a run of losses.
    pub current_streak: i64,
    pub longest_win_streak: u64,
    pub longest_loss_streak: u64,
    pub roi: f64,
    pub is_training: bool,
    pub learning_data: VecDeque<LearningRecord>,
}

impl AgentState {
    pub fn initial(config: &AgentConfig) -> Self {
        Self {
            balance: config.starting_balance,
            total_bets: 0,
            wins: 0,
            losses: 0,
            prediction_accuracy: 0.0,
            confidence: INITIAL_CONFIDENCE,
            current_strategy: INITIAL_STRATEGY.to_string(),
            current_streak: 0,
            longest_win_streak: 0,
            longest_loss_streak: 0,
            roi: 0.0,
            is_training: false,
            learning_data: VecDeque::new(),
        }
    }
}

/// Emitted once per bet; not retained by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetResult {
    /// Nonce the roll was drawn at.
    pub nonce: u64,
    pub roll: f64,
    pub prediction: Side,
    pub target: f64,
    pub won: bool,
    /// Net of the wager, negative on a loss.
    pub payout: f64,
    pub new_balance: f64,
}

/// A roll together with the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollRecord {
    pub roll: f64,
    pub server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DiceError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("win chance must be within (0, 100], got {0}")]
    InvalidWinChance(f64),
    #[error("balance {balance} cannot cover a wager of {wager}")]
    InsufficientBalance { balance: f64, wager: f64 },
    #[error("agent task is no longer running")]
    AgentStopped,
}

pub type DiceResult<T> = Result<T, DiceError>;
