pub mod analytics;
pub mod engine;
pub mod observer;
pub mod payout;
pub mod predict;
pub mod rng;
pub mod runner;
pub mod stats;

pub use crate::analytics::{win_rate, RollSummary};
pub use crate::engine::{is_win, BettingAgent, GuardBlock, TickOutcome, INITIAL_NONCE};
pub use crate::observer::{AgentEvent, BetObserver, ChannelObserver, FnObserver, NoopObserver};
pub use crate::payout::{effective_win_chance, payout_multiplier, HOUSE_EDGE_PERCENT};
pub use crate::predict::{predict, Prediction};
pub use crate::rng::{
    derive_hash_hex, generate_seed, hmac_hex, roll, verify_roll, verify_seed, SeedPair,
};
pub use crate::runner::{AgentHandle, AgentRunner, AgentStatus};
pub use crate::stats::{apply_bet, SettledBet};
