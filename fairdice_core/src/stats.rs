use chrono::{DateTime, Utc};
use fairdice_shared::{AgentState, LearningRecord, LEARNING_HISTORY_LIMIT};

use crate::predict::Prediction;

/// Everything known about a bet once the roll has been drawn and paid out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettledBet {
    pub prediction: Prediction,
    pub roll: f64,
    pub won: bool,
    pub wager: f64,
    /// Gross return, 0 on a loss.
    pub payout: f64,
}

impl SettledBet {
    pub fn net(&self) -> f64 {
        self.payout - self.wager
    }
}

pub fn next_streak(current: i64, won: bool) -> i64 {
    match (won, current) {
        (true, c) if c > 0 => c + 1,
        (true, _) => 1,
        (false, c) if c < 0 => c - 1,
        (false, _) => -1,
    }
}

pub fn roi(balance: f64, starting_balance: f64) -> f64 {
    (balance - starting_balance) / starting_balance * 100.0
}

/// Fold one settled bet into the running statistics.
pub fn apply_bet(
    state: &mut AgentState,
    starting_balance: f64,
    bet: &SettledBet,
    now: DateTime<Utc>,
) {
    state.learning_data.push_back(LearningRecord {
        roll: bet.roll,
        prediction: bet.prediction.side,
        target: bet.prediction.target,
        correct: bet.won,
        confidence: bet.prediction.confidence,
        created_at: now,
    });
    while state.learning_data.len() > LEARNING_HISTORY_LIMIT {
        state.learning_data.pop_front();
    }

    state.balance = state.balance - bet.wager + bet.payout;
    state.total_bets += 1;
    if bet.won {
        state.wins += 1;
    } else {
        state.losses += 1;
    }

    state.current_streak = next_streak(state.current_streak, bet.won);
    let run = state.current_streak.unsigned_abs();
    if bet.won {
        state.longest_win_streak = state.longest_win_streak.max(run);
    } else {
        state.longest_loss_streak = state.longest_loss_streak.max(run);
    }

    state.prediction_accuracy = state.wins as f64 / state.total_bets as f64 * 100.0;
    state.roi = roi(state.balance, starting_balance);
    state.confidence = bet.prediction.confidence;
    state.current_strategy = bet.prediction.strategy_label();
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fairdice_shared::{AgentConfig, Side};

    fn bet(won: bool) -> SettledBet {
        SettledBet {
            prediction: Prediction::new(Side::Over, 50.0, 55.0),
            roll: if won { 75.0 } else { 25.0 },
            won,
            wager: 10.0,
            payout: if won { 19.8 } else { 0.0 },
        }
    }

    #[test]
    fn streak_transitions() {
        assert_eq!(next_streak(0, true), 1);
        assert_eq!(next_streak(3, true), 4);
        assert_eq!(next_streak(3, false), -1);
        assert_eq!(next_streak(-2, false), -3);
        assert_eq!(next_streak(-2, true), 1);
        assert_eq!(next_streak(0, false), -1);
    }

    #[test]
    fn streak_maxima_hold_over_a_sequence() {
        let cfg = AgentConfig::default();
        let mut st = AgentState::initial(&cfg);
        let outcomes = [true, true, true, false, false, true, false, false, false, false, true];
        for won in outcomes {
            apply_bet(&mut st, cfg.starting_balance, &bet(won), Utc::now());
            assert!(st.longest_win_streak as i64 >= st.current_streak.max(0));
            assert!(st.longest_loss_streak as i64 >= (-st.current_streak).max(0));
        }
        assert_eq!(st.longest_win_streak, 3);
        assert_eq!(st.longest_loss_streak, 4);
        assert_eq!(st.current_streak, 1);
    }

    #[test]
    fn counters_balance_and_derived_fields() {
        let cfg = AgentConfig::default();
        let mut st = AgentState::initial(&cfg);
        apply_bet(&mut st, cfg.starting_balance, &bet(false), Utc::now());
        assert_relative_eq!(st.balance, 990.0, epsilon = 1e-9);
        apply_bet(&mut st, cfg.starting_balance, &bet(true), Utc::now());
        assert_relative_eq!(st.balance, 999.8, epsilon = 1e-9);
        assert_eq!((st.total_bets, st.wins, st.losses), (2, 1, 1));
        assert_relative_eq!(st.prediction_accuracy, 50.0);
        assert_relative_eq!(st.roi, -0.02, epsilon = 1e-9);
        assert_eq!(st.confidence, 55.0);
        assert_eq!(st.current_strategy, "OVER 50.0 (55% conf)");
        let last = st.learning_data.back().unwrap();
        assert!(last.correct);
        assert_eq!(last.roll, 75.0);
    }

    #[test]
    fn history_is_capped() {
        let cfg = AgentConfig::default();
        let mut st = AgentState::initial(&cfg);
        for i in 0..(LEARNING_HISTORY_LIMIT + 25) {
            apply_bet(&mut st, cfg.starting_balance, &bet(i % 2 == 0), Utc::now());
        }
        assert_eq!(st.learning_data.len(), LEARNING_HISTORY_LIMIT);
        assert_eq!(st.total_bets as usize, LEARNING_HISTORY_LIMIT + 25);
        // oldest 25 dropped: first kept record is bet #25, a loss
        assert!(!st.learning_data.front().unwrap().correct);
    }
}
