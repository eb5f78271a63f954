use fairdice_shared::AgentState;

/// Rolls inspected by the over/under split.
pub const RECENT_ROLLS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RollSummary {
    pub count: usize,
    pub average: f64,
    /// Among the last [`RECENT_ROLLS`]: roll > 50.
    pub recent_over: usize,
    /// Among the last [`RECENT_ROLLS`]: roll <= 50.
    pub recent_under: usize,
}

impl RollSummary {
    pub fn from_rolls(rolls: &[f64]) -> Self {
        if rolls.is_empty() {
            return Self::default();
        }
        let recent = &rolls[rolls.len().saturating_sub(RECENT_ROLLS)..];
        let recent_over = recent.iter().filter(|r| **r > 50.0).count();
        Self {
            count: rolls.len(),
            average: rolls.iter().sum::<f64>() / rolls.len() as f64,
            recent_over,
            recent_under: recent.len() - recent_over,
        }
    }
}

pub fn win_rate(state: &AgentState) -> f64 {
    if state.total_bets == 0 {
        0.0
    } else {
        state.wins as f64 / state.total_bets as f64 * 100.0
    }
}
