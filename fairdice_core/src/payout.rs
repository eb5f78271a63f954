use fairdice_shared::{DiceError, DiceResult, Side};

/// Operator margin, percent.
pub const HOUSE_EDGE_PERCENT: f64 = 1.0;

/// Multiplier paid on a winning wager for the given win chance (percent).
pub fn payout_multiplier(win_chance: f64) -> DiceResult<f64> {
    if !(win_chance > 0.0 && win_chance <= 100.0) {
        return Err(DiceError::InvalidWinChance(win_chance));
    }
    Ok((100.0 - HOUSE_EDGE_PERCENT) / win_chance)
}

/// Chance of winning a bet on `side` against `target`.
pub fn effective_win_chance(side: Side, target: f64) -> f64 {
    match side {
        Side::Over => 100.0 - target,
        Side::Under => target,
    }
}

/// Gross amount returned for a bet: 0 on a loss, multiplier x wager on a win.
pub fn settle(side: Side, target: f64, won: bool, wager: f64) -> DiceResult<f64> {
    if !won {
        return Ok(0.0);
    }
    Ok(payout_multiplier(effective_win_chance(side, target))? * wager)
}
