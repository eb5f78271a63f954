use std::collections::VecDeque;

use fairdice_shared::{LearningRecord, Side};
use rand::Rng;

/// Below this many records the agent guesses.
pub const WARMUP_RECORDS: usize = 10;
/// Records inspected when counting recent over/under outcomes.
pub const PATTERN_WINDOW: usize = 20;
/// Records inspected when measuring recent accuracy.
pub const ACCURACY_WINDOW: usize = 10;

const MIDPOINT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub side: Side,
    pub target: f64,
    pub confidence: f64,
}

impl Prediction {
    pub fn new(side: Side, target: f64, confidence: f64) -> Self {
        Self {
            side,
            target,
            confidence,
        }
    }

    /// Display summary, e.g. `OVER 33.0 (62% conf)`.
    pub fn strategy_label(&self) -> String {
        format!(
            "{} {:.1} ({:.0}% conf)",
            self.side.as_str().to_uppercase(),
            self.target,
            self.confidence
        )
    }
}

/// Folds a configured win chance into the lower half, `[1, 50]`.
pub fn base_target(win_chance_target: f64) -> f64 {
    if win_chance_target > MIDPOINT {
        100.0 - win_chance_target
    } else {
        win_chance_target
    }
}

/// Frequency-bias heuristic: bet against whichever half of the range came up
/// more often in the recent window.
pub fn predict<R: Rng>(
    history: &VecDeque<LearningRecord>,
    win_chance_target: f64,
    rng: &mut R,
) -> Prediction {
    if history.len() < WARMUP_RECORDS {
        let side = if rng.gen_bool(0.5) {
            Side::Over
        } else {
            Side::Under
        };
        return Prediction::new(side, MIDPOINT, rng.gen_range(40.0..70.0));
    }

    let (recent_over, recent_under) = history
        .iter()
        .rev()
        .take(PATTERN_WINDOW)
        .fold((0usize, 0usize), |(over, under), rec| {
            if rec.roll > MIDPOINT {
                (over + 1, under)
            } else {
                (over, under + 1)
            }
        });

    let base = base_target(win_chance_target);
    let side = if recent_over > recent_under {
        Side::Under
    } else {
        Side::Over
    };
    let target = match side {
        Side::Over => base,
        Side::Under => 100.0 - base,
    };

    let window = ACCURACY_WINDOW.min(history.len());
    let correct = history
        .iter()
        .rev()
        .take(window)
        .filter(|rec| rec.correct)
        .count();
    let recent_accuracy = correct as f64 / window as f64;
    let confidence = (recent_accuracy * 100.0 + rng.gen_range(0.0..20.0)).clamp(30.0, 95.0);

    Prediction::new(side, target, confidence)
}
