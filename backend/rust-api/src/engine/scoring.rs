use serde::{Deserialize, Serialize};

/// Arcade scoring: a base award scaled by a capped, linear combo bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub base_points: u32,
    /// Bonus added per consecutive correct answer, in percent of `base_points`.
    pub combo_step_percent: u32,
    pub combo_cap_percent: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            base_points: 10,
            combo_step_percent: 10,
            combo_cap_percent: 100,
        }
    }
}

impl ScoringRules {
    pub fn combo_bonus_percent(&self, combo: u32) -> u32 {
        combo
            .saturating_mul(self.combo_step_percent)
            .min(self.combo_cap_percent)
    }

    /// Points for a correct answer given the streak *before* this answer.
    pub fn points_for(&self, combo: u32) -> u32 {
        let percent = 100 + self.combo_bonus_percent(combo);
        self.base_points.saturating_mul(percent) / 100
    }
}
