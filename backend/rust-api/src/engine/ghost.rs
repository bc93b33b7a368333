use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Schedule for the simulated opponent in arcade races.
///
/// The ghost runs on ticks only, so its pace never depends on how fast the
/// player answers.
pub trait GhostPolicy: Send {
    fn baseline(&mut self, rng: &mut StdRng) -> u32;

    /// Points gained on the given tick (1-based within the session).
    fn advance(&mut self, tick: u32, rng: &mut StdRng) -> u32;
}

/// Gains a random amount every `interval_ticks` ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacedGhost {
    pub baseline_min: u32,
    pub baseline_max: u32,
    pub interval_ticks: u32,
    pub min_gain: u32,
    pub max_gain: u32,
}

impl Default for PacedGhost {
    fn default() -> Self {
        Self {
            baseline_min: 0,
            baseline_max: 10,
            interval_ticks: 3,
            min_gain: 5,
            max_gain: 15,
        }
    }
}

fn draw(rng: &mut StdRng, low: u32, high: u32) -> u32 {
    if high <= low {
        low
    } else {
        rng.random_range(low..=high)
    }
}

impl GhostPolicy for PacedGhost {
    fn baseline(&mut self, rng: &mut StdRng) -> u32 {
        draw(rng, self.baseline_min, self.baseline_max)
    }

    fn advance(&mut self, tick: u32, rng: &mut StdRng) -> u32 {
        if self.interval_ticks == 0 || tick % self.interval_ticks != 0 {
            return 0;
        }
        draw(rng, self.min_gain, self.max_gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn gains_only_on_interval_ticks() {
        let mut ghost = PacedGhost {
            interval_ticks: 2,
            min_gain: 4,
            max_gain: 4,
            ..PacedGhost::default()
        };
        let mut rng = StdRng::seed_from_u64(1);

        let gains: Vec<u32> = (1..=6).map(|t| ghost.advance(t, &mut rng)).collect();
        assert_eq!(gains, vec![0, 4, 0, 4, 0, 4]);
    }

    #[test]
    fn same_seed_same_race() {
        let run = |seed| {
            let mut ghost = PacedGhost::default();
            let mut rng = StdRng::seed_from_u64(seed);
            let base = ghost.baseline(&mut rng);
            (1..=30).fold(base, |acc, t| acc + ghost.advance(t, &mut rng))
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn zero_interval_never_moves() {
        let mut ghost = PacedGhost {
            interval_ticks: 0,
            ..PacedGhost::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(ghost.advance(3, &mut rng), 0);
    }
}
