//! Sweep enumeration over a parameter range
//!
//! Each axis is expanded to `min, min + step, ...` up to and including
//! `max`. Float axes are computed as `min + i * step` rather than by
//! accumulation and rounded to four decimals (clamped back into the
//! bounds), so `0.1..=1.0 step 0.1` yields exactly ten points.

use rand::Rng;

use crate::types::{Bounds, GenerationParameters, ParameterRange};

const FLOAT_TOLERANCE: f64 = 1e-9;
const FLOAT_DECIMALS: f64 = 10_000.0;

impl Bounds<f64> {
    /// Number of inclusive axis values, counted without enumerating them;
    /// zero when the bounds are inverted or the step is not positive.
    pub fn len(&self) -> usize {
        let finite = self.min.is_finite() && self.max.is_finite();
        if !finite || self.step.is_nan() || self.step <= 0.0 || self.min > self.max {
            return 0;
        }
        // float to int `as` saturates, so a vanishing step yields usize::MAX
        let steps = ((self.max - self.min) / self.step + FLOAT_TOLERANCE).floor();
        (steps as usize).saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `index`-th axis value, rounded and clamped into the bounds
    pub fn value_at(&self, index: usize) -> f64 {
        let value = ((self.min + index as f64 * self.step) * FLOAT_DECIMALS).round() / FLOAT_DECIMALS;
        value.clamp(self.min, self.max)
    }

    /// Inclusive axis values. Materializes the whole axis; check [`len`]
    /// (or validate the range) before calling on untrusted bounds.
    ///
    /// [`len`]: Bounds::len
    pub fn values(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.value_at(i)).collect()
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min - FLOAT_TOLERANCE && value <= self.max + FLOAT_TOLERANCE
    }
}

impl Bounds<u32> {
    pub fn len(&self) -> usize {
        if self.step == 0 || self.min > self.max {
            return 0;
        }
        usize::try_from((self.max - self.min) / self.step)
            .unwrap_or(usize::MAX)
            .saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value_at(&self, index: usize) -> u32 {
        let value = u64::from(self.min).saturating_add((index as u64).saturating_mul(u64::from(self.step)));
        u32::try_from(value).unwrap_or(u32::MAX).min(self.max)
    }

    pub fn values(&self) -> Vec<u32> {
        (0..self.len()).map(|i| self.value_at(i)).collect()
    }

    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }
}

impl ParameterRange {
    /// Number of distinct points in the full cartesian sweep, saturating at
    /// `usize::MAX`
    pub fn grid_size(&self) -> usize {
        self.temperature
            .len()
            .saturating_mul(self.top_p.len())
            .saturating_mul(self.max_tokens.len())
    }

    /// Every combination of the three axes, temperature varying slowest.
    /// Only call on validated ranges; the grid is built in memory.
    pub fn grid(&self) -> Vec<GenerationParameters> {
        let temperatures = self.temperature.values();
        let top_ps = self.top_p.values();
        let max_tokens = self.max_tokens.values();

        let mut points = Vec::with_capacity(temperatures.len() * top_ps.len() * max_tokens.len());
        for &temperature in &temperatures {
            for &top_p in &top_ps {
                for &tokens in &max_tokens {
                    points.push(GenerationParameters {
                        temperature,
                        top_p,
                        max_tokens: tokens,
                        model: None,
                    });
                }
            }
        }
        points
    }

    /// Draw `runs` random combinations, each axis picked uniformly from its
    /// enumerated values. Points may repeat when `runs` exceeds the grid.
    pub fn sample<R: Rng + ?Sized>(&self, runs: usize, rng: &mut R) -> Vec<GenerationParameters> {
        let (temperatures, top_ps, max_tokens) = (self.temperature.len(), self.top_p.len(), self.max_tokens.len());
        if temperatures == 0 || top_ps == 0 || max_tokens == 0 {
            return Vec::new();
        }

        (0..runs)
            .map(|_| GenerationParameters {
                temperature: self.temperature.value_at(rng.gen_range(0..temperatures)),
                top_p: self.top_p.value_at(rng.gen_range(0..top_ps)),
                max_tokens: self.max_tokens.value_at(rng.gen_range(0..max_tokens)),
                model: None,
            })
            .collect()
    }

    /// Whether a concrete point lies within these bounds
    pub fn contains(&self, params: &GenerationParameters) -> bool {
        self.temperature.contains(params.temperature)
            && self.top_p.contains(params.top_p)
            && self.max_tokens.contains(params.max_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_axes() {
        let range = ParameterRange::default();
        assert_eq!(
            range.temperature.values(),
            vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]
        );
        assert_eq!(range.max_tokens.values(), (1..=10).map(|i| i * 100).collect::<Vec<u32>>());
        assert_eq!(range.grid_size(), 1000);
        assert_eq!(range.grid().len(), 1000);
    }

    #[test]
    fn test_step_not_dividing_span() {
        let bounds = Bounds::new(0.2, 0.9, 0.3);
        assert_eq!(bounds.values(), vec![0.2, 0.5, 0.8]);
        assert_eq!(Bounds::new(100u32, 350, 100).values(), vec![100, 200, 300]);
    }

    #[test]
    fn test_invalid_axes_are_empty() {
        assert!(Bounds::new(0.9, 0.1, 0.1).values().is_empty());
        assert!(Bounds::new(0.1, 0.9, 0.0).values().is_empty());
        assert!(Bounds::new(10u32, 20, 0).values().is_empty());

        let mut range = ParameterRange::default();
        range.top_p.step = 0.0;
        assert_eq!(range.grid_size(), 0);
        assert!(range.sample(5, &mut StdRng::seed_from_u64(1)).is_empty());
    }

    #[test]
    fn test_huge_axes_are_counted_not_built() {
        let tiny_step = Bounds::new(0.0, 2.0, 1e-300);
        assert_eq!(tiny_step.len(), usize::MAX);
        assert!(!tiny_step.is_empty());
        assert_eq!(tiny_step.value_at(1), 0.0);

        let every_token = Bounds::new(1u32, u32::MAX, 1);
        assert_eq!(every_token.len(), u32::MAX as usize);
        assert_eq!(every_token.value_at(u32::MAX as usize - 1), u32::MAX);
        assert_eq!(every_token.value_at(usize::MAX), u32::MAX);

        let range = ParameterRange {
            temperature: tiny_step,
            top_p: Bounds::new(0.1, 1.0, 0.1),
            max_tokens: every_token,
        };
        assert_eq!(range.grid_size(), usize::MAX);

        let points = range.sample(4, &mut StdRng::seed_from_u64(7));
        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|p| range.contains(p)));
    }

    #[test]
    fn test_degenerate_axis() {
        let range = ParameterRange {
            temperature: Bounds::new(0.7, 0.7, 0.1),
            top_p: Bounds::new(1.0, 1.0, 0.1),
            max_tokens: Bounds::new(256, 256, 1),
        };
        let grid = range.grid();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid[0].temperature, 0.7);
        assert_eq!(grid[0].max_tokens, 256);
    }

    #[test]
    fn test_sampling_is_seeded() {
        let range = ParameterRange::default();
        let a = range.sample(10, &mut StdRng::seed_from_u64(42));
        let b = range.sample(10, &mut StdRng::seed_from_u64(42));
        assert_eq!(a.len(), 10);
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn test_samples_lie_within_bounds(
            t_min in 0.0f64..1.0,
            t_span in 0.0f64..1.0,
            t_step in 0.05f64..0.5,
            tok_min in 1u32..500,
            tok_span in 0u32..2000,
            tok_step in 1u32..400,
            runs in 1usize..30,
            seed in any::<u64>(),
        ) {
            let range = ParameterRange {
                temperature: Bounds::new(t_min, t_min + t_span, t_step),
                top_p: Bounds::new(0.1, 1.0, 0.1),
                max_tokens: Bounds::new(tok_min, tok_min + tok_span, tok_step),
            };
            let points = range.sample(runs, &mut StdRng::seed_from_u64(seed));
            prop_assert_eq!(points.len(), runs);
            for point in &points {
                prop_assert!(range.contains(point));
            }
        }

        #[test]
        fn test_grid_matches_size(
            t_step in 0.1f64..0.5,
            tok_step in 50u32..500,
        ) {
            let range = ParameterRange {
                temperature: Bounds::new(0.0, 1.0, t_step),
                top_p: Bounds::new(0.5, 1.0, 0.25),
                max_tokens: Bounds::new(100, 1000, tok_step),
            };
            prop_assert_eq!(range.grid().len(), range.grid_size());
        }
    }
}
