/// Exponential Moving Average seeded with a simple moving average.
///
/// The seed is the mean of the first `period` values; each later value is
/// folded in with multiplier `2 / (period + 1)`. The seed window therefore
/// depends on `period`, so EMA(9) and EMA(20) over the same series start
/// from different points. Alert values depend on this exact convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaIndicator {
    pub period: usize,
}

impl EmaIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self { period }
    }

    /// Compute the EMA of `closes` (oldest first).
    /// Returns `None` if there are fewer than `period` values. A computed
    /// `Some(0.0)` is a real value, not "missing".
    pub fn compute(&self, closes: &[f64]) -> Option<f64> {
        if closes.len() < self.period {
            return None;
        }

        let sma = closes[..self.period].iter().sum::<f64>() / self.period as f64;
        let multiplier = 2.0 / (self.period as f64 + 1.0);

        Some(
            closes[self.period..]
                .iter()
                .fold(sma, |ema, &price| (price - ema) * multiplier + ema),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_absent_when_series_shorter_than_period() {
        let ema = EmaIndicator::new(9);
        assert!(ema.compute(&[100.0; 8]).is_none());
        assert!(ema.compute(&[]).is_none());
    }

    #[test]
    fn ema_of_exactly_period_values_is_the_sma() {
        let ema = EmaIndicator::new(4);
        let value = ema.compute(&[1.0, 2.0, 3.0, 6.0]).unwrap();
        assert!((value - 3.0).abs() < 1e-12, "Expected 3.0, got {value}");
    }

    #[test]
    fn ema_constant_series_is_fixed_point() {
        let ema = EmaIndicator::new(20);
        let value = ema.compute(&[42.5; 50]).unwrap();
        assert!((value - 42.5).abs() < 1e-9, "Expected 42.5, got {value}");
    }

    #[test]
    fn ema_golden_value_ten_points() {
        // Seed = mean(1..=5) = 3, k = 1/3:
        // 6 → 4, 7 → 5, 8 → 6, 9 → 7, 10 → 8
        let ema = EmaIndicator::new(5);
        let prices: Vec<f64> = (1..=10).map(f64::from).collect();
        let value = ema.compute(&prices).unwrap();
        assert!((value - 8.0).abs() < 1e-9, "Expected 8.0, got {value}");
    }

    #[test]
    fn ema_golden_value_manual_recursion() {
        let prices = [
            22.27, 22.19, 22.08, 22.17, 22.18, 22.13, 22.23, 22.43, 22.24, 22.29,
        ];
        let period = 3;
        let k = 2.0 / 4.0;
        let mut expected = (22.27 + 22.19 + 22.08) / 3.0;
        for p in &prices[3..] {
            expected = (p - expected) * k + expected;
        }
        let value = EmaIndicator::new(period).compute(&prices).unwrap();
        assert!((value - expected).abs() < 1e-12);
        // Hand-rolled reference, rounded to 4 dp.
        assert!((value - 22.2827).abs() < 1e-4, "got {value}");
    }

    #[test]
    fn ema_seed_window_depends_on_period() {
        // Same series, different periods: each seeds from its own window,
        // which is not the same as running from element 0 with one seed.
        let prices = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0];
        let short = EmaIndicator::new(2).compute(&prices).unwrap();
        let long = EmaIndicator::new(4).compute(&prices).unwrap();
        // period 2: seed 15, k = 2/3 → 25, 35, 45, 55
        assert!((short - 55.0).abs() < 1e-9, "got {short}");
        // period 4: seed 25, k = 0.4 → 35, 45
        assert!((long - 45.0).abs() < 1e-9, "got {long}");
    }
}
