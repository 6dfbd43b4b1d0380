//! Logarithmic slider mappings.
//!
//! Lesson sliders run over `[0, 1]` and map to rates or frequencies on a
//! log2 scale so that every octave gets the same slider travel. This is
//! where rates are range-checked; the scheduler trusts what it receives.

/// A closed log-scaled range `[min, max]`, both strictly positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateScale {
    min: f64,
    max: f64,
}

impl RateScale {
    /// Single click-train slider: 0.5 clicks/s up to 500 Hz.
    pub const CLICK_TRAIN: Self = Self::new(0.5, 500.0);
    /// Base rate of a polyrhythm, multiplied by the ratio terms.
    pub const POLYRHYTHM_BASE: Self = Self::new(0.5, 150.0);
    /// Continuous tone slider.
    pub const TONE: Self = Self::new(20.0, 2000.0);

    /// Rates below this read as rhythm, above as pitch.
    pub const PITCH_THRESHOLD: f64 = 20.0;

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Map a slider position in `[0, 1]` to a rate. Positions outside the
    /// unit interval are clamped.
    pub fn rate_at(&self, position: f64) -> f64 {
        let position = position.clamp(0.0, 1.0);
        let lo = libm::log2(self.min);
        let hi = libm::log2(self.max);
        libm::exp2(lo + position * (hi - lo))
    }

    /// Slider position of `rate`, clamped into `[0, 1]`.
    pub fn position_of(&self, rate: f64) -> f64 {
        let lo = libm::log2(self.min);
        let hi = libm::log2(self.max);
        ((libm::log2(rate) - lo) / (hi - lo)).clamp(0.0, 1.0)
    }

    /// Clamp `rate` into the range.
    pub fn clamp(&self, rate: f64) -> f64 {
        rate.clamp(self.min, self.max)
    }

    /// True if `rate` is inside the range.
    pub fn contains(&self, rate: f64) -> bool {
        rate >= self.min && rate <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_map_to_bounds() {
        let s = RateScale::CLICK_TRAIN;
        assert!((s.rate_at(0.0) - 0.5).abs() < 1e-9);
        assert!((s.rate_at(1.0) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn midpoint_is_geometric_mean() {
        let s = RateScale::TONE;
        assert!((s.rate_at(0.5) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn position_inverts_rate() {
        let s = RateScale::POLYRHYTHM_BASE;
        for &p in &[0.0, 0.13, 0.5, 0.77, 1.0] {
            assert!((s.position_of(s.rate_at(p)) - p).abs() < 1e-9);
        }
    }

    #[test]
    fn out_of_range_positions_clamp() {
        let s = RateScale::CLICK_TRAIN;
        assert_eq!(s.rate_at(-1.0), s.rate_at(0.0));
        assert_eq!(s.position_of(10_000.0), 1.0);
        assert_eq!(s.clamp(0.01), 0.5);
        assert!(!s.contains(0.0));
        assert!(s.contains(2.0));
    }
}
