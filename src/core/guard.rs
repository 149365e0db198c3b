use tracing::debug;

const DIVISOR_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct NumericGuard {
    ceiling: f64,
    coercions: u32,
}

impl NumericGuard {
    pub fn new(ceiling: f64) -> Self {
        let ceiling = if ceiling.is_finite() && ceiling > 0.0 {
            ceiling
        } else {
            f64::MAX
        };
        Self {
            ceiling,
            coercions: 0,
        }
    }

    pub fn coercions(&self) -> u32 {
        self.coercions
    }

    pub fn clean(&mut self, label: &'static str, value: f64) -> f64 {
        if !value.is_finite() {
            self.coercions += 1;
            debug!(field = label, value = %value, "non-finite value coerced to zero");
            return 0.0;
        }
        if value.abs() > self.ceiling {
            self.coercions += 1;
            debug!(field = label, value, ceiling = self.ceiling, "magnitude clamped");
            return value.signum() * self.ceiling;
        }
        value
    }

    // Near-zero or non-finite divisors yield 0.
    pub fn div(&mut self, label: &'static str, numerator: f64, denominator: f64) -> f64 {
        if !denominator.is_finite() || denominator.abs() < DIVISOR_EPSILON {
            self.coercions += 1;
            debug!(field = label, denominator, "near-zero divisor coerced to zero");
            return 0.0;
        }
        self.clean(label, numerator / denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_values_pass_through_untouched() {
        let mut guard = NumericGuard::new(1e12);
        assert_eq!(guard.clean("x", -42.5), -42.5);
        assert_eq!(guard.coercions(), 0);
    }

    #[test]
    fn nan_and_infinity_become_zero_and_are_counted() {
        let mut guard = NumericGuard::new(1e12);
        assert_eq!(guard.clean("nan", f64::NAN), 0.0);
        assert_eq!(guard.clean("inf", f64::INFINITY), 0.0);
        assert_eq!(guard.clean("-inf", f64::NEG_INFINITY), 0.0);
        assert_eq!(guard.coercions(), 3);
    }

    #[test]
    fn magnitudes_beyond_ceiling_are_clamped_with_sign() {
        let mut guard = NumericGuard::new(1e12);
        assert_eq!(guard.clean("big", 5e15), 1e12);
        assert_eq!(guard.clean("small", -5e15), -1e12);
        assert_eq!(guard.coercions(), 2);
    }

    #[test]
    fn division_by_near_zero_is_coerced() {
        let mut guard = NumericGuard::new(1e12);
        assert_eq!(guard.div("ratio", 10.0, 0.0), 0.0);
        assert_eq!(guard.div("ratio", 10.0, 1e-12), 0.0);
        assert_eq!(guard.div("ratio", 10.0, 4.0), 2.5);
        assert_eq!(guard.coercions(), 2);
    }

    #[test]
    fn invalid_ceiling_disables_clamping() {
        let mut guard = NumericGuard::new(f64::NAN);
        assert_eq!(guard.clean("big", 5e15), 5e15);
        assert_eq!(guard.coercions(), 0);
    }
}
