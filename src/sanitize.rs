//! Configuration sanitizers.
//!
//! These two functions are the only gate between external configuration and
//! the termination-critical counters (recursion depth, iteration caps, quality
//! thresholds). They are total: any input, including NaN and infinities, maps
//! to a value within the documented bounds. They never panic.

/// Clamp an arbitrary numeric value into a positive integer count.
///
/// Returns `value` as `u32` when it is a finite, integral number that is at
/// least 1 and, when `max_value` is given, at most `max_value`. Everything
/// else (zero, negatives, fractions, NaN, infinities, overflow) returns
/// `default` unchanged.
pub fn sanitize_positive_int(value: f64, default: u32, max_value: Option<u32>) -> u32 {
    if !value.is_finite() || value.fract() != 0.0 || value < 1.0 || value > u32::MAX as f64 {
        return default;
    }
    let value = value as u32;
    match max_value {
        Some(max) if value > max => default,
        _ => value,
    }
}

/// Clamp an arbitrary numeric value into a [0.0, 1.0] threshold.
///
/// Returns `value` when it lies within [0.0, 1.0]; otherwise (including NaN)
/// returns `default`.
pub fn sanitize_threshold(value: f64, default: f64) -> f64 {
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_int_passes_valid_values() {
        assert_eq!(sanitize_positive_int(1.0, 3, None), 1);
        assert_eq!(sanitize_positive_int(5.0, 3, None), 5);
        assert_eq!(sanitize_positive_int(10.0, 3, Some(10)), 10);
    }

    #[test]
    fn test_positive_int_rejects_non_positive() {
        assert_eq!(sanitize_positive_int(0.0, 3, None), 3);
        assert_eq!(sanitize_positive_int(-1.0, 3, None), 3);
        assert_eq!(sanitize_positive_int(-100.0, 7, None), 7);
    }

    #[test]
    fn test_positive_int_rejects_non_integral() {
        assert_eq!(sanitize_positive_int(2.5, 3, None), 3);
        assert_eq!(sanitize_positive_int(0.999, 3, None), 3);
    }

    #[test]
    fn test_positive_int_rejects_nan_and_infinities() {
        assert_eq!(sanitize_positive_int(f64::NAN, 3, None), 3);
        assert_eq!(sanitize_positive_int(f64::INFINITY, 3, None), 3);
        assert_eq!(sanitize_positive_int(f64::NEG_INFINITY, 3, None), 3);
    }

    #[test]
    fn test_positive_int_enforces_max_value() {
        assert_eq!(sanitize_positive_int(11.0, 3, Some(10)), 3);
        assert_eq!(sanitize_positive_int(1e12, 3, None), 3);
    }

    #[test]
    fn test_threshold_passes_in_range() {
        assert_eq!(sanitize_threshold(0.0, 0.5), 0.0);
        assert_eq!(sanitize_threshold(1.0, 0.5), 1.0);
        assert_eq!(sanitize_threshold(0.9, 0.5), 0.9);
    }

    #[test]
    fn test_threshold_rejects_out_of_range() {
        assert_eq!(sanitize_threshold(-0.1, 0.5), 0.5);
        assert_eq!(sanitize_threshold(1.1, 0.5), 0.5);
        assert_eq!(sanitize_threshold(f64::NAN, 0.5), 0.5);
        assert_eq!(sanitize_threshold(f64::INFINITY, 0.5), 0.5);
    }

    #[test]
    fn test_sanitizers_are_total_over_sampled_inputs() {
        // A spread of hostile inputs; both functions must land in bounds.
        let samples = [
            f64::NAN,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::MIN,
            f64::MAX,
            -0.0,
            0.5,
            1e-300,
            1e300,
            42.0,
        ];
        for &v in &samples {
            let n = sanitize_positive_int(v, 4, Some(100));
            assert!((1..=100).contains(&n), "out of bounds for input {v}: {n}");
            let t = sanitize_threshold(v, 0.25);
            assert!((0.0..=1.0).contains(&t), "out of bounds for input {v}: {t}");
        }
    }
}
