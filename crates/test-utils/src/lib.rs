//! Test helpers shared across the workspace: synthetic grids and series,
//! on-disk fixtures, and float assertions.

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Assert `|left - right| <= epsilon` after casting all three to `f64`.
///
/// NaN on either side fails.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: {} is not within {} of {} (diff {})",
                left, epsilon, right, diff
            );
        }
    }};
}

/// Assert that every element of a slice is within `epsilon` of `expected`.
#[macro_export]
macro_rules! assert_all_approx_eq {
    ($values:expr, $expected:expr, $epsilon:expr) => {{
        for (index, value) in $values.iter().enumerate() {
            let value: f64 = *value as f64;
            let expected: f64 = $expected as f64;
            if !((value - expected).abs() <= $epsilon as f64) {
                panic!(
                    "assertion failed at index {}: `{:?}` is not within {:?} of `{:?}`",
                    index, value, $epsilon, expected
                );
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_close_values_pass() {
        assert_approx_eq!(0.3f32, 0.3, 1e-6);
        assert_approx_eq!(-273.15, -273.150001, 1e-5);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_distant_values_fail() {
        assert_approx_eq!(0.9, 1.0, 0.01);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_nan_fails() {
        assert_approx_eq!(f64::NAN, 1.0, 0.001);
    }

    #[test]
    fn test_assert_all_approx_eq() {
        assert_all_approx_eq!([0.5f32, 0.5000001], 0.5, 1e-6);
    }
}
