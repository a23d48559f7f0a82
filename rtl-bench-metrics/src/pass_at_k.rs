//! Unbiased pass@k estimator.
//!
//! Given `c` successes among `n` independent trials, pass@k is the
//! probability that a uniformly random `k`-subset of the trials contains at
//! least one success:
//!
//! ```text
//! pass@k = 1 - C(n - c, k) / C(n, k)
//! ```
//!
//! The ratio is evaluated as the product `prod_{i = n-c+1}^{n} (1 - k / i)`,
//! which equals `C(n - c, k) / C(n, k)` without forming large binomials.

use rtl_bench_core::{CoreError, Result};

/// Estimate pass@k for one task.
///
/// `C(n - c, k)` is taken to be zero when `k > n - c`, so any `k >= n` with
/// `c > 0` yields exactly 1.0. `c == 0` yields exactly 0.0 for every `k`.
pub fn pass_at_k(n: u32, c: u32, k: u32) -> Result<f64> {
    if k == 0 {
        return Err(CoreError::Validation("k must be at least 1".to_string()));
    }
    if c > n {
        return Err(CoreError::Validation(format!(
            "success count {} exceeds trial count {}",
            c, n
        )));
    }

    if c == 0 {
        return Ok(0.0);
    }
    if n - c < k {
        return Ok(1.0);
    }

    let k = k as f64;
    let all_fail = ((n - c + 1)..=n).fold(1.0_f64, |acc, i| acc * (1.0 - k / i as f64));
    Ok(1.0 - all_fail)
}

/// Round to four decimal places, the precision scores are reported at.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.80630), 0.8063);
        assert_eq!(round4(0.15), 0.15);
        assert_eq!(round4(1.0), 1.0);
    }
}
