// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::Duration;

use rand::Rng;

/// Generates a random 128-bit nonce used as the random half of a puzzle id
/// (see `puzzle::id`) and returns its lowercase hex representation.
pub fn generate_nonce_hex() -> String {
    let bytes: [u8; 16] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

/// Applies multiplicative jitter to a base duration: `base * U(low..=high)`.
///
/// Used by the inserter (`45min * U(0.5..=1.5)`) and the fetcher's backoff
/// (`base * 2^attempt * U(0.5..=1.0)`).
pub fn jitter(base: Duration, low: f64, high: f64) -> Duration {
    let factor = rand::thread_rng().gen_range(low..=high);
    Duration::from_secs_f64(base.as_secs_f64() * factor)
}

/// Full-jitter exponential backoff: `min(max, base * 2^attempt) * U(0.5..=1.0)`.
pub fn exponential_backoff(base: Duration, max: Duration, attempt: u32) -> Duration {
    let pow = 2f64.powi(attempt.min(32) as i32);
    let raw = base.as_secs_f64() * pow;
    let capped = raw.min(max.as_secs_f64());
    jitter(Duration::from_secs_f64(capped), 0.5, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_hex_is_32_lowercase_hex_chars() {
        let nonce = generate_nonce_hex();
        assert_eq!(nonce.len(), 32);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let base = Duration::from_secs(100);
        for _ in 0..50 {
            let d = jitter(base, 0.5, 1.5);
            assert!(d >= Duration::from_secs(50) && d <= Duration::from_secs(150));
        }
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let base = Duration::from_secs(5);
        let max = Duration::from_secs(60);
        let d = exponential_backoff(base, max, 10);
        assert!(d <= max);
    }

    #[test]
    fn test_exponential_backoff_grows_with_attempt() {
        let base = Duration::from_secs(5);
        let max = Duration::from_secs(3600);
        // Compare lower bounds (jitter floor is 0.5x) so growth is still visible.
        let early = exponential_backoff(base, max, 0).as_secs_f64() / 0.5;
        let later = exponential_backoff(base, max, 4).as_secs_f64();
        assert!(later > early);
    }
}
