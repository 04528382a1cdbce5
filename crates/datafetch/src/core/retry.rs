use std::time::Duration;

/// Calculate the delay before a retry attempt using exponential backoff.
///
/// The delay formula is: `base * 2^retry_count`, saturating on overflow.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use datafetch::retry_delay;
///
/// // First retry: base * 2^0 = base
/// assert_eq!(retry_delay(0, Duration::from_millis(100)), Duration::from_millis(100));
///
/// // Third retry: base * 2^2 = base * 4
/// assert_eq!(retry_delay(2, Duration::from_millis(100)), Duration::from_millis(400));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier)
}

/// [`retry_delay`] bounded by `max`.
///
/// ```
/// use std::time::Duration;
/// use datafetch::backoff_delay;
///
/// let max = Duration::from_secs(1);
/// assert_eq!(backoff_delay(1, Duration::from_millis(300), max), Duration::from_millis(600));
/// assert_eq!(backoff_delay(5, Duration::from_millis(300), max), max);
/// ```
pub fn backoff_delay(retry_count: u32, base: Duration, max: Duration) -> Duration {
    retry_delay(retry_count, base).min(max)
}
