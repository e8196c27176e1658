//! User agents and request pacing.

use std::time::{Duration, SystemTime};

/// User agent presented by the headless browser.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Real browser user agents rotated by the HTTP fetcher.
pub const IMPERSONATE_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Firefox on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Safari on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    // Edge on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

fn clock_nanos() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Pick a user agent from the pool.
pub fn random_user_agent() -> &'static str {
    IMPERSONATE_USER_AGENTS[clock_nanos() as usize % IMPERSONATE_USER_AGENTS.len()]
}

/// A delay between `min_ms` and `max_ms` inclusive.
pub fn random_delay(min_ms: u64, max_ms: u64) -> Duration {
    let (low, high) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    let span = high - low + 1;
    Duration::from_millis(low + clock_nanos() % span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_user_agent_from_pool() {
        let ua = random_user_agent();
        assert!(ua.contains("Mozilla"));
        assert!(IMPERSONATE_USER_AGENTS.contains(&ua));
    }

    #[test]
    fn test_random_delay_bounds() {
        for _ in 0..50 {
            let delay = random_delay(1000, 3000);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(3000));
        }
        assert_eq!(random_delay(0, 0), Duration::ZERO);
        let swapped = random_delay(20, 10);
        assert!(swapped >= Duration::from_millis(10) && swapped <= Duration::from_millis(20));
    }
}
