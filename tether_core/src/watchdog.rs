// tether_core/src/watchdog.rs

/// Lazily evaluated command liveness.
///
/// The watchdog owns no timer and no thread; it only compares the receipt time
/// held in the `CommandBuffer` with the time it is asked about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandWatchdog {
    timeout: f64,
}

impl CommandWatchdog {
    /// `timeout` is in seconds and must be > 0 (checked by `BridgeConfig`).
    pub fn new(timeout: f64) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> f64 {
        self.timeout
    }

    /// `true` when nothing was ever received or the last receipt is older than
    /// the timeout. Exactly `timeout` seconds old still counts as fresh.
    pub fn is_stale(&self, now: f64, received_at: Option<f64>) -> bool {
        match received_at {
            None => true,
            Some(t) => now - t > self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_received_is_stale() {
        let watchdog = CommandWatchdog::new(0.5);
        assert!(watchdog.is_stale(0.0, None));
        assert!(watchdog.is_stale(1e6, None));
    }

    #[test]
    fn boundary_is_inclusive() {
        // Binary-exact values keep the boundary check exact.
        let watchdog = CommandWatchdog::new(0.5);
        assert!(!watchdog.is_stale(0.25, Some(0.25)));
        assert!(!watchdog.is_stale(0.75, Some(0.25)));
        assert!(watchdog.is_stale(0.875, Some(0.25)));
    }
}
