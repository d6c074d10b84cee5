// tether_core/src/throttle.rs

/// The decision taken for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishDecision {
    /// The floor rate forced a publication (or this is the first one).
    Heartbeat,
    /// The state changed and the ceiling rate allows a publication.
    Changed,
    Suppress,
}

impl PublishDecision {
    pub fn should_publish(&self) -> bool {
        !matches!(self, PublishDecision::Suppress)
    }
}

/// Bounds the publish rate of one entity between a floor and a ceiling.
///
/// Between the two bounds a publication only happens when the state changed
/// since the last one.
#[derive(Debug, Clone)]
pub struct PublishThrottle {
    min_interval: f64,
    max_interval: f64,
    last_published_at: Option<f64>,
    pending_change: bool,
}

impl PublishThrottle {
    /// `min_frequency <= max_frequency`, both > 0. Checked by `BridgeConfig`.
    pub fn new(min_frequency: f64, max_frequency: f64) -> Self {
        Self {
            min_interval: 1.0 / max_frequency,
            max_interval: 1.0 / min_frequency,
            last_published_at: None,
            pending_change: false,
        }
    }

    /// Records that the state differs from the last published one.
    pub fn mark_changed(&mut self) {
        self.pending_change = true;
    }

    /// Decides for the tick at `now` without recording anything. A caller that
    /// actually hands the message off follows up with `commit`.
    pub fn decide(&self, now: f64) -> PublishDecision {
        match self.last_published_at {
            None => PublishDecision::Heartbeat,
            Some(last) => {
                let elapsed = now - last;
                if elapsed >= self.max_interval {
                    PublishDecision::Heartbeat
                } else if elapsed >= self.min_interval && self.pending_change {
                    PublishDecision::Changed
                } else {
                    PublishDecision::Suppress
                }
            }
        }
    }

    /// Records a publication at `now`. Until this is called a pending change
    /// stays pending.
    pub fn commit(&mut self, now: f64) {
        self.last_published_at = Some(now);
        self.pending_change = false;
    }
}
