use super::target::Target;

/// Notification-worthy change in a target's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// First observation of the run, and the target is up.
    Initialized,
    Changed { available: bool },
}

impl StatusEvent {
    pub fn message(&self, target: &Target) -> String {
        match self {
            StatusEvent::Initialized => format!(
                "✅ Service {} initialized\nURL: {}",
                target.name, target.address
            ),
            StatusEvent::Changed { available } => {
                let status = if *available {
                    "🟢 available"
                } else {
                    "🛑 unavailable"
                };
                format!(
                    "🔄 Status changed: {}\nNew status: {status}\nType: {}\nTarget: {}",
                    target.name, target.method, target.address
                )
            }
        }
    }
}

/// Last known availability of one target. `None` until the first cycle commits.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusTracker {
    last: Option<bool>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<bool> {
        self.last
    }

    /// Compares `current` with the last committed status without changing it.
    pub fn evaluate(&self, current: bool) -> Option<StatusEvent> {
        match self.last {
            None if current => Some(StatusEvent::Initialized),
            None => None,
            Some(last) if last != current => Some(StatusEvent::Changed { available: current }),
            Some(_) => None,
        }
    }

    /// Records the cycle's status. Called exactly once per cycle.
    pub fn commit(&mut self, current: bool) {
        self.last = Some(current);
    }
}
