//! Stand-in for the out-of-scope global clock/state subsystem that issues
//! a stream's `audio_id` and `state_token` together (§4.6, §3).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::stream::AudioId;

/// Opaque per-stream handle from the clock/state subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateToken(pub u64);

/// One `audio_id`/`state_token` pair, issued together on a stream's first
/// successful `hw_params` (§4.6: "allocate one from the global clock/state
/// registry together with `state_token`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuedState {
    pub audio_id: AudioId,
    pub state_token: StateToken,
}

/// Issues globally unique, monotonically increasing state.
pub trait StateRegistry: Send + Sync {
    fn issue(&self) -> IssuedState;
}

/// Default [`StateRegistry`]: a single atomic counter shared by both ids.
///
/// `audio_id` starts at 1, matching the invariant "`audio_id > 0` after the
/// first successful `hw_params`".
#[derive(Debug, Default)]
pub struct AtomicStateRegistry {
    counter: AtomicU64,
}

impl AtomicStateRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateRegistry for AtomicStateRegistry {
    fn issue(&self) -> IssuedState {
        let next = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        IssuedState {
            audio_id: AudioId(next as u32),
            state_token: StateToken(next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let registry = AtomicStateRegistry::new();
        let first = registry.issue();
        let second = registry.issue();
        assert_eq!(first.audio_id.0, 1);
        assert_eq!(second.audio_id.0, 2);
        assert_ne!(first.state_token, second.state_token);
    }
}
