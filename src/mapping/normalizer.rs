//! Trait shared by the per-source normalizers

use crate::mapping::events::{CanonicalEvent, EventSource};

/// Turns one raw record from a source into zero or more canonical events
pub trait EventNormalizer: Send + 'static {
    type Input;

    /// Append the events produced by `input` to `out`
    fn normalize(&mut self, input: &Self::Input, out: &mut Vec<CanonicalEvent>);

    fn source(&self) -> EventSource;

    /// Forget carried state, e.g. after the source went away
    fn reset(&mut self) {}
}
