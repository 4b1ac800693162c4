//! Error definitions for the mapping module

use thiserror::Error;

/// Errors raised while turning raw input into canonical events
#[derive(Debug, Error)]
pub enum MappingError {
    /// A token did not match anything in the canonical vocabulary
    #[error("Unknown canonical event: {0}")]
    UnknownEvent(String),

    /// A context switch named a profile we do not know
    #[error("Unknown eye profile: {0}")]
    UnknownProfile(String),

    /// A wearable effect name with no entry in the effect table
    #[error("Unmapped wearable effect: {0}")]
    UnmappedEffect(String),

    /// Button binding table is inconsistent
    #[error("Binding error: {0}")]
    BindingError(String),
}
