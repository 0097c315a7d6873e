use std::{ffi::NulError, fmt};

use ash::vk;

pub type Result<T, E = BootstrapError> = std::result::Result<T, E>;

/// Which side of the instance requirements a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Extension,
    Layer,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityKind::Extension => f.write_str("extension"),
            CapabilityKind::Layer => f.write_str("layer"),
        }
    }
}

/// Everything that can stop the instance bootstrap. None of these are recoverable: a
/// misconfigured instance must never reach rendering.
#[derive(thiserror::Error, Debug)]
pub enum BootstrapError {
    #[error("failed to load the Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("driver query {query} failed: {code}")]
    DriverQuery {
        query: &'static str,
        code: vk::Result,
    },

    #[error("required {kind} {name} is not available")]
    UnsupportedCapability { kind: CapabilityKind, name: String },

    #[error("instance creation failed: {code}")]
    InstanceCreation { code: vk::Result },

    #[error("debug messenger creation failed: {code}")]
    MessengerCreation { code: vk::Result },

    #[error("windowing system could not report its required extensions: {code}")]
    Windowing { code: vk::Result },

    #[error("name contains an interior NUL byte: {0}")]
    InvalidName(#[from] NulError),

    /// A teardown or registration step was attempted out of order. Reaching this is a bug in
    /// the owning scope, not a driver condition.
    #[error("ordering violation: {0}")]
    OrderingViolation(&'static str),
}
