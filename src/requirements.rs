use ash::{ext::debug_utils, khr::portability_enumeration};
use tracing::debug;

use crate::{
    capabilities::CapabilitySet,
    error::{BootstrapError, CapabilityKind, Result},
};

pub const VALIDATION_LAYER_NAME: &str = "VK_LAYER_KHRONOS_validation";

/// What the application asks of the driver before anything is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSpec {
    pub required_extensions: Vec<String>,
    pub required_layers: Vec<String>,
    /// Enabled when the driver offers them, silently skipped otherwise.
    pub optional_extensions: Vec<String>,
    pub debug_tooling_enabled: bool,
}

impl RequirementSpec {
    /// The requirements of a windowed application: whatever the windowing system needs, plus
    /// portability enumeration when the driver has it.
    pub fn for_window(window_extensions: Vec<String>, debug_tooling_enabled: bool) -> Self {
        Self {
            required_extensions: window_extensions,
            required_layers: vec![],
            optional_extensions: vec![portability_enumeration::NAME
                .to_string_lossy()
                .into_owned()],
            debug_tooling_enabled,
        }
    }
}

/// The exact names to enable, in the order they are handed to the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub extensions: Vec<String>,
    pub layers: Vec<String>,
}

impl ResolvedConfig {
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|extension| extension == name)
    }
}

pub fn debug_utils_extension_name() -> String {
    debug_utils::NAME.to_string_lossy().into_owned()
}

/// Checks every requirement against what the driver offers. Declaration order is kept
/// (windowing first, optional next, debug tooling last) since layer chaining depends on it.
/// The first missing name fails the whole resolution; extensions are checked before layers.
pub fn resolve(caps: &CapabilitySet, spec: &RequirementSpec) -> Result<ResolvedConfig> {
    let mut required_extensions = spec.required_extensions.clone();
    let mut required_layers = spec.required_layers.clone();
    if spec.debug_tooling_enabled {
        required_extensions.push(debug_utils_extension_name());
        required_layers.push(VALIDATION_LAYER_NAME.to_owned());
    }

    if let Some(missing) = required_extensions
        .iter()
        .find(|name| !caps.has_extension(name))
    {
        return Err(BootstrapError::UnsupportedCapability {
            kind: CapabilityKind::Extension,
            name: missing.clone(),
        });
    }
    if let Some(missing) = required_layers.iter().find(|name| !caps.has_layer(name)) {
        return Err(BootstrapError::UnsupportedCapability {
            kind: CapabilityKind::Layer,
            name: missing.clone(),
        });
    }

    let optional_extensions = spec
        .optional_extensions
        .iter()
        .filter(|name| {
            let available = caps.has_extension(name);
            if !available {
                debug!("Optional extension {} not available, skipping", name);
            }
            available
        })
        .cloned()
        .collect::<Vec<_>>();

    // debug tooling stays last, after the optional extensions
    let debug_tail = if spec.debug_tooling_enabled { 1 } else { 0 };
    let split = required_extensions.len() - debug_tail;
    let mut extensions = required_extensions[..split].to_vec();
    extensions.extend(optional_extensions);
    extensions.extend_from_slice(&required_extensions[split..]);

    let resolved = ResolvedConfig {
        extensions: dedup_in_order(extensions),
        layers: dedup_in_order(required_layers),
    };
    debug!("Extensions to enable: {}", resolved.extensions.join(", "));
    debug!("Layers to enable: {}", resolved.layers.join(", "));
    Ok(resolved)
}

fn dedup_in_order(names: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}
