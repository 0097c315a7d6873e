use std::collections::BTreeSet;

use ash::vk;
use tracing::debug;

use crate::{
    driver::{name_from_raw, Driver},
    error::{BootstrapError, Result},
};

/// What the driver offers at instance level, captured once and never updated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    extensions: BTreeSet<String>,
    layers: BTreeSet<String>,
}

impl CapabilitySet {
    pub fn new<E, L>(extensions: E, layers: L) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            layers: layers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.contains(name)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn layers(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(String::as_str)
    }
}

/// Snapshots the instance extensions and layers the driver makes available.
pub fn probe<D: Driver>(driver: &D) -> Result<CapabilitySet> {
    let extensions = count_then_fetch("vkEnumerateInstanceExtensionProperties", |count, out| {
        driver.enumerate_instance_extension_properties(count, out)
    })?
    .iter()
    .map(|props: &vk::ExtensionProperties| name_from_raw(&props.extension_name))
    .collect::<BTreeSet<_>>();

    let layers = count_then_fetch("vkEnumerateInstanceLayerProperties", |count, out| {
        driver.enumerate_instance_layer_properties(count, out)
    })?
    .iter()
    .map(|props: &vk::LayerProperties| name_from_raw(&props.layer_name))
    .collect::<BTreeSet<_>>();

    let capabilities = CapabilitySet { extensions, layers };
    debug!("Available instance extensions:");
    for extension in capabilities.extensions() {
        debug!("\t{}", extension);
    }
    debug!("Available instance layers:");
    for layer in capabilities.layers() {
        debug!("\t{}", layer);
    }

    Ok(capabilities)
}

/// Runs the driver's enumeration protocol: ask for the count, size the buffer, fetch.
/// `INCOMPLETE` means the set grew in between, so the whole exchange starts over.
fn count_then_fetch<T, F>(query: &'static str, mut call: F) -> Result<Vec<T>>
where
    T: Default + Clone,
    F: FnMut(&mut u32, Option<&mut [T]>) -> vk::Result,
{
    loop {
        let mut count = 0;
        call(&mut count, None)
            .result()
            .map_err(|code| BootstrapError::DriverQuery { query, code })?;

        let mut items = vec![T::default(); count as usize];
        match call(&mut count, Some(&mut items)) {
            vk::Result::SUCCESS => {
                items.truncate(count as usize);
                return Ok(items);
            }
            vk::Result::INCOMPLETE => {
                debug!("{} grew between calls, retrying", query);
            }
            code => return Err(BootstrapError::DriverQuery { query, code }),
        }
    }
}
