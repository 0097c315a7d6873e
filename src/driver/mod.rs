mod vulkan;

#[cfg(test)]
pub(crate) mod fake;

use std::{cell::Cell, ffi::c_char};

use ash::{prelude::VkResult, vk};

use crate::physical_device::PhysicalDeviceInfo;

pub use self::vulkan::VulkanDriver;

/// The calls the bootstrap makes into the graphics driver.
///
/// The enumeration calls keep the raw two-call shape of the driver protocol: with
/// `properties == None` the driver writes the number of available records into `count`;
/// with `Some(buffer)` it fills at most `count` records, writes back how many it wrote and
/// answers `INCOMPLETE` if more were available. Only [`crate::capabilities::probe`] should
/// call them.
pub trait Driver {
    /// Whatever the driver hands back for a created instance.
    type Instance;

    /// Whether an instance created through this driver is currently live.
    fn instance_slot(&self) -> &InstanceSlot;

    fn enumerate_instance_extension_properties(
        &self,
        count: &mut u32,
        properties: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result;

    fn enumerate_instance_layer_properties(
        &self,
        count: &mut u32,
        properties: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result;

    /// # Safety
    /// Every pointer reachable from `create_info` must be valid for the duration of the call.
    unsafe fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo<'_>,
    ) -> VkResult<Self::Instance>;

    /// # Safety
    /// `instance` must be live and have no live child objects. It must not be used again.
    unsafe fn destroy_instance(&self, instance: &Self::Instance);

    /// # Safety
    /// `instance` must be live and the callback user data must outlive the messenger.
    unsafe fn create_debug_utils_messenger(
        &self,
        instance: &Self::Instance,
        create_info: &vk::DebugUtilsMessengerCreateInfoEXT<'_>,
    ) -> VkResult<vk::DebugUtilsMessengerEXT>;

    /// # Safety
    /// `messenger` must have been created from `instance` and not destroyed yet.
    unsafe fn destroy_debug_utils_messenger(
        &self,
        instance: &Self::Instance,
        messenger: vk::DebugUtilsMessengerEXT,
    );

    fn physical_devices(&self, instance: &Self::Instance) -> VkResult<Vec<PhysicalDeviceInfo>>;
}

/// Live-instance flag kept by each driver. Only one instance may exist per driver at a
/// time.
#[derive(Debug, Default)]
pub struct InstanceSlot {
    live: Cell<bool>,
}

impl InstanceSlot {
    pub fn is_live(&self) -> bool {
        self.live.get()
    }

    pub(crate) fn set_live(&self, live: bool) {
        self.live.set(live);
    }
}

/// Reads a fixed-size, NUL-padded driver string.
pub(crate) fn name_from_raw(raw: &[c_char]) -> String {
    let bytes = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect::<Vec<_>>();
    String::from_utf8_lossy(&bytes).into_owned()
}
