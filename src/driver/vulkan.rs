use std::ptr;

use ash::{ext::debug_utils, prelude::VkResult, vk, Entry, Instance};
use tracing::debug;

use crate::{error::Result, physical_device::PhysicalDeviceInfo};

use super::{name_from_raw, Driver, InstanceSlot};

/// The system Vulkan loader.
pub struct VulkanDriver {
    entry: Entry,
    instance_slot: InstanceSlot,
}

impl VulkanDriver {
    /// Loads the Vulkan loader library at runtime.
    pub fn load() -> Result<Self> {
        let entry = unsafe { Entry::load()? };
        debug!("Loaded Vulkan entry points");
        Ok(Self {
            entry,
            instance_slot: InstanceSlot::default(),
        })
    }
}

impl Driver for VulkanDriver {
    type Instance = Instance;

    fn instance_slot(&self) -> &InstanceSlot {
        &self.instance_slot
    }

    fn enumerate_instance_extension_properties(
        &self,
        count: &mut u32,
        properties: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        let properties_ptr = match properties {
            Some(properties) => {
                *count = (*count).min(properties.len() as u32);
                properties.as_mut_ptr()
            }
            None => ptr::null_mut(),
        };
        unsafe {
            (self.entry.fp_v1_0().enumerate_instance_extension_properties)(
                ptr::null(),
                count,
                properties_ptr,
            )
        }
    }

    fn enumerate_instance_layer_properties(
        &self,
        count: &mut u32,
        properties: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result {
        let properties_ptr = match properties {
            Some(properties) => {
                *count = (*count).min(properties.len() as u32);
                properties.as_mut_ptr()
            }
            None => ptr::null_mut(),
        };
        unsafe {
            (self.entry.fp_v1_0().enumerate_instance_layer_properties)(count, properties_ptr)
        }
    }

    unsafe fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo<'_>,
    ) -> VkResult<Self::Instance> {
        self.entry.create_instance(create_info, None)
    }

    unsafe fn destroy_instance(&self, instance: &Self::Instance) {
        instance.destroy_instance(None)
    }

    unsafe fn create_debug_utils_messenger(
        &self,
        instance: &Self::Instance,
        create_info: &vk::DebugUtilsMessengerCreateInfoEXT<'_>,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let debug_utils = debug_utils::Instance::new(&self.entry, instance);
        debug_utils.create_debug_utils_messenger(create_info, None)
    }

    unsafe fn destroy_debug_utils_messenger(
        &self,
        instance: &Self::Instance,
        messenger: vk::DebugUtilsMessengerEXT,
    ) {
        let debug_utils = debug_utils::Instance::new(&self.entry, instance);
        debug_utils.destroy_debug_utils_messenger(messenger, None)
    }

    fn physical_devices(&self, instance: &Self::Instance) -> VkResult<Vec<PhysicalDeviceInfo>> {
        let physical_devices = unsafe { instance.enumerate_physical_devices()? };
        let infos = physical_devices
            .into_iter()
            .map(|physical_device| {
                let props = unsafe { instance.get_physical_device_properties(physical_device) };
                let queue_families = unsafe {
                    instance.get_physical_device_queue_family_properties(physical_device)
                };
                PhysicalDeviceInfo {
                    name: name_from_raw(&props.device_name),
                    device_type: props.device_type,
                    api_version: props.api_version,
                    queue_family_flags: queue_families
                        .iter()
                        .map(|family| family.queue_flags)
                        .collect(),
                }
            })
            .collect();
        Ok(infos)
    }
}
