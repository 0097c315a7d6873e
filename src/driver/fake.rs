//! In-memory driver for exercising the bootstrap without a GPU.

use std::{
    cell::{Cell, RefCell},
    ffi::{c_char, c_void, CStr, CString},
};

use ash::{
    prelude::VkResult,
    vk::{self, Handle},
};

use crate::physical_device::PhysicalDeviceInfo;

use super::{Driver, InstanceSlot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    CreateInstance {
        extensions: Vec<String>,
        layers: Vec<String>,
        flags: vk::InstanceCreateFlags,
        chained_messenger: bool,
    },
    DestroyInstance(u64),
    CreateMessenger(u64),
    DestroyMessenger(u64),
}

#[derive(Debug, PartialEq, Eq)]
pub struct FakeInstance(pub u64);

type Callback = (vk::PFN_vkDebugUtilsMessengerCallbackEXT, *mut c_void);

struct Registration {
    messenger: vk::DebugUtilsMessengerEXT,
    callback: vk::PFN_vkDebugUtilsMessengerCallbackEXT,
    user_data: *mut c_void,
}

#[derive(Default)]
pub struct FakeDriver {
    extensions: RefCell<Vec<vk::ExtensionProperties>>,
    layers: Vec<vk::LayerProperties>,
    late_extension: RefCell<Option<String>>,
    query_error: Option<vk::Result>,
    create_error: Option<vk::Result>,
    messenger_error: Option<vk::Result>,
    devices: Vec<PhysicalDeviceInfo>,
    next_handle: Cell<u64>,
    calls: RefCell<Vec<DriverCall>>,
    registrations: RefCell<Vec<Registration>>,
    // messenger chained into the live instance's create info
    chained: RefCell<Option<Callback>>,
    instance_slot: InstanceSlot,
}

impl FakeDriver {
    pub fn new(extensions: &[&str], layers: &[&str]) -> Self {
        Self {
            extensions: RefCell::new(extensions.iter().map(|name| extension(name)).collect()),
            layers: layers.iter().map(|name| layer(name)).collect(),
            ..Default::default()
        }
    }

    pub fn with_query_error(mut self, code: vk::Result) -> Self {
        self.query_error = Some(code);
        self
    }

    pub fn with_create_error(mut self, code: vk::Result) -> Self {
        self.create_error = Some(code);
        self
    }

    pub fn with_messenger_error(mut self, code: vk::Result) -> Self {
        self.messenger_error = Some(code);
        self
    }

    /// Makes `name` appear between the count and fetch calls of the first extension query.
    pub fn with_late_extension(self, name: &str) -> Self {
        *self.late_extension.borrow_mut() = Some(name.to_owned());
        self
    }

    pub fn with_devices(mut self, devices: Vec<PhysicalDeviceInfo>) -> Self {
        self.devices = devices;
        self
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.borrow().clone()
    }

    pub fn live_messengers(&self) -> usize {
        self.registrations.borrow().len()
    }

    /// Delivers a message to every registered messenger, returning what each callback answered.
    pub fn emit(
        &self,
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        types: vk::DebugUtilsMessageTypeFlagsEXT,
        message: &str,
    ) -> Vec<vk::Bool32> {
        let targets = self
            .registrations
            .borrow()
            .iter()
            .map(|registration| (registration.callback, registration.user_data))
            .collect::<Vec<_>>();
        targets
            .into_iter()
            .filter_map(|target| deliver(target, severity, types, message))
            .collect()
    }

    /// Reports `message` through the messenger chained into instance creation, as the
    /// driver does for messages raised inside `vkCreateInstance`/`vkDestroyInstance`.
    fn emit_chained(&self, message: &str) {
        let target = *self.chained.borrow();
        if let Some(target) = target {
            deliver(
                target,
                vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                message,
            );
        }
    }

    fn next_handle(&self) -> u64 {
        let handle = self.next_handle.get() + 1;
        self.next_handle.set(handle);
        handle
    }
}

impl Driver for FakeDriver {
    type Instance = FakeInstance;

    fn instance_slot(&self) -> &InstanceSlot {
        &self.instance_slot
    }

    fn enumerate_instance_extension_properties(
        &self,
        count: &mut u32,
        properties: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        if let Some(code) = self.query_error {
            return code;
        }
        let is_count_call = properties.is_none();
        let result = fill(&self.extensions.borrow(), count, properties);
        if is_count_call {
            if let Some(late) = self.late_extension.borrow_mut().take() {
                self.extensions.borrow_mut().push(extension(&late));
            }
        }
        result
    }

    fn enumerate_instance_layer_properties(
        &self,
        count: &mut u32,
        properties: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result {
        if let Some(code) = self.query_error {
            return code;
        }
        fill(&self.layers, count, properties)
    }

    unsafe fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo<'_>,
    ) -> VkResult<Self::Instance> {
        self.calls.borrow_mut().push(DriverCall::CreateInstance {
            extensions: read_names(
                create_info.pp_enabled_extension_names,
                create_info.enabled_extension_count,
            ),
            layers: read_names(
                create_info.pp_enabled_layer_names,
                create_info.enabled_layer_count,
            ),
            flags: create_info.flags,
            chained_messenger: !create_info.p_next.is_null(),
        });
        if let Some(code) = self.create_error {
            return Err(code);
        }
        *self.chained.borrow_mut() = chained_messenger(create_info);
        self.emit_chained("vkCreateInstance");
        Ok(FakeInstance(self.next_handle()))
    }

    unsafe fn destroy_instance(&self, instance: &Self::Instance) {
        self.emit_chained("vkDestroyInstance");
        *self.chained.borrow_mut() = None;
        self.calls
            .borrow_mut()
            .push(DriverCall::DestroyInstance(instance.0));
    }

    unsafe fn create_debug_utils_messenger(
        &self,
        instance: &Self::Instance,
        create_info: &vk::DebugUtilsMessengerCreateInfoEXT<'_>,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        if let Some(code) = self.messenger_error {
            return Err(code);
        }
        let messenger = vk::DebugUtilsMessengerEXT::from_raw(self.next_handle());
        self.calls
            .borrow_mut()
            .push(DriverCall::CreateMessenger(instance.0));
        self.registrations.borrow_mut().push(Registration {
            messenger,
            callback: create_info.pfn_user_callback,
            user_data: create_info.p_user_data,
        });
        Ok(messenger)
    }

    unsafe fn destroy_debug_utils_messenger(
        &self,
        instance: &Self::Instance,
        messenger: vk::DebugUtilsMessengerEXT,
    ) {
        self.calls
            .borrow_mut()
            .push(DriverCall::DestroyMessenger(instance.0));
        self.registrations
            .borrow_mut()
            .retain(|registration| registration.messenger != messenger);
    }

    fn physical_devices(&self, _instance: &Self::Instance) -> VkResult<Vec<PhysicalDeviceInfo>> {
        Ok(self.devices.clone())
    }
}

fn deliver(
    (callback, user_data): Callback,
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    message: &str,
) -> Option<vk::Bool32> {
    let message = CString::new(message).unwrap();
    let callback_data = vk::DebugUtilsMessengerCallbackDataEXT::default().message(&message);
    callback.map(|callback| unsafe { callback(severity, types, &callback_data, user_data) })
}

unsafe fn chained_messenger(create_info: &vk::InstanceCreateInfo<'_>) -> Option<Callback> {
    let next = create_info.p_next as *const vk::DebugUtilsMessengerCreateInfoEXT<'_>;
    match next.as_ref() {
        Some(next) if next.s_type == vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT => {
            Some((next.pfn_user_callback, next.p_user_data))
        }
        _ => None,
    }
}

fn fill<T: Copy>(available: &[T], count: &mut u32, out: Option<&mut [T]>) -> vk::Result {
    match out {
        None => {
            *count = available.len() as u32;
            vk::Result::SUCCESS
        }
        Some(out) => {
            let written = (*count as usize).min(out.len()).min(available.len());
            out[..written].copy_from_slice(&available[..written]);
            *count = written as u32;
            if written < available.len() {
                vk::Result::INCOMPLETE
            } else {
                vk::Result::SUCCESS
            }
        }
    }
}

fn write_name(dst: &mut [c_char], name: &str) {
    for (slot, byte) in dst.iter_mut().zip(name.bytes()) {
        *slot = byte as c_char;
    }
}

fn extension(name: &str) -> vk::ExtensionProperties {
    let mut props = vk::ExtensionProperties::default();
    write_name(&mut props.extension_name, name);
    props
}

fn layer(name: &str) -> vk::LayerProperties {
    let mut props = vk::LayerProperties::default();
    write_name(&mut props.layer_name, name);
    props
}

unsafe fn read_names(names: *const *const c_char, count: u32) -> Vec<String> {
    if names.is_null() {
        return vec![];
    }
    (0..count as usize)
        .map(|i| {
            CStr::from_ptr(*names.add(i))
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}
