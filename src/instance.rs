use std::{ffi::CString, ops::Deref, rc::Rc};

use ash::{
    khr::portability_enumeration,
    vk::{ApplicationInfo, InstanceCreateFlags, InstanceCreateInfo},
};
use tracing::debug;

use crate::{
    config::{AppConfig, AppVersion},
    debug_messenger::{self, CallbackContext, MessageSink, MessengerConfig},
    driver::Driver,
    error::{BootstrapError, Result},
    requirements::ResolvedConfig,
};

/// One-shot factory for the instance. `build` consumes the builder, so each builder
/// creates at most one instance, and refuses while the driver already has a live one.
pub struct InstanceBuilder<D: Driver> {
    driver: Rc<D>,
    engine_name: String,
    api_version: u32,
    /// Messenger chained into the create info so instance creation and destruction are
    /// validated too.
    creation_messenger: Option<(MessengerConfig, Box<CallbackContext>)>,
}

impl<D: Driver> InstanceBuilder<D> {
    pub fn new(driver: Rc<D>, config: &AppConfig) -> Self {
        Self {
            driver,
            engine_name: config.engine_name.clone(),
            api_version: config.api_version,
            creation_messenger: None,
        }
    }

    pub fn with_creation_messenger(
        mut self,
        config: MessengerConfig,
        sink: Box<dyn MessageSink>,
    ) -> Self {
        self.creation_messenger = Some((config, CallbackContext::new(&config, sink)));
        self
    }

    /// Creates the instance with exactly the extensions and layers of `resolved`.
    pub fn build(
        self,
        app_name: &str,
        app_version: AppVersion,
        resolved: &ResolvedConfig,
    ) -> Result<Rc<InstanceGuard<D>>> {
        if self.driver.instance_slot().is_live() {
            return Err(BootstrapError::OrderingViolation(
                "an instance is already live for this driver",
            ));
        }

        let appname = CString::new(app_name)?;
        let engine_name = CString::new(self.engine_name.as_str())?;

        let application_info = ApplicationInfo::default()
            .application_name(&appname)
            .application_version(app_version.packed())
            .engine_name(&engine_name)
            .engine_version(app_version.packed())
            .api_version(self.api_version);

        let extension_names = resolved
            .extensions
            .iter()
            .map(|extension_name| CString::new(extension_name.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let extension_name_pointers = extension_names
            .iter()
            .map(|extension_name| extension_name.as_ptr())
            .collect::<Vec<_>>();

        let layer_names = resolved
            .layers
            .iter()
            .map(|layer_name| CString::new(layer_name.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let layer_name_pointers = layer_names
            .iter()
            .map(|layer_name| layer_name.as_ptr())
            .collect::<Vec<_>>();

        let flags = if resolved.has_extension(&portability_enumeration::NAME.to_string_lossy()) {
            InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            InstanceCreateFlags::empty()
        };

        let mut instance_create_info = InstanceCreateInfo::default()
            .application_info(&application_info)
            .enabled_extension_names(&extension_name_pointers)
            .enabled_layer_names(&layer_name_pointers)
            .flags(flags);

        let mut debug_messenger_create_info = self
            .creation_messenger
            .as_ref()
            .map(|(config, context)| debug_messenger::create_info(*config, context));
        if let Some(debug_messenger_create_info) = debug_messenger_create_info.as_mut() {
            instance_create_info = instance_create_info.push_next(debug_messenger_create_info);
        }

        let instance = unsafe { self.driver.create_instance(&instance_create_info) }
            .map_err(|code| BootstrapError::InstanceCreation { code })?;
        self.driver.instance_slot().set_live(true);
        debug!("Created instance for {}", app_name);

        Ok(Rc::new(InstanceGuard {
            instance,
            driver: self.driver,
            _creation_context: self.creation_messenger.map(|(_, context)| context),
        }))
    }
}

/// RAII for the instance. Dependents (the debug messenger) hold an `Rc` to it, so it can
/// only be destroyed once they are gone.
pub struct InstanceGuard<D: Driver> {
    instance: D::Instance,
    driver: Rc<D>,
    // the chained messenger reports during vkDestroyInstance, so this goes after the instance
    _creation_context: Option<Box<CallbackContext>>,
}

impl<D: Driver> InstanceGuard<D> {
    pub fn handle(&self) -> &D::Instance {
        &self.instance
    }

    pub fn get_driver(&self) -> &Rc<D> {
        &self.driver
    }

    /// Destroys the instance now. Refuses while anything else still holds the instance,
    /// in which case destruction is left to the last holder.
    pub fn destroy(self: Rc<Self>) -> Result<()> {
        match Rc::try_unwrap(self) {
            Ok(guard) => {
                drop(guard);
                Ok(())
            }
            Err(_) => Err(BootstrapError::OrderingViolation(
                "instance destroyed while dependent handles are still live",
            )),
        }
    }
}

impl<D: Driver> Drop for InstanceGuard<D> {
    fn drop(&mut self) {
        debug!("Dropping InstanceGuard");
        unsafe { self.driver.destroy_instance(&self.instance) }
        self.driver.instance_slot().set_live(false);
    }
}

impl<D: Driver> Deref for InstanceGuard<D> {
    type Target = D::Instance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}
