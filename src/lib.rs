pub mod capabilities;
pub mod config;
pub mod debug_messenger;
pub mod driver;
pub mod error;
pub mod instance;
mod logging;
pub mod physical_device;
pub mod requirements;
pub mod window;

use std::rc::Rc;

use tracing::info;

pub use crate::{
    capabilities::{probe, CapabilitySet},
    config::{AppConfig, AppVersion},
    debug_messenger::{
        DebugMessengerController, DebugRecord, MessageCategories, MessageSink, MessengerConfig,
        MessengerState, Severity, TracingSink,
    },
    driver::{Driver, InstanceSlot, VulkanDriver},
    error::{BootstrapError, CapabilityKind, Result},
    instance::{InstanceBuilder, InstanceGuard},
    logging::init_logging,
    physical_device::{query_physical_devices, PhysicalDeviceInfo},
    requirements::{resolve, RequirementSpec, ResolvedConfig},
    window::{DisplayExtensions, WindowingCollaborator},
};

/// Everything the bootstrap acquired. Fields drop in declaration order, which is the
/// reverse of acquisition: the debug messenger goes before the instance.
pub struct VulkanContext<D: Driver> {
    debug_messenger: DebugMessengerController<D>,
    instance: Rc<InstanceGuard<D>>,
    resolved: ResolvedConfig,
}

impl<D: Driver> VulkanContext<D> {
    pub fn instance(&self) -> &Rc<InstanceGuard<D>> {
        &self.instance
    }

    pub fn resolved(&self) -> &ResolvedConfig {
        &self.resolved
    }

    pub fn messenger_state(&self) -> MessengerState {
        self.debug_messenger.state()
    }

    /// Unregisters the debug messenger, then destroys the instance. Fails with
    /// [`BootstrapError::OrderingViolation`] if the instance is still shared elsewhere.
    pub fn teardown(self) -> Result<()> {
        let Self {
            mut debug_messenger,
            instance,
            ..
        } = self;
        debug_messenger.unregister();
        instance.destroy()
    }
}

/// Probes the driver, resolves what the application and windowing system need, creates the
/// instance and, when debug tooling is on, registers a debug messenger delivering to `sink`.
/// Messages raised while the instance itself is created or destroyed go to `sink` as well.
///
/// Nothing is left behind on failure: an instance created before a later step fails is
/// destroyed on the way out.
pub fn initialize<D: Driver>(
    driver: Rc<D>,
    config: &AppConfig,
    windowing: &dyn WindowingCollaborator,
    sink: Box<dyn MessageSink>,
) -> Result<VulkanContext<D>> {
    let capabilities = probe(&*driver)?;
    let requirements = RequirementSpec::for_window(
        windowing.required_instance_extensions()?,
        config.debug_tooling_enabled,
    );
    let resolved = resolve(&capabilities, &requirements)?;

    let messenger_config = MessengerConfig::default();
    let sink: Rc<dyn MessageSink> = Rc::from(sink);
    let mut builder = InstanceBuilder::new(driver, config);
    if config.debug_tooling_enabled {
        builder = builder.with_creation_messenger(messenger_config, shared_sink(&sink));
    }
    let instance = builder.build(&config.app_name, config.app_version, &resolved)?;

    let mut debug_messenger = DebugMessengerController::new(config.debug_tooling_enabled);
    debug_messenger.register(&instance, messenger_config, shared_sink(&sink))?;

    info!(
        "Vulkan instance ready ({} extensions, {} layers, validation {})",
        resolved.extensions.len(),
        resolved.layers.len(),
        if config.debug_tooling_enabled { "on" } else { "off" }
    );

    Ok(VulkanContext {
        debug_messenger,
        instance,
        resolved,
    })
}

fn shared_sink(sink: &Rc<dyn MessageSink>) -> Box<dyn MessageSink> {
    let sink = Rc::clone(sink);
    Box::new(move |record: &DebugRecord| sink.on_message(record))
}
