use std::{
    ffi::{c_void, CStr},
    fmt,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
};

use ash::vk::{
    self, Bool32, DebugUtilsMessageSeverityFlagsEXT, DebugUtilsMessageTypeFlagsEXT,
    DebugUtilsMessengerCallbackDataEXT, DebugUtilsMessengerCreateInfoEXT, DebugUtilsMessengerEXT,
};
use tracing::{debug, error, event, Level};

use crate::{
    driver::Driver,
    error::{BootstrapError, Result},
    instance::InstanceGuard,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Verbose,
    Info,
    Warning,
    Error,
}

impl Severity {
    fn from_flags(flags: DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if flags.contains(DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Severity::Error
        } else if flags.contains(DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Severity::Warning
        } else if flags.contains(DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Severity::Info
        } else {
            Severity::Verbose
        }
    }
}

/// Which kinds of problem a message is about. A message can be several at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageCategories {
    pub general: bool,
    pub validation: bool,
    pub performance: bool,
}

impl MessageCategories {
    fn from_flags(flags: DebugUtilsMessageTypeFlagsEXT) -> Self {
        Self {
            general: flags.contains(DebugUtilsMessageTypeFlagsEXT::GENERAL),
            validation: flags.contains(DebugUtilsMessageTypeFlagsEXT::VALIDATION),
            performance: flags.contains(DebugUtilsMessageTypeFlagsEXT::PERFORMANCE),
        }
    }
}

impl fmt::Display for MessageCategories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (self.general, "general"),
            (self.validation, "validation"),
            (self.performance, "performance"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect::<Vec<_>>();
        f.write_str(&names.join("|"))
    }
}

/// A driver diagnostic, decoded from the raw callback arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugRecord {
    pub severity: Severity,
    pub categories: MessageCategories,
    pub message: String,
}

/// Receives every message delivered to a registered messenger.
pub trait MessageSink {
    fn on_message(&self, record: &DebugRecord);
}

impl<F> MessageSink for F
where
    F: Fn(&DebugRecord),
{
    fn on_message(&self, record: &DebugRecord) {
        self(record)
    }
}

/// Forwards driver messages to `tracing` at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn on_message(&self, record: &DebugRecord) {
        let message = record.message.as_str();
        let ty = &record.categories;
        match record.severity {
            Severity::Verbose => event!(Level::TRACE, message = message, ty = %ty),
            Severity::Info => event!(Level::INFO, message = message, ty = %ty),
            Severity::Warning => event!(Level::WARN, message = message, ty = %ty),
            Severity::Error => event!(Level::ERROR, message = message, ty = %ty),
        }
    }
}

/// What a messenger listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessengerConfig {
    pub severities: DebugUtilsMessageSeverityFlagsEXT,
    pub categories: DebugUtilsMessageTypeFlagsEXT,
    /// Ask the driver to abort calls that triggered an error message. Only meant for
    /// testing the validation layers themselves.
    pub abort_on_error: bool,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            severities: DebugUtilsMessageSeverityFlagsEXT::ERROR
                | DebugUtilsMessageSeverityFlagsEXT::WARNING
                | DebugUtilsMessageSeverityFlagsEXT::INFO
                | DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
            categories: DebugUtilsMessageTypeFlagsEXT::GENERAL
                | DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                | DebugUtilsMessageTypeFlagsEXT::VALIDATION,
            abort_on_error: false,
        }
    }
}

pub(crate) struct CallbackContext {
    sink: Box<dyn MessageSink>,
    abort_on_error: bool,
}

impl CallbackContext {
    pub(crate) fn new(config: &MessengerConfig, sink: Box<dyn MessageSink>) -> Box<Self> {
        Box::new(Self {
            sink,
            abort_on_error: config.abort_on_error,
        })
    }
}

/// Builds the messenger create info. `context` must outlive every messenger created from it.
pub(crate) fn create_info(
    config: MessengerConfig,
    context: &CallbackContext,
) -> DebugUtilsMessengerCreateInfoEXT<'static> {
    let user_data = context as *const CallbackContext as *mut c_void;
    DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(config.severities)
        .message_type(config.categories)
        .pfn_user_callback(Some(vulkan_debug_utils_callback))
        .user_data(user_data)
}

unsafe extern "system" fn vulkan_debug_utils_callback(
    message_severity: DebugUtilsMessageSeverityFlagsEXT,
    message_type: DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const DebugUtilsMessengerCallbackDataEXT<'_>,
    p_user_data: *mut c_void,
) -> Bool32 {
    let message = if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        String::new()
    } else {
        CStr::from_ptr((*p_callback_data).p_message)
            .to_string_lossy()
            .into_owned()
    };
    let record = DebugRecord {
        severity: Severity::from_flags(message_severity),
        categories: MessageCategories::from_flags(message_type),
        message,
    };

    let context = (p_user_data as *const CallbackContext).as_ref();
    let delivered = panic::catch_unwind(AssertUnwindSafe(|| match context {
        Some(context) => context.sink.on_message(&record),
        None => TracingSink.on_message(&record),
    }));
    if delivered.is_err() {
        error!("Debug message sink panicked while handling a driver message");
    }

    match context {
        Some(context) if context.abort_on_error && record.severity == Severity::Error => vk::TRUE,
        // dont skip driver
        _ => vk::FALSE,
    }
}

/// RAII for a registered debug messenger
pub struct DebugMessenger<D: Driver> {
    messenger: DebugUtilsMessengerEXT,
    // boxed so the address handed to the driver stays put; freed after the messenger is gone
    _context: Box<CallbackContext>,
    // need to keep a reference to instance to ensure we get dropped before instance does
    instance: Rc<InstanceGuard<D>>,
}

impl<D: Driver> DebugMessenger<D> {
    pub fn try_new(
        instance: &Rc<InstanceGuard<D>>,
        config: MessengerConfig,
        sink: Box<dyn MessageSink>,
    ) -> Result<Self> {
        let context = CallbackContext::new(&config, sink);
        let debug_messenger_create_info = create_info(config, &context);
        let messenger = unsafe {
            instance
                .get_driver()
                .create_debug_utils_messenger(instance.handle(), &debug_messenger_create_info)
        }
        .map_err(|code| BootstrapError::MessengerCreation { code })?;
        debug!("Registered debug messenger");

        Ok(Self {
            messenger,
            _context: context,
            instance: Rc::clone(instance),
        })
    }
}

impl<D: Driver> Drop for DebugMessenger<D> {
    fn drop(&mut self) {
        debug!("Dropping DebugMessenger");
        unsafe {
            self.instance
                .get_driver()
                .destroy_debug_utils_messenger(self.instance.handle(), self.messenger)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessengerState {
    Unregistered,
    Registered,
}

/// Owns the optional debug messenger of an instance. Does nothing when debug tooling is
/// off.
pub struct DebugMessengerController<D: Driver> {
    enabled: bool,
    messenger: Option<DebugMessenger<D>>,
}

impl<D: Driver> DebugMessengerController<D> {
    pub fn new(debug_tooling_enabled: bool) -> Self {
        Self {
            enabled: debug_tooling_enabled,
            messenger: None,
        }
    }

    pub fn state(&self) -> MessengerState {
        match self.messenger {
            Some(_) => MessengerState::Registered,
            None => MessengerState::Unregistered,
        }
    }

    pub fn register(
        &mut self,
        instance: &Rc<InstanceGuard<D>>,
        config: MessengerConfig,
        sink: Box<dyn MessageSink>,
    ) -> Result<()> {
        if !self.enabled {
            debug!("Debug tooling disabled, not registering a debug messenger");
            return Ok(());
        }
        if self.messenger.is_some() {
            return Err(BootstrapError::OrderingViolation(
                "debug messenger registered twice",
            ));
        }
        self.messenger = Some(DebugMessenger::try_new(instance, config, sink)?);
        Ok(())
    }

    /// Destroys the messenger if there is one. Safe to call in any state.
    pub fn unregister(&mut self) {
        self.messenger = None;
    }
}
