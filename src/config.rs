use std::num::ParseIntError;

use ash::vk::{make_api_version, API_VERSION_1_0};

const API_VERSION: u32 = API_VERSION_1_0;
const ENGINE_NAME: &str = "No Engine";

#[cfg(feature = "enable_validations")]
const ENABLE_VALIDATIONS: bool = true;
#[cfg(not(feature = "enable_validations"))]
const ENABLE_VALIDATIONS: bool = false;

/// `major.minor.patch` of the application, packed with `make_api_version` when handed to
/// the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppVersion(pub u32, pub u32, pub u32);

impl AppVersion {
    pub fn packed(&self) -> u32 {
        make_api_version(0, self.0, self.1, self.2)
    }
}

/// Process-wide settings for the bootstrap. Built once at startup and passed down by
/// reference, never read from a global.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub app_version: AppVersion,
    pub engine_name: String,
    pub api_version: u32,
    /// Enables the validation layer, the debug utils extension and the debug messenger.
    pub debug_tooling_enabled: bool,
}

impl AppConfig {
    /// Reads the application metadata cargo baked into the binary and the
    /// `enable_validations` feature.
    pub fn from_build_env() -> Result<Self, ParseIntError> {
        let version_major = env!("CARGO_PKG_VERSION_MAJOR").parse::<u32>()?;
        let version_minor = env!("CARGO_PKG_VERSION_MINOR").parse::<u32>()?;
        let version_patch = env!("CARGO_PKG_VERSION_PATCH").parse::<u32>()?;

        Ok(Self {
            app_name: env!("CARGO_PKG_NAME").to_owned(),
            app_version: AppVersion(version_major, version_minor, version_patch),
            engine_name: ENGINE_NAME.to_owned(),
            api_version: API_VERSION,
            debug_tooling_enabled: ENABLE_VALIDATIONS,
        })
    }

    pub fn with_debug_tooling(mut self, enabled: bool) -> Self {
        self.debug_tooling_enabled = enabled;
        self
    }
}
