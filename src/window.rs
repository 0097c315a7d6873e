use std::ffi::CStr;

use raw_window_handle::RawDisplayHandle;

use crate::error::{BootstrapError, Result};

/// The windowing system the instance presents to. Owns the window and its event pump; the
/// bootstrap only asks which instance extensions it needs.
pub trait WindowingCollaborator {
    fn required_instance_extensions(&self) -> Result<Vec<String>>;
}

/// A fixed list, for hosts that know their extensions up front.
impl WindowingCollaborator for Vec<String> {
    fn required_instance_extensions(&self) -> Result<Vec<String>> {
        Ok(self.clone())
    }
}

/// Asks `ash-window` which surface extensions the display's platform needs.
pub struct DisplayExtensions {
    display: RawDisplayHandle,
}

impl DisplayExtensions {
    pub fn new(display: RawDisplayHandle) -> Self {
        Self { display }
    }
}

impl WindowingCollaborator for DisplayExtensions {
    fn required_instance_extensions(&self) -> Result<Vec<String>> {
        let extensions = ash_window::enumerate_required_extensions(self.display)
            .map_err(|code| BootstrapError::Windowing { code })?;
        Ok(extensions
            .iter()
            .map(|extension| unsafe { CStr::from_ptr(*extension) }.to_string_lossy().into_owned())
            .collect())
    }
}
