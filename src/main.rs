use std::rc::Rc;

use anyhow::{Context, Result};
use hello_vulkan::{
    init_logging, initialize, query_physical_devices, AppConfig, DisplayExtensions, TracingSink,
    VulkanContext, VulkanDriver,
};
use tracing::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    raw_window_handle::HasDisplayHandle,
    window::{Window, WindowId},
};

const WINDOW_WIDTH: u32 = 800;
const WINDOW_HEIGHT: u32 = 600;
const WINDOW_TITLE: &str = "Vulkan";

fn main() -> Result<()> {
    init_logging()?;

    let config = AppConfig::from_build_env()?;
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.startup_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct App {
    config: AppConfig,
    /// The Vulkan instance and its debug messenger. Declared before the window so it is
    /// always released first.
    vulkan: Option<VulkanContext<VulkanDriver>>,
    /// The actual window presented to the user
    window: Option<Window>,
    /// Why startup was abandoned, reported once the event loop returns
    startup_error: Option<anyhow::Error>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            vulkan: None,
            window: None,
            startup_error: None,
        }
    }

    /// Creates the window that will interact with the OS to draw the results on the screen
    fn init_window(event_loop: &ActiveEventLoop) -> Result<Window> {
        let attributes = Window::default_attributes()
            .with_inner_size(PhysicalSize::<u32>::from((WINDOW_WIDTH, WINDOW_HEIGHT)))
            .with_resizable(false)
            .with_active(true)
            .with_title(WINDOW_TITLE);
        Ok(event_loop.create_window(attributes)?)
    }

    fn init_vulkan(&self, event_loop: &ActiveEventLoop) -> Result<VulkanContext<VulkanDriver>> {
        let driver = Rc::new(VulkanDriver::load().context("Failed to load Vulkan")?);
        let windowing = DisplayExtensions::new(event_loop.display_handle()?.as_raw());
        let context = initialize(driver, &self.config, &windowing, Box::new(TracingSink))
            .context("Failed to create the Vulkan instance")?;

        let physical_devices = query_physical_devices(context.instance())?;
        if physical_devices.is_empty() {
            warn!("No graphics capable physical device found");
        }
        for (rank, physical_device) in physical_devices.iter().enumerate() {
            info!("Physical device #{}: {}", rank, physical_device);
        }

        Ok(context)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let started = Self::init_window(event_loop)
            .and_then(|window| Ok((self.init_vulkan(event_loop)?, window)));
        match started {
            Ok((vulkan, window)) => {
                self.vulkan = Some(vulkan);
                self.window = Some(window);
            }
            Err(err) => {
                self.startup_error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let WindowEvent::CloseRequested = event {
            info!("Window closed, shutting down");
            if let Some(vulkan) = self.vulkan.take() {
                if let Err(err) = vulkan.teardown() {
                    error!("{}", err);
                }
            }
            self.window = None;
            event_loop.exit();
        }
    }
}
