use anyhow::Result;
use simple_logger::{set_up_color_terminal, SimpleLogger};

/// Installs the terminal logger that `tracing` events are forwarded to. `RUST_LOG` narrows
/// the level when set.
pub fn init_logging() -> Result<()> {
    set_up_color_terminal();
    let logger = SimpleLogger::new().env();
    logger.init()?;
    Ok(())
}
