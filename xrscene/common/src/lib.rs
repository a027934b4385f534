mod inputs;
mod logging;
mod primitives;

pub use anyhow;
pub use glam;
pub use log;
pub use once_cell;

pub use inputs::*;
pub use log::{debug, error, info, warn};
pub use logging::*;
pub use primitives::*;
