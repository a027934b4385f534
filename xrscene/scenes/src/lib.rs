mod app;
mod controller_actions;
mod hand_tracking;
mod menu;
mod pause;
mod scene;

pub use app::*;
pub use controller_actions::*;
pub use hand_tracking::*;
pub use menu::*;
pub use pause::*;
pub use scene::*;
