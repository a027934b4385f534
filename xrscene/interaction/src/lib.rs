mod actions;
mod bindings;
mod components;
mod edge;
mod profiles;
mod runtime;
mod state;

#[cfg(feature = "openxr")]
mod openxr_runtime;

pub mod mock;

pub use actions::*;
pub use bindings::*;
pub use components::*;
pub use edge::*;
pub use profiles::*;
pub use runtime::*;
pub use state::*;

#[cfg(feature = "openxr")]
pub use openxr_runtime::*;
