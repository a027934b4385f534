//! In-memory runtime and scene graph. Used by the tests and by the mock client to drive scenes
//! without an XR device.

mod objects;
mod runtime;

pub use objects::*;
pub use runtime::*;
