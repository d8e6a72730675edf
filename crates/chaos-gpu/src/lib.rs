//! # Chaos GPU
//!
//! Device-side half of the attractor effect: buffer provisioning, the shader
//! program store, and the compute-then-render frame pipeline.

pub mod camera;
pub mod context;
pub mod frame;
pub mod params;
pub mod pipeline;
pub mod provision;
pub mod shader_library;

pub use camera::*;
pub use context::*;
pub use frame::*;
pub use params::*;
pub use pipeline::*;
pub use provision::{provision, provision_slice, read_back, Provisioned, StagingRelease};
pub use shader_library::*;
