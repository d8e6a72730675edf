//! # Chaos Core
//!
//! Host-side data model for the chaos attractor effect: points, spatial bounds,
//! the per-particle ring buffer layout shared with the GPU update kernel, and the
//! attractor contract the kernel implements.

pub mod attractor;
pub mod config;
pub mod constants;
pub mod history;
pub mod point;
pub mod ring_buffer;

pub use attractor::*;
pub use config::*;
pub use constants::*;
pub use history::*;
pub use point::*;
pub use ring_buffer::*;
