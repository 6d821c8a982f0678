//! Shared types for the telemon workspace.
//!
//! Everything in here is plain data: metric samples, severity and health
//! status enums, a fixed-capacity ring used by the history buffers, and the
//! window parser used by query surfaces.

pub mod id;
pub mod ring;
pub mod types;
pub mod window;
