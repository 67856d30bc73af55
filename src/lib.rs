//! Purrloft library crate — re-exports all modules for integration testing.
//!
//! The binary crate (`main.rs`) is the actual entry point.
//! This library crate exposes the same modules so that `tests/` integration
//! tests can import sim types, systems, and resources without needing a
//! window or GPU.

pub mod shared;
pub mod cat;
pub mod tower;
pub mod happiness;
pub mod save;
