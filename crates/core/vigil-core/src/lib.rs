//! # Vigil Core
//!
//! Core error types, traits, and shared utilities for the Vigil observability
//! stack. This crate provides the foundational pieces the other Vigil crates
//! depend on.
//!
//! ## Features
//!
//! - **Error Handling**: Standardized error types and result aliases
//! - **Configuration**: Typed file-based configuration loading with validation
//! - **Traits**: Common validation and identity interfaces
//! - **Utilities**: String and time helpers shared across the stack
//!
//! ## Quick Start
//!
//! ```rust
//! use vigil_core::{VigilResult, VigilError};
//!
//! fn example_function() -> VigilResult<String> {
//!     Ok("Hello Vigil!".to_string())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod traits;
pub mod utils;

// Re-export commonly used items
pub use error::{VigilError, VigilResult};
pub use traits::{Identifiable, Validatable};

/// Version information for the Vigil Core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the Vigil Core library
pub const NAME: &str = env!("CARGO_PKG_NAME");
