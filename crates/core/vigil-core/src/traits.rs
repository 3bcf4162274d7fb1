//! Core traits for the Vigil stack.
//!
//! This module defines the small set of interfaces shared across Vigil
//! components.

use crate::VigilResult;
use uuid::Uuid;

/// Trait for objects with unique identities
pub trait Identifiable {
    /// Get the unique identifier for this object
    fn id(&self) -> Uuid;

    /// Get a human-readable name
    fn name(&self) -> &str;

    /// Get the type identifier
    fn type_name(&self) -> &'static str;
}

/// Trait for validatable objects
///
/// Configuration structs implement this so lifecycle code can reject bad
/// settings before any background task is spawned.
pub trait Validatable {
    /// Validate this object
    fn validate(&self) -> VigilResult<()>;

    /// Check if this object is valid
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
