//! Test utilities for Gantry unit tests.
//!
//! [`fixtures`] holds a small model type hierarchy with plugins that bind
//! project types and features to it, and a JVM-flavored attribute schema with
//! matching candidates.
//!
//! # Example
//!
//! ```rust,ignore
//! use gantry::test_support::fixtures;
//!
//! #[test]
//! fn test_example() {
//!     let types = fixtures::ModelTypes::new();
//!     let project = fixtures::project(&types);
//!     project.configure("library", |_| Ok(())).unwrap();
//! }
//! ```

pub mod fixtures;

// Re-export fixtures for convenience
pub use fixtures::*;
