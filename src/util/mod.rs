//! Shared utilities

pub mod cache;
pub mod config;
pub mod diagnostic;
pub mod interning;

pub use cache::InMemoryLoadingCache;
pub use config::{Config, MatchingFile};
pub use diagnostic::Diagnostic;
pub use interning::{InternedString, Interner};
