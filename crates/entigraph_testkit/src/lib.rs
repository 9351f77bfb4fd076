//! # EntiGraph Testkit
//!
//! Test utilities for EntiGraph.
//!
//! This crate provides:
//! - Sample schemas and context fixtures
//! - Property-based test generators using proptest
//! - Crash recovery helpers over the journal backends
//! - Cross-crate integration and stress tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entigraph_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_context() {
//!     with_temp_context(people_registry(), |ctx| {
//!         ctx.create("Person", person("Ahmed", 29)).unwrap();
//!         assert!(ctx.save().unwrap());
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
