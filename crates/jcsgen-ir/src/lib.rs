#![doc = include_str!("../README.md")]

//! jcsgen data model.
//!
//! This crate defines the method-call descriptor, the persistent invocation
//! sequence that linearizations are built from, and the typed scenario schema
//! shared by the harness builder, the native translator and the enumerator.

pub mod invocation;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
pub mod schema;
pub mod sequence;

pub use invocation::Invocation;
pub use schema::{Language, Schema, SchemaError, SequenceSchema};
pub use sequence::{InvocationSequence, SequenceError};
