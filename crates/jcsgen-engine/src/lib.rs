#![doc = include_str!("../README.md")]

//! jcsgen harness engine.
//!
//! This crate wires the data model to the native translator: harness
//! construction, linearization search, result merging, the streaming
//! document pipeline, and scenario enumeration.

pub mod enumeration;
pub mod harness;
pub mod linearize;
pub mod pipeline;
pub mod results;
