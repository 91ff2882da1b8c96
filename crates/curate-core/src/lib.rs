//! Core types, store traits, and the two engines of the Curate repository
//! backend: embargo lifecycle management and local-authority merging.
//!
//! This crate has no HTTP or database dependencies.
//! Backends implement [`store::ObjectStore`], [`store::ReferenceIndex`] and
//! [`policy::PolicyTitleResolver`]; everything else is built on those.

// Native `async fn` in traits; the advisory lint about `Send` bounds on the
// returned futures is silenced.
#![allow(async_fn_in_trait)]

pub mod authority;
pub mod embargo;
pub mod error;
pub mod lifecycle;
pub mod merge;
pub mod object;
pub mod policy;
pub mod relation;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
