//! Core types and trait definitions for the Cram study store.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! intelligent-review selector lives here as a pure algorithm over the
//! [`review::ReviewSource`] trait; storage backends supply the data. Study
//! material for new topics comes from a [`generate::MaterialGenerator`].

pub mod error;
pub mod generate;
pub mod review;
pub mod store;
pub mod topic;

pub use error::{Error, Result};
