//! Core types and trait definitions for the Beacon incident service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::IncidentStore`] and
//! [`identity::IdentityProvider`]; every operation lives on
//! [`service::Reporting`], which is built once and handed to the transport
//! layer.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod feed;
pub mod hotline;
pub mod identity;
pub mod lifecycle;
pub mod notice;
pub mod policy;
pub mod profile;
pub mod report;
pub mod service;
pub mod store;
pub mod view;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use profile::UserId;
