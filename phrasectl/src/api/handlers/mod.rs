//! HTTP request handlers.
//!
//! - [`run`]: `POST /run_cpp`, the transformer round trip
//! - [`static_assets`]: landing page and other embedded frontend files
//!
//! Handlers return [`crate::errors::Error`], which converts to the right status code and body.

pub mod run;
pub mod static_assets;
