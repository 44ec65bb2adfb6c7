//! Client for the Gemini file-search REST API: stores, documents,
//! resumable uploads and long-running operations.

pub mod client;
mod mime;
pub mod types;

pub use client::{Client, Error};
pub use mime::mime_type_for;
