//! # Hermes Negotiate
//!
//! Media-type negotiation and the codec registry it resolves against.
//!
//! - [`TypeGraph`] - Weighted media-type sets parsed from headers
//! - [`CodecRegistry`] - Encoder/decoder constructors keyed by media type
//! - [`ContentNegotiation`] - Picks the response encoder and request decoder
//! - [`codec`] - Built-in JSON, XML, form, text, and byte codecs

#![doc(html_root_url = "https://docs.rs/hermes-negotiate/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod codec;
mod graph;
mod negotiator;
mod registry;

pub use graph::{AcceptEntry, TypeGraph};
pub use negotiator::{ContentNegotiation, ResponseEncoder};
pub use registry::CodecRegistry;
