//! Protocol Buffers message decoder and encoder.
//!
//! This module provides a low-level API for decoding [Protocol
//! Buffers](https://protobuf.dev/) messages from an in-memory buffer and for
//! encoding them again. Decoders choose which fields are read and which are
//! skipped. Each decoded field records where it was found in the buffer, which
//! allows callers to copy fields they do not modify without re-encoding them.
//!
//! # Prerequisites
//!
//! To use this library, it is helpful to have an understanding of how Protocol
//! Buffers messages are encoded. See
//! <https://protobuf.dev/programming-guides/encoding/> for a guide.
//!
//! # Defining decoders and encoders
//!
//! Implement [`DecodeMessage`] for a type to deserialize it from a message,
//! using [`Fields`] to visit the fields of the message. Implement
//! [`EncodeMessage`] to serialize it using an [`Encoder`].

mod encoder;
mod errors;
mod field;
mod message;
pub mod varint;

pub use encoder::Encoder;
pub use errors::{ErrorKind, ProtobufError};
pub use field::{Field, FieldValue, Fields, WireType};
pub use message::{DecodeMessage, EncodeMessage};
