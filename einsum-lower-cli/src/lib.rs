//! Support code for the `lower-einsum` and `compare-backends` tools.
//!
//! `lower-einsum` rewrites the supported `Einsum` operators in a model using
//! [`einsum_lower::lower_einsum`]. `compare-backends` runs a model with a
//! baseline CPU runtime and with ONNX Runtime's DirectML execution provider,
//! then reports how far apart their outputs are.

pub mod backend;
pub mod compare;
pub mod input_shape;
pub mod logging;
