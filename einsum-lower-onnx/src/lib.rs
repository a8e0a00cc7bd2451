//! This crate reads, writes and splices [ONNX][onnx] model files.
//!
//! # About ONNX models
//!
//! ONNX models are [Protocol Buffers][protobuf] messages using the `ModelProto`
//! schema from
//! [onnx.proto](https://github.com/onnx/onnx/blob/main/onnx/onnx.proto). The
//! model structure is described by a graph, whose operators are a repeated
//! `node` field of `GraphProto`.
//!
//! # Usage
//!
//! To decode the graph of a model held in memory:
//!
//! ```no_run
//! use einsum_lower_onnx::onnx::ModelProto;
//! use einsum_lower_onnx::protobuf::DecodeMessage;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let buffer = std::fs::read("model.onnx")?;
//! let model = ModelProto::decode(&buffer)?;
//! let op_count = model.graph.as_ref().map(|g| g.node.len()).unwrap_or(0);
//! println!("Model has {} operators", op_count);
//! # Ok(()) }
//! ```
//!
//! To replace the operators of a model while keeping every other field
//! exactly as it was serialized:
//!
//! ```no_run
//! use einsum_lower_onnx::splice::{graph_node_payloads, replace_graph_nodes};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let buffer = std::fs::read("model.onnx")?;
//! let mut nodes = graph_node_payloads(&buffer)?;
//! nodes.reverse();
//! let spliced = replace_graph_nodes(&buffer, &nodes)?;
//! # Ok(()) }
//! ```
//!
//! # Design
//!
//! Tools which rewrite part of a model should not lose information they do not
//! understand, such as metadata, doc strings or fields added in newer versions
//! of the schema. Decoding into typed messages and re-encoding them would drop
//! anything the message types don't model. Instead the decoder in
//! [`protobuf`] works on a borrowed buffer and reports the byte span of every
//! field it reads, so that [`splice`] can copy everything except the replaced
//! fields verbatim.
//!
//! [onnx]: https://onnx.ai/onnx/
//! [protobuf]: https://protobuf.dev/

// This is a crate for parsing potentially untrusted files, so it is preferable
// to avoid unsafe code.
#![forbid(unsafe_code)]

pub mod onnx;
pub mod protobuf;
pub mod splice;
