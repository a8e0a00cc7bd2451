//! einsum-lower rewrites `Einsum` operators in [ONNX](https://onnx.ai) models
//! into operators which execution backends with limited operator coverage,
//! such as DirectML, can run.
//!
//! # Supported operators
//!
//! Two `Einsum` equations are lowered. Both treat the three leading axes as
//! batch axes and contract a pair of trailing axes:
//!
//! | Equation | Lowered form |
//! |---|---|
//! | `hbwpc,hbwqc->hbwpq` | `MatMul(A[batch, p, c], Transpose(B[batch, q, c]))` |
//! | `hbwij,hbwjc->hbwic` | `MatMul(A[batch, i, j], B[batch, j, c])` |
//!
//! Flattening and restoring the batch axes uses `Shape`, `Slice`,
//! `ReduceProd`, `Gather`, `Concat` and `Reshape` operators, so inputs may
//! have dynamic shapes. Equations are compared exactly. Other `Einsum` nodes,
//! and all other operators, are left as they are.
//!
//! # Usage
//!
//! ```no_run
//! use einsum_lower::{LowerOptions, Model, lower_einsum};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut model = Model::load_file("model.onnx")?;
//! let report = lower_einsum(&mut model, &LowerOptions::default())?;
//! println!("Lowered {} operators", report.lowered.len());
//! model.save_file("model.lowered.onnx")?;
//! # Ok(()) }
//! ```
//!
//! Saving a model only replaces the operators of its top-level graph.
//! Initializers, metadata and all other fields are written exactly as they
//! were loaded.

mod error;
mod graph;
mod lower;
mod model;

pub mod builder;
pub mod names;
pub mod pattern;
pub mod rebuild;
pub mod synth;

pub use error::LowerError;
pub use graph::{AttrValue, Attribute, Graph, Node, ValueInfo, int64_tensor};
pub use lower::{LowerOptions, LowerReport, LoweredNode, SkippedNode, lower_einsum};
pub use model::Model;
pub use pattern::Pattern;
