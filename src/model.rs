use std::path::Path;

use einsum_lower_onnx::onnx::is_onnx_model;
use einsum_lower_onnx::splice::{graph_payload, replace_graph_nodes};

use crate::error::LowerError;
use crate::graph::{Graph, Node};

/// An ONNX model whose top-level node list can be replaced.
///
/// The model keeps the bytes it was loaded from. Saving re-emits those bytes
/// with only the `node` fields of the top-level graph replaced, so metadata,
/// initializers and fields this crate does not understand are preserved
/// exactly.
pub struct Model {
    data: Vec<u8>,
    graph: Graph,
    nodes_replaced: bool,
}

impl Model {
    /// Load a model from a serialized `ModelProto`.
    pub fn load(data: Vec<u8>) -> Result<Model, LowerError> {
        if !is_onnx_model(&data) {
            return Err(LowerError::NotOnnx);
        }
        let graph = Graph::decode(graph_payload(&data)?)?;
        Ok(Model {
            data,
            graph,
            nodes_replaced: false,
        })
    }

    /// Load a model from a `.onnx` file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Model, LowerError> {
        let data = std::fs::read(path)?;
        Self::load(data)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Replace the operators of the top-level graph.
    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        self.graph.nodes = nodes;
        self.nodes_replaced = true;
    }

    /// Serialize the model.
    ///
    /// If the nodes were never replaced, this returns the bytes the model was
    /// loaded from.
    pub fn save(&self) -> Result<Vec<u8>, LowerError> {
        if !self.nodes_replaced {
            return Ok(self.data.clone());
        }
        let nodes: Vec<_> = self.graph.nodes.iter().map(|node| node.encode()).collect();
        let data = replace_graph_nodes(&self.data, &nodes)?;
        Ok(data)
    }

    /// Serialize the model and write it to `path`.
    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<(), LowerError> {
        std::fs::write(path, self.save()?)?;
        Ok(())
    }
}
