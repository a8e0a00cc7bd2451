//! Utilities for building ONNX models in memory.
//!
//! These are mainly useful for tests which need small models containing
//! particular operators.

use einsum_lower_onnx::onnx::{
    self, DataType, Dimension, GraphProto, ModelProto, OperatorSetIdProto,
    StringStringEntryProto, TensorShapeProto, TypeProto, TypeProtoTensor, ValueInfoProto,
};
use einsum_lower_onnx::protobuf::EncodeMessage;

use crate::graph::Node;

/// Default ONNX opset version of built models.
pub const DEFAULT_OPSET: i64 = 17;

/// Create a float tensor value info with a given shape.
///
/// `None` entries in `shape` become symbolic dimensions named `d{index}`.
pub fn tensor_info(name: &str, shape: &[Option<i64>]) -> ValueInfoProto {
    let dim = shape
        .iter()
        .enumerate()
        .map(|(i, size)| match size {
            Some(size) => Dimension {
                dim_value: Some(*size),
                dim_param: None,
            },
            None => Dimension {
                dim_value: None,
                dim_param: Some(format!("d{}", i)),
            },
        })
        .collect();

    ValueInfoProto {
        name: Some(name.to_string()),
        r#type: Some(TypeProto {
            tensor_type: Some(TypeProtoTensor {
                elem_type: Some(DataType::FLOAT),
                shape: Some(TensorShapeProto { dim }),
            }),
            sequence: None,
        }),
    }
}

/// Create a float tensor value info without a shape.
pub fn unranked_tensor_info(name: &str) -> ValueInfoProto {
    ValueInfoProto {
        name: Some(name.to_string()),
        r#type: Some(TypeProto {
            tensor_type: Some(TypeProtoTensor {
                elem_type: Some(DataType::FLOAT),
                shape: None,
            }),
            sequence: None,
        }),
    }
}

/// Create a float tensor initializer.
pub fn float_tensor(name: &str, dims: &[usize], data: &[f32]) -> onnx::TensorProto {
    onnx::TensorProto {
        name: Some(name.to_string()),
        dims: dims.iter().map(|&size| size as i64).collect(),
        data_type: Some(DataType::FLOAT),
        raw_data: Some(data.iter().flat_map(|x| x.to_le_bytes()).collect()),
        ..Default::default()
    }
}

/// Create an `Einsum` node.
pub fn einsum_node(name: &str, a: &str, b: &str, output: &str, equation: &str) -> Node {
    Node::new("Einsum")
        .with_name(name)
        .with_input(a)
        .with_input(b)
        .with_output(output)
        .with_attr("equation", equation)
}

/// Builds a serialized `ModelProto` with a single graph.
pub struct ModelBuilder {
    graph: GraphProto,
    opset: i64,
    metadata: Vec<StringStringEntryProto>,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        ModelBuilder {
            graph: GraphProto {
                name: Some("main".to_string()),
                ..Default::default()
            },
            opset: DEFAULT_OPSET,
            metadata: Vec::new(),
        }
    }

    /// Set the version of the default operator set.
    pub fn opset(mut self, version: i64) -> Self {
        self.opset = version;
        self
    }

    pub fn input(mut self, info: ValueInfoProto) -> Self {
        self.graph.input.push(info);
        self
    }

    pub fn output(mut self, info: ValueInfoProto) -> Self {
        self.graph.output.push(info);
        self
    }

    pub fn value_info(mut self, info: ValueInfoProto) -> Self {
        self.graph.value_info.push(info);
        self
    }

    pub fn initializer(mut self, tensor: onnx::TensorProto) -> Self {
        self.graph.initializer.push(tensor);
        self
    }

    pub fn node(mut self, node: Node) -> Self {
        self.graph.node.push(node.to_proto());
        self
    }

    /// Add a `metadata_props` entry.
    pub fn metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.push(StringStringEntryProto {
            key: Some(key.to_string()),
            value: Some(value.to_string()),
        });
        self
    }

    pub fn build_proto(self) -> ModelProto {
        ModelProto {
            ir_version: Some(8),
            producer_name: Some(env!("CARGO_PKG_NAME").to_string()),
            graph: Some(self.graph),
            opset_import: vec![OperatorSetIdProto {
                domain: Some(String::new()),
                version: Some(self.opset),
            }],
            metadata_props: self.metadata,
            ..Default::default()
        }
    }

    /// Serialize the model.
    pub fn build(self) -> Vec<u8> {
        self.build_proto().encode()
    }
}
