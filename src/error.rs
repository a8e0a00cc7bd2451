use einsum_lower_onnx::protobuf::ProtobufError;
use thiserror::Error;

/// Errors that occur when loading, lowering or saving a model.
#[derive(Debug, Error)]
pub enum LowerError {
    #[error("failed to read or write model: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is not an ONNX model")]
    NotOnnx,

    #[error("failed to parse model: {0}")]
    Decode(#[from] ProtobufError),

    /// A matched node does not have exactly two inputs and one output.
    #[error("node \"{node}\" has {inputs} inputs and {outputs} outputs, expected 2 inputs and 1 output")]
    MalformedNode {
        node: String,
        inputs: usize,
        outputs: usize,
    },

    /// The graph declares a rank other than 5 for an operand of a matched
    /// node.
    #[error("operand \"{operand}\" of node \"{node}\" has rank {rank}, expected 5")]
    UnsupportedRank {
        node: String,
        operand: String,
        rank: usize,
    },

    /// Replacement positions passed to the rebuilder are out of range or not
    /// strictly increasing.
    #[error("invalid replacement for node index {index}")]
    InvalidReplacement { index: usize },
}
