//! Recognition of `Einsum` nodes which can be lowered.

use crate::graph::Node;

/// Batched matmul with a transposed second operand, contracting the last
/// axis of both inputs.
pub const EQUATION_TRANS_B: &str = "hbwpc,hbwqc->hbwpq";

/// Batched matmul contracting the last axis of the first input with the
/// fourth axis of the second input.
pub const EQUATION_MATMUL: &str = "hbwij,hbwjc->hbwic";

/// Rank of the operands and output of the supported equations.
pub const EINSUM_RANK: usize = 5;

/// Number of leading axes which are flattened into a single batch axis.
pub const BATCH_AXES: usize = 3;

/// Einsum equations which can be lowered to `MatMul`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    /// `hbwpc,hbwqc->hbwpq`
    BatchedMatMulTransB,
    /// `hbwij,hbwjc->hbwic`
    BatchedMatMul,
}

/// Identifies one of the two inputs of an `Einsum` node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    A,
    B,
}

/// Named extent of a matrix axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Extent {
    P,
    Q,
    C,
}

/// Describes how a matched equation maps onto a batched matmul.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PatternConfig {
    /// Operand and axis each of the extents `p`, `q` and `c` is read from,
    /// indexed by [`Extent`].
    pub sources: [(Operand, usize); 3],

    /// Matrix extents of A after flattening the batch axes.
    pub a_dims: [Extent; 2],

    /// Matrix extents of B after flattening the batch axes.
    pub b_dims: [Extent; 2],

    /// Whether B must be transposed to `[batch, k, n]` before the matmul.
    pub transpose_b: bool,

    /// Extents of the output after the batch axes.
    pub out_dims: [Extent; 2],
}

impl PatternConfig {
    pub fn source(&self, extent: Extent) -> (Operand, usize) {
        self.sources[extent as usize]
    }
}

impl Pattern {
    pub fn equation(self) -> &'static str {
        match self {
            Pattern::BatchedMatMulTransB => EQUATION_TRANS_B,
            Pattern::BatchedMatMul => EQUATION_MATMUL,
        }
    }

    /// Return the pattern for an equation. Only exact matches are accepted.
    pub fn from_equation(equation: &[u8]) -> Option<Pattern> {
        [Pattern::BatchedMatMulTransB, Pattern::BatchedMatMul]
            .into_iter()
            .find(|pattern| pattern.equation().as_bytes() == equation)
    }

    /// Test whether `node` is an `Einsum` with a supported equation.
    pub fn match_node(node: &Node) -> Option<Pattern> {
        if !is_einsum(node) {
            return None;
        }
        Self::from_equation(einsum_equation(node)?)
    }

    pub fn config(self) -> PatternConfig {
        use Extent::{C, P, Q};
        use Operand::{A, B};

        match self {
            Pattern::BatchedMatMulTransB => PatternConfig {
                sources: [(A, 3), (B, 3), (B, 4)],
                a_dims: [P, C],
                b_dims: [Q, C],
                transpose_b: true,
                out_dims: [P, Q],
            },
            Pattern::BatchedMatMul => PatternConfig {
                sources: [(A, 3), (A, 4), (B, 4)],
                a_dims: [P, Q],
                b_dims: [Q, C],
                transpose_b: false,
                out_dims: [P, C],
            },
        }
    }
}

/// Return true if `domain` is the default ONNX operator domain.
pub fn is_default_domain(domain: Option<&str>) -> bool {
    matches!(domain, None | Some("") | Some("ai.onnx"))
}

/// Return true if `node` is an `Einsum` operator from the default domain.
pub fn is_einsum(node: &Node) -> bool {
    node.op_type() == "Einsum" && is_default_domain(node.domain())
}

/// Return the `equation` attribute of a node.
pub fn einsum_equation(node: &Node) -> Option<&[u8]> {
    node.attr("equation")?.as_bytes()
}
