//! Synthesis of the operator sequence which replaces a matched `Einsum`.
//!
//! Both supported equations flatten the three leading axes of each operand
//! into one batch axis, multiply the resulting 3D tensors and restore the
//! batch axes afterwards. All shapes are computed from the operands at
//! runtime, so the replacement works with dynamic dimensions.
//!
//! For `hbwpc,hbwqc->hbwpq` the emitted nodes compute:
//!
//! ```text
//! shape_a = Shape(a)
//! shape_b = Shape(b)
//! batch_shape = Slice(shape_a, [0], [3], [0])
//! batch_size = ReduceProd(batch_shape, keepdims=1)
//! p = Gather(shape_a, [3])
//! q = Gather(shape_b, [3])
//! c = Gather(shape_b, [4])
//! a_3d = Reshape(a, Concat(batch_size, p, c))
//! b_3d = Reshape(b, Concat(batch_size, q, c))
//! b_3d_t = Transpose(b_3d, perm=[0, 2, 1])
//! matmul = MatMul(a_3d, b_3d_t)
//! y = Reshape(matmul, Concat(batch_shape, p, q))
//! ```

use crate::error::LowerError;
use crate::graph::{Node, int64_tensor};
use crate::pattern::{BATCH_AXES, Extent, Operand, Pattern};

/// Collects synthesized nodes whose names share a common prefix.
struct Emitter<'a> {
    prefix: &'a str,
    nodes: Vec<Node>,
}

impl<'a> Emitter<'a> {
    fn new(prefix: &'a str) -> Self {
        Emitter {
            prefix,
            nodes: Vec::new(),
        }
    }

    fn name(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix, suffix)
    }

    /// Add `node` with an output named `{prefix}{suffix}` and return the
    /// output name.
    fn emit(&mut self, node: Node, suffix: &str) -> String {
        let output = self.name(suffix);
        let node = node
            .with_name(&format!("{}_node", output))
            .with_output(&output);
        self.nodes.push(node);
        output
    }

    fn op(&mut self, op_type: &str, inputs: &[&str], suffix: &str) -> String {
        let node = inputs
            .iter()
            .fold(Node::new(op_type), |node, input| node.with_input(input));
        self.emit(node, suffix)
    }

    /// Add a `Constant` producing a 1D int64 tensor.
    fn constant(&mut self, suffix: &str, values: &[i64]) -> String {
        let tensor_name = format!("{}_value", self.name(suffix));
        let value = int64_tensor(&tensor_name, &[values.len()], values);
        self.emit(Node::new("Constant").with_attr("value", value), suffix)
    }

    /// Add a `Concat` of 1D tensors along axis 0.
    fn concat(&mut self, inputs: &[&str], suffix: &str) -> String {
        let node = inputs
            .iter()
            .fold(Node::new("Concat"), |node, input| node.with_input(input))
            .with_attr("axis", 0i64);
        self.emit(node, suffix)
    }
}

/// Return the input and output names of a binary operator with one output.
fn binary_operands(node: &Node) -> Result<(&str, &str, &str), LowerError> {
    match (node.inputs(), node.outputs()) {
        ([a, b], [out]) if !a.is_empty() && !b.is_empty() && !out.is_empty() => {
            Ok((a.as_str(), b.as_str(), out.as_str()))
        }
        (inputs, outputs) => Err(LowerError::MalformedNode {
            node: node.display_name().to_string(),
            inputs: inputs.iter().filter(|name| !name.is_empty()).count(),
            outputs: outputs.iter().filter(|name| !name.is_empty()).count(),
        }),
    }
}

/// Create the nodes which compute the same result as the `Einsum` `node`,
/// which matches `pattern`, using only shape operations, `Transpose` and
/// `MatMul`.
///
/// The returned nodes are in execution order. The last node writes the output
/// of `node`. All other nodes, and the values they produce, have names
/// starting with `prefix`.
pub fn synthesize(node: &Node, pattern: Pattern, prefix: &str) -> Result<Vec<Node>, LowerError> {
    let (a, b, out) = binary_operands(node)?;
    let config = pattern.config();
    let mut sub = Emitter::new(prefix);

    let shape_a = sub.op("Shape", &[a], "shape_a");
    let shape_b = sub.op("Shape", &[b], "shape_b");

    let starts = sub.constant("slice_starts", &[0]);
    let ends = sub.constant("slice_ends", &[BATCH_AXES as i64]);
    let axes = sub.constant("slice_axes", &[0]);
    let batch_shape = sub.op("Slice", &[&shape_a, &starts, &ends, &axes], "batch_shape");
    let batch_size = sub.emit(
        Node::new("ReduceProd")
            .with_input(&batch_shape)
            .with_attr("keepdims", 1i64),
        "batch_size",
    );

    // Gathering with a 1-element index vector yields a 1-element vector,
    // which can be concatenated into shapes directly.
    let extents = [(Extent::P, "p"), (Extent::Q, "q"), (Extent::C, "c")].map(|(extent, suffix)| {
        let (operand, axis) = config.source(extent);
        let shape = match operand {
            Operand::A => &shape_a,
            Operand::B => &shape_b,
        };
        let index = sub.constant(&format!("{}_index", suffix), &[axis as i64]);
        sub.emit(
            Node::new("Gather")
                .with_input(shape)
                .with_input(&index)
                .with_attr("axis", 0i64),
            suffix,
        )
    });
    let extent = |e: Extent| extents[e as usize].as_str();

    let a_dims = config.a_dims.map(extent);
    let a_shape = sub.concat(&[&batch_size, a_dims[0], a_dims[1]], "a_shape_3d");
    let b_dims = config.b_dims.map(extent);
    let b_shape = sub.concat(&[&batch_size, b_dims[0], b_dims[1]], "b_shape_3d");

    let a_3d = sub.op("Reshape", &[a, &a_shape], "a_3d");
    let mut b_3d = sub.op("Reshape", &[b, &b_shape], "b_3d");
    if config.transpose_b {
        b_3d = sub.emit(
            Node::new("Transpose")
                .with_input(&b_3d)
                .with_attr("perm", vec![0i64, 2, 1]),
            "b_3d_t",
        );
    }
    let matmul = sub.op("MatMul", &[&a_3d, &b_3d], "matmul");

    let out_dims = config.out_dims.map(extent);
    let out_shape = sub.concat(&[&batch_shape, out_dims[0], out_dims[1]], "out_shape");

    let reshape_out = Node::new("Reshape")
        .with_name(&sub.name("reshape_out_node"))
        .with_input(&matmul)
        .with_input(&out_shape)
        .with_output(out);
    sub.nodes.push(reshape_out);

    Ok(sub.nodes)
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::synthesize;
    use crate::error::LowerError;
    use crate::graph::{AttrValue, Node};
    use crate::pattern::Pattern;

    fn einsum(pattern: Pattern) -> Node {
        Node::new("Einsum")
            .with_name("einsum")
            .with_input("a")
            .with_input("b")
            .with_output("y")
            .with_attr("equation", pattern.equation())
    }

    /// Value computed by shape inference over synthesized nodes.
    #[derive(Clone, Debug, PartialEq)]
    enum Value {
        /// An int64 vector whose contents are known.
        Ints(Vec<i64>),
        /// A float tensor whose shape is known.
        Dims(Vec<i64>),
    }

    fn ints_attr(node: &Node, name: &str) -> Option<Vec<i64>> {
        match node.attr(name)? {
            AttrValue::Ints(ints) => Some(ints.clone()),
            AttrValue::Tensor(tensor) => Some(
                tensor
                    .raw_data
                    .as_ref()?
                    .chunks_exact(8)
                    .map(|c| i64::from_le_bytes(c.try_into().unwrap()))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Evaluate the nodes on operands of known shape, returning the shape of
    /// `y`. Panics if any node has inconsistent inputs.
    fn infer_output_shape(nodes: &[Node], a: &[i64], b: &[i64]) -> Vec<i64> {
        let mut values = HashMap::new();
        values.insert("a".to_string(), Value::Dims(a.to_vec()));
        values.insert("b".to_string(), Value::Dims(b.to_vec()));

        let ints = |v: &Value| match v {
            Value::Ints(x) => x.clone(),
            Value::Dims(_) => panic!("expected int vector"),
        };
        let dims = |v: &Value| match v {
            Value::Dims(x) => x.clone(),
            Value::Ints(_) => panic!("expected tensor"),
        };

        for node in nodes {
            let inputs: Vec<Value> = node
                .inputs()
                .iter()
                .map(|name| values.get(name).cloned().expect("input defined"))
                .collect();
            let output = match node.op_type() {
                "Shape" => Value::Ints(dims(&inputs[0])),
                "Constant" => Value::Ints(ints_attr(node, "value").unwrap()),
                "Slice" => {
                    let data = ints(&inputs[0]);
                    let (start, end) = (ints(&inputs[1])[0], ints(&inputs[2])[0]);
                    assert_eq!(ints(&inputs[3]), [0]);
                    Value::Ints(data[start as usize..end as usize].to_vec())
                }
                "ReduceProd" => Value::Ints(vec![ints(&inputs[0]).iter().product()]),
                "Gather" => {
                    let data = ints(&inputs[0]);
                    Value::Ints(ints(&inputs[1]).iter().map(|&i| data[i as usize]).collect())
                }
                "Concat" => Value::Ints(inputs.iter().flat_map(ints).collect()),
                "Reshape" => {
                    let (data, shape) = (dims(&inputs[0]), ints(&inputs[1]));
                    assert_eq!(
                        data.iter().product::<i64>(),
                        shape.iter().product::<i64>()
                    );
                    Value::Dims(shape)
                }
                "Transpose" => {
                    let data = dims(&inputs[0]);
                    let perm = ints_attr(node, "perm").unwrap();
                    Value::Dims(perm.iter().map(|&p| data[p as usize]).collect())
                }
                "MatMul" => {
                    let (lhs, rhs) = (dims(&inputs[0]), dims(&inputs[1]));
                    assert_eq!(lhs[0], rhs[0], "batch size mismatch");
                    assert_eq!(lhs[2], rhs[1], "contraction size mismatch");
                    Value::Dims(vec![lhs[0], lhs[1], rhs[2]])
                }
                op => panic!("unexpected op {}", op),
            };
            values.insert(node.outputs()[0].clone(), output);
        }

        dims(&values["y"])
    }

    #[test]
    fn test_synthesize_op_sequence() {
        let nodes = synthesize(&einsum(Pattern::BatchedMatMulTransB), Pattern::BatchedMatMulTransB, "p_").unwrap();
        let ops: Vec<_> = nodes.iter().map(|n| n.op_type()).collect();
        assert_eq!(
            ops,
            [
                "Shape", "Shape", "Constant", "Constant", "Constant", "Slice", "ReduceProd",
                "Constant", "Gather", "Constant", "Gather", "Constant", "Gather", "Concat",
                "Concat", "Reshape", "Reshape", "Transpose", "MatMul", "Concat", "Reshape",
            ]
        );

        let nodes = synthesize(&einsum(Pattern::BatchedMatMul), Pattern::BatchedMatMul, "p_").unwrap();
        assert_eq!(nodes.len(), 20);
        assert!(nodes.iter().all(|n| n.op_type() != "Transpose"));
    }

    #[test]
    fn test_synthesize_shapes() {
        struct Case {
            pattern: Pattern,
            a: [i64; 5],
            b: [i64; 5],
            expected: [i64; 5],
        }

        let cases = [
            Case {
                pattern: Pattern::BatchedMatMulTransB,
                a: [1, 1, 2, 3, 2],
                b: [1, 1, 2, 4, 2],
                expected: [1, 1, 2, 3, 4],
            },
            Case {
                pattern: Pattern::BatchedMatMulTransB,
                a: [2, 3, 4, 5, 6],
                b: [2, 3, 4, 7, 6],
                expected: [2, 3, 4, 5, 7],
            },
            Case {
                pattern: Pattern::BatchedMatMul,
                a: [1, 1, 2, 3, 2],
                b: [1, 1, 2, 2, 4],
                expected: [1, 1, 2, 3, 4],
            },
            Case {
                pattern: Pattern::BatchedMatMul,
                a: [2, 3, 1, 5, 7],
                b: [2, 3, 1, 7, 6],
                expected: [2, 3, 1, 5, 6],
            },
        ];

        for Case {
            pattern,
            a,
            b,
            expected,
        } in cases
        {
            let nodes = synthesize(&einsum(pattern), pattern, "lower_0_").unwrap();
            assert_eq!(infer_output_shape(&nodes, &a, &b), expected, "{:?}", pattern);
        }
    }

    #[test]
    fn test_synthesized_names() {
        let node = einsum(Pattern::BatchedMatMulTransB);
        let nodes = synthesize(&node, Pattern::BatchedMatMulTransB, "lower_7_").unwrap();

        let mut names = HashSet::new();
        for node in &nodes {
            let name = node.name().unwrap();
            assert!(name.starts_with("lower_7_"));
            assert!(names.insert(name.to_string()), "duplicate name {}", name);
        }
        for output in nodes.iter().flat_map(|n| n.outputs()) {
            if output != "y" {
                assert!(output.starts_with("lower_7_"));
            }
            assert!(names.insert(output.clone()), "duplicate name {}", output);
        }

        // Only the last node writes the original output.
        let last = nodes.last().unwrap();
        assert_eq!(last.op_type(), "Reshape");
        assert_eq!(last.outputs(), ["y"]);
        assert_eq!(
            nodes.iter().filter(|n| n.outputs().contains(&"y".to_string())).count(),
            1
        );
    }

    #[test]
    fn test_malformed_node() {
        let cases = [
            (Node::new("Einsum").with_input("a").with_output("y"), 1, 1),
            (
                Node::new("Einsum")
                    .with_input("a")
                    .with_input("b")
                    .with_input("c")
                    .with_output("y"),
                3,
                1,
            ),
            (Node::new("Einsum").with_input("a").with_input("b"), 2, 0),
            (
                Node::new("Einsum")
                    .with_input("a")
                    .with_input("")
                    .with_output("y"),
                1,
                1,
            ),
        ];

        for (node, n_inputs, n_outputs) in cases {
            let node = node.with_attr("equation", Pattern::BatchedMatMul.equation());
            let err = synthesize(&node, Pattern::BatchedMatMul, "lower_0_").err().unwrap();
            match err {
                LowerError::MalformedNode {
                    inputs, outputs, ..
                } => {
                    assert_eq!((inputs, outputs), (n_inputs, n_outputs));
                }
                other => panic!("unexpected error {:?}", other),
            }
        }
    }
}
