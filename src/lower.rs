//! Pass which replaces supported `Einsum` nodes with batched `MatMul`s.

use tracing::{debug, info};

use crate::error::LowerError;
use crate::graph::{Graph, Node, ValueInfo};
use crate::model::Model;
use crate::names::NameGen;
use crate::pattern::{EINSUM_RANK, Pattern, einsum_equation, is_einsum};
use crate::rebuild::rebuild;
use crate::synth::synthesize;

/// Options that control lowering.
#[derive(Clone, Debug)]
pub struct LowerOptions {
    /// Fail if the graph declares a rank other than 5 for an operand of a
    /// matched node.
    pub check_rank: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        LowerOptions { check_rank: true }
    }
}

impl LowerOptions {
    pub fn with_check_rank(mut self, check_rank: bool) -> Self {
        self.check_rank = check_rank;
        self
    }
}

/// An `Einsum` node which was replaced.
#[derive(Clone, Debug, PartialEq)]
pub struct LoweredNode {
    pub name: String,
    pub pattern: Pattern,

    /// Prefix of the names of the replacement nodes and their outputs.
    pub prefix: String,

    /// Number of nodes which replaced the `Einsum`.
    pub replacement_len: usize,
}

/// An `Einsum` node which was left unchanged because its equation is not
/// supported.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedNode {
    pub name: String,
    pub equation: Option<String>,
}

/// Summary of a lowering pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LowerReport {
    pub lowered: Vec<LoweredNode>,
    pub skipped: Vec<SkippedNode>,
}

/// Check that the declared ranks of a node's operands match the equation.
///
/// Values whose rank is not declared are accepted.
fn check_operand_ranks(graph: &Graph, node: &Node) -> Result<(), LowerError> {
    for operand in node.inputs().iter().chain(node.outputs()) {
        if let Some(rank) = graph.find_value(operand).and_then(ValueInfo::rank)
            && rank != EINSUM_RANK
        {
            return Err(LowerError::UnsupportedRank {
                node: node.display_name().to_string(),
                operand: operand.clone(),
                rank,
            });
        }
    }
    Ok(())
}

/// Compute the replacement nodes for every supported `Einsum` in `graph`.
fn plan_replacements(
    graph: &Graph,
    opts: &LowerOptions,
) -> Result<(Vec<(usize, Vec<Node>)>, LowerReport), LowerError> {
    let mut names = NameGen::new(graph.names());
    let mut replacements = Vec::new();
    let mut report = LowerReport::default();

    for (index, node) in graph.nodes.iter().enumerate() {
        let Some(pattern) = Pattern::match_node(node) else {
            if is_einsum(node) {
                let equation =
                    einsum_equation(node).map(|eq| String::from_utf8_lossy(eq).into_owned());
                debug!(
                    node = node.display_name(),
                    equation = equation.as_deref().unwrap_or("(none)"),
                    "skipping Einsum with unsupported equation"
                );
                report.skipped.push(SkippedNode {
                    name: node.display_name().to_string(),
                    equation,
                });
            }
            continue;
        };

        if opts.check_rank {
            check_operand_ranks(graph, node)?;
        }

        let prefix = names.next_prefix();
        let nodes = synthesize(node, pattern, &prefix)?;
        debug!(
            node = node.display_name(),
            equation = pattern.equation(),
            prefix = prefix.as_str(),
            replacement_len = nodes.len(),
            "lowering Einsum"
        );

        report.lowered.push(LoweredNode {
            name: node.display_name().to_string(),
            pattern,
            prefix,
            replacement_len: nodes.len(),
        });
        replacements.push((index, nodes));
    }

    Ok((replacements, report))
}

/// Replace `Einsum` nodes in the top-level graph of `model` whose equation is
/// `hbwpc,hbwqc->hbwpq` or `hbwij,hbwjc->hbwic` with equivalent sequences of
/// shape operations, `Reshape`, `Transpose` and `MatMul`.
///
/// Other nodes are kept unchanged and in the same order. If no node matches,
/// the model is not modified.
pub fn lower_einsum(model: &mut Model, opts: &LowerOptions) -> Result<LowerReport, LowerError> {
    let graph = model.graph();
    let (replacements, report) = plan_replacements(graph, opts)?;

    if !replacements.is_empty() {
        let old_len = graph.nodes.len();
        let nodes = rebuild(graph.nodes.clone(), replacements)?;
        info!(
            lowered = report.lowered.len(),
            skipped = report.skipped.len(),
            old_len,
            new_len = nodes.len(),
            "lowered Einsum nodes"
        );
        model.set_nodes(nodes);
    } else {
        info!(skipped = report.skipped.len(), "no Einsum nodes to lower");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{LowerOptions, lower_einsum};
    use crate::builder::{ModelBuilder, einsum_node, tensor_info, unranked_tensor_info};
    use crate::error::LowerError;
    use crate::model::Model;
    use crate::pattern::{EQUATION_MATMUL, EQUATION_TRANS_B, Pattern};

    #[test]
    fn test_lower_report() {
        let data = ModelBuilder::new()
            .input(unranked_tensor_info("a"))
            .input(unranked_tensor_info("b"))
            .node(einsum_node("e1", "a", "b", "x", EQUATION_TRANS_B))
            .node(einsum_node("other", "a", "b", "y", "ij,jk->ik"))
            .node(einsum_node("e2", "a", "b", "z", EQUATION_MATMUL))
            .build();
        let mut model = Model::load(data).unwrap();

        let report = lower_einsum(&mut model, &LowerOptions::default()).unwrap();

        assert_eq!(report.lowered.len(), 2);
        assert_eq!(report.lowered[0].name, "e1");
        assert_eq!(report.lowered[0].pattern, Pattern::BatchedMatMulTransB);
        assert_eq!(report.lowered[0].prefix, "lower_0_");
        assert_eq!(report.lowered[0].replacement_len, 21);
        assert_eq!(report.lowered[1].name, "e2");
        assert_eq!(report.lowered[1].prefix, "lower_1_");
        assert_eq!(report.lowered[1].replacement_len, 20);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "other");
        assert_eq!(report.skipped[0].equation.as_deref(), Some("ij,jk->ik"));

        assert_eq!(model.graph().nodes.len(), 21 + 1 + 20);
        assert_eq!(model.graph().nodes[21].name(), Some("other"));
    }

    #[test]
    fn test_prefix_avoids_existing_names() {
        let data = ModelBuilder::new()
            .input(unranked_tensor_info("lower_0_a"))
            .input(unranked_tensor_info("b"))
            .node(einsum_node("e1", "lower_0_a", "b", "y", EQUATION_TRANS_B))
            .build();
        let mut model = Model::load(data).unwrap();
        let report = lower_einsum(&mut model, &LowerOptions::default()).unwrap();
        assert_eq!(report.lowered[0].prefix, "lower_1_");
    }

    #[test]
    fn test_rank_check() {
        let build = |a_shape: &[Option<i64>]| {
            ModelBuilder::new()
                .input(tensor_info("a", a_shape))
                .input(unranked_tensor_info("b"))
                .node(einsum_node("einsum", "a", "b", "y", EQUATION_MATMUL))
                .build()
        };

        let mut model = Model::load(build(&[None, Some(3), Some(4)])).unwrap();
        let err = lower_einsum(&mut model, &LowerOptions::default())
            .err()
            .unwrap();
        assert!(
            matches!(
                &err,
                LowerError::UnsupportedRank { node, operand, rank: 3 } if node == "einsum" && operand == "a"
            ),
            "unexpected error {:?}",
            err
        );

        // Disabling the check lowers the node anyway.
        let opts = LowerOptions::default().with_check_rank(false);
        let report = lower_einsum(&mut model, &opts).unwrap();
        assert_eq!(report.lowered.len(), 1);

        // Rank 5 with dynamic dimensions is accepted.
        let mut model = Model::load(build(&[None, None, None, Some(3), Some(2)])).unwrap();
        let report = lower_einsum(&mut model, &LowerOptions::default()).unwrap();
        assert_eq!(report.lowered.len(), 1);
    }

    #[test]
    fn test_rank_check_uses_value_info() {
        let data = ModelBuilder::new()
            .input(unranked_tensor_info("a"))
            .input(unranked_tensor_info("b"))
            .value_info(tensor_info("y", &[None, None, None, Some(4)]))
            .node(einsum_node("einsum", "a", "b", "y", EQUATION_TRANS_B))
            .build();
        let mut model = Model::load(data.clone()).unwrap();

        let err = lower_einsum(&mut model, &LowerOptions::default())
            .err()
            .unwrap();
        assert!(
            matches!(
                &err,
                LowerError::UnsupportedRank { operand, rank: 4, .. } if operand == "y"
            ),
            "unexpected error {:?}",
            err
        );
        assert_eq!(model.save().unwrap(), data);
    }

    #[test]
    fn test_malformed_node() {
        let node = einsum_node("einsum", "a", "b", "y", EQUATION_TRANS_B).with_input("c");
        let data = ModelBuilder::new()
            .input(unranked_tensor_info("a"))
            .node(node)
            .build();
        let mut model = Model::load(data.clone()).unwrap();
        let err = lower_einsum(&mut model, &LowerOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, LowerError::MalformedNode { inputs: 3, outputs: 1, .. }));

        // A failed pass leaves the model unchanged.
        assert_eq!(model.save().unwrap(), data);
    }
}
