use crate::error::LowerError;
use crate::graph::Node;

/// Replace nodes in a node list with sequences of new nodes.
///
/// `replacements` contains `(index, nodes)` pairs, where `index` is the
/// position of a node in `nodes` which is replaced by `nodes`. Indices must be
/// strictly increasing and in range. Nodes that are not replaced keep their
/// relative order.
pub fn rebuild(
    nodes: Vec<Node>,
    replacements: Vec<(usize, Vec<Node>)>,
) -> Result<Vec<Node>, LowerError> {
    let mut prev_index = None;
    for (index, _) in &replacements {
        if *index >= nodes.len() || prev_index.is_some_and(|prev| *index <= prev) {
            return Err(LowerError::InvalidReplacement { index: *index });
        }
        prev_index = Some(*index);
    }

    let new_len =
        nodes.len() - replacements.len() + replacements.iter().map(|(_, r)| r.len()).sum::<usize>();
    let mut new_nodes = Vec::with_capacity(new_len);
    let mut replacements = replacements.into_iter().peekable();

    for (index, node) in nodes.into_iter().enumerate() {
        match replacements.next_if(|(replace_index, _)| *replace_index == index) {
            Some((_, replacement)) => new_nodes.extend(replacement),
            None => new_nodes.push(node),
        }
    }

    Ok(new_nodes)
}
