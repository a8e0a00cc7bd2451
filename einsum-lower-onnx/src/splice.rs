//! Replace the operators of an encoded model without re-encoding the rest.
//!
//! A model is spliced by copying every field of the `ModelProto` and its
//! `GraphProto` verbatim, except the graph's repeated `node` field. The new
//! nodes are written at the position where the first original node was, so
//! the relative order of fields is preserved.

use crate::onnx::{GraphProto, ModelProto};
use crate::protobuf::{Encoder, ErrorKind, Field, Fields, ProtobufError};

const MODEL_CONTEXT: Option<&str> = Some("ModelProto");
const GRAPH_CONTEXT: Option<&str> = Some("GraphProto");

/// Find the `graph` field of an encoded `ModelProto`.
fn find_graph(model: &[u8]) -> Result<Field<'_>, ProtobufError> {
    let mut graph = None;
    for field in Fields::new(model, MODEL_CONTEXT) {
        let field = field?;
        if field.number() != ModelProto::GRAPH {
            continue;
        }
        if graph.is_some() {
            return Err(ProtobufError::new(ErrorKind::DuplicateField)
                .with_context(MODEL_CONTEXT, Some(ModelProto::GRAPH)));
        }
        // Validate the wire type.
        field.bytes()?;
        graph = Some(field);
    }
    graph.ok_or_else(|| {
        ProtobufError::new(ErrorKind::MissingField)
            .with_context(MODEL_CONTEXT, Some(ModelProto::GRAPH))
    })
}

/// Return the encoded `GraphProto` of an encoded `ModelProto`.
///
/// Fails if the model has no graph or more than one `graph` field.
pub fn graph_payload(model: &[u8]) -> Result<&[u8], ProtobufError> {
    find_graph(model)?.bytes()
}

/// Return the encoded `NodeProto` payloads of the top-level graph of a model,
/// in graph order.
pub fn graph_node_payloads(model: &[u8]) -> Result<Vec<&[u8]>, ProtobufError> {
    let mut nodes = Vec::new();
    for field in Fields::new(graph_payload(model)?, GRAPH_CONTEXT) {
        let field = field?;
        if field.number() == GraphProto::NODE {
            nodes.push(field.bytes()?);
        }
    }
    Ok(nodes)
}

/// Re-encode a model with the nodes of its top-level graph replaced.
///
/// `nodes` are encoded `NodeProto` messages. They are written in order at the
/// position of the first `node` field in the original graph, or at the start
/// of the graph if it has no nodes. All other fields of the model and graph
/// are copied unchanged.
pub fn replace_graph_nodes<N: AsRef<[u8]>>(
    model: &[u8],
    nodes: &[N],
) -> Result<Vec<u8>, ProtobufError> {
    let graph = find_graph(model)?;
    let graph_data = graph.bytes()?;

    let mut new_graph = Encoder::new();
    let mut nodes_written = false;
    let mut write_nodes = |enc: &mut Encoder| {
        if !nodes_written {
            for node in nodes {
                enc.bytes(GraphProto::NODE, node.as_ref());
            }
            nodes_written = true;
        }
    };

    for field in Fields::new(graph_data, GRAPH_CONTEXT) {
        let field = field?;
        if field.number() == GraphProto::NODE {
            write_nodes(&mut new_graph);
        } else {
            new_graph.raw(field.raw());
        }
    }
    write_nodes(&mut new_graph);

    let span = graph.span();
    let mut out = Encoder::new();
    out.raw(&model[..span.start]);
    out.bytes(ModelProto::GRAPH, &new_graph.finish());
    out.raw(&model[span.end..]);

    Ok(out.finish())
}
