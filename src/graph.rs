//! In-memory representation of the top-level graph of a model.

use std::borrow::Cow;

use einsum_lower_onnx::onnx::{self, AttributeProto, AttributeType, DataType, NodeProto};
use einsum_lower_onnx::protobuf::{DecodeMessage, EncodeMessage, Fields, ProtobufError};

/// Define a `From` impl which creates an enum variant from a value.
macro_rules! enum_from {
    ($enum:ty, $variant:ident, $from:ty) => {
        impl From<$from> for $enum {
            fn from(val: $from) -> Self {
                Self::$variant(val)
            }
        }
    };
}

/// Value of a node attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Float(f32),
    Int(i64),
    /// String value. ONNX strings are bytes and are compared as such.
    String(Vec<u8>),
    Tensor(onnx::TensorProto),
    Floats(Vec<f32>),
    Ints(Vec<i64>),
    Strings(Vec<Vec<u8>>),
    /// An attribute of a kind that is never inspected, such as a subgraph.
    Other(Box<AttributeProto>),
}

enum_from!(AttrValue, Float, f32);
enum_from!(AttrValue, Int, i64);
enum_from!(AttrValue, Tensor, onnx::TensorProto);
enum_from!(AttrValue, Ints, Vec<i64>);
enum_from!(AttrValue, Floats, Vec<f32>);

impl From<&str> for AttrValue {
    fn from(val: &str) -> Self {
        Self::String(val.as_bytes().to_vec())
    }
}

impl AttrValue {
    /// Return the bytes of a string attribute.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
}

impl Attribute {
    fn from_proto(attr: AttributeProto) -> Self {
        let name = attr.name.clone().unwrap_or_default();
        let ty = attr.r#type.unwrap_or_else(|| infer_attr_type(&attr));

        let value = match ty {
            AttributeType::FLOAT => attr.f.map(AttrValue::Float),
            AttributeType::INT => attr.i.map(AttrValue::Int),
            AttributeType::STRING => attr.s.clone().map(AttrValue::String),
            AttributeType::TENSOR => attr.t.clone().map(AttrValue::Tensor),
            AttributeType::FLOATS => Some(AttrValue::Floats(attr.floats.clone())),
            AttributeType::INTS => Some(AttrValue::Ints(attr.ints.clone())),
            AttributeType::STRINGS => Some(AttrValue::Strings(attr.strings.clone())),
            _ => None,
        }
        .unwrap_or_else(|| AttrValue::Other(Box::new(attr)));

        Attribute { name, value }
    }

    fn to_proto(&self) -> AttributeProto {
        let mut attr = AttributeProto {
            name: Some(self.name.clone()),
            ..Default::default()
        };
        match &self.value {
            AttrValue::Float(val) => {
                attr.f = Some(*val);
                attr.r#type = Some(AttributeType::FLOAT);
            }
            AttrValue::Int(val) => {
                attr.i = Some(*val);
                attr.r#type = Some(AttributeType::INT);
            }
            AttrValue::String(val) => {
                attr.s = Some(val.clone());
                attr.r#type = Some(AttributeType::STRING);
            }
            AttrValue::Tensor(val) => {
                attr.t = Some(val.clone());
                attr.r#type = Some(AttributeType::TENSOR);
            }
            AttrValue::Floats(val) => {
                attr.floats = val.clone();
                attr.r#type = Some(AttributeType::FLOATS);
            }
            AttrValue::Ints(val) => {
                attr.ints = val.clone();
                attr.r#type = Some(AttributeType::INTS);
            }
            AttrValue::Strings(val) => {
                attr.strings = val.clone();
                attr.r#type = Some(AttributeType::STRINGS);
            }
            AttrValue::Other(proto) => {
                attr = proto.as_ref().clone();
                attr.name = Some(self.name.clone());
            }
        }
        attr
    }
}

/// Infer the type of an attribute written without the `type` field, as
/// producers targeting old IR versions did.
fn infer_attr_type(attr: &AttributeProto) -> AttributeType {
    if attr.f.is_some() {
        AttributeType::FLOAT
    } else if attr.i.is_some() {
        AttributeType::INT
    } else if attr.s.is_some() {
        AttributeType::STRING
    } else if attr.t.is_some() {
        AttributeType::TENSOR
    } else if attr.g.is_some() {
        AttributeType::GRAPH
    } else if !attr.floats.is_empty() {
        AttributeType::FLOATS
    } else if !attr.ints.is_empty() {
        AttributeType::INTS
    } else if !attr.strings.is_empty() {
        AttributeType::STRINGS
    } else {
        AttributeType::UNDEFINED
    }
}

/// An operator in a graph.
///
/// Nodes decoded from a model keep the bytes they were decoded from, and
/// [`encode`](Node::encode) returns those bytes unchanged. Modifying a node
/// discards them.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    op_type: String,
    domain: Option<String>,
    name: Option<String>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    attrs: Vec<Attribute>,
    doc_string: Option<String>,
    encoded: Option<Vec<u8>>,
}

impl Node {
    pub fn new(op_type: &str) -> Self {
        Node {
            op_type: op_type.to_string(),
            domain: None,
            name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            attrs: Vec::new(),
            doc_string: None,
            encoded: None,
        }
    }

    /// Decode a node from an encoded `NodeProto`.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtobufError> {
        let proto = NodeProto::decode(buf)?;
        Ok(Node {
            op_type: proto.op_type.unwrap_or_default(),
            domain: proto.domain,
            name: proto.name,
            inputs: proto.input,
            outputs: proto.output,
            attrs: proto.attribute.into_iter().map(Attribute::from_proto).collect(),
            doc_string: proto.doc_string,
            encoded: Some(buf.to_vec()),
        })
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self.encoded = None;
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self.encoded = None;
        self
    }

    pub fn with_input(mut self, name: &str) -> Self {
        self.inputs.push(name.to_string());
        self.encoded = None;
        self
    }

    pub fn with_output(mut self, name: &str) -> Self {
        self.outputs.push(name.to_string());
        self.encoded = None;
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.push(Attribute {
            name: name.to_string(),
            value: value.into(),
        });
        self.encoded = None;
        self
    }

    pub fn op_type(&self) -> &str {
        &self.op_type
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Return the node name, or its first output if unnamed, for use in
    /// diagnostics.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.outputs.first().map(|s| s.as_str()))
            .unwrap_or("(unnamed)")
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Return the value of the first attribute called `name`.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.value)
    }

    /// Return the bytes this node was decoded from, if it has not been
    /// modified since.
    pub fn source_bytes(&self) -> Option<&[u8]> {
        self.encoded.as_deref()
    }

    pub fn to_proto(&self) -> NodeProto {
        NodeProto {
            input: self.inputs.clone(),
            output: self.outputs.clone(),
            name: self.name.clone(),
            op_type: Some(self.op_type.clone()),
            attribute: self.attrs.iter().map(Attribute::to_proto).collect(),
            doc_string: self.doc_string.clone(),
            domain: self.domain.clone(),
        }
    }

    /// Return the encoded `NodeProto` for this node.
    pub fn encode(&self) -> Cow<'_, [u8]> {
        match &self.encoded {
            Some(buf) => Cow::Borrowed(buf),
            None => Cow::Owned(self.to_proto().encode()),
        }
    }
}

/// Name and declared shape of a value in a graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueInfo {
    pub name: String,

    /// Declared shape, if any. Dimensions without a fixed size are `None`.
    pub shape: Option<Vec<Option<i64>>>,
}

impl ValueInfo {
    /// Return the declared rank, if the shape is known.
    pub fn rank(&self) -> Option<usize> {
        self.shape.as_ref().map(|s| s.len())
    }
}

impl From<onnx::ValueInfoProto> for ValueInfo {
    fn from(info: onnx::ValueInfoProto) -> Self {
        ValueInfo {
            shape: info.tensor_shape(),
            name: info.name.unwrap_or_default(),
        }
    }
}

/// Name and dims of an initializer. The tensor data is skipped.
#[derive(Default)]
struct InitializerInfo {
    name: Option<String>,
    dims: Vec<i64>,
}

impl DecodeMessage for InitializerInfo {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            match field.number() {
                onnx::TensorProto::NAME => {
                    msg.name = Some(field.string()?.to_string());
                }
                onnx::TensorProto::DIMS => {
                    for dim in field.read_repeated_int64()? {
                        msg.dims.push(dim?);
                    }
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

/// The top-level graph of a model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub inputs: Vec<ValueInfo>,
    pub outputs: Vec<ValueInfo>,
    pub value_info: Vec<ValueInfo>,
    pub initializers: Vec<ValueInfo>,
}

impl Graph {
    /// Decode a graph from an encoded `GraphProto`.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtobufError> {
        use onnx::GraphProto;

        let mut graph = Graph::default();
        for field in Fields::new(buf, Some("GraphProto")) {
            let field = field?;
            match field.number() {
                GraphProto::NODE => {
                    graph.nodes.push(Node::decode(field.bytes()?)?);
                }
                GraphProto::INPUT => {
                    let info = onnx::ValueInfoProto::decode_field(&field)?;
                    graph.inputs.push(info.into());
                }
                GraphProto::OUTPUT => {
                    let info = onnx::ValueInfoProto::decode_field(&field)?;
                    graph.outputs.push(info.into());
                }
                GraphProto::VALUE_INFO => {
                    let info = onnx::ValueInfoProto::decode_field(&field)?;
                    graph.value_info.push(info.into());
                }
                GraphProto::INITIALIZER => {
                    let init = InitializerInfo::decode_field(&field)?;
                    graph.initializers.push(ValueInfo {
                        name: init.name.unwrap_or_default(),
                        shape: Some(init.dims.into_iter().map(Some).collect()),
                    });
                }
                _ => {}
            }
        }
        Ok(graph)
    }

    /// Find the declaration of a value.
    ///
    /// Initializers take precedence, then graph inputs, value infos and
    /// outputs.
    pub fn find_value(&self, name: &str) -> Option<&ValueInfo> {
        self.initializers
            .iter()
            .chain(&self.inputs)
            .chain(&self.value_info)
            .chain(&self.outputs)
            .find(|info| info.name == name)
    }

    /// Return every name used in the graph, including names of nodes and
    /// values in nested subgraphs. Names may be repeated.
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for info in self
            .inputs
            .iter()
            .chain(&self.outputs)
            .chain(&self.value_info)
            .chain(&self.initializers)
        {
            names.push(info.name.as_str());
        }
        for node in &self.nodes {
            names.extend(node.name());
            names.extend(node.inputs().iter().map(|s| s.as_str()));
            names.extend(node.outputs().iter().map(|s| s.as_str()));
            for attr in node.attrs() {
                if let AttrValue::Other(proto) = &attr.value
                    && let Some(subgraph) = &proto.g
                {
                    subgraph_names(subgraph, &mut names);
                }
            }
        }
        names
    }
}

fn subgraph_names<'a>(graph: &'a onnx::GraphProto, names: &mut Vec<&'a str>) {
    let infos = graph
        .input
        .iter()
        .chain(&graph.output)
        .chain(&graph.value_info);
    names.extend(infos.filter_map(|info| info.name.as_deref()));
    names.extend(graph.initializer.iter().filter_map(|t| t.name.as_deref()));

    for node in &graph.node {
        names.extend(node.name.as_deref());
        names.extend(node.input.iter().map(|s| s.as_str()));
        names.extend(node.output.iter().map(|s| s.as_str()));
        for attr in &node.attribute {
            if let Some(subgraph) = &attr.g {
                subgraph_names(subgraph, names);
            }
        }
    }
}

/// Create an int64 tensor with values stored as little-endian raw data.
pub fn int64_tensor(name: &str, dims: &[usize], values: &[i64]) -> onnx::TensorProto {
    onnx::TensorProto {
        name: Some(name.to_string()),
        dims: dims.iter().map(|&size| size as i64).collect(),
        data_type: Some(DataType::INT64),
        raw_data: Some(values.iter().flat_map(|v| v.to_le_bytes()).collect()),
        ..Default::default()
    }
}
