//! ONNX model Protocol Buffers types.
//!
//! The types in this module correspond to Protocol Buffers messages defined
//! in [onnx.proto](https://github.com/onnx/onnx/blob/main/onnx/onnx.proto).
//! See the `.proto` file for detailed information on each type and field.
//!
//! These types are not complete. They only contain messages and fields which
//! are read or written when lowering operators. Fields which are not modelled
//! are skipped when decoding. Use [`splice`](crate::splice) to rewrite part of
//! a model without losing them.

use crate::protobuf::{DecodeMessage, EncodeMessage, Encoder, Fields, ProtobufError};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AttributeType(pub i32);

impl AttributeType {
    pub const UNDEFINED: Self = Self(0);
    pub const FLOAT: Self = Self(1);
    pub const INT: Self = Self(2);
    pub const STRING: Self = Self(3);
    pub const TENSOR: Self = Self(4);
    pub const GRAPH: Self = Self(5);
    pub const FLOATS: Self = Self(6);
    pub const INTS: Self = Self(7);
    pub const STRINGS: Self = Self(8);
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeProto {
    pub name: Option<String>,
    pub f: Option<f32>,
    pub i: Option<i64>,

    /// String value. ONNX strings are byte sequences which are usually, but
    /// not necessarily, UTF-8.
    pub s: Option<Vec<u8>>,
    pub t: Option<TensorProto>,
    pub g: Option<GraphProto>,
    pub floats: Vec<f32>,
    pub ints: Vec<i64>,
    pub strings: Vec<Vec<u8>>,
    pub r#type: Option<AttributeType>,
}

impl AttributeProto {
    pub const NAME: u64 = 1;
    pub const F: u64 = 2;
    pub const I: u64 = 3;
    pub const S: u64 = 4;
    pub const T: u64 = 5;
    pub const G: u64 = 6;
    pub const FLOATS: u64 = 7;
    pub const INTS: u64 = 8;
    pub const STRINGS: u64 = 9;
    pub const TYPE: u64 = 20;
}

impl DecodeMessage for AttributeProto {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            match field.number() {
                Self::NAME => {
                    msg.name = Some(field.string()?.to_string());
                }
                Self::F => {
                    msg.f = Some(field.get_float()?);
                }
                Self::I => {
                    msg.i = Some(field.get_int64()?);
                }
                Self::S => {
                    msg.s = Some(field.bytes()?.to_vec());
                }
                Self::T => {
                    msg.t = Some(TensorProto::decode_field(&field)?);
                }
                Self::G => {
                    msg.g = Some(GraphProto::decode_field(&field)?);
                }
                Self::FLOATS => {
                    for float in field.read_repeated_float()? {
                        msg.floats.push(float?);
                    }
                }
                Self::INTS => {
                    for int in field.read_repeated_int64()? {
                        msg.ints.push(int?);
                    }
                }
                Self::STRINGS => {
                    msg.strings.push(field.bytes()?.to_vec());
                }
                Self::TYPE => {
                    msg.r#type = Some(AttributeType(field.get_enum()?));
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for AttributeProto {
    fn encode_fields(&self, enc: &mut Encoder) {
        if let Some(name) = &self.name {
            enc.string(Self::NAME, name);
        }
        if let Some(f) = self.f {
            enc.float(Self::F, f);
        }
        if let Some(i) = self.i {
            enc.int64(Self::I, i);
        }
        if let Some(s) = &self.s {
            enc.bytes(Self::S, s);
        }
        if let Some(t) = &self.t {
            enc.message(Self::T, t);
        }
        if let Some(g) = &self.g {
            enc.message(Self::G, g);
        }
        for &f in &self.floats {
            enc.float(Self::FLOATS, f);
        }
        for &i in &self.ints {
            enc.int64(Self::INTS, i);
        }
        for s in &self.strings {
            enc.bytes(Self::STRINGS, s);
        }
        if let Some(ty) = self.r#type {
            enc.int32(Self::TYPE, ty.0);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeProto {
    pub input: Vec<String>,
    pub output: Vec<String>,
    pub name: Option<String>,
    pub op_type: Option<String>,
    pub attribute: Vec<AttributeProto>,
    pub doc_string: Option<String>,
    pub domain: Option<String>,
}

impl NodeProto {
    pub const INPUT: u64 = 1;
    pub const OUTPUT: u64 = 2;
    pub const NAME: u64 = 3;
    pub const OP_TYPE: u64 = 4;
    pub const ATTRIBUTE: u64 = 5;
    pub const DOC_STRING: u64 = 6;
    pub const DOMAIN: u64 = 7;
}

impl DecodeMessage for NodeProto {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            match field.number() {
                Self::INPUT => {
                    msg.input.push(field.string()?.to_string());
                }
                Self::OUTPUT => {
                    msg.output.push(field.string()?.to_string());
                }
                Self::NAME => {
                    msg.name = Some(field.string()?.to_string());
                }
                Self::OP_TYPE => {
                    msg.op_type = Some(field.string()?.to_string());
                }
                Self::ATTRIBUTE => {
                    msg.attribute.push(AttributeProto::decode_field(&field)?);
                }
                Self::DOC_STRING => {
                    msg.doc_string = Some(field.string()?.to_string());
                }
                Self::DOMAIN => {
                    msg.domain = Some(field.string()?.to_string());
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for NodeProto {
    fn encode_fields(&self, enc: &mut Encoder) {
        for input in &self.input {
            enc.string(Self::INPUT, input);
        }
        for output in &self.output {
            enc.string(Self::OUTPUT, output);
        }
        if let Some(name) = &self.name {
            enc.string(Self::NAME, name);
        }
        if let Some(op_type) = &self.op_type {
            enc.string(Self::OP_TYPE, op_type);
        }
        for attr in &self.attribute {
            enc.message(Self::ATTRIBUTE, attr);
        }
        if let Some(doc_string) = &self.doc_string {
            enc.string(Self::DOC_STRING, doc_string);
        }
        if let Some(domain) = &self.domain {
            enc.string(Self::DOMAIN, domain);
        }
    }
}

#[derive(Clone, Default, PartialEq)]
pub struct TensorProto {
    pub dims: Vec<i64>,
    pub data_type: Option<DataType>,
    pub float_data: Vec<f32>,
    pub int32_data: Vec<i32>,
    pub int64_data: Vec<i64>,
    pub name: Option<String>,

    /// Field containing tensor data as bytes in packed little-endian order.
    pub raw_data: Option<Vec<u8>>,
    pub external_data: Vec<StringStringEntryProto>,
    pub data_location: Option<DataLocation>,
}

impl TensorProto {
    pub const DIMS: u64 = 1;
    pub const DATA_TYPE: u64 = 2;
    pub const FLOAT_DATA: u64 = 4;
    pub const INT32_DATA: u64 = 5;
    pub const INT64_DATA: u64 = 7;
    pub const NAME: u64 = 8;
    pub const RAW_DATA: u64 = 9;
    pub const EXTERNAL_DATA: u64 = 13;
    pub const DATA_LOCATION: u64 = 14;
}

impl std::fmt::Debug for TensorProto {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("TensorProto")
            .field("dims", &self.dims)
            .field("data_type", &self.data_type)
            .field("name", &self.name)
            .field("data_location", &self.data_location)
            .finish()
    }
}

impl DecodeMessage for TensorProto {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = TensorProto::default();
        for field in fields {
            let field = field?;
            match field.number() {
                Self::DIMS => {
                    for dim in field.read_repeated_int64()? {
                        msg.dims.push(dim?);
                    }
                }
                Self::DATA_TYPE => {
                    msg.data_type = Some(DataType(field.get_enum()?));
                }
                Self::FLOAT_DATA => {
                    for float in field.read_repeated_float()? {
                        msg.float_data.push(float?);
                    }
                }
                Self::INT32_DATA => {
                    for int32 in field.read_repeated_int32()? {
                        msg.int32_data.push(int32?);
                    }
                }
                Self::INT64_DATA => {
                    for int64 in field.read_repeated_int64()? {
                        msg.int64_data.push(int64?);
                    }
                }
                Self::NAME => {
                    msg.name = Some(field.string()?.to_string());
                }
                Self::RAW_DATA => {
                    msg.raw_data = Some(field.bytes()?.to_vec());
                }
                Self::EXTERNAL_DATA => {
                    msg.external_data
                        .push(StringStringEntryProto::decode_field(&field)?);
                }
                Self::DATA_LOCATION => {
                    msg.data_location = Some(DataLocation(field.get_enum()?));
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for TensorProto {
    fn encode_fields(&self, enc: &mut Encoder) {
        for &dim in &self.dims {
            enc.int64(Self::DIMS, dim);
        }
        if let Some(data_type) = self.data_type {
            enc.int32(Self::DATA_TYPE, data_type.0);
        }
        if !self.float_data.is_empty() {
            enc.packed_float(Self::FLOAT_DATA, &self.float_data);
        }
        if !self.int32_data.is_empty() {
            let vals: Vec<i64> = self.int32_data.iter().map(|&x| x as i64).collect();
            enc.packed_int64(Self::INT32_DATA, &vals);
        }
        if !self.int64_data.is_empty() {
            enc.packed_int64(Self::INT64_DATA, &self.int64_data);
        }
        if let Some(name) = &self.name {
            enc.string(Self::NAME, name);
        }
        if let Some(raw_data) = &self.raw_data {
            enc.bytes(Self::RAW_DATA, raw_data);
        }
        for entry in &self.external_data {
            enc.message(Self::EXTERNAL_DATA, entry);
        }
        if let Some(location) = self.data_location {
            enc.int32(Self::DATA_LOCATION, location.0);
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct DataLocation(pub i32);

impl DataLocation {
    pub const DEFAULT: Self = Self(0);
    pub const EXTERNAL: Self = Self(1);
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct DataType(pub i32);

impl DataType {
    pub const FLOAT: Self = Self(1);
    pub const UINT8: Self = Self(2);
    pub const INT8: Self = Self(3);
    pub const INT32: Self = Self(6);
    pub const INT64: Self = Self(7);
    pub const BOOL: Self = Self(9);
    pub const DOUBLE: Self = Self(11);
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dimension {
    pub dim_value: Option<i64>,
    pub dim_param: Option<String>,
}

impl Dimension {
    pub const DIM_VALUE: u64 = 1;
    pub const DIM_PARAM: u64 = 2;
}

impl DecodeMessage for Dimension {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            match field.number() {
                Self::DIM_VALUE => {
                    msg.dim_value = Some(field.get_int64()?);
                }
                Self::DIM_PARAM => {
                    msg.dim_param = Some(field.string()?.to_string());
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for Dimension {
    fn encode_fields(&self, enc: &mut Encoder) {
        if let Some(value) = self.dim_value {
            enc.int64(Self::DIM_VALUE, value);
        }
        if let Some(param) = &self.dim_param {
            enc.string(Self::DIM_PARAM, param);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StringStringEntryProto {
    pub key: Option<String>,
    pub value: Option<String>,
}

impl StringStringEntryProto {
    pub const KEY: u64 = 1;
    pub const VALUE: u64 = 2;
}

impl DecodeMessage for StringStringEntryProto {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            match field.number() {
                Self::KEY => {
                    msg.key = Some(field.string()?.to_string());
                }
                Self::VALUE => {
                    msg.value = Some(field.string()?.to_string());
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for StringStringEntryProto {
    fn encode_fields(&self, enc: &mut Encoder) {
        if let Some(key) = &self.key {
            enc.string(Self::KEY, key);
        }
        if let Some(value) = &self.value {
            enc.string(Self::VALUE, value);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TensorShapeProto {
    pub dim: Vec<Dimension>,
}

impl TensorShapeProto {
    pub const DIM: u64 = 1;
}

impl DecodeMessage for TensorShapeProto {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            if field.number() == Self::DIM {
                msg.dim.push(Dimension::decode_field(&field)?);
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for TensorShapeProto {
    fn encode_fields(&self, enc: &mut Encoder) {
        for dim in &self.dim {
            enc.message(Self::DIM, dim);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeProtoTensor {
    pub elem_type: Option<DataType>,
    pub shape: Option<TensorShapeProto>,
}

impl TypeProtoTensor {
    pub const ELEM_TYPE: u64 = 1; // DataType
    pub const SHAPE: u64 = 2; // TensorShapeProto
}

impl DecodeMessage for TypeProtoTensor {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            match field.number() {
                Self::ELEM_TYPE => {
                    msg.elem_type = Some(DataType(field.get_enum()?));
                }
                Self::SHAPE => {
                    msg.shape = Some(TensorShapeProto::decode_field(&field)?);
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for TypeProtoTensor {
    fn encode_fields(&self, enc: &mut Encoder) {
        if let Some(elem_type) = self.elem_type {
            enc.int32(Self::ELEM_TYPE, elem_type.0);
        }
        if let Some(shape) = &self.shape {
            enc.message(Self::SHAPE, shape);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeProtoSequence {
    pub elem_type: Option<TypeProto>,
}

impl TypeProtoSequence {
    pub const ELEM_TYPE: u64 = 1;
}

impl DecodeMessage for TypeProtoSequence {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            if field.number() == Self::ELEM_TYPE {
                msg.elem_type = Some(TypeProto::decode_field(&field)?);
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for TypeProtoSequence {
    fn encode_fields(&self, enc: &mut Encoder) {
        if let Some(elem_type) = &self.elem_type {
            enc.message(Self::ELEM_TYPE, elem_type);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeProto {
    pub tensor_type: Option<TypeProtoTensor>,
    pub sequence: Option<Box<TypeProtoSequence>>,
}

impl TypeProto {
    pub const TENSOR_TYPE: u64 = 1;
    pub const SEQUENCE: u64 = 4;
}

impl DecodeMessage for TypeProto {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            match field.number() {
                Self::TENSOR_TYPE => {
                    msg.tensor_type = Some(TypeProtoTensor::decode_field(&field)?);
                }
                Self::SEQUENCE => {
                    msg.sequence = Some(Box::new(TypeProtoSequence::decode_field(&field)?));
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for TypeProto {
    fn encode_fields(&self, enc: &mut Encoder) {
        if let Some(tensor_type) = &self.tensor_type {
            enc.message(Self::TENSOR_TYPE, tensor_type);
        }
        if let Some(sequence) = &self.sequence {
            enc.message(Self::SEQUENCE, sequence.as_ref());
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueInfoProto {
    pub name: Option<String>,
    pub r#type: Option<TypeProto>,
}

impl ValueInfoProto {
    pub const NAME: u64 = 1;
    pub const TYPE: u64 = 2;

    /// Return the static shape of a tensor value, if declared.
    ///
    /// Dimensions without a fixed size are returned as `None`.
    pub fn tensor_shape(&self) -> Option<Vec<Option<i64>>> {
        let shape = self.r#type.as_ref()?.tensor_type.as_ref()?.shape.as_ref()?;
        Some(shape.dim.iter().map(|dim| dim.dim_value).collect())
    }
}

impl DecodeMessage for ValueInfoProto {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            match field.number() {
                Self::NAME => {
                    msg.name = Some(field.string()?.to_string());
                }
                Self::TYPE => {
                    msg.r#type = Some(TypeProto::decode_field(&field)?);
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for ValueInfoProto {
    fn encode_fields(&self, enc: &mut Encoder) {
        if let Some(name) = &self.name {
            enc.string(Self::NAME, name);
        }
        if let Some(ty) = &self.r#type {
            enc.message(Self::TYPE, ty);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphProto {
    pub node: Vec<NodeProto>,
    pub name: Option<String>,
    pub initializer: Vec<TensorProto>,
    pub doc_string: Option<String>,
    pub input: Vec<ValueInfoProto>,
    pub output: Vec<ValueInfoProto>,
    pub value_info: Vec<ValueInfoProto>,
}

impl GraphProto {
    pub const NODE: u64 = 1;
    pub const NAME: u64 = 2;
    pub const INITIALIZER: u64 = 5;
    pub const DOC_STRING: u64 = 10;
    pub const INPUT: u64 = 11;
    pub const OUTPUT: u64 = 12;
    pub const VALUE_INFO: u64 = 13;
}

impl DecodeMessage for GraphProto {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            match field.number() {
                Self::NODE => {
                    msg.node.push(NodeProto::decode_field(&field)?);
                }
                Self::NAME => {
                    msg.name = Some(field.string()?.to_string());
                }
                Self::INITIALIZER => {
                    msg.initializer.push(TensorProto::decode_field(&field)?);
                }
                Self::DOC_STRING => {
                    msg.doc_string = Some(field.string()?.to_string());
                }
                Self::INPUT => {
                    msg.input.push(ValueInfoProto::decode_field(&field)?);
                }
                Self::OUTPUT => {
                    msg.output.push(ValueInfoProto::decode_field(&field)?);
                }
                Self::VALUE_INFO => {
                    msg.value_info.push(ValueInfoProto::decode_field(&field)?);
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for GraphProto {
    fn encode_fields(&self, enc: &mut Encoder) {
        for node in &self.node {
            enc.message(Self::NODE, node);
        }
        if let Some(name) = &self.name {
            enc.string(Self::NAME, name);
        }
        for init in &self.initializer {
            enc.message(Self::INITIALIZER, init);
        }
        if let Some(doc_string) = &self.doc_string {
            enc.string(Self::DOC_STRING, doc_string);
        }
        for input in &self.input {
            enc.message(Self::INPUT, input);
        }
        for output in &self.output {
            enc.message(Self::OUTPUT, output);
        }
        for info in &self.value_info {
            enc.message(Self::VALUE_INFO, info);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperatorSetIdProto {
    pub domain: Option<String>,
    pub version: Option<i64>,
}

impl OperatorSetIdProto {
    pub const DOMAIN: u64 = 1;
    pub const VERSION: u64 = 2;
}

impl DecodeMessage for OperatorSetIdProto {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            match field.number() {
                Self::DOMAIN => {
                    msg.domain = Some(field.string()?.to_string());
                }
                Self::VERSION => {
                    msg.version = Some(field.get_int64()?);
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for OperatorSetIdProto {
    fn encode_fields(&self, enc: &mut Encoder) {
        if let Some(domain) = &self.domain {
            enc.string(Self::DOMAIN, domain);
        }
        if let Some(version) = self.version {
            enc.int64(Self::VERSION, version);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelProto {
    pub ir_version: Option<i64>,
    pub producer_name: Option<String>,
    pub producer_version: Option<String>,
    pub domain: Option<String>,
    pub model_version: Option<i64>,
    pub doc_string: Option<String>,
    pub graph: Option<GraphProto>,
    pub opset_import: Vec<OperatorSetIdProto>,
    pub metadata_props: Vec<StringStringEntryProto>,
}

impl ModelProto {
    pub const IR_VERSION: u64 = 1;
    pub const PRODUCER_NAME: u64 = 2;
    pub const PRODUCER_VERSION: u64 = 3;
    pub const DOMAIN: u64 = 4;
    pub const MODEL_VERSION: u64 = 5;
    pub const DOC_STRING: u64 = 6;
    pub const GRAPH: u64 = 7;
    pub const OPSET_IMPORT: u64 = 8;
    pub const METADATA_PROPS: u64 = 14;
}

impl DecodeMessage for ModelProto {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            match field.number() {
                Self::IR_VERSION => {
                    msg.ir_version = Some(field.get_int64()?);
                }
                Self::PRODUCER_NAME => {
                    msg.producer_name = Some(field.string()?.to_string());
                }
                Self::PRODUCER_VERSION => {
                    msg.producer_version = Some(field.string()?.to_string());
                }
                Self::DOMAIN => {
                    msg.domain = Some(field.string()?.to_string());
                }
                Self::MODEL_VERSION => {
                    msg.model_version = Some(field.get_int64()?);
                }
                Self::DOC_STRING => {
                    msg.doc_string = Some(field.string()?.to_string());
                }
                Self::GRAPH => {
                    msg.graph = Some(GraphProto::decode_field(&field)?);
                }
                Self::OPSET_IMPORT => {
                    msg.opset_import
                        .push(OperatorSetIdProto::decode_field(&field)?);
                }
                Self::METADATA_PROPS => {
                    msg.metadata_props
                        .push(StringStringEntryProto::decode_field(&field)?);
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

impl EncodeMessage for ModelProto {
    fn encode_fields(&self, enc: &mut Encoder) {
        if let Some(ir_version) = self.ir_version {
            enc.int64(Self::IR_VERSION, ir_version);
        }
        if let Some(producer_name) = &self.producer_name {
            enc.string(Self::PRODUCER_NAME, producer_name);
        }
        if let Some(producer_version) = &self.producer_version {
            enc.string(Self::PRODUCER_VERSION, producer_version);
        }
        if let Some(domain) = &self.domain {
            enc.string(Self::DOMAIN, domain);
        }
        if let Some(model_version) = self.model_version {
            enc.int64(Self::MODEL_VERSION, model_version);
        }
        if let Some(doc_string) = &self.doc_string {
            enc.string(Self::DOC_STRING, doc_string);
        }
        if let Some(graph) = &self.graph {
            enc.message(Self::GRAPH, graph);
        }
        for opset in &self.opset_import {
            enc.message(Self::OPSET_IMPORT, opset);
        }
        for prop in &self.metadata_props {
            enc.message(Self::METADATA_PROPS, prop);
        }
    }
}

/// Simplified version of [`ModelProto`] used for file type detection.
#[derive(Debug, Default)]
struct SlimModelProto {
    pub ir_version: Option<i64>,
    pub graph: bool,
}

impl DecodeMessage for SlimModelProto {
    fn decode_fields(fields: Fields) -> Result<Self, ProtobufError> {
        let mut msg = Self::default();
        for field in fields {
            let field = field?;
            match field.number() {
                ModelProto::IR_VERSION => {
                    msg.ir_version = Some(field.get_int64()?);
                }
                ModelProto::GRAPH => {
                    // Check the wire type without decoding the graph.
                    field.bytes()?;
                    msg.graph = true;
                }
                _ => {}
            }
        }
        Ok(msg)
    }
}

/// Test whether a buffer contains an ONNX model.
///
/// ONNX models do not contain any magic bytes that would make detection simple.
/// Instead this function attempts to parse the data as a simplified version of
/// the `ModelProto` message type, testing for the presence of a few key fields
/// but skipping over the main graph.
///
/// ```
/// use einsum_lower_onnx::onnx::is_onnx_model;
///
/// assert!(!is_onnx_model(b"NOT AN ONNX MODEL"));
/// ```
pub fn is_onnx_model(buf: &[u8]) -> bool {
    let Ok(model) = SlimModelProto::decode(buf) else {
        return false;
    };
    // The `ir_version` field is required, and a model without a graph is not
    // useful.
    model.ir_version.is_some() && model.graph
}

#[cfg(test)]
mod tests {
    use super::{
        AttributeProto, AttributeType, DataType, Dimension, GraphProto, ModelProto, NodeProto,
        OperatorSetIdProto, TensorProto, TensorShapeProto, TypeProto, TypeProtoTensor,
        ValueInfoProto, is_onnx_model,
    };
    use crate::protobuf::{DecodeMessage, EncodeMessage, Encoder, ErrorKind};

    fn value_info(name: &str, shape: &[Option<i64>]) -> ValueInfoProto {
        let dim = shape
            .iter()
            .map(|&size| Dimension {
                dim_value: size,
                dim_param: size.is_none().then(|| "n".to_string()),
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

    fn einsum_model() -> ModelProto {
        let equation = AttributeProto {
            name: Some("equation".to_string()),
            s: Some(b"hbwpc,hbwqc->hbwpq".to_vec()),
            r#type: Some(AttributeType::STRING),
            ..Default::default()
        };
        let node = NodeProto {
            input: vec!["a".into(), "b".into()],
            output: vec!["y".into()],
            name: Some("einsum".into()),
            op_type: Some("Einsum".into()),
            attribute: vec![equation],
            ..Default::default()
        };
        let weight = TensorProto {
            dims: vec![2],
            data_type: Some(DataType::INT64),
            int64_data: vec![-1, 7],
            name: Some("w".into()),
            ..Default::default()
        };
        ModelProto {
            ir_version: Some(8),
            producer_name: Some("test".into()),
            graph: Some(GraphProto {
                node: vec![node],
                name: Some("main".into()),
                initializer: vec![weight],
                input: vec![value_info("a", &[Some(1), None, Some(2), Some(3), Some(2)])],
                output: vec![value_info("y", &[])],
                ..Default::default()
            }),
            opset_import: vec![OperatorSetIdProto {
                domain: Some(String::new()),
                version: Some(17),
            }],
            ..Default::default()
        }
    }

    // Test decoding an empty buffer. This should succeed and return a
    // default ModelProto.
    #[test]
    fn test_decode_empty_model() {
        let model = ModelProto::decode(&[]).unwrap();
        assert!(model.graph.is_none());
    }

    #[test]
    fn test_encode_decode_model() {
        let model = einsum_model();
        let buf = model.encode();
        let decoded = ModelProto::decode(&buf).unwrap();
        assert_eq!(decoded, model);

        let graph = decoded.graph.unwrap();
        assert_eq!(graph.node[0].attribute[0].s.as_deref(), Some(b"hbwpc,hbwqc->hbwpq".as_slice()));
        assert_eq!(
            graph.input[0].tensor_shape(),
            Some(vec![Some(1), None, Some(2), Some(3), Some(2)])
        );
        assert_eq!(graph.initializer[0].int64_data, [-1, 7]);
    }

    #[test]
    fn test_decode_unpacked_and_packed_ints() {
        // Attribute `ints` written unpacked, as proto2 encoders do, followed
        // by a packed block.
        let mut enc = Encoder::new();
        enc.string(AttributeProto::NAME, "perm");
        enc.int64(AttributeProto::INTS, 0);
        enc.packed_int64(AttributeProto::INTS, &[2, 1]);
        enc.int32(AttributeProto::TYPE, AttributeType::INTS.0);
        let attr = AttributeProto::decode(&enc.finish()).unwrap();

        assert_eq!(attr.name.as_deref(), Some("perm"));
        assert_eq!(attr.ints, [0, 2, 1]);
        assert_eq!(attr.r#type, Some(AttributeType::INTS));
    }

    #[test]
    fn test_decode_error_context() {
        let mut enc = Encoder::new();
        enc.int64(NodeProto::OP_TYPE, 5);
        let err = NodeProto::decode(&enc.finish()).err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::FieldTypeMismatch);
        assert_eq!(err.field(), Some(NodeProto::OP_TYPE));
        assert!(err.context().unwrap().ends_with("NodeProto"));
    }

    #[test]
    fn test_is_onnx_model() {
        assert!(is_onnx_model(&einsum_model().encode()));
        assert!(!is_onnx_model(b"NOT AN ONNX MODEL"));
        assert!(!is_onnx_model(&[]));

        let no_graph = ModelProto {
            ir_version: Some(8),
            ..Default::default()
        };
        assert!(!is_onnx_model(&no_graph.encode()));
    }
}
