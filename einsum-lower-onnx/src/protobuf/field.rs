use std::ops::Range;

use crate::protobuf::errors::{ErrorKind, ProtobufError};
use crate::protobuf::varint::read_varint;

/// Wire type of a field.
///
/// See <https://protobuf.dev/programming-guides/encoding/#structure>.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    I64 = 1,
    Len = 2,
    Sgroup = 3,
    Egroup = 4,
    I32 = 5,
}

impl WireType {
    /// Return the tag which starts a field with this wire type and a given
    /// field number.
    pub fn tag(self, number: u64) -> u64 {
        (number << 3) | self as u64
    }
}

/// Wire-type and associated value of a field.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FieldValue<'a> {
    /// Integer value encoded as a varint.
    Varint(u64),

    /// 64-bit fixed-width value.
    I64(i64),

    /// A variable-length value. This is the payload, without the length
    /// prefix.
    Len(&'a [u8]),

    /// Deprecated start-of-group type.
    Sgroup,

    /// Deprecated end-of-group type.
    Egroup,

    /// 32-bit fixed-width value.
    I32(i32),
}

/// A single field of a message.
///
/// `Field`s are produced by iterating over a [`Fields`]. Fields have a number,
/// a value and the encoded bytes they were read from. Fields borrow from the
/// message buffer rather than the iterator, so they can be kept after the
/// iterator has advanced.
///
/// # Repeated fields
///
/// Repeated fields with a primitive type may have either a packed or un-packed
/// representation. The `read_repeated_*` methods return iterators which handle
/// both cases. The returned iterators will yield a single value if the field
/// is unpacked, or all values in a packed block if the field is packed.
#[derive(Copy, Clone, Debug)]
pub struct Field<'a> {
    number: u64,
    value: FieldValue<'a>,

    /// The encoded field, including the tag and length prefix.
    raw: &'a [u8],

    /// Offset of `raw` within the message buffer.
    offset: usize,

    /// Debug name of the message type this field belongs to.
    context: Option<&'static str>,
}

impl<'a> Field<'a> {
    /// Return the field number.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Return the field value.
    pub fn value(&self) -> FieldValue<'a> {
        self.value
    }

    /// Return the complete encoding of this field, including its tag.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// Return the range of the message buffer occupied by this field.
    pub fn span(&self) -> Range<usize> {
        self.offset..self.offset + self.raw.len()
    }

    /// Return the payload of a length-delimited field.
    pub fn bytes(&self) -> Result<&'a [u8], ProtobufError> {
        match self.value {
            FieldValue::Len(data) => Ok(data),
            _ => Err(self.error(ErrorKind::FieldTypeMismatch)),
        }
    }

    /// Return the UTF-8 encoded string in this field.
    pub fn string(&self) -> Result<&'a str, ProtobufError> {
        let bytes = self.bytes()?;
        std::str::from_utf8(bytes).map_err(|_| self.error(ErrorKind::InvalidUtf8))
    }

    /// Begin reading the embedded message in this field.
    ///
    /// `context` is the name of the embedded message type being read. It is
    /// used to add context to any errors encountered.
    pub fn message(&self, context: Option<&'static str>) -> Result<Fields<'a>, ProtobufError> {
        self.bytes().map(|data| Fields::new(data, context))
    }

    fn get_varint(&self) -> Result<u64, ProtobufError> {
        match self.value {
            FieldValue::Varint(val) => Ok(val),
            _ => Err(self.error(ErrorKind::FieldTypeMismatch)),
        }
    }

    /// Get the value of a field with schema type `int32`.
    pub fn get_int32(&self) -> Result<i32, ProtobufError> {
        self.get_varint().map(|v| v as i32)
    }

    /// Get the value of a field where the schema type is an enum.
    pub fn get_enum(&self) -> Result<i32, ProtobufError> {
        self.get_int32()
    }

    /// Get the value of a field with schema type `int64`.
    pub fn get_int64(&self) -> Result<i64, ProtobufError> {
        self.get_varint().map(|v| v as i64)
    }

    /// Get the value of a field with schema type `float`.
    pub fn get_float(&self) -> Result<f32, ProtobufError> {
        match self.value {
            FieldValue::I32(val) => Ok(f32::from_le_bytes(val.to_le_bytes())),
            _ => Err(self.error(ErrorKind::FieldTypeMismatch)),
        }
    }

    /// Get one or multiple values from a `repeated int32` field.
    pub fn read_repeated_int32(
        &self,
    ) -> Result<impl Iterator<Item = Result<i32, ProtobufError>> + 'a, ProtobufError> {
        self.read_repeated_varint(|x| x as i32)
    }

    /// Get one or multiple values from a `repeated int64` field.
    pub fn read_repeated_int64(
        &self,
    ) -> Result<impl Iterator<Item = Result<i64, ProtobufError>> + 'a, ProtobufError> {
        self.read_repeated_varint(|x| x as i64)
    }

    /// Get one or multiple values from a `repeated float` field.
    pub fn read_repeated_float(
        &self,
    ) -> Result<impl Iterator<Item = Result<f32, ProtobufError>> + 'a, ProtobufError> {
        match self.value {
            FieldValue::I32(val) => Ok(Repeated::Unpacked(Some(f32::from_le_bytes(
                val.to_le_bytes(),
            )))),
            FieldValue::Len(data) => {
                if data.len() % 4 != 0 {
                    return Err(self.error(ErrorKind::FieldLengthMismatch));
                }
                let iter = data.chunks_exact(4).map(|chunk| {
                    let bytes: [u8; 4] = [chunk[0], chunk[1], chunk[2], chunk[3]];
                    Ok::<_, ProtobufError>(f32::from_le_bytes(bytes))
                });
                Ok(Repeated::Packed(iter))
            }
            _ => Err(self.error(ErrorKind::FieldTypeMismatch)),
        }
    }

    /// Get the value of a repeated varint field.
    fn read_repeated_varint<T: Copy + 'a>(
        &self,
        from_u64: impl Fn(u64) -> T + 'a,
    ) -> Result<Repeated<T, impl Iterator<Item = Result<T, ProtobufError>> + 'a>, ProtobufError>
    {
        match self.value {
            FieldValue::Varint(val) => Ok(Repeated::Unpacked(Some(from_u64(val)))),
            FieldValue::Len(mut data) => {
                let context = self.context;
                let number = self.number;
                let iter = std::iter::from_fn(move || {
                    if data.is_empty() {
                        return None;
                    }
                    match read_varint(data) {
                        Ok((val, len)) => {
                            data = &data[len..];
                            Some(Ok(from_u64(val)))
                        }
                        Err(err) => {
                            data = &[];
                            Some(Err(
                                ProtobufError::from(err).with_context(context, Some(number))
                            ))
                        }
                    }
                });
                Ok(Repeated::Packed(iter))
            }
            _ => Err(self.error(ErrorKind::FieldTypeMismatch)),
        }
    }

    fn error(&self, kind: ErrorKind) -> ProtobufError {
        ProtobufError::new(kind).with_context(self.context, Some(self.number))
    }
}

/// Iterator over a repeated scalar field.
///
/// Repeated scalar fields may use either a packed or un-packed representation.
/// See https://protobuf.dev/programming-guides/encoding/#repeated.
enum Repeated<T: Copy, I: Iterator<Item = Result<T, ProtobufError>>> {
    Unpacked(Option<T>),
    Packed(I),
}

impl<T: Copy, I: Iterator<Item = Result<T, ProtobufError>>> Iterator for Repeated<T, I> {
    type Item = Result<T, ProtobufError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Unpacked(val) => val.take().map(Ok),
            Self::Packed(packed) => packed.next(),
        }
    }
}

/// Iterator over the fields of a message held in a buffer.
///
/// Iteration stops after the first error.
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use einsum_lower_onnx::protobuf::{FieldValue, Fields};
///
/// let message = [0x08, 0x96, 0x01];
/// for field in Fields::new(&message, None) {
///     let field = field?;
///     assert_eq!(field.number(), 1);
///     assert_eq!(field.value(), FieldValue::Varint(150));
/// }
/// # Ok(()) }
/// ```
pub struct Fields<'a> {
    buf: &'a [u8],
    pos: usize,

    /// Debug name of the message type.
    context: Option<&'static str>,

    failed: bool,
}

impl<'a> Fields<'a> {
    /// Iterate over the fields of the message in `buf`.
    ///
    /// `context` is the name of the message type being read, for debugging
    /// purposes.
    pub fn new(buf: &'a [u8], context: Option<&'static str>) -> Self {
        Self {
            buf,
            pos: 0,
            context,
            failed: false,
        }
    }

    fn read_field(&mut self) -> Result<Field<'a>, ProtobufError> {
        let context = self.context;
        let start = self.pos;
        let rest = &self.buf[start..];

        let (tag, tag_len) =
            read_varint(rest).map_err(|err| ProtobufError::from(err).with_context(context, None))?;
        let number = tag >> 3;
        let body = &rest[tag_len..];

        let error = |kind| ProtobufError::new(kind).with_context(context, Some(number));
        let varint = |buf: &[u8]| {
            read_varint(buf)
                .map_err(|err| ProtobufError::from(err).with_context(context, Some(number)))
        };

        let (value, body_len) = match tag & 0x7 {
            0 => {
                let (val, len) = varint(body)?;
                (FieldValue::Varint(val), len)
            }
            1 => {
                let bytes: [u8; 8] = body
                    .get(..8)
                    .and_then(|b| b.try_into().ok())
                    .ok_or_else(|| error(ErrorKind::Eof))?;
                (FieldValue::I64(i64::from_le_bytes(bytes)), 8)
            }
            2 => {
                let (len, prefix_len) = varint(body)?;
                let data = usize::try_from(len)
                    .ok()
                    .and_then(|len| body.get(prefix_len..prefix_len.checked_add(len)?))
                    .ok_or_else(|| error(ErrorKind::Eof))?;
                (FieldValue::Len(data), prefix_len + data.len())
            }
            3 => (FieldValue::Sgroup, 0),
            4 => (FieldValue::Egroup, 0),
            5 => {
                let bytes: [u8; 4] = body
                    .get(..4)
                    .and_then(|b| b.try_into().ok())
                    .ok_or_else(|| error(ErrorKind::Eof))?;
                (FieldValue::I32(i32::from_le_bytes(bytes)), 4)
            }
            _ => return Err(error(ErrorKind::InvalidWireType)),
        };

        let end = start + tag_len + body_len;
        self.pos = end;

        Ok(Field {
            number,
            value,
            raw: &self.buf[start..end],
            offset: start,
            context,
        })
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<Field<'a>, ProtobufError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.buf.len() {
            return None;
        }
        let field = self.read_field();
        self.failed = field.is_err();
        Some(field)
    }
}
