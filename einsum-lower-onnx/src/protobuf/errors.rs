use std::error::Error;
use std::fmt;

use crate::protobuf::varint::VarintError;

/// A failure while reading a message or locating the fields to splice.
///
/// Errors raised while reading a field carry the name of the enclosing
/// message type and the field number, when known.
#[derive(Clone, Debug, PartialEq)]
pub struct ProtobufError {
    kind: ErrorKind,
    message_type: Option<&'static str>,
    field_number: Option<u64>,
}

impl ProtobufError {
    pub fn new(kind: ErrorKind) -> Self {
        ProtobufError {
            kind,
            message_type: None,
            field_number: None,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Name of the message type being decoded.
    pub fn context(&self) -> Option<&str> {
        self.message_type
    }

    pub fn field(&self) -> Option<u64> {
        self.field_number
    }

    /// Replace the location at which this error occurred.
    pub fn with_context(self, message_type: Option<&'static str>, field: Option<u64>) -> Self {
        ProtobufError {
            message_type,
            field_number: field,
            ..self
        }
    }
}

impl fmt::Display for ProtobufError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.message())?;
        match (self.message_type, self.field_number) {
            (Some(ty), Some(field)) => write!(f, " (message {ty}, field {field})"),
            (Some(ty), None) => write!(f, " (message {ty})"),
            (None, Some(field)) => write!(f, " (field {field})"),
            (None, None) => Ok(()),
        }
    }
}

impl Error for ProtobufError {}

impl From<VarintError> for ProtobufError {
    fn from(err: VarintError) -> Self {
        let kind = match err {
            VarintError::Eof => ErrorKind::Eof,
            VarintError::InvalidVarint => ErrorKind::InvalidVarint,
        };
        ProtobufError::new(kind)
    }
}

/// Cause of a [`ProtobufError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A varint encoded more than 64 bits, or was cut off by the end of
    /// the input.
    InvalidVarint,

    /// Input ended inside a tag, varint or length-delimited payload.
    Eof,

    /// A field was read as a type its wire type can't hold.
    FieldTypeMismatch,

    /// Packed fixed-width payload whose length isn't a multiple of the
    /// element size.
    FieldLengthMismatch,

    /// Wire type 6 or 7, which Protocol Buffers doesn't define.
    InvalidWireType,

    InvalidUtf8,

    /// A message field needed for splicing is absent.
    MissingField,

    /// A message field needed for splicing appears more than once.
    DuplicateField,
}

impl ErrorKind {
    /// Short lower-case description of the error.
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidVarint => "malformed varint",
            Self::Eof => "unexpected end of input",
            Self::FieldTypeMismatch => "value doesn't match the field's wire type",
            Self::FieldLengthMismatch => "packed field has a partial element",
            Self::InvalidWireType => "unsupported wire type",
            Self::InvalidUtf8 => "string is not valid UTF-8",
            Self::MissingField => "required field is missing",
            Self::DuplicateField => "field appears more than once",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ProtobufError};
    use crate::protobuf::varint::VarintError;

    #[test]
    fn test_display() {
        struct Case {
            err: ProtobufError,
            expected: &'static str,
        }

        let cases = [
            Case {
                err: ProtobufError::new(ErrorKind::Eof),
                expected: "unexpected end of input",
            },
            Case {
                err: ProtobufError::new(ErrorKind::MissingField)
                    .with_context(Some("ModelProto"), Some(7)),
                expected: "required field is missing (message ModelProto, field 7)",
            },
            Case {
                err: ProtobufError::new(ErrorKind::InvalidVarint).with_context(Some("NodeProto"), None),
                expected: "malformed varint (message NodeProto)",
            },
            Case {
                err: ProtobufError::new(ErrorKind::InvalidWireType).with_context(None, Some(3)),
                expected: "unsupported wire type (field 3)",
            },
        ];

        for Case { err, expected } in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_with_context_replaces_location() {
        let err = ProtobufError::new(ErrorKind::Eof)
            .with_context(Some("GraphProto"), Some(1))
            .with_context(Some("NodeProto"), None);
        assert_eq!(err.kind(), &ErrorKind::Eof);
        assert_eq!(err.context(), Some("NodeProto"));
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_from_varint_error() {
        let err = ProtobufError::from(VarintError::InvalidVarint);
        assert_eq!(err.kind(), &ErrorKind::InvalidVarint);
        assert_eq!(err.context(), None);

        let err = ProtobufError::from(VarintError::Eof);
        assert_eq!(err.kind(), &ErrorKind::Eof);
    }
}
