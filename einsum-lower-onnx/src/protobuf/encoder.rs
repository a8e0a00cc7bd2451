use crate::protobuf::field::WireType;
use crate::protobuf::message::EncodeMessage;
use crate::protobuf::varint::{varint_len, write_varint};

/// Serializes fields of a message into a buffer.
///
/// Fields are written in the order the methods are called. The encoder does
/// not skip fields with default values. Callers decide which fields to emit.
#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn tag(&mut self, number: u64, wire_type: WireType) {
        write_varint(&mut self.buf, wire_type.tag(number));
    }

    /// Write a field with an unsigned varint value.
    pub fn varint(&mut self, number: u64, val: u64) {
        self.tag(number, WireType::Varint);
        write_varint(&mut self.buf, val);
    }

    /// Write a field with schema type `int64`.
    pub fn int64(&mut self, number: u64, val: i64) {
        self.varint(number, val as u64);
    }

    /// Write a field with schema type `int32` or an enum type.
    ///
    /// Negative values are sign-extended to 64 bits, as the encoding requires.
    pub fn int32(&mut self, number: u64, val: i32) {
        self.varint(number, val as i64 as u64);
    }

    /// Write a field with schema type `float`.
    pub fn float(&mut self, number: u64, val: f32) {
        self.tag(number, WireType::I32);
        self.buf.extend(val.to_le_bytes());
    }

    /// Write a length-delimited field.
    pub fn bytes(&mut self, number: u64, data: &[u8]) {
        self.tag(number, WireType::Len);
        write_varint(&mut self.buf, data.len() as u64);
        self.buf.extend_from_slice(data);
    }

    /// Write a field with schema type `string`.
    pub fn string(&mut self, number: u64, val: &str) {
        self.bytes(number, val.as_bytes());
    }

    /// Write an embedded message.
    pub fn message<M: EncodeMessage + ?Sized>(&mut self, number: u64, msg: &M) {
        self.bytes(number, &msg.encode());
    }

    /// Write a `repeated int64` field using the packed representation.
    pub fn packed_int64(&mut self, number: u64, vals: &[i64]) {
        let len: usize = vals.iter().map(|&v| varint_len(v as u64)).sum();
        self.tag(number, WireType::Len);
        write_varint(&mut self.buf, len as u64);
        for &val in vals {
            write_varint(&mut self.buf, val as u64);
        }
    }

    /// Write a `repeated float` field using the packed representation.
    pub fn packed_float(&mut self, number: u64, vals: &[f32]) {
        self.tag(number, WireType::Len);
        write_varint(&mut self.buf, (vals.len() * 4) as u64);
        for val in vals {
            self.buf.extend(val.to_le_bytes());
        }
    }

    /// Append already-encoded fields.
    pub fn raw(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Return the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the encoder and return the encoded message.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::Encoder;
    use crate::protobuf::{FieldValue, Fields};

    #[test]
    fn test_encode_scalars() {
        let mut enc = Encoder::new();
        assert!(enc.is_empty());
        enc.varint(1, 150);
        assert!(!enc.is_empty());
        assert_eq!(enc.len(), 3);
        enc.int32(2, -1);
        enc.float(3, 0.5);
        let buf = enc.finish();

        assert_eq!(&buf[..3], [0x08, 0x96, 0x01]);

        let values: Vec<_> = Fields::new(&buf, None)
            .map(|f| f.unwrap().value())
            .collect();
        assert_eq!(
            values,
            [
                FieldValue::Varint(150),
                FieldValue::Varint(u64::MAX),
                FieldValue::I32(i32::from_le_bytes(0.5f32.to_le_bytes())),
            ]
        );
    }

    #[test]
    fn test_encode_packed_int64() {
        let mut enc = Encoder::new();
        enc.packed_int64(7, &[1, 300, -1]);
        let buf = enc.finish();

        // Tag, length prefix, then 1 + 2 + 10 bytes of values.
        assert_eq!(buf[0], (7 << 3) | 2);
        assert_eq!(buf[1], 13);
        assert_eq!(buf.len(), 15);

        let field = Fields::new(&buf, None).next().unwrap().unwrap();
        let vals: Vec<i64> = field
            .read_repeated_int64()
            .unwrap()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(vals, [1, 300, -1]);
    }
}
