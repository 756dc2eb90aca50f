//! Buffer construction and field addressing.
//!
//! The layout engine turns a [`Schema`](crate::descriptor::Schema) plus a
//! list of literal 32-bit words into a contiguous byte buffer, and allocates
//! zero-filled output buffers whose sub-ranges are addressable by field name.
//!
//! All words are marshaled most-significant-byte first: the coprocessor's
//! data memory is big-endian, and a `v128` field stores its four words in
//! register order (lane 0 at the lowest address).

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use crate::descriptor::Schema;

/// Errors from buffer construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Literal word count does not match the schema's total word count.
    #[error("input length mismatch: schema wants {expected} words, got {actual}")]
    InputLengthMismatch {
        /// Words the schema requires.
        expected: usize,
        /// Words supplied.
        actual: usize,
    },
}

/// A contiguous byte region tied to the schema that describes it.
///
/// Buffers are exclusively owned: the input buffer by whoever built it from
/// literals, the output buffer by the driver run that filled it. Input and
/// output buffers never alias.
#[derive(Debug, Clone)]
pub struct Buffer {
    schema: Schema,
    data: Vec<u8>,
}

impl Buffer {
    /// Build an input buffer from literal words.
    ///
    /// `words` must contain exactly one entry per 32-bit word of the schema
    /// footprint (4 per `v128` field, 1 per `u32` field), in field order,
    /// most-significant word first within each field.
    pub fn build_input(schema: &Schema, words: &[u32]) -> Result<Buffer, LayoutError> {
        let expected = schema.word_count();
        if words.len() != expected {
            return Err(LayoutError::InputLengthMismatch {
                expected,
                actual: words.len(),
            });
        }

        let mut data = vec![0u8; schema.size_bytes()];
        let mut cursor = words.iter();
        for field in schema.fields() {
            let mut off = field.offset;
            for _ in 0..field.word_count() {
                // cursor length was checked against the schema up front
                let word = cursor.next().unwrap();
                BigEndian::write_u32(&mut data[off..off + 4], *word);
                off += 4;
            }
        }

        log::trace!("built input buffer: {} bytes", data.len());
        Ok(Buffer {
            schema: schema.clone(),
            data,
        })
    }

    /// Allocate a zero-initialized output buffer for the schema.
    pub fn build_output(schema: &Schema) -> Buffer {
        Buffer {
            schema: schema.clone(),
            data: vec![0u8; schema.size_bytes()],
        }
    }

    /// The schema describing this buffer.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is zero-sized.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whole region as bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Whole region as mutable bytes.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Whole region as big-endian words.
    pub fn words(&self) -> Vec<u32> {
        self.data.chunks_exact(4).map(BigEndian::read_u32).collect()
    }

    /// Byte range of one field, addressed by name.
    pub fn field_bytes(&self, name: &str) -> Option<&[u8]> {
        let field = self.schema.field(name)?;
        Some(&self.data[field.byte_range()])
    }

    /// One field's words, addressed by name.
    pub fn field_words(&self, name: &str) -> Option<Vec<u32>> {
        let bytes = self.field_bytes(name)?;
        Some(bytes.chunks_exact(4).map(BigEndian::read_u32).collect())
    }
}
