//! Typed layout descriptors.
//!
//! A memory region exchanged with the coprocessor is described by an ordered
//! list of `"<type>:<name>"` entries. Two field types exist:
//!
//! - **`v128`**: one 128-bit vector register image (4 × 32-bit words,
//!   most-significant word first)
//! - **`u32`**: one 32-bit scalar word
//!
//! Parsing produces a [`Schema`]: an ordered sequence of named fields with
//! byte sizes and cumulative offsets. Schemas are immutable once built; the
//! parse is pure and either fully succeeds or fails with no partial result.

use std::fmt;
use thiserror::Error;

/// Errors from descriptor parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// Entry has no `:` separator between type and name.
    #[error("malformed descriptor {entry:?}: missing ':' separator")]
    MissingSeparator {
        /// The offending entry text.
        entry: String,
    },

    /// Type tag is not part of the recognized set.
    #[error("malformed descriptor {entry:?}: unknown type tag {tag:?}")]
    UnknownType {
        /// The unrecognized tag.
        tag: String,
        /// The offending entry text.
        entry: String,
    },

    /// Field name is empty.
    #[error("malformed descriptor {entry:?}: empty field name")]
    EmptyName {
        /// The offending entry text.
        entry: String,
    },

    /// Two fields in the same schema share a name.
    #[error("duplicate field name {name:?} in schema")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },
}

/// Field type in a layout descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 128-bit vector register image: 4 consecutive 32-bit words.
    V128,
    /// Single 32-bit scalar word.
    U32,
}

impl FieldKind {
    /// Size of one field of this kind, in bytes.
    #[inline]
    pub const fn size_bytes(self) -> usize {
        match self {
            FieldKind::V128 => 16,
            FieldKind::U32 => 4,
        }
    }

    /// Number of 32-bit words one field of this kind occupies.
    #[inline]
    pub const fn word_count(self) -> usize {
        self.size_bytes() / 4
    }

    /// The textual type tag used in descriptor entries.
    pub const fn tag(self) -> &'static str {
        match self {
            FieldKind::V128 => "v128",
            FieldKind::U32 => "u32",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "v128" => Some(FieldKind::V128),
            "u32" => Some(FieldKind::U32),
            _ => None,
        }
    }
}

/// A single named, typed field with its resolved byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field type.
    pub kind: FieldKind,
    /// Field label. Opaque: used for addressing and diagnostics only.
    pub name: String,
    /// Byte offset from the start of the region.
    pub offset: usize,
}

impl FieldDescriptor {
    /// Size of this field in bytes.
    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.kind.size_bytes()
    }

    /// Number of 32-bit words this field occupies.
    #[inline]
    pub fn word_count(&self) -> usize {
        self.kind.word_count()
    }

    /// Byte range covered by this field.
    #[inline]
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size_bytes()
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.tag(), self.name)
    }
}

/// Ordered, immutable sequence of fields describing one memory region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Parse an ordered list of `"<type>:<name>"` entries.
    ///
    /// Offsets are assigned cumulatively in entry order with no padding
    /// inserted; a reserved field must be declared explicitly.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Schema, DescriptorError> {
        let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(entries.len());
        let mut offset = 0usize;

        for entry in entries {
            let entry = entry.as_ref();
            let (tag, name) =
                entry
                    .split_once(':')
                    .ok_or_else(|| DescriptorError::MissingSeparator {
                        entry: entry.to_string(),
                    })?;

            let kind = FieldKind::from_tag(tag).ok_or_else(|| DescriptorError::UnknownType {
                tag: tag.to_string(),
                entry: entry.to_string(),
            })?;

            if name.is_empty() {
                return Err(DescriptorError::EmptyName {
                    entry: entry.to_string(),
                });
            }
            if fields.iter().any(|f| f.name == name) {
                return Err(DescriptorError::DuplicateName {
                    name: name.to_string(),
                });
            }

            if offset % kind.size_bytes() != 0 {
                log::warn!(
                    "field {}:{} at offset 0x{:X} is not aligned to its natural size",
                    tag,
                    name,
                    offset
                );
            }

            fields.push(FieldDescriptor {
                kind,
                name: name.to_string(),
                offset,
            });
            offset += kind.size_bytes();
        }

        log::debug!(
            "parsed schema: {} fields, {} bytes",
            fields.len(),
            offset
        );
        Ok(Schema { fields })
    }

    /// All fields, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Total footprint of the region, in bytes.
    pub fn size_bytes(&self) -> usize {
        self.fields.iter().map(FieldDescriptor::size_bytes).sum()
    }

    /// Total number of 32-bit words in the region.
    pub fn word_count(&self) -> usize {
        self.fields.iter().map(FieldDescriptor::word_count).sum()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Re-serialize to the textual descriptor form.
    ///
    /// `parse` followed by `to_descriptors` is lossless.
    pub fn to_descriptors(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_schema() {
        let schema = Schema::parse(&["v128:vs", "v128:vt", "u32:flags"]).unwrap();

        assert_eq!(schema.len(), 3);
        assert_eq!(schema.size_bytes(), 36);
        assert_eq!(schema.word_count(), 9);

        let vs = schema.field("vs").unwrap();
        assert_eq!(vs.kind, FieldKind::V128);
        assert_eq!(vs.offset, 0);
        assert_eq!(vs.byte_range(), 0..16);

        let vt = schema.field("vt").unwrap();
        assert_eq!(vt.offset, 16);

        let flags = schema.field("flags").unwrap();
        assert_eq!(flags.kind, FieldKind::U32);
        assert_eq!(flags.offset, 32);
        assert_eq!(flags.byte_range(), 32..36);
    }

    #[test]
    fn test_offsets_are_cumulative() {
        let schema = Schema::parse(&["u32:a", "u32:b", "v128:v", "u32:c"]).unwrap();
        let offsets: Vec<usize> = schema.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 4, 8, 24]);
    }

    #[test]
    fn test_missing_separator() {
        let err = Schema::parse(&["v128vs"]).unwrap_err();
        assert!(matches!(err, DescriptorError::MissingSeparator { .. }));
    }

    #[test]
    fn test_unknown_type_tag() {
        let err = Schema::parse(&["v256:wide"]).unwrap_err();
        assert!(matches!(err, DescriptorError::UnknownType { ref tag, .. } if tag == "v256"));
    }

    #[test]
    fn test_empty_name() {
        let err = Schema::parse(&["u32:"]).unwrap_err();
        assert!(matches!(err, DescriptorError::EmptyName { .. }));
    }

    #[test]
    fn test_duplicate_name() {
        let err = Schema::parse(&["u32:x", "v128:x"]).unwrap_err();
        assert!(matches!(err, DescriptorError::DuplicateName { ref name } if name == "x"));
    }

    #[test]
    fn test_roundtrip_lossless() {
        let entries = vec![
            "v128:1_res".to_string(),
            "v128:1_acc_hi".to_string(),
            "u32:1_vco".to_string(),
            "u32:1_padding".to_string(),
        ];
        let schema = Schema::parse(&entries).unwrap();
        assert_eq!(schema.to_descriptors(), entries);
    }

    #[test]
    fn test_error_display() {
        let err = Schema::parse(&["w64:q"]).unwrap_err();
        assert!(err.to_string().contains("w64"));
    }
}
