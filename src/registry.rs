//! Named test-case storage.
//!
//! A test case is a name plus the ordered 32-bit literals destined for the
//! input schema. The registry is built once and read-only afterwards; its
//! iteration order is the run order, which matters because the vector unit's
//! accumulator is never cleared by the micro-program itself.

use thiserror::Error;

/// Errors from registry lookups.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No test case with the requested name. Recoverable: the caller can
    /// try another name.
    #[error("unknown test case {name:?}")]
    UnknownTestCase {
        /// The missing name.
        name: String,
    },
}

/// One named test vector: literal input words in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Case name, unique within a registry.
    pub name: String,
    /// 32-bit literals, one per word of the input schema.
    pub input_words: Vec<u32>,
}

impl TestCase {
    /// Create a test case from a name and literal words.
    pub fn new(name: impl Into<String>, input_words: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            input_words,
        }
    }
}

/// Ordered collection of test cases, immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct TestCaseRegistry {
    cases: Vec<TestCase>,
}

impl TestCaseRegistry {
    /// Build a registry from an ordered list of cases.
    pub fn new(cases: Vec<TestCase>) -> Self {
        Self { cases }
    }

    /// The built-in scenarios for the multiply-accumulate micro-program,
    /// in their documented run order.
    ///
    /// 1. `basic`: mixed magnitudes across all lanes.
    /// 2. `negate`: `vt` all-ones; exercises the compare-equal lanes.
    /// 3. `overflow`: `0x7FFF`/`0x8000` combinations; exercises clamping.
    pub fn builtin() -> Self {
        Self::new(vec![
            TestCase::new(
                "basic",
                vec![
                    0x12123434, 0x56567878, 0x9A9ABCBC, 0xDEDEF0F0, // vs
                    0xFDECBA98, 0x76543210, 0x01234567, 0x89ABCDEF, // vt
                ],
            ),
            TestCase::new(
                "negate",
                vec![
                    0xFFFF0001, 0x7FFF8000, 0xFFFF0000, 0x0001FFFF, // vs
                    0xFFFFFFFF, 0xFFFFFFFF, 0xFFFFFFFF, 0xFFFFFFFF, // vt
                ],
            ),
            TestCase::new(
                "overflow",
                vec![
                    0x7FFF8000, 0x7FFF7FFF, 0x80008000, 0x8000FFFF, // vs
                    0x7FFF8000, 0x80007FFF, 0x7FFF8000, 0x00010000, // vt
                ],
            ),
        ])
    }

    /// Look up a case by name.
    pub fn get(&self, name: &str) -> Result<&TestCase, RegistryError> {
        self.cases
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| RegistryError::UnknownTestCase {
                name: name.to_string(),
            })
    }

    /// Cases in run order.
    pub fn iter(&self) -> impl Iterator<Item = &TestCase> {
        self.cases.iter()
    }

    /// Number of cases.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether the registry holds no cases.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order_and_sizes() {
        let registry = TestCaseRegistry::builtin();
        let names: Vec<&str> = registry.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["basic", "negate", "overflow"]);

        // Every builtin case fills the two-vector input schema exactly
        for case in registry.iter() {
            assert_eq!(case.input_words.len(), 8);
        }
    }

    #[test]
    fn test_get_known_case() {
        let registry = TestCaseRegistry::builtin();
        let case = registry.get("basic").unwrap();
        assert_eq!(case.input_words[0], 0x12123434);
    }

    #[test]
    fn test_get_unknown_case() {
        let registry = TestCaseRegistry::builtin();
        let err = registry.get("missing").unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownTestCase {
                name: "missing".to_string()
            }
        );
        assert!(err.to_string().contains("missing"));
    }
}
