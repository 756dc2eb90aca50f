//! Test-suite manifests.
//!
//! A suite bundles everything one micro-program needs for validation: the
//! program listing (opaque text, assembled and loaded by external tooling),
//! the input and output region descriptors, and the named test vectors.
//! Suites deserialize from TOML:
//!
//! ```toml
//! program = "..."
//! input_desc = ["v128:vs", "v128:vt"]
//! output_desc = ["v128:1_res", "u32:1_vco"]
//!
//! [[test]]
//! name = "basic"
//! input = [0x12123434, 0x56567878, 0x9A9ABCBC, 0xDEDEF0F0,
//!          0xFDECBA98, 0x76543210, 0x01234567, 0x89ABCDEF]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::alu::VectorUnit;
use crate::descriptor::{DescriptorError, Schema};
use crate::driver::{Driver, ITERATIONS};
use crate::layout::Buffer;
use crate::registry::{TestCase, TestCaseRegistry};

/// One named test vector as it appears in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseDef {
    /// Case name.
    pub name: String,
    /// Literal input words, one per word of the input schema.
    pub input: Vec<u32>,
}

/// A complete suite description for one micro-program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteManifest {
    /// The micro-program listing. Carried verbatim for external assembly
    /// and execution; never parsed here.
    pub program: String,
    /// Input region descriptors.
    pub input_desc: Vec<String>,
    /// Output region descriptors. The numeric `N_` name prefixes group
    /// fields by iteration; they carry no semantics beyond the label.
    pub output_desc: Vec<String>,
    /// Test vectors, in run order.
    #[serde(rename = "test", default)]
    pub tests: Vec<TestCaseDef>,
}

impl SuiteManifest {
    /// Parse a manifest from TOML text.
    pub fn from_toml_str(text: &str) -> Result<SuiteManifest> {
        let manifest: SuiteManifest =
            toml::from_str(text).context("failed to parse suite manifest")?;
        log::debug!(
            "loaded suite manifest: {} input fields, {} output fields, {} tests",
            manifest.input_desc.len(),
            manifest.output_desc.len(),
            manifest.tests.len()
        );
        Ok(manifest)
    }

    /// The built-in multiply-accumulate suite.
    ///
    /// Two input vectors; four output blocks of result vector, three
    /// accumulator planes, three flag words, and one reserved word each.
    pub fn vmacu() -> SuiteManifest {
        let mut output_desc = Vec::with_capacity(ITERATIONS * 8);
        for n in 1..=ITERATIONS {
            output_desc.push(format!("v128:{}_res", n));
            output_desc.push(format!("v128:{}_acc_hi", n));
            output_desc.push(format!("v128:{}_acc_md", n));
            output_desc.push(format!("v128:{}_acc_lo", n));
            output_desc.push(format!("u32:{}_vco", n));
            output_desc.push(format!("u32:{}_vcc", n));
            output_desc.push(format!("u32:{}_vce", n));
            output_desc.push(format!("u32:{}_padding", n));
        }

        SuiteManifest {
            program: VMACU_PROGRAM.to_string(),
            input_desc: vec!["v128:vs".to_string(), "v128:vt".to_string()],
            output_desc,
            tests: TestCaseRegistry::builtin()
                .iter()
                .map(|c| TestCaseDef {
                    name: c.name.clone(),
                    input: c.input_words.clone(),
                })
                .collect(),
        }
    }

    /// Build the input schema from the manifest descriptors.
    pub fn input_schema(&self) -> Result<Schema, DescriptorError> {
        Schema::parse(&self.input_desc)
    }

    /// Build the output schema from the manifest descriptors.
    pub fn output_schema(&self) -> Result<Schema, DescriptorError> {
        Schema::parse(&self.output_desc)
    }

    /// Build the test-case registry in manifest order.
    pub fn registry(&self) -> TestCaseRegistry {
        TestCaseRegistry::new(
            self.tests
                .iter()
                .map(|t| TestCase::new(t.name.clone(), t.input.clone()))
                .collect(),
        )
    }

    /// Run one named case against the vector unit.
    ///
    /// Accumulator state in `unit` persists across calls; clear it between
    /// calls if the cases must be independent.
    pub fn run_case(&self, unit: &mut VectorUnit, name: &str) -> Result<Buffer> {
        let input_schema = self.input_schema().context("bad input descriptors")?;
        let output_schema = self.output_schema().context("bad output descriptors")?;
        let registry = self.registry();
        let case = registry.get(name)?;

        let input = Buffer::build_input(&input_schema, &case.input_words)
            .with_context(|| format!("building input for case {:?}", name))?;
        let driver = Driver::new(&input)?;
        let output = driver
            .run(unit, &output_schema)
            .with_context(|| format!("running case {:?}", name))?;
        Ok(output)
    }

    /// Run every case in manifest order, sharing one vector unit.
    pub fn run_all(&self, unit: &mut VectorUnit) -> Result<Vec<CaseResult>> {
        self.tests
            .iter()
            .map(|t| {
                let output = self.run_case(unit, &t.name)?;
                Ok(CaseResult {
                    name: t.name.clone(),
                    output,
                })
            })
            .collect()
    }
}

/// Output of one executed test case.
#[derive(Debug, Clone)]
pub struct CaseResult {
    /// Case name.
    pub name: String,
    /// Structured output region, addressable by field name.
    pub output: Buffer,
}

/// The fixed multiply-accumulate listing, in the coprocessor's assembly
/// dialect. Register and address conventions match [`crate::driver`].
const VMACU_PROGRAM: &str = r#"
    li a0, 0x000            // input cursor
    li a1, 0x800            // output cursor
    li t0, 4                // iteration count
loop:
    lqv v1[e0], 0x00(a0)
    lqv v2[e0], 0x10(a0)
    vmacu v3, v1, v2[e0]
    sqv v3[e0], 0x00(a1)
    vsar v4[e8]
    sqv v4[e0], 0x10(a1)
    vsar v4[e9]
    sqv v4[e0], 0x20(a1)
    vsar v4[e10]
    sqv v4[e0], 0x30(a1)
    cfc2 t1, vco
    sw t1, 0x40(a1)
    cfc2 t1, vcc
    sw t1, 0x44(a1)
    cfc2 t1, vce
    sw t1, 0x48(a1)
    addi a0, a0, 0x20
    addi a1, a1, 0x50
    addi t0, t0, -1
    bne t0, r0, loop
    nop
    break                   // status-halt, interrupts the host
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_suite_schemas() {
        let suite = SuiteManifest::vmacu();

        let input = suite.input_schema().unwrap();
        assert_eq!(input.word_count(), 8);
        assert_eq!(input.size_bytes(), 32);

        let output = suite.output_schema().unwrap();
        assert_eq!(output.len(), ITERATIONS * 8);
        assert_eq!(output.size_bytes(), ITERATIONS * 0x50);

        // Block 2 starts one stride in
        assert_eq!(output.field("2_res").unwrap().offset, 0x50);
        assert_eq!(output.field("4_padding").unwrap().offset, 4 * 0x50 - 4);
    }

    #[test]
    fn test_manifest_toml_roundtrip() {
        let suite = SuiteManifest::vmacu();
        let text = toml::to_string(&suite).unwrap();
        let parsed = SuiteManifest::from_toml_str(&text).unwrap();

        assert_eq!(parsed.program, suite.program);
        assert_eq!(parsed.input_desc, suite.input_desc);
        assert_eq!(parsed.output_desc, suite.output_desc);
        assert_eq!(parsed.tests.len(), suite.tests.len());
        assert_eq!(parsed.tests[0].input, suite.tests[0].input);
    }

    #[test]
    fn test_manifest_from_literal_toml() {
        let text = r#"
            program = "vmacu v3, v1, v2[e0]"
            input_desc = ["v128:vs", "v128:vt"]
            output_desc = ["v128:1_res", "u32:1_vco"]

            [[test]]
            name = "tiny"
            input = [1, 2, 3, 4, 5, 6, 7, 8]
        "#;
        let manifest = SuiteManifest::from_toml_str(text).unwrap();
        assert_eq!(manifest.tests[0].name, "tiny");
        assert_eq!(manifest.registry().get("tiny").unwrap().input_words.len(), 8);
    }

    #[test]
    fn test_manifest_rejects_garbage() {
        assert!(SuiteManifest::from_toml_str("input_desc = 3").is_err());
    }

    #[test]
    fn test_run_case_unknown_name() {
        let suite = SuiteManifest::vmacu();
        let mut unit = VectorUnit::new();
        let err = suite.run_case(&mut unit, "nope").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
