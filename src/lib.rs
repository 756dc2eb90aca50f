//! rsp-harness
//!
//! Descriptor-driven test harness for a big-endian vector signal-processor
//! core. Given a typed layout description of the input and output memory
//! regions and a list of literal test vectors, the harness marshals the
//! inputs, drives the fixed multiply-accumulate micro-program against an
//! in-memory model of the vector unit, and extracts the results as
//! structured, name-addressable buffers for external comparison.
//!
//! The assembler for the micro-program text, execution on real hardware,
//! and expected-value comparison live outside this crate.

pub mod alu;
pub mod descriptor;
pub mod driver;
pub mod layout;
pub mod registry;
pub mod suite;

pub use alu::{AccPlane, AluError, ControlReg, LaneSelect, VectorUnit};
pub use descriptor::{DescriptorError, FieldDescriptor, FieldKind, Schema};
pub use driver::{Driver, DriverError, DriverState};
pub use layout::{Buffer, LayoutError};
pub use registry::{RegistryError, TestCase, TestCaseRegistry};
pub use suite::{CaseResult, SuiteManifest};
