//! Micro-program driver.
//!
//! Executes the fixed multiply-accumulate micro-program against a
//! [`VectorUnit`] and a 4 KiB data memory. The program is bounded and
//! branch-free apart from its counted loop: per iteration it loads one
//! 256-bit pair of source vectors, multiply-accumulates, stores the
//! saturated result, reads out the three accumulator planes, stores the
//! three flag registers, and advances to the next output block.
//!
//! The driver owns its data memory and the output buffer it produces; the
//! vector unit is borrowed so accumulator state persists across runs.

use thiserror::Error;

use byteorder::{BigEndian, ByteOrder};

use crate::alu::{AccPlane, AluError, ControlReg, LaneSelect, VectorUnit};
use crate::descriptor::Schema;
use crate::layout::Buffer;

/// Data memory size, matching the coprocessor's 4 KiB DMEM.
pub const DMEM_SIZE: usize = 0x1000;

/// Byte offset where input vectors are loaded.
pub const INPUT_BASE: usize = 0x000;

/// Byte offset where the micro-program writes its results.
pub const OUTPUT_BASE: usize = 0x800;

/// Bytes written per iteration: four vectors, three flag words, one
/// reserved word.
pub const OUTPUT_STRIDE: usize = 0x50;

/// Bytes consumed per iteration: one 256-bit vector pair.
pub const INPUT_STRIDE: usize = 0x20;

/// Fixed loop count of the micro-program.
pub const ITERATIONS: usize = 4;

// Register conventions of the fixed micro-program.
const REG_VS: u8 = 1;
const REG_VT: u8 = 2;
const REG_RES: u8 = 3;
const REG_SAR: u8 = 4;

/// Errors from a driver run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// A vector-unit operation failed.
    #[error(transparent)]
    Alu(#[from] AluError),

    /// The input buffer does not fit below the output region.
    #[error("input of {size} bytes does not fit data memory region of {limit} bytes")]
    InputOverrun {
        /// Input buffer size.
        size: usize,
        /// Available bytes.
        limit: usize,
    },

    /// The output schema does not fit data memory.
    #[error("output of {size} bytes does not fit data memory region of {limit} bytes")]
    OutputOverrun {
        /// Output schema footprint.
        size: usize,
        /// Available bytes.
        limit: usize,
    },
}

/// Execution state of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Not started; data memory holds the input image.
    Init,
    /// About to load the current iteration's vector pair.
    IterateLoad,
    /// About to multiply-accumulate.
    IterateCompute,
    /// About to store results, plane readouts, and flags.
    IterateStore,
    /// All iterations done.
    Halted,
}

/// Single-pass driver for the fixed micro-program.
///
/// Non-reentrant: build one driver per run.
#[derive(Debug)]
pub struct Driver {
    dmem: Vec<u8>,
    state: DriverState,
    remaining: usize,
    input_off: usize,
    output_off: usize,
}

impl Driver {
    /// Create a driver with the input buffer loaded at [`INPUT_BASE`].
    ///
    /// Bytes beyond the input image read as zero, as the hardware's
    /// zero-filled data memory does.
    pub fn new(input: &Buffer) -> Result<Driver, DriverError> {
        let limit = OUTPUT_BASE - INPUT_BASE;
        if input.len() > limit {
            return Err(DriverError::InputOverrun {
                size: input.len(),
                limit,
            });
        }

        let mut dmem = vec![0u8; DMEM_SIZE];
        dmem[INPUT_BASE..INPUT_BASE + input.len()].copy_from_slice(input.bytes());

        Ok(Driver {
            dmem,
            state: DriverState::Init,
            remaining: ITERATIONS,
            input_off: INPUT_BASE,
            output_off: OUTPUT_BASE,
        })
    }

    /// Current execution state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Iterations left to run.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Raw data memory (for inspection).
    pub fn dmem(&self) -> &[u8] {
        &self.dmem
    }

    /// Advance the state machine by one transition.
    ///
    /// Returns the state entered. Stepping a halted driver stays halted.
    pub fn step(&mut self, unit: &mut VectorUnit) -> Result<DriverState, DriverError> {
        self.state = match self.state {
            DriverState::Init => DriverState::IterateLoad,

            DriverState::IterateLoad => {
                let mut vec_bytes = [0u8; 16];
                vec_bytes.copy_from_slice(&self.dmem[self.input_off..self.input_off + 16]);
                unit.regs.write_bytes(REG_VS, &vec_bytes);
                vec_bytes
                    .copy_from_slice(&self.dmem[self.input_off + 16..self.input_off + 32]);
                unit.regs.write_bytes(REG_VT, &vec_bytes);
                DriverState::IterateCompute
            }

            DriverState::IterateCompute => {
                unit.vmacu(REG_RES, REG_VS, REG_VT, LaneSelect::AllLanes)?;
                DriverState::IterateStore
            }

            DriverState::IterateStore => {
                self.store_iteration(unit)?;
                self.input_off += INPUT_STRIDE;
                self.output_off += OUTPUT_STRIDE;
                self.remaining -= 1;
                if self.remaining > 0 {
                    DriverState::IterateLoad
                } else {
                    log::debug!("micro-program halted after {} iterations", ITERATIONS);
                    DriverState::Halted
                }
            }

            DriverState::Halted => DriverState::Halted,
        };
        Ok(self.state)
    }

    /// Store one iteration's output block at the current output offset.
    fn store_iteration(&mut self, unit: &mut VectorUnit) -> Result<(), DriverError> {
        let mut off = self.output_off;

        // Saturated result vector
        self.store_vector(unit, REG_RES, &mut off);

        // Accumulator planes, high/mid/low as the program encodes them
        for plane in [AccPlane::High, AccPlane::Mid, AccPlane::Low] {
            unit.vsar(REG_SAR, LaneSelect::Plane(plane))?;
            self.store_vector(unit, REG_SAR, &mut off);
        }

        // Flag registers, zero-extended to one word each
        for reg in [ControlReg::Vco, ControlReg::Vcc, ControlReg::Vce] {
            BigEndian::write_u32(&mut self.dmem[off..off + 4], unit.cfc2(reg) as u32);
            off += 4;
        }

        // Trailing reserved word left untouched
        Ok(())
    }

    fn store_vector(&mut self, unit: &VectorUnit, reg: u8, off: &mut usize) {
        self.dmem[*off..*off + 16].copy_from_slice(&unit.regs.read_bytes(reg));
        *off += 16;
    }

    /// Run to completion and extract the output region.
    ///
    /// Consumes the driver: the micro-program is single-pass.
    pub fn run(
        mut self,
        unit: &mut VectorUnit,
        output_schema: &Schema,
    ) -> Result<Buffer, DriverError> {
        let size = output_schema.size_bytes();
        let limit = DMEM_SIZE - OUTPUT_BASE;
        if size > limit {
            return Err(DriverError::OutputOverrun { size, limit });
        }

        while self.state != DriverState::Halted {
            self.step(unit)?;
        }

        let mut output = Buffer::build_output(output_schema);
        output
            .bytes_mut()
            .copy_from_slice(&self.dmem[OUTPUT_BASE..OUTPUT_BASE + size]);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Schema;

    fn input_schema() -> Schema {
        Schema::parse(&["v128:vs", "v128:vt"]).unwrap()
    }

    fn one_block_schema() -> Schema {
        Schema::parse(&[
            "v128:res",
            "v128:acc_hi",
            "v128:acc_md",
            "v128:acc_lo",
            "u32:vco",
            "u32:vcc",
            "u32:vce",
            "u32:padding",
        ])
        .unwrap()
    }

    #[test]
    fn test_state_machine_transitions() {
        let input = Buffer::build_input(&input_schema(), &[0; 8]).unwrap();
        let mut driver = Driver::new(&input).unwrap();
        let mut unit = VectorUnit::new();

        assert_eq!(driver.state(), DriverState::Init);
        assert_eq!(driver.step(&mut unit).unwrap(), DriverState::IterateLoad);
        assert_eq!(driver.step(&mut unit).unwrap(), DriverState::IterateCompute);
        assert_eq!(driver.step(&mut unit).unwrap(), DriverState::IterateStore);
        assert_eq!(driver.step(&mut unit).unwrap(), DriverState::IterateLoad);
        assert_eq!(driver.remaining(), 3);

        for _ in 0..9 {
            driver.step(&mut unit).unwrap();
        }
        assert_eq!(driver.state(), DriverState::Halted);
        assert_eq!(driver.remaining(), 0);

        // Stepping a halted driver is a no-op
        assert_eq!(driver.step(&mut unit).unwrap(), DriverState::Halted);
    }

    #[test]
    fn test_run_fills_one_block_per_iteration() {
        let input = Buffer::build_input(
            &input_schema(),
            &[0x00020002, 0x00020002, 0, 0, 0x00030003, 0x00030003, 0, 0],
        )
        .unwrap();
        let mut unit = VectorUnit::new();
        let driver = Driver::new(&input).unwrap();
        let output = driver.run(&mut unit, &one_block_schema()).unwrap();

        // Iteration 1: 2*3=6 in lanes 0-3, zero operands in lanes 4-7
        assert_eq!(
            output.field_words("res").unwrap(),
            vec![0x00060006, 0x00060006, 0, 0]
        );
        assert_eq!(
            output.field_words("acc_lo").unwrap(),
            vec![0x00060006, 0x00060006, 0, 0]
        );
        assert_eq!(output.field_words("acc_hi").unwrap(), vec![0; 4]);
        assert_eq!(output.field_words("vco").unwrap(), vec![0]);
        // Lanes 0-3: 2 < 3; lanes 4-7 equal zeros
        assert_eq!(output.field_words("vcc").unwrap(), vec![0x0F]);
        assert_eq!(output.field_words("vce").unwrap(), vec![0xF0]);
        assert_eq!(output.field_words("padding").unwrap(), vec![0]);
    }

    #[test]
    fn test_iterations_past_input_read_zeros() {
        let input = Buffer::build_input(&input_schema(), &[0x00050005; 8]).unwrap();
        let mut unit = VectorUnit::new();
        let driver = Driver::new(&input).unwrap();

        // Output schema spanning all four iteration blocks
        let mut descs = Vec::new();
        for n in 1..=ITERATIONS {
            for (kind, field) in [
                ("v128", "res"),
                ("v128", "acc_hi"),
                ("v128", "acc_md"),
                ("v128", "acc_lo"),
                ("u32", "vco"),
                ("u32", "vcc"),
                ("u32", "vce"),
                ("u32", "padding"),
            ] {
                descs.push(format!("{}:{}_{}", kind, n, field));
            }
        }
        let schema = Schema::parse(&descs).unwrap();
        let output = driver.run(&mut unit, &schema).unwrap();

        // Iteration 1 accumulates 25 per lane; later iterations multiply
        // zeros, leaving the accumulator untouched
        assert_eq!(output.field_words("1_acc_lo").unwrap(), vec![0x00190019; 4]);
        for n in 2..=ITERATIONS {
            assert_eq!(
                output.field_words(&format!("{}_acc_lo", n)).unwrap(),
                vec![0x00190019; 4]
            );
            // Zero operands: every lane compares equal
            assert_eq!(
                output.field_words(&format!("{}_vce", n)).unwrap(),
                vec![0xFF]
            );
        }
    }

    #[test]
    fn test_input_overrun() {
        let descs: Vec<String> = (0..200).map(|i| format!("v128:f{}", i)).collect();
        let schema = Schema::parse(&descs).unwrap();
        let words = vec![0u32; schema.word_count()];
        let input = Buffer::build_input(&schema, &words).unwrap();

        let err = Driver::new(&input).unwrap_err();
        assert!(matches!(err, DriverError::InputOverrun { size: 3200, .. }));
    }

    #[test]
    fn test_output_overrun() {
        let input = Buffer::build_input(&input_schema(), &[0; 8]).unwrap();
        let driver = Driver::new(&input).unwrap();
        let mut unit = VectorUnit::new();

        let descs: Vec<String> = (0..200).map(|i| format!("v128:f{}", i)).collect();
        let schema = Schema::parse(&descs).unwrap();
        let err = driver.run(&mut unit, &schema).unwrap_err();
        assert!(matches!(err, DriverError::OutputOverrun { size: 3200, .. }));
    }
}
