//! Vector ALU model.
//!
//! In-memory simulation of the coprocessor's vector unit: 32 × 128-bit
//! registers of 8 × 16-bit lanes, a per-lane 48-bit accumulator kept as
//! three 16-bit planes, and three per-lane flag registers.
//!
//! # Operations
//!
//! - **vmacu**: unsigned multiply-accumulate with saturating result readout
//! - **vsar**: accumulator-plane readout into a vector register
//! - **cfc2**: control-register fetch of one flag register
//!
//! All arithmetic is lane-independent. Accumulator state persists across
//! instructions and across micro-program runs; callers hold a [`VectorUnit`]
//! handle and must call [`VectorUnit::clear_accumulator`] when runs are meant
//! to be independent.

pub mod registers;

use thiserror::Error;

pub use registers::{
    AccPlane, Accumulator, ControlReg, FlagRegisters, VectorRegisterFile, ACC_MAX, LANES,
};

/// Errors from vector-unit operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AluError {
    /// Lane-selection code is not a supported mode.
    ///
    /// Indicates a micro-program or model bug, not bad user input.
    #[error("invalid lane select code {code}")]
    InvalidLaneSelect {
        /// The unsupported code.
        code: u8,
    },
}

/// Lane-selection mode of a vector instruction.
///
/// The encoded element codes map to a closed set of modes; modeling them as
/// a tagged variant keeps op dispatch exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneSelect {
    /// Operate on all 8 lanes pairwise (code 0).
    AllLanes,
    /// Select one accumulator plane (codes 8, 9, 10 for high, mid, low).
    Plane(AccPlane),
}

impl LaneSelect {
    /// Decode an element code from the instruction encoding.
    pub fn from_code(code: u8) -> Result<LaneSelect, AluError> {
        match code {
            0 => Ok(LaneSelect::AllLanes),
            8 => Ok(LaneSelect::Plane(AccPlane::High)),
            9 => Ok(LaneSelect::Plane(AccPlane::Mid)),
            10 => Ok(LaneSelect::Plane(AccPlane::Low)),
            _ => Err(AluError::InvalidLaneSelect { code }),
        }
    }

    fn code(self) -> u8 {
        match self {
            LaneSelect::AllLanes => 0,
            LaneSelect::Plane(AccPlane::High) => 8,
            LaneSelect::Plane(AccPlane::Mid) => 9,
            LaneSelect::Plane(AccPlane::Low) => 10,
        }
    }
}

/// The vector unit: registers, accumulator, and flags as explicit owned state.
#[derive(Debug, Clone, Default)]
pub struct VectorUnit {
    /// Vector register file.
    pub regs: VectorRegisterFile,
    /// Per-lane 48-bit accumulator.
    pub acc: Accumulator,
    /// Flag registers, rewritten by each multiply-accumulate.
    pub flags: FlagRegisters,
}

impl VectorUnit {
    /// Create a vector unit with all state zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unsigned multiply-accumulate: `vd = clamp(acc += vs * vt)`.
    ///
    /// Per lane: the unsigned 32-bit product of the two 16-bit operands is
    /// added into the 48-bit accumulator, saturating at 2^48-1. Flags are
    /// rewritten as a side effect:
    ///
    /// - `vco` bit: the addition overflowed 48 bits
    /// - `vcc` bit: `vs` lane < `vt` lane under signed 16-bit comparison
    /// - `vce` bit: the two lane operands were bit-identical
    ///
    /// The destination lane receives the accumulator clamped to the unsigned
    /// 16-bit range, reading the accumulator as signed 48-bit: negative
    /// clamps to 0x0000, anything above 0xFFFF clamps to 0xFFFF.
    pub fn vmacu(&mut self, vd: u8, vs: u8, vt: u8, select: LaneSelect) -> Result<(), AluError> {
        if select != LaneSelect::AllLanes {
            return Err(AluError::InvalidLaneSelect {
                code: select.code(),
            });
        }

        let a = self.regs.read(vs);
        let b = self.regs.read(vt);
        let mut result = [0u16; LANES];
        let mut vco = 0u16;
        let mut vcc = 0u16;
        let mut vce = 0u16;

        for lane in 0..LANES {
            let product = (a[lane] as u64) * (b[lane] as u64);
            let sum = self.acc.lane(lane) + product;
            let saturated = if sum > ACC_MAX {
                vco |= 1 << lane;
                ACC_MAX
            } else {
                sum
            };
            self.acc.set_lane(lane, saturated);

            if (a[lane] as i16) < (b[lane] as i16) {
                vcc |= 1 << lane;
            }
            if a[lane] == b[lane] {
                vce |= 1 << lane;
            }

            result[lane] = clamp_unsigned(self.acc.lane_signed(lane));
        }

        self.flags = FlagRegisters { vco, vcc, vce };
        self.regs.write(vd, result);

        log::trace!(
            "vmacu v{} <- v{} * v{}: result {:04X?}, flags {:?}",
            vd,
            vs,
            vt,
            result,
            self.flags
        );
        Ok(())
    }

    /// Accumulator-plane readout: copy one 16-bit plane of every lane's
    /// accumulator into `vd`, without arithmetic modification.
    pub fn vsar(&mut self, vd: u8, select: LaneSelect) -> Result<(), AluError> {
        let plane = match select {
            LaneSelect::Plane(plane) => plane,
            LaneSelect::AllLanes => {
                return Err(AluError::InvalidLaneSelect {
                    code: select.code(),
                })
            }
        };
        let value = self.acc.plane(plane);
        self.regs.write(vd, value);
        log::trace!("vsar v{} <- acc {:?}: {:04X?}", vd, plane, value);
        Ok(())
    }

    /// Control-register fetch: read one flag register's current value.
    pub fn cfc2(&self, reg: ControlReg) -> u16 {
        self.flags.read(reg)
    }

    /// Zero the accumulator.
    ///
    /// The modeled micro-program never clears the accumulator, so state
    /// carries across runs; call this between runs that must be independent.
    pub fn clear_accumulator(&mut self) {
        self.acc.clear();
    }

    /// Zero all three flag registers.
    pub fn clear_flags(&mut self) {
        self.flags.clear();
    }
}

/// Clamp a signed 48-bit accumulator value to the unsigned 16-bit range.
#[inline]
fn clamp_unsigned(value: i64) -> u16 {
    if value < 0 {
        0x0000
    } else if value > 0xFFFF {
        0xFFFF
    } else {
        value as u16
    }
}
