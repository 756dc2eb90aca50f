//! Register files for the vector unit.
//!
//! The modeled coprocessor has:
//!
//! - **Vector**: 32 × 128-bit SIMD registers, each 8 × 16-bit lanes
//! - **Accumulator**: one 48-bit signed value per lane, stored as three
//!   16-bit planes (high, mid, low)
//! - **Flags**: three 16-bit registers (`vco` carry-out, `vcc`
//!   compare-result, `vce` compare-equal), one bit per lane
//!
//! Lane 0 is the most significant end of the register as stored in the
//! big-endian data memory: it occupies the lowest byte address.

use byteorder::{BigEndian, ByteOrder};
use std::fmt;

/// Number of vector registers.
pub const NUM_VECTOR_REGS: usize = 32;

/// Number of 16-bit lanes per vector register.
pub const LANES: usize = 8;

/// Largest value the 48-bit accumulator can hold before saturating.
pub const ACC_MAX: u64 = (1 << 48) - 1;

/// Vector register file.
///
/// 32 × 128-bit registers (v0-v31), each 8 × 16-bit lanes.
#[derive(Clone)]
pub struct VectorRegisterFile {
    regs: [[u16; LANES]; NUM_VECTOR_REGS],
}

impl Default for VectorRegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorRegisterFile {
    /// Create a new zeroed register file.
    pub const fn new() -> Self {
        Self {
            regs: [[0; LANES]; NUM_VECTOR_REGS],
        }
    }

    /// Read a vector register as 8 × u16 lanes.
    #[inline]
    pub fn read(&self, reg: u8) -> [u16; LANES] {
        self.regs[(reg & 0x1F) as usize]
    }

    /// Write a vector register from 8 × u16 lanes.
    #[inline]
    pub fn write(&mut self, reg: u8, value: [u16; LANES]) {
        self.regs[(reg & 0x1F) as usize] = value;
    }

    /// Read a single lane (0-7).
    #[inline]
    pub fn read_lane(&self, reg: u8, lane: usize) -> u16 {
        self.regs[(reg & 0x1F) as usize][lane & 0x07]
    }

    /// Write a single lane (0-7).
    #[inline]
    pub fn write_lane(&mut self, reg: u8, lane: usize, value: u16) {
        self.regs[(reg & 0x1F) as usize][lane & 0x07] = value;
    }

    /// Read entire register as 16 big-endian bytes (lane 0 first).
    pub fn read_bytes(&self, reg: u8) -> [u8; 16] {
        let lanes = self.read(reg);
        let mut bytes = [0u8; 16];
        for (i, lane) in lanes.iter().enumerate() {
            BigEndian::write_u16(&mut bytes[i * 2..i * 2 + 2], *lane);
        }
        bytes
    }

    /// Write entire register from 16 big-endian bytes (lane 0 first).
    pub fn write_bytes(&mut self, reg: u8, bytes: &[u8; 16]) {
        let mut lanes = [0u16; LANES];
        for (i, lane) in lanes.iter_mut().enumerate() {
            *lane = BigEndian::read_u16(&bytes[i * 2..i * 2 + 2]);
        }
        self.write(reg, lanes);
    }
}

impl fmt::Debug for VectorRegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let non_zero: Vec<_> = self
            .regs
            .iter()
            .enumerate()
            .filter(|(_, v)| v.iter().any(|x| *x != 0))
            .collect();

        if non_zero.is_empty() {
            write!(f, "VectorRegisterFile {{ all zero }}")
        } else {
            writeln!(f, "VectorRegisterFile {{")?;
            for (reg, val) in non_zero {
                write!(f, "  v{}: [", reg)?;
                for (i, lane) in val.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "0x{:04X}", lane)?;
                }
                writeln!(f, "]")?;
            }
            write!(f, "}}")
        }
    }
}

/// One of the three 16-bit horizontal slices of the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccPlane {
    /// Bits 47..32 of each lane.
    High,
    /// Bits 31..16 of each lane.
    Mid,
    /// Bits 15..0 of each lane.
    Low,
}

/// Per-lane 48-bit accumulator, stored as three parallel 16-bit planes.
///
/// Keeping the planes as separate arrays makes plane readout directly
/// addressable and keeps all shifting within well-defined 64-bit arithmetic.
#[derive(Clone, Default)]
pub struct Accumulator {
    hi: [u16; LANES],
    mid: [u16; LANES],
    lo: [u16; LANES],
}

impl Accumulator {
    /// Create a new zeroed accumulator.
    pub const fn new() -> Self {
        Self {
            hi: [0; LANES],
            mid: [0; LANES],
            lo: [0; LANES],
        }
    }

    /// Read one lane as an unsigned 48-bit value.
    #[inline]
    pub fn lane(&self, lane: usize) -> u64 {
        let lane = lane & 0x07;
        ((self.hi[lane] as u64) << 32) | ((self.mid[lane] as u64) << 16) | (self.lo[lane] as u64)
    }

    /// Read one lane as a sign-extended 48-bit value.
    #[inline]
    pub fn lane_signed(&self, lane: usize) -> i64 {
        let raw = self.lane(lane);
        if raw & (1 << 47) != 0 {
            (raw | !ACC_MAX) as i64
        } else {
            raw as i64
        }
    }

    /// Write one lane. The value is masked to 48 bits.
    #[inline]
    pub fn set_lane(&mut self, lane: usize, value: u64) {
        let lane = lane & 0x07;
        let value = value & ACC_MAX;
        self.hi[lane] = (value >> 32) as u16;
        self.mid[lane] = (value >> 16) as u16;
        self.lo[lane] = value as u16;
    }

    /// Read one 16-bit plane across all lanes.
    #[inline]
    pub fn plane(&self, plane: AccPlane) -> [u16; LANES] {
        match plane {
            AccPlane::High => self.hi,
            AccPlane::Mid => self.mid,
            AccPlane::Low => self.lo,
        }
    }

    /// Zero every lane.
    pub fn clear(&mut self) {
        self.hi = [0; LANES];
        self.mid = [0; LANES];
        self.lo = [0; LANES];
    }
}

impl fmt::Debug for Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Accumulator {{ ")?;
        for lane in 0..LANES {
            if lane > 0 {
                write!(f, ", ")?;
            }
            write!(f, "0x{:012X}", self.lane(lane))?;
        }
        write!(f, " }}")
    }
}

/// Flag register selector for control-register fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlReg {
    /// Carry-out.
    Vco,
    /// Compare-result.
    Vcc,
    /// Compare-equal.
    Vce,
}

/// The three per-lane flag registers.
///
/// Bit `i` of each register corresponds to lane `i`; bits 8-15 are unused
/// by the 8-lane operations and stay zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagRegisters {
    /// Carry-out: set when a lane's accumulation overflowed 48 bits.
    pub vco: u16,
    /// Compare-result: set per the unit's signed lane comparison.
    pub vcc: u16,
    /// Compare-equal: set when both lane operands were bit-identical.
    pub vce: u16,
}

impl FlagRegisters {
    /// Create cleared flag registers.
    pub const fn new() -> Self {
        Self {
            vco: 0,
            vcc: 0,
            vce: 0,
        }
    }

    /// Read one flag register by selector.
    #[inline]
    pub fn read(&self, reg: ControlReg) -> u16 {
        match reg {
            ControlReg::Vco => self.vco,
            ControlReg::Vcc => self.vcc,
            ControlReg::Vce => self.vce,
        }
    }

    /// Zero all three registers.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
