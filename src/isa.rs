use crate::bits::{bit, bits};
use std::fmt;
use strum::IntoStaticStr;


/// A decoded ZPU opcode. Field values are already extracted from the opcode byte, so the
/// execution engine never needs to look at the raw encoding again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Instruction {
    /// 7-bit immediate payload (not yet sign extended)
    Im { payload: u8 },

    /// Word offset from sp, already recentred by the 0x10 xor
    StoreSp { offset: u32 },
    LoadSp { offset: u32 },

    /// Unsigned word offset from sp
    AddSp { offset: u32 },

    /// Slot in the 32-byte aligned emulation table
    Emulate { slot: u32 },

    PopPc,
    Load,
    Store,
    PushSp,
    PopSp,
    Add,
    And,
    Or,
    Not,
    Flip,
    Nop,
    Breakpoint,
    Unknown { opcode: u8 },
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        self.into()
    }

    /// Whether the instruction continues (or starts) an immediate chain
    pub fn is_immediate(&self) -> bool {
        matches!(self, Instruction::Im { .. })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            Im { payload } => write!(f, "{} 0x{:02x}", self.mnemonic(), payload),
            StoreSp { offset } | LoadSp { offset } | AddSp { offset } => {
                write!(f, "{} {}", self.mnemonic(), offset)
            }
            Emulate { slot } => write!(f, "{} {}", self.mnemonic(), slot),
            Unknown { opcode } => write!(f, "{} 0x{:02x}", self.mnemonic(), opcode),
            _ => f.write_str(self.mnemonic()),
        }
    }
}

/// Decode an opcode byte. Encodings overlap, so the forms are tested in a fixed priority order
/// and the first match wins
pub fn decode(opcode: u8) -> Instruction {
    use Instruction::*;
    if bit(opcode, 7) == 1 {
        Im {
            payload: bits(opcode, 0..6),
        }
    } else if opcode & 0xe0 == 0x40 {
        StoreSp {
            offset: sp_offset(opcode),
        }
    } else if opcode & 0xe0 == 0x60 {
        LoadSp {
            offset: sp_offset(opcode),
        }
    } else if opcode & 0xf0 == 0x10 {
        AddSp {
            offset: bits(opcode, 0..3) as u32,
        }
    } else if opcode & 0xe0 == 0x20 {
        Emulate {
            slot: bits(opcode, 0..4) as u32,
        }
    } else {
        match opcode {
            0x04 => PopPc,
            0x08 => Load,
            0x0c => Store,
            0x02 => PushSp,
            0x0d => PopSp,
            0x05 => Add,
            0x06 => And,
            0x07 => Or,
            0x09 => Not,
            0x0a => Flip,
            0x0b => Nop,
            0x00 => Breakpoint,
            _ => Unknown { opcode },
        }
    }
}

/// STORESP/LOADSP keep a 5-bit offset with the top bit inverted
fn sp_offset(opcode: u8) -> u32 {
    (bits(opcode, 0..4) ^ 0x10) as u32
}
