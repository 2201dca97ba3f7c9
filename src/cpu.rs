mod zpu;


pub use zpu::{Stack, Zpu};

/// Set while a run of consecutive IM instructions is building up a value on the stack
pub const FLAG_IDIM: u8 = 0x01;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    /// Address of the next opcode
    pub pc: u32,

    /// Address of the top of stack word. The stack grows downward
    pub sp: u32,

    pub flags: u8,
}

impl Registers {
    pub fn new(pc: u32, sp: u32) -> Registers {
        Registers { pc, sp, flags: 0 }
    }

    pub fn idim(&self) -> bool {
        self.flags & FLAG_IDIM != 0
    }

    fn set_idim(&mut self, set: bool) {
        if set {
            self.flags |= FLAG_IDIM;
        } else {
            self.flags &= !FLAG_IDIM;
        }
    }
}

/// How the engine reacts to unmapped accesses, misaligned words and unknown opcodes
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Unmapped reads yield 0, unmapped writes are dropped, alignment is not checked and unknown
    /// opcodes only advance pc
    #[default]
    Compat,

    /// Every such condition aborts the step with a [`Fault`](crate::error::Fault), leaving the
    /// machine state untouched
    Strict,
}
