use thiserror::Error;

/// Conditions that abort a step when the engine runs in strict mode. In compatibility mode none
/// of these reach the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("access to unmapped address 0x{addr:08x}")]
    UnmappedAddress { addr: u32 },

    #[error("misaligned word access at 0x{addr:08x}")]
    MisalignedAccess { addr: u32 },

    #[error("unknown opcode 0x{opcode:02x} at pc 0x{pc:08x}")]
    UnknownOpcode { opcode: u8, pc: u32 },
}

/// Errors raised while assembling an address space
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MemError {
    #[error("an address space needs at least one region")]
    EmptyAddressSpace,

    #[error("image of {len} bytes does not fit in a region of {size} bytes")]
    ImageTooLarge { len: usize, size: u32 },
}
