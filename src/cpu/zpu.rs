use super::{Mode, Registers};
use crate::bits::{reverse_bits, sign_extend7};
use crate::error::Fault;
use crate::isa::{decode, Instruction};
use crate::mem::{AddressSpace, WORD_SIZE};

/// Width of one slot in the emulation table addressed by EMULATE
const EMULATE_SLOT_SIZE: u32 = 32;

/// Emulated ZPU state: registers plus the address space they operate on
pub struct Zpu {
    regs: Registers,
    mem: AddressSpace,
    mode: Mode,
}

impl Zpu {
    /// Construct a machine in compatibility mode with the IDIM flag clear
    pub fn new(mem: AddressSpace, pc: u32, sp: u32) -> Zpu {
        Zpu::with_mode(mem, pc, sp, Mode::default())
    }

    pub fn with_mode(mem: AddressSpace, pc: u32, sp: u32, mode: Mode) -> Zpu {
        Zpu {
            regs: Registers::new(pc, sp),
            mem,
            mode,
        }
    }

    pub fn registers(&self) -> Registers {
        self.regs
    }

    pub fn pc(&self) -> u32 {
        self.regs.pc
    }

    pub fn sp(&self) -> u32 {
        self.regs.sp
    }

    pub fn flags(&self) -> u8 {
        self.regs.flags
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn memory(&self) -> &AddressSpace {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut AddressSpace {
        &mut self.mem
    }

    /// Walk up to `depth` stack words starting at sp. Stops early at the first word that is not
    /// entirely mapped
    pub fn stack(&self, depth: usize) -> Stack<'_> {
        Stack {
            mem: &self.mem,
            addr: Some(self.regs.sp),
            remaining: depth,
        }
    }

    /// Fetch, decode and execute one instruction, returning what was executed. A fault (strict
    /// mode only) leaves registers and memory exactly as they were before the call
    pub fn step(&mut self) -> Result<Instruction, Fault> {
        let pc = self.regs.pc;
        let opcode = match self.mode {
            Mode::Compat => self.mem.read_opcode_byte(pc),
            Mode::Strict => self.mem.try_read_opcode_byte(pc).map_err(|fault| {
                tracing::warn!("opcode fetch failed: {}", fault);
                fault
            })?,
        };
        let instr = decode(opcode);
        let mut exec = Exec {
            regs: self.regs,
            mem: &mut self.mem,
            mode: self.mode,
        };
        match exec.execute(instr) {
            Ok(()) => {
                tracing::trace!("{:08x}: {:<12} sp={:08x}", pc, instr.to_string(), exec.regs.sp);
                self.regs = exec.regs;
                Ok(instr)
            }
            Err(fault) => {
                tracing::warn!("{:08x}: {} faulted: {}", pc, instr, fault);
                Err(fault)
            }
        }
    }

    /// Step until `max_steps` instructions have executed, returning how many ran
    pub fn run(&mut self, max_steps: u64) -> Result<u64, Fault> {
        for n in 0..max_steps {
            if let Err(fault) = self.step() {
                tracing::debug!("run stopped after {} steps", n);
                return Err(fault);
            }
        }
        Ok(max_steps)
    }
}

/// Iterator over `(address, word)` pairs from the top of the stack upward
pub struct Stack<'a> {
    mem: &'a AddressSpace,
    addr: Option<u32>,
    remaining: usize,
}

impl Iterator for Stack<'_> {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let addr = self.addr?;
        let word = self.mem.try_read_word(addr).ok()?;
        self.remaining -= 1;
        self.addr = addr.checked_add(WORD_SIZE);
        Some((addr, word))
    }
}

/// Where control goes once an instruction has executed
enum Next {
    Advance,
    Jump(u32),
}

/// Executes a single instruction against a scratch copy of the registers. Every instruction
/// performs all of its reads before its single write, so a fault can always be returned before
/// memory is touched
struct Exec<'a> {
    regs: Registers,
    mem: &'a mut AddressSpace,
    mode: Mode,
}

impl Exec<'_> {
    fn execute(&mut self, instr: Instruction) -> Result<(), Fault> {
        use Instruction::*;
        let next = match instr {
            Im { payload } => {
                if self.regs.idim() {
                    let top = self.peek()?;
                    self.set_top((top << 7) | payload as u32)?;
                } else {
                    self.push(sign_extend7(payload))?;
                }
                Next::Advance
            }
            StoreSp { offset } => {
                let addr = self.sp_relative(offset);
                let value = self.pop()?;
                self.write(addr, value)?;
                Next::Advance
            }
            LoadSp { offset } => {
                let addr = self.sp_relative(offset);
                let value = self.read(addr)?;
                self.push(value)?;
                Next::Advance
            }
            AddSp { offset } => {
                let src = self.read(self.sp_relative(offset))?;
                let dst = self.peek()?;
                self.set_top(src.wrapping_add(dst))?;
                Next::Advance
            }
            PopPc => Next::Jump(self.pop()?),
            Load => {
                let addr = self.peek()?;
                let value = self.read(addr)?;
                self.set_top(value)?;
                Next::Advance
            }
            Store => {
                let addr = self.pop()?;
                let value = self.pop()?;
                self.write(addr, value)?;
                Next::Advance
            }
            PushSp => {
                self.push(self.regs.sp)?;
                Next::Advance
            }
            PopSp => {
                self.regs.sp = self.pop()?;
                Next::Advance
            }
            Add => self.binary(u32::wrapping_add)?,
            And => self.binary(|a, b| a & b)?,
            Or => self.binary(|a, b| a | b)?,
            Not => self.unary(|v| !v)?,
            Flip => self.unary(reverse_bits)?,
            Nop | Breakpoint => Next::Advance,
            Emulate { slot } => {
                self.push(self.regs.pc.wrapping_add(1))?;
                Next::Jump(slot * EMULATE_SLOT_SIZE)
            }
            Unknown { opcode } => match self.mode {
                Mode::Strict => {
                    return Err(Fault::UnknownOpcode {
                        opcode,
                        pc: self.regs.pc,
                    })
                }
                Mode::Compat => {
                    tracing::debug!("skipping unknown opcode 0x{:02x}", opcode);
                    Next::Advance
                }
            },
        };

        match instr {
            Im { .. } => self.regs.set_idim(true),
            // Fallback encodings leave the immediate chain alone
            Breakpoint | Unknown { .. } => {}
            _ => self.regs.set_idim(false),
        }
        self.regs.pc = match next {
            Next::Advance => self.regs.pc.wrapping_add(1),
            Next::Jump(target) => target,
        };
        Ok(())
    }

    fn sp_relative(&self, offset: u32) -> u32 {
        self.regs.sp.wrapping_add(offset * WORD_SIZE)
    }

    fn check_aligned(addr: u32) -> Result<(), Fault> {
        if addr % WORD_SIZE == 0 {
            Ok(())
        } else {
            Err(Fault::MisalignedAccess { addr })
        }
    }

    fn read(&self, addr: u32) -> Result<u32, Fault> {
        match self.mode {
            Mode::Compat => Ok(self.mem.read_word(addr)),
            Mode::Strict => {
                Self::check_aligned(addr)?;
                self.mem.try_read_word(addr)
            }
        }
    }

    fn write(&mut self, addr: u32, value: u32) -> Result<(), Fault> {
        match self.mode {
            Mode::Compat => {
                self.mem.write_word(addr, value);
                Ok(())
            }
            Mode::Strict => {
                Self::check_aligned(addr)?;
                self.mem.try_write_word(addr, value)
            }
        }
    }

    fn push(&mut self, value: u32) -> Result<(), Fault> {
        let sp = self.regs.sp.wrapping_sub(WORD_SIZE);
        self.write(sp, value)?;
        self.regs.sp = sp;
        Ok(())
    }

    fn pop(&mut self) -> Result<u32, Fault> {
        let value = self.peek()?;
        self.regs.sp = self.regs.sp.wrapping_add(WORD_SIZE);
        Ok(value)
    }

    fn peek(&self) -> Result<u32, Fault> {
        self.read(self.regs.sp)
    }

    fn set_top(&mut self, value: u32) -> Result<(), Fault> {
        self.write(self.regs.sp, value)
    }

    /// Pop `a`, combine with the new top `b` and replace it with `op(a, b)`
    fn binary(&mut self, op: impl Fn(u32, u32) -> u32) -> Result<Next, Fault> {
        let a = self.pop()?;
        let b = self.peek()?;
        self.set_top(op(a, b))?;
        Ok(Next::Advance)
    }

    fn unary(&mut self, op: impl Fn(u32) -> u32) -> Result<Next, Fault> {
        let v = self.peek()?;
        self.set_top(op(v))?;
        Ok(Next::Advance)
    }
}
