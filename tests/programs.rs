use rstest::rstest;
use zpusim::{
    cpu::{Mode, Zpu},
    isa::Instruction,
    mem::{AddressSpace, ByteOrder, MemConfig, Region, Translation},
};

const MEM_SIZE: u32 = 0x10000;

/// Adds 3 and 4 through an EMULATE routine in slot 2, then adds the leftover operand
///
/// main:  IM 3, NOP, IM 4, EMULATE 2, ADD, BREAKPOINT
/// slot2: LOADSP 1, LOADSP 3, ADD, STORESP 3, POPPC
fn emulate_program() -> Vec<u8> {
    let mut image = vec![0u8; 0x60];
    image[..6].copy_from_slice(&[0x83, 0x0b, 0x84, 0x22, 0x05, 0x00]);
    image[64..69].copy_from_slice(&[0x71, 0x73, 0x05, 0x53, 0x04]);
    image
}

fn run_to_breakpoint(zpu: &mut Zpu, limit: usize) -> usize {
    for n in 1..=limit {
        if zpu.step().unwrap() == Instruction::Breakpoint {
            return n;
        }
    }
    panic!("no breakpoint within {} steps", limit);
}

#[rstest]
#[case(ByteOrder::Big, Mode::Compat)]
#[case(ByteOrder::Little, Mode::Compat)]
#[case(ByteOrder::Big, Mode::Strict)]
#[case(ByteOrder::Little, Mode::Strict)]
fn test_emulate_routine(#[case] byte_order: ByteOrder, #[case] mode: Mode) {
    let config = MemConfig {
        byte_order,
        ..Default::default()
    };
    let region = Region::with_image(0, MEM_SIZE, &emulate_program()).unwrap();
    let mem = AddressSpace::with_config(vec![region], config).unwrap();
    let mut zpu = Zpu::with_mode(mem, 0, MEM_SIZE, mode);

    for _ in 0..4 {
        zpu.step().unwrap();
    }
    assert_eq!(zpu.pc(), 64);
    let stack: Vec<u32> = zpu.stack(3).map(|(_, w)| w).collect();
    assert_eq!(stack, vec![4, 4, 3]);

    assert_eq!(run_to_breakpoint(&mut zpu, 20), 7);
    assert_eq!(zpu.pc(), 6);
    assert_eq!(zpu.sp(), MEM_SIZE - 4);
    assert_eq!(zpu.memory().read_word(zpu.sp()), 11);
    assert!(!zpu.registers().idim());
}

#[test]
fn test_flat_translation_runs_same_program() {
    let config = MemConfig {
        translation: Translation::Flat,
        ..Default::default()
    };
    let region = Region::with_image(0, MEM_SIZE, &emulate_program()).unwrap();
    let mem = AddressSpace::with_config(vec![region], config).unwrap();
    let mut zpu = Zpu::new(mem, 0, MEM_SIZE);
    run_to_breakpoint(&mut zpu, 20);
    assert_eq!(zpu.memory().read_word(zpu.sp()), 11);
}

#[test]
fn test_stack_in_separate_region() {
    const STACK_BASE: u32 = 0x8000_0000;
    const STACK_SIZE: u32 = 0x100;
    // IM 0x55, NOP, PUSHSP, IM 0x100 (chained), STORE, BREAKPOINT
    let code = [0xd5, 0x0b, 0x02, 0x82, 0x80, 0x0c, 0x00];
    let mem = AddressSpace::new(vec![
        Region::with_image(0, 0x200, &code).unwrap(),
        Region::new(STACK_BASE, STACK_SIZE),
    ])
    .unwrap();
    let top = STACK_BASE + STACK_SIZE;
    let mut zpu = Zpu::with_mode(mem, 0, top, Mode::Strict);
    run_to_breakpoint(&mut zpu, 10);

    // IM 0x55 sign extends, PUSHSP pushed the address of that word
    assert_eq!(zpu.memory().read_word(top - 4), 0xffff_ffd5);
    assert_eq!(zpu.memory().read_word(0x100), top - 4);
    assert_eq!(zpu.sp(), top - 4);
    assert_eq!(
        zpu.memory().region(1).unwrap().bytes()[(STACK_SIZE - 4) as usize..],
        [0xff, 0xff, 0xff, 0xd5]
    );
}

#[test]
fn test_runaway_program_in_compat_mode() {
    // Jumps far outside memory; the fetched zero bytes keep executing as breakpoints
    let mem = AddressSpace::new(vec![Region::with_image(0, 0x100, &[0xff, 0x04]).unwrap()])
        .unwrap();
    let mut zpu = Zpu::new(mem, 0, 0x100);
    assert_eq!(zpu.run(2), Ok(2));
    assert_eq!(zpu.pc(), u32::MAX);
    assert_eq!(zpu.step(), Ok(Instruction::Breakpoint));
    assert_eq!(zpu.pc(), 0);
}
