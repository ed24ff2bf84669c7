use super::*;
use crate::isa::{self, Register as R};

type TestMachine = Machine<&'static [u8], Vec<u8>>;

fn machine(program: Vec<u32>) -> TestMachine {
    Machine::new(program, &b""[..], Vec::new())
}

fn machine_with_input(program: Vec<u32>, input: &'static [u8]) -> TestMachine {
    Machine::new(program, input, Vec::new())
}

#[test]
fn prints_a_and_halts() {
    let program = vec![isa::lv(R::R1, 65), isa::out(R::R1), isa::halt()];
    let mut vm = machine(program);
    assert_eq!(vm.run().unwrap(), 3);
    assert_eq!(vm.status(), VMStatus::Halted);
    assert_eq!(vm.output(), &vec![0x41]);
}

#[test]
fn nothing_runs_after_halt() {
    let program = vec![isa::halt(), isa::lv(R::R1, 66), isa::out(R::R1)];
    let mut vm = machine(program);
    vm.run().unwrap();
    assert_eq!(vm.step().unwrap(), VMStatus::Halted);
    assert_eq!(vm.retired(), 1);
    assert!(vm.output().is_empty());
}

#[test]
fn pc_advances_before_dispatch() {
    let mut vm = machine(vec![isa::lv(R::R0, 1), isa::halt()]);
    assert_eq!(vm.step().unwrap(), VMStatus::Running);
    assert_eq!(vm.pc(), 1);
    assert_eq!(vm.registers()[R::R0], 1);
}

#[test]
fn arithmetic_wraps() {
    let program = vec![
        isa::lv(R::R1, 1),
        isa::nand(R::R2, R::R1, R::R1), // r2 = 0xFFFF_FFFE
        isa::add(R::R3, R::R2, R::R1),  // r3 = 0xFFFF_FFFF
        isa::add(R::R4, R::R3, R::R3),  // r4 = 0xFFFF_FFFE
        isa::mul(R::R5, R::R3, R::R3),  // r5 = 1
        isa::lv(R::R6, 130),
        isa::lv(R::R7, 2),
        isa::div(R::R6, R::R6, R::R7), // r6 = 65
        isa::halt(),
    ];
    let mut vm = machine(program);
    vm.run().unwrap();
    let regs = vm.registers();
    assert_eq!(regs[R::R2], 0xFFFF_FFFE);
    assert_eq!(regs[R::R3], u32::MAX);
    assert_eq!(regs[R::R4], 0xFFFF_FFFE);
    assert_eq!(regs[R::R5], 1);
    assert_eq!(regs[R::R6], 65);
}

#[test]
fn cmov_respects_condition() {
    let program = vec![
        isa::lv(R::R1, 65),
        isa::lv(R::R2, 3),
        isa::lv(R::R3, 3),
        isa::lv(R::R7, 1),
        isa::cmov(R::R2, R::R1, R::R7), // moves
        isa::cmov(R::R3, R::R1, R::R0), // r0 is zero, stays
        isa::halt(),
    ];
    let mut vm = machine(program);
    vm.run().unwrap();
    assert_eq!(vm.registers()[R::R2], 65);
    assert_eq!(vm.registers()[R::R3], 3);
}

#[test]
fn map_store_load_output() {
    let program = vec![
        isa::lv(R::R1, 5),
        isa::map(R::R2, R::R1),
        isa::lv(R::R3, 2),
        isa::lv(R::R4, 90),
        isa::sstore(R::R2, R::R3, R::R4),
        isa::sload(R::R5, R::R2, R::R3),
        isa::out(R::R5),
        isa::halt(),
    ];
    let mut vm = machine(program);
    vm.run().unwrap();
    assert_eq!(vm.output(), &vec![90]);
    let id = vm.registers()[R::R2];
    assert_ne!(id, 0);
    assert_eq!(vm.memory().segment_len(id), Some(5));
}

#[test]
fn unmap_then_map_reuses_without_stale_contents() {
    let program = vec![
        isa::lv(R::R1, 3),
        isa::map(R::R2, R::R1),
        isa::lv(R::R4, 7),
        isa::sstore(R::R2, R::R0, R::R4),
        isa::unmap(R::R2),
        isa::map(R::R3, R::R1),
        isa::sload(R::R5, R::R3, R::R0),
        isa::halt(),
    ];
    let mut vm = machine(program);
    vm.run().unwrap();
    assert_eq!(vm.registers()[R::R5], 0);
    assert_eq!(vm.memory().live_segments(), 1);
}

#[test]
fn division_by_zero_stops_before_later_output() {
    let program = vec![
        isa::lv(R::R1, 65),
        isa::out(R::R1),
        isa::div(R::R2, R::R1, R::R0),
        isa::out(R::R1),
        isa::halt(),
    ];
    let mut vm = machine(program);
    assert!(matches!(vm.run(), Err(VMError::DivisionByZero)));
    assert_eq!(vm.pc(), 3);
    assert_eq!(vm.output(), &vec![65]);
}

#[test]
fn output_above_255_faults() {
    let program = vec![isa::lv(R::R1, 256), isa::out(R::R1), isa::halt()];
    assert!(matches!(machine(program).run(), Err(VMError::OutputOutOfRange(256))));
}

#[test]
fn unknown_opcode_faults() {
    let program = vec![0xE000_0000, isa::halt()];
    assert!(matches!(
        machine(program).run(),
        Err(VMError::UnknownOpcode { opcode: 14, .. })
    ));
}

#[test]
fn running_off_the_end_faults() {
    let program = vec![isa::lv(R::R0, 1)];
    assert!(matches!(
        machine(program).run(),
        Err(VMError::ProgramCounterOutOfBounds { pc: 1, len: 1 })
    ));
}

#[test]
fn unmapping_segment_zero_faults() {
    let program = vec![isa::unmap(R::R0), isa::halt()];
    assert!(matches!(machine(program).run(), Err(VMError::ReservedSegment)));
}

#[test]
fn loading_from_unmapped_segment_faults() {
    let program = vec![isa::lv(R::R1, 4), isa::sload(R::R2, R::R1, R::R0), isa::halt()];
    assert!(matches!(machine(program).run(), Err(VMError::UnmappedSegment(4))));
}

#[test]
fn input_reads_bytes_then_all_ones() {
    let program = vec![
        isa::input(R::R1),
        isa::input(R::R2),
        isa::lv(R::R3, 10),
        isa::add(R::R4, R::R1, R::R3),
        isa::out(R::R4),
        isa::halt(),
    ];
    let mut vm = machine_with_input(program, b"A");
    vm.run().unwrap();
    assert_eq!(vm.registers()[R::R1], 65);
    assert_eq!(vm.registers()[R::R2], u32::MAX);
    assert_eq!(vm.output(), &b"K".to_vec());
}

#[test]
fn echo_until_end_of_input() {
    // loop: r1 = in; if r1 == ~0 halt; out r1; goto loop
    let program = vec![
        isa::lv(R::R6, 0),                 // 0: loop target
        isa::lv(R::R7, 9),                 // 1: exit target
        isa::input(R::R1),                 // 2
        isa::nand(R::R2, R::R1, R::R1),    // 3: r2 = !r1, zero only at end of input
        isa::lv(R::R3, 7),                 // 4: continue target
        isa::cmov(R::R7, R::R3, R::R2),    // 5: r2 != 0 -> keep going
        isa::loadp(R::R0, R::R7),          // 6
        isa::out(R::R1),                   // 7
        isa::loadp(R::R0, R::R6),          // 8
        isa::halt(),                       // 9
    ];
    let mut vm = machine_with_input(program, b"hi!");
    vm.run().unwrap();
    assert_eq!(vm.output(), &b"hi!".to_vec());
}

#[test]
fn load_program_zero_only_jumps() {
    let program = vec![
        isa::lv(R::R1, 3),
        isa::loadp(R::R0, R::R1),
        isa::out(R::R0),  // skipped
        isa::halt(),
    ];
    let mut vm = machine(program.clone());
    vm.run().unwrap();
    assert!(vm.output().is_empty());
    assert_eq!(vm.memory().program(), program.as_slice());
}

#[test]
fn load_program_replaces_code_with_a_copy() {
    // Build "lv r1, 66; out r1; halt" in a new segment, then jump into it.
    let payload = [isa::lv(R::R1, 66), isa::out(R::R1), isa::halt()];
    let mut program = vec![isa::lv(R::R1, 3), isa::map(R::R2, R::R1)];
    for (offset, word) in payload.iter().enumerate() {
        // Words wider than 25 bits are built as hi * 2^16 + lo.
        program.extend([
            isa::lv(R::R3, word >> 16),
            isa::lv(R::R4, 1 << 16),
            isa::mul(R::R3, R::R3, R::R4),
            isa::lv(R::R4, word & 0xFFFF),
            isa::add(R::R3, R::R3, R::R4),
            isa::lv(R::R5, offset as u32),
            isa::sstore(R::R2, R::R5, R::R3),
        ]);
    }
    program.extend([isa::loadp(R::R2, R::R0)]);

    let mut vm = machine(program);
    vm.run().unwrap();
    assert_eq!(vm.output(), &vec![66]);
    assert_eq!(vm.memory().program(), &payload);

    // The source segment is still separately mutable.
    let id = vm.registers()[R::R2];
    vm.memory_mut().write(id, 0, 0).unwrap();
    assert_eq!(vm.memory().program(), &payload);
}

#[test]
fn self_modifying_store_into_segment_zero() {
    // Overwrite the halt at word 4 with a copy of the out at word 5.
    let program = vec![
        isa::lv(R::R1, 5),               // 0
        isa::sload(R::R2, R::R0, R::R1), // 1: r2 = m[0][5]
        isa::lv(R::R3, 4),               // 2
        isa::sstore(R::R0, R::R3, R::R2), // 3: m[0][4] = out r7
        isa::halt(),                     // 4: replaced before it runs
        isa::out(R::R7),                 // 5
        isa::halt(),                     // 6
    ];
    let mut vm = machine(program);
    vm.registers_mut()[R::R7] = b'!' as u32;
    vm.run().unwrap();
    assert_eq!(vm.output(), &b"!!".to_vec());
}

#[test]
fn run_for_stops_at_the_budget() {
    // Tight loop: loadp r0, r0 jumps to 0 forever.
    let mut vm = machine(vec![isa::loadp(R::R0, R::R0)]);
    assert_eq!(vm.run_for(1000).unwrap(), VMStatus::Running);
    assert_eq!(vm.retired(), 1000);
}

#[test]
fn from_image_decodes_big_endian() {
    let words = [isa::lv(R::R0, 65), isa::out(R::R0), isa::halt()];
    let image: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
    let mut vm = Machine::from_image(&image, &b""[..], Vec::new()).unwrap();
    vm.run().unwrap();
    assert_eq!(vm.into_output(), b"A".to_vec());
}
