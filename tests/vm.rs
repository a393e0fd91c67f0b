use c8vm::ch8::{
    config::VMConfig,
    input::Keypad,
    interp::{ExecutionState, VFLAG},
    pace::{Clock, ManualClock, FRAME_DURATION},
    rom::{Rom, RomKind},
    run::{RunOptions, Runner},
    vm::{VMStatus, VM},
};

use std::sync::Arc;

fn vm(kind: RomKind, program: &[u8]) -> VM {
    let rom = Rom::new("integration", kind, program.to_vec()).unwrap();
    let config = VMConfig {
        rng_seed: Some(1),
        ..VMConfig::for_kind(kind)
    };
    VM::new(&rom, config, Arc::new(Keypad::new())).unwrap()
}

fn run_frames(vm: &mut VM, frames: usize) {
    for _ in 0..frames {
        assert_eq!(vm.run_frame(), Ok(VMStatus::Running));
    }
}

#[test]
fn skip_if_equal_after_add() {
    #[rustfmt::skip]
    let program = [
        0x60, 0x05, // V0 = 5
        0x70, 0x03, // V0 += 3
        0x30, 0x08, // skip if V0 == 8
        0x60, 0xFF, // skipped
        0x61, 0x01, // V1 = 1
        0x12, 0x0A, // loop
    ];
    let mut vm = vm(RomKind::CHIP8, &program);
    run_frames(&mut vm, 1);

    assert_eq!(vm.registers()[0], 8);
    assert_eq!(vm.registers()[1], 1);
    assert_eq!(vm.pc(), 0x20A);
}

#[test]
fn drawing_the_same_sprite_twice_collides() {
    #[rustfmt::skip]
    let program = [
        0xA2, 0x08, // I = sprite
        0xD0, 0x15, // draw 5 rows at (V0, V1)
        0xD0, 0x15, // draw again
        0x12, 0x06, // loop
        0xF0, 0x90, 0x90, 0x90, 0xF0,
    ];
    let mut vm = vm(RomKind::CHIP8, &program);

    run_frames(&mut vm, 1);
    assert_eq!(vm.registers()[VFLAG], 0);
    assert!(vm.display().pixel(0, 0, 0));

    // each draw waits for the next frame on the original interpreter
    run_frames(&mut vm, 2);
    assert_eq!(vm.registers()[VFLAG], 1);
    assert!(!vm.display().pixel(0, 0, 0));
    assert_eq!(vm.pc(), 0x206);
}

#[test]
fn legacy_schip_counts_clipped_rows_in_hires() {
    #[rustfmt::skip]
    let mut program = vec![
        0x00, 0xFF, // hires
        0x60, 0x00, // V0 = 0
        0x61, 0x3C, // V1 = 60
        0xA2, 0x0C, // I = sprite
        0xD0, 0x18, // draw 8 rows
        0x12, 0x0A, // loop
    ];
    program.extend_from_slice(&[0x81; 8]);

    let mut vm = vm(RomKind::SCHIP11, &program);
    run_frames(&mut vm, 1);

    assert_eq!(vm.render_dimensions(), (128, 64));
    assert_eq!(vm.registers()[VFLAG], 4);
    assert!(vm.display().pixel(0, 0, 63));
    assert!(vm.display().pixel(0, 7, 60));
}

#[test]
fn legacy_schip_counts_clipped_rows_of_large_sprites() {
    #[rustfmt::skip]
    let mut program = vec![
        0x00, 0xFF, // hires
        0x60, 0x00, // V0 = 0
        0x61, 0x34, // V1 = 52
        0xA2, 0x0C, // I = sprite
        0xD0, 0x10, // draw 16x16
        0x12, 0x0A, // loop
    ];
    for _ in 0..16 {
        program.extend_from_slice(&[0x80, 0x01]);
    }

    let mut vm = vm(RomKind::SCHIP11, &program);
    run_frames(&mut vm, 1);

    // rows 64..68 fall off the bottom
    assert_eq!(vm.registers()[VFLAG], 4);
    assert!(vm.display().pixel(0, 0, 52));
    assert!(vm.display().pixel(0, 15, 63));
    assert!(!vm.display().pixel(0, 15, 0));
}

#[test]
fn get_key_waits_for_press_and_release() {
    #[rustfmt::skip]
    let program = [
        0xF3, 0x0A, // V3 = key
        0x60, 0x01, // V0 = 1
        0x12, 0x04, // loop
    ];
    let mut vm = vm(RomKind::CHIP8, &program);
    let keypad = vm.keypad();

    run_frames(&mut vm, 2);
    assert!(matches!(
        vm.execution_state(),
        ExecutionState::AwaitingKey { latched: None, .. }
    ));

    keypad.press(0xB);
    run_frames(&mut vm, 1);
    assert_eq!(vm.registers()[0], 0);
    assert!(matches!(
        vm.execution_state(),
        ExecutionState::AwaitingKey {
            latched: Some(0xB),
            ..
        }
    ));

    keypad.release(0xB);
    run_frames(&mut vm, 1);
    assert_eq!(vm.execution_state(), ExecutionState::Running);
    assert_eq!(vm.registers()[3], 0xB);
    assert_eq!(vm.registers()[0], 1);
}

#[test]
fn arithmetic_flags() {
    for (a, b, sum, carry) in [(0xF0u8, 0x20u8, 0x10u8, 1u8), (0x01, 0x02, 0x03, 0)] {
        let program = [0x60, a, 0x61, b, 0x80, 0x14, 0x12, 0x06];
        let mut vm = vm(RomKind::XOCHIP, &program);
        run_frames(&mut vm, 1);
        assert_eq!(vm.registers()[0], sum);
        assert_eq!(vm.registers()[VFLAG], carry);
    }

    for (a, b, diff, no_borrow) in [(0x10u8, 0x20u8, 0xF0u8, 0u8), (0x20, 0x10, 0x10, 1)] {
        let program = [0x60, a, 0x61, b, 0x80, 0x15, 0x12, 0x06];
        let mut vm = vm(RomKind::XOCHIP, &program);
        run_frames(&mut vm, 1);
        assert_eq!(vm.registers()[0], diff);
        assert_eq!(vm.registers()[VFLAG], no_borrow);
    }
}

#[test]
fn shift_reads_vy_only_on_chip8() {
    let program = [0x61, 0x81, 0x80, 0x1E, 0x12, 0x04];

    let mut chip8 = vm(RomKind::CHIP8, &program);
    run_frames(&mut chip8, 1);
    assert_eq!(chip8.registers()[0], 0x02);
    assert_eq!(chip8.registers()[VFLAG], 1);

    let mut schip = vm(RomKind::SCHIPC, &program);
    run_frames(&mut schip, 1);
    assert_eq!(schip.registers()[0], 0x00);
    assert_eq!(schip.registers()[VFLAG], 0);
}

#[test]
fn xo_audio_pattern_plays_while_timer_runs() {
    #[rustfmt::skip]
    let mut program = vec![
        0xA2, 0x0C, // I = pattern
        0xF0, 0x02, // load audio pattern
        0x60, 0x02, // V0 = 2
        0xF0, 0x18, // sound timer = V0
        0x12, 0x08, // loop
        0x00, 0x00,
    ];
    program.extend_from_slice(&[0xFF; 16]);

    let mut vm = vm(RomKind::XOCHIP, &program);
    let mut out = vec![1.0f32; vm.samples_per_frame()];

    vm.push_audio(&mut out).unwrap();
    assert!(out.iter().all(|&s| s == 0.0));

    run_frames(&mut vm, 1);
    assert_eq!(vm.sound_timer(), 1);
    vm.push_audio(&mut out).unwrap();
    assert!(out.iter().all(|&s| s > 0.0));

    run_frames(&mut vm, 1);
    assert_eq!(vm.sound_timer(), 0);
    vm.push_audio(&mut out).unwrap();
    assert!(out.iter().all(|&s| s == 0.0));
}

#[test]
fn runner_paces_six_hundred_frames() {
    let clock = ManualClock::default();
    let runner = Runner::spawn(
        vm(RomKind::CHIP8, &[0x70, 0x01, 0x12, 0x00]),
        clock.clone(),
        RunOptions {
            frame_limit: Some(600),
            ..RunOptions::default()
        },
    );

    let stats = runner.wait().unwrap();
    assert_eq!(stats.frames, 600);
    assert_eq!(stats.simulated_time, 10.0);
    assert_eq!(clock.now(), FRAME_DURATION * 599);
}
