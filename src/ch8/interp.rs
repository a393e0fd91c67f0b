use super::{
    audio::{Audio, DigitizedTrack, AUDIO_BUFFER_SIZE_BYTES},
    disp::{BlendMode, Display, DisplayMode, SpriteOptions},
    error::{C8Error, C8Result},
    input::{Keypad, Pad},
    instruct::{Instruction, InstructionParameters},
    mem::*,
    quirk::{IndexIncrement, QuirkSet},
    rom::{Rom, RomKind},
};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use std::sync::Arc;

pub const VFLAG: usize = 15;

// cycles burned by a poll while the processor is stalled
const STALL_CYCLES: u32 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExecutionState {
    Running,
    /// FX0A: PC stays on the wait instruction until the latched key is released
    AwaitingKey { register: u8, latched: Option<u8> },
    /// Display wait: blocked until the next frame boundary
    AwaitingDma,
}

pub struct Interpreter {
    pub kind: RomKind,
    pub quirks: QuirkSet,
    pub memory: Memory,
    pub pc: u32,
    pub index: u32,
    pub stack: Vec<u32>,
    pub flags: [u8; 16],
    pub registers: [u8; 16],
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub state: ExecutionState,
    pub exited: bool,
    pub display: Display,
    pub audio: Audio,
    pub keypad: Arc<Keypad>,
    pub rng: StdRng,
}

impl Interpreter {
    pub fn new(
        rom: &Rom,
        quirks: QuirkSet,
        display: Display,
        audio: Audio,
        keypad: Arc<Keypad>,
        rng_seed: Option<u64>,
    ) -> C8Result<Self> {
        let kind = rom.config.kind;
        let memory = Memory::load(rom)?;

        Ok(Interpreter {
            kind,
            quirks,
            pc: kind.program_starting_address(),
            memory,
            index: 0,
            stack: Vec::with_capacity(quirks.stack_depth),
            flags: [0; 16],
            registers: [0; 16],
            delay_timer: 0,
            sound_timer: 0,
            state: ExecutionState::Running,
            exited: false,
            display,
            audio,
            keypad,
            rng: match rng_seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
        })
    }

    pub fn fetch(&self) -> InstructionParameters {
        let mut bytes = [0; Instruction::MAX_INSTRUCTION_SIZE as usize];
        self.memory.export(self.pc, &mut bytes);
        InstructionParameters::from(bytes)
    }

    pub fn decode(&self, params: InstructionParameters) -> C8Result<Instruction> {
        params
            .try_decode(&self.quirks)
            .ok_or(C8Error::InvalidInstruction {
                address: self.pc,
                opcode: params.opcode() as u32,
                kind: self.kind,
            })
    }

    /// The instruction the next step will execute, `None` while stalled
    pub fn peek(&self) -> C8Result<Option<Instruction>> {
        if self.state != ExecutionState::Running {
            return Ok(None);
        }
        self.decode(self.fetch()).map(Some)
    }

    /// Uses one slot of the instruction budget and returns the VIP cycles it cost
    pub fn step(&mut self) -> C8Result<u32> {
        match self.state {
            ExecutionState::AwaitingDma => return Ok(STALL_CYCLES),
            ExecutionState::AwaitingKey { register, latched } => {
                self.poll_key(register, latched);
                return Ok(STALL_CYCLES);
            }
            ExecutionState::Running => (),
        }

        let instruction = self.decode(self.fetch())?;
        let cycles = instruction.vip_cycles(&self.registers);

        let address = self.pc;
        self.pc = self.memory.address_add(self.pc, instruction.size() as u32);
        self.exec(instruction, address)?;

        Ok(cycles)
    }

    /// Frame boundary: timers count down and a pending display wait is released
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);

        if self.state == ExecutionState::AwaitingDma {
            self.state = ExecutionState::Running;
        }
    }

    fn poll_key(&mut self, register: u8, latched: Option<u8>) {
        match latched {
            None => {
                if let Some(key) = self.keypad.first_down() {
                    log::trace!("Latched key {:X} for V{:X}", key, register);
                    self.state = ExecutionState::AwaitingKey {
                        register,
                        latched: Some(key),
                    };
                }
            }
            // the latched key is delivered on release or once another key supersedes it
            Some(key) => {
                if !self.keypad.is_down(key) || self.keypad.is_other_down(key) {
                    self.registers[register as usize] = key;
                    self.pc = self.memory.address_add(self.pc, 2);
                    self.state = ExecutionState::Running;
                }
            }
        }
    }

    fn next_instruction_size(&self) -> u32 {
        let word = self.memory.read_word(self.pc);
        if (self.quirks.xo_chip && word == 0xF000) || (self.quirks.megachip && word >> 8 == 0x01) {
            4
        } else {
            2
        }
    }

    fn skip_next_instruction(&mut self) {
        self.pc = self.memory.address_add(self.pc, self.next_instruction_size());
    }

    // scroll distances are in logical pixels except on legacy SCHIP which always scrolls physical pixels
    fn scroll_amount(&self, n: u8) -> usize {
        if self.display.mode == DisplayMode::LowResolution
            && self.quirks.lores_doubling
            && !self.quirks.legacy_schip
        {
            2 * n as usize
        } else {
            n as usize
        }
    }

    fn advance_index(&mut self, vx: u8) {
        let increment = match self.quirks.index_increment {
            IndexIncrement::Unchanged => return,
            IndexIncrement::ByX => vx as u32,
            IndexIncrement::ByXPlusOne => vx as u32 + 1,
        };
        self.index = self.memory.address_add(self.index, increment);
    }

    fn exec(&mut self, inst: Instruction, address: u32) -> C8Result<()> {
        let mut skip_next_instruction = false;

        match inst {
            Instruction::Exit => {
                log::info!("Program exited at {:#06X}", address);
                self.exited = true;
            }

            Instruction::Jump(target) => self.pc = self.memory.mask_address(target as u32),

            Instruction::JumpWithOffset(target, vx) => {
                let offset = if self.quirks.jump_with_vx {
                    self.registers[vx as usize]
                } else {
                    self.registers[0]
                };
                self.pc = self.memory.address_add(target as u32, offset as u32);
            }

            Instruction::CallSubroutine(target) => {
                if self.stack.len() >= self.quirks.stack_depth {
                    return Err(C8Error::StackOverflow {
                        address,
                        depth: self.quirks.stack_depth,
                    });
                }
                self.stack.push(self.pc);
                self.pc = self.memory.mask_address(target as u32);
            }

            Instruction::SubroutineReturn => {
                self.pc = self
                    .stack
                    .pop()
                    .ok_or(C8Error::StackUnderflow { address })?;
            }

            Instruction::SkipIfEqualsConstant(vx, value) => {
                skip_next_instruction = self.registers[vx as usize] == value
            }

            Instruction::SkipIfNotEqualsConstant(vx, value) => {
                skip_next_instruction = self.registers[vx as usize] != value
            }

            Instruction::SkipIfEquals(vx, vy) => {
                skip_next_instruction = self.registers[vx as usize] == self.registers[vy as usize]
            }

            Instruction::SkipIfNotEquals(vx, vy) => {
                skip_next_instruction = self.registers[vx as usize] != self.registers[vy as usize]
            }

            Instruction::SkipIfKeyDown(vx) => {
                skip_next_instruction = self.keypad.is_down(self.registers[vx as usize])
            }

            Instruction::SkipIfKeyNotDown(vx) => {
                skip_next_instruction = !self.keypad.is_down(self.registers[vx as usize])
            }

            Instruction::SkipIfSecondKeyDown(vx) => {
                skip_next_instruction = self
                    .keypad
                    .is_down_on(Pad::Secondary, self.registers[vx as usize])
            }

            Instruction::SkipIfSecondKeyNotDown(vx) => {
                skip_next_instruction = !self
                    .keypad
                    .is_down_on(Pad::Secondary, self.registers[vx as usize])
            }

            Instruction::WaitForKey(vx) => {
                self.pc = address;
                self.state = ExecutionState::AwaitingKey {
                    register: vx,
                    latched: None,
                };
                self.poll_key(vx, None);
            }

            Instruction::SetConstant(vx, value) => self.registers[vx as usize] = value,

            Instruction::AddConstant(vx, change) => {
                self.registers[vx as usize] = self.registers[vx as usize].wrapping_add(change)
            }

            Instruction::Set(vx, vy) => self.registers[vx as usize] = self.registers[vy as usize],

            Instruction::Or(vx, vy) => {
                self.registers[vx as usize] |= self.registers[vy as usize];
                if self.quirks.vf_reset {
                    self.registers[VFLAG] = 0;
                }
            }

            Instruction::And(vx, vy) => {
                self.registers[vx as usize] &= self.registers[vy as usize];
                if self.quirks.vf_reset {
                    self.registers[VFLAG] = 0;
                }
            }

            Instruction::Xor(vx, vy) => {
                self.registers[vx as usize] ^= self.registers[vy as usize];
                if self.quirks.vf_reset {
                    self.registers[VFLAG] = 0;
                }
            }

            Instruction::Add(vx, vy) => {
                let (value, overflowed) =
                    self.registers[vx as usize].overflowing_add(self.registers[vy as usize]);
                self.registers[vx as usize] = value;
                self.registers[VFLAG] = overflowed as u8;
            }

            Instruction::Sub(vx, vy, vx_minus_vy) => {
                let (value, overflowed) = if vx_minus_vy {
                    self.registers[vx as usize].overflowing_sub(self.registers[vy as usize])
                } else {
                    self.registers[vy as usize].overflowing_sub(self.registers[vx as usize])
                };

                self.registers[vx as usize] = value;
                self.registers[VFLAG] = !overflowed as u8; // vf is 0 on borrow instead of 1 like add
            }

            Instruction::Shift(vx, vy, right) => {
                let bits = if self.quirks.shift_in_place {
                    self.registers[vx as usize]
                } else {
                    self.registers[vy as usize]
                };

                if right {
                    self.registers[vx as usize] = bits >> 1;
                    self.registers[VFLAG] = bits & 1;
                } else {
                    self.registers[vx as usize] = bits << 1;
                    self.registers[VFLAG] = bits >> 7;
                }
            }

            Instruction::NibbleAdd(vx, vy) => {
                let (x, y) = (self.registers[vx as usize], self.registers[vy as usize]);
                self.registers[vx as usize] =
                    (x & 0xF0).wrapping_add(y & 0xF0) | (x.wrapping_add(y) & 0x0F);
            }

            Instruction::GetDelayTimer(vx) => self.registers[vx as usize] = self.delay_timer,

            Instruction::SetDelayTimer(vx) => self.delay_timer = self.registers[vx as usize],

            Instruction::SetSoundTimer(vx) => self.sound_timer = self.registers[vx as usize],

            Instruction::SetIndex(target) => self.index = self.memory.mask_address(target as u32),

            Instruction::SetIndexToLong(target) => {
                self.index = self.memory.mask_address(target as u32)
            }

            Instruction::SetIndexToU24(target) => self.index = self.memory.mask_address(target),

            Instruction::SetIndexToHexChar(vx) => {
                let c = (self.registers[vx as usize] & 0xF) as u32;
                self.index = FONT_STARTING_ADDRESS + FONT_CHAR_DATA_SIZE * c;
            }

            Instruction::SetIndexToBigHexChar(vx) => {
                let c = (self.registers[vx as usize] & 0xF) as u32;
                self.index = BIG_FONT_STARTING_ADDRESS + BIG_FONT_CHAR_DATA_SIZE * c;
            }

            Instruction::AddToIndex(vx) => {
                self.index = self
                    .memory
                    .address_add(self.index, self.registers[vx as usize] as u32);
            }

            Instruction::Load(vx) => {
                self.memory
                    .export(self.index, &mut self.registers[..=vx as usize]);
                self.advance_index(vx);
            }

            Instruction::Store(vx) => {
                self.memory.import(&self.registers[..=vx as usize], self.index);
                self.advance_index(vx);
            }

            Instruction::LoadRange(vstart, vend) => {
                for (offset, register) in register_range(vstart, vend).enumerate() {
                    self.registers[register] =
                        self.memory.read_byte(self.index.wrapping_add(offset as u32));
                }
            }

            Instruction::StoreRange(vstart, vend) => {
                for (offset, register) in register_range(vstart, vend).enumerate() {
                    self.memory.write_byte(
                        self.index.wrapping_add(offset as u32),
                        self.registers[register],
                    );
                }
            }

            Instruction::LoadFlags(vx) => {
                self.registers[..=vx as usize].copy_from_slice(&self.flags[..=vx as usize]);
            }

            Instruction::StoreFlags(vx) => {
                self.flags[..=vx as usize].copy_from_slice(&self.registers[..=vx as usize]);
            }

            Instruction::StoreBinaryCodedDecimal(vx) => {
                let decimal = self.registers[vx as usize];
                self.memory
                    .import(&[decimal / 100, decimal / 10 % 10, decimal % 10], self.index);
            }

            Instruction::GenerateRandom(vx, bound) => {
                self.registers[vx as usize] = (self.rng.next_u32() & bound as u32) as u8;
            }

            Instruction::SetPlane(flags) => {
                self.display.selected_plane_bitflags = flags;
            }

            Instruction::Draw(vx, vy, height) => {
                self.registers[VFLAG] = self.exec_display_instruction(vx, vy, height);

                if self.quirks.display_wait && !self.display.is_extended() {
                    self.state = ExecutionState::AwaitingDma;
                }
            }

            Instruction::ScrollUp(n) => {
                let amount = self.scroll_amount(n);
                self.display
                    .scroll_up(amount, self.display.selected_plane_bitflags);
            }

            Instruction::ScrollDown(n) => {
                let amount = self.scroll_amount(n);
                self.display
                    .scroll_down(amount, self.display.selected_plane_bitflags);
            }

            Instruction::ScrollLeft => {
                let amount = self.scroll_amount(4);
                self.display
                    .scroll_left(amount, self.display.selected_plane_bitflags);
            }

            Instruction::ScrollRight => {
                let amount = self.scroll_amount(4);
                self.display
                    .scroll_right(amount, self.display.selected_plane_bitflags);
            }

            Instruction::LowResolution => {
                self.display.set_mode(
                    DisplayMode::LowResolution,
                    self.quirks.clear_on_mode_switch,
                );
            }

            Instruction::HighResolution => {
                self.display.set_mode(
                    DisplayMode::HighResolution,
                    self.quirks.clear_on_mode_switch,
                );
            }

            Instruction::ClearScreen => {
                if self.display.mode == DisplayMode::MegaResolution {
                    self.display.present_mega();
                } else {
                    self.display.clear(self.display.selected_plane_bitflags);
                }
            }

            Instruction::InvertScreen => {
                self.display.invert(self.display.selected_plane_bitflags);
            }

            Instruction::SetDrawMode(mode) => self.display.draw_mode = mode,

            Instruction::LoadAudio => {
                let mut buffer = [0; AUDIO_BUFFER_SIZE_BYTES];
                self.memory.export(self.index, &mut buffer);
                self.audio.buffer = buffer;
            }

            Instruction::SetPitch(vx) => self.audio.pitch = self.registers[vx as usize],

            Instruction::StepBackgroundColor => self.display.step_background(),

            Instruction::SetColorZone(vx, vy, height) => {
                let color = self.registers[vy as usize];
                let horizontal = self.registers[vx as usize];
                let vertical = self.registers[(vx as usize + 1) & 0xF];

                if height == 0 {
                    // low nibble is the first zone, high nibble the number of extra zones
                    self.display.set_zone_color(
                        (horizontal & 0xF) as usize * 8,
                        (vertical & 0xF) as usize * 4,
                        ((horizontal >> 4) as usize + 1) * 8,
                        ((vertical >> 4) as usize + 1) * 4,
                        color,
                    );
                } else {
                    self.display.set_zone_color(
                        horizontal as usize % 64,
                        vertical as usize % 32,
                        8,
                        height as usize,
                        color,
                    );
                }
            }

            Instruction::OutputSound(vx) => {
                self.audio.set_square_wave_value(self.registers[vx as usize])
            }

            // no peripheral is attached to the input port
            Instruction::InputPort(vx) => self.registers[vx as usize] = 0,

            Instruction::MegaOff => self.display.set_mode(DisplayMode::LowResolution, true),

            Instruction::MegaOn => self.display.set_mode(DisplayMode::MegaResolution, true),

            Instruction::LoadPalette(count) => {
                let mut bytes = vec![0; count as usize * 4];
                self.memory.export(self.index, &mut bytes);
                let colors: Vec<u32> = bytes
                    .chunks_exact(4)
                    .map(|argb| u32::from_be_bytes([argb[0], argb[1], argb[2], argb[3]]))
                    .collect();
                self.display.load_mega_palette(1, &colors);
            }

            Instruction::SetSpriteWidth(width) => {
                self.display.mega_mut().sprite_width = if width == 0 { 256 } else { width as usize };
            }

            Instruction::SetSpriteHeight(height) => {
                self.display.mega_mut().sprite_height =
                    if height == 0 { 256 } else { height as usize };
            }

            Instruction::SetScreenAlpha(alpha) => self.display.mega_mut().screen_alpha = alpha,

            Instruction::PlayDigitized(looping) => {
                let track = DigitizedTrack::read(&self.memory, self.index, looping);
                self.audio.play_track(track);
            }

            Instruction::StopDigitized => self.audio.stop_track(),

            Instruction::SetBlendMode(mode) => {
                // validated during decode
                if let Some(mode) = BlendMode::from_nibble(mode) {
                    self.display.mega_mut().blend_mode = mode;
                }
            }

            Instruction::SetCollisionColor(index) => {
                self.display.mega_mut().collision_color = index
            }
        }

        if skip_next_instruction {
            self.skip_next_instruction();
        }

        Ok(())
    }

    /// (rows, bytes per row, total bytes read from I) for a DXYN
    pub fn get_sprite_draw_info(&self, height: u8) -> (usize, usize, usize) {
        let (rows, bytes_per_row) = if height == 0 && self.quirks.big_sprites {
            if self.quirks.legacy_schip && !self.display.is_extended() {
                (16, 1)
            } else {
                (16, 2)
            }
        } else {
            (height as usize, 1)
        };

        let planes = (self.display.selected_plane_bitflags as u32
            & ((1 << self.display.plane_count()) - 1))
            .count_ones()
            .max(1) as usize;

        (rows, bytes_per_row, rows * bytes_per_row * planes)
    }

    fn exec_display_instruction(&mut self, vx: u8, vy: u8, height: u8) -> u8 {
        let x = self.registers[vx as usize] as usize;
        let y = self.registers[vy as usize] as usize;

        if self.display.mode == DisplayMode::MegaResolution {
            // font glyphs stay monochrome, everything else is an indexed sprite
            if self.index < PROGRAM_STARTING_ADDRESS {
                let (rows, bytes_per_row, total) = self.get_sprite_draw_info(height);
                let mut sprite = vec![0; total];
                self.memory.export(self.index, &mut sprite);
                return self.display.draw_mega_mono(&sprite, rows, bytes_per_row, x, y) as u8;
            }

            let mega = self.display.mega_mut();
            let mut sprite = vec![0; mega.sprite_width * mega.sprite_height];
            self.memory.export(self.index, &mut sprite);
            return self.display.draw_mega(&sprite, x, y) as u8;
        }

        let (rows, bytes_per_row, total) = self.get_sprite_draw_info(height);
        let mut sprite = vec![0; total];
        self.memory.export(self.index, &mut sprite);

        self.display.draw(
            &sprite,
            x,
            y,
            rows,
            bytes_per_row,
            self.display.selected_plane_bitflags,
            SpriteOptions {
                wrap: self.quirks.wrap,
                count_row_collisions: self.quirks.legacy_schip,
            },
        )
    }
}

// XO-CHIP register ranges run backwards when the start register is the larger one
fn register_range(vstart: u8, vend: u8) -> Box<dyn Iterator<Item = usize>> {
    let (vstart, vend) = (vstart as usize, vend as usize);
    if vstart <= vend {
        Box::new(vstart..=vend)
    } else {
        Box::new((vend..=vstart).rev())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ch8::{audio::DEFAULT_SAMPLE_RATE, preset::palette};

    fn interpreter(kind: RomKind, program: &[u8]) -> Interpreter {
        let quirks = QuirkSet::for_kind(kind);
        let rom = Rom::new("test", kind, program.to_vec()).unwrap();
        Interpreter::new(
            &rom,
            quirks,
            Display::new(&quirks, palette(0)),
            Audio::new(&quirks, DEFAULT_SAMPLE_RATE, 60, 0.5),
            Arc::new(Keypad::new()),
            Some(0),
        )
        .unwrap()
    }

    fn run(interp: &mut Interpreter, steps: usize) {
        for _ in 0..steps {
            interp.step().unwrap();
        }
    }

    #[test]
    fn add_sets_carry_after_result() {
        for (a, b, sum, carry) in [(0xFF, 0x01, 0x00, 1), (0x10, 0x20, 0x30, 0), (0x80, 0x80, 0x00, 1)] {
            let mut interp = interpreter(RomKind::CHIP8, &[0x81, 0x24]);
            interp.registers[1] = a;
            interp.registers[2] = b;
            run(&mut interp, 1);
            assert_eq!(interp.registers[1], sum);
            assert_eq!(interp.registers[VFLAG], carry);
        }

        // flag wins when VF is the destination
        let mut interp = interpreter(RomKind::CHIP8, &[0x8F, 0x14]);
        interp.registers[0xF] = 0xFF;
        interp.registers[1] = 0x02;
        run(&mut interp, 1);
        assert_eq!(interp.registers[VFLAG], 1);
    }

    #[test]
    fn sub_flags_no_borrow() {
        for (a, b, diff, flag) in [(5, 3, 2, 1), (3, 5, 0xFE, 0), (4, 4, 0, 1)] {
            let mut interp = interpreter(RomKind::CHIP8, &[0x81, 0x25]);
            interp.registers[1] = a;
            interp.registers[2] = b;
            run(&mut interp, 1);
            assert_eq!(interp.registers[1], diff);
            assert_eq!(interp.registers[VFLAG], flag);
        }

        let mut interp = interpreter(RomKind::CHIP8, &[0x81, 0x27]);
        interp.registers[1] = 5;
        interp.registers[2] = 3;
        run(&mut interp, 1);
        assert_eq!(interp.registers[1], 0xFE);
        assert_eq!(interp.registers[VFLAG], 0);
    }

    #[test]
    fn shift_source_depends_on_variant() {
        let mut chip8 = interpreter(RomKind::CHIP8, &[0x81, 0x26]);
        chip8.registers[1] = 0x10;
        chip8.registers[2] = 0x03;
        run(&mut chip8, 1);
        assert_eq!(chip8.registers[1], 0x01);
        assert_eq!(chip8.registers[VFLAG], 1);

        let mut schip = interpreter(RomKind::SCHIP11, &[0x81, 0x26]);
        schip.registers[1] = 0x10;
        schip.registers[2] = 0x03;
        run(&mut schip, 1);
        assert_eq!(schip.registers[1], 0x08);
        assert_eq!(schip.registers[VFLAG], 0);
    }

    #[test]
    fn logic_ops_reset_vf_only_with_quirk() {
        let mut chip8 = interpreter(RomKind::CHIP8, &[0x81, 0x21]);
        chip8.registers[VFLAG] = 1;
        run(&mut chip8, 1);
        assert_eq!(chip8.registers[VFLAG], 0);

        let mut xo = interpreter(RomKind::XOCHIP, &[0x81, 0x21]);
        xo.registers[VFLAG] = 1;
        run(&mut xo, 1);
        assert_eq!(xo.registers[VFLAG], 1);
    }

    #[test]
    fn index_increment_per_variant() {
        let program = [0xA3, 0x00, 0xF2, 0x55];
        for (kind, index) in [
            (RomKind::CHIP8, 0x303),
            (RomKind::SCHIP10, 0x302),
            (RomKind::SCHIP11, 0x300),
            (RomKind::XOCHIP, 0x303),
        ] {
            let mut interp = interpreter(kind, &program);
            run(&mut interp, 2);
            assert_eq!(interp.index, index, "{}", kind);
        }
    }

    #[test]
    fn jump_with_offset_register() {
        let mut chip8 = interpreter(RomKind::CHIP8, &[0xB3, 0x00]);
        chip8.registers[0] = 0x10;
        chip8.registers[3] = 0x20;
        run(&mut chip8, 1);
        assert_eq!(chip8.pc, 0x310);

        let mut schip = interpreter(RomKind::SCHIP11, &[0xB3, 0x00]);
        schip.registers[0] = 0x10;
        schip.registers[3] = 0x20;
        run(&mut schip, 1);
        assert_eq!(schip.pc, 0x320);
    }

    #[test]
    fn skip_steps_over_long_instruction() {
        let mut interp = interpreter(RomKind::XOCHIP, &[0x30, 0x00, 0xF0, 0x00, 0x12, 0x34, 0x60, 0x01]);
        run(&mut interp, 1);
        assert_eq!(interp.pc, 0x206);

        let mut chip8 = interpreter(RomKind::CHIP8, &[0x30, 0x00, 0xF0, 0x00]);
        run(&mut chip8, 1);
        assert_eq!(chip8.pc, 0x204);
    }

    #[test]
    fn stack_is_bounded() {
        // 0x200: call 0x200 forever
        let mut interp = interpreter(RomKind::CHIP8, &[0x22, 0x00]);
        run(&mut interp, 12);
        assert_eq!(
            interp.step(),
            Err(C8Error::StackOverflow {
                address: 0x200,
                depth: 12
            })
        );

        let mut interp = interpreter(RomKind::CHIP8, &[0x00, 0xEE]);
        assert_eq!(
            interp.step(),
            Err(C8Error::StackUnderflow { address: 0x200 })
        );
    }

    #[test]
    fn invalid_opcode_reports_location() {
        let mut interp = interpreter(RomKind::CHIP8, &[0x00, 0xFF]);
        assert_eq!(
            interp.step(),
            Err(C8Error::InvalidInstruction {
                address: 0x200,
                opcode: 0x00FF,
                kind: RomKind::CHIP8
            })
        );
    }

    #[test]
    fn wait_for_key_delivers_on_release() {
        let mut interp = interpreter(RomKind::CHIP8, &[0xF3, 0x0A, 0x60, 0x01]);
        let keypad = Arc::clone(&interp.keypad);

        run(&mut interp, 3);
        assert_eq!(interp.pc, 0x200);
        assert!(matches!(interp.state, ExecutionState::AwaitingKey { latched: None, .. }));

        keypad.press(0x7);
        run(&mut interp, 3);
        assert_eq!(
            interp.state,
            ExecutionState::AwaitingKey {
                register: 3,
                latched: Some(0x7)
            }
        );
        assert_eq!(interp.pc, 0x200);

        keypad.release(0x7);
        run(&mut interp, 1);
        assert_eq!(interp.state, ExecutionState::Running);
        assert_eq!(interp.registers[3], 0x7);
        assert_eq!(interp.pc, 0x202);

        run(&mut interp, 1);
        assert_eq!(interp.registers[0], 0x01);
    }

    #[test]
    fn wait_for_key_delivers_when_superseded() {
        let mut interp = interpreter(RomKind::CHIP8, &[0xF3, 0x0A, 0x60, 0x01]);
        let keypad = Arc::clone(&interp.keypad);

        keypad.press(0x5);
        run(&mut interp, 1);
        assert_eq!(
            interp.state,
            ExecutionState::AwaitingKey {
                register: 3,
                latched: Some(0x5)
            }
        );

        // 5 is still held when 9 goes down
        keypad.press(0x9);
        run(&mut interp, 1);
        assert_eq!(interp.state, ExecutionState::Running);
        assert_eq!(interp.registers[3], 0x5);
        assert_eq!(interp.pc, 0x202);
    }

    #[test]
    fn display_wait_blocks_until_frame_boundary() {
        let mut interp = interpreter(RomKind::CHIP8, &[0xD0, 0x01, 0x60, 0x05]);
        run(&mut interp, 3);
        assert_eq!(interp.state, ExecutionState::AwaitingDma);
        assert_eq!(interp.registers[0], 0);

        interp.tick_timers();
        run(&mut interp, 1);
        assert_eq!(interp.registers[0], 5);
    }

    #[test]
    fn register_ranges_in_both_directions() {
        let mut interp = interpreter(RomKind::XOCHIP, &[0xA4, 0x00, 0x51, 0x32, 0x53, 0x12]);
        interp.registers[1] = 0xA;
        interp.registers[2] = 0xB;
        interp.registers[3] = 0xC;
        run(&mut interp, 2);
        assert_eq!(interp.memory.read_byte(0x400), 0xA);
        assert_eq!(interp.memory.read_byte(0x402), 0xC);
        assert_eq!(interp.index, 0x400);

        run(&mut interp, 1);
        assert_eq!(interp.registers[3], 0xA);
        assert_eq!(interp.registers[2], 0xB);
        assert_eq!(interp.registers[1], 0xC);
        assert_eq!(interp.index, 0x400);
    }

    #[test]
    fn bcd_and_flags() {
        let mut interp = interpreter(RomKind::SCHIP11, &[0xA4, 0x00, 0xF0, 0x33, 0xF1, 0x75, 0xF1, 0x85]);
        interp.registers[0] = 137;
        interp.registers[1] = 9;
        run(&mut interp, 3);
        assert_eq!(interp.memory.read_byte(0x400), 1);
        assert_eq!(interp.memory.read_byte(0x401), 3);
        assert_eq!(interp.memory.read_byte(0x402), 7);
        assert_eq!(interp.flags[..2], [137, 9]);

        interp.registers[0] = 0;
        interp.registers[1] = 0;
        run(&mut interp, 1);
        assert_eq!(interp.registers[..2], [137, 9]);
    }

    #[test]
    fn random_respects_mask() {
        let mut interp = interpreter(RomKind::CHIP8, &[0xC0, 0x0F, 0x12, 0x00]);
        for _ in 0..32 {
            run(&mut interp, 2);
            assert!(interp.registers[0] <= 0x0F);
        }
    }

    #[test]
    fn exit_sets_flag() {
        let mut interp = interpreter(RomKind::SCHIP11, &[0x00, 0xFD]);
        run(&mut interp, 1);
        assert!(interp.exited);
    }

    #[test]
    fn chip8x_nibble_add_and_ports() {
        let mut interp = interpreter(RomKind::CHIP8X, &[0x51, 0x21, 0xF3, 0xFB, 0xF1, 0xF8]);
        interp.registers[1] = 0x9C;
        interp.registers[2] = 0x85;
        interp.registers[3] = 0xFF;
        run(&mut interp, 3);
        assert_eq!(interp.registers[1], 0x11);
        assert_eq!(interp.registers[3], 0x00);
        assert_eq!(
            interp.audio.waveform,
            crate::ch8::audio::Waveform::SquareWave { value: 0x11 }
        );
    }

    #[test]
    fn mega_palette_and_sprite() {
        let mut program = vec![
            0x00, 0x11, // mega on
            0xA3, 0x00, // I = 0x300
            0x02, 0x01, // load 1 palette entry
            0x03, 0x02, // sprite width 2
            0x04, 0x01, // sprite height 1
            0xA3, 0x04, // I = 0x304
            0xD0, 0x00, // draw at (V0, V0)
            0x00, 0xE0, // present
        ];
        program.resize(0x100, 0);
        program.extend_from_slice(&[0xFF, 0x11, 0x22, 0x33, 0x01, 0x01]);

        let mut interp = interpreter(RomKind::MEGACHIP, &program);
        run(&mut interp, 8);

        let mut out = vec![0; 256 * 192];
        interp.display.populate_render_buffer(&mut out).unwrap();
        assert_eq!(out[0], 0xFF112233);
        assert_eq!(out[1], 0xFF112233);
        assert_eq!(out[2], 0xFF000000);
    }
}
