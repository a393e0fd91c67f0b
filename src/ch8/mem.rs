use super::{
    error::C8Result,
    rom::{Rom, RomKind},
};

pub const PROGRAM_STARTING_ADDRESS: u32 = 0x200;
pub const CHIP8X_PROGRAM_STARTING_ADDRESS: u32 = 0x300;

pub const DEFAULT_PROGRAM_MEMORY_SIZE: usize = 4096;
pub const XOCHIP_PROGRAM_MEMORY_SIZE: usize = 65536;
pub const MEGACHIP_PROGRAM_MEMORY_SIZE: usize = 16_777_216;

pub const FONT_STARTING_ADDRESS: u32 = 0x50; // store font in memory from 0x50 to 0x9F inclusive
pub const FONT_CHAR_DATA_SIZE: u32 = 5;
pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

pub const BIG_FONT_STARTING_ADDRESS: u32 = 0xA0; // store big font in memory from 0xA0 to 0x13F inclusive
pub const BIG_FONT_CHAR_DATA_SIZE: u32 = 10;
pub const BIG_FONT: [u8; 160] = [
    0x3C, 0x7E, 0xE7, 0xC3, 0xC3, 0xC3, 0xC3, 0xE7, 0x7E, 0x3C, // 0
    0x18, 0x38, 0x58, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x3C, // 1
    0x3E, 0x7F, 0xC3, 0x06, 0x0C, 0x18, 0x30, 0x60, 0xFF, 0xFF, // 2
    0x3C, 0x7E, 0xC3, 0x03, 0x0E, 0x0E, 0x03, 0xC3, 0x7E, 0x3C, // 3
    0x06, 0x0E, 0x1E, 0x36, 0x66, 0xC6, 0xFF, 0xFF, 0x06, 0x06, // 4
    0xFF, 0xFF, 0xC0, 0xC0, 0xFC, 0xFE, 0x03, 0xC3, 0x7E, 0x3C, // 5
    0x3E, 0x7C, 0xE0, 0xC0, 0xFC, 0xFE, 0xC3, 0xC3, 0x7E, 0x3C, // 6
    0xFF, 0xFF, 0x03, 0x06, 0x0C, 0x18, 0x30, 0x60, 0x60, 0x60, // 7
    0x3C, 0x7E, 0xC3, 0xC3, 0x7E, 0x7E, 0xC3, 0xC3, 0x7E, 0x3C, // 8
    0x3C, 0x7E, 0xC3, 0xC3, 0x7F, 0x3F, 0x03, 0x03, 0x3E, 0x7C, // 9
    0x7E, 0xFF, 0xC3, 0xC3, 0xC3, 0xFF, 0xFF, 0xC3, 0xC3, 0xC3, // A
    0xFC, 0xFC, 0xC3, 0xC3, 0xFC, 0xFC, 0xC3, 0xC3, 0xFC, 0xFC, // B
    0x3C, 0xFF, 0xC3, 0xC0, 0xC0, 0xC0, 0xC0, 0xC3, 0xFF, 0x3C, // C
    0xFC, 0xFE, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xFE, 0xFC, // D
    0xFF, 0xFF, 0xC0, 0xC0, 0xFF, 0xFF, 0xC0, 0xC0, 0xFF, 0xFF, // E
    0xFF, 0xFF, 0xC0, 0xC0, 0xFF, 0xFF, 0xC0, 0xC0, 0xC0, 0xC0, // F
];

/// Flat byte addressable memory. The size is always a power of two so every
/// access can be masked into bounds, out of range addresses alias into the low bits.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Vec<u8>,
    mask: u32,
}

impl Memory {
    pub fn new(kind: RomKind) -> Self {
        let size = kind.memory_size();
        let mut memory = Memory {
            bytes: vec![0; size],
            mask: (size - 1) as u32,
        };

        memory.import(&FONT, FONT_STARTING_ADDRESS);
        if kind != RomKind::CHIP8 && kind != RomKind::CHIP8X {
            memory.import(&BIG_FONT, BIG_FONT_STARTING_ADDRESS);
        }

        memory
    }

    /// Allocates memory for the ROM's variant, preloads fonts and copies the ROM at the program start
    pub fn load(rom: &Rom) -> C8Result<Self> {
        let kind = rom.config.kind;
        kind.check_rom_size(rom.data.len())?;

        let mut memory = Memory::new(kind);
        memory.import(&rom.data, kind.program_starting_address());

        log::debug!(
            "Allocated {}B of memory for {} with {}B program at {:#05X}",
            memory.len(),
            kind,
            rom.data.len(),
            kind.program_starting_address()
        );

        Ok(memory)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline(always)]
    pub fn mask_address(&self, address: u32) -> u32 {
        address & self.mask
    }

    pub fn address_add(&self, lhs: u32, rhs: u32) -> u32 {
        lhs.wrapping_add(rhs) & self.mask
    }

    #[inline(always)]
    pub fn read_byte(&self, address: u32) -> u8 {
        self.bytes[(address & self.mask) as usize]
    }

    #[inline(always)]
    pub fn write_byte(&mut self, address: u32, value: u8) {
        self.bytes[(address & self.mask) as usize] = value;
    }

    pub fn read_word(&self, address: u32) -> u16 {
        u16::from_be_bytes([self.read_byte(address), self.read_byte(address.wrapping_add(1))])
    }

    pub fn read_u24(&self, address: u32) -> u32 {
        (self.read_byte(address) as u32) << 16
            | (self.read_byte(address.wrapping_add(1)) as u32) << 8
            | self.read_byte(address.wrapping_add(2)) as u32
    }

    pub fn export(&self, address: u32, dst: &mut [u8]) {
        let address = (address & self.mask) as usize;

        let pivot = dst.len().min(self.bytes.len() - address);
        let (dst0, dst1) = dst.split_at_mut(pivot);

        dst0.copy_from_slice(&self.bytes[address..address + dst0.len()]);

        // anything past the end wraps around to the start (possibly more than once)
        for (i, byte) in dst1.iter_mut().enumerate() {
            *byte = self.bytes[i & self.mask as usize];
        }
    }

    pub fn import(&mut self, src: &[u8], address: u32) {
        let address = (address & self.mask) as usize;

        let pivot = src.len().min(self.bytes.len() - address);
        let (src0, src1) = src.split_at(pivot);

        self.bytes[address..address + src0.len()].copy_from_slice(src0);

        for (i, byte) in src1.iter().enumerate() {
            self.bytes[i & self.mask as usize] = *byte;
        }
    }
}
