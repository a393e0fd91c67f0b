use super::{disp::DrawMode, quirk::QuirkSet};

// Takes 32 bits (longest instruction size) and decomposes it into its parts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstructionParameters {
    pub bits: u32,
    pub op: u8,
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub nn: u8,
    pub nnn: u16,
    pub nnnn: u16,
}

impl From<[u8; 4]> for InstructionParameters {
    fn from(bytes: [u8; 4]) -> Self {
        InstructionParameters::new(u32::from_be_bytes(bytes))
    }
}

impl InstructionParameters {
    pub fn new(bits: u32) -> Self {
        InstructionParameters {
            bits,
            op  : ((bits & 0xF0000000) >> (4 * 7)) as u8,
            x   : ((bits & 0x0F000000) >> (4 * 6)) as u8,
            y   : ((bits & 0x00F00000) >> (4 * 5)) as u8,
            n   : ((bits & 0x000F0000) >> (4 * 4)) as u8,
            nn  : ((bits & 0x00FF0000) >> (4 * 4)) as u8,
            nnn : ((bits & 0x0FFF0000) >> (4 * 4)) as u16,
            nnnn: (bits & 0x0000FFFF) as u16,
        }
    }

    pub fn opcode(&self) -> u16 {
        (self.bits >> 16) as u16
    }

    /// Decodes against the active variant, `None` when the opcode does not exist there
    pub fn try_decode(&self, quirks: &QuirkSet) -> Option<Instruction> {
        let InstructionParameters {
            op,
            x,
            y,
            n,
            nn,
            nnn,
            nnnn,
            ..
        } = *self;

        // overlapping encodings are resolved by the capabilities of the variant
        let instruction = match (op, x, y, n) {
            (0x0, 0x0, 0xE, 0x0) => Instruction::ClearScreen,
            (0x0, 0x0, 0xE, 0xE) => Instruction::SubroutineReturn,
            (0x0, 0x0, 0xE, 0x1) => Instruction::InvertScreen,
            (0x0, 0x0, 0xB, __n) if quirks.megachip => Instruction::ScrollUp(n),
            (0x0, 0x0, 0xC, __n) => Instruction::ScrollDown(n),
            (0x0, 0x0, 0xD, __n) if quirks.xo_chip => Instruction::ScrollUp(n),
            (0x0, 0x0, 0xF, 0x1) => Instruction::SetDrawMode(DrawMode::Or),
            (0x0, 0x0, 0xF, 0x2) => Instruction::SetDrawMode(DrawMode::Subtract),
            (0x0, 0x0, 0xF, 0x3) => Instruction::SetDrawMode(DrawMode::Xor),
            (0x0, 0x0, 0xF, 0xB) => Instruction::ScrollRight,
            (0x0, 0x0, 0xF, 0xC) => Instruction::ScrollLeft,
            (0x0, 0x0, 0xF, 0xD) => Instruction::Exit,
            (0x0, 0x0, 0xF, 0xE) => Instruction::LowResolution,
            (0x0, 0x0, 0xF, 0xF) => Instruction::HighResolution,
            (0x0, 0x0, 0x1, 0x0) => Instruction::MegaOff,
            (0x0, 0x0, 0x1, 0x1) => Instruction::MegaOn,
            (0x0, 0x1, __y, __n) => {
                Instruction::SetIndexToU24((nn as u32) << 16 | nnnn as u32)
            }
            (0x0, 0x2, 0xA, 0x0) if quirks.chip8x => Instruction::StepBackgroundColor,
            (0x0, 0x2, __y, __n) => Instruction::LoadPalette(nn),
            (0x0, 0x3, __y, __n) => Instruction::SetSpriteWidth(nn),
            (0x0, 0x4, __y, __n) => Instruction::SetSpriteHeight(nn),
            (0x0, 0x5, __y, __n) => Instruction::SetScreenAlpha(nn),
            (0x0, 0x6, 0x0, __n) => Instruction::PlayDigitized(n == 0),
            (0x0, 0x7, 0x0, 0x0) => Instruction::StopDigitized,
            (0x0, 0x8, 0x0, __n) => Instruction::SetBlendMode(n),
            (0x0, 0x9, __y, __n) => Instruction::SetCollisionColor(nn),
            (0x1, __x, __y, __n) => Instruction::Jump(nnn),
            (0x2, __x, __y, __n) => Instruction::CallSubroutine(nnn),
            (0x3, __x, __y, __n) => Instruction::SkipIfEqualsConstant(x, nn),
            (0x4, __x, __y, __n) => Instruction::SkipIfNotEqualsConstant(x, nn),
            (0x5, __x, __y, 0x0) => Instruction::SkipIfEquals(x, y),
            (0x5, __x, __y, 0x1) => Instruction::NibbleAdd(x, y),
            (0x5, __x, __y, 0x2) => Instruction::StoreRange(x, y),
            (0x5, __x, __y, 0x3) => Instruction::LoadRange(x, y),
            (0x6, __x, __y, __n) => Instruction::SetConstant(x, nn),
            (0x7, __x, __y, __n) => Instruction::AddConstant(x, nn),
            (0x8, __x, __y, 0x0) => Instruction::Set(x, y),
            (0x8, __x, __y, 0x1) => Instruction::Or(x, y),
            (0x8, __x, __y, 0x2) => Instruction::And(x, y),
            (0x8, __x, __y, 0x3) => Instruction::Xor(x, y),
            (0x8, __x, __y, 0x4) => Instruction::Add(x, y),
            (0x8, __x, __y, 0x5) => Instruction::Sub(x, y, true),
            (0x8, __x, __y, 0x6) => Instruction::Shift(x, y, true),
            (0x8, __x, __y, 0x7) => Instruction::Sub(x, y, false),
            (0x8, __x, __y, 0xE) => Instruction::Shift(x, y, false),
            (0x9, __x, __y, 0x0) => Instruction::SkipIfNotEquals(x, y),
            (0xA, __x, __y, __n) => Instruction::SetIndex(nnn),
            (0xB, __x, __y, __n) if quirks.chip8x => Instruction::SetColorZone(x, y, n),
            (0xB, __x, __y, __n) => Instruction::JumpWithOffset(nnn, x),
            (0xC, __x, __y, __n) => Instruction::GenerateRandom(x, nn),
            (0xD, __x, __y, __n) => Instruction::Draw(x, y, n),
            (0xE, __x, 0x9, 0xE) => Instruction::SkipIfKeyDown(x),
            (0xE, __x, 0xA, 0x1) => Instruction::SkipIfKeyNotDown(x),
            (0xE, __x, 0xF, 0x2) => Instruction::SkipIfSecondKeyDown(x),
            (0xE, __x, 0xF, 0x5) => Instruction::SkipIfSecondKeyNotDown(x),
            (0xF, 0x0, 0x0, 0x0) => Instruction::SetIndexToLong(nnnn),
            (0xF, __x, 0x0, 0x1) => Instruction::SetPlane(x),
            (0xF, 0x0, 0x0, 0x2) => Instruction::LoadAudio,
            (0xF, __x, 0x0, 0x7) => Instruction::GetDelayTimer(x),
            (0xF, __x, 0x0, 0xA) => Instruction::WaitForKey(x),
            (0xF, __x, 0x1, 0x5) => Instruction::SetDelayTimer(x),
            (0xF, __x, 0x1, 0x8) => Instruction::SetSoundTimer(x),
            (0xF, __x, 0x1, 0xE) => Instruction::AddToIndex(x),
            (0xF, __x, 0x2, 0x9) => Instruction::SetIndexToHexChar(x),
            (0xF, __x, 0x3, 0x0) => Instruction::SetIndexToBigHexChar(x),
            (0xF, __x, 0x3, 0x3) => Instruction::StoreBinaryCodedDecimal(x),
            (0xF, __x, 0x3, 0xA) => Instruction::SetPitch(x),
            (0xF, __x, 0x5, 0x5) => Instruction::Store(x),
            (0xF, __x, 0x6, 0x5) => Instruction::Load(x),
            (0xF, __x, 0x7, 0x5) => Instruction::StoreFlags(x),
            (0xF, __x, 0x8, 0x5) => Instruction::LoadFlags(x),
            (0xF, __x, 0xF, 0x8) => Instruction::OutputSound(x),
            (0xF, __x, 0xF, 0xB) => Instruction::InputPort(x),
            _ => return None,
        };

        if instruction.is_supported(quirks) {
            Some(instruction)
        } else {
            None
        }
    }
}

impl std::fmt::Display for InstructionParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04X} (op = {:#X?}, x = {:?}, y = {:?}, n = {:?}, nn = {:?}, nnn = {:?}, nnnn = {:?})",
            self.opcode(), self.op, self.x, self.y, self.n, self.nn, self.nnn, self.nnnn
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Exit,
    Jump(u16),
    JumpWithOffset(u16, u8),
    CallSubroutine(u16),
    SubroutineReturn,
    SkipIfEqualsConstant(u8, u8),
    SkipIfNotEqualsConstant(u8, u8),
    SkipIfEquals(u8, u8),
    SkipIfNotEquals(u8, u8),
    SkipIfKeyDown(u8),
    SkipIfKeyNotDown(u8),
    SkipIfSecondKeyDown(u8),
    SkipIfSecondKeyNotDown(u8),
    WaitForKey(u8),
    SetConstant(u8, u8),
    AddConstant(u8, u8),
    Set(u8, u8),
    Or(u8, u8),
    And(u8, u8),
    Xor(u8, u8),
    Add(u8, u8),
    Sub(u8, u8, bool),
    Shift(u8, u8, bool),
    NibbleAdd(u8, u8),
    GetDelayTimer(u8),
    SetDelayTimer(u8),
    SetSoundTimer(u8),
    SetIndex(u16),
    SetIndexToLong(u16),
    SetIndexToU24(u32),
    SetIndexToHexChar(u8),
    SetIndexToBigHexChar(u8),
    AddToIndex(u8),
    Load(u8),
    Store(u8),
    LoadRange(u8, u8),
    StoreRange(u8, u8),
    LoadFlags(u8),
    StoreFlags(u8),
    StoreBinaryCodedDecimal(u8),
    GenerateRandom(u8, u8),
    SetPlane(u8),
    Draw(u8, u8, u8),
    ScrollUp(u8),
    ScrollDown(u8),
    ScrollLeft,
    ScrollRight,
    LowResolution,
    HighResolution,
    ClearScreen,
    InvertScreen,
    SetDrawMode(DrawMode),
    LoadAudio,
    SetPitch(u8),
    StepBackgroundColor,
    SetColorZone(u8, u8, u8),
    OutputSound(u8),
    InputPort(u8),
    MegaOff,
    MegaOn,
    LoadPalette(u8),
    SetSpriteWidth(u8),
    SetSpriteHeight(u8),
    SetScreenAlpha(u8),
    PlayDigitized(bool),
    StopDigitized,
    SetBlendMode(u8),
    SetCollisionColor(u8),
}

impl Instruction {
    pub const MAX_INSTRUCTION_SIZE: u16 = 4;

    pub fn size(&self) -> u16 {
        match self {
            Instruction::SetIndexToLong(_) | Instruction::SetIndexToU24(_) => 4,
            _ => 2,
        }
    }

    fn is_supported(&self, quirks: &QuirkSet) -> bool {
        match *self {
            Instruction::Exit
            | Instruction::LowResolution
            | Instruction::HighResolution
            | Instruction::ScrollDown(_)
            | Instruction::ScrollRight
            | Instruction::ScrollLeft
            | Instruction::SetIndexToBigHexChar(_) => quirks.has_hires(),

            Instruction::LoadFlags(vx) | Instruction::StoreFlags(vx) => {
                quirks.has_hires() && vx <= quirks.max_flag_register()
            }

            Instruction::LoadAudio
            | Instruction::SetPitch(_)
            | Instruction::LoadRange(_, _)
            | Instruction::StoreRange(_, _)
            | Instruction::SetIndexToLong(_) => quirks.xo_chip,

            Instruction::SetPlane(planes) => quirks.xo_chip && planes >> quirks.plane_count == 0,

            // the only encodings that reach here are guarded during decode
            Instruction::ScrollUp(_) => true,

            Instruction::InvertScreen | Instruction::SetDrawMode(_) => quirks.hyperwave,

            Instruction::NibbleAdd(_, _)
            | Instruction::SkipIfSecondKeyDown(_)
            | Instruction::SkipIfSecondKeyNotDown(_)
            | Instruction::StepBackgroundColor
            | Instruction::SetColorZone(_, _, _)
            | Instruction::OutputSound(_)
            | Instruction::InputPort(_) => quirks.chip8x,

            Instruction::SetBlendMode(mode) => quirks.megachip && mode <= 5,

            Instruction::MegaOff
            | Instruction::MegaOn
            | Instruction::SetIndexToU24(_)
            | Instruction::LoadPalette(_)
            | Instruction::SetSpriteWidth(_)
            | Instruction::SetSpriteHeight(_)
            | Instruction::SetScreenAlpha(_)
            | Instruction::PlayDigitized(_)
            | Instruction::StopDigitized
            | Instruction::SetCollisionColor(_) => quirks.megachip,

            _ => true,
        }
    }

    /// Machine cycles the COSMAC VIP interpreter spends on this instruction, `v` are the registers before execution
    pub fn vip_cycles(&self, v: &[u8; 16]) -> u32 {
        match *self {
            Instruction::ClearScreen => 24 + 3054,
            Instruction::SubroutineReturn => 10 + 32,
            Instruction::Jump(_) => 12,
            Instruction::JumpWithOffset(_, _) => 22,
            Instruction::CallSubroutine(_) => 26,
            Instruction::SkipIfEqualsConstant(_, _)
            | Instruction::SkipIfNotEqualsConstant(_, _) => 10,
            Instruction::SkipIfEquals(_, _) | Instruction::SkipIfNotEquals(_, _) => 14,
            Instruction::SkipIfKeyDown(_) | Instruction::SkipIfKeyNotDown(_) => 14,
            Instruction::SetConstant(_, _) => 6,
            Instruction::AddConstant(_, _) => 10,
            Instruction::Set(_, _)
            | Instruction::Or(_, _)
            | Instruction::And(_, _)
            | Instruction::Xor(_, _)
            | Instruction::Add(_, _)
            | Instruction::Sub(_, _, _)
            | Instruction::Shift(_, _, _) => 44,
            Instruction::SetIndex(_) => 12,
            Instruction::GenerateRandom(_, _) => 36,
            Instruction::Draw(vx, _, n) => {
                let unaligned = v[vx as usize & 0xF] % 8 != 0;
                68 + n as u32 * (46 + if unaligned { 20 } else { 0 })
            }
            Instruction::GetDelayTimer(_) => 10,
            Instruction::WaitForKey(_) => 10,
            Instruction::SetDelayTimer(_) | Instruction::SetSoundTimer(_) => 10,
            Instruction::AddToIndex(_) => 16,
            Instruction::SetIndexToHexChar(_) => 20,
            Instruction::StoreBinaryCodedDecimal(vx) => {
                let value = v[vx as usize & 0xF] as u32;
                84 + 16 * (value / 100 + value / 10 % 10 + value % 10)
            }
            Instruction::Store(vx) | Instruction::Load(vx) => 14 + 14 * (vx as u32 + 1),
            _ => 12,
        }
    }
}
