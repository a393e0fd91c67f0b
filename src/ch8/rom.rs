use super::{
    error::{C8Error, C8Result},
    mem::{
        CHIP8X_PROGRAM_STARTING_ADDRESS, DEFAULT_PROGRAM_MEMORY_SIZE,
        MEGACHIP_PROGRAM_MEMORY_SIZE, PROGRAM_STARTING_ADDRESS, XOCHIP_PROGRAM_MEMORY_SIZE,
    },
};

use std::{ffi::OsStr, fmt::Display, fs::read, path::Path};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RomKind {
    CHIP8,
    CHIP8X,
    SCHIP10,
    SCHIP11,
    SCHIPC,
    XOCHIP,
    MEGACHIP,
    HWCHIP64,
}

impl RomKind {
    pub const ALL: [RomKind; 8] = [
        RomKind::CHIP8,
        RomKind::CHIP8X,
        RomKind::SCHIP10,
        RomKind::SCHIP11,
        RomKind::SCHIPC,
        RomKind::XOCHIP,
        RomKind::MEGACHIP,
        RomKind::HWCHIP64,
    ];

    pub fn memory_size(self) -> usize {
        match self {
            Self::XOCHIP | Self::HWCHIP64 => XOCHIP_PROGRAM_MEMORY_SIZE,
            Self::MEGACHIP => MEGACHIP_PROGRAM_MEMORY_SIZE,
            _ => DEFAULT_PROGRAM_MEMORY_SIZE,
        }
    }

    pub fn program_starting_address(self) -> u32 {
        if self == Self::CHIP8X {
            CHIP8X_PROGRAM_STARTING_ADDRESS
        } else {
            PROGRAM_STARTING_ADDRESS
        }
    }

    pub fn max_size(self) -> usize {
        self.memory_size() - self.program_starting_address() as usize
    }

    pub fn check_rom_size(self, size: usize) -> C8Result<()> {
        if size < 2 {
            Err(C8Error::RomTooSmall(size))
        } else if size > self.max_size() {
            Err(C8Error::RomTooBig {
                size,
                max: self.max_size(),
                kind: self,
            })
        } else {
            Ok(())
        }
    }

    fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "ch8" => Some(Self::CHIP8),
            "c8x" => Some(Self::CHIP8X),
            "sc8" => Some(Self::SCHIP11),
            "xo8" => Some(Self::XOCHIP),
            "mc8" => Some(Self::MEGACHIP),
            "hw8" => Some(Self::HWCHIP64),
            _ => None,
        }
    }
}

impl Display for RomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CHIP8 => write!(f, "CHIP-8"),
            Self::CHIP8X => write!(f, "CHIP-8X"),
            Self::SCHIP10 => write!(f, "SCHIP 1.0"),
            Self::SCHIP11 => write!(f, "SCHIP 1.1"),
            Self::SCHIPC => write!(f, "SCHIP (modern)"),
            Self::XOCHIP => write!(f, "XO-CHIP"),
            Self::MEGACHIP => write!(f, "MegaChip"),
            Self::HWCHIP64 => write!(f, "HyperWaveChip64"),
        }
    }
}

#[derive(Clone)]
pub struct RomConfig {
    pub name: String,
    pub kind: RomKind,
}

#[derive(Clone)]
pub struct Rom {
    pub config: RomConfig,
    pub data: Vec<u8>,
}

impl Rom {
    pub fn new(name: impl Into<String>, kind: RomKind, data: Vec<u8>) -> C8Result<Rom> {
        kind.check_rom_size(data.len())?;
        Ok(Rom {
            config: RomConfig {
                name: name.into(),
                kind,
            },
            data,
        })
    }

    pub fn read<P: AsRef<Path>>(path: P, kind: Option<RomKind>) -> C8Result<Rom> {
        let data = read(path.as_ref())?;
        let kind = kind.unwrap_or_else(|| {
            match path
                .as_ref()
                .extension()
                .and_then(OsStr::to_str)
                .and_then(RomKind::from_extension)
            {
                Some(kind) => kind,
                None => {
                    if data.len() > RomKind::CHIP8.max_size() {
                        RomKind::XOCHIP
                    } else {
                        RomKind::CHIP8
                    }
                }
            }
        });

        let name = path
            .as_ref()
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or("Untitled")
            .to_string();

        log::info!("Read {} ({}B) as {}", name, data.len(), kind);

        Rom::new(name, kind, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_area_depends_on_variant() {
        assert_eq!(RomKind::CHIP8.max_size(), 4096 - 0x200);
        assert_eq!(RomKind::CHIP8X.max_size(), 4096 - 0x300);
        assert_eq!(RomKind::XOCHIP.max_size(), 65536 - 0x200);
        assert_eq!(RomKind::MEGACHIP.max_size(), 16_777_216 - 0x200);
    }

    #[test]
    fn oversized_rom_is_rejected() {
        let err = Rom::new("big", RomKind::SCHIP11, vec![0; 4096]).err();
        assert_eq!(
            err,
            Some(C8Error::RomTooBig {
                size: 4096,
                max: 4096 - 0x200,
                kind: RomKind::SCHIP11
            })
        );
        assert!(Rom::new("ok", RomKind::XOCHIP, vec![0; 4096]).is_ok());
    }

    #[test]
    fn tiny_rom_is_rejected() {
        assert_eq!(
            Rom::new("tiny", RomKind::CHIP8, vec![0x00]).err(),
            Some(C8Error::RomTooSmall(1))
        );
    }
}
