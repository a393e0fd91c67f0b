use super::{
    audio::{DEFAULT_SAMPLE_RATE, DEFAULT_VOLUME},
    input::KeyLayout,
    pace::DEFAULT_THROTTLE_DIVISOR,
    quirk::{QuirkOverrides, QuirkSet},
    rom::RomKind,
};

/// Settings a session is built from. Anything left as `None` falls back to the variant's defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct VMConfig {
    pub kind: RomKind,
    pub quirks: QuirkOverrides,
    pub instructions_per_frame: Option<u32>,
    pub strict: bool,
    pub palette: usize,
    pub key_layout: KeyLayout,
    pub throttle_divisor: f64,
    pub sample_rate: u32,
    pub volume: f32,
    pub rng_seed: Option<u64>,
    pub debugging: bool,
}

impl Default for VMConfig {
    fn default() -> Self {
        VMConfig::for_kind(RomKind::CHIP8)
    }
}

impl VMConfig {
    pub fn for_kind(kind: RomKind) -> Self {
        VMConfig {
            kind,
            quirks: QuirkOverrides::default(),
            instructions_per_frame: None,
            strict: false,
            palette: 0,
            key_layout: KeyLayout::default(),
            throttle_divisor: DEFAULT_THROTTLE_DIVISOR,
            sample_rate: DEFAULT_SAMPLE_RATE,
            volume: DEFAULT_VOLUME,
            rng_seed: None,
            debugging: false,
        }
    }

    /// The variant table with overrides applied
    pub fn resolve_quirks(&self) -> QuirkSet {
        let mut quirks = self.quirks.apply(QuirkSet::for_kind(self.kind));
        if let Some(instructions_per_frame) = self.instructions_per_frame {
            quirks.instructions_per_frame = instructions_per_frame.max(1);
        }
        quirks
    }

    // cycle accurate timing only exists for the original interpreter
    pub fn is_strict(&self) -> bool {
        self.strict && matches!(self.kind, RomKind::CHIP8 | RomKind::CHIP8X)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_variant() {
        let config = VMConfig::for_kind(RomKind::XOCHIP);
        assert_eq!(config.resolve_quirks(), QuirkSet::for_kind(RomKind::XOCHIP));
        assert_eq!(config.resolve_quirks().instructions_per_frame, 1000);
    }

    #[test]
    fn instruction_budget_override() {
        let config = VMConfig {
            instructions_per_frame: Some(0),
            ..VMConfig::for_kind(RomKind::CHIP8)
        };
        assert_eq!(config.resolve_quirks().instructions_per_frame, 1);
    }

    #[test]
    fn strict_mode_is_chip8_only() {
        let strict = |kind| VMConfig {
            strict: true,
            ..VMConfig::for_kind(kind)
        };
        assert!(strict(RomKind::CHIP8).is_strict());
        assert!(!strict(RomKind::SCHIP11).is_strict());
        assert!(!VMConfig::default().is_strict());
    }
}
