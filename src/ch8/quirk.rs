use super::rom::RomKind;

/// How FX55 / FX65 leave the index register behind
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IndexIncrement {
    Unchanged,
    ByX,
    ByXPlusOne,
}

/// Variant specific behaviour, resolved once when a session is built and never mutated afterwards
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct QuirkSet {
    // opcode quirks (overridable)
    pub vf_reset: bool,
    pub index_increment: IndexIncrement,
    pub display_wait: bool,
    pub wrap: bool,
    pub shift_in_place: bool,
    pub jump_with_vx: bool,
    pub instructions_per_frame: u32,

    // capabilities
    pub schip_class: bool,
    pub legacy_schip: bool,
    pub xo_chip: bool,
    pub big_sprites: bool,
    pub lores_doubling: bool,
    pub clear_on_mode_switch: bool,
    pub plane_count: u8,
    pub palette_depth: usize,
    pub stack_depth: usize,
    pub megachip: bool,
    pub hyperwave: bool,
    pub chip8x: bool,
}

const CHIP8_QUIRKS: QuirkSet = QuirkSet {
    vf_reset: true,
    index_increment: IndexIncrement::ByXPlusOne,
    display_wait: true,
    wrap: false,
    shift_in_place: false,
    jump_with_vx: false,
    instructions_per_frame: 15,

    schip_class: false,
    legacy_schip: false,
    xo_chip: false,
    big_sprites: false,
    lores_doubling: false,
    clear_on_mode_switch: true,
    plane_count: 1,
    palette_depth: 16,
    stack_depth: 12,
    megachip: false,
    hyperwave: false,
    chip8x: false,
};

const SCHIP_QUIRKS: QuirkSet = QuirkSet {
    vf_reset: false,
    index_increment: IndexIncrement::Unchanged,
    display_wait: false,
    wrap: false,
    shift_in_place: true,
    jump_with_vx: true,
    instructions_per_frame: 30,

    schip_class: true,
    legacy_schip: true,
    xo_chip: false,
    big_sprites: true,
    lores_doubling: true,
    clear_on_mode_switch: false,
    plane_count: 1,
    palette_depth: 16,
    stack_depth: 16,
    megachip: false,
    hyperwave: false,
    chip8x: false,
};

const XOCHIP_QUIRKS: QuirkSet = QuirkSet {
    vf_reset: false,
    index_increment: IndexIncrement::ByXPlusOne,
    display_wait: false,
    wrap: true,
    shift_in_place: false,
    jump_with_vx: false,
    instructions_per_frame: 1000,

    schip_class: false,
    legacy_schip: false,
    xo_chip: true,
    big_sprites: true,
    lores_doubling: true,
    clear_on_mode_switch: true,
    plane_count: 4,
    palette_depth: 16,
    stack_depth: 16,
    megachip: false,
    hyperwave: false,
    chip8x: false,
};

impl QuirkSet {
    /// The variant table: every behavioural difference between variants is data looked up here
    pub fn for_kind(kind: RomKind) -> Self {
        match kind {
            RomKind::CHIP8 => CHIP8_QUIRKS,
            RomKind::CHIP8X => QuirkSet {
                chip8x: true,
                ..CHIP8_QUIRKS
            },
            RomKind::SCHIP10 => QuirkSet {
                index_increment: IndexIncrement::ByX,
                ..SCHIP_QUIRKS
            },
            RomKind::SCHIP11 => SCHIP_QUIRKS,
            RomKind::SCHIPC => QuirkSet {
                legacy_schip: false,
                clear_on_mode_switch: true,
                ..SCHIP_QUIRKS
            },
            RomKind::XOCHIP => XOCHIP_QUIRKS,
            RomKind::HWCHIP64 => QuirkSet {
                hyperwave: true,
                ..XOCHIP_QUIRKS
            },
            RomKind::MEGACHIP => QuirkSet {
                legacy_schip: false,
                clear_on_mode_switch: true,
                instructions_per_frame: 3000,
                palette_depth: 256,
                megachip: true,
                ..SCHIP_QUIRKS
            },
        }
    }

    /// Physical (width, height) of the framebuffer outside of MegaChip mode
    pub fn base_resolution(&self) -> (usize, usize) {
        if self.lores_doubling {
            (128, 64)
        } else {
            (64, 32)
        }
    }

    pub fn has_hires(&self) -> bool {
        self.schip_class || self.xo_chip
    }

    pub fn max_flag_register(&self) -> u8 {
        if self.xo_chip {
            0xF
        } else {
            0x7
        }
    }
}

/// Per quirk overrides applied on top of the variant table
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct QuirkOverrides {
    pub vf_reset: Option<bool>,
    pub increment_index: Option<bool>,
    pub display_wait: Option<bool>,
    pub wrap: Option<bool>,
    pub shift_in_place: Option<bool>,
    pub jump_with_vx: Option<bool>,
}

impl QuirkOverrides {
    pub fn apply(&self, mut quirks: QuirkSet) -> QuirkSet {
        if let Some(vf_reset) = self.vf_reset {
            quirks.vf_reset = vf_reset;
        }
        if let Some(increment) = self.increment_index {
            quirks.index_increment = match (increment, quirks.index_increment) {
                (false, _) => IndexIncrement::Unchanged,
                (true, IndexIncrement::Unchanged) => IndexIncrement::ByXPlusOne,
                (true, prior) => prior,
            };
        }
        if let Some(display_wait) = self.display_wait {
            quirks.display_wait = display_wait;
        }
        if let Some(wrap) = self.wrap {
            quirks.wrap = wrap;
        }
        if let Some(shift_in_place) = self.shift_in_place {
            quirks.shift_in_place = shift_in_place;
        }
        if let Some(jump_with_vx) = self.jump_with_vx {
            quirks.jump_with_vx = jump_with_vx;
        }
        quirks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_source_follows_variant() {
        for kind in [RomKind::CHIP8, RomKind::CHIP8X, RomKind::XOCHIP, RomKind::HWCHIP64] {
            assert!(!QuirkSet::for_kind(kind).shift_in_place, "{}", kind);
        }
        for kind in [RomKind::SCHIP10, RomKind::SCHIP11, RomKind::SCHIPC, RomKind::MEGACHIP] {
            assert!(QuirkSet::for_kind(kind).shift_in_place, "{}", kind);
        }
    }

    #[test]
    fn only_original_chip8_resets_vf() {
        for kind in RomKind::ALL {
            let quirks = QuirkSet::for_kind(kind);
            assert_eq!(
                quirks.vf_reset,
                matches!(kind, RomKind::CHIP8 | RomKind::CHIP8X),
                "{}",
                kind
            );
        }
    }

    #[test]
    fn overrides_replace_table_values() {
        let quirks = QuirkOverrides {
            wrap: Some(true),
            increment_index: Some(false),
            ..Default::default()
        }
        .apply(QuirkSet::for_kind(RomKind::CHIP8));

        assert!(quirks.wrap);
        assert_eq!(quirks.index_increment, IndexIncrement::Unchanged);
        assert!(quirks.vf_reset);
    }
}
