// Palettes are stored as 0xAARRGGBB

pub const COLOR_PRESETS: [(&str, [u32; 16]); 6] = [
    GRAYSCALE_COLOR_PRESET,
    OCTO_COLOR_PRESET,
    LCD_COLOR_PRESET,
    HOTDOG_COLOR_PRESET,
    CGA0_COLOR_PRESET,
    CGA1_COLOR_PRESET,
];

const GRAYSCALE_COLOR_PRESET: (&str, [u32; 16]) = (
    "Grayscale",
    [
        0xFF000000, 0xFFFFFFFF, 0xFF555555, 0xFFAAAAAA,
        0xFF111111, 0xFFEEEEEE, 0xFF5C5C5C, 0xFFBBBBBB,
        0xFF222222, 0xFFDDDDDD, 0xFF777777, 0xFFCCCCCC,
        0xFF333333, 0xFF999999, 0xFF444444, 0xFF666666,
    ],
);

const OCTO_COLOR_PRESET: (&str, [u32; 16]) = ("Octo", repeat4([0xFF996600, 0xFFFFCC00, 0xFFFF6600, 0xFF662200]));

const LCD_COLOR_PRESET: (&str, [u32; 16]) = ("LCD", repeat4([0xFFF9FFB3, 0xFF3D8026, 0xFFABCC47, 0xFF00131A]));

const HOTDOG_COLOR_PRESET: (&str, [u32; 16]) = ("Hot Dog", repeat4([0xFF000000, 0xFFFF0000, 0xFFFFFF00, 0xFFFFFFFF]));

const CGA0_COLOR_PRESET: (&str, [u32; 16]) = ("CGA 0", repeat4([0xFF000000, 0xFF00FF00, 0xFFFF0000, 0xFFFFFF00]));

const CGA1_COLOR_PRESET: (&str, [u32; 16]) = ("CGA 1", repeat4([0xFF000000, 0xFFFF00FF, 0xFF00FFFF, 0xFFFFFFFF]));

const fn repeat4(colors: [u32; 4]) -> [u32; 16] {
    let mut palette = [0; 16];
    let mut i = 0;
    while i < 16 {
        palette[i] = colors[i % 4];
        i += 1;
    }
    palette
}

// VP-590 color board: foreground colors selected by 3 bits
pub const CHIP8X_FOREGROUND_COLORS: [u32; 8] = [
    0xFF000000, // black
    0xFFFF0000, // red
    0xFF0000FF, // blue
    0xFFFF00FF, // violet
    0xFF00FF00, // green
    0xFFFFFF00, // yellow
    0xFF00FFFF, // aqua
    0xFFFFFFFF, // white
];

// background cycles through these on 02A0
pub const CHIP8X_BACKGROUND_COLORS: [u32; 4] = [
    0xFF000080, // dark blue
    0xFF000000, // black
    0xFF008000, // dark green
    0xFF800000, // dark red
];

pub fn palette(id: usize) -> [u32; 16] {
    COLOR_PRESETS[id % COLOR_PRESETS.len()].1
}

pub fn palette_name(id: usize) -> &'static str {
    COLOR_PRESETS[id % COLOR_PRESETS.len()].0
}
