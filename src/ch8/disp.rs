use super::{
    error::{C8Error, C8Result},
    preset::{CHIP8X_BACKGROUND_COLORS, CHIP8X_FOREGROUND_COLORS},
    quirk::QuirkSet,
};

pub const MEGA_DISPLAY_WIDTH: usize = 256;
pub const MEGA_DISPLAY_HEIGHT: usize = 192;

// Chip8X color zones are 8x4 pixel blocks over the 64x32 screen
const ZONE_WIDTH: usize = 8;
const ZONE_HEIGHT: usize = 4;
const ZONE_COLUMNS: usize = 64 / ZONE_WIDTH;
const ZONE_ROWS: usize = 32 / ZONE_HEIGHT;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DisplayMode {
    LowResolution,
    HighResolution,
    MegaResolution,
}

/// How a set sprite bit combines with the pixel under it
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DrawMode {
    Xor,
    Or,
    Subtract,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlendMode {
    Normal,
    Alpha25,
    Alpha50,
    Alpha75,
    Additive,
    Multiply,
}

impl BlendMode {
    pub fn from_nibble(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::Normal),
            1 => Some(Self::Alpha25),
            2 => Some(Self::Alpha50),
            3 => Some(Self::Alpha75),
            4 => Some(Self::Additive),
            5 => Some(Self::Multiply),
            _ => None,
        }
    }

    pub fn blend(self, dst: u32, src: u32) -> u32 {
        let channel = |color: u32, shift: u32| (color >> shift) & 0xFF;
        let mix = |f: &dyn Fn(u32, u32) -> u32| {
            [16, 8, 0].iter().fold(0xFF000000, |color, &shift| {
                color | f(channel(dst, shift), channel(src, shift)).min(0xFF) << shift
            })
        };

        match self {
            Self::Normal => {
                if src >> 24 == 0 {
                    dst
                } else {
                    src
                }
            }
            Self::Alpha25 => mix(&|d, s| (d * 3 + s) / 4),
            Self::Alpha50 => mix(&|d, s| (d + s) / 2),
            Self::Alpha75 => mix(&|d, s| (d + s * 3) / 4),
            Self::Additive => mix(&|d, s| d + s),
            Self::Multiply => mix(&|d, s| d * s / 0xFF),
        }
    }
}

/// MegaChip 8-bit indexed drawing over a double buffered ARGB pair
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MegaLayer {
    pub front: Vec<u32>,
    pub back: Vec<u32>,
    pub index: Vec<u8>,
    pub palette: Vec<u32>,
    pub blend_mode: BlendMode,
    pub screen_alpha: u8,
    pub collision_color: u8,
    pub sprite_width: usize,
    pub sprite_height: usize,
}

impl MegaLayer {
    fn new(palette_depth: usize) -> Self {
        let area = MEGA_DISPLAY_WIDTH * MEGA_DISPLAY_HEIGHT;
        let mut palette = vec![0xFFFFFFFF; palette_depth];
        palette[0] = 0x00000000;
        MegaLayer {
            front: vec![0xFF000000; area],
            back: vec![0xFF000000; area],
            index: vec![0; area],
            palette,
            blend_mode: BlendMode::Normal,
            screen_alpha: 0xFF,
            collision_color: 0,
            sprite_width: 0,
            sprite_height: 0,
        }
    }
}

/// Chip8X color board state
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ColorZones {
    pub background: usize,
    pub zones: [u8; ZONE_COLUMNS * ZONE_ROWS],
}

impl Default for ColorZones {
    fn default() -> Self {
        // zones start red like the VP-590 after reset
        ColorZones {
            background: 0,
            zones: [1; ZONE_COLUMNS * ZONE_ROWS],
        }
    }
}

// Each plane is a row major grid of the current physical resolution where a nonzero byte is a lit pixel
pub type DisplayBuffer = Vec<u8>;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Display {
    pub selected_plane_bitflags: u8,
    pub mode: DisplayMode,
    pub draw_mode: DrawMode,
    pub planes: [DisplayBuffer; 4],
    pub colors: [u32; 16],
    pub mega: Option<MegaLayer>,
    pub zones: Option<ColorZones>,
    width: usize,
    height: usize,
    lores_doubling: bool,
    plane_count: u8,
    palette_depth: usize,
}

impl Display {
    pub fn new(quirks: &QuirkSet, colors: [u32; 16]) -> Self {
        let (width, height) = quirks.base_resolution();
        Display {
            selected_plane_bitflags: 0b0001,
            mode: DisplayMode::LowResolution,
            draw_mode: DrawMode::Xor,
            planes: std::array::from_fn(|_| vec![0; width * height]),
            colors,
            mega: None,
            zones: if quirks.chip8x {
                Some(ColorZones::default())
            } else {
                None
            },
            width,
            height,
            lores_doubling: quirks.lores_doubling,
            plane_count: quirks.plane_count,
            palette_depth: quirks.palette_depth,
        }
    }

    /// Physical size of the framebuffer (and of the render buffer)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Size of the coordinate space sprites are positioned in
    pub fn logical_dimensions(&self) -> (usize, usize) {
        let scale = self.scale();
        (self.width / scale, self.height / scale)
    }

    pub fn is_extended(&self) -> bool {
        self.mode != DisplayMode::LowResolution
    }

    pub fn plane_count(&self) -> u8 {
        self.plane_count
    }

    fn scale(&self) -> usize {
        if self.lores_doubling && self.mode == DisplayMode::LowResolution {
            2
        } else {
            1
        }
    }

    pub fn set_mode(&mut self, mode: DisplayMode, clear: bool) {
        let was_mega = self.mode == DisplayMode::MegaResolution;
        self.mode = mode;

        if mode == DisplayMode::MegaResolution && !was_mega {
            self.resize(MEGA_DISPLAY_WIDTH, MEGA_DISPLAY_HEIGHT);
            if self.mega.is_none() {
                self.mega = Some(MegaLayer::new(self.palette_depth));
            }
        } else if mode != DisplayMode::MegaResolution && was_mega {
            self.resize(128, 64);
        } else if clear {
            self.clear(0b1111);
        }

        log::debug!("Display mode set to {:?} ({}x{})", mode, self.width, self.height);
    }

    fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        for plane in self.planes.iter_mut() {
            *plane = vec![0; width * height];
        }
    }

    fn selected_planes(&self, plane_mask: u8) -> impl Iterator<Item = usize> {
        let plane_count = self.plane_count as usize;
        (0..plane_count).filter(move |i| plane_mask >> i & 1 == 1)
    }

    /// XORs a physical pixel and reports whether it was turned off
    pub fn toggle_pixel(&mut self, plane: usize, x: usize, y: usize) -> bool {
        let pixel = &mut self.planes[plane][y * self.width + x];
        *pixel ^= 1;
        *pixel == 0
    }

    /// Applies one sprite pixel with the given draw mode, true when a lit pixel was turned off
    pub fn set_pixel(&mut self, plane: usize, x: usize, y: usize, mode: DrawMode) -> bool {
        match mode {
            DrawMode::Xor => self.toggle_pixel(plane, x, y),
            DrawMode::Or => {
                self.planes[plane][y * self.width + x] = 1;
                false
            }
            DrawMode::Subtract => {
                let pixel = &mut self.planes[plane][y * self.width + x];
                let was_on = *pixel != 0;
                *pixel = 0;
                was_on
            }
        }
    }

    fn draw_logical_pixel(&mut self, plane: usize, x: usize, y: usize) -> bool {
        let scale = self.scale();
        let mut collided = false;
        for dy in 0..scale {
            for dx in 0..scale {
                collided |= self.set_pixel(plane, x * scale + dx, y * scale + dy, self.draw_mode);
            }
        }
        collided
    }

    pub fn pixel(&self, plane: usize, x: usize, y: usize) -> bool {
        self.planes[plane][y * self.width + x] != 0
    }

    pub fn clear(&mut self, plane_mask: u8) {
        for i in self.selected_planes(plane_mask).collect::<Vec<_>>() {
            self.planes[i].fill(0);
        }
    }

    pub fn invert(&mut self, plane_mask: u8) {
        for i in self.selected_planes(plane_mask).collect::<Vec<_>>() {
            self.planes[i].iter_mut().for_each(|pixel| *pixel ^= 1);
        }
    }

    pub fn scroll_up(&mut self, amount: usize, plane_mask: u8) {
        self.scroll(0, -(amount as isize), plane_mask);
    }

    pub fn scroll_down(&mut self, amount: usize, plane_mask: u8) {
        self.scroll(0, amount as isize, plane_mask);
    }

    pub fn scroll_left(&mut self, amount: usize, plane_mask: u8) {
        self.scroll(-(amount as isize), 0, plane_mask);
    }

    pub fn scroll_right(&mut self, amount: usize, plane_mask: u8) {
        self.scroll(amount as isize, 0, plane_mask);
    }

    fn scroll(&mut self, dx: isize, dy: isize, plane_mask: u8) {
        let (width, height) = (self.width, self.height);
        if self.mode == DisplayMode::MegaResolution {
            if let Some(mega) = self.mega.as_mut() {
                shift_grid(&mut mega.back, width, height, dx, dy, 0xFF000000);
                shift_grid(&mut mega.index, width, height, dx, dy, 0);
            }
            return;
        }

        for i in self.selected_planes(plane_mask).collect::<Vec<_>>() {
            shift_grid(&mut self.planes[i], width, height, dx, dy, 0);
        }
    }

    /// Draws a monochrome sprite on every plane in `plane_mask`, each plane consuming its own
    /// `rows * bytes_per_row` slice of `sprite`. Returns the value VF should take.
    pub fn draw(
        &mut self,
        sprite: &[u8],
        pos_x: usize,
        pos_y: usize,
        rows: usize,
        bytes_per_row: usize,
        plane_mask: u8,
        options: SpriteOptions,
    ) -> u8 {
        let (width, height) = self.logical_dimensions();
        let pos_x = pos_x % width;
        let pos_y = pos_y % height;
        let sprite_bytes = rows * bytes_per_row;
        let count_rows = options.count_row_collisions && self.is_extended();

        let mut collided = false;
        let mut collided_rows = 0u8;

        for (i, plane) in self.selected_planes(plane_mask).collect::<Vec<_>>().into_iter().enumerate() {
            let Some(plane_sprite) = sprite.get(sprite_bytes * i..sprite_bytes * (i + 1)) else {
                break;
            };

            for (row, row_bytes) in plane_sprite.chunks_exact(bytes_per_row).enumerate() {
                let mut y = pos_y + row;
                if y >= height {
                    if count_rows {
                        collided_rows = collided_rows.saturating_add(1);
                        continue;
                    } else if options.wrap {
                        y %= height;
                    } else {
                        break;
                    }
                }

                let mut row_collided = false;
                for col in 0..8 * bytes_per_row {
                    if row_bytes[col / 8] >> (7 - col % 8) & 1 == 0 {
                        continue;
                    }

                    let mut x = pos_x + col;
                    if x >= width {
                        if options.wrap {
                            x %= width;
                        } else {
                            break;
                        }
                    }

                    row_collided |= self.draw_logical_pixel(plane, x, y);
                }

                if row_collided {
                    collided = true;
                    collided_rows = collided_rows.saturating_add(1);
                }
            }
        }

        if count_rows {
            collided_rows
        } else {
            collided as u8
        }
    }

    /// Draws a MegaChip indexed sprite (one palette index per byte, index 0 is transparent) into the back buffer
    pub fn draw_mega(&mut self, sprite: &[u8], pos_x: usize, pos_y: usize) -> bool {
        let Some((sprite_width, sprite_height)) = self
            .mega
            .as_ref()
            .map(|mega| (mega.sprite_width, mega.sprite_height))
        else {
            return false;
        };
        self.blit_mega(sprite, sprite_width, sprite_height, pos_x, pos_y)
    }

    /// Draws a monochrome sprite (font glyphs) into the MegaChip back buffer using the last palette entry
    pub fn draw_mega_mono(&mut self, sprite: &[u8], rows: usize, bytes_per_row: usize, pos_x: usize, pos_y: usize) -> bool {
        let Some(color_index) = self.mega.as_ref().map(|mega| (mega.palette.len() - 1) as u8) else {
            return false;
        };

        let width = 8 * bytes_per_row;
        let indexed: Vec<u8> = sprite
            .iter()
            .take(rows * bytes_per_row)
            .flat_map(|byte| (0..8).rev().map(move |bit| byte >> bit & 1))
            .map(|bit| bit * color_index)
            .collect();

        self.blit_mega(&indexed, width, rows, pos_x, pos_y)
    }

    fn blit_mega(
        &mut self,
        sprite: &[u8],
        sprite_width: usize,
        sprite_height: usize,
        pos_x: usize,
        pos_y: usize,
    ) -> bool {
        let Some(mega) = self.mega.as_mut() else {
            return false;
        };

        let mut collided = false;

        for (row, row_bytes) in sprite
            .chunks_exact(sprite_width.max(1))
            .take(sprite_height)
            .enumerate()
        {
            let y = pos_y + row;
            if y >= MEGA_DISPLAY_HEIGHT {
                break;
            }

            for (col, &color_index) in row_bytes.iter().enumerate() {
                let x = pos_x + col;
                if x >= MEGA_DISPLAY_WIDTH {
                    break;
                }
                if color_index == 0 {
                    continue;
                }

                let offset = y * MEGA_DISPLAY_WIDTH + x;
                if mega.index[offset] != 0 && mega.index[offset] == mega.collision_color {
                    collided = true;
                }
                mega.index[offset] = color_index;

                let src = mega.palette[color_index as usize % mega.palette.len()];
                mega.back[offset] = mega.blend_mode.blend(mega.back[offset], src);
            }
        }

        collided
    }

    /// MegaChip clear: the back buffer becomes visible and is then cleared for the next frame
    pub fn present_mega(&mut self) {
        if let Some(mega) = self.mega.as_mut() {
            mega.front.copy_from_slice(&mega.back);
            mega.back.fill(0xFF000000);
            mega.index.fill(0);
        }
    }

    pub fn load_mega_palette(&mut self, first: usize, colors: &[u32]) {
        if self.mega.is_none() {
            self.mega = Some(MegaLayer::new(self.palette_depth));
        }
        if let Some(mega) = self.mega.as_mut() {
            for (i, &color) in colors.iter().enumerate() {
                let slot = (first + i) % mega.palette.len();
                mega.palette[slot] = color;
            }
        }
    }

    pub fn mega_mut(&mut self) -> &mut MegaLayer {
        let palette_depth = self.palette_depth;
        self.mega.get_or_insert_with(|| MegaLayer::new(palette_depth))
    }

    pub fn step_background(&mut self) {
        if let Some(zones) = self.zones.as_mut() {
            zones.background = (zones.background + 1) % CHIP8X_BACKGROUND_COLORS.len();
        }
    }

    /// Colors every zone touched by the pixel rectangle
    pub fn set_zone_color(&mut self, x: usize, y: usize, width: usize, height: usize, color: u8) {
        let Some(zones) = self.zones.as_mut() else {
            return;
        };

        let x0 = (x / ZONE_WIDTH) % ZONE_COLUMNS;
        let y0 = (y / ZONE_HEIGHT) % ZONE_ROWS;
        let x1 = ((x + width.max(1) - 1) / ZONE_WIDTH).min(ZONE_COLUMNS - 1).max(x0);
        let y1 = ((y + height.max(1) - 1) / ZONE_HEIGHT).min(ZONE_ROWS - 1).max(y0);

        for zone_y in y0..=y1 {
            for zone_x in x0..=x1 {
                zones.zones[zone_y * ZONE_COLUMNS + zone_x] = color & 0x7;
            }
        }
    }

    /// Writes the current frame as ARGB into `out` without touching display state
    pub fn populate_render_buffer(&self, out: &mut [u32]) -> C8Result<()> {
        let area = self.width * self.height;
        if out.len() != area {
            return Err(C8Error::Argument(format!(
                "render buffer holds {} pixels but display is {}x{} ({} pixels)",
                out.len(),
                self.width,
                self.height,
                area
            )));
        }

        if self.mode == DisplayMode::MegaResolution {
            if let Some(mega) = self.mega.as_ref() {
                let alpha = mega.screen_alpha as u32;
                for (dst, &src) in out.iter_mut().zip(mega.front.iter()) {
                    *dst = (((src >> 24) * alpha / 0xFF) << 24) | (src & 0x00FFFFFF);
                }
                return Ok(());
            }
        }

        if let Some(zones) = self.zones.as_ref() {
            let background = CHIP8X_BACKGROUND_COLORS[zones.background];
            for (i, dst) in out.iter_mut().enumerate() {
                let (x, y) = (i % self.width, i / self.width);
                *dst = if self.planes[0][i] != 0 {
                    let zone = zones.zones
                        [(y / ZONE_HEIGHT).min(ZONE_ROWS - 1) * ZONE_COLUMNS + (x / ZONE_WIDTH).min(ZONE_COLUMNS - 1)];
                    CHIP8X_FOREGROUND_COLORS[zone as usize]
                } else {
                    background
                };
            }
            return Ok(());
        }

        for (i, dst) in out.iter_mut().enumerate() {
            let color_index = self
                .planes
                .iter()
                .enumerate()
                .fold(0, |color_index, (plane, pixels)| {
                    color_index | ((pixels[i] != 0) as usize) << plane
                });
            *dst = self.colors[color_index];
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Default, Debug)]
pub struct SpriteOptions {
    pub wrap: bool,
    // legacy SCHIP hires: VF counts colliding rows plus rows clipped off the bottom
    pub count_row_collisions: bool,
}

fn shift_grid<T: Copy>(grid: &mut [T], width: usize, height: usize, dx: isize, dy: isize, fill: T) {
    if dx == 0 && dy == 0 {
        return;
    }

    let source = grid.to_vec();
    for y in 0..height {
        for x in 0..width {
            let src_x = x as isize - dx;
            let src_y = y as isize - dy;
            grid[y * width + x] = if (0..width as isize).contains(&src_x)
                && (0..height as isize).contains(&src_y)
            {
                source[src_y as usize * width + src_x as usize]
            } else {
                fill
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ch8::{preset::palette, rom::RomKind};

    fn display(kind: RomKind) -> Display {
        Display::new(&QuirkSet::for_kind(kind), palette(0))
    }

    fn lit(display: &Display, plane: usize) -> usize {
        display.planes[plane].iter().filter(|&&p| p != 0).count()
    }

    #[test]
    fn toggle_reports_on_to_off() {
        let mut display = display(RomKind::CHIP8);
        assert!(!display.toggle_pixel(0, 3, 4));
        assert!(display.pixel(0, 3, 4));
        assert!(display.toggle_pixel(0, 3, 4));
        assert!(!display.pixel(0, 3, 4));
    }

    #[test]
    fn drawing_twice_erases_and_collides() {
        let mut display = display(RomKind::CHIP8);
        let opts = SpriteOptions::default();

        assert_eq!(display.draw(&[0xFF], 10, 5, 1, 1, 1, opts), 0);
        assert_eq!(lit(&display, 0), 8);
        assert_eq!(display.draw(&[0xFF], 10, 5, 1, 1, 1, opts), 1);
        assert_eq!(lit(&display, 0), 0);
    }

    #[test]
    fn clipping_and_wrapping() {
        let mut clipped = display(RomKind::CHIP8);
        clipped.draw(&[0xFF, 0xFF], 60, 31, 2, 1, 1, SpriteOptions::default());
        assert_eq!(lit(&clipped, 0), 4);

        let mut wrapped = display(RomKind::CHIP8);
        wrapped.draw(
            &[0xFF, 0xFF],
            60,
            31,
            2,
            1,
            1,
            SpriteOptions {
                wrap: true,
                ..Default::default()
            },
        );
        assert_eq!(lit(&wrapped, 0), 16);
        assert!(wrapped.pixel(0, 0, 0));
        assert!(wrapped.pixel(0, 63, 31));
    }

    #[test]
    fn coordinates_wrap_before_drawing() {
        let mut display = display(RomKind::CHIP8);
        display.draw(&[0x80], 64 + 2, 32 + 1, 1, 1, 1, SpriteOptions::default());
        assert!(display.pixel(0, 2, 1));
    }

    #[test]
    fn lores_doubles_pixels_on_schip() {
        let mut display = display(RomKind::SCHIP11);
        assert_eq!(display.logical_dimensions(), (64, 32));
        display.draw(&[0x80], 1, 1, 1, 1, 1, SpriteOptions::default());
        assert_eq!(lit(&display, 0), 4);
        for (x, y) in [(2, 2), (3, 2), (2, 3), (3, 3)] {
            assert!(display.pixel(0, x, y));
        }
    }

    #[test]
    fn legacy_row_collisions_count_clipped_rows() {
        let mut display = display(RomKind::SCHIP11);
        display.set_mode(DisplayMode::HighResolution, false);
        let sprite = [0xFF; 32];
        let vf = display.draw(
            &sprite,
            0,
            60,
            16,
            2,
            1,
            SpriteOptions {
                wrap: false,
                count_row_collisions: true,
            },
        );
        assert_eq!(vf, 12);
        assert_eq!(lit(&display, 0), 4 * 16);
    }

    #[test]
    fn scroll_only_touches_selected_planes() {
        let mut display = display(RomKind::XOCHIP);
        display.toggle_pixel(0, 5, 5);
        display.toggle_pixel(1, 5, 5);

        display.scroll_down(2, 0b01);
        assert!(display.pixel(0, 5, 7));
        assert!(!display.pixel(0, 5, 5));
        assert!(display.pixel(1, 5, 5));

        display.scroll_right(4, 0b10);
        assert!(display.pixel(1, 9, 5));

        display.scroll_up(7, 0b11);
        assert_eq!(lit(&display, 0), 0);
        assert_eq!(lit(&display, 1), 0);
    }

    #[test]
    fn clear_respects_plane_mask() {
        let mut display = display(RomKind::XOCHIP);
        display.toggle_pixel(0, 1, 1);
        display.toggle_pixel(1, 1, 1);
        display.clear(0b10);
        assert!(display.pixel(0, 1, 1));
        assert!(!display.pixel(1, 1, 1));
    }

    #[test]
    fn subtract_and_or_modes() {
        let mut display = display(RomKind::HWCHIP64);
        display.draw_mode = DrawMode::Or;
        assert_eq!(display.draw(&[0xF0], 0, 0, 1, 1, 1, SpriteOptions::default()), 0);
        assert_eq!(display.draw(&[0xF0], 0, 0, 1, 1, 1, SpriteOptions::default()), 0);
        assert_eq!(lit(&display, 0), 4 * 4);

        display.draw_mode = DrawMode::Subtract;
        assert_eq!(display.draw(&[0xC0], 0, 0, 1, 1, 1, SpriteOptions::default()), 1);
        assert_eq!(lit(&display, 0), 2 * 4);
    }

    #[test]
    fn render_buffer_uses_plane_bits_as_palette_index() {
        let mut display = display(RomKind::XOCHIP);
        display.toggle_pixel(1, 0, 0);
        let (w, h) = display.dimensions();
        let mut out = vec![0; w * h];
        display.populate_render_buffer(&mut out).unwrap();
        assert_eq!(out[0], display.colors[0b10]);
        assert_eq!(out[1], display.colors[0]);

        let mut wrong = vec![0; 10];
        assert!(matches!(
            display.populate_render_buffer(&mut wrong),
            Err(C8Error::Argument(_))
        ));
    }

    #[test]
    fn mega_sprites_blend_and_present() {
        let mut display = display(RomKind::MEGACHIP);
        display.set_mode(DisplayMode::MegaResolution, true);
        assert_eq!(display.dimensions(), (256, 192));

        display.load_mega_palette(1, &[0xFF204060]);
        {
            let mega = display.mega_mut();
            mega.sprite_width = 2;
            mega.sprite_height = 1;
            mega.collision_color = 1;
        }

        assert!(!display.draw_mega(&[1, 0], 3, 3));
        assert!(display.draw_mega(&[1, 1], 3, 3));

        let mut out = vec![0; 256 * 192];
        display.populate_render_buffer(&mut out).unwrap();
        assert_eq!(out[3 * 256 + 3], 0xFF000000);

        display.present_mega();
        display.populate_render_buffer(&mut out).unwrap();
        assert_eq!(out[3 * 256 + 3], 0xFF204060);
        assert_eq!(out[3 * 256 + 4], 0xFF204060);
    }

    #[test]
    fn blend_modes() {
        assert_eq!(BlendMode::Normal.blend(0xFF102030, 0x00FFFFFF), 0xFF102030);
        assert_eq!(BlendMode::Alpha50.blend(0xFF000000, 0xFFFEFEFE), 0xFF7F7F7F);
        assert_eq!(BlendMode::Additive.blend(0xFFF00000, 0xFF200000), 0xFFFF0000);
        assert_eq!(BlendMode::Multiply.blend(0xFFFF8000, 0xFF80FF00), 0xFF808000);
    }

    #[test]
    fn chip8x_zones_color_foreground() {
        let mut display = display(RomKind::CHIP8X);
        display.toggle_pixel(0, 9, 5);
        display.set_zone_color(8, 4, 8, 4, 4);

        let mut out = vec![0; 64 * 32];
        display.populate_render_buffer(&mut out).unwrap();
        assert_eq!(out[5 * 64 + 9], CHIP8X_FOREGROUND_COLORS[4]);
        assert_eq!(out[0], CHIP8X_BACKGROUND_COLORS[0]);

        display.step_background();
        display.populate_render_buffer(&mut out).unwrap();
        assert_eq!(out[0], CHIP8X_BACKGROUND_COLORS[1]);
    }
}
