use c8vm::ch8::{
    preset::palette_name,
    rom::RomKind,
    run::{lock_vm, VMLock},
    vm::VMStatus,
};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph, Widget},
};

use std::io::{self, stdout};

type Terminal = tui::Terminal<CrosstermBackend<io::Stdout>>;

pub struct Renderer {
    terminal: Terminal,
    rom_name: String,
    rom_kind: RomKind,
    palette: usize,
    pixels: Vec<u32>,
}

impl Renderer {
    pub fn setup(rom_name: String, rom_kind: RomKind, palette: usize) -> Result<Self> {
        // alternate screen so the user keeps their terminal history, raw mode so we own input
        enable_raw_mode().context("Failed to enable terminal raw mode")?;

        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)
            .context("Failed to enter alternate terminal screen")?;

        // terminals without the kitty keyboard protocol ignore this and never report releases
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .context("Failed to request key release events")?;

        let terminal = tui::Terminal::new(CrosstermBackend::new(stdout))
            .context("Failed to create interface to terminal backend")?;

        Ok(Renderer {
            terminal,
            rom_name,
            rom_kind,
            palette,
            pixels: Vec::new(),
        })
    }

    pub fn draw(&mut self, vm: &VMLock) -> Result<()> {
        let (width, height, status, ipf) = {
            let vm = lock_vm(vm);
            let (width, height) = vm.render_dimensions();
            self.pixels.resize(width * height, 0);
            vm.populate_render_buffer(&mut self.pixels)?;
            (width, height, vm.status(), vm.throttle().effective())
        };

        let title = format!(
            " {} ({}) {} ipf, {} ",
            self.rom_name,
            self.rom_kind,
            ipf,
            palette_name(self.palette)
        );
        let footer = match status {
            VMStatus::Running => " Esc or Ctrl+C to exit".to_string(),
            VMStatus::Breakpoint(address) => format!(" Paused at {:#06X}, Space to resume", address),
            VMStatus::Exited => " Program exited, Esc to close".to_string(),
            VMStatus::Faulted => " Program faulted, Esc to close".to_string(),
        };

        let pixels = &self.pixels;
        self.terminal.draw(|f| {
            let area = f.size();
            let [display_area, footer_area] = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(area.height.saturating_sub(1)),
                    Constraint::Length(1),
                ])
                .split(area)[..] else { unreachable!() };

            let block = Block::default().title(title).borders(Borders::ALL);
            f.render_widget(
                DisplayWidget {
                    pixels,
                    width,
                    height,
                },
                block.inner(display_area),
            );
            f.render_widget(block, display_area);

            f.render_widget(
                Paragraph::new(footer).style(Style::default().bg(Color::White).fg(Color::Black)),
                footer_area,
            );
        })?;

        Ok(())
    }

    pub fn cleanup(mut self) -> Result<()> {
        cleanup_terminal(&mut self.terminal)
    }
}

fn cleanup_terminal(terminal: &mut Terminal) -> Result<()> {
    // clean up the terminal so its usable after program exit
    execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
        .context("Failed to restore keyboard reporting")?;
    disable_raw_mode().context("Failed to disable terminal raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate terminal screen")?;
    terminal
        .show_cursor()
        .context("Failed to show terminal cursor")?;
    Ok(())
}

pub fn panic_cleanup_terminal() -> Result<()> {
    cleanup_terminal(
        &mut tui::Terminal::new(CrosstermBackend::new(stdout()))
            .context("Failed to create interface to terminal backend")?,
    )
}

struct DisplayWidget<'a> {
    pixels: &'a [u32],
    width: usize,
    height: usize,
}

fn argb_to_color(argb: u32) -> Color {
    Color::Rgb((argb >> 16) as u8, (argb >> 8) as u8, argb as u8)
}

impl Widget for DisplayWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // a terminal cell is twice as tall as it is wide, so each cell shows two pixel rows:
        // the top one as background and the bottom one as a lower half block (▄)
        let columns = self.width.min(area.width as usize);
        let rows = self.height.min(2 * area.height as usize);

        for y in 0..rows {
            for x in 0..columns {
                let color = argb_to_color(self.pixels[y * self.width + x]);
                let cell = buf.get_mut(area.left() + x as u16, area.top() + (y / 2) as u16);

                if y % 2 == 0 {
                    cell.set_bg(color);
                } else {
                    cell.set_fg(color).set_symbol("▄");
                }
            }
        }
    }
}
