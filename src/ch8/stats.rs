use super::rom::RomKind;

use crossterm::style::Stylize;

use std::{fmt::Display, time::Duration};

pub const GOOD_FRAME_RATE_PERCENT_DIFF: f64 = 1.0;
pub const OKAY_FRAME_RATE_PERCENT_DIFF: f64 = 10.0;

pub struct C8Stats {
    pub rom_name: String,
    pub kind: RomKind,
    pub frames: u64,
    pub instructions: u64,
    pub target_instructions_per_frame: u32,
    pub up_time: Duration,
    pub simulated_time: f64,
    pub exited: bool,
}

impl C8Stats {
    pub fn new(rom_name: String, kind: RomKind, target_instructions_per_frame: u32) -> Self {
        Self {
            rom_name,
            kind,
            frames: 0,
            instructions: 0,
            target_instructions_per_frame,
            up_time: Duration::ZERO,
            simulated_time: 0.0,
            exited: false,
        }
    }

    pub fn frame_rate(&self) -> f64 {
        self.frames as f64 / self.up_time.as_secs_f64()
    }

    pub fn instructions_per_frame(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.instructions as f64 / self.frames as f64
        }
    }
}

impl Display for C8Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} \"{}\" ({}) runtime",
            "Analyzing".green().bold(),
            self.rom_name,
            self.kind
        )?;

        write!(f, "\n    {}", "|".blue().bold())?;
        write!(
            f,
            "\n    {} Frames: {} ({} instructions, {:.1} per frame against a target of {})",
            "=".blue().bold(),
            self.frames,
            self.instructions,
            self.instructions_per_frame(),
            self.target_instructions_per_frame
        )?;

        let fps = self.frame_rate();
        write!(
            f,
            "\n    {} Frame rate: {:.2}Hz",
            "=".blue().bold(),
            if fps.is_finite() { fps } else { 0.0 }
        )?;

        if fps.is_finite() {
            let fps_diff = (fps - 60.0) / 60.0 * 100.0;
            let color_fps_diff = if fps_diff.abs() > OKAY_FRAME_RATE_PERCENT_DIFF {
                Stylize::red
            } else if fps_diff.abs() > GOOD_FRAME_RATE_PERCENT_DIFF {
                Stylize::yellow
            } else {
                Stylize::green
            };

            write!(
                f,
                " ( {} from 60Hz )",
                color_fps_diff(format!(
                    "{}{:.2}%",
                    if fps_diff >= 0.0 { "+" } else { "" },
                    fps_diff
                ))
                .bold()
            )?;
        }

        write!(f, "\n    {}", "|".blue().bold())?;
        write!(
            f,
            "\n    {}  Simulated Time: {:.3}s",
            "=".blue().bold(),
            self.simulated_time
        )?;
        write!(
            f,
            "\n    {} C8 Program Time: {:.3}s",
            "=".blue().bold(),
            self.up_time.as_secs_f64()
        )?;

        if self.exited {
            write!(f, "\n    {} Program exited on its own", "=".blue().bold())?;
        }

        Ok(())
    }
}
