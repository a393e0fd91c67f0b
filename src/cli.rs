use c8vm::ch8::{
    config::VMConfig,
    input::KeyLayout,
    quirk::QuirkOverrides,
    rom::RomKind,
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// C8: CHIP-8 family virtual machine.
/// Runs CHIP-8, Chip8X, SCHIP, XO-CHIP, MegaChip and HyperWaveChip64 programs in the terminal.
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(ValueEnum, Clone, Copy)]
pub enum KindOption {
    CHIP8,
    CHIP8X,
    SCHIP10,
    SCHIP11,
    SCHIPC,
    XOCHIP,
    MEGACHIP,
    HWCHIP64,
}

impl KindOption {
    pub fn to_kind(self) -> RomKind {
        match self {
            KindOption::CHIP8 => RomKind::CHIP8,
            KindOption::CHIP8X => RomKind::CHIP8X,
            KindOption::SCHIP10 => RomKind::SCHIP10,
            KindOption::SCHIP11 => RomKind::SCHIP11,
            KindOption::SCHIPC => RomKind::SCHIPC,
            KindOption::XOCHIP => RomKind::XOCHIP,
            KindOption::MEGACHIP => RomKind::MEGACHIP,
            KindOption::HWCHIP64 => RomKind::HWCHIP64,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
pub enum LayoutOption {
    Qwerty,
    Azerty,
    Qwertz,
}

impl LayoutOption {
    pub fn to_layout(self) -> KeyLayout {
        match self {
            LayoutOption::Qwerty => KeyLayout::Qwerty,
            LayoutOption::Azerty => KeyLayout::Azerty,
            LayoutOption::Qwertz => KeyLayout::Qwertz,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
pub enum LogLevelOption {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevelOption {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevelOption::Trace => LevelFilter::Trace,
            LogLevelOption::Debug => LevelFilter::Debug,
            LogLevelOption::Info => LevelFilter::Info,
            LogLevelOption::Warn => LevelFilter::Warn,
            LogLevelOption::Error => LevelFilter::Error,
        }
    }
}

/// Forces a single quirk on or off regardless of the variant
#[derive(Args)]
pub struct QuirkArgs {
    /// AND, OR and XOR reset VF to 0
    #[arg(long, value_name = "BOOL")]
    pub vf_reset: Option<bool>,

    /// FX55 and FX65 advance I
    #[arg(long, value_name = "BOOL")]
    pub increment_index: Option<bool>,

    /// Drawing in lores waits for the next frame
    #[arg(long, value_name = "BOOL")]
    pub display_wait: Option<bool>,

    /// Sprites wrap around the screen edges instead of clipping
    #[arg(long, value_name = "BOOL")]
    pub wrap: Option<bool>,

    /// 8XY6 and 8XYE shift VX instead of VY
    #[arg(long, value_name = "BOOL")]
    pub shift_in_place: Option<bool>,

    /// BNNN jumps to XNN + VX
    #[arg(long, value_name = "BOOL")]
    pub jump_with_vx: Option<bool>,
}

impl QuirkArgs {
    pub fn to_overrides(&self) -> QuirkOverrides {
        QuirkOverrides {
            vf_reset: self.vf_reset,
            increment_index: self.increment_index,
            display_wait: self.display_wait,
            wrap: self.wrap,
            shift_in_place: self.shift_in_place,
            jump_with_vx: self.jump_with_vx,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Path of the ROM to load
    #[arg(value_name = "ROM")]
    pub path: PathBuf,

    /// Sets the ROM kind, guessed from the file extension when omitted
    #[arg(long, value_enum)]
    pub kind: Option<KindOption>,

    /// Sets the instructions executed per frame
    #[arg(long, value_name = "COUNT")]
    pub ipf: Option<u32>,

    /// Times CHIP-8 programs by COSMAC VIP machine cycles
    #[arg(long)]
    pub strict: bool,

    /// Color palette preset
    #[arg(long, default_value_t = 0)]
    pub palette: usize,

    /// Host keyboard layout
    #[arg(long, value_enum, default_value_t = LayoutOption::Qwerty)]
    pub layout: LayoutOption,

    /// Divisor the adaptive throttle scales overruns by
    #[arg(long, value_name = "DIVISOR")]
    pub throttle: Option<f64>,

    /// Enable logging
    #[arg(short, long, value_enum, value_name = "LEVEL")]
    pub log: Option<LogLevelOption>,

    /// Seeds the random number generator
    #[arg(long)]
    pub seed: Option<u64>,

    /// Disables audio output
    #[arg(long)]
    pub mute: bool,

    /// Runs without a terminal display, stopping after the given number of frames
    #[arg(long, value_name = "FRAMES")]
    pub headless: Option<u64>,

    /// Starts paused with debugging enabled
    #[arg(short, long)]
    pub debug: bool,

    /// Pauses before executing the instruction at ADDR (hex), implies --debug
    #[arg(long = "break", value_name = "ADDR", value_parser = parse_address)]
    pub breakpoints: Vec<u32>,

    #[command(flatten)]
    pub quirks: QuirkArgs,
}

impl RunArgs {
    pub fn to_config(&self, kind: RomKind) -> VMConfig {
        let mut config = VMConfig {
            quirks: self.quirks.to_overrides(),
            instructions_per_frame: self.ipf,
            strict: self.strict,
            palette: self.palette,
            key_layout: self.layout.to_layout(),
            rng_seed: self.seed,
            debugging: self.debug || !self.breakpoints.is_empty(),
            ..VMConfig::for_kind(kind)
        };

        if let Some(divisor) = self.throttle {
            config.throttle_divisor = divisor;
        }

        config
    }
}

fn parse_address(arg: &str) -> Result<u32, String> {
    let digits = arg.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|err| format!("invalid address {}: {}", arg, err))
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// C8 RUN: Loads a ROM and runs it
    Run(RunArgs),

    /// C8 KINDS: Lists the supported variants and their defaults
    Kinds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_build_a_config() {
        let cli = Cli::parse_from([
            "c8vm",
            "run",
            "game.ch8",
            "--kind",
            "schip11",
            "--ipf",
            "40",
            "--wrap",
            "true",
            "--seed",
            "7",
        ]);

        let CliCommand::Run(args) = cli.command else {
            panic!("expected run command");
        };

        let config = args.to_config(args.kind.map(KindOption::to_kind).unwrap());
        assert_eq!(config.kind, RomKind::SCHIP11);
        assert_eq!(config.instructions_per_frame, Some(40));
        assert_eq!(config.quirks.wrap, Some(true));
        assert_eq!(config.quirks.vf_reset, None);
        assert_eq!(config.rng_seed, Some(7));
        assert!(config.resolve_quirks().wrap);
    }

    #[test]
    fn breakpoints_enable_debugging() {
        let cli = Cli::parse_from(["c8vm", "run", "game.xo8", "--break", "0x20A", "--break", "3FF"]);
        let CliCommand::Run(args) = cli.command else {
            panic!("expected run command");
        };

        assert_eq!(args.breakpoints, vec![0x20A, 0x3FF]);
        assert!(args.to_config(RomKind::XOCHIP).debugging);
        assert!(parse_address("zz").is_err());
    }
}
