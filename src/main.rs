mod cli;
mod render;

use c8vm::ch8::{
    config::VMConfig,
    input::{KeyLayout, Keypad, Pad},
    quirk::QuirkSet,
    pace::{SystemClock, FRAME_DURATION},
    rom::{Rom, RomKind},
    run::{lock_vm, AudioSink, RunOptions, Runner},
    stats::C8Stats,
    vm::{VMStatus, VM},
};
use cli::{Cli, CliCommand, KindOption, RunArgs};
use render::{panic_cleanup_terminal, Renderer};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{poll, read, Event, KeyCode as CrosstermKey, KeyEventKind, KeyModifiers},
    style::Stylize,
};

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

// without release events from the terminal a key counts as held this long after its last press
const KEY_HOLD_DURATION: Duration = Duration::from_millis(150);

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Run(args) => run(args),
        CliCommand::Kinds => {
            for kind in RomKind::ALL {
                let quirks = QuirkSet::for_kind(kind);
                let (width, height) = quirks.base_resolution();
                println!(
                    "{} {:>16}: {} instructions per frame, {}x{} base resolution, {} byte ROM limit",
                    "=".blue().bold(),
                    kind.to_string(),
                    quirks.instructions_per_frame,
                    width,
                    height,
                    kind.max_size()
                );
            }
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    if let Some(level) = args.log {
        simple_logger::SimpleLogger::new()
            .with_level(level.to_level_filter())
            .init()
            .context("Failed to initialize logger")?;
    }

    let rom = Rom::read(&args.path, args.kind.map(KindOption::to_kind))
        .with_context(|| format!("Failed to load ROM {}", args.path.display()))?;
    let config = args.to_config(rom.config.kind);

    let keypad = Arc::new(Keypad::new());
    let mut vm = VM::new(&rom, config.clone(), Arc::clone(&keypad))?;

    if !args.breakpoints.is_empty() {
        let breakpoints: HashSet<u32> = args.breakpoints.iter().copied().collect();
        vm.set_breakpoint_hook(Some(Box::new(move |pc, _| breakpoints.contains(&pc))));
    }

    #[cfg(feature = "audio")]
    let (_stream, audio) = if args.mute {
        (None, None)
    } else {
        match c8vm::ch8::audio::spawn_audio_stream(config.sample_rate) {
            Ok((stream, output)) => {
                let sink: AudioSink = Box::new(move |samples| output.push(samples));
                (Some(stream), Some(sink))
            }
            Err(err) => {
                log::warn!("Running without sound: {}", err);
                (None, None)
            }
        }
    };

    #[cfg(not(feature = "audio"))]
    let audio: Option<AudioSink> = None;

    if let Some(frames) = args.headless {
        // nothing could resume a breakpoint without a terminal
        vm.set_debugging(false);
        let runner = Runner::spawn(
            vm,
            SystemClock::default(),
            RunOptions {
                start_paused: false,
                frame_limit: Some(frames),
                audio,
            },
        );
        println!("{}", runner.wait()?);
        return Ok(());
    }

    let runner = Runner::spawn(
        vm,
        SystemClock::default(),
        RunOptions {
            start_paused: config.debugging,
            frame_limit: None,
            audio,
        },
    );

    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Err(err) = panic_cleanup_terminal() {
            eprintln!("Failed to cleanup terminal: {}", err);
        }
        default_panic(info);
    }));

    let mut renderer = Renderer::setup(rom.config.name.clone(), rom.config.kind, config.palette)?;
    let result = event_loop(&mut renderer, runner, &keypad, &config);
    renderer.cleanup()?;

    println!("{}", result?);
    Ok(())
}

fn event_loop(
    renderer: &mut Renderer,
    mut runner: Runner,
    keypad: &Keypad,
    config: &VMConfig,
) -> Result<C8Stats> {
    let vm = runner.vm();
    let layout: KeyLayout = config.key_layout;

    let mut paused = config.debugging;
    let mut release_events = false;
    let mut held: HashMap<(Pad, u8), Instant> = HashMap::new();

    loop {
        if poll(FRAME_DURATION / 2).context("Unable to poll for terminal events")? {
            if let Event::Key(key_event) = read().context("Unable to read terminal event")? {
                let ctrl_c = key_event.modifiers.contains(KeyModifiers::CONTROL)
                    && matches!(key_event.code, CrosstermKey::Char('c' | 'C'));

                if ctrl_c || key_event.code == CrosstermKey::Esc {
                    break;
                }

                if config.debugging
                    && key_event.code == CrosstermKey::Char(' ')
                    && key_event.kind == KeyEventKind::Press
                {
                    let at_breakpoint =
                        matches!(lock_vm(&vm).status(), VMStatus::Breakpoint(_));
                    let control = if paused || at_breakpoint {
                        runner.resume()
                    } else {
                        runner.pause()
                    };
                    match control {
                        Ok(()) => paused = !(paused || at_breakpoint),
                        Err(err) => log::warn!("{}", err),
                    }
                } else if let Some((pad, code)) = layout.map_key(key_event.code) {
                    match key_event.kind {
                        KeyEventKind::Press | KeyEventKind::Repeat => {
                            keypad.set_on(pad, code, true);
                            held.insert((pad, code), Instant::now());
                        }
                        KeyEventKind::Release => {
                            release_events = true;
                            keypad.set_on(pad, code, false);
                            held.remove(&(pad, code));
                        }
                    }
                }
            }
        }

        if !release_events {
            held.retain(|&(pad, code), pressed| {
                let down = pressed.elapsed() < KEY_HOLD_DURATION;
                if !down {
                    keypad.set_on(pad, code, false);
                }
                down
            });
        }

        // a faulted runner has nothing left to show, an exited program stays on screen until Esc
        if runner.is_finished() && lock_vm(&vm).status() != VMStatus::Exited {
            break;
        }

        renderer.draw(&vm)?;
    }

    Ok(runner.exit()?)
}
