use super::{
    audio::{Audio, PcmSample},
    config::VMConfig,
    disp::Display,
    error::{C8Error, C8Result},
    input::Keypad,
    instruct::Instruction,
    interp::{ExecutionState, Interpreter},
    pace::{Throttle, FRAME_DURATION, FRAME_RATE},
    preset::palette,
    rom::Rom,
};

use std::{sync::Arc, time::Duration};

// COSMAC VIP: 1.76064 MHz / 8 clocks per machine cycle / 60 Hz, minus the interrupt routine
pub const VIP_CYCLES_PER_FRAME: u32 = 3668;

pub type BreakpointHook = Box<dyn FnMut(u32, &Instruction) -> bool + Send>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VMStatus {
    Running,
    Breakpoint(u32),
    Exited,
    /// Latched after an error, every later frame returns the same error
    Faulted,
}

pub struct VM {
    rom_name: String,
    interpreter: Interpreter,
    config: VMConfig,
    throttle: Throttle,
    strict: bool,
    pending_cycles: u32,
    // progress into the current frame, kept when a breakpoint stops it early
    frame_cycles: u32,
    frame_instructions: u32,
    frames: u64,
    instructions: u64,
    status: VMStatus,
    fault: Option<C8Error>,
    debugging: bool,
    breakpoint_hook: Option<BreakpointHook>,
    ignore_breakpoint_at: Option<u32>,
}

impl VM {
    pub fn new(rom: &Rom, config: VMConfig, keypad: Arc<Keypad>) -> C8Result<Self> {
        let quirks = config.resolve_quirks();
        let display = Display::new(&quirks, palette(config.palette));
        let audio = Audio::new(&quirks, config.sample_rate, FRAME_RATE, config.volume);
        let interpreter = Interpreter::new(rom, quirks, display, audio, keypad, config.rng_seed)?;

        let strict = config.is_strict();
        log::info!(
            "Starting {} as {} with {} ({} instructions per frame)",
            rom.config.name,
            rom.config.kind,
            if strict { "VIP cycle timing" } else { "frame budget timing" },
            quirks.instructions_per_frame,
        );

        Ok(VM {
            rom_name: rom.config.name.clone(),
            interpreter,
            throttle: Throttle::new(quirks.instructions_per_frame, config.throttle_divisor),
            strict,
            pending_cycles: 0,
            frame_cycles: 0,
            frame_instructions: 0,
            frames: 0,
            instructions: 0,
            status: VMStatus::Running,
            fault: None,
            debugging: config.debugging,
            breakpoint_hook: None,
            ignore_breakpoint_at: None,
            config,
        })
    }

    pub fn rom_name(&self) -> &str {
        &self.rom_name
    }

    pub fn config(&self) -> &VMConfig {
        &self.config
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn status(&self) -> VMStatus {
        self.status
    }

    pub fn fault(&self) -> Option<&C8Error> {
        self.fault.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn keypad(&self) -> Arc<Keypad> {
        Arc::clone(&self.interpreter.keypad)
    }

    pub fn display(&self) -> &Display {
        &self.interpreter.display
    }

    /// Physical (width, height) of the render buffer
    pub fn render_dimensions(&self) -> (usize, usize) {
        self.interpreter.display.dimensions()
    }

    pub fn populate_render_buffer(&self, out: &mut [u32]) -> C8Result<()> {
        self.interpreter.display.populate_render_buffer(out)
    }

    pub fn samples_per_frame(&self) -> usize {
        self.interpreter.audio.samples_per_frame()
    }

    pub fn sample_rate(&self) -> u32 {
        self.interpreter.audio.sample_rate()
    }

    /// One frame of PCM for the current sound timer
    pub fn push_audio<S: PcmSample>(&mut self, out: &mut [S]) -> C8Result<()> {
        let sound_timer = self.interpreter.sound_timer;
        self.interpreter.audio.push_samples(sound_timer, out)
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.interpreter.registers
    }

    pub fn flags(&self) -> &[u8; 16] {
        &self.interpreter.flags
    }

    pub fn index(&self) -> u32 {
        self.interpreter.index
    }

    pub fn pc(&self) -> u32 {
        self.interpreter.pc
    }

    pub fn stack(&self) -> &[u32] {
        &self.interpreter.stack
    }

    pub fn delay_timer(&self) -> u8 {
        self.interpreter.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.interpreter.sound_timer
    }

    pub fn execution_state(&self) -> ExecutionState {
        self.interpreter.state
    }

    pub fn is_debugging(&self) -> bool {
        self.debugging
    }

    pub fn set_debugging(&mut self, debugging: bool) {
        log::debug!("Debugging {}", if debugging { "enabled" } else { "disabled" });
        self.debugging = debugging;
    }

    /// Consulted before every instruction while debugging, returning true pauses before it executes
    pub fn set_breakpoint_hook(&mut self, hook: Option<BreakpointHook>) {
        self.breakpoint_hook = hook;
    }

    /// Leaves a breakpoint, the instruction it stopped on executes without consulting the hook again
    pub fn resume(&mut self) {
        if let VMStatus::Breakpoint(address) = self.status {
            self.ignore_breakpoint_at = Some(address);
            self.status = VMStatus::Running;
        }
    }

    /// Feeds how long the host spent on the last frame back into the instruction budget
    pub fn report_frame_time(&mut self, elapsed: Duration) {
        self.throttle.update(elapsed, FRAME_DURATION);
    }

    /// Runs one 60 Hz frame: the instruction budget (or VIP cycle budget) then the frame boundary.
    /// A breakpoint returns before the boundary and the next call finishes the same frame.
    pub fn run_frame(&mut self) -> C8Result<VMStatus> {
        if let Some(err) = &self.fault {
            return Err(err.clone());
        }

        if self.status != VMStatus::Running {
            return Ok(self.status);
        }

        let result = if self.strict {
            self.run_strict_frame()
        } else {
            self.run_budget_frame()
        };

        let completed = match result {
            Ok(completed) => completed,
            Err(err) => {
                log::error!("Fault at {:#06X}: {}", self.interpreter.pc, err);
                self.status = VMStatus::Faulted;
                self.fault = Some(err.clone());
                return Err(err);
            }
        };

        if !completed && matches!(self.status, VMStatus::Breakpoint(_)) {
            return Ok(self.status);
        }

        self.frame_cycles = 0;
        self.frame_instructions = 0;
        self.interpreter.tick_timers();
        self.frames += 1;

        log::trace!(
            "Frame {} done at pc {:#06X} ({} instructions total)",
            self.frames,
            self.interpreter.pc,
            self.instructions
        );

        Ok(self.status)
    }

    // false when the frame stopped before its budget ran out
    fn run_budget_frame(&mut self) -> C8Result<bool> {
        while self.frame_instructions < self.throttle.effective() {
            if !self.execute_next()? {
                return Ok(false);
            }
            self.frame_instructions += 1;
        }
        Ok(true)
    }

    // the cycle counter drains one cycle at a time so an instruction's cost can straddle frames
    fn run_strict_frame(&mut self) -> C8Result<bool> {
        while self.frame_cycles < VIP_CYCLES_PER_FRAME {
            if self.pending_cycles == 0 && !self.execute_next()? {
                return Ok(false);
            }
            self.pending_cycles = self.pending_cycles.saturating_sub(1);
            self.frame_cycles += 1;
        }
        Ok(true)
    }

    // false when the frame has to stop early
    fn execute_next(&mut self) -> C8Result<bool> {
        if self.debugging && self.hit_breakpoint()? {
            return Ok(false);
        }

        let cycles = self.interpreter.step()?;
        self.pending_cycles = cycles.max(1);
        self.instructions += 1;

        if self.interpreter.exited {
            self.status = VMStatus::Exited;
            return Ok(false);
        }

        Ok(true)
    }

    fn hit_breakpoint(&mut self) -> C8Result<bool> {
        let pc = self.interpreter.pc;
        if self.ignore_breakpoint_at.take() == Some(pc) {
            return Ok(false);
        }

        let Some(hook) = self.breakpoint_hook.as_mut() else {
            return Ok(false);
        };

        let Some(instruction) = self.interpreter.peek()? else {
            return Ok(false);
        };

        if hook(pc, &instruction) {
            log::info!("Breakpoint at {:#06X}: {:?}", pc, instruction);
            self.status = VMStatus::Breakpoint(pc);
            return Ok(true);
        }

        Ok(false)
    }
}
