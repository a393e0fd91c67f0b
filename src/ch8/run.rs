use super::{
    error::{C8Error, C8Result},
    pace::{Clock, FrameLimiter, FRAME_DURATION, FRAME_RATE},
    stats::C8Stats,
    vm::{VMStatus, VM},
};

use std::{
    sync::{
        mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

pub type VMLock = Arc<Mutex<VM>>;

pub type RunResult = C8Result<C8Stats>;
pub type RunControlResult = Result<(), &'static str>;

/// Receives one frame of mono f32 PCM
pub type AudioSink = Box<dyn FnMut(Vec<f32>) + Send>;

pub struct RunOptions {
    pub start_paused: bool,
    // stop after this many frames
    pub frame_limit: Option<u64>,
    pub audio: Option<AudioSink>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            start_paused: false,
            frame_limit: None,
            audio: None,
        }
    }
}

pub fn lock_vm(vm: &Mutex<VM>) -> MutexGuard<'_, VM> {
    // the VM holds no invariant a panicking host thread could break halfway
    vm.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Runner {
    vm: VMLock,
    thread_handle: JoinHandle<RunResult>,
    thread_continue_sender: Sender<bool>,
}

impl Runner {
    pub fn vm(&self) -> VMLock {
        Arc::clone(&self.vm)
    }

    pub fn pause(&mut self) -> RunControlResult {
        self.send_vm_can_continue(false)
    }

    pub fn resume(&mut self) -> RunControlResult {
        lock_vm(&self.vm).resume();
        self.send_vm_can_continue(true)
    }

    pub fn is_finished(&self) -> bool {
        self.thread_handle.is_finished()
    }

    pub fn spawn<C: Clock + Send + 'static>(vm: VM, clock: C, mut options: RunOptions) -> Self {
        let (thread_continue_sender, thread_continue_receiver) = channel::<bool>();

        let vm = Arc::new(Mutex::new(vm));

        let thread_handle = {
            let vm = Arc::clone(&vm);
            thread::spawn(move || -> RunResult {
                let thread_start = Instant::now();
                let mut stats = {
                    let vm = lock_vm(&vm);
                    C8Stats::new(
                        vm.rom_name().to_string(),
                        vm.config().kind,
                        vm.throttle().target(),
                    )
                };

                let mut continuation = RunContinuation {
                    cont: !options.start_paused,
                    exit: false,
                    recv: thread_continue_receiver,
                };

                let mut limiter = FrameLimiter::new(clock, FRAME_DURATION);
                let mut samples = Vec::new();

                let result = loop {
                    if !continuation.try_cont() && !continuation.can_cont() {
                        break Ok(());
                    }

                    limiter.wait_for_frame();

                    let frame_start = Instant::now();
                    let mut vm = lock_vm(&vm);

                    let status = match vm.run_frame() {
                        Ok(status) => status,
                        Err(err) => break Err(err),
                    };

                    if let Some(audio) = options.audio.as_mut() {
                        samples.resize(vm.samples_per_frame(), 0.0f32);
                        if let Err(err) = vm.push_audio(&mut samples) {
                            break Err(err);
                        }
                        audio(samples.clone());
                    }

                    vm.report_frame_time(frame_start.elapsed());
                    let frames = vm.frames();
                    drop(vm);

                    match status {
                        VMStatus::Running => (),
                        VMStatus::Breakpoint(address) => {
                            log::info!("Paused on breakpoint at {:#06X}", address);
                            continuation.cont = false;
                        }
                        VMStatus::Exited | VMStatus::Faulted => break Ok(()),
                    }

                    if options.frame_limit.map_or(false, |limit| frames >= limit) {
                        log::info!("Reached frame limit of {}", frames);
                        break Ok(());
                    }
                };

                let vm = lock_vm(&vm);
                stats.frames = vm.frames();
                stats.instructions = vm.instructions();
                stats.exited = vm.status() == VMStatus::Exited;
                stats.simulated_time = vm.frames() as f64 / FRAME_RATE as f64;
                stats.up_time = thread_start.elapsed();

                result.map(|_| stats)
            })
        };

        Runner {
            vm,
            thread_handle,
            thread_continue_sender,
        }
    }

    /// Stops the runner between frames and returns what it did
    pub fn exit(self) -> RunResult {
        let Runner {
            thread_continue_sender,
            thread_handle,
            ..
        } = self;
        // the thread notices the sender was dropped and leaves at the next frame boundary
        drop(thread_continue_sender);
        Self::join(thread_handle)
    }

    /// Waits for the runner to stop on its own (exit instruction, fault or frame limit)
    pub fn wait(self) -> RunResult {
        let Runner {
            thread_continue_sender,
            thread_handle,
            ..
        } = self;
        let result = Self::join(thread_handle);
        drop(thread_continue_sender);
        result
    }

    fn join(thread_handle: JoinHandle<RunResult>) -> RunResult {
        thread_handle
            .join()
            .map_err(|_| C8Error::Io("runner thread panicked".to_string()))?
    }

    fn send_vm_can_continue(&mut self, can_continue: bool) -> RunControlResult {
        if self.is_finished() {
            return Err("VM has already exited");
        }
        self.thread_continue_sender
            .send(can_continue)
            .map_err(|_| "Unable to send VM continue signal")
    }
}

struct RunContinuation {
    cont: bool,
    exit: bool,
    recv: Receiver<bool>,
}

impl RunContinuation {
    fn try_cont(&mut self) -> bool {
        loop {
            match self.recv.try_recv() {
                Ok(can) => self.cont = can,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.exit = true;
                    break;
                }
            }
        }

        self.cont && !self.exit
    }

    // blocks while paused, false once the runner has to exit
    fn can_cont(&mut self) -> bool {
        while !self.exit {
            match self.recv.recv_timeout(Duration::from_millis(30)) {
                Ok(can) => self.cont = can,
                Err(RecvTimeoutError::Timeout) => (),
                Err(RecvTimeoutError::Disconnected) => self.exit = true,
            }

            if self.cont {
                break;
            }
        }

        self.cont && !self.exit
    }
}
