use super::{
    error::{C8Error, C8Result},
    mem::Memory,
    quirk::QuirkSet,
};

pub const AUDIO_BUFFER_SIZE_BYTES: usize = 16;
pub const AUDIO_PATTERN_BITS: f64 = (AUDIO_BUFFER_SIZE_BYTES * 8) as f64;

pub const DEFAULT_SAMPLE_RATE: u32 = 48000;
pub const DEFAULT_VOLUME: f32 = 0.5;
pub const DEFAULT_PITCH: u8 = 64;
pub const DEFAULT_SQUARE_WAVE_VALUE: u8 = 0x80;

const BASE_SAMPLE_RATE: f64 = 4000.0;
const SQUARE_WAVE_CLOCK: f64 = 27535.0;

// half low, half high: one period of a square wave
const SQUARE_WAVE_PATTERN: [u8; AUDIO_BUFFER_SIZE_BYTES] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// A PCM sample format the synthesizer can emit
pub trait PcmSample: Copy {
    const SILENCE: Self;

    /// `level` is in [-1, 1]
    fn from_level(level: f32) -> Self;
}

impl PcmSample for i8 {
    const SILENCE: Self = 0;

    fn from_level(level: f32) -> Self {
        (level.clamp(-1.0, 1.0) * i8::MAX as f32) as i8
    }
}

impl PcmSample for i16 {
    const SILENCE: Self = 0;

    fn from_level(level: f32) -> Self {
        (level.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
    }
}

impl PcmSample for f32 {
    const SILENCE: Self = 0.0;

    fn from_level(level: f32) -> Self {
        level.clamp(-1.0, 1.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Waveform {
    /// XO-CHIP style: the pattern is clocked at a rate derived from the pitch register
    Pitched,
    /// Chip8X style square wave tone whose frequency comes from the sound port value
    SquareWave { value: u8 },
}

/// MegaChip 8-bit unsigned PCM playing from memory
#[derive(Clone, PartialEq, Debug)]
pub struct DigitizedTrack {
    pub data: Vec<u8>,
    pub rate: u32,
    pub looping: bool,
    position: f64,
}

impl DigitizedTrack {
    // header: 16-bit sample rate, 24-bit length, 1 reserved byte, then samples
    pub const HEADER_SIZE: u32 = 6;

    pub fn read(memory: &Memory, address: u32, looping: bool) -> Self {
        let rate = memory.read_word(address) as u32;
        let length = memory.read_u24(address.wrapping_add(2)) as usize;
        let mut data = vec![0; length];
        memory.export(address.wrapping_add(Self::HEADER_SIZE), &mut data);

        DigitizedTrack {
            data,
            rate,
            looping,
            position: 0.0,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Audio {
    pub buffer: [u8; AUDIO_BUFFER_SIZE_BYTES],
    pub pitch: u8,
    pub waveform: Waveform,
    pub track: Option<DigitizedTrack>,
    pub volume: f32,
    phase: f64,
    sample_rate: u32,
    frame_rate: u32,
}

impl Audio {
    pub fn new(quirks: &QuirkSet, sample_rate: u32, frame_rate: u32, volume: f32) -> Self {
        let (buffer, waveform) = if quirks.xo_chip {
            ([0; AUDIO_BUFFER_SIZE_BYTES], Waveform::Pitched)
        } else {
            (
                SQUARE_WAVE_PATTERN,
                Waveform::SquareWave {
                    value: DEFAULT_SQUARE_WAVE_VALUE,
                },
            )
        };

        Audio {
            buffer,
            pitch: DEFAULT_PITCH,
            waveform,
            track: None,
            volume: volume.clamp(0.0, 1.0),
            phase: 0.0,
            sample_rate: sample_rate.max(1),
            frame_rate: frame_rate.max(1),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate / self.frame_rate) as usize
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Fraction of the pattern advanced per output sample
    pub fn step(&self) -> f64 {
        let frequency = match self.waveform {
            Waveform::Pitched => pitch_to_bit_rate(self.pitch) / AUDIO_PATTERN_BITS,
            Waveform::SquareWave { value } => SQUARE_WAVE_CLOCK / (value as f64 + 1.0),
        };
        frequency / self.sample_rate as f64
    }

    pub fn set_square_wave_value(&mut self, value: u8) {
        self.waveform = Waveform::SquareWave { value };
    }

    pub fn play_track(&mut self, track: DigitizedTrack) {
        log::debug!(
            "Playing {}B digitized track at {}Hz (loop: {})",
            track.data.len(),
            track.rate,
            track.looping
        );
        self.track = Some(track);
    }

    pub fn stop_track(&mut self) {
        self.track = None;
    }

    /// Synthesizes exactly one frame of samples into `out`
    pub fn push_samples<S: PcmSample>(&mut self, sound_timer: u8, out: &mut [S]) -> C8Result<()> {
        let expected = self.samples_per_frame();
        if out.len() != expected {
            return Err(C8Error::Argument(format!(
                "audio buffer holds {} samples but a frame needs {}",
                out.len(),
                expected
            )));
        }

        if self.track.is_some() {
            self.push_track_samples(out);
            return Ok(());
        }

        if sound_timer == 0 {
            self.phase = 0.0;
            out.fill(S::SILENCE);
            return Ok(());
        }

        let step = self.step();
        for sample in out.iter_mut() {
            let bit = ((self.phase * AUDIO_PATTERN_BITS) as usize).min(AUDIO_PATTERN_BITS as usize - 1);
            let is_high = self.buffer[bit / 8] >> (7 - bit % 8) & 1 == 1;
            *sample = S::from_level(if is_high { self.volume } else { -self.volume });
            self.phase = (self.phase + step).fract();
        }

        Ok(())
    }

    fn push_track_samples<S: PcmSample>(&mut self, out: &mut [S]) {
        let sample_rate = self.sample_rate as f64;
        let volume = self.volume;
        let mut finished = false;

        if let Some(track) = self.track.as_mut() {
            let step = track.rate as f64 / sample_rate;
            for sample in out.iter_mut() {
                let Some(&byte) = track.data.get(track.position as usize) else {
                    if track.looping && !track.data.is_empty() {
                        track.position = 0.0;
                        *sample = S::from_level((track.data[0] as f32 - 128.0) / 128.0 * volume);
                        track.position += step;
                        continue;
                    }
                    finished = true;
                    *sample = S::SILENCE;
                    continue;
                };

                *sample = S::from_level((byte as f32 - 128.0) / 128.0 * volume);
                track.position += step;
            }
        }

        if finished {
            log::debug!("Digitized track finished");
            self.track = None;
        }
    }
}

pub fn pitch_to_bit_rate(pitch: u8) -> f64 {
    BASE_SAMPLE_RATE * 2.0_f64.powf((pitch as f64 - 64.0) / 48.0)
}

#[cfg(feature = "audio")]
pub use output::{spawn_audio_stream, AudioOutput};

#[cfg(feature = "audio")]
mod output {
    use super::{C8Error, C8Result};

    use rodio::{buffer::SamplesBuffer, OutputStream, Sink};

    // frames queued beyond this are dropped so latency stays bounded
    const MAX_QUEUED_FRAMES: usize = 4;

    pub struct AudioOutput {
        sink: Sink,
        sample_rate: u32,
    }

    impl AudioOutput {
        pub fn push(&self, samples: Vec<f32>) {
            if self.sink.len() >= MAX_QUEUED_FRAMES {
                log::trace!("Audio queue full, dropping frame");
                return;
            }
            self.sink.append(SamplesBuffer::new(1, self.sample_rate, samples));
        }
    }

    /// The stream must be kept alive for as long as the output is used
    pub fn spawn_audio_stream(sample_rate: u32) -> C8Result<(OutputStream, AudioOutput)> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|err| C8Error::Io(format!("no audio output stream: {}", err)))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|err| C8Error::Io(format!("could not create audio sink: {}", err)))?;
        sink.play();

        Ok((stream, AudioOutput { sink, sample_rate }))
    }
}
