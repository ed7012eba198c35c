//! Speech clips: raw PCM from the service, decoded samples, WAV files and
//! a stoppable playback handle.
//!
//! The service returns signed 16-bit little-endian mono PCM at 24 kHz with
//! no container. Decoding maps each sample to `sample / 32768.0`.

use crate::error::{Stage, ToolverseError};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Sample rate of synthesised speech.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Raw PCM as returned by speech synthesis.
#[derive(Clone, PartialEq, Eq)]
pub struct SpeechClip {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl std::fmt::Debug for SpeechClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechClip")
            .field("bytes", &self.pcm.len())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}

/// Decoded samples in -1.0..1.0, interleaved by channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl SpeechClip {
    /// 24 kHz mono PCM.
    pub fn from_pcm(pcm: Vec<u8>) -> Self {
        Self {
            pcm,
            sample_rate: SPEECH_SAMPLE_RATE,
            channels: 1,
        }
    }

    /// Decode into floating-point samples. A trailing odd byte is ignored.
    pub fn decode(&self) -> AudioBuffer {
        let samples: Vec<f32> = self
            .pcm
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
            .collect();
        debug!("Decoded {} samples at {} Hz", samples.len(), self.sample_rate);
        AudioBuffer {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples,
        }
    }

    /// The clip as a RIFF/WAVE file.
    pub fn to_wav(&self) -> Vec<u8> {
        let data_len = (self.pcm.len() - self.pcm.len() % 2) as u32;
        let block_align = self.channels * 2;
        let byte_rate = self.sample_rate * block_align as u32;

        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&self.channels.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.extend_from_slice(&self.pcm[..data_len as usize]);
        out
    }
}

impl AudioBuffer {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate.max(1) as f64)
    }
}

// ── Playback ─────────────────────────────────────────────────────────────

/// Where playback sends samples, e.g. an audio device or a pipe.
pub trait AudioSink: Send + 'static {
    fn write_samples(&mut self, samples: &[f32]) -> std::io::Result<()>;
}

/// Writes samples back out as s16le PCM, e.g. to stdout for `aplay`.
pub struct PcmWriter<W: Write + Send + 'static>(pub W);

impl<W: Write + Send + 'static> AudioSink for PcmWriter<W> {
    fn write_samples(&mut self, samples: &[f32]) -> std::io::Result<()> {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            let v = (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        self.0.write_all(&bytes)?;
        self.0.flush()
    }
}

/// How a playback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOutcome {
    pub frames_played: usize,
    pub stopped: bool,
}

/// A running playback that can be stopped from anywhere.
pub struct Playback {
    stop: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<Result<PlaybackOutcome, ToolverseError>>,
}

/// Frames written per chunk (100 ms at 24 kHz).
const CHUNK_FRAMES: usize = 2_400;

impl Playback {
    /// Start feeding `buffer` to `sink`. With `realtime`, chunks are paced
    /// at the buffer's sample rate.
    pub fn start<S: AudioSink>(buffer: AudioBuffer, mut sink: S, realtime: bool) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        info!("Playing {:.1}s of audio", buffer.duration().as_secs_f32());

        let task = tokio::task::spawn_blocking(move || {
            let channels = buffer.channels.max(1) as usize;
            let mut frames_played = 0;
            for chunk in buffer.samples.chunks(CHUNK_FRAMES * channels) {
                if flag.load(Ordering::SeqCst) {
                    debug!("Playback stopped after {} frames", frames_played);
                    return Ok(PlaybackOutcome {
                        frames_played,
                        stopped: true,
                    });
                }
                sink.write_samples(chunk)
                    .map_err(|e| ToolverseError::decode(Stage::Write, "audio output", e))?;
                let frames = chunk.len() / channels;
                frames_played += frames;
                if realtime {
                    std::thread::sleep(Duration::from_secs_f64(frames as f64 / buffer.sample_rate.max(1) as f64));
                }
            }
            Ok(PlaybackOutcome {
                frames_played,
                stopped: false,
            })
        });
        Self { stop, task }
    }

    /// Ask playback to stop at the next chunk boundary.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// A handle that stops this playback when triggered.
    pub fn stopper(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for playback to end.
    pub async fn wait(self) -> Result<PlaybackOutcome, ToolverseError> {
        self.task
            .await
            .map_err(|e| ToolverseError::Internal(format!("Playback task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn decode_scales_samples() {
        let clip = SpeechClip::from_pcm(vec![0x00, 0x80, 0x00, 0x00, 0xFF, 0x7F, 0x00, 0x40]);
        let buf = clip.decode();
        assert_eq!(buf.frames(), 4);
        assert_eq!(buf.samples[0], -1.0);
        assert_eq!(buf.samples[1], 0.0);
        assert_eq!(buf.samples[2], 32767.0 / 32768.0);
        assert_eq!(buf.samples[3], 0.5);
        assert_eq!(buf.sample_rate, 24_000);
        assert_eq!(buf.channels, 1);
    }

    #[test]
    fn odd_trailing_byte_dropped() {
        let clip = SpeechClip::from_pcm(vec![0, 0, 7]);
        assert_eq!(clip.decode().frames(), 1);
        assert_eq!(clip.to_wav().len(), 46);
    }

    #[test]
    fn wav_header() {
        let clip = SpeechClip::from_pcm(vec![1, 0, 2, 0]);
        let wav = clip.to_wav();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(wav[4..8].try_into().unwrap()), 40);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes(wav[24..28].try_into().unwrap()), 24_000);
        assert_eq!(u32::from_le_bytes(wav[28..32].try_into().unwrap()), 48_000);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(&wav[44..], &[1, 0, 2, 0]);
    }

    #[test]
    fn duration_from_frames() {
        let buf = AudioBuffer {
            sample_rate: 24_000,
            channels: 1,
            samples: vec![0.0; 12_000],
        };
        assert_eq!(buf.duration(), Duration::from_millis(500));
    }

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<f32>>>);

    impl AudioSink for Collect {
        fn write_samples(&mut self, samples: &[f32]) -> std::io::Result<()> {
            self.0.lock().unwrap().extend_from_slice(samples);
            Ok(())
        }
    }

    #[tokio::test]
    async fn playback_runs_to_end() {
        let sink = Collect::default();
        let buf = AudioBuffer {
            sample_rate: 24_000,
            channels: 1,
            samples: vec![0.25; 5_000],
        };
        let outcome = Playback::start(buf, sink.clone(), false).wait().await.unwrap();
        assert_eq!(outcome, PlaybackOutcome { frames_played: 5_000, stopped: false });
        assert_eq!(sink.0.lock().unwrap().len(), 5_000);
    }

    #[tokio::test]
    async fn stopped_before_start_plays_nothing() {
        let buf = AudioBuffer {
            sample_rate: 24_000,
            channels: 1,
            samples: vec![0.0; 48_000],
        };
        let playback = Playback::start(buf, Collect::default(), true);
        playback.stop();
        let outcome = playback.wait().await.unwrap();
        assert!(outcome.stopped);
        assert!(outcome.frames_played < 48_000);
    }

    #[test]
    fn pcm_writer_round_trips_levels() {
        let mut out = PcmWriter(Vec::new());
        out.write_samples(&[0.5, -2.0]).unwrap();
        assert_eq!(out.0, vec![0x00, 0x40, 0x01, 0x80]);
    }
}
