use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, Stream, StreamConfig};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use blackbox_foundation::AudioError;

use crate::source::{AudioFrame, FrameSource};

/// Counters shared between the device callback and the session owner.
#[derive(Debug, Default)]
pub struct CaptureStats {
    pub frames_captured: AtomicU64,
    pub samples_captured: AtomicU64,
    /// Frames discarded because the session fell behind. The callback
    /// never blocks on a full channel; it drops and counts.
    pub frames_dropped: AtomicU64,
}

enum CaptureMessage {
    Frame(AudioFrame),
    Error(AudioError),
}

/// Microphone-backed `FrameSource` built on cpal.
///
/// The device callback converts incoming samples to mono i16 and pushes
/// them through a bounded channel with `try_send`, so a slow consumer
/// costs dropped frames, never a stalled device thread.
pub struct CpalFrameSource {
    device: cpal::Device,
    stream_config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    tx: Sender<CaptureMessage>,
    rx: Receiver<CaptureMessage>,
    stats: Arc<CaptureStats>,
}

/// Bound on in-flight frames between callback and session thread.
const FRAME_CHANNEL_CAPACITY: usize = 64;

impl CpalFrameSource {
    /// Select the capture device and negotiate a stream config as close
    /// as possible to the requested rate/channel count.
    pub fn open(
        device_name: Option<&str>,
        sample_rate_hz: u32,
        channels: u16,
    ) -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(wanted) => host
                .input_devices()
                .map_err(|_| AudioError::DeviceNotFound {
                    name: Some(wanted.to_string()),
                })?
                .find(|d| {
                    d.name()
                        .map(|n| n == wanted || n.contains(wanted))
                        .unwrap_or(false)
                })
                .ok_or(AudioError::DeviceNotFound {
                    name: Some(wanted.to_string()),
                })?,
            None => host
                .default_input_device()
                .ok_or(AudioError::DeviceNotFound { name: None })?,
        };

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "<unknown>".into()),
            "opening capture device"
        );

        let (stream_config, sample_format) =
            Self::negotiate_config(&device, sample_rate_hz, channels)?;

        tracing::debug!(
            rate = stream_config.sample_rate.0,
            channels = stream_config.channels,
            format = ?sample_format,
            "negotiated stream config"
        );

        let (tx, rx) = crossbeam_channel::bounded(FRAME_CHANNEL_CAPACITY);

        Ok(Self {
            device,
            stream_config,
            sample_format,
            stream: None,
            tx,
            rx,
            stats: Arc::new(CaptureStats::default()),
        })
    }

    fn negotiate_config(
        device: &cpal::Device,
        sample_rate_hz: u32,
        channels: u16,
    ) -> Result<(StreamConfig, SampleFormat), AudioError> {
        let mut ranges: Vec<_> = device.supported_input_configs()?.collect();
        // Prefer the requested channel count, then the fewest channels.
        ranges.sort_by_key(|r| (r.channels() != channels, r.channels()));

        for range in &ranges {
            if range.min_sample_rate().0 <= sample_rate_hz
                && sample_rate_hz <= range.max_sample_rate().0
            {
                let supported = range.clone().with_sample_rate(SampleRate(sample_rate_hz));
                return Ok((supported.config(), supported.sample_format()));
            }
        }

        // No range covers the requested rate; take the closest we can get.
        match ranges.into_iter().next() {
            Some(range) => {
                let supported = range.with_max_sample_rate();
                tracing::warn!(
                    requested = sample_rate_hz,
                    actual = supported.config().sample_rate.0,
                    "requested sample rate unsupported, using device maximum"
                );
                Ok((supported.config(), supported.sample_format()))
            }
            None => Err(AudioError::FormatNotSupported {
                format: format!("{} Hz, {} ch", sample_rate_hz, channels),
            }),
        }
    }

    fn build_stream<T>(&self, convert: fn(T) -> i16) -> Result<Stream, AudioError>
    where
        T: cpal::SizedSample + Send + 'static,
    {
        let tx = self.tx.clone();
        let stats = Arc::clone(&self.stats);
        let channels = self.stream_config.channels as usize;
        let sample_rate = self.stream_config.sample_rate.0;

        let err_tx = self.tx.clone();
        let stream = self.device.build_input_stream(
            &self.stream_config,
            move |data: &[T], _info| {
                let samples = downmix(data, channels, convert);
                let frame = AudioFrame {
                    samples: samples.into(),
                    timestamp: Instant::now(),
                    sample_rate,
                };
                match tx.try_send(CaptureMessage::Frame(frame)) {
                    Ok(()) => {
                        stats.frames_captured.fetch_add(1, Ordering::Relaxed);
                        stats
                            .samples_captured
                            .fetch_add((data.len() / channels) as u64, Ordering::Relaxed);
                    }
                    Err(_) => {
                        stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            },
            move |err| {
                tracing::error!("capture stream error: {}", err);
                let _ = err_tx.try_send(CaptureMessage::Error(err.into()));
            },
            None,
        )?;
        Ok(stream)
    }
}

/// Collapse interleaved channels to mono by averaging each sample group.
fn downmix<T: Copy>(data: &[T], channels: usize, convert: fn(T) -> i16) -> Vec<i16> {
    if channels <= 1 {
        return data.iter().map(|&s| convert(s)).collect();
    }
    data.chunks_exact(channels)
        .map(|group| {
            let sum: i32 = group.iter().map(|&s| convert(s) as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

impl FrameSource for CpalFrameSource {
    fn start(&mut self) -> Result<(), AudioError> {
        let stream = match self.sample_format {
            SampleFormat::I16 => self.build_stream::<i16>(|s| s)?,
            SampleFormat::U16 => self.build_stream::<u16>(|s| (s as i32 - 32768) as i16)?,
            SampleFormat::F32 => {
                self.build_stream::<f32>(|s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)?
            }
            other => {
                return Err(AudioError::FormatNotSupported {
                    format: format!("{:?}", other),
                })
            }
        };
        stream.play()?;
        self.stream = Some(stream);
        Ok(())
    }

    fn next_frame(&mut self, timeout: Duration) -> Result<Option<AudioFrame>, AudioError> {
        match self.rx.recv_timeout(timeout) {
            Ok(CaptureMessage::Frame(frame)) => Ok(Some(frame)),
            Ok(CaptureMessage::Error(err)) => Err(err),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(AudioError::DeviceDisconnected),
        }
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
            drop(stream);
            tracing::debug!("capture stream released");
        }
    }

    fn sample_rate(&self) -> u32 {
        self.stream_config.sample_rate.0
    }

    fn stats(&self) -> Arc<CaptureStats> {
        Arc::clone(&self.stats)
    }
}

impl Drop for CpalFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_mono_is_identity() {
        let data = [1i16, -2, 3];
        assert_eq!(downmix(&data, 1, |s| s), vec![1, -2, 3]);
    }

    #[test]
    fn downmix_stereo_averages_pairs() {
        let data = [100i16, 300, -200, 0];
        assert_eq!(downmix(&data, 2, |s| s), vec![200, -100]);
    }

    #[test]
    fn f32_conversion_clamps() {
        let convert = |s: f32| (s.clamp(-1.0, 1.0) * 32767.0) as i16;
        assert_eq!(convert(2.0), 32767);
        assert_eq!(convert(-2.0), -32767);
        assert_eq!(convert(0.0), 0);
    }

    // Requires a working microphone; run with --features live-hardware-tests
    #[cfg(feature = "live-hardware-tests")]
    #[test]
    fn open_default_device() {
        let source = CpalFrameSource::open(None, 44_100, 1);
        assert!(source.is_ok());
    }
}
