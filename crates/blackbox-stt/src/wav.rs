//! In-memory WAV encoding of finished recordings.
//!
//! Remote transcription collaborators consume a PCM container, not bare
//! samples; this is the adapter between the recorder's buffer and that
//! contract.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use blackbox_audio::FinishedRecording;

use crate::SttError;

/// Serialize a clip as 16-bit PCM WAV bytes.
pub fn encode_wav(clip: &FinishedRecording) -> Result<Vec<u8>, SttError> {
    let spec = WavSpec {
        channels: clip.channels,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in &clip.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackbox_audio::StopReason;
    use std::time::Duration;

    fn clip(samples: Vec<i16>) -> FinishedRecording {
        FinishedRecording {
            samples,
            sample_rate: 44_100,
            channels: 1,
            duration: Duration::from_secs(1),
            stop_reason: StopReason::Silence,
        }
    }

    #[test]
    fn encodes_a_readable_container() {
        let samples = vec![0i16, 100, -100, 32767, -32768];
        let bytes = encode_wav(&clip(samples.clone())).unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 44_100);
        assert_eq!(reader.spec().channels, 1);
        let decoded: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn empty_clip_is_a_valid_container() {
        let bytes = encode_wav(&clip(vec![])).unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.len(), 0);
    }
}
