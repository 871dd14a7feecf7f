use anyhow::Context;
use hound::{WavReader, WavWriter};
use std::path::{Path, PathBuf};
use tracing::info;

pub fn wav_duration_seconds(path: &Path) -> anyhow::Result<f64> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();
    let samples = reader.len();
    let frames = samples as f64 / spec.channels as f64;
    let duration = frames / spec.sample_rate as f64;
    Ok(duration)
}

/// Concatenates `parts` into `out`, following each one with `pause` seconds
/// of silence. All parts must share the same WAV spec. Returns the speech
/// duration of every part.
pub fn join_with_pauses(parts: &[PathBuf], pause: f64, out: &Path) -> anyhow::Result<Vec<f64>> {
    let Some(first) = parts.first() else {
        anyhow::bail!("No audio parts to join");
    };
    let spec = WavReader::open(first)
        .with_context(|| format!("Failed to open {}", first.display()))?
        .spec();
    let mut writer = WavWriter::create(out, spec)?;
    let silence_frames = (pause * spec.sample_rate as f64).round() as u64;

    let mut durations = Vec::with_capacity(parts.len());
    for part in parts {
        let mut reader = WavReader::open(part)
            .with_context(|| format!("Failed to open {}", part.display()))?;
        if reader.spec() != spec {
            anyhow::bail!(
                "{} has format {:?}, expected {:?}",
                part.display(),
                reader.spec(),
                spec
            );
        }
        let frames = reader.len() as f64 / spec.channels as f64;
        durations.push(frames / spec.sample_rate as f64);

        match spec.sample_format {
            hound::SampleFormat::Int => {
                for sample in reader.samples::<i32>() {
                    writer.write_sample(sample?)?;
                }
                for _ in 0..silence_frames * spec.channels as u64 {
                    writer.write_sample(0i32)?;
                }
            }
            hound::SampleFormat::Float => {
                for sample in reader.samples::<f32>() {
                    writer.write_sample(sample?)?;
                }
                for _ in 0..silence_frames * spec.channels as u64 {
                    writer.write_sample(0.0f32)?;
                }
            }
        }
    }
    writer.finalize()?;
    info!(
        "Joined {} clips into {} ({:.2}s of speech)",
        parts.len(),
        out.display(),
        durations.iter().sum::<f64>()
    );
    Ok(durations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec};

    fn spec(sample_rate: u32) -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    fn write_tone(path: &Path, spec: WavSpec, frames: u32) {
        let mut w = WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            w.write_sample(((i % 100) as i16) * 100).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn duration_of_one_second() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        write_tone(&path, spec(16000), 16000);
        assert!((wav_duration_seconds(&path).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pauses_follow_every_clip() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("aud00.wav");
        let b = dir.path().join("aud01.wav");
        write_tone(&a, spec(16000), 8000);
        write_tone(&b, spec(16000), 16000);

        let out = dir.path().join("speech.wav");
        let durations = join_with_pauses(&[a, b], 1.0, &out).unwrap();
        assert_eq!(durations, vec![0.5, 1.0]);
        // 0.5 + 1 + 1.0 + 1
        assert!((wav_duration_seconds(&out).unwrap() - 3.5).abs() < 1e-9);
    }

    #[test]
    fn mismatched_formats_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_tone(&a, spec(16000), 100);
        write_tone(&b, spec(22050), 100);
        let err = join_with_pauses(&[a, b], 0.5, &dir.path().join("out.wav")).unwrap_err();
        assert!(err.to_string().contains("b.wav"));
    }

    #[test]
    fn nothing_to_join() {
        let dir = tempfile::tempdir().unwrap();
        assert!(join_with_pauses(&[], 1.0, &dir.path().join("out.wav")).is_err());
    }
}
