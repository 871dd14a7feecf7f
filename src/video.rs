use crate::config::VideoConfig;
use crate::ffmpeg;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One capture on screen while its line is spoken, plus the pause after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub image: PathBuf,
    pub audio: PathBuf,
    pub offset: f64,
    pub end: f64,
}

impl Clip {
    pub fn length(&self) -> f64 {
        self.end - self.offset
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub clips: Vec<Clip>,
}

impl Timeline {
    /// Lays the clips end to end. Clip `i` lasts `durations[i] + pause`.
    pub fn build(
        images: &[PathBuf],
        audios: &[PathBuf],
        durations: &[f64],
        pause: f64,
    ) -> anyhow::Result<Timeline> {
        if images.len() != audios.len() || audios.len() != durations.len() {
            anyhow::bail!(
                "Timeline needs one image and one duration per audio clip, got {} images, {} audio clips, {} durations",
                images.len(),
                audios.len(),
                durations.len()
            );
        }

        let mut clips = Vec::with_capacity(images.len());
        let mut time = 0.0_f64;
        for ((image, audio), dur) in images.iter().zip(audios).zip(durations) {
            let end = time + *dur + pause;
            clips.push(Clip {
                image: image.clone(),
                audio: audio.clone(),
                offset: time,
                end,
            });
            time = end;
        }
        Ok(Timeline { clips })
    }

    pub fn total_duration(&self) -> f64 {
        self.clips.last().map(|c| c.end).unwrap_or(0.0)
    }
}

fn filter_graph(timeline: &Timeline, size: (u32, u32), config: &VideoConfig, with_music: bool) -> String {
    let n = timeline.clips.len();
    let (w, h) = size;
    let zoom = if config.max_zoom > 1.0 {
        format!("'min(zoom+{},{})'", config.zoom_step, config.max_zoom)
    } else {
        "1".to_string()
    };

    let mut parts = Vec::with_capacity(n + 2);
    let mut labels = String::new();
    for (i, clip) in timeline.clips.iter().enumerate() {
        let frames = ((clip.length() * config.fps as f64).round() as u64).max(1);
        parts.push(format!(
            "[{i}:v]scale={w}:{h},setsar=1,zoompan=z={zoom}:x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d={frames}:s={w}x{h}:fps={fps}[v{i}]",
            fps = config.fps
        ));
        labels.push_str(&format!("[v{i}]"));
    }
    parts.push(format!("{labels}concat=n={n}:v=1:a=0,format=yuv420p[v]"));

    if with_music {
        parts.push(format!(
            "[{music}:a]volume={vol}[bg];[{n}:a][bg]amix=inputs=2:duration=first:normalize=0[a]",
            music = n + 1,
            vol = config.music_volume
        ));
    } else {
        parts.push(format!("[{n}:a]anull[a]"));
    }
    parts.join(";")
}

/// Encodes the final video: captures with a slow zoom, the joined speech
/// track and, when given, looping background music underneath.
pub fn compose(
    timeline: &Timeline,
    speech: &Path,
    music: Option<&Path>,
    size: (u32, u32),
    config: &VideoConfig,
    out: &Path,
) -> anyhow::Result<()> {
    if timeline.clips.is_empty() {
        anyhow::bail!("Nothing to compose, the timeline is empty");
    }

    let mut args: Vec<String> = vec!["-y".into()];
    for clip in &timeline.clips {
        debug!(
            "{} with {} from {:.2}s to {:.2}s",
            clip.image.display(),
            clip.audio.display(),
            clip.offset,
            clip.end
        );
        args.push("-i".into());
        args.push(clip.image.to_string_lossy().into_owned());
    }
    args.push("-i".into());
    args.push(speech.to_string_lossy().into_owned());
    if let Some(music) = music {
        args.extend(["-stream_loop", "-1", "-i"].map(String::from));
        args.push(music.to_string_lossy().into_owned());
    }

    args.push("-filter_complex".into());
    args.push(filter_graph(timeline, size, config, music.is_some()));
    for a in [
        "-map", "[v]", "-map", "[a]", "-c:v", "libx264", "-c:a", "aac", "-shortest",
    ] {
        args.push(a.into());
    }
    args.push("-r".into());
    args.push(config.fps.to_string());
    args.push(out.to_string_lossy().into_owned());

    info!(
        "Composing {} clips ({:.1}s) into {}",
        timeline.clips.len(),
        timeline.total_duration(),
        out.display()
    );
    ffmpeg::run(&args, "produce final video")?;
    info!("Final video written to {}", out.display());
    Ok(())
}
