mod args;
mod audio;
mod config;
mod conversation;
mod error;
mod ffmpeg;
mod font;
mod http;
mod layout;
mod ledger;
mod llm;
mod render;
mod review;
mod source;
mod tts;
mod video;

use anyhow::Context;
use args::Args;
use clap::Parser;
use config::Settings;
use conversation::{Conversation, MalformedPolicy};
use ledger::Ledger;
use llm::LlmClient;
use render::Renderer;
use source::{Approve, AutoApprove, ConversationSource, StdinReview};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tts::TtsClient;
use video::Timeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting text story video generation pipeline");

    let args = Args::parse();
    let mut settings = Settings::load(&args.config)?;
    if args.strict {
        settings.prompt.policy = MalformedPolicy::Strict;
    }

    for path in [&settings.render.background_path, &settings.render.avatar_path] {
        if !path.exists() {
            error!("Required image not found: {}", path.display());
            std::process::exit(1);
        }
    }
    if let Some(music) = &args.music {
        if !music.exists() {
            error!("Background music not found: {}", music.display());
            std::process::exit(1);
        }
    }

    let renderer = Renderer::new(&settings.render)?;
    let ledger = Ledger::new(&args.ledger);
    info!("Using ledger {}", ledger.path().display());
    let backoff = Duration::from_millis(settings.http.retry_backoff_ms);
    let tts = TtsClient::new(settings.tts.clone(), backoff);

    let mut source = match &args.conversations {
        Some(path) => ConversationSource::prepared(path)?,
        None => {
            info!("Using language model at {}", settings.llm.base_url);
            ConversationSource::Model(LlmClient::new(settings.llm.clone(), backoff))
        }
    };
    let mut approver: Box<dyn Approve> = if args.yes {
        Box::new(AutoApprove)
    } else {
        Box::new(StdinReview)
    };

    fs::create_dir_all(&args.out_dir)?;
    let mut batch = Batch::default();

    for n in 0..args.count {
        info!("Conversation {}/{}", n + 1, args.count);
        let conversation = match source
            .next(&settings.prompt, settings.llm.max_attempts, &ledger, &mut *approver)
            .await
        {
            Ok(Some(conversation)) => conversation,
            Ok(None) => {
                warn!("No conversations left to use");
                break;
            }
            Err(e) => {
                error!("Failed to get a conversation: {:?}", e);
                batch.failed += 1;
                continue;
            }
        };

        match produce_video(&conversation, &args, &settings, &renderer, &tts).await {
            Ok(path) => batch.succeeded(&ledger, &conversation, path),
            Err(e) => {
                error!("Conversation {} failed: {:?}", conversation.id, e);
                batch.failed += 1;
            }
        }
    }

    info!(
        "Produced {} video(s), {} failed",
        batch.produced.len(),
        batch.failed
    );
    for path in &batch.produced {
        info!("  {}", path.display());
    }
    if batch.unrecorded > 0 {
        warn!(
            "{} video(s) are missing from ledger {} and may be produced again",
            batch.unrecorded,
            ledger.path().display()
        );
    }
    if batch.produced.is_empty() && batch.failed > 0 {
        anyhow::bail!("Every conversation failed");
    }
    info!("Process complete.");
    Ok(())
}

/// Running tally of one batch.
#[derive(Debug, Default)]
struct Batch {
    produced: Vec<PathBuf>,
    failed: usize,
    unrecorded: usize,
}

impl Batch {
    /// Keeps the finished video even when the ledger cannot be written.
    fn succeeded(&mut self, ledger: &Ledger, conversation: &Conversation, video: PathBuf) {
        if let Err(e) = ledger.record(conversation) {
            error!(
                "Failed to record conversation {} in ledger: {:?}",
                conversation.id, e
            );
            self.unrecorded += 1;
        }
        self.produced.push(video);
    }
}

async fn produce_video(
    conversation: &Conversation,
    args: &Args,
    settings: &Settings,
    renderer: &Renderer<'_>,
    tts: &TtsClient,
) -> anyhow::Result<PathBuf> {
    let dir = args.out_dir.join(conversation.id.to_string());
    if dir.exists() {
        info!("Removing existing work dir '{}'", dir.display());
        fs::remove_dir_all(&dir)?;
    }
    fs::create_dir_all(&dir)?;

    let mut audios = Vec::with_capacity(conversation.turns.len());
    for (i, turn) in conversation.turns.iter().enumerate() {
        let path = dir.join(format!("aud{:02}.wav", i));
        info!(
            "Generating speech {}/{} ({} chars)",
            i + 1,
            conversation.turns.len(),
            turn.text.chars().count()
        );
        tts.synthesize(&turn.text, &path)
            .await
            .with_context(|| format!("Speech synthesis failed for line {}", i + 1))?;
        audios.push(path);
    }

    info!("Rendering captures");
    let captures = renderer.render_captures(&conversation.turns, &args.name, &args.time, &dir)?;

    let speech = dir.join("speech.wav");
    let durations = audio::join_with_pauses(&audios, args.pause, &speech)?;
    info!(
        "Speech track is {:.2}s long",
        audio::wav_duration_seconds(&speech)?
    );
    let timeline = Timeline::build(&captures, &audios, &durations, args.pause)?;

    let out = dir.join("video.mp4");
    video::compose(
        &timeline,
        &speech,
        args.music.as_deref(),
        settings.render.canvas_size,
        &settings.video,
        &out,
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversation::parse_dialogue;

    fn conversation(raw: &str) -> Conversation {
        Conversation::new(parse_dialogue(raw, 11).turns)
    }

    #[test]
    fn produced_videos_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("config").join("used.jsonl"));
        let conv = conversation("A: Coucou!\nB: Salut");

        let mut batch = Batch::default();
        batch.succeeded(&ledger, &conv, dir.path().join("video.mp4"));

        assert_eq!(batch.produced.len(), 1);
        assert_eq!(batch.unrecorded, 0);
        assert!(ledger.is_used(&conv.id.to_string()).unwrap());
    }

    #[test]
    fn ledger_failure_keeps_the_batch_going() {
        // a regular file where the ledger directory should be
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let ledger = Ledger::new(blocker.path().join("used.jsonl"));

        let mut batch = Batch::default();
        batch.succeeded(&ledger, &conversation("A: Coucou!\nB: Salut"), PathBuf::from("a.mp4"));
        batch.succeeded(&ledger, &conversation("A: Tu dors ?\nB: Non"), PathBuf::from("b.mp4"));

        assert_eq!(batch.produced, vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")]);
        assert_eq!(batch.unrecorded, 2);
        assert_eq!(batch.failed, 0);
    }
}
