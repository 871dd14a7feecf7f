use crate::conversation::MalformedPolicy;
use crate::font::GlyphPolicy;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Settings file contents. Every section falls back to its defaults, so a
/// file only needs the keys it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub render: RenderOptions,
    pub prompt: PromptConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub video: VideoConfig,
    pub http: HttpConfig,
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Settings> {
        if !path.exists() {
            warn!("Settings file {} not found, using defaults", path.display());
            return Ok(Settings::default());
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        let settings = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse settings {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}

/// Everything the screenshot renderer needs. Built once, passed by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub canvas_size: (u32, u32),
    pub background_path: PathBuf,
    pub avatar_path: PathBuf,
    pub regular_font: PathBuf,
    pub bold_font: PathBuf,
    pub glyph_policy: GlyphPolicy,
    pub name_y_position: i32,
    pub name_font_size: f32,
    pub avatar_size: (u32, u32),
    pub avatar_position: (i64, i64),
    pub time_position: (i32, i32),
    pub time_font_size: f32,
    pub message_font_size: f32,
    pub message_max_width: f32,
    pub message_x_padding: u32,
    pub message_x_margin: u32,
    pub message_y_padding: u32,
    pub message_y_margin: u32,
    pub message_radius: u32,
    pub message_background_color_sending: String,
    pub message_background_color_receiving: String,
    pub message_text_color_sending: String,
    pub message_text_color_receiving: String,
    pub message_first_y: i64,
    pub message_area_size: (u32, u32),
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            canvas_size: (1080, 1920),
            background_path: PathBuf::from("./res/base_sms_iphone.png"),
            avatar_path: PathBuf::from("./res/profile_default.png"),
            regular_font: PathBuf::from("./res/fonts/OpenSans-Regular.ttf"),
            bold_font: PathBuf::from("./res/fonts/OpenSans-Bold.ttf"),
            glyph_policy: GlyphPolicy::EmSquare,
            name_y_position: 290,
            name_font_size: 35.0,
            avatar_size: (180, 180),
            avatar_position: (450, 100),
            time_position: (115, 85),
            time_font_size: 45.0,
            message_font_size: 45.0,
            message_max_width: 600.0,
            message_x_padding: 30,
            message_x_margin: 20,
            message_y_padding: 30,
            message_y_margin: 20,
            message_radius: 50,
            message_background_color_sending: "#0080FF".to_string(),
            message_background_color_receiving: "#E0DEE6".to_string(),
            message_text_color_sending: "#FFFFFF".to_string(),
            message_text_color_receiving: "#000000".to_string(),
            message_first_y: 354,
            message_area_size: (1080, 1566),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub preamble: String,
    /// Opening lines handed to the model; must end with the next speaker prefix
    pub seed: String,
    pub max_turns: usize,
    pub policy: MalformedPolicy,
}

impl Default for PromptConfig {
    fn default() -> Self {
        PromptConfig {
            preamble: "Deux amis parlent par SMS. Les messages sont courts. Le ton est détendu. \
                       Ils ont de l'humour. Pas d'explication a la fin de la conversation. \
                       Pas de traduction. L'échange s'arrête au bout de 10 répliques."
                .to_string(),
            seed: "A: J'ai une blague pour toi.\nB: Ah oui, dis moi.\nA: ".to_string(),
            max_turns: 11,
            policy: MalformedPolicy::Lenient,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base url of a llama.cpp compatible server
    pub base_url: String,
    pub n_predict: i32,
    pub temperature: f32,
    /// Generations to try per conversation before giving up
    pub max_attempts: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            base_url: "http://localhost:8080".to_string(),
            n_predict: 512,
            temperature: 0.8,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub host: String,
    pub port: u16,
    pub locale: String,
    pub voice: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        TtsConfig {
            host: "localhost".to_string(),
            port: 59125,
            locale: "fr".to_string(),
            voice: "upmc-pierre-hsmm".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub fps: u32,
    /// Zoom reached at the end of each segment; 1.0 disables the effect
    pub max_zoom: f32,
    pub zoom_step: f32,
    pub music_volume: f32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        VideoConfig {
            fps: 30,
            max_zoom: 1.04,
            zoom_step: 0.0005,
            music_volume: 0.12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub retry_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            retry_backoff_ms: 2000,
        }
    }
}
