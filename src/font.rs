use crate::error::FontError;
use crate::layout::WidthMeasurer;
use anyhow::Context;
use owned_ttf_parser::{AsFaceRef, OwnedFace};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What to do with characters the font has no glyph for (mostly emoji)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlyphPolicy {
    /// Fail the measurement with [`FontError::MissingGlyph`]
    Strict,
    /// Count the character as one em wide, which is how emoji get pasted in
    #[default]
    EmSquare,
}

/// A parsed TTF/OTF font, kept around for metrics only. Drawing goes through
/// ffmpeg, which is handed [`Font::path`].
pub struct Font {
    path: PathBuf,
    face: OwnedFace,
}

impl Font {
    pub fn load(path: &Path) -> anyhow::Result<Font> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font {}", path.display()))?;
        let face = OwnedFace::from_vec(bytes, 0)
            .with_context(|| format!("Failed to parse font {}", path.display()))?;
        Ok(Font {
            path: path.to_path_buf(),
            face,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn scale(&self, size: f32) -> f32 {
        size / self.face.as_face_ref().units_per_em() as f32
    }

    /// Vertical advance between two rows of text at `size`
    pub fn line_height(&self, size: f32) -> f32 {
        let face = self.face.as_face_ref();
        let units = face.ascender() as f32 - face.descender() as f32 + face.line_gap() as f32;
        self.scale(size) * units
    }

    /// Sum of the horizontal advances of every character. Kerning is ignored.
    pub fn text_width(&self, text: &str, size: f32, policy: GlyphPolicy) -> Result<f32, FontError> {
        let face = self.face.as_face_ref();
        let scale = self.scale(size);
        let mut width = 0.0;
        for ch in text.chars() {
            match face.glyph_index(ch) {
                Some(glyph) => {
                    let advance = face
                        .glyph_hor_advance(glyph)
                        .ok_or(FontError::MissingAdvance(ch))?;
                    width += advance as f32 * scale;
                }
                None if ch.is_control() || is_zero_width(ch) => {}
                None => match policy {
                    GlyphPolicy::Strict => return Err(FontError::MissingGlyph(ch)),
                    GlyphPolicy::EmSquare => width += size,
                },
            }
        }
        Ok(width)
    }
}

// variation selectors and joiners glue emoji sequences together
fn is_zero_width(ch: char) -> bool {
    matches!(ch, '\u{200D}' | '\u{FE00}'..='\u{FE0F}')
}

/// Measures word runs with a font at a fixed size.
pub struct FontMeasurer<'a> {
    pub font: &'a Font,
    pub size: f32,
    pub policy: GlyphPolicy,
}

impl WidthMeasurer for FontMeasurer<'_> {
    type Error = FontError;

    fn measure(&self, words: &[&str]) -> Result<f32, FontError> {
        self.font
            .text_width(&words.join(" "), self.size, self.policy)
    }
}
