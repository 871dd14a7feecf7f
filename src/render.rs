//! Phone screenshot rendering.
//!
//! Raster work (background, avatar, bubble shapes) is done with `image`;
//! text is drawn by ffmpeg's `drawtext` so glyph rasterization stays out of
//! this crate. Each capture shows every message up to and including the
//! current one, scrolled so the newest bubble sits at the bottom.

use crate::config::RenderOptions;
use crate::conversation::{Speaker, Turn};
use crate::ffmpeg::{self, escape_value};
use crate::font::{Font, FontMeasurer};
use crate::layout::wrap_lines;
use anyhow::Context;
use image::{imageops, Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub fn parse_color(hex: &str) -> anyhow::Result<Rgba<u8>> {
    let digits = hex.trim().trim_start_matches('#');
    let channel = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .with_context(|| format!("Invalid colour {:?}", hex))
    };
    match digits.len() {
        6 if digits.is_ascii() => Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, 255])),
        8 if digits.is_ascii() => Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, channel(6)?])),
        _ => anyhow::bail!("Invalid colour {:?}, expected #RRGGBB or #RRGGBBAA", hex),
    }
}

fn ffmpeg_color(c: Rgba<u8>) -> String {
    format!("0x{:02X}{:02X}{:02X}{:02X}", c[0], c[1], c[2], c[3])
}

/// An RGBA drawing surface. Dropped or saved once drawing is finished.
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Canvas {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Pastes `top` with its alpha at `(x, y)`; parts outside are clipped.
    pub fn overlay(&mut self, top: &RgbaImage, x: i64, y: i64) {
        imageops::overlay(&mut self.image, top, x, y);
    }

    /// Fills a rounded rectangle, 4x supersampled on the edges. Anything
    /// outside the canvas is clipped.
    pub fn fill_rounded_rect(&mut self, x: i64, y: i64, w: u32, h: u32, radius: u32, color: Rgba<u8>) {
        let (cw, ch) = self.image.dimensions();
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w as i64).min(cw as i64);
        let y1 = (y + h as i64).min(ch as i64);
        let r = (radius as f32).min(w as f32 / 2.0).min(h as f32 / 2.0);
        let (fx, fy, fw, fh) = (x as f32, y as f32, w as f32, h as f32);

        for py in y0..y1 {
            for px in x0..x1 {
                let mut hits = 0;
                for (ox, oy) in [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)] {
                    let sx = px as f32 + ox;
                    let sy = py as f32 + oy;
                    let dx = (fx + r - sx).max(sx - (fx + fw - r)).max(0.0);
                    let dy = (fy + r - sy).max(sy - (fy + fh - r)).max(0.0);
                    if dx * dx + dy * dy <= r * r {
                        hits += 1;
                    }
                }
                if hits > 0 {
                    let dst = self.image.get_pixel_mut(px as u32, py as u32);
                    blend(dst, color, hits as f32 / 4.0);
                }
            }
        }
    }

    pub fn save(self, path: &Path) -> anyhow::Result<()> {
        self.image
            .save(path)
            .with_context(|| format!("Failed to save {}", path.display()))
    }
}

// source-over compositing of `src` scaled by `coverage`
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, coverage: f32) {
    let sa = src[3] as f32 / 255.0 * coverage;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }
    for i in 0..3 {
        let c = (src[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) / out_a;
        dst[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

/// A laid out message: wrapped text plus its box inside the message strip.
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub speaker: Speaker,
    pub text: String,
    pub x: i64,
    pub top: i64,
    pub width: u32,
    pub height: u32,
}

impl Bubble {
    pub fn bottom(&self) -> i64 {
        self.top + self.height as i64
    }
}

/// Left edge of a bubble: received messages hug the left margin, sent ones
/// the right margin.
pub fn bubble_x(speaker: Speaker, width: u32, area_width: u32, margin: u32) -> i64 {
    match speaker {
        Speaker::Received => margin as i64,
        Speaker::Sent => area_width as i64 - margin as i64 - width as i64,
    }
}

/// Top of each bubble in strip coordinates, with `margin` above every one.
pub fn stack_tops(heights: &[u32], margin: u32) -> Vec<i64> {
    let mut tops = Vec::with_capacity(heights.len());
    let mut y = margin as i64;
    for &h in heights {
        tops.push(y);
        y += h as i64 + margin as i64;
    }
    tops
}

/// How far the strip must scroll up so that `bottom` (plus a margin) is
/// visible in an area `area_height` tall.
pub fn scroll_offset(bottom: i64, margin: u32, area_height: u32) -> i64 {
    (bottom + margin as i64 - area_height as i64).max(0)
}

pub struct Renderer<'a> {
    options: &'a RenderOptions,
    regular: Font,
    bold: Font,
}

impl<'a> Renderer<'a> {
    pub fn new(options: &'a RenderOptions) -> anyhow::Result<Self> {
        Ok(Renderer {
            options,
            regular: Font::load(&options.regular_font)?,
            bold: Font::load(&options.bold_font)?,
        })
    }

    /// Wraps every turn and positions its bubble in the message strip.
    pub fn layout(&self, turns: &[Turn]) -> anyhow::Result<Vec<Bubble>> {
        let o = self.options;
        let measurer = FontMeasurer {
            font: &self.regular,
            size: o.message_font_size,
            policy: o.glyph_policy,
        };
        let line_height = self.regular.line_height(o.message_font_size);

        let mut sized = Vec::with_capacity(turns.len());
        for turn in turns {
            let lines = wrap_lines(&turn.text, o.message_max_width, &measurer)?;
            let mut text_width: f32 = 0.0;
            for line in &lines {
                text_width = text_width.max(self.regular.text_width(
                    &line.join(" "),
                    o.message_font_size,
                    o.glyph_policy,
                )?);
            }
            let text = lines
                .iter()
                .map(|l| l.join(" "))
                .collect::<Vec<_>>()
                .join("\n");
            let width = text_width.ceil() as u32 + 2 * o.message_x_padding;
            let height = (line_height * lines.len() as f32).ceil() as u32 + 2 * o.message_y_padding;
            sized.push((turn.speaker, text, width, height));
        }

        let heights: Vec<u32> = sized.iter().map(|s| s.3).collect();
        let tops = stack_tops(&heights, o.message_y_margin);
        Ok(sized
            .into_iter()
            .zip(tops)
            .map(|((speaker, text, width, height), top)| Bubble {
                speaker,
                x: bubble_x(speaker, width, o.message_area_size.0, o.message_x_margin),
                text,
                top,
                width,
                height,
            })
            .collect())
    }

    /// Background plus avatar; identical for every capture of a video.
    pub fn render_header(&self, out: &Path) -> anyhow::Result<()> {
        let o = self.options;
        let mut canvas = Canvas::new(o.canvas_size.0, o.canvas_size.1);

        let background = image::open(&o.background_path)
            .with_context(|| format!("Failed to open {}", o.background_path.display()))?
            .to_rgba8();
        canvas.overlay(&background, 0, 0);

        let avatar = image::open(&o.avatar_path)
            .with_context(|| format!("Failed to open {}", o.avatar_path.display()))?
            .to_rgba8();
        let avatar = imageops::resize(
            &avatar,
            o.avatar_size.0,
            o.avatar_size.1,
            imageops::FilterType::Lanczos3,
        );
        canvas.overlay(&avatar, o.avatar_position.0, o.avatar_position.1);
        canvas.save(out)
    }

    /// Bubble shapes visible once `upto` is the newest message.
    fn render_strip(&self, bubbles: &[Bubble], upto: usize, scroll: i64) -> anyhow::Result<Canvas> {
        let o = self.options;
        let mut canvas = Canvas::new(o.message_area_size.0, o.message_area_size.1);
        for bubble in &bubbles[..=upto] {
            let color = match bubble.speaker {
                Speaker::Sent => parse_color(&o.message_background_color_sending)?,
                Speaker::Received => parse_color(&o.message_background_color_receiving)?,
            };
            canvas.fill_rounded_rect(
                bubble.x,
                bubble.top - scroll,
                bubble.width,
                bubble.height,
                o.message_radius,
                color,
            );
        }
        Ok(canvas)
    }

    fn drawtext(&self, font: &Font, textfile: &Path, size: f32, color: Rgba<u8>, x: &str, y: &str) -> String {
        format!(
            "drawtext=fontfile={}:textfile={}:expansion=none:fontsize={}:fontcolor={}:x={}:y={}",
            escape_value(&font.path().to_string_lossy()),
            escape_value(&textfile.to_string_lossy()),
            size,
            ffmpeg_color(color),
            x,
            y
        )
    }

    /// Builds the filtergraph drawing message text on the strip, laying the
    /// strip over the header and drawing the contact name and clock.
    fn capture_filter(
        &self,
        bubbles: &[Bubble],
        upto: usize,
        scroll: i64,
        text_files: &[PathBuf],
        name_file: &Path,
        time_file: &Path,
    ) -> anyhow::Result<String> {
        let o = self.options;
        let mut strip = vec!["[1:v]format=rgba".to_string()];
        for (bubble, file) in bubbles[..=upto].iter().zip(text_files) {
            if bubble.bottom() - scroll <= 0 {
                continue;
            }
            let color = match bubble.speaker {
                Speaker::Sent => parse_color(&o.message_text_color_sending)?,
                Speaker::Received => parse_color(&o.message_text_color_receiving)?,
            };
            strip.push(self.drawtext(
                &self.regular,
                file,
                o.message_font_size,
                color,
                &(bubble.x + o.message_x_padding as i64).to_string(),
                &(bubble.top - scroll + o.message_y_padding as i64).to_string(),
            ));
        }

        let black = Rgba([0, 0, 0, 255]);
        let name = self.drawtext(
            &self.regular,
            name_file,
            o.name_font_size,
            black,
            "(w-text_w)/2",
            &o.name_y_position.to_string(),
        );
        let time = self.drawtext(
            &self.bold,
            time_file,
            o.time_font_size,
            black,
            &format!("{}-text_w/2", o.time_position.0),
            &format!("{}-ascent", o.time_position.1),
        );
        Ok(format!(
            "{}[m];[0:v][m]overlay=0:{},{},{}[out]",
            strip.join(","),
            o.message_first_y,
            name,
            time
        ))
    }

    /// Writes `capt00.png`, `capt01.png`, ... into `dir`, one per turn.
    pub fn render_captures(
        &self,
        turns: &[Turn],
        contact: &str,
        clock: &str,
        dir: &Path,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let o = self.options;
        let bubbles = self.layout(turns)?;

        let header = dir.join("header.png");
        self.render_header(&header)?;

        let name_file = dir.join("name.txt");
        fs::write(&name_file, contact)?;
        let time_file = dir.join("time.txt");
        fs::write(&time_file, clock)?;

        let mut text_files = Vec::with_capacity(bubbles.len());
        for (i, bubble) in bubbles.iter().enumerate() {
            let path = dir.join(format!("msg{:02}.txt", i));
            fs::write(&path, &bubble.text)?;
            text_files.push(path);
        }

        let mut captures = Vec::with_capacity(bubbles.len());
        for (i, bubble) in bubbles.iter().enumerate() {
            let scroll = scroll_offset(bubble.bottom(), o.message_y_margin, o.message_area_size.1);
            debug!("Capture {} scrolled by {}px", i, scroll);

            let strip_path = dir.join(format!("strip{:02}.png", i));
            self.render_strip(&bubbles, i, scroll)?.save(&strip_path)?;

            let filter = self.capture_filter(&bubbles, i, scroll, &text_files, &name_file, &time_file)?;
            let out = dir.join(format!("capt{:02}.png", i));
            let args: Vec<String> = vec![
                "-y".into(),
                "-i".into(),
                header.to_string_lossy().into_owned(),
                "-i".into(),
                strip_path.to_string_lossy().into_owned(),
                "-filter_complex".into(),
                filter,
                "-map".into(),
                "[out]".into(),
                "-frames:v".into(),
                "1".into(),
                out.to_string_lossy().into_owned(),
            ];
            ffmpeg::run(&args, &format!("render capture {}", i))?;
            captures.push(out);
        }
        info!("Rendered {} captures in {}", captures.len(), dir.display());
        Ok(captures)
    }
}
