//! Greedy word wrapping for message bubbles.
//!
//! The engine knows nothing about fonts: callers hand it a [`WidthMeasurer`]
//! and it only ever asks for the width of a run of consecutive words.

/// Measures the width a run of words would take once joined by single spaces.
pub trait WidthMeasurer {
    type Error;

    fn measure(&self, words: &[&str]) -> Result<f32, Self::Error>;
}

impl<F, E> WidthMeasurer for F
where
    F: Fn(&[&str]) -> Result<f32, E>,
{
    type Error = E;

    fn measure(&self, words: &[&str]) -> Result<f32, E> {
        self(words)
    }
}

/// Splits `message` into lines whose measured width stays within `max_width`.
///
/// A line only breaks when adding a word makes it strictly wider than
/// `max_width`. A word that is too wide on its own still gets a line of its
/// own and is allowed to overflow.
pub fn wrap_lines<'a, M>(
    message: &'a str,
    max_width: f32,
    measure: &M,
) -> Result<Vec<Vec<&'a str>>, M::Error>
where
    M: WidthMeasurer + ?Sized,
{
    let words: Vec<&str> = message.split_whitespace().collect();
    let mut line_starts = vec![0];
    let mut start = 0;

    for cursor in 0..words.len() {
        let width = measure.measure(&words[start..=cursor])?;
        if width > max_width && cursor > start {
            line_starts.push(cursor);
            start = cursor;
        }
    }

    if words.is_empty() {
        return Ok(Vec::new());
    }

    let mut lines = Vec::with_capacity(line_starts.len());
    for (i, &from) in line_starts.iter().enumerate() {
        let to = line_starts.get(i + 1).copied().unwrap_or(words.len());
        lines.push(words[from..to].to_vec());
    }
    Ok(lines)
}

/// Wraps `message` into a newline separated string ready to be drawn as-is.
pub fn wrap<M>(message: &str, max_width: f32, measure: &M) -> Result<String, M::Error>
where
    M: WidthMeasurer + ?Sized,
{
    let lines = wrap_lines(message, max_width, measure)?;
    Ok(lines
        .iter()
        .map(|line| line.join(" "))
        .collect::<Vec<_>>()
        .join("\n"))
}
