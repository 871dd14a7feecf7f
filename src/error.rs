use thiserror::Error;

/// Errors raised while measuring text with a parsed font
#[derive(Error, Debug, PartialEq)]
pub enum FontError {
    #[error("font has no glyph for {0:?}")]
    /// The font cannot draw this character and the glyph policy is strict
    MissingGlyph(char),

    #[error("glyph for {0:?} has no horizontal advance")]
    MissingAdvance(char),
}

/// Errors from the HTTP collaborators (text generation and speech synthesis)
#[derive(Error, Debug)]
pub enum HttpError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("{url} answered {status}: {body}")]
    /// Any non-success status other than 429
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Error, Debug)]
pub enum TtsError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("expected audio/x-wav, got {content_type:?}: {body}")]
    UnexpectedContent { content_type: String, body: String },
}

/// A dialogue line that does not follow the `A:` / `B:` speaker convention
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line_number} has no speaker prefix: {content:?}")]
pub struct MalformedLineError {
    pub line_number: usize,
    pub content: String,
}
