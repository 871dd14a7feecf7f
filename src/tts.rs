use crate::config::TtsConfig;
use crate::error::TtsError;
use crate::http::send_with_retry;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

/// Client for a MaryTTS `/process` endpoint producing WAV audio.
pub struct TtsClient {
    client: reqwest::Client,
    config: TtsConfig,
    backoff: Duration,
}

impl TtsClient {
    pub fn new(config: TtsConfig, backoff: Duration) -> Self {
        TtsClient {
            client: reqwest::Client::new(),
            config,
            backoff,
        }
    }

    fn url(&self) -> String {
        format!("http://{}:{}/process", self.config.host, self.config.port)
    }

    fn form<'a>(&'a self, text: &'a str) -> [(&'static str, &'a str); 6] {
        [
            ("INPUT_TEXT", text),
            ("INPUT_TYPE", "TEXT"),
            ("LOCALE", self.config.locale.as_str()),
            ("VOICE", self.config.voice.as_str()),
            ("OUTPUT_TYPE", "AUDIO"),
            ("AUDIO", "WAVE"),
        ]
    }

    pub async fn synthesize(&self, text: &str, out_path: &Path) -> Result<(), TtsError> {
        let url = self.url();
        let form = self.form(text);
        debug!("Synthesizing {:?} with voice {}", text, self.config.voice);

        let response = send_with_retry(|| self.client.post(&url).form(&form), self.backoff).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !content_type.starts_with("audio/x-wav") {
            let body = response.text().await.map_err(crate::error::HttpError::from)?;
            error!("TTS answered {} instead of audio", content_type);
            return Err(TtsError::UnexpectedContent { content_type, body });
        }

        let bytes = response.bytes().await.map_err(crate::error::HttpError::from)?;
        tokio::fs::write(out_path, &bytes).await?;
        info!("Wrote {} bytes of speech to {}", bytes.len(), out_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> TtsClient {
        let config = TtsConfig {
            host: server.address().ip().to_string(),
            port: server.address().port(),
            ..TtsConfig::default()
        };
        TtsClient::new(config, Duration::from_millis(10))
    }

    #[test]
    fn form_carries_the_voice_settings() {
        let client = TtsClient::new(TtsConfig::default(), Duration::from_millis(10));
        let form = client.form("Coucou!");
        assert_eq!(form[0], ("INPUT_TEXT", "Coucou!"));
        assert!(form.contains(&("LOCALE", "fr")));
        assert!(form.contains(&("VOICE", "upmc-pierre-hsmm")));
        assert!(form.contains(&("AUDIO", "WAVE")));
        assert_eq!(client.url(), "http://localhost:59125/process");
    }

    #[tokio::test]
    async fn synthesized_audio_is_written_to_disk() {
        let server = MockServer::start().await;
        let wav = b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec();
        Mock::given(method("POST"))
            .and(path("/process"))
            .and(body_string_contains("INPUT_TEXT=Coucou"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(wav.clone(), "audio/x-wav"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("line.wav");
        client_for(&server).synthesize("Coucou", &out).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), wav);
    }

    #[tokio::test]
    async fn non_audio_answer_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"voice not found".to_vec(), "text/plain"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("line.wav");
        let err = client_for(&server).synthesize("Coucou", &out).await.unwrap_err();
        match err {
            TtsError::UnexpectedContent { content_type, body } => {
                assert!(content_type.starts_with("text/plain"));
                assert_eq!(body, "voice not found");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn rate_limited_synthesis_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/process"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"RIFF".to_vec(), "audio/x-wav"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("line.wav");
        client_for(&server).synthesize("Coucou", &out).await.unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
        assert!(out.exists());
    }
}
