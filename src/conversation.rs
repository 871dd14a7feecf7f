use crate::error::MalformedLineError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::warn;
use uuid::Uuid;

/// Who wrote a message, seen from the phone being filmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// `B:` lines, right-aligned blue bubbles
    Sent,
    /// `A:` lines, left-aligned grey bubbles
    Received,
}

impl Speaker {
    pub fn prefix(self) -> &'static str {
        match self {
            Speaker::Sent => "B",
            Speaker::Received => "A",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: Uuid,
    pub turns: Vec<Turn>,
}

impl Conversation {
    /// Builds a conversation whose id is derived from its content, so the
    /// same dialogue always maps to the same ledger entry.
    pub fn new(turns: Vec<Turn>) -> Self {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, Self::script(&turns).as_bytes());
        Conversation { id, turns }
    }

    fn script(turns: &[Turn]) -> String {
        turns
            .iter()
            .map(|t| format!("{}: {}", t.speaker.prefix(), t.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn total_chars(&self) -> usize {
        self.turns.iter().map(|t| t.text.chars().count()).sum()
    }
}

/// How to treat a generated dialogue that contains lines without a prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Drop the bad lines and keep the rest
    #[default]
    Lenient,
    /// Discard the whole dialogue
    Strict,
}

#[derive(Debug, Default)]
pub struct ParsedDialogue {
    pub turns: Vec<Turn>,
    pub malformed: Vec<MalformedLineError>,
}

impl ParsedDialogue {
    /// Applies `policy`, handing back the usable turns or the first bad line.
    pub fn accept(self, policy: MalformedPolicy) -> Result<Vec<Turn>, MalformedLineError> {
        match (policy, self.malformed.into_iter().next()) {
            (MalformedPolicy::Strict, Some(err)) => Err(err),
            _ => Ok(self.turns),
        }
    }
}

fn speaker_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([AB]) ?:\s*(.*)$").expect("valid speaker regex"))
}

/// Splits raw model output into turns using the `A:` / `B:` prefix
/// convention. Blank lines are ignored, parsing stops after `max_turns`.
pub fn parse_dialogue(raw: &str, max_turns: usize) -> ParsedDialogue {
    let mut parsed = ParsedDialogue::default();

    for (i, line) in raw.lines().enumerate() {
        if parsed.turns.len() >= max_turns {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let turn = speaker_line().captures(line).and_then(|caps| {
            let text = caps[2].trim();
            if text.is_empty() {
                return None;
            }
            let speaker = if &caps[1] == "B" {
                Speaker::Sent
            } else {
                Speaker::Received
            };
            Some(Turn {
                speaker,
                text: text.to_string(),
            })
        });

        match turn {
            Some(turn) => parsed.turns.push(turn),
            None => {
                let err = MalformedLineError {
                    line_number: i + 1,
                    content: line.to_string(),
                };
                warn!("{}", err);
                parsed.malformed.push(err);
            }
        }
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(turns: &[Turn]) -> Vec<(Speaker, &str)> {
        turns.iter().map(|t| (t.speaker, t.text.as_str())).collect()
    }

    #[test]
    fn splits_on_speaker_prefix() {
        let parsed = parse_dialogue("A: hi\nB: hello\n", 11);
        assert!(parsed.malformed.is_empty());
        assert_eq!(
            pairs(&parsed.turns),
            vec![(Speaker::Received, "hi"), (Speaker::Sent, "hello")]
        );
    }

    #[test]
    fn accepts_space_before_colon() {
        let parsed = parse_dialogue("A : Coucou!\nB :Comment vas-tu?", 11);
        assert_eq!(
            pairs(&parsed.turns),
            vec![(Speaker::Received, "Coucou!"), (Speaker::Sent, "Comment vas-tu?")]
        );
    }

    #[test]
    fn collects_malformed_lines() {
        let raw = "A: J'ai une blague pour toi.\n\nTraduction : I have a joke\nB:\nB: Ah oui, dis moi.";
        let parsed = parse_dialogue(raw, 11);
        assert_eq!(parsed.turns.len(), 2);
        assert_eq!(
            parsed.malformed,
            vec![
                MalformedLineError {
                    line_number: 3,
                    content: "Traduction : I have a joke".to_string(),
                },
                MalformedLineError {
                    line_number: 4,
                    content: "B:".to_string(),
                },
            ]
        );
    }

    #[test]
    fn policy_decides_what_happens_to_bad_lines() {
        let raw = "A: salut\n(rires)\nB: quoi ?";
        let turns = parse_dialogue(raw, 11).accept(MalformedPolicy::Lenient).unwrap();
        assert_eq!(turns.len(), 2);

        let err = parse_dialogue(raw, 11).accept(MalformedPolicy::Strict).unwrap_err();
        assert_eq!(err.line_number, 2);

        let clean = parse_dialogue("A: salut\nB: quoi ?", 11);
        assert_eq!(clean.accept(MalformedPolicy::Strict).unwrap().len(), 2);
    }

    #[test]
    fn stops_after_max_turns() {
        let raw = (0..20)
            .map(|i| format!("{}: line {i}", if i % 2 == 0 { "A" } else { "B" }))
            .collect::<Vec<_>>()
            .join("\n");
        let parsed = parse_dialogue(&raw, 11);
        assert_eq!(parsed.turns.len(), 11);
        assert_eq!(parsed.turns[10].text, "line 10");
    }

    #[test]
    fn lowercase_or_other_speakers_are_malformed() {
        let parsed = parse_dialogue("a: non\nC: non plus", 11);
        assert!(parsed.turns.is_empty());
        assert_eq!(parsed.malformed.len(), 2);
    }

    #[test]
    fn id_depends_on_content_only() {
        let turns = parse_dialogue("A: hi\nB: hello", 11).turns;
        let a = Conversation::new(turns.clone());
        let b = Conversation::new(turns);
        assert_eq!(a.id, b.id);
        assert_eq!(a.total_chars(), 7);

        let other = Conversation::new(parse_dialogue("A: hi\nB: bye", 11).turns);
        assert_ne!(a.id, other.id);
    }

    #[test]
    fn speaker_serializes_lowercase() {
        let turn: Turn = serde_json::from_str(r#"{"speaker":"sent","text":"yo"}"#).unwrap();
        assert_eq!(turn.speaker, Speaker::Sent);
    }
}
