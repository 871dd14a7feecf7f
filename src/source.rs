use crate::config::PromptConfig;
use crate::conversation::{parse_dialogue, Conversation, Turn};
use crate::ledger::Ledger;
use crate::llm::LlmClient;
use anyhow::Context;
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info, warn};

/// Decides whether a candidate conversation gets made into a video.
pub trait Approve {
    fn approve(&mut self, conversation: &Conversation) -> anyhow::Result<bool>;
}

/// Accepts everything (`--yes`).
pub struct AutoApprove;

impl Approve for AutoApprove {
    fn approve(&mut self, _: &Conversation) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Asks on the terminal.
pub struct StdinReview;

impl Approve for StdinReview {
    fn approve(&mut self, conversation: &Conversation) -> anyhow::Result<bool> {
        let stdin = std::io::stdin();
        Ok(crate::review::confirm(
            conversation,
            stdin.lock(),
            std::io::stdout(),
        )?)
    }
}

pub enum ConversationSource {
    /// Conversations read from a JSON file, consumed in order
    Prepared(VecDeque<Conversation>),
    /// Fresh dialogues from the language model
    Model(LlmClient),
}

impl ConversationSource {
    pub fn prepared(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read conversations {}", path.display()))?;
        let lists: Vec<Vec<Turn>> = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse conversations {}", path.display()))?;
        let mut conversations = VecDeque::with_capacity(lists.len());
        for (i, turns) in lists.into_iter().enumerate() {
            match unusable_reason(&turns) {
                Some(reason) => warn!("Skipping prepared conversation {}: {}", i + 1, reason),
                None => conversations.push_back(Conversation::new(turns)),
            }
        }
        info!(
            "Loaded {} prepared conversations from {}",
            conversations.len(),
            path.display()
        );
        Ok(ConversationSource::Prepared(conversations))
    }

    /// Next conversation that is not in the ledger and gets approved.
    /// `Ok(None)` means the source has nothing more to offer.
    pub async fn next(
        &mut self,
        prompt: &PromptConfig,
        max_attempts: usize,
        ledger: &Ledger,
        approver: &mut dyn Approve,
    ) -> anyhow::Result<Option<Conversation>> {
        match self {
            ConversationSource::Prepared(queue) => {
                while let Some(conversation) = queue.pop_front() {
                    if usable(&conversation, ledger, approver)? {
                        return Ok(Some(conversation));
                    }
                }
                Ok(None)
            }
            ConversationSource::Model(llm) => {
                for attempt in 1..=max_attempts {
                    info!("Generating dialogue (attempt {}/{})", attempt, max_attempts);
                    let raw = llm.generate_dialogue(prompt).await?;
                    debug!("Raw dialogue:\n{}", raw);

                    let turns = match parse_dialogue(&raw, prompt.max_turns).accept(prompt.policy) {
                        Ok(turns) => turns,
                        Err(e) => {
                            warn!("Discarding dialogue: {}", e);
                            continue;
                        }
                    };
                    if let Some(reason) = unusable_reason(&turns) {
                        warn!("Discarding dialogue: {}", reason);
                        continue;
                    }

                    let conversation = Conversation::new(turns);
                    if usable(&conversation, ledger, approver)? {
                        return Ok(Some(conversation));
                    }
                }
                anyhow::bail!("No usable dialogue after {} attempts", max_attempts)
            }
        }
    }
}

/// Why `turns` cannot make a video, if they cannot.
fn unusable_reason(turns: &[Turn]) -> Option<String> {
    if turns.len() < 2 {
        return Some(format!("only {} turn(s)", turns.len()));
    }
    turns
        .iter()
        .position(|turn| turn.text.trim().is_empty())
        .map(|i| format!("turn {} has no text", i + 1))
}

fn usable(conversation: &Conversation, ledger: &Ledger, approver: &mut dyn Approve) -> anyhow::Result<bool> {
    if ledger.is_used(&conversation.id.to_string())? {
        debug!("Skipping conversation {} (already used)", conversation.id);
        return Ok(false);
    }
    if !approver.approve(conversation)? {
        info!("Conversation {} rejected in review", conversation.id);
        return Ok(false);
    }
    Ok(true)
}
