use crate::conversation::{Conversation, Speaker};
use std::io::{BufRead, Write};

/// Prints the conversation and asks whether to turn it into a video.
/// `y` or `o` (either case) accepts, anything else rejects.
pub fn confirm<R: BufRead, W: Write>(
    conversation: &Conversation,
    mut input: R,
    mut output: W,
) -> std::io::Result<bool> {
    for turn in &conversation.turns {
        let who = match turn.speaker {
            Speaker::Received => "Person 1",
            Speaker::Sent => "Person 2",
        };
        writeln!(output, "{}: {}", who, turn.text)?;
    }
    write!(output, "Conversation ok? (y/n): ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "o" | "O"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::parse_dialogue;

    fn ask(answer: &str) -> (bool, String) {
        let conv = Conversation::new(parse_dialogue("A: Coucou!\nB: Salut", 11).turns);
        let mut out = Vec::new();
        let ok = confirm(&conv, answer.as_bytes(), &mut out).unwrap();
        (ok, String::from_utf8(out).unwrap())
    }

    #[test]
    fn shows_both_people() {
        let (_, shown) = ask("y\n");
        assert!(shown.starts_with("Person 1: Coucou!\nPerson 2: Salut\n"));
        assert!(shown.ends_with("(y/n): "));
    }

    #[test]
    fn accepts_yes_and_oui() {
        for answer in ["y\n", "Y\n", "o\n", " O \n"] {
            assert!(ask(answer).0, "{answer:?}");
        }
        for answer in ["n\n", "\n", "yes\n", ""] {
            assert!(!ask(answer).0, "{answer:?}");
        }
    }
}
