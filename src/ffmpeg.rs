use std::process::Command;
use tracing::{debug, error};

/// Runs ffmpeg with `args`, failing with `what` in the message if it exits
/// with a non-zero status.
pub fn run(args: &[String], what: &str) -> anyhow::Result<()> {
    debug!("ffmpeg {}", args.join(" "));
    let output = Command::new("ffmpeg")
        .arg("-hide_banner")
        .args(["-loglevel", "error"])
        .args(args)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("ffmpeg failed to {}: {}", what, stderr.trim());
        anyhow::bail!("ffmpeg failed to {}", what);
    }
    Ok(())
}

/// Escapes a value for use as a filter option inside a filtergraph string:
/// once for the option parser, once for the graph parser.
pub fn escape_value(value: &str) -> String {
    let mut option = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '\'' | ':') {
            option.push('\\');
        }
        option.push(ch);
    }

    let mut graph = String::with_capacity(option.len());
    for ch in option.chars() {
        if matches!(ch, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph.push('\\');
        }
        graph.push(ch);
    }
    graph
}
