use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "textstory", about = "Turns text-message conversations into short vertical videos")]
pub struct Args {
    /// JSON settings file; defaults are used when it does not exist
    #[clap(long, default_value = "./config/settings.json")]
    pub config: PathBuf,

    /// How many videos to produce
    #[clap(long, default_value_t = 1)]
    pub count: usize,

    /// Prepared conversations (JSON array of turn lists) used instead of the model
    #[clap(long)]
    pub conversations: Option<PathBuf>,

    #[clap(long, default_value = "./generated")]
    pub out_dir: PathBuf,

    #[clap(long, default_value = "./config/used_conversations.jsonl")]
    pub ledger: PathBuf,

    /// Background music, looped under the speech
    #[clap(long)]
    pub music: Option<PathBuf>,

    /// Contact name shown at the top of the screen
    #[clap(long, default_value = "Antoine")]
    pub name: String,

    /// Clock shown in the status bar
    #[clap(long, default_value = "21:48")]
    pub time: String,

    /// Seconds of silence after each line
    #[clap(long, default_value_t = 1.0)]
    pub pause: f64,

    /// Skip the interactive review of each conversation
    #[clap(long)]
    pub yes: bool,

    /// Discard generated conversations with any malformed line
    #[clap(long)]
    pub strict: bool,
}
