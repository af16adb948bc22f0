use std::path::PathBuf;

use clap::Parser;
use splitter_core::OutputFormat;

/// Separate an audio file into vocal and instrumental stems on a remote service.
#[derive(Debug, Parser)]
#[command(name = "splitter", version)]
pub struct Cli {
    /// Audio file to submit.
    pub input: PathBuf,

    /// Request the vocals stem. With neither stem flag, both are requested.
    #[arg(long)]
    pub vocals: bool,

    /// Request the instrumental stem.
    #[arg(long)]
    pub instrumental: bool,

    /// Download format (mp3 or wav).
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Separation service base URL.
    #[arg(long, env = "SPLITTER_BASE_URL")]
    pub base_url: Option<String>,

    /// Directory for downloaded stems.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// RON config file. Defaults to ./splitter.ron when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Re-submit this many times after a failure.
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Only print the download locators.
    #[arg(long)]
    pub no_download: bool,

    /// Log file path.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity and mirror logs to the terminal (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stem_flags_and_format() {
        let cli = Cli::try_parse_from([
            "splitter",
            "song.mp3",
            "--vocals",
            "--format",
            "wav",
            "--retries",
            "2",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("song.mp3"));
        assert!(cli.vocals);
        assert!(!cli.instrumental);
        assert_eq!(cli.format, Some(OutputFormat::Wav));
        assert_eq!(cli.retries, 2);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(Cli::try_parse_from(["splitter", "song.mp3", "--format", "ogg"]).is_err());
    }
}
