use clap::Parser;
use std::path::PathBuf;

use crate::domain::models::EpisodeRange;
use crate::matching::validation::MatchPolicy;

#[derive(Parser)]
#[command(name = "mkv-episode-matcher")]
#[command(about = "Match unlabeled MKV rips to TV episodes by subtitle text and rename them using TMDB data")]
pub struct Cli {
    /// Input files or directories to process
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Show name to search in TMDB (inferred from file names when omitted)
    #[arg(long)]
    pub show: Option<String>,

    /// Season number (inferred from file names when omitted)
    #[arg(long)]
    pub season: Option<u32>,

    /// Episode range to match against, e.g. 13-24 (defaults to the whole season)
    #[arg(long, value_parser = parse_range)]
    pub episodes: Option<EpisodeRange>,

    /// Skip confirmation prompts
    #[arg(long)]
    pub no_confirm: bool,

    /// Recursively scan directories for MKV files
    #[arg(short = 'r', long = "recursive")]
    pub recursive: bool,

    /// Print proposed names without renaming anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the match report as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Subtitle language to download (overrides the config file)
    #[arg(long)]
    pub language: Option<String>,

    /// Minimum gap between the best and second-best episode score
    #[arg(long)]
    pub margin: Option<f64>,

    /// Minimum subtitle similarity for a match
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Largest accepted relative runtime difference
    #[arg(long)]
    pub max_duration_delta: Option<f64>,

    /// Worker threads for probing files
    #[arg(long)]
    pub jobs: Option<usize>,
}

fn parse_range(input: &str) -> Result<EpisodeRange, String> {
    input.parse().map_err(|e: crate::error::MatchError| e.to_string())
}

impl Cli {
    /// `base` with any thresholds given on the command line applied.
    pub fn policy(&self, base: MatchPolicy) -> MatchPolicy {
        MatchPolicy {
            margin: self.margin.unwrap_or(base.margin),
            threshold: self.threshold.unwrap_or(base.threshold),
            max_duration_delta: self.max_duration_delta.unwrap_or(base.max_duration_delta),
        }
    }
}
