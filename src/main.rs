mod cli;
mod config;
mod domain;
mod error;
mod infra;
mod matching;
mod media;
mod workflows;

use anyhow::{bail, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::AppConfig;
use domain::models::MediaFile;
use domain::ports::SubtitleCorpus;
use infra::cache::FsSubtitleCache;
use infra::opensubtitles::OpenSubtitlesClient;
use infra::tmdb::TmdbClient;
use media::ffmpeg::FfmpegTools;
use workflows::matchers::parse_filename;
use workflows::orchestrator::ProbeOrchestrator;
use workflows::renamer;
use workflows::subtitle_match::{run_subtitle_match, MatchReport, MatchRequest, MatchServices};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mkv_episode_matcher=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load()?;

    let mut paths = Vec::new();
    for input_path in &cli.inputs {
        if !input_path.exists() {
            eprintln!("Error: Input path does not exist: {input_path:?}");
            continue;
        }
        if let Err(e) = collect_input_path(input_path, cli.recursive, &mut paths) {
            eprintln!("Error processing path {input_path:?}: {e}");
        }
    }
    if paths.is_empty() {
        bail!("No MKV files found in the given inputs");
    }
    println!("Found {} MKV file(s) to process", paths.len());

    let files: Vec<MediaFile> = paths
        .into_iter()
        .enumerate()
        .map(|(id, path)| {
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            MediaFile::new(id as u64, path, size)
        })
        .collect();

    let (show_name, season) = resolve_show_and_season(&cli, &files)?;
    let request = MatchRequest {
        show_name,
        season,
        episodes: cli.episodes,
        language: cli.language.clone().unwrap_or_else(|| config.language()),
    };

    let mut tmdb = TmdbClient::new(config.tmdb_access_token()?);
    let mut opensubtitles = match config.opensubtitles_credentials() {
        Some(credentials) => Some(OpenSubtitlesClient::new(credentials)),
        None => {
            warn!(
                "OpenSubtitles credentials not configured; set OPENSUBTITLES_API_KEY, OPENSUBTITLES_USERNAME and OPENSUBTITLES_PASSWORD or add them to {}",
                config.config_path().display()
            );
            None
        }
    };
    let cache = FsSubtitleCache::new(config.cache_dir());
    info!("Using subtitle cache {}", cache.dir().display());

    let tools = Arc::new(FfmpegTools::new(
        config.file.ffprobe_path.clone(),
        config.file.ffmpeg_path.clone(),
    ));
    let orchestrator = ProbeOrchestrator::new(
        cli.jobs.unwrap_or_else(|| config.concurrency()),
        tools.clone(),
        tools,
    )?;

    let services = MatchServices {
        metadata: &mut tmdb,
        corpus: opensubtitles
            .as_mut()
            .map(|client| client as &mut dyn SubtitleCorpus),
        cache: &cache,
        orchestrator: &orchestrator,
        policy: cli.policy(config.policy()),
    };
    let report = run_subtitle_match(services, &request, &files)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if cli.dry_run {
        return Ok(());
    }
    for decision in report.decisions.iter().filter(|d| d.is_match()) {
        let Some(new_filename) = &decision.proposed_name else {
            continue;
        };
        let file_path = &decision.file.path;
        let directory = file_path.parent().unwrap_or(Path::new("."));
        let new_path = renamer::find_unique_filename(file_path, directory, new_filename);
        if let Err(e) = renamer::rename_file(file_path, &new_path, cli.no_confirm) {
            eprintln!("Error renaming {file_path:?}: {e}");
        }
    }

    Ok(())
}

/// Explicit flags win; otherwise the first file name that parses supplies
/// whatever is missing.
fn resolve_show_and_season(cli: &Cli, files: &[MediaFile]) -> Result<(String, u32)> {
    let parsed = files.iter().find_map(|file| parse_filename(&file.path));
    if let Some(parsed) = &parsed {
        debug!(
            "File names suggest season={} episodes={:?}",
            parsed.season, parsed.episodes
        );
    }

    let show_name = match (&cli.show, &parsed) {
        (Some(show), _) => show.clone(),
        (None, Some(parsed)) => match &parsed.show_name {
            Some(name) => {
                println!("Using show name from file names: {name}");
                name.clone()
            }
            None => bail!("Could not infer the show name from file names; pass --show"),
        },
        (None, None) => bail!("Could not infer the show name from file names; pass --show"),
    };

    let season = match (cli.season, &parsed) {
        (Some(season), _) => season,
        (None, Some(parsed)) => {
            println!("Using season from file names: {}", parsed.season);
            parsed.season
        }
        (None, None) => bail!("Could not infer the season from file names; pass --season"),
    };

    Ok((show_name, season))
}

fn print_summary(report: &MatchReport) {
    println!(
        "{} season {}: matched {} of {} file(s), {} of {} episode(s)",
        report.show.name,
        report.season,
        report.matched_file_count(),
        report.decisions.len(),
        report.matched_episode_count,
        report.expected_range_count
    );
    if !report.missing_episodes.is_empty() {
        let missing: Vec<String> = report
            .missing_episodes
            .iter()
            .map(|n| format!("E{n:02}"))
            .collect();
        println!("Not listed by TMDB: {}", missing.join(", "));
    }
    println!();

    for decision in &report.decisions {
        match (&decision.episode, &decision.rejection) {
            (Some(episode), _) => println!(
                "  {} -> S{:02}E{:02} {} ({:.2}, {})",
                decision.file.name(),
                episode.season_number,
                episode.episode_number,
                episode.name,
                decision.score,
                decision.reasons.join(" + ")
            ),
            (None, Some(rejection)) => {
                println!("  {} -> unmatched: {rejection}", decision.file.name())
            }
            (None, None) => println!("  {} -> unmatched", decision.file.name()),
        }
    }
    println!();
}

fn collect_input_path(input_path: &Path, recursive: bool, paths: &mut Vec<PathBuf>) -> Result<()> {
    if input_path.is_file() {
        if !is_mkv(input_path) {
            bail!("Skipping non-MKV file: {input_path:?}");
        }
        paths.push(input_path.to_path_buf());
    } else if input_path.is_dir() {
        paths.extend(collect_mkv_files(input_path, recursive)?);
    } else {
        bail!("Input path is neither a file nor a directory");
    }
    Ok(())
}

fn is_mkv(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mkv"))
}

fn collect_mkv_files(dir_path: &Path, recurse: bool) -> Result<Vec<PathBuf>> {
    let mut mkv_files = Vec::new();
    collect_mkv_files_helper(dir_path, recurse, &mut mkv_files)?;
    mkv_files.sort();
    Ok(mkv_files)
}

fn collect_mkv_files_helper(
    dir_path: &Path,
    recurse: bool,
    mkv_files: &mut Vec<PathBuf>,
) -> Result<()> {
    let entries = fs::read_dir(dir_path)?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if is_mkv(&path) {
                mkv_files.push(path);
            }
        } else if path.is_dir() && recurse {
            collect_mkv_files_helper(&path, recurse, mkv_files)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_collect_mkv_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("disc2")).unwrap();
        File::create(root.join("b_t01.mkv")).unwrap();
        File::create(root.join("a_t00.MKV")).unwrap();
        File::create(root.join("notes.txt")).unwrap();
        File::create(root.join("disc2").join("c_t00.mkv")).unwrap();

        let flat = collect_mkv_files(root, false).unwrap();
        assert_eq!(flat, vec![root.join("a_t00.MKV"), root.join("b_t01.mkv")]);

        let deep = collect_mkv_files(root, true).unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn test_resolve_show_and_season_from_file_names() {
        let cli = Cli::try_parse_from(["mkv-episode-matcher", "/rips"]).unwrap();
        let files = vec![
            MediaFile::new(0, PathBuf::from("/rips/title_t00.mkv"), 0),
            MediaFile::new(1, PathBuf::from("/rips/Deadwood.S02E03.mkv"), 0),
        ];
        assert_eq!(
            resolve_show_and_season(&cli, &files).unwrap(),
            ("Deadwood".to_string(), 2)
        );

        let cli = Cli::try_parse_from(["mkv-episode-matcher", "/rips", "--season", "3"]).unwrap();
        assert_eq!(
            resolve_show_and_season(&cli, &files).unwrap(),
            ("Deadwood".to_string(), 3)
        );
    }

    #[test]
    fn test_resolve_requires_show_when_names_do_not_parse() {
        let cli = Cli::try_parse_from(["mkv-episode-matcher", "/rips", "--season", "1"]).unwrap();
        let files = vec![MediaFile::new(0, PathBuf::from("/rips/title_t00.mkv"), 0)];
        assert!(resolve_show_and_season(&cli, &files).is_err());
    }
}
