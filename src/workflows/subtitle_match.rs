use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::domain::models::{
    sort_by_display_name, CandidateEpisode, EpisodeRange, FileId, MatchDecision, MatchStatus,
    MediaFile, Rejection, ShowSummary,
};
use crate::domain::ports::{EpisodeMetadataSource, SubtitleCache, SubtitleCorpus};
use crate::error::{MatchError, Result};
use crate::matching::assignment::{solve, total_cost};
use crate::matching::cost_matrix::{CostMatrix, SimilarityTable};
use crate::matching::validation::{MatchPolicy, ValidationPipeline};
use crate::workflows::orchestrator::ProbeOrchestrator;

#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub show_name: String,
    pub season: u32,
    /// `None` covers every episode the season listing has.
    pub episodes: Option<EpisodeRange>,
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub show: ShowSummary,
    pub season: u32,
    /// One per input file, ordered by display name.
    pub decisions: Vec<MatchDecision>,
    pub expected_range_count: usize,
    pub matched_episode_count: usize,
    pub missing_episodes: Vec<u32>,
    pub durations: HashMap<FileId, f64>,
}

impl MatchReport {
    pub fn matched_file_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_match()).count()
    }
}

/// Everything a run talks to besides the files themselves.
pub struct MatchServices<'a> {
    pub metadata: &'a mut dyn EpisodeMetadataSource,
    /// `None` when no OpenSubtitles credentials are configured.
    pub corpus: Option<&'a mut dyn SubtitleCorpus>,
    pub cache: &'a dyn SubtitleCache,
    pub orchestrator: &'a ProbeOrchestrator,
    pub policy: MatchPolicy,
}

fn select_episodes(
    listing: Vec<CandidateEpisode>,
    range: Option<EpisodeRange>,
) -> Vec<CandidateEpisode> {
    let mut episodes: Vec<CandidateEpisode> = listing
        .into_iter()
        .filter(|ep| range.map_or(true, |r| r.contains(ep.episode_number)))
        .collect();
    episodes.sort_by_key(|ep| ep.episode_number);
    episodes
}

fn unmatched_all(
    files: &[&MediaFile],
    durations: &HashMap<FileId, f64>,
    attempted: bool,
    rejection: impl Fn(&MediaFile) -> Rejection,
) -> Vec<MatchDecision> {
    files
        .iter()
        .map(|&file| {
            let status = MatchStatus {
                duration_checked: durations.contains_key(&file.id),
                subtitles_attempted: attempted,
                ..MatchStatus::default()
            };
            MatchDecision::unmatched(file, rejection(file), status)
        })
        .collect()
}

/// Match `files` against one season of `request.show_name`.
///
/// Input problems and upstream failures abort the run. Everything that goes
/// wrong for a single file ends up in that file's decision instead.
pub fn run_subtitle_match(
    mut services: MatchServices<'_>,
    request: &MatchRequest,
    files: &[MediaFile],
) -> Result<MatchReport> {
    let show_name = request.show_name.trim();
    if show_name.is_empty() {
        return Err(MatchError::Input("Enter a show name".to_string()));
    }
    if files.is_empty() {
        return Err(MatchError::Input("No MKV files to match".to_string()));
    }

    let show = services
        .metadata
        .find_show(show_name)?
        .ok_or_else(|| MatchError::Input(format!("No show found for '{show_name}'")))?;
    info!("Using show '{}' id={}", show.name, show.id);

    let listing = services
        .metadata
        .fetch_season(show.id, request.season)?
        .ok_or_else(|| {
            MatchError::Input(format!(
                "Season {} not found for '{}'",
                request.season, show.name
            ))
        })?;

    let missing_episodes = request
        .episodes
        .map(|range| range.missing_from(&listing.episodes))
        .unwrap_or_default();
    let episodes = select_episodes(listing.episodes, request.episodes);
    if episodes.is_empty() {
        let scope = request
            .episodes
            .map(|range| format!("range {range}"))
            .unwrap_or_else(|| "the listing".to_string());
        return Err(MatchError::Input(format!(
            "No episodes of season {} found in {scope}",
            request.season
        )));
    }
    if !missing_episodes.is_empty() {
        warn!(
            "Episodes missing from TMDB listing: {}",
            missing_episodes
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    let expected_range_count = request.episodes.map_or(episodes.len(), |r| r.len());

    let mut ordered: Vec<&MediaFile> = files.iter().collect();
    sort_by_display_name(&mut ordered);

    let durations = services.orchestrator.probe_durations(&ordered);
    for file in &ordered {
        match durations.get(&file.id) {
            Some(seconds) => info!(
                "Duration file='{}' minutes={:.1}",
                file.name(),
                seconds / 60.0
            ),
            None => warn!("Duration missing file='{}'", file.name()),
        }
    }

    let decisions = decide(services, &show, request, &episodes, &ordered, &durations)?;

    let mut matched: Vec<u32> = decisions
        .iter()
        .filter_map(|d| d.episode.as_ref().map(|ep| ep.episode_number))
        .collect();
    matched.sort_unstable();
    matched.dedup();

    info!(
        "Subtitle match completed files={} matched={} episodes={}/{}",
        decisions.len(),
        decisions.iter().filter(|d| d.is_match()).count(),
        matched.len(),
        expected_range_count
    );

    Ok(MatchReport {
        show,
        season: request.season,
        decisions,
        expected_range_count,
        matched_episode_count: matched.len(),
        missing_episodes,
        durations,
    })
}

fn decide(
    services: MatchServices<'_>,
    show: &ShowSummary,
    request: &MatchRequest,
    episodes: &[CandidateEpisode],
    ordered: &[&MediaFile],
    durations: &HashMap<FileId, f64>,
) -> Result<Vec<MatchDecision>> {
    let Some(corpus) = services.corpus else {
        warn!("OpenSubtitles credentials missing; subtitle matching disabled");
        return Ok(unmatched_all(ordered, durations, false, |_| {
            Rejection::SubtitlesDisabled
        }));
    };

    let extractions = services.orchestrator.extract_samples(ordered);
    let no_sample = |file: &MediaFile| Rejection::NoSample {
        error: extractions
            .get(&file.id)
            .and_then(|e| e.error.clone())
            .unwrap_or_else(|| "No subtitle text".to_string()),
    };

    let sampled: Vec<&MediaFile> = ordered
        .iter()
        .copied()
        .filter(|file| extractions.get(&file.id).is_some_and(|e| e.text.is_some()))
        .collect();
    if sampled.is_empty() {
        warn!("No file produced a subtitle sample");
        return Ok(unmatched_all(ordered, durations, true, no_sample));
    }

    let references = services.orchestrator.fetch_episode_samples(
        corpus,
        services.cache,
        show.id,
        request.season,
        episodes,
        &request.language,
    )?;
    if references.is_empty() {
        warn!("No reference subtitles available for any episode");
        return Ok(unmatched_all(ordered, durations, true, |file| {
            if sampled.iter().any(|s| s.id == file.id) {
                Rejection::NoReferenceSamples
            } else {
                no_sample(file)
            }
        }));
    }

    let file_samples: Vec<&str> = sampled
        .iter()
        .filter_map(|file| extractions.get(&file.id).and_then(|e| e.text.as_deref()))
        .collect();
    let episode_samples: Vec<Option<&str>> = episodes
        .iter()
        .map(|ep| references.get(&ep.episode_number).map(String::as_str))
        .collect();

    let table = SimilarityTable::compute(&file_samples, &episode_samples);
    let cost = CostMatrix::from_table(&table);
    let assignment = solve(cost.rows());
    debug!(
        "Assignment solved files={} episodes={} size={} cost={:.4}",
        cost.real_rows(),
        cost.real_columns(),
        cost.size(),
        total_cost(cost.rows(), &assignment)
    );
    let pipeline = ValidationPipeline::new(&services.policy, episodes, &table);

    let mut by_file: HashMap<FileId, MatchDecision> = sampled
        .iter()
        .enumerate()
        .map(|(row, file)| {
            let assigned = assignment.get(row).copied().flatten();
            let decision = pipeline.decide(row, file, assigned, durations.get(&file.id).copied());
            (file.id, decision)
        })
        .collect();

    let decisions = ordered
        .iter()
        .map(|&file| {
            by_file.remove(&file.id).unwrap_or_else(|| {
                let status = MatchStatus {
                    duration_checked: durations.contains_key(&file.id),
                    subtitles_attempted: true,
                    ..MatchStatus::default()
                };
                MatchDecision::unmatched(file, no_sample(file), status)
            })
        })
        .collect();
    Ok(decisions)
}
