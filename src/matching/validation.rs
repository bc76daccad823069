use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::domain::models::{
    CandidateEpisode, MatchDecision, MatchStatus, MediaFile, RankedEpisode, Rejection,
};
use crate::matching::cost_matrix::SimilarityTable;
use crate::workflows::renamer::generate_filename;

const TOP_MATCHES: usize = 3;

/// Acceptance thresholds applied to every assignment.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Minimum gap between the best and second-best candidate.
    pub margin: f64,
    /// Minimum similarity for a match.
    pub threshold: f64,
    /// Largest accepted relative difference between file and episode runtime.
    pub max_duration_delta: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            margin: 0.05,
            threshold: 0.55,
            max_duration_delta: 0.10,
        }
    }
}

/// Relative difference between a measured duration and a published runtime.
/// `None` when the runtime is unusable.
pub fn duration_delta(file_seconds: f64, runtime_minutes: u32) -> Option<f64> {
    if runtime_minutes == 0 {
        return None;
    }
    let runtime_seconds = f64::from(runtime_minutes) * 60.0;
    Some((file_seconds - runtime_seconds).abs() / runtime_seconds)
}

fn episode_label(episode: &CandidateEpisode) -> String {
    format!("E{:02}", episode.episode_number)
}

/// Turns solver output into per-file decisions.
pub struct ValidationPipeline<'a> {
    policy: &'a MatchPolicy,
    episodes: &'a [CandidateEpisode],
    table: &'a SimilarityTable,
    /// Episode title -> columns sharing that title, only for shared titles.
    duplicates: HashMap<&'a str, Vec<usize>>,
}

impl<'a> ValidationPipeline<'a> {
    pub fn new(
        policy: &'a MatchPolicy,
        episodes: &'a [CandidateEpisode],
        table: &'a SimilarityTable,
    ) -> Self {
        let mut groups: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (column, episode) in episodes.iter().enumerate() {
            groups.entry(episode.name.as_str()).or_default().push(column);
        }
        groups.retain(|_, columns| columns.len() > 1);

        Self {
            policy,
            episodes,
            table,
            duplicates: groups,
        }
    }

    /// Episodes with a reference sample, best score first. Ties keep the
    /// episode order.
    fn ranked(&self, row: usize) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = (0..self.episodes.len())
            .filter(|&column| self.table.has_reference[column])
            .map(|column| (column, self.table.score(row, column)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    fn tie_break(&self, row: usize, columns: &[usize]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for &column in columns {
            if !self.table.has_reference[column] {
                continue;
            }
            let score = self.table.score(row, column);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((column, score));
            }
        }
        best
    }

    /// Run every gate for the file in `row`. `assigned` is the solver's
    /// column for that row, which may point into padding.
    pub fn decide(
        &self,
        row: usize,
        file: &MediaFile,
        assigned: Option<usize>,
        file_duration: Option<f64>,
    ) -> MatchDecision {
        let name = file.name();
        let status = MatchStatus {
            duration_checked: file_duration.is_some(),
            subtitles_attempted: true,
            ..MatchStatus::default()
        };

        let Some(column) = assigned.filter(|&col| col < self.episodes.len()) else {
            warn!("Subtitle match left unmatched file='{name}'");
            return MatchDecision::unmatched(file, Rejection::Unassigned, status);
        };
        let assigned_episode = &self.episodes[column];
        if !self.table.has_reference[column] {
            warn!(
                "Subtitle match assigned episode without reference file='{name}' episode={}",
                episode_label(assigned_episode)
            );
            return MatchDecision::unmatched(
                file,
                Rejection::MissingReference {
                    episode: assigned_episode.episode_number,
                },
                status,
            );
        }

        let ranked = self.ranked(row);
        let top_matches: Vec<RankedEpisode> = ranked
            .iter()
            .take(TOP_MATCHES)
            .map(|&(col, score)| RankedEpisode {
                episode_number: self.episodes[col].episode_number,
                name: self.episodes[col].name.clone(),
                score,
            })
            .collect();
        if !top_matches.is_empty() {
            let summary = top_matches
                .iter()
                .map(|m| format!("E{:02} {} {:.2}", m.episode_number, m.name, m.score))
                .collect::<Vec<_>>()
                .join(" | ");
            info!("Top subtitle matches file='{name}': {summary}");
        }
        let with_diagnostics = |mut decision: MatchDecision| {
            decision.top_matches = top_matches.clone();
            decision
        };

        if let [(best_col, best), (_, second), ..] = ranked.as_slice() {
            let delta = best - second;
            if delta < self.policy.margin {
                let best_episode = self.episodes[*best_col].episode_number;
                warn!(
                    "Subtitle match rejected (low margin) file='{name}' best=E{best_episode:02} score={best:.2} delta={delta:.2}"
                );
                return with_diagnostics(MatchDecision::unmatched(
                    file,
                    Rejection::LowMargin {
                        best_episode,
                        best: *best,
                        delta,
                    },
                    status,
                ));
            }
        }

        let mut chosen = column;
        let mut score = self.table.score(row, column);
        if let Some(group) = self.duplicates.get(assigned_episode.name.as_str()) {
            if let Some((col, tie_score)) = self.tie_break(row, group) {
                if col != chosen {
                    info!(
                        "Duplicate title tie-break file='{name}' {} -> {}",
                        episode_label(assigned_episode),
                        episode_label(&self.episodes[col])
                    );
                }
                chosen = col;
                score = tie_score;
            }
        }
        let episode = &self.episodes[chosen];

        if score < self.policy.threshold {
            warn!(
                "Subtitle match low similarity file='{name}' episode={} score={score:.2}",
                episode_label(episode)
            );
            return with_diagnostics(MatchDecision::unmatched(
                file,
                Rejection::BelowThreshold {
                    episode: episode.episode_number,
                    score,
                },
                status,
            ));
        }

        let mut duration_used = false;
        match (file_duration, episode.runtime_minutes) {
            (Some(file_seconds), Some(runtime)) => {
                if let Some(delta) = duration_delta(file_seconds, runtime) {
                    let file_minutes = file_seconds / 60.0;
                    if delta > self.policy.max_duration_delta {
                        warn!(
                            "Duration gate rejected file='{name}' episode={} fileMin={file_minutes:.1} epMin={runtime} delta={delta:.2}",
                            episode_label(episode)
                        );
                        return with_diagnostics(MatchDecision::unmatched(
                            file,
                            Rejection::DurationMismatch {
                                episode: episode.episode_number,
                                file_minutes,
                                episode_minutes: runtime,
                                delta,
                            },
                            status,
                        ));
                    }
                    info!(
                        "Duration gate accepted file='{name}' episode={} fileMin={file_minutes:.1} epMin={runtime} delta={delta:.2}",
                        episode_label(episode)
                    );
                    duration_used = true;
                } else {
                    warn!(
                        "Duration gate skipped (zero runtime) file='{name}' episode={}",
                        episode_label(episode)
                    );
                }
            }
            (_, None) => warn!(
                "Duration gate skipped (missing runtime) file='{name}' episode={}",
                episode_label(episode)
            ),
            (None, Some(_)) => warn!(
                "Duration gate skipped (missing file duration) file='{name}' episode={}",
                episode_label(episode)
            ),
        }

        let mut reasons = vec!["Subtitles".to_string()];
        if duration_used {
            reasons.push("Duration".to_string());
        }

        MatchDecision {
            file: file.clone(),
            episode: Some(episode.clone()),
            score,
            reasons,
            top_matches: top_matches.clone(),
            rejection: None,
            proposed_name: Some(generate_filename(
                episode.season_number,
                episode.episode_number,
                &episode.name,
            )),
            status: MatchStatus {
                duration_used,
                subtitles_matched: true,
                last_error: Some(format!("Subtitle similarity {score:.2}")),
                ..status
            },
        }
    }
}
