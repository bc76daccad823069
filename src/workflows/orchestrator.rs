//! Gathering the signals a matching run needs: per-file durations and
//! subtitle samples in parallel, reference subtitles per episode in order.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::models::{CandidateEpisode, FileId, MediaFile};
use crate::domain::ports::{
    CacheKey, DurationProbe, SampleExtractor, SubtitleCache, SubtitleCorpus, SubtitleExtraction,
};
use crate::error::{MatchError, Result};
use crate::matching::similarity::subtitle_text;
use crate::media::subtitles::decode_payload;

pub struct ProbeOrchestrator {
    pool: ThreadPool,
    durations: Arc<dyn DurationProbe>,
    extractor: Arc<dyn SampleExtractor>,
}

impl ProbeOrchestrator {
    /// `concurrency` is the number of worker threads; 0 uses rayon's default.
    pub fn new(
        concurrency: usize,
        durations: Arc<dyn DurationProbe>,
        extractor: Arc<dyn SampleExtractor>,
    ) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|index| format!("probe-{index}"))
            .build()
            .map_err(|e| MatchError::Tool(format!("Failed to build worker pool: {e}")))?;
        debug!("Probe worker pool ready threads={}", pool.current_num_threads());
        Ok(Self {
            pool,
            durations,
            extractor,
        })
    }

    /// Container durations in seconds. Files whose probe fails are omitted.
    /// Each file is its own job, so a stalled tool call holds one worker only.
    pub fn probe_durations(&self, files: &[&MediaFile]) -> HashMap<FileId, f64> {
        let results: Vec<(FileId, Result<f64>)> = self.pool.install(|| {
            files
                .par_iter()
                .with_max_len(1)
                .map(|file| (file.id, self.durations.probe_duration(&file.path)))
                .collect()
        });

        let mut durations = HashMap::new();
        for ((id, result), file) in results.into_iter().zip(files) {
            match result {
                Ok(seconds) => {
                    durations.insert(id, seconds);
                }
                Err(e) => warn!("Duration probe failed file='{}': {e}", file.name()),
            }
        }
        durations
    }

    /// One extraction outcome per file, successful or not.
    pub fn extract_samples(&self, files: &[&MediaFile]) -> HashMap<FileId, SubtitleExtraction> {
        let results: Vec<(FileId, SubtitleExtraction)> = self.pool.install(|| {
            files
                .par_iter()
                .with_max_len(1)
                .map(|file| (file.id, self.extractor.extract_sample(&file.path)))
                .collect()
        });

        for ((_, extraction), file) in results.iter().zip(files) {
            if let Some(error) = &extraction.error {
                warn!(
                    "Subtitle extraction failed file='{}' codec={}: {error}",
                    file.name(),
                    extraction.codec.as_deref().unwrap_or("-")
                );
            }
        }
        results.into_iter().collect()
    }

    /// Reference subtitle text per episode number. Episodes with no usable
    /// subtitle are left out. Runs strictly in episode order.
    pub fn fetch_episode_samples(
        &self,
        corpus: &mut dyn SubtitleCorpus,
        cache: &dyn SubtitleCache,
        show_id: u64,
        season_number: u32,
        episodes: &[CandidateEpisode],
        language: &str,
    ) -> Result<HashMap<u32, String>> {
        let mut samples = HashMap::new();

        for episode in episodes {
            let episode_number = episode.episode_number;
            let candidates =
                corpus.search_subtitles(show_id, season_number, episode_number, language)?;
            let Some((file_id, chosen)) = candidates
                .iter()
                .find_map(|c| c.file_id.map(|file_id| (file_id, c)))
            else {
                warn!("No reference subtitles found episode=E{episode_number:02}");
                continue;
            };
            debug!(
                "Reference subtitle episode=E{episode_number:02} file_id={file_id} name='{}' language={}",
                chosen.file_name.as_deref().unwrap_or("-"),
                chosen.language.as_deref().unwrap_or(language)
            );

            let key = CacheKey {
                show_id,
                season_number,
                episode_number,
                file_id,
            };
            let bytes = match cache.get(&key) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => download_and_store(corpus, cache, &key)?,
                Err(e) => {
                    warn!("{e}; downloading again");
                    download_and_store(corpus, cache, &key)?
                }
            };

            match subtitle_text(&decode_payload(&bytes)) {
                Some(text) => {
                    samples.insert(episode_number, text);
                }
                None => warn!("Reference subtitles are empty episode=E{episode_number:02}"),
            }
        }

        info!(
            "Reference subtitles ready episodes={}/{}",
            samples.len(),
            episodes.len()
        );
        Ok(samples)
    }
}

fn download_and_store(
    corpus: &mut dyn SubtitleCorpus,
    cache: &dyn SubtitleCache,
    key: &CacheKey,
) -> Result<Vec<u8>> {
    let bytes = corpus.download(key.file_id)?;
    if let Err(e) = cache.put(key, &bytes) {
        warn!("{e}");
    }
    Ok(bytes)
}
