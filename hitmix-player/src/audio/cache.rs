//! Sound content cache
//!
//! The playback core never decodes: it asks a `SoundResolver` for decoded
//! audio by `SoundKey`. `SoundCache` is the file-backed implementation used
//! by the CLI; it decodes on a blocking worker, resamples to the mixer rate
//! and memoizes the result (including "no content" answers).
//!
//! `prewarm` resolves a set of keys concurrently, bounded by the number of
//! available cores, so the playback loop's lookups hit memory.

use crate::audio::decoder::SimpleDecoder;
use crate::audio::resampler::Resampler;
use crate::audio::types::AudioBuffer;
use crate::error::{Error, Result};
use crate::playback::events::SoundKey;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Resolution result: `Ok(None)` means the sound legitimately has no content
pub type ResolveFuture<'a> = BoxFuture<'a, Result<Option<Arc<AudioBuffer>>>>;

/// File extensions tried for keys given without one
const SAMPLE_EXTENSIONS: [&str; 4] = ["wav", "ogg", "mp3", "flac"];

/// External content cache consumed by the playback core
pub trait SoundResolver: Send + Sync {
    /// Resolve decoded content for `key`, loading it if necessary
    fn resolve<'a>(&'a self, key: &'a SoundKey) -> ResolveFuture<'a>;

    /// Already-resolved content, without blocking or loading
    fn cached(&self, key: &SoundKey) -> Option<Arc<AudioBuffer>>;
}

/// Resolve `keys` concurrently; returns how many produced content
///
/// `concurrency == 0` uses the number of available cores. Failures are
/// logged and otherwise ignored: the event will be skipped at dispatch.
pub async fn prewarm<I>(resolver: &dyn SoundResolver, keys: I, concurrency: usize) -> usize
where
    I: IntoIterator<Item = SoundKey>,
{
    let limit = if concurrency == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    } else {
        concurrency
    };

    let started = Instant::now();
    let results: Vec<bool> = stream::iter(keys)
        .map(|key| async move {
            match resolver.resolve(&key).await {
                Ok(content) => content.is_some(),
                Err(e) => {
                    warn!("Failed to pre-load sound {}: {}", key, e);
                    false
                }
            }
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    let loaded = results.iter().filter(|&&ok| ok).count();
    info!(
        "Pre-loaded {}/{} sounds in {:?} ({} workers)",
        loaded,
        results.len(),
        started.elapsed(),
        limit
    );
    loaded
}

/// File-backed sound cache
pub struct SoundCache {
    /// Directory sample keys are resolved against
    root: PathBuf,

    /// Mixer sample rate every buffer is converted to
    sample_rate: u32,

    /// Resolved content; `None` records "no content" so it is not retried
    entries: RwLock<HashMap<SoundKey, Option<Arc<AudioBuffer>>>>,
}

impl SoundCache {
    pub fn new(root: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self {
            root: root.into(),
            sample_rate,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Register in-memory content under `key` (embedded default samples)
    pub fn insert(&self, key: SoundKey, buffer: AudioBuffer) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Some(Arc::new(buffer)));
    }

    /// Number of keys with a memoized answer
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &SoundKey) -> Option<Option<Arc<AudioBuffer>>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn store(&self, key: &SoundKey, content: Option<Arc<AudioBuffer>>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), content);
    }

    /// Find the file for `key`, trying known extensions when it has none
    fn locate(&self, key: &SoundKey) -> Option<PathBuf> {
        let direct = self.root.join(key.as_str());
        if direct.is_file() {
            return Some(direct);
        }
        if Path::new(key.as_str()).extension().is_some() {
            return None;
        }
        SAMPLE_EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{}.{}", key.as_str(), ext)))
            .find(|p| p.is_file())
    }

    async fn load(&self, key: &SoundKey) -> Result<Option<Arc<AudioBuffer>>> {
        let Some(path) = self.locate(key) else {
            debug!("No file for sound {} under {}", key, self.root.display());
            return Ok(None);
        };

        let target_rate = self.sample_rate;
        let buffer = tokio::task::spawn_blocking(move || -> Result<AudioBuffer> {
            let (samples, rate) = SimpleDecoder::decode_file(&path)?;
            let samples = Resampler::resample_stereo(&samples, rate, target_rate)?;
            Ok(AudioBuffer::new(samples, target_rate))
        })
        .await
        .map_err(|e| Error::Internal(format!("Decode task failed: {}", e)))??;

        debug!("Loaded sound {} ({:.0}ms)", key, buffer.duration_ms());
        Ok(Some(Arc::new(buffer)))
    }
}

impl SoundResolver for SoundCache {
    fn resolve<'a>(&'a self, key: &'a SoundKey) -> ResolveFuture<'a> {
        Box::pin(async move {
            if let Some(content) = self.lookup(key) {
                return Ok(content);
            }

            match self.load(key).await {
                Ok(content) => {
                    self.store(key, content.clone());
                    Ok(content)
                }
                Err(e) => {
                    self.store(key, None);
                    Err(e)
                }
            }
        })
    }

    fn cached(&self, key: &SoundKey) -> Option<Arc<AudioBuffer>> {
        self.lookup(key).flatten()
    }
}
