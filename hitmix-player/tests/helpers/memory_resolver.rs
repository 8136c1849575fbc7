//! In-memory sound resolver

use hitmix_player::audio::cache::ResolveFuture;
use hitmix_player::audio::{AudioBuffer, SoundResolver};
use hitmix_player::playback::SoundKey;
use hitmix_player::Error;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Resolves from a fixed map; keys marked broken fail with a decode error
#[derive(Default)]
pub struct MemoryResolver {
    sounds: HashMap<SoundKey, Arc<AudioBuffer>>,
    broken: HashSet<SoundKey>,
    resolves: AtomicUsize,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, buffer: Arc<AudioBuffer>) -> Self {
        self.sounds.insert(SoundKey::new(key), buffer);
        self
    }

    pub fn with_broken(mut self, key: &str) -> Self {
        self.broken.insert(SoundKey::new(key));
        self
    }

    /// Calls to `resolve` so far
    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

impl SoundResolver for MemoryResolver {
    fn resolve<'a>(&'a self, key: &'a SoundKey) -> ResolveFuture<'a> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if self.broken.contains(key) {
                return Err(Error::Decode(format!("{} is corrupt", key)));
            }
            Ok(self.sounds.get(key).cloned())
        })
    }

    fn cached(&self, key: &SoundKey) -> Option<Arc<AudioBuffer>> {
        self.sounds.get(key).cloned()
    }
}

/// Resolver whose loads block until the test opens the gate
///
/// Nothing counts as cached, so every dispatch goes through `resolve`.
pub struct GatedResolver {
    inner: MemoryResolver,
    gate: Arc<Notify>,
}

impl GatedResolver {
    pub fn new(inner: MemoryResolver) -> Self {
        Self {
            inner,
            gate: Arc::new(Notify::new()),
        }
    }

    /// Let one pending (or the next) load complete
    pub fn open(&self) {
        self.gate.notify_one();
    }
}

impl SoundResolver for GatedResolver {
    fn resolve<'a>(&'a self, key: &'a SoundKey) -> ResolveFuture<'a> {
        Box::pin(async move {
            self.gate.notified().await;
            self.inner.resolve(key).await
        })
    }

    fn cached(&self, _key: &SoundKey) -> Option<Arc<AudioBuffer>> {
        None
    }
}
