use async_trait::async_trait;
use huddle_client::media::{LocalTrack, TrackKind};
use huddle_client::{LocalStream, MediaError, MediaSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Media source that counts acquisitions and releases.
#[derive(Clone, Default)]
pub struct CountingMediaSource {
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    deny: Arc<AtomicBool>,
}

impl CountingMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse acquisitions while `deny` is set.
    pub fn set_deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSource for CountingMediaSource {
    async fn acquire(&self) -> Result<LocalStream, MediaError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(MediaError::PermissionDenied);
        }

        let n = self.acquired.fetch_add(1, Ordering::SeqCst);
        let released = self.released.clone();
        let tracks = vec![LocalTrack {
            id: format!("audio-{n}"),
            kind: TrackKind::Audio,
        }];

        Ok(LocalStream::new(format!("stream-{n}"), tracks).with_release_hook(move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}
