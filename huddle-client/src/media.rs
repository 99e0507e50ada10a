use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("capture permission denied")]
    PermissionDenied,
    #[error("no capture devices available")]
    NoDevices,
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    pub id: String,
    pub kind: TrackKind,
}

type ReleaseHook = Box<dyn FnOnce() + Send + Sync>;

/// Captured local media, owned by exactly one session.
///
/// Peer transports only read the track list. Dropping the stream without
/// calling [`LocalStream::release`] does not run the release hook.
pub struct LocalStream {
    id: String,
    tracks: Vec<LocalTrack>,
    on_release: Option<ReleaseHook>,
}

impl LocalStream {
    pub fn new(id: impl Into<String>, tracks: Vec<LocalTrack>) -> Self {
        Self {
            id: id.into(),
            tracks,
            on_release: None,
        }
    }

    /// Run `hook` when the stream is released, e.g. to stop capture devices.
    pub fn with_release_hook(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    pub fn release(mut self) {
        debug!("Releasing local stream {}", self.id);
        if let Some(hook) = self.on_release.take() {
            hook();
        }
    }
}

impl fmt::Debug for LocalStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStream")
            .field("id", &self.id)
            .field("tracks", &self.tracks)
            .finish_non_exhaustive()
    }
}

/// Handle to a stream received from a remote peer.
///
/// The session only keeps it to announce when it ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub id: String,
    pub track_ids: Vec<String>,
}

#[async_trait]
pub trait MediaSource: Send + Sync {
    /// May suspend for as long as the user takes to grant access.
    async fn acquire(&self) -> Result<LocalStream, MediaError>;
}

/// Track descriptors without real capture, for headless participants.
#[derive(Debug, Clone)]
pub struct SyntheticMediaSource {
    audio: bool,
    video: bool,
    denied: bool,
}

impl SyntheticMediaSource {
    pub fn new(audio: bool, video: bool) -> Self {
        Self {
            audio,
            video,
            denied: false,
        }
    }

    /// A source whose every acquisition is refused.
    pub fn deny() -> Self {
        Self {
            audio: true,
            video: true,
            denied: true,
        }
    }
}

impl Default for SyntheticMediaSource {
    fn default() -> Self {
        Self::new(true, true)
    }
}

#[async_trait]
impl MediaSource for SyntheticMediaSource {
    async fn acquire(&self) -> Result<LocalStream, MediaError> {
        if self.denied {
            return Err(MediaError::PermissionDenied);
        }

        let mut tracks = Vec::new();
        if self.audio {
            tracks.push(LocalTrack {
                id: format!("audio-{}", Uuid::new_v4()),
                kind: TrackKind::Audio,
            });
        }
        if self.video {
            tracks.push(LocalTrack {
                id: format!("video-{}", Uuid::new_v4()),
                kind: TrackKind::Video,
            });
        }
        if tracks.is_empty() {
            return Err(MediaError::NoDevices);
        }

        let stream = LocalStream::new(format!("local-{}", Uuid::new_v4()), tracks);
        info!(
            "Acquired synthetic stream {} ({} track(s))",
            stream.id(),
            stream.tracks().len()
        );
        Ok(stream)
    }
}
