//! Smiley images.
//!
//! Images are resolved through an [`EmoticonResolver`] and delivered on a
//! oneshot channel. The session keeps the receivers as [`PendingLoad`]s,
//! each tied to the anchor span marking where its smiley goes, and inserts
//! the smiley there when its image has arrived.

use std::path::{Path, PathBuf};

use tokio::sync::oneshot;

use super::Emoticon;
use crate::dom::classify::SMILEY_PENDING;
use crate::error::AssetError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    /// Value for the image's `src`
    pub uri: String,
    pub mime_type: String,
}

pub type LoadResult = Result<LoadedImage, AssetError>;

/// Source of emoticon images.
pub trait EmoticonResolver {
    /// URI of the image for `emoticon`, `None` when there is none.
    fn image_uri(&self, emoticon: &Emoticon) -> Option<String>;

    /// Start loading `uri`. The result arrives on the returned receiver.
    fn load(&self, uri: &str) -> oneshot::Receiver<LoadResult>;
}

/// Resolves `<dir>/<icon name>.png` (or `.svg`) from an icon theme
/// directory.
#[derive(Debug, Clone)]
pub struct ThemeDirResolver {
    dir: PathBuf,
}

impl ThemeDirResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn mime_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("svg") => "image/svg+xml",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

impl EmoticonResolver for ThemeDirResolver {
    fn image_uri(&self, emoticon: &Emoticon) -> Option<String> {
        ["png", "svg"]
            .iter()
            .map(|ext| self.dir.join(format!("{}.{ext}", emoticon.name)))
            .find(|path| path.is_file())
            .map(|path| format!("file://{}", path.display()))
    }

    fn load(&self, uri: &str) -> oneshot::Receiver<LoadResult> {
        let (sender, receiver) = oneshot::channel();
        let path = Path::new(uri.strip_prefix("file://").unwrap_or(uri));
        let result = match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => Ok(LoadedImage {
                uri: uri.to_string(),
                mime_type: mime_type_for(path).to_string(),
            }),
            Ok(_) => Err(AssetError::LoadFailed {
                uri: uri.to_string(),
                reason: "not a file".to_string(),
            }),
            Err(err) => Err(AssetError::LoadFailed {
                uri: uri.to_string(),
                reason: err.to_string(),
            }),
        };
        // The receiver is still in hand, so the send cannot fail
        let _ = sender.send(result);
        receiver
    }
}

/// A smiley waiting for its image.
pub struct PendingLoad {
    pub(crate) emoticon: &'static Emoticon,
    /// Element id of the `span.-x-evo-smiley-pending` the smiley replaces
    pub(crate) anchor: String,
    /// Text face inside the anchor, empty for smileys chosen by name
    pub(crate) written: String,
    /// History event that created the anchor
    pub(crate) sequence: Option<u64>,
    pub(crate) receiver: oneshot::Receiver<LoadResult>,
}

impl PendingLoad {
    pub fn new(
        emoticon: &'static Emoticon,
        anchor: String,
        written: String,
        sequence: Option<u64>,
        receiver: oneshot::Receiver<LoadResult>,
    ) -> Self {
        Self {
            emoticon,
            anchor,
            written,
            sequence,
            receiver,
        }
    }
}

/// The resolver in use and the loads still in flight.
#[derive(Default)]
pub struct SmileyLoads {
    resolver: Option<Box<dyn EmoticonResolver>>,
    pending: Vec<PendingLoad>,
    anchors_issued: u64,
}

impl SmileyLoads {
    pub fn set_resolver(&mut self, resolver: Box<dyn EmoticonResolver>) {
        self.resolver = Some(resolver);
    }

    pub fn resolver(&self) -> Option<&dyn EmoticonResolver> {
        self.resolver.as_deref()
    }

    pub fn push(&mut self, load: PendingLoad) {
        self.pending.push(load);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn take_pending(&mut self) -> Vec<PendingLoad> {
        std::mem::take(&mut self.pending)
    }

    /// A fresh anchor element id, never handed out twice by this session.
    pub(crate) fn next_anchor_id(&mut self) -> String {
        self.anchors_issued += 1;
        format!("{SMILEY_PENDING}-{}", self.anchors_issued)
    }
}
