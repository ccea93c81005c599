//! Attachment staging.
//!
//! A staged attachment pairs the raw bytes of a selected file with a preview
//! handle that a renderer can display directly (a `data:` URI). Every live
//! preview is tracked in a preview table; staging over an existing slot
//! releases the old preview first, so a field never holds more than one live
//! preview no matter how often the user re-selects a file.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use schoolhub_types::AttachmentRef;
use tracing::debug;

/// Identifier of a preview in the preview table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreviewId(u64);

impl fmt::Display for PreviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "preview-{}", self.0)
    }
}

/// Displayable preview of a staged binary.
///
/// The handle is only meaningful while the stager still lists it as live;
/// check [`AttachmentStager::is_live`] before rendering a handle kept across
/// transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHandle {
    id: PreviewId,
    field: String,
    uri: Arc<str>,
}

impl PreviewHandle {
    pub fn id(&self) -> PreviewId {
        self.id
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// `data:` URI suitable for an image or document viewer.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Raw bytes held by a slot until submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBinary {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl StagedBinary {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn reference(&self) -> AttachmentRef {
        AttachmentRef {
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes(),
        }
    }
}

#[derive(Debug)]
struct AttachmentSlot {
    binary: StagedBinary,
    preview: PreviewId,
}

#[derive(Debug)]
struct LivePreview {
    field: String,
    uri: Arc<str>,
}

/// Holds one slot per attachment field plus the table of live previews.
#[derive(Debug, Default)]
pub struct AttachmentStager {
    slots: IndexMap<String, AttachmentSlot>,
    previews: BTreeMap<PreviewId, LivePreview>,
    next_preview: u64,
}

impl AttachmentStager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `bytes` under `field`, replacing (and releasing) any prior slot.
    pub fn stage(&mut self, field: &str, file_name: impl Into<String>, bytes: Vec<u8>) -> PreviewHandle {
        if let Some(previous) = self.slots.shift_remove(field) {
            self.release(previous.preview);
        }

        let mime_type = sniff_mime_type(&bytes).to_string();
        let uri: Arc<str> = Arc::from(format!("data:{};base64,{}", mime_type, STANDARD.encode(&bytes)));
        let id = PreviewId(self.next_preview);
        self.next_preview += 1;

        self.previews.insert(
            id,
            LivePreview {
                field: field.to_string(),
                uri: Arc::clone(&uri),
            },
        );
        let binary = StagedBinary {
            file_name: file_name.into(),
            mime_type,
            bytes: Arc::from(bytes),
        };
        debug!(field, %id, size = binary.size_bytes(), mime = %binary.mime_type, "staged attachment");
        self.slots.insert(field.to_string(), AttachmentSlot { binary, preview: id });

        PreviewHandle {
            id,
            field: field.to_string(),
            uri,
        }
    }

    /// Drop the slot for `field`, releasing its preview. Returns whether a
    /// slot existed.
    pub fn clear(&mut self, field: &str) -> bool {
        match self.slots.shift_remove(field) {
            Some(slot) => {
                self.release(slot.preview);
                true
            }
            None => false,
        }
    }

    /// Release every slot and preview.
    pub fn release_all(&mut self) {
        let released = self.previews.len();
        self.slots.clear();
        self.previews.clear();
        if released > 0 {
            debug!(released, "released all attachment previews");
        }
    }

    pub fn binary(&self, field: &str) -> Option<&StagedBinary> {
        self.slots.get(field).map(|slot| &slot.binary)
    }

    /// Current preview for `field`, if one is staged.
    pub fn preview(&self, field: &str) -> Option<PreviewHandle> {
        let slot = self.slots.get(field)?;
        let live = self.previews.get(&slot.preview)?;
        Some(PreviewHandle {
            id: slot.preview,
            field: field.to_string(),
            uri: Arc::clone(&live.uri),
        })
    }

    pub fn is_live(&self, id: PreviewId) -> bool {
        self.previews.contains_key(&id)
    }

    pub fn live_previews(&self) -> usize {
        self.previews.len()
    }

    pub fn live_previews_for(&self, field: &str) -> usize {
        self.previews.values().filter(|preview| preview.field == field).count()
    }

    fn release(&mut self, id: PreviewId) {
        if self.previews.remove(&id).is_some() {
            debug!(%id, "released attachment preview");
        }
    }
}

impl Drop for AttachmentStager {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Best-effort MIME detection from leading magic bytes.
fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
    ];
    SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nrest-of-image";

    #[test]
    fn stage_builds_data_uri_preview() {
        let mut stager = AttachmentStager::new();
        let handle = stager.stage("studentPhoto", "photo.png", PNG.to_vec());

        assert!(handle.uri().starts_with("data:image/png;base64,"));
        assert_eq!(handle.field(), "studentPhoto");
        assert!(stager.is_live(handle.id()));
        assert_eq!(stager.binary("studentPhoto").map(StagedBinary::size_bytes), Some(PNG.len() as u64));
    }

    #[test]
    fn restaging_releases_previous_preview() {
        let mut stager = AttachmentStager::new();
        let first = stager.stage("studentPhoto", "a.png", PNG.to_vec());
        let second = stager.stage("studentPhoto", "b.pdf", b"%PDF-1.7".to_vec());
        let third = stager.stage("studentPhoto", "c.bin", vec![0, 1, 2]);

        assert!(!stager.is_live(first.id()));
        assert!(!stager.is_live(second.id()));
        assert!(stager.is_live(third.id()));
        assert_eq!(stager.live_previews_for("studentPhoto"), 1);
        assert_eq!(stager.live_previews(), 1);
        assert_eq!(
            stager.binary("studentPhoto").map(|binary| binary.mime_type.as_str()),
            Some("application/octet-stream")
        );
    }

    #[test]
    fn clear_and_release_all_empty_the_table() {
        let mut stager = AttachmentStager::new();
        stager.stage("studentPhoto", "a.png", PNG.to_vec());
        stager.stage("birthCertificate", "b.pdf", b"%PDF-1.4".to_vec());
        assert_eq!(stager.live_previews(), 2);

        assert!(stager.clear("studentPhoto"));
        assert!(!stager.clear("studentPhoto"));
        assert_eq!(stager.live_previews(), 1);
        assert!(stager.preview("studentPhoto").is_none());

        stager.release_all();
        assert_eq!(stager.live_previews(), 0);
        assert!(stager.binary("birthCertificate").is_none());
    }

    #[test]
    fn preview_lookup_returns_current_handle() {
        let mut stager = AttachmentStager::new();
        let handle = stager.stage("studentPhoto", "a.jpg", b"\xff\xd8\xff\xe0jpeg".to_vec());
        assert_eq!(stager.preview("studentPhoto"), Some(handle));
    }
}
