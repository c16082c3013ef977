//! Composer state: the selected mode together with the image sources it allows.
//!
//! The mode and its sources live in one tagged union, [`Sources`], so the
//! single-image invariant (a file *or* a URL, never both) and the multi-image
//! ordering are enforced by construction. In multi-image mode every file and
//! URL row sits in one ordered sequence; drag-reordering moves items inside
//! that sequence and the file/URL views are derived from it.

use std::path::Path;

use super::download::name_from_url;
use super::preview::{PreviewHandle, PreviewRegistry};
use crate::error::Result;
use crate::image::{is_image_content_type, ImageFormat, Mode};

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// A file picked, pasted or dropped by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// File name as shown to the user.
    pub name: String,
    /// Declared MIME type.
    pub content_type: String,
    /// File contents.
    pub data: Vec<u8>,
}

impl LocalFile {
    /// Creates a file from in-memory contents.
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Reads a file from disk, detecting its type from magic bytes or extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        let content_type = ImageFormat::from_magic_bytes(&data)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(ImageFormat::from_extension)
            })
            .map(|f| f.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Ok(Self::new(name, content_type, data))
    }

    /// Returns true if the declared type is an image type.
    pub fn is_image(&self) -> bool {
        is_image_content_type(&self.content_type)
    }
}

/// A selected local file together with its preview.
#[derive(Debug)]
pub struct LocalImage {
    id: String,
    file: LocalFile,
    preview: PreviewHandle,
}

impl LocalImage {
    fn new(file: LocalFile, registry: &PreviewRegistry) -> Self {
        Self {
            id: format!("{}-{}-{}", file.name, file.data.len(), new_id()),
            file,
            preview: registry.create(),
        }
    }

    /// Unique identifier of this item.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The underlying file.
    pub fn file(&self) -> &LocalFile {
        &self.file
    }

    /// Preview reference, valid until the item is dropped.
    pub fn preview_url(&self) -> &str {
        self.preview.url()
    }
}

/// One URL input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlItem {
    id: String,
    url: String,
}

impl UrlItem {
    fn blank() -> Self {
        Self::with_url("")
    }

    fn with_url(url: &str) -> Self {
        Self {
            id: new_id(),
            url: url.to_string(),
        }
    }

    /// Unique identifier of this row.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Text currently in the row, untrimmed.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns true if the row holds a non-blank URL.
    pub fn is_filled(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// An entry of the multi-image sequence.
#[derive(Debug)]
pub enum SourceItem {
    /// A local file with its preview.
    File(LocalImage),
    /// A URL row, possibly blank.
    Url(UrlItem),
}

impl SourceItem {
    /// Stable drag key: `f:<id>` for files, `u:<id>` for URL rows.
    pub fn key(&self) -> String {
        match self {
            Self::File(img) => format!("f:{}", img.id),
            Self::Url(row) => format!("u:{}", row.id),
        }
    }

    /// Files and filled URL rows take part in previews and reordering.
    fn is_listed(&self) -> bool {
        match self {
            Self::File(_) => true,
            Self::Url(row) => row.is_filled(),
        }
    }
}

/// The one source of single-image mode: a file, or the URL row.
///
/// The URL row stays addressable while a file is held so that typing a URL
/// can replace the file.
#[derive(Debug)]
pub enum SingleSource {
    /// A local file. `row` is the URL input, always blank in this state.
    File {
        /// The selected file.
        image: LocalImage,
        /// The blank URL input row.
        row: UrlItem,
    },
    /// The URL input row; a blank row means nothing is selected.
    Url(UrlItem),
}

impl SingleSource {
    fn file(image: LocalImage) -> Self {
        Self::File {
            image,
            row: UrlItem::blank(),
        }
    }

    fn row(&self) -> &UrlItem {
        match self {
            Self::File { row, .. } | Self::Url(row) => row,
        }
    }
}

/// Mode-tagged source state.
#[derive(Debug)]
pub enum Sources {
    /// Text-to-image; no sources.
    Text,
    /// One image, from a file or a URL.
    Single(SingleSource),
    /// Files and URL rows in submission order.
    Multi(Vec<SourceItem>),
}

/// Kind of a preview tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    /// Tile for a local file.
    File,
    /// Tile for a linked image.
    Url,
}

/// A preview tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewItem {
    /// Drag key, see [`SourceItem::key`].
    pub key: String,
    /// Whether the tile shows a file or a link.
    pub kind: PreviewKind,
    /// Preview reference for files, the trimmed URL for links.
    pub url: String,
    /// Display name.
    pub name: String,
}

/// How a generated image is fed back into the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAs {
    /// Replace everything with this image in single-image mode.
    Single,
    /// Append this image to the multi-image sequence.
    Multi,
}

/// Why the composer cannot submit yet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unready {
    /// The prompt is blank.
    #[error("enter a prompt")]
    MissingPrompt,
    /// Single-image mode has neither a file nor a URL.
    #[error("add an image file or URL")]
    MissingImage,
    /// Multi-image mode has fewer sources than it needs.
    #[error("add at least {need} images ({have} so far)")]
    NeedMoreImages {
        /// Sources currently selected.
        have: usize,
        /// Sources required.
        need: usize,
    },
}

/// A source as it goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingSource<'a> {
    /// A file to upload.
    File(&'a LocalFile),
    /// A trimmed image URL.
    Url(String),
}

/// Client-side composer state.
#[derive(Debug)]
pub struct Composer {
    sources: Sources,
    registry: PreviewRegistry,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(PreviewRegistry::new())
    }
}

impl Composer {
    /// Creates a text-mode composer allocating previews from `registry`.
    pub fn new(registry: PreviewRegistry) -> Self {
        Self {
            sources: Sources::Text,
            registry,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        match self.sources {
            Sources::Text => Mode::Text,
            Sources::Single(_) => Mode::Single,
            Sources::Multi(_) => Mode::Multi,
        }
    }

    /// Read access to the tagged state.
    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    /// Registry previews are allocated from.
    pub fn registry(&self) -> &PreviewRegistry {
        &self.registry
    }

    /// Switches mode, carrying over what the new mode can hold.
    ///
    /// Entering single-image mode keeps the first file if there is one,
    /// otherwise the first filled URL. Entering text mode discards all sources.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode() == mode {
            return;
        }
        let previous = std::mem::replace(&mut self.sources, Sources::Text);
        self.sources = match mode {
            Mode::Text => Sources::Text,
            Mode::Single => Sources::Single(match previous {
                Sources::Multi(items) => collapse_to_single(items),
                _ => SingleSource::Url(UrlItem::blank()),
            }),
            Mode::Multi => Sources::Multi(match previous {
                Sources::Single(SingleSource::File { image, row }) => {
                    vec![SourceItem::File(image), SourceItem::Url(row)]
                }
                Sources::Single(SingleSource::Url(row)) => vec![SourceItem::Url(row)],
                _ => vec![SourceItem::Url(UrlItem::blank())],
            }),
        };
        tracing::debug!(mode = %mode, "composer mode changed");
    }

    /// Adds image files, ignoring anything that is not an image.
    ///
    /// In text mode this promotes to single-image mode for one file and to
    /// multi-image mode for several. Single-image mode keeps only the first
    /// file and clears the URL. Returns the number of files kept.
    pub fn add_files<I>(&mut self, files: I) -> usize
    where
        I: IntoIterator<Item = LocalFile>,
    {
        let accepted: Vec<LocalFile> = files.into_iter().filter(LocalFile::is_image).collect();
        if accepted.is_empty() {
            return 0;
        }

        if let Sources::Text = self.sources {
            self.set_mode(if accepted.len() > 1 {
                Mode::Multi
            } else {
                Mode::Single
            });
        }

        match &mut self.sources {
            Sources::Single(slot) => match accepted.into_iter().next() {
                Some(first) => {
                    *slot = SingleSource::file(LocalImage::new(first, &self.registry));
                    1
                }
                None => 0,
            },
            Sources::Multi(items) => {
                let count = accepted.len();
                let at = items
                    .iter()
                    .rposition(SourceItem::is_listed)
                    .map_or(0, |i| i + 1);
                let new_items: Vec<SourceItem> = accepted
                    .into_iter()
                    .map(|f| SourceItem::File(LocalImage::new(f, &self.registry)))
                    .collect();
                items.splice(at..at, new_items);
                ensure_url_row(items);
                count
            }
            Sources::Text => 0,
        }
    }

    /// Removes a local file by id.
    pub fn remove_file(&mut self, id: &str) -> bool {
        match &mut self.sources {
            Sources::Single(slot) => {
                if matches!(slot, SingleSource::File { image, .. } if image.id == id) {
                    *slot = SingleSource::Url(slot.row().clone());
                    true
                } else {
                    false
                }
            }
            Sources::Multi(items) => {
                let before = items.len();
                items.retain(|item| !matches!(item, SourceItem::File(img) if img.id == id));
                before != items.len()
            }
            Sources::Text => false,
        }
    }

    /// Appends an empty URL row (multi-image mode only).
    pub fn add_url_row(&mut self) -> Option<String> {
        match &mut self.sources {
            Sources::Multi(items) => {
                let row = UrlItem::blank();
                let id = row.id.clone();
                items.push(SourceItem::Url(row));
                Some(id)
            }
            _ => None,
        }
    }

    /// Sets the text of a URL row.
    ///
    /// In single-image mode a non-blank URL replaces the selected file.
    pub fn set_url(&mut self, id: &str, value: &str) -> bool {
        if let Sources::Single(slot) = &mut self.sources {
            if matches!(slot, SingleSource::File { row, .. } if row.id == id) {
                if !value.trim().is_empty() {
                    let row = UrlItem {
                        id: id.to_string(),
                        url: value.to_string(),
                    };
                    *slot = SingleSource::Url(row);
                }
                return true;
            }
        }
        match self.url_row_mut(id) {
            Some(row) => {
                row.url = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Removes a URL row. Single-image mode resets to a fresh empty row and
    /// multi-image mode always keeps at least one row.
    pub fn remove_url(&mut self, id: &str) -> bool {
        match &mut self.sources {
            Sources::Single(slot) => {
                if matches!(slot, SingleSource::Url(row) if row.id == id) {
                    *slot = SingleSource::Url(UrlItem::blank());
                    true
                } else {
                    false
                }
            }
            Sources::Multi(items) => {
                let before = items.len();
                items.retain(|item| !matches!(item, SourceItem::Url(row) if row.id == id));
                let removed = before != items.len();
                ensure_url_row(items);
                removed
            }
            Sources::Text => false,
        }
    }

    /// Drops every file and URL while staying in the current mode.
    pub fn clear_sources(&mut self) {
        match &mut self.sources {
            Sources::Single(slot) => *slot = SingleSource::Url(UrlItem::blank()),
            Sources::Multi(items) => *items = vec![SourceItem::Url(UrlItem::blank())],
            Sources::Text => {}
        }
    }

    /// URL input rows in display order.
    pub fn url_rows(&self) -> Vec<&UrlItem> {
        match &self.sources {
            Sources::Single(slot) => vec![slot.row()],
            Sources::Multi(items) => items
                .iter()
                .filter_map(|item| match item {
                    SourceItem::Url(row) => Some(row),
                    SourceItem::File(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn url_row_mut(&mut self, id: &str) -> Option<&mut UrlItem> {
        match &mut self.sources {
            Sources::Single(SingleSource::Url(row)) if row.id == id => Some(row),
            Sources::Multi(items) => items.iter_mut().find_map(|item| match item {
                SourceItem::Url(row) if row.id == id => Some(row),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Preview tiles: files and filled URLs, in submission order.
    pub fn preview_items(&self) -> Vec<PreviewItem> {
        match &self.sources {
            Sources::Text => Vec::new(),
            Sources::Single(SingleSource::File { image, .. }) => vec![file_preview(image)],
            Sources::Single(SingleSource::Url(row)) if row.is_filled() => vec![url_preview(row)],
            Sources::Single(_) => Vec::new(),
            Sources::Multi(items) => items
                .iter()
                .filter(|item| item.is_listed())
                .map(|item| match item {
                    SourceItem::File(img) => file_preview(img),
                    SourceItem::Url(row) => url_preview(row),
                })
                .collect(),
        }
    }

    /// Moves the tile `from_key` to the position of `to_key`.
    ///
    /// Empty URL rows move to the end of the sequence. Returns false when
    /// either key is unknown or both are the same.
    pub fn reorder(&mut self, from_key: &str, to_key: &str) -> bool {
        let Sources::Multi(items) = &mut self.sources else {
            return false;
        };
        if from_key == to_key {
            return false;
        }

        let keys: Vec<String> = items
            .iter()
            .filter(|item| item.is_listed())
            .map(SourceItem::key)
            .collect();
        let (Some(from), Some(to)) = (
            keys.iter().position(|k| k == from_key),
            keys.iter().position(|k| k == to_key),
        ) else {
            return false;
        };

        let (mut listed, blanks): (Vec<SourceItem>, Vec<SourceItem>) =
            std::mem::take(items).into_iter().partition(SourceItem::is_listed);
        let moved = listed.remove(from);
        listed.insert(to, moved);
        listed.extend(blanks);
        *items = listed;
        true
    }

    /// Local files in submission order.
    pub fn files(&self) -> Vec<&LocalImage> {
        match &self.sources {
            Sources::Single(SingleSource::File { image, .. }) => vec![image],
            Sources::Multi(items) => items
                .iter()
                .filter_map(|item| match item {
                    SourceItem::File(img) => Some(img),
                    SourceItem::Url(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Filled URLs, trimmed, in submission order.
    pub fn filled_urls(&self) -> Vec<String> {
        self.url_rows()
            .into_iter()
            .filter(|row| row.is_filled())
            .map(|row| row.url.trim().to_string())
            .collect()
    }

    /// Number of resolved image sources.
    pub fn source_count(&self) -> usize {
        self.outgoing().len()
    }

    /// Checks whether a submission with `prompt` may be sent.
    pub fn readiness(&self, prompt: &str) -> std::result::Result<(), Unready> {
        if prompt.trim().is_empty() {
            return Err(Unready::MissingPrompt);
        }
        let have = self.source_count();
        match self.mode() {
            Mode::Text => Ok(()),
            Mode::Single if have == 1 => Ok(()),
            Mode::Single => Err(Unready::MissingImage),
            Mode::Multi if have >= Mode::Multi.min_sources() => Ok(()),
            Mode::Multi => Err(Unready::NeedMoreImages {
                have,
                need: Mode::Multi.min_sources(),
            }),
        }
    }

    /// Returns true if [`readiness`](Self::readiness) passes.
    pub fn can_submit(&self, prompt: &str) -> bool {
        self.readiness(prompt).is_ok()
    }

    /// Feeds a generated image back in as an input by URL.
    pub fn continue_editing(&mut self, url: &str, target: EditAs) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }
        match target {
            EditAs::Single => {
                self.sources = Sources::Single(SingleSource::Url(UrlItem::with_url(url)));
            }
            EditAs::Multi => {
                self.set_mode(Mode::Multi);
                if let Sources::Multi(items) = &mut self.sources {
                    let (mut listed, mut blanks): (Vec<SourceItem>, Vec<SourceItem>) =
                        std::mem::take(items).into_iter().partition(SourceItem::is_listed);
                    listed.push(SourceItem::Url(UrlItem::with_url(url)));
                    if blanks.is_empty() {
                        blanks.push(SourceItem::Url(UrlItem::blank()));
                    }
                    listed.extend(blanks);
                    *items = listed;
                }
            }
        }
        true
    }

    /// Sources to send, in order. Text mode sends none.
    pub fn outgoing(&self) -> Vec<OutgoingSource<'_>> {
        match &self.sources {
            Sources::Text => Vec::new(),
            Sources::Single(SingleSource::File { image, .. }) => {
                vec![OutgoingSource::File(&image.file)]
            }
            Sources::Single(SingleSource::Url(row)) if row.is_filled() => {
                vec![OutgoingSource::Url(row.url.trim().to_string())]
            }
            Sources::Single(_) => Vec::new(),
            Sources::Multi(items) => items
                .iter()
                .filter(|item| item.is_listed())
                .map(|item| match item {
                    SourceItem::File(img) => OutgoingSource::File(&img.file),
                    SourceItem::Url(row) => OutgoingSource::Url(row.url.trim().to_string()),
                })
                .collect(),
        }
    }
}

fn collapse_to_single(items: Vec<SourceItem>) -> SingleSource {
    let mut first_url: Option<UrlItem> = None;
    for item in items {
        match item {
            SourceItem::File(img) => return SingleSource::file(img),
            SourceItem::Url(row) if row.is_filled() && first_url.is_none() => {
                first_url = Some(UrlItem::with_url(row.url.trim()));
            }
            SourceItem::Url(_) => {}
        }
    }
    SingleSource::Url(first_url.unwrap_or_else(UrlItem::blank))
}

fn ensure_url_row(items: &mut Vec<SourceItem>) {
    if !items.iter().any(|item| matches!(item, SourceItem::Url(_))) {
        items.push(SourceItem::Url(UrlItem::blank()));
    }
}

fn file_preview(img: &LocalImage) -> PreviewItem {
    PreviewItem {
        key: format!("f:{}", img.id),
        kind: PreviewKind::File,
        url: img.preview_url().to_string(),
        name: img.file.name.clone(),
    }
}

fn url_preview(row: &UrlItem) -> PreviewItem {
    let url = row.url.trim().to_string();
    PreviewItem {
        key: format!("u:{}", row.id),
        kind: PreviewKind::Url,
        name: name_from_url(&url).unwrap_or_else(|| "linked image".to_string()),
        url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    fn png(name: &str) -> LocalFile {
        LocalFile::new(name, "image/png", PNG.to_vec())
    }

    fn multi_with(files: &[&str], urls: &[&str]) -> Composer {
        let mut composer = Composer::default();
        composer.set_mode(Mode::Multi);
        composer.add_files(files.iter().map(|n| png(n)));
        for url in urls {
            let blank = composer
                .url_rows()
                .into_iter()
                .find(|r| !r.is_filled())
                .map(|r| r.id().to_string());
            let id = blank.or_else(|| composer.add_url_row()).unwrap();
            composer.set_url(&id, url);
        }
        composer
    }

    fn names(composer: &Composer) -> Vec<String> {
        composer.preview_items().into_iter().map(|p| p.name).collect()
    }

    #[test]
    fn text_mode_needs_only_prompt() {
        let composer = Composer::default();
        assert_eq!(composer.mode(), Mode::Text);
        assert!(composer.can_submit("a red cup"));
        assert_eq!(composer.readiness("  "), Err(Unready::MissingPrompt));
        assert!(composer.outgoing().is_empty());
    }

    #[test]
    fn adding_one_file_in_text_mode_promotes_to_single() {
        let mut composer = Composer::default();
        assert_eq!(composer.add_files([png("a.png")]), 1);
        assert_eq!(composer.mode(), Mode::Single);
        assert!(composer.can_submit("restyle"));
    }

    #[test]
    fn adding_several_files_in_text_mode_promotes_to_multi() {
        let mut composer = Composer::default();
        assert_eq!(composer.add_files([png("a.png"), png("b.png")]), 2);
        assert_eq!(composer.mode(), Mode::Multi);
        assert_eq!(composer.files().len(), 2);
        assert_eq!(composer.url_rows().len(), 1);
    }

    #[test]
    fn non_images_are_ignored() {
        let mut composer = Composer::default();
        let added = composer.add_files([LocalFile::new("a.txt", "text/plain", b"hi".to_vec())]);
        assert_eq!(added, 0);
        assert_eq!(composer.mode(), Mode::Text);
    }

    #[test]
    fn single_mode_holds_one_source() {
        let mut composer = Composer::default();
        composer.set_mode(Mode::Single);
        assert_eq!(composer.readiness("x"), Err(Unready::MissingImage));

        let row = composer.url_rows()[0].id().to_string();
        assert!(composer.set_url(&row, " https://example.com/a.png "));
        assert_eq!(composer.filled_urls(), vec!["https://example.com/a.png"]);

        // Choosing a file clears the URL.
        composer.add_files([png("b.png"), png("c.png")]);
        assert_eq!(composer.files().len(), 1);
        assert!(composer.filled_urls().is_empty());
        assert_eq!(composer.source_count(), 1);
        assert_eq!(composer.registry().live(), 1);

        // Removing the file brings back an empty URL row.
        let id = composer.files()[0].id().to_string();
        assert!(composer.remove_file(&id));
        assert_eq!(composer.registry().live(), 0);
        assert_eq!(composer.url_rows().len(), 1);
        assert!(!composer.can_submit("x"));
    }

    #[test]
    fn single_mode_file_replaced_by_new_file_releases_preview() {
        let mut composer = Composer::default();
        composer.add_files([png("a.png")]);
        let first = composer.files()[0].preview_url().to_string();
        composer.add_files([png("b.png")]);
        assert!(!composer.registry().is_live(&first));
        assert_eq!(composer.registry().live(), 1);
        assert_eq!(composer.files()[0].file().name, "b.png");
    }

    #[test]
    fn single_mode_url_replaces_file() {
        let mut composer = Composer::default();
        composer.add_files([png("a.png")]);
        assert_eq!(composer.mode(), Mode::Single);
        assert_eq!(composer.registry().live(), 1);

        let rows = composer.url_rows();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].is_filled());
        let row = rows[0].id().to_string();

        // A blank value leaves the file in place.
        assert!(composer.set_url(&row, "   "));
        assert_eq!(composer.files().len(), 1);

        assert!(composer.set_url(&row, "https://example.com/u.png"));
        assert!(composer.files().is_empty());
        assert_eq!(composer.filled_urls(), vec!["https://example.com/u.png"]);
        assert_eq!(composer.url_rows()[0].id(), row);
        assert_eq!(composer.source_count(), 1);
        assert_eq!(composer.registry().live(), 0);
    }

    #[test]
    fn multi_to_single_keeps_first_file_only() {
        let mut composer = multi_with(&["a.png", "b.png", "c.png"], &["https://x/1.png"]);
        assert_eq!(composer.registry().live(), 3);

        composer.set_mode(Mode::Single);
        assert_eq!(composer.files().len(), 1);
        assert_eq!(composer.files()[0].file().name, "a.png");
        assert!(composer.filled_urls().is_empty());
        assert_eq!(composer.registry().live(), 1);
    }

    #[test]
    fn multi_to_single_without_files_keeps_first_filled_url() {
        let mut composer = multi_with(&[], &["  https://x/1.png ", "https://x/2.png"]);
        composer.set_mode(Mode::Single);
        assert_eq!(composer.filled_urls(), vec!["https://x/1.png"]);
    }

    #[test]
    fn switching_to_text_releases_everything() {
        let mut composer = multi_with(&["a.png", "b.png"], &[]);
        composer.set_mode(Mode::Text);
        assert_eq!(composer.registry().live(), 0);
        assert!(composer.preview_items().is_empty());
    }

    #[test]
    fn multi_requires_two_combined_sources() {
        let mut composer = multi_with(&["a.png"], &[]);
        assert_eq!(
            composer.readiness("merge"),
            Err(Unready::NeedMoreImages { have: 1, need: 2 })
        );

        let row = composer.url_rows()[0].id().to_string();
        composer.set_url(&row, "https://x/1.png");
        assert!(composer.can_submit("merge"));
        assert!(!composer.can_submit(""));
    }

    #[test]
    fn multi_always_keeps_a_url_row() {
        let mut composer = multi_with(&[], &["https://x/1.png"]);
        let row = composer.url_rows()[0].id().to_string();
        assert!(composer.remove_url(&row));
        assert_eq!(composer.url_rows().len(), 1);
        assert!(!composer.url_rows()[0].is_filled());
    }

    #[test]
    fn reorder_moves_across_files_and_urls() {
        let mut composer = multi_with(&["a.png", "b.png"], &["https://x/c.png"]);
        let extra = composer.add_url_row().unwrap();
        assert_eq!(names(&composer), vec!["a.png", "b.png", "c.png"]);

        let keys: Vec<String> = composer.preview_items().into_iter().map(|p| p.key).collect();
        assert!(composer.reorder(&keys[2], &keys[0]));
        assert_eq!(names(&composer), vec!["c.png", "a.png", "b.png"]);

        // Views stay consistent with the merged order.
        let files: Vec<&str> = composer.files().iter().map(|f| f.file().name.as_str()).collect();
        assert_eq!(files, vec!["a.png", "b.png"]);
        assert_eq!(composer.filled_urls(), vec!["https://x/c.png"]);

        // Blank rows survive at the end.
        assert_eq!(composer.url_rows().last().unwrap().id(), extra);

        assert!(composer.reorder(&keys[0], &keys[1]));
        assert_eq!(names(&composer), vec!["c.png", "b.png", "a.png"]);
    }

    #[test]
    fn reorder_ignores_unknown_or_identical_keys() {
        let mut composer = multi_with(&["a.png", "b.png"], &[]);
        let keys: Vec<String> = composer.preview_items().into_iter().map(|p| p.key).collect();
        assert!(!composer.reorder(&keys[0], &keys[0]));
        assert!(!composer.reorder("f:missing", &keys[0]));
        assert_eq!(names(&composer), vec!["a.png", "b.png"]);
    }

    #[test]
    fn outgoing_follows_drag_order() {
        let mut composer = multi_with(&["a.png"], &["https://x/b.png"]);
        let keys: Vec<String> = composer.preview_items().into_iter().map(|p| p.key).collect();
        composer.reorder(&keys[1], &keys[0]);

        let outgoing = composer.outgoing();
        assert_eq!(outgoing.len(), 2);
        assert_eq!(outgoing[0], OutgoingSource::Url("https://x/b.png".into()));
        assert!(matches!(outgoing[1], OutgoingSource::File(f) if f.name == "a.png"));
    }

    #[test]
    fn files_added_later_land_before_blank_rows() {
        let mut composer = multi_with(&["a.png"], &["https://x/b.png"]);
        composer.add_url_row();
        composer.add_files([png("c.png")]);
        assert_eq!(names(&composer), vec!["a.png", "b.png", "c.png"]);
        assert!(!composer.url_rows().last().unwrap().is_filled());
    }

    #[test]
    fn continue_editing_as_single_replaces_sources() {
        let mut composer = multi_with(&["a.png", "b.png"], &[]);
        assert!(composer.continue_editing("https://cdn/out.jpeg", EditAs::Single));
        assert_eq!(composer.mode(), Mode::Single);
        assert_eq!(composer.filled_urls(), vec!["https://cdn/out.jpeg"]);
        assert_eq!(composer.registry().live(), 0);
    }

    #[test]
    fn continue_editing_as_multi_appends() {
        let mut composer = Composer::default();
        composer.add_files([png("a.png")]);
        assert!(composer.continue_editing("https://cdn/out.jpeg", EditAs::Multi));

        assert_eq!(composer.mode(), Mode::Multi);
        assert_eq!(names(&composer), vec!["a.png", "out.jpeg"]);
        assert!(composer.can_submit("merge"));
        assert!(!composer.url_rows().last().unwrap().is_filled());
        assert!(!composer.continue_editing("  ", EditAs::Multi));
    }

    #[test]
    fn clear_sources_keeps_mode() {
        let mut composer = multi_with(&["a.png"], &["https://x/1.png"]);
        composer.clear_sources();
        assert_eq!(composer.mode(), Mode::Multi);
        assert_eq!(composer.source_count(), 0);
        assert_eq!(composer.url_rows().len(), 1);
        assert_eq!(composer.registry().live(), 0);
    }

    #[test]
    fn local_file_from_path_detects_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.bin");
        std::fs::write(&path, PNG).unwrap();
        let file = LocalFile::from_path(&path).unwrap();
        assert_eq!(file.name, "shot.bin");
        assert_eq!(file.content_type, "image/png");
        assert!(file.is_image());
    }
}
