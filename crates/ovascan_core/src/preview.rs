//! Image preview handler.
//!
//! A selection starts a background read that encodes the file as a data URL.
//! Each request gets a generation number; only the outcome of the most recent
//! request may replace the preview, so a slow read of an earlier file can never
//! overwrite a later one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use serde::{Deserialize, Serialize};

use crate::data_url::{DataUrl, sniff_mime};
use crate::error::PreviewError;

/// A file chosen through the picker. Only valid for one change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }
}

/// How the preview image is laid out inside its container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewStyle {
    /// Maximum width as a fraction of the container width; height follows the aspect ratio.
    pub max_width_fraction: f32,
    /// Corner rounding in points.
    pub corner_radius: u8,
}

impl Default for PreviewStyle {
    fn default() -> Self {
        Self {
            max_width_fraction: 1.0,
            corner_radius: 10,
        }
    }
}

impl PreviewStyle {
    /// Size of an image of natural size `dimensions` in a container `available_width` wide.
    ///
    /// Never upscales; height keeps the aspect ratio.
    pub fn fitted_size(&self, available_width: f32, dimensions: (u32, u32)) -> (f32, f32) {
        let (w, h) = (dimensions.0 as f32, dimensions.1 as f32);
        if w <= 0.0 || h <= 0.0 {
            return (0.0, 0.0);
        }
        let max_width = (available_width * self.max_width_fraction).max(0.0);
        let width = w.min(max_width);
        (width, width * h / w)
    }
}

/// Decoded RGBA8 pixels, ready for upload as a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewPixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<[u8]>,
}

/// The content of the preview container.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewArtifact {
    pub generation: u64,
    pub file_name: String,
    pub data_url: DataUrl,
    pub byte_len: usize,
    pub pixels: PreviewPixels,
}

impl PreviewArtifact {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixels.width, self.pixels.height)
    }
}

/// Source of file bytes.
pub trait FileReader: Send + Sync + 'static {
    fn file_len(&self, path: &Path) -> io::Result<u64>;
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl FileReader for FsReader {
    fn file_len(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadTicket {
    pub generation: u64,
    pub file: SelectedFile,
}

#[derive(Debug)]
pub struct ReadOutcome {
    pub generation: u64,
    pub file: SelectedFile,
    pub result: Result<PreviewArtifact, PreviewError>,
}

/// What [`PreviewHandler::apply`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The preview now shows the outcome's file.
    Rendered,
    /// The read failed; the previous preview was kept and a notice set.
    Failed,
    /// A newer selection exists; the outcome was dropped.
    Stale,
}

/// Read and encode the ticket's file.
///
/// Gives up early with [`PreviewError::Superseded`] once `latest` has moved past the ticket.
pub fn read_artifact<R: FileReader + ?Sized>(
    reader: &R,
    ticket: ReadTicket,
    max_bytes: u64,
    latest: &AtomicU64,
) -> ReadOutcome {
    let ReadTicket { generation, file } = ticket;
    let result = encode_file(reader, &file, generation, max_bytes, latest);
    ReadOutcome {
        generation,
        file,
        result,
    }
}

fn encode_file<R: FileReader + ?Sized>(
    reader: &R,
    file: &SelectedFile,
    generation: u64,
    max_bytes: u64,
    latest: &AtomicU64,
) -> Result<PreviewArtifact, PreviewError> {
    let superseded = || latest.load(Ordering::Acquire) != generation;
    let io_err = |source: io::Error| PreviewError::Io {
        path: file.path.clone(),
        source,
    };

    if superseded() {
        return Err(PreviewError::Superseded {
            path: file.path.clone(),
        });
    }
    let size = reader.file_len(&file.path).map_err(io_err)?;
    if size > max_bytes {
        return Err(PreviewError::TooLarge {
            path: file.path.clone(),
            size,
            limit: max_bytes,
        });
    }

    let bytes = reader.read(&file.path).map_err(io_err)?;
    if bytes.is_empty() {
        return Err(PreviewError::Empty {
            path: file.path.clone(),
        });
    }
    // the file may have grown between stat and read
    if bytes.len() as u64 > max_bytes {
        return Err(PreviewError::TooLarge {
            path: file.path.clone(),
            size: bytes.len() as u64,
            limit: max_bytes,
        });
    }
    if superseded() {
        return Err(PreviewError::Superseded {
            path: file.path.clone(),
        });
    }

    let Some(mime) = sniff_mime(&bytes) else {
        return Err(PreviewError::UnsupportedFormat {
            path: file.path.clone(),
        });
    };
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| PreviewError::Decode {
            path: file.path.clone(),
            message: e.to_string(),
        })?
        .to_rgba8();
    let (width, height) = decoded.dimensions();

    Ok(PreviewArtifact {
        generation,
        file_name: file.name.clone(),
        data_url: DataUrl::encode(mime, &bytes),
        byte_len: bytes.len(),
        pixels: PreviewPixels {
            width,
            height,
            rgba: decoded.into_raw().into(),
        },
    })
}

type Waker = Arc<dyn Fn() + Send + Sync>;

pub struct PreviewHandler<R: FileReader = FsReader> {
    reader: Arc<R>,
    max_bytes: u64,
    latest: Arc<AtomicU64>,
    current: Option<PreviewArtifact>,
    notice: Option<String>,
    pending: Option<SelectedFile>,
    tx: Sender<ReadOutcome>,
    rx: Receiver<ReadOutcome>,
    waker: Option<Waker>,
}

impl<R: FileReader> PreviewHandler<R> {
    pub fn new(reader: R, max_bytes: u64) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            reader: Arc::new(reader),
            max_bytes,
            latest: Arc::new(AtomicU64::new(0)),
            current: None,
            notice: None,
            pending: None,
            tx,
            rx,
            waker: None,
        }
    }

    /// Called from the worker after each finished read, e.g. to request a repaint.
    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }

    /// Register a selection. An empty selection changes nothing.
    pub fn begin(&mut self, selection: Option<SelectedFile>) -> Option<ReadTicket> {
        let Some(file) = selection else {
            tracing::debug!("Selection cleared; keeping current preview");
            return None;
        };
        let generation = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        self.pending = Some(file.clone());
        self.notice = None;
        tracing::debug!(generation, file = %file.path.display(), "Preview requested");
        Some(ReadTicket { generation, file })
    }

    /// Apply a finished read if it belongs to the most recent request.
    pub fn apply(&mut self, outcome: ReadOutcome) -> Applied {
        let latest = self.latest.load(Ordering::Acquire);
        if outcome.generation != latest {
            tracing::debug!(
                generation = outcome.generation,
                latest,
                "Dropping preview for superseded selection"
            );
            return Applied::Stale;
        }
        self.pending = None;
        match outcome.result {
            Ok(artifact) => {
                tracing::info!(
                    file = %artifact.file_name,
                    bytes = artifact.byte_len,
                    "Preview rendered"
                );
                self.current = Some(artifact);
                self.notice = None;
                Applied::Rendered
            }
            Err(PreviewError::Superseded { .. }) => Applied::Stale,
            Err(err) => {
                tracing::warn!("Preview failed for {}: {err}", outcome.file.path.display());
                self.notice = Some(format!("Could not preview {}: {err}", outcome.file.name));
                Applied::Failed
            }
        }
    }

    /// Start reading the selection on a worker thread. Returns false for an empty selection.
    pub fn on_change(&mut self, selection: Option<SelectedFile>) -> bool {
        let Some(ticket) = self.begin(selection) else {
            return false;
        };
        let reader = Arc::clone(&self.reader);
        let latest = Arc::clone(&self.latest);
        let tx = self.tx.clone();
        let waker = self.waker.clone();
        let max_bytes = self.max_bytes;
        thread::spawn(move || {
            let outcome = read_artifact(reader.as_ref(), ticket, max_bytes, &latest);
            if tx.send(outcome).is_ok()
                && let Some(wake) = waker
            {
                wake();
            }
        });
        true
    }

    /// Apply every outcome the workers have delivered so far.
    pub fn poll(&mut self) -> Vec<Applied> {
        let mut applied = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            applied.push(self.apply(outcome));
        }
        applied
    }

    pub fn current(&self) -> Option<&PreviewArtifact> {
        self.current.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn pending(&self) -> Option<&SelectedFile> {
        self.pending.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Generation of the most recent request.
    pub fn generation(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Takes effect for the next selection.
    pub fn set_max_bytes(&mut self, max_bytes: u64) {
        self.max_bytes = max_bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use tempfile::{TempDir, tempdir};

    const LIMIT: u64 = 1024 * 1024;

    fn write_png(dir: &TempDir, name: &str, w: u32, h: u32) -> Result<PathBuf> {
        let path = dir.path().join(name);
        image::RgbaImage::new(w, h).save(&path)?;
        Ok(path)
    }

    fn handler() -> PreviewHandler {
        PreviewHandler::new(FsReader, LIMIT)
    }

    fn settle<R: FileReader>(handler: &mut PreviewHandler<R>) -> Vec<Applied> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut applied = Vec::new();
        while handler.is_loading() && Instant::now() < deadline {
            applied.extend(handler.poll());
            thread::sleep(Duration::from_millis(5));
        }
        applied
    }

    struct FailingReader;

    impl FileReader for FailingReader {
        fn file_len(&self, _path: &Path) -> io::Result<u64> {
            Ok(16)
        }

        fn read(&self, _path: &Path) -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    /// Blocks reads of `gated` until the test releases them.
    struct GatedReader {
        gated: String,
        gate: Mutex<Receiver<()>>,
    }

    impl FileReader for GatedReader {
        fn file_len(&self, path: &Path) -> io::Result<u64> {
            FsReader.file_len(path)
        }

        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            if path.ends_with(&self.gated) {
                let gate = self.gate.lock().map_err(|_| io::Error::other("poisoned"))?;
                let _ = gate.recv_timeout(Duration::from_secs(5));
            }
            FsReader.read(path)
        }
    }

    #[test]
    fn empty_selection_keeps_existing_preview() -> Result<()> {
        let dir = tempdir()?;
        let path = write_png(&dir, "a.png", 2, 2)?;
        let mut preview = handler();
        assert!(preview.on_change(Some(SelectedFile::new(&path))));
        settle(&mut preview);
        let before = preview.current().cloned();
        assert!(before.is_some());

        assert!(!preview.on_change(None));
        assert!(!preview.is_loading());
        assert_eq!(preview.current().cloned(), before);
        Ok(())
    }

    #[test]
    fn renders_data_url_of_exact_file_bytes() -> Result<()> {
        let dir = tempdir()?;
        let path = write_png(&dir, "scan.png", 8, 4)?;
        let mut preview = handler();
        preview.on_change(Some(SelectedFile::new(&path)));
        assert_eq!(settle(&mut preview), vec![Applied::Rendered]);

        let artifact = preview.current().unwrap();
        assert_eq!(artifact.file_name, "scan.png");
        assert_eq!(artifact.data_url.mime(), "image/png");
        assert_eq!(artifact.data_url.decode_payload()?, fs::read(&path)?);
        assert_eq!(artifact.dimensions(), (8, 4));
        assert_eq!(artifact.pixels.rgba.len(), 8 * 4 * 4);
        assert!(preview.notice().is_none());
        Ok(())
    }

    #[test]
    fn later_selection_wins_over_slower_earlier_read() -> Result<()> {
        let dir = tempdir()?;
        let a = write_png(&dir, "a.png", 2, 2)?;
        let b = write_png(&dir, "b.png", 3, 3)?;
        let (release, gate) = mpsc::channel();
        let mut preview = PreviewHandler::new(
            GatedReader {
                gated: "a.png".into(),
                gate: Mutex::new(gate),
            },
            LIMIT,
        );

        preview.on_change(Some(SelectedFile::new(&a)));
        preview.on_change(Some(SelectedFile::new(&b)));
        let mut seen = settle(&mut preview);
        assert_eq!(preview.current().map(|c| c.file_name.as_str()), Some("b.png"));

        release.send(())?;
        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.len() < 2 && Instant::now() < deadline {
            seen.extend(preview.poll());
            thread::sleep(Duration::from_millis(5));
        }
        seen.sort_by_key(|a| *a == Applied::Stale);
        assert_eq!(seen, vec![Applied::Rendered, Applied::Stale]);
        assert_eq!(preview.current().map(|c| c.file_name.as_str()), Some("b.png"));
        Ok(())
    }

    #[test]
    fn apply_drops_successful_outcome_of_superseded_request() -> Result<()> {
        let dir = tempdir()?;
        let a = write_png(&dir, "a.png", 2, 2)?;
        let b = write_png(&dir, "b.png", 2, 2)?;
        let mut preview = handler();

        let ticket_a = preview.begin(Some(SelectedFile::new(&a))).unwrap();
        let ticket_b = preview.begin(Some(SelectedFile::new(&b))).unwrap();
        assert!(ticket_b.generation > ticket_a.generation);

        // Read A as if it had started before B was chosen.
        let started_a = AtomicU64::new(ticket_a.generation);
        let outcome_a = read_artifact(&FsReader, ticket_a, LIMIT, &started_a);
        assert!(outcome_a.result.is_ok());
        let latest = AtomicU64::new(ticket_b.generation);
        let outcome_b = read_artifact(&FsReader, ticket_b, LIMIT, &latest);

        assert_eq!(preview.apply(outcome_b), Applied::Rendered);
        assert_eq!(preview.apply(outcome_a), Applied::Stale);
        assert_eq!(preview.current().map(|c| c.file_name.as_str()), Some("b.png"));
        Ok(())
    }

    #[test]
    fn failed_read_of_superseded_request_sets_no_notice() -> Result<()> {
        let dir = tempdir()?;
        let missing = dir.path().join("missing.png");
        let b = write_png(&dir, "b.png", 2, 2)?;
        let mut preview = handler();

        let ticket_a = preview.begin(Some(SelectedFile::new(&missing))).unwrap();
        let ticket_b = preview.begin(Some(SelectedFile::new(&b))).unwrap();
        assert_eq!(preview.generation(), ticket_b.generation);

        let started_a = AtomicU64::new(ticket_a.generation);
        let outcome_a = read_artifact(&FsReader, ticket_a, LIMIT, &started_a);
        assert!(matches!(outcome_a.result, Err(PreviewError::Io { .. })));
        let latest = AtomicU64::new(ticket_b.generation);
        let outcome_b = read_artifact(&FsReader, ticket_b, LIMIT, &latest);

        assert_eq!(preview.apply(outcome_b), Applied::Rendered);
        assert_eq!(preview.apply(outcome_a), Applied::Stale);
        assert!(preview.notice().is_none());
        assert_eq!(preview.current().map(|c| c.file_name.as_str()), Some("b.png"));
        Ok(())
    }

    #[test]
    fn read_failure_keeps_previous_preview_and_sets_notice() -> Result<()> {
        let dir = tempdir()?;
        let path = write_png(&dir, "ok.png", 2, 2)?;
        let mut preview = PreviewHandler::new(FailingReader, LIMIT);

        let good = preview.begin(Some(SelectedFile::new(&path))).unwrap();
        let latest = AtomicU64::new(good.generation);
        let outcome = read_artifact(&FsReader, good, LIMIT, &latest);
        assert_eq!(preview.apply(outcome), Applied::Rendered);

        preview.on_change(Some(SelectedFile::new(dir.path().join("locked.png"))));
        assert_eq!(settle(&mut preview), vec![Applied::Failed]);
        assert_eq!(preview.current().map(|c| c.file_name.as_str()), Some("ok.png"));
        let notice = preview.notice().unwrap();
        assert!(notice.contains("locked.png"), "{notice}");
        Ok(())
    }

    #[test]
    fn rejects_oversized_files() -> Result<()> {
        let dir = tempdir()?;
        let path = write_png(&dir, "big.png", 64, 64)?;
        let size = fs::metadata(&path)?.len();
        let mut preview = PreviewHandler::new(FsReader, size - 1);
        let ticket = preview.begin(Some(SelectedFile::new(&path))).unwrap();
        let latest = AtomicU64::new(ticket.generation);
        let outcome = read_artifact(&FsReader, ticket, size - 1, &latest);
        assert!(matches!(outcome.result, Err(PreviewError::TooLarge { .. })));
        assert_eq!(preview.apply(outcome), Applied::Failed);
        assert!(preview.current().is_none());
        Ok(())
    }

    #[test]
    fn rejects_empty_and_non_image_files() -> Result<()> {
        let dir = tempdir()?;
        let empty = dir.path().join("empty.png");
        fs::write(&empty, b"")?;
        let text = dir.path().join("notes.png");
        fs::write(&text, b"definitely not an image")?;

        let latest = AtomicU64::new(1);
        let ticket = |path: &Path| ReadTicket {
            generation: 1,
            file: SelectedFile::new(path),
        };
        let empty_outcome = read_artifact(&FsReader, ticket(&empty), LIMIT, &latest);
        assert!(matches!(empty_outcome.result, Err(PreviewError::Empty { .. })));
        let text_outcome = read_artifact(&FsReader, ticket(&text), LIMIT, &latest);
        assert!(matches!(
            text_outcome.result,
            Err(PreviewError::UnsupportedFormat { .. })
        ));
        Ok(())
    }

    #[test]
    fn rejects_image_that_fails_to_decode() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("truncated.png");
        fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0])?;
        let latest = AtomicU64::new(1);
        let ticket = ReadTicket {
            generation: 1,
            file: SelectedFile::new(&path),
        };
        let outcome = read_artifact(&FsReader, ticket, LIMIT, &latest);
        assert!(matches!(outcome.result, Err(PreviewError::Decode { .. })));
        Ok(())
    }

    #[test]
    fn superseded_ticket_skips_the_read() {
        let latest = AtomicU64::new(2);
        let ticket = ReadTicket {
            generation: 1,
            file: SelectedFile::new("/nonexistent/a.png"),
        };
        let outcome = read_artifact(&FsReader, ticket, LIMIT, &latest);
        assert!(matches!(outcome.result, Err(PreviewError::Superseded { .. })));
    }

    #[test]
    fn waker_runs_after_each_read() -> Result<()> {
        let dir = tempdir()?;
        let path = write_png(&dir, "a.png", 2, 2)?;
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let mut preview = handler().with_waker(move || {
            if let Ok(tx) = tx.lock() {
                let _ = tx.send(());
            }
        });
        preview.on_change(Some(SelectedFile::new(&path)));
        rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(preview.poll(), vec![Applied::Rendered]);
        Ok(())
    }

    #[test]
    fn fitted_size_never_upscales_and_keeps_aspect() {
        let style = PreviewStyle::default();
        assert_eq!(style.fitted_size(400.0, (800, 600)), (400.0, 300.0));
        assert_eq!(style.fitted_size(400.0, (200, 100)), (200.0, 100.0));
        let half = PreviewStyle {
            max_width_fraction: 0.5,
            ..PreviewStyle::default()
        };
        assert_eq!(half.fitted_size(400.0, (800, 400)), (200.0, 100.0));
        assert_eq!(style.fitted_size(400.0, (0, 10)), (0.0, 0.0));
    }
}
