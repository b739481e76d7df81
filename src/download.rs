use crate::{
    error::{Error, Result},
    extractor::{ExtractOptions, Extractor, OUTPUT_CONTAINER},
    gate::Permit,
};
use std::{
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::{Builder, TempDir};
use tokio::task;
use tracing::{debug, info};

const SCRATCH_PREFIX: &str = "tgvd-";

/// `TempDir` guard + downloaded file. Keep this value alive until you're
/// done sending the file so the scratch directory is not deleted.
#[derive(Debug)]
pub struct Download {
    scratch: TempDir,
    file: PathBuf,
}

impl Download {
    #[inline]
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    #[inline]
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Remove the scratch directory and everything in it.
    ///
    /// Dropping a `Download` also removes it; this variant reports failures.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if removal fails.
    pub fn cleanup(self) -> io::Result<()> {
        self.scratch.close()
    }
}

/// Runs the extractor inside a per-request scratch directory.
#[derive(Clone)]
pub struct Downloader {
    extractor: Arc<dyn Extractor>,
    options: ExtractOptions,
    scratch_root: Option<PathBuf>,
}

impl Downloader {
    #[must_use]
    pub fn new(extractor: Arc<dyn Extractor>, options: ExtractOptions) -> Self {
        Self {
            extractor,
            options,
            scratch_root: None,
        }
    }

    /// Parent directory for scratch workspaces. Defaults to the system temp dir.
    #[must_use]
    pub fn with_scratch_root(mut self, root: Option<PathBuf>) -> Self {
        self.scratch_root = root;
        self
    }

    /// Download one URL. The caller must hold a gate permit for the duration.
    ///
    /// The scratch directory is removed on every failure path. On success it
    /// lives inside the returned [`Download`].
    ///
    /// # Errors
    ///
    /// - `Error::UnsupportedOrRestrictedMedia` if the extractor rejected the URL.
    /// - `Error::ProducedFileMissing` if the reported file does not exist.
    /// - `Error::Network`, `Error::Extractor`, `Error::Io`, `Error::Join` otherwise.
    pub async fn fetch_video(&self, url: &str, _permit: &Permit) -> Result<Download> {
        let scratch = self.create_scratch()?;
        let request = self.options.request(url, scratch.path());
        debug!(dir = %scratch.path().display(), "created scratch workspace");

        // The guard travels with the blocking job so an abandoned request
        // only removes the directory once the extractor has stopped writing.
        let extractor = Arc::clone(&self.extractor);
        let (scratch, extracted) = task::spawn_blocking(move || {
            let extracted = extractor.extract(&request);
            (scratch, extracted)
        })
        .await?;

        let reported = extracted.map_err(|e| Error::from_extraction(url, e))?;
        let file = resolve_media_path(&reported);
        if !file.is_file() {
            return Err(Error::ProducedFileMissing { path: file });
        }

        info!(file = %file.display(), "extraction finished");
        Ok(Download { scratch, file })
    }

    fn create_scratch(&self) -> Result<TempDir> {
        let mut builder = Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.scratch_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}

/// Prefer an `.mp4` sibling when the merge step renamed the output.
#[must_use]
pub fn resolve_media_path(reported: &Path) -> PathBuf {
    let is_mp4 = reported
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(OUTPUT_CONTAINER));
    if is_mp4 {
        return reported.to_path_buf();
    }

    let sibling = reported.with_extension(OUTPUT_CONTAINER);
    if sibling.is_file() {
        return sibling;
    }
    reported.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        gate::ConcurrencyGate,
        testing::{Behavior, ScriptedExtractor},
    };
    use tempfile::tempdir;

    fn downloader(extractor: &Arc<ScriptedExtractor>, root: &Path) -> Downloader {
        let extractor: Arc<dyn Extractor> = extractor.clone();
        Downloader::new(extractor, ExtractOptions::default())
            .with_scratch_root(Some(root.to_path_buf()))
    }

    fn entries(root: &Path) -> usize {
        fs::read_dir(root).map(Iterator::count).unwrap_or_default()
    }

    #[test]
    fn resolve_prefers_mp4_sibling() {
        let dir = tempdir().expect("tempdir");
        let webm = dir.path().join("video.webm");
        fs::write(&webm, b"x").expect("write");
        assert_eq!(resolve_media_path(&webm), webm);

        fs::write(dir.path().join("video.mp4"), b"x").expect("write");
        assert_eq!(resolve_media_path(&webm), dir.path().join("video.mp4"));

        let mp4 = dir.path().join("clip.MP4");
        assert_eq!(resolve_media_path(&mp4), mp4);
    }

    #[tokio::test]
    async fn success_keeps_file_until_cleanup() {
        let root = tempdir().expect("root");
        let extractor = Arc::new(ScriptedExtractor::new(Behavior::Produce("video_x.mp4")));
        let gate = ConcurrencyGate::new(1);
        let permit = gate.acquire().await.expect("permit");

        let download = downloader(&extractor, root.path())
            .fetch_video("https://youtu.be/abc123", &permit)
            .await
            .expect("download");

        assert!(download.file().is_file());
        assert!(download.file().starts_with(download.scratch_dir()));
        assert!(
            download
                .scratch_dir()
                .file_name()
                .and_then(OsStr::to_str)
                .is_some_and(|n| n.starts_with(SCRATCH_PREFIX))
        );

        let requests = extractor.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://youtu.be/abc123");
        assert_eq!(requests[0].output_dir, download.scratch_dir());

        let scratch = download.scratch_dir().to_path_buf();
        download.cleanup().expect("cleanup");
        assert!(!scratch.exists());
        assert_eq!(entries(root.path()), 0);
    }

    #[tokio::test]
    async fn merged_sibling_is_returned() {
        let root = tempdir().expect("root");
        let extractor = Arc::new(ScriptedExtractor::new(Behavior::ProduceRenamed));
        let gate = ConcurrencyGate::new(1);
        let permit = gate.acquire().await.expect("permit");

        let download = downloader(&extractor, root.path())
            .fetch_video("https://youtu.be/abc123", &permit)
            .await
            .expect("download");
        assert_eq!(download.file().extension().and_then(OsStr::to_str), Some("mp4"));
    }

    #[tokio::test]
    async fn rejection_removes_scratch() {
        let root = tempdir().expect("root");
        let extractor = Arc::new(ScriptedExtractor::new(Behavior::Restricted));
        let gate = ConcurrencyGate::new(1);
        let permit = gate.acquire().await.expect("permit");

        let err = downloader(&extractor, root.path())
            .fetch_video("https://youtu.be/private", &permit)
            .await
            .expect_err("restricted");

        assert_eq!(err.kind(), ErrorKind::UnsupportedOrRestrictedMedia);
        assert_eq!(entries(root.path()), 0);
    }

    #[tokio::test]
    async fn missing_output_is_reported() {
        let root = tempdir().expect("root");
        let extractor = Arc::new(ScriptedExtractor::new(Behavior::ReportMissing));
        let gate = ConcurrencyGate::new(1);
        let permit = gate.acquire().await.expect("permit");

        let err = downloader(&extractor, root.path())
            .fetch_video("https://youtu.be/abc123", &permit)
            .await
            .expect_err("missing");

        assert!(matches!(err, Error::ProducedFileMissing { .. }));
        assert_eq!(entries(root.path()), 0);
    }

    #[tokio::test]
    async fn panicking_extractor_is_unexpected() {
        let root = tempdir().expect("root");
        let extractor = Arc::new(ScriptedExtractor::new(Behavior::Panic));
        let gate = ConcurrencyGate::new(1);
        let permit = gate.acquire().await.expect("permit");

        let err = downloader(&extractor, root.path())
            .fetch_video("https://youtu.be/abc123", &permit)
            .await
            .expect_err("panic");

        assert!(matches!(err, Error::Join(_)));
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(entries(root.path()), 0);
    }

    #[tokio::test]
    async fn abandoned_request_cleans_up_after_worker() {
        let root = tempdir().expect("root");
        let extractor = Arc::new(
            ScriptedExtractor::new(Behavior::Produce("video.mp4"))
                .with_delay(std::time::Duration::from_millis(200)),
        );
        let gate = ConcurrencyGate::new(1);
        let permit = gate.acquire().await.expect("permit");
        let downloader = downloader(&extractor, root.path());

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            downloader.fetch_video("https://youtu.be/abc123", &permit),
        )
        .await;
        assert!(abandoned.is_err());

        for _ in 0..100 {
            if entries(root.path()) == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(extractor.calls(), 1);
        assert_eq!(entries(root.path()), 0);
    }
}
