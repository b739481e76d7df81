//! Scripted collaborators shared by unit tests.

use crate::{
    error::{Error, Result},
    extractor::{ExtractionError, ExtractionRequest, Extractor},
    transport::ChatTransport,
};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};
use teloxide::types::{ChatAction, ChatId};

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Write the named file into the output dir and report it.
    Produce(&'static str),
    /// Write `video.mp4` but report `video.webm`.
    ProduceRenamed,
    Restricted,
    /// Report `video.mp4` without writing anything.
    ReportMissing,
    Panic,
}

#[derive(Debug)]
pub struct ScriptedExtractor {
    behavior: Behavior,
    delay: Duration,
    requests: Mutex<Vec<ExtractionRequest>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            requests: Mutex::default(),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<ExtractionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `extract` calls seen.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Extractor for ScriptedExtractor {
    fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> std::result::Result<PathBuf, ExtractionError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        thread::sleep(self.delay);
        let result = self.run(&request.output_dir);

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl ScriptedExtractor {
    fn run(&self, dir: &Path) -> std::result::Result<PathBuf, ExtractionError> {
        match self.behavior {
            Behavior::Produce(name) => {
                let path = dir.join(name);
                fs::write(&path, b"\x00\x00\x00\x18ftypmp42")?;
                Ok(path)
            }
            Behavior::ProduceRenamed => {
                fs::write(dir.join("video.mp4"), b"\x00\x00\x00\x18ftypmp42")?;
                Ok(dir.join("video.webm"))
            }
            Behavior::Restricted => Err(ExtractionError::Rejected(
                "ERROR: [youtube] abc: Private video".into(),
            )),
            Behavior::ReportMissing => Ok(dir.join("video.mp4")),
            Behavior::Panic => panic!("extractor crashed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text(String),
    Activity,
    /// Uploaded path and whether it existed at upload time.
    Video { path: PathBuf, existed: bool },
}

/// Transport that records every outbound call.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<(ChatId, Sent)>>>,
    fail_video: bool,
}

impl RecordingTransport {
    pub fn failing_uploads() -> Self {
        Self {
            fail_video: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn videos(&self) -> Vec<(PathBuf, bool)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Video { path, existed } => Some((path, existed)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, chat_id: ChatId, sent: Sent) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((chat_id, sent));
    }
}

#[async_trait::async_trait]
impl ChatTransport for RecordingTransport {
    async fn reply_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.record(chat_id, Sent::Text(text.to_owned()));
        Ok(())
    }

    async fn reply_activity(&self, chat_id: ChatId, _action: ChatAction) -> Result<()> {
        self.record(chat_id, Sent::Activity);
        Ok(())
    }

    async fn reply_video(&self, chat_id: ChatId, path: &Path) -> Result<()> {
        self.record(
            chat_id,
            Sent::Video {
                path: path.to_path_buf(),
                existed: path.is_file(),
            },
        );
        if self.fail_video {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        Ok(())
    }
}
