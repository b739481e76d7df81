use crate::extractor::{ExtractionError, ExtractionRequest, Extractor};
use std::{
    ffi::{OsStr, OsString},
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};
use tracing::{debug, warn};

const FORBIDDEN_EXTENSIONS: &[&str] = &["json", "txt", "log", "part", "ytdl"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv", "avi", "m4v"];
const OUTPUT_TEMPLATE_STEM: &str = "video";

const NETWORK_MARKERS: &[&str] = &[
    "timed out",
    "timeout",
    "connection reset",
    "connection refused",
    "temporary failure in name resolution",
    "network is unreachable",
    "http error 429",
    "http error 500",
    "http error 502",
    "http error 503",
    "http error 504",
];

/// Extraction collaborator backed by the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    cookies: Option<PathBuf>,
    extra_args: Vec<String>,
}

impl YtDlp {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            cookies: None,
            extra_args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = cookies;
        self
    }

    #[must_use]
    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Command line for one request, URL last.
    fn build_args(&self, request: &ExtractionRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if request.single_item {
            args.push("--no-playlist".into());
        }
        args.extend([
            "--format".into(),
            request.format.clone().into(),
            "--merge-output-format".into(),
            request.container.into(),
            "--socket-timeout".into(),
            request.socket_timeout.as_secs().to_string().into(),
        ]);
        for (name, value) in &request.headers {
            args.push("--add-headers".into());
            args.push(format!("{name}:{value}").into());
        }
        args.extend([
            "--restrict-filenames".into(),
            "--no-progress".into(),
            "--paths".into(),
            request.output_dir.clone().into_os_string(),
            "--output".into(),
            format!("{OUTPUT_TEMPLATE_STEM}.%(ext)s").into(),
            "--print".into(),
            "after_move:filepath".into(),
        ]);
        if let Some(cookies) = &self.cookies {
            args.push("--cookies".into());
            args.push(cookies.clone().into_os_string());
        }
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push("--".into());
        args.push(request.url.clone().into());
        args
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl Extractor for YtDlp {
    fn extract(&self, request: &ExtractionRequest) -> Result<PathBuf, ExtractionError> {
        let output = Command::new(&self.binary)
            .current_dir(&request.output_dir)
            .args(self.build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(reported_path(&stdout, &request.output_dir))
    }
}

/// Path of the produced file.
///
/// Prefers the last path printed after post-processing, then any media file
/// in `dir`, then the path the output template predicts.
fn reported_path(stdout: &str, dir: &Path) -> PathBuf {
    if let Some(line) = stdout.lines().map(str::trim).rev().find(|l| !l.is_empty()) {
        let path = PathBuf::from(line);
        return if path.is_absolute() { path } else { dir.join(path) };
    }

    debug!(dir = %dir.display(), "extractor printed no path, scanning scratch dir");
    let mut found = fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(std::result::Result::ok)
                .map(|e| e.path())
                .filter(|p| is_potential_media_file(p))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    found.sort();

    found.into_iter().next().unwrap_or_else(|| {
        warn!(dir = %dir.display(), "no media files found in scratch dir");
        dir.join(format!("{OUTPUT_TEMPLATE_STEM}.mp4"))
    })
}

/// Map a failed run's stderr onto the collaborator error taxonomy.
fn classify_failure(stderr: &str) -> ExtractionError {
    let stderr = stderr.trim();
    let lower = stderr.to_lowercase();

    if NETWORK_MARKERS.iter().any(|m| lower.contains(m)) {
        return ExtractionError::Network(last_error_line(stderr).to_owned());
    }

    if lower.lines().any(|l| l.trim_start().starts_with("error:")) {
        return ExtractionError::Rejected(last_error_line(stderr).to_owned());
    }

    if stderr.is_empty() {
        return ExtractionError::Failed("yt-dlp exited without output".into());
    }
    ExtractionError::Failed(last_error_line(stderr).to_owned())
}

fn last_error_line(stderr: &str) -> &str {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.to_lowercase().starts_with("error:"))
        .or_else(|| stderr.lines().rev().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or_default()
}

/// Filter function to determine if a file is potentially a video based on name/extension.
fn is_potential_media_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    if let Some(filename) = path.file_name().and_then(OsStr::to_str) {
        // Skip common non-media files
        if filename.starts_with('.') || filename.to_lowercase().contains("metadata") {
            return false;
        }
    }

    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };

    if FORBIDDEN_EXTENSIONS
        .iter()
        .any(|forbidden| forbidden.eq_ignore_ascii_case(ext))
    {
        return false;
    }

    VIDEO_EXTENSIONS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(ext))
}
