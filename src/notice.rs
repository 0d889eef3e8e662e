use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const NOTICE_LOG_FILE: &str = "notices.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// Queue of user-facing notices. The UI drains it every frame and shows
/// each entry once.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    pending: Vec<Notice>,
    log_path: Option<PathBuf>,
}

impl NoticeBoard {
    pub fn new(log_path: Option<PathBuf>) -> Self {
        Self {
            pending: Vec::new(),
            log_path,
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn push(&mut self, kind: NoticeKind, text: impl Into<String>) {
        let text = text.into();
        if let Some(path) = &self.log_path {
            append_notice_log(path, &text);
        }
        self.pending.push(Notice { kind, text });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(NoticeKind::Info, text);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(NoticeKind::Success, text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(NoticeKind::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(NoticeKind::Error, text);
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

pub fn append_notice_log(path: &Path, msg: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{} - {}", Local::now().to_rfc3339(), msg);
    }
}

/// Last `count` lines of the notice log; empty if it cannot be read.
pub fn read_last_lines(path: &Path, count: usize) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut lines: Vec<String> = content.lines().map(str::to_owned).collect();
    if lines.len() > count {
        lines.drain(0..lines.len() - count);
    }
    lines
}
