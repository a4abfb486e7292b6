//! Host surfaces
//!
//! Clipboard, transient notifications and file saving belong to whatever is
//! hosting the listing. The orchestrator only talks to these traits; native
//! implementations for a desktop/terminal host live here as well.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use crate::remote::{ArchiveOutput, ListingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Info,
    Error,
}

/// Transient, non-blocking notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: ToastLevel::Success, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { level: ToastLevel::Info, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: ToastLevel::Error, message: message.into() }
    }
}

/// Write-only clipboard access
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ListingError>;
}

/// Toast surface
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Saves a finished archive on the user's machine
pub trait DownloadSink: Send + Sync {
    fn save(&self, output: &ArchiveOutput) -> Result<(), ListingError>;
}

/// Collaborators supplied by the host
#[derive(Clone)]
pub struct HostServices {
    pub clipboard: Arc<dyn Clipboard>,
    pub notifier: Arc<dyn Notifier>,
    pub sink: Arc<dyn DownloadSink>,
}

/// Native system clipboard
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ListingError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ListingError::Clipboard(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ListingError::Clipboard(e.to_string()))
    }
}

/// Emits toasts as log events
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Error => error!("{}", toast.message),
            _ => info!("{}", toast.message),
        }
    }
}

/// Keeps every toast, newest last (inspection by front ends and tests)
#[derive(Default)]
pub struct ToastLog(Mutex<Vec<Toast>>);

impl ToastLog {
    pub fn toasts(&self) -> Vec<Toast> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for ToastLog {
    fn notify(&self, toast: Toast) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).push(toast);
    }
}

/// Writes archives into a download directory
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The user's download directory, or the working directory
    pub fn downloads() -> Self {
        Self::new(dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")))
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, output: &ArchiveOutput) -> Result<(), ListingError> {
        // Archive names come from remote folder names; keep only the last component
        let file_name = std::path::Path::new(&output.file_name)
            .file_name()
            .ok_or_else(|| ListingError::Parse(format!("invalid archive name: {}", output.file_name)))?;
        std::fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(file_name);
        std::fs::write(&target, &output.bytes)?;
        info!("Saved archive to {:?}", target);
        Ok(())
    }
}
