//! Shared types for the remote drive index
//!
//! This module contains the listing snapshot representation, archive job
//! request/response types and the error type shared by every collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Folder child as returned by the listing API
///
/// Immutable snapshot: the view reorders entries but never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DriveItem", rename_all = "camelCase")]
pub struct FolderEntry {
    /// Unique item identifier assigned by the drive
    pub id: String,
    /// Display name (not encoded)
    pub name: String,
    /// Whether this is a folder
    pub is_folder: bool,
    /// Size in bytes (aggregate for folders, or 0)
    pub size: u64,
    /// Last modification time
    pub last_modified_date_time: DateTime<Utc>,
    /// MIME type from the file facet, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FolderEntry {
    /// Create a new file entry
    pub fn file(id: &str, name: &str, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            is_folder: false,
            size,
            last_modified_date_time: modified,
            mime_type: None,
        }
    }

    /// Create a new folder entry
    pub fn folder(id: &str, name: &str, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            is_folder: true,
            ..Self::file(id, name, size, modified)
        }
    }
}

/// Wire shape of a drive item.
///
/// The drive marks folders with a `folder` facet object and files with a
/// `file` facet; snapshots written by this crate carry `isFolder` instead.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItem {
    id: String,
    name: String,
    #[serde(default)]
    size: u64,
    last_modified_date_time: DateTime<Utc>,
    #[serde(default)]
    is_folder: Option<bool>,
    #[serde(default)]
    folder: Option<serde_json::Value>,
    #[serde(default)]
    file: Option<FileFacet>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileFacet {
    #[serde(default)]
    mime_type: Option<String>,
}

impl From<DriveItem> for FolderEntry {
    fn from(item: DriveItem) -> Self {
        let is_folder = item
            .is_folder
            .unwrap_or_else(|| item.folder.as_ref().is_some_and(|f| !f.is_null()));
        let mime_type = item
            .mime_type
            .or_else(|| item.file.and_then(|f| f.mime_type));
        Self {
            id: item.id,
            name: item.name,
            is_folder,
            size: item.size,
            last_modified_date_time: item.last_modified_date_time,
            mime_type,
        }
    }
}

/// A single file to pack into a client-side archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveFile {
    /// Name inside the archive
    pub name: String,
    /// Raw-content URL the job fetches the bytes from
    pub url: String,
}

/// Archive generation job handed to the remote collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveRequest {
    /// Pack the files currently selected in a folder view
    Selection {
        /// Archive name without extension (the containing folder's name)
        archive_name: String,
        files: Vec<ArchiveFile>,
    },
    /// Pack a whole folder tree
    Folder {
        id: String,
        name: String,
        /// Encoded folder path, ready to be used in API queries
        path: String,
        /// Raw token value for protected trees (sent as `odpt`)
        token: Option<String>,
    },
}

impl ArchiveRequest {
    /// File name the finished archive is saved under
    pub fn file_name(&self) -> String {
        match self {
            ArchiveRequest::Selection { archive_name, .. } => format!("{}.zip", archive_name),
            ArchiveRequest::Folder { name, .. } => format!("{}.zip", name),
        }
    }
}

/// Finished archive ready to be saved by the host
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveOutput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Listing error type
#[derive(Error, Debug)]
pub enum ListingError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ListingError {
    /// Check if this error is transient (the user may simply retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ListingError::Remote(_) | ListingError::Clipboard(_) | ListingError::Io(_)
        )
    }
}

impl From<serde_json::Error> for ListingError {
    fn from(e: serde_json::Error) -> Self {
        ListingError::Parse(e.to_string())
    }
}
