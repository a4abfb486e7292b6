//! Remote Collaborators Module
//!
//! The drive index exposes two services this crate consumes but never
//! implements: the folder listing API and the archive generation job. Both are
//! modelled as traits so a host (browser bridge, CLI, tests) can plug in its
//! own transport.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐      ┌──────────────────┐
//! │  ListingSource   │      │  ArchiveService  │
//! │  list(path, tok) │      │  generate(req)   │
//! └──────────────────┘      └──────────────────┘
//!          │                         │
//!          ▼                         ▼
//! ┌─────────────────────────────────────────────┐
//! │   FolderListView  →  DownloadOrchestrator   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod types;

pub use types::*;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::token_store::AccessToken;

/// Folder listing API
///
/// Returns the children of `path` as an opaque snapshot. Protected paths are
/// queried with the resolved token; when `token` is `None` the remote decides
/// whether to reject with its own access-control error.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// List children of the given (encoded) path
    async fn list(
        &self,
        path: &str,
        token: Option<&AccessToken>,
    ) -> Result<Vec<FolderEntry>, ListingError>;
}

/// Archive generation job
///
/// Implementations should stop work once `cancel` fires; the orchestrator
/// also races the returned future against the same token, so a job that
/// ignores it is simply abandoned.
#[async_trait]
pub trait ArchiveService: Send + Sync {
    /// Build the archive described by `request`
    async fn generate(
        &self,
        request: ArchiveRequest,
        cancel: CancellationToken,
    ) -> Result<ArchiveOutput, ListingError>;
}
