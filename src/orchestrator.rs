//! Download Orchestrator
//!
//! Resolves links for single files synchronously and drives archive
//! generation for folders and multi-selections:
//!
//! ```text
//!   Idle ──click──▶ Generating ──job ok──▶ save + toast ──▶ Idle
//!                      │  │
//!                      │  └──job err──▶ error toast ──▶ Idle
//!                      └──navigate_away──▶ (abandoned) ──▶ Idle
//! ```
//!
//! A click on an entity that is already generating is ignored until the
//! first run resolves.

use std::sync::Arc;
use tracing::{info, warn};

use crate::generation::{EntityKey, GenerationState, GenerationTracker};
use crate::host::{HostServices, Toast};
use crate::permalink;
use crate::remote::{ArchiveFile, ArchiveRequest, ArchiveService, FolderEntry, ListingError};
use crate::token_store::TokenStore;

/// How a generation request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Archive saved under the given file name
    Completed(String),
    /// The entity was already generating; nothing was started
    AlreadyGenerating,
    /// Nothing was selected
    NothingSelected,
    /// Abandoned by navigation
    Cancelled,
    /// The job or the save failed; the user was notified
    Failed(String),
}

pub struct DownloadOrchestrator {
    base_url: String,
    allow_proxy: bool,
    tokens: TokenStore,
    archive: Arc<dyn ArchiveService>,
    host: HostServices,
    generation: GenerationTracker,
}

impl DownloadOrchestrator {
    pub fn new(
        base_url: &str,
        allow_proxy: bool,
        tokens: TokenStore,
        archive: Arc<dyn ArchiveService>,
        host: HostServices,
    ) -> Self {
        Self {
            base_url: base_url.to_string(),
            allow_proxy,
            tokens,
            archive,
            host,
            generation: GenerationTracker::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn state(&self, key: &EntityKey) -> GenerationState {
        self.generation.state(key)
    }

    /// Raw download link for a file in `parent`.
    ///
    /// Proxy links are only handed out when the site allows them; otherwise
    /// the direct link is returned.
    pub fn file_link(&self, parent: &str, entry: &FolderEntry, proxy: bool) -> String {
        let proxy = if proxy && !self.allow_proxy {
            warn!("Proxy download requested for {} but proxying is disabled", entry.name);
            false
        } else {
            proxy
        };
        let token = self.tokens.resolve(parent);
        permalink::build(
            &self.base_url,
            &permalink::child_path(parent, &entry.name),
            token.as_ref(),
            proxy,
        )
    }

    fn copy(&self, text: &str, confirmation: Toast) -> bool {
        match self.host.clipboard.write_text(text) {
            Ok(()) => {
                self.host.notifier.notify(confirmation);
                true
            }
            Err(e) => {
                warn!("Clipboard write failed: {}", e);
                self.host
                    .notifier
                    .notify(Toast::error(format!("Failed to copy link: {}", e)));
                false
            }
        }
    }

    /// Copy a file's raw permalink
    pub fn copy_file_link(&self, parent: &str, entry: &FolderEntry) -> bool {
        let link = self.file_link(parent, entry, false);
        self.copy(&link, Toast::success("Copied raw file permalink."))
    }

    /// Copy a folder page permalink
    pub fn copy_folder_link(&self, parent: &str, entry: &FolderEntry) -> bool {
        let link = permalink::folder_permalink(&self.base_url, parent, &entry.name);
        self.copy(&link, Toast::info("Copied folder permalink."))
    }

    /// Copy the raw permalinks of the selected files, one per line
    pub fn copy_selected_links(&self, parent: &str, selected: &[&FolderEntry]) -> bool {
        if selected.is_empty() {
            return false;
        }
        let token = self.tokens.resolve(parent);
        let links = permalink::selected_permalinks(
            &self.base_url,
            parent,
            selected.iter().map(|e| e.name.as_str()),
            token.as_ref(),
        );
        self.copy(&links, Toast::success("Copied selected files permalink."))
    }

    /// Archive a folder and save it
    pub async fn download_folder(&self, parent: &str, folder: &FolderEntry) -> GenerationOutcome {
        let path = permalink::child_path(parent, &folder.name);
        let token = self.tokens.resolve(&path).map(|t| t.expose().to_string());
        let request = ArchiveRequest::Folder {
            id: folder.id.clone(),
            name: folder.name.clone(),
            path,
            token,
        };
        self.generate(EntityKey::Folder(folder.id.clone()), request).await
    }

    /// Archive the selected files of `parent` and save them
    pub async fn download_selected(&self, parent: &str, selected: &[FolderEntry]) -> GenerationOutcome {
        if selected.is_empty() {
            return GenerationOutcome::NothingSelected;
        }
        let files = selected
            .iter()
            .map(|e| ArchiveFile {
                name: e.name.clone(),
                url: self.file_link(parent, e, false),
            })
            .collect();
        let request = ArchiveRequest::Selection {
            archive_name: archive_name_for(parent),
            files,
        };
        self.generate(EntityKey::Selection, request).await
    }

    async fn generate(&self, key: EntityKey, request: ArchiveRequest) -> GenerationOutcome {
        let Some(guard) = self.generation.begin(key.clone()) else {
            info!("Ignoring download of {}: already generating", key);
            return GenerationOutcome::AlreadyGenerating;
        };
        let file_name = request.file_name();
        let cancel = guard.token().clone();
        info!("Generating {} for {}", file_name, key);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ListingError::Cancelled),
            res = self.archive.generate(request, cancel.clone()) => res,
        };

        let outcome = match result {
            Ok(_) if cancel.is_cancelled() => GenerationOutcome::Cancelled,
            Ok(output) => match self.host.sink.save(&output) {
                Ok(()) => {
                    info!("Finished {} for {}", output.file_name, key);
                    self.host
                        .notifier
                        .notify(Toast::success(format!("Downloaded {}.", output.file_name)));
                    GenerationOutcome::Completed(output.file_name)
                }
                Err(e) => self.failed(&file_name, e),
            },
            Err(ListingError::Cancelled) => {
                info!("Generation of {} abandoned", file_name);
                GenerationOutcome::Cancelled
            }
            Err(e) => self.failed(&file_name, e),
        };

        drop(guard);
        outcome
    }

    fn failed(&self, file_name: &str, error: ListingError) -> GenerationOutcome {
        warn!("Failed to generate {}: {}", file_name, error);
        let mut message = format!("Failed to download {}: {}", file_name, error);
        if error.is_recoverable() {
            message.push_str(". Please try again.");
        }
        self.host.notifier.notify(Toast::error(message));
        GenerationOutcome::Failed(error.to_string())
    }

    /// Navigation: abandon every in-flight generation of this view
    pub fn navigate_away(&self) {
        self.generation.cancel_all();
    }
}

fn archive_name_for(parent: &str) -> String {
    parent
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .unwrap_or_else(|| "download".to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::host::{Clipboard, DownloadSink, ToastLevel, ToastLog};
    use crate::remote::ArchiveOutput;
    use crate::token_store::AccessToken;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use tokio::sync::Notify;
    use tokio_util::sync::CancellationToken;

    /// Archive job that waits for `release`; folder ids in `fail_ids` hit a
    /// remote failure and ids in `deny_ids` are refused outright
    #[derive(Default)]
    pub(crate) struct MockArchive {
        pub release: Notify,
        pub hold: bool,
        pub fail_ids: Vec<String>,
        pub deny_ids: Vec<String>,
        pub requests: Mutex<Vec<ArchiveRequest>>,
    }

    #[async_trait]
    impl ArchiveService for MockArchive {
        async fn generate(
            &self,
            request: ArchiveRequest,
            _cancel: CancellationToken,
        ) -> Result<ArchiveOutput, ListingError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.hold {
                self.release.notified().await;
            }
            if let ArchiveRequest::Folder { id, .. } = &request {
                if self.fail_ids.contains(id) {
                    return Err(ListingError::Remote("job rejected".to_string()));
                }
                if self.deny_ids.contains(id) {
                    return Err(ListingError::AccessDenied(id.clone()));
                }
            }
            Ok(ArchiveOutput {
                file_name: request.file_name(),
                bytes: vec![0x50, 0x4b],
            })
        }
    }

    #[derive(Default)]
    pub(crate) struct MockClipboard {
        pub fail: bool,
        pub last: Mutex<Option<String>>,
    }

    impl Clipboard for MockClipboard {
        fn write_text(&self, text: &str) -> Result<(), ListingError> {
            if self.fail {
                return Err(ListingError::Clipboard("denied".to_string()));
            }
            *self.last.lock().unwrap() = Some(text.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct MockSink {
        pub saved: Mutex<Vec<String>>,
    }

    impl DownloadSink for MockSink {
        fn save(&self, output: &ArchiveOutput) -> Result<(), ListingError> {
            self.saved.lock().unwrap().push(output.file_name.clone());
            Ok(())
        }
    }

    pub(crate) struct Fixture {
        pub archive: Arc<MockArchive>,
        pub clipboard: Arc<MockClipboard>,
        pub toasts: Arc<ToastLog>,
        pub sink: Arc<MockSink>,
        pub tokens: TokenStore,
    }

    impl Fixture {
        pub fn new(archive: MockArchive, clipboard: MockClipboard) -> Self {
            Self {
                archive: Arc::new(archive),
                clipboard: Arc::new(clipboard),
                toasts: Arc::new(ToastLog::default()),
                sink: Arc::new(MockSink::default()),
                tokens: TokenStore::new(),
            }
        }

        pub fn host(&self) -> HostServices {
            HostServices {
                clipboard: self.clipboard.clone(),
                notifier: self.toasts.clone(),
                sink: self.sink.clone(),
            }
        }

        pub fn orchestrator(&self, allow_proxy: bool) -> DownloadOrchestrator {
            DownloadOrchestrator::new(
                "https://x",
                allow_proxy,
                self.tokens.clone(),
                self.archive.clone(),
                self.host(),
            )
        }
    }

    fn file(id: &str, name: &str) -> FolderEntry {
        FolderEntry::file(id, name, 1, Utc::now())
    }

    fn folder(id: &str, name: &str) -> FolderEntry {
        FolderEntry::folder(id, name, 0, Utc::now())
    }

    #[test]
    fn test_file_link_uses_resolved_token() {
        let fx = Fixture::new(MockArchive::default(), MockClipboard::default());
        fx.tokens.insert("/private", AccessToken::new("tok en"));
        let orch = fx.orchestrator(false);

        assert_eq!(
            orch.file_link("/private", &file("1", "a b.txt"), false),
            "https://x/api/raw?path=/private/a%20b.txt&odpt=tok%20en"
        );
        assert_eq!(
            orch.file_link("/public", &file("2", "c.txt"), false),
            "https://x/api/raw?path=/public/c.txt"
        );
    }

    #[test]
    fn test_proxy_link_requires_permission() {
        let fx = Fixture::new(MockArchive::default(), MockClipboard::default());
        let entry = file("1", "a.txt");

        assert!(!fx.orchestrator(false).file_link("/", &entry, true).contains("proxy"));
        assert!(fx.orchestrator(true).file_link("/", &entry, true).ends_with("&proxy=true"));
    }

    #[test]
    fn test_copy_file_link_notifies() {
        let fx = Fixture::new(MockArchive::default(), MockClipboard::default());
        let orch = fx.orchestrator(false);

        assert!(orch.copy_file_link("/", &file("1", "a.txt")));

        assert_eq!(
            fx.clipboard.last.lock().unwrap().as_deref(),
            Some("https://x/api/raw?path=/a.txt")
        );
        assert_eq!(fx.toasts.toasts(), vec![Toast::success("Copied raw file permalink.")]);
    }

    #[test]
    fn test_clipboard_failure_degrades_to_error_toast() {
        let fx = Fixture::new(
            MockArchive::default(),
            MockClipboard { fail: true, ..Default::default() },
        );
        let orch = fx.orchestrator(false);

        assert!(!orch.copy_folder_link("/", &folder("d", "Docs")));
        assert_eq!(fx.toasts.toasts()[0].level, ToastLevel::Error);
    }

    #[test]
    fn test_copy_folder_link_is_informational() {
        let fx = Fixture::new(MockArchive::default(), MockClipboard::default());
        let orch = fx.orchestrator(false);

        assert!(orch.copy_folder_link("/Music", &folder("d", "Live Sets")));

        assert_eq!(
            fx.clipboard.last.lock().unwrap().as_deref(),
            Some("https://x/Music/Live%20Sets")
        );
        assert_eq!(fx.toasts.toasts(), vec![Toast::info("Copied folder permalink.")]);
    }

    #[tokio::test]
    async fn test_protected_folder_with_spaces_carries_token() {
        let fx = Fixture {
            tokens: TokenStore::with_protected_routes(&["/My Docs".to_string()]),
            ..Fixture::new(MockArchive::default(), MockClipboard::default())
        };
        let parent = permalink::encode_path("/My Docs");
        assert!(fx.tokens.is_protected(&parent));
        fx.tokens.insert(&parent, AccessToken::new("t"));
        let orch = fx.orchestrator(false);

        assert_eq!(
            orch.file_link(&parent, &file("f", "a.txt"), false),
            "https://x/api/raw?path=/My%20Docs/a.txt&odpt=t"
        );
        let outcome = orch.download_folder(&parent, &folder("d", "Sub Dir")).await;

        assert_eq!(outcome, GenerationOutcome::Completed("Sub Dir.zip".to_string()));
        assert_eq!(
            fx.archive.requests.lock().unwrap()[0],
            ArchiveRequest::Folder {
                id: "d".to_string(),
                name: "Sub Dir".to_string(),
                path: "/My%20Docs/Sub%20Dir".to_string(),
                token: Some("t".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_failure_toast_suggests_retry_only_when_recoverable() {
        let fx = Fixture::new(
            MockArchive {
                fail_ids: vec!["flaky".to_string()],
                deny_ids: vec!["locked".to_string()],
                ..Default::default()
            },
            MockClipboard::default(),
        );
        let orch = fx.orchestrator(false);

        orch.download_folder("/", &folder("flaky", "Flaky")).await;
        orch.download_folder("/", &folder("locked", "Locked")).await;

        let toasts = fx.toasts.toasts();
        assert_eq!(toasts.len(), 2);
        assert!(toasts.iter().all(|t| t.level == ToastLevel::Error));
        assert!(toasts[0].message.starts_with("Failed to download Flaky.zip"));
        assert!(toasts[0].message.ends_with("Please try again."));
        assert!(!toasts[1].message.contains("try again"));
        assert!(fx.sink.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_folder_download_completes_and_returns_idle() {
        let fx = Fixture::new(MockArchive::default(), MockClipboard::default());
        let orch = fx.orchestrator(false);

        let outcome = orch.download_folder("/", &folder("d1", "Music")).await;

        assert_eq!(outcome, GenerationOutcome::Completed("Music.zip".to_string()));
        assert_eq!(orch.state(&EntityKey::Folder("d1".to_string())), GenerationState::Idle);
        assert_eq!(*fx.sink.saved.lock().unwrap(), vec!["Music.zip".to_string()]);
    }

    #[tokio::test]
    async fn test_rejection_resets_only_failing_entity() {
        let fx = Fixture::new(
            MockArchive {
                hold: true,
                fail_ids: vec!["a".to_string()],
                ..Default::default()
            },
            MockClipboard::default(),
        );
        let orch = fx.orchestrator(false);
        let (folder_a, folder_b) = (folder("a", "A"), folder("b", "B"));
        let key_a = EntityKey::Folder("a".to_string());
        let key_b = EntityKey::Folder("b".to_string());

        let run_a = orch.download_folder("/", &folder_a);
        let run_b = orch.download_folder("/", &folder_b);
        let check = async {
            tokio::task::yield_now().await;
            assert_eq!(orch.state(&key_a), GenerationState::Generating);
            assert_eq!(orch.state(&key_b), GenerationState::Generating);
            // Wake exactly one waiter; job A is registered first
            fx.archive.release.notify_one();
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            assert_eq!(orch.state(&key_a), GenerationState::Idle);
            assert_eq!(orch.state(&key_b), GenerationState::Generating);
            fx.archive.release.notify_one();
        };

        let (outcome_a, outcome_b, ()) = tokio::join!(run_a, run_b, check);

        assert!(matches!(outcome_a, GenerationOutcome::Failed(_)));
        assert_eq!(outcome_b, GenerationOutcome::Completed("B.zip".to_string()));
        assert_eq!(fx.toasts.toasts()[0].level, ToastLevel::Error);
    }

    #[tokio::test]
    async fn test_second_trigger_while_generating_is_noop() {
        let fx = Fixture::new(
            MockArchive { hold: true, ..Default::default() },
            MockClipboard::default(),
        );
        let orch = fx.orchestrator(false);
        let music = folder("d1", "Music");

        let first = orch.download_folder("/", &music);
        let second = async {
            tokio::task::yield_now().await;
            let outcome = orch.download_folder("/", &music).await;
            fx.archive.release.notify_one();
            outcome
        };

        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, GenerationOutcome::Completed("Music.zip".to_string()));
        assert_eq!(second, GenerationOutcome::AlreadyGenerating);
        assert_eq!(fx.archive.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_navigation_abandons_generation() {
        let fx = Fixture::new(
            MockArchive { hold: true, ..Default::default() },
            MockClipboard::default(),
        );
        let orch = fx.orchestrator(false);
        let selected = vec![file("f1", "a.txt"), file("f2", "b.txt")];

        let run = orch.download_selected("/Docs", &selected);
        let navigate = async {
            tokio::task::yield_now().await;
            assert_eq!(orch.state(&EntityKey::Selection), GenerationState::Generating);
            orch.navigate_away();
        };

        let (outcome, ()) = tokio::join!(run, navigate);

        assert_eq!(outcome, GenerationOutcome::Cancelled);
        assert_eq!(orch.state(&EntityKey::Selection), GenerationState::Idle);
        assert!(fx.sink.saved.lock().unwrap().is_empty());
        assert!(fx.toasts.toasts().is_empty());
    }

    #[tokio::test]
    async fn test_selection_request_carries_raw_links() {
        let fx = Fixture::new(MockArchive::default(), MockClipboard::default());
        fx.tokens.insert("/Docs", AccessToken::new("t"));
        let orch = fx.orchestrator(false);

        let outcome = orch.download_selected("/Docs", &[file("f1", "a.txt")]).await;

        assert_eq!(outcome, GenerationOutcome::Completed("Docs.zip".to_string()));
        let requests = fx.archive.requests.lock().unwrap();
        assert_eq!(
            requests[0],
            ArchiveRequest::Selection {
                archive_name: "Docs".to_string(),
                files: vec![ArchiveFile {
                    name: "a.txt".to_string(),
                    url: "https://x/api/raw?path=/Docs/a.txt&odpt=t".to_string(),
                }],
            }
        );
    }

    #[tokio::test]
    async fn test_empty_selection_does_nothing() {
        let fx = Fixture::new(MockArchive::default(), MockClipboard::default());
        let orch = fx.orchestrator(false);
        assert_eq!(orch.download_selected("/", &[]).await, GenerationOutcome::NothingSelected);
        assert!(fx.archive.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_archive_name_for() {
        assert_eq!(archive_name_for("/"), "download");
        assert_eq!(archive_name_for("/a/My%20Docs"), "My Docs");
    }
}
