// Protected route token store
// Holds the tokens obtained by the password flow, keyed by path prefix

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::permalink;

/// Opaque credential for a password-protected subtree
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Raw token value, for building `odpt` query parameters
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

/// Prefix-scoped token storage
///
/// Cloning is cheap and every clone sees the same tokens, so the store can be
/// handed to each view and orchestrator that needs to resolve a path.
#[derive(Clone, Default)]
pub struct TokenStore {
    tokens: Arc<RwLock<HashMap<String, AccessToken>>>,
    protected_routes: Arc<Vec<String>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store aware of the configured protected routes.
    ///
    /// Routes are configured as plain paths and stored encoded, the same form
    /// listing paths and row hrefs use.
    pub fn with_protected_routes(routes: &[String]) -> Self {
        Self {
            tokens: Arc::default(),
            protected_routes: Arc::new(
                routes
                    .iter()
                    .map(|r| normalize(&permalink::encode_path(r)))
                    .collect(),
            ),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, AccessToken>> {
        self.tokens.read().unwrap_or_else(|e| {
            tracing::warn!("Token store lock was poisoned, recovering: {e}");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, AccessToken>> {
        self.tokens.write().unwrap_or_else(|e| {
            tracing::warn!("Token store lock was poisoned, recovering: {e}");
            e.into_inner()
        })
    }

    /// Store a token for an encoded path prefix, replacing any previous one
    pub fn insert(&self, prefix: &str, token: AccessToken) {
        let prefix = normalize(prefix);
        debug!("Stored token for {}", prefix);
        self.write().insert(prefix, token);
    }

    /// Forget the token for a path prefix
    pub fn remove(&self, prefix: &str) -> Option<AccessToken> {
        self.write().remove(&normalize(prefix))
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Resolve the token for `path` from the longest matching stored prefix.
    ///
    /// Returns `None` when neither the path nor any ancestor has a token;
    /// the caller then proceeds unauthenticated.
    pub fn resolve(&self, path: &str) -> Option<AccessToken> {
        let path = normalize(path);
        let tokens = self.read();
        tokens
            .iter()
            .filter(|(prefix, _)| covers(prefix, &path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, token)| token.clone())
    }

    /// Whether `path` lies under one of the configured protected routes
    pub fn is_protected(&self, path: &str) -> bool {
        let path = normalize(path);
        self.protected_routes.iter().any(|route| covers(route, &path))
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("prefixes", &self.read().keys().collect::<Vec<_>>())
            .field("protected_routes", &self.protected_routes)
            .finish()
    }
}

fn normalize(path: &str) -> String {
    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }
    normalized
}

/// Segment-boundary prefix match: `/a` covers `/a` and `/a/b`, not `/ab`
fn covers(prefix: &str, path: &str) -> bool {
    if prefix == "/" || prefix == path {
        return true;
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_none_when_empty() {
        let store = TokenStore::new();
        assert!(store.resolve("/any/path").is_none());
    }

    #[test]
    fn test_resolve_longest_prefix() {
        let store = TokenStore::new();
        store.insert("/private", AccessToken::new("outer"));
        store.insert("/private/deeper/", AccessToken::new("inner"));

        assert_eq!(store.resolve("/private/a.txt").unwrap().expose(), "outer");
        assert_eq!(store.resolve("/private/deeper/b.txt").unwrap().expose(), "inner");
        assert_eq!(store.resolve("/private/deeper").unwrap().expose(), "inner");
    }

    #[test]
    fn test_resolve_respects_segment_boundary() {
        let store = TokenStore::new();
        store.insert("/priv", AccessToken::new("t"));
        assert!(store.resolve("/private").is_none());
        assert!(store.resolve("/priv/x").is_some());
    }

    #[test]
    fn test_clones_share_tokens() {
        let store = TokenStore::new();
        let view_copy = store.clone();
        store.insert("/a", AccessToken::new("t"));
        assert!(view_copy.resolve("/a/b").is_some());

        view_copy.remove("/a");
        assert!(store.resolve("/a/b").is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = AccessToken::new("hunter2");
        assert!(!format!("{:?}", token).contains("hunter2"));
    }

    #[test]
    fn test_is_protected_matches_encoded_paths() {
        let store = TokenStore::with_protected_routes(&["/Private Folder".to_string()]);
        assert!(store.is_protected(&permalink::child_path("/", "Private Folder")));
        assert!(store.is_protected("/Private%20Folder/x.txt"));
        assert!(!store.is_protected("/Private"));
        assert!(!store.is_protected("/Public"));
    }
}
