//! Permalink construction
//!
//! Every link the listing hands out points at the index's raw-content endpoint
//! (`/api/raw`) or, for folders, at the folder page itself. Item paths are
//! percent-encoded one segment at a time by [`child_path`]; the builders below
//! never re-encode them.

use crate::token_store::AccessToken;

/// Raw-content endpoint, relative to the site base URL
pub const RAW_ENDPOINT: &str = "/api/raw";

/// Thumbnail endpoint, relative to the site base URL
pub const THUMBNAIL_ENDPOINT: &str = "/api/thumbnail";

/// Thumbnail sizes served by the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailSize {
    Small,
    Medium,
    Large,
}

impl ThumbnailSize {
    fn as_str(&self) -> &'static str {
        match self {
            ThumbnailSize::Small => "small",
            ThumbnailSize::Medium => "medium",
            ThumbnailSize::Large => "large",
        }
    }
}

/// Path of a child item: the parent path plus the percent-encoded name.
///
/// The root folder contributes no prefix so children of `/` become `/name`.
pub fn child_path(parent: &str, name: &str) -> String {
    let parent = if parent == "/" { "" } else { parent };
    format!("{}/{}", parent, urlencoding::encode(name))
}

/// Percent-encode a plain path one segment at a time (`/My Docs/a` ->
/// `/My%20Docs/a`), producing the form [`child_path`] builds.
pub fn encode_path(path: &str) -> String {
    let encoded = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", encoded)
}

fn token_param(token: Option<&AccessToken>) -> String {
    token
        .map(|t| format!("&odpt={}", urlencoding::encode(t.expose())))
        .unwrap_or_default()
}

/// Build a fully qualified raw-content URL.
///
/// `item_path` must already be encoded. A token adds `odpt=<encoded token>`;
/// `proxy` adds `proxy=true` so the download is routed through the index
/// instead of straight to the storage provider.
pub fn build(base_url: &str, item_path: &str, token: Option<&AccessToken>, proxy: bool) -> String {
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    let mut url = format!("{}{}?path={}{}", base, RAW_ENDPOINT, item_path, token_param(token));
    if proxy {
        url.push_str("&proxy=true");
    }
    url
}

/// Shareable link to a folder page
pub fn folder_permalink(base_url: &str, parent: &str, name: &str) -> String {
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    format!("{}{}", base, child_path(parent, name))
}

/// Preview thumbnail URL (site-relative)
pub fn thumbnail_url(item_path: &str, size: ThumbnailSize, token: Option<&AccessToken>) -> String {
    format!(
        "{}?path={}&size={}{}",
        THUMBNAIL_ENDPOINT,
        item_path,
        size.as_str(),
        token_param(token)
    )
}

/// Raw links of several files in the same folder, one per line
pub fn selected_permalinks<'a>(
    base_url: &str,
    parent: &str,
    names: impl IntoIterator<Item = &'a str>,
    token: Option<&AccessToken>,
) -> String {
    names
        .into_iter()
        .map(|name| build(base_url, &child_path(parent, name), token, false))
        .collect::<Vec<_>>()
        .join("\n")
}
