//! Playback URI resolution
//!
//! WebDAV servers disagree on listing paths: some return them absolute from
//! the host root (`/remote.php/webdav/movies/a.mp4`), others relative to the
//! share (`/movies/a.mp4`). History stores whatever the listing returned, so
//! the share URL has to be reconciled with it here, and only here.

use url::Url;

use crate::domain::{HistoryEntry, WebDavServer};

/// Absolute URI for `entry` on `server`, or `None` if the server is gone.
pub fn resolve_playback_uri(entry: &HistoryEntry, server: Option<&WebDavServer>) -> Option<String> {
    let server = server?;
    let share_url = server.url.trim_end_matches('/');

    if let Some((origin, base_path)) = split_share_url(share_url) {
        if !base_path.is_empty() && entry.file_path.starts_with(&base_path) {
            return Some(format!("{}{}", origin, entry.file_path));
        }
    }

    Some(join(share_url, &entry.file_path))
}

/// `scheme://authority` and the decoded base path (no trailing `/`).
fn split_share_url(share_url: &str) -> Option<(String, String)> {
    let url = Url::parse(share_url).ok()?;
    let host = url.host_str()?;

    let mut origin = format!("{}://", url.scheme());
    if !url.username().is_empty() {
        origin.push_str(url.username());
        if let Some(password) = url.password() {
            origin.push(':');
            origin.push_str(password);
        }
        origin.push('@');
    }
    origin.push_str(host);
    if let Some(port) = url.port() {
        origin.push_str(&format!(":{}", port));
    }

    let base_path = urlencoding::decode(url.path().trim_end_matches('/'))
        .ok()?
        .into_owned();
    Some((origin, base_path))
}

fn join(share_url: &str, file_path: &str) -> String {
    if file_path.starts_with('/') {
        format!("{}{}", share_url, file_path)
    } else {
        format!("{}/{}", share_url, file_path)
    }
}
