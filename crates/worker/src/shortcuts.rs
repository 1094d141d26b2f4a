//! Quick-action shortcuts.
//!
//! The host always gets the two base shortcuts (upload, gallery) plus at most
//! two entries supplied by a page. Each update replaces the whole list;
//! failures are logged and swallowed.

use offcache_client::fetch::{resolve, same_origin};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::host::Host;

/// Most dynamic entries kept per update.
pub const MAX_DYNAMIC: usize = 2;

const ICON: &str = "/static/icons/icon-192x192.png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutIcon {
    pub src: String,
    pub sizes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    #[serde(default)]
    pub icons: Vec<ShortcutIcon>,
}

/// A page-supplied shortcut source, e.g. a recently opened recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn icon() -> Vec<ShortcutIcon> {
    vec![ShortcutIcon { src: ICON.into(), sizes: "192x192".into() }]
}

pub fn base_shortcuts() -> Vec<Shortcut> {
    vec![
        Shortcut {
            name: "Upload recording".into(),
            short_name: Some("Upload".into()),
            description: Some("Upload a new audio file to transcribe".into()),
            url: "/?action=upload".into(),
            icons: icon(),
        },
        Shortcut {
            name: "Gallery".into(),
            short_name: Some("Gallery".into()),
            description: Some("Browse transcribed recordings".into()),
            url: "/?action=gallery".into(),
            icons: icon(),
        },
    ]
}

/// Base shortcuts followed by the first [`MAX_DYNAMIC`] usable candidates.
///
/// A candidate is usable when it has a name, resolves to a same-origin URL,
/// and doesn't repeat a URL already in the list.
pub fn merge(candidates: &[ShortcutCandidate], origin: &Url) -> Vec<Shortcut> {
    let mut shortcuts = base_shortcuts();
    let mut seen: Vec<Url> = shortcuts.iter().filter_map(|s| resolve(&s.url, origin).ok()).collect();

    let mut added = 0;
    for candidate in candidates {
        if added == MAX_DYNAMIC {
            break;
        }
        let name = candidate.name.trim();
        if name.is_empty() {
            continue;
        }
        let Ok(url) = resolve(&candidate.url, origin) else {
            tracing::debug!(url = %candidate.url, "skipping shortcut with unusable url");
            continue;
        };
        if !same_origin(&url, origin) || seen.contains(&url) {
            continue;
        }

        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }
        shortcuts.push(Shortcut {
            name: name.to_string(),
            short_name: None,
            description: candidate.description.clone(),
            url: target,
            icons: icon(),
        });
        seen.push(url);
        added += 1;
    }

    shortcuts
}

/// Push a fresh shortcut list to the host. Never fails.
pub async fn update(host: &dyn Host, candidates: &[ShortcutCandidate], origin: &Url) -> Vec<Shortcut> {
    let shortcuts = merge(candidates, origin);
    match host.set_shortcuts(&shortcuts).await {
        Ok(()) => tracing::info!(count = shortcuts.len(), "updated shortcuts"),
        Err(e) => tracing::warn!(error = %e, "shortcut update failed"),
    }
    shortcuts
}
