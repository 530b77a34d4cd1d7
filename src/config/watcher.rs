//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched, so a config replaced by rename is still
//! picked up.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::ServerConfig;

/// Watches one configuration file and sends every new, valid version.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ServerConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ServerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(OsString::from);
        let path = self.path.clone();
        let tx = self.update_tx;
        let last = Mutex::new(std::fs::read_to_string(&path).ok());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if concerns(&event, file_name.as_deref()) => {
                    reload(&path, &last, &tx);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// A create or modify event touching the watched file.
fn concerns(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|p| p.file_name().is_some_and(|name| Some(name) == file_name))
}

/// Re-read the file; send it on when it changed and validates.
fn reload(
    path: &Path,
    last: &Mutex<Option<String>>,
    tx: &mpsc::UnboundedSender<ServerConfig>,
) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "Config file unreadable, keeping current configuration");
            return;
        }
    };

    let Ok(mut last) = last.lock() else {
        return;
    };
    if last.as_deref() == Some(content.as_str()) {
        return;
    }

    match parse_config(&content) {
        Ok(config) => {
            tracing::info!(path = ?path, "Config file changed, reloading");
            *last = Some(content);
            let _ = tx.send(config);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config. Keeping current configuration.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_concerns_only_the_watched_file() {
        let name = Some(std::ffi::OsStr::new("router.toml"));
        assert!(concerns(&event(EventKind::Modify(ModifyKind::Any), "/etc/app/router.toml"), name));
        assert!(concerns(&event(EventKind::Create(CreateKind::File), "/etc/app/router.toml"), name));
        assert!(!concerns(&event(EventKind::Modify(ModifyKind::Any), "/etc/app/other.toml"), name));
        assert!(!concerns(&event(EventKind::Remove(RemoveKind::File), "/etc/app/router.toml"), name));
    }

    #[test]
    fn test_reload_skips_unchanged_and_invalid_content() {
        let path = std::env::temp_dir().join(format!("trie-router-watch-{}.toml", std::process::id()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        std::fs::write(&path, "[[routes]]\npath = \"/a\"\n").unwrap();
        let last = Mutex::new(None);
        reload(&path, &last, &tx);
        assert_eq!(rx.try_recv().unwrap().routes[0].path, "/a");

        // Unchanged content: nothing sent.
        reload(&path, &last, &tx);
        assert!(rx.try_recv().is_err());

        // Invalid content: nothing sent, previous content kept as baseline.
        std::fs::write(&path, "[timeouts]\nrequest_secs = 0\n").unwrap();
        reload(&path, &last, &tx);
        assert!(rx.try_recv().is_err());

        std::fs::remove_file(&path).unwrap();
    }
}
