//! File-backed session store shared by every client process of a user.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use isperp_auth::{
    SessionStore, Shutdown, StoreChange, StoreChangeKind, StoreError, StoredSession,
};
use isperp_core::ContextId;
use isperp_events::{EventBus, InMemoryEventBus, Subscription};

/// Content hash of the session file; `None` when the file does not exist.
type Fingerprint = Option<u64>;

/// Session persisted as a JSON file (`{"token": ..., "user": ...}`).
///
/// Writes made through this handle are announced with their origin context.
/// Writes made by other processes are only noticed by [`watch`](Self::watch)
/// (or an explicit [`poll_external`](Self::poll_external)) and announced as
/// [`StoreChangeKind::External`].
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    /// Last content this handle wrote or observed. `None` until first seen.
    last_seen: Mutex<Option<Fingerprint>>,
    changes: InMemoryEventBus<StoreChange>,
    shutdown: Arc<Shutdown>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_seen: Mutex::new(None),
            changes: InMemoryEventBus::new(),
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compare the file with what this handle last saw; publish a change if
    /// someone else modified it. The first call only records a baseline.
    pub fn poll_external(&self) -> Result<bool, StoreError> {
        let mut last_seen = self.last_seen.lock().map_err(|_| StoreError::Poisoned)?;
        let current = fingerprint(read_optional(&self.path)?.as_deref());

        let changed = match *last_seen {
            Some(previous) => previous != current,
            None => false,
        };
        *last_seen = Some(current);
        drop(last_seen);

        if changed {
            tracing::debug!(path = %self.path.display(), "session file changed externally");
            self.notify(StoreChange::external());
        }
        Ok(changed)
    }

    /// Poll the file every `interval` until [`shutdown`](Self::shutdown).
    ///
    /// The baseline is taken before this returns.
    pub fn watch(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        if let Err(err) = self.poll_external() {
            tracing::warn!(path = %self.path.display(), error = %err, "initial session file poll failed");
        }

        let store = Arc::clone(self);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = store.poll_external() {
                            tracing::warn!(path = %store.path.display(), error = %err, "session file poll failed");
                        }
                    }
                }
            }
            tracing::debug!(path = %store.path.display(), "session file watcher stopped");
        })
    }

    /// Stop every watcher started by [`watch`](Self::watch).
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    fn notify(&self, change: StoreChange) {
        if let Err(err) = self.changes.publish(change) {
            tracing::warn!(error = ?err, "failed to publish session store change");
        }
    }

    fn write_atomically(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = open_private(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>, StoreError> {
        let Some(bytes) = read_optional(&self.path)? else {
            return Ok(None);
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))
    }

    fn save(&self, origin: ContextId, session: &StoredSession) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec_pretty(session).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        {
            let mut last_seen = self.last_seen.lock().map_err(|_| StoreError::Poisoned)?;
            self.write_atomically(&bytes)?;
            *last_seen = Some(fingerprint(Some(&bytes)));
        }
        tracing::debug!(path = %self.path.display(), context = %origin, "session saved");
        self.notify(StoreChange::new(Some(origin), StoreChangeKind::Saved));
        Ok(())
    }

    fn clear(&self, origin: ContextId) -> Result<(), StoreError> {
        {
            let mut last_seen = self.last_seen.lock().map_err(|_| StoreError::Poisoned)?;
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
            *last_seen = Some(None);
        }
        tracing::debug!(path = %self.path.display(), context = %origin, "session cleared");
        self.notify(StoreChange::new(Some(origin), StoreChangeKind::Cleared));
        Ok(())
    }

    fn subscribe(&self) -> Subscription<StoreChange> {
        self.changes.subscribe()
    }
}

fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

fn fingerprint(bytes: Option<&[u8]>) -> Fingerprint {
    bytes.map(|b| {
        let mut hasher = DefaultHasher::new();
        b.hash(&mut hasher);
        hasher.finish()
    })
}

/// The file holds a bearer token; keep it owner-only where the OS allows.
fn open_private(path: &Path) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}
