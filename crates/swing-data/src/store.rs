//! Session stores: where raw session rows come from.
//!
//! [`DirectorySessionStore`] keeps one CSV export per session in a directory
//! and caches parsed rows until they are explicitly invalidated.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use regex::Regex;
use swing_core::error::{Result, SwingError};
use swing_core::models::SessionId;
use swing_core::normalize::RawRow;
use tracing::{debug, info};

use crate::reader::{find_csv_files, parse_session_label, read_session_rows, session_id_for};

/// Read-only source of raw session rows.
pub trait SessionStore {
    /// Every session id in the store, sorted.
    fn list_sessions(&self) -> Result<Vec<SessionId>>;

    /// Rows of one session in file order. Stores that cache may hand out the
    /// same allocation to every caller.
    fn load_session(&self, id: &str) -> Result<Arc<Vec<RawRow>>>;

    /// Display label for a session.
    fn session_label(&self, id: &str) -> String {
        id.to_string()
    }
}

// ── DirectorySessionStore ─────────────────────────────────────────────────────

/// Sessions stored as `<session_id>.csv` files under one directory.
///
/// Parsed rows are cached per session. The cache lives behind a lock so a
/// shared reference can be used from several threads.
pub struct DirectorySessionStore {
    root: PathBuf,
    max_records: usize,
    cache: RwLock<HashMap<SessionId, Arc<Vec<RawRow>>>>,
}

impl DirectorySessionStore {
    pub fn new(root: impl Into<PathBuf>, max_records: usize) -> Self {
        Self {
            root: root.into(),
            max_records,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drop every cached session.
    pub fn invalidate(&self) {
        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        debug!("session cache invalidated");
    }

    /// Drop one session from the cache.
    pub fn invalidate_session(&self, id: &str) {
        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id);
        debug!("session {} evicted from cache", id);
    }

    /// Number of sessions currently cached.
    pub fn cached_sessions(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Copy an export into the store under a sanitized file name and return
    /// its session id. An existing session with the same name is replaced.
    pub fn import_file(&self, source: &Path) -> Result<SessionId> {
        let name = source
            .file_name()
            .map(|n| sanitize_file_name(&n.to_string_lossy()))
            .ok_or_else(|| {
                SwingError::Config(format!("not a file path: {}", source.display()))
            })?;
        let is_csv = Path::new(&name)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            return Err(SwingError::Config(format!(
                "only .csv exports can be imported: {}",
                source.display()
            )));
        }

        std::fs::create_dir_all(&self.root)?;
        let target = self.root.join(&name);
        std::fs::copy(source, &target).map_err(|e| SwingError::FileRead {
            path: source.to_path_buf(),
            source: e,
        })?;

        let id = session_id_for(&target);
        self.invalidate_session(&id);
        info!("Imported {} as session {}", source.display(), id);
        Ok(id)
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        find_csv_files(&self.root)
            .into_iter()
            .find(|p| session_id_for(p) == id)
            .ok_or_else(|| SwingError::SessionNotFound(id.to_string()))
    }
}

impl SessionStore for DirectorySessionStore {
    fn list_sessions(&self) -> Result<Vec<SessionId>> {
        if !self.root.is_dir() {
            return Err(SwingError::DataPathNotFound(self.root.clone()));
        }
        let mut ids: Vec<SessionId> = find_csv_files(&self.root)
            .iter()
            .map(|p| session_id_for(p))
            .collect();
        ids.dedup();
        Ok(ids)
    }

    fn load_session(&self, id: &str) -> Result<Arc<Vec<RawRow>>> {
        if let Some(rows) = self
            .cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
        {
            debug!("session {} served from cache", id);
            return Ok(Arc::clone(rows));
        }

        let path = self.path_for(id)?;
        let rows = Arc::new(read_session_rows(&path, id, self.max_records)?);
        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.to_string(), Arc::clone(&rows));
        Ok(rows)
    }

    fn session_label(&self, id: &str) -> String {
        parse_session_label(id)
    }
}

// ── MemorySessionStore ────────────────────────────────────────────────────────

/// In-memory store, used when rows come from somewhere other than disk.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: BTreeMap<SessionId, Arc<Vec<RawRow>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<SessionId>, rows: Vec<RawRow>) {
        self.sessions.insert(id.into(), Arc::new(rows));
    }
}

impl SessionStore for MemorySessionStore {
    fn list_sessions(&self) -> Result<Vec<SessionId>> {
        Ok(self.sessions.keys().cloned().collect())
    }

    fn load_session(&self, id: &str) -> Result<Arc<Vec<RawRow>>> {
        self.sessions
            .get(id)
            .cloned()
            .ok_or_else(|| SwingError::SessionNotFound(id.to_string()))
    }
}

/// Replace every character outside `[A-Za-z0-9_\-.]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_\-.]").expect("regex is valid"));
    re.replace_all(name, "_").into_owned()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
