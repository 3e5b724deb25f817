//! The descriptor registry: proto sources in, queryable snapshot out.
//!
//! One [`SchemaRegistry`] owns the only long-lived shared mutable state in
//! the engine: the current descriptor snapshot. A single reader/writer lock
//! guards it — registration holds the write lock for the whole
//! compile-and-install sequence (including the external compiler run), so a
//! half-installed snapshot is never visible; lookups take the read lock and
//! never block each other.
//!
//! **Registration is a full replace, not an incremental merge.** Installing
//! a new snapshot discards the previous one entirely, even when the new
//! source set is a strict subset. Callers re-register everything they need
//! after any change.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use prost::Message;
use prost_reflect::{DescriptorPool, MessageDescriptor};
use prost_types::FileDescriptorSet;
use sha2::{Digest, Sha256};

use crate::compiler::{discover_proto_files, Compiler};
use crate::error::{Error, Result};
use crate::vfs;

/// Boxed error type for persistence collaborators.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Optional persistence collaborator for snapshot durability across
/// restarts.
///
/// The registry computes the content hash; implementations should treat an
/// upsert with an unchanged `sha256_hex` as a metadata-only update (touch
/// `updated_at`, skip rewriting the byte columns) to avoid needless writes
/// of identical content.
pub trait RegistryStore: Send + Sync {
    /// Insert or update the serialized descriptor set stored under `name`.
    ///
    /// # Errors
    ///
    /// Implementations surface their own storage failures.
    fn upsert_registry(
        &self,
        name: &str,
        bytes: &[u8],
        sha256_hex: &str,
    ) -> std::result::Result<(), StoreError>;

    /// Fetch the most recently stored descriptor set for `name`, if any.
    ///
    /// # Errors
    ///
    /// Implementations surface their own storage failures.
    fn get_latest_by_name(&self, name: &str)
        -> std::result::Result<Option<Vec<u8>>, StoreError>;
}

/// One installed compilation result: the by-name descriptor index plus the
/// list of user-authored files (compiler-internal/well-known files are kept
/// in the pool for resolution but excluded from this list).
struct Snapshot {
    pool: DescriptorPool,
    user_files: Vec<String>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            pool: DescriptorPool::new(),
            user_files: Vec::new(),
        }
    }
}

/// Compiles proto sources into descriptor snapshots and serves lookups by
/// fully-qualified message name.
pub struct SchemaRegistry {
    name: String,
    compiler: Compiler,
    store: Option<Box<dyn RegistryStore>>,
    snapshot: RwLock<Snapshot>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// An empty registry named `default`, compiling with `protoc` from
    /// `PATH` and no persistence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "default".to_string(),
            compiler: Compiler::new(),
            store: None,
            snapshot: RwLock::new(Snapshot::empty()),
        }
    }

    /// Use a different logical registry name for persistence.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Use a specific compiler handle (e.g. a non-`PATH` protoc binary).
    #[must_use]
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Attach a persistence collaborator. Every successful registration is
    /// upserted under this registry's name.
    #[must_use]
    pub fn with_store(mut self, store: impl RegistryStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// The logical name used for persistence.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compile and install proto sources from the filesystem.
    ///
    /// A single file compiles with its parent directory plus
    /// `include_paths` as import roots; a directory is searched recursively
    /// for `.proto` files which compile together with the directory itself
    /// as the first root.
    ///
    /// Returns the number of registered (user-authored) message types.
    ///
    /// # Errors
    ///
    /// [`Error::Compilation`] when the toolchain is unavailable, the sources
    /// don't parse, or a directory contains no `.proto` files.
    pub fn register_from_path(&self, path: &Path, include_paths: &[PathBuf]) -> Result<usize> {
        let mut guard = self.write_lock();
        let (sources, mut roots) = if path.is_dir() {
            (discover_proto_files(path)?, vec![path.to_path_buf()])
        } else {
            let parent = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            (vec![path.to_path_buf()], vec![parent])
        };
        roots.extend_from_slice(include_paths);
        let fds = self.compiler.compile(&sources, &roots)?;
        self.install_locked(&mut guard, fds, true)
    }

    /// Compile and install uploaded proto sources known only by flat
    /// logical filenames.
    ///
    /// Imports referencing an uploaded file by basename are rewritten to
    /// the actual uploaded path; well-known `google/protobuf/` imports
    /// resolve via the compiler's built-ins. The rewritten set materializes
    /// into a temporary directory that serves as the only import root.
    ///
    /// Returns the number of registered (user-authored) message types.
    ///
    /// # Errors
    ///
    /// [`Error::AmbiguousImport`] when an import's basename matches more
    /// than one upload; [`Error::Compilation`] for toolchain/parse failures.
    pub fn register_from_virtual(&self, files: &BTreeMap<String, Vec<u8>>) -> Result<usize> {
        let mut guard = self.write_lock();
        let index = vfs::basename_index(files);
        let root = tempfile::tempdir()?;
        let mut sources = Vec::new();
        for (logical, bytes) in files {
            let target = root.path().join(sanitize_upload_path(logical)?);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if vfs::is_well_known(logical) {
                // Import-only: a vendored well-known file may shadow the
                // builtin, but it is never compiled as a user source.
                std::fs::write(&target, bytes)?;
                continue;
            }
            let text = String::from_utf8_lossy(bytes);
            let rewritten = vfs::rewrite_imports(&text, &index)?;
            if rewritten != text {
                tracing::debug!(file = %logical, "rewrote import paths for upload");
            }
            std::fs::write(&target, rewritten.as_bytes())?;
            sources.push(target);
        }
        if sources.is_empty() {
            return Err(Error::Compilation(
                "upload contains no user .proto files".into(),
            ));
        }
        let fds = self.compiler.compile(&sources, &[root.path().to_path_buf()])?;
        self.install_locked(&mut guard, fds, true)
    }

    /// Install an already-compiled descriptor set as the new snapshot.
    ///
    /// Useful for callers holding a descriptor set produced elsewhere
    /// (a build pipeline, a previous persistence round-trip).
    ///
    /// Returns the number of registered (user-authored) message types.
    ///
    /// # Errors
    ///
    /// [`Error::Descriptor`] when the set's internal references don't
    /// resolve.
    pub fn register_descriptor_set(&self, fds: FileDescriptorSet) -> Result<usize> {
        let mut guard = self.write_lock();
        self.install_locked(&mut guard, fds, true)
    }

    /// Re-install the most recently persisted snapshot for this registry's
    /// name, if a store is attached and holds one.
    ///
    /// # Errors
    ///
    /// [`Error::Store`] on collaborator failure, [`Error::DescriptorDecode`]
    /// / [`Error::Descriptor`] when the persisted bytes are unusable.
    pub fn restore_from_store(&self) -> Result<Option<usize>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let mut guard = self.write_lock();
        let Some(bytes) = store.get_latest_by_name(&self.name).map_err(Error::Store)? else {
            return Ok(None);
        };
        let fds = FileDescriptorSet::decode(bytes.as_slice())?;
        self.install_locked(&mut guard, fds, false).map(Some)
    }

    /// Look up a message descriptor by fully-qualified name.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when no registered message has this name.
    pub fn get_message_by_name(&self, fqmn: &str) -> Result<MessageDescriptor> {
        self.find_message(fqmn).ok_or_else(|| Error::NotFound {
            message: fqmn.to_string(),
        })
    }

    /// Non-erroring lookup over the snapshot's by-name index.
    #[must_use]
    pub fn find_message(&self, fqmn: &str) -> Option<MessageDescriptor> {
        self.read_lock().pool.get_message_by_name(fqmn)
    }

    /// All user-authored message type names in the current snapshot, in
    /// file/declaration order. Compiler-internal and well-known types are
    /// excluded; synthetic map-entry messages are skipped.
    #[must_use]
    pub fn list_message_types(&self) -> Vec<String> {
        collect_message_names(&self.read_lock())
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap in the new snapshot and, when asked, upsert it to the store.
    fn install_locked(
        &self,
        snapshot: &mut Snapshot,
        fds: FileDescriptorSet,
        persist: bool,
    ) -> Result<usize> {
        let bytes = fds.encode_to_vec();
        let pool = DescriptorPool::from_file_descriptor_set(fds)?;
        let user_files: Vec<String> = pool
            .files()
            .map(|f| f.name().to_string())
            .filter(|name| !vfs::is_well_known(name))
            .collect();
        *snapshot = Snapshot { pool, user_files };

        let count = collect_message_names(snapshot).len();
        tracing::info!(
            registry = %self.name,
            files = snapshot.user_files.len(),
            messages = count,
            "installed schema snapshot"
        );

        if persist {
            if let Some(store) = &self.store {
                let hash = sha256_hex(&bytes);
                store
                    .upsert_registry(&self.name, &bytes, &hash)
                    .map_err(Error::Store)?;
            }
        }
        Ok(count)
    }
}

/// Reject uploads addressing outside the materialization root.
fn sanitize_upload_path(logical: &str) -> Result<PathBuf> {
    let path = Path::new(logical);
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir));
    if escapes || logical.is_empty() {
        return Err(Error::Compilation(format!(
            "invalid upload path '{logical}'"
        )));
    }
    Ok(path.to_path_buf())
}

/// Hex-encoded SHA-256 of a serialized descriptor set.
fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// User-authored message names, walking nested declarations.
fn collect_message_names(snapshot: &Snapshot) -> Vec<String> {
    let mut names = Vec::new();
    for file in snapshot.pool.files() {
        if !snapshot.user_files.iter().any(|n| n == file.name()) {
            continue;
        }
        for message in file.messages() {
            push_message_names(&message, &mut names);
        }
    }
    names
}

fn push_message_names(message: &MessageDescriptor, out: &mut Vec<String>) {
    if message.is_map_entry() {
        return;
    }
    out.push(message.full_name().to_string());
    for child in message.child_messages() {
        push_message_names(&child, out);
    }
}
