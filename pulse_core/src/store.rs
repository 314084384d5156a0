//! # Profile Store
//!
//! [`ProfileStore`] owns the collection of saved profiles and the single
//! durable slot it is persisted to. Every mutation serializes the complete
//! collection, writes it to the slot, and only then replaces the in-memory
//! snapshot, so a failed write leaves the store exactly as it was.
//!
//! Two slots are provided:
//! - [`FileSlot`]: a JSON file on disk, written atomically under a store lock
//! - [`MemorySlot`]: an in-process buffer
//!
//! ## Example
//!
//! ```rust
//! use pulse_core::profile::{GeneratorParams, Polarity, StoredProfile};
//! use pulse_core::store::{MemorySlot, ProfileStore};
//!
//! let mut store = ProfileStore::new(MemorySlot::default());
//! let params = GeneratorParams::new(10, 20, 10, 60, false, Polarity::Bipolar);
//!
//! store.save(StoredProfile::new("A", params.clone()))?;
//! store.save(StoredProfile::new("B", params))?;
//!
//! let names: Vec<_> = store.list()?.iter().map(|p| p.name.clone()).collect();
//! assert_eq!(names, ["A", "B"]);
//! # Ok::<(), pulse_core::errors::PulseError>(())
//! ```

use std::path::{Path, PathBuf};

use crate::errors::{PulseError, PulseResult};
use crate::file_io::{read_optional, write_atomic, StoreLock};
use crate::profile::{ProfileEdit, ProfileId, StoredProfile};

/// The durable key holding the serialized collection.
pub trait StorageSlot {
    /// Current contents, or `None` if nothing was ever written
    fn read(&self) -> PulseResult<Option<Vec<u8>>>;

    /// Replace the contents in full
    fn write(&mut self, bytes: &[u8]) -> PulseResult<()>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// JSON file on disk
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSlot { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageSlot for FileSlot {
    fn read(&self) -> PulseResult<Option<Vec<u8>>> {
        read_optional(&self.path)
    }

    fn write(&mut self, bytes: &[u8]) -> PulseResult<()> {
        let _lock = StoreLock::acquire(&self.path)?;
        write_atomic(&self.path, bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process slot. Can be switched to fail every access.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    bytes: Option<Vec<u8>>,
    unavailable: bool,
}

impl MemorySlot {
    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        MemorySlot {
            bytes: Some(bytes.into()),
            unavailable: false,
        }
    }

    /// Make every read and write fail with `StorageUnavailable`
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    pub fn contents(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    fn check_available(&self, operation: &str) -> PulseResult<()> {
        if self.unavailable {
            return Err(PulseError::storage_unavailable(operation, "memory", "slot unavailable"));
        }
        Ok(())
    }
}

impl StorageSlot for MemorySlot {
    fn read(&self) -> PulseResult<Option<Vec<u8>>> {
        self.check_available("read")?;
        Ok(self.bytes.clone())
    }

    fn write(&mut self, bytes: &[u8]) -> PulseResult<()> {
        self.check_available("write")?;
        self.bytes = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// CRUD, import and export over the saved profile collection.
pub struct ProfileStore<S: StorageSlot> {
    slot: S,
    /// `None` until first access
    snapshot: Option<Vec<StoredProfile>>,
    editing: Option<ProfileId>,
}

impl ProfileStore<FileSlot> {
    /// Store backed by a JSON file. Nothing is read until first access.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        ProfileStore::new(FileSlot::new(path))
    }
}

impl<S: StorageSlot> ProfileStore<S> {
    pub fn new(slot: S) -> Self {
        ProfileStore {
            slot,
            snapshot: None,
            editing: None,
        }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    pub fn slot_mut(&mut self) -> &mut S {
        &mut self.slot
    }

    /// Current collection, loading it on first access.
    ///
    /// Absent or unparsable data yields an empty collection; only a failing
    /// slot is reported. Entries stored without an id are given one, and the
    /// collection is written back right away.
    pub fn list(&mut self) -> PulseResult<&[StoredProfile]> {
        Ok(self.loaded()?.as_slice())
    }

    /// Append a profile. Duplicate names are allowed.
    pub fn save(&mut self, profile: StoredProfile) -> PulseResult<&[StoredProfile]> {
        if profile.has_credentials() {
            log::warn!("Profile '{}' carries a password; it is stored in plaintext", profile.name);
        }
        let mut next = self.loaded()?.clone();
        next.push(profile);
        self.persist(next)
    }

    /// Remove every entry with `id`. Unknown ids are a no-op.
    pub fn delete(&mut self, id: ProfileId) -> PulseResult<&[StoredProfile]> {
        let current = self.loaded()?;
        if !current.iter().any(|p| p.id == id) {
            log::debug!("Delete of unknown profile {} ignored", id);
            return self.list();
        }
        let next: Vec<_> = current.iter().filter(|p| p.id != id).cloned().collect();
        if self.editing == Some(id) {
            self.editing = None;
        }
        self.persist(next)
    }

    /// Remove every entry structurally equal to `target`.
    pub fn delete_matching(&mut self, target: &StoredProfile) -> PulseResult<&[StoredProfile]> {
        let current = self.loaded()?;
        if !current.contains(target) {
            return self.list();
        }
        let next: Vec<_> = current.iter().filter(|p| *p != target).cloned().collect();
        self.persist(next)
    }

    pub fn find(&mut self, id: ProfileId) -> PulseResult<Option<&StoredProfile>> {
        Ok(self.loaded()?.iter().find(|p| p.id == id))
    }

    /// All profiles named exactly `name`, in collection order
    pub fn find_by_name(&mut self, name: &str) -> PulseResult<Vec<&StoredProfile>> {
        Ok(self.loaded()?.iter().filter(|p| p.name == name).collect())
    }

    /// Mark `id` as the edit target. Storage is not touched.
    pub fn begin_edit(&mut self, id: ProfileId) -> PulseResult<&StoredProfile> {
        let target = self
            .loaded()?
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PulseError::profile_not_found(id))?;
        self.editing = Some(id);
        Ok(&self.loaded()?[target])
    }

    /// The profile currently being edited, if any
    pub fn editing(&self) -> Option<ProfileId> {
        self.editing
    }

    /// Merge `edit` into the edit target, persist, and clear the target.
    ///
    /// The target stays set if persisting fails, so the caller can retry.
    pub fn commit_edit(&mut self, edit: ProfileEdit) -> PulseResult<&[StoredProfile]> {
        let id = self.editing.ok_or(PulseError::NoEditInProgress)?;
        let mut next = self.loaded()?.clone();

        let mut found = false;
        for profile in next.iter_mut().filter(|p| p.id == id) {
            edit.apply_to(profile);
            found = true;
        }
        if !found {
            self.editing = None;
            return Err(PulseError::profile_not_found(id));
        }

        self.persist(next)?;
        self.editing = None;
        self.list()
    }

    /// Drop the edit target without writing anything.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Replace the whole collection with the one encoded in `raw`.
    ///
    /// On a parse failure nothing changes and `MalformedImport` is returned.
    pub fn import_all(&mut self, raw: &[u8]) -> PulseResult<&[StoredProfile]> {
        let imported: Vec<StoredProfile> =
            serde_json::from_slice(raw).map_err(|e| PulseError::malformed_import(e.to_string()))?;

        let with_credentials = imported.iter().filter(|p| p.has_credentials()).count();
        if with_credentials > 0 {
            log::warn!("{} imported profiles carry plaintext passwords", with_credentials);
        }

        self.persist(imported)?;
        if let Some(id) = self.editing {
            if !self.loaded()?.iter().any(|p| p.id == id) {
                self.editing = None;
            }
        }
        log::info!("Imported {} profiles into {}", self.loaded()?.len(), self.slot.describe());
        self.list()
    }

    /// Serialized collection, in the same format that is persisted.
    pub fn export_all(&mut self) -> PulseResult<Vec<u8>> {
        encode(self.loaded()?)
    }

    fn loaded(&mut self) -> PulseResult<&mut Vec<StoredProfile>> {
        if self.snapshot.is_none() {
            let (profiles, assigned_ids) = self.load_from_slot()?;
            if assigned_ids {
                self.backfill_ids(profiles)?;
            } else {
                self.snapshot = Some(profiles);
            }
        }
        Ok(self.snapshot.get_or_insert_with(Vec::new))
    }

    /// Stored collection, plus whether any entry had no `id` and was given one.
    fn load_from_slot(&self) -> PulseResult<(Vec<StoredProfile>, bool)> {
        let bytes = match self.slot.read()? {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => bytes,
            _ => return Ok((Vec::new(), false)),
        };
        let decoded = serde_json::from_slice::<Vec<serde_json::Value>>(&bytes).and_then(|raw| {
            let missing_ids = raw.iter().any(|entry| entry.get("id").is_none());
            let profiles: Vec<StoredProfile> =
                serde_json::from_value(serde_json::Value::Array(raw))?;
            Ok((profiles, missing_ids))
        });
        match decoded {
            Ok(loaded) => Ok(loaded),
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable profile data in {}: {}",
                    self.slot.describe(),
                    e
                );
                Ok((Vec::new(), false))
            }
        }
    }

    /// Write freshly assigned ids back so they stay valid across loads.
    ///
    /// If the slot refuses the write the ids only live for this store.
    fn backfill_ids(&mut self, profiles: Vec<StoredProfile>) -> PulseResult<()> {
        log::info!("Assigning ids to legacy profiles in {}", self.slot.describe());
        let bytes = encode(&profiles)?;
        if let Err(e) = self.slot.write(&bytes) {
            log::warn!("Could not persist assigned profile ids: {}", e);
        }
        self.snapshot = Some(profiles);
        Ok(())
    }

    fn persist(&mut self, next: Vec<StoredProfile>) -> PulseResult<&[StoredProfile]> {
        let bytes = encode(&next)?;
        self.slot.write(&bytes)?;
        log::debug!("Persisted {} profiles to {}", next.len(), self.slot.describe());
        Ok(self.snapshot.insert(next).as_slice())
    }
}

fn encode(profiles: &[StoredProfile]) -> PulseResult<Vec<u8>> {
    serde_json::to_vec_pretty(profiles).map_err(|e| PulseError::SerializationError {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{GeneratorParams, ParamValue, Polarity};
    use std::env::temp_dir;
    use std::fs;

    fn profile(name: &str) -> StoredProfile {
        StoredProfile::new(
            name,
            GeneratorParams::new("10", "20", "10", "60", false, Polarity::Bipolar),
        )
    }

    fn names<S: StorageSlot>(store: &mut ProfileStore<S>) -> Vec<String> {
        store.list().unwrap().iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_empty_slot_lists_nothing() {
        let mut store = ProfileStore::new(MemorySlot::default());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_garbage_in_slot_falls_back_to_empty() {
        let mut store = ProfileStore::new(MemorySlot::with_contents("{not json"));
        assert!(store.list().unwrap().is_empty());

        let mut store = ProfileStore::new(MemorySlot::with_contents("   "));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_save_keeps_insertion_order_and_duplicates() {
        let mut store = ProfileStore::new(MemorySlot::default());
        store.save(profile("A")).unwrap();
        store.save(profile("B")).unwrap();
        store.save(profile("A")).unwrap();
        assert_eq!(names(&mut store), ["A", "B", "A"]);
    }

    #[test]
    fn test_save_persists_whole_collection() {
        let mut store = ProfileStore::new(MemorySlot::default());
        store.save(profile("A")).unwrap();
        store.save(profile("B")).unwrap();

        let persisted: Vec<StoredProfile> =
            serde_json::from_slice(store.slot().contents().unwrap()).unwrap();
        assert_eq!(persisted, store.list().unwrap());
    }

    #[test]
    fn test_reload_from_slot() {
        let mut store = ProfileStore::new(MemorySlot::default());
        store.save(profile("A")).unwrap();
        let saved = store.list().unwrap().to_vec();

        let mut reopened = ProfileStore::new(store.slot().clone());
        assert_eq!(reopened.list().unwrap(), saved.as_slice());
    }

    #[test]
    fn test_delete_by_id_is_idempotent() {
        let mut store = ProfileStore::new(MemorySlot::default());
        store.save(profile("A")).unwrap();
        let b = profile("B");
        let b_id = b.id;
        store.save(b).unwrap();

        store.delete(b_id).unwrap();
        assert_eq!(names(&mut store), ["A"]);
        let after_first = store.list().unwrap().to_vec();

        store.delete(b_id).unwrap();
        assert_eq!(store.list().unwrap(), after_first.as_slice());
    }

    #[test]
    fn test_delete_removes_every_entry_with_id() {
        let duplicate = profile("dup");
        let raw = serde_json::to_vec(&vec![duplicate.clone(), profile("keep"), duplicate.clone()])
            .unwrap();
        let mut store = ProfileStore::new(MemorySlot::default());
        store.import_all(&raw).unwrap();

        store.delete(duplicate.id).unwrap();
        assert_eq!(names(&mut store), ["keep"]);
    }

    #[test]
    fn test_delete_matching_uses_structural_equality() {
        let mut store = ProfileStore::new(MemorySlot::default());
        let a = profile("A");
        store.save(a.clone()).unwrap();
        store.save(profile("A")).unwrap();

        store.delete_matching(&a).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        assert_ne!(store.list().unwrap()[0].id, a.id);

        store.delete_matching(&a).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_import_invalid_bytes_leaves_state_unchanged() {
        let mut store = ProfileStore::new(MemorySlot::default());
        store.save(profile("A")).unwrap();
        let before = store.list().unwrap().to_vec();
        let persisted_before = store.slot().contents().map(<[u8]>::to_vec);

        let err = store.import_all(b"\x00\xffnot a collection").unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_IMPORT");

        let err = store.import_all(br#"{"name": "not an array"}"#).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_IMPORT");

        assert_eq!(store.list().unwrap(), before.as_slice());
        assert_eq!(store.slot().contents().map(<[u8]>::to_vec), persisted_before);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let mut store = ProfileStore::new(MemorySlot::default());
        store
            .save(profile("A").with_email("op@example.com").with_age(41))
            .unwrap();
        store.save(profile("B").with_username("op")).unwrap();
        let before = store.list().unwrap().to_vec();

        let exported = store.export_all().unwrap();
        store.import_all(&exported).unwrap();
        assert_eq!(store.list().unwrap(), before.as_slice());

        let mut other = ProfileStore::new(MemorySlot::default());
        other.import_all(&exported).unwrap();
        assert_eq!(other.list().unwrap(), before.as_slice());
    }

    #[test]
    fn test_export_has_no_side_effects() {
        let mut store = ProfileStore::new(MemorySlot::default());
        store.save(profile("A")).unwrap();
        let persisted = store.slot().contents().map(<[u8]>::to_vec);

        let exported = store.export_all().unwrap();
        assert_eq!(Some(exported), persisted);
        assert_eq!(store.slot().contents().map(<[u8]>::to_vec), persisted);
    }

    #[test]
    fn test_import_legacy_entries_get_ids() {
        let legacy = br#"[
            {"name": "old", "T1": "1", "T2": "2", "T3": "3", "T4": "4",
             "polarity": "P", "burst": true}
        ]"#;
        let mut store = ProfileStore::new(MemorySlot::default());
        let imported = store.import_all(legacy).unwrap().to_vec();
        assert_eq!(imported[0].t4, ParamValue::from("4"));

        let mut reopened = ProfileStore::new(store.slot().clone());
        assert_eq!(reopened.list().unwrap()[0].id, imported[0].id);
    }

    #[test]
    fn test_loaded_legacy_ids_survive_reopen() {
        let legacy = br#"[{"name": "old", "T1": "1", "T2": "2", "T3": "3", "T4": "4"}]"#;
        let mut store = ProfileStore::new(MemorySlot::with_contents(legacy.to_vec()));
        let listed = store.list().unwrap()[0].id;

        let mut reopened = ProfileStore::new(store.slot().clone());
        assert_eq!(reopened.list().unwrap()[0].id, listed);
        assert!(reopened.find(listed).unwrap().is_some());

        reopened.delete(listed).unwrap();
        assert!(reopened.list().unwrap().is_empty());
    }

    #[test]
    fn test_stored_ids_are_not_rewritten_on_load() {
        let mut store = ProfileStore::new(MemorySlot::default());
        store.save(profile("A")).unwrap();
        let persisted = store.slot().contents().map(<[u8]>::to_vec);

        let mut reopened = ProfileStore::new(store.slot().clone());
        reopened.list().unwrap();
        assert_eq!(reopened.slot().contents().map(<[u8]>::to_vec), persisted);
    }

    #[test]
    fn test_storage_failures_are_surfaced() {
        let mut slot = MemorySlot::default();
        slot.set_unavailable(true);
        let mut store = ProfileStore::new(slot);
        let err = store.list().unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_UNAVAILABLE");
    }

    #[test]
    fn test_failed_write_keeps_snapshot() {
        let mut store = ProfileStore::new(MemorySlot::default());
        store.save(profile("A")).unwrap();
        let a_id = store.list().unwrap()[0].id;

        store.slot_mut().set_unavailable(true);
        assert!(store.save(profile("B")).is_err());
        assert!(store.delete(a_id).is_err());
        assert!(store.import_all(b"[]").is_err());

        assert_eq!(names(&mut store), ["A"]);
    }

    #[test]
    fn test_edit_flow_merges_and_persists() {
        let mut store = ProfileStore::new(MemorySlot::default());
        let a = profile("A");
        let a_id = a.id;
        store.save(a).unwrap();
        store.save(profile("B")).unwrap();

        assert_eq!(store.begin_edit(a_id).unwrap().name, "A");
        assert_eq!(store.editing(), Some(a_id));

        let edit = ProfileEdit {
            name: Some("A2".to_string()),
            t1: Some(ParamValue::from("15")),
            ..ProfileEdit::default()
        };
        store.commit_edit(edit).unwrap();

        assert_eq!(store.editing(), None);
        assert_eq!(names(&mut store), ["A2", "B"]);

        let mut reopened = ProfileStore::new(store.slot().clone());
        let edited = reopened.find(a_id).unwrap().unwrap();
        assert_eq!(edited.t1, ParamValue::from("15"));
        assert_eq!(edited.t2, ParamValue::from("20"));
    }

    #[test]
    fn test_begin_edit_does_not_write() {
        let mut store = ProfileStore::new(MemorySlot::default());
        let a = profile("A");
        let a_id = a.id;
        store.save(a).unwrap();
        let persisted = store.slot().contents().map(<[u8]>::to_vec);

        store.begin_edit(a_id).unwrap();
        store.cancel_edit();
        assert_eq!(store.editing(), None);
        assert_eq!(store.slot().contents().map(<[u8]>::to_vec), persisted);
    }

    #[test]
    fn test_edit_errors() {
        let mut store = ProfileStore::new(MemorySlot::default());
        let err = store.commit_edit(ProfileEdit::default()).unwrap_err();
        assert_eq!(err, PulseError::NoEditInProgress);

        let err = store.begin_edit(ProfileId::new()).unwrap_err();
        assert_eq!(err.error_code(), "PROFILE_NOT_FOUND");

        let a = profile("A");
        let a_id = a.id;
        store.save(a).unwrap();
        store.begin_edit(a_id).unwrap();
        store.delete(a_id).unwrap();
        assert_eq!(store.editing(), None);
    }

    #[test]
    fn test_find_by_name() {
        let mut store = ProfileStore::new(MemorySlot::default());
        store.save(profile("A")).unwrap();
        store.save(profile("B")).unwrap();
        store.save(profile("A")).unwrap();
        assert_eq!(store.find_by_name("A").unwrap().len(), 2);
        assert!(store.find_by_name("C").unwrap().is_empty());
    }

    #[test]
    fn test_file_backed_store() {
        let path = temp_dir().join(format!("pulsetrace_store_{}.json", uuid::Uuid::new_v4()));
        let mut store = ProfileStore::open(&path);
        assert!(store.list().unwrap().is_empty());

        store.save(profile("A")).unwrap();
        store.save(profile("B")).unwrap();

        let mut reopened = ProfileStore::open(&path);
        assert_eq!(names(&mut reopened), ["A", "B"]);
        assert!(StoreLock::check(&path).is_none());

        let on_disk = fs::read(&path).unwrap();
        assert_eq!(on_disk, reopened.export_all().unwrap());

        let _ = fs::remove_file(&path);
    }
}
