use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::{self, KdfParams};
use crate::models::{CycleProfile, ProfileError};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("stored profile is invalid: {0}")]
    Profile(#[from] ProfileError),
    #[error("profile store lock poisoned")]
    Poisoned,
}

/// Where a profile lives between runs. The prediction code never touches
/// a store directly; callers load a profile and pass it in.
pub trait ProfileStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load_profile(&self) -> Result<Option<CycleProfile>, StorageError>;
    fn save_profile(&self, profile: &CycleProfile) -> Result<(), StorageError>;
    fn wipe(&self) -> Result<(), StorageError>;
}

/// On-disk and wire shape of a profile.
///
/// Lengths may have been saved as numbers or as raw form text, so they are
/// kept loose here and coerced when turned back into a [`CycleProfile`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredProfile {
    #[serde(alias = "last_period_date", default)]
    pub last_period_date: String,
    #[serde(alias = "cycle_length", default)]
    pub cycle_length: Value,
    #[serde(alias = "period_length", default)]
    pub period_length: Value,
}

impl From<&CycleProfile> for StoredProfile {
    fn from(profile: &CycleProfile) -> Self {
        Self {
            last_period_date: profile.anchor_date().format("%Y-%m-%d").to_string(),
            cycle_length: Value::from(profile.cycle_length_days()),
            period_length: Value::from(profile.period_length_days()),
        }
    }
}

impl StoredProfile {
    /// A record without a last period date counts as no profile at all.
    pub fn to_profile(&self) -> Result<Option<CycleProfile>, ProfileError> {
        if self.last_period_date.trim().is_empty() {
            return Ok(None);
        }
        CycleProfile::from_input(
            &self.last_period_date,
            &loose_text(&self.cycle_length),
            &loose_text(&self.period_length),
        )
        .map(Some)
    }
}

fn loose_text(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

/// Profile sealed with a passphrase in a single local file.
#[derive(Debug)]
pub struct EncryptedFileStore {
    path: PathBuf,
    passphrase: Passphrase,
    kdf: KdfParams,
}

impl EncryptedFileStore {
    pub fn new(path: impl Into<PathBuf>, passphrase: Passphrase, kdf: KdfParams) -> Self {
        Self {
            path: path.into(),
            passphrase,
            kdf,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl ProfileStore for EncryptedFileStore {
    fn load_profile(&self) -> Result<Option<CycleProfile>, StorageError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no saved profile");
            return Ok(None);
        }
        let sealed = fs::read(&self.path)?;
        let plaintext = crypto::open(self.passphrase.expose(), &sealed)?;
        let record: StoredProfile = serde_json::from_slice(&plaintext)?;
        Ok(record.to_profile()?)
    }

    fn save_profile(&self, profile: &CycleProfile) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = Zeroizing::new(serde_json::to_vec(&StoredProfile::from(profile))?);
        let sealed = crypto::seal(self.passphrase.expose(), &json, &self.kdf)?;
        fs::write(&self.path, sealed)?;
        info!(path = %self.path.display(), "profile saved");
        Ok(())
    }

    fn wipe(&self) -> Result<(), StorageError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!(path = %self.path.display(), "profile wiped");
        }
        Ok(())
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<StoredProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing raw record, e.g. one written by an older client.
    pub fn with_record(record: StoredProfile) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }

    pub fn record(&self) -> Result<Option<StoredProfile>, StorageError> {
        Ok(self.record.lock().map_err(|_| StorageError::Poisoned)?.clone())
    }
}

impl ProfileStore for MemoryStore {
    fn load_profile(&self) -> Result<Option<CycleProfile>, StorageError> {
        let record = self.record.lock().map_err(|_| StorageError::Poisoned)?;
        match record.as_ref() {
            Some(r) => Ok(r.to_profile()?),
            None => Ok(None),
        }
    }

    fn save_profile(&self, profile: &CycleProfile) -> Result<(), StorageError> {
        *self.record.lock().map_err(|_| StorageError::Poisoned)? = Some(profile.into());
        Ok(())
    }

    fn wipe(&self) -> Result<(), StorageError> {
        *self.record.lock().map_err(|_| StorageError::Poisoned)? = None;
        Ok(())
    }
}

/// Prefer `primary`; use `secondary` when the primary fails or has nothing saved.
#[derive(Debug)]
pub struct FallbackStore<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackStore<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: ProfileStore, S: ProfileStore> ProfileStore for FallbackStore<P, S> {
    fn load_profile(&self) -> Result<Option<CycleProfile>, StorageError> {
        match self.primary.load_profile() {
            Ok(Some(profile)) => Ok(Some(profile)),
            Ok(None) => self.secondary.load_profile(),
            Err(e) => {
                warn!(error = %e, "primary profile store failed to load, using fallback");
                self.secondary.load_profile()
            }
        }
    }

    fn save_profile(&self, profile: &CycleProfile) -> Result<(), StorageError> {
        if let Err(e) = self.primary.save_profile(profile) {
            warn!(error = %e, "primary profile store failed to save, using fallback");
            return self.secondary.save_profile(profile);
        }
        Ok(())
    }

    fn wipe(&self) -> Result<(), StorageError> {
        let primary = self.primary.wipe();
        self.secondary.wipe()?;
        primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fast() -> KdfParams {
        KdfParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn profile() -> CycleProfile {
        CycleProfile::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 30, 4)
    }

    struct Broken;

    impl ProfileStore for Broken {
        fn load_profile(&self) -> Result<Option<CycleProfile>, StorageError> {
            Err(StorageError::Poisoned)
        }
        fn save_profile(&self, _: &CycleProfile) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
        fn wipe(&self) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileStore::new(
            dir.path().join("nested").join("profile.cykel"),
            Passphrase::new("hunter2"),
            fast(),
        );
        assert!(store.load_profile().unwrap().is_none());

        store.save_profile(&profile()).unwrap();
        assert!(store.exists());
        assert_eq!(store.load_profile().unwrap(), Some(profile()));

        store.wipe().unwrap();
        assert!(!store.exists());
        assert!(store.load_profile().unwrap().is_none());
    }

    #[test]
    fn file_store_wrong_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.cykel");
        EncryptedFileStore::new(&path, Passphrase::new("right"), fast())
            .save_profile(&profile())
            .unwrap();

        let err = EncryptedFileStore::new(&path, Passphrase::new("wrong"), fast())
            .load_profile()
            .unwrap_err();
        assert!(matches!(err, StorageError::Crypto(_)));
    }

    #[test]
    fn file_is_not_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.cykel");
        EncryptedFileStore::new(&path, Passphrase::new("pw"), fast())
            .save_profile(&profile())
            .unwrap();
        let raw = fs::read(&path).unwrap();
        assert!(!raw.windows(10).any(|w| w == b"2024-01-01"));
    }

    #[test]
    fn string_lengths_are_coerced() {
        let record: StoredProfile = serde_json::from_str(
            r#"{"lastPeriodDate":"2024-01-01","cycleLength":"30","periodLength":"oops"}"#,
        )
        .unwrap();
        let store = MemoryStore::with_record(record);
        let p = store.load_profile().unwrap().unwrap();
        assert_eq!(p.cycle_length_days(), 30);
        assert_eq!(p.period_length_days(), 5);
    }

    #[test]
    fn snake_case_records_are_accepted() {
        let record: StoredProfile = serde_json::from_str(
            r#"{"last_period_date":"2024-01-01","cycle_length":26,"period_length":3}"#,
        )
        .unwrap();
        let p = record.to_profile().unwrap().unwrap();
        assert_eq!(p.cycle_length_days(), 26);
        assert_eq!(p.period_length_days(), 3);
    }

    #[test]
    fn empty_record_is_no_profile() {
        let record: StoredProfile = serde_json::from_str("{}").unwrap();
        assert_eq!(record.to_profile().unwrap(), None);
    }

    #[test]
    fn saved_record_uses_numbers() {
        let store = MemoryStore::new();
        store.save_profile(&profile()).unwrap();
        let json = serde_json::to_value(store.record().unwrap().unwrap()).unwrap();
        assert_eq!(json["lastPeriodDate"], "2024-01-01");
        assert_eq!(json["cycleLength"], 30);
        assert_eq!(json["periodLength"], 4);
    }

    #[test]
    fn fallback_loads_from_secondary_when_primary_fails() {
        let secondary = MemoryStore::new();
        secondary.save_profile(&profile()).unwrap();
        let store = FallbackStore::new(Broken, secondary);
        assert_eq!(store.load_profile().unwrap(), Some(profile()));
    }

    #[test]
    fn fallback_saves_to_secondary_when_primary_fails() {
        let store = FallbackStore::new(Broken, MemoryStore::new());
        store.save_profile(&profile()).unwrap();
        assert_eq!(store.secondary.load_profile().unwrap(), Some(profile()));
    }

    #[test]
    fn fallback_prefers_primary() {
        let primary = MemoryStore::new();
        primary.save_profile(&profile()).unwrap();
        let other = CycleProfile::new(NaiveDate::from_ymd_opt(2023, 5, 5).unwrap(), 28, 5);
        let secondary = MemoryStore::new();
        secondary.save_profile(&other).unwrap();

        let store = FallbackStore::new(primary, secondary);
        assert_eq!(store.load_profile().unwrap(), Some(profile()));

        store.primary.wipe().unwrap();
        assert_eq!(store.load_profile().unwrap(), Some(other));
    }

    #[test]
    fn passphrase_debug_is_redacted() {
        assert_eq!(format!("{:?}", Passphrase::new("secret")), "Passphrase(***)");
    }
}
