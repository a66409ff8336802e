use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Marker value stored once the user has unlocked audio.
pub const CONSENT_GRANTED: &str = "granted";

/// Best-effort persistence for the single "audio consent" fact. Read once
/// at controller start-up, written on confirmed unlock. Storage failures
/// are swallowed; the worst case is asking for a gesture again next load.
pub trait ConsentStore: Send {
    fn granted(&self) -> bool;
    fn set_granted(&mut self, granted: bool);
}

/// In-memory store. Clones share state so tests can observe writes made
/// through the controller-owned handle.
#[derive(Clone, Default)]
pub struct MemoryConsent {
    granted: Arc<Mutex<bool>>,
}

impl MemoryConsent {
    pub fn new(granted: bool) -> Self {
        Self {
            granted: Arc::new(Mutex::new(granted)),
        }
    }

    pub fn is_granted(&self) -> bool {
        self.granted.lock().map(|guard| *guard).unwrap_or(false)
    }
}

impl ConsentStore for MemoryConsent {
    fn granted(&self) -> bool {
        self.is_granted()
    }

    fn set_granted(&mut self, granted: bool) {
        if let Ok(mut guard) = self.granted.lock() {
            *guard = granted;
        }
    }
}

/// Single-file store, the profile-local equivalent of a browser's storage
/// key. A revoke removes the file.
pub struct FileConsentStore {
    path: PathBuf,
}

impl FileConsentStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConsentStore for FileConsentStore {
    fn granted(&self) -> bool {
        fs::read_to_string(&self.path)
            .map(|value| value.trim() == CONSENT_GRANTED)
            .unwrap_or(false)
    }

    fn set_granted(&mut self, granted: bool) {
        if granted {
            let _ = fs::write(&self.path, CONSENT_GRANTED);
        } else {
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process;

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryConsent::default();
        assert!(!store.granted());
        store.set_granted(true);
        assert!(store.granted());
        let observer = store.clone();
        store.set_granted(false);
        assert!(!observer.is_granted());
    }

    #[test]
    fn file_store_persists_and_revokes() {
        let path = std::env::temp_dir().join(format!(
            "ingen-console-consent-{}.txt",
            process::id()
        ));
        let _ = fs::remove_file(&path);

        let mut store = FileConsentStore::new(&path);
        assert!(!store.granted());
        store.set_granted(true);
        assert!(store.granted());
        store.set_granted(false);
        assert!(!store.granted());
    }

    #[test]
    fn unreadable_paths_read_as_not_granted() {
        let store = FileConsentStore::new("/nonexistent/dir/consent.txt");
        assert!(!store.granted());
    }
}
