use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::store::{CredentialStore, StoredCredential};

/// How long an extracted API key is trusted before it is fetched again
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// An InnerTube API key and when it was extracted
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub secret: String,
    pub issued_at: SystemTime,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &redact(&self.secret))
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

pub(crate) fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(10).collect();
    format!("{prefix}...")
}

fn to_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Single-credential cache with read-time expiry.
///
/// Every operation holds the cache lock for its whole store interaction, so
/// concurrent readers never observe a half-written pair. The lock is never held
/// across network calls.
pub struct CredentialCache<S> {
    store: S,
    ttl: Duration,
    lock: Mutex<()>,
}

impl<S: CredentialStore> CredentialCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_ttl(store, DEFAULT_TTL)
    }

    pub fn with_ttl(store: S, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            lock: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached credential, or `None` if absent or expired (expired ones are cleared)
    pub fn get(&self) -> Option<Credential> {
        let _guard = self.lock.lock();

        let record = match self.store.load() {
            Ok(Some(record)) if !record.secret.is_empty() && record.issued_at_ms != 0 => record,
            Ok(_) => {
                debug!("API key cache miss: no key stored");
                return None;
            }
            Err(e) => {
                warn!("API key cache unreadable, treating as miss: {e}");
                return None;
            }
        };

        let issued_at = UNIX_EPOCH + Duration::from_millis(record.issued_at_ms);
        // A timestamp from the future counts as fresh
        let age = SystemTime::now().duration_since(issued_at).unwrap_or_default();

        if age >= self.ttl {
            debug!("API key cache miss: key expired (age: {} minutes)", age.as_secs() / 60);
            self.clear_locked();
            return None;
        }

        debug!(
            "API key cache hit: key valid for {} more minutes",
            (self.ttl - age).as_secs() / 60
        );
        Some(Credential {
            secret: record.secret,
            issued_at,
        })
    }

    pub fn secret(&self) -> Option<String> {
        self.get().map(|c| c.secret)
    }

    /// Store a freshly extracted key stamped with the current time
    pub fn put(&self, secret: &str) -> Credential {
        let issued_at = SystemTime::now();
        let record = StoredCredential {
            secret: secret.to_string(),
            issued_at_ms: to_millis(issued_at),
        };

        let _guard = self.lock.lock();
        match self.store.save(&record) {
            Ok(()) => debug!("API key cached (TTL: {} hours)", self.ttl.as_secs() / 3600),
            Err(e) => warn!("Failed to persist API key, using it uncached: {e}"),
        }

        Credential {
            secret: record.secret,
            issued_at,
        }
    }

    pub fn clear(&self) {
        let _guard = self.lock.lock();
        self.clear_locked();
    }

    fn clear_locked(&self) {
        match self.store.remove() {
            Ok(()) => debug!("API key cache cleared"),
            Err(e) => warn!("Failed to clear API key cache: {e}"),
        }
    }

    pub fn has_valid(&self) -> bool {
        self.get().is_some()
    }
}
