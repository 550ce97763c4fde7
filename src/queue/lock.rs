//! Global advisory lock arbitrating task claims.
//!
//! A single well-known storage object signals "another worker is currently
//! claiming". Whoever observes it absent creates it, claims one directory,
//! and removes it again. The storage layer is not required to provide
//! atomic create-if-absent, so under true concurrent creation two pollers
//! can both observe absence; the randomized poll interval keeps that window
//! a probabilistic mitigation, not a guarantee. Backends with atomic
//! creation close the race for real.

use crate::error::{Result, SweepError};
use crate::queue::QueueConfig;
use crate::storage::Storage;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

/// Which part a process plays in a cooperating group. Exactly one process
/// per group must run as `Leader`; only the leader touches the global lock
/// and the lock-clearing tool. `Worker` processes no-op those steps and
/// rely on being externally synchronized with their leader (the
/// single-process-per-host deployment assumption).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Leader,
    Worker,
}

impl std::str::FromStr for Role {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "leader" => Ok(Role::Leader),
            "worker" => Ok(Role::Worker),
            other => Err(SweepError::contract(format!(
                "unknown role '{other}' (expected leader or worker)"
            ))),
        }
    }
}

/// Handle on the global lock object.
pub struct GlobalLock<'a> {
    storage: &'a dyn Storage,
    url: String,
    role: Role,
    poll_min: Duration,
    poll_jitter: Duration,
}

impl<'a> GlobalLock<'a> {
    pub fn new(storage: &'a dyn Storage, config: &QueueConfig, role: Role) -> Self {
        Self {
            storage,
            url: config.global_lock_url.clone(),
            role,
            poll_min: Duration::from_millis(config.poll_min_ms),
            poll_jitter: Duration::from_millis(config.poll_jitter_ms),
        }
    }

    /// Block until the lock object is absent, then create it.
    ///
    /// Polls at `poll_min + U(0, poll_jitter)` intervals. Interruptible
    /// only by process termination. No-op for `Role::Worker`.
    pub fn acquire(&self) -> Result<()> {
        if self.role == Role::Worker {
            return Ok(());
        }
        let mut rng = rand::thread_rng();
        loop {
            if !self.storage.exists(&self.url)? {
                self.storage.write(&self.url, "Locked")?;
                debug!(url = %self.url, "global lock acquired");
                return Ok(());
            }
            let jitter = rng.gen_range(Duration::ZERO..=self.poll_jitter);
            debug!(url = %self.url, "waiting for global lock");
            std::thread::sleep(self.poll_min + jitter);
        }
    }

    /// Remove the lock object. It must still be held from the matching
    /// [`GlobalLock::acquire`]; releasing an absent lock is a protocol
    /// violation. No-op for `Role::Worker`.
    pub fn release(&self) -> Result<()> {
        if self.role == Role::Worker {
            return Ok(());
        }
        if !self.storage.exists(&self.url)? {
            return Err(SweepError::protocol(format!(
                "releasing global lock '{}' that is not held",
                self.url
            )));
        }
        self.storage.remove(&self.url, false)?;
        info!(url = %self.url, "global lock released");
        Ok(())
    }
}
