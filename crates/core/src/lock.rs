//! Lock handle composed over a [`LockProvider`].
//!
//! Acquiring is an `add` of the owner token under the lock name and releasing
//! is a delete conditioned on that token, so the lock inherits the backend's
//! per-item atomicity and needs no protocol of its own.

use std::future::Future;
use std::time::Duration;

use rand::distr::Alphanumeric;
use rand::Rng;

use crate::cache::{CacheError, LockProvider, Result};

/// Length of generated owner tokens.
pub const OWNER_TOKEN_LENGTH: usize = 16;

/// Default pause between attempts while blocking on a lock.
pub const DEFAULT_BLOCK_SLEEP: Duration = Duration::from_millis(250);

/// Generates a random owner token.
pub fn generate_owner() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(OWNER_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// A named lock held on behalf of one owner token.
#[derive(Debug)]
pub struct CacheLock<'a, P: LockProvider> {
    provider: &'a P,
    name: String,
    ttl: Duration,
    owner: String,
    sleep: Duration,
}

impl<'a, P: LockProvider> CacheLock<'a, P> {
    /// Creates a handle. Nothing is written until [`acquire`](Self::acquire).
    pub fn new(provider: &'a P, name: &str, ttl: Duration, owner: String) -> Self {
        Self {
            provider,
            name: name.to_string(),
            ttl,
            owner,
            sleep: DEFAULT_BLOCK_SLEEP,
        }
    }

    /// Sets the pause between attempts used by [`block`](Self::block).
    pub fn between_blocked_attempts_sleep_for(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    /// The lock name, without the store prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owner token. Hand it to [`LockProvider::restore_lock`] to release
    /// the lock from elsewhere.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Tries to acquire the lock once.
    pub async fn acquire(&self) -> Result<bool> {
        self.provider
            .acquire_lock(&self.name, &self.owner, self.ttl)
            .await
    }

    /// Acquires the lock, runs `f`, then releases it.
    ///
    /// Returns `None` without running `f` if the lock is held elsewhere.
    pub async fn get<F, Fut, T>(&self, f: F) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.acquire().await? {
            return Ok(None);
        }

        let output = f().await;
        self.release().await?;
        Ok(Some(output))
    }

    /// Waits up to `timeout` for the lock.
    pub async fn block(&self, timeout: Duration) -> Result<()> {
        let started = tokio::time::Instant::now();

        while !self.acquire().await? {
            tokio::time::sleep(self.sleep).await;

            if started.elapsed() >= timeout {
                return Err(CacheError::LockTimeout(self.name.clone()));
            }
        }

        Ok(())
    }

    /// Waits up to `timeout` for the lock, runs `f`, then releases it.
    pub async fn block_with<F, Fut, T>(&self, timeout: Duration, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.block(timeout).await?;

        let output = f().await;
        self.release().await?;
        Ok(output)
    }

    /// Releases the lock if this handle's owner still holds it.
    pub async fn release(&self) -> Result<bool> {
        self.provider.release_lock(&self.name, &self.owner).await
    }

    /// Releases the lock whoever holds it.
    pub async fn force_release(&self) -> Result<()> {
        self.provider.force_release_lock(&self.name).await
    }

    /// Returns true if the live lock belongs to this handle's owner.
    pub async fn is_owned_by_current_process(&self) -> Result<bool> {
        let current = self.provider.lock_owner(&self.name).await?;
        Ok(current.as_deref() == Some(self.owner.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_owner_is_alphanumeric() {
        let owner = generate_owner();
        assert_eq!(owner.len(), OWNER_TOKEN_LENGTH);
        assert!(owner.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_owners_differ() {
        assert_ne!(generate_owner(), generate_owner());
    }
}
