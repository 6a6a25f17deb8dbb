//! Identifier generation with bounded retry.
//!
//! Public dashboards carry two generated identifiers: a short `uid` used by
//! owners to address the record, and an unguessable `access_token` that grants
//! anonymous read access. Both are drawn at random and checked against the
//! store; a collision triggers a new draw until the attempt budget runs out.
//!
//! The check and the later insert are not atomic. Two writers drawing the same
//! identifier at the same instant is accepted as negligible given the entropy.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{debug, warn};
use uuid::Uuid;
use vitrine_core::TokenConfig;

use crate::error::{PublicDashboardError, Result};
use crate::store::PublicDashboardStore;

/// Attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Length of generated uids.
pub const DEFAULT_UID_LENGTH: usize = 14;

/// Source of random identifier candidates.
pub trait IdGenerator: Send + Sync {
    fn new_random_id(&self) -> String;
}

/// Random alphanumeric uids.
#[derive(Debug, Clone)]
pub struct ShortUidGenerator {
    length: usize,
}

impl ShortUidGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for ShortUidGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_UID_LENGTH)
    }
}

impl IdGenerator for ShortUidGenerator {
    fn new_random_id(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

/// 32 lowercase hex characters (a v4 UUID without dashes).
#[derive(Debug, Clone, Default)]
pub struct AccessTokenGenerator;

impl IdGenerator for AccessTokenGenerator {
    fn new_random_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Which identifier is being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Uid,
    AccessToken,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uid => write!(f, "uid"),
            Self::AccessToken => write!(f, "access token"),
        }
    }
}

/// Generates unused identifiers for new public dashboards.
#[derive(Clone)]
pub struct TokenLifecycleManager {
    uid_generator: Arc<dyn IdGenerator>,
    access_token_generator: Arc<dyn IdGenerator>,
    max_attempts: u32,
}

impl Default for TokenLifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenLifecycleManager")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl TokenLifecycleManager {
    pub fn new() -> Self {
        Self {
            uid_generator: Arc::new(ShortUidGenerator::default()),
            access_token_generator: Arc::new(AccessTokenGenerator),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn from_config(config: &TokenConfig) -> Self {
        Self {
            uid_generator: Arc::new(ShortUidGenerator::new(config.uid_length)),
            access_token_generator: Arc::new(AccessTokenGenerator),
            max_attempts: config.max_attempts.max(1),
        }
    }

    pub fn with_uid_generator(mut self, generator: Arc<dyn IdGenerator>) -> Self {
        self.uid_generator = generator;
        self
    }

    pub fn with_access_token_generator(mut self, generator: Arc<dyn IdGenerator>) -> Self {
        self.access_token_generator = generator;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draw candidates until `is_taken` reports one as free.
    ///
    /// Fails with [`PublicDashboardError::GenerationFailed`] once every attempt
    /// collided. A failing uniqueness check aborts immediately as
    /// [`PublicDashboardError::Upstream`].
    pub async fn generate<F, Fut>(&self, kind: IdentifierKind, mut is_taken: F) -> Result<String>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = anyhow::Result<bool>>,
    {
        let generator = match kind {
            IdentifierKind::Uid => &self.uid_generator,
            IdentifierKind::AccessToken => &self.access_token_generator,
        };

        for attempt in 1..=self.max_attempts {
            let candidate = generator.new_random_id();
            let taken = is_taken(candidate.clone()).await.map_err(|source| {
                PublicDashboardError::upstream(format!("checking {kind} uniqueness"), source)
            })?;

            if !taken {
                debug!(%kind, attempt, "Generated unique identifier");
                return Ok(candidate);
            }
            warn!(%kind, attempt, max_attempts = self.max_attempts, "Generated identifier already in use");
        }

        Err(PublicDashboardError::GenerationFailed {
            kind,
            attempts: self.max_attempts,
        })
    }

    /// A uid no public dashboard uses yet.
    pub async fn generate_uid(&self, store: &dyn PublicDashboardStore) -> Result<String> {
        self.generate(IdentifierKind::Uid, move |candidate| async move {
            Ok(store.find(&candidate).await?.is_some())
        })
        .await
    }

    /// An access token no public dashboard uses yet.
    pub async fn generate_access_token(&self, store: &dyn PublicDashboardStore) -> Result<String> {
        self.generate(IdentifierKind::AccessToken, move |candidate| async move {
            Ok(store.find_by_access_token(&candidate).await?.is_some())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vitrine_policy::{is_valid_access_token, is_valid_uid};

    /// Hands out a fixed sequence of candidates.
    struct Scripted(Mutex<Vec<String>>);

    impl Scripted {
        fn new(candidates: &[&str]) -> Arc<Self> {
            let mut candidates: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
            candidates.reverse();
            Arc::new(Self(Mutex::new(candidates)))
        }
    }

    impl IdGenerator for Scripted {
        fn new_random_id(&self) -> String {
            self.0.lock().unwrap().pop().unwrap_or_default()
        }
    }

    #[test]
    fn test_default_generators_produce_valid_identifiers() {
        for _ in 0..20 {
            let uid = ShortUidGenerator::default().new_random_id();
            assert_eq!(uid.len(), DEFAULT_UID_LENGTH);
            assert!(is_valid_uid(&uid));

            let token = AccessTokenGenerator.new_random_id();
            assert!(is_valid_access_token(&token), "{token}");
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let manager = TokenLifecycleManager::new().with_uid_generator(Scripted::new(&["a", "b", "c"]));
        let taken = ["a", "b"];

        let uid = manager
            .generate(IdentifierKind::Uid, |candidate| async move {
                Ok(taken.contains(&candidate.as_str()))
            })
            .await
            .unwrap();
        assert_eq!(uid, "c");
    }

    #[tokio::test]
    async fn test_fails_after_three_collisions() {
        let manager = TokenLifecycleManager::new()
            .with_access_token_generator(Scripted::new(&["a", "b", "c", "d"]));
        let mut checked = Vec::new();

        let err = manager
            .generate(IdentifierKind::AccessToken, |candidate| {
                checked.push(candidate);
                async { Ok(true) }
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PublicDashboardError::GenerationFailed {
                kind: IdentifierKind::AccessToken,
                attempts: 3
            }
        ));
        assert_eq!(checked, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_store_failure_is_upstream() {
        let manager = TokenLifecycleManager::new();
        let err = manager
            .generate(IdentifierKind::Uid, |_| async { Err(anyhow::anyhow!("db down")) })
            .await
            .unwrap_err();
        assert!(matches!(err, PublicDashboardError::Upstream { .. }));
    }

    #[test]
    fn test_from_config() {
        let manager = TokenLifecycleManager::from_config(&TokenConfig {
            max_attempts: 5,
            uid_length: 20,
        });
        assert_eq!(manager.max_attempts(), 5);
        assert_eq!(manager.uid_generator.new_random_id().len(), 20);
    }
}
