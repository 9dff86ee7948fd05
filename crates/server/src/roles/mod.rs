//! Post-login role lookup.
//!
//! A user's role may be stored in any of three backend relations. The
//! [`RoleResolver`] asks each [`RoleSource`] in priority order and stops at
//! the first that yields a usable row; within that source the first row
//! wins. A failing or timed-out source is logged and skipped, never fatal.

pub mod relation;

use shared_types::{ResolvedRole, RoleSettings, RoleSourceKind, Session};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::{BackendClient, BackendError};
use relation::RelationRoleSource;

/// One place a role assignment can be read from.
#[async_trait::async_trait]
pub trait RoleSource: Send + Sync {
    fn kind(&self) -> RoleSourceKind;

    /// Role names of the session user's usable rows, in backend order.
    async fn fetch_role_names(&self, session: &Session) -> Result<Vec<String>, BackendError>;
}

/// Timing knobs for [`RoleResolver`], converted from `config.toml`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverTiming {
    pub settle_delay: Duration,
    pub query_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
}

impl ResolverTiming {
    /// No waiting at all; used for page loads after sign-in and in tests.
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            query_timeout: Duration::from_secs(5),
            retry_attempts: 0,
            retry_backoff: Duration::ZERO,
        }
    }
}

impl From<&RoleSettings> for ResolverTiming {
    fn from(settings: &RoleSettings) -> Self {
        Self {
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
            query_timeout: Duration::from_millis(settings.query_timeout_ms),
            retry_attempts: settings.retry_attempts,
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
        }
    }
}

/// Ordered chain of role sources.
pub struct RoleResolver {
    sources: Vec<Box<dyn RoleSource>>,
    timing: ResolverTiming,
}

impl RoleResolver {
    pub fn new(sources: Vec<Box<dyn RoleSource>>, timing: ResolverTiming) -> Self {
        Self { sources, timing }
    }

    /// Build the assignment → direct → view chain from config, skipping
    /// disabled sources.
    pub fn from_settings(client: &BackendClient, settings: &RoleSettings) -> Self {
        let sources: Vec<Box<dyn RoleSource>> = [
            (RoleSourceKind::Assignment, &settings.assignment),
            (RoleSourceKind::Direct, &settings.direct),
            (RoleSourceKind::View, &settings.view),
        ]
        .into_iter()
        .filter(|(_, source)| source.enabled)
        .map(|(kind, source)| {
            Box::new(RelationRoleSource::new(kind, source, client.clone())) as Box<dyn RoleSource>
        })
        .collect();

        Self::new(sources, ResolverTiming::from(settings))
    }

    /// Same chain with different timing.
    pub fn with_timing(self, timing: ResolverTiming) -> Self {
        Self { timing, ..self }
    }

    /// Resolve the role for a freshly signed-in session: wait out the settle
    /// delay, run the chain, and re-run it with backoff while it comes back
    /// empty and retries remain. `None` means no source had a usable row.
    #[tracing::instrument(skip_all, fields(user_id = %session.user.id))]
    pub async fn resolve(&self, session: &Session) -> Option<ResolvedRole> {
        if !self.timing.settle_delay.is_zero() {
            tokio::time::sleep(self.timing.settle_delay).await;
        }

        let mut backoff = self.timing.retry_backoff;
        for attempt in 0..=self.timing.retry_attempts {
            if attempt > 0 {
                debug!(attempt, ?backoff, "Role chain empty, retrying");
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
            if let Some(resolved) = self.run_chain(session).await {
                return Some(resolved);
            }
        }

        info!(defaulted = true, "No role assignment found in any source");
        None
    }

    /// Single pass over the chain with no settle delay and no retries. Used
    /// for requests made well after sign-in, when replication has caught up.
    #[tracing::instrument(skip_all, fields(user_id = %session.user.id))]
    pub async fn resolve_now(&self, session: &Session) -> Option<ResolvedRole> {
        self.run_chain(session).await
    }

    /// One pass over the sources, strictly in order.
    async fn run_chain(&self, session: &Session) -> Option<ResolvedRole> {
        for source in &self.sources {
            let kind = source.kind();
            let outcome =
                tokio::time::timeout(self.timing.query_timeout, source.fetch_role_names(session))
                    .await
                    .unwrap_or(Err(BackendError::Timeout(self.timing.query_timeout)));

            match outcome {
                Ok(names) => match names.into_iter().next() {
                    Some(name) => {
                        debug!(source = kind.as_str(), role = %name, "Role found");
                        return Some(ResolvedRole { name, source: kind });
                    }
                    None => debug!(source = kind.as_str(), "No role rows"),
                },
                Err(e) => {
                    warn!(source = kind.as_str(), error = %e, "Role source failed, falling through");
                }
            }
        }
        None
    }
}
