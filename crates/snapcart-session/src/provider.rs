use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::info;

use snapcart_core::config::SessionConfig;
use snapcart_core::{ActionExecutor, Cookie};

use crate::error::{Result, SessionError};
use crate::store::SessionStore;

/// Yields a valid session by replaying the cache or by waiting (bounded)
/// for an interactive login to complete.
pub struct SessionProvider {
    store: Arc<SessionStore>,
    config: SessionConfig,
}

impl SessionProvider {
    pub fn new(store: Arc<SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// Obtain a valid session and leave it active in `executor`.
    ///
    /// Fast path: a cached, unexpired cookie set is injected straight into
    /// the executor — no interactive wait. Slow path: navigate to the login
    /// page, poll until the location leaves the login boundary (bounded by
    /// `login_timeout_secs`, interruptible via `shutdown`), then capture and
    /// persist the fresh cookies.
    ///
    /// Every successful path rewrites the expiry to `now + validity_mins`,
    /// so long-running schedules keep extending the cache lifetime.
    pub async fn obtain(
        &self,
        executor: &dyn ActionExecutor,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Vec<Cookie>> {
        executor.navigate(&self.config.login_url).await?;

        let now = Utc::now();
        if let Some(cached) = self.store.load() {
            if cached.is_valid(now) {
                executor.inject_cookies(&cached.cookies).await?;
                self.store.touch(self.window_from(now))?;
                info!("session restored from cache");
                return Ok(cached.cookies);
            }
            info!("cached session expired, interactive login required");
        } else {
            info!("no cached session, interactive login required");
        }

        self.wait_for_login(executor, shutdown).await?;

        let cookies = executor.session_cookies().await?;
        self.store.save(&cookies, self.window_from(Utc::now()))?;
        info!(count = cookies.len(), "session captured and cached");
        Ok(cookies)
    }

    /// Poll the executor until the login boundary is left.
    async fn wait_for_login(
        &self,
        executor: &dyn ActionExecutor,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        let timeout_secs = self.config.login_timeout_secs;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_secs);
        let poll = Duration::from_millis(self.config.poll_interval_ms);

        info!("waiting for interactive login to complete");
        loop {
            if !executor.login_pending().await? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(SessionError::AcquisitionTimedOut { secs: timeout_secs });
            }
            tokio::select! {
                _ = tokio::time::sleep(poll) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return Err(SessionError::Cancelled);
                    }
                }
            }
        }
    }

    fn window_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::minutes(self.config.validity_mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rusqlite::Connection;
    use snapcart_core::{ExecutorError, FireResult};

    #[derive(Default)]
    struct MockExecutor {
        login_pending: AtomicBool,
        navigations: AtomicUsize,
        injections: AtomicUsize,
        captures: AtomicUsize,
    }

    #[async_trait]
    impl ActionExecutor for MockExecutor {
        async fn navigate(&self, _url: &str) -> std::result::Result<(), ExecutorError> {
            self.navigations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn refresh(&self) -> std::result::Result<(), ExecutorError> {
            Ok(())
        }

        async fn prepare_selection(&self) -> std::result::Result<(), ExecutorError> {
            Ok(())
        }

        async fn fire(&self) -> std::result::Result<FireResult, ExecutorError> {
            Ok(FireResult::Failure)
        }

        async fn login_pending(&self) -> std::result::Result<bool, ExecutorError> {
            Ok(self.login_pending.load(Ordering::SeqCst))
        }

        async fn session_cookies(&self) -> std::result::Result<Vec<Cookie>, ExecutorError> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Cookie::new(".example.com", "fresh", "v1")])
        }

        async fn inject_cookies(
            &self,
            _cookies: &[Cookie],
        ) -> std::result::Result<(), ExecutorError> {
            self.injections.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn store() -> Arc<SessionStore> {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        Arc::new(SessionStore::new(conn))
    }

    fn config() -> SessionConfig {
        SessionConfig {
            login_url: "https://login.example.com".into(),
            validity_mins: 15,
            login_timeout_secs: 2,
            poll_interval_ms: 100,
        }
    }

    #[tokio::test]
    async fn valid_cache_replays_without_acquisition() {
        let store = store();
        let cached = vec![Cookie::new(".example.com", "old", "v0")];
        store
            .save(&cached, Utc::now() + chrono::Duration::minutes(10))
            .unwrap();

        let provider = SessionProvider::new(Arc::clone(&store), config());
        let exec = MockExecutor::default();
        let (_tx, mut rx) = watch::channel(false);

        let got = provider.obtain(&exec, &mut rx).await.unwrap();
        assert_eq!(got, cached);
        assert_eq!(exec.injections.load(Ordering::SeqCst), 1);
        assert_eq!(exec.captures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn obtain_twice_with_valid_cache_is_idempotent() {
        let store = store();
        store
            .save(
                &[Cookie::new(".example.com", "old", "v0")],
                Utc::now() + chrono::Duration::minutes(10),
            )
            .unwrap();

        let provider = SessionProvider::new(Arc::clone(&store), config());
        let exec = MockExecutor::default();
        let (_tx, mut rx) = watch::channel(false);

        provider.obtain(&exec, &mut rx).await.unwrap();
        provider.obtain(&exec, &mut rx).await.unwrap();
        // replay both times, zero acquisition side effects
        assert_eq!(exec.captures.load(Ordering::SeqCst), 0);
        assert_eq!(exec.injections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn successful_path_refreshes_expiry_window() {
        let store = store();
        let stale_ish = Utc::now() + chrono::Duration::minutes(1);
        store
            .save(&[Cookie::new(".example.com", "old", "v0")], stale_ish)
            .unwrap();

        let provider = SessionProvider::new(Arc::clone(&store), config());
        let exec = MockExecutor::default();
        let (_tx, mut rx) = watch::channel(false);
        provider.obtain(&exec, &mut rx).await.unwrap();

        let refreshed = store.load().unwrap().expires_at;
        assert!(refreshed > stale_ish);
    }

    #[tokio::test]
    async fn expired_cache_forces_fresh_acquisition() {
        let store = store();
        store
            .save(
                &[Cookie::new(".example.com", "old", "v0")],
                Utc::now() - chrono::Duration::minutes(1),
            )
            .unwrap();

        let provider = SessionProvider::new(Arc::clone(&store), config());
        let exec = MockExecutor::default(); // login_pending starts false: login "finishes" instantly
        let (_tx, mut rx) = watch::channel(false);

        let got = provider.obtain(&exec, &mut rx).await.unwrap();
        assert_eq!(exec.captures.load(Ordering::SeqCst), 1);
        assert_eq!(got[0].name, "fresh");
        // the persisted blob now holds the fresh cookies
        assert_eq!(store.load().unwrap().cookies[0].name, "fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn login_wait_is_bounded() {
        let provider = SessionProvider::new(store(), config());
        let exec = MockExecutor::default();
        exec.login_pending.store(true, Ordering::SeqCst);
        let (_tx, mut rx) = watch::channel(false);

        let err = provider.obtain(&exec, &mut rx).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::AcquisitionTimedOut { secs: 2 }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_login_wait() {
        let provider = SessionProvider::new(store(), config());
        let exec = MockExecutor::default();
        exec.login_pending.store(true, Ordering::SeqCst);

        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();

        let err = provider.obtain(&exec, &mut rx).await.unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
    }
}
