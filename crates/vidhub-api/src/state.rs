use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{error, warn};

use vidhub_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub settings: Settings,
    /// One permit: store calls queue here rather than on the connection
    /// mutex, so waiting can be bounded without abandoning running work.
    store_gate: Arc<Semaphore>,
}

/// Token and store settings the handlers need at request time.
#[derive(Debug, Clone)]
pub struct Settings {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
    /// How long a store call may wait for its turn at the connection.
    pub store_timeout: Duration,
}

impl AppStateInner {
    pub fn new(db: Database, settings: Settings) -> AppState {
        Arc::new(Self {
            db,
            settings,
            store_gate: Arc::new(Semaphore::new(1)),
        })
    }
}

/// Runs a blocking store call off the async runtime.
///
/// The store timeout bounds only the wait for the connection. Once a call
/// has started it runs to completion, so a timeout error always means the
/// closure never ran and nothing was written. Store failures and timeouts
/// become [`ApiError::Internal`].
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let timeout = state.settings.store_timeout;
    let permit = match tokio::time::timeout(timeout, state.store_gate.clone().acquire_owned()).await {
        Ok(Ok(permit)) => permit,
        Ok(Err(e)) => return Err(ApiError::Internal(format!("store gate closed: {e}"))),
        Err(_) => {
            warn!("Store call gave up after waiting {:?} for the connection", timeout);
            return Err(ApiError::Internal(format!("store busy for longer than {timeout:?}")));
        }
    };

    let db = state.clone();
    let task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        f(&db.db)
    });

    match task.await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            Err(ApiError::Internal(format!("store task failed: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use axum::{http::StatusCode, response::IntoResponse};
    use http_body_util::BodyExt;

    fn state_with_timeout(store_timeout: Duration) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("state.db")).unwrap();
        let settings = Settings {
            access_token_secret: "access".into(),
            refresh_token_secret: "refresh".into(),
            access_token_ttl: chrono::Duration::minutes(5),
            refresh_token_ttl: chrono::Duration::days(1),
            store_timeout,
        };
        (AppStateInner::new(db, settings), dir)
    }

    #[tokio::test]
    async fn timed_out_call_never_runs_and_renders_the_envelope() {
        let (state, _dir) = state_with_timeout(Duration::from_millis(50));

        let slow = tokio::spawn({
            let state = state.clone();
            async move {
                with_db(&state, |_| {
                    std::thread::sleep(Duration::from_millis(300));
                    Ok(7)
                })
                .await
            }
        });
        // Let the slow call take the permit first.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let err = with_db(&state, move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

        // The slow call is not cut short by the other call's timeout.
        assert_eq!(slow.await.unwrap().unwrap(), 7);
        assert!(!ran.load(Ordering::SeqCst));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["statusCode"], 500);
        assert_eq!(body["message"], "Something went wrong");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn calls_past_their_timeout_still_finish_once_started() {
        let (state, _dir) = state_with_timeout(Duration::from_millis(10));

        let value = with_db(&state, |_| {
            std::thread::sleep(Duration::from_millis(50));
            Ok("done")
        })
        .await
        .unwrap();
        assert_eq!(value, "done");
    }
}
