//! Ambient access to the active pipeline from deep application code.
//!
//! The request middleware installs a task-local [`Current`] for the duration
//! of the handler, so code that cannot have the scope threaded through its
//! arguments can still emit into the right request scope.

use std::future::Future;

use crate::dispatch::Observability;
use crate::error::{ObservabilityError, Result};
use crate::measurement::FieldValue;
use crate::scope::ScopeHandle;

tokio::task_local! {
    static CURRENT: Current;
}

#[derive(Clone)]
pub struct Current {
    pub obs: Observability,
    pub scope: ScopeHandle,
}

/// Run `fut` with `obs` and `scope` installed as the ambient context.
pub async fn scope<F: Future>(obs: Observability, scope: ScopeHandle, fut: F) -> F::Output {
    CURRENT.scope(Current { obs, scope }, fut).await
}

pub fn get() -> Option<Current> {
    CURRENT.try_with(Clone::clone).ok()
}

/// `send` against the ambient pipeline; `OutsideScope` when none is active.
pub async fn send<T, K, V, F, FK, FV>(name: &str, tags: T, fields: F) -> Result<()>
where
    T: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
    F: IntoIterator<Item = (FK, FV)>,
    FK: Into<String>,
    FV: Into<FieldValue>,
{
    let cur = get().ok_or(ObservabilityError::OutsideScope)?;
    cur.obs.send_in(&cur.scope, name, tags, fields).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObservabilityConfig;

    #[tokio::test]
    async fn send_outside_a_scope_fails() {
        let err = send("heartbeat", [("a", "b")], [("alive", true)])
            .await
            .unwrap_err();
        assert!(matches!(err, ObservabilityError::OutsideScope));
    }

    #[tokio::test]
    async fn send_inside_a_scope_lands_in_capture() {
        let obs = Observability::new(ObservabilityConfig::testing());
        let handle = ScopeHandle::with_identity(Some("alice".into()));

        scope(obs.clone(), handle, async {
            send("heartbeat", [("trigger", "manual")], [("alive", true)])
                .await
                .unwrap();
        })
        .await;

        let beats = obs.capture().get("heartbeat");
        assert_eq!(beats.len(), 1);
        assert_eq!(beats[0].tags["user"], "alice");
    }

    #[tokio::test]
    async fn observability_send_reuses_ambient_scope() {
        let obs = Observability::new(ObservabilityConfig::testing());
        let handle = ScopeHandle::with_identity(Some("bob".into()));

        let inner = obs.clone();
        scope(obs.clone(), handle, async move {
            inner.send("ping", [("k", "v")], [("n", 1i64)]).await.unwrap();
        })
        .await;

        assert_eq!(obs.capture().get("ping")[0].tags["user"], "bob");
    }
}
