//! Per-call observation: wrap an async callable and emit one measurement per
//! call, named after the callable.
//!
//! Success emits `success = 1`, failure emits `failure = 1`; either way a
//! `code` tag is added when the output or error exposes one. The wrapped
//! callable's result, including its error, is returned untouched.

use std::any::type_name;
use std::future::Future;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::dispatch::Observability;
use crate::error::ObservabilityError;

/// Successful outputs that carry a status code.
pub trait ObservedOutput {
    fn code(&self) -> Option<u16> {
        None
    }
}

/// Errors that carry a status code.
pub trait ObservedError {
    fn code(&self) -> Option<u16> {
        None
    }
}

impl ObservedOutput for () {}

impl ObservedOutput for Response {
    fn code(&self) -> Option<u16> {
        Some(self.status().as_u16())
    }
}

impl ObservedOutput for StatusCode {
    fn code(&self) -> Option<u16> {
        Some(self.as_u16())
    }
}

impl<T> ObservedOutput for axum::Json<T> {
    fn code(&self) -> Option<u16> {
        Some(StatusCode::OK.as_u16())
    }
}

impl ObservedError for StatusCode {
    fn code(&self) -> Option<u16> {
        Some(self.as_u16())
    }
}

impl ObservedError for ObservabilityError {}

/// Await `fut`, emit its outcome under `name`, return its result unchanged.
pub async fn observe<Fut, T, E>(obs: &Observability, name: &str, fut: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    T: ObservedOutput,
    E: ObservedError,
{
    let result = fut.await;

    let (outcome, code) = match &result {
        Ok(out) => ("success", out.code()),
        Err(err) => ("failure", err.code()),
    };

    let scope = obs.ambient_scope();
    let identity = scope.identity();
    match obs.base_message(name, identity.as_deref()) {
        Ok(mut message) => {
            message.field(outcome, 1i64);
            if let Some(code) = code {
                message.tag("code", code.to_string());
            }
            obs.dispatch(&scope, message).await;
        }
        Err(e) => tracing::warn!(error = %e, "could not build call measurement"),
    }

    result
}

/// Wrap `f` so every call is observed under `name`.
///
/// Only single-argument callables are wrapped. A callable with several
/// arguments takes them as one tuple; for axum handlers a tuple of extractors
/// is itself an extractor, so `|(State(s), Path(id))| ...` wraps as-is.
pub fn observed<A, F, Fut, T, E>(
    obs: Observability,
    name: impl Into<String>,
    f: F,
) -> impl Fn(A) -> BoxFuture<'static, Result<T, E>> + Clone + Send + Sync + 'static
where
    A: Send + 'static,
    F: Fn(A) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: ObservedOutput + Send + 'static,
    E: ObservedError + Send + 'static,
{
    let name: Arc<str> = Arc::from(name.into());
    move |arg: A| {
        let obs = obs.clone();
        let name = name.clone();
        let fut = f(arg);
        let wrapped: BoxFuture<'static, Result<T, E>> =
            Box::pin(async move { observe(&obs, &name, fut).await });
        wrapped
    }
}

/// Like [`observed`], named after the function item itself.
pub fn observed_fn<A, F, Fut, T, E>(
    obs: Observability,
    f: F,
) -> impl Fn(A) -> BoxFuture<'static, Result<T, E>> + Clone + Send + Sync + 'static
where
    A: Send + 'static,
    F: Fn(A) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: ObservedOutput + Send + 'static,
    E: ObservedError + Send + 'static,
{
    observed(obs, callable_name::<F>(), f)
}

/// Last path segment of the callable's type name, e.g. `charge_card`.
pub fn callable_name<F>() -> &'static str {
    let full = type_name::<F>();
    full.rsplit("::").next().unwrap_or(full)
}
