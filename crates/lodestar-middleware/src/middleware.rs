//! The middleware trait.
//!
//! Lodestar middleware is not an onion. A handler names the middleware it
//! wants to run before and after itself, and the dispatcher calls each one in
//! declared order with the live request and response. A middleware signals
//! failure by returning an error; it never calls the next stage itself.
//!
//! ```text
//! before[0] → before[1] → handler → after[0] → after[1]
//!     │           │          │
//!     └───────────┴──────────┴──→ error translator (remaining stages skipped)
//! ```

use std::fmt;
use std::future::Future;

use lodestar_core::{BoxFuture, Request, Response};

/// A named callable run before or after a handler.
///
/// # Example
///
/// ```
/// use lodestar_core::{BoxFuture, Request, Response};
/// use lodestar_middleware::Middleware;
///
/// struct NoStore;
///
/// impl Middleware for NoStore {
///     fn name(&self) -> &str {
///         "no_store"
///     }
///
///     fn call<'a>(
///         &'a self,
///         _request: &'a Request,
///         response: &'a Response,
///     ) -> BoxFuture<'a, anyhow::Result<()>> {
///         Box::pin(async move {
///             response.insert_header(
///                 http::header::CACHE_CONTROL,
///                 http::HeaderValue::from_static("no-store"),
///             );
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    /// Name handlers use to reference this middleware.
    fn name(&self) -> &str;

    /// Runs the middleware against one request.
    fn call<'a>(
        &'a self,
        request: &'a Request,
        response: &'a Response,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Middleware built from a closure.
///
/// The closure receives owned clones of the carriers. Both are cheap handles
/// over shared state, so writes to the response are visible to later stages.
///
/// ```
/// use lodestar_middleware::FnMiddleware;
///
/// let audit = FnMiddleware::new("audit", |request, _response| async move {
///     tracing::info!(path = %request.path(), "audited");
///     Ok(())
/// });
/// # let _ = audit;
/// ```
pub struct FnMiddleware<F> {
    name: String,
    func: F,
}

impl<F, Fut> FnMiddleware<F>
where
    F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    /// Creates a function-based middleware.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").field("name", &self.name).finish()
    }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call<'a>(
        &'a self,
        request: &'a Request,
        response: &'a Response,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin((self.func)(request.clone(), response.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_core::fixtures;

    struct Stamp;

    impl Middleware for Stamp {
        fn name(&self) -> &str {
            "stamp"
        }

        fn call<'a>(
            &'a self,
            _request: &'a Request,
            response: &'a Response,
        ) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async move {
                response.set_body("stamped");
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_trait_middleware_writes_response() {
        let request = fixtures::get("/").build();
        let response = Response::new();

        Stamp.call(&request, &response).await.unwrap();

        assert_eq!(response.body().unwrap(), "stamped");
    }

    #[tokio::test]
    async fn test_fn_middleware_sees_shared_response() {
        let middleware = FnMiddleware::new("teapot", |_request, response| async move {
            response.set_status(http::StatusCode::IM_A_TEAPOT);
            Ok(())
        });
        let request = fixtures::get("/").build();
        let response = Response::new();

        middleware.call(&request, &response).await.unwrap();

        assert_eq!(middleware.name(), "teapot");
        assert_eq!(response.status(), http::StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_fn_middleware_propagates_error() {
        let middleware = FnMiddleware::new("fails", |_request, _response| async {
            Err(anyhow::anyhow!("nope"))
        });
        let request = fixtures::get("/").build();

        let err = middleware.call(&request, &Response::new()).await.unwrap_err();

        assert_eq!(err.to_string(), "nope");
    }
}
