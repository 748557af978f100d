//! Explicit handler bindings.
//!
//! A handler declares its parameters once, at registration, as a list of
//! [`ParamSlot`]s. On each request the dispatcher turns the slots into
//! [`Args`] (the live request, the live response, or a resolved service) and
//! calls the [`HandlerFn`]. The handler's [`Reply`] is then written to the
//! response.
//!
//! # Example
//!
//! ```rust
//! use lodestar_core::{handler_fn, Args, ParamSlot, Reply};
//!
//! let slots = [ParamSlot::Request];
//! let handler = handler_fn(|args: Args| async move {
//!     let request = args.request(0)?;
//!     Ok::<_, anyhow::Error>(Reply::Text(format!("hello from {}", request.path())))
//! });
//! # let _ = (slots, handler);
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use serde::Serialize;
use thiserror::Error;

use crate::context::Request;
use crate::di::{InjectionError, Resolver, Service, ServiceKey};
use crate::response::Response;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased handler body.
pub type HandlerFn = Arc<dyn Fn(Args) -> BoxFuture<'static, anyhow::Result<Reply>> + Send + Sync>;

/// What to bind to one handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSlot {
    /// The live request.
    Request,
    /// The live response.
    Response,
    /// A service resolved through the dependency resolver.
    Resolve(ServiceKey),
}

impl ParamSlot {
    /// Slot resolving `T`.
    #[must_use]
    pub fn service<T: Send + Sync + 'static>() -> Self {
        Self::Resolve(ServiceKey::of::<T>())
    }
}

/// One bound argument.
#[derive(Clone)]
pub enum Arg {
    /// The live request.
    Request(Request),
    /// The live response.
    Response(Response),
    /// A resolved service.
    Service(ServiceKey, Service),
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(request) => f.debug_tuple("Request").field(&request.id()).finish(),
            Self::Response(_) => f.write_str("Response"),
            Self::Service(key, _) => f.debug_tuple("Service").field(key).finish(),
        }
    }
}

/// An argument was asked for at the wrong position or with the wrong type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    /// Fewer arguments were bound than the handler reads.
    #[error("no argument bound at position {0}")]
    Missing(usize),
    /// The argument at this position has another type.
    #[error("argument {index} is not {expected}")]
    Mismatch {
        /// Position.
        index: usize,
        /// What the handler asked for.
        expected: &'static str,
    },
}

/// Arguments bound for one handler call, in slot order.
#[derive(Debug, Clone, Default)]
pub struct Args {
    args: Vec<Arg>,
}

impl Args {
    /// Binds `slots` against the live request, response and resolver.
    ///
    /// # Errors
    ///
    /// Fails with the resolver's error for the first service it cannot resolve.
    pub fn bind(
        slots: &[ParamSlot],
        request: &Request,
        response: &Response,
        resolver: &dyn Resolver,
    ) -> Result<Self, InjectionError> {
        let args = slots
            .iter()
            .map(|slot| match slot {
                ParamSlot::Request => Ok(Arg::Request(request.clone())),
                ParamSlot::Response => Ok(Arg::Response(response.clone())),
                ParamSlot::Resolve(key) => resolver
                    .resolve_key(key)
                    .map(|service| Arg::Service(*key, service)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { args })
    }

    /// Wraps already-bound arguments.
    #[must_use]
    pub fn from_args(args: Vec<Arg>) -> Self {
        Self { args }
    }

    fn at(&self, index: usize) -> Result<&Arg, ArgError> {
        self.args.get(index).ok_or(ArgError::Missing(index))
    }

    /// The request bound at `index`.
    pub fn request(&self, index: usize) -> Result<Request, ArgError> {
        match self.at(index)? {
            Arg::Request(request) => Ok(request.clone()),
            _ => Err(ArgError::Mismatch {
                index,
                expected: "the request",
            }),
        }
    }

    /// The response bound at `index`.
    pub fn response(&self, index: usize) -> Result<Response, ArgError> {
        match self.at(index)? {
            Arg::Response(response) => Ok(response.clone()),
            _ => Err(ArgError::Mismatch {
                index,
                expected: "the response",
            }),
        }
    }

    /// The service of type `T` bound at `index`.
    pub fn service<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, ArgError> {
        let mismatch = ArgError::Mismatch {
            index,
            expected: std::any::type_name::<T>(),
        };
        match self.at(index)? {
            Arg::Service(_, service) => Arc::clone(service)
                .downcast::<T>()
                .map_err(|_: Arc<dyn Any + Send + Sync>| mismatch),
            _ => Err(mismatch),
        }
    }

    /// Number of bound arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns true when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// What a handler hands back to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The handler wrote the response itself, or there is nothing to send.
    Empty,
    /// Plain text.
    Text(String),
    /// Rendered HTML.
    Html(String),
    /// A JSON document.
    Json(serde_json::Value),
}

impl Reply {
    /// Serializes `value` as a JSON reply.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Json)
    }

    /// Writes the reply into `response`.
    ///
    /// A content type already chosen by the handler is kept.
    pub fn apply(self, response: &Response) {
        let (mime, body) = match self {
            Self::Empty => return,
            Self::Text(text) => ("text/plain; charset=utf-8", text),
            Self::Html(html) => ("text/html; charset=utf-8", html),
            Self::Json(value) => ("application/json", value.to_string()),
        };
        if response.header(CONTENT_TYPE).is_none() {
            response.set_content_type(mime);
        }
        response.set_body(body);
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Erases an async closure into a [`HandlerFn`].
pub fn handler_fn<F, Fut, R>(f: F) -> HandlerFn
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: Into<Reply>,
{
    Arc::new(move |args| {
        let fut = f(args);
        Box::pin(async move { fut.await.map(Into::into) })
    })
}

/// Binds a method taking `self: Arc<C>` into a [`HandlerFn`].
///
/// ```rust
/// use std::sync::Arc;
/// use lodestar_core::{handler_method, Args, Reply};
///
/// struct Pages;
///
/// impl Pages {
///     async fn about(self: Arc<Self>, _args: Args) -> anyhow::Result<Reply> {
///         Ok(Reply::Html("<h1>About</h1>".into()))
///     }
/// }
///
/// let pages = Arc::new(Pages);
/// let handler = handler_method(&pages, Pages::about);
/// # let _ = handler;
/// ```
pub fn handler_method<C, F, Fut, R>(controller: &Arc<C>, f: F) -> HandlerFn
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: Into<Reply>,
{
    let controller = Arc::clone(controller);
    handler_fn(move |args| f(Arc::clone(&controller), args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::Container;
    use http::{Method, Uri};

    struct Greeter(&'static str);

    fn request() -> Request {
        Request::builder(Method::GET, Uri::from_static("/hi")).build()
    }

    #[test]
    fn test_bind_slots_in_order() {
        let container = Container::new().with(Arc::new(Greeter("hey")));
        let slots = [
            ParamSlot::Response,
            ParamSlot::service::<Greeter>(),
            ParamSlot::Request,
        ];
        let args = Args::bind(&slots, &request(), &Response::new(), &container).unwrap();

        assert_eq!(args.len(), 3);
        assert!(args.response(0).is_ok());
        assert_eq!(args.service::<Greeter>(1).unwrap().0, "hey");
        assert_eq!(args.request(2).unwrap().path(), "/hi");
    }

    #[test]
    fn test_bind_fails_for_unknown_service() {
        let err = Args::bind(
            &[ParamSlot::service::<Greeter>()],
            &request(),
            &Response::new(),
            &Container::new(),
        )
        .unwrap_err();
        assert!(err.type_name.ends_with("Greeter"));
    }

    #[test]
    fn test_arg_errors() {
        let args = Args::bind(
            &[ParamSlot::Request],
            &request(),
            &Response::new(),
            &Container::new(),
        )
        .unwrap();
        assert_eq!(
            args.response(0).err(),
            Some(ArgError::Mismatch {
                index: 0,
                expected: "the response"
            })
        );
        assert_eq!(args.request(4).err().unwrap(), ArgError::Missing(4));
        assert!(args.service::<Greeter>(0).is_err());
    }

    #[test]
    fn test_reply_apply_sets_type_and_body() {
        let response = Response::new();
        Reply::json(&serde_json::json!({"ok": true})).unwrap().apply(&response);
        assert_eq!(response.content_type().as_deref(), Some("application/json"));
        assert_eq!(response.body().as_deref(), Some(&br#"{"ok":true}"#[..]));
    }

    #[test]
    fn test_reply_apply_keeps_handler_content_type() {
        let response = Response::new();
        response.set_content_type("text/csv");
        Reply::from("a,b").apply(&response);
        assert_eq!(response.content_type().as_deref(), Some("text/csv"));
    }

    #[test]
    fn test_empty_reply_leaves_response_alone() {
        let response = Response::new();
        response.set_body("written by handler");
        Reply::from(()).apply(&response);
        assert_eq!(response.body().as_deref(), Some(&b"written by handler"[..]));
    }

    #[tokio::test]
    async fn test_handler_fn_converts_reply() {
        let handler = handler_fn(|_args: Args| async { Ok::<_, anyhow::Error>("done") });
        let reply = handler(Args::default()).await.unwrap();
        assert_eq!(reply, Reply::Text("done".into()));
    }

    #[tokio::test]
    async fn test_handler_method_shares_controller() {
        struct Counter(std::sync::atomic::AtomicUsize);

        impl Counter {
            async fn bump(self: Arc<Self>, _args: Args) -> anyhow::Result<Reply> {
                let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                Ok(Reply::Text(n.to_string()))
            }
        }

        let counter = Arc::new(Counter(std::sync::atomic::AtomicUsize::new(0)));
        let handler = handler_method(&counter, Counter::bump);
        handler(Args::default()).await.unwrap();
        let reply = handler(Args::default()).await.unwrap();
        assert_eq!(reply, Reply::Text("2".into()));
    }
}
