//! # Lodestar Middleware
//!
//! Named middleware and error translation for the Lodestar dispatcher.
//!
//! Handlers reference middleware by name. The [`MiddlewareRegistry`] resolves
//! those names and runs them in declared order around the handler:
//!
//! ```text
//! access → CSRF → before[..] → handler → after[..]
//!    │        │        │           │          │
//!    └────────┴────────┴───────────┴──────────┴──→ ErrorTranslator → ErrorSink
//! ```
//!
//! Any stage that fails hands a `DispatchError` to the [`ErrorTranslator`],
//! which is the single place that decides what the client sees. The full
//! cause goes to an [`ErrorSink`] (by default, `tracing`); the client gets a
//! status, a fixed message and the request id.
//!
//! ## Example
//!
//! ```
//! use lodestar_core::{fixtures, MiddlewarePhase, Response};
//! use lodestar_middleware::{FnMiddleware, MiddlewareRegistry};
//!
//! # tokio_test::block_on(async {
//! let registry = MiddlewareRegistry::new()
//!     .with(FnMiddleware::new("no_cache", |_request, response: Response| async move {
//!         response.insert_header(
//!             http::header::CACHE_CONTROL,
//!             http::HeaderValue::from_static("no-cache"),
//!         );
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let request = fixtures::get("/").build();
//! let response = Response::new();
//! registry
//!     .run(&["no_cache".to_string()], MiddlewarePhase::After, &request, &response)
//!     .await
//!     .unwrap();
//!
//! assert_eq!(response.header(http::header::CACHE_CONTROL).as_deref(), Some("no-cache"));
//! # });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod middleware;
mod record;
mod registry;
pub mod translator;

pub use error::MiddlewareError;
pub use middleware::{FnMiddleware, Middleware};
pub use record::{ErrorRecord, ErrorSink, FanoutSink, RecordingSink, TracingSink};
pub use registry::MiddlewareRegistry;
pub use translator::{ErrorEnvelope, ErrorDetail, ErrorTranslator, TranslatorConfig};
