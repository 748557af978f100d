//! The per-request pipeline.
//!
//! ```text
//! request ─► access check ─► route lookup ─┬─► 404 / 405
//!                 │                        │
//!                 ▼                        ▼
//!              denied              CSRF (if declared)
//!                 │                        │
//!                 │                before middleware
//!                 │                        │
//!                 │             bind params ─► handler
//!                 │                        │
//!                 │                 after middleware
//!                 │                        │
//!                 └──────► translator ◄────┘ (on any failure)
//! ```
//!
//! Every stage returns a `Result`; the first `Err` ends the pipeline and is
//! handed to the [`ErrorTranslator`]. After-middleware runs only when the
//! handler completed. The access check runs for every request path, routed
//! or not, so a guarded prefix answers 401/403 rather than 404.

use std::fmt;
use std::sync::Arc;

use http::header::ALLOW;
use http::{HeaderValue, StatusCode};
use lodestar_authz::{AccessChecker, CsrfValidator, PrincipalResolver};
use lodestar_core::{
    Args, DispatchError, InvocationFailure, MiddlewarePhase, Request, Resolver, Response,
    Session,
};
use lodestar_middleware::translator::{wants_html, write_status};
use lodestar_middleware::{ErrorTranslator, MiddlewareRegistry};
use lodestar_telemetry::metrics::{self, DispatchTimer};

use crate::hub::RouteHub;
use crate::routing::{HandlerBinding, Resolved};

const UNMATCHED_ROUTE: &str = "<unmatched>";

/// Access to the session's CSRF token, attached to every request that has a
/// session.
///
/// Handlers rendering forms read it with `request.extension::<CsrfToken>()`.
/// The token is generated on the first call to [`CsrfToken::value`], so
/// requests that never render a form leave the session untouched.
#[derive(Clone)]
pub struct CsrfToken {
    session: Arc<dyn Session>,
    validator: Arc<CsrfValidator>,
}

impl CsrfToken {
    /// The session's token, generated if it has none yet.
    #[must_use]
    pub fn value(&self) -> String {
        self.validator.ensure_token(self.session.as_ref())
    }

    /// Form field the token is expected under.
    #[must_use]
    pub fn form_field(&self) -> &str {
        self.validator.form_field()
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfToken")
            .field("session", &self.session.id())
            .finish_non_exhaustive()
    }
}

/// Runs requests through access control, CSRF, middleware and handlers.
pub struct Dispatcher {
    hub: Arc<RouteHub>,
    resolver: Arc<dyn Resolver>,
    access: AccessChecker,
    csrf: Arc<CsrfValidator>,
    middleware: Arc<MiddlewareRegistry>,
    translator: ErrorTranslator,
}

impl Dispatcher {
    /// Starts a dispatcher over `hub`, resolving handler services through `resolver`.
    #[must_use]
    pub fn builder(hub: Arc<RouteHub>, resolver: Arc<dyn Resolver>) -> DispatcherBuilder {
        DispatcherBuilder {
            hub,
            resolver,
            access: AccessChecker::default(),
            csrf: CsrfValidator::default(),
            middleware: Arc::new(MiddlewareRegistry::new()),
            translator: ErrorTranslator::default(),
        }
    }

    /// The route hub.
    #[must_use]
    pub fn hub(&self) -> &Arc<RouteHub> {
        &self.hub
    }

    /// The CSRF validator.
    #[must_use]
    pub fn csrf(&self) -> &CsrfValidator {
        &self.csrf
    }

    /// Dispatches one request and returns its response.
    ///
    /// Never fails: every error has been translated into the response.
    pub async fn dispatch(&self, request: Request) -> Response {
        let timer = DispatchTimer::start();
        let response = Response::new();
        let table = self.hub.snapshot();

        if let Some(session) = request.session() {
            request.insert_extension(CsrfToken {
                session: Arc::clone(session),
                validator: Arc::clone(&self.csrf),
            });
        }

        let request = match self.access.authorize(table.policy(), request.clone()) {
            Ok(request) => request,
            Err(err) => {
                self.fail(err, None, &request, &response);
                timer.finish(UNMATCHED_ROUTE, response.status().as_u16());
                return response;
            }
        };

        let (route, binding, params) = match table.resolve(request.method(), request.path()) {
            Resolved::Matched(found) => (
                found.route.path().to_string(),
                Arc::clone(found.binding),
                found.params,
            ),
            Resolved::MethodNotAllowed(allowed) => {
                let allow = allowed
                    .iter()
                    .map(http::Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                let html = wants_html(&request, &response);
                write_status(StatusCode::METHOD_NOT_ALLOWED, html, &request, &response);
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.insert_header(ALLOW, value);
                }
                timer.finish(UNMATCHED_ROUTE, response.status().as_u16());
                return response;
            }
            Resolved::NotFound => {
                tracing::debug!(
                    request_id = %request.id(),
                    method = %request.method(),
                    path = %request.path(),
                    "No route matched"
                );
                let html = wants_html(&request, &response);
                write_status(StatusCode::NOT_FOUND, html, &request, &response);
                timer.finish(UNMATCHED_ROUTE, response.status().as_u16());
                return response;
            }
        };
        drop(table);

        let request = request.with_params(params);
        if let Err(err) = self.run(&binding, &request, &response).await {
            self.fail(err, Some(binding.handler()), &request, &response);
        }

        timer.finish(&route, response.status().as_u16());
        response
    }

    async fn run(
        &self,
        binding: &HandlerBinding,
        request: &Request,
        response: &Response,
    ) -> Result<(), DispatchError> {
        if binding.csrf() && !self.csrf.validate(request) {
            tracing::warn!(
                request_id = %request.id(),
                path = %request.path(),
                handler = %binding.handler(),
                "CSRF validation failed for {}",
                binding.handler()
            );
            response.set_status(StatusCode::FORBIDDEN);
            return Err(DispatchError::Csrf {
                handler: binding.handler().to_string(),
            });
        }

        self.middleware
            .run(binding.before(), MiddlewarePhase::Before, request, response)
            .await?;

        let args = Args::bind(binding.params(), request, response, self.resolver.as_ref())?;
        let reply = (binding.func())(args)
            .await
            .map_err(|cause| InvocationFailure::new(binding.handler(), cause))?;
        reply.apply(response);

        self.middleware
            .run(binding.after(), MiddlewarePhase::After, request, response)
            .await?;

        tracing::debug!(
            request_id = %request.id(),
            handler = %binding.handler(),
            status = response.status().as_u16(),
            "Request handled"
        );
        Ok(())
    }

    fn fail(&self, error: DispatchError, handler: Option<&str>, request: &Request, response: &Response) {
        let record = self.translator.translate(error, handler, request, response);
        metrics::record_failure(&record.kind.to_string());
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("hub", &self.hub)
            .field("csrf", &self.csrf)
            .field("middleware", &self.middleware)
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Dispatcher`].
#[must_use]
pub struct DispatcherBuilder {
    hub: Arc<RouteHub>,
    resolver: Arc<dyn Resolver>,
    access: AccessChecker,
    csrf: CsrfValidator,
    middleware: Arc<MiddlewareRegistry>,
    translator: ErrorTranslator,
}

impl DispatcherBuilder {
    /// Resolves principals with `resolver`. Defaults to anonymous.
    pub fn principal_resolver(mut self, resolver: Arc<dyn PrincipalResolver>) -> Self {
        self.access = AccessChecker::new(resolver);
        self
    }

    /// Replaces the CSRF validator.
    pub fn csrf(mut self, csrf: CsrfValidator) -> Self {
        self.csrf = csrf;
        self
    }

    /// Uses `registry` for before and after middleware.
    pub fn middleware(mut self, registry: Arc<MiddlewareRegistry>) -> Self {
        self.middleware = registry;
        self
    }

    /// Replaces the error translator.
    pub fn translator(mut self, translator: ErrorTranslator) -> Self {
        self.translator = translator;
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            hub: self.hub,
            resolver: self.resolver,
            access: self.access,
            csrf: Arc::new(self.csrf),
            middleware: self.middleware,
            translator: self.translator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::ACCEPT;
    use http::Method;
    use lodestar_core::{fixtures, handler_fn, Container, ParamSlot, Reply, Session};
    use lodestar_middleware::RecordingSink;

    use crate::controller::ControllerDef;
    use crate::descriptor::HandlerDescriptor;
    use crate::loader::RouteLoader;

    fn dispatcher(sink: &RecordingSink) -> Dispatcher {
        let def = ControllerDef::from_fn("Pages", |_| {
            Ok(vec![
                HandlerDescriptor::new(
                    "show",
                    handler_fn(|args: Args| async move {
                        let request = args.request(0)?;
                        Ok::<_, anyhow::Error>(Reply::Text(format!(
                            "item {}",
                            request.param("id").unwrap_or("?")
                        )))
                    }),
                )
                .get("/items/{id}")
                .param(ParamSlot::Request),
                HandlerDescriptor::new(
                    "token",
                    handler_fn(|args: Args| async move {
                        let request = args.request(0)?;
                        let token = request.extension::<CsrfToken>().map(|t| t.value());
                        Ok::<_, anyhow::Error>(Reply::Text(token.unwrap_or_default()))
                    }),
                )
                .get("/token")
                .param(ParamSlot::Request),
            ])
        });
        let resolver: Arc<dyn Resolver> = Arc::new(Container::new());
        let (hub, _) = RouteHub::new(RouteLoader::new(Arc::clone(&resolver)), vec![def]).unwrap();
        Dispatcher::builder(Arc::new(hub), resolver)
            .translator(ErrorTranslator::default().with_sink(Arc::new(sink.clone())))
            .build()
    }

    #[tokio::test]
    async fn test_path_params_reach_handler() {
        let sink = RecordingSink::new();
        let response = dispatcher(&sink).dispatch(fixtures::get("/items/9").build()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().unwrap(), "item 9");
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let sink = RecordingSink::new();
        let response = dispatcher(&sink).dispatch(fixtures::get("/nope").build()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.content_type().as_deref(), Some("application/json"));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_method_not_allowed_sets_allow() {
        let sink = RecordingSink::new();
        let response = dispatcher(&sink)
            .dispatch(fixtures::request(Method::DELETE, "/items/1").build())
            .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header(ALLOW).as_deref(), Some("GET"));
    }

    #[tokio::test]
    async fn test_not_found_page_for_browsers() {
        let sink = RecordingSink::new();
        let response = dispatcher(&sink)
            .dispatch(fixtures::get("/nope").header(ACCEPT, "text/html").build())
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.content_type().unwrap().contains("html"));
    }

    #[tokio::test]
    async fn test_token_issued_for_sessions() {
        let sink = RecordingSink::new();
        let session = fixtures::session();
        let response = dispatcher(&sink)
            .dispatch(fixtures::get("/token").session(session.clone()).build())
            .await;

        let issued = session.get("csrf_token").unwrap();
        assert_eq!(response.body().unwrap(), issued.as_str());
    }

    #[tokio::test]
    async fn test_token_not_generated_unless_read() {
        let sink = RecordingSink::new();
        let session = fixtures::session();
        dispatcher(&sink)
            .dispatch(fixtures::get("/items/3").session(session.clone()).build())
            .await;

        assert!(session.is_empty());
    }
}
