//! Controllers and their factories.
//!
//! A controller is any value that can list its handlers. The loader never
//! builds controllers directly: it is given [`ControllerDef`]s, each a name
//! plus a factory that receives the dependency resolver. A factory that fails
//! only takes its own controller down.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use lodestar_core::{handler_method, Args, Reply};
//! use lodestar_server::{Controller, ControllerDef, HandlerDescriptor};
//!
//! struct Pages {
//!     title: String,
//! }
//!
//! impl Pages {
//!     async fn home(self: Arc<Self>, _args: Args) -> anyhow::Result<Reply> {
//!         Ok(Reply::Html(format!("<h1>{}</h1>", self.title)))
//!     }
//! }
//!
//! impl Controller for Pages {
//!     fn handlers(self: Arc<Self>) -> Vec<HandlerDescriptor> {
//!         vec![HandlerDescriptor::new("home", handler_method(&self, Pages::home))
//!             .get("/")
//!             .named("home")]
//!     }
//! }
//!
//! let def = ControllerDef::new("Pages", |_resolver| {
//!     Ok(Pages { title: "Welcome".into() })
//! });
//! assert_eq!(def.name(), "Pages");
//! ```

use std::fmt;
use std::sync::Arc;

use lodestar_core::Resolver;

use crate::descriptor::HandlerDescriptor;

/// A unit that exposes handlers.
pub trait Controller: Send + Sync + 'static {
    /// Lists the controller's handlers.
    fn handlers(self: Arc<Self>) -> Vec<HandlerDescriptor>;
}

/// Builds a controller and lists its handlers.
pub type ControllerFactory =
    Arc<dyn Fn(&dyn Resolver) -> anyhow::Result<Vec<HandlerDescriptor>> + Send + Sync>;

/// A named controller factory handed to the loader.
#[derive(Clone)]
pub struct ControllerDef {
    name: String,
    factory: ControllerFactory,
}

impl ControllerDef {
    /// Wraps a factory producing a [`Controller`].
    pub fn new<C, F>(name: impl Into<String>, factory: F) -> Self
    where
        C: Controller,
        F: Fn(&dyn Resolver) -> anyhow::Result<C> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(move |resolver| {
                let controller = Arc::new(factory(resolver)?);
                Ok(controller.handlers())
            }),
        }
    }

    /// Wraps a factory that lists handlers directly.
    pub fn from_fn<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&dyn Resolver) -> anyhow::Result<Vec<HandlerDescriptor>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// Controller name, used to qualify handler names.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the factory.
    pub fn instantiate(&self, resolver: &dyn Resolver) -> anyhow::Result<Vec<HandlerDescriptor>> {
        (self.factory)(resolver)
    }
}

impl fmt::Debug for ControllerDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDef")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_core::{handler_method, Args, Container, ResolverExt, Reply};

    struct Greeting(&'static str);

    struct Hello {
        greeting: Arc<Greeting>,
    }

    impl Hello {
        async fn hello(self: Arc<Self>, _args: Args) -> anyhow::Result<Reply> {
            Ok(Reply::Text(self.greeting.0.to_string()))
        }
    }

    impl Controller for Hello {
        fn handlers(self: Arc<Self>) -> Vec<HandlerDescriptor> {
            vec![HandlerDescriptor::new("hello", handler_method(&self, Hello::hello)).get("/hello")]
        }
    }

    fn hello_def() -> ControllerDef {
        ControllerDef::new("Hello", |resolver: &dyn Resolver| {
            let greeting = resolver.require::<Greeting>()?;
            Ok(Hello { greeting })
        })
    }

    #[tokio::test]
    async fn test_factory_pulls_dependencies() {
        let container = Container::new().with(Arc::new(Greeting("hi")));
        let handlers = hello_def().instantiate(&container).unwrap();

        assert_eq!(handlers.len(), 1);
        let reply = (handlers[0].handler())(Args::default()).await.unwrap();
        assert_eq!(reply, Reply::Text("hi".into()));
    }

    #[test]
    fn test_factory_failure_is_returned() {
        let err = hello_def().instantiate(&Container::new()).unwrap_err();
        assert!(err.to_string().contains("Greeting"));
    }

    #[test]
    fn test_from_fn() {
        let def = ControllerDef::from_fn("Empty", |_| Ok(Vec::new()));
        assert!(def.instantiate(&Container::new()).unwrap().is_empty());
    }
}
