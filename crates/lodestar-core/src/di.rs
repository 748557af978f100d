//! Dependency lookup.
//!
//! The dispatcher treats dependency resolution as a capability: given a
//! [`ServiceKey`], produce an instance or fail with an [`InjectionError`].
//! [`Container`] is the stock implementation; applications with their own
//! container implement [`Resolver`] for it.
//!
//! # Example
//!
//! ```rust
//! use lodestar_core::di::{Container, ResolverExt};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let mut container = Container::new();
//! container.register(Arc::new(Database { url: "postgres://localhost/app".into() }));
//!
//! let db: Arc<Database> = container.require().unwrap();
//! assert_eq!(db.url, "postgres://localhost/app");
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use thiserror::Error;

/// A type-erased service instance.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Identifies a service type.
///
/// Equality and hashing use the [`TypeId`] only; the name is kept for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct ServiceKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl ServiceKey {
    /// Key for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The [`TypeId`] of the keyed type.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The keyed type's name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// A dependency could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to resolve {type_name}: {reason}")]
pub struct InjectionError {
    /// The type that could not be resolved.
    pub type_name: &'static str,
    /// Why resolution failed.
    pub reason: String,
}

impl InjectionError {
    /// Error for a type nothing was registered for.
    #[must_use]
    pub fn not_registered(key: &ServiceKey) -> Self {
        Self {
            type_name: key.type_name(),
            reason: "service not registered".to_string(),
        }
    }

    /// Error with a custom reason.
    #[must_use]
    pub fn custom(key: &ServiceKey, reason: impl Into<String>) -> Self {
        Self {
            type_name: key.type_name(),
            reason: reason.into(),
        }
    }
}

/// The `resolve(type) -> instance` capability.
pub trait Resolver: Send + Sync {
    /// Resolves the service registered for `key`.
    fn resolve_key(&self, key: &ServiceKey) -> Result<Service, InjectionError>;
}

/// Typed helpers over any [`Resolver`].
pub trait ResolverExt: Resolver {
    /// Resolves `T` or fails.
    fn require<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectionError> {
        let key = ServiceKey::of::<T>();
        self.resolve_key(&key)?
            .downcast::<T>()
            .map_err(|_| InjectionError::custom(&key, "registered instance has another type"))
    }
}

impl<R: Resolver + ?Sized> ResolverExt for R {}

/// A type-keyed service container.
///
/// Services are registered once while the application is assembled and then
/// shared read-only across requests.
#[derive(Default)]
pub struct Container {
    services: HashMap<TypeId, Service>,
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service` under its own type, replacing any previous one.
    pub fn register<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.register(service);
        self
    }

    /// Returns the service for `T`, if registered.
    #[must_use]
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|s| Arc::clone(s).downcast::<T>().ok())
    }

    /// Returns true if `T` is registered.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Resolver for Container {
    fn resolve_key(&self, key: &ServiceKey) -> Result<Service, InjectionError> {
        self.services
            .get(&key.type_id())
            .cloned()
            .ok_or_else(|| InjectionError::not_registered(key))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.services.len())
            .finish()
    }
}
