//! Type-keyed service registry layered onto the app as axum extensions.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::{Extension, Router};

type Layerer = fn(&Arc<dyn Any + Send + Sync>, Router) -> Router;

#[derive(Clone)]
struct Registration {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    layer: Layerer,
}

fn layer_extension<T: Clone + Send + Sync + 'static>(
    value: &Arc<dyn Any + Send + Sync>,
    router: Router,
) -> Router {
    match value.downcast_ref::<T>() {
        Some(value) => router.layer(Extension(value.clone())),
        None => router,
    }
}

/// Services available to the application under test.
///
/// Each type is registered at most once; registering a type again replaces
/// the earlier value. Handlers receive services through `Extension<T>`.
#[derive(Clone, Default)]
pub struct ServiceCollection {
    registrations: HashMap<TypeId, Registration>,
}

impl ServiceCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service, replacing any existing service of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.registrations.insert(
            TypeId::of::<T>(),
            Registration {
                type_name: std::any::type_name::<T>(),
                value: Arc::new(value),
                layer: layer_extension::<T>,
            },
        );
        self
    }

    /// Resolve a clone of a registered service.
    #[must_use]
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.registrations
            .get(&TypeId::of::<T>())
            .and_then(|registration| registration.value.downcast_ref::<T>())
            .cloned()
    }

    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.registrations.contains_key(&TypeId::of::<T>())
    }

    pub fn remove<T: 'static>(&mut self) -> bool {
        self.registrations.remove(&TypeId::of::<T>()).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Copy every registration from `other`, which wins on conflicts.
    pub fn merge(&mut self, other: &Self) {
        for (type_id, registration) in &other.registrations {
            self.registrations.insert(*type_id, registration.clone());
        }
    }

    /// Layer every registered service onto the router as an extension.
    #[must_use]
    pub fn apply(&self, router: Router) -> Router {
        self.registrations
            .values()
            .fold(router, |router, registration| {
                (registration.layer)(&registration.value, router)
            })
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self
            .registrations
            .values()
            .map(|registration| registration.type_name)
            .collect();
        names.sort_unstable();
        f.debug_struct("ServiceCollection")
            .field("services", &names)
            .finish()
    }
}
