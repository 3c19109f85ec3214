use std::sync::Arc;

use arc_swap::ArcSwap;
use http::Method;
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::config::RoutesFileConfig;
use crate::context::{AppServices, HandlerResponse, IncomingRequest};
use crate::controller::{Controller, ControllerDescriptor, ControllerGroup, ControllerRegistrar};
use crate::dispatcher::Dispatcher;
use crate::generator;
use crate::pipeline::{Handler, MiddlewareRef};
use crate::router::{Route, RouteKey, RouteTable};
use crate::schema::{Describe, TypeDescriptor};

/// Process-scoped routing state: the route table, controller descriptors and
/// the dispatcher, plus the services handed to every request.
///
/// Created once per application and shared by reference (or `Arc`) with the
/// transport layer. All registration goes through a single mutex; request
/// handling only reads.
pub struct RoutingContext {
    table: RwLock<RouteTable>,
    descriptors: RwLock<Vec<ControllerDescriptor>>,
    dispatcher: Dispatcher,
    services: ArcSwap<AppServices>,
    registration: Mutex<()>,
    routes_file: RoutesFileConfig,
}

impl Default for RoutingContext {
    fn default() -> Self {
        Self::new(AppServices::default())
    }
}

impl RoutingContext {
    pub fn new(services: AppServices) -> Self {
        let routes_file = services.config().routes_file.clone();
        Self {
            table: RwLock::new(RouteTable::new()),
            descriptors: RwLock::new(Vec::new()),
            dispatcher: Dispatcher::new(),
            services: ArcSwap::from_pointee(services),
            registration: Mutex::new(()),
            routes_file,
        }
    }

    /// Register a controller at its conventional base path.
    pub fn register_controller(&self, controller: Arc<dyn Controller>) -> ControllerDescriptor {
        ControllerRegistrar::new(self).register(controller)
    }

    /// Start a controller group under `prefix`; finish it with
    /// [`ControllerGroup::register`].
    pub fn group(&self, prefix: impl Into<String>) -> ControllerGroup {
        ControllerGroup::new(prefix)
    }

    /// Bind a route explicitly, bypassing the naming convention.
    ///
    /// The handler runs under the global middleware only. An existing route
    /// with the same method and path is overwritten.
    pub fn register_route(
        &self,
        method: Method,
        path: &str,
        description: &str,
        handler: Handler,
    ) -> RouteRef<'_> {
        let _registration = self.lock_registration();
        let owner = format!("manual.{method}");
        let route = Route::new(method, path, owner.as_str(), description);
        let key = route.key();
        self.table_mut().insert_route(route);
        self.dispatcher.bind(key.clone(), &owner, &[], handler);
        info!(route = %key, "Manual route registered");
        self.regenerate_route_file();
        RouteRef { routing: self, key }
    }

    /// Add middleware around every route, including ones already registered.
    pub fn use_middleware(&self, middleware: MiddlewareRef) {
        let _registration = self.lock_registration();
        self.dispatcher.use_middleware(middleware);
    }

    /// Read access to the route table.
    pub fn routes(&self) -> RwLockReadGuard<'_, RouteTable> {
        self.table.read()
    }

    /// Descriptor of the most recent registration of `type_name`.
    pub fn descriptor(&self, type_name: &str) -> Option<ControllerDescriptor> {
        self.descriptors
            .read()
            .iter()
            .rev()
            .find(|d| d.type_name == type_name)
            .cloned()
    }

    pub fn descriptors(&self) -> Vec<ControllerDescriptor> {
        self.descriptors.read().clone()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn services(&self) -> Arc<AppServices> {
        self.services.load_full()
    }

    /// Replace the services seen by requests that start after this call.
    pub fn set_services(&self, services: AppServices) {
        self.services.store(Arc::new(services));
    }

    pub fn dispatch(&self, request: IncomingRequest) -> HandlerResponse {
        self.dispatcher.dispatch(request, self.services.load_full())
    }

    pub(crate) fn lock_registration(&self) -> MutexGuard<'_, ()> {
        self.registration.lock()
    }

    pub(crate) fn table_mut(&self) -> RwLockWriteGuard<'_, RouteTable> {
        self.table.write()
    }

    /// Replace the descriptor for the same controller at the same base path,
    /// or append a new one.
    pub(crate) fn install_descriptor(&self, descriptor: ControllerDescriptor) {
        let mut descriptors = self.descriptors.write();
        match descriptors
            .iter_mut()
            .find(|d| d.type_name == descriptor.type_name && d.base_path == descriptor.base_path)
        {
            Some(existing) => *existing = descriptor,
            None => descriptors.push(descriptor),
        }
    }

    /// Rewrite the route listing when enabled. Failures are logged only.
    pub(crate) fn regenerate_route_file(&self) {
        if !self.routes_file.enabled {
            return;
        }
        let table = self.table.read();
        match generator::write_route_file(&table, &self.routes_file.output_dir) {
            Ok(path) => debug!(path = %path.display(), routes = table.len(), "Route file regenerated"),
            Err(err) => warn!(
                dir = %self.routes_file.output_dir.display(),
                error = %err,
                "Failed to regenerate route file"
            ),
        }
    }

    fn update_route(&self, key: &RouteKey, f: impl FnOnce(&mut Route)) {
        let _registration = self.lock_registration();
        match self.table_mut().get_mut(key) {
            Some(route) => f(route),
            None => warn!(route = %key, "Route metadata update for unknown route"),
        }
        self.regenerate_route_file();
    }
}

/// Handle returned by [`RoutingContext::register_route`] for fluent metadata.
pub struct RouteRef<'a> {
    routing: &'a RoutingContext,
    key: RouteKey,
}

impl RouteRef<'_> {
    pub fn key(&self) -> &RouteKey {
        &self.key
    }

    pub fn set_name(self, name: &str) -> Self {
        self.routing.update_route(&self.key, |route| {
            route.set_name(name);
        });
        self
    }

    pub fn set_request_type(self, descriptor: TypeDescriptor) -> Self {
        self.routing.update_route(&self.key, |route| {
            route.set_request_type(descriptor);
        });
        self
    }

    pub fn set_response_type(self, descriptor: TypeDescriptor) -> Self {
        self.routing.update_route(&self.key, |route| {
            route.set_response_type(descriptor);
        });
        self
    }

    pub fn request<T: Describe>(self) -> Self {
        self.set_request_type(T::describe())
    }

    pub fn response<T: Describe>(self) -> Self {
        self.set_response_type(T::describe())
    }
}
