use std::collections::HashMap;
use std::fmt;

use http::Method;
use tracing::{debug, warn};

use crate::convention::normalize_path;
use crate::schema::TypeDescriptor;

/// Identity of a route: method plus normalized path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub method: Method,
    pub path: String,
}

impl RouteKey {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: normalize_path(path),
        }
    }

    /// Names of the `:param` segments, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.path
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Metadata for one registered route.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub path: String,
    /// `TypeName.Identifier` for controller routes, a free-form label for manual ones.
    pub owner: String,
    pub description: String,
    pub name: Option<String>,
    pub request_type: Option<TypeDescriptor>,
    pub response_type: Option<TypeDescriptor>,
}

impl Route {
    pub fn new(method: Method, path: &str, owner: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            method,
            path: normalize_path(path),
            owner: owner.into(),
            description: description.into(),
            name: None,
            request_type: None,
            response_type: None,
        }
    }

    pub fn key(&self) -> RouteKey {
        RouteKey {
            method: self.method.clone(),
            path: self.path.clone(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    pub fn set_request_type(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.request_type = Some(descriptor);
        self
    }

    pub fn set_response_type(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.response_type = Some(descriptor);
        self
    }
}

/// Insertion-ordered set of routes keyed by `(method, path)`.
///
/// Adding a key that already exists replaces the entry in place, so each key
/// appears once in [`RouteTable::all`] and keeps its original position.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    index: HashMap<RouteKey, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a route. Returns the entry for fluent setters.
    pub fn add(
        &mut self,
        method: Method,
        path: &str,
        owner: impl Into<String>,
        description: impl Into<String>,
    ) -> &mut Route {
        let route = Route::new(method, path, owner, description);
        let slot = self.insert(route).0;
        &mut self.routes[slot]
    }

    /// Insert or overwrite a prepared route. Returns the replaced entry, if any.
    pub fn insert_route(&mut self, route: Route) -> Option<Route> {
        self.insert(route).1
    }

    fn insert(&mut self, route: Route) -> (usize, Option<Route>) {
        let key = route.key();
        match self.index.get(&key) {
            Some(&slot) => {
                let previous = std::mem::replace(&mut self.routes[slot], route);
                if previous.owner == self.routes[slot].owner {
                    debug!(route = %key, owner = %previous.owner, "Route re-registered");
                } else {
                    warn!(
                        route = %key,
                        previous_owner = %previous.owner,
                        owner = %self.routes[slot].owner,
                        "Route collision: later registration wins"
                    );
                }
                (slot, Some(previous))
            }
            None => {
                let slot = self.routes.len();
                self.routes.push(route);
                self.index.insert(key, slot);
                (slot, None)
            }
        }
    }

    pub fn get(&self, key: &RouteKey) -> Option<&Route> {
        self.index.get(key).map(|&slot| &self.routes[slot])
    }

    pub fn get_mut(&mut self, key: &RouteKey) -> Option<&mut Route> {
        match self.index.get(key) {
            Some(&slot) => self.routes.get_mut(slot),
            None => None,
        }
    }

    /// First route, in insertion order, whose name equals `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.name.as_deref() == Some(name))
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Route> {
        self.routes
            .iter_mut()
            .find(|route| route.name.as_deref() == Some(name))
    }

    pub fn remove(&mut self, key: &RouteKey) -> Option<Route> {
        let slot = self.index.remove(key)?;
        let removed = self.routes.remove(slot);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        Some(removed)
    }

    /// All routes in insertion order.
    pub fn all(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
