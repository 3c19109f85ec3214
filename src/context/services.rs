use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::auth::Authenticator;
use crate::config::AppConfig;

/// Shared application services visible to every request.
///
/// Cloning is cheap: every entry is reference counted.
#[derive(Clone, Default)]
pub struct AppServices {
    config: Arc<AppConfig>,
    authenticator: Option<Arc<dyn Authenticator>>,
    extensions: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl AppServices {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            ..Self::default()
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn authenticator(&self) -> Option<&Arc<dyn Authenticator>> {
        self.authenticator.as_ref()
    }

    pub fn set_authenticator(&mut self, authenticator: Arc<dyn Authenticator>) {
        self.authenticator = Some(authenticator);
    }

    /// Register a typed service, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.extensions.insert(TypeId::of::<T>(), value);
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| Arc::clone(v).downcast::<T>().ok())
    }
}

impl fmt::Debug for AppServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppServices")
            .field("config", &self.config)
            .field("authenticator", &self.authenticator.is_some())
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Database {
        url: String,
    }

    #[test]
    fn test_typed_lookup() {
        let mut services = AppServices::default();
        services.insert(Arc::new(Database {
            url: "postgres://localhost".into(),
        }));
        let db = services.get::<Database>().unwrap();
        assert_eq!(db.url, "postgres://localhost");
        assert!(services.get::<String>().is_none());
    }
}
