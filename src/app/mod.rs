//! # Application Module
//!
//! [`RoutingContext`] is the process-scoped registry: route table, controller
//! descriptors, dispatcher and shared services. It is created explicitly and
//! passed to whatever needs it; there is no global instance.
//!
//! [`Application`] wraps a routing context with configuration, default
//! middleware, metrics and the HTTP server:
//!
//! ```rust,ignore
//! let mut app = Application::from_config_file("config.toml")?;
//! app.enable_metrics();
//! app.register_controller(Arc::new(HelloController));
//! app.group("/api")
//!     .use_middleware(Arc::new(AuthMiddleware::new()))
//!     .add(Arc::new(UserController))
//!     .register(app.routing());
//! let server = app.start()?;
//! server.join().ok();
//! ```

mod application;
mod routing;

pub use application::{Application, ServicesMut};
pub use routing::{RouteRef, RoutingContext};
