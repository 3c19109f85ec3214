//! # Controller Module
//!
//! Controllers are objects whose operations become routes by name alone.
//!
//! ## Defining a controller
//!
//! The `#[controller]` attribute scans an inherent impl block for
//! `handle_*` methods and implements [`Controller`] for the type:
//!
//! ```rust,ignore
//! use convroute::prelude::*;
//!
//! struct UserController;
//!
//! #[controller]
//! impl UserController {
//!     // GET /user
//!     fn handle_get_index(&self, ctx: &mut RequestContext) -> HandlerResult {
//!         ctx.ok(&json!([]))
//!     }
//!
//!     // GET /user/:id
//!     #[route(response = User)]
//!     fn handle_get_user_by_id(&self, ctx: &mut RequestContext) -> HandlerResult {
//!         let id = ctx.param_or_empty("id").to_string();
//!         ctx.ok(&json!({ "id": id }))
//!     }
//! }
//! ```
//!
//! Each method surfaces as an [`Operation`] carrying its canonical
//! `Handle<Verb><Action>` identifier and a closure that invokes it.
//!
//! ## Registration
//!
//! [`ControllerRegistrar`] walks the operations once, derives method and path
//! through the naming convention, records each route in the route table and
//! binds it in the dispatcher with the controller's middleware. The result is
//! a [`ControllerDescriptor`].
//!
//! [`ControllerGroup`] registers several controllers under a shared prefix
//! and middleware list. Group middleware is appended to each controller's own
//! list when the controller is added, so only middleware added to the group
//! before a controller applies to it.
//!
//! Registering the same controller again overwrites its routes in place.

mod core;
mod group;
mod registrar;

pub use core::{Controller, ControllerDescriptor, Operation};
pub use group::ControllerGroup;
pub use registrar::ControllerRegistrar;
