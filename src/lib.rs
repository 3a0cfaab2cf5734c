//! # graft-di
//!
//! Child dependency-injection containers for composing isolated service
//! graphs against a shared parent.
//!
//! A child container exists on its own, with its own registrations. Two
//! bridges connect it to its parent:
//!
//! - **Import**: make a parent-owned service resolvable inside the child's
//!   own resolution graph.
//! - **Forward**: expose a child-owned service to the parent, so the parent
//!   resolves it as if it were native.
//!
//! ## Features
//!
//! - **Lazy**: declaring a child container materializes nothing; the child
//!   provider is built on the first resolution of a forwarded service, at
//!   most once, even under concurrent first use.
//! - **Lifetime-aware**: singleton, scoped, and transient services keep
//!   their semantics across the container boundary; scoped imports see the
//!   parent scope that initiated the resolution, singleton and transient
//!   imports always see the parent's root provider.
//! - **Cycle-safe**: resolution chains that loop back across the boundary
//!   (A in the parent needs B in a child needs A again) fail fast with a
//!   [`CircularDependency`] carrying the complete loop, instead of
//!   recursing forever.
//! - **Logging bridge**: import the parent's [`LoggerFactory`] so
//!   child-resolved loggers delegate to the parent's sinks per category.
//!
//! ## Example
//!
//! ```
//! use graft_di::ServiceCollection;
//!
//! struct Secret(&'static str);
//! struct Greeting(String);
//!
//! let mut services = ServiceCollection::new();
//! services.add_instance(Secret("hunter2"));
//! services
//!     .add_child_container(|child, _parent| {
//!         child.add_singleton(|provider| {
//!             let secret = provider.resolve::<Secret>()?;
//!             Ok(Greeting(format!("hello, {}", secret.0)))
//!         });
//!     })
//!     .import_singleton::<Secret>()
//!     .forward_singleton::<Greeting>();
//!
//! let provider = services.build();
//! let greeting = provider.resolve::<Greeting>().unwrap();
//! assert_eq!(greeting.0, "hello, hunter2");
//! ```

mod builder;
mod cycle;
mod error;
mod factory;
mod logging;
mod parent_source;
mod provider;

pub use builder::ChildContainerBuilder;
pub use error::{CircularDependency, ResolveError, ResolveResult};
pub use factory::ContainerId;
pub use logging::{LogLevel, LogSink, Logger, LoggerFactory};
pub use provider::{Lifetime, ServiceCollection, ServiceKey, ServiceProvider};
