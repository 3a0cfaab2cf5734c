//! Declaration surface for one child container.
//!
//! A child container exists on its own, with its own services. Services from
//! the parent can be imported into the child, and services added to the child
//! can be forwarded back to the parent. Declaring a container materializes
//! nothing; the child provider is built lazily on the first resolution of a
//! forwarded service.

use crate::cycle;
use crate::error::{ResolveError, ResolveResult};
use crate::factory::{ChildProviderFactory, ConfigureChild, ContainerId, ImportDeclaration};
use crate::logging::LoggerFactory;
use crate::provider::{Lifetime, ServiceCollection, ServiceKey, ServiceProvider};
use parking_lot::{Mutex, MutexGuard};
use std::any::Any;
use std::sync::Arc;

/// Which child provider handle a forward resolves against.
#[derive(Clone, Copy)]
enum HandleKind {
	/// The cached child provider itself, root parent handle refreshed.
	Rooted,
	/// A fresh child scope with both parent handles bound.
	Scoped,
}

impl ServiceCollection {
	/// Declares a child container against this collection.
	///
	/// `configure` populates the child's registrations; it receives the
	/// parent's root provider and runs once, when the child is first
	/// materialized. The returned builder records imports and forwards; it
	/// does not initialize any scopes.
	pub fn add_child_container<F>(&mut self, configure: F) -> ChildContainerBuilder<'_>
	where
		F: Fn(&mut ServiceCollection, &ServiceProvider) + Send + Sync + 'static,
	{
		// One factory per parent, shared by every declared child container.
		self.try_add_factory(Lifetime::Singleton, |provider: &ServiceProvider| {
			Ok(ChildProviderFactory::new(provider.clone()))
		});

		ChildContainerBuilder {
			parent: self,
			id: ContainerId::new(),
			child_services: Arc::new(Mutex::new(ServiceCollection::new())),
			configure: Arc::new(configure),
			imports: Arc::new(Mutex::new(Vec::new())),
		}
	}
}

/// Passes services back and forth between a parent and a child container.
pub struct ChildContainerBuilder<'a> {
	parent: &'a mut ServiceCollection,
	id: ContainerId,
	child_services: Arc<Mutex<ServiceCollection>>,
	configure: Arc<ConfigureChild>,
	imports: Arc<Mutex<Vec<ImportDeclaration>>>,
}

impl ChildContainerBuilder<'_> {
	/// The identity of the declared child container.
	pub fn container_id(&self) -> ContainerId {
		self.id
	}

	/// The child service collection being built. Registrations added here
	/// are merged with whatever the configure callback registers, until the
	/// child provider is materialized.
	pub fn child_services(&self) -> MutexGuard<'_, ServiceCollection> {
		self.child_services.lock()
	}

	/// Imports a singleton service from the parent container into the child.
	pub fn import_singleton<T: Any + Send + Sync>(self) -> Self {
		self.import::<T>(Lifetime::Singleton)
	}

	/// Imports a scoped service from the parent container into the child.
	pub fn import_scoped<T: Any + Send + Sync>(self) -> Self {
		self.import::<T>(Lifetime::Scoped)
	}

	/// Imports a transient service from the parent container into the child.
	pub fn import_transient<T: Any + Send + Sync>(self) -> Self {
		self.import::<T>(Lifetime::Transient)
	}

	/// Imports the parent's [`LoggerFactory`] into the child, so child-side
	/// loggers delegate every call to the parent's sink of the same
	/// category. Pair with [`ServiceCollection::add_logger`] on the child
	/// side for typed loggers.
	pub fn import_logging(self) -> Self {
		self.import_singleton::<LoggerFactory>()
	}

	/// Forwards a singleton service from the child container back to the
	/// parent.
	pub fn forward_singleton<T: Any + Send + Sync>(self) -> Self {
		self.forward::<T>(Lifetime::Singleton, HandleKind::Rooted)
	}

	/// Forwards a scoped service from the child container back to the
	/// parent.
	pub fn forward_scoped<T: Any + Send + Sync>(self) -> Self {
		self.forward::<T>(Lifetime::Scoped, HandleKind::Scoped)
	}

	/// Forwards a transient service from the child container back to the
	/// parent.
	pub fn forward_transient<T: Any + Send + Sync>(self) -> Self {
		self.forward::<T>(Lifetime::Transient, HandleKind::Rooted)
	}

	fn import<T: Any + Send + Sync>(self, lifetime: Lifetime) -> Self {
		// Pure bookkeeping; duplicates are legal and the last registration
		// wins when the declarations are installed.
		self.imports.lock().push(ImportDeclaration::of::<T>(lifetime));
		self
	}

	fn forward<T: Any + Send + Sync>(self, lifetime: Lifetime, handle: HandleKind) -> Self {
		let id = self.id;
		let child_services = Arc::clone(&self.child_services);
		let configure = Arc::clone(&self.configure);
		let imports = Arc::clone(&self.imports);
		self.parent.add_shared_factory(lifetime, move |parent_provider| {
			resolve_forwarded::<T>(
				parent_provider,
				id,
				&child_services,
				configure.as_ref(),
				&imports,
				handle,
			)
		});
		self
	}
}

/// Body of every forwarding registration installed in the parent collection.
fn resolve_forwarded<T: Any + Send + Sync>(
	parent_provider: &ServiceProvider,
	id: ContainerId,
	child_services: &Mutex<ServiceCollection>,
	configure: &ConfigureChild,
	imports: &Mutex<Vec<ImportDeclaration>>,
	handle: HandleKind,
) -> ResolveResult<Arc<T>> {
	let key = ServiceKey::of::<T>();
	// A repeat of `key` in this thread's in-flight chain means the child
	// resolution looped back through the parent; fail before recursing.
	let guard = cycle::begin_resolution(key)?;

	let result = (|| {
		let factory = parent_provider.resolve::<ChildProviderFactory>()?;
		let child_root = factory.ensure_built(id, child_services, configure, imports);
		let child = match handle {
			HandleKind::Scoped => ChildProviderFactory::scoped_handle(&child_root, parent_provider)?,
			HandleKind::Rooted => {
				ChildProviderFactory::singleton_handle(&child_root, parent_provider)?
			}
		};
		child.resolve::<T>()
	})();

	// Pop runs on every exit path; a propagating cycle error picks up this
	// frame's type so the outermost caller sees the complete loop.
	drop(guard);
	result.map_err(|error| match error {
		ResolveError::CircularDependency(chain) => {
			ResolveError::CircularDependency(chain.prepend(key))
		}
		other => other,
	})
}
