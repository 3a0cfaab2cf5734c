//! Lazily materializes and caches one child provider per declared container.

use crate::error::ResolveResult;
use crate::parent_source::{ParentScopedSource, ParentSingletonSource};
use crate::provider::{Lifetime, ServiceCollection, ServiceKey, ServiceProvider};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque identity of one declared child container, minted when the
/// container is declared and stable for the life of the parent collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(Uuid);

impl ContainerId {
	pub(crate) fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl fmt::Display for ContainerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Callback populating a child collection, given the parent root provider.
pub(crate) type ConfigureChild = dyn Fn(&mut ServiceCollection, &ServiceProvider) + Send + Sync;

/// A recorded (service type, lifetime) import from the parent container.
pub(crate) struct ImportDeclaration {
	key: ServiceKey,
	lifetime: Lifetime,
	install: Box<dyn Fn(&mut ServiceCollection) + Send + Sync>,
}

impl ImportDeclaration {
	/// Declares that `T` should be pulled from the parent with the given
	/// lifetime. Installation registers a factory in the *child* collection
	/// that reads the appropriate parent-provider cell at resolution time.
	pub(crate) fn of<T: Any + Send + Sync>(lifetime: Lifetime) -> Self {
		let install: Box<dyn Fn(&mut ServiceCollection) + Send + Sync> = match lifetime {
			// Scoped imports come from a scoped parent context.
			Lifetime::Scoped => Box::new(move |services| {
				services.add_shared_factory(Lifetime::Scoped, |child| {
					let source = child.resolve::<ParentScopedSource>()?;
					let parent = source.get_or_set_with(|| {
						// This child scope was created outside any parent
						// scope, so no parent scope is associated; derive one
						// from the root parent provider.
						let root = child.resolve::<ParentSingletonSource>()?.get()?;
						Ok(root.create_scope())
					})?;
					parent.resolve::<T>()
				});
			}),
			// Singleton and transient imports come from the root parent context.
			lifetime => Box::new(move |services| {
				services.add_shared_factory(lifetime, |child| {
					let parent = child.resolve::<ParentSingletonSource>()?.get()?;
					parent.resolve::<T>()
				});
			}),
		};
		Self {
			key: ServiceKey::of::<T>(),
			lifetime,
			install,
		}
	}
}

/// Builds and caches child providers, one per [`ContainerId`].
///
/// Registered (try-add) as a singleton in the parent collection, so every
/// child container declared against one parent shares a single factory bound
/// to the parent's root provider.
pub(crate) struct ChildProviderFactory {
	parent_root: ServiceProvider,
	providers: Mutex<HashMap<ContainerId, Arc<OnceCell<ServiceProvider>>>>,
}

impl ChildProviderFactory {
	pub(crate) fn new(parent_root: ServiceProvider) -> Self {
		Self {
			parent_root,
			providers: Mutex::new(HashMap::new()),
		}
	}

	/// Materializes the child provider for `id`, or returns the cached one.
	///
	/// Concurrent first calls for the same identity race to exactly one
	/// build: the per-identity cell serializes initialization, so the
	/// configure callback runs at most once and losing callers reuse the
	/// winner's provider.
	pub(crate) fn ensure_built(
		&self,
		id: ContainerId,
		child_services: &Mutex<ServiceCollection>,
		configure: &ConfigureChild,
		imports: &Mutex<Vec<ImportDeclaration>>,
	) -> ServiceProvider {
		let cell = self.providers.lock().entry(id).or_default().clone();
		cell.get_or_init(|| {
			tracing::debug!(container = %id, "materializing child container");
			let mut services = child_services.lock();

			let parent_root = self.parent_root.clone();
			services.add_singleton(move |_| {
				let source = ParentSingletonSource::new();
				source.set(parent_root.clone());
				Ok(source)
			});
			services.add_scoped(|_| Ok(ParentScopedSource::new()));

			(configure)(&mut services, &self.parent_root);

			for import in imports.lock().iter() {
				tracing::trace!(
					container = %id,
					service = %import.key,
					lifetime = ?import.lifetime,
					"installing parent import"
				);
				(import.install)(&mut services);
			}

			services.build()
		})
		.clone()
	}

	/// The child provider itself, with its root parent handle refreshed.
	///
	/// Used for singleton and transient forwards: singletons live for the
	/// child container's lifetime, so no per-call isolation is needed, and
	/// the root handle is only consulted by singleton/transient imports.
	pub(crate) fn singleton_handle(
		child_root: &ServiceProvider,
		current_parent: &ServiceProvider,
	) -> ResolveResult<ServiceProvider> {
		child_root
			.resolve::<ParentSingletonSource>()?
			.set(current_parent.clone());
		Ok(child_root.clone())
	}

	/// A fresh scope of the child provider, with both parent handles bound
	/// to the initiating parent provider.
	///
	/// Every logical resolution gets its own scope so scoped child services
	/// never leak between unrelated parent scopes.
	pub(crate) fn scoped_handle(
		child_root: &ServiceProvider,
		current_parent: &ServiceProvider,
	) -> ResolveResult<ServiceProvider> {
		let scope = child_root.create_scope();
		scope
			.resolve::<ParentSingletonSource>()?
			.set(current_parent.clone());
		scope
			.resolve::<ParentScopedSource>()?
			.set(current_parent.clone());
		Ok(scope)
	}
}
