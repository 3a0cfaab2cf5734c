//! Minimal service registry and resolver.
//!
//! [`ServiceCollection`] is the mutable pre-build set of registrations;
//! [`ServiceProvider`] is the frozen, queryable resolver built from it.
//! Three lifetimes are supported: singletons live for the provider's whole
//! life and are shared with every scope, scoped services live for one
//! [`ServiceProvider::create_scope`] scope, transients are rebuilt on every
//! resolution.

use crate::error::{ResolveError, ResolveResult};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Service lifetimes supported by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
	/// One instance for the provider's whole life.
	Singleton,
	/// One instance per resolution scope.
	Scoped,
	/// A new instance on every resolution.
	Transient,
}

/// Identifies a service registration by its Rust type.
///
/// Carries the type name alongside the `TypeId` so errors and dependency
/// chains stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceKey {
	id: TypeId,
	name: &'static str,
}

impl ServiceKey {
	/// The key under which `T` is registered and resolved.
	pub fn of<T: Any>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	pub(crate) fn type_id(&self) -> TypeId {
		self.id
	}

	/// The full type name of the service.
	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl fmt::Display for ServiceKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

type BoxedService = Arc<dyn Any + Send + Sync>;
type BoxedFactory = Arc<dyn Fn(&ServiceProvider) -> ResolveResult<BoxedService> + Send + Sync>;

#[derive(Clone)]
struct Registration {
	lifetime: Lifetime,
	factory: BoxedFactory,
}

/// The mutable pre-build collection of service registrations.
#[derive(Default)]
pub struct ServiceCollection {
	registrations: HashMap<TypeId, Registration>,
}

impl ServiceCollection {
	/// Creates an empty collection.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a computed-on-demand service of the given lifetime.
	///
	/// Registering the same service type twice overwrites the earlier
	/// registration; the last one wins.
	pub fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
	where
		T: Any + Send + Sync,
		F: Fn(&ServiceProvider) -> ResolveResult<T> + Send + Sync + 'static,
	{
		let boxed: BoxedFactory =
			Arc::new(move |provider| factory(provider).map(|value| Arc::new(value) as BoxedService));
		self.add_raw(TypeId::of::<T>(), lifetime, boxed);
		self
	}

	/// Registers a singleton factory.
	pub fn add_singleton<T, F>(&mut self, factory: F) -> &mut Self
	where
		T: Any + Send + Sync,
		F: Fn(&ServiceProvider) -> ResolveResult<T> + Send + Sync + 'static,
	{
		self.add_factory(Lifetime::Singleton, factory)
	}

	/// Registers a scoped factory.
	pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
	where
		T: Any + Send + Sync,
		F: Fn(&ServiceProvider) -> ResolveResult<T> + Send + Sync + 'static,
	{
		self.add_factory(Lifetime::Scoped, factory)
	}

	/// Registers a transient factory.
	pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
	where
		T: Any + Send + Sync,
		F: Fn(&ServiceProvider) -> ResolveResult<T> + Send + Sync + 'static,
	{
		self.add_factory(Lifetime::Transient, factory)
	}

	/// Registers an already-built value as a singleton. Every resolution
	/// returns the same instance.
	pub fn add_instance<T: Any + Send + Sync>(&mut self, value: T) -> &mut Self {
		let shared: BoxedService = Arc::new(value);
		self.add_raw(
			TypeId::of::<T>(),
			Lifetime::Singleton,
			Arc::new(move |_| Ok(shared.clone())),
		);
		self
	}

	/// Registers a factory producing an already-shared `Arc<T>`, preserving
	/// instance identity across the registration boundary. Imports and
	/// forwards use this so the parent and child observe the same instance.
	pub(crate) fn add_shared_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
	where
		T: Any + Send + Sync,
		F: Fn(&ServiceProvider) -> ResolveResult<Arc<T>> + Send + Sync + 'static,
	{
		let boxed: BoxedFactory =
			Arc::new(move |provider| factory(provider).map(|arc| arc as BoxedService));
		self.add_raw(TypeId::of::<T>(), lifetime, boxed);
		self
	}

	/// Registers a factory only if the service type is not registered yet.
	pub fn try_add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
	where
		T: Any + Send + Sync,
		F: Fn(&ServiceProvider) -> ResolveResult<T> + Send + Sync + 'static,
	{
		if !self.registrations.contains_key(&TypeId::of::<T>()) {
			self.add_factory(lifetime, factory);
		}
		self
	}

	/// Whether a registration exists for `T`.
	pub fn contains<T: Any>(&self) -> bool {
		self.registrations.contains_key(&TypeId::of::<T>())
	}

	fn add_raw(&mut self, id: TypeId, lifetime: Lifetime, factory: BoxedFactory) {
		self.registrations.insert(id, Registration { lifetime, factory });
	}

	/// Freezes the registrations into a queryable provider.
	///
	/// The collection is left usable; registrations added after `build` do
	/// not affect already-built providers.
	pub fn build(&self) -> ServiceProvider {
		let shared = Arc::new(ProviderShared {
			registrations: self.registrations.clone(),
			singletons: RwLock::new(HashMap::new()),
			root_scope: Arc::new(ScopeCache::default()),
		});
		let scope = shared.root_scope.clone();
		ServiceProvider { shared, scope }
	}
}

#[derive(Default)]
struct ScopeCache {
	instances: RwLock<HashMap<TypeId, BoxedService>>,
}

struct ProviderShared {
	registrations: HashMap<TypeId, Registration>,
	singletons: RwLock<HashMap<TypeId, BoxedService>>,
	/// Scoped-instance cache used when scoped services are resolved from the
	/// root provider itself (the root acts as its own scope).
	root_scope: Arc<ScopeCache>,
}

/// The built, queryable object graph. Cloning yields another handle to the
/// same provider; use [`ServiceProvider::create_scope`] for an isolated
/// scoped-instance cache.
#[derive(Clone)]
pub struct ServiceProvider {
	shared: Arc<ProviderShared>,
	scope: Arc<ScopeCache>,
}

impl fmt::Debug for ServiceProvider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServiceProvider")
			.field("registrations", &self.shared.registrations.len())
			.finish_non_exhaustive()
	}
}

impl ServiceProvider {
	/// Resolves a service by type.
	pub fn resolve<T: Any + Send + Sync>(&self) -> ResolveResult<Arc<T>> {
		let key = ServiceKey::of::<T>();
		self.resolve_key(key)?
			.downcast::<T>()
			.map_err(|_| ResolveError::ServiceNotRegistered { key })
	}

	/// Creates a nested provider sharing singleton state with this one but
	/// with its own scoped-instance cache.
	pub fn create_scope(&self) -> ServiceProvider {
		ServiceProvider {
			shared: self.shared.clone(),
			scope: Arc::new(ScopeCache::default()),
		}
	}

	/// A handle resolving against the root scope. Singleton factories always
	/// run against this view, regardless of which scope asked.
	pub(crate) fn root(&self) -> ServiceProvider {
		ServiceProvider {
			shared: self.shared.clone(),
			scope: self.shared.root_scope.clone(),
		}
	}

	fn resolve_key(&self, key: ServiceKey) -> ResolveResult<BoxedService> {
		let (lifetime, factory) = {
			let registration = self
				.shared
				.registrations
				.get(&key.type_id())
				.ok_or(ResolveError::ServiceNotRegistered { key })?;
			(registration.lifetime, registration.factory.clone())
		};

		match lifetime {
			Lifetime::Transient => factory(self),
			Lifetime::Singleton => {
				if let Some(existing) = self.shared.singletons.read().get(&key.type_id()) {
					return Ok(existing.clone());
				}
				// Build outside the lock; factories may resolve further
				// services. If two threads race, the first insert wins and
				// the loser's instance is discarded unexposed.
				let root = self.root();
				let built = factory(&root)?;
				let mut singletons = self.shared.singletons.write();
				Ok(singletons.entry(key.type_id()).or_insert(built).clone())
			}
			Lifetime::Scoped => {
				if let Some(existing) = self.scope.instances.read().get(&key.type_id()) {
					return Ok(existing.clone());
				}
				let built = factory(self)?;
				let mut instances = self.scope.instances.write();
				Ok(instances.entry(key.type_id()).or_insert(built).clone())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[derive(Debug, PartialEq)]
	struct Config {
		value: u32,
	}

	struct Countered {
		_n: usize,
	}

	#[test]
	fn singleton_resolves_to_the_same_instance() {
		let mut services = ServiceCollection::new();
		services.add_singleton(|_| Ok(Config { value: 7 }));
		let provider = services.build();

		let first = provider.resolve::<Config>().unwrap();
		let second = provider.resolve::<Config>().unwrap();

		assert!(Arc::ptr_eq(&first, &second));
	}

	#[test]
	fn transient_resolves_to_a_fresh_instance_each_call() {
		let counter = Arc::new(AtomicUsize::new(0));
		let mut services = ServiceCollection::new();
		let factory_counter = counter.clone();
		services.add_transient(move |_| {
			Ok(Countered {
				_n: factory_counter.fetch_add(1, Ordering::SeqCst),
			})
		});
		let provider = services.build();

		let first = provider.resolve::<Countered>().unwrap();
		let second = provider.resolve::<Countered>().unwrap();

		assert!(!Arc::ptr_eq(&first, &second));
		assert_eq!(counter.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn scoped_instances_are_per_scope() {
		let mut services = ServiceCollection::new();
		services.add_scoped(|_| Ok(Config { value: 1 }));
		let provider = services.build();

		let scope_a = provider.create_scope();
		let scope_b = provider.create_scope();

		let a1 = scope_a.resolve::<Config>().unwrap();
		let a2 = scope_a.resolve::<Config>().unwrap();
		let b = scope_b.resolve::<Config>().unwrap();

		assert!(Arc::ptr_eq(&a1, &a2));
		assert!(!Arc::ptr_eq(&a1, &b));
	}

	#[test]
	fn scopes_share_singletons_with_the_root() {
		let mut services = ServiceCollection::new();
		services.add_singleton(|_| Ok(Config { value: 3 }));
		let provider = services.build();
		let scope = provider.create_scope();

		let from_scope = scope.resolve::<Config>().unwrap();
		let from_root = provider.resolve::<Config>().unwrap();

		assert!(Arc::ptr_eq(&from_scope, &from_root));
	}

	#[test]
	fn last_registration_wins() {
		let mut services = ServiceCollection::new();
		services.add_singleton(|_| Ok(Config { value: 1 }));
		services.add_singleton(|_| Ok(Config { value: 2 }));
		let provider = services.build();

		assert_eq!(provider.resolve::<Config>().unwrap().value, 2);
	}

	#[test]
	fn try_add_keeps_the_existing_registration() {
		let mut services = ServiceCollection::new();
		services.add_singleton(|_| Ok(Config { value: 1 }));
		services.try_add_factory(Lifetime::Singleton, |_| Ok(Config { value: 2 }));
		let provider = services.build();

		assert_eq!(provider.resolve::<Config>().unwrap().value, 1);
	}

	#[test]
	fn unregistered_type_fails_with_its_key() {
		let provider = ServiceCollection::new().build();

		let error = provider.resolve::<Config>().unwrap_err();

		match error {
			ResolveError::ServiceNotRegistered { key } => {
				assert!(key.name().contains("Config"));
			}
			other => panic!("expected ServiceNotRegistered, got {other:?}"),
		}
	}

	#[test]
	fn provider_debug_reports_registration_count() {
		let mut services = ServiceCollection::new();
		services.add_instance(Config { value: 1 });
		let provider = services.build();

		let rendered = format!("{provider:?}");

		assert!(rendered.contains("ServiceProvider"));
		assert!(rendered.contains("registrations: 1"));
	}

	#[test]
	fn factories_can_resolve_other_services() {
		let mut services = ServiceCollection::new();
		services.add_instance(Config { value: 40 });
		services.add_transient(|provider| {
			let config = provider.resolve::<Config>()?;
			Ok(Countered {
				_n: config.value as usize,
			})
		});
		let provider = services.build();

		assert_eq!(provider.resolve::<Countered>().unwrap()._n, 40);
	}
}
