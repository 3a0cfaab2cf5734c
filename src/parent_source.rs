//! Late-bound references to the parent provider backing a child container.
//!
//! Two distinct cell types exist because singleton and transient imports must
//! always see the parent's *root* provider, while scoped imports must see the
//! parent scope that initiated the current resolution. Keeping them separate
//! also keeps their different unset-read policies independently testable:
//! reading an unset root cell is a wiring bug and fails loudly, reading an
//! unset scoped cell lazily derives a fresh parent scope instead.

use crate::error::{ResolveError, ResolveResult};
use crate::provider::ServiceProvider;
use parking_lot::Mutex;

/// Holds the root parent provider for a child container.
///
/// Registered as a singleton in every child collection, so all scopes of one
/// child share the cell.
pub(crate) struct ParentSingletonSource {
	provider: Mutex<Option<ServiceProvider>>,
}

impl ParentSingletonSource {
	pub(crate) fn new() -> Self {
		Self {
			provider: Mutex::new(None),
		}
	}

	/// Binds or refreshes the parent provider backing this cell.
	pub(crate) fn set(&self, provider: ServiceProvider) {
		*self.provider.lock() = Some(provider);
	}

	/// The parent provider, or [`ResolveError::MissingParentProvider`] if the
	/// cell was never set.
	pub(crate) fn get(&self) -> ResolveResult<ServiceProvider> {
		self.provider
			.lock()
			.clone()
			.ok_or(ResolveError::MissingParentProvider)
	}
}

/// Holds the parent scope that initiated the current child resolution.
///
/// Registered as scoped in every child collection, so each child scope gets
/// its own cell and unrelated parent scopes never observe each other.
pub(crate) struct ParentScopedSource {
	provider: Mutex<Option<ServiceProvider>>,
}

impl ParentScopedSource {
	pub(crate) fn new() -> Self {
		Self {
			provider: Mutex::new(None),
		}
	}

	/// Binds the parent scope backing this cell.
	pub(crate) fn set(&self, provider: ServiceProvider) {
		*self.provider.lock() = Some(provider);
	}

	/// The bound parent scope, deriving one if the cell is unset.
	///
	/// The cell is only unset when a child scope was created outside any
	/// parent scope; `derive` then produces a fresh scope (from the root
	/// parent provider) which is cached here for the rest of this child
	/// scope's lifetime.
	pub(crate) fn get_or_set_with(
		&self,
		derive: impl FnOnce() -> ResolveResult<ServiceProvider>,
	) -> ResolveResult<ServiceProvider> {
		let mut slot = self.provider.lock();
		if let Some(provider) = slot.as_ref() {
			return Ok(provider.clone());
		}
		let derived = derive()?;
		*slot = Some(derived.clone());
		Ok(derived)
	}
}
