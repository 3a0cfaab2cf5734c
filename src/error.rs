//! Errors surfaced while resolving services across container boundaries.

use crate::provider::ServiceKey;
use std::fmt;

/// Result alias used by every fallible operation in this crate.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors produced while resolving a service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
	/// The requested service type was never registered on the provider it
	/// was asked from. Surfaced verbatim, never wrapped.
	#[error("no service registered for {key}")]
	ServiceNotRegistered {
		/// The service type that could not be resolved.
		key: ServiceKey,
	},

	/// The same service type reappeared in the in-flight resolution chain of
	/// the current thread.
	#[error(transparent)]
	CircularDependency(#[from] CircularDependency),

	/// A parent-provider cell was read before it was ever set. This is a
	/// wiring bug in the bridging logic, not a runtime condition, and is
	/// never caught or retried inside this crate.
	#[error("no parent provider was specified")]
	MissingParentProvider,
}

/// A circular reference found while resolving services from child containers.
///
/// The chain starts out as just the repeated service type at the innermost
/// detection point; every enclosing forwarding frame prepends its own type
/// while the error unwinds. Once fully unwound the chain reads as a closed
/// loop whose first and last elements are the same type.
#[derive(Debug, Clone)]
pub struct CircularDependency {
	chain: Vec<ServiceKey>,
}

impl CircularDependency {
	pub(crate) fn new(repeated: ServiceKey) -> Self {
		Self {
			chain: vec![repeated],
		}
	}

	/// Prepends the type of an enclosing forwarding frame to the chain.
	pub(crate) fn prepend(mut self, key: ServiceKey) -> Self {
		self.chain.insert(0, key);
		self
	}

	/// The failing dependency chain, outermost frame first.
	pub fn chain(&self) -> &[ServiceKey] {
		&self.chain
	}

	/// Whether the chain forms a closed loop (first and last elements are
	/// the same type). A top-level caller always observes a complete chain;
	/// incomplete chains only exist while the error is still unwinding.
	pub fn is_complete(&self) -> bool {
		self.chain.len() >= 2 && self.chain.first() == self.chain.last()
	}
}

impl fmt::Display for CircularDependency {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let rendered = self
			.chain
			.iter()
			.map(|key| key.name())
			.collect::<Vec<_>>()
			.join(" -> ");
		if self.is_complete() {
			write!(
				f,
				"encountered a circular dependency; the service chain resolved as follows: {rendered}"
			)
		} else {
			write!(
				f,
				"circular dependency chain still unwinding; the tail of the chain is: {rendered}"
			)
		}
	}
}

impl std::error::Error for CircularDependency {}

#[cfg(test)]
mod tests {
	use super::*;

	struct First;
	struct Second;

	#[test]
	fn chain_grows_by_prepending_enclosing_frames() {
		let error = CircularDependency::new(ServiceKey::of::<First>())
			.prepend(ServiceKey::of::<Second>())
			.prepend(ServiceKey::of::<First>());

		assert_eq!(error.chain().len(), 3);
		assert_eq!(error.chain().first(), error.chain().last());
		assert!(error.is_complete());
	}

	#[test]
	fn single_element_chain_is_incomplete() {
		let error = CircularDependency::new(ServiceKey::of::<First>());

		assert!(!error.is_complete());
		assert!(error.to_string().contains("still unwinding"));
	}

	#[test]
	fn complete_chain_renders_as_closed_loop() {
		let error = CircularDependency::new(ServiceKey::of::<First>())
			.prepend(ServiceKey::of::<Second>())
			.prepend(ServiceKey::of::<First>());

		let message = error.to_string();
		assert!(message.contains("circular dependency"));
		assert!(message.contains(" -> "));
	}
}
