//! Thread-local detection of resolution chains that loop back through a
//! child container boundary.
//!
//! Forwarding factories may be invoked at arbitrary call depths and from many
//! threads at once. Resolution is synchronous, so one OS thread is one
//! execution context: the in-flight set lives in a `thread_local`, keeping
//! concurrent unrelated resolutions independent while still catching true
//! self-referential cycles within one call tree.

use crate::error::CircularDependency;
use crate::provider::ServiceKey;
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashSet;

thread_local! {
	static IN_FLIGHT: RefCell<HashSet<TypeId>> = RefCell::new(HashSet::new());
}

/// Checks the current thread's in-flight set for `key` and inserts it.
///
/// On detecting a repeat the returned error carries only the repeated key;
/// each enclosing forwarding frame prepends its own key while the error
/// unwinds, so the chain a top-level caller sees is the complete loop. The
/// ordered chain therefore lives in the error, not here; a membership set is
/// all detection needs.
pub(crate) fn begin_resolution(key: ServiceKey) -> Result<ResolutionGuard, CircularDependency> {
	IN_FLIGHT.with(|in_flight| {
		let mut in_flight = in_flight.borrow_mut();
		if in_flight.contains(&key.type_id()) {
			tracing::debug!(service = %key, "circular resolution detected");
			return Err(CircularDependency::new(key));
		}
		in_flight.insert(key.type_id());
		Ok(ResolutionGuard { key })
	})
}

/// RAII guard removing the key on every exit path, success or failure. A
/// phantom in-flight entry would falsely trip detection on a later,
/// independent resolution on the same thread.
#[derive(Debug)]
pub(crate) struct ResolutionGuard {
	key: ServiceKey,
}

impl Drop for ResolutionGuard {
	fn drop(&mut self) {
		let _ = IN_FLIGHT.try_with(|in_flight| {
			in_flight.borrow_mut().remove(&self.key.type_id());
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct TypeA;
	struct TypeB;

	#[test]
	fn repeated_type_is_detected() {
		// Arrange
		let key = ServiceKey::of::<TypeA>();
		let guard = begin_resolution(key).unwrap();

		// Act
		let result = begin_resolution(key);

		// Assert
		assert!(result.is_err());
		assert_eq!(result.unwrap_err().chain(), [key].as_slice());
		drop(guard);
	}

	#[test]
	fn guard_drop_allows_a_later_independent_resolution() {
		// Arrange
		let key = ServiceKey::of::<TypeA>();
		let guard = begin_resolution(key).unwrap();
		drop(guard);

		// Act
		let result = begin_resolution(key);

		// Assert
		assert!(result.is_ok());
	}

	#[test]
	fn distinct_types_nest_freely() {
		let _a = begin_resolution(ServiceKey::of::<TypeA>()).unwrap();
		let _b = begin_resolution(ServiceKey::of::<TypeB>()).unwrap();

		assert!(begin_resolution(ServiceKey::of::<TypeA>()).is_err());
		assert!(begin_resolution(ServiceKey::of::<TypeB>()).is_err());
	}

	#[test]
	fn chains_are_independent_across_threads() {
		// Arrange: hold TypeA in flight on this thread
		let _guard = begin_resolution(ServiceKey::of::<TypeA>()).unwrap();

		// Act: another thread resolving TypeA must not see our chain
		let handle = std::thread::spawn(|| begin_resolution(ServiceKey::of::<TypeA>()).is_ok());

		// Assert
		assert!(handle.join().unwrap());
	}

	#[test]
	fn guard_drops_in_any_order_clear_both_entries() {
		let a = begin_resolution(ServiceKey::of::<TypeA>()).unwrap();
		let b = begin_resolution(ServiceKey::of::<TypeB>()).unwrap();

		// Out-of-order drop must still clear both entries
		drop(a);
		drop(b);

		assert!(begin_resolution(ServiceKey::of::<TypeA>()).is_ok());
		assert!(begin_resolution(ServiceKey::of::<TypeB>()).is_ok());
	}
}
