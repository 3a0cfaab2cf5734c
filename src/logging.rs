//! Logger forwarding between parent and child containers.
//!
//! Logging is modeled as a capability: a [`LoggerFactory`] creates a
//! [`LogSink`] per category, and the typed [`Logger<T>`] adapter delegates
//! every call to the sink for `T`'s type name. Importing the parent's
//! factory into a child (via
//! [`ChildContainerBuilder::import_logging`](crate::ChildContainerBuilder::import_logging))
//! makes child-resolved loggers write through the parent's sinks
//! transparently.

use crate::error::ResolveResult;
use crate::provider::ServiceCollection;
use std::marker::PhantomData;
use std::sync::Arc;

/// Severity of a log call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
	Trace,
	Debug,
	Info,
	Warn,
	Error,
}

/// A category-bound log destination.
pub trait LogSink: Send + Sync {
	/// Whether the sink would record a message at this level.
	fn enabled(&self, level: LogLevel) -> bool;

	/// Records a message.
	fn log(&self, level: LogLevel, message: &str);
}

/// Creates category-bound sinks. Registered as a service so containers can
/// import the parent's logging wholesale.
#[derive(Clone)]
pub struct LoggerFactory {
	create: Arc<dyn Fn(&str) -> Arc<dyn LogSink> + Send + Sync>,
}

impl LoggerFactory {
	/// A factory producing sinks with the given constructor.
	pub fn new<F>(create: F) -> Self
	where
		F: Fn(&str) -> Arc<dyn LogSink> + Send + Sync + 'static,
	{
		Self {
			create: Arc::new(create),
		}
	}

	/// A factory whose sinks emit `tracing` events carrying the category as
	/// a field.
	pub fn tracing() -> Self {
		Self::new(|category| {
			Arc::new(TracingSink {
				category: category.to_string(),
			})
		})
	}

	/// Creates the sink for a category.
	pub fn create_logger(&self, category: &str) -> Arc<dyn LogSink> {
		(self.create)(category)
	}
}

struct TracingSink {
	category: String,
}

impl LogSink for TracingSink {
	fn enabled(&self, level: LogLevel) -> bool {
		match level {
			LogLevel::Trace => tracing::enabled!(tracing::Level::TRACE),
			LogLevel::Debug => tracing::enabled!(tracing::Level::DEBUG),
			LogLevel::Info => tracing::enabled!(tracing::Level::INFO),
			LogLevel::Warn => tracing::enabled!(tracing::Level::WARN),
			LogLevel::Error => tracing::enabled!(tracing::Level::ERROR),
		}
	}

	fn log(&self, level: LogLevel, message: &str) {
		match level {
			LogLevel::Trace => tracing::trace!(category = %self.category, "{}", message),
			LogLevel::Debug => tracing::debug!(category = %self.category, "{}", message),
			LogLevel::Info => tracing::info!(category = %self.category, "{}", message),
			LogLevel::Warn => tracing::warn!(category = %self.category, "{}", message),
			LogLevel::Error => tracing::error!(category = %self.category, "{}", message),
		}
	}
}

/// A logger bound to the category of its consumer type, delegating every
/// call to the factory-created sink of that category.
pub struct Logger<T: 'static> {
	sink: Arc<dyn LogSink>,
	_category: PhantomData<fn() -> T>,
}

impl<T: 'static> Logger<T> {
	/// Creates the logger for `T`'s category from a factory.
	pub fn from_factory(factory: &LoggerFactory) -> Self {
		Self {
			sink: factory.create_logger(std::any::type_name::<T>()),
			_category: PhantomData,
		}
	}

	/// Whether the underlying sink would record a message at this level.
	pub fn enabled(&self, level: LogLevel) -> bool {
		self.sink.enabled(level)
	}

	/// Records a message at the given level.
	pub fn log(&self, level: LogLevel, message: &str) {
		self.sink.log(level, message);
	}

	pub fn trace(&self, message: &str) {
		self.log(LogLevel::Trace, message);
	}

	pub fn debug(&self, message: &str) {
		self.log(LogLevel::Debug, message);
	}

	pub fn info(&self, message: &str) {
		self.log(LogLevel::Info, message);
	}

	pub fn warn(&self, message: &str) {
		self.log(LogLevel::Warn, message);
	}

	pub fn error(&self, message: &str) {
		self.log(LogLevel::Error, message);
	}
}

impl ServiceCollection {
	/// Registers `Logger<T>` as a singleton backed by the collection's
	/// [`LoggerFactory`] registration (typically imported from the parent).
	pub fn add_logger<T: 'static>(&mut self) -> &mut Self {
		self.add_singleton(|provider| {
			let factory = provider.resolve::<LoggerFactory>()?;
			ResolveResult::Ok(Logger::<T>::from_factory(&factory))
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct CountingSink {
		calls: Arc<AtomicUsize>,
	}

	impl LogSink for CountingSink {
		fn enabled(&self, _level: LogLevel) -> bool {
			true
		}

		fn log(&self, _level: LogLevel, _message: &str) {
			self.calls.fetch_add(1, Ordering::SeqCst);
		}
	}

	struct Consumer;

	#[test]
	fn logger_delegates_to_the_category_sink() {
		let calls = Arc::new(AtomicUsize::new(0));
		let sink_calls = calls.clone();
		let factory = LoggerFactory::new(move |_| {
			Arc::new(CountingSink {
				calls: sink_calls.clone(),
			})
		});

		let logger = Logger::<Consumer>::from_factory(&factory);
		logger.info("hello");
		logger.warn("again");

		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn logger_category_is_the_consumer_type_name() {
		let seen = Arc::new(parking_lot::Mutex::new(String::new()));
		let seen_by_factory = seen.clone();
		let factory = LoggerFactory::new(move |category| {
			*seen_by_factory.lock() = category.to_string();
			Arc::new(CountingSink {
				calls: Arc::new(AtomicUsize::new(0)),
			})
		});

		let _logger = Logger::<Consumer>::from_factory(&factory);

		assert!(seen.lock().contains("Consumer"));
	}

	#[test]
	fn tracing_factory_sinks_do_not_panic_without_a_subscriber() {
		let logger = Logger::<Consumer>::from_factory(&LoggerFactory::tracing());

		logger.log(LogLevel::Debug, "no subscriber installed");
		let _ = logger.enabled(LogLevel::Error);
	}
}
