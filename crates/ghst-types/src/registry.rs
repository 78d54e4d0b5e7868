//! Self-registration of pluggable implementations.

/// Ties an implementation to the name it is selected by in configuration
/// (e.g. `account.primary = "local"`) and to its factory function.
pub trait ImplementationRegistry {
	/// Configuration name of the implementation.
	const NAME: &'static str;

	/// Factory type of the implementation's interface.
	type Factory;

	fn factory() -> Self::Factory;
}
