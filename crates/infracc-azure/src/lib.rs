//! Azure provider for infracc.

pub mod handlers;
pub mod provider;

pub use provider::AzureProvider;
