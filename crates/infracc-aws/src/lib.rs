//! AWS provider for infracc.
//!
//! Ships the AWS rule tables and the ordered special-resource pass table
//! that repairs relationships the raw inventory does not state directly.

pub mod compute;
pub mod network;
pub mod provider;
pub mod repair;

pub use provider::AwsProvider;
