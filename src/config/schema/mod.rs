mod core;
mod observability;
mod remote_auth;

pub use self::core::Config;
pub use observability::ObservabilityConfig;
pub use remote_auth::RemoteAuthConfig;
