pub mod identity_provider;

pub use identity_provider::IdentityProvider as JwtIdentityProvider;
