// Providers layer - Work performers
//
// Providers wrap primitives (hashing, token signing) that services compose.
pub mod crypto_provider;
pub mod token_provider;

pub use crypto_provider::CryptoProvider;
pub use token_provider::TokenProvider;
