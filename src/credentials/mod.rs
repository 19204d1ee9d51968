//! User accounts and authentication
//!
//! Secrets are hashed with Argon2id ([`hasher`]) and never stored or logged
//! in plaintext. [`CredentialStore`] maps usernames to hashes, roles and the
//! active flag.

pub mod hasher;
pub mod store;

pub use hasher::CredentialHasher;
pub use store::CredentialStore;
