//!
//! Byte storage for uploaded media
//!

#![forbid(missing_docs, rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(forbidden_lint_groups)]

use bytes::Bytes;
use futures_util::Stream;
use std::{error::Error, future::Future};

pub mod fs;

/// Boxed error
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Result alias where the error defaults to [`BoxError`]
pub type Result<T, E = BoxError> = std::result::Result<T, E>;

/// Object name that would escape the storage root
#[derive(Debug, thiserror::Error)]
#[error("invalid object name: {0:?}")]
pub struct InvalidName(pub String);

/// Check that the name refers to a plain object directly inside of the storage root
pub fn validate_name(name: &str) -> Result<(), InvalidName> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);

    if valid {
        Ok(())
    } else {
        Err(InvalidName(name.to_string()))
    }
}

/// Trait abstraction over storage backends
pub trait StorageBackend: Clone + Send + Sync {
    /// Delete an object
    fn delete(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Stream an object out of the storage
    fn get(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<impl Stream<Item = Result<Bytes>> + Send + 'static>> + Send;

    /// Stream an object into the storage
    fn put<T>(&self, name: &str, input_stream: T) -> impl Future<Output = Result<()>> + Send
    where
        T: Stream<Item = Result<Bytes>> + Send + 'static;
}

#[cfg(test)]
mod test {
    use super::validate_name;

    #[test]
    fn rejects_traversal() {
        assert!(validate_name("0192d1a8-2f5e-7c3a-9e44-2d1f0b7a9c11.png").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("nested/file.png").is_err());
        assert!(validate_name("windows\\file.png").is_err());
    }
}
