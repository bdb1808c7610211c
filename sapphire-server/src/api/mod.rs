//! HTTP API handlers

pub mod deadlines;
pub mod error;
pub mod health;
pub mod help_requests;
pub mod identity;
pub mod meetings;
pub mod subtasks;
pub mod tasks;

pub use error::ApiError;
pub use identity::{Identity, Role};

use serde::{Deserialize, Deserializer};

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// `Option<Option<T>>` with this helper: outer `None` means the field was
/// omitted (leave the column untouched), `Some(None)` means it was sent as
/// null (clear the column). Partial updates depend on the distinction.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
