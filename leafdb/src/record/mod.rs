// Record trait - a value stored as one file named after its identifier

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;

/// A value persisted as a single file in its collection's directory.
///
/// The file name is `id().to_string()`, and `FromStr` must read it back to
/// the same identifier.
pub trait Record: Serialize + DeserializeOwned {
    type Id: Display + FromStr;

    /// Directory name of the collection, relative to the store root.
    const COLLECTION: &'static str;

    fn id(&self) -> Self::Id;
}

/// Check that an identifier's string form is usable as a plain file name.
pub(crate) fn valid_filename(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && !id.contains(['/', '\\'])
        && !id.contains('\0')
}
