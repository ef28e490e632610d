//! Approved-snapshot assertions.
//!
//! Thin wrappers over `insta` that store the approved text under the test
//! crate's `snapshots/` directory. An optional discriminator becomes the
//! snapshot suffix, so one test can keep several approved files. Review and
//! approve changes with `cargo insta review`.
#![allow(clippy::panic)]

use serde::Serialize;

use crate::canonical::to_canonical_json;

#[doc(hidden)]
pub use insta as __insta;

/// Canonical JSON text of a value, as stored in an approved snapshot.
///
/// # Panics
/// Panics if the value cannot be represented as JSON.
#[track_caller]
#[must_use]
pub fn serialized_text<T: Serialize + ?Sized>(value: &T) -> String {
    match to_canonical_json(value) {
        Ok(text) => text,
        Err(err) => panic!("value could not be serialized for approval: {err}"),
    }
}

/// Assert that text matches its approved snapshot.
///
/// ```ignore
/// assert_matches_approved!("schema", schema.sdl());
/// assert_matches_approved!("greeting", text, discriminator = "fr");
/// ```
#[macro_export]
macro_rules! assert_matches_approved {
    ($name:expr, $value:expr $(,)?) => {{
        let approved: ::std::string::String = ::std::string::ToString::to_string(&$value);
        $crate::approval::__insta::assert_snapshot!($name, approved);
    }};
    ($name:expr, $value:expr, discriminator = $discriminator:expr $(,)?) => {{
        let approved: ::std::string::String = ::std::string::ToString::to_string(&$value);
        let mut settings = $crate::approval::__insta::Settings::clone_current();
        settings.set_snapshot_suffix($discriminator);
        settings.bind(|| {
            $crate::approval::__insta::assert_snapshot!($name, approved);
        });
    }};
}

/// Assert that a value's canonical JSON matches its approved snapshot.
#[macro_export]
macro_rules! assert_serialized_matches_approved {
    ($name:expr, $value:expr $(, discriminator = $discriminator:expr)? $(,)?) => {{
        let serialized = $crate::approval::serialized_text(&$value);
        $crate::assert_matches_approved!($name, serialized $(, discriminator = $discriminator)?);
    }};
}
