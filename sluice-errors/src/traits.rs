use std::borrow::Cow;
use std::error::Error as StdError;

use crate::error::{Error, Inner};
use crate::kinds::Kind;

/// Boxed low-level failure preserved inside an [`Error`].
pub type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Anything an [`Error`] can be tested against with [`Error::is`]: a
/// concrete kind or one of the group parents.
///
/// Currently sealed, the set of kinds is closed.
pub trait ErrorClass: Sealed {}

/// A concrete error kind. Only leaves of the hierarchy can be constructed.
pub trait ErrorKind: ErrorClass {
    const KIND: Kind;

    /// Create an error of this kind with a message.
    fn with_message<S: Into<Cow<'static, str>>>(s: S) -> Error {
        Self::build().context(s)
    }
    /// Create an error of this kind wrapping the cause.
    fn with_source<E: StdError + Send + Sync + 'static>(src: E) -> Error {
        Self::with_source_box(Box::new(src))
    }
    /// Same as [`ErrorKind::with_source`] for an already boxed cause.
    fn with_source_box(src: Cause) -> Error {
        Self::build().with_cause(Some(src))
    }
    /// Create an error of this kind with no message and no cause.
    fn build() -> Error {
        Error(Box::new(Inner::new(Self::KIND)))
    }
}

/// Typed diagnostic attached to an [`Error`].
pub trait Field {
    const NAME: &'static str;
    type Value: Send + Sync + 'static;
}

pub trait Sealed {
    const NAME: &'static str;
    fn is_superclass_of(code: u32) -> bool;
}

/// Extension for adding context to an error carried in a `Result`.
pub trait ResultExt<T> {
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Into<Cow<'static, str>>;
    fn with_context<C, F>(self, f: F) -> Result<T, Error>
    where
        C: Into<Cow<'static, str>>,
        F: FnOnce() -> C;
}

impl<T> ResultExt<T> for Result<T, Error> {
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Into<Cow<'static, str>>,
    {
        self.map_err(|e| e.context(context))
    }
    fn with_context<C, F>(self, f: F) -> Result<T, Error>
    where
        C: Into<Cow<'static, str>>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.context(f()))
    }
}
