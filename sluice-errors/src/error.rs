use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use crate::fields::{IsolationLevel, StatementText};
use crate::kinds::Kind;
use crate::traits::{Cause, ErrorClass, Field};

/// Error value produced by an exception policy.
///
/// The kind is fixed when the error is built: there is no way to re-kind
/// an existing error, a policy that wants a different kind builds a new one.
// This includes boxed error, because propagating through call chain is
// faster when error is just one pointer
#[derive(Debug)]
pub struct Error(pub(crate) Box<Inner>);

#[derive(Debug)]
pub(crate) struct Inner {
    pub kind: Kind,
    pub messages: Vec<Cow<'static, str>>,
    pub error: Option<Cause>,
    pub fields: HashMap<(&'static str, TypeId), Box<dyn Any + Send + Sync>>,
}

impl Inner {
    pub(crate) fn new(kind: Kind) -> Inner {
        Inner {
            kind,
            messages: Vec::new(),
            error: None,
            fields: HashMap::new(),
        }
    }
}

impl Error {
    /// Build an error from a runtime kind value.
    ///
    /// Useful for policies that pick the kind dynamically. An empty message
    /// is kept as is, it is not replaced by anything.
    pub fn new<S>(kind: Kind, message: S, cause: Option<Cause>) -> Error
    where
        S: Into<Cow<'static, str>>,
    {
        Error(Box::new(Inner::new(kind)))
            .context(message)
            .with_cause(cause)
    }
    pub fn is<T: ErrorClass>(&self) -> bool {
        T::is_superclass_of(self.0.kind.code())
    }
    pub fn kind(&self) -> Kind {
        self.0.kind
    }
    pub fn kind_name(&self) -> &'static str {
        self.0.kind.name()
    }
    pub fn kind_debug(&self) -> impl fmt::Display {
        format!("{} [0x{:08X}]", self.kind_name(), self.0.kind.code())
    }
    pub fn context<S: Into<Cow<'static, str>>>(mut self, msg: S) -> Error {
        self.0.messages.push(msg.into());
        self
    }
    /// Message the error was raised with. Empty if none was given.
    pub fn message(&self) -> &str {
        self.0.messages.first().map(|m| &m[..]).unwrap_or("")
    }
    pub fn initial_message(&self) -> Option<&str> {
        self.0.messages.first().map(|m| &m[..])
    }
    pub fn contexts(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.messages.iter().skip(1).map(|m| &m[..])
    }
    /// Underlying cause, exactly as it was handed to the policy.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.0.error.as_deref()
    }
    pub fn has_cause(&self) -> bool {
        self.0.error.is_some()
    }
    /// Try to view the cause as a concrete driver error type.
    pub fn downcast_cause<E: StdError + 'static>(&self) -> Option<&E> {
        self.cause().and_then(|e| e.downcast_ref::<E>())
    }
    pub fn get<T: Field>(&self) -> Option<&T::Value> {
        self.0
            .fields
            .get(&(T::NAME, TypeId::of::<T::Value>()))
            .and_then(|bx| bx.downcast_ref::<T::Value>())
    }
    pub fn set<T: Field>(mut self, value: impl Into<T::Value>) -> Error {
        self.insert::<T>(value);
        self
    }
    pub fn insert<T: Field>(&mut self, value: impl Into<T::Value>) {
        self.0
            .fields
            .insert((T::NAME, TypeId::of::<T::Value>()), Box::new(value.into()));
    }
    pub fn statement_text(&self) -> Option<&str> {
        self.get::<StatementText>().map(|s| &s[..])
    }
    pub fn isolation_level(&self) -> Option<i32> {
        self.get::<IsolationLevel>().copied()
    }
    pub(crate) fn with_cause(mut self, cause: Option<Cause>) -> Error {
        self.0.error = cause;
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = self.kind_name();
        let mut messages = self.0.messages.iter().rev().filter(|m| !m.is_empty());
        if f.alternate() {
            write!(f, "{}", kind)?;
            for msg in messages {
                write!(f, ": {}", msg)?;
            }
            if let Some(mut src) = self.source() {
                write!(f, ": {}", src)?;
                while let Some(next) = src.source() {
                    write!(f, ": {}", next)?;
                    src = next;
                }
            }
        } else if let Some(last) = messages.next() {
            write!(f, "{}: {}", kind, last)?;
        } else if let Some(src) = self.source() {
            write!(f, "{}: {}", kind, src)?;
        } else {
            write!(f, "{}", kind)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.error.as_ref().map(|b| b.as_ref() as &dyn StdError)
    }
}
