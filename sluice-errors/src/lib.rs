/*!
# Error values for sluice

Every failure the sluice pipeline reports is an [`Error`]. An error is
produced by an exception policy (see the `sluice-tokio` crate), which
picks its [`Kind`] and message and attaches the underlying driver failure
as the cause.

Each kind is represented as a marker type implementing [`ErrorKind`].
Marker types are used with [`Error::is`] and to create instances:

```rust
# use std::io;
# use sluice_errors::{ConnectionFailure, ErrorKind, Kind};
let err = ConnectionFailure::with_source(io::Error::from(io::ErrorKind::NotFound));
assert!(err.is::<ConnectionFailure>());
assert_eq!(err.kind(), Kind::ConnectionFailure);
```

Kinds are grouped, and [`Error::is`] works with the group as well:

```rust
# use sluice_errors::*;
let err = NoResultsFailure::with_message("No results to return");
assert!(err.is::<NoResultsFailure>());
assert!(err.is::<ResultError>());
assert!(!err.is::<StatementError>());
```

[`Kind`] is a closed enum, so code that must handle every category can
match on [`Error::kind`] exhaustively.

# Causes

The cause given when the error was built is kept verbatim. It is
returned from [`std::error::Error::source`] and from [`Error::cause`], so
the chain can always be walked down to the original driver failure.
The alternate format (`{:#}`) prints the whole chain.
*/
mod error;
mod traits;

pub mod display;
pub mod fields;
pub mod kinds;

#[cfg(feature = "miette")]
pub mod miette;

pub use error::Error;
pub use kinds::*;
pub use traits::{Cause, ErrorClass, ErrorKind, Field, ResultExt};
