use std::fmt;

use crate::traits::{ErrorClass, ErrorKind, Sealed};

const GROUP_MASK: u32 = 0xFF_00_00_00;
const KIND_MASK: u32 = 0xFF_FF_00_00;

/// Closed set of failure categories an exception policy classifies into.
///
/// Every [`Error`](crate::Error) carries exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// Executable statement could not be built from the SQL text.
    StatementCreationFailure,
    /// Statement was built but executing it failed.
    StatementExecutionFailure,
    /// Reading or setting the transaction isolation level failed.
    TransactionIsolationFailure,
    /// Auto-commit state could not be restored after a transaction.
    AutoCommitRestoreFailure,
    /// Acquiring or using a connection failed.
    ConnectionFailure,
    /// Generic transaction lifecycle failure.
    TransactionFailure,
    /// Releasing a resource failed.
    CloseFailure,
    /// A result was required but none was produced.
    NoResultsFailure,
    /// Consuming or decoding a result set failed.
    ResultSetFailure,
    /// A caller-supplied mapper failed to produce a result from a row.
    ResultProductionFailure,
    /// Low-level driver failure passed through as itself.
    RawFailure,
}

pub const ALL_KINDS: &[Kind] = &[
    Kind::StatementCreationFailure,
    Kind::StatementExecutionFailure,
    Kind::TransactionIsolationFailure,
    Kind::AutoCommitRestoreFailure,
    Kind::ConnectionFailure,
    Kind::TransactionFailure,
    Kind::CloseFailure,
    Kind::NoResultsFailure,
    Kind::ResultSetFailure,
    Kind::ResultProductionFailure,
    Kind::RawFailure,
];

macro_rules! define_group {
    ($id:ident, $code:expr) => {
        pub struct $id;

        impl Sealed for $id {
            const NAME: &'static str = stringify!($id);
            fn is_superclass_of(code: u32) -> bool {
                code & GROUP_MASK == $code
            }
        }

        impl ErrorClass for $id {}
    };
}

macro_rules! define_kinds {
    ($($id:ident = $code:expr,)*) => {
        $(
            pub struct $id;

            impl Sealed for $id {
                const NAME: &'static str = stringify!($id);
                fn is_superclass_of(code: u32) -> bool {
                    code & KIND_MASK == $code
                }
            }

            impl ErrorClass for $id {}

            impl ErrorKind for $id {
                const KIND: Kind = Kind::$id;
            }
        )*

        impl Kind {
            /// Numeric code. The high byte identifies the group.
            pub const fn code(self) -> u32 {
                match self {
                    $(Kind::$id => $code,)*
                }
            }
            pub const fn name(self) -> &'static str {
                match self {
                    $(Kind::$id => stringify!($id),)*
                }
            }
        }
    };
}

define_group!(StatementError, 0x01_00_00_00);
define_group!(TransactionError, 0x02_00_00_00);
define_group!(ConnectionError, 0x03_00_00_00);
define_group!(ResultError, 0x04_00_00_00);

define_kinds! {
    StatementCreationFailure = 0x01_01_00_00,
    StatementExecutionFailure = 0x01_02_00_00,
    TransactionIsolationFailure = 0x02_01_00_00,
    AutoCommitRestoreFailure = 0x02_02_00_00,
    TransactionFailure = 0x02_03_00_00,
    ConnectionFailure = 0x03_01_00_00,
    CloseFailure = 0x03_02_00_00,
    NoResultsFailure = 0x04_01_00_00,
    ResultSetFailure = 0x04_02_00_00,
    ResultProductionFailure = 0x04_03_00_00,
    RawFailure = 0x05_01_00_00,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
