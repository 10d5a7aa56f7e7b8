use rusqlite::types::FromSql;
use rusqlite::Row;

/// Decoding of a single result row.
///
/// Decoding errors are reported through
/// [`result_set_failure`](crate::ExceptionPolicy::result_set_failure).
pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error>;
}

macro_rules! implement_scalar {
    ($($typ:ty),*) => {
        $(
            impl FromRow for $typ {
                fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
                    row.get(0)
                }
            }
        )*
    };
}

macro_rules! implement_tuple {
    ($( $name:ident => $idx:tt ),+) => {
        impl<$($name: FromSql),+> FromRow for ($($name,)+) {
            fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
                Ok(($(row.get::<_, $name>($idx)?,)+))
            }
        }
    };
}

implement_scalar!(i64, i32, f64, bool, String, Vec<u8>);

impl<T: FromSql> FromRow for Option<T> {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        row.get(0)
    }
}

implement_tuple!(A => 0);
implement_tuple!(A => 0, B => 1);
implement_tuple!(A => 0, B => 1, C => 2);
implement_tuple!(A => 0, B => 1, C => 2, D => 3);
