use std::fmt;

use crate::fields::Attributes;
use crate::{Error, RawFailure};

pub struct DisplayError<'a>(&'a Error, bool);
pub struct VerboseError<'a>(&'a Error);

pub fn display_error(e: &Error, verbose: bool) -> DisplayError {
    DisplayError(e, verbose)
}
pub fn display_error_verbose(e: &Error) -> VerboseError {
    VerboseError(e)
}

impl fmt::Display for DisplayError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let DisplayError(ref e, verbose) = self;
        write!(f, "{:#}", e)?;
        // raw failures have no message of their own, statement is the only hint
        if e.is::<RawFailure>() || *verbose {
            if let Some(text) = e.statement_text() {
                write!(f, "\n  Statement:")?;
                for line in text.lines() {
                    write!(f, "\n      {}", line)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for VerboseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let e = self.0;
        writeln!(f, "Error type: {}", e.kind_debug())?;
        writeln!(f, "Message: {:#}", e)?;
        if let Some(level) = e.isolation_level() {
            writeln!(f, "Isolation level: {}", level)?;
        }
        if let Some(text) = e.statement_text() {
            writeln!(f, "Statement:")?;
            for line in text.lines() {
                writeln!(f, "    {}", line)?;
            }
        }
        if let Some(attr) = e.get::<Attributes>().filter(|a| !a.is_empty()) {
            writeln!(f, "Attributes:")?;
            for (k, v) in attr {
                writeln!(f, "  {}: {}", k, v)?;
            }
        }
        Ok(())
    }
}
