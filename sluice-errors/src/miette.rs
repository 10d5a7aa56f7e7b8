//! Miette support for sluice errors
//!
//! [miette](https://docs.rs/miette) allows nice formatting of error
//!
use std::fmt::Display;

use crate::Error;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn Display + '_>> {
        Some(Box::new(self.kind_name()))
    }
    fn help(&self) -> Option<Box<dyn Display + '_>> {
        self.statement_text()
            .map(|text| Box::new(format!("while running: {}", text)) as Box<dyn Display>)
    }
}
