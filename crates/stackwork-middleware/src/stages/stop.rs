//! A terminal that ends the chain without responding.

use std::fmt;
use std::sync::Arc;

use stackwork_core::{Handler, Request, ResponseWriter, StackResult};

use crate::unit::Candidate;

/// Does nothing and never continues.
///
/// Registered as a terminal, it cuts off every unit after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stop;

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<Stop>")
    }
}

impl Handler for Stop {
    fn serve(&self, _writer: &mut dyn ResponseWriter, _request: &mut Request) -> StackResult<()> {
        Ok(())
    }

    fn describe(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl Candidate for Stop {
    fn as_handler(self: Arc<Self>) -> Option<Arc<dyn Handler>> {
        Some(self)
    }
}
