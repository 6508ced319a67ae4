//! Stock units.
//!
//! Ready-made middleware for the patterns chains keep needing. Each one
//! remembers where it was constructed and reports that location in chain
//! debug listings.
//!
//! | Unit | Runs its handler | Continues |
//! |---|---|---|
//! | [`Before`] | first | always |
//! | [`ContextBefore`] | first, with the store | always |
//! | [`After`] | after `next`, if the status is `200` or unset | n/a |
//! | [`Around`] | both sides of `next` | always |
//! | [`Defer`] | after `next`, even if it failed or panicked | n/a |
//! | [`Guard`] | first | only if the handler wrote nothing |
//! | [`First`] | in turn until one writes | only if none did |
//! | [`Catch`] | on a panic in `next` | n/a |
//! | [`Stop`] | never | never |
//! | [`Trace`] | n/a | always; logs the outcome |

use http::{HeaderMap, StatusCode};
use stackwork_core::{Context, ResponseWriter};

pub mod after;
pub mod around;
pub mod before;
pub mod catch;
pub mod defer;
pub mod first;
pub mod guard;
pub mod stop;
pub mod trace;

pub use after::After;
pub use around::Around;
pub use before::{Before, ContextBefore};
pub use catch::Catch;
pub use defer::Defer;
pub use first::First;
pub use guard::Guard;
pub use stop::Stop;
pub use trace::Trace;

// What a writer looked like before a handler ran.
// Forwards to the wrapped writer and notes whether anything was written:
// status, mutable header access or body bytes.
pub(crate) struct Peek<'a> {
    inner: &'a mut dyn ResponseWriter,
    changed: bool,
}

impl<'a> Peek<'a> {
    pub(crate) fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            changed: false,
        }
    }

    pub(crate) const fn changed(&self) -> bool {
        self.changed
    }
}

impl ResponseWriter for Peek<'_> {
    fn status(&self) -> Option<StatusCode> {
        self.inner.status()
    }

    fn set_status(&mut self, status: StatusCode) {
        self.changed = true;
        self.inner.set_status(status);
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.changed = true;
        self.inner.headers_mut()
    }

    fn write(&mut self, data: &[u8]) {
        self.changed = true;
        self.inner.write(data);
    }

    fn bytes_written(&self) -> usize {
        self.inner.bytes_written()
    }

    fn flush(&mut self) -> bool {
        self.inner.flush()
    }

    fn context(&self) -> Option<Context> {
        self.inner.context()
    }

    fn reclaim(&mut self) -> &mut dyn ResponseWriter {
        self.inner.reclaim()
    }

    fn kind(&self) -> &'static str {
        self.inner.kind()
    }
}

// `200` or nothing set yet.
pub(crate) fn is_ok_or_unset(writer: &dyn ResponseWriter) -> bool {
    writer.status().map_or(true, |status| status == StatusCode::OK)
}
