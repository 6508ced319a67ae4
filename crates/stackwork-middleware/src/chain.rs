//! Chain compilation.
//!
//! A [`ChainBuilder`] collects units in order and compiles them once into a
//! [`Chain`]: a single nested handler that is then invoked for every request.
//!
//! ## Ordering
//!
//! The first registered unit is the outermost. Compilation walks the list
//! from last to first, starting from a terminal (a no-op unless one is given
//! to [`ChainBuilder::wrap`]), and layers each unit around what it has so far.
//!
//! ```text
//! builder.middleware(a).middleware(b).terminal(app)
//!
//!     a ──► b ──► app
//! ```
//!
//! ## Failure
//!
//! Compilation either returns a complete chain or an error; nothing partial
//! escapes. Errors are [`StackError::UnsupportedUnitKind`] for dynamically
//! registered values that expose no shape and [`StackError::DoubleInjection`]
//! when the chain would attach a context store twice.

use std::any::type_name;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use stackwork_core::{
    ChainConfig, Context, Handler, NoOp, Request, ResponseWriter, SharedHandler, StackError,
    StackResult,
};

use crate::bridge::require_context;
use crate::inject::Injected;
use crate::middleware::{ContextHandler, ContextMiddleware, Middleware, Wrapper};
use crate::stages::{Before, ContextBefore};
use crate::unit::{classify, Candidate, Descriptor, Unit};

/// One registration, not yet compiled.
#[derive(Clone)]
pub struct Entry {
    source: Source,
    type_name: &'static str,
}

#[derive(Clone)]
enum Source {
    Unit(Unit),
    Candidate(Arc<dyn Candidate>),
}

impl Entry {
    /// A value to classify at build time.
    pub fn candidate<C: Candidate>(candidate: C) -> Self {
        Self {
            source: Source::Candidate(Arc::new(candidate)),
            type_name: type_name::<C>(),
        }
    }

    /// An already shared value to classify at build time.
    pub fn shared_candidate(candidate: Arc<dyn Candidate>, type_name: &'static str) -> Self {
        Self {
            source: Source::Candidate(candidate),
            type_name,
        }
    }

    /// An already classified unit.
    #[must_use]
    pub fn unit(unit: Unit) -> Self {
        Self {
            source: Source::Unit(unit),
            type_name: type_name::<Unit>(),
        }
    }

    fn typed<T>(unit: Unit) -> Self {
        Self {
            source: Source::Unit(unit),
            type_name: type_name::<T>(),
        }
    }

    fn resolve(self) -> StackResult<(Unit, Descriptor)> {
        match self.source {
            Source::Unit(unit) => {
                let descriptor = Descriptor::new(&unit, self.type_name);
                Ok((unit, descriptor))
            }
            Source::Candidate(candidate) => classify(candidate, self.type_name),
        }
    }
}

impl From<Unit> for Entry {
    fn from(unit: Unit) -> Self {
        Self::unit(unit)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let classified = match &self.source {
            Source::Unit(unit) => Some(unit.kind()),
            Source::Candidate(_) => None,
        };
        f.debug_struct("Entry")
            .field("type_name", &self.type_name)
            .field("kind", &classified)
            .finish()
    }
}

/// Compiles `entries` into a chain with default settings.
///
/// # Errors
///
/// See [`ChainBuilder::build`].
#[track_caller]
pub fn compile<I>(entries: I) -> StackResult<Chain>
where
    I: IntoIterator<Item = Entry>,
{
    Chain::builder().entries(entries).build()
}

/// A compiled, immutable chain of units.
///
/// A chain is built once and then shared by all requests; it keeps no
/// per-request state. A chain is itself a [`Handler`], so chains nest.
///
/// # Example
///
/// ```
/// use stackwork_core::{empty_request, Handler, ResponseBuffer, ResponseWriter};
/// use stackwork_middleware::Chain;
///
/// let chain = Chain::builder()
///     .before_fn(|w, _req| {
///         w.write(b"hello ");
///         Ok(())
///     })
///     .terminal_fn(|w, _req| {
///         w.write(b"world");
///         Ok(())
///     })
///     .build()
///     .unwrap();
///
/// let mut buffer = ResponseBuffer::new();
/// chain.serve(&mut buffer, &mut empty_request("/")).unwrap();
/// assert_eq!(buffer.body_str(), "hello world");
/// ```
#[derive(Clone)]
pub struct Chain {
    handler: SharedHandler,
    units: usize,
    injects: bool,
    descriptors: Arc<[Descriptor]>,
    location: Option<&'static Location<'static>>,
}

impl Chain {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn builder() -> ChainBuilder {
        ChainBuilder::new()
    }

    /// Creates a builder with the given settings.
    #[must_use]
    pub fn builder_with(config: ChainConfig) -> ChainBuilder {
        ChainBuilder::with_config(config)
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units
    }

    /// Returns `true` if no units were registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units == 0
    }

    /// One descriptor per unit, outermost first. Empty when debug capture
    /// was off.
    #[must_use]
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Source location of the build call. `None` when debug capture was off.
    #[must_use]
    pub fn location(&self) -> Option<&'static Location<'static>> {
        self.location
    }
}

impl Handler for Chain {
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) -> StackResult<()> {
        self.handler.serve(writer, request)
    }

    fn describe(&self) -> Option<String> {
        Some(match self.location {
            Some(location) => format!("chain of {} units built at {location}", self.units),
            None => format!("chain of {} units", self.units),
        })
    }

    fn injects_context(&self) -> bool {
        self.injects
    }
}

impl Candidate for Chain {
    fn as_handler(self: Arc<Self>) -> Option<Arc<dyn Handler>> {
        Some(self)
    }

    fn describe(&self) -> Option<String> {
        Handler::describe(self)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain of {} units", self.units)?;
        if self.injects {
            f.write_str(" with context")?;
        }
        if let Some(location) = self.location {
            write!(f, " built at {location}")?;
        }
        for (index, descriptor) in self.descriptors.iter().enumerate() {
            write!(f, "\n  {index}: {descriptor}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("units", &self.units)
            .field("injects", &self.injects)
            .field("descriptors", &self.descriptors)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Collects units in order and compiles them into a [`Chain`].
///
/// Registration never fails; every check happens when the chain is built.
#[derive(Clone, Default)]
pub struct ChainBuilder {
    entries: Vec<Entry>,
    config: ChainConfig,
}

impl ChainBuilder {
    /// Creates an empty builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty builder with the given settings.
    #[must_use]
    pub fn with_config(config: ChainConfig) -> Self {
        Self {
            entries: Vec::new(),
            config,
        }
    }

    /// Returns the settings the chain will be built with.
    #[must_use]
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers a [`Wrapper`].
    #[must_use]
    pub fn wrapper<W: Wrapper>(self, wrapper: W) -> Self {
        self.push(Entry::typed::<W>(Unit::wrapper(wrapper)))
    }

    /// Registers a wrapper closure.
    #[must_use]
    pub fn wrapper_fn<F>(self, f: F) -> Self
    where
        F: Fn(SharedHandler) -> SharedHandler + Send + Sync + 'static,
    {
        self.wrapper(f)
    }

    /// Registers a handler that runs and then always continues.
    #[track_caller]
    #[must_use]
    pub fn before<H: Handler>(self, handler: H) -> Self {
        self.push(Entry::typed::<H>(Unit::middleware(Before::new(handler))))
    }

    /// Registers a closure that runs and then always continues.
    #[track_caller]
    #[must_use]
    pub fn before_fn<F>(self, f: F) -> Self
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) -> StackResult<()> + Send + Sync + 'static,
    {
        self.before(f)
    }

    /// Registers a terminal handler. Units after it never run.
    #[must_use]
    pub fn terminal<H: Handler>(self, handler: H) -> Self {
        self.push(Entry::typed::<H>(Unit::handler(handler)))
    }

    /// Registers a terminal closure.
    #[must_use]
    pub fn terminal_fn<F>(self, f: F) -> Self
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) -> StackResult<()> + Send + Sync + 'static,
    {
        self.terminal(f)
    }

    /// Registers a [`Middleware`].
    #[must_use]
    pub fn middleware<M: Middleware>(self, middleware: M) -> Self {
        self.push(Entry::typed::<M>(Unit::middleware(middleware)))
    }

    /// Registers a middleware closure.
    #[must_use]
    pub fn middleware_fn<F>(self, f: F) -> Self
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request, &dyn Handler) -> StackResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.middleware(f)
    }

    /// Registers a context handler that runs and then always continues.
    #[track_caller]
    #[must_use]
    pub fn context_before<H: ContextHandler>(self, handler: H) -> Self {
        self.push(Entry::typed::<H>(Unit::context_middleware(
            ContextBefore::new(handler),
        )))
    }

    /// Registers a context closure that runs and then always continues.
    #[track_caller]
    #[must_use]
    pub fn context_before_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Context, &mut dyn ResponseWriter, &mut Request) -> StackResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.context_before(f)
    }

    /// Registers a terminal context handler.
    #[must_use]
    pub fn context_terminal<H: ContextHandler>(self, handler: H) -> Self {
        self.push(Entry::typed::<H>(Unit::context_handler(handler)))
    }

    /// Registers a terminal context closure.
    #[must_use]
    pub fn context_terminal_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Context, &mut dyn ResponseWriter, &mut Request) -> StackResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.context_terminal(f)
    }

    /// Registers a [`ContextMiddleware`].
    #[must_use]
    pub fn context_middleware<M: ContextMiddleware>(self, middleware: M) -> Self {
        self.push(Entry::typed::<M>(Unit::context_middleware(middleware)))
    }

    /// Registers a context middleware closure.
    #[must_use]
    pub fn context_middleware_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Context, &mut dyn ResponseWriter, &mut Request, &dyn Handler) -> StackResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.context_middleware(f)
    }

    /// Registers an already classified unit.
    #[must_use]
    pub fn unit(self, unit: Unit) -> Self {
        self.push(Entry::unit(unit))
    }

    /// Registers a value to be classified at build time.
    #[must_use]
    pub fn candidate<C: Candidate>(self, candidate: C) -> Self {
        self.push(Entry::candidate(candidate))
    }

    /// Registers one entry.
    #[must_use]
    pub fn entry(self, entry: Entry) -> Self {
        self.push(entry)
    }

    /// Registers several entries in order.
    #[must_use]
    pub fn entries<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = Entry>,
    {
        self.entries.extend(entries);
        self
    }

    /// Returns a builder with this builder's units followed by `other`'s.
    ///
    /// Settings are taken from `self`.
    #[must_use]
    pub fn concat(mut self, other: Self) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Compiles the chain around a no-op terminal.
    ///
    /// # Errors
    ///
    /// - [`StackError::UnsupportedUnitKind`] if a value registered with
    ///   [`candidate`](Self::candidate) exposes no shape.
    /// - [`StackError::DoubleInjection`] if the context adapter is registered
    ///   more than once, or an injecting handler is embedded as a unit or
    ///   placed below units as the terminal.
    #[track_caller]
    pub fn build(self) -> StackResult<Chain> {
        let location = Location::caller();
        self.assemble(Arc::new(NoOp), false, location)
    }

    /// Compiles the chain around `next`.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build).
    #[track_caller]
    pub fn wrap<H: Handler>(self, next: H) -> StackResult<Chain> {
        let location = Location::caller();
        self.assemble(Arc::new(next), false, location)
    }

    /// Compiles the chain around a closure.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build).
    #[track_caller]
    pub fn wrap_fn<F>(self, f: F) -> StackResult<Chain>
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) -> StackResult<()> + Send + Sync + 'static,
    {
        self.wrap(f)
    }

    /// Compiles the chain around a no-op terminal and puts the context
    /// adapter outermost.
    ///
    /// Use it for the outermost chain only.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build); additionally
    /// [`StackError::DoubleInjection`] if the builder already holds the
    /// context adapter.
    #[track_caller]
    pub fn build_with_context(self) -> StackResult<Chain> {
        let location = Location::caller();
        self.assemble(Arc::new(NoOp), true, location)
    }

    /// Compiles the chain around a terminal context handler and puts the
    /// context adapter outermost.
    ///
    /// # Errors
    ///
    /// See [`build_with_context`](Self::build_with_context).
    #[track_caller]
    pub fn wrap_with_context<H: ContextHandler>(self, app: H) -> StackResult<Chain> {
        let location = Location::caller();
        self.assemble(Arc::new(require_context(app)), true, location)
    }

    /// Compiles the chain around a terminal context closure and puts the
    /// context adapter outermost.
    ///
    /// # Errors
    ///
    /// See [`build_with_context`](Self::build_with_context).
    #[track_caller]
    pub fn wrap_fn_with_context<F>(self, f: F) -> StackResult<Chain>
    where
        F: Fn(&Context, &mut dyn ResponseWriter, &mut Request) -> StackResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.wrap_with_context(f)
    }

    fn push(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    fn assemble(
        self,
        terminal: SharedHandler,
        inject: bool,
        location: &'static Location<'static>,
    ) -> StackResult<Chain> {
        let Self { entries, config } = self;

        let resolved = entries
            .into_iter()
            .map(Entry::resolve)
            .collect::<StackResult<Vec<_>>>()?;
        check_injection(&resolved, &*terminal, inject)?;

        let units = resolved.len();
        let injects = inject
            || terminal.injects_context()
            || resolved.iter().any(|(unit, _)| unit.injects_context());

        let mut handler = terminal;
        for (unit, _) in resolved.iter().rev() {
            handler = unit.layer(handler);
        }
        if inject {
            handler = Arc::new(Injected::shared(handler));
        }

        let (descriptors, location) = if config.capture_debug {
            let descriptors: Vec<Descriptor> =
                resolved.into_iter().map(|(_, descriptor)| descriptor).collect();
            (descriptors, Some(location))
        } else {
            (Vec::new(), None)
        };

        if config.log_build {
            tracing::debug!(units, injects, location = ?location, "chain built");
        }

        Ok(Chain {
            handler,
            units,
            injects,
            descriptors: descriptors.into(),
            location,
        })
    }
}

impl fmt::Debug for ChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainBuilder")
            .field("entries", &self.entries)
            .field("config", &self.config)
            .finish()
    }
}

fn check_injection(
    units: &[(Unit, Descriptor)],
    terminal: &dyn Handler,
    inject: bool,
) -> StackResult<()> {
    let mut adapters = 0_usize;
    for (unit, descriptor) in units {
        match unit {
            Unit::Wrapper(_) if unit.injects_context() => adapters += 1,
            _ if unit.injects_context() => {
                return Err(StackError::double_injection(format!(
                    "{} already attaches a context store and cannot be embedded",
                    descriptor.type_name()
                )));
            }
            _ => {}
        }
    }

    if adapters > 1 {
        return Err(StackError::double_injection(format!(
            "context adapter registered {adapters} times"
        )));
    }
    if inject && adapters > 0 {
        return Err(StackError::double_injection(
            "builder already holds the context adapter",
        ));
    }
    // an injecting terminal runs its own store below every unit here, so
    // none of them could see it
    if terminal.injects_context() && (inject || !units.is_empty()) {
        return Err(StackError::double_injection(
            "terminal handler already attaches a context store and cannot be embedded",
        ));
    }
    Ok(())
}
