//! Per-request, type-keyed context store.
//!
//! A [`Context`] holds at most one value per Rust type. It is created fresh for
//! every request by the context adapter and dropped once the outermost handler
//! returns; nothing in it outlives the request.
//!
//! # Locking
//!
//! Each store has one reader/writer lock:
//!
//! - [`Context::get`], [`Context::get_into`], [`Context::with`] and
//!   [`Context::contains`] take the read lock and may run in parallel.
//! - [`Context::set`], [`Context::remove`] and [`Context::transaction`] take the
//!   write lock and exclude everything else on the same store.
//!
//! Concurrent `set` of different types is safe; concurrent `set` of the same
//! type is last-write-wins with no ordering beyond mutual exclusion.
//!
//! # Transactions
//!
//! [`Context::transaction`] holds the write lock for the whole closure and
//! hands it a [`Transaction`] view over the same map. Opening a second
//! transaction from inside the closure returns
//! [`StackError::NestedTransaction`]. Touching the store directly from inside
//! the closure would deadlock: the plain accessors panic there, while
//! [`Context::try_set`], [`Context::try_get`], [`Context::try_with`] and
//! [`Context::try_remove`] return `NestedTransaction` instead.
//!
//! # Example
//!
//! ```
//! use stackwork_core::Context;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct UserId(u64);
//!
//! let ctx = Context::new();
//! ctx.set(UserId(7));
//!
//! assert_eq!(ctx.get::<UserId>(), Some(UserId(7)));
//!
//! ctx.transaction(|tx| {
//!     let id = tx.get::<UserId>().map_or(0, |id| id.0);
//!     tx.set(UserId(id + 1));
//! })
//! .unwrap();
//!
//! assert_eq!(ctx.get::<UserId>(), Some(UserId(8)));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::error::{StackError, StackResult};

type ValueMap = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

struct Store {
    values: RwLock<ValueMap>,
    // Thread currently running a transaction on this store.
    holder: Mutex<Option<ThreadId>>,
}

/// Handle to one request's context store.
///
/// Cloning the handle is cheap; all clones refer to the same store.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Store>,
}

impl Context {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Store {
                values: RwLock::new(HashMap::new()),
                holder: Mutex::new(None),
            }),
        }
    }

    /// Stores `value`, replacing the value of the same type if there was one.
    ///
    /// Returns the replaced value.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a [`Context::transaction`] closure of the
    /// same store.
    pub fn set<T: Send + Sync + 'static>(&self, value: T) -> Option<T> {
        self.assert_outside_transaction("set");
        self.insert(value)
    }

    /// Like [`set`](Self::set), but fails instead of panicking when called
    /// from inside a transaction on the same store.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NestedTransaction`] in that case.
    pub fn try_set<T: Send + Sync + 'static>(&self, value: T) -> StackResult<Option<T>> {
        self.check_outside_transaction()?;
        Ok(self.insert(value))
    }

    /// Returns a copy of the stored value of type `T`.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a [`Context::transaction`] closure of the
    /// same store.
    #[must_use]
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.with(T::clone)
    }

    /// Copies the stored value of type `T` into `target`.
    ///
    /// Returns `false` and leaves `target` untouched when nothing of that type
    /// is stored.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a [`Context::transaction`] closure of the
    /// same store.
    pub fn get_into<T: Clone + Send + Sync + 'static>(&self, target: &mut T) -> bool {
        self.with(|stored: &T| target.clone_from(stored)).is_some()
    }

    /// Runs `f` on the stored value of type `T` without copying it.
    ///
    /// The read lock is held while `f` runs.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a [`Context::transaction`] closure of the
    /// same store.
    pub fn with<T, R, F>(&self, f: F) -> Option<R>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&T) -> R,
    {
        self.assert_outside_transaction("get");
        self.read_with(f)
    }

    /// Like [`get`](Self::get), but fails instead of panicking when called
    /// from inside a transaction on the same store.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NestedTransaction`] in that case.
    pub fn try_get<T: Clone + Send + Sync + 'static>(&self) -> StackResult<Option<T>> {
        self.try_with(T::clone)
    }

    /// Like [`with`](Self::with), but fails instead of panicking when called
    /// from inside a transaction on the same store.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NestedTransaction`] in that case.
    pub fn try_with<T, R, F>(&self, f: F) -> StackResult<Option<R>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&T) -> R,
    {
        self.check_outside_transaction()?;
        Ok(self.read_with(f))
    }

    /// Removes and returns the stored value of type `T`.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a [`Context::transaction`] closure of the
    /// same store.
    pub fn remove<T: Send + Sync + 'static>(&self) -> Option<T> {
        self.assert_outside_transaction("remove");
        self.take()
    }

    /// Like [`remove`](Self::remove), but fails instead of panicking when
    /// called from inside a transaction on the same store.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NestedTransaction`] in that case.
    pub fn try_remove<T: Send + Sync + 'static>(&self) -> StackResult<Option<T>> {
        self.check_outside_transaction()?;
        Ok(self.take())
    }

    /// Returns `true` if a value of type `T` is stored.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.assert_outside_transaction("contains");
        self.inner.values.read().contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assert_outside_transaction("len");
        self.inner.values.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` with exclusive access to the store.
    ///
    /// The write lock is taken once and released when `f` returns or unwinds.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NestedTransaction`] if the calling thread is
    /// already inside a transaction on this store.
    pub fn transaction<R, F>(&self, f: F) -> StackResult<R>
    where
        F: FnOnce(&mut Transaction<'_>) -> R,
    {
        let current = thread::current().id();
        if *self.inner.holder.lock() == Some(current) {
            return Err(StackError::NestedTransaction);
        }

        let mut values = self.inner.values.write();
        let _held = HeldBy::mark(&self.inner.holder, current);
        let mut tx = Transaction {
            values: &mut values,
        };
        Ok(f(&mut tx))
    }

    /// Returns `true` if both handles refer to the same store.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    fn in_own_transaction(&self) -> bool {
        *self.inner.holder.lock() == Some(thread::current().id())
    }

    fn check_outside_transaction(&self) -> StackResult<()> {
        if self.in_own_transaction() {
            return Err(StackError::NestedTransaction);
        }
        Ok(())
    }

    fn assert_outside_transaction(&self, op: &str) {
        if self.in_own_transaction() {
            panic!("context store `{op}` called inside its own transaction; use the transaction handle");
        }
    }

    fn insert<T: Send + Sync + 'static>(&self, value: T) -> Option<T> {
        let previous = self
            .inner
            .values
            .write()
            .insert(TypeId::of::<T>(), Box::new(value));
        previous.and_then(downcast_owned)
    }

    fn read_with<T, R, F>(&self, f: F) -> Option<R>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&T) -> R,
    {
        let values = self.inner.values.read();
        values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .map(f)
    }

    fn take<T: Send + Sync + 'static>(&self) -> Option<T> {
        let removed = self.inner.values.write().remove(&TypeId::of::<T>());
        removed.and_then(downcast_owned)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.inner.values.try_read().map(|values| values.len());
        f.debug_struct("Context").field("len", &len).finish()
    }
}

// Clears the transaction marker on every exit path.
struct HeldBy<'a> {
    holder: &'a Mutex<Option<ThreadId>>,
}

impl<'a> HeldBy<'a> {
    fn mark(holder: &'a Mutex<Option<ThreadId>>, thread: ThreadId) -> Self {
        *holder.lock() = Some(thread);
        Self { holder }
    }
}

impl Drop for HeldBy<'_> {
    fn drop(&mut self) {
        *self.holder.lock() = None;
    }
}

fn downcast_owned<T: 'static>(value: Box<dyn Any + Send + Sync>) -> Option<T> {
    let value: Box<dyn Any> = value;
    value.downcast::<T>().ok().map(|boxed| *boxed)
}

/// Exclusive view over a context store, valid inside [`Context::transaction`].
///
/// The view is single-caller by construction: every method takes `&mut self`.
pub struct Transaction<'a> {
    values: &'a mut ValueMap,
}

impl Transaction<'_> {
    /// Stores `value`, replacing the value of the same type. Returns the
    /// replaced value.
    pub fn set<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.values
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(downcast_owned)
    }

    /// Returns a copy of the stored value of type `T`.
    #[must_use]
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.get_ref::<T>().cloned()
    }

    /// Returns a reference to the stored value of type `T`.
    #[must_use]
    pub fn get_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Copies the stored value of type `T` into `target`; see
    /// [`Context::get_into`].
    pub fn get_into<T: Clone + Send + Sync + 'static>(&self, target: &mut T) -> bool {
        match self.get_ref::<T>() {
            Some(stored) => {
                target.clone_from(stored);
                true
            }
            None => false,
        }
    }

    /// Removes and returns the stored value of type `T`.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.values
            .remove(&TypeId::of::<T>())
            .and_then(downcast_owned)
    }

    /// Returns `true` if a value of type `T` is stored.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Record the context adapter stores when it attaches a store to a writer.
///
/// It describes the original writer; the writer itself is reached with
/// [`ResponseWriter::reclaim`](crate::ResponseWriter::reclaim).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    writer_kind: &'static str,
    created_at: Instant,
}

impl Origin {
    /// Creates an origin record for a writer of the given type name.
    #[must_use]
    pub fn new(writer_kind: &'static str) -> Self {
        Self {
            writer_kind,
            created_at: Instant::now(),
        }
    }

    /// Type name of the original writer.
    #[must_use]
    pub fn writer_kind(&self) -> &'static str {
        self.writer_kind
    }

    /// When the store was attached.
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time elapsed since the store was attached.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}
