//! Registered producers and their lifecycle state

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{DiError, DiResult};
use crate::lifecycle::Lifecycle;
use crate::types::{Instance, TypeInfo};

/// Deferred producer of an instance
pub(crate) type Factory = Arc<dyn Fn() -> DiResult<Instance> + Send + Sync>;

/// Process-wide identity of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct EntryId(u64);

impl EntryId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        EntryId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn get(self) -> u64 {
        self.0
    }
}

thread_local! {
    /// Entries whose factory is running on this thread, outermost first
    static RUNNING: RefCell<Vec<(EntryId, &'static str)>> = RefCell::new(Vec::new());
}

/// Marks an entry's factory as running on this thread until dropped
struct RunningGuard;

impl RunningGuard {
    fn enter(id: EntryId, name: &'static str) -> DiResult<Self> {
        RUNNING.with(|running| {
            let mut running = running.borrow_mut();
            if let Some(start) = running.iter().position(|(entry, _)| *entry == id) {
                let mut path: Vec<&str> = running[start..].iter().map(|(_, name)| *name).collect();
                path.push(name);
                return Err(DiError::CircularDependency {
                    path: path.join(" -> "),
                });
            }
            running.push((id, name));
            Ok(RunningGuard)
        })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        RUNNING.with(|running| {
            running.borrow_mut().pop();
        });
    }
}

pub(crate) enum Producer {
    Value(Instance),
    Factory(Factory),
}

/// One registered producer
pub(crate) struct Entry {
    id: EntryId,
    handle: Arc<str>,
    info: TypeInfo,
    lifecycle: Lifecycle,
    producer: Producer,
    memo: OnceLock<DiResult<Instance>>,
}

impl Entry {
    pub(crate) fn new(
        id: EntryId,
        handle: Arc<str>,
        info: TypeInfo,
        lifecycle: Lifecycle,
        producer: Producer,
    ) -> Self {
        Self {
            id,
            handle,
            info,
            lifecycle,
            producer,
            memo: OnceLock::new(),
        }
    }

    pub(crate) fn allocate_id() -> EntryId {
        EntryId::next()
    }

    pub(crate) fn id(&self) -> EntryId {
        self.id
    }

    pub(crate) fn handle(&self) -> &Arc<str> {
        &self.handle
    }

    pub(crate) fn info(&self) -> &TypeInfo {
        &self.info
    }

    /// Produce the instance according to the lifecycle
    ///
    /// Concurrent resolvers of one singleton block on the first caller and
    /// observe the same result, including a memoized failure. A factory that
    /// resolves its own entry again on the same thread gets
    /// `CircularDependency`; that inner error is not memoized.
    pub(crate) fn resolve(&self) -> DiResult<Instance> {
        let factory = match &self.producer {
            Producer::Value(value) => return Ok(Arc::clone(value)),
            Producer::Factory(factory) => factory,
        };

        if let Some(done) = self.memo.get() {
            return done.clone();
        }

        let _running = RunningGuard::enter(self.id, self.info.name())?;
        match self.lifecycle {
            Lifecycle::Prototype => factory(),
            Lifecycle::Singleton => self.memo.get_or_init(|| factory()).clone(),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("type", &self.info.key())
            .field("lifecycle", &self.lifecycle)
            .field("initialized", &self.memo.get().is_some())
            .finish()
    }
}
