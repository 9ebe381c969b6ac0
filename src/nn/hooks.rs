//! Forward hooks
//!
//! Every module owns a [`ForwardHooks`] table. [`Module::call`] and
//! [`Module::call_many`] run the forward computation and then hand the
//! inputs and outputs to each registered hook, in registration order.
//! Registering returns a [`HookHandle`]; dropping the handle (or calling
//! [`HookHandle::remove`]) detaches the hook again.
//!
//! [`Module::call`]: crate::nn::Module::call
//! [`Module::call_many`]: crate::nn::Module::call_many

use crate::tensor::Tensor;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Callback observing `(inputs, outputs)` of one forward computation.
pub type ForwardHookFn = dyn Fn(&[Tensor], &[Tensor]);

#[derive(Default)]
struct HookTable {
    next_id: u64,
    entries: Vec<(u64, Rc<ForwardHookFn>)>,
}

/// Per-module registry of forward hooks.
#[derive(Default)]
pub struct ForwardHooks {
    table: Rc<RefCell<HookTable>>,
}

impl ForwardHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `hook`; it stays attached for as long as the returned handle lives.
    #[must_use = "dropping the handle removes the hook immediately"]
    pub fn register<F>(&self, hook: F) -> HookHandle
    where
        F: Fn(&[Tensor], &[Tensor]) + 'static,
    {
        let mut table = self.table.borrow_mut();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.push((id, Rc::new(hook)));

        HookHandle {
            table: Rc::downgrade(&self.table),
            id,
        }
    }

    /// Number of hooks currently attached
    pub fn len(&self) -> usize {
        self.table.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every attached hook.
    ///
    /// The table is snapshotted first, so a hook may register or drop
    /// hooks on this same module while it runs.
    pub(crate) fn fire(&self, inputs: &[Tensor], outputs: &[Tensor]) {
        let snapshot: Vec<Rc<ForwardHookFn>> = self
            .table
            .borrow()
            .entries
            .iter()
            .map(|(_, hook)| Rc::clone(hook))
            .collect();

        for hook in snapshot {
            hook(inputs, outputs);
        }
    }
}

impl fmt::Debug for ForwardHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardHooks")
            .field("attached", &self.len())
            .finish()
    }
}

/// Keeps one forward hook attached; detaches it on drop.
pub struct HookHandle {
    table: Weak<RefCell<HookTable>>,
    id: u64,
}

impl HookHandle {
    /// Detach the hook now.
    pub fn remove(self) {
        // Drop does the work.
    }

    fn detach(&self) {
        // The module may already be gone.
        if let Some(table) = self.table.upgrade() {
            table.borrow_mut().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for HookHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookHandle").field("id", &self.id).finish()
    }
}
