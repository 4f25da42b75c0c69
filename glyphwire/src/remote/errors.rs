// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Routing of asynchronous protocol errors to the objects owning the failed resource.

use std::rc::{Rc, Weak};

use core::cell::{Cell, RefCell};
use core::fmt::{Debug, Display, Formatter};
use hashbrown::HashMap;
use log::{error, trace};

use super::ResourceId;

/// An error reported by the server for an earlier request.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ErrorEvent {
    /// The resource the failed request referred to.
    pub resource: ResourceId,
    /// Protocol error code.
    pub code: u8,
    /// Major opcode of the failed request.
    pub major_opcode: u8,
    /// Minor opcode of the failed request.
    pub minor_opcode: u16,
}

impl Display for ErrorEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "error {} on resource {:#x} (request {}.{})",
            self.code, self.resource, self.major_opcode, self.minor_opcode
        )
    }
}

/// A permanent failure flag shared between an owner and its subscriptions.
///
/// Once tripped a latch stays tripped. The first trip is logged at error severity,
/// later ones are silent.
#[derive(Clone)]
pub struct ErrorLatch(Rc<LatchState>);

struct LatchState {
    owner: &'static str,
    tripped: Cell<bool>,
}

impl ErrorLatch {
    /// Creates an untripped latch; `owner` names the owning object in log messages.
    pub fn new(owner: &'static str) -> Self {
        Self(Rc::new(LatchState {
            owner,
            tripped: Cell::new(false),
        }))
    }

    /// Whether the latch has been tripped.
    pub fn is_tripped(&self) -> bool {
        self.0.tripped.get()
    }

    /// Trips the latch. Returns `true` if this call tripped it.
    pub fn trip(&self, reason: &dyn Display) -> bool {
        if self.0.tripped.replace(true) {
            return false;
        }
        error!("{}: {reason}; disabling further requests", self.0.owner);
        true
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for ErrorLatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ErrorLatch")
            .field("owner", &self.0.owner)
            .field("tripped", &self.0.tripped.get())
            .finish()
    }
}

type Registry = RefCell<HashMap<ResourceId, ErrorLatch>>;

/// Delivers [`ErrorEvent`]s to the latch subscribed for the failed resource.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone, Default)]
pub struct ErrorDispatch {
    registry: Rc<Registry>,
}

impl ErrorDispatch {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes errors for `resource` to `latch` until the returned subscription is dropped.
    pub fn subscribe(&self, resource: ResourceId, latch: &ErrorLatch) -> Subscription {
        self.registry.borrow_mut().insert(resource, latch.clone());
        Subscription {
            resource,
            latch: latch.clone(),
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Delivers an error event. Returns `true` if a subscriber received it.
    pub fn dispatch(&self, event: &ErrorEvent) -> bool {
        let latch = self.registry.borrow().get(&event.resource).cloned();
        match latch {
            Some(latch) => {
                latch.trip(event);
                true
            }
            None => {
                trace!("ignoring {event}: no subscriber");
                false
            }
        }
    }

    /// Number of subscribed resources.
    pub fn len(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Whether no resource is subscribed.
    pub fn is_empty(&self) -> bool {
        self.registry.borrow().is_empty()
    }
}

impl Debug for ErrorDispatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ErrorDispatch")
            .field("subscriptions", &self.len())
            .finish()
    }
}

/// Keeps a resource subscribed to an [`ErrorDispatch`]; unsubscribes on drop.
pub struct Subscription {
    resource: ResourceId,
    latch: ErrorLatch,
    registry: Weak<Registry>,
}

impl Subscription {
    /// The subscribed resource.
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    /// Whether the latch behind this subscription has been tripped.
    pub fn is_failed(&self) -> bool {
        self.latch.is_tripped()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.borrow_mut();
        // Ids can be reused by the server after a free; only remove our own entry.
        if registry
            .get(&self.resource)
            .is_some_and(|latch| latch.ptr_eq(&self.latch))
        {
            registry.remove(&self.resource);
        }
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("resource", &self.resource)
            .field("failed", &self.is_failed())
            .finish()
    }
}
