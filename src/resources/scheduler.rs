//! Behavior task storage.
//!
//! The [`Scheduler`] owns one [`BehaviorTask`] per live object plus the
//! queue of [`PendingEvent`]s waiting for delivery. It holds boxed trait
//! objects and closures that are not `Send`, so it lives in the world as a
//! non-send resource:
//!
//! ```ignore
//! world.insert_non_send_resource(Scheduler::default());
//! let scheduler = world.non_send_resource::<Scheduler>();
//! ```
//!
//! Driving the tasks (checking behaviors out, running callbacks, resuming
//! continuations) is done by [`crate::systems::behavior`].

use std::collections::{BTreeMap, VecDeque};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::behavior::{Behavior, BehaviorFactory, Continuation};
use crate::components::objectid::ObjectId;
use crate::events::pending::PendingEvent;
use crate::resources::templatestore::ObjectTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    /// Waiting on at least one behavior suspension.
    Suspended,
    /// Faulted; no further callbacks run.
    Finished,
}

pub(crate) enum SuspensionKind {
    Resume(Continuation),
    /// Engine-owned timer that removes the object once its death animation is over.
    Removal,
}

pub(crate) struct Suspension {
    pub seq: u64,
    pub resume_at: f64,
    pub callback: &'static str,
    /// A timer event for this suspension is already in the queue.
    pub queued: bool,
    pub kind: SuspensionKind,
}

impl Suspension {
    pub fn is_removal(&self) -> bool {
        matches!(self.kind, SuspensionKind::Removal)
    }
}

pub struct BehaviorTask {
    /// `None` while a callback of this task is executing.
    pub(crate) behavior: Option<Box<dyn Behavior>>,
    pub(crate) finished: bool,
    pub(crate) last_callback: &'static str,
    /// Rarely more than a wait plus a pending removal.
    pub(crate) suspensions: SmallVec<[Suspension; 2]>,
    /// Destroy was requested while the behavior was checked out.
    pub(crate) teardown_pending: bool,
    /// Collisions that arrived while the behavior was checked out.
    pub(crate) deferred: VecDeque<PendingEvent>,
}

impl BehaviorTask {
    pub fn new(behavior: Box<dyn Behavior>) -> Self {
        Self {
            behavior: Some(behavior),
            finished: false,
            last_callback: "spawn",
            suspensions: SmallVec::new(),
            teardown_pending: false,
            deferred: VecDeque::new(),
        }
    }

    pub fn state(&self) -> TaskState {
        if self.finished {
            TaskState::Finished
        } else if self.suspensions.iter().any(|s| !s.is_removal()) {
            TaskState::Suspended
        } else {
            TaskState::Running
        }
    }

    pub fn is_checked_out(&self) -> bool {
        self.behavior.is_none()
    }

    pub fn last_callback(&self) -> &'static str {
        self.last_callback
    }

    /// Number of behavior suspensions waiting to resume.
    pub fn pending_waits(&self) -> usize {
        self.suspensions.iter().filter(|s| !s.is_removal()).count()
    }
}

#[derive(Default)]
pub struct Scheduler {
    pub(crate) tasks: BTreeMap<ObjectId, BehaviorTask>,
    pub(crate) events: VecDeque<PendingEvent>,
    next_seq: u64,
}

impl Scheduler {
    pub fn task(&self, id: ObjectId) -> Option<&BehaviorTask> {
        self.tasks.get(&id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    pub(crate) fn push_event(&mut self, event: PendingEvent) {
        self.events.push_back(event);
    }
}

/// Behavior constructors keyed by template id.
#[derive(Default)]
pub struct BehaviorFactories {
    by_template: FxHashMap<String, BehaviorFactory>,
}

impl BehaviorFactories {
    pub fn register(&mut self, template: impl Into<String>, factory: BehaviorFactory) {
        self.by_template.insert(template.into(), factory);
    }

    pub fn contains(&self, template: &str) -> bool {
        self.by_template.contains_key(template)
    }

    /// Build the behavior for a new object of `template`, if one is registered.
    pub fn create(&self, template: &ObjectTemplate) -> Option<Box<dyn Behavior>> {
        self.by_template.get(template.id.as_str()).map(|f| f(template))
    }
}
