//! Behavior scheduling.
//!
//! Runs each object's [`Behavior`] as a cooperative task. A callback runs by
//! checking the behavior out of its [`BehaviorTask`], handing it a
//! [`BehaviorCtx`] over the whole world, and checking it back in afterwards.
//! While checked out the task is busy: collisions aimed at it are deferred
//! until it is checked back in, and a nested `move_request` is refused.
//!
//! A callback that returns [`Flow::Wait`] leaves a suspension on its task.
//! Each tick, suspensions whose resume time has passed are turned into
//! `timer_expired` events and their continuations run when those events are
//! delivered.
//!
//! A callback error never escapes a task: it is logged and the task is
//! marked finished.

use bevy_ecs::prelude::*;
use log::{debug, warn};

use crate::behavior::{Behavior, BehaviorCtx, Flow, Inert, MoveDecision};
use crate::components::gridposition::Coord;
use crate::components::lifecycle::Lifecycle;
use crate::components::objectid::ObjectId;
use crate::components::piececolor::PieceColor;
use crate::error::{BoardError, CallbackError, CallbackResult, MoveError};
use crate::events::pending::{EventPayload, PendingEvent};
use crate::resources::objectindex::ObjectIndex;
use crate::resources::scheduler::{
    BehaviorFactories, BehaviorTask, Scheduler, Suspension, SuspensionKind, TaskState,
};
use crate::resources::templatestore::TemplateStore;
use crate::resources::worldtime::WorldTime;
use crate::systems::registry::{self, ObjectSnapshot};
use crate::systems::{collision, grid};

/// Result of trying to run one callback on a task.
pub(crate) enum Invocation<R> {
    Ran(R),
    Faulted(CallbackError),
    /// The task is already executing a callback.
    Busy,
    Finished,
    Missing,
}

/// Check the behavior of `id` out, run `f` on it and check it back in.
pub(crate) fn invoke<R>(
    world: &mut World,
    id: ObjectId,
    callback: &'static str,
    f: impl FnOnce(&mut Box<dyn Behavior>, &mut BehaviorCtx<'_>) -> CallbackResult<R>,
) -> Invocation<R> {
    let mut behavior = {
        let mut scheduler = world.non_send_resource_mut::<Scheduler>();
        let Some(task) = scheduler.tasks.get_mut(&id) else {
            return Invocation::Missing;
        };
        if task.finished {
            return Invocation::Finished;
        }
        let Some(behavior) = task.behavior.take() else {
            return Invocation::Busy;
        };
        task.last_callback = callback;
        behavior
    };

    let result = {
        let mut ctx = BehaviorCtx::new(world, id, callback);
        f(&mut behavior, &mut ctx)
    };

    let outcome = match result {
        Ok(value) => Invocation::Ran(value),
        Err(err) => {
            mark_faulted(world, id, callback, &err);
            Invocation::Faulted(err)
        }
    };
    check_in(world, id, behavior);
    outcome
}

fn mark_faulted(world: &mut World, id: ObjectId, callback: &'static str, err: &CallbackError) {
    warn!("behavior fault in {}() of object {}: {}", callback, id, err);
    let mut scheduler = world.non_send_resource_mut::<Scheduler>();
    if let Some(task) = scheduler.tasks.get_mut(&id) {
        task.finished = true;
        task.suspensions.retain(|s| s.is_removal());
    }
}

fn check_in(world: &mut World, id: ObjectId, behavior: Box<dyn Behavior>) {
    let (teardown, deferred) = {
        let mut scheduler = world.non_send_resource_mut::<Scheduler>();
        let Some(task) = scheduler.tasks.get_mut(&id) else {
            return;
        };
        task.behavior = Some(behavior);
        (
            std::mem::take(&mut task.teardown_pending),
            std::mem::take(&mut task.deferred),
        )
    };
    if teardown {
        finish_teardown(world, id);
        return;
    }
    for event in deferred {
        deliver(world, event);
    }
}

/// Run a callback that may wait, and record the suspension if it does.
fn run_flow(
    world: &mut World,
    id: ObjectId,
    callback: &'static str,
    f: impl FnOnce(&mut Box<dyn Behavior>, &mut BehaviorCtx<'_>) -> CallbackResult<Flow>,
) -> Invocation<()> {
    match invoke(world, id, callback, f) {
        Invocation::Ran(flow) => {
            if let Flow::Wait { seconds, then } = flow {
                suspend(world, id, callback, seconds, SuspensionKind::Resume(then));
            }
            Invocation::Ran(())
        }
        Invocation::Faulted(err) => Invocation::Faulted(err),
        Invocation::Busy => Invocation::Busy,
        Invocation::Finished => Invocation::Finished,
        Invocation::Missing => Invocation::Missing,
    }
}

fn suspend(
    world: &mut World,
    id: ObjectId,
    callback: &'static str,
    seconds: f32,
    kind: SuspensionKind,
) {
    let now = world.resource::<WorldTime>().elapsed;
    let mut scheduler = world.non_send_resource_mut::<Scheduler>();
    let seq = scheduler.next_seq();
    let Some(task) = scheduler.tasks.get_mut(&id) else {
        // torn down while the callback ran
        return;
    };
    if task.finished && !matches!(kind, SuspensionKind::Removal) {
        return;
    }
    task.suspensions.push(Suspension {
        seq,
        resume_at: now + f64::from(seconds.max(0.0)),
        callback,
        queued: false,
        kind,
    });
}

/// Destroy `id` once `seconds` of simulated time have passed.
pub(crate) fn schedule_removal(world: &mut World, id: ObjectId, seconds: f32) {
    debug!("object {} removal scheduled in {}s", id, seconds);
    suspend(world, id, "destroy", seconds, SuspensionKind::Removal);
}

/// Spawn an object, start its behavior task and run `init`.
pub fn spawn(
    world: &mut World,
    template: &str,
    at: Coord,
    color: Option<PieceColor>,
) -> Result<ObjectId, BoardError> {
    let id = registry::spawn_object(world, template, at, color)?;
    let behavior = {
        let templates = world.resource::<TemplateStore>();
        let factories = world.non_send_resource::<BehaviorFactories>();
        templates.get(template).and_then(|t| factories.create(t))
    }
    .unwrap_or_else(|| Box::new(Inert) as Box<dyn Behavior>);
    world
        .non_send_resource_mut::<Scheduler>()
        .tasks
        .insert(id, BehaviorTask::new(behavior));
    run_flow(world, id, "init", |b, ctx| b.init(ctx));
    Ok(id)
}

/// Destroy `id`: run its `destroy` callback, drop its task and remove it.
///
/// Unknown ids and objects already being torn down are ignored. If the
/// object's behavior is executing right now, the object leaves the grid at
/// once and the rest happens when the callback returns.
pub fn destroy(world: &mut World, id: ObjectId) {
    match registry::lifecycle(world, id) {
        None | Some(Lifecycle::TearingDown) => return,
        Some(_) => {}
    }
    registry::set_lifecycle(world, id, Lifecycle::TearingDown);

    let checked_out = {
        let mut scheduler = world.non_send_resource_mut::<Scheduler>();
        match scheduler.tasks.get_mut(&id) {
            Some(task) if task.is_checked_out() => {
                task.teardown_pending = true;
                true
            }
            _ => false,
        }
    };
    if checked_out {
        grid::detach(world, id);
        debug!("object {} teardown deferred until its callback returns", id);
        return;
    }
    finish_teardown(world, id);
}

fn finish_teardown(world: &mut World, id: ObjectId) {
    let _ = invoke(world, id, "destroy", |b, ctx| b.destroy(ctx));
    // dropping the task discards every pending continuation
    let task = world.non_send_resource_mut::<Scheduler>().tasks.remove(&id);
    drop(task);
    registry::remove_object(world, id);
}

/// Give `target` its collision callback for `other`. Returns whether the
/// callback cancelled the default outcome.
pub(crate) fn deliver_collision(world: &mut World, target: ObjectId, other: &ObjectSnapshot) -> bool {
    if !registry::is_active(world, target) {
        return false;
    }
    let mut cancelled = false;
    let outcome = invoke(world, target, "collision", |b, ctx| {
        let flow = b.collision(ctx, other);
        cancelled = ctx.collision_cancelled();
        flow
    });
    match outcome {
        Invocation::Ran(Flow::Wait { seconds, then }) => {
            suspend(world, target, "collision", seconds, SuspensionKind::Resume(then));
        }
        Invocation::Busy => {
            defer(world, target, PendingEvent::collision(target, other.clone()));
        }
        _ => {}
    }
    cancelled
}

fn defer(world: &mut World, target: ObjectId, event: PendingEvent) {
    let mut scheduler = world.non_send_resource_mut::<Scheduler>();
    if let Some(task) = scheduler.tasks.get_mut(&target) {
        task.deferred.push_back(event);
    }
}

/// Ask a custom piece whether it may move from `from` to `to`.
pub(crate) fn ask_move_request(
    world: &mut World,
    id: ObjectId,
    from: Coord,
    to: Coord,
) -> Result<MoveDecision, MoveError> {
    let fault = |message: &str| MoveError::BehaviorFault {
        callback: "move_request",
        message: message.to_string(),
    };
    match invoke(world, id, "move_request", |b, ctx| b.move_request(ctx, from, to)) {
        Invocation::Ran(decision) => Ok(decision),
        Invocation::Faulted(err) => Err(fault(&err.message)),
        Invocation::Busy => {
            warn!("move_request() of object {} re-entered while it is running", id);
            Err(fault("re-entered while the behavior is running"))
        }
        Invocation::Finished => Err(fault("behavior has finished")),
        Invocation::Missing => Err(fault("object has no behavior")),
    }
}

/// Ask a custom piece for its legal targets. Any failure yields no moves.
pub(crate) fn ask_valid_moves(world: &mut World, id: ObjectId, at: Coord) -> Vec<Coord> {
    match invoke(world, id, "get_valid_moves", |b, ctx| b.valid_moves(ctx, at)) {
        Invocation::Ran(moves) => moves,
        _ => Vec::new(),
    }
}

pub(crate) fn queue_event(world: &mut World, event: PendingEvent) {
    world.non_send_resource_mut::<Scheduler>().push_event(event);
}

fn deliver(world: &mut World, event: PendingEvent) {
    let id = event.target;
    if let EventPayload::Timer { seq } = event.payload {
        resume(world, id, seq);
        return;
    }
    if let EventPayload::Collision { other } = &event.payload {
        // too late to cancel anything
        let _ = deliver_collision(world, id, other);
        return;
    }
    if registry::lifecycle(world, id).is_none_or(|l| l == Lifecycle::TearingDown) {
        return;
    }
    if let Invocation::Busy = run_flow(world, id, "event", |b, ctx| b.event(ctx, &event)) {
        defer(world, id, event);
    }
}

fn resume(world: &mut World, id: ObjectId, seq: u64) {
    let active = registry::is_active(world, id);
    let suspension = {
        let mut scheduler = world.non_send_resource_mut::<Scheduler>();
        let Some(task) = scheduler.tasks.get_mut(&id) else {
            return;
        };
        let busy = task.is_checked_out();
        let Some(pos) = task.suspensions.iter().position(|s| s.seq == seq) else {
            return;
        };
        let held = &mut task.suspensions[pos];
        if !held.is_removal() && (!active || busy) {
            held.queued = false;
            return;
        }
        task.suspensions.remove(pos)
    };

    match suspension.kind {
        SuspensionKind::Removal => destroy(world, id),
        SuspensionKind::Resume(then) => {
            let callback = suspension.callback;
            run_flow(world, id, callback, |_, ctx| then(ctx));
        }
    }
}

/// Queue `timer_expired` for every suspension that came due, by ascending
/// object id and then resume time. Behavior suspensions of objects that are
/// no longer active are held back.
pub(crate) fn enqueue_due_timers(world: &mut World) {
    let now = world.resource::<WorldTime>().elapsed;
    let due: Vec<(ObjectId, u64)> = {
        let scheduler = world.non_send_resource::<Scheduler>();
        let mut due = Vec::new();
        for (&id, task) in &scheduler.tasks {
            let held = !registry::is_active(world, id);
            let mut ready: Vec<&Suspension> = task
                .suspensions
                .iter()
                .filter(|s| !s.queued && s.resume_at <= now && (s.is_removal() || !held))
                .collect();
            ready.sort_by(|a, b| a.resume_at.total_cmp(&b.resume_at).then(a.seq.cmp(&b.seq)));
            due.extend(ready.into_iter().map(|s| (id, s.seq)));
        }
        due
    };

    let mut scheduler = world.non_send_resource_mut::<Scheduler>();
    for (id, seq) in due {
        if let Some(s) = scheduler
            .tasks
            .get_mut(&id)
            .and_then(|t| t.suspensions.iter_mut().find(|s| s.seq == seq))
        {
            s.queued = true;
        }
        scheduler.push_event(PendingEvent::timer_expired(id, seq));
    }
}

/// Deliver the events queued so far. Events queued during delivery wait for
/// the next pass.
pub(crate) fn deliver_pending_events(world: &mut World) {
    let count = world.non_send_resource::<Scheduler>().events.len();
    for _ in 0..count {
        let Some(event) = world.non_send_resource_mut::<Scheduler>().events.pop_front() else {
            break;
        };
        deliver(world, event);
    }
}

/// Run `update` for every active, runnable task in ascending id order.
pub(crate) fn run_updates(world: &mut World) {
    let dt = world.resource::<WorldTime>().delta;
    let ids = world.resource::<ObjectIndex>().ids();
    for id in ids {
        if !registry::is_active(world, id) {
            continue;
        }
        let runnable = world
            .non_send_resource::<Scheduler>()
            .task(id)
            .is_some_and(|t| t.state() == TaskState::Running && !t.is_checked_out());
        if runnable {
            run_flow(world, id, "update", |b, ctx| b.update(ctx, dt));
        }
    }
}

/// Behavior half of a tick: timers, events, updates, contact resolution,
/// then the events those produced.
pub fn run_behaviors(world: &mut World) {
    enqueue_due_timers(world);
    deliver_pending_events(world);
    run_updates(world);
    collision::resolve_contacts(world);
    deliver_pending_events(world);
}

pub fn task_state(world: &World, id: ObjectId) -> Option<TaskState> {
    world
        .non_send_resource::<Scheduler>()
        .task(id)
        .map(BehaviorTask::state)
}
