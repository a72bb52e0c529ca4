/// Simulation execution loop.
///
/// Drives the scheduler: pops events, advances virtual time, dispatches
/// to a handler. The loop is synchronous and single-threaded, so every
/// handler invocation runs to completion before the next event is
/// popped.

use tracing::trace;

use crate::error::{MeshError, MeshResult};
use crate::event::{Event, EventId, EventStamp, EventType};
use crate::scheduler::Scheduler;
use crate::station::Wakeup;
use crate::time::{VirtualDuration, VirtualTime};

// ── Handler trait ─────────────────────────────────────────────────────

/// Reacts to dispatched events.
///
/// The handler receives the event by value (events own the tasks they
/// carry) together with a [`SimulationContext`] for scheduling
/// follow-ups. An `Err` aborts the run and is returned to the caller.
pub trait EventHandler {
    fn handle(&mut self, ctx: &mut SimulationContext, event: Event) -> MeshResult<()>;
}

/// A handler backed by a closure — useful for tests and one-off scripts.
impl<F> EventHandler for F
where
    F: FnMut(&mut SimulationContext, Event) -> MeshResult<()>,
{
    fn handle(&mut self, ctx: &mut SimulationContext, event: Event) -> MeshResult<()> {
        (self)(ctx, event)
    }
}

// ── Simulation Context ───────────────────────────────────────────────

/// Mutable context passed to the handler on every dispatch.
///
/// Borrows the scheduler, so a handler can only add events through the
/// causal scheduling API below.
pub struct SimulationContext<'a> {
    pub(crate) scheduler: &'a mut Scheduler,
    pub(crate) now: VirtualTime,
}

impl<'a> SimulationContext<'a> {
    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Schedule an event at an absolute virtual time.
    pub fn schedule_at(&mut self, at: VirtualTime, payload: EventType) -> MeshResult<EventId> {
        if at.is_before(self.now) {
            return Err(MeshError::NonCausalEvent {
                requested: at,
                current: self.now,
            });
        }
        Ok(self.scheduler.schedule(at, payload))
    }

    /// Schedule an event `delay` after now.
    pub fn schedule_after(
        &mut self,
        delay: VirtualDuration,
        payload: EventType,
    ) -> MeshResult<EventId> {
        let at = self.now.plus(delay).ok_or(MeshError::TimeOverflow)?;
        Ok(self.scheduler.schedule(at, payload))
    }

    /// Turn a station's wake-up request into a timer event.
    pub fn schedule_wakeup(&mut self, wakeup: Wakeup) -> MeshResult<EventId> {
        if wakeup.at.is_before(self.now) {
            return Err(MeshError::NonCausalEvent {
                requested: wakeup.at,
                current: self.now,
            });
        }
        Ok(self.scheduler.schedule_wakeup(wakeup))
    }

    /// Number of pending events in the scheduler.
    pub fn pending_count(&self) -> usize {
        self.scheduler.len()
    }
}

// ── Simulation ────────────────────────────────────────────────────────

/// Top-level simulation driver.
///
/// Owns the scheduler and tracks the current virtual time.
#[derive(Debug, Default)]
pub struct Simulation {
    scheduler: Scheduler,
    current_time: VirtualTime,
    events_processed: u64,
}

impl Simulation {
    /// Create a new simulation starting at time zero.
    pub fn new() -> Self {
        Simulation {
            scheduler: Scheduler::new(),
            current_time: VirtualTime::ZERO,
            events_processed: 0,
        }
    }

    pub fn current_time(&self) -> VirtualTime {
        self.current_time
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn pending_count(&self) -> usize {
        self.scheduler.len()
    }

    /// Schedule an event before (or between) runs.
    pub fn schedule(&mut self, at: VirtualTime, payload: EventType) -> MeshResult<EventId> {
        if at.is_before(self.current_time) {
            return Err(MeshError::NonCausalEvent {
                requested: at,
                current: self.current_time,
            });
        }
        Ok(self.scheduler.schedule(at, payload))
    }

    /// Execute a single step: pop one event, advance time, dispatch.
    ///
    /// Returns the stamp of the dispatched event, or `None` if the queue
    /// is empty.
    pub fn step(&mut self, handler: &mut dyn EventHandler) -> MeshResult<Option<EventStamp>> {
        let Some(event) = self.scheduler.pop_next() else {
            return Ok(None);
        };

        // Causal scheduling makes this unreachable.
        debug_assert!(
            event.scheduled_at >= self.current_time,
            "time went backward: current={}, event={}",
            self.current_time,
            event.scheduled_at
        );
        self.current_time = event.scheduled_at;
        self.events_processed += 1;

        let stamp = event.stamp();
        trace!(event = %stamp.id, at = %stamp.at, kind = event.payload.label(), "dispatch");

        let mut ctx = SimulationContext {
            scheduler: &mut self.scheduler,
            now: self.current_time,
        };
        handler.handle(&mut ctx, event)?;

        Ok(Some(stamp))
    }

    /// Run until the event queue is empty.
    ///
    /// Returns the number of events processed during this call.
    pub fn run(&mut self, handler: &mut dyn EventHandler) -> MeshResult<u64> {
        let start = self.events_processed;
        while self.step(handler)?.is_some() {}
        Ok(self.events_processed - start)
    }

    /// Run until the queue is empty or `max_steps` events have been
    /// dispatched, whichever comes first.
    pub fn run_for(&mut self, max_steps: u64, handler: &mut dyn EventHandler) -> MeshResult<u64> {
        let start = self.events_processed;
        for _ in 0..max_steps {
            if self.step(handler)?.is_none() {
                break;
            }
        }
        Ok(self.events_processed - start)
    }

    /// Dispatch every event scheduled at or before `horizon`, then park
    /// the clock at `horizon`. Later events stay queued.
    pub fn run_until(
        &mut self,
        horizon: VirtualTime,
        handler: &mut dyn EventHandler,
    ) -> MeshResult<u64> {
        let start = self.events_processed;
        while self
            .scheduler
            .peek_next()
            .is_some_and(|e| e.scheduled_at <= horizon)
        {
            self.step(handler)?;
        }
        if self.current_time.is_before(horizon) {
            self.current_time = horizon;
        }
        Ok(self.events_processed - start)
    }

    /// Events still queued, in no particular order.
    pub fn pending_events(&self) -> impl Iterator<Item = &Event> {
        self.scheduler.pending()
    }

    /// Returns `true` if there are no more events to process.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientId;

    fn t(units: f64) -> VirtualTime {
        VirtualTime::from_units(units)
    }

    fn emit(client: u64) -> EventType {
        EventType::ClientEmit {
            client: ClientId::new(client),
        }
    }

    fn client_of(event: &Event) -> u64 {
        match &event.payload {
            EventType::ClientEmit { client } => client.raw(),
            other => panic!("unexpected payload {}", other),
        }
    }

    #[test]
    fn test_basic_execution_loop() {
        let mut sim = Simulation::new();
        sim.schedule(t(1.0), emit(0)).unwrap();
        sim.schedule(t(2.0), emit(1)).unwrap();
        sim.schedule(t(3.0), emit(2)).unwrap();

        let mut seen = Vec::new();
        let processed = sim
            .run(&mut |_ctx: &mut SimulationContext, event: Event| -> MeshResult<()> {
                seen.push(client_of(&event));
                Ok(())
            })
            .unwrap();

        assert_eq!(processed, 3);
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(sim.current_time(), t(3.0));
    }

    #[test]
    fn test_handler_schedules_followup() {
        let mut sim = Simulation::new();
        sim.schedule(VirtualTime::ZERO, emit(0)).unwrap();

        let mut times = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext, _event: Event| -> MeshResult<()> {
            times.push(ctx.now());
            if ctx.now() < t(3.0) {
                ctx.schedule_after(VirtualDuration::UNIT, emit(0))?;
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(times, vec![t(0.0), t(1.0), t(2.0), t(3.0)]);
    }

    #[test]
    fn test_non_causal_scheduling_rejected() {
        let mut sim = Simulation::new();
        sim.schedule(t(5.0), emit(0)).unwrap();

        let mut result = None;
        sim.run(&mut |ctx: &mut SimulationContext, _event: Event| -> MeshResult<()> {
            result = Some(ctx.schedule_at(t(1.0), emit(1)));
            Ok(())
        })
        .unwrap();

        assert!(matches!(result, Some(Err(MeshError::NonCausalEvent { .. }))));
        assert!(matches!(
            sim.schedule(t(2.0), emit(2)),
            Err(MeshError::NonCausalEvent { .. })
        ));
    }

    #[test]
    fn test_handler_error_aborts_run() {
        let mut sim = Simulation::new();
        sim.schedule(t(1.0), emit(0)).unwrap();
        sim.schedule(t(2.0), emit(1)).unwrap();

        let err = sim
            .run(&mut |_ctx: &mut SimulationContext, _event: Event| -> MeshResult<()> { Err(MeshError::TimeOverflow) })
            .unwrap_err();
        assert!(matches!(err, MeshError::TimeOverflow));
        assert_eq!(sim.events_processed(), 1);
        assert!(!sim.is_finished());
    }

    #[test]
    fn test_run_for_limits_steps() {
        let mut sim = Simulation::new();
        for i in 0..100 {
            sim.schedule(VirtualTime::new(i), emit(i)).unwrap();
        }

        let mut noop = |_ctx: &mut SimulationContext, _event: Event| -> MeshResult<()> { Ok(()) };
        let processed = sim.run_for(10, &mut noop).unwrap();
        assert_eq!(processed, 10);
        assert_eq!(sim.events_processed(), 10);
        assert!(!sim.is_finished());
    }

    #[test]
    fn test_run_until_stops_at_horizon() {
        let mut sim = Simulation::new();
        sim.schedule(t(1.0), emit(0)).unwrap();
        sim.schedule(t(2.0), emit(1)).unwrap();
        sim.schedule(t(4.0), emit(2)).unwrap();

        let mut noop = |_ctx: &mut SimulationContext, _event: Event| -> MeshResult<()> { Ok(()) };
        let processed = sim.run_until(t(2.0), &mut noop).unwrap();
        assert_eq!(processed, 2);
        assert_eq!(sim.current_time(), t(2.0));
        assert_eq!(sim.pending_count(), 1);

        let processed = sim.run_until(t(3.0), &mut noop).unwrap();
        assert_eq!(processed, 0);
        assert_eq!(sim.current_time(), t(3.0));
    }

    #[test]
    fn test_step_by_step() {
        let mut sim = Simulation::new();
        sim.schedule(t(0.5), emit(0)).unwrap();
        sim.schedule(t(1.5), emit(1)).unwrap();

        let mut noop = |_ctx: &mut SimulationContext, _event: Event| -> MeshResult<()> { Ok(()) };

        let first = sim.step(&mut noop).unwrap().unwrap();
        assert_eq!(first.at, t(0.5));
        let second = sim.step(&mut noop).unwrap().unwrap();
        assert_eq!(second.at, t(1.5));
        assert!(first.id < second.id);
        assert!(sim.step(&mut noop).unwrap().is_none());
    }

    #[test]
    fn test_time_monotonicity() {
        let mut sim = Simulation::new();
        for at in [10.0, 5.0, 7.5, 1.0] {
            sim.schedule(t(at), emit(0)).unwrap();
        }

        let mut times = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext, _event: Event| -> MeshResult<()> {
            times.push(ctx.now());
            Ok(())
        })
        .unwrap();

        assert_eq!(times, vec![t(1.0), t(5.0), t(7.5), t(10.0)]);
    }
}
