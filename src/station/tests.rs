//! Scenario tests for `Station`, driven through a recording `StationIo`.

use std::rc::Rc;

use proptest::prelude::*;

use crate::error::{ConfigError, MeshResult};
use crate::metrics::Metric;
use crate::station::{
    select_best_peer, AdmissionOutcome, LoadBoard, Message, Origin, PeerDirectory, Station,
    StationConfig, StationId, StationIo, StaticDirectory, Task, TaskId, TimerKind, Wakeup,
};
use crate::time::{VirtualDuration, VirtualTime};

// ── Test double ───────────────────────────────────────────────────────

/// Records every outbound call instead of acting on it.
#[derive(Default)]
struct RecordingIo {
    now: VirtualTime,
    wakeups: Vec<Wakeup>,
    forwards: Vec<(TaskId, StationId, StationId, VirtualDuration)>,
    metrics: Vec<(Metric, f64)>,
}

impl RecordingIo {
    fn at(units: f64) -> Self {
        RecordingIo {
            now: t(units),
            ..Default::default()
        }
    }

    fn count(&self, metric: Metric) -> usize {
        self.metrics.iter().filter(|(m, _)| *m == metric).count()
    }

    fn values(&self, metric: Metric) -> Vec<f64> {
        self.metrics
            .iter()
            .filter(|(m, _)| *m == metric)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl StationIo for RecordingIo {
    fn now(&self) -> VirtualTime {
        self.now
    }

    fn request_wakeup(&mut self, wakeup: Wakeup) -> MeshResult<()> {
        self.wakeups.push(wakeup);
        Ok(())
    }

    fn forward_task(
        &mut self,
        task: Task,
        from: StationId,
        to: StationId,
        delay: VirtualDuration,
    ) -> MeshResult<()> {
        self.forwards.push((task.id(), from, to, delay));
        Ok(())
    }

    fn emit(&mut self, _station: StationId, metric: Metric, value: f64) {
        self.metrics.push((metric, value));
    }
}

// ── Helpers ───────────────────────────────────────────────────────────

fn t(units: f64) -> VirtualTime {
    VirtualTime::from_units(units)
}

fn sid(n: u64) -> StationId {
    StationId::new(n)
}

struct Tasks {
    next: u64,
}

impl Tasks {
    fn new() -> Self {
        Tasks { next: 0 }
    }

    fn make(&mut self, size: f64, created: VirtualTime) -> Task {
        let task = Task::new(TaskId::new(self.next), size, created);
        self.next += 1;
        task
    }
}

fn isolated(config: StationConfig) -> Station {
    Station::new(sid(0), config, Rc::new(StaticDirectory::default())).unwrap()
}

/// Fill `station` with one task in service and `queued` waiting.
fn load_up(station: &mut Station, io: &mut RecordingIo, tasks: &mut Tasks, queued: usize) {
    for _ in 0..=queued {
        let task = tasks.make(1.0, io.now);
        station.admit(io, task, Origin::Client).unwrap();
    }
}

// ── Construction ──────────────────────────────────────────────────────

#[test]
fn test_invalid_configuration_rejected() {
    let peers: Rc<dyn PeerDirectory> = Rc::new(StaticDirectory::default());
    assert_eq!(
        Station::new(sid(0), StationConfig::new(0, 1.0), peers.clone()).unwrap_err(),
        ConfigError::ZeroCapacity
    );
    for rate in [0.0, -2.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            Station::new(sid(0), StationConfig::new(3, rate), peers.clone()),
            Err(ConfigError::InvalidServiceRate(_))
        ));
    }
}

#[test]
fn test_new_station_is_idle() {
    let station = isolated(StationConfig::new(3, 1.0));
    assert!(station.is_idle());
    assert_eq!(station.queue_len(), 0);
    assert_eq!(station.capacity(), 3);
    assert!(station.active_task().is_none());
}

// ── Admission ─────────────────────────────────────────────────────────

#[test]
fn test_drop_under_saturation() {
    let mut station = isolated(StationConfig::new(2, 1.0).locally_managed(true));
    let mut io = RecordingIo::default();
    let mut tasks = Tasks::new();
    load_up(&mut station, &mut io, &mut tasks, 2);
    assert_eq!(station.queue_len(), 2);
    let dropped_before = io.count(Metric::DroppedCount);

    let task = tasks.make(1.0, io.now);
    let outcome = station
        .admit(&mut io, task, Origin::Client)
        .unwrap();

    assert_eq!(outcome, AdmissionOutcome::Dropped);
    assert_eq!(io.count(Metric::DroppedCount), dropped_before + 1);
    assert_eq!(io.values(Metric::DroppedCount), vec![1.0]);
    assert_eq!(station.queue_len(), 2);
    assert_eq!(station.stats().dropped, 1);
}

#[test]
fn test_forward_when_better_peer() {
    let board = Rc::new(LoadBoard::with_stations([(sid(0), 10), (sid(1), 10)]));
    let delay = VirtualDuration::from_units(0.25);
    let mut a = Station::new(
        sid(0),
        StationConfig::new(10, 1.0).propagation_delay(delay),
        board.clone(),
    )
    .unwrap();
    let mut io = RecordingIo::default();
    let mut tasks = Tasks::new();

    // B looks busy while A fills up to five queued tasks.
    board.publish(sid(1), 9);
    load_up(&mut a, &mut io, &mut tasks, 5);
    assert_eq!(a.queue_len(), 5);
    assert_eq!(io.count(Metric::ForwardedCount), 0);

    board.publish(sid(1), 1);
    let task = tasks.make(1.0, io.now);
    let id = task.id();
    let outcome = a.admit(&mut io, task, Origin::Client).unwrap();

    assert_eq!(outcome, AdmissionOutcome::Forwarded { to: sid(1) });
    assert_eq!(io.values(Metric::ForwardedCount), vec![1.0]);
    assert_eq!(io.forwards, vec![(id, sid(0), sid(1), delay)]);
    assert_eq!(a.queue_len(), 5);
    assert_eq!(a.stats().forwarded, 1);
}

#[test]
fn test_full_queue_forwards_to_lighter_peer() {
    let peers = Rc::new(StaticDirectory::from_loads(&[(1, 1, 10)]));
    let mut station = Station::new(sid(0), StationConfig::new(2, 1.0), peers).unwrap();
    let mut io = RecordingIo::default();
    let mut tasks = Tasks::new();
    load_up(&mut station, &mut io, &mut tasks, 2);
    assert_eq!(station.queue_len(), station.capacity());

    let task = tasks.make(1.0, io.now);
    let id = task.id();
    let outcome = station.admit(&mut io, task, Origin::Client).unwrap();

    assert_eq!(outcome, AdmissionOutcome::Forwarded { to: sid(1) });
    assert_eq!(io.forwards.len(), 1);
    assert_eq!(io.forwards[0].0, id);
    assert_eq!(io.count(Metric::DroppedCount), 0);
    assert_eq!(station.stats().dropped, 0);
    assert_eq!(station.queue_len(), 2);
}

#[test]
fn test_equal_queues_keep_task_local() {
    let peers = Rc::new(StaticDirectory::from_loads(&[(1, 1, 10)]));
    let mut station = Station::new(sid(0), StationConfig::new(10, 1.0), peers).unwrap();
    let mut io = RecordingIo::default();
    let mut tasks = Tasks::new();
    load_up(&mut station, &mut io, &mut tasks, 1);

    let task = tasks.make(1.0, io.now);
    let outcome = station
        .admit(&mut io, task, Origin::Client)
        .unwrap();
    assert_eq!(outcome, AdmissionOutcome::Enqueued { queue_length: 2 });
    assert!(io.forwards.is_empty());
}

#[test]
fn test_no_eligible_peer_falls_back_to_local_policy() {
    // Every peer is full.
    let peers = Rc::new(StaticDirectory::from_loads(&[(1, 3, 3), (2, 4, 3)]));
    let mut station = Station::new(sid(0), StationConfig::new(2, 1.0), peers).unwrap();
    let mut io = RecordingIo::default();
    let mut tasks = Tasks::new();

    load_up(&mut station, &mut io, &mut tasks, 2);
    assert_eq!(station.queue_len(), 2);
    let task = tasks.make(1.0, io.now);
    let outcome = station
        .admit(&mut io, task, Origin::Client)
        .unwrap();

    assert_eq!(outcome, AdmissionOutcome::Dropped);
    assert!(io.forwards.is_empty());
    assert_eq!(io.count(Metric::DroppedCount), 1);
}

#[test]
fn test_peer_forwarded_task_is_never_forwarded_again() {
    let peers = Rc::new(StaticDirectory::from_loads(&[(1, 0, 10)]));
    let mut station = Station::new(sid(0), StationConfig::new(1, 1.0), peers).unwrap();
    let mut io = RecordingIo::default();
    let mut tasks = Tasks::new();

    let task = tasks.make(1.0, io.now);
    let first = station
        .on_message(&mut io, Message::Forwarded { from: sid(1), task })
        .unwrap();
    let task = tasks.make(1.0, io.now);
    let second = station
        .on_message(&mut io, Message::Forwarded { from: sid(1), task })
        .unwrap();
    let task = tasks.make(1.0, io.now);
    let third = station
        .on_message(&mut io, Message::Forwarded { from: sid(1), task })
        .unwrap();

    assert_eq!(first, Some(AdmissionOutcome::Started));
    assert_eq!(second, Some(AdmissionOutcome::Enqueued { queue_length: 1 }));
    assert_eq!(third, Some(AdmissionOutcome::Dropped));
    assert!(io.forwards.is_empty());
    assert_eq!(station.stats().peer_arrivals, 3);
}

#[test]
fn test_idle_station_serves_immediately() {
    let mut station = isolated(StationConfig::new(3, 1.0));
    let mut io = RecordingIo::at(2.0);
    let mut tasks = Tasks::new();

    let task = tasks.make(1.0, io.now);
    let outcome = station
        .admit(&mut io, task, Origin::Client)
        .unwrap();

    assert_eq!(outcome, AdmissionOutcome::Started);
    assert_eq!(station.queue_len(), 0);
    assert!(!station.is_idle());
    assert_eq!(io.values(Metric::QueueLength), vec![0.0]);
    assert_eq!(io.wakeups.len(), 1);
}

#[test]
fn test_admission_is_deterministic() {
    fn run() -> (Vec<AdmissionOutcome>, Vec<(Metric, f64)>) {
        let peers = Rc::new(StaticDirectory::from_loads(&[(1, 2, 4), (2, 0, 4), (3, 1, 4)]));
        let mut station = Station::new(sid(0), StationConfig::new(3, 2.0), peers).unwrap();
        let mut io = RecordingIo::default();
        let mut tasks = Tasks::new();
        let outcomes = (0..6)
            .map(|i| {
                let task = tasks.make(i as f64, io.now);
                station.admit(&mut io, task, Origin::Client).unwrap()
            })
            .collect();
        (outcomes, io.metrics)
    }
    assert_eq!(run(), run());
}

#[test]
fn test_non_positive_size_served_as_one_unit() {
    let mut station = isolated(StationConfig::new(3, 4.0));
    let mut io = RecordingIo::default();
    let task = Task::new(TaskId::new(0), -3.0, io.now);
    assert_eq!(task.size(), 1.0);

    station.admit(&mut io, task, Origin::Client).unwrap();
    assert_eq!(io.wakeups[0].at, t(0.25));
}

#[test]
fn test_unrecognized_message_discarded() {
    let mut station = isolated(StationConfig::default());
    let mut io = RecordingIo::default();

    let outcome = station
        .on_message(
            &mut io,
            Message::Unrecognized {
                label: "heartbeat".into(),
            },
        )
        .unwrap();

    assert_eq!(outcome, None);
    assert!(station.is_idle());
    assert!(io.metrics.is_empty());
    assert_eq!(station.stats().unrecognized, 1);
}

// ── Service ───────────────────────────────────────────────────────────

#[test]
fn test_service_completion_schedules_correctly() {
    let mut station = isolated(StationConfig::new(3, 2.0));
    let mut io = RecordingIo::at(7.0);
    let mut tasks = Tasks::new();

    let task = tasks.make(10.0, io.now);
    station
        .admit(&mut io, task, Origin::Client)
        .unwrap();

    assert_eq!(
        io.wakeups,
        vec![Wakeup {
            at: t(12.0),
            station: sid(0),
            kind: TimerKind::ServeNext,
        }]
    );
}

#[test]
fn test_response_time_computation() {
    let mut station = isolated(StationConfig::new(3, 1.0));
    let mut tasks = Tasks::new();
    let task = tasks.make(2.0, t(0.0));

    // Arrives (after transport) at time 3 and is served immediately.
    let mut io = RecordingIo::at(3.0);
    station.admit(&mut io, task, Origin::Client).unwrap();
    assert_eq!(io.wakeups[0].at, t(5.0));

    io.now = t(5.0);
    let done = station
        .on_timer(&mut io, TimerKind::ServeNext)
        .unwrap()
        .unwrap();

    assert_eq!(done.response_time, VirtualDuration::from_units(5.0));
    assert_eq!(io.values(Metric::ResponseTime), vec![5.0]);
    assert_eq!(done.next, None);
    assert!(station.is_idle());

    // A second wake-up for the same task emits nothing.
    assert!(station.on_timer(&mut io, TimerKind::ServeNext).unwrap().is_none());
    assert_eq!(io.count(Metric::ResponseTime), 1);
}

#[test]
fn test_fifo_service_order() {
    let mut station = isolated(StationConfig::new(5, 1.0));
    let mut io = RecordingIo::default();
    let mut tasks = Tasks::new();
    load_up(&mut station, &mut io, &mut tasks, 3);

    let mut finished = Vec::new();
    while let Some(active) = station.active_task() {
        io.now = active.completes_at;
        let done = station
            .on_timer(&mut io, TimerKind::ServeNext)
            .unwrap()
            .unwrap();
        finished.push(done.task.raw());
    }

    assert_eq!(finished, vec![0, 1, 2, 3]);
    assert_eq!(io.values(Metric::ResponseTime), vec![1.0, 2.0, 3.0, 4.0]);
    // Admissions report 0, 1, 2, 3; each dequeue reports the new length.
    assert_eq!(
        io.values(Metric::QueueLength),
        vec![0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0]
    );
    assert_eq!(station.stats().completed, 4);
}

#[test]
fn test_spurious_and_early_wakeups_ignored() {
    let mut station = isolated(StationConfig::new(3, 1.0));
    let mut io = RecordingIo::default();
    let mut tasks = Tasks::new();

    assert!(station.on_timer(&mut io, TimerKind::ServeNext).unwrap().is_none());

    let task = tasks.make(4.0, io.now);
    station
        .admit(&mut io, task, Origin::Client)
        .unwrap();
    io.now = t(1.0);
    assert!(station.on_timer(&mut io, TimerKind::ServeNext).unwrap().is_none());
    assert!(station.on_timer(&mut io, TimerKind::Other(3)).unwrap().is_none());

    assert!(station.active_task().is_some());
    assert_eq!(io.count(Metric::ResponseTime), 0);
}

#[test]
fn test_teardown_discards_without_metrics() {
    let mut station = isolated(StationConfig::new(4, 1.0));
    let mut io = RecordingIo::default();
    let mut tasks = Tasks::new();
    load_up(&mut station, &mut io, &mut tasks, 2);
    let emitted = io.metrics.len();

    let discarded = station.teardown();

    assert_eq!(discarded.queued, 2);
    assert_eq!(discarded.in_service, 1);
    assert!(station.is_idle());
    assert_eq!(io.metrics.len(), emitted);
    assert_eq!(station.teardown().queued, 0);
}

// ── Properties ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Arrive(f64),
    Forwarded(f64),
    Complete,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-1.0f64..8.0).prop_map(Op::Arrive),
        (0.1f64..4.0).prop_map(Op::Forwarded),
        Just(Op::Complete),
    ]
}

fn directory(loads: &[(usize, usize)]) -> StaticDirectory {
    let triples: Vec<(u64, usize, usize)> = loads
        .iter()
        .enumerate()
        .map(|(i, &(len, cap))| (i as u64 + 1, len, cap))
        .collect();
    StaticDirectory::from_loads(&triples)
}

proptest! {
    #[test]
    fn prop_queue_bounded_and_idle_consistent(
        capacity in 1usize..6,
        locally_managed in any::<bool>(),
        loads in proptest::collection::vec((0usize..8, 1usize..8), 0..4),
        ops in proptest::collection::vec(op_strategy(), 1..60),
    ) {
        let config = StationConfig::new(capacity, 1.5).locally_managed(locally_managed);
        let mut station = Station::new(sid(0), config, Rc::new(directory(&loads))).unwrap();
        let mut io = RecordingIo::default();
        let mut tasks = Tasks::new();

        for op in ops {
            match op {
                Op::Arrive(size) => {
                    let task = tasks.make(size, io.now);
                    station.admit(&mut io, task, Origin::Client).unwrap();
                }
                Op::Forwarded(size) => {
                    let task = tasks.make(size, io.now);
                    station.admit(&mut io, task, Origin::Peer(sid(1))).unwrap();
                }
                Op::Complete => {
                    if let Some(active) = station.active_task() {
                        io.now = active.completes_at;
                    }
                    station.on_timer(&mut io, TimerKind::ServeNext).unwrap();
                }
            }

            prop_assert!(station.queue_len() <= station.capacity());
            prop_assert_eq!(
                station.is_idle(),
                station.active_task().is_none() && station.next_queued().is_none()
            );
            // Work-conserving: nothing waits while the slot is free.
            if station.next_queued().is_some() {
                prop_assert!(station.active_task().is_some());
            }
        }

        let s = *station.stats();
        prop_assert_eq!(io.count(Metric::DroppedCount) as u64, s.dropped);
        prop_assert_eq!(io.count(Metric::ForwardedCount) as u64, s.forwarded);
        prop_assert_eq!(io.count(Metric::ResponseTime) as u64, s.completed);
        let discarded = station.teardown();
        prop_assert_eq!(
            s.arrivals + s.peer_arrivals,
            s.completed + s.forwarded + s.dropped
                + discarded.queued as u64 + discarded.in_service as u64
        );
    }

    #[test]
    fn prop_peer_selection_greedy_and_idempotent(
        loads in proptest::collection::vec((0usize..6, 1usize..6), 0..8),
    ) {
        let dir = directory(&loads);
        let first = select_best_peer(&dir, sid(0));
        let second = select_best_peer(&dir, sid(0));
        prop_assert_eq!(first, second);

        if loads.iter().any(|&(len, _)| len == 0) {
            prop_assert_eq!(first.map(|p| p.queue_length), Some(0));
        }
        if let Some(peer) = first {
            prop_assert!(peer.id != sid(0));
            prop_assert!(peer.queue_length == 0 || !peer.is_full());
            let eligible_min = dir
                .peers()
                .filter(|p| !p.is_full())
                .map(|p| p.queue_length)
                .min();
            if peer.queue_length > 0 {
                prop_assert_eq!(Some(peer.queue_length), eligible_min);
            }
        } else {
            prop_assert!(dir.peers().all(|p| p.is_full() && p.queue_length > 0));
        }
    }
}
