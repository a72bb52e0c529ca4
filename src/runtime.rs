//! `MeshRuntime` — owns all stations and clients and dispatches events
//! to them.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::client::{Client, ClientId};
use crate::error::{MeshError, MeshResult};
use crate::event::{Event, EventStamp, EventType};
use crate::metrics::{Metric, MetricsSink, Recorder};
use crate::simulation::{EventHandler, Simulation, SimulationContext};
use crate::station::{
    Discarded, LoadBoard, Message, Station, StationConfig, StationId, StationIo, StationStats,
    Task, TaskId, TaskIdGen, TimerKind, Wakeup,
};
use crate::time::{VirtualDuration, VirtualTime};
use crate::trace::{TraceEntry, TraceInput, TraceOutcome};
use crate::transport::Transport;

// ── Outbound adapter ──────────────────────────────────────────────────

/// The runtime side of [`StationIo`]: wake-ups and forwarded tasks
/// become scheduler events, metrics go to the recorder.
struct Outbound<'r, 's> {
    ctx: &'r mut SimulationContext<'s>,
    transport: &'r mut Transport,
    recorder: &'r mut Recorder,
}

impl StationIo for Outbound<'_, '_> {
    fn now(&self) -> VirtualTime {
        self.ctx.now()
    }

    fn request_wakeup(&mut self, wakeup: Wakeup) -> MeshResult<()> {
        self.ctx.schedule_wakeup(wakeup).map(|_| ())
    }

    fn forward_task(
        &mut self,
        task: Task,
        from: StationId,
        to: StationId,
        delay: VirtualDuration,
    ) -> MeshResult<()> {
        let latency = self.transport.route(self.ctx.now(), from, to, delay);
        self.ctx.schedule_after(
            latency,
            EventType::Delivery {
                to,
                message: Message::Forwarded { from, task },
            },
        )?;
        Ok(())
    }

    fn emit(&mut self, station: StationId, metric: Metric, value: f64) {
        self.recorder.record(station, self.ctx.now(), metric, value);
    }
}

// ── MeshRuntime ───────────────────────────────────────────────────────

/// Manages the stations and clients of a mesh and dispatches events to
/// them.
///
/// Implements [`EventHandler`] so it can be passed directly to
/// [`Simulation::run`]. After every dispatch to a station the runtime
/// publishes that station's queue length on the shared [`LoadBoard`],
/// which is what peers read when choosing where to forward.
pub struct MeshRuntime {
    stations: BTreeMap<StationId, Station>,
    board: Rc<LoadBoard>,
    clients: BTreeMap<ClientId, Client>,
    transport: Transport,
    recorder: Recorder,
    task_ids: TaskIdGen,
    /// Append-only trace of every dispatched station event, when enabled.
    trace: Option<Vec<TraceEntry>>,
    /// Events addressed to stations that do not exist.
    undeliverable: u64,
}

impl MeshRuntime {
    /// Create the stations. Every configuration is validated before any
    /// station exists; the first invalid one aborts construction.
    pub fn new<I>(stations: I, transport: Transport) -> MeshResult<Self>
    where
        I: IntoIterator<Item = (StationId, StationConfig)>,
    {
        let mut configs: BTreeMap<StationId, StationConfig> = BTreeMap::new();
        for (id, config) in stations {
            config
                .validate()
                .map_err(|source| MeshError::InvalidConfig { station: id, source })?;
            if configs.insert(id, config).is_some() {
                return Err(MeshError::StationAlreadyRegistered(id));
            }
        }

        let board = Rc::new(LoadBoard::with_stations(
            configs.iter().map(|(id, c)| (*id, c.capacity)),
        ));

        let mut built = BTreeMap::new();
        for (id, config) in configs {
            let station = Station::new(id, config, board.clone())
                .map_err(|source| MeshError::InvalidConfig { station: id, source })?;
            built.insert(id, station);
        }

        Ok(MeshRuntime {
            stations: built,
            board,
            clients: BTreeMap::new(),
            transport,
            recorder: Recorder::new(),
            task_ids: TaskIdGen::new(),
            trace: None,
            undeliverable: 0,
        })
    }

    /// Record a [`TraceEntry`] for every dispatch, and every transport
    /// hop, from now on.
    pub fn enable_trace(&mut self) {
        self.trace.get_or_insert_with(Vec::new);
        self.transport.enable_log();
    }

    /// Attach a client. Its target station must exist.
    pub fn add_client(&mut self, client: Client) -> MeshResult<()> {
        if !self.stations.contains_key(&client.target()) {
            return Err(MeshError::StationNotFound(client.target()));
        }
        self.clients.insert(client.id(), client);
        Ok(())
    }

    /// Schedule every client's first emission, one exponential gap after
    /// the simulation's current time.
    pub fn start_clients(&mut self, sim: &mut Simulation) -> MeshResult<()> {
        let now = sim.current_time();
        for (id, client) in self.clients.iter_mut() {
            let at = now
                .plus(client.next_interval())
                .ok_or(MeshError::TimeOverflow)?;
            sim.schedule(at, EventType::ClientEmit { client: *id })?;
        }
        Ok(())
    }

    /// Inject a task of `size` into `station` at `at`. The task is
    /// stamped with `at` as its creation time.
    pub fn schedule_arrival(
        &mut self,
        sim: &mut Simulation,
        at: VirtualTime,
        station: StationId,
        size: f64,
    ) -> MeshResult<TaskId> {
        if !self.stations.contains_key(&station) {
            return Err(MeshError::StationNotFound(station));
        }
        let task = Task::new(self.task_ids.next_id(), size, at);
        let id = task.id();
        sim.schedule(
            at,
            EventType::Delivery {
                to: station,
                message: Message::Task(task),
            },
        )?;
        Ok(id)
    }

    // ── Inspection ────────────────────────────────────────────────

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(&id)
    }

    /// All stations in ascending id order.
    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Return all registered station IDs in deterministic (sorted) order.
    pub fn station_ids(&self) -> Vec<StationId> {
        self.stations.keys().copied().collect()
    }

    pub fn station_stats(&self) -> BTreeMap<StationId, StationStats> {
        self.stations
            .iter()
            .map(|(id, s)| (*id, *s.stats()))
            .collect()
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn board(&self) -> &LoadBoard {
        &self.board
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Dispatch trace; empty unless tracing was enabled.
    pub fn trace(&self) -> &[TraceEntry] {
        self.trace.as_deref().unwrap_or(&[])
    }

    /// Number of tasks created by clients or injected so far.
    pub fn tasks_created(&self) -> u64 {
        self.task_ids.minted()
    }

    pub fn undeliverable(&self) -> u64 {
        self.undeliverable
    }

    /// End of run: discard every task still queued or in service. No
    /// metrics are emitted for discarded tasks.
    pub fn teardown(&mut self) -> Discarded {
        let mut total = Discarded::default();
        for station in self.stations.values_mut() {
            let d = station.teardown();
            total.queued += d.queued;
            total.in_service += d.in_service;
            self.board.publish(station.id(), 0);
        }
        info!(
            queued = total.queued,
            in_service = total.in_service,
            "teardown discarded unfinished tasks"
        );
        total
    }

    // ── Dispatch ──────────────────────────────────────────────────

    fn deliver(
        &mut self,
        ctx: &mut SimulationContext,
        stamp: EventStamp,
        to: StationId,
        message: Message,
    ) -> MeshResult<()> {
        let Some(station) = self.stations.get_mut(&to) else {
            self.undeliverable += 1;
            warn!(station = %to, %message, "delivery to unknown station discarded");
            return Ok(());
        };

        let input = match &message {
            Message::Task(task) => TraceInput::Task { task: task.id() },
            Message::Forwarded { from, task } => TraceInput::Forwarded {
                task: task.id(),
                from: *from,
            },
            Message::Unrecognized { label } => TraceInput::Unrecognized {
                label: label.clone(),
            },
        };

        let mut io = Outbound {
            ctx,
            transport: &mut self.transport,
            recorder: &mut self.recorder,
        };
        let outcome = station.on_message(&mut io, message)?;
        self.board.publish(to, station.queue_len());

        if let Some(trace) = self.trace.as_mut() {
            trace.push(TraceEntry {
                time: stamp.at,
                event_id: stamp.id,
                station: to,
                input,
                outcome: outcome.map_or(TraceOutcome::Ignored, TraceOutcome::Admitted),
            });
        }
        Ok(())
    }

    fn fire(
        &mut self,
        ctx: &mut SimulationContext,
        stamp: EventStamp,
        station_id: StationId,
        kind: TimerKind,
    ) -> MeshResult<()> {
        let Some(station) = self.stations.get_mut(&station_id) else {
            self.undeliverable += 1;
            warn!(station = %station_id, timer = %kind, "timer for unknown station discarded");
            return Ok(());
        };

        let mut io = Outbound {
            ctx,
            transport: &mut self.transport,
            recorder: &mut self.recorder,
        };
        let completion = station.on_timer(&mut io, kind)?;
        self.board.publish(station_id, station.queue_len());

        if let Some(trace) = self.trace.as_mut() {
            trace.push(TraceEntry {
                time: stamp.at,
                event_id: stamp.id,
                station: station_id,
                input: TraceInput::Timer { kind },
                outcome: completion.map_or(TraceOutcome::Ignored, |c| TraceOutcome::Completed {
                    task: c.task,
                    next: c.next,
                }),
            });
        }
        Ok(())
    }

    fn client_emit(&mut self, ctx: &mut SimulationContext, id: ClientId) -> MeshResult<()> {
        let Some(client) = self.clients.get_mut(&id) else {
            warn!(client = %id, "emission for unknown client ignored");
            return Ok(());
        };

        let now = ctx.now();
        let task = Task::new(self.task_ids.next_id(), client.next_task_size(), now);
        let target = client.target();
        debug!(client = %id, task = %task.id(), station = %target, "client emits task");

        ctx.schedule_at(
            now,
            EventType::Delivery {
                to: target,
                message: Message::Task(task),
            },
        )?;
        ctx.schedule_after(client.next_interval(), EventType::ClientEmit { client: id })?;
        Ok(())
    }
}

impl EventHandler for MeshRuntime {
    fn handle(&mut self, ctx: &mut SimulationContext, event: Event) -> MeshResult<()> {
        let stamp = event.stamp();
        match event.payload {
            EventType::Delivery { to, message } => self.deliver(ctx, stamp, to, message),
            EventType::Timer { station, kind } => self.fire(ctx, stamp, station, kind),
            EventType::ClientEmit { client } => self.client_emit(ctx, client),
        }
    }
}

impl std::fmt::Debug for MeshRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshRuntime")
            .field("stations", &self.stations.len())
            .field("clients", &self.clients.len())
            .field("tasks_created", &self.task_ids.minted())
            .field("undeliverable", &self.undeliverable)
            .finish()
    }
}
