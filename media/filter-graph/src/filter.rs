use crate::error::FilterError;
use crate::event::GraphEvent;
use crate::unit::{DataType, MediaUnit};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;

const DEFAULT_CAPACITY: usize = 50;

/// The transformation performed by a [`Filter`]
///
/// Implemented by conversions, codecs, capture devices, displays and network
/// endpoints. A stage is only ever accessed by one thread at a time.
pub trait Stage: Send + 'static {
    fn name(&self) -> &str;

    /// Kind of units accepted, [`DataType::None`] for sources which are fed
    /// from outside the graph
    fn input_type(&self) -> DataType;

    /// Kind of units produced, [`DataType::None`] for sinks
    fn output_type(&self) -> DataType;

    /// Acquire codec or device resources
    fn init(&mut self) -> Result<(), FilterError> {
        Ok(())
    }

    /// Transform one unit into any number of output units
    fn process(&mut self, unit: MediaUnit) -> Result<Vec<MediaUnit>, FilterError>;

    /// Capture sources are paused and resumed through this
    fn set_active(&mut self, active: bool) {
        let _ = active;
    }
}

/// Snapshot of a filter's counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStats {
    pub name: String,
    pub queued: usize,
    pub dropped: u64,
    pub processed: u64,
    /// Output units produced while no downstream filter was connected
    pub unrouted: u64,
}

struct State {
    queue: VecDeque<MediaUnit>,
    initialized: bool,
    running: bool,
    /// Incremented on every start, a worker exits once it no longer matches
    generation: u64,
    dropped: u64,
    processed: u64,
    unrouted: u64,
    /// Set once the owning graph tore the filter down, input is refused
    destroyed: bool,
}

/// A processing stage with a bounded input queue and its own worker thread
///
/// Filters are shared as `Arc<Filter>`, connections to downstream filters
/// are weak, the [`FilterGraph`](crate::FilterGraph) owns all filters.
pub struct Filter {
    name: String,
    input_type: DataType,
    output_type: DataType,
    capacity: usize,

    events: Option<mpsc::UnboundedSender<GraphEvent>>,
    drop_report_interval: u64,

    stage: Mutex<Box<dyn Stage>>,
    state: Mutex<State>,
    wake: Condvar,

    outputs: Mutex<Vec<Weak<Filter>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Filter {
    pub fn new(stage: Box<dyn Stage>) -> Self {
        Self {
            name: stage.name().into(),
            input_type: stage.input_type(),
            output_type: stage.output_type(),
            capacity: DEFAULT_CAPACITY,
            events: None,
            drop_report_interval: 100,
            stage: Mutex::new(stage),
            state: Mutex::new(State {
                queue: VecDeque::new(),
                initialized: false,
                running: false,
                generation: 0,
                dropped: 0,
                processed: 0,
                unrouted: 0,
                destroyed: false,
            }),
            wake: Condvar::new(),
            outputs: Mutex::new(Vec::new()),
            worker: Mutex::new(None),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Report failures and dropped units to `events`
    pub fn with_events(
        mut self,
        events: mpsc::UnboundedSender<GraphEvent>,
        drop_report_interval: u64,
    ) -> Self {
        self.events = Some(events);
        self.drop_report_interval = drop_report_interval.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_type(&self) -> DataType {
        self.input_type
    }

    pub fn output_type(&self) -> DataType {
        self.output_type
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    pub fn stats(&self) -> FilterStats {
        let state = self.state.lock();

        FilterStats {
            name: self.name.clone(),
            queued: state.queue.len(),
            dropped: state.dropped,
            processed: state.processed,
            unrouted: state.unrouted,
        }
    }

    /// Initialize the stage, must succeed before the filter can be started
    pub fn init(&self) -> Result<(), FilterError> {
        self.stage.lock().init()?;
        self.state.lock().initialized = true;

        Ok(())
    }

    /// Queue `unit` for processing
    ///
    /// Never blocks. When the queue is full the unit is dropped and `false`
    /// is returned, the units already queued are kept. A destroyed filter
    /// refuses every unit.
    pub fn put_input(&self, unit: MediaUnit) -> bool {
        if unit.payload.is_empty() {
            log::warn!("{}: refusing unit without payload", self.name);
            return false;
        }

        let mut state = self.state.lock();

        if state.destroyed {
            log::trace!("{}: refusing unit, filter was destroyed", self.name);
            return false;
        }

        if state.queue.len() >= self.capacity {
            state.dropped += 1;
            let dropped = state.dropped;
            drop(state);

            self.report_drop(dropped);
            return false;
        }

        state.queue.push_back(unit);
        drop(state);

        self.wake.notify_one();
        true
    }

    /// Pop the oldest queued unit without waiting
    pub fn get_input(&self) -> Option<MediaUnit> {
        self.state.lock().queue.pop_front()
    }

    pub fn clear(&self) {
        self.state.lock().queue.clear();
    }

    /// Hand `unit` to every downstream filter
    ///
    /// All but the last connection receive a copy, the last one the unit
    /// itself.
    pub fn send_output(&self, unit: MediaUnit) {
        let outputs: Vec<Arc<Filter>> = self
            .outputs
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();

        let Some((last, rest)) = outputs.split_last() else {
            let unrouted = {
                let mut state = self.state.lock();
                state.unrouted += 1;
                state.unrouted
            };

            if (unrouted - 1) % self.drop_report_interval == 0 {
                log::warn!(
                    "{}: no downstream filter, {unrouted} output units dropped",
                    self.name
                );
            }
            return;
        };

        for output in rest {
            output.put_input(unit.clone());
        }

        last.put_input(unit);
    }

    /// Add `downstream` as out-connection, types are checked by the graph
    pub fn connect(&self, downstream: &Arc<Filter>) {
        let mut outputs = self.outputs.lock();

        outputs.retain(|output| output.strong_count() > 0);

        if outputs
            .iter()
            .any(|output| output.as_ptr() == Arc::as_ptr(downstream))
        {
            return;
        }

        outputs.push(Arc::downgrade(downstream));
    }

    pub fn disconnect(&self, downstream: &Arc<Filter>) {
        self.outputs.lock().retain(|output| {
            output.strong_count() > 0 && output.as_ptr() != Arc::as_ptr(downstream)
        });
    }

    pub fn disconnect_all(&self) {
        self.outputs.lock().clear();
    }

    /// Number of live downstream connections
    pub fn connections(&self) -> usize {
        self.outputs
            .lock()
            .iter()
            .filter(|output| output.strong_count() > 0)
            .count()
    }

    pub fn set_active(&self, active: bool) {
        self.stage.lock().set_active(active);
    }

    /// Spawn the worker thread, does nothing if it is already running
    pub fn start(self: &Arc<Self>) -> Result<(), FilterError> {
        let mut worker = self.worker.lock();

        let generation = {
            let mut state = self.state.lock();

            if state.destroyed {
                return Err(FilterError::Destroyed);
            }

            if !state.initialized {
                return Err(FilterError::NotInitialized);
            }

            if state.running {
                return Ok(());
            }

            state.running = true;
            state.generation += 1;
            state.generation
        };

        let this = self.clone();

        let spawned = thread::Builder::new()
            .name(format!("filter-{}", self.name))
            .spawn(move || this.run(generation));

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                log::debug!("{}: started", self.name);
                Ok(())
            }
            Err(e) => {
                self.state.lock().running = false;
                Err(FilterError::Spawn(e))
            }
        }
    }

    /// Stop the worker and wait for it to exit
    ///
    /// The unit currently being processed is finished first. Can be called
    /// any number of times from any thread. Called from the worker itself it
    /// only signals the stop.
    pub fn stop(&self) {
        let mut worker = self.worker.lock();

        self.state.lock().running = false;
        self.wake.notify_all();

        let Some(handle) = worker.take() else {
            return;
        };

        if handle.thread().id() == thread::current().id() {
            return;
        }

        if handle.join().is_err() {
            log::error!("{}: worker panicked", self.name);
        } else {
            log::debug!("{}: stopped", self.name);
        }
    }

    /// Stop the filter for good
    ///
    /// Queued units are discarded, connections are removed and any further
    /// input is refused. Handles kept outside the graph become inert.
    pub fn destroy(&self) {
        self.state.lock().destroyed = true;
        self.stop();
        self.clear();
        self.disconnect_all();
    }

    fn run(self: Arc<Self>, generation: u64) {
        while let Some(unit) = self.wait_input(generation) {
            self.process(unit);
        }
    }

    /// Block until a unit is available, `None` once stopped
    fn wait_input(&self, generation: u64) -> Option<MediaUnit> {
        let mut state = self.state.lock();

        loop {
            if !state.running || state.generation != generation {
                return None;
            }

            if let Some(unit) = state.queue.pop_front() {
                return Some(unit);
            }

            self.wake.wait(&mut state);
        }
    }

    fn process(&self, unit: MediaUnit) {
        if self.input_type != DataType::None && unit.kind != self.input_type {
            log::warn!(
                "{}: {}",
                self.name,
                FilterError::UnsupportedType(unit.kind)
            );
            return;
        }

        let result = self.stage.lock().process(unit);

        match result {
            Ok(units) => {
                self.state.lock().processed += 1;

                for unit in units {
                    if unit.payload.is_empty() {
                        continue;
                    }

                    self.send_output(unit);
                }
            }
            Err(e) => {
                log::warn!("{}: dropping unit, {e}", self.name);
                self.emit(GraphEvent::ProcessingFailed {
                    filter: self.name.clone(),
                });
            }
        }
    }

    fn report_drop(&self, dropped: u64) {
        if (dropped - 1) % self.drop_report_interval != 0 {
            return;
        }

        log::warn!("{}: queue full, {dropped} units dropped", self.name);

        self.emit(GraphEvent::BufferOverflow {
            filter: self.name.clone(),
            dropped,
        });
    }

    fn emit(&self, event: GraphEvent) {
        if let Some(events) = &self.events {
            // receiver gone means nobody is interested anymore
            let _ = events.send(event);
        }
    }
}

impl Drop for Filter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name)
            .field("input_type", &self.input_type)
            .field("output_type", &self.output_type)
            .finish_non_exhaustive()
    }
}
