use crate::config::GraphConfig;
use crate::convert::find_conversion;
use crate::error::{Direction, FilterError, GraphError};
use crate::event::GraphEvent;
use crate::filter::{Filter, FilterStats, Stage};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Supplies the stages the graph does not implement itself
///
/// Capture devices, codecs and renderers live outside of this crate, the
/// graph asks for them when building the local graph and peer chains.
pub trait FilterFactory: Send {
    /// `None` if there is no camera
    fn camera(&mut self) -> Option<Box<dyn Stage>>;

    /// `None` if there is no microphone
    fn microphone(&mut self) -> Option<Box<dyn Stage>>;

    fn video_encoder(&mut self) -> Box<dyn Stage>;
    fn audio_encoder(&mut self) -> Box<dyn Stage>;

    fn video_decoder(&mut self, session: u32) -> Box<dyn Stage>;
    fn audio_decoder(&mut self, session: u32) -> Box<dyn Stage>;

    /// Video window of a peer, `None` for the self view
    fn video_display(&mut self, session: Option<u32>) -> Box<dyn Stage>;

    fn audio_output(&mut self, session: u32) -> Box<dyn Stage>;
}

/// Filters in the order they were added
///
/// Each filter is connected to an earlier one, the first filter is the
/// source of the chain.
#[derive(Debug, Default)]
pub struct Chain {
    filters: Vec<Arc<Filter>>,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Filter>> {
        self.filters.get(index)
    }

    pub fn first(&self) -> Option<&Arc<Filter>> {
        self.filters.first()
    }

    pub fn last(&self) -> Option<&Arc<Filter>> {
        self.filters.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Filter>> {
        self.filters.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|filter| filter.name()).collect()
    }

    /// Start all filters, sinks first
    pub fn start(&self) -> Result<(), FilterError> {
        for filter in self.filters.iter().rev() {
            filter.start()?;
        }

        Ok(())
    }

    /// Stop all filters and empty their queues, sources first
    pub fn stop(&self) {
        for filter in &self.filters {
            filter.stop();
            filter.clear();
        }
    }

    /// Destroy all filters, sources first
    pub fn destroy(&self) {
        for filter in &self.filters {
            filter.destroy();
        }
    }
}

#[derive(Default)]
struct LocalGraph {
    /// camera, [self view], [conversion], encoder
    video: Chain,
    video_encoder: Option<Arc<Filter>>,
    /// microphone, encoder
    audio: Chain,
    audio_encoder: Option<Arc<Filter>>,
}

#[derive(Default)]
struct Peer {
    video_send: Option<Arc<Filter>>,
    audio_send: Option<Arc<Filter>>,
    /// network source, decoder, [conversion], display
    video_receive: Chain,
    /// network source, decoder, audio output
    audio_receive: Chain,
}

impl Peer {
    fn is_attached(&self, direction: Direction) -> bool {
        match direction {
            Direction::SendVideo => self.video_send.is_some(),
            Direction::SendAudio => self.audio_send.is_some(),
            Direction::ReceiveVideo => !self.video_receive.is_empty(),
            Direction::ReceiveAudio => !self.audio_receive.is_empty(),
        }
    }
}

/// Owner of all filters, wires the local capture graph to per-peer chains
///
/// Session ids are the ones handed out by the signaling layer. Every
/// mutation failure leaves the graph as it was and is reported through the
/// returned error, a log line and, where relevant, a [`GraphEvent`].
pub struct FilterGraph {
    config: GraphConfig,
    factory: Box<dyn FilterFactory>,
    events: mpsc::UnboundedSender<GraphEvent>,

    running: bool,
    camera_enabled: bool,
    microphone_enabled: bool,

    local: Option<LocalGraph>,
    peers: Vec<Option<Peer>>,
}

impl FilterGraph {
    pub fn new(
        config: GraphConfig,
        factory: impl FilterFactory + 'static,
    ) -> (Self, mpsc::UnboundedReceiver<GraphEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();

        let graph = Self {
            config,
            factory: Box::new(factory),
            events,
            running: false,
            camera_enabled: true,
            microphone_enabled: true,
            local: None,
            peers: Vec::new(),
        };

        (graph, events_rx)
    }

    /// Build the local capture graph
    ///
    /// Missing devices or failing encoders leave the respective media out.
    pub fn init(&mut self) {
        if self.local.is_some() {
            return;
        }

        let local = self.build_local();

        if self.running {
            self.start_local(&local);
        }

        self.local = Some(local);
    }

    pub fn is_initialized(&self) -> bool {
        self.local.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Source of the local video, capture devices push frames into it
    pub fn camera(&self) -> Option<Arc<Filter>> {
        self.local.as_ref()?.video.first().cloned()
    }

    /// Source of the local audio, capture devices push samples into it
    pub fn microphone(&self) -> Option<Arc<Filter>> {
        self.local.as_ref()?.audio.first().cloned()
    }

    pub fn local_video(&self) -> Option<&Chain> {
        self.local.as_ref().map(|local| &local.video)
    }

    pub fn local_audio(&self) -> Option<&Chain> {
        self.local.as_ref().map(|local| &local.audio)
    }

    pub fn video_receive(&self, session: u32) -> Option<&Chain> {
        self.peer(session).map(|peer| &peer.video_receive)
    }

    pub fn audio_receive(&self, session: u32) -> Option<&Chain> {
        self.peer(session).map(|peer| &peer.audio_receive)
    }

    pub fn has_peer(&self, session: u32) -> bool {
        self.peer(session).is_some()
    }

    pub fn sessions(&self) -> impl Iterator<Item = u32> + '_ {
        self.peers
            .iter()
            .enumerate()
            .filter(|(_, peer)| peer.is_some())
            .map(|(session, _)| session as u32)
    }

    /// Create a filter for `stage`, append it to `chain` and connect it to
    /// the filter at `connect_at`
    ///
    /// When the output of the upstream filter does not match the input of
    /// the new one, a conversion filter is put in between. Without a known
    /// conversion nothing is added. New filters are not started.
    pub fn add_to_graph(
        &self,
        chain: &mut Chain,
        stage: Box<dyn Stage>,
        connect_at: usize,
    ) -> Result<Arc<Filter>, GraphError> {
        self.add(chain, stage, connect_at, None)
    }

    /// Connect `downstream` to the output of `upstream` if their types match
    pub fn connect_filters(
        upstream: &Arc<Filter>,
        downstream: &Arc<Filter>,
    ) -> Result<(), GraphError> {
        if upstream.output_type() != downstream.input_type() {
            let error = GraphError::TypeMismatch {
                upstream: upstream.name().into(),
                output: upstream.output_type(),
                downstream: downstream.name().into(),
                input: downstream.input_type(),
            };

            log::warn!("Cannot connect filters, {error}");
            return Err(error);
        }

        upstream.connect(downstream);

        Ok(())
    }

    /// Send the encoded local video to `session` through `sender`
    pub fn send_video_to(&mut self, session: u32, sender: Box<dyn Stage>) -> Result<(), GraphError> {
        self.ensure_detached(session, Direction::SendVideo)?;

        let encoder = self
            .local
            .as_ref()
            .and_then(|local| local.video_encoder.clone())
            .ok_or(GraphError::NotInitialized("video encoder"))?;

        let sender = self.attach_sender(&encoder, sender, session)?;
        self.peer_mut(session).video_send = Some(sender);

        Ok(())
    }

    /// Send the encoded local audio to `session` through `sender`
    pub fn send_audio_to(&mut self, session: u32, sender: Box<dyn Stage>) -> Result<(), GraphError> {
        self.ensure_detached(session, Direction::SendAudio)?;

        let encoder = self
            .local
            .as_ref()
            .and_then(|local| local.audio_encoder.clone())
            .ok_or(GraphError::NotInitialized("audio encoder"))?;

        let sender = self.attach_sender(&encoder, sender, session)?;
        self.peer_mut(session).audio_send = Some(sender);

        Ok(())
    }

    /// Decode and show the video of `session`
    ///
    /// Returns the filter built from `receiver`, the network layer pushes
    /// received units into it.
    pub fn receive_video_from(
        &mut self,
        session: u32,
        receiver: Box<dyn Stage>,
    ) -> Result<Arc<Filter>, GraphError> {
        self.ensure_detached(session, Direction::ReceiveVideo)?;

        let mut chain = Chain::default();
        let source = self.add(&mut chain, receiver, 0, Some(session))?;

        let decoder = self.factory.video_decoder(session);
        let connect_at = chain.len() - 1;
        self.add(&mut chain, decoder, connect_at, Some(session))?;

        let display = self.factory.video_display(Some(session));
        let connect_at = chain.len() - 1;
        self.add(&mut chain, display, connect_at, Some(session))?;

        self.start_chain(&chain);
        self.peer_mut(session).video_receive = chain;

        Ok(source)
    }

    /// Decode and play the audio of `session`
    ///
    /// Returns the filter built from `receiver`, the network layer pushes
    /// received units into it.
    pub fn receive_audio_from(
        &mut self,
        session: u32,
        receiver: Box<dyn Stage>,
    ) -> Result<Arc<Filter>, GraphError> {
        self.ensure_detached(session, Direction::ReceiveAudio)?;

        let mut chain = Chain::default();
        let source = self.add(&mut chain, receiver, 0, Some(session))?;

        let decoder = self.factory.audio_decoder(session);
        let connect_at = chain.len() - 1;
        self.add(&mut chain, decoder, connect_at, Some(session))?;

        let output = self.factory.audio_output(session);
        let connect_at = chain.len() - 1;
        self.add(&mut chain, output, connect_at, Some(session))?;

        self.start_chain(&chain);
        self.peer_mut(session).audio_receive = chain;

        Ok(source)
    }

    /// Tear down all chains of `session`
    ///
    /// When the last peer is gone the local graph is recreated fresh.
    /// Returns `false` if there was no such peer.
    pub fn remove_participant(&mut self, session: u32) -> bool {
        let Some(peer) = self
            .peers
            .get_mut(session as usize)
            .and_then(Option::take)
        else {
            log::debug!("No media for session {session} to remove");
            return false;
        };

        while matches!(self.peers.last(), Some(None)) {
            self.peers.pop();
        }

        if let (Some(local), Some(sender)) = (&self.local, &peer.video_send) {
            if let Some(encoder) = &local.video_encoder {
                encoder.disconnect(sender);
            }
        }

        if let (Some(local), Some(sender)) = (&self.local, &peer.audio_send) {
            if let Some(encoder) = &local.audio_encoder {
                encoder.disconnect(sender);
            }
        }

        Self::teardown_peer(peer);

        log::info!("Removed media of session {session}");
        self.emit(GraphEvent::PeerRemoved { session });

        if self.peers.is_empty() && self.local.is_some() {
            log::debug!("Last peer removed, recreating local graph");

            if let Some(local) = self.local.take() {
                Self::teardown_local(local);
            }

            let local = self.build_local();

            if self.running {
                self.start_local(&local);
            }

            self.local = Some(local);
            self.emit(GraphEvent::LocalGraphRebuilt);
        }

        true
    }

    /// Pause or resume every filter
    ///
    /// Pausing returns only after every worker has exited. Queues are
    /// emptied either way.
    pub fn running(&mut self, running: bool) {
        self.running = running;

        let camera = self.camera();
        let microphone = self.microphone();

        let is_disabled = |filter: &Arc<Filter>| {
            (!self.camera_enabled && camera.as_ref().is_some_and(|c| Arc::ptr_eq(c, filter)))
                || (!self.microphone_enabled
                    && microphone.as_ref().is_some_and(|m| Arc::ptr_eq(m, filter)))
        };

        let filters = self.filters();

        if running {
            for filter in filters.iter().rev() {
                filter.clear();

                if is_disabled(filter) {
                    continue;
                }

                if let Err(e) = filter.start() {
                    log::warn!("Failed to start {}, {e}", filter.name());
                }
            }

            log::debug!("Started {} filters", filters.len());
        } else {
            for filter in &filters {
                filter.stop();
                filter.clear();
            }

            log::debug!("Stopped {} filters", filters.len());
        }
    }

    pub fn set_camera_enabled(&mut self, enabled: bool) {
        self.camera_enabled = enabled;

        if let Some(camera) = self.camera() {
            self.set_source_enabled(&camera, enabled);
        }
    }

    pub fn set_microphone_enabled(&mut self, enabled: bool) {
        self.microphone_enabled = enabled;

        if let Some(microphone) = self.microphone() {
            self.set_source_enabled(&microphone, enabled);
        }
    }

    /// Counters of every filter in the graph
    pub fn stats(&self) -> Vec<FilterStats> {
        self.filters().iter().map(|filter| filter.stats()).collect()
    }

    /// Stop and destroy every filter, the graph can be initialized again
    pub fn uninit(&mut self) {
        for peer in self.peers.drain(..).flatten() {
            Self::teardown_peer(peer);
        }

        if let Some(local) = self.local.take() {
            Self::teardown_local(local);
        }
    }

    fn add(
        &self,
        chain: &mut Chain,
        stage: Box<dyn Stage>,
        connect_at: usize,
        session: Option<u32>,
    ) -> Result<Arc<Filter>, GraphError> {
        let upstream = if chain.is_empty() {
            None
        } else {
            let upstream = chain
                .get(connect_at)
                .ok_or(GraphError::InvalidIndex(connect_at))?;

            Some(upstream.clone())
        };

        let input = stage.input_type();

        let conversion = match &upstream {
            Some(upstream) if upstream.output_type() != input => {
                let output = upstream.output_type();

                let Some(conversion) = find_conversion(output, input) else {
                    log::warn!(
                        "Cannot connect {} to {}, no conversion from {output:?} to {input:?}",
                        upstream.name(),
                        stage.name(),
                    );

                    self.emit(GraphEvent::ConversionMissing {
                        from: output,
                        to: input,
                    });

                    return Err(GraphError::NoConversion {
                        from: output,
                        to: input,
                    });
                };

                Some(self.create_filter(conversion, session)?)
            }
            _ => None,
        };

        let filter = self.create_filter(stage, session)?;

        if let Some(upstream) = &upstream {
            match &conversion {
                Some(conversion) => {
                    Self::connect_filters(upstream, conversion)?;
                    Self::connect_filters(conversion, &filter)?;
                }
                None => Self::connect_filters(upstream, &filter)?,
            }
        }

        chain.filters.extend(conversion);
        chain.filters.push(filter.clone());

        Ok(filter)
    }

    fn create_filter(
        &self,
        stage: Box<dyn Stage>,
        session: Option<u32>,
    ) -> Result<Arc<Filter>, GraphError> {
        let name = match session {
            Some(session) => format!("{}#{session}", stage.name()),
            None => stage.name().into(),
        };

        let filter = Filter::new(stage)
            .with_name(name)
            .with_capacity(self.config.queue_capacity)
            .with_events(self.events.clone(), self.config.drop_report_interval);

        if let Err(source) = filter.init() {
            log::warn!("Failed to initialize {}, {source}", filter.name());

            self.emit(GraphEvent::FilterInitFailed {
                filter: filter.name().into(),
            });

            return Err(GraphError::FilterInit {
                filter: filter.name().into(),
                source,
            });
        }

        Ok(Arc::new(filter))
    }

    fn attach_sender(
        &self,
        encoder: &Arc<Filter>,
        sender: Box<dyn Stage>,
        session: u32,
    ) -> Result<Arc<Filter>, GraphError> {
        let sender = self.create_filter(sender, Some(session))?;

        Self::connect_filters(encoder, &sender)?;

        if self.running {
            if let Err(e) = sender.start() {
                log::warn!("Failed to start {}, {e}", sender.name());
            }
        }

        Ok(sender)
    }

    fn build_local(&mut self) -> LocalGraph {
        let mut local = LocalGraph::default();

        if let Some(camera) = self.factory.camera() {
            match self.build_local_video(camera) {
                Ok((chain, encoder)) => {
                    local.video = chain;
                    local.video_encoder = Some(encoder);
                }
                Err(e) => log::warn!("Sending no video, {e}"),
            }
        } else {
            log::info!("No camera, sending no video");
        }

        if let Some(microphone) = self.factory.microphone() {
            match self.build_local_audio(microphone) {
                Ok((chain, encoder)) => {
                    local.audio = chain;
                    local.audio_encoder = Some(encoder);
                }
                Err(e) => log::warn!("Sending no audio, {e}"),
            }
        } else {
            log::info!("No microphone, sending no audio");
        }

        local
    }

    fn build_local_video(
        &mut self,
        camera: Box<dyn Stage>,
    ) -> Result<(Chain, Arc<Filter>), GraphError> {
        let mut chain = Chain::default();
        self.add(&mut chain, camera, 0, None)?;

        if self.config.self_view {
            let display = self.factory.video_display(None);

            // the call works without a self view
            if let Err(e) = self.add(&mut chain, display, 0, None) {
                log::warn!("No self view, {e}");
            }
        }

        let encoder = self.factory.video_encoder();
        let encoder = self.add(&mut chain, encoder, 0, None)?;

        Ok((chain, encoder))
    }

    fn build_local_audio(
        &mut self,
        microphone: Box<dyn Stage>,
    ) -> Result<(Chain, Arc<Filter>), GraphError> {
        let mut chain = Chain::default();
        self.add(&mut chain, microphone, 0, None)?;

        let encoder = self.factory.audio_encoder();
        let encoder = self.add(&mut chain, encoder, 0, None)?;

        Ok((chain, encoder))
    }

    fn start_local(&self, local: &LocalGraph) {
        self.start_chain(&local.video);
        self.start_chain(&local.audio);

        if !self.camera_enabled {
            if let Some(camera) = local.video.first() {
                self.set_source_enabled(camera, false);
            }
        }

        if !self.microphone_enabled {
            if let Some(microphone) = local.audio.first() {
                self.set_source_enabled(microphone, false);
            }
        }
    }

    fn start_chain(&self, chain: &Chain) {
        if !self.running {
            return;
        }

        if let Err(e) = chain.start() {
            log::warn!("Failed to start chain {:?}, {e}", chain.names());
        }
    }

    fn set_source_enabled(&self, source: &Arc<Filter>, enabled: bool) {
        source.set_active(enabled);

        if enabled {
            if self.running {
                source.clear();

                if let Err(e) = source.start() {
                    log::warn!("Failed to start {}, {e}", source.name());
                }
            }
        } else {
            source.stop();
            source.clear();
        }
    }

    fn teardown_peer(peer: Peer) {
        for sender in [&peer.video_send, &peer.audio_send].into_iter().flatten() {
            sender.destroy();
        }

        peer.video_receive.destroy();
        peer.audio_receive.destroy();
    }

    fn teardown_local(local: LocalGraph) {
        local.video.destroy();
        local.audio.destroy();
    }

    fn ensure_detached(&self, session: u32, direction: Direction) -> Result<(), GraphError> {
        if session >= self.config.max_sessions {
            log::warn!(
                "Refusing to attach {direction} of session {session}, at most {} sessions",
                self.config.max_sessions
            );
            return Err(GraphError::SessionOutOfRange(session));
        }

        if self
            .peer(session)
            .is_some_and(|peer| peer.is_attached(direction))
        {
            log::warn!("Refusing to attach {direction} of session {session} twice");
            return Err(GraphError::AlreadyAttached { session, direction });
        }

        Ok(())
    }

    fn peer(&self, session: u32) -> Option<&Peer> {
        self.peers.get(session as usize)?.as_ref()
    }

    /// Get the peer of `session`, growing the peer table as needed
    ///
    /// `session` was range checked by `ensure_detached`.
    fn peer_mut(&mut self, session: u32) -> &mut Peer {
        let index = session as usize;

        if self.peers.len() <= index {
            self.peers.resize_with(index + 1, || None);
        }

        if self.peers[index].is_none() {
            log::info!("Added media of session {session}");
            let _ = self.events.send(GraphEvent::PeerAdded { session });
        }

        self.peers[index].get_or_insert_with(Peer::default)
    }

    /// All filters, sources before their consumers
    fn filters(&self) -> Vec<Arc<Filter>> {
        let mut filters = Vec::new();

        if let Some(local) = &self.local {
            filters.extend(local.video.iter().cloned());
            filters.extend(local.audio.iter().cloned());
        }

        for peer in self.peers.iter().flatten() {
            filters.extend(peer.video_send.iter().cloned());
            filters.extend(peer.audio_send.iter().cloned());
            filters.extend(peer.video_receive.iter().cloned());
            filters.extend(peer.audio_receive.iter().cloned());
        }

        filters
    }

    fn emit(&self, event: GraphEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for FilterGraph {
    fn drop(&mut self) {
        self.uninit();
    }
}
