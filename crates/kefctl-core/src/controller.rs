// ── Controller abstraction ──
//
// A single actor task owns the speaker state. Consumer calls, stream items,
// stream completion and debounce expiries all arrive on one inbox, so every
// read and mutation of the model is serialized.

use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use kefctl_api::{
    DeviceApi, Endpoint, EventStream, Field, KefClient, KefValue, PhysicalSource, SubscriptionId,
};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::model::{AudioSystemInfo, ClientEvent, DeviceState, PlaybackInfo, clamp_volume};

const INBOX_SIZE: usize = 64;

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. The actor task stops when
/// [`shutdown`](Self::shutdown) is called or the last handle is dropped.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    inbox: mpsc::Sender<Message>,
    event_tx: broadcast::Sender<ClientEvent>,
    tasks: TaskTracker,
}

impl Controller {
    /// Create a controller backed by a real [`KefClient`]. No endpoint is
    /// bound yet; call [`bind`](Self::bind) first.
    pub fn new(config: &ControllerConfig) -> Result<Self, CoreError> {
        let client = KefClient::new(&config.transport())?;
        Ok(Self::with_api(config, Arc::new(client)))
    }

    /// Create a controller over any [`DeviceApi`] implementation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_api(config: &ControllerConfig, api: Arc<dyn DeviceApi>) -> Self {
        let (inbox, inbox_rx) = mpsc::channel(INBOX_SIZE);
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        let tasks = TaskTracker::new();

        let actor = Actor {
            api,
            volume_debounce: config.volume_debounce,
            inbox: inbox.downgrade(),
            event_tx: event_tx.clone(),
            tasks: tasks.clone(),
            cancel: CancellationToken::new(),
            endpoint: None,
            listening: false,
            stream_id: None,
            playback: PlaybackInfo::default(),
            system: AudioSystemInfo::default(),
            pending_volume: None,
            volume_generation: 0,
            volume_timer: None,
        };
        tasks.spawn(actor.run(inbox_rx));

        Self {
            inner: Arc::new(ControllerInner {
                inbox,
                event_tx,
                tasks,
            }),
        }
    }

    // ── Event feed ───────────────────────────────────────────────

    /// Subscribe to `ClientEvent` snapshots.
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.event_tx.subscribe()
    }

    /// `events()` as a `Stream`, skipping over lag gaps.
    pub fn event_stream(&self) -> impl Stream<Item = ClientEvent> + Send + 'static {
        BroadcastStream::new(self.events()).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "event subscriber lagged");
                None
            }
        })
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command against the controller.
    ///
    /// Sends the command through the actor inbox and awaits the result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        let (tx, rx) = oneshot::channel();

        self.inner
            .inbox
            .send(Message::Command(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            }))
            .await
            .map_err(|_| CoreError::ControllerStopped)?;

        rx.await.map_err(|_| CoreError::ControllerStopped)?
    }

    /// Bind to a speaker. Failures while refreshing or starting the stream
    /// are logged, not returned.
    pub async fn bind(&self, endpoint: Endpoint, start_streaming: bool) -> Result<(), CoreError> {
        self.execute(Command::Bind {
            endpoint,
            start_streaming,
        })
        .await?;
        Ok(())
    }

    /// Bind to a speaker and report whether the initial refresh (or stream
    /// start) succeeded.
    pub async fn connect(&self, endpoint: Endpoint, start_streaming: bool) -> Result<(), CoreError> {
        self.execute(Command::Connect {
            endpoint,
            start_streaming,
        })
        .await?;
        Ok(())
    }

    /// Refresh both aggregates, then follow the device event queue.
    pub async fn start_event_listening(&self) -> Result<(), CoreError> {
        self.execute(Command::StartEventListening).await?;
        Ok(())
    }

    pub async fn stop_event_listening(&self) -> Result<(), CoreError> {
        self.execute(Command::StopEventListening).await?;
        Ok(())
    }

    /// Power on if needed, then flip mute in the background. The local
    /// state changes only when the speaker reports it.
    pub async fn toggle_mute(&self) -> Result<(), CoreError> {
        self.execute(Command::ToggleMute).await?;
        Ok(())
    }

    /// Adjust volume by `delta`, returning the clamped target.
    pub async fn change_volume(&self, delta: i32) -> Result<i32, CoreError> {
        match self.execute(Command::ChangeVolume { delta }).await? {
            CommandResult::Volume(volume) => Ok(volume),
            other => Err(CoreError::UnexpectedValue {
                expected: "volume".into(),
                found: format!("{other:?}"),
            }),
        }
    }

    /// Switch the source to USB if the speaker is in standby.
    pub async fn turn_on_if_needed(&self) -> Result<(), CoreError> {
        self.execute(Command::TurnOnIfNeeded).await?;
        Ok(())
    }

    /// Re-read every field from the speaker and publish both snapshots.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.execute(Command::Refresh).await?;
        Ok(())
    }

    /// Current model state.
    pub async fn snapshot(&self) -> Result<DeviceState, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .inbox
            .send(Message::Snapshot(tx))
            .await
            .map_err(|_| CoreError::ControllerStopped)?;
        rx.await.map_err(|_| CoreError::ControllerStopped)
    }

    /// Stop listening, drop any pending debounce, and wait for in-flight
    /// background commands to finish.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inner.inbox.send(Message::Shutdown(tx)).await.is_ok() {
            let _ = rx.await;
        }
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        debug!("controller stopped");
    }
}

// ── Actor ────────────────────────────────────────────────────────

enum Message {
    Command(CommandEnvelope),
    Event {
        subscription: SubscriptionId,
        value: KefValue,
    },
    StreamEnded(SubscriptionId),
    VolumeSettled {
        generation: u64,
    },
    Snapshot(oneshot::Sender<DeviceState>),
    Shutdown(oneshot::Sender<()>),
}

struct Actor {
    api: Arc<dyn DeviceApi>,
    volume_debounce: std::time::Duration,
    /// Weak so that internal tasks never keep the actor alive.
    inbox: mpsc::WeakSender<Message>,
    event_tx: broadcast::Sender<ClientEvent>,
    tasks: TaskTracker,
    cancel: CancellationToken,

    endpoint: Option<Endpoint>,
    /// Set only inside `start_event_listening`. Commands run one at a time,
    /// so no other command ever sees it set; `stream_id` is what tracks a
    /// live stream.
    listening: bool,
    stream_id: Option<SubscriptionId>,
    playback: PlaybackInfo,
    system: AudioSystemInfo,

    pending_volume: Option<i32>,
    volume_generation: u64,
    volume_timer: Option<CancellationToken>,
}

/// Read one field and unwrap the expected `KefValue` variant.
macro_rules! read_field {
    ($api:expr, $endpoint:expr, $field:expr, $variant:ident) => {
        match $api.get($endpoint, $field).await? {
            KefValue::$variant(inner) => inner,
            other => return Err(unexpected($field, &other)),
        }
    };
}

impl Actor {
    async fn run(mut self, mut inbox: mpsc::Receiver<Message>) {
        loop {
            let message = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                message = inbox.recv() => {
                    let Some(message) = message else { break };
                    message
                }
            };

            match message {
                Message::Command(envelope) => {
                    let result = self.route_command(envelope.command).await;
                    let _ = envelope.response_tx.send(result);
                }
                Message::Event {
                    subscription,
                    value,
                } => {
                    if self.stream_id == Some(subscription) {
                        self.process_event(value);
                    } else {
                        trace!(%subscription, %value, "dropping event from stale subscription");
                    }
                }
                Message::StreamEnded(id) => {
                    if self.stream_id == Some(id) {
                        self.stream_id = None;
                        info!(%id, "speaker event stream ended");
                    }
                }
                Message::VolumeSettled { generation } => self.settle_volume(generation),
                Message::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                Message::Shutdown(reply) => {
                    self.stop();
                    let _ = reply.send(());
                    break;
                }
            }
        }

        self.stop();
        debug!("controller actor exited");
    }

    async fn route_command(&mut self, cmd: Command) -> Result<CommandResult, CoreError> {
        match cmd {
            Command::Bind {
                endpoint,
                start_streaming,
            } => {
                if let Err(e) = self.connect(endpoint.clone(), start_streaming).await {
                    error!(%endpoint, error = %e, "failed to bind speaker");
                }
                Ok(CommandResult::Ok)
            }
            Command::Connect {
                endpoint,
                start_streaming,
            } => {
                self.connect(endpoint, start_streaming).await?;
                Ok(CommandResult::Ok)
            }
            Command::StartEventListening => {
                self.start_event_listening().await?;
                Ok(CommandResult::Ok)
            }
            Command::StopEventListening => {
                self.stop_event_listening();
                Ok(CommandResult::Ok)
            }
            Command::ToggleMute => {
                self.toggle_mute().await?;
                Ok(CommandResult::Ok)
            }
            Command::ChangeVolume { delta } => {
                self.change_volume(delta).await.map(CommandResult::Volume)
            }
            Command::TurnOnIfNeeded => {
                let endpoint = self.require_endpoint()?;
                self.turn_on_if_needed(&endpoint).await?;
                Ok(CommandResult::Ok)
            }
            Command::Refresh => {
                let endpoint = self.require_endpoint()?;
                self.refresh(&endpoint).await?;
                Ok(CommandResult::Ok)
            }
        }
    }

    fn require_endpoint(&self) -> Result<Endpoint, CoreError> {
        self.endpoint
            .clone()
            .ok_or_else(|| CoreError::NotConfigured("no speaker address bound".into()))
    }

    // ── Binding & streaming ──────────────────────────────────────

    async fn connect(&mut self, endpoint: Endpoint, start_streaming: bool) -> Result<(), CoreError> {
        info!(%endpoint, start_streaming, "binding speaker");
        self.endpoint = Some(endpoint.clone());

        if self.stream_id.is_some() || start_streaming {
            self.stop_event_listening();
            self.start_event_listening().await
        } else {
            self.refresh(&endpoint).await
        }
    }

    async fn start_event_listening(&mut self) -> Result<(), CoreError> {
        let endpoint = self.require_endpoint()?;
        if self.listening {
            warn!("already listening to speaker events");
            return Ok(());
        }

        self.listening = true;
        let result = self.open_stream(&endpoint).await;
        self.listening = false;
        result
    }

    async fn open_stream(&mut self, endpoint: &Endpoint) -> Result<(), CoreError> {
        self.refresh(endpoint).await?;
        let (stream, id) = self.api.events(endpoint)?;
        self.stream_id = Some(id);
        self.spawn_stream_consumer(id, stream);
        debug!(%endpoint, %id, "started listening to speaker events");
        Ok(())
    }

    fn stop_event_listening(&mut self) {
        let Some(id) = self.stream_id.take() else {
            return;
        };
        self.api.terminate_events(id);
        info!(%id, "stopped listening to speaker events");
    }

    /// Forward stream items into the inbox until the stream ends.
    fn spawn_stream_consumer(&self, id: SubscriptionId, mut stream: EventStream) {
        let inbox = self.inbox.clone();
        let cancel = self.cancel.child_token();

        self.tasks.spawn(async move {
            loop {
                let item = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return,
                    item = stream.next_event() => item,
                };
                let Some(inbox) = inbox.upgrade() else {
                    return;
                };

                let Some(value) = item else {
                    let _ = inbox.send(Message::StreamEnded(id)).await;
                    return;
                };
                let message = Message::Event {
                    subscription: id,
                    value,
                };
                if inbox.send(message).await.is_err() {
                    return;
                }
            }
        });
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Read name and model, publish `system`; then mute, volume and
    /// source, publish `playback`.
    async fn refresh(&mut self, endpoint: &Endpoint) -> Result<(), CoreError> {
        let name = read_field!(self.api, endpoint, Field::DeviceName, Name);
        let model = read_field!(self.api, endpoint, Field::ModelName, Model);
        self.system = AudioSystemInfo { name, model };
        self.emit(ClientEvent::System(self.system.clone()));

        let is_muted = read_field!(self.api, endpoint, Field::Muted, Muted);
        let volume = read_field!(self.api, endpoint, Field::Volume, Volume);
        let source = read_field!(self.api, endpoint, Field::PhysicalSource, Source);
        self.playback = PlaybackInfo {
            source,
            volume: clamp_volume(volume),
            is_muted,
        };
        self.emit(ClientEvent::Playback(self.playback.clone()));

        debug!(%endpoint, "speaker state refreshed");
        Ok(())
    }

    fn snapshot(&self) -> DeviceState {
        DeviceState {
            endpoint: self.endpoint.as_ref().map(ToString::to_string),
            streaming: self.stream_id.is_some(),
            playback: self.playback.clone(),
            system: self.system.clone(),
        }
    }

    // ── Writes ───────────────────────────────────────────────────

    async fn turn_on_if_needed(&self, endpoint: &Endpoint) -> Result<(), CoreError> {
        if self.playback.source != PhysicalSource::Standby {
            return Ok(());
        }
        info!(%endpoint, "speaker in standby, switching source to usb");
        self.api
            .set(endpoint, KefValue::Source(PhysicalSource::Usb))
            .await?;
        Ok(())
    }

    async fn toggle_mute(&mut self) -> Result<(), CoreError> {
        let endpoint = self.require_endpoint()?;
        self.turn_on_if_needed(&endpoint).await?;
        self.detach(endpoint, KefValue::Muted(!self.playback.is_muted));
        Ok(())
    }

    async fn change_volume(&mut self, delta: i32) -> Result<i32, CoreError> {
        let endpoint = self.require_endpoint()?;
        self.turn_on_if_needed(&endpoint).await?;

        let current = self.playback.volume;
        let volume = clamp_volume(current.saturating_add(delta));
        if volume != current {
            self.playback.volume = volume;
            self.detach(endpoint, KefValue::Volume(volume));
        }
        Ok(volume)
    }

    /// Push a value in the background; failures are only logged.
    fn detach(&self, endpoint: Endpoint, value: KefValue) {
        let api = Arc::clone(&self.api);
        self.tasks.spawn(async move {
            let label = value.to_string();
            match api.set(&endpoint, value).await {
                Ok(()) => debug!(%endpoint, value = %label, "speaker updated"),
                Err(e) => error!(%endpoint, value = %label, error = %e, "speaker update failed"),
            }
        });
    }

    // ── Event processing ─────────────────────────────────────────

    fn process_event(&mut self, value: KefValue) {
        trace!(%value, "speaker event");
        match value {
            KefValue::Volume(volume) => self.debounce_volume(volume),
            KefValue::Source(source) if self.playback.source != source => {
                self.playback.source = source;
                self.emit(ClientEvent::Playback(self.playback.clone()));
            }
            KefValue::Muted(is_muted) if self.playback.is_muted != is_muted => {
                self.playback.is_muted = is_muted;
                self.emit(ClientEvent::Playback(self.playback.clone()));
            }
            KefValue::Name(name) if self.system.name != name => {
                self.system.name = name;
                self.emit(ClientEvent::System(self.system.clone()));
            }
            KefValue::Model(model) if self.system.model != model => {
                self.system.model = model;
                self.emit(ClientEvent::System(self.system.clone()));
            }
            _ => {}
        }
    }

    /// Record the latest volume and restart the quiet-period timer.
    fn debounce_volume(&mut self, volume: i32) {
        self.pending_volume = Some(clamp_volume(volume));
        self.volume_generation = self.volume_generation.wrapping_add(1);
        if let Some(timer) = self.volume_timer.take() {
            timer.cancel();
        }

        let timer = self.cancel.child_token();
        self.volume_timer = Some(timer.clone());

        let generation = self.volume_generation;
        let delay = self.volume_debounce;
        let inbox = self.inbox.clone();
        self.tasks.spawn(async move {
            tokio::select! {
                biased;
                () = timer.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if let Some(inbox) = inbox.upgrade() {
                        let _ = inbox.send(Message::VolumeSettled { generation }).await;
                    }
                }
            }
        });
    }

    fn settle_volume(&mut self, generation: u64) {
        if generation != self.volume_generation {
            trace!(generation, "superseded volume timer");
            return;
        }
        self.volume_timer = None;
        let Some(volume) = self.pending_volume.take() else {
            return;
        };
        self.playback.volume = volume;
        self.emit(ClientEvent::Playback(self.playback.clone()));
    }

    fn emit(&self, event: ClientEvent) {
        debug!(kind = event.kind(), "publishing speaker state");
        // No subscribers is not an error.
        let _ = self.event_tx.send(event);
    }

    fn stop(&mut self) {
        self.stop_event_listening();
        self.cancel.cancel();
        self.volume_timer = None;
        self.pending_volume = None;
    }
}

fn unexpected(field: Field, found: &KefValue) -> CoreError {
    CoreError::UnexpectedValue {
        expected: field.to_string(),
        found: found.to_string(),
    }
}
