use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::command::CommandQueue;
use crate::error::{Error, Result};
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol;
use crate::registry::ZoneRegistry;
use crate::types::{Event, FanSpeed, SetpointDirection, SystemMode, ZoneState};
use crate::zone::Zone;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const RECONNECT_INTERVAL: Duration = Duration::from_secs(15);
/// Socket receive buffer, sized for a full status dump from a maxed-out
/// bridge. Also caps the line-reassembly buffer.
const READ_BUFFER_SIZE: usize = 10240;

type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;

pub struct CoolMasterClientBuilder {
    addr: String,
    auto_connect: bool,
    zones: Vec<(String, String)>,
    event_callbacks: Vec<EventCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl CoolMasterClientBuilder {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            auto_connect: true,
            zones: Vec::new(),
            event_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    /// Register a zone under its protocol UID (the first six characters of
    /// its status lines). Duplicate UIDs fail `build()`.
    pub fn zone(mut self, name: impl Into<String>, uid: impl Into<String>) -> Self {
        self.zones.push((name.into(), uid.into()));
        self
    }

    /// When disabled, the client stays idle until `connect()` is called.
    pub fn auto_connect(mut self, yes: bool) -> Self {
        self.auto_connect = yes;
        self
    }

    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.event_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    /// Spawn the supervisor task and return the client handle. Must be
    /// called from within a tokio runtime.
    pub fn build(self) -> Result<CoolMasterClient> {
        let mut registry = ZoneRegistry::new();
        let mut uids = HashSet::new();
        for (name, uid) in self.zones {
            registry.register(Zone::new(name, &uid))?;
            uids.insert(uid);
        }

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        let (tx, rx) = mpsc::channel(32);
        let (connected_tx, connected_rx) = watch::channel(false);

        let supervisor = Supervisor {
            addr: self.addr,
            rx,
            registry,
            queue: CommandQueue::new(),
            callbacks: self.event_callbacks,
            logger,
            connected_tx,
        };
        tokio::spawn(supervisor.run(self.auto_connect));

        Ok(CoolMasterClient {
            tx,
            connected_rx,
            uids: Arc::new(uids),
        })
    }
}

/// Handle to a running client. Cloneable; all clones talk to the same
/// supervisor task and device connection.
#[derive(Clone, Debug)]
pub struct CoolMasterClient {
    tx: mpsc::Sender<Request>,
    connected_rx: watch::Receiver<bool>,
    uids: Arc<HashSet<String>>,
}

impl CoolMasterClient {
    pub fn builder(addr: impl Into<String>) -> CoolMasterClientBuilder {
        CoolMasterClientBuilder::new(addr)
    }

    /// Start connection supervision when the client was built with
    /// `auto_connect(false)`. No-op otherwise.
    pub async fn connect(&self) -> Result<()> {
        self.send(Request::Connect).await
    }

    pub fn is_connected(&self) -> bool {
        *self.connected_rx.borrow()
    }

    pub async fn set_power(&self, uid: &str, on: bool) -> Result<()> {
        self.check_uid(uid)?;
        self.send(Request::SetPower { uid: uid.to_string(), on }).await
    }

    pub async fn set_system_mode(&self, uid: &str, mode: SystemMode) -> Result<()> {
        self.check_uid(uid)?;
        self.send(Request::SetSystemMode { uid: uid.to_string(), mode }).await
    }

    pub async fn set_fan_speed(&self, uid: &str, speed: FanSpeed) -> Result<()> {
        self.check_uid(uid)?;
        self.send(Request::SetFanSpeed { uid: uid.to_string(), speed }).await
    }

    /// Step the zone's setpoint by one whole unit, optimistically; ignored
    /// until the first poll has populated the zone.
    pub async fn adjust_setpoint(&self, uid: &str, direction: SetpointDirection) -> Result<()> {
        self.check_uid(uid)?;
        self.send(Request::AdjustSetpoint { uid: uid.to_string(), direction }).await
    }

    /// Absolute setpoint in tenths of a degree (e.g. 725 → 72.5).
    pub async fn set_setpoint_direct(&self, uid: &str, tenths: u16) -> Result<()> {
        self.check_uid(uid)?;
        self.send(Request::SetSetpointDirect { uid: uid.to_string(), tenths }).await
    }

    pub async fn zone(&self, uid: &str) -> Result<ZoneState> {
        self.check_uid(uid)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Request::Zone { uid: uid.to_string(), reply: reply_tx }).await?;
        let state = reply_rx.await.map_err(|_| Error::NotConnected)?;
        state.ok_or_else(|| Error::UnknownZone(uid.to_string()))
    }

    pub async fn zones(&self) -> Result<Vec<ZoneState>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Request::Zones { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| Error::NotConnected)
    }

    /// Stop connection supervision permanently and drop the socket.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Request::Shutdown { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| Error::NotConnected)
    }

    fn check_uid(&self, uid: &str) -> Result<()> {
        if self.uids.contains(uid) {
            Ok(())
        } else {
            Err(Error::UnknownZone(uid.to_string()))
        }
    }

    async fn send(&self, req: Request) -> Result<()> {
        self.tx.send(req).await.map_err(|_| Error::NotConnected)
    }
}

enum Request {
    Connect,
    SetPower { uid: String, on: bool },
    SetSystemMode { uid: String, mode: SystemMode },
    SetFanSpeed { uid: String, speed: FanSpeed },
    AdjustSetpoint { uid: String, direction: SetpointDirection },
    SetSetpointDirect { uid: String, tenths: u16 },
    Zone { uid: String, reply: oneshot::Sender<Option<ZoneState>> },
    Zones { reply: oneshot::Sender<Vec<ZoneState>> },
    Shutdown { reply: oneshot::Sender<()> },
}

/// What a handled request asks the connection loop to do next.
enum Flow {
    Idle,
    Send(String),
    Shutdown,
}

enum SessionEnd {
    Lost,
    Shutdown,
}

/// The single task that owns the socket, the command queue, and all zone
/// state. Socket reads, poll ticks, and host requests are serialized here,
/// which is what upholds the queue's ordering and single-flight invariants.
struct Supervisor {
    addr: String,
    rx: mpsc::Receiver<Request>,
    registry: ZoneRegistry,
    queue: CommandQueue,
    callbacks: Vec<EventCallback>,
    logger: Option<MessageLogger>,
    connected_tx: watch::Sender<bool>,
}

impl Supervisor {
    async fn run(mut self, auto_connect: bool) {
        if !auto_connect && !self.wait_for_connect().await {
            return;
        }
        loop {
            let Some(stream) = self.establish().await else {
                return;
            };
            self.set_connected(true);
            let end = self.session(stream).await;
            self.queue.reset();
            self.set_connected(false);
            if matches!(end, SessionEnd::Shutdown) {
                return;
            }
            // Retry immediately; establish() applies the reconnect cadence
            // on subsequent failures.
        }
    }

    /// Park until the host asks to connect. Commands arriving before then
    /// follow the disconnected-drop rule; queries are still answered.
    async fn wait_for_connect(&mut self) -> bool {
        loop {
            match self.rx.recv().await {
                None => return false,
                Some(Request::Connect) => return true,
                Some(req) => {
                    if !self.absorb_disconnected(req) {
                        return false;
                    }
                }
            }
        }
    }

    /// Connect, retrying every [`RECONNECT_INTERVAL`] until it succeeds.
    /// Returns `None` on shutdown.
    async fn establish(&mut self) -> Option<TcpStream> {
        loop {
            debug!(addr = %self.addr, "connecting to bridge");
            match self.try_connect().await? {
                Ok(stream) => {
                    debug!(addr = %self.addr, "connected");
                    return Some(stream);
                }
                Err(e) => {
                    warn!(addr = %self.addr, error = %e, "connect failed");
                    if !self.sleep_racing_requests(RECONNECT_INTERVAL).await {
                        return None;
                    }
                }
            }
        }
    }

    /// Race the connect attempt against the request channel so commands
    /// issued while disconnected are dropped rather than deferred into the
    /// next session. Outer `None` means shutdown.
    async fn try_connect(&mut self) -> Option<std::io::Result<TcpStream>> {
        let connect = TcpStream::connect(self.addr.clone());
        tokio::pin!(connect);
        loop {
            tokio::select! {
                res = &mut connect => return Some(res),
                req = self.rx.recv() => match req {
                    None => return None,
                    Some(req) => {
                        if !self.absorb_disconnected(req) {
                            return None;
                        }
                    }
                }
            }
        }
    }

    /// Sleep while still servicing the request channel. Returns false on
    /// shutdown.
    async fn sleep_racing_requests(&mut self, period: Duration) -> bool {
        let sleep = time::sleep(period);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                req = self.rx.recv() => match req {
                    None => return false,
                    Some(req) => {
                        if !self.absorb_disconnected(req) {
                            return false;
                        }
                    }
                }
            }
        }
    }

    /// Handle a request while no session is up. Zone state still updates
    /// optimistically; the resulting command is dropped by the queue's
    /// disconnected rule. Returns false on shutdown.
    fn absorb_disconnected(&mut self, req: Request) -> bool {
        match self.apply_request(req) {
            Flow::Send(body) => {
                self.queue.submit(false, &body);
                true
            }
            Flow::Shutdown => false,
            Flow::Idle => true,
        }
    }

    /// One connected session: poll on cadence, read continuously, service
    /// requests. Any socket failure ends the session.
    async fn session(&mut self, stream: TcpStream) -> SessionEnd {
        let (mut reader, mut writer) = stream.into_split();
        let mut poll = time::interval_at(time::Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut read_buf = vec![0u8; READ_BUFFER_SIZE];
        let mut carry = String::new();

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if !self.dispatch(&mut writer, protocol::POLL_COMMAND).await {
                        return SessionEnd::Lost;
                    }
                }
                res = reader.read(&mut read_buf) => match res {
                    Ok(0) => {
                        debug!("bridge closed the connection");
                        return SessionEnd::Lost;
                    }
                    Ok(n) => self.handle_rx(&read_buf[..n], &mut carry),
                    Err(e) => {
                        debug!(error = %e, "socket read failed");
                        return SessionEnd::Lost;
                    }
                },
                req = self.rx.recv() => match req {
                    None => return SessionEnd::Shutdown,
                    Some(req) => match self.apply_request(req) {
                        Flow::Send(body) => {
                            if !self.dispatch(&mut writer, &body).await {
                                return SessionEnd::Lost;
                            }
                        }
                        Flow::Shutdown => return SessionEnd::Shutdown,
                        Flow::Idle => {}
                    }
                }
            }
        }
    }

    /// Run a request against zone state and decide what the connection loop
    /// should do with it.
    fn apply_request(&mut self, req: Request) -> Flow {
        match req {
            Request::Connect => Flow::Idle,
            Request::SetPower { uid, on } => Flow::Send(protocol::power_command(&uid, on)),
            Request::SetSystemMode { uid, mode } => Flow::Send(protocol::mode_command(&uid, mode)),
            Request::SetFanSpeed { uid, speed } => {
                Flow::Send(protocol::fan_speed_command(&uid, speed))
            }
            Request::AdjustSetpoint { uid, direction } => {
                let Some(zone) = self.registry.get_mut(&uid) else {
                    return Flow::Idle;
                };
                match zone.adjust_setpoint(direction) {
                    Some(event) => {
                        let body = protocol::setpoint_command(&uid, zone.setpoint_raw());
                        self.emit(&event);
                        Flow::Send(body)
                    }
                    None => Flow::Idle,
                }
            }
            Request::SetSetpointDirect { uid, tenths } => {
                let Some(zone) = self.registry.get_mut(&uid) else {
                    return Flow::Idle;
                };
                let event = zone.set_setpoint_direct(tenths);
                let body = protocol::setpoint_command(&uid, zone.setpoint_raw());
                self.emit(&event);
                Flow::Send(body)
            }
            Request::Zone { uid, reply } => {
                let _ = reply.send(self.registry.get(&uid).map(Zone::snapshot));
                Flow::Idle
            }
            Request::Zones { reply } => {
                let _ = reply.send(self.registry.iter().map(Zone::snapshot).collect());
                Flow::Idle
            }
            Request::Shutdown { reply } => {
                // Close before acking so no further handle calls can race
                // into the channel.
                self.rx.close();
                let _ = reply.send(());
                Flow::Shutdown
            }
        }
    }

    /// Submit one command body and drive the writer until the queue is
    /// drained. Returns false when the socket is gone.
    async fn dispatch(&mut self, writer: &mut OwnedWriteHalf, body: &str) -> bool {
        let Some(mut line) = self.queue.submit(true, body) else {
            return true;
        };
        loop {
            if let Some(ref mut logger) = self.logger {
                logger.log_tx(line.trim_end());
            }
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                debug!(error = %e, "socket write failed");
                return false;
            }
            match self.queue.complete() {
                Some(next) => line = next,
                None => return true,
            }
        }
    }

    /// Buffer received bytes and parse every complete (CR-terminated) line,
    /// keeping the partial tail for the next read.
    fn handle_rx(&mut self, bytes: &[u8], carry: &mut String) {
        let chunk = String::from_utf8_lossy(bytes);
        if let Some(ref mut logger) = self.logger {
            logger.log_rx(&chunk);
        }
        carry.push_str(&chunk);

        let Some(end) = carry.rfind('\r') else {
            if carry.len() > READ_BUFFER_SIZE {
                warn!(len = carry.len(), "receive buffer overflow, resetting");
                carry.clear();
            }
            return;
        };
        let rest = carry.split_off(end + 1);
        let complete = std::mem::replace(carry, rest);

        for event in protocol::parse_feedback(&complete, &mut self.registry) {
            self.emit(&event);
        }
    }

    fn emit(&self, event: &Event) {
        for cb in &self.callbacks {
            cb(event);
        }
    }

    fn set_connected(&mut self, connected: bool) {
        let _ = self.connected_tx.send(connected);
        if let Some(ref mut logger) = self.logger {
            logger.log_connection(connected);
        }
        self.emit(&Event::ConnectionChanged { connected });
    }
}
