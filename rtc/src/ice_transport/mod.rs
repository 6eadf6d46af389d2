
use log::debug;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::Mutex;

const UNSPECIFIED_STR: &str = "Unspecified";

/// RTCIceConnectionState indicates the state of the ICE connection.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCIceConnectionState {
    #[default]
    Unspecified,

    /// ICE agent is gathering addresses or waiting to be given remote
    /// candidates.
    New,

    /// ICE agent has been given remote candidates and is checking pairs.
    Checking,

    /// ICE agent has found a usable connection for all components. Media
    /// can flow in this state.
    Connected,

    /// ICE agent has finished gathering and checking and found a connection
    /// for all components.
    Completed,

    /// Connectivity was lost. It may come back on its own.
    Disconnected,

    /// ICE agent has determined that connection is not possible without an
    /// ICE restart.
    Failed,

    /// ICE agent has shut down and is no longer responding to STUN requests.
    Closed,
}

const ICE_CONNECTION_STATE_NEW_STR: &str = "new";
const ICE_CONNECTION_STATE_CHECKING_STR: &str = "checking";
const ICE_CONNECTION_STATE_CONNECTED_STR: &str = "connected";
const ICE_CONNECTION_STATE_COMPLETED_STR: &str = "completed";
const ICE_CONNECTION_STATE_DISCONNECTED_STR: &str = "disconnected";
const ICE_CONNECTION_STATE_FAILED_STR: &str = "failed";
const ICE_CONNECTION_STATE_CLOSED_STR: &str = "closed";

impl From<&str> for RTCIceConnectionState {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_CONNECTION_STATE_NEW_STR => RTCIceConnectionState::New,
            ICE_CONNECTION_STATE_CHECKING_STR => RTCIceConnectionState::Checking,
            ICE_CONNECTION_STATE_CONNECTED_STR => RTCIceConnectionState::Connected,
            ICE_CONNECTION_STATE_COMPLETED_STR => RTCIceConnectionState::Completed,
            ICE_CONNECTION_STATE_DISCONNECTED_STR => RTCIceConnectionState::Disconnected,
            ICE_CONNECTION_STATE_FAILED_STR => RTCIceConnectionState::Failed,
            ICE_CONNECTION_STATE_CLOSED_STR => RTCIceConnectionState::Closed,
            _ => RTCIceConnectionState::Unspecified,
        }
    }
}

impl From<u8> for RTCIceConnectionState {
    fn from(v: u8) -> Self {
        match v {
            1 => RTCIceConnectionState::New,
            2 => RTCIceConnectionState::Checking,
            3 => RTCIceConnectionState::Connected,
            4 => RTCIceConnectionState::Completed,
            5 => RTCIceConnectionState::Disconnected,
            6 => RTCIceConnectionState::Failed,
            7 => RTCIceConnectionState::Closed,
            _ => RTCIceConnectionState::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceConnectionState::New => ICE_CONNECTION_STATE_NEW_STR,
            RTCIceConnectionState::Checking => ICE_CONNECTION_STATE_CHECKING_STR,
            RTCIceConnectionState::Connected => ICE_CONNECTION_STATE_CONNECTED_STR,
            RTCIceConnectionState::Completed => ICE_CONNECTION_STATE_COMPLETED_STR,
            RTCIceConnectionState::Disconnected => ICE_CONNECTION_STATE_DISCONNECTED_STR,
            RTCIceConnectionState::Failed => ICE_CONNECTION_STATE_FAILED_STR,
            RTCIceConnectionState::Closed => ICE_CONNECTION_STATE_CLOSED_STR,
            RTCIceConnectionState::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

impl RTCIceConnectionState {
    /// is_terminal reports states media can no longer flow from without a
    /// restart.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RTCIceConnectionState::Failed | RTCIceConnectionState::Closed
        )
    }
}

pub type OnIceConnectionStateChangeHdlrFn = Box<
    dyn (FnMut(RTCIceConnectionState) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

/// IceConnectionStateNotifier fans connectivity changes out to subscribers.
///
/// Subscribers are called in registration order, one after the other, and
/// a notification completes only after every subscriber returned. Repeated
/// notifications of the current state are ignored.
pub struct IceConnectionStateNotifier {
    state: AtomicU8,
    handlers: Mutex<Vec<OnIceConnectionStateChangeHdlrFn>>,
}

impl Default for IceConnectionStateNotifier {
    fn default() -> Self {
        IceConnectionStateNotifier {
            state: AtomicU8::new(RTCIceConnectionState::New as u8),
            handlers: Mutex::new(vec![]),
        }
    }
}

impl IceConnectionStateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// on_connection_state_change subscribes to state changes.
    pub async fn on_connection_state_change(&self, f: OnIceConnectionStateChangeHdlrFn) {
        self.handlers.lock().await.push(f);
    }

    /// notify records the new state and runs every subscriber with it.
    pub async fn notify(&self, state: RTCIceConnectionState) {
        // held across the callbacks so concurrent notifications are
        // delivered in the order they were recorded
        let mut handlers = self.handlers.lock().await;

        let previous = RTCIceConnectionState::from(self.state.swap(state as u8, Ordering::SeqCst));
        if previous == state {
            return;
        }
        debug!("ICE connection state changed: {previous} -> {state}");

        for handler in handlers.iter_mut() {
            handler(state).await;
        }
    }

    pub fn state(&self) -> RTCIceConnectionState {
        self.state.load(Ordering::SeqCst).into()
    }
}
