use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The periodic activities of a router
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timer {
    /// push the full routing table to every neighbour
    RouteUpdate,
    /// send an application message to the configured destination
    SendMessage,
    /// look for neighbours that have gone silent
    CheckAlive,
}

/// What the router asks of the scheduler. The scheduler keeps at most one pending event per
/// timer, scheduling a timer again replaces its pending event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerRequest {
    Schedule { timer: Timer, delay: Duration },
    Cancel { timer: Timer },
}
