use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

use crate::feedback::ConfigError;

pub trait RoutingSystem {
    /// Address of the node on the routing network, MUST be globally unique
    type NodeAddress: Ord + Display + Debug + RootData + RootKey;
    /// Id of a point-to-point link. Both routers at the ends of a link know it by the same id.
    type Link: Ord + Debug + RootData + RootKey;
    fn config() -> ProtocolParams {
        Default::default()
    }
}

pub trait RootData: Clone + Serialize + DeserializeOwned + Sized {}
pub trait RootKey: Eq + PartialEq + Hash {}
impl<T: Eq + PartialEq + Hash> RootKey for T {}
impl<T: Clone + Serialize + DeserializeOwned + Sized> RootData for T {}

/// Tunable protocol parameters, shared by every router of a network
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParams {
    /// how often the full routing table is pushed to every neighbour
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "update_interval_ms")]
    pub update_interval: Duration,
    /// how often neighbour liveness is checked
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "check_alive_interval_ms")]
    pub check_alive_interval: Duration,
    /// a neighbour that has been silent for longer than this is considered failed
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "peer_timeout_ms")]
    pub peer_timeout: Duration,
    /// how often a node configured with a message destination sends a message
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "message_interval_ms")]
    pub message_interval: Duration,
    /// the cost that means "unreachable", the protocol's small infinity
    pub infinity: u16,
    pub split_horizon: bool,
    pub poison_reverse: bool,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_millis(1000),
            check_alive_interval: Duration::from_millis(1000),
            peer_timeout: Duration::from_millis(3500),
            message_interval: Duration::from_millis(1000),
            infinity: 16,
            split_horizon: false,
            poison_reverse: false,
        }
    }
}

impl ProtocolParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("update_interval", self.update_interval),
            ("check_alive_interval", self.check_alive_interval),
            ("peer_timeout", self.peer_timeout),
            ("message_interval", self.message_interval),
        ];
        for (name, value) in intervals {
            if value.is_zero() {
                return Err(ConfigError::ZeroInterval { name });
            }
        }
        if self.infinity < 2 {
            return Err(ConfigError::InfinityTooSmall(self.infinity));
        }
        Ok(())
    }

    /// The cost to advertise for a route over a single link, None if nothing should be sent.
    ///
    /// `over_next_hop` is true when the link leads to the route's own next hop.
    /// Poison reverse wins over split horizon on that link.
    pub fn advertised_cost(&self, over_next_hop: bool, cost: u16) -> Option<u16> {
        if !over_next_hop {
            Some(cost)
        } else if self.poison_reverse {
            Some(self.infinity)
        } else if self.split_horizon {
            None
        } else {
            Some(cost)
        }
    }
}
