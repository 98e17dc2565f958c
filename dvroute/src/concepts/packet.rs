use educe::Educe;
use serde::{Deserialize, Serialize};

use crate::framework::RoutingSystem;

/// Everything that travels over a link. On the wire this is JSON tagged by `kind`.
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[serde(bound = "", tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Packet<T: RoutingSystem + ?Sized> {
    Update(RouteUpdate<T>),
    Data(DataMessage<T>),
}

/// "`source` believes it can reach `destination` at `cost`"
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[serde(bound = "")]
pub struct RouteUpdate<T: RoutingSystem + ?Sized> {
    pub source: T::NodeAddress,
    pub destination: T::NodeAddress,
    pub cost: u16,
}

/// Application traffic, forwarded hop by hop using the routing table
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()))]
#[serde(bound = "")]
pub struct DataMessage<T: RoutingSystem + ?Sized> {
    /// sequence number assigned by the originating node
    pub id: u64,
    pub source: T::NodeAddress,
    pub destination: T::NodeAddress,
    pub payload: String,
    /// links traversed so far
    #[serde(default)]
    pub hops: u16,
}

#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()))]
#[serde(bound = "")]
pub struct OutboundPacket<T: RoutingSystem + ?Sized> {
    /// send via this link
    pub link: T::Link,
    /// to this neighbour
    pub dest: T::NodeAddress,
    pub packet: Packet<T>,
}

impl<T: RoutingSystem + ?Sized> Packet<T> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}
