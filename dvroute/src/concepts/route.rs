use educe::Educe;
use serde::{Deserialize, Serialize};

use crate::framework::RoutingSystem;

#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()), PartialEq(bound()), Eq)]
#[serde(bound = "")]
pub struct Route<T: RoutingSystem + ?Sized> {
    /// the node this route reaches
    pub dest: T::NodeAddress,
    /// the neighbour traffic for `dest` is forwarded to, our own address for the self-route
    pub next_hop: T::NodeAddress,
    /// number of hops, lower is better. The configured infinity means unreachable
    pub cost: u16,
}

impl<T: RoutingSystem + ?Sized> Route<T> {
    pub fn new(dest: T::NodeAddress, next_hop: T::NodeAddress, cost: u16) -> Self {
        Self {
            dest,
            next_hop,
            cost,
        }
    }
}
