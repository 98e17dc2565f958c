use educe::Educe;
use serde::{Deserialize, Serialize};

use crate::framework::RoutingSystem;

#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()))]
#[serde(bound = "")]
pub struct Neighbour<T: RoutingSystem + ?Sized> {
    /// the link this neighbour sits at the far end of, the pair (link, addr) is unique
    pub link: T::Link,
    /// the routing network address
    pub addr: T::NodeAddress,
}

impl<T: RoutingSystem + ?Sized> Neighbour<T> {
    pub fn new(link: T::Link, addr: T::NodeAddress) -> Self {
        Self { link, addr }
    }
}
