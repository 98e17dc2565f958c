use std::time::Duration;

use educe::Educe;
use thiserror::Error;

use crate::framework::RoutingSystem;

/// Errors returned to whoever drives the router, these indicate a misconfigured embedding
#[derive(Error)]
#[derive(Educe)]
#[educe(Debug(bound()))]
pub enum RoutingError<T: RoutingSystem + ?Sized> {
    #[error("Received a packet over link {link:?}, which is not configured on this router.")]
    UnknownLink {
        link: T::Link
    },
    #[error("Link {link:?} is already configured.")]
    DuplicateLink {
        link: T::Link
    },
    /// Each neighbour must be reachable over exactly one link, otherwise next hops are ambiguous
    #[error("Neighbour {addr} is already reachable over link {link:?}.")]
    DuplicateNeighbour {
        addr: T::NodeAddress,
        link: T::Link
    },
    #[error("Link {link:?} connects the router to itself.")]
    SelfLink {
        link: T::Link
    }
}

/// Although this is an error enum, these should be treated as warnings.
/// None of them stop the router, they are logged and queued on `Router::warnings`.
#[derive(Error)]
#[derive(Educe)]
#[educe(Debug(bound()))]
pub enum RoutingWarning<T: RoutingSystem + ?Sized> {
    /// The next hop of a route is not a configured neighbour. Heals once the table changes.
    #[error("NO_LINK. Cannot find out link for router {addr}.")]
    NoLinkForNeighbour {
        addr: T::NodeAddress
    },
    #[error("Request to send cost to unknown router {dest}.")]
    UnknownDestination {
        dest: T::NodeAddress
    },
    #[error("Rejected update claiming to be from {claimed}, link {link:?} leads to {neighbour}.")]
    UnexpectedSource {
        claimed: T::NodeAddress,
        neighbour: T::NodeAddress,
        link: T::Link
    },
    #[error("Neighbour {addr} failed, nothing heard for {silent_for:?}.")]
    NeighbourFailed {
        addr: T::NodeAddress,
        silent_for: Duration
    },
    /// Messages are best-effort, the sender is never told
    #[error("No route to {dest}, dropped message {id} from {origin}.")]
    Unroutable {
        origin: T::NodeAddress,
        dest: T::NodeAddress,
        id: u64
    },
    #[error("Message {id} from {origin} to {dest} reached the hop limit and was dropped.")]
    HopLimitExceeded {
        origin: T::NodeAddress,
        dest: T::NodeAddress,
        id: u64
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    ZeroInterval {
        name: &'static str
    },
    #[error("infinity must be at least 2, got {0}")]
    InfinityTooSmall(u16),
    #[error("node {0} is declared more than once")]
    DuplicateNode(String),
    #[error("link {0} is declared more than once")]
    DuplicateLink(String),
    #[error("link {0} connects a node to itself")]
    SelfLink(String),
    #[error("link {link} references unknown node {node}")]
    UnknownEndpoint {
        link: String,
        node: String
    },
    #[error("nodes {a} and {b} are connected by more than one link")]
    ParallelLinks {
        a: String,
        b: String
    },
    #[error("node {node} sends messages to unknown node {target}")]
    UnknownMessageTarget {
        node: String,
        target: String
    }
}
