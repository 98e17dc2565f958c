use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::concepts::neighbour::Neighbour;
use crate::concepts::packet::{DataMessage, OutboundPacket, Packet, RouteUpdate};
use crate::concepts::route::Route;
use crate::concepts::table::RouteTable;
use crate::concepts::timer::{Timer, TimerRequest};
use crate::feedback::{RoutingError, RoutingWarning};
use crate::framework::{ProtocolParams, RoutingSystem};
use crate::router::UpdateAction::{Improved, Learned, NoAction, Retracted, Worsened};
use crate::util::{elapsed, hop_cost};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Lifecycle {
    Alive,
    /// terminal, entered only once the clock passes `Router::dies_at`
    Dead,
}

/// What an advertisement did to the routing table
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpdateAction {
    /// a previously unknown destination was added
    Learned,
    /// a strictly cheaper path was adopted
    Improved,
    /// the current next hop reported a worse cost, which was adopted
    Worsened,
    /// the current next hop reported the destination unreachable, the route is gone
    Retracted,
    NoAction,
}

/// A distance-vector router. It performs no I/O: packets to send are appended to
/// `outbound_packets`, timer (re)arming to `timer_requests`, and the embedding drains both
/// after every call.
pub struct Router<T: RoutingSystem + ?Sized> {
    pub address: T::NodeAddress,
    pub params: ProtocolParams,
    pub links: BTreeMap<T::Link, Neighbour<T>>,
    /// neighbour -> the link it is reached over, kept in step with `links`
    neighbour_links: BTreeMap<T::NodeAddress, T::Link>,
    pub routes: RouteTable<T>,
    /// when the last advertisement from each neighbour arrived
    pub last_seen: BTreeMap<T::NodeAddress, Duration>,
    /// the router stops processing anything strictly after this time
    pub dies_at: Option<Duration>,
    /// destination of the periodic application message, if any
    pub message_to: Option<T::NodeAddress>,
    pub lifecycle: Lifecycle,
    armed: BTreeSet<Timer>,
    message_seq: u64,
    pub outbound_packets: Vec<OutboundPacket<T>>,
    pub timer_requests: Vec<TimerRequest>,
    /// application messages addressed to this router
    pub delivered: Vec<DataMessage<T>>,
    pub warnings: Vec<RoutingWarning<T>>,
}

impl<T: RoutingSystem + ?Sized> Router<T> {
    pub fn new(address: T::NodeAddress) -> Self {
        Self::with_params(address, T::config())
    }

    pub fn with_params(address: T::NodeAddress, params: ProtocolParams) -> Self {
        Self {
            links: BTreeMap::new(),
            neighbour_links: BTreeMap::new(),
            routes: RouteTable::new(address.clone()),
            address,
            params,
            last_seen: BTreeMap::new(),
            dies_at: None,
            message_to: None,
            lifecycle: Lifecycle::Alive,
            armed: BTreeSet::new(),
            message_seq: 0,
            outbound_packets: Vec::new(),
            timer_requests: Vec::new(),
            delivered: Vec::new(),
            warnings: Vec::new(),
        }
    }

    // region Interface
    /// configures a direct link to a neighbour
    pub fn add_link(&mut self, link: T::Link, addr: T::NodeAddress) -> Result<(), RoutingError<T>> {
        if addr == self.address {
            return Err(RoutingError::SelfLink { link });
        }
        if self.links.contains_key(&link) {
            return Err(RoutingError::DuplicateLink { link });
        }
        if let Some(existing) = self.neighbour_links.get(&addr) {
            return Err(RoutingError::DuplicateNeighbour {
                addr,
                link: existing.clone(),
            });
        }
        self.neighbour_links.insert(addr.clone(), link.clone());
        self.links.insert(link.clone(), Neighbour::new(link, addr));
        Ok(())
    }

    pub fn link_for(&self, addr: &T::NodeAddress) -> Option<&T::Link> {
        self.neighbour_links.get(addr)
    }

    pub fn neighbour_on(&self, link: &T::Link) -> Option<&T::NodeAddress> {
        self.links.get(link).map(|neigh| &neigh.addr)
    }

    fn warn(&mut self, warning: RoutingWarning<T>) {
        warn!("@{}: {}", self.address, warning);
        self.warnings.push(warning);
    }
    // endregion

    // region Lifecycle
    /// arms the periodic timers, call once before handing the router any event
    pub fn start(&mut self) {
        self.arm(Timer::RouteUpdate);
        if self.message_to.is_some() {
            self.arm(Timer::SendMessage);
        }
        self.arm(Timer::CheckAlive);
    }

    /// cancels every armed timer and returns the final routing table
    pub fn shutdown(&mut self) -> String {
        for timer in std::mem::take(&mut self.armed) {
            self.timer_requests.push(TimerRequest::Cancel { timer });
        }
        let table = self.routes.dump();
        info!("@{}: Routing table:\n{}", self.address, table);
        table
    }

    pub fn armed_timers(&self) -> impl Iterator<Item = &Timer> {
        self.armed.iter()
    }

    fn arm(&mut self, timer: Timer) {
        let delay = match timer {
            Timer::RouteUpdate => self.params.update_interval,
            Timer::SendMessage => self.params.message_interval,
            Timer::CheckAlive => self.params.check_alive_interval,
        };
        self.armed.insert(timer);
        self.timer_requests.push(TimerRequest::Schedule { timer, delay });
    }

    /// moves the router to `Dead` once `now` is past `dies_at`, returns whether it is still alive
    pub fn is_alive(&mut self, now: Duration) -> bool {
        if self.lifecycle == Lifecycle::Alive && self.dies_at.is_some_and(|at| now > at) {
            info!("@{}: died at {:?}", self.address, now);
            self.lifecycle = Lifecycle::Dead;
        }
        self.lifecycle == Lifecycle::Alive
    }

    /// handle a timer firing
    pub fn handle_timer(&mut self, timer: Timer, now: Duration) {
        if !self.armed.contains(&timer) {
            trace!("@{}: ignoring {:?}, it is not armed", self.address, timer);
            return;
        }
        if self.is_alive(now) {
            match timer {
                Timer::RouteUpdate => self.broadcast_routes(),
                Timer::SendMessage => self.send_message(),
                Timer::CheckAlive => self.check_alive(now),
            }
        }
        // a dead router keeps re-arming, its timers just do nothing
        self.arm(timer);
    }

    /// handle a single packet that arrived over `link` at `now`
    pub fn handle_packet(
        &mut self,
        packet: &Packet<T>,
        link: &T::Link,
        now: Duration,
    ) -> Result<(), RoutingError<T>> {
        if !self.is_alive(now) {
            trace!("@{}: dead, dropping {}", self.address, json!(packet));
            return Ok(());
        }
        let neigh = match self.neighbour_on(link) {
            Some(neigh) => neigh.clone(),
            None => return Err(RoutingError::UnknownLink { link: link.clone() }),
        };

        match packet {
            Packet::Update(update) => {
                if update.source != neigh {
                    self.warn(RoutingWarning::UnexpectedSource {
                        claimed: update.source.clone(),
                        neighbour: neigh,
                        link: link.clone(),
                    });
                    return Ok(());
                }
                self.handle_route_update(update);
                self.last_seen.insert(neigh, now);
            }
            Packet::Data(msg) => self.handle_message(msg.clone()),
        }
        Ok(())
    }
    // endregion

    // region Propagation
    /// pushes the whole table to every neighbour
    pub fn broadcast_routes(&mut self) {
        for dest in self.routes.destinations() {
            self.send_cost(&dest);
        }
    }

    /// advertises our current route to `dest` over every link, applying split horizon and
    /// poison reverse on the link to the route's next hop
    pub fn send_cost(&mut self, dest: &T::NodeAddress) {
        let (cost, next_hop) = match self.routes.get(dest) {
            Some(route) => (route.cost, route.next_hop.clone()),
            None => {
                self.warn(RoutingWarning::UnknownDestination { dest: dest.clone() });
                return;
            }
        };

        let next_hop_link = if next_hop == self.address {
            None
        } else if let Some(link) = self.neighbour_links.get(&next_hop) {
            Some(link.clone())
        } else {
            self.warn(RoutingWarning::NoLinkForNeighbour { addr: next_hop });
            None
        };

        for (link, neigh) in &self.links {
            let over_next_hop = next_hop_link.as_ref() == Some(link);
            let Some(cost) = self.params.advertised_cost(over_next_hop, cost) else {
                trace!("@{}: split horizon, not advertising {} to {}", self.address, dest, neigh.addr);
                continue;
            };
            self.outbound_packets.push(OutboundPacket {
                link: link.clone(),
                dest: neigh.addr.clone(),
                packet: Packet::Update(RouteUpdate {
                    source: self.address.clone(),
                    destination: dest.clone(),
                    cost,
                }),
            });
        }
    }
    // endregion

    // region Convergence
    /// applies a neighbour's advertisement and propagates the destination if it changed
    pub fn handle_route_update(&mut self, update: &RouteUpdate<T>) -> UpdateAction {
        debug!(
            "@{}: Received update from {}. route {} --> {}, cost {}",
            self.address, update.source, update.source, update.destination, update.cost
        );
        let action = self.apply_update(update);
        match action {
            NoAction => {}
            Retracted => {
                // tell the neighbours once, then forget the route
                self.send_cost(&update.destination);
                self.routes.remove(&update.destination);
            }
            Learned | Improved | Worsened => self.send_cost(&update.destination),
        }
        action
    }

    fn apply_update(&mut self, update: &RouteUpdate<T>) -> UpdateAction {
        let RouteUpdate {
            source,
            destination,
            cost,
        } = update;
        if *destination == self.address {
            return NoAction;
        }
        let infinity = self.params.infinity;
        let candidate = hop_cost(*cost, infinity);

        if let Some(route) = self.routes.get_mut(destination) {
            if candidate < route.cost {
                route.next_hop = source.clone();
                route.cost = candidate;
                Improved
            } else if candidate > route.cost && *source == route.next_hop {
                route.cost = candidate;
                if candidate >= infinity {
                    Retracted
                } else {
                    Worsened
                }
            } else {
                NoAction
            }
        } else if candidate < infinity {
            self.routes
                .insert(Route::new(destination.clone(), source.clone(), candidate));
            Learned
        } else {
            NoAction
        }
    }
    // endregion

    // region Liveness
    /// declares neighbours silent for longer than the peer timeout failed, and purges every
    /// route through them after advertising it as unreachable
    pub fn check_alive(&mut self, now: Duration) {
        let timeout = self.params.peer_timeout;
        let failed: Vec<(T::NodeAddress, Duration)> = self
            .last_seen
            .iter()
            .map(|(addr, seen)| (addr.clone(), elapsed(now, *seen)))
            .filter(|(_, silent_for)| *silent_for > timeout)
            .collect();

        let infinity = self.params.infinity;
        for (addr, silent_for) in failed {
            self.warn(RoutingWarning::NeighbourFailed {
                addr: addr.clone(),
                silent_for,
            });
            for dest in self.routes.routes_via(&addr) {
                if let Some(route) = self.routes.get_mut(&dest) {
                    route.cost = infinity;
                }
                self.send_cost(&dest);
                self.routes.remove(&dest);
            }
            // rediscovery needs a fresh advertisement
            self.last_seen.remove(&addr);
        }
    }
    // endregion

    // region Forwarding
    /// originates an application message to `message_to`
    pub fn send_message(&mut self) {
        let Some(dest) = self.message_to.clone() else {
            return;
        };
        self.message_seq += 1;
        let msg = DataMessage {
            id: self.message_seq,
            payload: format!("This is a message from {} to {}.", self.address, dest),
            source: self.address.clone(),
            destination: dest,
            hops: 0,
        };
        self.route_message(msg);
    }

    fn handle_message(&mut self, msg: DataMessage<T>) {
        if msg.destination == self.address {
            info!(
                "@{}: Message {} arrived from {}: [{}]",
                self.address, msg.id, msg.source, msg.payload
            );
            self.delivered.push(msg);
        } else {
            self.route_message(msg);
        }
    }

    /// delivers locally or forwards one hop towards the destination, best-effort
    pub fn route_message(&mut self, mut msg: DataMessage<T>) {
        if msg.destination == self.address {
            self.handle_message(msg);
            return;
        }
        if msg.hops >= self.params.infinity {
            self.warn(RoutingWarning::HopLimitExceeded {
                origin: msg.source,
                dest: msg.destination,
                id: msg.id,
            });
            return;
        }
        let Some(next_hop) = self.routes.get(&msg.destination).map(|r| r.next_hop.clone()) else {
            self.warn(RoutingWarning::Unroutable {
                origin: msg.source,
                dest: msg.destination,
                id: msg.id,
            });
            return;
        };
        let Some(link) = self.neighbour_links.get(&next_hop).cloned() else {
            self.warn(RoutingWarning::NoLinkForNeighbour { addr: next_hop });
            return;
        };
        msg.hops += 1;
        trace!(
            "@{}: forwarding message {} for {} to {} over {}",
            self.address, msg.id, msg.destination, next_hop, json!(link)
        );
        self.outbound_packets.push(OutboundPacket {
            link,
            dest: next_hop,
            packet: Packet::Data(msg),
        });
    }
    // endregion
}
