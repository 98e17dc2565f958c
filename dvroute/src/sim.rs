//! A deterministic discrete-event substrate for running many routers against a simulated clock.
//!
//! Events scheduled for the same instant run in the order they were scheduled, so a run is
//! fully reproducible.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashSet};
use std::time::Duration;

use anyhow::{anyhow, bail};
use educe::Educe;
use log::{error, trace};
use serde_json::json;

use crate::concepts::packet::Packet;
use crate::concepts::timer::{Timer, TimerRequest};
use crate::config::NetworkConfig;
use crate::framework::RoutingSystem;
use crate::router::Router;

pub type EventId = u64;

struct Scheduled<E> {
    at: Duration,
    id: EventId,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.id == other.id
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse the ordering for min-heap
        (other.at, other.id).cmp(&(self.at, self.id))
    }
}

/// A simulated clock with a queue of cancellable future events
pub struct EventQueue<E> {
    now: Duration,
    next_id: EventId,
    heap: BinaryHeap<Scheduled<E>>,
    /// ids scheduled and neither fired nor cancelled
    live: HashSet<EventId>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            heap: BinaryHeap::new(),
            live: HashSet::new(),
        }
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule_after(&mut self, delay: Duration, event: E) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Scheduled {
            at: self.now + delay,
            id,
            event,
        });
        self.live.insert(id);
        id
    }

    /// returns false if the event already fired or was cancelled before
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.live.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// pops the next live event due at or before `deadline`, advancing the clock to it
    pub fn pop_until(&mut self, deadline: Duration) -> Option<E> {
        while let Some(next) = self.heap.peek() {
            if next.at > deadline {
                return None;
            }
            let Scheduled { at, id, event } = self.heap.pop()?;
            if self.live.remove(&id) {
                self.now = at;
                return Some(event);
            }
        }
        None
    }

    /// moves the clock forward without running anything, never backwards
    pub fn advance_to(&mut self, time: Duration) {
        self.now = self.now.max(time);
    }
}

#[derive(Educe)]
#[educe(Clone(bound()), Debug(bound()))]
pub enum Event<T: RoutingSystem + ?Sized> {
    Timer {
        node: T::NodeAddress,
        timer: Timer,
    },
    Deliver {
        node: T::NodeAddress,
        link: T::Link,
        packet: Packet<T>,
    },
}

/// A network of routers joined by point-to-point links with a fixed delay
pub struct Simulation<T: RoutingSystem + ?Sized> {
    pub routers: BTreeMap<T::NodeAddress, Router<T>>,
    links: BTreeMap<T::Link, (T::NodeAddress, T::NodeAddress)>,
    cut_links: BTreeSet<T::Link>,
    timer_events: BTreeMap<(T::NodeAddress, Timer), EventId>,
    queue: EventQueue<Event<T>>,
    pub link_delay: Duration,
}

impl<T: RoutingSystem + ?Sized> Simulation<T> {
    pub fn new(link_delay: Duration) -> Self {
        Self {
            routers: BTreeMap::new(),
            links: BTreeMap::new(),
            cut_links: BTreeSet::new(),
            timer_events: BTreeMap::new(),
            queue: EventQueue::new(),
            link_delay,
        }
    }

    /// builds every router and link of a validated configuration
    pub fn from_config(config: &NetworkConfig<T>) -> anyhow::Result<Self> {
        config.validate()?;
        let mut sim = Self::new(config.link_delay);
        for node in &config.nodes {
            let mut router = Router::with_params(node.address.clone(), config.params.clone());
            router.dies_at = node.dies_at;
            router.message_to = node.message_to.clone();
            sim.add_router(router)?;
        }
        for link in &config.links {
            sim.connect(link.id.clone(), link.a.clone(), link.b.clone())?;
        }
        Ok(sim)
    }

    pub fn add_router(&mut self, router: Router<T>) -> anyhow::Result<()> {
        if self.routers.contains_key(&router.address) {
            bail!("router {} already exists", router.address);
        }
        self.routers.insert(router.address.clone(), router);
        Ok(())
    }

    pub fn connect(&mut self, link: T::Link, a: T::NodeAddress, b: T::NodeAddress) -> anyhow::Result<()> {
        if self.links.contains_key(&link) {
            bail!("link {} already exists", json!(link));
        }
        for (from, to) in [(&a, &b), (&b, &a)] {
            let router = self
                .routers
                .get_mut(from)
                .ok_or_else(|| anyhow!("no router {from} to attach link {} to", json!(link)))?;
            router
                .add_link(link.clone(), to.clone())
                .map_err(|err| anyhow!("{err}"))?;
        }
        self.links.insert(link, (a, b));
        Ok(())
    }

    /// packets sent over a cut link, including those already in flight, are lost
    pub fn cut_link(&mut self, link: &T::Link) {
        self.cut_links.insert(link.clone());
    }

    pub fn restore_link(&mut self, link: &T::Link) {
        self.cut_links.remove(link);
    }

    pub fn now(&self) -> Duration {
        self.queue.now()
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// arms the timers of every router
    pub fn start(&mut self) {
        let nodes: Vec<T::NodeAddress> = self.routers.keys().cloned().collect();
        for node in nodes {
            if let Some(router) = self.routers.get_mut(&node) {
                router.start();
            }
            self.flush(&node);
        }
    }

    pub fn run_until(&mut self, deadline: Duration) {
        while let Some(event) = self.queue.pop_until(deadline) {
            self.dispatch(event);
        }
        self.queue.advance_to(deadline);
    }

    pub fn run_for(&mut self, duration: Duration) {
        self.run_until(self.now() + duration);
    }

    /// shuts every router down, returning its final table
    pub fn shutdown(&mut self) -> BTreeMap<T::NodeAddress, String> {
        let mut tables = BTreeMap::new();
        let nodes: Vec<T::NodeAddress> = self.routers.keys().cloned().collect();
        for node in nodes {
            if let Some(router) = self.routers.get_mut(&node) {
                tables.insert(node.clone(), router.shutdown());
            }
            self.flush(&node);
        }
        tables
    }

    fn dispatch(&mut self, event: Event<T>) {
        let now = self.now();
        match event {
            Event::Timer { node, timer } => {
                self.timer_events.remove(&(node.clone(), timer));
                if let Some(router) = self.routers.get_mut(&node) {
                    router.handle_timer(timer, now);
                }
                self.flush(&node);
            }
            Event::Deliver { node, link, packet } => {
                if self.cut_links.contains(&link) {
                    trace!("link {} is cut, lost {}", json!(link), json!(packet));
                    return;
                }
                if let Some(router) = self.routers.get_mut(&node) {
                    if let Err(err) = router.handle_packet(&packet, &link, now) {
                        error!("@{node}: {err}");
                    }
                }
                self.flush(&node);
            }
        }
    }

    /// turns a router's queued packets and timer requests into events
    fn flush(&mut self, node: &T::NodeAddress) {
        let Some(router) = self.routers.get_mut(node) else {
            return;
        };
        let packets: Vec<_> = router.outbound_packets.drain(..).collect();
        let requests: Vec<_> = router.timer_requests.drain(..).collect();

        for packet in packets {
            self.queue.schedule_after(
                self.link_delay,
                Event::Deliver {
                    node: packet.dest,
                    link: packet.link,
                    packet: packet.packet,
                },
            );
        }
        for request in requests {
            match request {
                TimerRequest::Schedule { timer, delay } => {
                    let id = self.queue.schedule_after(
                        delay,
                        Event::Timer {
                            node: node.clone(),
                            timer,
                        },
                    );
                    if let Some(old) = self.timer_events.insert((node.clone(), timer), id) {
                        self.queue.cancel(old);
                    }
                }
                TimerRequest::Cancel { timer } => {
                    if let Some(id) = self.timer_events.remove(&(node.clone(), timer)) {
                        self.queue.cancel(id);
                    }
                }
            }
        }
    }

    pub fn router(&self, node: &T::NodeAddress) -> Option<&Router<T>> {
        self.routers.get(node)
    }

    pub fn router_mut(&mut self, node: &T::NodeAddress) -> Option<&mut Router<T>> {
        self.routers.get_mut(node)
    }

    pub fn next_hop(&self, cur: &T::NodeAddress, dest: &T::NodeAddress) -> Option<T::NodeAddress> {
        self.router(cur)?
            .routes
            .get(dest)
            .map(|route| route.next_hop.clone())
    }

    pub fn cost_to(&self, cur: &T::NodeAddress, dest: &T::NodeAddress) -> Option<u16> {
        self.router(cur)?.routes.get(dest).map(|route| route.cost)
    }
}
