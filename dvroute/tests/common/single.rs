//! Helpers for driving one router by hand

use std::time::Duration;

use dvroute::concepts::packet::{Packet, RouteUpdate};
use dvroute::framework::ProtocolParams;
use dvroute::router::Router;

use crate::common::virtual_network::{init_logging, VirtualSystem};

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

pub fn params(split_horizon: bool, poison_reverse: bool) -> ProtocolParams {
    ProtocolParams {
        split_horizon,
        poison_reverse,
        ..Default::default()
    }
}

pub fn router(addr: &str, neighbours: &[(i32, &str)], params: ProtocolParams) -> Router<VirtualSystem> {
    init_logging();
    let mut router = Router::with_params(addr.to_string(), params);
    for (link, neigh) in neighbours {
        router.add_link(*link, neigh.to_string()).unwrap();
    }
    router
}

pub fn update(source: &str, dest: &str, cost: u16) -> Packet<VirtualSystem> {
    Packet::Update(RouteUpdate {
        source: source.to_string(),
        destination: dest.to_string(),
        cost,
    })
}

/// delivers an update from the neighbour on `link`
pub fn receive(router: &mut Router<VirtualSystem>, link: i32, dest: &str, cost: u16, at: Duration) {
    let source = router.neighbour_on(&link).expect("no such link").clone();
    router
        .handle_packet(&update(&source, dest, cost), &link, at)
        .unwrap();
}

/// (destination, cost) of every update queued for `link`, in order
pub fn updates_on(router: &Router<VirtualSystem>, link: i32) -> Vec<(String, u16)> {
    router
        .outbound_packets
        .iter()
        .filter(|pkt| pkt.link == link)
        .filter_map(|pkt| match &pkt.packet {
            Packet::Update(update) => Some((update.destination.clone(), update.cost)),
            Packet::Data(_) => None,
        })
        .collect()
}

pub fn route(router: &Router<VirtualSystem>, dest: &str) -> Option<(String, u16)> {
    router
        .routes
        .get(&dest.to_string())
        .map(|r| (r.next_hop.clone(), r.cost))
}
