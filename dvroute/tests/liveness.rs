use dvroute::concepts::timer::{Timer, TimerRequest};
use dvroute::feedback::RoutingWarning;
use dvroute::router::Lifecycle;

use crate::common::graphs::{vnet_line, LINE_LINKS, LINE_NODES};
use crate::common::single::{ms, params, receive, route, router, update, updates_on};
use crate::common::virtual_network::VirtualSystem;

mod common;

#[test]
fn silent_neighbour_is_purged() {
    let mut b = router("B", &[(1, "A"), (2, "C")], params(false, false));
    receive(&mut b, 2, "C", 0, ms(0));
    receive(&mut b, 2, "D", 1, ms(0));
    receive(&mut b, 1, "A", 0, ms(0));
    receive(&mut b, 1, "A", 0, ms(3000));
    assert_eq!(route(&b, "D"), Some(("C".to_string(), 2)));
    b.outbound_packets.clear();

    b.check_alive(ms(4000));

    assert!(route(&b, "C").is_none());
    assert!(route(&b, "D").is_none());
    assert_eq!(route(&b, "A"), Some(("A".to_string(), 1)));
    // exactly one unreachable advertisement per purged destination
    assert_eq!(
        updates_on(&b, 1),
        vec![("C".to_string(), 16), ("D".to_string(), 16)]
    );
    assert!(!b.last_seen.contains_key("C"));
    assert!(b.last_seen.contains_key("A"));
    assert!(matches!(
        b.warnings.as_slice(),
        [RoutingWarning::NeighbourFailed { addr, .. }] if addr == "C"
    ));

    // the failure is reported once
    b.outbound_packets.clear();
    b.check_alive(ms(5000));
    assert!(b.outbound_packets.is_empty());
    assert_eq!(b.warnings.len(), 1);
}

#[test]
fn timeout_is_strict() {
    let mut b = router("B", &[(1, "A")], params(false, false));
    receive(&mut b, 1, "A", 0, ms(1000));

    b.check_alive(ms(4500));
    assert!(route(&b, "A").is_some());

    b.check_alive(ms(4501));
    assert!(route(&b, "A").is_none());
}

#[test]
fn failed_neighbour_is_rediscovered() {
    let mut b = router("B", &[(1, "A")], params(false, false));
    receive(&mut b, 1, "A", 0, ms(0));
    b.check_alive(ms(4000));
    assert!(route(&b, "A").is_none());

    receive(&mut b, 1, "A", 0, ms(4100));
    assert_eq!(route(&b, "A"), Some(("A".to_string(), 1)));
    assert_eq!(b.last_seen.get("A"), Some(&ms(4100)));
}

#[test]
fn purge_with_poison_reverse_tells_the_failed_link_too() {
    let mut b = router("B", &[(1, "A"), (2, "C")], params(false, true));
    receive(&mut b, 2, "C", 0, ms(0));
    b.outbound_packets.clear();

    b.check_alive(ms(4000));
    assert_eq!(updates_on(&b, 1), vec![("C".to_string(), 16)]);
    assert_eq!(updates_on(&b, 2), vec![("C".to_string(), 16)]);
}

#[test]
fn dead_router_ignores_everything() {
    let mut a = router("A", &[(1, "B")], params(false, false));
    a.dies_at = Some(ms(1000));
    a.start();
    a.timer_requests.clear();

    // exactly at the time of death the router still works
    a.handle_packet(&update("B", "B", 0), &1, ms(1000)).unwrap();
    assert_eq!(route(&a, "B"), Some(("B".to_string(), 1)));
    a.outbound_packets.clear();

    a.handle_packet(&update("B", "C", 0), &1, ms(1001)).unwrap();
    assert_eq!(a.lifecycle, Lifecycle::Dead);
    assert!(route(&a, "C").is_none());
    assert_eq!(a.last_seen.get("B"), Some(&ms(1000)));

    // timers keep being re-armed, but do nothing
    a.handle_timer(Timer::RouteUpdate, ms(2000));
    a.handle_timer(Timer::CheckAlive, ms(9000));
    assert!(a.outbound_packets.is_empty());
    assert!(route(&a, "B").is_some());
    assert_eq!(
        a.timer_requests,
        vec![
            TimerRequest::Schedule {
                timer: Timer::RouteUpdate,
                delay: ms(1000)
            },
            TimerRequest::Schedule {
                timer: Timer::CheckAlive,
                delay: ms(1000)
            },
        ]
    );
}

#[test]
fn shutdown_cancels_every_timer() {
    let mut a = router("A", &[(1, "B")], params(false, false));
    a.message_to = Some("B".to_string());
    a.start();
    assert_eq!(a.armed_timers().count(), 3);
    a.timer_requests.clear();

    let table = a.shutdown();
    assert_eq!(table, "--A--> A: 0\n");
    assert_eq!(a.armed_timers().count(), 0);
    assert_eq!(a.timer_requests.len(), 3);
    assert!(a
        .timer_requests
        .iter()
        .all(|req| matches!(req, TimerRequest::Cancel { .. })));

    // late events for cancelled timers are ignored
    a.timer_requests.clear();
    a.handle_timer(Timer::RouteUpdate, ms(1000));
    assert!(a.timer_requests.is_empty());
    assert!(a.outbound_packets.is_empty());
}

#[test]
fn count_to_infinity_is_suppressed_with_poison_reverse() {
    let mut network = vnet_line(params(false, true));
    network.run_until_ms(2500);
    assert_eq!(network.get_cost_to("A", "C"), 2);

    network.cut(2);
    network.run_checked(10000, 10, |net| {
        // B never believes A's stale path to C
        if net.has_route("B", "C") {
            assert_eq!(net.get_next_hop("B", "C"), "C");
        }
        if net.sim.now() >= ms(6100) {
            assert!(!net.has_route("A", "C"));
            assert!(!net.has_route("B", "C"));
            assert!(!net.has_route("C", "A"));
        }
    });
    assert_eq!(network.get_cost_to("A", "B"), 1);
}

#[test]
fn count_to_infinity_is_bounded_without_poison_reverse() {
    let mut network = vnet_line(params(false, false));
    network.run_until_ms(2500);

    network.cut(2);
    // check_invariants keeps every stored cost below infinity throughout
    network.run_checked(12000, 10, |_| {});
    assert!(!network.has_route("A", "C"));
    assert!(!network.has_route("B", "C"));
    assert_eq!(network.get_cost_to("A", "B"), 1);
}

#[test]
fn routes_return_after_link_restore() {
    let mut network = vnet_line(params(false, true));
    network.run_until_ms(2500);
    network.cut(2);
    network.run_until_ms(7000);
    assert!(!network.has_route("A", "C"));

    network.restore(2);
    network.run_until_ms(9000);
    assert_eq!(network.get_next_hop("A", "C"), "B");
    assert_eq!(network.get_cost_to("A", "C"), 2);
    assert_eq!(network.get_cost_to("C", "A"), 2);
}

#[test]
fn dead_node_is_purged_by_its_neighbours() {
    let mut config = dvroute::config::NetworkConfig::<VirtualSystem>::new(params(false, true));
    for node in LINE_NODES {
        config.add_node(node.to_string()).dies_at = (node == "C").then(|| ms(2500));
    }
    for (id, a, b) in LINE_LINKS {
        config.add_link(id, a.to_string(), b.to_string());
    }
    let mut network = VirtualSystem::from_config(config);

    network.run_until_ms(2500);
    assert_eq!(network.get_cost_to("A", "C"), 2);
    let frozen = network.get_node("C").routes.dump();

    network.run_until_ms(8000);
    assert!(!network.has_route("A", "C"));
    assert!(!network.has_route("B", "C"));
    assert_eq!(network.get_node("C").lifecycle, Lifecycle::Dead);
    assert_eq!(network.get_node("C").routes.dump(), frozen);
    // its timers are still scheduled
    assert_eq!(network.get_node("C").armed_timers().count(), 2);

    let tables = network.sim.shutdown();
    assert_eq!(tables["A"], "--A--> A: 0\n--B--> B: 1\n");
    // packets in flight drain, no timer fires again
    network.run_ms(1000);
    assert_eq!(network.sim.pending_events(), 0);
}
