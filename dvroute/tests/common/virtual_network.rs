use std::time::Duration;

use dvroute::config::NetworkConfig;
use dvroute::framework::{ProtocolParams, RoutingSystem};
use dvroute::router::Router;
use dvroute::sim::Simulation;
use simplelog::{Config, LevelFilter, TestLogger};

pub struct VirtualSystem {
    pub sim: Simulation<VirtualSystem>,
}

impl RoutingSystem for VirtualSystem {
    type NodeAddress = String;
    type Link = i32;
}

pub fn init_logging() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

impl VirtualSystem {
    pub fn create(nodes: &[&str], links: &[(i32, &str, &str)], params: ProtocolParams) -> VirtualSystem {
        let mut config = NetworkConfig::new(params);
        for node in nodes {
            config.add_node(node.to_string());
        }
        for (id, a, b) in links {
            config.add_link(*id, a.to_string(), b.to_string());
        }
        Self::from_config(config)
    }

    pub fn from_config(config: NetworkConfig<VirtualSystem>) -> VirtualSystem {
        init_logging();
        let mut sim = Simulation::from_config(&config).unwrap();
        sim.start();
        VirtualSystem { sim }
    }

    pub fn run_ms(&mut self, ms: u64) {
        self.sim.run_for(Duration::from_millis(ms));
    }

    pub fn run_until_ms(&mut self, ms: u64) {
        self.sim.run_until(Duration::from_millis(ms));
    }

    pub fn cut(&mut self, link: i32) {
        self.sim.cut_link(&link);
    }

    pub fn restore(&mut self, link: i32) {
        self.sim.restore_link(&link);
    }

    pub fn get_node(&self, node: &str) -> &Router<Self> {
        self.sim
            .router(&node.to_string())
            .unwrap_or_else(|| panic!("No node {node} found"))
    }

    pub fn get_node_mut(&mut self, node: &str) -> &mut Router<Self> {
        self.sim
            .router_mut(&node.to_string())
            .unwrap_or_else(|| panic!("No node {node} found"))
    }

    pub fn get_next_hop(&self, cur: &str, dst: &str) -> String {
        self.sim
            .next_hop(&cur.to_string(), &dst.to_string())
            .unwrap_or_else(|| panic!("No route found to {dst} at {cur}"))
    }

    pub fn get_cost_to(&self, cur: &str, dst: &str) -> u16 {
        self.sim
            .cost_to(&cur.to_string(), &dst.to_string())
            .unwrap_or_else(|| panic!("No route found to {dst} at {cur}"))
    }

    pub fn has_route(&self, cur: &str, dst: &str) -> bool {
        self.sim.cost_to(&cur.to_string(), &dst.to_string()).is_some()
    }

    /// every stored route is finite and every self-route is intact
    pub fn check_invariants(&self) {
        for (addr, router) in &self.sim.routers {
            let own = router.routes.get(addr).expect("self-route missing");
            assert_eq!(own.cost, 0);
            assert_eq!(own.next_hop, *addr);
            for route in router.routes.iter() {
                assert!(
                    route.cost < router.params.infinity,
                    "{addr} stores {} at cost {}",
                    route.dest,
                    route.cost
                );
            }
        }
    }

    /// runs in `step_ms` increments until `until_ms`, checking invariants after each step
    pub fn run_checked(&mut self, until_ms: u64, step_ms: u64, mut check: impl FnMut(&Self)) {
        while self.sim.now() < Duration::from_millis(until_ms) {
            self.run_ms(step_ms);
            self.check_invariants();
            check(self);
        }
    }
}
