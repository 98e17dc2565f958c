use std::collections::{BTreeMap, VecDeque};

use dvroute::framework::ProtocolParams;

use crate::common::virtual_network::VirtualSystem;

pub const LINE_NODES: [&str; 3] = ["A", "B", "C"];
pub const LINE_LINKS: [(i32, &str, &str); 2] = [(1, "A", "B"), (2, "B", "C")];

pub const MESH_NODES: [&str; 5] = ["1", "2", "3", "4", "5"];
pub const MESH_LINKS: [(i32, &str, &str); 7] = [
    (0, "1", "2"),
    (1, "1", "3"),
    (2, "2", "3"),
    (3, "2", "4"),
    (4, "3", "4"),
    (5, "3", "5"),
    (6, "4", "5"),
];

/// A -- B -- C
pub fn vnet_line(params: ProtocolParams) -> VirtualSystem {
    VirtualSystem::create(&LINE_NODES, &LINE_LINKS, params)
}

pub fn vnet_mesh(params: ProtocolParams) -> VirtualSystem {
    VirtualSystem::create(&MESH_NODES, &MESH_LINKS, params)
}

/// hop distance between every connected pair, by breadth first search
pub fn hop_distances(nodes: &[&str], links: &[(i32, &str, &str)]) -> BTreeMap<(String, String), u16> {
    let mut distances = BTreeMap::new();
    for start in nodes {
        let mut queue = VecDeque::from([(start.to_string(), 0u16)]);
        while let Some((node, dist)) = queue.pop_front() {
            let key = (start.to_string(), node.clone());
            if distances.contains_key(&key) {
                continue;
            }
            distances.insert(key, dist);
            for (_, a, b) in links {
                if *a == node {
                    queue.push_back((b.to_string(), dist + 1));
                } else if *b == node {
                    queue.push_back((a.to_string(), dist + 1));
                }
            }
        }
    }
    distances
}
