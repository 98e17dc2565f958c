use std::collections::BTreeMap;
use std::fmt::Write;

use educe::Educe;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::concepts::route::Route;
use crate::framework::RoutingSystem;

/// Best known route per destination.
///
/// The table always holds the owner's self-route (cost 0, next hop = owner). It can be neither
/// replaced nor removed, and is not handed out mutably.
#[serde_as]
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()))]
#[serde(bound = "")]
pub struct RouteTable<T: RoutingSystem + ?Sized> {
    owner: T::NodeAddress,
    #[serde_as(as = "Vec<(_, _)>")]
    routes: BTreeMap<T::NodeAddress, Route<T>>,
}

impl<T: RoutingSystem + ?Sized> RouteTable<T> {
    pub fn new(owner: T::NodeAddress) -> Self {
        let mut routes = BTreeMap::new();
        routes.insert(
            owner.clone(),
            Route::new(owner.clone(), owner.clone(), 0),
        );
        Self { owner, routes }
    }

    pub fn owner(&self) -> &T::NodeAddress {
        &self.owner
    }

    pub fn get(&self, dest: &T::NodeAddress) -> Option<&Route<T>> {
        self.routes.get(dest)
    }

    /// Mutable access to a learned route, None for unknown destinations and for the self-route
    pub fn get_mut(&mut self, dest: &T::NodeAddress) -> Option<&mut Route<T>> {
        if *dest == self.owner {
            return None;
        }
        self.routes.get_mut(dest)
    }

    pub fn contains(&self, dest: &T::NodeAddress) -> bool {
        self.routes.contains_key(dest)
    }

    /// Inserts or replaces the route for `route.dest`, returns false if it was not stored
    pub fn insert(&mut self, route: Route<T>) -> bool {
        if route.dest == self.owner {
            return false;
        }
        self.routes.insert(route.dest.clone(), route);
        true
    }

    pub fn remove(&mut self, dest: &T::NodeAddress) -> Option<Route<T>> {
        if *dest == self.owner {
            return None;
        }
        self.routes.remove(dest)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Never true, the self-route is always present
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes ordered by destination
    pub fn iter(&self) -> impl Iterator<Item = &Route<T>> {
        self.routes.values()
    }

    /// Snapshot of all destinations, safe to hold while the table is mutated
    pub fn destinations(&self) -> Vec<T::NodeAddress> {
        self.routes.keys().cloned().collect()
    }

    /// Snapshot of the destinations currently routed through `next_hop`
    pub fn routes_via(&self, next_hop: &T::NodeAddress) -> Vec<T::NodeAddress> {
        self.routes
            .values()
            .filter(|route| route.next_hop == *next_hop && route.dest != self.owner)
            .map(|route| route.dest.clone())
            .collect()
    }

    /// Human readable table, one `--<next hop>--> <destination>: <cost>` line per route
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for route in self.routes.values() {
            let _ = writeln!(out, "--{}--> {}: {}", route.next_hop, route.dest, route.cost);
        }
        out
    }
}
