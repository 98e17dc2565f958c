use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use educe::Educe;
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_with::{serde_as, DurationMilliSeconds};

use crate::feedback::ConfigError;
use crate::framework::{ProtocolParams, RoutingSystem};

fn default_link_delay() -> Duration {
    Duration::from_millis(10)
}

/// Static description of a network: shared protocol parameters, the nodes and the links
/// between them.
///
/// ```
/// use dvroute::config::NetworkConfig;
/// use dvroute::framework::RoutingSystem;
///
/// struct Named;
/// impl RoutingSystem for Named {
///     type NodeAddress = String;
///     type Link = u32;
/// }
///
/// let config = NetworkConfig::<Named>::from_json(r#"{
///     "params": { "poison_reverse": true },
///     "nodes": [ { "address": "a" }, { "address": "b", "message_to": "a" } ],
///     "links": [ { "id": 1, "a": "a", "b": "b" } ]
/// }"#).unwrap();
/// assert!(config.params.poison_reverse);
/// assert_eq!(config.links.len(), 1);
/// ```
#[serde_as]
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()))]
#[serde(bound = "")]
pub struct NetworkConfig<T: RoutingSystem + ?Sized> {
    #[serde(default)]
    pub params: ProtocolParams,
    /// time a packet spends on a link
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "link_delay_ms", default = "default_link_delay")]
    pub link_delay: Duration,
    pub nodes: Vec<NodeConfig<T>>,
    #[serde(default)]
    pub links: Vec<LinkConfig<T>>,
}

#[serde_as]
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()))]
#[serde(bound = "")]
pub struct NodeConfig<T: RoutingSystem + ?Sized> {
    pub address: T::NodeAddress,
    /// the node stops processing anything after this point in time
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(rename = "dies_at_ms")]
    pub dies_at: Option<Duration>,
    /// periodically send an application message to this node
    #[serde(default)]
    pub message_to: Option<T::NodeAddress>,
}

#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()), Debug(bound()))]
#[serde(bound = "")]
pub struct LinkConfig<T: RoutingSystem + ?Sized> {
    pub id: T::Link,
    pub a: T::NodeAddress,
    pub b: T::NodeAddress,
}

impl<T: RoutingSystem + ?Sized> NetworkConfig<T> {
    pub fn new(params: ProtocolParams) -> Self {
        Self {
            params,
            link_delay: default_link_delay(),
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn from_json(data: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(data).context("malformed network configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read network configuration {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("in {}", path.display()))
    }

    pub fn add_node(&mut self, address: T::NodeAddress) -> &mut NodeConfig<T> {
        self.nodes.push(NodeConfig {
            address,
            dies_at: None,
            message_to: None,
        });
        let last = self.nodes.len() - 1;
        &mut self.nodes[last]
    }

    pub fn add_link(&mut self, id: T::Link, a: T::NodeAddress, b: T::NodeAddress) {
        self.links.push(LinkConfig { id, a, b });
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.params.validate()?;

        let mut nodes = BTreeSet::new();
        for node in &self.nodes {
            if !nodes.insert(&node.address) {
                return Err(ConfigError::DuplicateNode(node.address.to_string()));
            }
        }
        for node in &self.nodes {
            if let Some(target) = &node.message_to {
                if !nodes.contains(target) {
                    return Err(ConfigError::UnknownMessageTarget {
                        node: node.address.to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }

        let mut ids = BTreeSet::new();
        let mut pairs = BTreeMap::new();
        for link in &self.links {
            let name = json!(link.id).to_string();
            if !ids.insert(&link.id) {
                return Err(ConfigError::DuplicateLink(name));
            }
            if link.a == link.b {
                return Err(ConfigError::SelfLink(name));
            }
            for end in [&link.a, &link.b] {
                if !nodes.contains(end) {
                    return Err(ConfigError::UnknownEndpoint {
                        link: name,
                        node: end.to_string(),
                    });
                }
            }
            let pair = if link.a < link.b {
                (&link.a, &link.b)
            } else {
                (&link.b, &link.a)
            };
            if pairs.insert(pair, &link.id).is_some() {
                return Err(ConfigError::ParallelLinks {
                    a: pair.0.to_string(),
                    b: pair.1.to_string(),
                });
            }
        }
        Ok(())
    }
}
