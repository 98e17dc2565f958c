use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Parser;
use dvroute::concepts::packet::Packet;
use dvroute::concepts::timer::{Timer, TimerRequest};
use dvroute::config::NetworkConfig;
use dvroute::framework::RoutingSystem;
use dvroute::router::Router;
use log::{debug, error, info};
use simplelog::*;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

struct MeshSystem {}
impl RoutingSystem for MeshSystem {
    type NodeAddress = String;
    type Link = u32;
}

#[derive(Parser)]
#[command(name = "tokio-mesh", about = "Runs every router of a network as its own tokio task")]
struct Cli {
    /// Path to the network configuration (JSON)
    config: PathBuf,
    /// Wall-clock time to run for, in seconds
    #[arg(short, long, default_value_t = 10)]
    seconds: u64,
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

enum NodeEvent {
    Packet { link: u32, wire: String },
    Timer(Timer),
    Shutdown(oneshot::Sender<String>),
}

type Peers = Arc<BTreeMap<String, mpsc::UnboundedSender<NodeEvent>>>;

/// One router and the timers and wiring of the task driving it
struct Node {
    router: Router<MeshSystem>,
    /// sleeping task per armed timer, it posts the timer back into our own inbox
    timers: BTreeMap<Timer, JoinHandle<()>>,
    peers: Peers,
    link_delay: Duration,
    epoch: Instant,
}

impl Node {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// pushes the router's outbound packets onto the wire and applies its timer requests
    fn flush(&mut self) {
        for outbound in self.router.outbound_packets.drain(..) {
            let wire = match outbound.packet.to_json() {
                Ok(wire) => wire,
                Err(err) => {
                    error!("@{}: failed to encode packet: {err}", self.router.address);
                    continue;
                }
            };
            let Some(peer) = self.peers.get(&outbound.dest).cloned() else {
                error!("@{}: no task for {}", self.router.address, outbound.dest);
                continue;
            };
            let link = outbound.link;
            let delay = self.link_delay;
            tokio::spawn(async move {
                sleep(delay).await;
                // the receiver may already have shut down
                let _ = peer.send(NodeEvent::Packet { link, wire });
            });
        }
        for request in self.router.timer_requests.drain(..) {
            match request {
                TimerRequest::Schedule { timer, delay } => {
                    let Some(me) = self.peers.get(&self.router.address).cloned() else {
                        continue;
                    };
                    let handle = tokio::spawn(async move {
                        sleep(delay).await;
                        let _ = me.send(NodeEvent::Timer(timer));
                    });
                    if let Some(old) = self.timers.insert(timer, handle) {
                        old.abort();
                    }
                }
                TimerRequest::Cancel { timer } => {
                    if let Some(handle) = self.timers.remove(&timer) {
                        handle.abort();
                    }
                }
            }
        }
    }

    fn on_packet(&mut self, link: u32, wire: &str) {
        let packet = match Packet::<MeshSystem>::from_json(wire) {
            Ok(packet) => packet,
            Err(err) => {
                error!("@{}: dropped malformed packet on link {link}: {err}", self.router.address);
                return;
            }
        };
        let now = self.now();
        if let Err(err) = self.router.handle_packet(&packet, &link, now) {
            error!("@{}: {err}", self.router.address);
        }
    }

    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<NodeEvent>) {
        self.router.start();
        self.flush();
        while let Some(event) = inbox.recv().await {
            match event {
                NodeEvent::Packet { link, wire } => self.on_packet(link, &wire),
                NodeEvent::Timer(timer) => {
                    self.timers.remove(&timer);
                    let now = self.now();
                    self.router.handle_timer(timer, now);
                }
                NodeEvent::Shutdown(reply) => {
                    let table = self.router.shutdown();
                    self.flush();
                    let _ = reply.send(table);
                    return;
                }
            }
            self.flush();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    CombinedLogger::init(vec![TermLogger::new(
        cli.log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )])?;

    let config = NetworkConfig::<MeshSystem>::load(&cli.config)?;
    info!("Starting {} routers from {}", config.nodes.len(), cli.config.display());

    let mut senders = BTreeMap::new();
    let mut inboxes = BTreeMap::new();
    for node in &config.nodes {
        let (tx, rx) = mpsc::unbounded_channel();
        senders.insert(node.address.clone(), tx);
        inboxes.insert(node.address.clone(), rx);
    }
    let peers: Peers = Arc::new(senders);

    let epoch = Instant::now();
    let mut tasks = Vec::new();
    for node in &config.nodes {
        let mut router = Router::with_params(node.address.clone(), config.params.clone());
        router.dies_at = node.dies_at;
        router.message_to = node.message_to.clone();
        for link in &config.links {
            let other = if link.a == node.address {
                &link.b
            } else if link.b == node.address {
                &link.a
            } else {
                continue;
            };
            router
                .add_link(link.id, other.clone())
                .map_err(|err| anyhow!("@{}: {err}", node.address))?;
        }
        let inbox = inboxes
            .remove(&node.address)
            .with_context(|| format!("no inbox for {}", node.address))?;
        let task = Node {
            router,
            timers: BTreeMap::new(),
            peers: peers.clone(),
            link_delay: config.link_delay,
            epoch,
        };
        tasks.push(tokio::spawn(task.run(inbox)));
    }

    sleep(Duration::from_secs(cli.seconds)).await;
    debug!("Shutting down after {:?}", epoch.elapsed());

    for (node, tx) in peers.iter() {
        let (reply, table) = oneshot::channel();
        tx.send(NodeEvent::Shutdown(reply))
            .map_err(|_| anyhow!("router {node} stopped early"))?;
        let table = table.await.with_context(|| format!("router {node} did not reply"))?;
        println!("@{node}: Routing table:\n{table}");
    }
    for task in tasks {
        task.await?;
    }
    Ok(())
}
