//! Node state and lookup: the successor/predecessor/finger-table triple and
//! the operations that read and mutate it (`find_successor`,
//! `closest_preceding_finger`, `notify`, `stabilize`, `fix_fingers`,
//! `check_predecessor`), plus the lifecycle (`start`/`join`/`stop`) that
//! wires this node up to the RPC server and maintenance scheduler.
//!
//! The successor/predecessor/fingers triple is the only mutable shared
//! state in the whole node and lives behind a single `std::sync::Mutex`.
//! Every method that needs to make a remote call snapshots what it needs,
//! releases the lock, performs the call, then reacquires it to apply the
//! result -- remote calls are never made while the lock is held.

use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use log::{debug, info, warn};
use tonic::transport::Server;

use crate::config::Config;
use crate::error::NodeError;
use crate::metrics::{CountingMetrics, MetricsSink};
use crate::node::descriptor::NodeDescriptor;
use crate::node::finger_table::FingerTable;
use crate::node::identifier::{Identifier, FINGER_COUNT};
use crate::rpc::client::PeerClient;
use crate::rpc::server::ChordService;
use crate::chord_proto::chord_server::ChordServer;

/// The lifecycle states a node moves through. See the component design
/// section of the spec: NEW -> LISTENING -> IN-RING -> TERMINATED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    New,
    Listening,
    InRing,
    Terminated,
}

struct RingState {
    successor: NodeDescriptor,
    predecessor: Option<NodeDescriptor>,
    fingers: FingerTable,
    next_finger: usize,
}

/// The full response shape of `get_info`: self, predecessor-or-none,
/// successor-or-none, and the complete finger table (this implementation's
/// resolution of the spec's open question in favor of richer diagnostics).
#[derive(Debug, Clone)]
pub struct GetInfoResult {
    pub self_descriptor: NodeDescriptor,
    pub predecessor: Option<NodeDescriptor>,
    pub successor: Option<NodeDescriptor>,
    pub fingers: Vec<NodeDescriptor>,
}

pub struct Node {
    self_handle: Weak<Node>,
    self_descriptor: NodeDescriptor,
    state: Mutex<RingState>,
    lifecycle: Mutex<Lifecycle>,
    peer_client: PeerClient,
    config: Config,
    metrics: Arc<dyn MetricsSink>,
    rpc_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    maintenance_handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl Node {
    /// Creates a node in the NEW state, backed by the default in-process
    /// counting metrics sink. `address` is both this node's listening
    /// address and the input to its identifier hash.
    pub fn new(address: impl Into<String>, config: Config) -> Arc<Node> {
        Self::with_metrics(address, config, Arc::new(CountingMetrics::new()))
    }

    /// As [`Node::new`], but with a caller-supplied metrics sink -- an
    /// operator who wants events forwarded to their own aggregation instead
    /// of the default atomic counters can supply one here.
    pub fn with_metrics(address: impl Into<String>, config: Config, metrics: Arc<dyn MetricsSink>) -> Arc<Node> {
        let self_descriptor = NodeDescriptor::new(address);
        let fingers = FingerTable::new(&self_descriptor);
        let ring_state = RingState {
            successor: self_descriptor.clone(),
            predecessor: None,
            fingers,
            next_finger: 0,
        };

        Arc::new_cyclic(|weak: &Weak<Node>| Node {
            self_handle: weak.clone(),
            peer_client: PeerClient::new(
                weak.clone(),
                self_descriptor.address.clone(),
                config.rpc_timeout,
                config.max_connection_retries,
                config.connection_retry_backoff,
            ),
            self_descriptor,
            state: Mutex::new(ring_state),
            lifecycle: Mutex::new(Lifecycle::New),
            config,
            metrics,
            rpc_handle: Mutex::new(None),
            maintenance_handles: Mutex::new(Vec::new()),
        })
    }

    // ---- accessors -------------------------------------------------

    pub fn self_descriptor(&self) -> NodeDescriptor {
        self.self_descriptor.clone()
    }

    pub fn successor(&self) -> NodeDescriptor {
        self.state.lock().unwrap().successor.clone()
    }

    pub fn predecessor(&self) -> Option<NodeDescriptor> {
        self.state.lock().unwrap().predecessor.clone()
    }

    pub fn fingers(&self) -> Vec<NodeDescriptor> {
        self.state.lock().unwrap().fingers.iter().cloned().collect()
    }

    pub fn message_count(&self) -> u64 {
        self.metrics.message_count()
    }

    pub fn lookup_count(&self) -> u64 {
        self.metrics.lookup_count()
    }

    pub fn metrics(&self) -> Arc<dyn MetricsSink> {
        self.metrics.clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock().unwrap(), Lifecycle::InRing)
    }

    /// Whether the RPC listener is currently accepting connections -- true
    /// from `start()` through to `stop()`, which is a wider window than
    /// `is_running` (ring membership): a node that has called `start` but
    /// not yet `join` is listening but not yet part of any ring.
    fn is_listening(&self) -> bool {
        self.rpc_handle.lock().unwrap().is_some()
    }

    pub(crate) fn record_message(&self) {
        self.metrics.on_message();
    }

    // ---- lookup (safe to call concurrently) -------------------------

    /// The central routing primitive. Returns the node believed responsible
    /// for `key`, plus a flag that is `false` when the lookup could not
    /// reach a better-informed peer and degraded to the local successor.
    pub async fn find_successor(&self, key: &Identifier) -> (NodeDescriptor, bool) {
        let start = Instant::now();
        let result = self.find_successor_inner(key).await;
        self.metrics.on_lookup(start.elapsed());
        result
    }

    async fn find_successor_inner(&self, key: &Identifier) -> (NodeDescriptor, bool) {
        let successor = self.successor();

        if key.is_in_open_closed(&self.self_descriptor.id, &successor.id) {
            return (successor, true);
        }

        let next = self.closest_preceding_finger(key).await;
        if next.address == self.self_descriptor.address {
            // No finger known that would get us closer than we already are.
            return (self.self_descriptor.clone(), true);
        }

        match self.peer_client.find_successor(&next.address, key, &self.self_descriptor).await {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    "find_successor: forwarding to {} failed ({}), falling back to local successor",
                    next.address, err
                );
                (successor, false)
            }
        }
    }

    /// Walks the finger table from the highest index down and returns the
    /// first entry strictly between self and `key`; self if none qualifies.
    pub async fn closest_preceding_finger(&self, key: &Identifier) -> NodeDescriptor {
        let state = self.state.lock().unwrap();
        state
            .fingers
            .closest_preceding(&self.self_descriptor.id, key)
            .cloned()
            .unwrap_or_else(|| self.self_descriptor.clone())
    }

    pub async fn get_info(&self) -> GetInfoResult {
        let state = self.state.lock().unwrap();
        GetInfoResult {
            self_descriptor: self.self_descriptor.clone(),
            predecessor: state.predecessor.clone(),
            successor: Some(state.successor.clone()),
            fingers: state.fingers.iter().cloned().collect(),
        }
    }

    pub async fn ping(&self) -> bool {
        self.is_listening()
    }

    /// Called when `caller` believes it might be this node's predecessor.
    pub async fn notify(&self, caller: NodeDescriptor) {
        let mut state = self.state.lock().unwrap();
        let should_accept = match &state.predecessor {
            None => true,
            Some(predecessor) => caller.id.is_in_open(&predecessor.id, &self.self_descriptor.id),
        };
        if should_accept {
            debug!("{}: accepting {} as predecessor", self.self_descriptor, caller);
            state.predecessor = Some(caller);
        }
    }

    // ---- maintenance (periodic) --------------------------------------

    /// Reconciles the successor pointer: adopts the successor's predecessor
    /// if it lies strictly between us and our current successor, then
    /// unconditionally notifies the successor of our own presence.
    pub async fn stabilize(&self) {
        let successor = self.successor();

        let info = match self.peer_client.get_info(&successor.address).await {
            Ok(info) => info,
            Err(err) => {
                warn!("stabilize: successor {} unreachable ({}), skipping this tick", successor.address, err);
                return;
            }
        };

        if let Some(candidate) = info.predecessor {
            if candidate.id.is_in_open(&self.self_descriptor.id, &successor.id) {
                info!("{}: adopting {} as new successor", self.self_descriptor, candidate);
                let mut state = self.state.lock().unwrap();
                // Re-check against the current value: another task may have
                // already moved the successor on since we snapshotted it.
                if state.successor.address == successor.address {
                    state.fingers.set_successor(candidate.clone());
                    state.successor = candidate;
                }
            }
        }

        let successor = self.successor();
        if let Err(err) = self.peer_client.notify(&successor.address, &self.self_descriptor).await {
            warn!("stabilize: notifying successor {} failed ({})", successor.address, err);
        }
    }

    /// Refreshes one finger entry per call, round-robin.
    pub async fn fix_fingers(&self) {
        let (index, start) = {
            let mut state = self.state.lock().unwrap();
            state.next_finger = (state.next_finger + 1) % FINGER_COUNT;
            let index = state.next_finger;
            (index, state.fingers.start(index).clone())
        };

        let (responsible, success) = self.find_successor(&start).await;
        if !success {
            debug!("fix_fingers: finger {} lookup degraded, leaving entry unchanged", index);
            return;
        }

        let mut state = self.state.lock().unwrap();
        state.fingers.set(index, responsible.clone());
        if index == 0 {
            state.successor = responsible;
        }
    }

    /// Pings the predecessor; clears it if unreachable so a future `notify`
    /// from a live candidate can repopulate it.
    pub async fn check_predecessor(&self) {
        let predecessor = { self.state.lock().unwrap().predecessor.clone() };
        let Some(predecessor) = predecessor else {
            return;
        };

        match self.peer_client.ping(&predecessor.address, &self.self_descriptor).await {
            Ok(true) => {}
            _ => {
                warn!("{}: predecessor {} did not respond, clearing", self.self_descriptor, predecessor);
                self.state.lock().unwrap().predecessor = None;
            }
        }
    }

    // ---- lifecycle -----------------------------------------------------

    /// Opens the listening endpoint and starts serving the five RPCs.
    /// NEW -> LISTENING.
    pub async fn start(&self) -> Result<(), NodeError> {
        {
            let mut lifecycle = self.lifecycle.lock().unwrap();
            if *lifecycle != Lifecycle::New {
                return Err(NodeError::Fatal("start() called outside the NEW state".to_string()));
            }
            *lifecycle = Lifecycle::Listening;
        }

        let addr = self
            .self_descriptor
            .address
            .parse()
            .map_err(|e| NodeError::Fatal(format!("invalid listen address: {}", e)))?;

        let this = self
            .self_handle
            .upgrade()
            .expect("node outlives its own Arc handle");
        let service = ChordServer::new(ChordService::new(this));
        let reflection = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(crate::chord_proto::FILE_DESCRIPTOR_SET)
            .build()
            .map_err(|e| NodeError::Fatal(format!("failed to build reflection service: {}", e)))?;
        let serve = Server::builder()
            .add_service(service)
            .add_service(reflection)
            .serve(addr);

        let handle = tokio::spawn(async move {
            if let Err(err) = serve.await {
                log::error!("gRPC server exited: {}", err);
            }
        });
        *self.rpc_handle.lock().unwrap() = Some(handle);

        info!("{}: listening", self.self_descriptor);
        Ok(())
    }

    /// Joins the ring via `bootstrap`, or forms a new single-node ring if
    /// `bootstrap` is `None`. LISTENING -> IN-RING. Starts the maintenance
    /// scheduler on success.
    pub async fn join(&self, bootstrap: Option<String>) -> Result<(), NodeError> {
        {
            let lifecycle = self.lifecycle.lock().unwrap();
            if *lifecycle != Lifecycle::Listening {
                return Err(NodeError::Fatal("join() is only valid from the LISTENING state".to_string()));
            }
        }

        match bootstrap {
            None => {
                info!("{}: starting a new ring", self.self_descriptor);
                let mut state = self.state.lock().unwrap();
                state.successor = self.self_descriptor.clone();
                state.predecessor = None;
                state.fingers.set_all(&self.self_descriptor);
            }
            Some(bootstrap_address) => {
                info!("{}: joining ring via {}", self.self_descriptor, bootstrap_address);
                let (successor, success) = self
                    .peer_client
                    .find_successor(&bootstrap_address, &self.self_descriptor.id, &self.self_descriptor)
                    .await
                    .map_err(|e| {
                        NodeError::Fatal(format!("bootstrap {} unreachable: {}", bootstrap_address, e))
                    })?;

                if !success {
                    return Err(NodeError::Fatal(format!(
                        "bootstrap {} could not resolve our successor",
                        bootstrap_address
                    )));
                }
                if successor.id == self.self_descriptor.id {
                    return Err(NodeError::Fatal(format!(
                        "bootstrap {} returned a node with a colliding identifier",
                        bootstrap_address
                    )));
                }

                let mut state = self.state.lock().unwrap();
                state.fingers.set_successor(successor.clone());
                state.successor = successor;
            }
        }

        *self.lifecycle.lock().unwrap() = Lifecycle::InRing;

        let this = self
            .self_handle
            .upgrade()
            .expect("node outlives its own Arc handle");
        let handles = crate::threads::maintenance::spawn(this, self.config.clone());
        *self.maintenance_handles.lock().unwrap() = handles;

        Ok(())
    }

    /// Tears down the listener and halts the maintenance tasks.
    /// IN-RING -> TERMINATED (idempotent once terminated).
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap();
        if *lifecycle == Lifecycle::Terminated {
            return;
        }
        *lifecycle = Lifecycle::Terminated;
        drop(lifecycle);

        for handle in self.maintenance_handles.lock().unwrap().drain(..) {
            handle.abort();
        }
        if let Some(handle) = self.rpc_handle.lock().unwrap().take() {
            handle.abort();
        }

        info!("{}: stopped", self.self_descriptor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn single_node_ring_is_its_own_successor() {
        let node = Node::new("127.0.0.1:9700", Config::default());
        node.start().await.unwrap();
        node.join(None).await.unwrap();

        assert_eq!(node.successor(), node.self_descriptor());
        assert!(node.predecessor().is_none());

        let key = Identifier::from_address("anything");
        let (responsible, success) = node.find_successor(&key).await;
        assert!(success);
        assert_eq!(responsible, node.self_descriptor());

        node.stop().await;
    }

    #[tokio::test]
    async fn notify_is_accepted_once_on_a_single_node_ring() {
        let node = Node::new("127.0.0.1:9701", Config::default());
        node.start().await.unwrap();
        node.join(None).await.unwrap();

        node.notify(node.self_descriptor()).await;
        assert_eq!(node.predecessor(), Some(node.self_descriptor()));

        node.stop().await;
    }

    #[tokio::test]
    async fn join_twice_is_rejected() {
        let node = Node::new("127.0.0.1:9702", Config::default());
        node.start().await.unwrap();
        node.join(None).await.unwrap();
        assert!(node.join(None).await.is_err());
        node.stop().await;
    }

    #[tokio::test]
    async fn ping_is_true_once_listening_even_before_joining_a_ring() {
        let node = Node::new("127.0.0.1:9703", Config::default());
        assert!(!node.ping().await);

        node.start().await.unwrap();
        assert!(node.ping().await);
        assert!(!node.is_running());

        node.join(None).await.unwrap();
        assert!(node.ping().await);
        assert!(node.is_running());

        node.stop().await;
        assert!(!node.ping().await);
    }

    #[tokio::test]
    async fn a_custom_metrics_sink_receives_the_node_s_events() {
        use crate::metrics::CountingMetrics;

        let sink = Arc::new(CountingMetrics::new());
        let node = Node::with_metrics("127.0.0.1:9704", Config::default(), sink.clone());
        node.start().await.unwrap();
        node.join(None).await.unwrap();

        let key = Identifier::from_address("anything");
        node.find_successor(&key).await;

        assert_eq!(sink.lookup_count(), 1);
        assert_eq!(node.lookup_count(), 1);

        node.stop().await;
    }
}
