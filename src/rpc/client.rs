//! Peer client: remote invocation of the five Chord RPCs on another node.
//!
//! Connections are cached per peer address; any cached connection that
//! yields an error is dropped so the next call reconnects from scratch. A
//! call whose target address equals this node's own listening address is
//! short-circuited into a direct, in-process call on the node state rather
//! than round-tripping through the transport -- this avoids a deadlock
//! against a single-threaded RPC server and is cheaper besides.

use std::collections::HashMap;
use std::sync::Weak;
use std::time::Duration;

use tokio::sync::Mutex;
use tonic::transport::Channel;
use tonic::Request;

use crate::chord_proto::chord_client::ChordClient;
use crate::chord_proto::{
    ClosestPrecedingFingerRequest, FindSuccessorRequest, GetInfoRequest, NotifyRequest,
    PingRequest,
};
use crate::error::PeerError;
use crate::node::descriptor::NodeDescriptor;
use crate::node::identifier::Identifier;
use crate::node::state::{GetInfoResult, Node};
use crate::rpc::convert::{descriptor_from_msg, descriptor_to_msg, identifier_to_bytes};

pub struct PeerClient {
    /// Handle back to the node this client belongs to, used only to detect
    /// and short-circuit loopback calls. Weak so the client does not keep
    /// the node alive on its own -- the node owns the client, not vice versa.
    loopback: Weak<Node>,
    loopback_address: String,
    channels: Mutex<HashMap<String, Channel>>,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl PeerClient {
    pub fn new(
        loopback: Weak<Node>,
        loopback_address: String,
        timeout: Duration,
        max_retries: u32,
        retry_backoff: Duration,
    ) -> Self {
        PeerClient {
            loopback,
            loopback_address,
            channels: Mutex::new(HashMap::new()),
            timeout,
            max_retries,
            retry_backoff,
        }
    }

    fn is_loopback(&self, address: &str) -> bool {
        address == self.loopback_address
    }

    fn local_node(&self) -> &Weak<Node> {
        &self.loopback
    }

    async fn connect(&self, address: &str) -> Result<ChordClient<Channel>, PeerError> {
        {
            let cache = self.channels.lock().await;
            if let Some(channel) = cache.get(address) {
                return Ok(ChordClient::new(channel.clone()));
            }
        }

        let endpoint = Channel::from_shared(format!("http://{}", address)).map_err(|e| {
            PeerError::Unreachable {
                address: address.to_string(),
                source: e.to_string(),
            }
        })?;
        let endpoint = endpoint.connect_timeout(self.timeout);

        let mut attempt = 0;
        loop {
            match endpoint.connect().await {
                Ok(channel) => {
                    self.channels
                        .lock()
                        .await
                        .insert(address.to_string(), channel.clone());
                    return Ok(ChordClient::new(channel));
                }
                Err(err) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(PeerError::Unreachable {
                            address: address.to_string(),
                            source: err.to_string(),
                        });
                    }
                    tokio::time::sleep(self.retry_backoff).await;
                }
            }
        }
    }

    async fn invalidate(&self, address: &str) {
        self.channels.lock().await.remove(address);
    }

    async fn call_with_timeout<T, F>(&self, address: &str, fut: F) -> Result<T, PeerError>
    where
        F: std::future::Future<Output = Result<T, tonic::Status>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(status)) => {
                self.invalidate(address).await;
                Err(PeerError::RemoteError {
                    address: address.to_string(),
                    message: status.message().to_string(),
                })
            }
            Err(_) => {
                self.invalidate(address).await;
                Err(PeerError::Timeout {
                    address: address.to_string(),
                    elapsed_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    pub async fn find_successor(
        &self,
        address: &str,
        key: &Identifier,
        requester: &NodeDescriptor,
    ) -> Result<(NodeDescriptor, bool), PeerError> {
        if self.is_loopback(address) {
            let node = self.local_node().upgrade().expect("node dropped while peer client alive");
            return Ok(node.find_successor(key).await);
        }

        let mut client = self.connect(address).await?;
        let request = Request::new(FindSuccessorRequest {
            key: identifier_to_bytes(key),
            requester: Some(descriptor_to_msg(requester)),
        });
        let response = self
            .call_with_timeout(address, async { Ok(client.find_successor(request).await?.into_inner()) })
            .await?;
        let node = response
            .node
            .map(|msg| descriptor_from_msg(&msg))
            .ok_or_else(|| PeerError::RemoteError {
                address: address.to_string(),
                message: "find_successor response missing node".to_string(),
            })?;
        Ok((node, response.success))
    }

    pub async fn notify(&self, address: &str, caller: &NodeDescriptor) -> Result<(), PeerError> {
        if self.is_loopback(address) {
            let node = self.local_node().upgrade().expect("node dropped while peer client alive");
            node.notify(caller.clone()).await;
            return Ok(());
        }

        let mut client = self.connect(address).await?;
        let request = Request::new(NotifyRequest {
            caller: Some(descriptor_to_msg(caller)),
        });
        self.call_with_timeout(address, async { Ok(client.notify(request).await?.into_inner()) })
            .await?;
        Ok(())
    }

    pub async fn get_info(&self, address: &str) -> Result<GetInfoResult, PeerError> {
        if self.is_loopback(address) {
            let node = self.local_node().upgrade().expect("node dropped while peer client alive");
            return Ok(node.get_info().await);
        }

        let mut client = self.connect(address).await?;
        let request = Request::new(GetInfoRequest {});
        let response = self
            .call_with_timeout(address, async { Ok(client.get_info(request).await?.into_inner()) })
            .await?;
        let self_descriptor = response
            .self_descriptor
            .map(|msg| descriptor_from_msg(&msg))
            .ok_or_else(|| PeerError::RemoteError {
                address: address.to_string(),
                message: "get_info response missing self descriptor".to_string(),
            })?;
        Ok(GetInfoResult {
            self_descriptor,
            predecessor: response.predecessor.map(|msg| descriptor_from_msg(&msg)),
            successor: response.successor.map(|msg| descriptor_from_msg(&msg)),
            fingers: response.fingers.iter().map(descriptor_from_msg).collect(),
        })
    }

    pub async fn ping(&self, address: &str, requester: &NodeDescriptor) -> Result<bool, PeerError> {
        if self.is_loopback(address) {
            let node = self.local_node().upgrade().expect("node dropped while peer client alive");
            return Ok(node.ping().await);
        }

        let mut client = self.connect(address).await?;
        let request = Request::new(PingRequest {
            requester: Some(descriptor_to_msg(requester)),
        });
        let response = self
            .call_with_timeout(address, async { Ok(client.ping(request).await?.into_inner()) })
            .await?;
        Ok(response.alive)
    }

    pub async fn closest_preceding_finger(
        &self,
        address: &str,
        key: &Identifier,
    ) -> Result<(NodeDescriptor, bool), PeerError> {
        if self.is_loopback(address) {
            let node = self.local_node().upgrade().expect("node dropped while peer client alive");
            return Ok((node.closest_preceding_finger(key).await, true));
        }

        let mut client = self.connect(address).await?;
        let request = Request::new(ClosestPrecedingFingerRequest {
            key: identifier_to_bytes(key),
        });
        let response = self
            .call_with_timeout(address, async {
                Ok(client.closest_preceding_finger(request).await?.into_inner())
            })
            .await?;
        let node = response
            .node
            .map(|msg| descriptor_from_msg(&msg))
            .ok_or_else(|| PeerError::RemoteError {
                address: address.to_string(),
                message: "closest_preceding_finger response missing node".to_string(),
            })?;
        Ok((node, response.success))
    }
}
