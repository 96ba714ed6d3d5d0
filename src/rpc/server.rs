//! RPC server: dispatches the five inbound Chord operations onto node-state
//! calls. Every inbound request increments the node's message counter; a
//! `find_successor` call additionally increments the lookup counter (done
//! inside `Node::find_successor` itself, since that is also the path a
//! loopback peer-client call takes).

use std::sync::Arc;

use log::warn;
use tonic::{Request, Response, Status};

use crate::chord_proto::chord_server::Chord;
use crate::chord_proto::{
    ClosestPrecedingFingerRequest, ClosestPrecedingFingerResponse, FindSuccessorRequest,
    FindSuccessorResponse, GetInfoRequest, GetInfoResponse, NotifyRequest, NotifyResponse,
    PingRequest, PingResponse,
};
use crate::node::state::Node;
use crate::rpc::convert::{descriptor_from_msg, descriptor_to_msg, identifier_from_bytes};

pub struct ChordService {
    node: Arc<Node>,
}

impl ChordService {
    pub fn new(node: Arc<Node>) -> Self {
        ChordService { node }
    }
}

#[tonic::async_trait]
impl Chord for ChordService {
    async fn find_successor(
        &self,
        request: Request<FindSuccessorRequest>,
    ) -> Result<Response<FindSuccessorResponse>, Status> {
        self.node.record_message();
        let key = match identifier_from_bytes(&request.get_ref().key) {
            Ok(key) => key,
            Err(err) => {
                warn!("find_successor: {}", err);
                return Ok(Response::new(FindSuccessorResponse {
                    node: Some(descriptor_to_msg(&self.node.self_descriptor())),
                    success: false,
                }));
            }
        };
        let (node, success) = self.node.find_successor(&key).await;
        Ok(Response::new(FindSuccessorResponse {
            node: Some(descriptor_to_msg(&node)),
            success,
        }))
    }

    async fn notify(&self, request: Request<NotifyRequest>) -> Result<Response<NotifyResponse>, Status> {
        self.node.record_message();
        let caller = request
            .get_ref()
            .caller
            .as_ref()
            .ok_or_else(|| Status::invalid_argument("notify request missing caller"))?;
        self.node.notify(descriptor_from_msg(caller)).await;
        Ok(Response::new(NotifyResponse { ok: true }))
    }

    async fn get_info(&self, _request: Request<GetInfoRequest>) -> Result<Response<GetInfoResponse>, Status> {
        self.node.record_message();
        let info = self.node.get_info().await;
        Ok(Response::new(GetInfoResponse {
            self_descriptor: Some(descriptor_to_msg(&info.self_descriptor)),
            predecessor: info.predecessor.as_ref().map(descriptor_to_msg),
            successor: info.successor.as_ref().map(descriptor_to_msg),
            fingers: info.fingers.iter().map(descriptor_to_msg).collect(),
        }))
    }

    async fn ping(&self, _request: Request<PingRequest>) -> Result<Response<PingResponse>, Status> {
        self.node.record_message();
        Ok(Response::new(PingResponse {
            alive: self.node.ping().await,
        }))
    }

    async fn closest_preceding_finger(
        &self,
        request: Request<ClosestPrecedingFingerRequest>,
    ) -> Result<Response<ClosestPrecedingFingerResponse>, Status> {
        self.node.record_message();
        let key = match identifier_from_bytes(&request.get_ref().key) {
            Ok(key) => key,
            Err(err) => {
                warn!("closest_preceding_finger: {}", err);
                return Ok(Response::new(ClosestPrecedingFingerResponse {
                    node: Some(descriptor_to_msg(&self.node.self_descriptor())),
                    success: false,
                }));
            }
        };
        let node = self.node.closest_preceding_finger(&key).await;
        Ok(Response::new(ClosestPrecedingFingerResponse {
            node: Some(descriptor_to_msg(&node)),
            success: true,
        }))
    }
}
