//! Diagnostic tool: connects to a list of already-running nodes, pulls each
//! one's full `get_info`, and cross-checks the ring invariants that are
//! supposed to hold once stabilization has converged -- every node's
//! predecessor is its immediate neighbor in id order, and every finger
//! points at whichever node is actually responsible for that finger's start.
//! Not part of the ring's own operation; a standalone client for eyeballing
//! a cluster after a test run.

use std::env;

use tonic::transport::Channel;
use tonic::Request;

use chordrs::chord_proto::chord_client::ChordClient;
use chordrs::chord_proto::GetInfoRequest;
use chordrs::node::identifier::Identifier;

struct NodeView {
    address: String,
    id: Identifier,
    predecessor: Option<String>,
    fingers: Vec<(Identifier, String)>,
}

#[tokio::main]
async fn main() {
    let addresses: Vec<String> = env::args().skip(1).collect();
    if addresses.is_empty() {
        eprintln!("usage: validate_cluster <address> [address...]");
        std::process::exit(1);
    }

    let mut views = Vec::with_capacity(addresses.len());
    for address in &addresses {
        let mut client = ChordClient::connect(format!("http://{}", address))
            .await
            .unwrap_or_else(|e| panic!("could not connect to {}: {}", address, e));
        let info = client
            .get_info(Request::new(GetInfoRequest {}))
            .await
            .unwrap_or_else(|e| panic!("get_info against {} failed: {}", address, e))
            .into_inner();

        let self_descriptor = info.self_descriptor.expect("get_info missing self descriptor");
        views.push(NodeView {
            address: self_descriptor.address,
            id: Identifier::from_bytes_be(&self_descriptor.id),
            predecessor: info.predecessor.map(|msg| msg.address),
            fingers: info
                .fingers
                .into_iter()
                .map(|msg| (Identifier::from_bytes_be(&msg.id), msg.address))
                .collect(),
        });
    }

    views.sort_by(|a, b| a.id.cmp(&b.id));
    let ring_ids: Vec<Identifier> = views.iter().map(|v| v.id.clone()).collect();

    let mut ok = true;

    for (i, view) in views.iter().enumerate() {
        let expected_predecessor = &views[(i + views.len() - 1) % views.len()].address;
        match &view.predecessor {
            Some(actual) if actual == expected_predecessor => {}
            Some(actual) => {
                ok = false;
                eprintln!(
                    "node {} ({}): predecessor is {}, expected {}",
                    view.id, view.address, actual, expected_predecessor
                );
            }
            None => {
                ok = false;
                eprintln!("node {} ({}): has no predecessor", view.id, view.address);
            }
        }
    }

    for view in &views {
        for (index, (finger_id, finger_address)) in view.fingers.iter().enumerate() {
            let responsible = responsible_for(finger_id, &ring_ids, &views);
            if &responsible.address != finger_address {
                ok = false;
                eprintln!(
                    "node {} ({}): finger[{}] points at {} but {} ({}) is responsible",
                    view.id, view.address, index, finger_address, responsible.id, responsible.address
                );
            }
        }
    }

    if ok {
        println!("cluster of {} nodes is consistent", views.len());
    } else {
        eprintln!("cluster is inconsistent");
        std::process::exit(1);
    }
}

/// The node whose id is the smallest id greater than or equal to `key`,
/// wrapping to the smallest id in the ring if none qualifies -- exactly the
/// successor relationship `find_successor` is supposed to converge to.
fn responsible_for<'a>(key: &Identifier, ring_ids: &[Identifier], views: &'a [NodeView]) -> &'a NodeView {
    ring_ids
        .iter()
        .position(|id| id >= key)
        .map(|i| &views[i])
        .unwrap_or(&views[0])
}
