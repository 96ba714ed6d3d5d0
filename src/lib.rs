//! Chord distributed hash table node: overlay-ring membership, finger-table
//! lookup, and the self-healing maintenance loops that keep a ring correct
//! under churn. See `SPEC_FULL.md` for the full design; in short, this
//! crate implements the ring-arithmetic, peer-client, RPC-server,
//! node-state-and-lookup and maintenance-scheduler components, plus the
//! configuration, logging and error-handling layers a runnable node needs
//! around them. It does not implement key/value storage, replication, or
//! peer authentication -- those are explicitly out of scope.

pub mod config;
pub mod error;
pub mod metrics;
pub mod node;
pub mod rpc;
pub mod threads;

pub mod chord_proto {
    tonic::include_proto!("chord");

    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("chord_descriptor");
}

pub use config::Config;
pub use node::{GetInfoResult, Node, NodeDescriptor};
