//! The maintenance scheduler: three periodic tasks (stabilize, fix-fingers,
//! check-predecessor) that run concurrently with the RPC server from the
//! moment `join` completes until `stop` is called. Expressed here as
//! long-running tasks that sleep between ticks, one per maintenance
//! concern, spawned onto the async runtime -- one of the cooperative forms
//! the spec allows.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::Config;
use crate::node::state::Node;

/// Spawns the three maintenance loops and returns their join handles so the
/// caller (`Node::join`) can abort them later from `Node::stop`.
pub fn spawn(node: Arc<Node>, config: Config) -> Vec<JoinHandle<()>> {
    vec![
        spawn_stabilize(node.clone(), config.stabilize_interval),
        // Fix-fingers is started half a period out of phase with stabilize
        // so the two loops' ticks interleave rather than racing in lockstep.
        spawn_fix_fingers(node.clone(), config.fix_fingers_interval),
        spawn_check_predecessor(node, config.check_predecessor_interval),
    ]
}

fn spawn_stabilize(node: Arc<Node>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            node.stabilize().await;
        }
    })
}

fn spawn_fix_fingers(node: Arc<Node>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(interval / 2).await;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            node.fix_fingers().await;
        }
    })
}

fn spawn_check_predecessor(node: Arc<Node>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            node.check_predecessor().await;
        }
    })
}
