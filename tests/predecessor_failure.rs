//! Ring self-healing: a node's predecessor disappears, `check_predecessor`
//! notices and clears it, and a later `notify` from a live node repopulates
//! it -- the churn-recovery path the periodic maintenance loops exist for.

use chordrs::{Config, Node};

#[tokio::test]
async fn check_predecessor_clears_a_dead_predecessor() {
    let n0 = Node::new("127.0.0.1:9720", Config::default());
    n0.start().await.unwrap();
    n0.join(None).await.unwrap();

    let n1 = Node::new("127.0.0.1:9721", Config::default());
    n1.start().await.unwrap();
    n1.join(Some("127.0.0.1:9720".to_string())).await.unwrap();

    n1.stabilize().await;
    n0.stabilize().await;
    assert_eq!(n0.predecessor().unwrap().address, "127.0.0.1:9721");

    // n1 goes away without telling anyone.
    n1.stop().await;

    n0.check_predecessor().await;
    assert!(n0.predecessor().is_none());

    n0.stop().await;
}

#[tokio::test]
async fn a_fresh_notify_repopulates_a_cleared_predecessor() {
    let n0 = Node::new("127.0.0.1:9722", Config::default());
    n0.start().await.unwrap();
    n0.join(None).await.unwrap();

    let stale = Node::new("127.0.0.1:9723", Config::default());
    stale.start().await.unwrap();
    stale.join(Some("127.0.0.1:9722".to_string())).await.unwrap();
    stale.stabilize().await;
    n0.stabilize().await;
    assert_eq!(n0.predecessor().unwrap().address, "127.0.0.1:9723");

    stale.stop().await;
    n0.check_predecessor().await;
    assert!(n0.predecessor().is_none());

    let fresh = Node::new("127.0.0.1:9724", Config::default());
    fresh.start().await.unwrap();
    fresh.join(Some("127.0.0.1:9722".to_string())).await.unwrap();
    fresh.stabilize().await;

    assert_eq!(n0.predecessor().unwrap().address, "127.0.0.1:9724");

    n0.stop().await;
    fresh.stop().await;
}
