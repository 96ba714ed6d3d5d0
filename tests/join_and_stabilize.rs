//! Two-node join followed by manually driven stabilization rounds, mirroring
//! how the Chord paper's own figures are usually walked through in tests:
//! call the maintenance operations directly rather than waiting on the
//! periodic scheduler, so the assertions are deterministic.

use chordrs::{Config, Node};

#[tokio::test]
async fn two_node_ring_converges_after_stabilizing() {
    let n0 = Node::new("127.0.0.1:9710", Config::default());
    n0.start().await.unwrap();
    n0.join(None).await.unwrap();

    let n1 = Node::new("127.0.0.1:9711", Config::default());
    n1.start().await.unwrap();
    n1.join(Some("127.0.0.1:9710".to_string())).await.unwrap();

    // n1 bootstrapped through n0, so its successor is already n0.
    assert_eq!(n1.successor().address, "127.0.0.1:9710");

    // n1 notifying n0 should make n1 its predecessor...
    n1.stabilize().await;
    assert_eq!(n0.predecessor().unwrap().address, "127.0.0.1:9711");

    // ...and n0 stabilizing should then adopt n1 as its successor and
    // notify it back, closing the ring both ways.
    n0.stabilize().await;
    assert_eq!(n0.successor().address, "127.0.0.1:9711");
    assert_eq!(n1.predecessor().unwrap().address, "127.0.0.1:9710");

    let key = chordrs::node::Identifier::from_address("some-key");
    let (n0_answer, n0_success) = n0.find_successor(&key).await;
    let (n1_answer, n1_success) = n1.find_successor(&key).await;
    assert!(n0_success);
    assert!(n1_success);
    assert_eq!(n0_answer.address, n1_answer.address);

    n0.stop().await;
    n1.stop().await;
}

#[tokio::test]
async fn rejoining_an_already_running_node_through_a_second_bootstrap_fails() {
    let n0 = Node::new("127.0.0.1:9712", Config::default());
    n0.start().await.unwrap();
    n0.join(None).await.unwrap();

    let n1 = Node::new("127.0.0.1:9713", Config::default());
    n1.start().await.unwrap();
    n1.join(Some("127.0.0.1:9712".to_string())).await.unwrap();

    assert!(n1.join(Some("127.0.0.1:9712".to_string())).await.is_err());

    n0.stop().await;
    n1.stop().await;
}
