use swarmgate::network::peer_table::PeerTable;

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn reconcile_matches_the_router_list() {
    let table = PeerTable::new();
    table.reconcile(&ids(&["A", "B"])).await;

    let snapshot = table.reconcile(&ids(&["B", "C", "D"])).await;
    let seen: Vec<&str> = snapshot.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(seen, vec!["B", "C", "D"]);
    assert_eq!(table.len().await, 3);
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let table = PeerTable::new();
    let first = table.reconcile(&ids(&["A", "B", "C"])).await;
    let second = table.reconcile(&ids(&["A", "B", "C"])).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn clear_drops_every_entry() {
    let table = PeerTable::new();
    table.reconcile(&ids(&["A", "B"])).await;
    table.clear().await;
    assert!(table.is_empty().await);
}

#[tokio::test]
async fn endpoints_replace_wholesale_and_unknown_ids_are_dropped() {
    let table = PeerTable::new();
    table.reconcile(&ids(&["B"])).await;

    let eps = vec![
        "1.2.3.4:5000".parse().unwrap(),
        "5.6.7.8:5000".parse().unwrap(),
    ];
    assert!(table.set_endpoints("B", eps.clone()).await);
    let snapshot = table.snapshot().await;
    assert_eq!(snapshot[0].endpoints, eps);

    let shorter = vec!["9.9.9.9:5000".parse().unwrap()];
    assert!(table.set_endpoints("B", shorter.clone()).await);
    assert_eq!(table.snapshot().await[0].endpoints, shorter);

    assert!(!table.set_endpoints("Z", Vec::new()).await);
}

#[tokio::test]
async fn last_catch_accumulates_in_first_seen_order() {
    let table = PeerTable::new();
    table.reconcile(&ids(&["A", "B"])).await;
    table.reconcile(&ids(&["B", "C"])).await;
    // A left the network but stays in the running log.
    assert_eq!(table.last_catch().await, ids(&["A", "B", "C"]));

    table.reconcile(&ids(&["C", "A"])).await;
    assert_eq!(table.last_catch().await, ids(&["A", "B", "C"]));
}
