use std::net::SocketAddr;
use std::time::Duration;

use swarmgate::network::client::DiscoveryClient;
use swarmgate::network::message::Message;
use swarmgate::network::peer_table::PeerEntry;
use swarmgate::network::relay_table::Relay;
use swarmgate::prelude::Config;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;

const SESSION_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

struct Harness {
    client: DiscoveryClient,
    router: UdpSocket,
    client_addr: SocketAddr,
    relay_rx: mpsc::Receiver<Relay>,
}

async fn harness() -> Harness {
    let router = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let router_addr = router.local_addr().unwrap().to_string();

    let config = Config {
        routers: Some(router_addr),
        network_id: "net-A".to_string(),
        port: 4242,
        ..Config::default()
    };
    let (peer_tx, _peer_rx) = mpsc::channel::<Vec<PeerEntry>>(16);
    let (relay_tx, relay_rx) = mpsc::channel(16);
    let (remove_tx, _remove_rx) = mpsc::channel::<String>(16);

    let start = tokio::spawn(async move {
        DiscoveryClient::start(config, peer_tx, relay_tx, remove_tx)
            .await
            .unwrap()
    });

    let mut buf = [0u8; 512];
    let (len, client_addr) = timeout(Duration::from_secs(10), router.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(Message::decode(&buf[..len]).unwrap().command, "conn");
    let accept = Message {
        command: "conn".to_string(),
        id: SESSION_ID.to_string(),
        ..Message::default()
    };
    router
        .send_to(&accept.encode().unwrap(), client_addr)
        .await
        .unwrap();

    let client = start.await.unwrap();
    Harness {
        client,
        router,
        client_addr,
        relay_rx,
    }
}

impl Harness {
    async fn send(&self, msg: &Message) {
        self.router
            .send_to(&msg.encode().unwrap(), self.client_addr)
            .await
            .unwrap();
    }

    async fn recv(&self) -> Message {
        let mut buf = [0u8; 512];
        let (len, _) = timeout(Duration::from_secs(5), self.router.recv_from(&mut buf))
            .await
            .expect("router timed out waiting for the client")
            .unwrap();
        Message::decode(&buf[..len]).unwrap()
    }

    fn offer(&self, endpoint: &str, destination: &str) -> Message {
        Message {
            command: "cp".to_string(),
            query: endpoint.to_string(),
            arguments: destination.to_string(),
            ..Message::default()
        }
    }
}

#[tokio::test]
async fn relay_offers_are_emitted_and_cached_once() {
    let mut h = harness().await;

    h.send(&h.offer("9.9.9.9:7000", "B")).await;
    let relay = timeout(Duration::from_secs(5), h.relay_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(relay.addr, "9.9.9.9:7000".parse::<SocketAddr>().unwrap());
    assert_eq!(relay.destination, "B");

    // Duplicate offers still reach the engine but are cached only once.
    h.send(&h.offer("9.9.9.9:7000", "B")).await;
    timeout(Duration::from_secs(5), h.relay_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(h.client.relays().await.len(), 1);
}

#[tokio::test]
async fn placeholder_offers_are_ignored() {
    let mut h = harness().await;

    h.send(&h.offer("0", "B")).await;
    h.send(&h.offer("", "B")).await;
    h.send(&h.offer("not-an-endpoint", "B")).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(h.relay_rx.try_recv().is_err());
    assert!(h.client.relays().await.is_empty());
}

#[tokio::test]
async fn blacklisted_relays_stay_out_of_the_cache() {
    let mut h = harness().await;
    let addr: SocketAddr = "9.9.9.9:7000".parse().unwrap();

    h.send(&h.offer("9.9.9.9:7000", "B")).await;
    timeout(Duration::from_secs(5), h.relay_rx.recv())
        .await
        .unwrap()
        .unwrap();

    h.client.blacklist_relay(addr).await;
    assert!(h.client.relays().await.is_empty());
    assert_eq!(h.client.blacklisted_relays().await, vec![addr]);

    // The router may repeat the offer; the engine hears about it, the cache
    // refuses it until the blacklist is cleared.
    h.send(&h.offer("9.9.9.9:7000", "B")).await;
    timeout(Duration::from_secs(5), h.relay_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(h.client.relays().await.is_empty());

    h.client.clear_relay_blacklist().await;
    h.send(&h.offer("9.9.9.9:7000", "B")).await;
    timeout(Duration::from_secs(5), h.relay_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(h.client.relays().await.len(), 1);
}

#[tokio::test]
async fn notify_requests_a_relay_for_the_unreachable_peer() {
    let h = harness().await;

    h.send(&Message {
        command: "notify".to_string(),
        id: "peer-needing-relay".to_string(),
        ..Message::default()
    })
    .await;

    let request = h.recv().await;
    assert_eq!(request.command, "cp");
    assert_eq!(request.arguments, "peer-needing-relay");
    assert_eq!(request.id, SESSION_ID);
    assert!(request.query.is_empty());
}

#[tokio::test]
async fn relay_requests_carry_the_omit_list() {
    let h = harness().await;

    let omit: Vec<SocketAddr> = vec![
        "1.1.1.1:7000".parse().unwrap(),
        "2.2.2.2:7000".parse().unwrap(),
    ];
    h.client.request_control_peer("B", &omit).await;

    let request = h.recv().await;
    assert_eq!(request.command, "cp");
    assert_eq!(request.arguments, "B");
    assert_eq!(request.query, "1.1.1.1:7000|2.2.2.2:7000|");
}
