//! Scenario 3: back-to-back sends on one connection preserve both chunk and
//! byte order all the way to the peer, regardless of how the send queue
//! happens to interleave partial writes with fresh enqueues.

mod support;

use reactix::{Address, Reactor, TcpClient, TcpServer};

use support::{client_listener, recv_timeout, server_listener, ServerEvent};

#[test]
fn back_to_back_sends_preserve_order() {
    let reactor = Reactor::global().expect("global reactor");

    let server = TcpServer::new(reactor.clone(), Address::from_host_port("127.0.0.1", 0).unwrap());
    let (listener, server_rx) = server_listener();
    server.set_listener(&listener);
    assert!(server.init());
    assert!(server.start());
    let port = server.local_addr().unwrap().port();

    let client = TcpClient::new(reactor.clone(), Address::from_host_port("127.0.0.1", port).unwrap());
    let (client_lst, _client_rx) = client_listener();
    client.set_listener(&client_lst);
    assert!(client.init());
    assert!(client.connect());

    match recv_timeout(&server_rx) {
        ServerEvent::Accept(_) => {}
        _ => panic!("expected OnAccept"),
    }

    let chunk_a = vec![b'A'; 100_000];
    let chunk_b = vec![b'B'; 100_000];
    let chunk_c = vec![b'C'; 100_000];
    assert!(client.send(chunk_a.clone()));
    assert!(client.send(chunk_b.clone()));
    assert!(client.send(chunk_c.clone()));

    let mut expected = Vec::with_capacity(300_000);
    expected.extend_from_slice(&chunk_a);
    expected.extend_from_slice(&chunk_b);
    expected.extend_from_slice(&chunk_c);

    let mut received = Vec::with_capacity(300_000);
    while received.len() < expected.len() {
        match recv_timeout(&server_rx) {
            ServerEvent::Receive(_session, payload) => received.extend_from_slice(&payload),
            ServerEvent::Error(_, reason) => panic!("unexpected error while collecting: {reason}"),
            _ => panic!("unexpected event while collecting"),
        }
    }

    assert_eq!(received, expected);

    assert!(client.close());
    assert!(server.stop());
}
