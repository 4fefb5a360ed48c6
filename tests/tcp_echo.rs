//! Scenario 1 from the testable-properties section: a TCP client connects
//! to a server, exchanges one message each way through the accepted
//! session, then disconnects and the server observes exactly one close for
//! that same session.

mod support;

use reactix::{Address, Reactor, TcpClient, TcpServer};

use support::{client_listener, recv_timeout, server_listener, ClientEvent, ServerEvent};

#[test]
fn tcp_echo_round_trip() {
    let reactor = Reactor::global().expect("global reactor");

    let server = TcpServer::new(reactor.clone(), Address::from_host_port("127.0.0.1", 0).unwrap());
    let (listener, server_rx) = server_listener();
    server.set_listener(&listener);
    assert!(server.init());
    assert!(server.start());
    let port = server.local_addr().expect("bound address").port();

    let client = TcpClient::new(reactor.clone(), Address::from_host_port("127.0.0.1", port).unwrap());
    let (client_lst, client_rx) = client_listener();
    client.set_listener(&client_lst);
    assert!(client.init());
    assert!(client.connect());

    let accepted = match recv_timeout(&server_rx) {
        ServerEvent::Accept(session) => session,
        _ => panic!("expected OnAccept first"),
    };

    assert!(client.send(b"hello".to_vec()));

    let echo_session = match recv_timeout(&server_rx) {
        ServerEvent::Receive(session, payload) => {
            assert_eq!(payload, b"hello");
            session
        }
        _ => panic!("expected OnReceive"),
    };
    assert_eq!(echo_session.fd(), accepted.fd());

    assert!(echo_session.send(b"hello".to_vec()));

    match recv_timeout(&client_rx) {
        ClientEvent::Receive(_fd, payload) => assert_eq!(payload, b"hello"),
        _ => panic!("expected client OnReceive"),
    }

    assert!(client.close());

    match recv_timeout(&server_rx) {
        ServerEvent::Close(session) => assert_eq!(session.fd(), accepted.fd()),
        ServerEvent::Error(_, reason) => panic!("expected a clean close, got an error: {reason}"),
        _ => panic!("expected OnClose"),
    }

    assert!(server.stop());
}
