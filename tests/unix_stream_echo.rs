//! Unix-domain stream server/client, structurally the same scenario as
//! `tcp_echo.rs` but over a filesystem-path peer instead of a network one.

#![cfg(unix)]

mod support;

use reactix::{Address, Reactor, UnixClient, UnixServer};

use support::{client_listener, recv_timeout, server_listener, ClientEvent, ServerEvent};

#[test]
fn unix_stream_echo_round_trip() {
    let reactor = Reactor::global().expect("global reactor");

    let path = std::env::temp_dir().join(format!("reactix-test-{}-{}.sock", std::process::id(), line!()));
    let _ = std::fs::remove_file(&path);
    let addr = Address::local(&path).expect("path within the platform cap");

    let server = UnixServer::new(reactor.clone(), addr.clone());
    let (listener, server_rx) = server_listener();
    server.set_listener(&listener);
    assert!(server.init());
    assert!(server.start());

    let client = UnixClient::new(reactor, addr);
    let (client_lst, client_rx) = client_listener();
    client.set_listener(&client_lst);
    assert!(client.init());
    assert!(client.connect());

    let accepted = match recv_timeout(&server_rx) {
        ServerEvent::Accept(session) => session,
        _ => panic!("expected OnAccept"),
    };

    assert!(client.send(b"hi there".to_vec()));

    let echo_session = match recv_timeout(&server_rx) {
        ServerEvent::Receive(session, payload) => {
            assert_eq!(payload, b"hi there");
            session
        }
        _ => panic!("expected OnReceive"),
    };
    assert_eq!(echo_session.fd(), accepted.fd());

    assert!(echo_session.send(b"hi there".to_vec()));

    match recv_timeout(&client_rx) {
        ClientEvent::Receive(_fd, payload) => assert_eq!(payload, b"hi there"),
        _ => panic!("expected client OnReceive"),
    }

    assert!(client.close());

    match recv_timeout(&server_rx) {
        ServerEvent::Close(session) => assert_eq!(session.fd(), accepted.fd()),
        _ => panic!("expected OnClose"),
    }

    assert!(server.stop());
    let _ = std::fs::remove_file(&path);
}
