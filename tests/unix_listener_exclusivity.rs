//! Scenario 6: a second local-path server bound to a path a first server is
//! still listening on must fail at `Init`/`Start` time rather than silently
//! stealing the path.

#![cfg(unix)]

mod support;

use reactix::{Address, Reactor, UnixServer};

use support::server_listener;

#[test]
fn second_bind_on_a_live_path_fails() {
    let reactor = Reactor::global().expect("global reactor");

    let path = std::env::temp_dir().join(format!("reactix-test-{}-{}.sock", std::process::id(), line!()));
    let _ = std::fs::remove_file(&path);
    let addr = Address::local(&path).expect("path within the platform cap");

    let server1 = UnixServer::new(reactor.clone(), addr.clone());
    let (listener1, _rx1) = server_listener();
    server1.set_listener(&listener1);
    assert!(server1.init());
    assert!(server1.start());

    let server2 = UnixServer::new(reactor.clone(), addr);
    let (listener2, _rx2) = server_listener();
    server2.set_listener(&listener2);
    assert!(server2.init());
    assert!(!server2.start(), "a second bind on a live path must fail");

    assert!(server1.stop());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn local_path_too_long_is_rejected_up_front() {
    let too_long = "a".repeat(reactix::LOCAL_PATH_MAX + 1);
    assert!(Address::local(too_long).is_err());
}
