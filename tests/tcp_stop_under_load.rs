//! Scenario 5: stopping a client while it is continuously sending must make
//! subsequent `Send` calls return `false`, and no further listener callback
//! may fire once `Stop` has returned.

mod support;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reactix::{Address, Reactor, TcpClient, TcpServer};

use support::{client_listener, recv_timeout, server_listener, ServerEvent};

#[test]
fn stop_under_load_rejects_further_sends() {
    let reactor = Reactor::global().expect("global reactor");

    let server = TcpServer::new(reactor.clone(), Address::from_host_port("127.0.0.1", 0).unwrap());
    let (listener, server_rx) = server_listener();
    server.set_listener(&listener);
    assert!(server.init());
    assert!(server.start());
    let port = server.local_addr().unwrap().port();

    let client = TcpClient::new(reactor.clone(), Address::from_host_port("127.0.0.1", port).unwrap());
    let (client_lst, client_rx) = client_listener();
    client.set_listener(&client_lst);
    assert!(client.init());
    assert!(client.connect());

    match recv_timeout(&server_rx) {
        ServerEvent::Accept(_) => {}
        _ => panic!("expected OnAccept"),
    }

    let keep_sending = Arc::new(AtomicBool::new(true));
    let sender_client = client.clone();
    let sender_flag = keep_sending.clone();
    let sender = thread::spawn(move || {
        while sender_flag.load(Ordering::SeqCst) {
            sender_client.send(vec![0u8; 256]);
            thread::sleep(Duration::from_millis(1));
        }
    });

    thread::sleep(Duration::from_millis(30));
    assert!(client.close());
    keep_sending.store(false, Ordering::SeqCst);
    sender.join().unwrap();

    assert!(!client.send(b"after-close".to_vec()));

    // Drain whatever had already been enqueued before Stop observed it, then
    // make sure nothing further arrives.
    while client_rx.try_recv().is_ok() {}
    thread::sleep(Duration::from_millis(200));
    assert!(client_rx.try_recv().is_err());

    assert!(server.stop());
}
