//! The process-wide event reactor: one polling thread, one fd->handler
//! registry, dispatch in ERROR -> CLOSE -> READ -> WRITE order.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::thread::JoinHandle;

use log::{debug, error, trace, warn};

use crate::config::{EVENTS_CAPACITY, POLL_TIMEOUT};
use crate::event::{Events, Readiness};
use crate::handler::Handler;
use crate::sys;
use crate::token::Token;
use crate::RawDescriptor;

/// A reference to the single process-wide reactor. Endpoints hold this
/// instead of reaching for a hidden global, per the "explicit process-scoped
/// service" design note.
pub type SharedReactor = Arc<Reactor>;

static GLOBAL: OnceLock<io::Result<SharedReactor>> = OnceLock::new();

/// The event-demultiplexing engine described in §4.1.
pub struct Reactor {
    selector: sys::Selector,
    waker: sys::Waker,
    registry: RwLock<HashMap<RawDescriptor, Arc<dyn Handler>>>,
    running: AtomicBool,
    poll_thread: Mutex<Option<JoinHandle<()>>>,
}

const WAKE_TOKEN: Token = Token(usize::MAX);

impl Reactor {
    fn new() -> io::Result<SharedReactor> {
        let selector = sys::Selector::new()?;
        let waker = sys::Waker::new(&selector, WAKE_TOKEN)?;
        let reactor = Arc::new(Reactor {
            selector,
            waker,
            registry: RwLock::new(HashMap::new()),
            running: AtomicBool::new(true),
            poll_thread: Mutex::new(None),
        });
        reactor.clone().spawn_poll_thread();
        Ok(reactor)
    }

    /// The lazily-created, process-lifetime singleton reactor.
    pub fn global() -> io::Result<SharedReactor> {
        match GLOBAL.get_or_init(Reactor::new) {
            Ok(reactor) => Ok(reactor.clone()),
            Err(err) => Err(io::Error::new(err.kind(), err.to_string())),
        }
    }

    fn spawn_poll_thread(self: SharedReactor) {
        let for_thread = self.clone();
        let handle = std::thread::Builder::new()
            .name("reactor-poll".into())
            .spawn(move || for_thread.poll_loop())
            .expect("failed to spawn reactor polling thread");
        *self.poll_thread.lock().unwrap() = Some(handle);
    }

    /// Register a handler's descriptor with the reactor's polling
    /// primitive. Fails if the fd is already registered.
    pub fn register(&self, handler: Arc<dyn Handler>) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            warn!("register called on a stopped reactor");
            return false;
        }
        let fd = handler.descriptor();
        let mut registry = self.registry.write().unwrap();
        if registry.contains_key(&fd) {
            warn!("descriptor {:?} already registered", fd);
            return false;
        }
        if let Err(err) = self.selector.register(fd_to_selector_key(fd), token_for(fd), handler.interest()) {
            error!("failed to register descriptor {:?}: {}", fd, err);
            return false;
        }
        registry.insert(fd, handler);
        true
    }

    /// Update the kernel interest mask for an already-registered fd.
    pub fn modify(&self, fd: RawDescriptor, interests: crate::interest::Interest) -> bool {
        let registry = self.registry.read().unwrap();
        if !registry.contains_key(&fd) {
            return false;
        }
        drop(registry);
        match self.selector.reregister(fd_to_selector_key(fd), token_for(fd), interests) {
            Ok(()) => true,
            Err(err) => {
                error!("failed to modify descriptor {:?}: {}", fd, err);
                false
            }
        }
    }

    /// Remove kernel interest and drop the registry entry. Idempotent.
    pub fn remove(&self, fd: RawDescriptor) -> bool {
        let mut registry = self.registry.write().unwrap();
        let was_present = registry.remove(&fd).is_some();
        drop(registry);
        if let Err(err) = self.selector.deregister(fd_to_selector_key(fd)) {
            error!("failed to deregister descriptor {:?}: {}", fd, err);
            return false;
        }
        let _ = was_present;
        true
    }

    fn poll_loop(self: Arc<Self>) {
        let mut events = Events::with_capacity(EVENTS_CAPACITY);
        while self.running.load(Ordering::SeqCst) {
            match self.selector.select(&mut events, Some(POLL_TIMEOUT)) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    error!("fatal polling error, reactor loop terminating: {}", err);
                    break;
                }
            }

            for event in &events {
                if event.token() == WAKE_TOKEN {
                    self.waker.ack();
                    continue;
                }
                self.dispatch(event);
            }
        }
        debug!("reactor poll loop exiting");
    }

    fn dispatch(&self, event: &crate::event::Event) {
        let fd = descriptor_for_token(event.token());
        let handler = {
            let registry = self.registry.read().unwrap();
            registry.get(&fd).cloned()
        };
        let Some(handler) = handler else {
            trace!("dropping event for unregistered descriptor {:?}", fd);
            return;
        };
        for kind in event.readiness_kinds() {
            trace!("dispatch {:?} -> {:?}", fd, kind);
            match kind {
                Readiness::Error => handler.on_error(sys::net::take_socket_error(fd)),
                Readiness::Close => handler.on_close(),
                Readiness::Read => handler.on_read(),
                Readiness::Write => handler.on_write(),
            }
        }
    }

    /// Post a wakeup so a thread blocked in `select` observes new state
    /// (e.g. a freshly registered fd, or the stop signal) promptly.
    pub fn wake(&self) -> io::Result<()> {
        self.waker.wake()
    }

    /// Stop the reactor: flips the running flag, posts a wakeup, and joins
    /// the polling thread. Outstanding handlers are not closed here;
    /// endpoints own their own descriptors and must close them themselves.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.wake();
        if let Some(handle) = self.poll_thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

fn token_for(fd: RawDescriptor) -> Token {
    Token(descriptor_as_usize(fd))
}

fn descriptor_for_token(token: Token) -> RawDescriptor {
    descriptor_from_usize(usize::from(token))
}

#[cfg(unix)]
fn descriptor_as_usize(fd: RawDescriptor) -> usize {
    fd as usize
}

#[cfg(unix)]
fn descriptor_from_usize(v: usize) -> RawDescriptor {
    v as RawDescriptor
}

#[cfg(unix)]
fn fd_to_selector_key(fd: RawDescriptor) -> RawDescriptor {
    fd
}

#[cfg(windows)]
fn descriptor_as_usize(fd: RawDescriptor) -> usize {
    fd as usize
}

#[cfg(windows)]
fn descriptor_from_usize(v: usize) -> RawDescriptor {
    v as RawDescriptor
}

#[cfg(windows)]
fn fd_to_selector_key(fd: RawDescriptor) -> RawDescriptor {
    fd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::raw_fd_of;
    use crate::interest::Interest;
    use std::net::TcpListener;

    struct NoopHandler {
        fd: RawDescriptor,
    }

    impl Handler for NoopHandler {
        fn descriptor(&self) -> RawDescriptor {
            self.fd
        }

        fn interest(&self) -> Interest {
            Interest::READABLE
        }

        fn on_read(&self) {}
        fn on_write(&self) {}
        fn on_error(&self, _reason: io::Error) {}
        fn on_close(&self) {}
    }

    fn bound_listener() -> (TcpListener, RawDescriptor) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let fd = raw_fd_of(&listener);
        (listener, fd)
    }

    #[test]
    fn register_rejects_a_duplicate_fd() {
        let reactor = Reactor::global().unwrap();
        let (_listener, fd) = bound_listener();
        let handler: Arc<dyn Handler> = Arc::new(NoopHandler { fd });
        assert!(reactor.register(handler.clone()));
        assert!(!reactor.register(handler));
        assert!(reactor.remove(fd));
    }

    #[test]
    fn remove_of_an_unknown_fd_is_a_noop_success() {
        let reactor = Reactor::global().unwrap();
        let (_listener, fd) = bound_listener();
        assert!(reactor.remove(fd));
        assert!(reactor.remove(fd));
    }

    #[test]
    fn modify_of_an_unregistered_fd_fails() {
        let reactor = Reactor::global().unwrap();
        let (_listener, fd) = bound_listener();
        assert!(!reactor.modify(fd, Interest::READABLE));
    }

    #[test]
    fn modify_updates_an_already_registered_fd() {
        let reactor = Reactor::global().unwrap();
        let (_listener, fd) = bound_listener();
        let handler: Arc<dyn Handler> = Arc::new(NoopHandler { fd });
        assert!(reactor.register(handler));
        assert!(reactor.modify(fd, Interest::READABLE.add(Interest::WRITABLE)));
        assert!(reactor.remove(fd));
    }
}
