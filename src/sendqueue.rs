//! The send-queue/backpressure state machine described in §4.3.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Mutex;

use bytes::Bytes;
use log::{trace, warn};

/// Outcome of one drain pass, used by the owning connection handler to
/// decide whether the connection should be torn down.
pub enum DrainOutcome {
    /// The queue is now empty.
    Drained,
    /// A write returned would-block; bytes remain queued.
    WouldBlock,
    /// A fatal, non-transient error occurred; the caller should drive the
    /// connection's unified close path with `is_error = true`.
    Fatal(io::Error),
}

/// A change in the WRITE-interest bit that the caller must apply via
/// `Reactor::modify`. Returning this from `enqueue`/`drain` rather than
/// tracking the bit separately is what keeps the enable/disable decision
/// atomic with the emptiness check it's derived from.
pub enum InterestTransition {
    /// The queue just went from empty to non-empty; enable WRITE.
    Enable,
    /// The queue just went from non-empty to empty; disable WRITE.
    Disable,
    /// No change; the caller need not touch the reactor's interest mask.
    NoChange,
}

struct State {
    chunks: VecDeque<Bytes>,
    write_interest_enabled: bool,
}

/// An ordered queue of owned byte chunks pending write on a stream
/// descriptor. All mutation, including the WRITE-interest enable/disable
/// decision, happens under one internal mutex: §9's open question about
/// the source relying on "reactor thread only" by convention is resolved
/// here by making that guarantee explicit, since `Send` is callable from
/// arbitrary user threads while drains run on the reactor thread (see
/// SPEC_FULL.md §4.3). A transition computed outside this lock would race
/// a concurrent `enqueue`/`drain` and could leave WRITE interest disabled
/// with bytes still queued, which a level-triggered poller never revisits.
pub struct SendQueue {
    state: Mutex<State>,
}

impl SendQueue {
    pub fn new() -> SendQueue {
        SendQueue {
            state: Mutex::new(State {
                chunks: VecDeque::new(),
                write_interest_enabled: false,
            }),
        }
    }

    /// Append a chunk. Returns the WRITE-interest transition the caller
    /// must apply. A zero-length payload is a no-op that never changes
    /// interest (see the "zero-length Send" boundary behavior).
    pub fn enqueue(&self, bytes: Bytes) -> InterestTransition {
        if bytes.is_empty() {
            return InterestTransition::NoChange;
        }
        let mut state = self.state.lock().unwrap();
        state.chunks.push_back(bytes);
        if state.write_interest_enabled {
            InterestTransition::NoChange
        } else {
            state.write_interest_enabled = true;
            InterestTransition::Enable
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().chunks.is_empty()
    }

    /// Whether WRITE interest is currently believed to be enabled, for use
    /// by `Handler::interest()` when (re)computing the full interest mask.
    pub fn write_interest_enabled(&self) -> bool {
        self.state.lock().unwrap().write_interest_enabled
    }

    /// Drain as much as possible without blocking. Called from
    /// `Handler::on_write`. The returned transition is computed under the
    /// same lock as the drain itself, so a concurrent `enqueue` can never
    /// observe a stale "queue is empty" snapshot and skip re-enabling
    /// WRITE interest.
    pub fn drain<W: Write>(&self, writer: &mut W) -> (DrainOutcome, InterestTransition) {
        let mut state = self.state.lock().unwrap();
        loop {
            let Some(head) = state.chunks.front_mut() else {
                let transition = if state.write_interest_enabled {
                    state.write_interest_enabled = false;
                    InterestTransition::Disable
                } else {
                    InterestTransition::NoChange
                };
                return (DrainOutcome::Drained, transition);
            };
            match writer.write(&head[..]) {
                Ok(0) => {
                    // A zero-length write on a non-empty chunk; treat like
                    // would-block rather than spinning.
                    return (DrainOutcome::WouldBlock, InterestTransition::NoChange);
                }
                Ok(n) if n == head.len() => {
                    state.chunks.pop_front();
                    trace!("drained a full chunk of {} bytes", n);
                    continue;
                }
                Ok(n) => {
                    trace!("partial write of {} of {} bytes", n, head.len());
                    let remaining = head.slice(n..);
                    *head = remaining;
                    return (DrainOutcome::WouldBlock, InterestTransition::NoChange);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    return (DrainOutcome::WouldBlock, InterestTransition::NoChange);
                }
                Err(err) => {
                    warn!("abandoning send-queue drain: {}", err);
                    return (DrainOutcome::Fatal(err), InterestTransition::NoChange);
                }
            }
        }
    }
}

impl Default for SendQueue {
    fn default() -> SendQueue {
        SendQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A `Write` stub that accepts exactly `cap` bytes per call, then
    /// reports would-block, so drain-loop behavior can be exercised without
    /// a real socket.
    struct LimitedWriter {
        cap: usize,
        written: Vec<u8>,
        blocked_after: bool,
    }

    impl LimitedWriter {
        fn new(cap: usize) -> LimitedWriter {
            LimitedWriter {
                cap,
                written: Vec::new(),
                blocked_after: false,
            }
        }
    }

    impl Write for LimitedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.blocked_after {
                return Err(io::Error::from(io::ErrorKind::WouldBlock));
            }
            let n = buf.len().min(self.cap);
            self.written.extend_from_slice(&buf[..n]);
            self.blocked_after = true;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn enqueue_reports_empty_to_nonempty_transition() {
        let queue = SendQueue::new();
        assert!(matches!(queue.enqueue(Bytes::from_static(b"a")), InterestTransition::Enable));
        assert!(matches!(queue.enqueue(Bytes::from_static(b"b")), InterestTransition::NoChange));
    }

    #[test]
    fn zero_length_enqueue_is_a_noop() {
        let queue = SendQueue::new();
        assert!(matches!(queue.enqueue(Bytes::new()), InterestTransition::NoChange));
        assert!(queue.is_empty());
        assert!(!queue.write_interest_enabled());
    }

    #[test]
    fn drain_pops_full_writes_in_order_and_disables_interest() {
        let queue = SendQueue::new();
        queue.enqueue(Bytes::from_static(b"hello"));
        queue.enqueue(Bytes::from_static(b"world"));
        let mut writer = Vec::new();
        match queue.drain(&mut writer) {
            (DrainOutcome::Drained, InterestTransition::Disable) => {}
            _ => panic!("expected a full drain that disables WRITE interest"),
        }
        assert_eq!(writer, b"helloworld");
        assert!(queue.is_empty());
        assert!(!queue.write_interest_enabled());
    }

    #[test]
    fn partial_write_rewrites_only_the_head_chunk() {
        let queue = SendQueue::new();
        queue.enqueue(Bytes::from_static(b"0123456789"));
        queue.enqueue(Bytes::from_static(b"second"));
        let mut writer = LimitedWriter::new(4);
        match queue.drain(&mut writer) {
            (DrainOutcome::WouldBlock, InterestTransition::NoChange) => {}
            _ => panic!("expected would-block after the partial write"),
        }
        assert_eq!(writer.written, b"0123");
        assert!(queue.write_interest_enabled());

        // The remaining slice of the head chunk, not the next chunk, is what
        // gets written next.
        let mut writer2 = Vec::new();
        match queue.drain(&mut writer2) {
            (DrainOutcome::Drained, InterestTransition::Disable) => {}
            _ => panic!("expected a full drain the second time"),
        }
        assert_eq!(writer2, b"456789second");
    }

    #[test]
    fn fatal_write_error_surfaces_to_the_caller_without_touching_interest() {
        let queue = SendQueue::new();
        queue.enqueue(Bytes::from_static(b"x"));
        let mut writer = FailingWriter;
        match queue.drain(&mut writer) {
            (DrainOutcome::Fatal(err), InterestTransition::NoChange) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
            _ => panic!("expected a fatal outcome"),
        }
    }

    #[test]
    fn a_second_enqueue_after_drain_reenables_interest() {
        // Regression coverage for the race where a concurrent enqueue
        // racing a drain-to-empty could leave WRITE interest disabled
        // with a chunk still queued: both decisions live under one lock,
        // so draining to empty then enqueuing again must report Disable
        // followed by Enable, never NoChange twice in a row.
        let queue = SendQueue::new();
        queue.enqueue(Bytes::from_static(b"first"));
        let mut writer = Vec::new();
        let (_, transition) = queue.drain(&mut writer);
        assert!(matches!(transition, InterestTransition::Disable));

        assert!(matches!(queue.enqueue(Bytes::from_static(b"second")), InterestTransition::Enable));
        assert!(queue.write_interest_enabled());
    }
}
