//! Readiness events as reported by the reactor's polling primitive.

use crate::token::Token;

/// A single classified readiness kind. `Error` and `Close` are always
/// observed regardless of the registered [`Interest`](crate::interest::Interest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Error,
    Close,
    Read,
    Write,
}

/// Dispatch order mandated by the handler contract: a single readiness
/// report is always decomposed and delivered in this fixed order so that a
/// fatal condition is always handled before a read or write is attempted on
/// a descriptor that is about to be torn down.
pub const DISPATCH_ORDER: [Readiness; 4] = [
    Readiness::Error,
    Readiness::Close,
    Readiness::Read,
    Readiness::Write,
];

/// One readiness report for a single registered descriptor, as produced by
/// the OS-specific selector.
#[derive(Clone, Copy)]
pub struct Event {
    pub(crate) token: Token,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
    pub(crate) error: bool,
    pub(crate) closed: bool,
}

impl Event {
    pub fn token(&self) -> Token {
        self.token
    }

    /// Decompose this event into the ordered set of readiness kinds it
    /// carries, per [`DISPATCH_ORDER`].
    pub fn readiness_kinds(&self) -> impl Iterator<Item = Readiness> + '_ {
        DISPATCH_ORDER.iter().copied().filter(move |kind| match kind {
            Readiness::Error => self.error,
            Readiness::Close => self.closed,
            Readiness::Read => self.readable,
            Readiness::Write => self.writable,
        })
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("token", &self.token)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("error", &self.error)
            .field("closed", &self.closed)
            .finish()
    }
}

/// A growable collection of [`Event`]s filled in by one call to the
/// selector's `select`.
pub struct Events {
    inner: Vec<Event>,
}

impl Events {
    pub fn with_capacity(capacity: usize) -> Events {
        Events {
            inner: Vec::with_capacity(capacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.inner.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.inner.clear();
    }

    pub(crate) fn push(&mut self, event: Event) {
        self.inner.push(event);
    }
}

impl<'a> IntoIterator for &'a Events {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_kinds_follow_the_fixed_dispatch_order() {
        let event = Event {
            token: Token(0),
            readable: true,
            writable: true,
            error: true,
            closed: true,
        };
        let kinds: Vec<Readiness> = event.readiness_kinds().collect();
        assert_eq!(kinds, vec![Readiness::Error, Readiness::Close, Readiness::Read, Readiness::Write]);
    }

    #[test]
    fn readiness_kinds_omits_bits_that_were_not_set() {
        let event = Event {
            token: Token(0),
            readable: true,
            writable: false,
            error: false,
            closed: false,
        };
        let kinds: Vec<Readiness> = event.readiness_kinds().collect();
        assert_eq!(kinds, vec![Readiness::Read]);
    }
}
