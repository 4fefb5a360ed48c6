use std::fmt;

/// Associates a readiness event with the descriptor that generated it.
///
/// A `Token` is supplied when a handler is registered with the [`Reactor`]
/// and is echoed back on every [`Event`] produced for that descriptor. This
/// crate always sets a token's value equal to the raw descriptor it names,
/// so a token also doubles as a stable identity for lookups into the
/// reactor's registry.
///
/// [`Reactor`]: crate::reactor::Reactor
/// [`Event`]: crate::event::Event
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub usize);

impl From<usize> for Token {
    fn from(val: usize) -> Token {
        Token(val)
    }
}

impl From<Token> for usize {
    fn from(val: Token) -> usize {
        val.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
