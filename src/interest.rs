use std::fmt;
use std::num::NonZeroU8;

const READABLE: u8 = 0b0001;
const WRITABLE: u8 = 0b0010;

/// The set of readiness kinds a [`Reactor`] registration is interested in.
///
/// Only `READ` and `WRITE` are expressed here: `ERROR` and `CLOSE` are
/// always implicitly observed by the reactor for every registered
/// descriptor, per the handler contract, and never need to be requested.
///
/// [`Reactor`]: crate::reactor::Reactor
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Interest(NonZeroU8);

impl Interest {
    pub const READABLE: Interest = Interest(unsafe { NonZeroU8::new_unchecked(READABLE) });
    pub const WRITABLE: Interest = Interest(unsafe { NonZeroU8::new_unchecked(WRITABLE) });

    /// Combine two interest sets.
    pub const fn add(self, other: Interest) -> Interest {
        Interest(unsafe { NonZeroU8::new_unchecked(self.0.get() | other.0.get()) })
    }

    /// Remove `other` from this set, returning `None` if nothing is left.
    pub fn remove(self, other: Interest) -> Option<Interest> {
        NonZeroU8::new(self.0.get() & !other.0.get()).map(Interest)
    }

    pub const fn is_readable(self) -> bool {
        self.0.get() & READABLE != 0
    }

    pub const fn is_writable(self) -> bool {
        self.0.get() & WRITABLE != 0
    }
}

impl fmt::Debug for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if self.is_readable() {
            write!(f, "READABLE")?;
            first = false;
        }
        if self.is_writable() {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "WRITABLE")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_combines_both_interests() {
        let combined = Interest::READABLE.add(Interest::WRITABLE);
        assert!(combined.is_readable());
        assert!(combined.is_writable());
    }

    #[test]
    fn remove_leaves_the_other_interest_intact() {
        let combined = Interest::READABLE.add(Interest::WRITABLE);
        let readable_only = combined.remove(Interest::WRITABLE).unwrap();
        assert!(readable_only.is_readable());
        assert!(!readable_only.is_writable());
    }

    #[test]
    fn removing_everything_yields_none() {
        assert!(Interest::READABLE.remove(Interest::READABLE).is_none());
    }
}
