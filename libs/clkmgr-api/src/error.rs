/// Recoverable failures reported by the clock manager.
///
/// Only platform collaborators can fail at runtime. Topology and usage errors are
/// not represented here: they panic, because no safe hardware state exists to return to.
#[repr(usize)]
#[derive(num_derive::FromPrimitive, num_derive::ToPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    NoError = 0,
    /// The platform power sequencer did not confirm a domain transition.
    SequencerFailed = 1,
    /// The frequency-hopping engine rejected a configuration.
    HoppingFailed = 2,
    InternalError = 3,
}

impl Error {
    pub fn from_usize(arg: usize) -> Self {
        use crate::Error::*;
        match arg {
            0 => NoError,
            1 => SequencerFailed,
            2 => HoppingFailed,
            _ => InternalError,
        }
    }

    pub fn to_usize(&self) -> usize {
        use crate::Error::*;
        match *self {
            NoError => 0,
            SequencerFailed => 1,
            HoppingFailed => 2,
            InternalError => 3,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NoError => write!(f, "no error"),
            Error::SequencerFailed => write!(f, "power sequencer did not confirm the transition"),
            Error::HoppingFailed => write!(f, "frequency hopping configuration failed"),
            Error::InternalError => write!(f, "internal error"),
        }
    }
}

impl std::error::Error for Error {}

/// Collapses a result into the integer status handed to driver clients.
pub fn status(result: Result<(), Error>) -> usize {
    match result {
        Ok(()) => Error::NoError.to_usize(),
        Err(e) => e.to_usize(),
    }
}

#[cfg(test)]
mod tests {
    use num_traits::FromPrimitive;

    use super::*;

    #[test]
    fn status_codes_round_trip() {
        assert_eq!(status(Ok(())), 0);
        assert_eq!(status(Err(Error::SequencerFailed)), 1);
        assert_eq!(Error::from_usize(2), Error::HoppingFailed);
        assert_eq!(Error::from_usize(99), Error::InternalError);
        assert_eq!(Error::from_usize(3).to_usize(), 3);
        assert_eq!(<Error as FromPrimitive>::from_usize(1), Some(Error::SequencerFailed));
    }
}
