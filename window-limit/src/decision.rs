use std::fmt;

/// The outcome of a single admission check.
///
/// Rejection is an ordinary result, not an error. How it is surfaced is up to
/// the caller; [`Decision::status_code`] offers the usual HTTP mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Accepted,
    Rejected,
}

impl Decision {
    #[inline]
    pub fn is_accepted(self) -> bool {
        matches!(self, Decision::Accepted)
    }

    #[inline]
    pub fn is_rejected(self) -> bool {
        matches!(self, Decision::Rejected)
    }

    /// `200 OK` for accepted requests, `429 Too Many Requests` otherwise.
    pub fn status_code(self) -> u16 {
        match self {
            Decision::Accepted => 200,
            Decision::Rejected => 429,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Accepted => write!(f, "Ok ({})", self.status_code()),
            Decision::Rejected => write!(f, "Too many requests ({})", self.status_code()),
        }
    }
}
