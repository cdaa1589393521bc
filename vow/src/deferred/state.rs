use crate::error::Reason;

/// Internal lifecycle of a deferred.
///
/// The settled value or reason lives inside the terminal variant, so a
/// deferred can never hold both a value and a reason.
pub(crate) enum State<T> {
    /// Not yet resolved.
    ///
    /// The only state in which an external settle attempt has any effect.
    Pending,

    /// Resolved with another thenable and waiting for it to settle.
    ///
    /// Entered only from `Pending`; left only when the adopted thenable
    /// delivers its outcome.
    Blocked,

    /// Settled successfully. Terminal.
    Fulfilled(T),

    /// Settled with a failure. Terminal.
    Rejected(Reason),
}

impl<T> State<T> {
    pub(crate) fn kind(&self) -> StateKind {
        match self {
            State::Pending => StateKind::Pending,
            State::Blocked => StateKind::Blocked,
            State::Fulfilled(_) => StateKind::Fulfilled,
            State::Rejected(_) => StateKind::Rejected,
        }
    }
}

impl<T: Clone> State<T> {
    /// Returns a copy of the outcome once the state is terminal.
    pub(crate) fn settled(&self) -> Option<Settled<T>> {
        match self {
            State::Fulfilled(value) => Some(Settled::Fulfilled(value.clone())),
            State::Rejected(reason) => Some(Settled::Rejected(reason.clone())),
            State::Pending | State::Blocked => None,
        }
    }
}

impl<T> From<Settled<T>> for State<T> {
    fn from(settled: Settled<T>) -> Self {
        match settled {
            Settled::Fulfilled(value) => State::Fulfilled(value),
            Settled::Rejected(reason) => State::Rejected(reason),
        }
    }
}

/// Observable lifecycle stage of a [`Deferred`](crate::Deferred).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Pending,
    Blocked,
    Fulfilled,
    Rejected,
}

impl StateKind {
    /// Returns `true` for `Fulfilled` and `Rejected`.
    pub fn is_settled(self) -> bool {
        matches!(self, StateKind::Fulfilled | StateKind::Rejected)
    }
}

/// The terminal outcome of a deferred.
///
/// Also the element type produced by [`all_settled`](crate::all_settled).
#[derive(Debug, Clone)]
pub enum Settled<T> {
    Fulfilled(T),
    Rejected(Reason),
}

impl<T> Settled<T> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settled::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Settled::Rejected(_))
    }

    /// Returns the fulfillment value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Settled::Fulfilled(value) => Some(value),
            Settled::Rejected(_) => None,
        }
    }

    /// Returns the rejection reason, if any.
    pub fn reason(&self) -> Option<&Reason> {
        match self {
            Settled::Fulfilled(_) => None,
            Settled::Rejected(reason) => Some(reason),
        }
    }

    pub fn into_result(self) -> Result<T, Reason> {
        match self {
            Settled::Fulfilled(value) => Ok(value),
            Settled::Rejected(reason) => Err(reason),
        }
    }
}

impl<T> From<Result<T, Reason>> for Settled<T> {
    fn from(result: Result<T, Reason>) -> Self {
        match result {
            Ok(value) => Settled::Fulfilled(value),
            Err(reason) => Settled::Rejected(reason),
        }
    }
}
