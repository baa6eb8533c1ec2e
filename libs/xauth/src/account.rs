//! Account-state classification

use std::fmt;

/// Health of the session credential as reported by the API's error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountState {
    /// The `auth_token` is not (or no longer) valid
    BadToken,
    /// The account is suspended
    Suspended,
    /// The account is temporarily locked
    Locked,
}

impl AccountState {
    /// Map a provider error code to an account state.
    ///
    /// Codes outside the known set return `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            32 => Some(Self::BadToken),
            64 | 141 => Some(Self::Suspended),
            326 => Some(Self::Locked),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::BadToken => "Bad Token",
            Self::Suspended => "SUSPENDED",
            Self::Locked => "LOCKED",
        }
    }
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
