//! Password checks

use std::ops::{BitOr, BitOrAssign};

use log::{debug, warn};

use super::document::Document;
use super::engine::{EngineDocument, RenderContext};
use super::error::Result;

/// Outcome of an authentication attempt, as a bit set.
/// An empty set means the attempt failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AuthenticationStatus(u8);

impl AuthenticationStatus {
    pub const FAILED: Self = Self(0);
    pub const NO_AUTHENTICATION_REQUIRED: Self = Self(1 << 0);
    pub const USER_AUTHENTICATED: Self = Self(1 << 1);
    pub const OWNER_AUTHENTICATED: Self = Self(1 << 2);

    const KNOWN: u8 = 0b111;

    /// Keep only the defined bits of a raw engine bitmask
    #[must_use]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self((bits & Self::KNOWN as u32) as u8)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        self.0 != 0
    }
}

impl BitOr for AuthenticationStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AuthenticationStatus {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl<C: RenderContext> Document<C> {
    /// Whether a password must be supplied before pages can be rendered
    pub fn requires_authentication(&self) -> Result<bool> {
        self.with_resources(|resources| match resources.document.needs_password() {
            Ok(needed) => Ok(needed),
            Err(e) => {
                warn!("Unable to query password requirement: {e}");
                Ok(true)
            }
        })
    }

    /// Try `password`. Attempts are independent of each other; a failed
    /// attempt is [`AuthenticationStatus::FAILED`], not an error.
    pub fn authenticate(&self, password: &str) -> Result<AuthenticationStatus> {
        self.with_resources(|resources| {
            let status = match resources.document.authenticate(password) {
                Ok(bits) => AuthenticationStatus::from_bits_truncate(bits),
                Err(e) => {
                    warn!("Password check failed in engine: {e}");
                    AuthenticationStatus::FAILED
                }
            };
            debug!("Authentication attempt finished with {status:?}");
            Ok(status)
        })
    }
}
