//! The combined health flag and cache-lifetime value.
use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// A state-plus-TTL word, as published by the monitor table and returned by every resolver.
///
/// The top bit flags the target as down, the next one marks an admin-forced value, and the low
/// 28 bits carry the cache lifetime in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sttl(u32);

impl Sttl {
    pub const DOWN: u32 = 1 << 31;
    pub const FORCED: u32 = 1 << 30;
    pub const TTL_MASK: u32 = 0x0FFF_FFFF;
    pub const TTL_MAX: u32 = Self::TTL_MASK;

    /// Up, with the longest possible lifetime. The identity for [`Sttl::min`].
    pub const MAX: Sttl = Sttl(Self::TTL_MAX);

    /// Build a value from a down flag and a TTL, clamping the TTL to [`Sttl::TTL_MAX`].
    #[must_use]
    pub fn new(down: bool, ttl: u32) -> Self {
        let down = if down { Self::DOWN } else { 0 };
        Sttl(down | ttl.min(Self::TTL_MAX))
    }

    #[must_use]
    pub fn up(ttl: u32) -> Self {
        Self::new(false, ttl)
    }

    #[must_use]
    pub fn down(ttl: u32) -> Self {
        Self::new(true, ttl)
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Sttl(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_down(self) -> bool {
        self.0 & Self::DOWN != 0
    }

    #[must_use]
    pub const fn is_forced(self) -> bool {
        self.0 & Self::FORCED != 0
    }

    #[must_use]
    pub const fn ttl(self) -> u32 {
        self.0 & Self::TTL_MASK
    }

    #[must_use]
    pub const fn forced(self) -> Self {
        Sttl(self.0 | Self::FORCED)
    }

    #[must_use]
    pub const fn unforced(self) -> Self {
        Sttl(self.0 & !Self::FORCED)
    }

    #[must_use]
    pub const fn without_down(self) -> Self {
        Sttl(self.0 & !Self::DOWN)
    }

    #[must_use]
    pub const fn with_down(self) -> Self {
        Sttl(self.0 | Self::DOWN)
    }

    /// Merge two values: down if either is down, the shorter TTL. The forced flag is dropped.
    #[must_use]
    pub fn min(self, other: Sttl) -> Sttl {
        let down = (self.0 | other.0) & Self::DOWN;
        Sttl(down | self.ttl().min(other.ttl()))
    }
}

impl Default for Sttl {
    fn default() -> Self {
        Self::MAX
    }
}

impl fmt::Display for Sttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_down() { "DOWN" } else { "UP" };
        write!(f, "{state}/{}", self.ttl())
    }
}

impl FromStr for Sttl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidState(s.to_string());
        let (state, ttl) = match s.split_once('/') {
            Some((state, ttl)) => (state, Some(ttl)),
            None => (s, None),
        };
        let down = if state.eq_ignore_ascii_case("up") {
            false
        } else if state.eq_ignore_ascii_case("down") {
            true
        } else {
            return Err(invalid());
        };
        let ttl = match ttl {
            None => Self::TTL_MAX,
            Some(ttl) => match ttl.parse::<u32>() {
                Ok(ttl) if ttl <= Self::TTL_MAX => ttl,
                _ => return Err(invalid()),
            },
        };
        Ok(Self::new(down, ttl))
    }
}
