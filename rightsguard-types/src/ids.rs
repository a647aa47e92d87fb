//! Identifier types used throughout Rightsguard.
//!
//! Uses UUID v7 for time-ordered, globally unique identifiers. The leading
//! 48 bits carry the creation time in milliseconds, the remainder is random,
//! so identifiers sort by creation time and collide only with negligible
//! probability.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! time_ordered_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new identifier stamped with the current time.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Parses an identifier from a string.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Returns the embedded creation time in milliseconds since the
            /// Unix epoch, if the UUID carries one.
            #[must_use]
            pub fn timestamp_millis(&self) -> Option<u64> {
                self.0.get_timestamp().map(|ts| {
                    let (secs, nanos) = ts.to_unix();
                    secs * 1000 + u64::from(nanos) / 1_000_000
                })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

time_ordered_id!(
    /// Identifier of an issued license. A convenience key only: the integrity
    /// digest is the content-addressed key.
    LicenseId
);

time_ordered_id!(
    /// Identifier of a recorded violation. Violation reporting is idempotent
    /// on this value.
    ViolationId
);

time_ordered_id!(
    /// Identifier of a single platform deployment attempt.
    DeploymentId
);
