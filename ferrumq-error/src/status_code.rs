use std::fmt;

use num_enum::TryFromPrimitive;

/// Numeric category of a broker error.
///
/// Codes are grouped by thousands: 1xxx general, 2xxx registry (names,
/// lookups, lifecycle), 3xxx configuration, 4xxx message limits, 5xxx
/// storage and 6xxx OS/network failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    Internal = 1000,
    InvalidArgs = 1001,

    NotFound = 2000,
    InvalidName = 2001,
    MissingArgument = 2002,
    Exiting = 2003,

    ConfigInvalid = 3000,
    InvalidLogLevel = 3001,

    MessageTooLarge = 4000,
    MessageTooSmall = 4001,

    StorageUnavailable = 5000,
    DiskFull = 5001,
    CorruptedData = 5002,
    SerializationFailed = 5003,
    DeserializationFailed = 5004,
    LockError = 5005,
    DirectoryInUse = 5006,
    QueueClosed = 5007,

    Io = 6000,
    Timeout = 6001,
    ConnectionFailed = 6002,
    UnexpectedEof = 6003,
    BindFailed = 6004,
    PermissionDenied = 6005,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// `None` when no variant carries this number.
    pub fn from_u32(code: u32) -> Option<Self> {
        Self::try_from(code).ok()
    }

    /// Errors caused by the request rather than by the broker.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgs
                | Self::NotFound
                | Self::InvalidName
                | Self::MissingArgument
                | Self::MessageTooLarge
                | Self::MessageTooSmall
        )
    }

    /// HTTP status returned by the admin surface for this code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::InvalidArgs | Self::InvalidName | Self::MissingArgument => 400,
            Self::MessageTooLarge | Self::MessageTooSmall => 413,
            Self::Exiting | Self::StorageUnavailable => 503,
            _ => 500,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait implementations for StatusCode
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
