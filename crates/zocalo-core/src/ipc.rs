//! The inter-process bang-command transport record.
//!
//! A second shell process started with a `!command` argument forwards
//! the command to the running instance as a fixed-size record inside a
//! generic data-copy message. The record layout is stable:
//!
//! ```text
//! [size marker: u32][target window: u64][command: 64 bytes][args: 256 bytes]
//! ```
//!
//! Strings are UTF-8, NUL-padded to their fixed width. The size marker
//! lets the receiver reject records from mismatched senders.

use thiserror::Error;

/// Fixed width of the command field, terminator included.
pub const MAX_BANG_COMMAND: usize = 64;

/// Fixed width of the argument field, terminator included.
pub const MAX_BANG_ARGS: usize = 256;

/// Total record size on the wire.
pub const BANG_RECORD_SIZE: usize = 4 + 8 + MAX_BANG_COMMAND + MAX_BANG_ARGS;

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("bang command exceeds {MAX_BANG_COMMAND} bytes")]
    CommandTooLong,
    #[error("bang arguments exceed {MAX_BANG_ARGS} bytes")]
    ArgsTooLong,
    #[error("record size marker mismatch")]
    BadSize,
    #[error("record contains invalid UTF-8")]
    BadEncoding,
}

/// One bang command addressed to a running shell instance.
#[derive(Debug, Clone, PartialEq)]
pub struct BangCommandRecord {
    /// Window the command nominally originates from; 0 for none.
    pub target: u64,
    pub command: String,
    pub args: String,
}

impl BangCommandRecord {
    /// Builds a record, enforcing the fixed field widths. Each string
    /// must leave room for its NUL terminator.
    pub fn new(command: &str, args: &str) -> Result<Self, RecordError> {
        if command.len() >= MAX_BANG_COMMAND {
            return Err(RecordError::CommandTooLong);
        }
        if args.len() >= MAX_BANG_ARGS {
            return Err(RecordError::ArgsTooLong);
        }
        Ok(Self {
            target: 0,
            command: command.to_string(),
            args: args.to_string(),
        })
    }

    /// Serializes to the fixed-size wire image.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BANG_RECORD_SIZE);
        buf.extend_from_slice(&(BANG_RECORD_SIZE as u32).to_le_bytes());
        buf.extend_from_slice(&self.target.to_le_bytes());

        let mut field = [0u8; MAX_BANG_COMMAND];
        field[..self.command.len()].copy_from_slice(self.command.as_bytes());
        buf.extend_from_slice(&field);

        let mut field = [0u8; MAX_BANG_ARGS];
        field[..self.args.len()].copy_from_slice(self.args.as_bytes());
        buf.extend_from_slice(&field);

        buf
    }

    /// Parses a wire image, validating the size marker.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() != BANG_RECORD_SIZE {
            return Err(RecordError::BadSize);
        }
        let size = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if size as usize != BANG_RECORD_SIZE {
            return Err(RecordError::BadSize);
        }
        let target = u64::from_le_bytes(bytes[4..12].try_into().unwrap());

        let command = read_padded(&bytes[12..12 + MAX_BANG_COMMAND])?;
        let args = read_padded(&bytes[12 + MAX_BANG_COMMAND..])?;

        Ok(Self {
            target,
            command,
            args,
        })
    }
}

/// Extracts a NUL-padded UTF-8 string from a fixed-width field.
fn read_padded(field: &[u8]) -> Result<String, RecordError> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end])
        .map(str::to_string)
        .map_err(|_| RecordError::BadEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_wire_image() {
        let record = BangCommandRecord::new("!ReloadModule", r"C:\modules\clock.dll").unwrap();
        let bytes = record.to_bytes();
        assert_eq!(bytes.len(), BANG_RECORD_SIZE);
        assert_eq!(BangCommandRecord::from_bytes(&bytes).unwrap(), record);
    }

    #[test]
    fn oversized_fields_are_rejected_up_front() {
        let long = "x".repeat(MAX_BANG_COMMAND);
        assert_eq!(
            BangCommandRecord::new(&long, ""),
            Err(RecordError::CommandTooLong)
        );

        let long = "y".repeat(MAX_BANG_ARGS);
        assert_eq!(
            BangCommandRecord::new("!ok", &long),
            Err(RecordError::ArgsTooLong)
        );
    }

    #[test]
    fn wrong_size_marker_is_rejected() {
        let record = BangCommandRecord::new("!Recycle", "").unwrap();
        let mut bytes = record.to_bytes();
        bytes[0] = 1;
        assert_eq!(
            BangCommandRecord::from_bytes(&bytes),
            Err(RecordError::BadSize)
        );
        assert_eq!(
            BangCommandRecord::from_bytes(&bytes[..10]),
            Err(RecordError::BadSize)
        );
    }
}
