//! Application error type.
//!
//! Every fallible operation surfaces an `AppError` carrying the process exit
//! code alongside a human-readable message:
//!
//! - `2`: bad input (missing file, invalid flag values, unreadable JSON)
//! - `3`: no usable data after ingest
//! - `4`: fitting or numeric failure
//! - `5`: the transistor is not in saturation at the solved operating point

use crate::stage::RegionError;

pub const EXIT_INPUT: u8 = 2;
pub const EXIT_NO_DATA: u8 = 3;
pub const EXIT_NUMERIC: u8 = 4;
pub const EXIT_REGION: u8 = 5;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    pub fn numeric(message: impl Into<String>) -> Self {
        Self::new(EXIT_NUMERIC, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<RegionError> for AppError {
    fn from(err: RegionError) -> Self {
        Self::new(EXIT_REGION, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_errors_map_to_region_exit_code() {
        let err: AppError = RegionError::Cutoff.into();
        assert_eq!(err.exit_code(), EXIT_REGION);
        assert_eq!(err.to_string(), "Transistor in cutoff");
    }
}
