use thiserror::Error;
use tvscan_core::{CoreError, ValidationError, WriterError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<WriterError> for CliError {
    fn from(error: WriterError) -> Self {
        Self::Core(CoreError::Writer(error))
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_)
            | Self::Core(CoreError::Validation(_))
            | Self::Core(CoreError::Writer(WriterError::Validation(_))) => 2,
            Self::Serialization(_)
            | Self::Core(CoreError::Serialization(_))
            | Self::Core(CoreError::Writer(WriterError::Serialization(_))) => 4,
            Self::Command(_) | Self::Io(_) | Self::Core(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_inner_cause() {
        let validation = CliError::from(ValidationError::EmptySymbol);
        assert_eq!(validation.exit_code(), 2);

        let nested = CliError::from(WriterError::Validation(ValidationError::EmptySymbol));
        assert_eq!(nested.exit_code(), 2);

        let serialization =
            CliError::from(serde_json::from_str::<u8>("x").expect_err("invalid json"));
        assert_eq!(serialization.exit_code(), 4);

        let io = CliError::from(std::io::Error::other("disk"));
        assert_eq!(io.exit_code(), 10);
    }
}
