use derive_more::{Display, From};

/// Anything that can stop a setup run.
#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    #[display("{_0}")]
    Config(crate::config::ConfigError),

    #[from]
    #[display("{_0}")]
    Client(crate::clients::ApiError),

    #[from]
    #[display("{_0}")]
    Setup(crate::setup::SetupError),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Client(e) => Some(e),
            Error::Setup(e) => Some(e),
        }
    }
}
