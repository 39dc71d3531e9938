use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(
        "API credentials not found. Set PARLEY_API_KEY and PARLEY_API_SECRET or configure ~/.config/parley/config.toml"
    )]
    CredentialsNotFound,

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session store error: {0}")]
    Store(#[from] parley_core::StoreError),

    #[error("{0}")]
    Chat(#[from] parley_core::ChatError),
}
