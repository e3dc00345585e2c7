use std::net::SocketAddr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("{key} is required when DEBUG is off")]
    Missing { key: &'static str },

    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("APP_BIND must be a loopback address, got {0}")]
    PublicBind(SocketAddr),

    #[error("SECRET_KEY looks like a development key; set a real one or enable DEBUG")]
    InsecureSecret,
}
