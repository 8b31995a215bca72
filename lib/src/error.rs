use std::error;
use std::fmt;

/// All possible mailutil errors.
/// Each variant names the stage that failed and carries a message for logging.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    InvalidAddress(String),
    Attachment { path: String, message: String },
    Build(String),
    Connection(String),
    Transport(String),
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidAddress(ref addr) => write!(f, "InvalidAddress: \"{}\"", addr),
            Error::Attachment {
                ref path,
                ref message,
            } => write!(f, "Attachment: {}: {}", path, message),
            Error::Build(ref msg) => write!(f, "Build: {}", msg),
            Error::Connection(ref msg) => write!(f, "Connection: {}", msg),
            Error::Transport(ref msg) => write!(f, "Transport: {}", msg),
            Error::Config(ref msg) => write!(f, "Config: {}", msg),
        }
    }
}

impl error::Error for Error {}

impl From<lettre::smtp::error::Error> for Error {
    fn from(err: lettre::smtp::error::Error) -> Self {
        use lettre::smtp::error::Error as SmtpError;

        match err {
            SmtpError::Io(ref e) => Self::Connection(e.to_string()),
            SmtpError::Resolution => Self::Connection("Could not resolve hostname".to_string()),
            _ => Self::Transport(err.to_string()),
        }
    }
}

impl From<native_tls::Error> for Error {
    fn from(err: native_tls::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_names_stage() {
        let err = Error::InvalidAddress("not-an-address".to_string());
        assert_eq!(err.to_string(), "InvalidAddress: \"not-an-address\"");

        let err = Error::Attachment {
            path: "/tmp/x".to_string(),
            message: "Permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "Attachment: /tmp/x: Permission denied");

        assert!(Error::Transport("refused".to_string())
            .to_string()
            .starts_with("Transport: "));
    }

    #[test]
    fn refused_connection_is_connection_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Connection refused");
        let err: Error = lettre::smtp::error::Error::Io(io).into();

        assert_eq!(err, Error::Connection("Connection refused".to_string()));
        assert!(err.to_string().starts_with("Connection: "));
    }

    #[test]
    fn unresolved_host_is_connection_error() {
        let err: Error = lettre::smtp::error::Error::Resolution.into();
        assert!(match err {
            Error::Connection(_) => true,
            _ => false,
        });
    }
}
