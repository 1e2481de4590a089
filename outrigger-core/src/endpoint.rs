//! Transport endpoint addressing.
//!
//! Addresses are parsed up front so that a malformed address is rejected
//! before it ever reaches a transport call.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// A parsed transport address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// TCP transport: `tcp://host:port`
    Tcp(SocketAddr),
    /// Unix domain socket: `ipc:///path/to/socket`
    #[cfg(unix)]
    Ipc(PathBuf),
    /// In-process transport: `inproc://name`
    Inproc(String),
}

impl Endpoint {
    /// Parse an endpoint from a string.
    ///
    /// Supported formats:
    /// - `tcp://127.0.0.1:5555` (or `tcp://[::1]:5555`)
    /// - `ipc:///tmp/socket.sock` (Unix only)
    /// - `inproc://name`
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] for an unknown scheme, an unparsable TCP
    /// address, or an empty inproc name.
    pub fn parse(s: &str) -> Result<Self, EndpointError> {
        s.parse()
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(addr) = s.strip_prefix("tcp://") {
            let socket_addr = addr
                .parse::<SocketAddr>()
                .map_err(|_| EndpointError::InvalidTcpAddress(addr.to_string()))?;
            Ok(Self::Tcp(socket_addr))
        } else if let Some(path) = s.strip_prefix("ipc://") {
            #[cfg(unix)]
            {
                Ok(Self::Ipc(PathBuf::from(path)))
            }
            #[cfg(not(unix))]
            {
                let _ = path;
                Err(EndpointError::IpcNotSupported)
            }
        } else if let Some(name) = s.strip_prefix("inproc://") {
            if name.is_empty() {
                Err(EndpointError::EmptyInprocName)
            } else {
                Ok(Self::Inproc(name.to_string()))
            }
        } else {
            Err(EndpointError::InvalidScheme(s.to_string()))
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{addr}"),
            #[cfg(unix)]
            Self::Ipc(path) => write!(f, "ipc://{}", path.display()),
            Self::Inproc(name) => write!(f, "inproc://{name}"),
        }
    }
}

/// Endpoint parse errors.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("invalid scheme in endpoint: {0} (expected tcp://, ipc://, or inproc://)")]
    InvalidScheme(String),

    #[error("invalid TCP address: {0}")]
    InvalidTcpAddress(String),

    #[error("inproc endpoint name cannot be empty")]
    EmptyInprocName,

    #[error("IPC transport not supported on this platform")]
    IpcNotSupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tcp() {
        let ep = Endpoint::parse("tcp://127.0.0.1:5555").unwrap();
        assert!(matches!(ep, Endpoint::Tcp(_)));
        assert_eq!(ep.to_string(), "tcp://127.0.0.1:5555");

        let ep6 = Endpoint::parse("tcp://[::1]:5555").unwrap();
        assert!(matches!(ep6, Endpoint::Tcp(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_ipc() {
        let ep = Endpoint::parse("ipc:///tmp/test.sock").unwrap();
        assert!(matches!(ep, Endpoint::Ipc(_)));
        assert_eq!(ep.to_string(), "ipc:///tmp/test.sock");
    }

    #[test]
    fn test_parse_inproc() {
        let ep = Endpoint::parse("inproc://pair-a").unwrap();
        assert_eq!(ep, Endpoint::Inproc("pair-a".to_string()));
        assert_eq!(ep.to_string(), "inproc://pair-a");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            Endpoint::parse("http://127.0.0.1:80"),
            Err(EndpointError::InvalidScheme(_))
        ));
        assert!(matches!(
            Endpoint::parse("tcp://nonsense:port"),
            Err(EndpointError::InvalidTcpAddress(_))
        ));
        assert!(matches!(
            Endpoint::parse("inproc://"),
            Err(EndpointError::EmptyInprocName)
        ));
    }
}
