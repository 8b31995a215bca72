use lettre::smtp::authentication::{self, Mechanism};
use lettre::smtp::extension::ClientId;
use lettre::{ClientSecurity, ClientTlsParameters, SmtpClient, SmtpTransport};

use serde::Deserialize;

use crate::error::Error;

pub const SMTP_PORT: u16 = 25;
pub const SUBMISSION_PORT: u16 = 587;
pub const SUBMISSIONS_PORT: u16 = 465;

/// How the connection to the server is secured
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Plaintext only
    None,
    /// STARTTLS if the server offers it
    Opportunistic,
    /// STARTTLS, fail if unavailable
    Required,
    /// Implicit TLS from the first byte (SMTPS)
    Wrapper,
}

impl Default for Security {
    fn default() -> Self {
        Security::Opportunistic
    }
}

impl Security {
    pub fn default_port(self) -> u16 {
        match self {
            Security::None | Security::Opportunistic => SMTP_PORT,
            Security::Required => SUBMISSION_PORT,
            Security::Wrapper => SUBMISSIONS_PORT,
        }
    }
}

impl std::str::FromStr for Security {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Security::None),
            "opportunistic" => Ok(Security::Opportunistic),
            "required" => Ok(Security::Required),
            "wrapper" => Ok(Security::Wrapper),
            _ => Err(Error::Config(format!("Unknown security mode: {}", s))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMechanism {
    Plain,
    Login,
}

impl Default for AuthMechanism {
    fn default() -> Self {
        AuthMechanism::Plain
    }
}

impl From<AuthMechanism> for Mechanism {
    fn from(mechanism: AuthMechanism) -> Self {
        match mechanism {
            AuthMechanism::Plain => Mechanism::Plain,
            AuthMechanism::Login => Mechanism::Login,
        }
    }
}

/// SMTP endpoint, from either `host` or `host:port`
#[derive(Clone, Debug, PartialEq)]
pub struct Server {
    pub host: String,
    pub port: Option<u16>,
}

impl Server {
    pub fn parse(input: &str) -> Result<Server, Error> {
        let input = input.trim();

        let (host, port) = match input.rfind(':') {
            // A bare IPv6 address has more than one colon and no port
            Some(idx) if input[..idx].find(':').is_none() => {
                let port = input[idx + 1..]
                    .parse::<u16>()
                    .map_err(|_| Error::Config(format!("Invalid SMTP port in \"{}\"", input)))?;
                (&input[..idx], Some(port))
            }
            _ => (input, None),
        };

        if host.is_empty() {
            return Err(Error::Config("No SMTP server given".to_string()));
        }

        Ok(Server {
            host: host.to_string(),
            port,
        })
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Everything needed to open an authenticated connection to an SMTP server.
///
/// Credentials are mandatory: the transport never falls back to anonymous or
/// ambient credentials.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub server: Server,
    pub security: Security,
    pub credentials: Credentials,
    pub mechanism: Option<AuthMechanism>,
}

impl SmtpConfig {
    pub fn new(smtp_server: &str, username: &str, password: &str) -> Result<Self, Error> {
        Ok(Self {
            server: Server::parse(smtp_server)?,
            security: Security::default(),
            credentials: Credentials::new(username, password),
            mechanism: None,
        })
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    pub fn with_mechanism(mut self, mechanism: Option<AuthMechanism>) -> Self {
        self.mechanism = mechanism;
        self
    }

    pub fn port(&self) -> u16 {
        self.server.port.unwrap_or_else(|| self.security.default_port())
    }

    /// Mechanism used to authenticate, PLAIN unless configured otherwise
    pub fn auth_mechanism(&self) -> AuthMechanism {
        self.mechanism.unwrap_or_default()
    }

    fn client_security(&self) -> Result<ClientSecurity, Error> {
        if self.security == Security::None {
            return Ok(ClientSecurity::None);
        }

        let connector = native_tls::TlsConnector::new()?;
        let params = ClientTlsParameters::new(self.server.host.clone(), connector);

        Ok(match self.security {
            Security::Opportunistic => ClientSecurity::Opportunistic(params),
            Security::Required => ClientSecurity::Required(params),
            _ => ClientSecurity::Wrapper(params),
        })
    }

    /// Build a fresh network transport. Nothing is shared between calls.
    pub fn transport(&self) -> Result<SmtpTransport, Error> {
        let security = self.client_security()?;
        let addr = (self.server.host.as_str(), self.port());

        let creds = authentication::Credentials::new(
            self.credentials.username.clone(),
            self.credentials.password.clone(),
        );

        // Without an explicit mechanism lettre skips AUTH on plaintext
        // connections and delivers anonymously
        let client = SmtpClient::new(addr, security)
            .map_err(|e| Error::Connection(format!("{}:{}: {}", addr.0, addr.1, e)))?
            // NOTE: You can change this to any FQDN
            .hello_name(ClientId::hostname())
            .credentials(creds)
            .authentication_mechanism(self.auth_mechanism().into())
            .smtp_utf8(true);

        Ok(client.transport())
    }
}
