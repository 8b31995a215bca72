//! Compose an email from plain string inputs and hand it to an SMTP server.
//!
//! Recipient, CC and attachment lists are `;`-delimited. Attachment paths
//! that do not exist are skipped. Everything else that goes wrong ends up
//! in the log and as a `false` return from [`send_email`].
use lettre::Transport;

pub mod config;
pub mod email;
pub mod error;
pub mod list;
pub mod smtp;

pub use email::{Address, Attachment, Email};
pub use error::Error;
pub use smtp::{AuthMechanism, Credentials, Security, Server, SmtpConfig};

/// Send an email and report only whether it went through.
///
/// Uses the default connection security (STARTTLS when offered) and
/// authenticates with `username`/`password`. The cause of a failure is
/// logged, not returned; use [`try_send_email`] to get it.
#[allow(clippy::too_many_arguments)]
pub fn send_email(
    sender: &str,
    recipients: Option<&str>,
    cc: Option<&str>,
    subject: &str,
    body: &str,
    attachments: Option<&str>,
    username: &str,
    password: &str,
    smtp_server: &str,
) -> bool {
    let config = match SmtpConfig::new(smtp_server, username, password) {
        Ok(config) => config,
        Err(err) => {
            log_failure(&err);
            return false;
        }
    };

    send_email_with(&config, sender, recipients, cc, subject, body, attachments)
}

/// Same as [`send_email`], with an explicit transport configuration.
pub fn send_email_with(
    config: &SmtpConfig,
    sender: &str,
    recipients: Option<&str>,
    cc: Option<&str>,
    subject: &str,
    body: &str,
    attachments: Option<&str>,
) -> bool {
    match try_send_email(config, sender, recipients, cc, subject, body, attachments) {
        Ok(()) => true,
        Err(err) => {
            log_failure(&err);
            false
        }
    }
}

/// Compose and send an email, returning the cause on failure.
///
/// The call blocks until the server accepts or rejects the message.
pub fn try_send_email(
    config: &SmtpConfig,
    sender: &str,
    recipients: Option<&str>,
    cc: Option<&str>,
    subject: &str,
    body: &str,
    attachments: Option<&str>,
) -> Result<(), Error> {
    let email = Email::compose(sender, recipients, cc, subject, body, attachments)?;

    let mut transport = config.transport()?;

    log::debug!(
        "Sending email from {} via {}:{}",
        email.sender.address,
        config.server.host,
        config.port()
    );

    deliver(&mut transport, email)
}

/// Hand a composed email to any lettre transport.
pub fn deliver<'a, T, R, E>(transport: &mut T, email: Email) -> Result<(), Error>
where
    T: Transport<'a, Result = Result<R, E>>,
    R: std::fmt::Debug,
    E: Into<Error>,
{
    let sendable = email.into_sendable()?;
    let message_id = sendable.message_id().to_string();

    match transport.send(sendable) {
        Ok(response) => {
            log::debug!("Email {} sent: {:?}", message_id, response);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn log_failure(err: &Error) {
    log::error!("Could not send email: {}", err);
    log::debug!("{:?}", err);
}
