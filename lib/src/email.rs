use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use lettre::{EmailAddress, SendableEmail};
use lettre_email::{EmailBuilder, Mailbox, MimeMultipartType, PartBuilder};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::Error;
use crate::list::split_list;

/// Max length of a base64 line in an attachment part (RFC 2045)
const BASE64_LINE_LEN: usize = 76;

/// Characters that must be percent-encoded in an RFC 2231 parameter value
const ATTR_CHAR_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'{')
    .add(b'}');

/// A single mailbox, optionally with a display name.
#[derive(Clone, Debug, PartialEq)]
pub struct Address {
    pub name: Option<String>,
    pub address: String,
}

impl Address {
    /// Parse either `user@host` or `Display Name <user@host>`.
    pub fn parse(input: &str) -> Result<Address, Error> {
        let input = input.trim();

        // A line break here would end the header and start a new one
        if input.chars().any(char::is_control) {
            return Err(Error::InvalidAddress(input.to_string()));
        }

        let (name, address) = match (input.find('<'), input.ends_with('>')) {
            (Some(start), true) => {
                let name = input[..start].trim().trim_matches('"').trim();
                let address = input[start + 1..input.len() - 1].trim();
                let name = if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                };
                (name, address)
            }
            _ => (None, input),
        };

        // Use lettre's own validation so the envelope will accept it later on
        EmailAddress::new(address.to_string())
            .map_err(|_| Error::InvalidAddress(input.to_string()))?;

        Ok(Address {
            name,
            address: address.to_string(),
        })
    }

    fn to_mailbox(&self) -> Mailbox {
        match self.name {
            Some(ref name) => Mailbox::new_with_name(name.clone(), self.address.clone()),
            None => Mailbox::new(self.address.clone()),
        }
    }
}

/// A file attached to an outgoing email.
///
/// Timestamps come from the file's metadata at attach time and end up in the
/// part's Content-Disposition. Any of them may be missing if the platform
/// does not track it.
#[derive(Debug)]
pub struct Attachment {
    pub path: PathBuf,

    /// Filename advertised to the recipient
    pub name: String,

    /// Always application/octet-stream; content is never sniffed
    pub content_type: mime::Mime,

    pub created: Option<DateTime<Local>>,
    pub modified: Option<DateTime<Local>>,
    pub accessed: Option<DateTime<Local>>,

    pub data: Vec<u8>,
}

impl Attachment {
    /// Load an attachment from disk.
    ///
    /// Returns `Ok(None)` if nothing exists at `path`. That is not an error:
    /// the file is simply left out of the email.
    pub fn from_path(path: &Path) -> Result<Option<Attachment>, Error> {
        if !path.exists() {
            log::debug!("Skipping missing attachment: {}", path.display());
            return Ok(None);
        }

        let to_error = |e: std::io::Error| Error::Attachment {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let metadata = fs::metadata(path).map_err(to_error)?;
        let data = fs::read(path).map_err(to_error)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Some(Attachment {
            path: path.to_path_buf(),
            name,
            content_type: mime::APPLICATION_OCTET_STREAM,
            created: local_time(metadata.created()),
            modified: local_time(metadata.modified()),
            accessed: local_time(metadata.accessed()),
            data,
        }))
    }

    /// Attachment size, in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Content-Disposition header value, see RFC 2183
    pub fn disposition(&self) -> String {
        let fallback: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
            .collect();

        let mut value = format!(
            "attachment; filename=\"{}\"",
            fallback.replace('\\', "\\\\").replace('"', "\\\"")
        );

        // RFC 2231 form carries the real name when it is not plain ASCII
        if fallback != self.name {
            value.push_str(&format!(
                "; filename*=UTF-8''{}",
                utf8_percent_encode(&self.name, ATTR_CHAR_ESCAPES)
            ));
        }

        let dates = [
            ("creation-date", &self.created),
            ("modification-date", &self.modified),
            ("read-date", &self.accessed),
        ];

        for (param, date) in dates.iter() {
            if let Some(date) = date {
                value.push_str(&format!("; {}=\"{}\"", param, date.to_rfc2822()));
            }
        }

        value
    }

    fn to_part(&self) -> lettre_email::MimeMessage {
        PartBuilder::new()
            .body(encode_wrapped(&self.data))
            .header(("Content-Disposition", self.disposition()))
            .header(("Content-Type", self.content_type.to_string()))
            .header(("Content-Transfer-Encoding", "base64"))
            .build()
    }
}

fn local_time(time: std::io::Result<SystemTime>) -> Option<DateTime<Local>> {
    time.ok().map(DateTime::<Local>::from)
}

fn encode_wrapped(data: &[u8]) -> String {
    let encoded = base64::encode(data);
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LEN * 2);

    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % BASE64_LINE_LEN == 0 {
            wrapped.push_str("\r\n");
        }
        wrapped.push(c);
    }

    wrapped
}

/// An outgoing email. Built fresh for every send and dropped afterwards.
#[derive(Debug)]
pub struct Email {
    pub sender: Address,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub subject: String,

    /// Plaintext body, sent as UTF-8
    pub body: String,

    pub attachments: Vec<Attachment>,
}

impl Email {
    /// Build an email from the raw, `;`-delimited inputs.
    ///
    /// Empty list segments are ignored and attachment paths that do not exist
    /// are dropped. Any malformed address fails the whole email.
    pub fn compose(
        sender: &str,
        recipients: Option<&str>,
        cc: Option<&str>,
        subject: &str,
        body: &str,
        attachments: Option<&str>,
    ) -> Result<Email, Error> {
        if subject.contains(|c: char| c == '\r' || c == '\n') {
            return Err(Error::Build("Subject must not contain line breaks".to_string()));
        }

        let sender = Address::parse(sender)?;

        let to = split_list(recipients)
            .into_iter()
            .map(Address::parse)
            .collect::<Result<Vec<_>, _>>()?;

        let cc = split_list(cc)
            .into_iter()
            .map(Address::parse)
            .collect::<Result<Vec<_>, _>>()?;

        let mut files = Vec::new();
        for path in split_list(attachments) {
            if let Some(attachment) = Attachment::from_path(Path::new(path))? {
                files.push(attachment);
            }
        }

        Ok(Email {
            sender,
            to,
            cc,
            subject: subject.to_string(),
            body: body.to_string(),
            attachments: files,
        })
    }

    /// Render into a MIME message with an SMTP envelope.
    pub fn into_sendable(self) -> Result<SendableEmail, Error> {
        let mut builder = EmailBuilder::new()
            .from(self.sender.to_mailbox())
            .subject(self.subject)
            .text(self.body);

        for addr in self.to.iter() {
            builder = builder.to(addr.to_mailbox());
        }

        for addr in self.cc.iter() {
            builder = builder.cc(addr.to_mailbox());
        }

        if !self.attachments.is_empty() {
            builder = builder.message_type(MimeMultipartType::Mixed);
        }

        for attachment in self.attachments.iter() {
            builder = builder.child(attachment.to_part());
        }

        let email = builder.build().map_err(|e| Error::Build(e.to_string()))?;

        Ok(email.into())
    }
}
