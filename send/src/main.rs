use std::io::Read;

use structopt::StructOpt;

use mailutil::config::{load_settings, Settings};
use mailutil::{Security, SmtpConfig};

// See sysexits.h
const USAGE: i32 = 64;
const UNAVAILABLE: i32 = 69;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "mailutil-send",
    about = "Send an email with attachments through an SMTP server."
)]
struct Opt {
    /// Sender address
    #[structopt(short, long)]
    from: String,

    /// Recipients, separated by ';'
    #[structopt(short, long, default_value = "")]
    to: String,

    /// CC recipients, separated by ';'
    #[structopt(short, long, default_value = "")]
    cc: String,

    #[structopt(short, long, default_value = "")]
    subject: String,

    /// Message body. Read from stdin if not given.
    #[structopt(short, long)]
    body: Option<String>,

    /// Files to attach, separated by ';'. Missing files are skipped.
    #[structopt(short, long, default_value = "")]
    attachments: String,

    #[structopt(short, long)]
    username: Option<String>,

    #[structopt(short, long)]
    password: Option<String>,

    /// SMTP server, as host or host:port
    #[structopt(long)]
    server: Option<String>,

    /// none, opportunistic, required or wrapper
    #[structopt(long)]
    security: Option<Security>,

    /// Settings file (TOML)
    #[structopt(long)]
    config: Option<String>,
}

/// Merge command-line flags over file/env settings.
fn smtp_config(opt: &Opt, settings: Settings) -> Result<SmtpConfig, String> {
    let server = opt
        .server
        .clone()
        .or(settings.server)
        .ok_or("No SMTP server given")?;
    let username = opt
        .username
        .clone()
        .or(settings.username)
        .ok_or("No SMTP username given")?;
    let password = opt
        .password
        .clone()
        .or(settings.password)
        .ok_or("No SMTP password given")?;

    let config = SmtpConfig::new(&server, &username, &password)
        .map_err(|e| e.to_string())?
        .with_security(opt.security.unwrap_or(settings.security))
        .with_mechanism(settings.mechanism);

    Ok(config)
}

fn run(opt: Opt) -> i32 {
    let settings = match load_settings(opt.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("{}", err);
            return USAGE;
        }
    };

    let config = match smtp_config(&opt, settings) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            return USAGE;
        }
    };

    let body = match opt.body {
        Some(ref body) => body.clone(),
        None => {
            let mut body = String::new();
            if let Err(err) = std::io::stdin().read_to_string(&mut body) {
                log::error!("Failed to read email body from stdin: {}", err);
                return USAGE;
            }
            body
        }
    };

    let sent = mailutil::send_email_with(
        &config,
        &opt.from,
        Some(&opt.to),
        Some(&opt.cc),
        &opt.subject,
        &body,
        Some(&opt.attachments),
    );

    if sent {
        log::info!("Email sent");
        0
    } else {
        UNAVAILABLE
    }
}

fn main() {
    // Init logger
    env_logger::builder().format_timestamp_micros().init();

    let opt = Opt::from_args();

    std::process::exit(run(opt));
}

#[cfg(test)]
mod test {
    use super::*;

    fn opt(args: &[&str]) -> Opt {
        let mut argv = vec!["mailutil-send", "--from", "a@x.com"];
        argv.extend_from_slice(args);
        Opt::from_iter(argv)
    }

    #[test]
    fn flags_override_settings() {
        let settings = Settings {
            server: Some("smtp.example.com".to_string()),
            username: Some("settings-user".to_string()),
            password: Some("settings-pass".to_string()),
            security: Security::Required,
            mechanism: None,
        };

        let opt = opt(&["--server", "mx.example.org:2525", "--security", "wrapper"]);
        let config = smtp_config(&opt, settings).unwrap();

        assert_eq!(config.server.host, "mx.example.org");
        assert_eq!(config.port(), 2525);
        assert_eq!(config.security, Security::Wrapper);
        assert_eq!(config.credentials.username, "settings-user");
    }

    #[test]
    fn missing_server() {
        let opt = opt(&["--username", "u", "--password", "p"]);
        assert!(smtp_config(&opt, Settings::default()).is_err());
    }

    #[test]
    fn list_defaults() {
        let opt = opt(&["--to", "b@x.com;c@x.com"]);
        assert_eq!(opt.to, "b@x.com;c@x.com");
        assert_eq!(opt.cc, "");
        assert_eq!(opt.attachments, "");
        assert!(opt.body.is_none());
    }
}
