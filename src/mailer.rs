use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{Message, SmtpTransport, Transport};
use log::{debug, info};

use crate::config::{MailConfig, SmtpSecurity};
use crate::error::DispatchError;

/// Subject and HTML body ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// What a dispatcher did with a message it accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the SMTP server.
    Sent,
    /// Printed locally, nothing left the host.
    Previewed,
}

pub trait Dispatcher {
    fn send(&self, mail: &MailConfig, message: &RenderedMessage) -> Result<Delivery, DispatchError>;
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DispatchError> {
    address.parse().map_err(|source| DispatchError::Address {
        address: address.to_string(),
        source,
    })
}

/// Build the message with every recipient as blind copy.
///
/// The recipients end up in the SMTP envelope only. No `To`/`Cc`/`Bcc`
/// header is written, so nobody sees who else was notified.
pub fn build_message(mail: &MailConfig, message: &RenderedMessage) -> Result<Message, DispatchError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&mail.sender)?)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_HTML);

    for addr in mail.recipient_list.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
        builder = builder.bcc(parse_mailbox(addr)?);
    }

    Ok(builder.body(message.body.clone())?)
}

fn transport(mail: &MailConfig) -> Result<SmtpTransport, DispatchError> {
    let builder = match mail.security {
        SmtpSecurity::None => SmtpTransport::builder_dangerous(&mail.server),
        SmtpSecurity::Starttls => SmtpTransport::starttls_relay(&mail.server)?,
        SmtpSecurity::Ssl => SmtpTransport::relay(&mail.server)?,
    };
    let mut builder = builder.port(mail.port);
    if mail.uses_auth() {
        builder = builder
            .credentials(Credentials::new(mail.username.clone(), mail.password.clone()))
            .authentication(vec![Mechanism::Plain]);
    }
    Ok(builder.build())
}

/// Single-attempt delivery over SMTP.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmtpMailer;

impl Dispatcher for SmtpMailer {
    fn send(&self, mail: &MailConfig, message: &RenderedMessage) -> Result<Delivery, DispatchError> {
        let email = build_message(mail, message)?;
        debug!(
            "Connecting to {}:{} (security: {:?})",
            mail.server, mail.port, mail.security
        );
        let mailer = transport(mail)?;
        mailer.send(&email)?;
        Ok(Delivery::Sent)
    }
}

/// Stand-in used when mail is disabled: prints the message instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreviewMailer;

impl Dispatcher for PreviewMailer {
    fn send(&self, mail: &MailConfig, message: &RenderedMessage) -> Result<Delivery, DispatchError> {
        let email = build_message(mail, message)?;
        info!(
            "Mail disabled, not contacting {}:{}. Envelope has {} recipient(s).",
            mail.server,
            mail.port,
            email.envelope().to().len()
        );
        println!("{}", String::from_utf8_lossy(&email.formatted()));
        Ok(Delivery::Previewed)
    }
}
