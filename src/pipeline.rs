use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::compose::{compose, human_bytes};
use crate::config::Config;
use crate::error::Error;
use crate::mailer::{Delivery, Dispatcher, RenderedMessage};
use crate::probe::DiskProbe;
use crate::templates::TemplateRegistry;
use crate::threshold::should_notify;

/// Per-run facts that do not come from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub hostname: String,
    pub version: Option<String>,
    /// Send even when free space is above the limit.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped { free: u64, limit: u64 },
    Notified { recipients: usize, elapsed: Duration },
    /// Mail is disabled: the message was rendered and printed, not sent.
    Previewed { recipients: usize },
}

/// One check-and-notify cycle: probe, evaluate, then compose, render and
/// dispatch only when the limit has been reached. The first failure ends
/// the run.
pub fn run<P, D>(
    config: &Config,
    probe: &P,
    registry: &TemplateRegistry,
    dispatcher: &D,
    ctx: &RunContext,
) -> Result<Outcome, Error>
where
    P: DiskProbe + ?Sized,
    D: Dispatcher + ?Sized,
{
    let drive = &config.drive;

    let sample = probe.probe(&drive.path)?;
    sample.check_consistent(&drive.path)?;
    debug!("Raw sample for {}: {:?}", drive.path, sample);
    info!(
        "Free space on {}: {} of {} total",
        drive.path,
        human_bytes(sample.usable()),
        human_bytes(sample.total)
    );

    if !should_notify(sample.usable(), drive.limit_bytes) {
        if !ctx.force {
            info!(
                "Free space {} is greater than the limit {}, no notification needed",
                human_bytes(sample.usable()),
                human_bytes(drive.limit_bytes)
            );
            return Ok(Outcome::Skipped {
                free: sample.usable(),
                limit: drive.limit_bytes,
            });
        }
        warn!("Limit not reached, notifying anyway (forced)");
    } else {
        info!(
            "Free space {} is at or below the limit {}, notifying",
            human_bytes(sample.usable()),
            human_bytes(drive.limit_bytes)
        );
    }

    let input = compose(&sample, drive, &ctx.hostname, ctx.version.as_deref())?;

    let lang = config.mail.lang.as_str();
    let message = RenderedMessage {
        subject: registry.subject_for(lang).unwrap_or_default().to_string(),
        body: registry.render(lang, &input)?,
    };

    let recipients = config
        .mail
        .recipient_list
        .iter()
        .filter(|r| !r.trim().is_empty())
        .count();
    info!("Sending notification to {recipients} recipient(s)");

    let started = Instant::now();
    match dispatcher.send(&config.mail, &message)? {
        Delivery::Sent => {
            let elapsed = started.elapsed();
            info!("Notification handed to {}:{} in {:?}", config.mail.server, config.mail.port, elapsed);
            Ok(Outcome::Notified { recipients, elapsed })
        }
        Delivery::Previewed => {
            info!("Notification rendered for {recipients} recipient(s) but not sent");
            Ok(Outcome::Previewed { recipients })
        }
    }
}
