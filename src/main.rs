// Purpose: Check the free space of one drive and email a localized alert when it reaches the limit

use std::path::PathBuf;

use clap::Parser;
use colored::*;
use log::{debug, error, info};

mod compose;
mod config;
mod error;
mod mailer;
mod pipeline;
mod probe;
mod system;
mod templates;
mod threshold;

#[cfg(unix)]
mod unix;
#[cfg(target_os = "windows")]
mod windows;

use error::Error;
use mailer::{Dispatcher, PreviewMailer, SmtpMailer};
use pipeline::{Outcome, RunContext};
use probe::SystemProbe;
use templates::TemplateRegistry;

/// Check free disk space and send an email alert when it drops to the limit
#[derive(Parser)]
#[command(name = "hddwatcher")]
#[command(about = "Check free disk space and notify a recipient list when it reaches the limit")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, or YAML when the extension is .yaml/.yml)
    #[arg(short, long, default_value = config::CONFIG_PATH)]
    config: PathBuf,
    /// Send the notification regardless of the limit (for testing SMTP settings)
    #[arg(long)]
    force_mail: bool,
}

// Check if terminal supports colors
fn supports_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("TERM").is_ok() && cfg!(unix) {
        return true;
    }
    if cfg!(windows) {
        if let Ok(term_program) = std::env::var("TERM_PROGRAM") {
            return term_program == "vscode" || term_program == "WindowsTerminal";
        }
        if let Ok(wt_session) = std::env::var("WT_SESSION") {
            return !wt_session.is_empty();
        }
    }
    false
}

fn init_colors() {
    if !supports_colors() {
        colored::control::set_override(false);
    }
}

fn fail(err: &Error) -> ! {
    error!("{err}");
    eprintln!("{} {}", "ERROR".red().bold(), err);
    std::process::exit(err.exit_code());
}

fn main() {
    let cli = Cli::parse();

    // Load and validate configuration first to pick the log level
    let cfg = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Configuration error:".red().bold(), e);
            std::process::exit(2);
        }
    };

    let debug = cfg.debug.unwrap_or(false);
    let log_level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    init_colors();
    info!("Read config from {}", cli.config.display());

    let registry = match TemplateRegistry::builtin() {
        Ok(registry) => registry,
        Err(e) => fail(&Error::from(e)),
    };
    if let Err(e) = config::validate_language(&cfg, &registry) {
        fail(&Error::from(e));
    }
    info!(
        "Config is valid: drive {}, limit {} bytes, language {}, {} recipient(s)",
        cfg.drive.path,
        cfg.drive.limit_bytes,
        cfg.mail.lang,
        cfg.mail.recipient_list.len()
    );

    let system_info = system::get_system_info();
    debug!("System info: {:#?}", system_info);
    info!(
        "System: {} {} {} ({})",
        system_info.os_name, system_info.os_version, system_info.architecture, system_info.hostname
    );

    let ctx = RunContext {
        hostname: system_info.hostname,
        version: Some(format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))),
        force: cli.force_mail,
    };

    let dispatcher: Box<dyn Dispatcher> = if cfg.mail.is_enabled() {
        Box::new(SmtpMailer)
    } else {
        println!("{} Mail is disabled, the notification will be printed.", "[TEST MODE]".yellow().bold());
        Box::new(PreviewMailer)
    };

    match pipeline::run(&cfg, &SystemProbe, &registry, dispatcher.as_ref(), &ctx) {
        Ok(Outcome::Skipped { free, limit }) => {
            println!(
                "{} {} free on {} (limit {}), no notification sent.",
                "OK".green().bold(),
                compose::human_bytes(free).cyan(),
                cfg.drive.path,
                compose::human_bytes(limit)
            );
        }
        Ok(Outcome::Notified { recipients, elapsed }) => {
            println!(
                "{} Notification for {} sent to {} recipient(s) in {:.2?}{}",
                "SUCCESS".green().bold(),
                cfg.drive.path.cyan(),
                recipients.to_string().cyan(),
                elapsed,
                if cli.force_mail { " (forced)".yellow() } else { "".normal() }
            );
        }
        Ok(Outcome::Previewed { recipients }) => {
            println!(
                "{} Notification for {} rendered for {} recipient(s), not sent (mail disabled).",
                "[TEST MODE]".yellow().bold(),
                cfg.drive.path.cyan(),
                recipients.to_string().cyan()
            );
        }
        Err(e) => fail(&e),
    }
}
