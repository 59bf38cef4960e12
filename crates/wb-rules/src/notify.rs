//! Mail and SMS notifications
//!
//! Mail goes out as one shell invocation per message. SMS delivery is
//! serialized through a single-flight queue so the modem command never runs
//! twice at once; messages are sent in submission order and a failed send
//! still lets the next one through. Delivery is best-effort: failures are
//! logged, never retried and never reported to the caller.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::NotifyConfig;
use crate::error::{RuleError, RuleResult};
use crate::queue::SingleFlightQueue;
use crate::spawn::{ProcessExit, SpawnOptions, Spawner};

/// Notification delivery method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyMethod {
    Email,
    Sms,
}

impl NotifyMethod {
    pub const EMAIL: &'static str = "email";
    pub const SMS: &'static str = "sms";

    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyMethod::Email => Self::EMAIL,
            NotifyMethod::Sms => Self::SMS,
        }
    }
}

impl FromStr for NotifyMethod {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::EMAIL => Ok(NotifyMethod::Email),
            Self::SMS => Ok(NotifyMethod::Sms),
            other => Err(RuleError::UnknownNotificationMethod(other.to_string())),
        }
    }
}

impl fmt::Display for NotifyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct SmsRequest {
    to: String,
    text: String,
}

/// Notification dispatcher owning the SMS queue
pub struct Notifier {
    spawner: Arc<Spawner>,
    config: NotifyConfig,
    sms: Arc<SingleFlightQueue<SmsRequest>>,
}

impl Notifier {
    pub fn new(spawner: Arc<Spawner>, config: NotifyConfig) -> Self {
        let sms_spawner = spawner.clone();
        let sms_config = config.clone();
        let sms = SingleFlightQueue::new(move |request: SmsRequest, completion| {
            debug!(to = %request.to, text = %request.text, "Sending SMS");
            let to = request.to.clone();
            let options = SpawnOptions::new()
                .capture_output(true)
                .capture_error_output(true)
                .input(request.text)
                .on_exit(move |exit| {
                    log_failure("sms", &to, &exit);
                    completion.finish();
                    Ok(())
                });
            sms_spawner.run_shell_command(&sms_config.sms_command(&request.to), options);
        });

        Self {
            spawner,
            config,
            sms,
        }
    }

    /// Send a notification
    ///
    /// `method` is `"email"` or `"sms"`. For SMS a non-empty subject is
    /// prefixed to the text as `"<subject>: <text>"`.
    pub fn send(
        &self,
        method: &str,
        to: &str,
        subject: Option<&str>,
        text: &str,
    ) -> RuleResult<()> {
        match method.parse::<NotifyMethod>()? {
            NotifyMethod::Email => self.send_email(to, subject.unwrap_or_default(), text),
            NotifyMethod::Sms => {
                let text = match subject.filter(|s| !s.is_empty()) {
                    Some(subject) => format!("{subject}: {text}"),
                    None => text.to_string(),
                };
                self.send_sms(to, text);
            }
        }
        Ok(())
    }

    /// Whether an SMS send is in flight
    pub fn sms_in_flight(&self) -> bool {
        self.sms.is_busy()
    }

    /// Number of SMS sends waiting behind the in-flight one
    pub fn sms_pending(&self) -> usize {
        self.sms.pending()
    }

    fn send_email(&self, to: &str, subject: &str, text: &str) {
        debug!(to, subject, "Sending email");
        let recipient = to.to_string();
        let options = SpawnOptions::new()
            .capture_output(true)
            .capture_error_output(true)
            .input(format!("Subject: {subject}\n\n{text}"))
            .on_exit(move |exit| {
                log_failure("email", &recipient, &exit);
                Ok(())
            });
        self.spawner.run_shell_command(&self.config.email_command(to), options);
    }

    fn send_sms(&self, to: &str, text: String) {
        if self.sms.is_busy() {
            debug!(to, text = %text, "Queueing SMS");
        }
        self.sms.submit(SmsRequest {
            to: to.to_string(),
            text,
        });
    }
}

fn log_failure(kind: &str, to: &str, exit: &ProcessExit) {
    if exit.exit_status != 0 {
        error!(
            kind,
            to,
            exit_status = exit.exit_status,
            output = exit.output.as_deref().unwrap_or_default(),
            error_output = exit.error_output.as_deref().unwrap_or_default(),
            "Error sending notification"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method() {
        assert_eq!("email".parse::<NotifyMethod>().unwrap(), NotifyMethod::Email);
        assert_eq!("sms".parse::<NotifyMethod>().unwrap(), NotifyMethod::Sms);
        assert_eq!(
            "pigeon".parse::<NotifyMethod>().unwrap_err(),
            RuleError::UnknownNotificationMethod("pigeon".to_string())
        );
        assert_eq!(NotifyMethod::Sms.to_string(), "sms");
    }
}
