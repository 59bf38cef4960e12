//! Engine configuration

use serde::{Deserialize, Serialize};

/// Default shell for `run_shell_command`
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Default local mail transfer command
pub const DEFAULT_SENDMAIL_COMMAND: &str = "/usr/sbin/sendmail";

/// Default SMS delivery command; `{to}` is replaced by the quoted recipient
pub const DEFAULT_SMS_COMMAND: &str = "wb-gsm restart_if_broken && gammu sendsms TEXT {to} -unicode";

/// Configuration for a rule engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Shell used for shell commands
    pub shell: String,

    /// Notification delivery commands
    pub notify: NotifyConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            notify: NotifyConfig::default(),
        }
    }
}

/// Commands used to deliver notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Mail transfer command; the quoted recipient is appended
    pub sendmail_command: String,

    /// SMS command template containing `{to}`
    pub sms_command: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            sendmail_command: DEFAULT_SENDMAIL_COMMAND.to_string(),
            sms_command: DEFAULT_SMS_COMMAND.to_string(),
        }
    }
}

impl NotifyConfig {
    /// Shell command delivering mail to `to`
    pub fn email_command(&self, to: &str) -> String {
        format!("{} {}", self.sendmail_command, shell_quote(to))
    }

    /// Shell command delivering an SMS to `to`
    pub fn sms_command(&self, to: &str) -> String {
        self.sms_command.replace("{to}", &shell_quote(to))
    }
}

/// Quote `s` as a single shell word
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
