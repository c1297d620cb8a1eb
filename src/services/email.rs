// src/services/email.rs
use async_trait::async_trait;
use tracing::info;

use crate::common::safe_email_log;

/// Outbound email seam
///
/// Delivery providers plug in here; the shipped implementation only logs.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

/// Writes outgoing mail to the log instead of delivering it
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        info!(
            to = %safe_email_log(to),
            subject = %subject,
            body_len = html_body.len(),
            "📧 Email queued (log mailer)"
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EmailTemplate {
    pub subject: String,
    pub body: String,
}

fn wrap(title: &str, header_color: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background-color: {}; color: white; padding: 20px; text-align: center; }}
        .content {{ padding: 20px; background-color: #f9f9f9; }}
        .code {{ font-size: 28px; letter-spacing: 6px; font-weight: bold; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{}</h1>
        </div>
        <div class="content">
            {}
        </div>
    </div>
</body>
</html>"#,
        header_color, title, content
    )
}

pub fn otp_template(name: &str, code: &str, ttl_minutes: u64) -> EmailTemplate {
    EmailTemplate {
        subject: "Your verification code".to_string(),
        body: wrap(
            "Verify your email",
            "#4F46E5",
            &format!(
                r#"<p>Hi {},</p>
            <p>Use this code to verify your email address:</p>
            <p class="code">{}</p>
            <p>The code expires in {} minutes. If you did not create an account, ignore this email.</p>"#,
                name, code, ttl_minutes
            ),
        ),
    }
}

pub fn interview_scheduled_template(
    candidate_name: &str,
    job_title: &str,
    start_at: &str,
    end_at: &str,
    mode: &str,
    location: Option<&str>,
) -> EmailTemplate {
    let location_line = location
        .map(|l| format!("<p><strong>Where:</strong> {}</p>", l))
        .unwrap_or_default();

    EmailTemplate {
        subject: format!("Interview Scheduled - {}", job_title),
        body: wrap(
            "Interview Scheduled",
            "#4F46E5",
            &format!(
                r#"<p>Dear {},</p>
            <p>Your interview for <strong>{}</strong> has been scheduled.</p>
            <p><strong>From:</strong> {}<br><strong>To:</strong> {}<br><strong>Format:</strong> {}</p>
            {}
            <p>Best regards,<br>Hiring Team</p>"#,
                candidate_name, job_title, start_at, end_at, mode, location_line
            ),
        ),
    }
}

pub fn interview_rescheduled_template(
    candidate_name: &str,
    job_title: &str,
    start_at: &str,
    end_at: &str,
) -> EmailTemplate {
    EmailTemplate {
        subject: format!("Interview Rescheduled - {}", job_title),
        body: wrap(
            "Interview Rescheduled",
            "#F59E0B",
            &format!(
                r#"<p>Dear {},</p>
            <p>Your interview for <strong>{}</strong> has moved.</p>
            <p><strong>New time:</strong> {} to {}</p>
            <p>Best regards,<br>Hiring Team</p>"#,
                candidate_name, job_title, start_at, end_at
            ),
        ),
    }
}

pub fn interview_cancelled_template(
    candidate_name: &str,
    job_title: &str,
    start_at: &str,
) -> EmailTemplate {
    EmailTemplate {
        subject: format!("Interview Cancelled - {}", job_title),
        body: wrap(
            "Interview Cancelled",
            "#EF4444",
            &format!(
                r#"<p>Dear {},</p>
            <p>We regret to inform you that the interview for <strong>{}</strong> on <strong>{}</strong> has been cancelled.</p>
            <p>Best regards,<br>Hiring Team</p>"#,
                candidate_name, job_title, start_at
            ),
        ),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct SentMail {
        pub to: String,
        pub subject: String,
        pub body: String,
    }

    /// Keeps every message in memory
    #[derive(Debug, Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<SentMail>>,
    }

    impl RecordingMailer {
        pub fn messages(&self) -> Vec<SentMail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(SentMail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: html_body.to_string(),
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_template_contains_code() {
        let template = otp_template("Jane", "123456", 5);
        assert!(template.body.contains("123456"));
        assert!(template.body.contains("5 minutes"));
    }

    #[test]
    fn test_interview_template_optional_location() {
        let with = interview_scheduled_template(
            "Jane",
            "Backend Engineer",
            "2030-01-01T10:00:00Z",
            "2030-01-01T11:00:00Z",
            "onsite",
            Some("HQ, room 4"),
        );
        assert!(with.subject.contains("Backend Engineer"));
        assert!(with.body.contains("HQ, room 4"));

        let without = interview_scheduled_template(
            "Jane",
            "Backend Engineer",
            "2030-01-01T10:00:00Z",
            "2030-01-01T11:00:00Z",
            "online",
            None,
        );
        assert!(!without.body.contains("Where:"));
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_mail() {
        let mailer = LogMailer;
        mailer
            .send("jane@example.com", "Hello", "<p>Hi</p>")
            .await
            .unwrap();
    }
}
