use anyhow::Context;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;
use crate::db::connection::DbPool;
use crate::models::backup::BackupFull;
use crate::notifiers::{read_backup_full, Notifier};

pub struct MailNotifier {
    db: DbPool,
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl MailNotifier {
    pub fn new(db: DbPool, config: &MailConfig) -> anyhow::Result<Self> {
        let transport = match config.smtp_crypto.as_str() {
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?,
            "starttls" => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host),
        }
        .port(config.smtp_port)
        .credentials(Credentials::new(
            config.smtp_user.clone(),
            config.smtp_password.clone(),
        ))
        .build();

        let from_addr = if config.from.is_empty() {
            &config.smtp_user
        } else {
            &config.from
        };
        let from: Mailbox = from_addr
            .parse()
            .with_context(|| format!("invalid sender address {from_addr}"))?;

        let recipients = config
            .destinations
            .iter()
            .map(|d| {
                format!("{} <{}>", d.name, d.email)
                    .parse()
                    .with_context(|| format!("invalid recipient address {}", d.email))
            })
            .collect::<anyhow::Result<Vec<Mailbox>>>()?;
        if recipients.is_empty() {
            anyhow::bail!("mail notifier enabled but no destinations configured");
        }

        Ok(Self {
            db,
            transport,
            from,
            recipients,
        })
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn backup_report(&self, backup_id: &str) -> anyhow::Result<()> {
        let backup = read_backup_full(&self.db, backup_id).await?;
        let body = render_report(&backup);

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject("Backup Report");
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }
        let message = builder.body(body)?;

        self.transport
            .send(message)
            .await
            .context("failed to send backup report mail")?;
        Ok(())
    }

    fn name(&self) -> &str {
        "mail"
    }

    async fn health(&self) -> anyhow::Result<()> {
        let ok = self
            .transport
            .test_connection()
            .await
            .context("smtp connection failed")?;
        if !ok {
            anyhow::bail!("smtp connection test failed");
        }
        Ok(())
    }
}

fn render_report(backup: &BackupFull) -> String {
    let mut report = format!(
        "Backup report for \"{}\" ({})\nStatus: {}\nCreated: {}\n",
        backup.label, backup.id, backup.status, backup.created_at
    );
    if backup.drive_files.is_empty() {
        report.push_str("\nNo uploads were attempted.\n");
        return report;
    }
    report.push_str("\nUploads:\n");
    for file in &backup.drive_files {
        report.push_str(&format!(
            "- [{}] {} ({}) {}\n",
            file.status, file.label, file.provider, file.path
        ));
    }
    report
}
