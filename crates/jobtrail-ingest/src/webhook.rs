//! Webhook push ingestion.
//!
//! Authentication runs before any resolution work: the shared secret is
//! compared in constant time, and missing required fields reject the
//! request with no side effects. The owning user is resolved by matching
//! the payload's addresses against registered account emails. A
//! provider-supplied thread id is always preferred; without one the path
//! matches interactive ingestion (similarity pre-search plus AI thread
//! proposal).

use tracing::{info, warn};
use uuid::Uuid;

use jobtrail_core::uuid_utils;
use jobtrail_core::{
    AccountDirectory, CompanyRepository, ContactRepository, Error, IngestSummary, MailParser,
    Message, MessageRepository, Result, ThreadRepository, VectorIndex, WebhookPayload,
};
use jobtrail_resolve::{classify, extract_address, DomainIndex};

use crate::config::IngestConfig;
use crate::consolidator::{build_upsert, resolve_thread};
use crate::interactive::{effective_category, InteractiveIngestor};
use crate::writer::DualStoreWriter;

/// Orchestrator for the webhook entry point.
pub struct WebhookIngestor<'a> {
    shared_secret: String,
    accounts: &'a dyn AccountDirectory,
    companies: &'a dyn CompanyRepository,
    contacts: &'a dyn ContactRepository,
    messages: &'a dyn MessageRepository,
    threads: &'a dyn ThreadRepository,
    index: &'a dyn VectorIndex,
    parser: &'a dyn MailParser,
    config: IngestConfig,
}

impl<'a> WebhookIngestor<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        shared_secret: String,
        accounts: &'a dyn AccountDirectory,
        companies: &'a dyn CompanyRepository,
        contacts: &'a dyn ContactRepository,
        messages: &'a dyn MessageRepository,
        threads: &'a dyn ThreadRepository,
        index: &'a dyn VectorIndex,
        parser: &'a dyn MailParser,
        config: IngestConfig,
    ) -> Self {
        Self {
            shared_secret,
            accounts,
            companies,
            contacts,
            messages,
            threads,
            index,
            parser,
            config,
        }
    }

    /// Ingest one pushed message under the configured request deadline.
    pub async fn ingest(&self, payload: &WebhookPayload) -> Result<IngestSummary> {
        tokio::time::timeout(self.config.request_deadline, self.ingest_inner(payload))
            .await
            .map_err(|_| Error::Timeout("webhook ingestion exceeded request deadline".to_string()))?
    }

    async fn ingest_inner(&self, payload: &WebhookPayload) -> Result<IngestSummary> {
        // Auth first, before touching any store.
        if !constant_time_eq(payload.secret.as_bytes(), self.shared_secret.as_bytes()) {
            warn!(
                subsystem = "ingest",
                op = "webhook",
                "Rejected webhook with invalid shared secret"
            );
            return Err(Error::Unauthorized("invalid shared secret".to_string()));
        }

        for (field, value) in [
            ("from", &payload.from),
            ("subject", &payload.subject),
            ("bodyText", &payload.body_text),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "missing required field: {field}"
                )));
            }
        }

        let user_id = self.resolve_user(payload).await?;

        let mut summary = IngestSummary {
            total: 1,
            ..Default::default()
        };

        let self_email = self.accounts.self_email(user_id).await?;
        let companies = self.companies.list_for_user(user_id).await?;
        let contacts = self.contacts.list_for_user(user_id).await?;
        let domain_index = DomainIndex::build(&companies, &contacts, self_email.as_deref());

        let from_addr = extract_address(&payload.from).to_lowercase();
        let category = classify(&payload.subject, &payload.body_text, &payload.from);

        let pipeline = InteractiveIngestor::new(
            self.accounts,
            self.companies,
            self.contacts,
            self.messages,
            self.threads,
            self.index,
            self.parser,
            self.config.clone(),
        );
        let company_id = pipeline
            .resolve_company(
                user_id,
                &domain_index,
                &from_addr,
                &payload.subject,
                &payload.body_text,
                None,
            )
            .await?;

        let (thread_id, category) = match payload.gmail_thread_id.as_deref() {
            Some(provider_id) => {
                let resolution =
                    resolve_thread(self.threads, user_id, Some(provider_id), None).await?;
                (resolution.thread_id().to_string(), category)
            }
            None => {
                // No provider id: fall back to the interactive path's AI
                // thread matching over a composed text form.
                let composed = format!(
                    "From: {}\nSubject: {}\n\n{}",
                    payload.from, payload.subject, payload.body_text
                );
                let context = pipeline
                    .thread_context(user_id, &composed, &mut summary)
                    .await;
                let draft = self.parser.parse_email(&composed, &context).await?;
                let ai_proposed = draft
                    .matches_existing_thread
                    .then_some(draft.existing_thread_id.as_deref())
                    .flatten();
                let resolution =
                    resolve_thread(self.threads, user_id, None, ai_proposed).await?;
                (
                    resolution.thread_id().to_string(),
                    effective_category(category, draft.category_guess),
                )
            }
        };

        let date = payload
            .date
            .clone()
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

        // Deterministic id when the natural key exists, so provider retries
        // of the same push stay idempotent.
        let id = if payload.gmail_thread_id.is_some() && payload.date.is_some() {
            uuid_utils::message_id(user_id, &format!("webhook:{thread_id}:{date}"))
        } else {
            uuid_utils::new_v7()
        };

        let message = Message {
            id,
            user_id,
            thread_id: thread_id.clone(),
            subject: payload.subject.clone(),
            from: from_addr.clone(),
            to: payload
                .to
                .iter()
                .map(|a| extract_address(a).to_lowercase())
                .collect(),
            date: date.clone(),
            body: payload.body_text.clone(),
            labels: payload.labels.clone(),
            category,
            company_id,
        };

        let upsert = build_upsert(
            &thread_id,
            &message.subject,
            &message.from,
            &message.to,
            company_id,
            &date,
            category,
        );

        let writer = DualStoreWriter::new(self.messages, self.threads, self.index);
        if writer.write(&message, &upsert, &mut summary).await?.is_some() {
            summary.imported = 1;
            summary.threads = 1;
        } else {
            // Provider retry of an already-stored push.
            summary.skipped = 1;
        }

        info!(
            subsystem = "ingest",
            op = "webhook",
            user_id = %user_id,
            thread_id = %thread_id,
            category = category.as_str(),
            "Webhook ingestion complete"
        );
        Ok(summary)
    }

    /// Match the payload's addresses against registered account emails:
    /// `from` first (self-forwarded mail), then each recipient.
    async fn resolve_user(&self, payload: &WebhookPayload) -> Result<Uuid> {
        let from_addr = extract_address(&payload.from).to_lowercase();
        if let Some(user) = self.accounts.find_user_by_email(&from_addr).await? {
            return Ok(user);
        }
        for to in &payload.to {
            let addr = extract_address(to).to_lowercase();
            if let Some(user) = self.accounts.find_user_by_email(&addr).await? {
                return Ok(user);
            }
        }
        Err(Error::Unauthorized(
            "no registered account matches message addresses".to_string(),
        ))
    }
}

/// Constant-time byte comparison. Length mismatch short-circuits, which
/// leaks only the length, not the content.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
