//! Bulk historical scan over the mail-provider API.
//!
//! Pulls a bounded window of messages, fetches bodies in bounded-parallel
//! batches, then runs each message through the pipeline strictly
//! sequentially (the dedup guard and thread consolidation are
//! read-then-write within a run). Resolution misses are skips, not errors;
//! per-message upstream failures land in the error list and the scan
//! continues; an expired token aborts the whole run.

use std::collections::HashSet;

use tracing::{info, warn};
use uuid::Uuid;

use jobtrail_core::defaults::MINTED_THREAD_PREFIX;
use jobtrail_core::uuid_utils;
use jobtrail_core::{
    AccountDirectory, CompanyRepository, ContactRepository, Error, IngestSummary, MailProvider,
    Message, MessageRepository, ProviderMessage, Result, ThreadRepository, VectorIndex,
};
use jobtrail_mail::fetch_bodies;
use jobtrail_resolve::{classify, extract_address, DomainIndex};

use crate::config::IngestConfig;
use crate::consolidator::{build_upsert, resolve_thread};
use crate::dedup::DedupGuard;
use crate::writer::DualStoreWriter;

/// Orchestrator for the bulk-scan entry point.
pub struct BulkScanner<'a, P: MailProvider> {
    provider: &'a P,
    accounts: &'a dyn AccountDirectory,
    companies: &'a dyn CompanyRepository,
    contacts: &'a dyn ContactRepository,
    messages: &'a dyn MessageRepository,
    threads: &'a dyn ThreadRepository,
    index: &'a dyn VectorIndex,
    config: IngestConfig,
}

impl<'a, P: MailProvider> BulkScanner<'a, P> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: &'a P,
        accounts: &'a dyn AccountDirectory,
        companies: &'a dyn CompanyRepository,
        contacts: &'a dyn ContactRepository,
        messages: &'a dyn MessageRepository,
        threads: &'a dyn ThreadRepository,
        index: &'a dyn VectorIndex,
        config: IngestConfig,
    ) -> Self {
        Self {
            provider,
            accounts,
            companies,
            contacts,
            messages,
            threads,
            index,
            config,
        }
    }

    /// Run a scan under the configured request deadline.
    pub async fn scan(
        &self,
        user_id: Uuid,
        access_token: &str,
        query: &str,
    ) -> Result<IngestSummary> {
        tokio::time::timeout(
            self.config.request_deadline,
            self.scan_inner(user_id, access_token, query),
        )
        .await
        .map_err(|_| Error::Timeout("bulk scan exceeded request deadline".to_string()))?
    }

    async fn scan_inner(
        &self,
        user_id: Uuid,
        access_token: &str,
        query: &str,
    ) -> Result<IngestSummary> {
        let self_email = self.accounts.self_email(user_id).await?;
        let companies = self.companies.list_for_user(user_id).await?;
        let contacts = self.contacts.list_for_user(user_id).await?;
        let domain_index = DomainIndex::build(&companies, &contacts, self_email.as_deref());

        let refs = self
            .provider
            .list_messages(access_token, query, self.config.scan_max_messages)
            .await?;
        let fetched = fetch_bodies(self.provider, access_token, refs).await;

        let mut guard = DedupGuard::preload(self.messages, user_id).await?;
        let writer = DualStoreWriter::new(self.messages, self.threads, self.index);

        let mut summary = IngestSummary::default();
        let mut touched_threads: HashSet<String> = HashSet::new();

        for (msg_ref, result) in fetched {
            summary.total += 1;
            let provider_msg = match result {
                Ok(m) => m,
                Err(e) if e.aborts_scan() => return Err(e),
                Err(e) => {
                    summary.record_error(&format!("fetch {}", msg_ref.id), e);
                    continue;
                }
            };

            if let Err(e) = self
                .ingest_one(
                    user_id,
                    &domain_index,
                    self_email.as_deref(),
                    &provider_msg,
                    &mut guard,
                    &writer,
                    &mut summary,
                    &mut touched_threads,
                )
                .await
            {
                if e.aborts_scan() {
                    return Err(e);
                }
                warn!(
                    subsystem = "ingest",
                    op = "bulk_scan",
                    message_id = %provider_msg.id,
                    error_msg = %e,
                    "Message failed, continuing scan"
                );
                summary.record_error(&format!("ingest {}", provider_msg.id), e);
            }
        }

        summary.threads = touched_threads.len() as u64;
        info!(
            subsystem = "ingest",
            op = "bulk_scan",
            user_id = %user_id,
            total = summary.total,
            imported = summary.imported,
            skipped = summary.skipped,
            thread_count = summary.threads,
            "Bulk scan complete"
        );
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    async fn ingest_one(
        &self,
        user_id: Uuid,
        domain_index: &DomainIndex,
        self_email: Option<&str>,
        provider_msg: &ProviderMessage,
        guard: &mut DedupGuard,
        writer: &DualStoreWriter<'_>,
        summary: &mut IngestSummary,
        touched_threads: &mut HashSet<String>,
    ) -> Result<()> {
        let from_addr = extract_address(&provider_msg.from).to_lowercase();

        // Sent mail shows up in broad provider queries; skip our own.
        if self_email.is_some_and(|own| own.eq_ignore_ascii_case(&from_addr)) {
            summary.skipped += 1;
            return Ok(());
        }

        // No company match means this is not job-search correspondence we
        // can anchor; in bulk mode that is a skip, never an AI fallback.
        let Some(company_id) = domain_index.match_email(&from_addr) else {
            summary.skipped += 1;
            return Ok(());
        };

        // A message without a provider conversation id forms its own
        // thread, keyed by the provider message id so overlapping re-scans
        // resolve to the same thread and hit the dedup guard.
        let own_thread;
        let provider_thread_id = match provider_msg.thread_id.as_deref() {
            Some(id) => id,
            None => {
                own_thread = format!("{MINTED_THREAD_PREFIX}{}", provider_msg.id);
                &own_thread
            }
        };
        let resolution =
            resolve_thread(self.threads, user_id, Some(provider_thread_id), None).await?;
        let thread_id = resolution.thread_id().to_string();

        if guard.check_and_insert(&thread_id, &provider_msg.date) {
            summary.skipped += 1;
            return Ok(());
        }

        let category = classify(
            &provider_msg.subject,
            &provider_msg.body,
            &provider_msg.from,
        );

        let message = Message {
            id: uuid_utils::message_id(user_id, &provider_msg.id),
            user_id,
            thread_id: thread_id.clone(),
            subject: provider_msg.subject.clone(),
            from: from_addr.clone(),
            to: provider_msg.to.iter().map(|a| extract_address(a).to_lowercase()).collect(),
            date: provider_msg.date.clone(),
            body: provider_msg.body.clone(),
            labels: provider_msg.labels.clone(),
            category,
            company_id: Some(company_id),
        };

        let upsert = build_upsert(
            &thread_id,
            &message.subject,
            &message.from,
            &message.to,
            Some(company_id),
            &message.date,
            category,
        );

        if writer.write(&message, &upsert, summary).await?.is_some() {
            summary.imported += 1;
            touched_threads.insert(thread_id);
        } else {
            summary.skipped += 1;
        }
        Ok(())
    }
}
