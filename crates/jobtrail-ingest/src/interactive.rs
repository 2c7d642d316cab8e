//! Interactive single-message ingestion.
//!
//! Takes pasted text, runs a similarity pre-search over existing threads,
//! and hands both to the AI parser for structured extraction. The draft is
//! advisory: category comes from the deterministic classifier (the AI
//! guess only fills in when the classifier lands on General), and a
//! company guess is accepted only after domain and text matching both
//! miss. No dedup guard here: one message, explicit user action.

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};
use uuid::Uuid;

use jobtrail_core::defaults::MAX_PROMPT_CHARS;
use jobtrail_core::{
    AccountDirectory, CompanyRepository, ContactRepository, Error, IngestSummary, MailParser,
    Message, MessageCategory, MessageRepository, Result, ScoredMatch, ThreadContext,
    ThreadRepository, VectorIndex,
};
use jobtrail_core::uuid_utils;
use jobtrail_resolve::{classify, email_domain, extract_address, DomainIndex};

use crate::config::IngestConfig;
use crate::consolidator::{build_upsert, resolve_thread};
use crate::writer::DualStoreWriter;

/// Orchestrator for the interactive (pasted-text) entry point.
pub struct InteractiveIngestor<'a> {
    accounts: &'a dyn AccountDirectory,
    companies: &'a dyn CompanyRepository,
    contacts: &'a dyn ContactRepository,
    messages: &'a dyn MessageRepository,
    threads: &'a dyn ThreadRepository,
    index: &'a dyn VectorIndex,
    parser: &'a dyn MailParser,
    config: IngestConfig,
}

impl<'a> InteractiveIngestor<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
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

    /// Ingest one pasted message under the configured request deadline.
    pub async fn ingest_text(&self, user_id: Uuid, raw_text: &str) -> Result<IngestSummary> {
        tokio::time::timeout(
            self.config.request_deadline,
            self.ingest_inner(user_id, raw_text),
        )
        .await
        .map_err(|_| Error::Timeout("interactive ingestion exceeded request deadline".to_string()))?
    }

    async fn ingest_inner(&self, user_id: Uuid, raw_text: &str) -> Result<IngestSummary> {
        if raw_text.trim().is_empty() {
            return Err(Error::InvalidInput("empty message text".to_string()));
        }

        let mut summary = IngestSummary {
            total: 1,
            ..Default::default()
        };

        let context = self
            .thread_context(user_id, raw_text, &mut summary)
            .await;
        let draft = self.parser.parse_email(raw_text, &context).await?;

        let self_email = self.accounts.self_email(user_id).await?;
        let companies = self.companies.list_for_user(user_id).await?;
        let contacts = self.contacts.list_for_user(user_id).await?;
        let domain_index = DomainIndex::build(&companies, &contacts, self_email.as_deref());

        let from_addr = extract_address(&draft.from).to_lowercase();
        let category = effective_category(
            classify(&draft.subject, &draft.body, &draft.from),
            draft.category_guess,
        );

        let company_id = self
            .resolve_company(
                user_id,
                &domain_index,
                &from_addr,
                &draft.subject,
                &draft.body,
                draft.company_guess.as_deref(),
            )
            .await?;

        let ai_proposed = draft
            .matches_existing_thread
            .then_some(draft.existing_thread_id.as_deref())
            .flatten();
        let resolution = resolve_thread(self.threads, user_id, None, ai_proposed).await?;
        let thread_id = resolution.thread_id().to_string();

        let date = draft
            .date
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        let message = Message {
            id: uuid_utils::new_v7(),
            user_id,
            thread_id: thread_id.clone(),
            subject: draft.subject.clone(),
            from: from_addr.clone(),
            to: draft.to.iter().map(|a| extract_address(a).to_lowercase()).collect(),
            date: date.clone(),
            body: draft.body.clone(),
            labels: vec![],
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
            summary.skipped = 1;
        }

        info!(
            subsystem = "ingest",
            op = "interactive",
            user_id = %user_id,
            thread_id = %thread_id,
            category = category.as_str(),
            new_thread = resolution.is_new(),
            "Interactive ingestion complete"
        );
        Ok(summary)
    }

    /// Similarity pre-search for AI context. Best-effort: an index outage
    /// yields an empty context, not a failed ingestion.
    pub(crate) async fn thread_context(
        &self,
        user_id: Uuid,
        raw_text: &str,
        summary: &mut IngestSummary,
    ) -> Vec<ThreadContext> {
        let probe: String = raw_text.chars().take(MAX_PROMPT_CHARS).collect();
        match self
            .index
            .query(&probe, user_id, self.config.context_candidates)
            .await
        {
            Ok(matches) => matches.iter().filter_map(context_from_match).collect(),
            Err(e) => {
                warn!(
                    subsystem = "ingest",
                    op = "interactive",
                    error_msg = %e,
                    "Similarity pre-search failed, continuing without context"
                );
                summary.record_error("similarity pre-search", e);
                Vec::new()
            }
        }
    }

    /// Company fallback chain: sender domain → free-text containment →
    /// AI guess (matched against known names first, created if novel).
    pub(crate) async fn resolve_company(
        &self,
        user_id: Uuid,
        domain_index: &DomainIndex,
        from_addr: &str,
        subject: &str,
        body: &str,
        company_guess: Option<&str>,
    ) -> Result<Option<Uuid>> {
        if let Some(id) = domain_index.match_email(from_addr) {
            self.maybe_backfill_domain(user_id, domain_index, id, from_addr)
                .await?;
            return Ok(Some(id));
        }

        let combined = format!("{subject}\n{body}");
        if let Some(id) = domain_index.match_text(&combined) {
            self.maybe_backfill_domain(user_id, domain_index, id, from_addr)
                .await?;
            return Ok(Some(id));
        }

        let Some(guess) = company_guess.map(str::trim).filter(|g| !g.is_empty()) else {
            return Ok(None);
        };

        if let Some(id) = domain_index.match_text(guess) {
            return Ok(Some(id));
        }

        let domain = email_domain(from_addr)
            .filter(|d| !domain_index.is_excluded_domain(d));
        let id = self
            .companies
            .create(user_id, guess, domain.as_deref())
            .await?;
        debug!(
            subsystem = "ingest",
            op = "interactive",
            company_id = %id,
            "Created company from AI guess"
        );
        Ok(Some(id))
    }

    /// When a company matched without a registered domain, write the
    /// sender's non-generic domain back so future scans match on tier 2.
    async fn maybe_backfill_domain(
        &self,
        user_id: Uuid,
        domain_index: &DomainIndex,
        company_id: Uuid,
        from_addr: &str,
    ) -> Result<()> {
        if let Some(domain) = email_domain(from_addr) {
            if !domain_index.is_excluded_domain(&domain) {
                self.companies
                    .backfill_domain(user_id, company_id, &domain)
                    .await?;
            }
        }
        Ok(())
    }
}

/// The deterministic classifier wins; the AI guess only fills the gap when
/// the classifier found no signal at all.
pub(crate) fn effective_category(
    classified: MessageCategory,
    guess: Option<MessageCategory>,
) -> MessageCategory {
    if classified == MessageCategory::General {
        guess.unwrap_or(MessageCategory::General)
    } else {
        classified
    }
}

fn context_from_match(m: &ScoredMatch) -> Option<ThreadContext> {
    let meta = &m.metadata;
    if meta.get("kind").and_then(JsonValue::as_str) != Some("thread") {
        return None;
    }
    Some(ThreadContext {
        thread_id: meta.get("thread_id")?.as_str()?.to_string(),
        subject: meta
            .get("subject")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string(),
        company_name: meta
            .get("company_name")
            .and_then(JsonValue::as_str)
            .map(String::from),
        latest_date: meta
            .get("latest_date")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}
