//! Company resolution over the domain index.
//!
//! All operations return `Option<Uuid>`: an unmatched input is a valid
//! outcome, never an error. Bulk scans treat `None` as "skip this record";
//! interactive ingestion treats it as "ask the AI parser for a best guess".

use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::domain_index::{email_domain, normalize_name, DomainIndex};

/// Minimum company-name length eligible for free-text containment matching.
/// Shorter names ("GE", "HP") collide with ordinary words too often.
const MIN_TEXT_MATCH_LEN: usize = 3;

impl DomainIndex {
    /// Resolve a company from a single email address.
    ///
    /// Priority order:
    /// 1. contact's verified domain
    /// 2. company's registered domain
    /// 3. exact contact email
    /// 4. normalized substring containment between the domain and company
    ///    names (both directions, to catch abbreviated or compound domains)
    ///
    /// Domain-based steps are skipped entirely for generic consumer
    /// providers and the user's own domain; an exact contact email still
    /// matches regardless of its domain.
    pub fn match_email(&self, address: &str) -> Option<Uuid> {
        let address = address.trim().to_lowercase();
        let domain = email_domain(&address);

        if let Some(domain) = &domain {
            if !self.is_excluded_domain(domain) {
                if let Some(id) = self.by_contact_domain.get(domain) {
                    debug!(subsystem = "resolve", op = "match_email", signal = "contact_domain", %domain, "Resolved company");
                    return Some(*id);
                }
                if let Some(id) = self.by_company_domain.get(domain) {
                    debug!(subsystem = "resolve", op = "match_email", signal = "company_domain", %domain, "Resolved company");
                    return Some(*id);
                }
            }
        }

        if let Some(id) = self.by_contact_email.get(&address) {
            debug!(subsystem = "resolve", op = "match_email", signal = "contact_email", "Resolved company");
            return Some(*id);
        }

        if let Some(domain) = &domain {
            if !self.is_excluded_domain(domain) {
                if let Some(id) = self.match_domain_by_name(domain) {
                    return Some(id);
                }
            }
        }

        None
    }

    /// Resolve a company from a set of candidate domains (e.g. all attendee
    /// domains of a calendar event).
    ///
    /// The priority ladder is applied tier by tier across every domain, so
    /// a strong signal on a later domain beats a weak signal on an earlier
    /// one.
    pub fn match_domains(&self, domains: &[String]) -> Option<Uuid> {
        let usable: Vec<String> = domains
            .iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty() && !self.is_excluded_domain(d))
            .collect();

        for domain in &usable {
            if let Some(id) = self.by_contact_domain.get(domain) {
                return Some(*id);
            }
        }
        for domain in &usable {
            if let Some(id) = self.by_company_domain.get(domain) {
                return Some(*id);
            }
        }
        for domain in &usable {
            if let Some(id) = self.match_domain_by_name(domain) {
                return Some(id);
            }
        }
        None
    }

    /// Resolve a company by lowercase containment of its name inside free
    /// text. Lower precision than domain matching; callers use it only
    /// after `match_email` misses.
    pub fn match_text(&self, text: &str) -> Option<Uuid> {
        let haystack = text.to_lowercase();
        for (name, id) in &self.by_name {
            if name.len() >= MIN_TEXT_MATCH_LEN && haystack.contains(name.as_str()) {
                debug!(subsystem = "resolve", op = "match_text", company_name = %name, "Resolved company from text");
                return Some(*id);
            }
        }
        None
    }

    /// Resolve a company by word-boundary regex match of its name inside a
    /// short string such as an email subject used as an event title.
    pub fn match_title(&self, title: &str) -> Option<Uuid> {
        for (name, id) in &self.by_name {
            if name.len() < MIN_TEXT_MATCH_LEN {
                continue;
            }
            let pattern = format!(r"(?i)\b{}\b", regex::escape(name));
            // Escaped literal patterns always compile.
            let Ok(re) = Regex::new(&pattern) else {
                continue;
            };
            if re.is_match(title) {
                return Some(*id);
            }
        }
        None
    }

    /// Tier 4 of the email ladder: normalized containment between the
    /// domain and company names, in both directions.
    fn match_domain_by_name(&self, domain: &str) -> Option<Uuid> {
        // "acme.io" → local label "acme"
        let local = domain.split('.').next().unwrap_or(domain);
        let local = normalize_name(local);
        if local.is_empty() {
            return None;
        }
        for (name, id) in &self.by_name {
            let normalized = normalize_name(name);
            if normalized.len() < MIN_TEXT_MATCH_LEN {
                continue;
            }
            if domain.replace(['-', '_'], "").contains(&normalized) || normalized.contains(&local) {
                debug!(subsystem = "resolve", op = "match_email", signal = "name_containment", %domain, company_name = %name, "Resolved company");
                return Some(*id);
            }
        }
        None
    }
}
