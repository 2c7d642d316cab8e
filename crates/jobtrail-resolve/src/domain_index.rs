//! In-memory lookup structure for company resolution.
//!
//! Built once per ingestion request from the user's current companies and
//! contacts, never cached as mutable global state. Construction is a pure
//! function of the two input collections plus the user's own address, so
//! concurrent users can never observe each other's staleness.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use jobtrail_core::defaults::GENERIC_PROVIDERS;
use jobtrail_core::{Company, Contact};

/// Extract the domain part of an email address, lowercased.
pub fn email_domain(address: &str) -> Option<String> {
    let at = address.rfind('@')?;
    let domain = &address[at + 1..];
    if domain.is_empty() {
        return None;
    }
    Some(domain.trim().to_lowercase())
}

/// Extract the bare address from an RFC-style sender value, e.g.
/// `"Jane Doe <jane@acme.io>"` → `"jane@acme.io"`. Already-bare input is
/// returned trimmed.
pub fn extract_address(value: &str) -> &str {
    match (value.find('<'), value.rfind('>')) {
        (Some(open), Some(close)) if close > open => value[open + 1..close].trim(),
        _ => value.trim(),
    }
}

/// Normalize a name or domain label for containment comparison:
/// lowercase, strip whitespace, hyphens, and underscores.
pub fn normalize_name(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect::<String>()
        .to_lowercase()
}

/// Four-table lookup index over a user's companies and contacts.
#[derive(Debug, Clone)]
pub struct DomainIndex {
    /// Lowercased company name → company id.
    pub(crate) by_name: HashMap<String, Uuid>,
    /// Registered company domain → company id.
    pub(crate) by_company_domain: HashMap<String, Uuid>,
    /// Contact email domain → company id (non-generic providers only).
    pub(crate) by_contact_domain: HashMap<String, Uuid>,
    /// Exact contact email → company id.
    pub(crate) by_contact_email: HashMap<String, Uuid>,
    /// Domains never usable for company inference: the fixed generic
    /// provider set plus the user's own domain.
    pub(crate) excluded_domains: HashSet<String>,
}

impl DomainIndex {
    /// Build the index from the user's companies and contacts.
    ///
    /// `self_email` is the user's own address; its domain is excluded
    /// dynamically so a user's personal domain never resolves to one of
    /// their tracked companies.
    pub fn build(companies: &[Company], contacts: &[Contact], self_email: Option<&str>) -> Self {
        let mut excluded_domains: HashSet<String> =
            GENERIC_PROVIDERS.iter().map(|d| d.to_string()).collect();
        if let Some(own) = self_email.and_then(email_domain) {
            excluded_domains.insert(own);
        }

        let mut by_name = HashMap::new();
        let mut by_company_domain = HashMap::new();
        for company in companies {
            by_name.insert(company.name.trim().to_lowercase(), company.id);
            if let Some(domain) = &company.email_domain {
                let domain = domain.trim().to_lowercase();
                if !domain.is_empty() && !excluded_domains.contains(&domain) {
                    // At most one canonical domain per company; first one wins
                    // on accidental duplicates.
                    by_company_domain.entry(domain).or_insert(company.id);
                }
            }
        }

        let mut by_contact_domain = HashMap::new();
        let mut by_contact_email = HashMap::new();
        for contact in contacts {
            let email = contact.email.trim().to_lowercase();
            if email.is_empty() {
                continue;
            }
            if let Some(domain) = email_domain(&email) {
                if !excluded_domains.contains(&domain) {
                    by_contact_domain.entry(domain).or_insert(contact.company_id);
                }
            }
            by_contact_email.insert(email, contact.company_id);
        }

        Self {
            by_name,
            by_company_domain,
            by_contact_domain,
            by_contact_email,
            excluded_domains,
        }
    }

    /// True when the domain can never be used for company inference.
    pub fn is_excluded_domain(&self, domain: &str) -> bool {
        self.excluded_domains.contains(&domain.to_lowercase())
    }

    /// Number of companies indexed by name.
    pub fn company_count(&self) -> usize {
        self.by_name.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(id: u128, name: &str, domain: Option<&str>) -> Company {
        Company {
            id: Uuid::from_u128(id),
            name: name.to_string(),
            email_domain: domain.map(String::from),
        }
    }

    fn contact(email: &str, company: u128) -> Contact {
        Contact {
            email: email.to_string(),
            company_id: Uuid::from_u128(company),
        }
    }

    #[test]
    fn test_extract_address() {
        assert_eq!(extract_address("Jane Doe <jane@acme.io>"), "jane@acme.io");
        assert_eq!(extract_address(" jane@acme.io "), "jane@acme.io");
        assert_eq!(extract_address("broken >"), "broken >");
    }

    #[test]
    fn test_email_domain_extraction() {
        assert_eq!(email_domain("jane@acme.io"), Some("acme.io".to_string()));
        assert_eq!(email_domain("JANE@ACME.IO"), Some("acme.io".to_string()));
        assert_eq!(email_domain("no-at-sign"), None);
        assert_eq!(email_domain("trailing@"), None);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Acme Robotics"), "acmerobotics");
        assert_eq!(normalize_name("data-dog_inc"), "datadoginc");
    }

    #[test]
    fn test_build_indexes_company_domain() {
        let idx = DomainIndex::build(
            &[company(1, "Acme Robotics", Some("acme.io"))],
            &[],
            None,
        );
        assert_eq!(
            idx.by_company_domain.get("acme.io"),
            Some(&Uuid::from_u128(1))
        );
        assert_eq!(
            idx.by_name.get("acme robotics"),
            Some(&Uuid::from_u128(1))
        );
    }

    #[test]
    fn test_build_skips_generic_company_domain() {
        // A company erroneously registered with a webmail domain never
        // lands in the domain table.
        let idx = DomainIndex::build(&[company(1, "Acme", Some("gmail.com"))], &[], None);
        assert!(idx.by_company_domain.is_empty());
    }

    #[test]
    fn test_build_skips_generic_contact_domain_but_keeps_email() {
        let idx = DomainIndex::build(&[], &[contact("bob@gmail.com", 2)], None);
        assert!(idx.by_contact_domain.is_empty());
        assert_eq!(
            idx.by_contact_email.get("bob@gmail.com"),
            Some(&Uuid::from_u128(2))
        );
    }

    #[test]
    fn test_self_domain_excluded() {
        let idx = DomainIndex::build(
            &[company(1, "My Consultancy", Some("mydomain.dev"))],
            &[],
            Some("me@mydomain.dev"),
        );
        assert!(idx.is_excluded_domain("mydomain.dev"));
        assert!(idx.by_company_domain.is_empty());
    }

    #[test]
    fn test_contact_emails_lowercased() {
        let idx = DomainIndex::build(&[], &[contact("Jane@Acme.IO", 3)], None);
        assert_eq!(
            idx.by_contact_email.get("jane@acme.io"),
            Some(&Uuid::from_u128(3))
        );
        assert_eq!(
            idx.by_contact_domain.get("acme.io"),
            Some(&Uuid::from_u128(3))
        );
    }
}
