//! Accounts and sites are linked only by the account's display name matching the
//! site owner's name (case-insensitive). There is no identity reference on either
//! side, so a rename on one record silently breaks the link.

use crate::domain::models::{Account, Role, Site};
use crate::domain::validation::AccountDraft;

fn owns(account: &Account, site: &Site) -> bool {
    account.role == Role::User && account.name.to_lowercase() == site.owner.to_lowercase()
}

pub fn linked_account<'a>(site: &Site, accounts: &'a [Account]) -> Option<&'a Account> {
    accounts.iter().find(|account| owns(account, site))
}

/// Sites whose owner does not yet have a field account.
pub fn available_sites<'a>(sites: &'a [Site], accounts: &[Account]) -> Vec<&'a Site> {
    sites
        .iter()
        .filter(|site| linked_account(site, accounts).is_none())
        .collect()
}

/// Lowercase alphanumeric username derived from the owner's name.
pub fn suggested_username(owner: &str) -> String {
    owner
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Account form pre-filled from the selected site.
pub fn draft_for_site(site: &Site) -> AccountDraft {
    AccountDraft {
        username: suggested_username(&site.owner),
        name: site.owner.clone(),
        password: None,
        email: None,
        contact_number: site.contact_number.clone(),
        location: site.location.clone(),
        company: Some(site.name.clone()),
        role: Role::User,
    }
}
