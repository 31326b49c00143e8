use std::cmp::Ordering;

use crate::domain::models::{Account, Direction, LogEntry, Role, Vehicle, VehicleStatus};
use crate::domain::pipeline::{ListView, SortKey, SortOrder};

pub const LOG_PAGE_SIZE: usize = 10;
pub const VEHICLE_PAGE_SIZE: usize = 10;
pub const ACCOUNT_PAGE_SIZE: usize = 8;

fn direction_label(entry: &LogEntry) -> &str {
    entry.direction.as_str()
}

fn site_name(entry: &LogEntry) -> &str {
    &entry.site.name
}

fn plate_number(entry: &LogEntry) -> &str {
    entry.plate_number()
}

fn brand(entry: &LogEntry) -> &str {
    entry.brand()
}

fn proponent(entry: &LogEntry) -> &str {
    entry.site.proponent.as_deref().unwrap_or("")
}

fn by_occurred_at(a: &LogEntry, b: &LogEntry) -> Ordering {
    a.occurred_at.cmp(&b.occurred_at)
}

fn by_plate_number(a: &LogEntry, b: &LogEntry) -> Ordering {
    a.plate_number().cmp(b.plate_number())
}

fn by_direction(a: &LogEntry, b: &LogEntry) -> Ordering {
    a.direction.as_str().cmp(b.direction.as_str())
}

fn by_site_name(a: &LogEntry, b: &LogEntry) -> Ordering {
    a.site.name.cmp(&b.site.name)
}

/// Field truck logs: direction filter, plate/brand search.
pub fn field_log_view() -> ListView<LogEntry> {
    ListView {
        page_size: LOG_PAGE_SIZE,
        base: None,
        kind: Some(direction_label),
        scope: None,
        search_fields: vec![plate_number, brand],
        sort_keys: vec![
            SortKey {
                name: "date",
                compare: by_occurred_at,
            },
            SortKey {
                name: "plateNumber",
                compare: by_plate_number,
            },
            SortKey {
                name: "logType",
                compare: by_direction,
            },
        ],
        default_sort: ("date", SortOrder::Desc),
    }
}

/// Admin manual counts: direction filter plus a site scope.
pub fn admin_log_view() -> ListView<LogEntry> {
    ListView {
        page_size: LOG_PAGE_SIZE,
        base: None,
        kind: Some(direction_label),
        scope: Some(site_name),
        search_fields: vec![site_name, proponent],
        sort_keys: vec![
            SortKey {
                name: "date",
                compare: by_occurred_at,
            },
            SortKey {
                name: "site",
                compare: by_site_name,
            },
            SortKey {
                name: "logType",
                compare: by_direction,
            },
        ],
        default_sort: ("date", SortOrder::Desc),
    }
}

fn vehicle_status(vehicle: &Vehicle) -> &str {
    match vehicle.status {
        VehicleStatus::Active => "Active",
        VehicleStatus::Inactive => "Inactive",
    }
}

fn vehicle_plate(vehicle: &Vehicle) -> &str {
    &vehicle.plate_number
}

fn vehicle_brand(vehicle: &Vehicle) -> &str {
    &vehicle.brand
}

fn vehicle_company(vehicle: &Vehicle) -> &str {
    &vehicle.company
}

fn vehicles_by_plate(a: &Vehicle, b: &Vehicle) -> Ordering {
    a.plate_number.cmp(&b.plate_number)
}

fn vehicles_by_last_log(a: &Vehicle, b: &Vehicle) -> Ordering {
    a.last_log_time.cmp(&b.last_log_time)
}

pub fn vehicle_view() -> ListView<Vehicle> {
    ListView {
        page_size: VEHICLE_PAGE_SIZE,
        base: None,
        kind: Some(vehicle_status),
        scope: Some(vehicle_company),
        search_fields: vec![vehicle_plate, vehicle_brand, vehicle_company],
        sort_keys: vec![
            SortKey {
                name: "date",
                compare: vehicles_by_last_log,
            },
            SortKey {
                name: "plateNumber",
                compare: vehicles_by_plate,
            },
        ],
        default_sort: ("date", SortOrder::Desc),
    }
}

fn is_field_account(account: &Account) -> bool {
    account.role == Role::User
}

fn account_activity(account: &Account) -> &str {
    if account.is_active { "active" } else { "inactive" }
}

fn account_name(account: &Account) -> &str {
    &account.name
}

fn account_username(account: &Account) -> &str {
    &account.username
}

fn account_company(account: &Account) -> &str {
    account.company.as_deref().unwrap_or("")
}

fn accounts_by_created_at(a: &Account, b: &Account) -> Ordering {
    a.created_at.cmp(&b.created_at)
}

fn accounts_by_name(a: &Account, b: &Account) -> Ordering {
    a.name.cmp(&b.name)
}

/// User management lists only field (`user` role) accounts.
pub fn account_view() -> ListView<Account> {
    ListView {
        page_size: ACCOUNT_PAGE_SIZE,
        base: Some(is_field_account),
        kind: Some(account_activity),
        scope: None,
        search_fields: vec![account_name, account_username, account_company],
        sort_keys: vec![
            SortKey {
                name: "date",
                compare: accounts_by_created_at,
            },
            SortKey {
                name: "name",
                compare: accounts_by_name,
            },
        ],
        default_sort: ("date", SortOrder::Desc),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionTotals {
    pub records: usize,
    pub inbound: u64,
    pub outbound: u64,
}

/// Header aggregates; admin counts carry a truck count, field logs count as one.
pub fn direction_totals<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> DirectionTotals {
    entries
        .into_iter()
        .fold(DirectionTotals::default(), |mut totals, entry| {
            totals.records += 1;
            match entry.direction {
                Direction::In => totals.inbound += u64::from(entry.truck_count),
                Direction::Out => totals.outbound += u64::from(entry.truck_count),
            }
            totals
        })
}

/// Distinct non-blank site names, in first-seen order, for the scope selector.
pub fn site_names(entries: &[LogEntry]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let name = entry.site.name.trim();
        if !name.is_empty() && !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{account_view, admin_log_view, direction_totals, field_log_view, site_names};
    use crate::domain::models::{
        Account, ActorRef, Direction, LogEntry, Role, SiteRef, VehicleRef,
    };
    use crate::domain::pipeline::{ListState, Selection, evaluate, ordered};

    fn entry(index: usize, direction: Direction) -> LogEntry {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap() + Duration::minutes(index as i64);
        LogEntry {
            id: format!("log-{index:02}"),
            direction,
            vehicle: Some(VehicleRef {
                plate_number: format!("PLT {index:03}"),
                brand: if index % 2 == 0 { "Isuzu" } else { "Hino" }.to_string(),
            }),
            site: SiteRef {
                id: None,
                name: if index % 3 == 0 { "Highland Quarry" } else { "Coastal Quarry" }.to_string(),
                location: None,
                proponent: None,
            },
            actor: Some(ActorRef {
                id: None,
                name: "Checker".to_string(),
                username: None,
            }),
            occurred_at: at,
            created_at: at,
            load_state: None,
            note: None,
            truck_count: 1,
        }
    }

    /// 25 entries, the first 15 inbound.
    fn scenario() -> Vec<LogEntry> {
        (0..25)
            .map(|index| {
                let direction = if index < 15 { Direction::In } else { Direction::Out };
                entry(index, direction)
            })
            .collect()
    }

    #[test]
    fn inbound_filter_second_page_holds_remaining_inbound_records() {
        let entries = scenario();
        let view = field_log_view();
        let mut state = ListState::for_view(&view);
        state.set_kind(Selection::parse("IN"));
        state.set_page(2);

        let page = evaluate(&view, &state, &entries);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.total_items, 15);

        let all_inbound = ordered(&view, &state, &entries);
        let expected: Vec<&str> = all_inbound[10..15].iter().map(|e| e.id.as_str()).collect();
        let actual: Vec<&str> = page.rows.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(actual, expected);
        // newest first: the oldest inbound record closes page 2
        assert_eq!(actual.last(), Some(&"log-00"));
    }

    #[test]
    fn direction_filter_ignores_case() {
        let entries = scenario();
        let view = admin_log_view();
        let mut state = ListState::for_view(&view);

        state.set_kind(Selection::parse("in"));
        assert_eq!(ordered(&view, &state, &entries).len(), 15);

        state.set_kind(Selection::parse("Out"));
        assert_eq!(ordered(&view, &state, &entries).len(), 10);
    }

    #[test]
    fn export_count_is_independent_of_page() {
        let entries = scenario();
        let view = field_log_view();
        let mut state = ListState::for_view(&view);
        state.set_search("isuzu");

        let expected = entries
            .iter()
            .filter(|e| e.brand() == "Isuzu")
            .count();
        for page in [1, 2, 7] {
            state.set_page(page);
            assert_eq!(ordered(&view, &state, &entries).len(), expected);
        }
    }

    #[test]
    fn admin_view_scopes_by_site() {
        let entries = scenario();
        let view = admin_log_view();
        let mut state = ListState::for_view(&view);
        state.set_scope(Selection::parse("Highland Quarry"));

        let rows = ordered(&view, &state, &entries);
        assert_eq!(rows.len(), 9);
        assert!(rows.iter().all(|e| e.site.name == "Highland Quarry"));
        assert_eq!(site_names(&entries), vec!["Highland Quarry", "Coastal Quarry"]);
    }

    #[test]
    fn totals_sum_truck_counts() {
        let mut entries = scenario();
        entries[0].truck_count = 4;

        let totals = direction_totals(&entries);
        assert_eq!(totals.records, 25);
        assert_eq!(totals.inbound, 18);
        assert_eq!(totals.outbound, 10);
    }

    #[test]
    fn account_view_only_lists_field_accounts() {
        let account = |id: &str, role: Role, active: bool| Account {
            id: id.to_string(),
            username: id.to_string(),
            name: format!("Name {id}"),
            email: None,
            contact_number: None,
            location: "Balanga".to_string(),
            company: Some("ABC Mining".to_string()),
            role,
            is_active: active,
            created_at: None,
            updated_at: None,
        };
        let accounts = vec![
            account("u1", Role::User, true),
            account("u2", Role::User, false),
            account("a1", Role::Admin, true),
        ];

        let view = account_view();
        let mut state = ListState::for_view(&view);
        assert_eq!(ordered(&view, &state, &accounts).len(), 2);

        state.set_kind(Selection::parse("active"));
        let rows = ordered(&view, &state, &accounts);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "u1");
    }
}
