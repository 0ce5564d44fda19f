//! Dashboard statistics - the landing page for each role.

use super::{Actor, round_to};
use crate::{
    entities::{
        Announcement, Container, ContainerStatus, Invoice, InvoiceStatus, Item, ItemStatus,
        Record, Role, SupportRequest, User,
    },
    errors::Result,
    store::Records,
};
use chrono::NaiveDate;
use serde::Serialize;

/// Item count for one pipeline status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    /// Pipeline status
    pub status: ItemStatus,
    /// Number of items
    pub count: usize,
}

/// Counts items per status, every status listed in pipeline order.
#[must_use]
pub fn count_by_status<'a>(items: impl IntoIterator<Item = &'a Item>) -> Vec<StatusCount> {
    let mut counts: Vec<StatusCount> = ItemStatus::ALL
        .into_iter()
        .map(|status| StatusCount { status, count: 0 })
        .collect();
    for item in items {
        if let Some(entry) = counts.iter_mut().find(|c| c.status == item.status) {
            entry.count += 1;
        }
    }
    counts
}

/// Admin overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    /// Customer accounts
    pub customer_count: usize,
    /// Items per status
    pub items_by_status: Vec<StatusCount>,
    /// Volume currently at sea
    pub cbm_in_transit: f64,
    /// Sum of paid invoices, USD
    pub revenue_usd: f64,
    /// Sum of unpaid and overdue invoices, USD
    pub outstanding_usd: f64,
    /// Overdue invoices
    pub overdue_invoices: usize,
    /// Open or in-progress tickets
    pub open_tickets: usize,
}

/// Warehouse team overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    /// Items received but not packed
    pub awaiting_packing: usize,
    /// Items packed but not loaded
    pub packed_not_loaded: usize,
    /// Containers still being filled
    pub containers_loading: usize,
    /// Items received today
    pub received_today: usize,
    /// Volume received today
    pub cbm_received_today: f64,
}

/// Customer overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStats {
    /// Own items
    pub item_count: usize,
    /// Own items per status
    pub items_by_status: Vec<StatusCount>,
    /// Unpaid and overdue total, USD
    pub unpaid_usd: f64,
    /// Unpaid and overdue total, GHS
    pub unpaid_ghs: f64,
    /// Own open tickets
    pub open_tickets: usize,
    /// Active announcements, newest first
    pub announcements: Vec<Record<Announcement>>,
}

/// Role-specific dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "role", content = "stats")]
pub enum Dashboard {
    /// Admin view
    Admin(AdminStats),
    /// Team view
    Team(TeamStats),
    /// Customer view
    Customer(CustomerStats),
}

/// Computes the admin overview.
#[must_use]
pub fn admin_stats(
    users: &[Record<User>],
    items: &[Record<Item>],
    invoices: &[Record<Invoice>],
    tickets: &[Record<SupportRequest>],
) -> AdminStats {
    let sum_where = |pred: fn(InvoiceStatus) -> bool| {
        round_to(
            invoices
                .iter()
                .filter(|r| pred(r.fields.status))
                .map(|r| r.fields.amount_usd)
                .sum(),
            2,
        )
    };
    AdminStats {
        customer_count: users
            .iter()
            .filter(|u| u.fields.role == Role::Customer)
            .count(),
        items_by_status: count_by_status(items.iter().map(|r| &r.fields)),
        cbm_in_transit: round_to(
            items
                .iter()
                .filter(|r| r.fields.status == ItemStatus::InTransit)
                .map(|r| r.fields.cbm)
                .sum(),
            3,
        ),
        revenue_usd: sum_where(|s| s == InvoiceStatus::Paid),
        outstanding_usd: sum_where(InvoiceStatus::is_outstanding),
        overdue_invoices: invoices
            .iter()
            .filter(|r| r.fields.status == InvoiceStatus::Overdue)
            .count(),
        open_tickets: tickets.iter().filter(|t| t.fields.status.is_open()).count(),
    }
}

/// Computes the warehouse team overview.
#[must_use]
pub fn team_stats(items: &[Record<Item>], containers: &[Record<Container>], today: NaiveDate) -> TeamStats {
    let count = |status: ItemStatus| items.iter().filter(|r| r.fields.status == status).count();
    let received_today: Vec<&Item> = items
        .iter()
        .map(|r| &r.fields)
        .filter(|i| i.received_at == Some(today))
        .collect();
    TeamStats {
        awaiting_packing: count(ItemStatus::Received),
        packed_not_loaded: count(ItemStatus::Packed),
        containers_loading: containers
            .iter()
            .filter(|c| c.fields.status == ContainerStatus::Loading)
            .count(),
        received_today: received_today.len(),
        cbm_received_today: round_to(received_today.iter().map(|i| i.cbm).sum(), 3),
    }
}

/// Computes a customer's overview from their own records.
#[must_use]
pub fn customer_stats(
    items: &[Record<Item>],
    invoices: &[Record<Invoice>],
    tickets: &[Record<SupportRequest>],
    announcements: Vec<Record<Announcement>>,
) -> CustomerStats {
    let outstanding: Vec<&Invoice> = invoices
        .iter()
        .map(|r| &r.fields)
        .filter(|i| i.status.is_outstanding())
        .collect();
    CustomerStats {
        item_count: items.len(),
        items_by_status: count_by_status(items.iter().map(|r| &r.fields)),
        unpaid_usd: round_to(outstanding.iter().map(|i| i.amount_usd).sum(), 2),
        unpaid_ghs: round_to(outstanding.iter().map(|i| i.amount_ghs).sum(), 2),
        open_tickets: tickets.iter().filter(|t| t.fields.status.is_open()).count(),
        announcements,
    }
}

/// Loads the dashboard for the actor's role, fetching tables in parallel.
///
/// # Errors
/// Returns an error if any store call fails.
pub async fn load_dashboard(records: &Records, actor: &Actor, today: NaiveDate) -> Result<Dashboard> {
    match actor.role {
        Role::Admin => {
            let (users, items, invoices, tickets) = tokio::try_join!(
                records.all::<User>(),
                records.all::<Item>(),
                records.all::<Invoice>(),
                records.all::<SupportRequest>()
            )?;
            Ok(Dashboard::Admin(admin_stats(&users, &items, &invoices, &tickets)))
        }
        Role::Team => {
            let (items, containers) =
                tokio::try_join!(records.all::<Item>(), records.all::<Container>())?;
            Ok(Dashboard::Team(team_stats(&items, &containers, today)))
        }
        Role::Customer => {
            let (items, invoices, tickets, announcements) = tokio::try_join!(
                records.find_by::<Item>("customerId", &actor.user_id),
                records.find_by::<Invoice>("customerId", &actor.user_id),
                records.find_by::<SupportRequest>("customerId", &actor.user_id),
                super::announcements::list_active(records)
            )?;
            Ok(Dashboard::Customer(customer_stats(
                &items,
                &invoices,
                &tickets,
                announcements,
            )))
        }
    }
}
