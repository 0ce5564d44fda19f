//! Print previews - packing lists and invoices as standalone HTML documents.

use super::{Actor, invoices, round_to, support::UNKNOWN_CUSTOMER, today};
use crate::{
    entities::{Container, Invoice, Item, Profile, Record, User},
    errors::Result,
    store::Records,
    templates,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// One row of a packing list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackingLine {
    /// Tracking number
    pub tracking_number: String,
    /// Contents
    pub description: String,
    /// Carton number
    pub carton_number: Option<String>,
    /// Package count
    pub quantity: u32,
    /// Kilograms
    pub weight_kg: f64,
    /// Cubic meters
    pub cbm: f64,
    /// USD
    pub cost_usd: f64,
}

/// One customer's block on a packing list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerGroup {
    /// Customer name
    pub customer_name: String,
    /// Customer email, empty if unknown
    pub customer_email: String,
    /// The customer's items
    pub items: Vec<PackingLine>,
    /// Sum of quantities
    pub total_quantity: u64,
    /// Sum of weights
    pub total_weight_kg: f64,
    /// Sum of volumes
    pub total_cbm: f64,
    /// Sum of costs
    pub total_usd: f64,
}

/// Everything the packing list template shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackingList {
    /// The container
    pub container: Container,
    /// Customer blocks, sorted by name
    pub groups: Vec<CustomerGroup>,
    /// Item rows across all groups
    pub item_count: usize,
    /// Number of customer blocks
    pub customer_count: usize,
    /// Grand total volume
    pub total_cbm: f64,
    /// Grand total USD
    pub total_usd: f64,
    /// Grand total GHS
    pub total_ghs: f64,
    /// Print date
    pub generated_on: String,
}

impl PackingList {
    /// Groups a container's items by customer.
    #[must_use]
    pub fn build(container: Container, items: &[Record<Item>], users: &[Record<User>]) -> Self {
        let mut by_customer: BTreeMap<(String, String), Vec<&Item>> = BTreeMap::new();
        for record in items {
            let owner = users.iter().find(|u| u.id == record.fields.customer_id);
            let key = owner.map_or_else(
                || (UNKNOWN_CUSTOMER.to_string(), String::new()),
                |u| (u.fields.name.clone(), u.fields.email.clone()),
            );
            by_customer.entry(key).or_default().push(&record.fields);
        }

        let groups: Vec<CustomerGroup> = by_customer
            .into_iter()
            .map(|((customer_name, customer_email), items)| CustomerGroup {
                customer_name,
                customer_email,
                total_quantity: items.iter().map(|i| u64::from(i.quantity)).sum(),
                total_weight_kg: round_to(items.iter().map(|i| i.weight_kg).sum(), 2),
                total_cbm: round_to(items.iter().map(|i| i.cbm).sum(), 3),
                total_usd: round_to(items.iter().map(|i| i.cost_usd).sum(), 2),
                items: items
                    .into_iter()
                    .map(|i| PackingLine {
                        tracking_number: i.tracking_number.clone(),
                        description: i.description.clone(),
                        carton_number: i.carton_number.clone(),
                        quantity: i.quantity,
                        weight_kg: i.weight_kg,
                        cbm: i.cbm,
                        cost_usd: i.cost_usd,
                    })
                    .collect(),
            })
            .collect();

        Self {
            container,
            item_count: items.len(),
            customer_count: groups.len(),
            total_cbm: round_to(items.iter().map(|r| r.fields.cbm).sum(), 3),
            total_usd: round_to(items.iter().map(|r| r.fields.cost_usd).sum(), 2),
            total_ghs: round_to(items.iter().map(|r| r.fields.cost_ghs).sum(), 2),
            groups,
            generated_on: today().to_string(),
        }
    }
}

/// Everything the invoice template shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceDocument {
    /// Company name in the header
    pub company: &'static str,
    /// The invoice
    pub invoice: Invoice,
    /// Billed customer
    pub customer: Profile,
    /// Billed items
    pub lines: Vec<Item>,
    /// Sum of line volumes
    pub total_cbm: f64,
}

/// Renders a container's packing list.
///
/// # Errors
/// Returns `Error::Forbidden` for customers or `Error::NotFound`.
pub async fn packing_list(records: &Records, actor: &Actor, container_id: &str) -> Result<String> {
    actor.require_staff()?;
    let (container, items, users) = tokio::try_join!(
        records.get::<Container>(container_id),
        records.find_by::<Item>("containerId", container_id),
        records.all::<User>()
    )?;
    debug!(container = %container_id, items = items.len(), "Rendering packing list");
    let list = PackingList::build(container.fields, &items, &users);
    templates::render(templates::PACKING_LIST, &list)
}

/// Renders an invoice. Customers may only print their own.
///
/// Items deleted since the invoice was issued are left out of the lines; the
/// invoice amounts are printed as stored.
///
/// # Errors
/// Returns `Error::NotFound` if the invoice is missing or not visible.
pub async fn invoice_document(records: &Records, actor: &Actor, invoice_id: &str) -> Result<String> {
    let invoice = invoices::get_invoice(records, actor, invoice_id).await?;
    let (customer, items) = tokio::try_join!(
        records.get::<User>(&invoice.fields.customer_id),
        records.find_by::<Item>("customerId", &invoice.fields.customer_id)
    )?;

    let lines: Vec<Item> = invoice
        .fields
        .item_ids
        .iter()
        .filter_map(|id| items.iter().find(|i| i.id == *id))
        .map(|r| r.fields.clone())
        .collect();
    let document = InvoiceDocument {
        company: "ShipLink",
        total_cbm: round_to(lines.iter().map(|i| i.cbm).sum(), 3),
        customer: Profile::from(&customer),
        invoice: invoice.fields,
        lines,
    };
    debug!(invoice = %invoice_id, lines = document.lines.len(), "Rendering invoice");
    templates::render(templates::INVOICE, &document)
}
