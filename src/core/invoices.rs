//! Invoice business logic - billing customers for their shipped items.

use super::{Actor, round_to, today};
use crate::{
    entities::{Invoice, InvoiceStatus, Item, Record, Role, User},
    errors::{Error, Result},
    store::Records,
};
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use tracing::info;

/// Days between issue and due date when none is given.
pub const DEFAULT_PAYMENT_TERMS_DAYS: u64 = 14;

/// Input for issuing an invoice.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewInvoice {
    /// Billed customer's record id
    pub customer_id: String,
    /// Items to bill
    pub item_ids: Vec<String>,
    /// Payment due date
    pub due_date: Option<NaiveDate>,
}

/// Filter for invoice lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceQuery {
    /// Only this status
    pub status: Option<InvoiceStatus>,
    /// Only this customer's invoices (staff only)
    pub customer_id: Option<String>,
}

/// Next invoice number for a date: `INV-YYYYMMDD-NNN`, one above the number of
/// invoices already issued that day.
#[must_use]
pub fn next_invoice_number(date: NaiveDate, existing: &[Record<Invoice>]) -> String {
    let prefix = format!("INV-{}-", date.format("%Y%m%d"));
    let issued_today = existing
        .iter()
        .filter(|r| r.fields.invoice_number.starts_with(&prefix))
        .count();
    format!("{prefix}{:03}", issued_today + 1)
}

/// Issues an invoice for some of a customer's items.
///
/// # Errors
/// Returns `Error::Validation` if no items are given, an item belongs to
/// someone else or is already on another invoice.
pub async fn create_invoice(records: &Records, actor: &Actor, new: NewInvoice) -> Result<Record<Invoice>> {
    actor.require_admin()?;
    let mut seen = HashSet::new();
    let item_ids: Vec<String> = new
        .item_ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect();
    if item_ids.is_empty() {
        return Err(Error::validation("An invoice needs at least one item"));
    }

    let (customer, existing, customer_items) = tokio::try_join!(
        records.find::<User>(&new.customer_id),
        records.all::<Invoice>(),
        records.find_by::<Item>("customerId", &new.customer_id)
    )?;
    let customer = customer
        .filter(|u| u.fields.role == Role::Customer)
        .ok_or_else(|| Error::validation(format!("Unknown customer '{}'", new.customer_id)))?;

    let already_billed: HashSet<&str> = existing
        .iter()
        .flat_map(|r| r.fields.item_ids.iter().map(String::as_str))
        .collect();
    let mut billed = Vec::with_capacity(item_ids.len());
    for id in &item_ids {
        let item = customer_items
            .iter()
            .find(|i| i.id == *id)
            .ok_or_else(|| {
                Error::validation(format!("Item {id} does not belong to {}", customer.fields.name))
            })?;
        if already_billed.contains(id.as_str()) {
            return Err(Error::validation(format!(
                "Item {} is already invoiced",
                item.fields.tracking_number
            )));
        }
        billed.push(item);
    }

    let issued_at = today();
    let due_date = match new.due_date {
        Some(due) if due < issued_at => {
            return Err(Error::validation("Due date cannot be in the past"));
        }
        Some(due) => due,
        None => issued_at + Days::new(DEFAULT_PAYMENT_TERMS_DAYS),
    };
    let invoice = Invoice {
        invoice_number: next_invoice_number(issued_at, &existing),
        customer_id: customer.id.clone(),
        item_ids,
        amount_usd: round_to(billed.iter().map(|i| i.fields.cost_usd).sum(), 2),
        amount_ghs: round_to(billed.iter().map(|i| i.fields.cost_ghs).sum(), 2),
        status: InvoiceStatus::Unpaid,
        issued_at: Some(issued_at),
        due_date: Some(due_date),
        paid_at: None,
    };

    let record = records.insert(&invoice).await?;
    info!(
        id = %record.id,
        number = %invoice.invoice_number,
        customer = %customer.fields.name,
        amount_usd = invoice.amount_usd,
        "Invoice issued"
    );
    Ok(record)
}

/// Lists invoices visible to the actor, newest first.
///
/// # Errors
/// Returns an error if a store call fails.
pub async fn list_invoices(
    records: &Records,
    actor: &Actor,
    query: &InvoiceQuery,
) -> Result<Vec<Record<Invoice>>> {
    let invoices = if actor.role == Role::Customer {
        records
            .find_by::<Invoice>("customerId", &actor.user_id)
            .await?
    } else {
        records.all::<Invoice>().await?
    };
    let mut invoices: Vec<Record<Invoice>> = invoices
        .into_iter()
        .filter(|r| query.status.is_none_or(|s| s == r.fields.status))
        .filter(|r| {
            query
                .customer_id
                .as_deref()
                .is_none_or(|id| id == r.fields.customer_id)
        })
        .collect();
    invoices.sort_by(|a, b| b.fields.invoice_number.cmp(&a.fields.invoice_number));
    Ok(invoices)
}

/// Loads one invoice the actor is allowed to see.
///
/// # Errors
/// Returns `Error::NotFound` if it does not exist or belongs to another customer.
pub async fn get_invoice(records: &Records, actor: &Actor, id: &str) -> Result<Record<Invoice>> {
    let record = records.get::<Invoice>(id).await?;
    if !actor.can_see_customer(&record.fields.customer_id) {
        return Err(Error::NotFound {
            entity: "Invoice",
            id: id.to_string(),
        });
    }
    Ok(record)
}

/// Records payment of an invoice.
///
/// # Errors
/// Returns `Error::Validation` if the invoice is already paid.
pub async fn mark_paid(records: &Records, actor: &Actor, id: &str) -> Result<Record<Invoice>> {
    actor.require_admin()?;
    let current = records.get::<Invoice>(id).await?;
    if current.fields.status == InvoiceStatus::Paid {
        return Err(Error::validation(format!(
            "Invoice {} is already paid",
            current.fields.invoice_number
        )));
    }
    let record = records
        .patch::<Invoice>(id, json!({ "status": InvoiceStatus::Paid, "paidAt": today() }))
        .await?;
    info!(%id, number = %record.fields.invoice_number, "Invoice paid");
    Ok(record)
}

/// Flags every unpaid invoice whose due date is before `as_of` as overdue.
///
/// # Errors
/// Returns the first failed update.
pub async fn mark_overdue(
    records: &Records,
    actor: &Actor,
    as_of: NaiveDate,
) -> Result<Vec<Record<Invoice>>> {
    actor.require_admin()?;
    let unpaid = records
        .find_by::<Invoice>("status", &InvoiceStatus::Unpaid.to_string())
        .await?;

    let mut flagged = Vec::new();
    for invoice in unpaid
        .iter()
        .filter(|r| r.fields.due_date.is_some_and(|due| due < as_of))
    {
        flagged.push(
            records
                .patch::<Invoice>(&invoice.id, json!({ "status": InvoiceStatus::Overdue }))
                .await?,
        );
    }
    info!(count = flagged.len(), %as_of, "Overdue invoices flagged");
    Ok(flagged)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{entities::ItemStatus, test_utils::*};

    fn invoice_numbered(number: &str) -> Record<Invoice> {
        Record {
            id: format!("rec{number}"),
            created_time: None,
            fields: Invoice {
                invoice_number: number.to_string(),
                ..Invoice::default()
            },
        }
    }

    #[test]
    fn test_invoice_numbering() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 3).unwrap_or_default();
        assert_eq!(next_invoice_number(date, &[]), "INV-20240703-001");
        let existing = vec![
            invoice_numbered("INV-20240702-001"),
            invoice_numbered("INV-20240703-001"),
            invoice_numbered("INV-20240703-002"),
        ];
        assert_eq!(next_invoice_number(date, &existing), "INV-20240703-003");
    }

    #[tokio::test]
    async fn test_create_invoice_sums_items() -> Result<()> {
        let (_, records) = setup_records();
        let admin = test_admin(&records).await?;
        let customer = create_test_customer(&records, "Akua", "akua@example.com").await?;
        let a = create_test_item(&records, &customer.id, ItemStatus::Arrived).await?;
        let b = create_test_item(&records, &customer.id, ItemStatus::Arrived).await?;

        let record = create_invoice(&records, &admin, NewInvoice {
            customer_id: customer.id.clone(),
            item_ids: vec![a.id.clone(), b.id.clone(), a.id.clone()],
            due_date: None,
        })
        .await?;

        let invoice = &record.fields;
        assert_eq!(invoice.item_ids, vec![a.id.clone(), b.id.clone()]);
        assert_eq!(invoice.amount_usd, 60.0);
        assert_eq!(invoice.amount_ghs, 930.0);
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(
            invoice.invoice_number,
            format!("INV-{}-001", today().format("%Y%m%d"))
        );
        assert_eq!(
            invoice.due_date,
            Some(today() + Days::new(DEFAULT_PAYMENT_TERMS_DAYS))
        );

        // the same items cannot be billed twice
        let again = create_invoice(&records, &admin, NewInvoice {
            customer_id: customer.id.clone(),
            item_ids: vec![b.id.clone()],
            due_date: None,
        })
        .await;
        assert!(matches!(again, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_items_must_belong_to_customer() -> Result<()> {
        let (_, records) = setup_records();
        let admin = test_admin(&records).await?;
        let akua = create_test_customer(&records, "Akua", "akua@example.com").await?;
        let kofi = create_test_customer(&records, "Kofi", "kofi@example.com").await?;
        let kofis_item = create_test_item(&records, &kofi.id, ItemStatus::Arrived).await?;

        let result = create_invoice(&records, &admin, NewInvoice {
            customer_id: akua.id.clone(),
            item_ids: vec![kofis_item.id.clone()],
            due_date: None,
        })
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let empty = create_invoice(&records, &admin, NewInvoice {
            customer_id: akua.id.clone(),
            item_ids: vec!["  ".to_string()],
            due_date: None,
        })
        .await;
        assert!(matches!(empty, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_paid_overdue_and_visibility() -> Result<()> {
        let (_, records) = setup_records();
        let admin = test_admin(&records).await?;
        let akua = create_test_customer(&records, "Akua", "akua@example.com").await?;
        let kofi = create_test_customer(&records, "Kofi", "kofi@example.com").await?;
        let mut ids = Vec::new();
        for customer in [&akua, &kofi] {
            let item = create_test_item(&records, &customer.id, ItemStatus::Arrived).await?;
            let invoice = create_invoice(&records, &admin, NewInvoice {
                customer_id: customer.id.clone(),
                item_ids: vec![item.id],
                due_date: None,
            })
            .await?;
            ids.push(invoice.id);
        }

        let paid = mark_paid(&records, &admin, &ids[0]).await?;
        assert_eq!(paid.fields.status, InvoiceStatus::Paid);
        assert_eq!(paid.fields.paid_at, Some(today()));
        assert!(matches!(
            mark_paid(&records, &admin, &ids[0]).await,
            Err(Error::Validation { .. })
        ));

        // nothing is overdue yet
        assert!(mark_overdue(&records, &admin, today()).await?.is_empty());
        let later = today() + Days::new(DEFAULT_PAYMENT_TERMS_DAYS + 1);
        let flagged = mark_overdue(&records, &admin, later).await?;
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, ids[1]);
        assert_eq!(flagged[0].fields.status, InvoiceStatus::Overdue);

        let me = Actor::from_record(&akua);
        let mine = list_invoices(&records, &me, &InvoiceQuery::default()).await?;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, ids[0]);
        assert!(matches!(
            get_invoice(&records, &me, &ids[1]).await,
            Err(Error::NotFound { .. })
        ));

        let overdue = list_invoices(&records, &admin, &InvoiceQuery {
            status: Some(InvoiceStatus::Overdue),
            ..InvoiceQuery::default()
        })
        .await?;
        assert_eq!(overdue.len(), 1);
        assert!(matches!(
            mark_paid(&records, &me, &ids[1]).await,
            Err(Error::Forbidden { .. })
        ));
        Ok(())
    }
}
