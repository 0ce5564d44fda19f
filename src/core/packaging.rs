//! Packaging report - what the China warehouse is holding, grouped by intake day.
//!
//! Only items still on the China side (Received, Packed, Loaded) are counted.
//! Items are bucketed by their received date, falling back to the record's
//! creation date, and the buckets are listed newest day first.

use super::{Actor, round_to};
use crate::{
    entities::{Item, Record},
    errors::Result,
    store::Records,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Carton label for items not packed yet.
pub const UNASSIGNED_CARTON: &str = "Unassigned";

/// Running totals over a set of items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Number of item records
    pub item_count: usize,
    /// Sum of package quantities
    pub quantity: u64,
    /// Cubic meters
    pub cbm: f64,
    /// Kilograms
    pub weight_kg: f64,
    /// USD
    pub cost_usd: f64,
    /// GHS
    pub cost_ghs: f64,
}

impl Totals {
    /// Adds one item.
    pub fn add(&mut self, item: &Item) {
        self.item_count += 1;
        self.quantity += u64::from(item.quantity);
        self.cbm += item.cbm;
        self.weight_kg += item.weight_kg;
        self.cost_usd += item.cost_usd;
        self.cost_ghs += item.cost_ghs;
    }

    /// Totals over a list of items.
    #[must_use]
    pub fn of<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut totals = Self::default();
        for item in items {
            totals.add(item);
        }
        totals.rounded()
    }

    /// Rounds sums to display precision.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self {
            cbm: round_to(self.cbm, 3),
            weight_kg: round_to(self.weight_kg, 2),
            cost_usd: round_to(self.cost_usd, 2),
            cost_ghs: round_to(self.cost_ghs, 2),
            ..self
        }
    }
}

/// Items received on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayGroup {
    /// Intake day, `None` for items with no date at all
    pub date: Option<NaiveDate>,
    /// Totals for the day
    pub totals: Totals,
    /// The items, in record order
    pub items: Vec<Record<Item>>,
}

/// Items packed into one carton.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartonGroup {
    /// Carton number, or [`UNASSIGNED_CARTON`]
    pub carton_number: String,
    /// Totals for the carton
    pub totals: Totals,
}

/// The full packaging screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingReport {
    /// Per-day groups, newest first
    pub days: Vec<DayGroup>,
    /// Per-carton breakdown, cartons sorted by number with unassigned last
    pub cartons: Vec<CartonGroup>,
    /// Totals across every group
    pub totals: Totals,
}

/// Optional intake date range, inclusive.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackagingQuery {
    /// Earliest intake day
    pub from: Option<NaiveDate>,
    /// Latest intake day
    pub to: Option<NaiveDate>,
}

impl PackagingQuery {
    fn includes(&self, date: Option<NaiveDate>) -> bool {
        match date {
            Some(date) => {
                self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
            }
            None => self.from.is_none() && self.to.is_none(),
        }
    }
}

fn intake_date(record: &Record<Item>) -> Option<NaiveDate> {
    record
        .fields
        .received_at
        .or_else(|| record.created_time.map(|t| t.date_naive()))
}

/// Builds the report from a list of items of any status.
#[must_use]
pub fn build_report(items: Vec<Record<Item>>, query: &PackagingQuery) -> PackagingReport {
    let items: Vec<Record<Item>> = items
        .into_iter()
        .filter(|r| r.fields.status.is_china_side() && query.includes(intake_date(r)))
        .collect();

    let mut cartons: BTreeMap<Option<String>, Totals> = BTreeMap::new();
    let mut days: BTreeMap<Option<NaiveDate>, Vec<Record<Item>>> = BTreeMap::new();
    let mut totals = Totals::default();
    for record in items {
        totals.add(&record.fields);
        cartons
            .entry(record.fields.carton_number.clone())
            .or_default()
            .add(&record.fields);
        days.entry(intake_date(&record)).or_default().push(record);
    }

    // None sorts first in a BTreeMap: reversing puts undated items last
    let days = days
        .into_iter()
        .rev()
        .map(|(date, items)| DayGroup {
            date,
            totals: Totals::of(items.iter().map(|r| &r.fields)),
            items,
        })
        .collect();

    let mut cartons: Vec<CartonGroup> = cartons
        .into_iter()
        .map(|(carton, totals)| CartonGroup {
            carton_number: carton.unwrap_or_else(|| UNASSIGNED_CARTON.to_string()),
            totals: totals.rounded(),
        })
        .collect();
    // BTreeMap puts the unassigned (None) bucket first
    if cartons.first().is_some_and(|c| c.carton_number == UNASSIGNED_CARTON) {
        cartons.rotate_left(1);
    }

    PackagingReport {
        days,
        cartons,
        totals: totals.rounded(),
    }
}

/// Loads items and builds the packaging report.
///
/// # Errors
/// Returns `Error::Forbidden` for customers.
pub async fn packaging_report(
    records: &Records,
    actor: &Actor,
    query: &PackagingQuery,
) -> Result<PackagingReport> {
    actor.require_staff()?;
    let items = records.all::<Item>().await?;
    Ok(build_report(items, query))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::ItemStatus;

    fn item(day: Option<u32>, status: ItemStatus, carton: Option<&str>, cbm: f64) -> Record<Item> {
        Record {
            id: format!("rec{day:?}{cbm}"),
            created_time: None,
            fields: Item {
                quantity: 2,
                cbm,
                weight_kg: 10.0,
                cost_usd: cbm * 250.0,
                cost_ghs: cbm * 250.0 * 15.5,
                status,
                carton_number: carton.map(str::to_string),
                received_at: day.and_then(|d| NaiveDate::from_ymd_opt(2024, 8, d)),
                ..Item::default()
            },
        }
    }

    fn sample() -> Vec<Record<Item>> {
        vec![
            item(Some(1), ItemStatus::Received, None, 0.1),
            item(Some(3), ItemStatus::Packed, Some("C-2"), 0.2),
            item(Some(1), ItemStatus::Loaded, Some("C-1"), 0.3),
            item(Some(3), ItemStatus::InTransit, Some("C-1"), 5.0),
            item(None, ItemStatus::Received, Some("C-1"), 0.4),
        ]
    }

    #[test]
    fn test_groups_by_day_newest_first() {
        let report = build_report(sample(), &PackagingQuery::default());
        let dates: Vec<Option<NaiveDate>> = report.days.iter().map(|d| d.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 8, 3),
                NaiveDate::from_ymd_opt(2024, 8, 1),
                None
            ]
        );

        // the in-transit item is excluded
        let aug3 = &report.days[0].totals;
        assert_eq!(aug3.item_count, 1);
        assert_eq!(aug3.cbm, 0.2);

        let aug1 = &report.days[1].totals;
        assert_eq!(aug1.item_count, 2);
        assert_eq!(aug1.quantity, 4);
        assert_eq!(aug1.cbm, 0.4);
        assert_eq!(aug1.weight_kg, 20.0);
        assert_eq!(aug1.cost_usd, 100.0);
        assert_eq!(aug1.cost_ghs, 1550.0);
    }

    #[test]
    fn test_grand_totals_match_groups() {
        let report = build_report(sample(), &PackagingQuery::default());
        assert_eq!(report.totals.item_count, 4);
        assert_eq!(report.totals.cbm, 1.0);
        let summed: usize = report.days.iter().map(|d| d.totals.item_count).sum();
        assert_eq!(summed, report.totals.item_count);
    }

    #[test]
    fn test_carton_breakdown() {
        let report = build_report(sample(), &PackagingQuery::default());
        let cartons: Vec<(&str, usize)> = report
            .cartons
            .iter()
            .map(|c| (c.carton_number.as_str(), c.totals.item_count))
            .collect();
        assert_eq!(cartons, [("C-1", 2), ("C-2", 1), (UNASSIGNED_CARTON, 1)]);
        assert_eq!(report.cartons[0].totals.cbm, 0.7);
    }

    #[test]
    fn test_date_range() {
        let report = build_report(sample(), &PackagingQuery {
            from: NaiveDate::from_ymd_opt(2024, 8, 2),
            to: None,
        });
        assert_eq!(report.days.len(), 1);
        assert_eq!(report.totals.item_count, 1);
    }

    #[test]
    fn test_empty() {
        let report = build_report(Vec::new(), &PackagingQuery::default());
        assert!(report.days.is_empty());
        assert!(report.cartons.is_empty());
        assert_eq!(report.totals, Totals::default());
    }
}
