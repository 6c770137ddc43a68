//! Balance derivation: stock levels are sums over ledger entries.

use std::collections::HashMap;

use rust_decimal::Decimal;

use depot_core::{LocationId, ProductId};

use crate::ledger::LedgerEntry;

/// Net quantity of `product`, optionally scoped to a location.
///
/// A location-scoped balance counts every entry whose source or destination
/// is that location. Transfers are written as two single-sided legs, so each
/// leg lands on exactly one location.
pub fn balance<'a>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
    product: ProductId,
    location: Option<LocationId>,
) -> Decimal {
    entries
        .into_iter()
        .filter(|e| e.product_id == product)
        .filter(|e| location.is_none_or(|l| e.touches(l)))
        .map(|e| e.qty_change)
        .sum()
}

pub fn global_balance<'a>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
    product: ProductId,
) -> Decimal {
    balance(entries, product, None)
}

pub fn location_balance<'a>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
    product: ProductId,
    location: LocationId,
) -> Decimal {
    balance(entries, product, Some(location))
}

/// Net quantity per product, for every product that has at least one entry.
pub fn product_totals<'a>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
) -> HashMap<ProductId, Decimal> {
    let mut totals: HashMap<ProductId, Decimal> = HashMap::new();
    for e in entries {
        *totals.entry(e.product_id).or_default() += e.qty_change;
    }
    totals
}

/// Sum of every quantity change in the ledger.
pub fn total_stock<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Decimal {
    entries.into_iter().map(|e| e.qty_change).sum()
}

/// Low-stock predicate: at or below the product's threshold.
pub fn is_low_stock(balance: Decimal, min_stock_level: Decimal) -> bool {
    balance <= min_stock_level
}

/// Delta that brings `current` to the physically counted quantity.
pub fn adjustment_delta(counted: Decimal, current: Decimal) -> Decimal {
    counted - current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MoveType;
    use crate::ledger::fixtures::entry;
    use proptest::prelude::*;

    #[test]
    fn location_balance_counts_both_sides() {
        let entries = vec![
            entry(1, 1, 30, MoveType::Receipt, None, Some(1)),
            entry(2, 1, -10, MoveType::Transfer, Some(1), None),
            entry(3, 1, 10, MoveType::Transfer, None, Some(2)),
        ];
        let p = ProductId::new(1);
        assert_eq!(location_balance(&entries, p, LocationId::new(1)), Decimal::from(20));
        assert_eq!(location_balance(&entries, p, LocationId::new(2)), Decimal::from(10));
        assert_eq!(global_balance(&entries, p), Decimal::from(30));
    }

    #[test]
    fn other_products_are_ignored() {
        let entries = vec![
            entry(1, 1, 5, MoveType::Receipt, None, Some(1)),
            entry(2, 2, 7, MoveType::Receipt, None, Some(1)),
        ];
        assert_eq!(global_balance(&entries, ProductId::new(1)), Decimal::from(5));
        let totals = product_totals(&entries);
        assert_eq!(totals.get(&ProductId::new(2)), Some(&Decimal::from(7)));
        assert_eq!(total_stock(&entries), Decimal::from(12));
    }

    #[test]
    fn low_stock_boundary_is_inclusive() {
        assert!(is_low_stock(Decimal::from(10), Decimal::from(10)));
        assert!(is_low_stock(Decimal::from(5), Decimal::from(10)));
        assert!(!is_low_stock(Decimal::from(11), Decimal::from(10)));
    }

    #[test]
    fn decimal_sums_do_not_drift() {
        let mut entries = Vec::new();
        for i in 0..10 {
            let mut e = entry(i + 1, 1, 0, MoveType::Receipt, None, Some(1));
            e.qty_change = Decimal::new(1, 1);
            entries.push(e);
        }
        assert_eq!(global_balance(&entries, ProductId::new(1)), Decimal::ONE);
    }

    #[test]
    fn adjustment_delta_can_shrink_stock() {
        assert_eq!(adjustment_delta(Decimal::from(20), Decimal::from(5)), Decimal::from(15));
        assert_eq!(adjustment_delta(Decimal::ZERO, Decimal::from(5)), Decimal::from(-5));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the global balance is the plain sum of the product's deltas.
        #[test]
        fn balance_equals_sum_of_deltas(
            deltas in prop::collection::vec(-10_000i64..10_000i64, 0..40)
        ) {
            let entries: Vec<LedgerEntry> = deltas
                .iter()
                .enumerate()
                .map(|(i, d)| entry(i as i64 + 1, 1, *d, MoveType::Receipt, None, Some(1)))
                .collect();
            let expected: i64 = deltas.iter().sum();
            prop_assert_eq!(global_balance(&entries, ProductId::new(1)), Decimal::from(expected));
        }

        /// Property: applying the adjustment delta lands exactly on the count.
        #[test]
        fn adjustment_reaches_counted_quantity(
            current in -1_000_000i64..1_000_000i64,
            counted in 0i64..1_000_000i64,
        ) {
            let current = Decimal::from(current);
            let counted = Decimal::from(counted);
            let delta = adjustment_delta(counted, current);
            prop_assert_eq!(current + delta, counted);
        }
    }
}
