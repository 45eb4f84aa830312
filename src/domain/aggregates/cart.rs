//! Cart Aggregate

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{Money, Quantity};

/// One (user, product, quantity) row before checkout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Quantity,
}

impl CartItem {
    pub fn new(user_id: Uuid, product_id: Uuid, quantity: Quantity) -> Self {
        Self { id: Uuid::now_v7(), user_id, product_id, quantity }
    }
}

/// A cart item joined with its product.
#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
}

impl CartLine {
    pub fn line_total(&self) -> Money { self.product.price.multiply(self.item.quantity.value()) }
}

/// Outcome of adding to the cart; `created` is false when an existing line was incremented.
#[derive(Clone, Debug, Serialize)]
pub struct CartAddition {
    pub item: CartItem,
    pub created: bool,
}

/// Total number of units across a cart.
pub fn item_count(lines: &[CartLine]) -> u32 {
    lines.iter().map(|l| l.item.quantity.value()).sum()
}

/// A single instruction from a bulk cart update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineChange {
    Set(Uuid, Quantity),
    Remove(Uuid),
}

/// Parses a bulk update form. Keys are line ids, optionally prefixed with
/// `quantity_`; entries with an unparsable id or quantity are dropped. One
/// change per line, ordered by id: when both spellings name the same line the
/// `quantity_` key wins.
pub fn parse_line_changes(form: &HashMap<String, serde_json::Value>) -> Vec<LineChange> {
    let mut changes: BTreeMap<Uuid, (bool, LineChange)> = BTreeMap::new();
    for (key, value) in form {
        let (prefixed, raw_id) = match key.strip_prefix("quantity_") {
            Some(rest) => (true, rest),
            None => (false, key.as_str()),
        };
        let Ok(id) = Uuid::parse_str(raw_id) else { continue };
        let qty = match value {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        let Some(qty) = qty else { continue };
        let change = match Quantity::new(qty) {
            Some(q) => LineChange::Set(id, q),
            None => LineChange::Remove(id),
        };
        match changes.get(&id) {
            Some((true, _)) => {}
            Some((false, _)) if !prefixed => {}
            _ => { changes.insert(id, (prefixed, change)); }
        }
    }
    changes.into_values().map(|(_, change)| change).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_line_total() {
        let product = Product::create("Fern", Uuid::nil(), Money::new(dec!(12.50)), 10);
        let line = CartLine { item: CartItem::new(Uuid::nil(), product.id, Quantity::new(3).unwrap()), product };
        assert_eq!(line.line_total().amount(), dec!(37.50));
        assert_eq!(item_count(&[line.clone(), line]), 6);
    }

    #[test]
    fn test_parse_line_changes() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let c = Uuid::now_v7();
        let form: HashMap<String, serde_json::Value> = [
            (format!("quantity_{a}"), json!("4")),
            (b.to_string(), json!(0)),
            (c.to_string(), json!("lots")),
            ("quantity_oops".to_string(), json!(2)),
            (Uuid::nil().to_string(), json!(-1)),
        ]
        .into_iter()
        .collect();

        let changes = parse_line_changes(&form);
        assert_eq!(changes.len(), 3);
        assert!(changes.contains(&LineChange::Set(a, Quantity::new(4).unwrap())));
        assert!(changes.contains(&LineChange::Remove(b)));
        assert!(changes.contains(&LineChange::Remove(Uuid::nil())));
    }

    #[test]
    fn test_prefixed_key_wins_for_same_line() {
        let id = Uuid::now_v7();
        // Fresh maps get fresh hash seeds, so iteration order varies between them.
        for _ in 0..8 {
            let form: HashMap<String, serde_json::Value> =
                [(id.to_string(), json!(0)), (format!("quantity_{id}"), json!(2))].into_iter().collect();
            assert_eq!(parse_line_changes(&form), vec![LineChange::Set(id, Quantity::new(2).unwrap())]);
        }
    }
}
