//! Persisted card order

use crate::{KvStore, CARD_ORDER_KEY};
use dash_core::{default_card_order, repair_card_order, CardConfig};
use std::sync::Arc;

#[derive(Clone)]
pub struct CardOrderStore {
    store: Arc<dyn KvStore>,
}

impl CardOrderStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Stored order completed with any default card it lacks, or the
    /// default order when nothing usable is stored
    pub fn get_card_order(&self) -> Vec<CardConfig> {
        let raw = match self.store.get(CARD_ORDER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default_card_order(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to retrieve card order");
                return default_card_order();
            }
        };

        match serde_json::from_str::<Vec<CardConfig>>(&raw) {
            Ok(stored) => repair_card_order(stored),
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse stored card order");
                default_card_order()
            }
        }
    }

    pub fn save_card_order(&self, cards: &[CardConfig]) {
        let result = serde_json::to_string(cards)
            .map_err(crate::StoreError::from)
            .and_then(|json| self.store.set(CARD_ORDER_KEY, &json));
        if let Err(e) = result {
            tracing::error!(error = %e, "Failed to save card order");
        }
    }

    /// Forget the stored order; the next read yields the defaults
    pub fn reset_card_order(&self) {
        if let Err(e) = self.store.remove(CARD_ORDER_KEY) {
            tracing::error!(error = %e, "Failed to reset card order");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn store() -> (Arc<MemoryStore>, CardOrderStore) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), CardOrderStore::new(kv))
    }

    #[test]
    fn absent_order_yields_defaults() {
        let (_, cards) = store();
        assert_eq!(cards.get_card_order(), default_card_order());
    }

    #[test]
    fn saved_order_is_returned() {
        let (_, cards) = store();
        let mut order = default_card_order();
        order.rotate_left(3);
        cards.save_card_order(&order);
        assert_eq!(cards.get_card_order(), order);
    }

    #[test]
    fn missing_default_card_is_appended() {
        let (_, cards) = store();
        let order: Vec<CardConfig> = default_card_order()
            .into_iter()
            .filter(|c| c.id != "dewPoint")
            .collect();
        cards.save_card_order(&order);

        let restored = cards.get_card_order();
        assert_eq!(restored.len(), 12);
        assert_eq!(restored.last().map(|c| c.id.as_str()), Some("dewPoint"));
        assert_eq!(&restored[..11], &order[..]);
    }

    #[test]
    fn corrupt_order_yields_defaults() {
        let (kv, cards) = store();
        kv.set(CARD_ORDER_KEY, "{not json").unwrap();
        assert_eq!(cards.get_card_order(), default_card_order());
    }

    #[test]
    fn reset_restores_defaults() {
        let (kv, cards) = store();
        cards.save_card_order(&default_card_order()[..2]);
        cards.reset_card_order();
        assert_eq!(kv.get(CARD_ORDER_KEY).unwrap(), None);
        assert_eq!(cards.get_card_order(), default_card_order());
    }
}
