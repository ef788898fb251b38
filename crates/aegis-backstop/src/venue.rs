//! External batch-auction venue used when the reserve is short

use std::sync::Arc;

use aegis_common::{AssetId, Result};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Order accepted by the venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueOrder {
    pub order_id: String,
    pub sell_asset: AssetId,
    pub sell_amount: Decimal,
    /// Minimum proceeds in debt-asset units
    pub buy_target: Decimal,
}

/// Dark-pool order placement
#[cfg_attr(test, mockall::automock)]
pub trait DarkPoolVenue: Send + Sync {
    /// Place one sell order; returns the venue's order id
    fn place_order(&self, sell_asset: &AssetId, sell_amount: Decimal, buy_target: Decimal) -> Result<String>;
}

impl<T: DarkPoolVenue + ?Sized> DarkPoolVenue for Arc<T> {
    fn place_order(&self, sell_asset: &AssetId, sell_amount: Decimal, buy_target: Decimal) -> Result<String> {
        (**self).place_order(sell_asset, sell_amount, buy_target)
    }
}

/// In-process venue that accepts and records every order
#[derive(Debug, Default)]
pub struct RecordingVenue {
    orders: RwLock<Vec<VenueOrder>>,
}

impl RecordingVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> Vec<VenueOrder> {
        self.orders.read().clone()
    }
}

impl DarkPoolVenue for RecordingVenue {
    fn place_order(&self, sell_asset: &AssetId, sell_amount: Decimal, buy_target: Decimal) -> Result<String> {
        let order_id = Uuid::now_v7().to_string();
        info!(
            order_id = %order_id,
            sell_asset = %sell_asset,
            sell_amount = %sell_amount,
            buy_target = %buy_target,
            "Order placed"
        );
        self.orders.write().push(VenueOrder {
            order_id: order_id.clone(),
            sell_asset: sell_asset.clone(),
            sell_amount,
            buy_target,
        });
        Ok(order_id)
    }
}
