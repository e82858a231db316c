//! # History Order Entity
//!
//! Append-only record of an order placed or executed by a client.
//!
//! # Examples
//!
//! ```
//! use rust_decimal::Decimal;
//! use statistics_service::domain::entities::{Client, HistoryOrder};
//! use statistics_service::domain::value_objects::OrderSide;
//!
//! let client = Client::new("c1", "Binance", "algo1", "BTC_USD");
//! let order = HistoryOrder::new(&client, OrderSide::Buy, "limit", Decimal::TWO, Decimal::from(9800))
//!     .with_algorithm("twap")
//!     .with_commission(Decimal::new(5, 1));
//!
//! assert_eq!(order.client(), client);
//! assert!(order.belongs_to(&client));
//! ```

use crate::domain::entities::client::Client;
use crate::domain::value_objects::OrderSide;
use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Fractional-second digits kept in `time_placed`, matching `TIMESTAMPTZ`.
pub const TIME_PLACED_PRECISION: u16 = 6;

fn placed_at(time: DateTime<Utc>) -> DateTime<Utc> {
    time.trunc_subsecs(TIME_PLACED_PRECISION)
}

fn placed_now() -> DateTime<Utc> {
    placed_at(Utc::now())
}

fn deserialize_time_placed<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    DateTime::<Utc>::deserialize(deserializer).map(placed_at)
}

/// One executed or placed order of a client.
///
/// The first four fields match a [`Client`]; the client row is always
/// written in the same unit of work as the order. History orders are
/// never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryOrder {
    /// Account name.
    pub client_name: String,
    /// Exchange the order was placed on.
    pub exchange_name: String,
    /// Grouping tag of the owning client.
    pub label: String,
    /// Trading pair.
    pub pair: String,
    /// Order direction.
    pub side: OrderSide,
    /// Order type, e.g. `limit` or `market`.
    pub type_order: String,
    /// Quantity in base asset units.
    pub base_qty: Decimal,
    /// Order price.
    pub price: Decimal,
    /// Strategy or algorithm that placed the order.
    #[serde(default)]
    pub algorithm_name_placed: String,
    /// Lowest ask observed when the order was placed.
    #[serde(default)]
    pub lowest_sell_prc: Decimal,
    /// Highest bid observed when the order was placed.
    #[serde(default)]
    pub highest_buy_prc: Decimal,
    /// Fee paid, in quote asset units.
    #[serde(default)]
    pub commission_quote_qty: Decimal,
    /// Placement time, truncated to microseconds.
    #[serde(default = "placed_now", deserialize_with = "deserialize_time_placed")]
    pub time_placed: DateTime<Utc>,
}

impl HistoryOrder {
    /// Creates an order for `client`, placed now, with zero bounds and
    /// commission.
    #[must_use]
    pub fn new(
        client: &Client,
        side: OrderSide,
        type_order: impl Into<String>,
        base_qty: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            client_name: client.client_name.clone(),
            exchange_name: client.exchange_name.clone(),
            label: client.label.clone(),
            pair: client.pair.clone(),
            side,
            type_order: type_order.into(),
            base_qty,
            price,
            algorithm_name_placed: String::new(),
            lowest_sell_prc: Decimal::ZERO,
            highest_buy_prc: Decimal::ZERO,
            commission_quote_qty: Decimal::ZERO,
            time_placed: placed_now(),
        }
    }

    /// Sets the placing algorithm name.
    #[must_use]
    pub fn with_algorithm(mut self, name: impl Into<String>) -> Self {
        self.algorithm_name_placed = name.into();
        self
    }

    /// Sets the book bounds observed at placement time.
    #[must_use]
    pub fn with_bounds(mut self, lowest_sell_prc: Decimal, highest_buy_prc: Decimal) -> Self {
        self.lowest_sell_prc = lowest_sell_prc;
        self.highest_buy_prc = highest_buy_prc;
        self
    }

    /// Sets the commission paid.
    #[must_use]
    pub fn with_commission(mut self, commission_quote_qty: Decimal) -> Self {
        self.commission_quote_qty = commission_quote_qty;
        self
    }

    /// Sets the placement time, truncated to microseconds.
    #[must_use]
    pub fn with_time_placed(mut self, time_placed: DateTime<Utc>) -> Self {
        self.time_placed = placed_at(time_placed);
        self
    }

    /// Returns the owning client key.
    #[must_use]
    pub fn client(&self) -> Client {
        Client::new(
            self.client_name.clone(),
            self.exchange_name.clone(),
            self.label.clone(),
            self.pair.clone(),
        )
    }

    /// Returns true if all four key fields match `client`.
    #[must_use]
    pub fn belongs_to(&self, client: &Client) -> bool {
        self.client_name == client.client_name
            && self.exchange_name == client.exchange_name
            && self.label == client.label
            && self.pair == client.pair
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn client() -> Client {
        Client::new("c1", "Binance", "algo1", "BTC_USD")
    }

    #[test]
    fn new_copies_client_key() {
        let order = HistoryOrder::new(
            &client(),
            OrderSide::Sell,
            "market",
            Decimal::ONE,
            Decimal::from(100),
        );
        assert_eq!(order.client(), client());
        assert_eq!(order.commission_quote_qty, Decimal::ZERO);
    }

    #[test]
    fn belongs_to_requires_every_field() {
        let order = HistoryOrder::new(&client(), OrderSide::Buy, "limit", Decimal::ONE, Decimal::ONE);
        let mut other = client();
        other.label = "algo2".to_string();
        assert!(order.belongs_to(&client()));
        assert!(!order.belongs_to(&other));
    }

    #[test]
    fn json_uses_attribute_names() {
        let order = HistoryOrder::new(&client(), OrderSide::Buy, "limit", Decimal::TWO, Decimal::ONE)
            .with_bounds(Decimal::from(9900), Decimal::from(9700));
        let json = serde_json::to_value(&order).unwrap();
        for field in [
            "clientName",
            "exchangeName",
            "label",
            "pair",
            "side",
            "typeOrder",
            "baseQty",
            "price",
            "algorithmNamePlaced",
            "lowestSellPrc",
            "highestBuyPrc",
            "commissionQuoteQty",
            "timePlaced",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert_eq!(json["side"], "buy");
    }

    #[test]
    fn optional_fields_default_on_decode() {
        let order: HistoryOrder = serde_json::from_str(
            r#"{
                "clientName": "c1", "exchangeName": "Binance", "label": "algo1",
                "pair": "BTC_USD", "side": "buy", "typeOrder": "limit",
                "baseQty": 2, "price": 9800
            }"#,
        )
        .unwrap();
        assert_eq!(order.base_qty, Decimal::TWO);
        assert!(order.algorithm_name_placed.is_empty());
        assert_eq!(order.highest_buy_prc, Decimal::ZERO);
    }

    #[test]
    fn time_placed_keeps_microseconds_only() {
        let order = HistoryOrder::new(&client(), OrderSide::Buy, "limit", Decimal::ONE, Decimal::ONE);
        assert_eq!(order.time_placed.nanosecond() % 1_000, 0);

        let precise = Utc
            .with_ymd_and_hms(2024, 6, 1, 12, 30, 0)
            .unwrap()
            .with_nanosecond(454_122_371)
            .unwrap();
        let order = order.with_time_placed(precise);
        assert_eq!(order.time_placed.nanosecond(), 454_122_000);
    }

    #[test]
    fn decoded_time_placed_is_truncated() {
        let order: HistoryOrder = serde_json::from_str(
            r#"{
                "clientName": "c1", "exchangeName": "Binance", "label": "algo1",
                "pair": "BTC_USD", "side": "sell", "typeOrder": "market",
                "baseQty": 1, "price": 100,
                "timePlaced": "2026-10-19T14:26:35.454122371Z"
            }"#,
        )
        .unwrap();
        assert_eq!(order.time_placed.nanosecond(), 454_122_000);
    }
}
