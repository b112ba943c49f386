//! Display formatting for prices, changes and chart labels

use crate::feed::{Symbol, Tick};
use crate::tracker::ChangeDirection;
use chrono::{DateTime, Local, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Round to cents, halves away from zero
fn cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `$1234.56`
pub fn format_price(price: Decimal) -> String {
    format!("${:.2}", cents(price))
}

/// `+1.23%` or `-1.23%`
pub fn format_change(change_pct: Decimal) -> String {
    let sign = match ChangeDirection::of(change_pct) {
        ChangeDirection::NonNegative => '+',
        ChangeDirection::Negative => '-',
    };
    format!("{}{:.2}%", sign, cents(change_pct).abs())
}

/// Wall-clock `HH:MM:SS` in the local timezone
pub fn time_label(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%H:%M:%S")
        .to_string()
}

/// Chart title for a symbol
pub fn chart_title(symbol: &Symbol) -> String {
    format!("{} Price History", symbol)
}

/// One point of a rendered series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesPoint {
    pub time_label: String,
    pub price: Decimal,
}

impl From<&Tick> for SeriesPoint {
    fn from(tick: &Tick) -> Self {
        Self {
            time_label: time_label(tick.timestamp),
            price: tick.price,
        }
    }
}

/// A formatted roster row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub symbol: Symbol,
    pub price: String,
    pub change: String,
    pub direction: ChangeDirection,
}

impl ListRow {
    pub fn new(symbol: Symbol, price: Decimal, change_pct: Decimal) -> Self {
        Self {
            symbol,
            price: format_price(price),
            change: format_change(change_pct),
            direction: ChangeDirection::of(change_pct),
        }
    }
}

/// A formatted detail header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDisplay {
    /// `None` once the selection has been cleared
    pub symbol: Option<Symbol>,
    pub price: String,
    pub change: String,
    pub direction: ChangeDirection,
}

impl HeaderDisplay {
    /// Header for a selected symbol; missing values render as zero
    pub fn quote(symbol: Symbol, price: Option<Decimal>, change_pct: Option<Decimal>) -> Self {
        let change_pct = change_pct.unwrap_or(Decimal::ZERO);
        Self {
            symbol: Some(symbol),
            price: format_price(price.unwrap_or(Decimal::ZERO)),
            change: format_change(change_pct),
            direction: ChangeDirection::of(change_pct),
        }
    }

    /// Header shown when nothing is selected
    pub fn cleared() -> Self {
        Self {
            symbol: None,
            price: "$0.00".to_string(),
            change: "0.00%".to_string(),
            direction: ChangeDirection::NonNegative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(dec!(1234.56)), "$1234.56");
        assert_eq!(format_price(dec!(150)), "$150.00");
        assert_eq!(format_price(dec!(0.125)), "$0.13");
        assert_eq!(format_price(dec!(99.994)), "$99.99");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(dec!(1.234)), "+1.23%");
        assert_eq!(format_change(dec!(-10)), "-10.00%");
        assert_eq!(format_change(Decimal::ZERO), "+0.00%");
        assert_eq!(format_change(dec!(0.005)), "+0.01%");
        assert_eq!(format_change(dec!(-0.005)), "-0.01%");
    }

    #[test]
    fn test_time_label_shape() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 5).unwrap();
        let label = time_label(ts);
        assert_eq!(label.len(), 8);
        // Offsets are whole minutes, so seconds survive the conversion
        assert!(label.ends_with(&format!(":{:02}", ts.second())));
    }

    #[test]
    fn test_chart_title() {
        assert_eq!(chart_title(&Symbol::new("AAPL")), "AAPL Price History");
    }

    #[test]
    fn test_list_row_direction() {
        let row = ListRow::new(Symbol::new("TSLA"), dec!(99), dec!(-10));
        assert_eq!(row.price, "$99.00");
        assert_eq!(row.change, "-10.00%");
        assert_eq!(row.direction, ChangeDirection::Negative);
    }

    #[test]
    fn test_header_before_first_tick() {
        let header = HeaderDisplay::quote(Symbol::new("AAPL"), None, None);
        assert_eq!(header.price, "$0.00");
        assert_eq!(header.change, "+0.00%");
    }

    #[test]
    fn test_header_cleared() {
        let header = HeaderDisplay::cleared();
        assert!(header.symbol.is_none());
        assert_eq!(header.price, "$0.00");
        assert_eq!(header.change, "0.00%");
    }
}
