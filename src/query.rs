//! Search filtering and sorting of asset records

use std::cmp::Ordering;

use crate::types::{numeric_value, AssetRecord, SortConfig, SortDirection, SortField};

/// Records whose name, symbol or id contains `term`, case-insensitively
///
/// A blank term matches everything.
pub fn filter(records: &[AssetRecord], term: &str) -> Vec<AssetRecord> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|r| {
            r.name.to_lowercase().contains(&needle)
                || r.symbol.to_lowercase().contains(&needle)
                || r.id.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Comparable value of one record field
#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Number(f64),
    Text(String),
}

impl SortValue {
    /// Numbers order before text; missing values have already become infinities
    fn cmp_asc(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
            (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
        }
    }
}

fn field_value(record: &AssetRecord, field: &SortField) -> Option<SortValue> {
    let number = |v: Option<f64>| v.map(SortValue::Number);
    match field {
        SortField::Name => Some(SortValue::Text(record.name.to_lowercase())),
        SortField::Symbol => Some(SortValue::Text(record.symbol.to_lowercase())),
        SortField::MarketCapRank => number(record.market_cap_rank.map(f64::from)),
        SortField::CurrentPrice => number(record.current_price),
        SortField::MarketCap => number(record.market_cap),
        SortField::TotalVolume => number(record.total_volume),
        SortField::PriceChangePercentage24h => number(record.price_change_percentage_24h),
        SortField::MarketCapChange24h => number(record.market_cap_change_24h),
        SortField::Other(name) => {
            if let Some(value) = typed_value(record, name) {
                return value;
            }
            extra_value(record, name)
        }
    }
}

/// Typed record fields not covered by a [`SortField`] variant
///
/// `None` means `name` is not a typed field; `Some(None)` means it is but the
/// record has no value.
fn typed_value(record: &AssetRecord, name: &str) -> Option<Option<SortValue>> {
    let number = |v: Option<f64>| Some(v.map(SortValue::Number));
    match name {
        "id" => Some(Some(SortValue::Text(record.id.to_lowercase()))),
        "price_change_24h" => number(record.price_change_24h),
        "market_cap_change_percentage_24h" => number(record.market_cap_change_percentage_24h),
        "high_24h" => number(record.high_24h),
        "low_24h" => number(record.low_24h),
        "circulating_supply" => number(record.circulating_supply),
        "total_supply" => number(record.total_supply),
        "max_supply" => number(record.max_supply),
        "ath" => number(record.ath),
        "atl" => number(record.atl),
        "last_updated" => number(record.last_updated.map(|t| t.timestamp_millis() as f64)),
        _ => None,
    }
}

fn extra_value(record: &AssetRecord, name: &str) -> Option<SortValue> {
    match record.extra.get(name)? {
        serde_json::Value::Null => None,
        value => Some(match numeric_value(value) {
            Some(n) => SortValue::Number(n),
            None => SortValue::Text(match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }),
    }
}

/// Stable sort of `records` by `config`
///
/// Missing values stand in as `+∞` ascending and `-∞` descending, and the
/// descending order is the negated ascending comparison, so missing values
/// end up last in both directions.
pub fn sort(records: &[AssetRecord], config: &SortConfig) -> Vec<AssetRecord> {
    let missing = match config.direction {
        SortDirection::Asc => f64::INFINITY,
        SortDirection::Desc => f64::NEG_INFINITY,
    };

    let mut keyed: Vec<(SortValue, &AssetRecord)> = records
        .iter()
        .map(|r| {
            let value = field_value(r, &config.field).unwrap_or(SortValue::Number(missing));
            (value, r)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        let ordering = a.cmp_asc(b);
        match config.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });

    keyed.into_iter().map(|(_, r)| r.clone()).collect()
}

/// Sort configuration after the user picks `field`
///
/// Picking the active field flips its direction; picking another field starts
/// from that field's default direction.
pub fn next_sort_config(current: &SortConfig, field: impl Into<SortField>) -> SortConfig {
    let field = field.into();
    if current.field == field {
        return SortConfig {
            field,
            direction: current.direction.flipped(),
        };
    }

    let direction = field.default_direction();
    SortConfig { field, direction }
}
