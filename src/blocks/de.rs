//! Lenient field deserializers for stored block lists.
//!
//! Stored lists come from an editor that writes `null` for untouched
//! fields. These helpers read `null` as the field's empty value.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{load_blocks_value, Block};
use crate::formula::AggregateFn;

/// A stored block list loaded the way [`load_blocks_value`] loads one.
/// `null` stays `None`; a present list drops its malformed elements.
pub fn stored_blocks<'de, D>(deserializer: D) -> Result<Option<Vec<Block>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => load_blocks_value(value).map(Some).map_err(D::Error::custom),
    }
}

/// `null` becomes `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Non-negative index. `null` and negative values become 0.
pub fn entry_index<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?.unwrap_or(0);
    Ok(u32::try_from(raw.max(0)).unwrap_or(u32::MAX))
}

/// Blank strings become `None`.
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

/// Group function by name. Blank or unknown names become `None`.
pub fn group_fn<'de, D>(deserializer: D) -> Result<Option<AggregateFn>, D::Error>
where
    D: Deserializer<'de>,
{
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(name.and_then(|n| match AggregateFn::from_name(n.trim()) {
        Some((func, false)) => Some(func),
        _ => {
            if !n.trim().is_empty() {
                log::debug!("ignoring unknown group function '{}'", n);
            }
            None
        }
    }))
}
