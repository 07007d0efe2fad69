//! Lenient number deserializers for third-party payloads that send
//! integers either as JSON numbers or as decimal strings.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};

/// `u64` from a JSON number or numeric string.
pub fn u64_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserializer.deserialize_any(AmountVisitor)?;
    u64::try_from(value).map_err(|_| de::Error::custom(format!("{value} does not fit in u64")))
}

/// Optional `u64`; `null` and missing map to `None`.
pub fn opt_u64_lenient<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserializer.deserialize_option(OptionalAmountVisitor)?;
    value
        .map(|v| u64::try_from(v).map_err(|_| de::Error::custom(format!("{v} does not fit in u64"))))
        .transpose()
}

/// Optional raw token amount. Amounts routinely exceed `u64`.
pub fn opt_amount<'de, D>(deserializer: D) -> Result<Option<u128>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_option(OptionalAmountVisitor)
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = u128;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
        Ok(u128::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
        u128::try_from(v).map_err(|_| E::custom(format!("negative amount {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<u128, E> {
        // Integers beyond u64 arrive here from serde_json without
        // arbitrary precision; keep the integral part.
        if v.is_finite() && v >= 0.0 {
            Ok(v.trunc() as u128)
        } else {
            Err(E::custom(format!("invalid amount {v}")))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        trimmed
            .parse::<u128>()
            .map_err(|e| E::custom(format!("invalid amount {v:?}: {e}")))
    }
}

struct OptionalAmountVisitor;

impl<'de> Visitor<'de> for OptionalAmountVisitor {
    type Value = Option<u128>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an optional integer amount")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(AmountVisitor).map(Some)
    }
}
