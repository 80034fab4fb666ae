//! Type cast resolver.
//!
//! Converts a value declared with the source property's datatype into the
//! shape the target property expects. Pure and total over its inputs: every
//! pair it does not know is a [`CastFailure`], and the caller keeps the
//! original value.
//!
//! | from \ to        | string family | monolingual | quantity | time |
//! |------------------|---------------|-------------|----------|------|
//! | string family    | yes           | yes         | yes      | yes  |
//! | monolingual text | yes           | -           | -        | -    |
//! | quantity         | yes           | -           | yes      | -    |
//! | time             | yes           | -           | -        | yes  |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use wbmigrate_model::{Datatype, Quantity, QuantityUnit, Time, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum CastFailure {
    #[error("no cast from {from} to {to}")]
    Unsupported { from: Datatype, to: Datatype },
    #[error("{value_type} value does not match declared datatype {datatype}")]
    PayloadMismatch { datatype: Datatype, value_type: String },
    #[error("`{value}` is not a valid {to}: {reason}")]
    Unparseable {
        to: Datatype,
        value: String,
        reason: String,
    },
}

/// Datatypes whose values are plain strings for casting purposes.
fn is_string_family(datatype: &Datatype) -> bool {
    datatype.is_string_like() || *datatype == Datatype::EntitySchema
}

pub fn cast(
    value: &Value,
    from: &Datatype,
    to: &Datatype,
    fallback_language: &str,
) -> Result<Value, CastFailure> {
    // Quantities and times are normalized even without a datatype change.
    if from == to && !has_normal_form(to) {
        return Ok(value.clone());
    }
    let unsupported = || CastFailure::Unsupported {
        from: from.clone(),
        to: to.clone(),
    };

    if is_string_family(from) {
        let text = expect_string(value, from)?;
        return match to {
            to if is_string_family(to) => to_string_family(text, to),
            Datatype::MonolingualText => Ok(Value::monolingual(text, fallback_language)),
            Datatype::Quantity => {
                let amount = normalize_amount(text).ok_or_else(|| unparseable(to, text, "not a decimal number"))?;
                Ok(Value::Quantity(Quantity::dimensionless(amount)))
            }
            Datatype::Time => parse_time(text, to).map(Value::Time),
            _ => Err(unsupported()),
        };
    }

    match (from, value) {
        (Datatype::MonolingualText, Value::MonolingualText(text)) if is_string_family(to) => {
            to_string_family(&text.text, to)
        }
        (Datatype::Quantity, Value::Quantity(quantity)) => match to {
            Datatype::Quantity => normalize_quantity(quantity).map(Value::Quantity),
            to if is_string_family(to) => to_string_family(quantity.amount.trim_start_matches('+'), to),
            _ => Err(unsupported()),
        },
        (Datatype::Time, Value::Time(time)) => match to {
            Datatype::Time => normalize_time(time, to).map(Value::Time),
            to if is_string_family(to) => to_string_family(&render_time(time, to)?, to),
            _ => Err(unsupported()),
        },
        (Datatype::MonolingualText | Datatype::Quantity | Datatype::Time, other)
            if other.value_type() != from_value_type(from) =>
        {
            Err(CastFailure::PayloadMismatch {
                datatype: from.clone(),
                value_type: other.value_type().to_string(),
            })
        }
        _ => Err(unsupported()),
    }
}

/// Datatypes whose values are rewritten into a normal form by a cast onto
/// themselves.
pub fn has_normal_form(datatype: &Datatype) -> bool {
    matches!(datatype, Datatype::Quantity | Datatype::Time)
}

/// `datavalue.type` expected for the structured datatypes.
fn from_value_type(datatype: &Datatype) -> &'static str {
    match datatype {
        Datatype::MonolingualText => "monolingualtext",
        Datatype::Quantity => "quantity",
        Datatype::Time => "time",
        _ => "",
    }
}

fn expect_string<'a>(value: &'a Value, datatype: &Datatype) -> Result<&'a str, CastFailure> {
    match value {
        Value::String { value } => Ok(value),
        other => Err(CastFailure::PayloadMismatch {
            datatype: datatype.clone(),
            value_type: other.value_type().to_string(),
        }),
    }
}

fn unparseable(to: &Datatype, value: &str, reason: &str) -> CastFailure {
    CastFailure::Unparseable {
        to: to.clone(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn to_string_family(text: &str, to: &Datatype) -> Result<Value, CastFailure> {
    if *to == Datatype::Url {
        url::Url::parse(text).map_err(|err| unparseable(to, text, &err.to_string()))?;
    }
    Ok(Value::string(text))
}

// ============================================================================
// Quantities
// ============================================================================

/// `12.5` → `+12.5`; `-3` stays `-3`. `None` when not a plain decimal.
fn normalize_amount(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (sign, digits) = match raw.as_bytes().first()? {
        b'+' => ('+', &raw[1..]),
        b'-' => ('-', &raw[1..]),
        _ => ('+', raw),
    };
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int) || frac.is_some_and(|f| !all_digits(f)) {
        return None;
    }
    Some(format!("{sign}{digits}"))
}

fn normalize_quantity(quantity: &Quantity) -> Result<Quantity, CastFailure> {
    let normalize = |raw: &str| {
        normalize_amount(raw).ok_or_else(|| unparseable(&Datatype::Quantity, raw, "not a decimal number"))
    };
    let bound = |raw: &Option<String>| raw.as_deref().map(normalize).transpose();
    let unit = match &quantity.unit {
        QuantityUnit::Iri(iri) if iri.trim().is_empty() => QuantityUnit::Dimensionless,
        unit => unit.clone(),
    };
    Ok(Quantity {
        amount: normalize(quantity.amount.as_str())?,
        upper_bound: bound(&quantity.upper_bound)?,
        lower_bound: bound(&quantity.lower_bound)?,
        unit,
    })
}

// ============================================================================
// Times
// ============================================================================

struct DateParts {
    negative: bool,
    year: i64,
    month: u32,
    day: u32,
}

/// Parses `YYYY`, `YYYY-MM`, `YYYY-MM-DD` (optionally signed) and full
/// timestamps like `+1990-05-17T00:00:00Z`. Returns the parts and the
/// precision implied by the number of components.
fn parse_date(raw: &str) -> Option<(DateParts, u8)> {
    let raw = raw.trim();
    let (negative, rest) = match raw.as_bytes().first()? {
        b'+' => (false, &raw[1..]),
        b'-' => (true, &raw[1..]),
        _ => (false, raw),
    };
    let date = rest.split_once('T').map_or(rest, |(date, _)| date);
    let mut components = date.split('-');
    let year_text = components.next()?;
    if year_text.is_empty() || !year_text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i64 = year_text.parse().ok()?;
    let mut numbers = Vec::new();
    for component in components {
        if component.is_empty() || component.len() > 2 || !component.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        numbers.push(component.parse::<u32>().ok()?);
    }
    let (month, day, precision) = match numbers.as_slice() {
        [] => (0, 0, Time::PRECISION_YEAR),
        [month] => (*month, 0, Time::PRECISION_MONTH),
        [month, day] => (*month, *day, Time::PRECISION_DAY),
        _ => return None,
    };
    Some((
        DateParts {
            negative,
            year,
            month,
            day,
        },
        precision,
    ))
}

/// Zero every component finer than `precision` and check what remains.
fn normalized_timestamp(parts: &DateParts, precision: u8, to: &Datatype, raw: &str) -> Result<String, CastFailure> {
    let month = if precision >= Time::PRECISION_MONTH { parts.month } else { 0 };
    let day = if precision >= Time::PRECISION_DAY { parts.day } else { 0 };

    if precision >= Time::PRECISION_MONTH && !(1..=12).contains(&month) {
        return Err(unparseable(to, raw, "month out of range"));
    }
    if precision >= Time::PRECISION_DAY {
        let year = if parts.negative { -parts.year } else { parts.year };
        let valid = i32::try_from(year)
            .ok()
            .and_then(|y| NaiveDate::from_ymd_opt(y, month, day))
            .is_some();
        if !valid {
            return Err(unparseable(to, raw, "no such calendar date"));
        }
    }
    let sign = if parts.negative { '-' } else { '+' };
    Ok(format!("{sign}{:04}-{month:02}-{day:02}T00:00:00Z", parts.year))
}

fn parse_time(raw: &str, to: &Datatype) -> Result<Time, CastFailure> {
    let (parts, precision) = parse_date(raw).ok_or_else(|| unparseable(to, raw, "expected YYYY, YYYY-MM or YYYY-MM-DD"))?;
    let timestamp = normalized_timestamp(&parts, precision, to, raw)?;
    Ok(Time::new(timestamp, precision))
}

fn normalize_time(time: &Time, to: &Datatype) -> Result<Time, CastFailure> {
    let (parts, _) = parse_date(&time.time).ok_or_else(|| unparseable(to, &time.time, "malformed timestamp"))?;
    let precision = time.precision.min(Time::PRECISION_DAY);
    Ok(Time {
        time: normalized_timestamp(&parts, precision, to, &time.time)?,
        precision,
        ..time.clone()
    })
}

/// `+1990-05-17T00:00:00Z` at precision 10 → `1990-05`.
fn render_time(time: &Time, to: &Datatype) -> Result<String, CastFailure> {
    let (parts, _) = parse_date(&time.time).ok_or_else(|| unparseable(to, &time.time, "malformed timestamp"))?;
    let sign = if parts.negative { "-" } else { "" };
    Ok(match time.precision {
        p if p >= Time::PRECISION_DAY => format!("{sign}{:04}-{:02}-{:02}", parts.year, parts.month, parts.day),
        Time::PRECISION_MONTH => format!("{sign}{:04}-{:02}", parts.year, parts.month),
        _ => format!("{sign}{:04}", parts.year),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cast_to(value: Value, from: Datatype, to: Datatype) -> Result<Value, CastFailure> {
        cast(&value, &from, &to, "en")
    }

    #[test]
    fn string_family_members_convert_freely() {
        let v = cast_to(Value::string("abc"), Datatype::ExternalId, Datatype::String).unwrap();
        assert_eq!(v, Value::string("abc"));
    }

    #[test]
    fn url_targets_are_validated() {
        assert!(cast_to(Value::string("https://example.org/x"), Datatype::String, Datatype::Url).is_ok());
        assert!(matches!(
            cast_to(Value::string("not a url"), Datatype::String, Datatype::Url),
            Err(CastFailure::Unparseable { .. })
        ));
    }

    #[test]
    fn monolingual_text_uses_the_fallback_language() {
        let v = cast(&Value::string("Berlin"), &Datatype::String, &Datatype::MonolingualText, "de").unwrap();
        assert_eq!(v, Value::monolingual("Berlin", "de"));
        let back = cast_to(v, Datatype::MonolingualText, Datatype::ExternalId).unwrap();
        assert_eq!(back, Value::string("Berlin"));
    }

    #[test]
    fn quantities_get_a_sign_and_a_unit() {
        let v = cast_to(Value::string("12.5"), Datatype::String, Datatype::Quantity).unwrap();
        assert_eq!(v, Value::Quantity(Quantity::dimensionless("+12.5")));
        assert!(cast_to(Value::string("12,5"), Datatype::String, Datatype::Quantity).is_err());

        let mut q = Quantity::dimensionless("7");
        q.unit = QuantityUnit::Iri(String::new());
        q.upper_bound = Some("8".into());
        let normalized = normalize_quantity(&q).unwrap();
        assert_eq!(normalized.amount, "+7");
        assert_eq!(normalized.upper_bound.as_deref(), Some("+8"));
        assert_eq!(normalized.unit, QuantityUnit::Dimensionless);

        let s = cast_to(Value::Quantity(Quantity::dimensionless("+3")), Datatype::Quantity, Datatype::String).unwrap();
        assert_eq!(s, Value::string("3"));
    }

    #[test]
    fn dates_map_to_precisions() {
        let year = cast_to(Value::string("1990"), Datatype::String, Datatype::Time).unwrap();
        assert_eq!(year, Value::Time(Time::new("+1990-00-00T00:00:00Z", 9)));
        let month = cast_to(Value::string("1990-05"), Datatype::String, Datatype::Time).unwrap();
        assert_eq!(month, Value::Time(Time::new("+1990-05-00T00:00:00Z", 10)));
        let day = cast_to(Value::string("1990-05-17"), Datatype::String, Datatype::Time).unwrap();
        assert_eq!(day, Value::Time(Time::new("+1990-05-17T00:00:00Z", 11)));
    }

    #[test]
    fn impossible_dates_fail() {
        assert!(cast_to(Value::string("1990-02-30"), Datatype::String, Datatype::Time).is_err());
        assert!(cast_to(Value::string("1990-13"), Datatype::String, Datatype::Time).is_err());
        assert!(cast_to(Value::string("May 1990"), Datatype::String, Datatype::Time).is_err());
    }

    #[test]
    fn time_precision_zeroes_finer_components() {
        let mut t = Time::new("+1990-05-17T00:00:00Z", 9);
        t.calendar_model = "http://www.wikidata.org/entity/Q1985786".into();
        let out = normalize_time(&t, &Datatype::Time).unwrap();
        assert_eq!(out.time, "+1990-00-00T00:00:00Z");
        assert_eq!(out.calendar_model, t.calendar_model);

        let rendered = cast_to(Value::Time(Time::new("+1990-05-17T00:00:00Z", 10)), Datatype::Time, Datatype::String).unwrap();
        assert_eq!(rendered, Value::string("1990-05"));
    }

    #[test]
    fn same_datatype_casts_normalize() {
        let mut q = Quantity::dimensionless("7");
        q.unit = QuantityUnit::Iri(String::new());
        let v = cast_to(Value::Quantity(q), Datatype::Quantity, Datatype::Quantity).unwrap();
        assert_eq!(v, Value::Quantity(Quantity::dimensionless("+7")));

        let t = cast_to(
            Value::Time(Time::new("+1990-05-17T00:00:00Z", 9)),
            Datatype::Time,
            Datatype::Time,
        )
        .unwrap();
        assert_eq!(t, Value::Time(Time::new("+1990-00-00T00:00:00Z", 9)));

        let s = cast_to(Value::string(" x "), Datatype::String, Datatype::String).unwrap();
        assert_eq!(s, Value::string(" x "));
    }

    #[test]
    fn unsupported_pairs_and_mismatched_payloads_fail() {
        assert!(matches!(
            cast_to(Value::string("Q5"), Datatype::String, Datatype::WikibaseItem),
            Err(CastFailure::Unsupported { .. })
        ));
        assert!(matches!(
            cast_to(Value::string("x"), Datatype::Quantity, Datatype::String),
            Err(CastFailure::PayloadMismatch { .. })
        ));
        assert!(matches!(
            cast_to(Value::monolingual("x", "en"), Datatype::String, Datatype::Url),
            Err(CastFailure::PayloadMismatch { .. })
        ));
    }
}
