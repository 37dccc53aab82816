//! Date built-in.
//!
//! A date is its milliseconds-since-epoch value; the accessors work in
//! UTC. Calendar math uses the days-from-civil algorithm.

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::{JsObject, ObjectKind, PropertyMap};
use crate::runner::ds::primitives::{BuiltinKind, NativeRegistry};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::eval::expression::to_number_type;
use crate::runner::eval::types::EvalContext;

use super::add_method;
use super::core::wrong_this;

pub fn register(registry: &Rc<NativeRegistry>) {
    let proto = registry.proto_of(BuiltinKind::Date);
    add_method(registry, &proto, "getTime", date_get_time);
    add_method(registry, &proto, "valueOf", date_get_time);
    add_method(registry, &proto, "getFullYear", date_get_full_year);
    add_method(registry, &proto, "toString", date_to_string);

    let ctor = registry.ctor_of(BuiltinKind::Date);
    add_method(registry, &ctor, "now", date_now);
}

pub fn construct(args: Vec<JsValue>, registry: &Rc<NativeRegistry>) -> Result<JsValue, EvalError> {
    let ms = match args.first() {
        None => now_ms(),
        Some(value) => to_number_type(value).to_f64(),
    };
    Ok(new_date(ms, registry))
}

pub fn new_date(ms: f64, registry: &Rc<NativeRegistry>) -> JsValue {
    JsValue::Object(Rc::new(std::cell::RefCell::new(JsObject {
        kind: ObjectKind::Date(ms),
        properties: PropertyMap::new(),
        proto: Some(registry.proto_of(BuiltinKind::Date)),
    })))
}

fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}

fn this_ms(this: &JsValue, method: &str) -> Result<f64, EvalError> {
    match this.as_object() {
        Some(o) => match o.borrow().kind {
            ObjectKind::Date(ms) => Ok(ms),
            _ => Err(wrong_this(method)),
        },
        None => Err(wrong_this(method)),
    }
}

/// Days-from-civil inverse: (year, month 1-12, day 1-31) of a day count
/// since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if month <= 2 { year + 1 } else { year }, month, day)
}

fn split_ms(ms: f64) -> (i64, u32, u32, u32, u32, u32, u32) {
    let total = ms as i64;
    let day_ms = 86_400_000i64;
    let days = total.div_euclid(day_ms);
    let in_day = total.rem_euclid(day_ms);
    let (year, month, day) = civil_from_days(days);
    let hour = (in_day / 3_600_000) as u32;
    let minute = (in_day / 60_000 % 60) as u32;
    let second = (in_day / 1000 % 60) as u32;
    let millisecond = (in_day % 1000) as u32;
    (year, month, day, hour, minute, second, millisecond)
}

/// Date.prototype.getTime / valueOf
fn date_get_time(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let ms = this_ms(&this, "getTime")?;
    Ok(JsValue::Number(JsNumberType::from_f64(ms)))
}

/// Date.prototype.getFullYear (UTC)
fn date_get_full_year(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let ms = this_ms(&this, "getFullYear")?;
    if ms.is_nan() {
        return Ok(JsValue::Number(JsNumberType::NaN));
    }
    let (year, ..) = split_ms(ms);
    Ok(JsValue::Number(JsNumberType::Integer(year)))
}

/// Date.prototype.toString - ISO 8601, UTC.
fn date_to_string(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let ms = this_ms(&this, "toString")?;
    if ms.is_nan() {
        return Ok(JsValue::String("Invalid Date".to_string()));
    }
    let (year, month, day, hour, minute, second, millisecond) = split_ms(ms);
    Ok(JsValue::String(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        year, month, day, hour, minute, second, millisecond
    )))
}

/// Date.now
fn date_now(
    _ctx: &mut EvalContext,
    _this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(JsValue::Number(JsNumberType::from_f64(now_ms())))
}
