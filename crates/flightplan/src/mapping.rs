//! Translation between [`FlightPlan`] and stored documents.
//!
//! Every entity field maps to exactly one stored attribute name. Datetimes are
//! stored as `{"$date": "<RFC 3339>"}` objects and integers as int32 numbers.
//! Decoding never fills in defaults: a missing or mistyped attribute is an
//! error, except for `remarks`, which may be `null` or absent.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::plan::FlightPlan;
use crate::store::Document;

/// Stored attribute names.
pub mod fields {
    /// Adapter-assigned plan identifier.
    pub const FLIGHT_PLAN_ID: &str = "flight_plan_id";
    /// Aircraft identification.
    pub const AIRCRAFT_IDENTIFICATION: &str = "aircraft_identification";
    /// Aircraft type.
    pub const AIRCRAFT_TYPE: &str = "aircraft_type";
    /// Airspeed in knots.
    pub const AIRSPEED: &str = "airspeed";
    /// Altitude in feet.
    pub const ALTITUDE: &str = "altitude";
    /// Flight type.
    pub const FLIGHT_TYPE: &str = "flight_type";
    /// Fuel endurance hours.
    pub const FUEL_HOURS: &str = "fuel_hours";
    /// Fuel endurance minutes.
    pub const FUEL_MINUTES: &str = "fuel_minutes";
    /// Departure time.
    pub const DEPARTURE_TIME: &str = "departure_time";
    /// Estimated arrival time, used by every operation.
    pub const ESTIMATED_ARRIVAL_TIME: &str = "estimated_arrival_time";
    /// Departure airport code.
    pub const DEPARTING_AIRPORT: &str = "departing_airport";
    /// Arrival airport code.
    pub const ARRIVAL_AIRPORT: &str = "arrival_airport";
    /// Route description.
    pub const ROUTE: &str = "route";
    /// Optional remarks.
    pub const REMARKS: &str = "remarks";
    /// Persons on board.
    pub const NUMBER_ONBOARD: &str = "number_onboard";
}

/// Key of the extended-JSON datetime wrapper.
const DATE_KEY: &str = "$date";

/// Encode a plan as a new document under the given identifier.
///
/// Any identifier already on `plan` is ignored.
#[must_use]
pub fn encode(flight_plan_id: &str, plan: &FlightPlan) -> Document {
    let mut document = Document::new();
    document.insert(fields::FLIGHT_PLAN_ID.to_string(), json!(flight_plan_id));
    document.extend(encode_fields(plan));
    document
}

/// Encode every attribute of `plan` except the identifier.
///
/// This is the set written by an update.
#[must_use]
pub fn encode_fields(plan: &FlightPlan) -> Document {
    let mut document = Document::new();
    let mut put = |key: &str, value: Value| {
        document.insert(key.to_string(), value);
    };

    put(
        fields::AIRCRAFT_IDENTIFICATION,
        json!(plan.aircraft_identification),
    );
    put(fields::AIRCRAFT_TYPE, json!(plan.aircraft_type));
    put(fields::AIRSPEED, json!(plan.air_speed));
    put(fields::ALTITUDE, json!(plan.altitude));
    put(fields::FLIGHT_TYPE, json!(plan.flight_type));
    put(fields::FUEL_HOURS, json!(plan.fuel_hours));
    put(fields::FUEL_MINUTES, json!(plan.fuel_minutes));
    put(fields::DEPARTURE_TIME, encode_datetime(plan.departure_time));
    put(
        fields::ESTIMATED_ARRIVAL_TIME,
        encode_datetime(plan.arrival_time),
    );
    put(fields::DEPARTING_AIRPORT, json!(plan.departure_airport));
    put(fields::ARRIVAL_AIRPORT, json!(plan.arrival_airport));
    put(fields::ROUTE, json!(plan.route));
    put(fields::REMARKS, json!(plan.remarks));
    put(fields::NUMBER_ONBOARD, json!(plan.number_on_board));

    document
}

/// Decode a stored document into a plan.
///
/// Storage-level attributes such as `_id` are ignored.
///
/// # Errors
///
/// Returns [`Error::MissingField`] or [`Error::InvalidField`] when a required
/// attribute is absent or has the wrong type.
pub fn decode(document: &Document) -> Result<FlightPlan> {
    Ok(FlightPlan {
        flight_plan_id: Some(get_string(document, fields::FLIGHT_PLAN_ID)?),
        aircraft_identification: get_string(document, fields::AIRCRAFT_IDENTIFICATION)?,
        aircraft_type: get_string(document, fields::AIRCRAFT_TYPE)?,
        flight_type: get_string(document, fields::FLIGHT_TYPE)?,
        air_speed: get_int32(document, fields::AIRSPEED)?,
        altitude: get_int32(document, fields::ALTITUDE)?,
        fuel_hours: get_int32(document, fields::FUEL_HOURS)?,
        fuel_minutes: get_int32(document, fields::FUEL_MINUTES)?,
        departure_airport: get_string(document, fields::DEPARTING_AIRPORT)?,
        arrival_airport: get_string(document, fields::ARRIVAL_AIRPORT)?,
        departure_time: get_datetime(document, fields::DEPARTURE_TIME)?,
        arrival_time: get_datetime(document, fields::ESTIMATED_ARRIVAL_TIME)?,
        route: get_string(document, fields::ROUTE)?,
        remarks: get_optional_string(document, fields::REMARKS)?,
        number_on_board: get_int32(document, fields::NUMBER_ONBOARD)?,
    })
}

fn encode_datetime(value: DateTime<Utc>) -> Value {
    json!({ DATE_KEY: value.to_rfc3339_opts(SecondsFormat::AutoSi, true) })
}

fn get<'a>(document: &'a Document, field: &'static str) -> Result<&'a Value> {
    document.get(field).ok_or(Error::MissingField { field })
}

fn get_string(document: &Document, field: &'static str) -> Result<String> {
    get(document, field)?
        .as_str()
        .map(str::to_string)
        .ok_or(Error::InvalidField {
            field,
            expected: "string",
        })
}

fn get_optional_string(document: &Document, field: &'static str) -> Result<Option<String>> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Error::InvalidField {
            field,
            expected: "string",
        }),
    }
}

fn get_int32(document: &Document, field: &'static str) -> Result<i32> {
    get(document, field)?
        .as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or(Error::InvalidField {
            field,
            expected: "int32",
        })
}

fn get_datetime(document: &Document, field: &'static str) -> Result<DateTime<Utc>> {
    let invalid = Error::InvalidField {
        field,
        expected: "datetime",
    };
    let Some(raw) = get(document, field)?
        .get(DATE_KEY)
        .and_then(Value::as_str)
    else {
        return Err(invalid);
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid)
}
