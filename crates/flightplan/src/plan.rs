//! The flight plan entity.
//!
//! This module defines the in-memory shape of a filed flight plan and the
//! validation applied before a plan is filed or amended.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::FilingConfig;
use crate::error::{Error, Result};

/// Accepted shape of ICAO/IATA airport codes.
const AIRPORT_CODE_PATTERN: &str = r"^[A-Z0-9]{3,4}$";

/// Years a stored RFC 3339 timestamp can carry.
const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

static AIRPORT_CODE_REGEX: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

fn airport_code_regex() -> Result<&'static Regex> {
    AIRPORT_CODE_REGEX
        .get_or_init(|| Regex::new(AIRPORT_CODE_PATTERN))
        .as_ref()
        .map_err(|e| Error::internal(format!("bad airport pattern: {e}")))
}

/// A filed aviation flight plan.
///
/// Serialized with camelCase keys for callers; the stored document uses the
/// attribute names in [`crate::mapping::fields`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightPlan {
    /// Unique identifier (assigned by the adapter when the plan is filed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_plan_id: Option<String>,

    /// Aircraft registration or call sign, e.g. `N12345`.
    pub aircraft_identification: String,

    /// Aircraft type designator, e.g. `C172`.
    pub aircraft_type: String,

    /// Flight rules / type, e.g. `VFR`.
    pub flight_type: String,

    /// True airspeed in knots.
    pub air_speed: i32,

    /// Cruising altitude in feet.
    pub altitude: i32,

    /// Whole hours of fuel endurance.
    pub fuel_hours: i32,

    /// Remaining minutes of fuel endurance.
    pub fuel_minutes: i32,

    /// Departure airport code.
    pub departure_airport: String,

    /// Destination airport code.
    pub arrival_airport: String,

    /// Proposed departure time (UTC).
    pub departure_time: DateTime<Utc>,

    /// Estimated arrival time (UTC).
    pub arrival_time: DateTime<Utc>,

    /// Free-form route description.
    pub route: String,

    /// Optional remarks.
    #[serde(default)]
    pub remarks: Option<String>,

    /// Persons on board.
    pub number_on_board: i32,
}

impl FlightPlan {
    /// Estimated time en route, `arrival_time - departure_time`.
    ///
    /// Negative when the plan's times are inverted.
    #[must_use]
    pub fn time_enroute(&self) -> Duration {
        self.arrival_time - self.departure_time
    }

    /// Return a copy of this plan carrying the given identifier.
    #[must_use]
    pub fn with_id(mut self, flight_plan_id: impl Into<String>) -> Self {
        self.flight_plan_id = Some(flight_plan_id.into());
        self
    }

    /// Check that this plan can be filed under the given policy.
    ///
    /// All fields except `remarks` are required; the identifier is not checked
    /// because it is never taken from the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first offending field.
    pub fn validate(&self, policy: &FilingConfig) -> Result<()> {
        for (field, value) in [
            ("aircraftIdentification", &self.aircraft_identification),
            ("aircraftType", &self.aircraft_type),
            ("flightType", &self.flight_type),
            ("departureAirport", &self.departure_airport),
            ("arrivalAirport", &self.arrival_airport),
            ("route", &self.route),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(field, "must not be empty"));
            }
        }

        for (field, value) in [
            ("airSpeed", self.air_speed),
            ("altitude", self.altitude),
            ("fuelHours", self.fuel_hours),
            ("numberOnBoard", self.number_on_board),
        ] {
            if value < 0 {
                return Err(Error::validation(
                    field,
                    format!("must not be negative, got {value}"),
                ));
            }
        }

        if !(0..60).contains(&self.fuel_minutes) {
            return Err(Error::validation(
                "fuelMinutes",
                format!("must be between 0 and 59, got {}", self.fuel_minutes),
            ));
        }

        if policy.validate_airport_codes {
            let pattern = airport_code_regex()?;
            for (field, code) in [
                ("departureAirport", &self.departure_airport),
                ("arrivalAirport", &self.arrival_airport),
            ] {
                if !pattern.is_match(code) {
                    return Err(Error::validation(
                        field,
                        format!("'{code}' is not a 3-4 character airport code"),
                    ));
                }
            }
        }

        for (field, time) in [
            ("departureTime", self.departure_time),
            ("arrivalTime", self.arrival_time),
        ] {
            if !STORABLE_YEARS.contains(&time.year()) {
                return Err(Error::validation(
                    field,
                    format!("year {} is outside 1-9999", time.year()),
                ));
            }
        }

        if policy.reject_inverted_times && self.arrival_time < self.departure_time {
            return Err(Error::validation(
                "arrivalTime",
                "must not be earlier than departureTime",
            ));
        }

        Ok(())
    }
}
