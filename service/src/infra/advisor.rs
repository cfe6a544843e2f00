//! Prediction [`Advisor`] client.

use std::time::Duration;

use common::{DateTime, Percent};
use derive_more::{Display, Error, From};
use reqwest::Client;
use rust_decimal::{prelude::ToPrimitive as _, Decimal};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use tracerr::Traced;

use crate::{
    domain::{lot, Booking, Lot},
    read,
};

/// [`Advisor`] configuration.
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// Base URL of the prediction service.
    ///
    /// [`Advisor`] is disabled if [`None`].
    pub url: Option<String>,

    /// Timeout of a single prediction request.
    #[default(Duration::from_secs(5))]
    pub timeout: Duration,
}

/// Client of an external prediction service forecasting [`Lot`] availability.
#[derive(Clone, Debug)]
pub struct Advisor {
    /// [`Config`] of this [`Advisor`].
    config: Config,

    /// HTTP client to perform requests with.
    client: Client,
}

impl Advisor {
    /// Creates a new [`Advisor`] with the provided [`Config`].
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Requests a [`read::lot::Forecast`] of the provided [`Lot`] based on its
    /// recent [`Booking`]s.
    ///
    /// # Errors
    ///
    /// If this [`Advisor`] is disabled, or the prediction service fails or
    /// responds with garbage.
    pub async fn forecast(
        &self,
        lot: &Lot,
        history: &[Booking],
        now: DateTime,
    ) -> Result<read::lot::Forecast, Traced<AdvisorError>> {
        let url = self
            .config
            .url
            .as_deref()
            .ok_or_else(|| tracerr::new!(AdvisorError::Disabled))?;

        let request = Request {
            lot_id: lot.id,
            current_occupancy: lot.occupied_slots(),
            total_slots: lot.total_slots.get(),
            current_time: now.to_rfc3339(),
            historical_data: history.iter().map(Sample::from).collect(),
        };
        let response = self
            .client
            .post(format!("{}/predict", url.trim_end_matches('/')))
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(tracerr::from_and_wrap!(=> AdvisorError))?
            .json::<Response>()
            .await
            .map_err(tracerr::from_and_wrap!(=> AdvisorError))?;

        response.into_forecast(lot).map_err(tracerr::wrap!())
    }
}

/// Error of an [`Advisor`] prediction.
#[derive(Debug, Display, Error, From)]
pub enum AdvisorError {
    /// [`Advisor`] has no URL configured.
    #[display("`Advisor` is disabled")]
    #[from(ignore)]
    Disabled,

    /// HTTP request failed.
    #[display("Prediction request failed: {_0}")]
    Http(reqwest::Error),

    /// Prediction service responded with out-of-range values.
    #[display("Invalid prediction: {_0}")]
    #[from(ignore)]
    InvalidPrediction(#[error(not(source))] &'static str),
}

/// Body of a prediction request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Request {
    /// ID of the forecasted [`Lot`].
    lot_id: lot::Id,

    /// Number of currently occupied slots.
    current_occupancy: u16,

    /// Total number of slots.
    total_slots: u16,

    /// Current moment, as RFC 3339.
    current_time: String,

    /// Recent [`Booking`]s of the [`Lot`].
    historical_data: Vec<Sample>,
}

/// Past [`Booking`] as seen by the prediction service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Sample {
    /// Start of the [`Booking`], as RFC 3339.
    start_time: String,

    /// End of the [`Booking`], as RFC 3339.
    end_time: String,

    /// Duration of the [`Booking`] in hours.
    duration: u32,

    /// Day of the week the [`Booking`] starts on, with Sunday as `0`.
    day_of_week: u8,

    /// UTC hour of the day the [`Booking`] starts at.
    hour: u8,
}

impl From<&Booking> for Sample {
    fn from(booking: &Booking) -> Self {
        let starts_at = booking.starts_at;
        Self {
            start_time: starts_at.to_rfc3339(),
            end_time: booking.ends_at().to_rfc3339(),
            duration: booking.total_hours(),
            day_of_week: day_of_week(starts_at.coerce()),
            hour: starts_at.hour(),
        }
    }
}

/// Returns the day of the week of the provided [`DateTime`], with Sunday as
/// `0`.
fn day_of_week(at: DateTime) -> u8 {
    // 1970-01-01 was a Thursday.
    let day = (at.unix_timestamp().div_euclid(86_400) + 4).rem_euclid(7);
    u8::try_from(day).unwrap_or_default()
}

/// Body of a prediction response.
#[derive(Debug, Deserialize)]
struct Response {
    /// Predicted numbers of available slots.
    predictions: Predictions,

    /// Confidence of the [`Predictions`] as a `0..=1` fraction.
    confidence: f64,
}

/// Predicted numbers of available slots.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Predictions {
    /// Available slots in 1 hour.
    next_1_hour: f64,

    /// Available slots in 2 hours.
    next_2_hours: f64,

    /// Available slots in 4 hours.
    next_4_hours: f64,
}

impl Response {
    /// Converts this [`Response`] into a [`read::lot::Forecast`] of the
    /// provided [`Lot`].
    fn into_forecast(
        self,
        lot: &Lot,
    ) -> Result<read::lot::Forecast, Traced<AdvisorError>> {
        let total = lot.total_slots.get();
        let slots = |predicted: f64| {
            Decimal::try_from(predicted)
                .ok()
                .and_then(|d| d.round().to_u16())
                .filter(|&n| n <= total)
                .ok_or_else(|| {
                    tracerr::new!(AdvisorError::InvalidPrediction(
                        "slots out of range"
                    ))
                })
        };

        Ok(read::lot::Forecast {
            lot_id: lot.id,
            available_now: lot.available_slots(),
            in_1_hour: slots(self.predictions.next_1_hour)?,
            in_2_hours: slots(self.predictions.next_2_hours)?,
            in_4_hours: slots(self.predictions.next_4_hours)?,
            confidence: Decimal::try_from(self.confidence)
                .ok()
                .and_then(|c| Percent::from_fraction(c.round_dp(2)))
                .ok_or_else(|| {
                    tracerr::new!(AdvisorError::InvalidPrediction(
                        "confidence out of range"
                    ))
                })?,
            source: read::lot::ForecastSource::Advisor,
        })
    }
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Percent};

    use crate::{
        domain::{
            lot::{Address, Capacity, Coordinates, Name, Price},
            user, Lot,
        },
        read::lot::ForecastSource,
    };

    use super::{day_of_week, Advisor, Config, Response};

    fn lot() -> Lot {
        Lot::new(
            user::Id::new(),
            Name::new("Mall").unwrap(),
            Address::new("2 Ring Rd").unwrap(),
            Coordinates::new(0.0, 0.0).unwrap(),
            Capacity::new(50).unwrap(),
            Price::new("40INR".parse().unwrap()).unwrap(),
        )
    }

    #[test]
    fn computes_day_of_week() {
        // 1970-01-01 (Thursday) and 2024-03-10 (Sunday).
        assert_eq!(day_of_week(DateTime::from_unix_timestamp(0).unwrap()), 4);
        assert_eq!(
            day_of_week(DateTime::from_unix_timestamp(1_710_072_000).unwrap()),
            0,
        );
    }

    #[test]
    fn converts_response_into_forecast() {
        let lot = lot();
        let response: Response = serde_json::from_str(
            r#"{
                "predictions": {
                    "next1Hour": 41.6,
                    "next2Hours": 35,
                    "next4Hours": 20.2
                },
                "confidence": 0.82
            }"#,
        )
        .unwrap();

        let forecast = response.into_forecast(&lot).unwrap();
        assert_eq!(forecast.available_now, 50);
        assert_eq!(forecast.in_1_hour, 42);
        assert_eq!(forecast.in_2_hours, 35);
        assert_eq!(forecast.in_4_hours, 20);
        assert_eq!(forecast.confidence, "82".parse::<Percent>().unwrap());
        assert_eq!(forecast.source, ForecastSource::Advisor);
    }

    #[test]
    fn rejects_out_of_range_predictions() {
        let lot = lot();
        let response: Response = serde_json::from_str(
            r#"{
                "predictions": {
                    "next1Hour": 51,
                    "next2Hours": 35,
                    "next4Hours": 20
                },
                "confidence": 0.5
            }"#,
        )
        .unwrap();

        assert!(response.into_forecast(&lot).is_err());
    }

    #[tokio::test]
    async fn disabled_without_url() {
        let advisor = Advisor::new(Config::default());

        assert!(advisor
            .forecast(&lot(), &[], DateTime::now())
            .await
            .is_err());
    }
}
