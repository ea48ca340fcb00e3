//! Distances between missions and the address lookup service.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::async_ext::{with_cancel, with_timeout, FutureRailExt, DEFAULT_TIMEOUT};
use crate::rail::Rail;
use crate::types::{Failure, Outcome, RemoteError};

const EARTH_RADIUS_KM: f64 = 6371.0;
const USER_AGENT: &str = concat!("voisin-rail/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// A zero coordinate is how unset positions are stored.
    pub fn is_set(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }
}

/// Great-circle distance in kilometres, rounded to one decimal.
///
/// Returns `None` when either point is unset or has a zero component.
///
/// # Examples
///
/// ```
/// use voisin_rail::services::geo::{calculate_distance, Coordinates};
///
/// let paris = Coordinates::new(48.8566, 2.3522);
/// let lyon = Coordinates::new(45.7640, 4.8357);
/// assert_eq!(calculate_distance(Some(paris), Some(lyon)), Some(391.5));
/// ```
pub fn calculate_distance(from: Option<Coordinates>, to: Option<Coordinates>) -> Option<f64> {
    let (from, to) = (from.filter(Coordinates::is_set)?, to.filter(Coordinates::is_set)?);

    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    Some((EARTH_RADIUS_KM * c * 10.0).round() / 10.0)
}

#[derive(Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Client of the address lookup service.
#[derive(Debug, Clone)]
pub struct Geocoder {
    http: reqwest::Client,
    base: Url,
    rail: Rail,
}

impl Geocoder {
    pub fn new(base: Url, rail: Rail) -> Outcome<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, base, rail })
    }

    /// Looks up a French postal address.
    ///
    /// `Ok(None)` means the service answered but found nothing.
    pub async fn geocode(
        &self,
        token: &CancellationToken,
        address: &str,
        postal_code: &str,
        city: &str,
    ) -> Outcome<Option<Coordinates>> {
        let query = format!("{address}, {postal_code} {city}, France");
        let lookup = async {
            let url = self.search_url();
            let places: Vec<Place> = self
                .http
                .get(url)
                .query(&[("format", "json"), ("q", query.as_str()), ("limit", "1")])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            places.first().map(parse_place).transpose()
        };

        let pending =
            with_timeout(DEFAULT_TIMEOUT, lookup).safe(&self.rail, "géocodage de l'adresse");
        let found = with_cancel(token, pending).await?;
        if found.is_none() {
            tracing::warn!(address = %query, "address not found");
        }
        Ok(found)
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base.as_str().trim_end_matches('/'))
    }
}

fn parse_place(place: &Place) -> Result<Coordinates, Failure> {
    let coordinate = |raw: &str| {
        raw.parse::<f64>().map_err(|err| {
            Failure::new(RemoteError::Other {
                code: Some("DECODE_ERROR".to_owned()),
                message: format!("invalid coordinate {raw:?}: {err}"),
            })
        })
    };
    Ok(Coordinates::new(coordinate(&place.lat)?, coordinate(&place.lon)?))
}
