//! Resource classes and the requests the gateway can serve
//!
//! A `ResourceRequest` knows two things about itself: the deterministic cache
//! key it collides to, and the upstream path that answers it.

use std::fmt;

use chrono::NaiveDate;

use crate::error::ValidationError;

/// Path prefix shared by every data endpoint
const TIMES_OF_DAY_PREFIX: &str = "/api/timesofday";

/// Key used for resources without identifying parameters
const WHOLE_COLLECTION_KEY: &str = "all";

/// The cacheable upstream query types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Countries,
    Cities,
    Districts,
    DailyPrayerTimes,
    MonthlyPrayerTimes,
    YearlyPrayerTimes,
}

impl ResourceClass {
    /// Short name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::Countries => "countries",
            ResourceClass::Cities => "cities",
            ResourceClass::Districts => "districts",
            ResourceClass::DailyPrayerTimes => "daily",
            ResourceClass::MonthlyPrayerTimes => "monthly",
            ResourceClass::YearlyPrayerTimes => "yearly",
        }
    }

    /// Countries, cities and districts change rarely
    pub fn is_reference_data(&self) -> bool {
        matches!(
            self,
            ResourceClass::Countries | ResourceClass::Cities | ResourceClass::Districts
        )
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The id an endpoint is selected by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PlaceScope {
    District(u32),
    City(u32),
    Country(u32),
}

/// A location for prayer-time lookups
///
/// At least one id is always present, so the endpoint scope always exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Place {
    country_id: Option<u32>,
    city_id: Option<u32>,
    district_id: Option<u32>,
    scope: PlaceScope,
}

impl Place {
    pub fn new(
        country_id: Option<u32>,
        city_id: Option<u32>,
        district_id: Option<u32>,
    ) -> Result<Self, ValidationError> {
        let scope = district_id
            .map(PlaceScope::District)
            .or(city_id.map(PlaceScope::City))
            .or(country_id.map(PlaceScope::Country))
            .ok_or(ValidationError::MissingPlace)?;
        Ok(Self {
            country_id,
            city_id,
            district_id,
            scope,
        })
    }

    pub fn country(country_id: u32) -> Self {
        Self {
            country_id: Some(country_id),
            city_id: None,
            district_id: None,
            scope: PlaceScope::Country(country_id),
        }
    }

    pub fn city(city_id: u32) -> Self {
        Self {
            country_id: None,
            city_id: Some(city_id),
            district_id: None,
            scope: PlaceScope::City(city_id),
        }
    }

    pub fn district(district_id: u32) -> Self {
        Self {
            country_id: None,
            city_id: None,
            district_id: Some(district_id),
            scope: PlaceScope::District(district_id),
        }
    }

    /// Appends every supplied id in fixed order
    fn key_params(&self, params: &mut Vec<(&'static str, String)>) {
        if let Some(id) = self.country_id {
            params.push(("country", id.to_string()));
        }
        if let Some(id) = self.city_id {
            params.push(("city", id.to_string()));
        }
        if let Some(id) = self.district_id {
            params.push(("district", id.to_string()));
        }
    }

    /// Picks the most specific endpoint variant: district, then city, then country
    fn endpoint(&self, base: &str) -> String {
        match self.scope {
            PlaceScope::District(id) => format!("{}?districtId={}", base, id),
            PlaceScope::City(id) => format!("{}ByCity?cityId={}", base, id),
            PlaceScope::Country(id) => format!("{}ByCountry?countryId={}", base, id),
        }
    }
}

/// A fully specified request for one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRequest {
    Countries,
    Cities { country_id: u32 },
    Districts { city_id: u32 },
    DailyPrayerTimes { place: Place, date: NaiveDate },
    MonthlyPrayerTimes { place: Place, year: i32, month: u32 },
    YearlyPrayerTimes { place: Place, year: i32 },
}

impl ResourceRequest {
    /// Builds a monthly request, rejecting months outside 1-12
    pub fn monthly(place: Place, year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidMonth(month));
        }
        Ok(ResourceRequest::MonthlyPrayerTimes { place, year, month })
    }

    pub fn class(&self) -> ResourceClass {
        match self {
            ResourceRequest::Countries => ResourceClass::Countries,
            ResourceRequest::Cities { .. } => ResourceClass::Cities,
            ResourceRequest::Districts { .. } => ResourceClass::Districts,
            ResourceRequest::DailyPrayerTimes { .. } => ResourceClass::DailyPrayerTimes,
            ResourceRequest::MonthlyPrayerTimes { .. } => ResourceClass::MonthlyPrayerTimes,
            ResourceRequest::YearlyPrayerTimes { .. } => ResourceClass::YearlyPrayerTimes,
        }
    }

    /// Derives the cache key from the identifying parameters in fixed order
    pub fn cache_key(&self) -> CacheKey {
        let mut params: Vec<(&'static str, String)> = Vec::new();
        match self {
            ResourceRequest::Countries => {}
            ResourceRequest::Cities { country_id } => {
                params.push(("country", country_id.to_string()));
            }
            ResourceRequest::Districts { city_id } => {
                params.push(("city", city_id.to_string()));
            }
            ResourceRequest::DailyPrayerTimes { place, date } => {
                place.key_params(&mut params);
                params.push(("date", date.format("%Y-%m-%d").to_string()));
            }
            ResourceRequest::MonthlyPrayerTimes { place, year, month } => {
                place.key_params(&mut params);
                params.push(("year", year.to_string()));
                params.push(("month", format!("{:02}", month)));
            }
            ResourceRequest::YearlyPrayerTimes { place, year } => {
                place.key_params(&mut params);
                params.push(("year", year.to_string()));
            }
        }
        CacheKey::from_params(&params)
    }

    /// Upstream path relative to the configured base URL
    pub fn upstream_path(&self) -> String {
        let endpoint = match self {
            ResourceRequest::Countries => "/GetCountries".to_string(),
            ResourceRequest::Cities { country_id } => {
                format!("/GetCities?countryId={}", country_id)
            }
            ResourceRequest::Districts { city_id } => format!("/GetDistricts?cityId={}", city_id),
            ResourceRequest::DailyPrayerTimes { place, date } => format!(
                "{}&date={}",
                place.endpoint("/GetTimesOfDay"),
                date.format("%Y-%m-%d")
            ),
            ResourceRequest::MonthlyPrayerTimes { place, year, month } => format!(
                "{}&year={}&month={:02}",
                place.endpoint("/GetMonthlyPrayerTime"),
                year,
                month
            ),
            ResourceRequest::YearlyPrayerTimes { place, year } => format!(
                "{}&year={}",
                place.endpoint("/GetYearlyPrayerTime"),
                year
            ),
        };
        format!("{}{}", TIMES_OF_DAY_PREFIX, endpoint)
    }
}

/// Deterministic key of a cache entry within one resource class
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    fn from_params(params: &[(&'static str, String)]) -> Self {
        if params.is_empty() {
            return CacheKey(WHOLE_COLLECTION_KEY.to_string());
        }
        let joined = params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(",");
        CacheKey(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        CacheKey(value.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
