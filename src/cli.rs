//! Command-line interface for the gateway
//!
//! This is the route layer: it parses arguments with clap, supplies default
//! dates, validates places and builds the `GatewayConfig` from flags or their
//! environment variables.

use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use clap::{Args, Parser, Subcommand};

use crate::config::{CacheTtls, Credentials, GatewayConfig, DEFAULT_BASE_URL};
use crate::error::ValidationError;
use crate::resource::{Place, ResourceRequest};

/// Awqat gateway - cached, authenticated access to prayer times
#[derive(Parser, Debug)]
#[command(name = "awqat")]
#[command(about = "Cached, authenticated access to the Awqat Salah prayer-time API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the upstream API
    #[arg(long, env = "AWQAT_API_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Login email for the upstream API
    #[arg(long, env = "AWQAT_EMAIL", global = true)]
    pub email: Option<String>,

    /// Login password for the upstream API
    #[arg(long, env = "AWQAT_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, env = "AWQAT_TIMEOUT_SECS", default_value_t = 10, global = true)]
    pub timeout_secs: u64,

    /// Cache TTL for daily and monthly prayer times, in seconds
    #[arg(long, env = "AWQAT_PRAYER_TTL_SECS", global = true)]
    pub prayer_ttl_secs: Option<u64>,

    /// Cache TTL for yearly prayer times, in seconds
    #[arg(long, env = "AWQAT_YEARLY_TTL_SECS", global = true)]
    pub yearly_ttl_secs: Option<u64>,

    /// Cache TTL for countries, cities and districts, in seconds
    #[arg(long, env = "AWQAT_REFERENCE_TTL_SECS", global = true)]
    pub reference_ttl_secs: Option<u64>,

    /// Re-fetch every N seconds until interrupted
    #[arg(long, value_name = "SECS", global = true)]
    pub watch: Option<u64>,
}

/// The resource to fetch
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List countries
    Countries,
    /// List the cities of a country
    Cities {
        #[arg(long)]
        country: u32,
    },
    /// List the districts of a city
    Districts {
        #[arg(long)]
        city: u32,
    },
    /// Prayer times for one day
    Daily {
        #[command(flatten)]
        place: PlaceArgs,
        /// Date as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Prayer times for one month
    Monthly {
        #[command(flatten)]
        place: PlaceArgs,
        /// Year (default: current year)
        #[arg(long)]
        year: Option<i32>,
        /// Month 1-12 (default: current month)
        #[arg(long)]
        month: Option<u32>,
    },
    /// Prayer times for one year
    Yearly {
        #[command(flatten)]
        place: PlaceArgs,
        /// Year (default: current year)
        #[arg(long)]
        year: Option<i32>,
    },
}

/// Location flags shared by the prayer-time commands
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PlaceArgs {
    #[arg(long)]
    pub country: Option<u32>,
    #[arg(long)]
    pub city: Option<u32>,
    #[arg(long)]
    pub district: Option<u32>,
}

impl PlaceArgs {
    fn to_place(&self) -> Result<Place, ValidationError> {
        Place::new(self.country, self.city, self.district)
    }
}

impl Command {
    /// Builds the gateway request, filling in dates relative to `today`
    pub fn to_request(&self, today: NaiveDate) -> Result<ResourceRequest, ValidationError> {
        match self {
            Command::Countries => Ok(ResourceRequest::Countries),
            Command::Cities { country } => Ok(ResourceRequest::Cities {
                country_id: *country,
            }),
            Command::Districts { city } => Ok(ResourceRequest::Districts { city_id: *city }),
            Command::Daily { place, date } => Ok(ResourceRequest::DailyPrayerTimes {
                place: place.to_place()?,
                date: date.unwrap_or(today),
            }),
            Command::Monthly { place, year, month } => ResourceRequest::monthly(
                place.to_place()?,
                year.unwrap_or_else(|| today.year()),
                month.unwrap_or_else(|| today.month()),
            ),
            Command::Yearly { place, year } => Ok(ResourceRequest::YearlyPrayerTimes {
                place: place.to_place()?,
                year: year.unwrap_or_else(|| today.year()),
            }),
        }
    }
}

impl Cli {
    /// Builds the gateway configuration from the parsed flags
    pub fn gateway_config(&self) -> GatewayConfig {
        let defaults = CacheTtls::default();
        let ttls = CacheTtls {
            prayer_times: secs_or(self.prayer_ttl_secs, defaults.prayer_times),
            yearly: secs_or(self.yearly_ttl_secs, defaults.yearly),
            reference: secs_or(self.reference_ttl_secs, defaults.reference),
        };

        let mut config = GatewayConfig::default()
            .with_base_url(self.base_url.clone())
            .with_request_timeout(Duration::from_secs(self.timeout_secs))
            .with_ttls(ttls);
        if let (Some(email), Some(password)) = (&self.email, &self.password) {
            config = config.with_credentials(Credentials::new(email.clone(), password.clone()));
        }
        config
    }

    pub fn watch_interval(&self) -> Option<Duration> {
        self.watch.filter(|secs| *secs > 0).map(Duration::from_secs)
    }
}

fn secs_or(secs: Option<u64>, default: Duration) -> Duration {
    secs.map(Duration::from_secs).unwrap_or(default)
}
