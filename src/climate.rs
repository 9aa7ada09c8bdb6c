//! Historical (instrumental) climate data from the World Bank Climate Data API.
//!
//! The API serves CRU temperature and precipitation series per country or
//! river basin at yearly, monthly (climatology) and decade resolution.

use crate::api::{Client, enc};
use crate::error::{Result, WbdError};
use crate::models::{Cell, Period, ResultSet, Table};
use crate::places::{Location, Places};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Observed variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Precipitation (rainfall and assumed water equivalent), in millimeters.
    Pr,
    /// Temperature, in degrees Celsius.
    Tas,
}

impl DataType {
    pub const ALL: &'static [DataType] = &[DataType::Pr, DataType::Tas];

    pub fn name(self) -> &'static str {
        match self {
            DataType::Pr => "pr",
            DataType::Tas => "tas",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DataType::Pr => "Precipitation (rainfall and assumed water equivalent), in millimeters",
            DataType::Tas => "Temperature, in degrees Celsius",
        }
    }
}

/// Temporal resolution of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Year,
    /// Twelve monthly averages over the whole record, indexed 0-11.
    Month,
    Decade,
}

impl Interval {
    pub const ALL: &'static [Interval] = &[Interval::Year, Interval::Month, Interval::Decade];

    pub fn name(self) -> &'static str {
        match self {
            Interval::Year => "year",
            Interval::Month => "month",
            Interval::Decade => "decade",
        }
    }
}

/// Body format requested from the Climate Data API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Json,
    Csv,
}

impl ResponseFormat {
    fn extension(self) -> &'static str {
        match self {
            ResponseFormat::Json => "",
            ResponseFormat::Csv => ".csv",
        }
    }
}

/// Levels of a [`ClimateDataset`] that [`ClimateDataset::as_list`] can pivot on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Country,
    Type,
    Interval,
}

impl Level {
    const ALL: &'static [Level] = &[Level::Country, Level::Type, Level::Interval];

    pub fn name(self) -> &'static str {
        match self {
            Level::Country => "country",
            Level::Type => "type",
            Level::Interval => "interval",
        }
    }
}

macro_rules! named_from_str {
    ($ty:ty, $what:literal) => {
        impl FromStr for $ty {
            type Err = WbdError;

            fn from_str(s: &str) -> Result<Self> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(s))
                    .ok_or_else(|| WbdError::InvalidArgument(format!("unknown {}: {s:?}", $what)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

named_from_str!(DataType, "data type");
named_from_str!(Interval, "interval");
named_from_str!(Level, "level");

impl FromStr for ResponseFormat {
    type Err = WbdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ResponseFormat::Json),
            "csv" => Ok(ResponseFormat::Csv),
            other => Err(WbdError::InvalidArgument(format!("unknown format: {other:?}"))),
        }
    }
}

/// Options for [`Client::get_instrumental_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentalOptions {
    pub data_type: DataType,
    pub interval: Interval,
    pub format: ResponseFormat,
}

impl Default for InstrumentalOptions {
    fn default() -> Self {
        Self {
            data_type: DataType::Tas,
            interval: Interval::Year,
            format: ResponseFormat::Json,
        }
    }
}

/// One fetched series together with the URL it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub url: String,
    pub series: BTreeMap<Period, f64>,
}

pub type Nested<T> = BTreeMap<String, BTreeMap<DataType, BTreeMap<Interval, T>>>;

/// Every series fetched by [`Client::get_instrumental_dataset`], keyed by
/// location code, data type and interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClimateDataset {
    responses: Nested<Fetched>,
}

impl ClimateDataset {
    pub fn new(responses: Nested<Fetched>) -> Self {
        Self { responses }
    }

    pub fn responses(&self) -> &Nested<Fetched> {
        &self.responses
    }

    /// `location → type → interval → period → value`.
    pub fn as_dict(&self) -> Nested<BTreeMap<Period, f64>> {
        self.responses
            .iter()
            .map(|(loc, types)| {
                let types = types
                    .iter()
                    .map(|(dt, ivs)| {
                        let ivs = ivs.iter().map(|(iv, f)| (*iv, f.series.clone())).collect();
                        (*dt, ivs)
                    })
                    .collect();
                (loc.clone(), types)
            })
            .collect()
    }

    /// Flat `location → period → value` for one type and interval.
    pub fn series(&self, data_type: DataType, interval: Interval) -> ResultSet<f64> {
        self.responses
            .iter()
            .filter_map(|(loc, types)| {
                let fetched = types.get(&data_type)?.get(&interval)?;
                Some((loc.clone(), fetched.series.clone()))
            })
            .collect()
    }

    /// Pivot the dataset into a 2D table.
    ///
    /// `columns` picks the levels spread across columns (empty means type and
    /// interval); the remaining levels label the rows. The interval level
    /// always carries its period, e.g. `"year - 2008"`. With `use_dates` and
    /// interval as the only row level, yearly and decade labels become dates.
    pub fn as_list(&self, columns: &[Level], use_dates: bool) -> Result<Table> {
        let columns: Vec<Level> = if columns.is_empty() {
            vec![Level::Type, Level::Interval]
        } else {
            Level::ALL.iter().copied().filter(|l| columns.contains(l)).collect()
        };
        let rows: Vec<Level> = Level::ALL
            .iter()
            .copied()
            .filter(|l| !columns.contains(l))
            .collect();
        if rows.is_empty() {
            return Err(WbdError::InvalidArgument(
                "at least one level must stay on the rows".into(),
            ));
        }

        let mut cells: BTreeMap<Vec<KeyPart>, BTreeMap<Vec<KeyPart>, f64>> = BTreeMap::new();
        let mut col_keys: BTreeSet<Vec<KeyPart>> = BTreeSet::new();
        for (loc, types) in &self.responses {
            for (dt, ivs) in types {
                for (iv, fetched) in ivs {
                    for (period, value) in &fetched.series {
                        let part = |level: &Level| match level {
                            Level::Country => KeyPart::plain(loc),
                            Level::Type => KeyPart::plain(dt.name()),
                            Level::Interval => KeyPart {
                                label: iv.name().to_string(),
                                period: Some(period.clone()),
                            },
                        };
                        let row: Vec<KeyPart> = rows.iter().map(part).collect();
                        let col: Vec<KeyPart> = columns.iter().map(part).collect();
                        col_keys.insert(col.clone());
                        cells.entry(row).or_default().insert(col, *value);
                    }
                }
            }
        }

        let corner = rows.iter().map(|l| l.name()).collect::<Vec<_>>().join(" - ");
        let mut header = vec![Cell::Text(corner)];
        header.extend(col_keys.iter().map(|k| Cell::Text(join_parts(k))));

        let dates_only = use_dates && rows == [Level::Interval];
        let mut table = vec![header];
        for (row_key, values) in cells {
            let label = match row_key.first().and_then(|k| k.period.as_ref()) {
                Some(p) if dates_only => p
                    .start_date()
                    .map(Cell::Date)
                    .unwrap_or_else(|| Cell::Text(join_parts(&row_key))),
                _ => Cell::Text(join_parts(&row_key)),
            };
            let mut line = vec![label];
            line.extend(col_keys.iter().map(|c| Cell::Value(values.get(c).copied())));
            table.push(line);
        }
        Ok(table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct KeyPart {
    label: String,
    period: Option<Period>,
}

impl KeyPart {
    fn plain(label: &str) -> Self {
        Self {
            label: label.to_string(),
            period: None,
        }
    }
}

fn join_parts(parts: &[KeyPart]) -> String {
    parts
        .iter()
        .map(|p| match &p.period {
            Some(period) => format!("{} - {}", p.label, period),
            None => p.label.clone(),
        })
        .collect::<Vec<_>>()
        .join(" - ")
}

impl Client {
    /// Yearly temperature for one or more places.
    ///
    /// Returns `{ place: { year: °C } }` keyed by the identifiers exactly as
    /// given. An empty `places` returns an empty map without any request.
    ///
    /// ```no_run
    /// # use simple_wbd::Client;
    /// let client = Client::default();
    /// let italy = client.get_instrumental("Italy")?;
    /// assert!(italy.contains_key("Italy"));
    /// # Ok::<(), simple_wbd::WbdError>(())
    /// ```
    pub fn get_instrumental(&self, places: impl Into<Places>) -> Result<ResultSet<f64>> {
        self.get_instrumental_with(places, &InstrumentalOptions::default())
    }

    /// [`Client::get_instrumental`] with an explicit data type, interval and
    /// response format.
    ///
    /// ### Errors
    /// - [`WbdError::UnknownPlace`] / [`WbdError::InvalidBasin`] before any request
    /// - [`WbdError::NoData`] when the service returns an empty series
    /// - transport, status and decode errors of the first failing request
    pub fn get_instrumental_with(
        &self,
        places: impl Into<Places>,
        opts: &InstrumentalOptions,
    ) -> Result<ResultSet<f64>> {
        let resolved = resolve_all(&places.into())?;
        let mut out = ResultSet::new();
        for (place, loc) in resolved {
            let fetched = self.fetch_instrumental(&loc, opts.data_type, opts.interval, opts.format)?;
            if fetched.series.is_empty() {
                return Err(WbdError::NoData { place });
            }
            out.insert(place, fetched.series);
        }
        Ok(out)
    }

    /// Every combination of place, data type and interval.
    ///
    /// Empty `data_types` or `intervals` mean "all of them". Results are
    /// keyed by location code (`SVN`, `28`), not by the given identifier.
    pub fn get_instrumental_dataset(
        &self,
        places: impl Into<Places>,
        data_types: &[DataType],
        intervals: &[Interval],
    ) -> Result<ClimateDataset> {
        let resolved = resolve_all(&places.into())?;
        let data_types = if data_types.is_empty() {
            DataType::ALL
        } else {
            data_types
        };
        let intervals = if intervals.is_empty() {
            Interval::ALL
        } else {
            intervals
        };

        let mut responses: Nested<Fetched> = BTreeMap::new();
        for (place, loc) in &resolved {
            for &dt in data_types {
                for &iv in intervals {
                    let fetched = self.fetch_instrumental(loc, dt, iv, ResponseFormat::Json)?;
                    if fetched.series.is_empty() {
                        return Err(WbdError::NoData {
                            place: place.clone(),
                        });
                    }
                    responses
                        .entry(loc.code())
                        .or_default()
                        .entry(dt)
                        .or_default()
                        .insert(iv, fetched);
                }
            }
        }
        Ok(ClimateDataset::new(responses))
    }

    fn fetch_instrumental(
        &self,
        loc: &Location,
        data_type: DataType,
        interval: Interval,
        format: ResponseFormat,
    ) -> Result<Fetched> {
        let url = format!(
            "{}/v1/{}/cru/{}/{}/{}{}",
            self.config().climate_base_url,
            loc.kind(),
            data_type.name(),
            interval.name(),
            enc(&loc.code()),
            format.extension()
        );
        let body = self.get_text(&url)?;
        let series = match format {
            ResponseFormat::Json => parse_climate_json(&url, &body, interval)?,
            ResponseFormat::Csv => parse_climate_csv(&url, &body, interval)?,
        };
        Ok(Fetched { url, series })
    }
}

/// Resolve every place up front so an unknown one fails before any request.
fn resolve_all(places: &Places) -> Result<Vec<(String, Location)>> {
    places
        .iter()
        .map(|p| Ok((p.to_string(), Location::parse(p)?)))
        .collect()
}

fn to_period(interval: Interval, year: Option<i64>, month: Option<i64>) -> Option<Period> {
    match interval {
        Interval::Year => year.and_then(|y| i32::try_from(y).ok()).map(Period::Year),
        Interval::Decade => year.and_then(|y| i32::try_from(y).ok()).map(Period::Decade),
        Interval::Month => month.and_then(|m| u8::try_from(m).ok()).map(Period::MonthOfYear),
    }
}

/// Parse `[{"year": 1901, "data": 9.8}, ...]` (or `"month"` keyed) bodies.
pub fn parse_climate_json(url: &str, body: &str, interval: Interval) -> Result<BTreeMap<Period, f64>> {
    let v: Value = serde_json::from_str(body).map_err(|e| WbdError::decode(url, e))?;
    let Value::Array(items) = v else {
        return Err(WbdError::decode(url, "not a top-level array"));
    };
    let mut out = BTreeMap::new();
    for item in items {
        let int_field = |k: &str| {
            item.get(k).and_then(|v| {
                v.as_i64()
                    .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            })
        };
        let period = to_period(interval, int_field("year"), int_field("month"))
            .ok_or_else(|| WbdError::decode(url, format!("entry without {interval} key: {item}")))?;
        let value = match item.get("data") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => crate::models::parse_value(s),
            _ => None,
        };
        match value {
            Some(v) => {
                out.insert(period, v);
            }
            None => log::debug!("{url}: no value for {period}"),
        }
    }
    Ok(out)
}

/// Parse CSV bodies with a `year`/`month` column and a `data` column.
pub fn parse_climate_csv(url: &str, body: &str, interval: Interval) -> Result<BTreeMap<Period, f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = rdr.headers().map_err(|e| WbdError::decode(url, e))?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let key_name = match interval {
        Interval::Month => "month",
        Interval::Year | Interval::Decade => "year",
    };
    let key_col = column(key_name)
        .ok_or_else(|| WbdError::decode(url, format!("missing {key_name:?} column")))?;
    let data_col =
        column("data").ok_or_else(|| WbdError::decode(url, "missing \"data\" column"))?;

    let mut out = BTreeMap::new();
    for record in rdr.records() {
        let record = record.map_err(|e| WbdError::decode(url, e))?;
        let key = record
            .get(key_col)
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| WbdError::decode(url, format!("bad {key_name} in {record:?}")))?;
        let period = match interval {
            Interval::Month => to_period(interval, None, Some(key)),
            _ => to_period(interval, Some(key), None),
        }
        .ok_or_else(|| WbdError::decode(url, format!("bad {key_name} {key}")))?;
        if let Some(v) = record.get(data_col).and_then(crate::models::parse_value) {
            out.insert(period, v);
        }
    }
    Ok(out)
}
