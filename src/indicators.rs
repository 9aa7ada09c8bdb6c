//! World Bank Indicators API: country and indicator catalogues and
//! indicator datasets.

use crate::api::{Client, enc, enc_join};
use crate::error::{Result, WbdError};
use crate::models::{Cell, Country, DataPoint, DateSpec, Entry, IndicatorMeta, Period, ResultSet, Table};
use crate::places::{Places, lookup_iso};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Named subsets of the indicator catalogue, as listed on the data site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorFilter {
    Common,
    Featured,
}

impl FromStr for IndicatorFilter {
    type Err = WbdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "common" => Ok(IndicatorFilter::Common),
            "featured" => Ok(IndicatorFilter::Featured),
            other => Err(WbdError::InvalidArgument(format!(
                "unknown indicator filter: {other:?}"
            ))),
        }
    }
}

/// Columns available to [`Client::get_country_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryField {
    Id,
    Iso2Code,
    Name,
    Region,
    AdminRegion,
    IncomeLevel,
    LendingType,
    CapitalCity,
}

pub const DEFAULT_COUNTRY_FIELDS: &[CountryField] =
    &[CountryField::Id, CountryField::Name, CountryField::IncomeLevel];

/// Catalogue columns appended by [`IndicatorDataset::as_list_with`].
pub const METADATA_FIELDS: &[CountryField] = &[
    CountryField::Id,
    CountryField::Iso2Code,
    CountryField::Region,
    CountryField::AdminRegion,
    CountryField::IncomeLevel,
    CountryField::LendingType,
];

impl CountryField {
    pub fn label(self) -> &'static str {
        match self {
            CountryField::Id => "Id",
            CountryField::Iso2Code => "ISO2 Code",
            CountryField::Name => "Name",
            CountryField::Region => "Region",
            CountryField::AdminRegion => "Admin Region",
            CountryField::IncomeLevel => "Income Level",
            CountryField::LendingType => "Lending Type",
            CountryField::CapitalCity => "Capital City",
        }
    }

    pub fn value(self, c: &Country) -> String {
        match self {
            CountryField::Id => c.id.clone(),
            CountryField::Iso2Code => c.iso2_code.clone(),
            CountryField::Name => c.name.clone(),
            CountryField::Region => c.region.as_text(),
            CountryField::AdminRegion => c.adminregion.as_text(),
            CountryField::IncomeLevel => c.income_level.as_text(),
            CountryField::LendingType => c.lending_type.as_text(),
            CountryField::CapitalCity => c.capital_city.clone(),
        }
    }
}

static INDICATOR_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"data\.worldbank\.org/indicator/([A-Za-z0-9._-]+)").expect("valid link regex")
});

/// Lowercased indicator ids of every `data.worldbank.org/indicator/<ID>`
/// link in an HTML page.
pub fn indicator_ids_from_html(html: &str) -> HashSet<String> {
    INDICATOR_LINK
        .captures_iter(html)
        .map(|c| c[1].trim_end_matches('.').to_ascii_lowercase())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Keep indicators whose id (case-insensitive) is in `ids`.
pub fn filter_indicators(indicators: Vec<IndicatorMeta>, ids: &HashSet<String>) -> Vec<IndicatorMeta> {
    indicators
        .into_iter()
        .filter(|i| ids.contains(&i.id.to_ascii_lowercase()))
        .collect()
}

/// Observations for one or more indicators, keyed by lowercased indicator id.
///
/// A dataset may carry the country catalogue it was resolved against, which
/// [`IndicatorDataset::as_list_with`] uses for metadata columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorDataset {
    responses: BTreeMap<String, Vec<DataPoint>>,
    countries: Vec<Country>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct DateKey {
    prefix: String,
    period: Period,
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.period)
    }
}

impl IndicatorDataset {
    pub fn new(responses: BTreeMap<String, Vec<DataPoint>>) -> Self {
        Self {
            responses,
            countries: Vec::new(),
        }
    }

    /// Attach a country catalogue for [`IndicatorDataset::as_list_with`].
    pub fn with_countries(mut self, countries: Vec<Country>) -> Self {
        self.countries = countries;
        self
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn indicators(&self) -> impl Iterator<Item = &str> {
        self.responses.keys().map(String::as_str)
    }

    pub fn points(&self, indicator: &str) -> Option<&[DataPoint]> {
        self.responses
            .get(&indicator.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// `country name → period → value` for one indicator.
    pub fn series(&self, indicator: &str) -> Option<ResultSet<Option<f64>>> {
        let points = self.points(indicator)?;
        let mut out = ResultSet::new();
        for p in points {
            out.entry(p.country_name.clone())
                .or_insert_with(BTreeMap::new)
                .insert(p.period.clone(), p.value);
        }
        Some(out)
    }

    /// Dataset as a 2D table whose first row is the header.
    ///
    /// Rows are countries and columns are dates; with `timeseries` the table
    /// is transposed and date labels become [`Cell::Date`] where possible.
    /// With several indicators the indicator id prefixes the dates (or the
    /// countries, for a timeseries) so the columns stay distinct.
    pub fn as_list(&self, timeseries: bool) -> Table {
        self.as_list_with(timeseries, false)
    }

    /// [`IndicatorDataset::as_list`], optionally followed by one column per
    /// [`METADATA_FIELDS`] entry describing each row's country.
    ///
    /// Countries are matched by name against the attached catalogue; rows
    /// without a match (or with no catalogue attached) get empty text.
    /// Metadata has no row to go on in a timeseries, so `timeseries` with
    /// `add_metadata` gives an empty table.
    pub fn as_list_with(&self, timeseries: bool, add_metadata: bool) -> Table {
        if self.responses.is_empty() {
            return Vec::new();
        }
        if timeseries && add_metadata {
            log::warn!("country metadata cannot be added to a timeseries table");
            return Vec::new();
        }
        let multi = self.responses.len() > 1;

        let mut data_map: BTreeMap<String, BTreeMap<DateKey, Option<f64>>> = BTreeMap::new();
        for (indicator, points) in &self.responses {
            let prefix = if multi {
                format!("{indicator} - ")
            } else {
                String::new()
            };
            for p in points {
                let (country, date_prefix) = if timeseries {
                    (format!("{prefix}{}", p.country_name), String::new())
                } else {
                    (p.country_name.clone(), prefix.clone())
                };
                let key = DateKey {
                    prefix: date_prefix,
                    period: p.period.clone(),
                };
                data_map.entry(country).or_default().insert(key, p.value);
            }
        }

        let dates: BTreeSet<&DateKey> = data_map.values().flat_map(|m| m.keys()).collect();
        let countries: Vec<&String> = data_map.keys().collect();
        let value = |country: &str, date: &DateKey| {
            Cell::Value(data_map.get(country).and_then(|m| m.get(date)).copied().flatten())
        };

        if timeseries {
            let mut header = vec![Cell::text("Date")];
            header.extend(countries.iter().map(|c| Cell::text(c.as_str())));
            let mut table = vec![header];
            for date in &dates {
                let label = match date.period.start_date() {
                    Some(d) if date.prefix.is_empty() => Cell::Date(d),
                    _ => Cell::Text(date.to_string()),
                };
                let mut row = vec![label];
                row.extend(countries.iter().map(|c| value(c, date)));
                table.push(row);
            }
            table
        } else {
            let by_name: HashMap<String, &Country> = self
                .countries
                .iter()
                .map(|c| (c.name.trim().to_lowercase(), c))
                .collect();
            let mut header = vec![Cell::text("Country")];
            header.extend(dates.iter().map(|d| Cell::Text(d.to_string())));
            if add_metadata {
                header.extend(METADATA_FIELDS.iter().map(|f| Cell::text(f.label())));
            }
            let mut table = vec![header];
            for country in &countries {
                let mut row = vec![Cell::text(country.as_str())];
                row.extend(dates.iter().map(|d| value(country, d)));
                if add_metadata {
                    let meta = by_name.get(&country.trim().to_lowercase());
                    row.extend(METADATA_FIELDS.iter().map(|f| {
                        Cell::Text(meta.map(|c| f.value(c)).unwrap_or_default())
                    }));
                }
                table.push(row);
            }
            table
        }
    }

    pub fn into_points(self) -> Vec<DataPoint> {
        self.responses.into_values().flatten().collect()
    }
}

impl Client {
    /// All countries and aggregate regions the Indicators API can be queried
    /// for, including non-ISO aggregates such as `WLD`.
    pub fn get_countries(&self) -> Result<Vec<Country>> {
        self.get_wb_list("country")
    }

    /// Country catalogue as rows of text, header first.
    ///
    /// An empty `fields` means [`DEFAULT_COUNTRY_FIELDS`].
    pub fn get_country_list(&self, fields: &[CountryField]) -> Result<Vec<Vec<String>>> {
        let fields = if fields.is_empty() {
            DEFAULT_COUNTRY_FIELDS
        } else {
            fields
        };
        let countries = self.get_countries()?;
        let mut out: Vec<Vec<String>> = vec![fields.iter().map(|f| f.label().to_string()).collect()];
        out.extend(
            countries
                .iter()
                .map(|c| fields.iter().map(|f| f.value(c)).collect()),
        );
        Ok(out)
    }

    /// Indicator catalogue, optionally narrowed to a named subset.
    pub fn get_indicators(&self, filter: Option<IndicatorFilter>) -> Result<Vec<IndicatorMeta>> {
        let indicators: Vec<IndicatorMeta> = self.get_wb_list("indicator")?;
        match filter {
            None => Ok(indicators),
            Some(f) => {
                let url = match f {
                    IndicatorFilter::Common => &self.config().common_indicators_url,
                    IndicatorFilter::Featured => &self.config().featured_indicators_url,
                };
                let ids = indicator_ids_from_html(&self.get_text(url)?);
                Ok(filter_indicators(indicators, &ids))
            }
        }
    }

    /// Indicator catalogue as `[Id, Name, Topics, Source]` rows, header first.
    pub fn get_indicator_list(&self, filter: Option<IndicatorFilter>) -> Result<Vec<Vec<String>>> {
        let indicators = self.get_indicators(filter)?;
        let mut out = vec![
            ["Id", "Name", "Topics", "Source"]
                .map(String::from)
                .to_vec(),
        ];
        for i in indicators {
            let topics = i
                .topics
                .iter()
                .map(|t| t.value.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            out.push(vec![
                i.id.trim().to_string(),
                i.name.trim().to_string(),
                topics,
                i.source.map(|s| s.value.trim().to_string()).unwrap_or_default(),
            ]);
        }
        Ok(out)
    }

    /// Fetch one or more indicators for the given countries.
    ///
    /// An empty `countries` means every country and aggregate. Each indicator
    /// is one request covering all countries; the first failure aborts the
    /// whole call.
    pub fn get_dataset<I, S>(
        &self,
        indicators: I,
        countries: impl Into<Places>,
        date: Option<DateSpec>,
    ) -> Result<IndicatorDataset>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fetch_dataset(indicators, countries.into(), date, None)
    }

    /// [`Client::get_dataset`] with the country catalogue attached, ready for
    /// [`IndicatorDataset::as_list_with`].
    ///
    /// The catalogue is fetched once and also used to resolve `countries`.
    pub fn get_dataset_with_metadata<I, S>(
        &self,
        indicators: I,
        countries: impl Into<Places>,
        date: Option<DateSpec>,
    ) -> Result<IndicatorDataset>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let catalogue = self.get_countries()?;
        self.fetch_dataset(indicators, countries.into(), date, Some(catalogue))
    }

    fn fetch_dataset<I, S>(
        &self,
        indicators: I,
        countries: Places,
        date: Option<DateSpec>,
        catalogue: Option<Vec<Country>>,
    ) -> Result<IndicatorDataset>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let indicators: BTreeSet<String> = indicators
            .into_iter()
            .map(|i| i.as_ref().trim().to_ascii_lowercase())
            .filter(|i| !i.is_empty())
            .collect();
        if indicators.is_empty() {
            return Err(WbdError::InvalidArgument(
                "at least one indicator code required".into(),
            ));
        }

        let resolved = self.resolve_countries(&countries, catalogue.as_deref())?;
        let country_spec = if resolved.is_empty() {
            "all".to_string()
        } else {
            let codes: BTreeSet<&str> = resolved.iter().map(|(_, c)| c.as_str()).collect();
            enc_join(codes)
        };

        let mut responses = BTreeMap::new();
        for indicator in indicators {
            let points = self.fetch_indicator(&country_spec, &indicator, date)?;
            responses.insert(indicator, points);
        }
        let dataset = IndicatorDataset::new(responses);
        Ok(match catalogue {
            Some(countries) => dataset.with_countries(countries),
            None => dataset,
        })
    }

    /// One indicator for one or more places, keyed by the identifiers as given.
    ///
    /// This is the indicator counterpart of [`Client::get_instrumental`]:
    /// an empty `places` returns an empty map without a request, and a place
    /// the service returns nothing for is [`WbdError::NoData`].
    pub fn get_indicator(
        &self,
        indicator: &str,
        places: impl Into<Places>,
        date: Option<DateSpec>,
    ) -> Result<ResultSet<Option<f64>>> {
        let places = places.into();
        if places.is_empty() {
            return Ok(ResultSet::new());
        }
        let resolved = self.resolve_countries(&places, None)?;
        let codes: BTreeSet<&str> = resolved.iter().map(|(_, c)| c.as_str()).collect();
        let points = self.fetch_indicator(&enc_join(codes), indicator.trim(), date)?;

        let mut by_code: HashMap<String, BTreeMap<Period, Option<f64>>> = HashMap::new();
        for p in points {
            let code = if p.country_iso3.is_empty() {
                lookup_iso(&p.country_id).map(str::to_string)
            } else {
                Some(p.country_iso3.to_ascii_uppercase())
            };
            if let Some(code) = code {
                by_code.entry(code).or_default().insert(p.period, p.value);
            }
        }

        let mut out = ResultSet::new();
        for (label, code) in resolved {
            match by_code.get(&code) {
                Some(series) => {
                    out.insert(label, series.clone());
                }
                None => return Err(WbdError::NoData { place: label }),
            }
        }
        Ok(out)
    }

    fn fetch_indicator(
        &self,
        country_spec: &str,
        indicator: &str,
        date: Option<DateSpec>,
    ) -> Result<Vec<DataPoint>> {
        let mut path = format!("country/{}/indicator/{}", country_spec, enc(indicator));
        if let Some(d) = date {
            path.push_str(&format!("?date={}", d.to_query_param()));
        }
        let entries: Vec<Entry> = self.get_wb_list(&path)?;
        Ok(entries.into_iter().map(DataPoint::from).collect())
    }

    /// Map each place to an upper-case code the Indicators API accepts.
    ///
    /// ISO countries resolve offline; anything else (aggregates like
    /// "World") is looked up in `catalogue`, or in the remote catalogue
    /// fetched at most once when none is given.
    fn resolve_countries(
        &self,
        places: &Places,
        catalogue: Option<&[Country]>,
    ) -> Result<Vec<(String, String)>> {
        let mut out = Vec::with_capacity(places.len());
        let mut pending = Vec::new();
        for place in places.iter() {
            match lookup_iso(place) {
                Some(code) => out.push((place.to_string(), code.to_string())),
                None => pending.push(place),
            }
        }
        if pending.is_empty() {
            return Ok(out);
        }

        let catalogue = match catalogue {
            Some(countries) => country_map(countries),
            None => country_map(&self.get_countries()?),
        };
        for place in pending {
            match catalogue.get(&place.to_lowercase()) {
                Some(code) => out.push((place.to_string(), code.clone())),
                None => return Err(WbdError::UnknownPlace(place.to_string())),
            }
        }
        Ok(out)
    }
}

/// Lowercased name, ISO2 code and id of every catalogue entry → upper-case id.
pub fn country_map(countries: &[Country]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for c in countries {
        let id = c.id.trim().to_ascii_uppercase();
        for key in [&c.iso2_code, &c.id, &c.name] {
            let key = key.trim().to_lowercase();
            if !key.is_empty() {
                map.insert(key, id.clone());
            }
        }
    }
    map
}
