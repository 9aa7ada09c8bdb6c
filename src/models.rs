use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// `place → period → value`, the shape every accessor hands back.
pub type ResultSet<V> = BTreeMap<String, BTreeMap<Period, V>>;

/// How to specify dates in indicator queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateSpec {
    /// Single year like 2020
    Year(i32),
    /// Inclusive range like 2000..=2020
    Range { start: i32, end: i32 },
}

impl DateSpec {
    pub fn to_query_param(&self) -> String {
        match *self {
            DateSpec::Year(y) => y.to_string(),
            DateSpec::Range { start, end } => format!("{}:{}", start, end),
        }
    }

    /// Parse `YYYY` or `YYYY:YYYY`.
    pub fn parse(s: &str) -> Option<DateSpec> {
        let s = s.trim();
        if let Some((a, b)) = s.split_once(':') {
            let start = a.trim().parse::<i32>().ok()?;
            let end = b.trim().parse::<i32>().ok()?;
            Some(DateSpec::Range { start, end })
        } else {
            s.parse::<i32>().ok().map(DateSpec::Year)
        }
    }
}

/// Time key of an observation.
///
/// Calendar periods order by their start, then by variant. Climatology
/// months follow all calendar periods, and unparsed strings come last.
/// Climate data uses `Year`, `Decade` and `MonthOfYear`; indicator data uses
/// whatever the date string says.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Period {
    Year(i32),
    Quarter { year: i32, quarter: u8 },
    Month { year: i32, month: u8 },
    /// Decade, keyed by its first year.
    Decade(i32),
    /// Climatology month index, `0` is January.
    MonthOfYear(u8),
    /// A date string we could not interpret.
    Other(String),
}

static WB_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(?:([MQ])(\d{1,2}))?$").expect("valid date regex"));

impl Period {
    /// Read a World Bank date string: `2002`, `2000Q1` or `2000M05`.
    ///
    /// Strings that do not describe a real period (`2000Q6`, `""`) come back
    /// as [`Period::Other`].
    pub fn parse(s: &str) -> Period {
        let raw = s.trim();
        let Some(caps) = WB_DATE.captures(raw) else {
            return Period::Other(raw.to_string());
        };
        let Ok(year) = caps[1].parse::<i32>() else {
            return Period::Other(raw.to_string());
        };
        let sub = caps.get(3).and_then(|m| m.as_str().parse::<u8>().ok());
        match (caps.get(2).map(|m| m.as_str()), sub) {
            (None, _) => Period::Year(year),
            (Some("Q"), Some(q @ 1..=4)) => Period::Quarter { year, quarter: q },
            (Some("M"), Some(m @ 1..=12)) => Period::Month { year, month: m },
            _ => Period::Other(raw.to_string()),
        }
    }

    /// First calendar day of the period, if it has one.
    pub fn start_date(&self) -> Option<NaiveDate> {
        match *self {
            Period::Year(y) | Period::Decade(y) => NaiveDate::from_ymd_opt(y, 1, 1),
            Period::Quarter { year, quarter } => {
                let q = u32::from(quarter).checked_sub(1)?;
                NaiveDate::from_ymd_opt(year, q * 3 + 1, 1)
            }
            Period::Month { year, month } => NaiveDate::from_ymd_opt(year, u32::from(month), 1),
            Period::MonthOfYear(_) | Period::Other(_) => None,
        }
    }

    fn sort_key(&self) -> (u8, i32, u8, u8, u8, &str) {
        match self {
            Period::Year(y) => (0, *y, 1, 0, 0, ""),
            Period::Quarter { year, quarter } => (
                0,
                *year,
                quarter.saturating_sub(1).saturating_mul(3).saturating_add(1),
                1,
                *quarter,
                "",
            ),
            Period::Month { year, month } => (0, *year, *month, 2, 0, ""),
            Period::Decade(y) => (0, *y, 1, 3, 0, ""),
            Period::MonthOfYear(m) => (1, i32::from(*m), 0, 4, 0, ""),
            Period::Other(s) => (2, 0, 0, 5, 0, s.as_str()),
        }
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Year(y) | Period::Decade(y) => write!(f, "{y}"),
            Period::Quarter { year, quarter } => write!(f, "{year}Q{quarter}"),
            Period::Month { year, month } => write!(f, "{year}M{month:02}"),
            Period::MonthOfYear(m) => write!(f, "{m}"),
            Period::Other(s) => f.write_str(s),
        }
    }
}

// Periods are map keys in JSON output, so they serialize as strings.
impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One cell of a 2D table rendition; the first row of a table is the header.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Value(Option<f64>),
    Date(NaiveDate),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Value(Some(v)) => write!(f, "{v}"),
            Cell::Value(None) => Ok(()),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

pub type Table = Vec<Vec<Cell>>;

/// Metadata section returned by the Indicators API (position 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub page: u32,
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub pages: u32,
    /// Some responses encode `per_page` as a string, others as a number.
    /// Accept both and normalize to `u32`.
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub per_page: u32,
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub total: u32,
}

/// Serde helper: parse `u32` from either a JSON number or a string.
fn de_u32_from_string_or_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct U32Visitor;

    impl<'de> Visitor<'de> for U32Visitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a string or integer representing a non-negative number")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u32::try_from(v).map_err(E::custom)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u32::try_from(v).map_err(|_| E::custom("negative value for u32"))
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            s.trim().parse::<u32>().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(U32Visitor)
}

/// Serde helper: a number, a numeric string, or nothing.
///
/// The APIs have returned observation values both ways over the years.
/// Strings that are not numbers become `None` and are logged.
pub(crate) fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct F64Visitor;

    impl<'de> Visitor<'de> for F64Visitor {
        type Value = Option<f64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a number, a numeric string or null")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v as f64))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v as f64))
        }

        fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
            Ok(parse_value(s))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2>(self, d: D2) -> Result<Self::Value, D2::Error>
        where
            D2: serde::Deserializer<'de>,
        {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(F64Visitor)
}

/// Parse a textual observation value. Empty text is a missing value.
pub fn parse_value(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    match s.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("failed to parse value {s:?}");
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeName {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub value: String,
}

impl CodeName {
    /// `"{value} ({id})"`, the way catalogue listings show nested codes.
    pub fn as_text(&self) -> String {
        format!("{} ({})", self.value.trim(), self.id.trim())
    }
}

/// Raw observation from `country/{codes}/indicator/{id}` (position 1 array).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub indicator: CodeName,
    pub country: CodeName,
    #[serde(default)]
    pub countryiso3code: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, rename = "obs_status")]
    pub obs_status: Option<String>,
}

/// Tidy observation used by this crate (one row = one observation).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DataPoint {
    pub indicator_id: String,
    pub indicator_name: String,
    pub country_id: String, // typically ISO2
    pub country_name: String,
    pub country_iso3: String,
    pub date: String,
    pub period: Period,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub obs_status: Option<String>,
}

impl From<Entry> for DataPoint {
    fn from(e: Entry) -> Self {
        let period = Period::parse(&e.date);
        Self {
            indicator_id: e.indicator.id,
            indicator_name: e.indicator.value,
            country_id: e.country.id,
            country_name: e.country.value,
            country_iso3: e.countryiso3code,
            date: e.date,
            period,
            value: e.value,
            unit: e.unit.filter(|u| !u.trim().is_empty()),
            obs_status: e.obs_status,
        }
    }
}

/// A country or aggregate region from the `country` catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    /// Alpha-3 style code (`SVN`, `WLD`).
    pub id: String,
    #[serde(default)]
    pub iso2_code: String,
    pub name: String,
    #[serde(default)]
    pub region: CodeName,
    #[serde(default)]
    pub adminregion: CodeName,
    #[serde(default)]
    pub income_level: CodeName,
    #[serde(default)]
    pub lending_type: CodeName,
    #[serde(default)]
    pub capital_city: String,
}

impl Country {
    /// Aggregates such as "World" or "Euro area" have no capital.
    pub fn is_aggregate(&self) -> bool {
        self.capital_city.trim().is_empty()
    }
}

/// Indicator metadata from the `indicator` catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorMeta {
    pub id: String,
    #[serde(alias = "value", default)]
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub source: Option<CodeName>,
    #[serde(default)]
    pub source_note: Option<String>,
    #[serde(default)]
    pub topics: Vec<CodeName>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_world_bank_dates() {
        assert_eq!(Period::parse("2002"), Period::Year(2002));
        assert_eq!(
            Period::parse("2000M5"),
            Period::Month {
                year: 2000,
                month: 5
            }
        );
        assert_eq!(
            Period::parse("2000Q3"),
            Period::Quarter {
                year: 2000,
                quarter: 3
            }
        );
        assert_eq!(Period::parse("2000Q6"), Period::Other("2000Q6".into()));
        assert_eq!(Period::parse("200- 0Q6"), Period::Other("200- 0Q6".into()));
    }

    #[test]
    fn start_dates_follow_the_period() {
        let d = |y, m| NaiveDate::from_ymd_opt(y, m, 1);
        assert_eq!(Period::parse("2002").start_date(), d(2002, 1));
        assert_eq!(Period::parse("2000M5").start_date(), d(2000, 5));
        assert_eq!(Period::parse("2000Q1").start_date(), d(2000, 1));
        assert_eq!(Period::parse("2000Q3").start_date(), d(2000, 7));
        assert_eq!(Period::parse("2000Q6").start_date(), None);
        assert_eq!(Period::parse("").start_date(), None);
        assert_eq!(Period::MonthOfYear(3).start_date(), None);
    }

    #[test]
    fn period_display_and_order() {
        assert_eq!(Period::parse("2000M5").to_string(), "2000M05");
        assert_eq!(Period::MonthOfYear(0).to_string(), "0");
        let mut ps = vec![Period::Year(2010), Period::Year(1999), Period::Year(2001)];
        ps.sort();
        assert_eq!(ps, vec![Period::Year(1999), Period::Year(2001), Period::Year(2010)]);

        let mut mixed = vec![
            Period::parse("2015Q2"),
            Period::parse("1971"),
            Period::parse("1998Q2"),
            Period::parse("garbage"),
            Period::parse("2015"),
        ];
        mixed.sort();
        let shown: Vec<String> = mixed.iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["1971", "1998Q2", "2015", "2015Q2", "garbage"]);
    }

    #[test]
    fn distinct_quarters_never_compare_equal() {
        let q = |quarter| Period::Quarter {
            year: 2000,
            quarter,
        };
        assert_ne!(q(0).cmp(&q(1)), std::cmp::Ordering::Equal);
        assert!(q(0) < q(1));
        assert!(q(1) < q(2));

        let mut series = BTreeMap::new();
        series.insert(q(0), 1.0);
        series.insert(q(1), 2.0);
        assert_eq!(series.len(), 2);
        assert_eq!(series[&q(1)], 2.0);
    }

    #[test]
    fn value_parsing_is_lenient() {
        for bad in ["uoea", "--2-", "", "  "] {
            assert_eq!(parse_value(bad), None);
        }
        assert_eq!(parse_value("753.42"), Some(753.42));
        assert_eq!(parse_value("-5"), Some(-5.0));
    }

    #[test]
    fn date_spec_parses_year_and_range() {
        assert_eq!(DateSpec::parse("2020"), Some(DateSpec::Year(2020)));
        assert_eq!(
            DateSpec::parse("2000:2010"),
            Some(DateSpec::Range {
                start: 2000,
                end: 2010
            })
        );
        assert_eq!(DateSpec::parse("soon"), None);
        assert_eq!(DateSpec::Range { start: 1, end: 2 }.to_query_param(), "1:2");
    }
}
