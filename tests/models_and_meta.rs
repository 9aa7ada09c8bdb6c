use simple_wbd::models::{Country, DataPoint, Entry, IndicatorMeta, Meta};
use simple_wbd::{Cell, Period};

#[test]
fn meta_per_page_accepts_string_or_number() {
    // per_page as string
    let m: Meta =
        serde_json::from_str(r#"{"page":1,"pages":2,"per_page":"1000","total":2000}"#).unwrap();
    assert_eq!(m.per_page, 1000);
    // per_page as number
    let m: Meta =
        serde_json::from_str(r#"{"page":1,"pages":2,"per_page":500,"total":2000}"#).unwrap();
    assert_eq!(m.per_page, 500);
}

#[test]
fn datapoint_from_entry_parses_period_and_names() {
    let e: Entry = serde_json::from_str(
        r#"
    {
      "indicator":{"id":"SP.POP.TOTL","value":"Population, total"},
      "country":{"id":"DE","value":"Germany"},
      "countryiso3code":"DEU",
      "date":"2020M07",
      "value":83100000,
      "unit":"",
      "obs_status":null,
      "decimal":0
    }"#,
    )
    .unwrap();
    let p = DataPoint::from(e);
    assert_eq!(
        p.period,
        Period::Month {
            year: 2020,
            month: 7
        }
    );
    assert_eq!(p.date, "2020M07");
    assert_eq!(p.indicator_id, "SP.POP.TOTL");
    assert_eq!(p.indicator_name, "Population, total");
    assert_eq!(p.country_id, "DE");
    assert_eq!(p.country_iso3, "DEU");
    assert_eq!(p.value, Some(83_100_000.0));
}

#[test]
fn unreadable_values_become_missing() {
    let e: Entry = serde_json::from_str(
        r#"{"indicator":{"id":"X","value":"x"},"country":{"id":"DE","value":"Germany"},
            "date":"2020","value":"n/a"}"#,
    )
    .unwrap();
    assert_eq!(e.value, None);
    assert_eq!(e.countryiso3code, "");
}

#[test]
fn indicator_meta_parses_with_value_alias() {
    // Test parsing with "name" field
    let meta: IndicatorMeta = serde_json::from_str(
        r#"
    {
      "id": "SP.POP.TOTL",
      "name": "Population, total",
      "unit": "Number",
      "sourceNote": "Total population counts all residents."
    }"#,
    )
    .unwrap();
    assert_eq!(meta.id, "SP.POP.TOTL");
    assert_eq!(meta.name, "Population, total");
    assert_eq!(meta.unit, Some("Number".to_string()));
    assert!(meta.source_note.unwrap().starts_with("Total population"));

    // Test parsing with "value" field (aliased to name)
    let meta: IndicatorMeta = serde_json::from_str(
        r#"
    {
      "id": "NY.GDP.MKTP.CD",
      "value": "GDP (current US$)"
    }"#,
    )
    .unwrap();
    assert_eq!(meta.name, "GDP (current US$)");
    assert_eq!(meta.unit, None);
    assert!(meta.topics.is_empty());
}

#[test]
fn country_codes_render_as_text() {
    let c: Country = serde_json::from_str(
        r#"{"id":"ZWE","iso2Code":"ZW","name":"Zimbabwe",
            "region":{"id":"SSF","iso2code":"ZG","value":"Sub-Saharan Africa "},
            "incomeLevel":{"id":"LIC","iso2code":"XM","value":"Low income"},
            "lendingType":{"id":"IDB","iso2code":"XF","value":"Blend"},
            "capitalCity":"Harare"}"#,
    )
    .unwrap();
    assert_eq!(c.iso2_code, "ZW");
    assert_eq!(c.region.as_text(), "Sub-Saharan Africa (SSF)");
    assert_eq!(c.income_level.as_text(), "Low income (LIC)");
    assert_eq!(c.adminregion.as_text(), " ()");
    assert!(!c.is_aggregate());
}

#[test]
fn cells_display_for_csv() {
    assert_eq!(Cell::Value(None).to_string(), "");
    assert_eq!(Cell::Value(Some(1.5)).to_string(), "1.5");
    let d = Period::parse("2001Q4").start_date().unwrap();
    assert_eq!(Cell::Date(d).to_string(), "2001-10-01");
    assert_eq!(serde_json::to_string(&Cell::Value(None)).unwrap(), "null");
    assert_eq!(serde_json::to_string(&Cell::text("a")).unwrap(), "\"a\"");
}
