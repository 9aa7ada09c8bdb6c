use simple_wbd::api::parse_wb_payload;
use simple_wbd::climate::{parse_climate_csv, parse_climate_json};
use simple_wbd::models::{DataPoint, Entry};
use simple_wbd::{Interval, Period, WbdError};

#[test]
fn parse_sample_json() {
    let sample = r#"
    [
      {"page":1,"pages":1,"per_page":"2","total":2},
      [
        {
          "indicator":{"id":"SP.POP.TOTL","value":"Population, total"},
          "country":{"id":"DE","value":"Germany"},
          "countryiso3code":"DEU",
          "date":"2019",
          "value":83000000,
          "unit":"",
          "obs_status":null,
          "decimal":0
        },
        {
          "indicator":{"id":"SP.POP.TOTL","value":"Population, total"},
          "country":{"id":"DE","value":"Germany"},
          "countryiso3code":"DEU",
          "date":"2020Q1",
          "value":"83100000",
          "unit":"",
          "obs_status":null,
          "decimal":0
        }
      ]
    ]
    "#;

    let v: serde_json::Value = serde_json::from_str(sample).unwrap();
    let (meta, entries) = parse_wb_payload::<Entry>("sample", v).unwrap();
    let meta = meta.unwrap();
    assert_eq!(meta.page, 1);
    assert_eq!(meta.pages, 1);
    assert_eq!(meta.per_page, 2);
    assert_eq!(meta.total, 2);

    assert_eq!(entries.len(), 2);
    let points: Vec<DataPoint> = entries.into_iter().map(DataPoint::from).collect();
    assert_eq!(points[0].country_iso3, "DEU");
    assert_eq!(points[0].period, Period::Year(2019));
    assert_eq!(points[0].value, Some(83_000_000.0));
    assert_eq!(points[0].unit, None);
    assert_eq!(
        points[1].period,
        Period::Quarter {
            year: 2020,
            quarter: 1
        }
    );
    assert_eq!(points[1].value, Some(83_100_000.0));
}

#[test]
fn rows_that_do_not_match_are_a_decode_error() {
    let v = serde_json::json!([{"page": 1, "pages": 1, "per_page": 1, "total": 1}, [{"nope": 1}]]);
    let err = parse_wb_payload::<Entry>("u", v).unwrap_err();
    match err {
        WbdError::Decode { url, .. } => assert_eq!(url, "u"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn climate_json_by_interval() {
    let yearly = r#"[{"year":1901,"data":-0.73},{"year":1902,"data":"-0.5"}]"#;
    let s = parse_climate_json("u", yearly, Interval::Year).unwrap();
    assert_eq!(s[&Period::Year(1901)], -0.73);
    assert_eq!(s[&Period::Year(1902)], -0.5);

    let decades = r#"[{"gcm":"cru","variable":"pr","fromYear":1920,"toYear":1939,"year":1930,"data":101.2}]"#;
    let s = parse_climate_json("u", decades, Interval::Decade).unwrap();
    assert_eq!(s[&Period::Decade(1930)], 101.2);
}

#[test]
fn climate_csv_finds_columns_by_name() {
    let body = "data,year\n13.2,1990\n,1991\n12.9,1992\n";
    let s = parse_climate_csv("u", body, Interval::Year).unwrap();
    assert_eq!(s.len(), 2);
    assert_eq!(s[&Period::Year(1992)], 12.9);
    assert!(!s.contains_key(&Period::Year(1991)));
}
