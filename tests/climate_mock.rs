use httpmock::prelude::*;
use simple_wbd::{
    Client, ClientConfig, DataType, InstrumentalOptions, Interval, Period, ResponseFormat,
    WbdError,
};

fn client(server: &MockServer) -> Client {
    Client::new(ClientConfig {
        climate_base_url: server.base_url(),
        indicator_base_url: server.url("/v2"),
        ..ClientConfig::default()
    })
    .unwrap()
}

const YEARLY: &str = r#"[{"year": 2008, "data": 13.1}, {"year": 2009, "data": 13.4}]"#;

#[test]
fn single_place_gives_one_key() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/v1/country/cru/tas/year/ITA");
        then.status(200)
            .header("content-type", "application/json")
            .body(YEARLY);
    });

    let data = client(&server).get_instrumental("Italy").unwrap();
    m.assert();
    assert_eq!(data.len(), 1);
    let italy = &data["Italy"];
    assert_eq!(italy[&Period::Year(2008)], 13.1);
    assert_eq!(italy[&Period::Year(2009)], 13.4);
}

#[test]
fn many_places_give_one_key_each() {
    let server = MockServer::start();
    let ita = server.mock(|when, then| {
        when.method(GET).path("/v1/country/cru/tas/year/ITA");
        then.status(200).body(YEARLY);
    });
    let svn = server.mock(|when, then| {
        when.method(GET).path("/v1/country/cru/tas/year/SVN");
        then.status(200).body(r#"[{"year": 2008, "data": 10.0}]"#);
    });

    let data = client(&server)
        .get_instrumental(["Italy", "Slovenia"])
        .unwrap();
    ita.assert();
    svn.assert();
    let keys: Vec<&str> = data.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["Italy", "Slovenia"]);
}

#[test]
fn unknown_place_fails_before_any_request() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.method(GET);
        then.status(200).body(YEARLY);
    });

    let err = client(&server)
        .get_instrumental(["Italy", "Atlantis"])
        .unwrap_err();
    assert!(matches!(err, WbdError::UnknownPlace(ref p) if p == "Atlantis"));
    assert_eq!(any.hits(), 0);
}

#[test]
fn empty_places_make_no_request() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.method(GET);
        then.status(200).body(YEARLY);
    });
    let data = client(&server)
        .get_instrumental(Vec::<String>::new())
        .unwrap();
    assert!(data.is_empty());
    assert_eq!(any.hits(), 0);
}

#[test]
fn basins_and_options_shape_the_url() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/v1/basin/cru/pr/month/28");
        then.status(200)
            .body(r#"[{"month": 0, "data": 80.5}, {"month": 1, "data": 70.25}]"#);
    });

    let opts = InstrumentalOptions {
        data_type: DataType::Pr,
        interval: Interval::Month,
        ..InstrumentalOptions::default()
    };
    let data = client(&server).get_instrumental_with("28", &opts).unwrap();
    m.assert();
    assert_eq!(data["28"][&Period::MonthOfYear(1)], 70.25);
}

#[test]
fn csv_responses_are_parsed() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/v1/country/cru/pr/decade/SVN.csv");
        then.status(200)
            .header("content-type", "text/csv")
            .body("year,data\n1980,120.5\n1990,118\n");
    });

    let opts = InstrumentalOptions {
        data_type: DataType::Pr,
        interval: Interval::Decade,
        format: ResponseFormat::Csv,
    };
    let data = client(&server).get_instrumental_with("SI", &opts).unwrap();
    m.assert();
    assert_eq!(data["SI"].len(), 2);
    assert_eq!(data["SI"][&Period::Decade(1990)], 118.0);
}

#[test]
fn empty_series_is_an_error_not_an_empty_map() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/country/cru/tas/year/TON");
        then.status(200).body("[]");
    });
    let err = client(&server).get_instrumental("Tonga").unwrap_err();
    assert!(matches!(err, WbdError::NoData { ref place } if place == "Tonga"));
}

#[test]
fn http_failure_is_surfaced_without_retry() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/v1/country/cru/tas/year/ITA");
        then.status(503);
    });
    let err = client(&server).get_instrumental("Italy").unwrap_err();
    m.assert_hits(1);
    match err {
        WbdError::Status { status, url } => {
            assert_eq!(status.as_u16(), 503);
            assert!(url.ends_with("/v1/country/cru/tas/year/ITA"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn garbage_body_is_a_decode_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/country/cru/tas/year/ITA");
        then.status(200).body("<html>maintenance</html>");
    });
    let err = client(&server).get_instrumental("Italy").unwrap_err();
    assert!(matches!(err, WbdError::Decode { .. }));
}

#[test]
fn repeated_requests_have_identical_structure() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/v1/country/cru/tas/year/ITA");
        then.status(200).body(YEARLY);
    });
    let cli = client(&server);
    let a = cli.get_instrumental("Italy").unwrap();
    let b = cli.get_instrumental("Italy").unwrap();
    m.assert_hits(2);
    assert_eq!(a.keys().collect::<Vec<_>>(), b.keys().collect::<Vec<_>>());
    assert_eq!(
        a["Italy"].keys().collect::<Vec<_>>(),
        b["Italy"].keys().collect::<Vec<_>>()
    );
}

#[test]
fn dataset_fetches_every_combination() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path_contains("/v1/country/cru/");
        then.status(200)
            .body(r#"[{"year": 1990, "month": 0, "data": 1.5}]"#);
    });

    let ds = client(&server)
        .get_instrumental_dataset(["SVN", "TUN"], &[], &[])
        .unwrap();
    m.assert_hits(2 * 2 * 3);
    let dict = ds.as_dict();
    assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["SVN", "TUN"]);
    assert_eq!(dict["SVN"].len(), 2);
    assert_eq!(dict["SVN"][&DataType::Pr].len(), 3);
    assert!(ds.responses()["TUN"][&DataType::Tas][&Interval::Decade]
        .url
        .ends_with("/v1/country/cru/tas/decade/TUN"));
    assert_eq!(
        ds.series(DataType::Tas, Interval::Month)["SVN"][&Period::MonthOfYear(0)],
        1.5
    );
}
