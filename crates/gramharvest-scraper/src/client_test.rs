use super::*;

fn settings(base_url: &str) -> ClientSettings {
    ClientSettings {
        base_url: base_url.to_owned(),
        timeout_secs: 5,
        user_agent: "gramharvest-test".to_owned(),
        page_size: 12,
        inter_request_delay_ms: 0,
    }
}

fn client(base_url: &str) -> InstagramClient {
    InstagramClient::new(&settings(base_url), None).unwrap()
}

#[test]
fn base_url_gets_trailing_slash() {
    let c = client("https://www.instagram.com");
    assert_eq!(c.base_url.as_str(), "https://www.instagram.com/");
}

#[test]
fn base_url_keeps_path_prefix() {
    let c = client("http://127.0.0.1:8080/proxy");
    let url = c.profile_url("nasa").unwrap();
    assert_eq!(
        url.as_str(),
        "http://127.0.0.1:8080/proxy/api/v1/users/web_profile_info/?username=nasa"
    );
}

#[test]
fn base_url_rejects_non_http_schemes() {
    let result = InstagramClient::new(&settings("ftp://example.com"), None);
    assert!(matches!(
        result,
        Err(ScraperError::InvalidBaseUrl { .. })
    ));
}

#[test]
fn base_url_rejects_garbage() {
    let result = InstagramClient::new(&settings("not a url"), None);
    assert!(matches!(
        result,
        Err(ScraperError::InvalidBaseUrl { .. })
    ));
}

#[test]
fn graphql_url_encodes_variables() {
    let c = client("https://www.instagram.com");
    let mut variables = Map::new();
    variables.insert("tag_name".to_owned(), Value::from("nature"));
    let url = c.graphql_url(queries::HASHTAG_POSTS, &variables).unwrap();

    assert_eq!(url.path(), "/graphql/query/");
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(
        pairs,
        [
            ("query_hash".to_owned(), queries::HASHTAG_POSTS.to_owned()),
            ("variables".to_owned(), r#"{"tag_name":"nature"}"#.to_owned()),
        ]
    );
}

#[test]
fn anonymous_client_is_not_authenticated() {
    assert!(!client("https://www.instagram.com").is_authenticated());
}

#[test]
fn session_client_is_authenticated() {
    let session = Session::from_cookies(
        [("sessionid".to_owned(), "abc".to_owned())]
            .into_iter()
            .collect(),
    )
    .unwrap();
    let c = InstagramClient::new(&settings("https://www.instagram.com"), Some(session)).unwrap();
    assert!(c.is_authenticated());
}

#[test]
fn settings_come_from_config() {
    let config = HarvestConfig {
        output_dir: "./out".into(),
        log_level: "info".to_owned(),
        log_file: None,
        base_url: "https://example.test".to_owned(),
        request_timeout_secs: 9,
        user_agent: "ua".to_owned(),
        page_size: 24,
        inter_request_delay_ms: 250,
        session_file: None,
        download_failure_policy: gramharvest_core::DownloadFailurePolicy::SkipItem,
    };
    let s = ClientSettings::from_config(&config);
    assert_eq!(s.base_url, "https://example.test");
    assert_eq!(s.page_size, 24);
    assert_eq!(s.inter_request_delay_ms, 250);
}
