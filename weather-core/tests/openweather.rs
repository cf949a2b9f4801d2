//! Integration tests for the OpenWeather provider and a full poll cycle using wiremock.

use std::time::Duration;

use weather_monitor_core::{
    AlertRule, City, Dashboard, WeatherProvider, poll_cycle,
    provider::openweather::OpenWeatherProvider, refresh_once,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn current_weather(condition: &str, temp_k: f64, humidity: u8) -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": 0.0, "lat": 0.0},
        "weather": [{
            "id": 800,
            "main": condition,
            "description": condition.to_lowercase(),
            "icon": "01d"
        }],
        "main": {
            "temp": temp_k,
            "feels_like": temp_k + 1.0,
            "humidity": humidity,
            "pressure": 1012
        },
        "dt": 1729400000,
        "name": "Somewhere"
    })
}

fn ok(condition: &str, temp_k: f64, humidity: u8) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(current_weather(condition, temp_k, humidity))
}

fn provider(server: &MockServer) -> OpenWeatherProvider {
    OpenWeatherProvider::with_base_url("TEST_KEY".into(), &server.uri(), Duration::from_secs(5))
        .expect("mock server uri is a valid base url")
}

fn metros() -> Vec<City> {
    vec![
        City::new(1, "Delhi", 28.7041, 77.1025),
        City::new(2, "Mumbai", 19.076, 72.8777),
        City::new(3, "Chennai", 13.0827, 80.2707),
    ]
}

async fn mount_city(server: &MockServer, lat: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", lat))
        .and(query_param("appid", "TEST_KEY"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_sends_coordinates_and_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "28.7041"))
        .and(query_param("lon", "77.1025"))
        .and(query_param("appid", "TEST_KEY"))
        .respond_with(ok("Haze", 306.15, 40))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = provider(&server).fetch(&metros()[0]).await.unwrap();

    assert_eq!(snapshot.condition, "Haze");
    assert_eq!(snapshot.temp_k, 306.15);
    assert_eq!(snapshot.humidity, 40);
    assert!((snapshot.temp_c() - 33.0).abs() < 1e-9);
    assert_eq!(snapshot.observed_at.timestamp(), 1_729_400_000);
}

#[tokio::test]
async fn test_fetch_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key."
        })))
        .mount(&server)
        .await;

    let err = provider(&server).fetch(&metros()[0]).await.unwrap_err();
    let msg = format!("{err:#}");

    assert!(msg.contains("401"));
    assert!(msg.contains("Invalid API key"));
    assert!(msg.contains("Delhi"));
}

#[tokio::test]
async fn test_fetch_malformed_json_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = provider(&server).fetch(&metros()[1]).await.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse OpenWeather JSON for Mumbai"));
}

#[tokio::test]
async fn test_cycle_survives_single_city_failure() {
    let server = MockServer::start().await;

    let down = ResponseTemplate::new(500).set_body_string("upstream down");
    mount_city(&server, "28.7041", ok("Clear", 310.15, 20)).await;
    mount_city(&server, "19.076", down).await;
    mount_city(&server, "13.0827", ok("Rain", 300.15, 90)).await;

    let provider = provider(&server);
    let readings = poll_cycle(&provider, &metros()).await;

    assert_eq!(readings.len(), 2);
    assert!(readings.contains(1));
    assert!(!readings.contains(2));
    assert!(readings.contains(3));
}

#[tokio::test]
async fn test_refresh_raises_alerts_for_remaining_cities() {
    let server = MockServer::start().await;

    mount_city(&server, "28.7041", ok("Clear", 310.15, 20)).await;
    mount_city(&server, "19.076", ResponseTemplate::new(503)).await;
    mount_city(&server, "13.0827", ok("Rain", 300.15, 90)).await;

    let provider = provider(&server);
    let rule = AlertRule::Temperature { threshold: 35.0 };
    let mut dashboard = Dashboard::new(metros(), rule);

    let raised = refresh_once(&provider, &mut dashboard).await;
    assert_eq!(raised, 1);
    let alert = dashboard.alerts().next().unwrap();
    assert_eq!(
        alert.text,
        "Alert: Temperature in Delhi (37.0°C) exceeds threshold of 35°C"
    );

    let summary = dashboard.history().latest().unwrap();
    assert!((summary.max_temp - 37.0).abs() < 1e-9);
    assert!((summary.min_temp - 27.0).abs() < 1e-9);
    assert!((summary.avg_temp - 32.0).abs() < 1e-9);
    assert_eq!(summary.dominant_condition, "Clear");

    dashboard.replace_rule(AlertRule::Condition {
        target: "RAIN".into(),
    });
    let raised = refresh_once(&provider, &mut dashboard).await;
    assert_eq!(raised, 1);
    assert_eq!(dashboard.alert_count(), 2);
    assert_eq!(
        dashboard.alerts().last().unwrap().text,
        "Alert: RAIN condition detected in Chennai"
    );
}
