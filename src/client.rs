//! Blocking client for the infinitive HVAC API.
//!
//! - Reads (`get_status`, `get_vacation_status`) never fail: any transport, status or
//!   JSON problem turns the affected section into an empty mapping. Swallowed failures
//!   are logged and handed to the optional diagnostics hook.
//! - Writes are fire-and-forget PUTs to the zone config endpoint. Enumerated arguments
//!   are validated before anything is sent; transport errors propagate.

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::models::{
    decode_snapshot, Endpoints, FanMode, Mode, Status, StatusSnapshot, TemperatureUnit, VacationStatus,
    HEATPUMP_PREFIX,
};
use crate::transport::{Transport, UreqTransport};
use crate::utils::{merge_sections, prefix_keys, setpoint_value};

const FINITE_TEMPERATURE: &[&str] = &["a finite number"];

pub const JSON_HEADERS: [(&str, &str); 2] = [("Content-Type", "application/json"), ("Accept", "application/json")];

#[derive(Debug)]
pub enum InfinitiveClientError {
    Transport(String),
    Http {
        status: u16,
        message: String,
    },
    Json(serde_json::Error),
    Decode(serde_path_to_error::Error<serde_json::Error>),
    InvalidArgument {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },
}

impl InfinitiveClientError {
    pub(crate) fn invalid_argument(field: &'static str, value: &str, allowed: &'static [&'static str]) -> Self {
        InfinitiveClientError::InvalidArgument {
            field,
            value: value.to_string(),
            allowed,
        }
    }
}

impl core::fmt::Display for InfinitiveClientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InfinitiveClientError::Transport(s) => write!(f, "transport error: {}", s),
            InfinitiveClientError::Http { status, message } => write!(f, "http {}: {}", status, message),
            InfinitiveClientError::Json(e) => write!(f, "json error: {}", e),
            InfinitiveClientError::Decode(e) => write!(f, "decode error at {}: {}", e.path(), e.inner()),
            InfinitiveClientError::InvalidArgument { field, value, allowed } => {
                write!(f, "invalid {} {:?}: expected one of {}", field, value, allowed.join(", "))
            }
        }
    }
}

impl std::error::Error for InfinitiveClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InfinitiveClientError::Json(e) => Some(e),
            InfinitiveClientError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for InfinitiveClientError {
    fn from(value: serde_json::Error) -> Self {
        InfinitiveClientError::Json(value)
    }
}

/// A status read that was turned into an empty mapping.
#[derive(Debug)]
pub struct FetchFailure<'a> {
    pub url: &'a str,
    pub error: &'a InfinitiveClientError,
}

type DiagnosticsHook = Box<dyn Fn(&FetchFailure<'_>) + Send + Sync>;

pub struct InfinitiveClient<T: Transport = UreqTransport> {
    host: String,
    port: u16,
    temperature_unit: TemperatureUnit,
    endpoints: Endpoints,
    transport: T,
    diagnostics: Option<DiagnosticsHook>,
}

impl InfinitiveClient<UreqTransport> {
    pub fn new(host: impl Into<String>, port: u16, temperature_unit: TemperatureUnit) -> Self {
        Self::with_transport(host, port, temperature_unit, UreqTransport::default())
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::with_transport(
            cfg.host.clone(),
            cfg.port,
            cfg.temperature_unit,
            UreqTransport::new(cfg.max_retries),
        )
    }
}

impl<T: Transport> InfinitiveClient<T> {
    pub fn with_transport(host: impl Into<String>, port: u16, temperature_unit: TemperatureUnit, transport: T) -> Self {
        let host = host.into();
        let endpoints = Endpoints::new(&host, port);
        InfinitiveClient {
            host,
            port,
            temperature_unit,
            endpoints,
            transport,
            diagnostics: None,
        }
    }

    /// Install a hook that observes every read failure swallowed into an empty mapping.
    pub fn with_diagnostics(mut self, hook: impl Fn(&FetchFailure<'_>) + Send + Sync + 'static) -> Self {
        self.diagnostics = Some(Box::new(hook));
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        self.temperature_unit
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// GET `url` and return its JSON object with every key prefixed by `key_prefix`.
    ///
    /// Anything but a 200 response carrying a JSON object is an error.
    pub fn try_fetch_section(&self, url: &str, key_prefix: &str) -> Result<StatusSnapshot, InfinitiveClientError> {
        debug!("GET {}", url);
        let res = self.transport.get(url)?;
        if res.status != http::StatusCode::OK.as_u16() {
            return Err(InfinitiveClientError::Http {
                status: res.status,
                message: res.body,
            });
        }
        let section: Map<String, Value> = serde_json::from_str(&res.body)?;
        Ok(prefix_keys(section, key_prefix))
    }

    fn fetch_section(&self, url: &str, key_prefix: &str) -> StatusSnapshot {
        match self.try_fetch_section(url, key_prefix) {
            Ok(section) => section,
            Err(error) => {
                warn!("Status read from {} failed, using empty section: {}", url, error);
                if let Some(hook) = &self.diagnostics {
                    hook(&FetchFailure { url, error: &error });
                }
                StatusSnapshot::new()
            }
        }
    }

    pub fn get_vacation_status(&self) -> StatusSnapshot {
        self.fetch_section(&self.endpoints.vacation_url, "")
    }

    /// Merged status of the zone, air handler and heat pump.
    ///
    /// Zone config keys override air handler keys, which override the prefixed heat pump keys.
    pub fn get_status(&self) -> StatusSnapshot {
        let config = self.fetch_section(&self.endpoints.config_url, "");
        let airhandler = self.fetch_section(&self.endpoints.airhandler_url, "");
        let heatpump = self.fetch_section(&self.endpoints.heatpump_url, HEATPUMP_PREFIX);
        merge_sections([heatpump, airhandler, config])
    }

    pub fn status(&self) -> Result<Status, InfinitiveClientError> {
        decode_snapshot(self.get_status())
    }

    pub fn vacation(&self) -> Result<VacationStatus, InfinitiveClientError> {
        decode_snapshot(self.get_vacation_status())
    }

    fn put_config(&self, body: Map<String, Value>) -> Result<(), InfinitiveClientError> {
        let payload = serde_json::to_vec(&body)?;
        self.transport.put_json(&self.endpoints.config_url, &JSON_HEADERS, &payload)?;
        Ok(())
    }

    /// Change the setpoint for `mode` ("cool" or "heat").
    ///
    /// With a Celsius client `target_temp` is treated as Fahrenheit and converted before sending.
    /// Any other mode still sends a PUT, with an empty object as body.
    /// NaN and infinite temperatures are rejected before anything is sent.
    pub fn set_temperature(&self, target_temp: f64, mode: &str) -> Result<(), InfinitiveClientError> {
        if !target_temp.is_finite() {
            return Err(InfinitiveClientError::invalid_argument(
                "target_temp",
                &target_temp.to_string(),
                FINITE_TEMPERATURE,
            ));
        }
        let target_temp = match self.temperature_unit {
            TemperatureUnit::C => (target_temp - 32.0) / 1.8,
            TemperatureUnit::F => target_temp,
        };
        let mut body = Map::new();
        match mode.parse::<Mode>().ok().and_then(Mode::setpoint_field) {
            Some(field) => {
                body.insert(field.to_string(), setpoint_value(target_temp));
            }
            None => warn!("No setpoint field for mode {:?}; sending empty config update", mode),
        }
        self.put_config(body)
    }

    pub fn set_mode(&self, mode: &str) -> Result<(), InfinitiveClientError> {
        let mode: Mode = mode.parse()?;
        let mut body = Map::new();
        body.insert("mode".into(), Value::from(mode.as_str()));
        self.put_config(body)
    }

    pub fn set_fan_mode(&self, fan_mode: &str) -> Result<(), InfinitiveClientError> {
        let fan_mode: FanMode = fan_mode.parse()?;
        let mut body = Map::new();
        body.insert("fanMode".into(), Value::from(fan_mode.as_str()));
        self.put_config(body)
    }

    pub fn reset_fan_mode(&self) -> Result<(), InfinitiveClientError> {
        self.set_fan_mode(FanMode::default().as_str())
    }

    /// Set the hold flag. The strings "True" and "False" become booleans; anything else is sent as is.
    pub fn set_hold(&self, hold: impl Into<Value>) -> Result<(), InfinitiveClientError> {
        let hold = match hold.into() {
            Value::String(s) if s == "True" => Value::Bool(true),
            Value::String(s) if s == "False" => Value::Bool(false),
            other => other,
        };
        let mut body = Map::new();
        body.insert("hold".into(), hold);
        self.put_config(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpResponse;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct RecordedPut {
        url: String,
        headers: Vec<(String, String)>,
        body: Value,
    }

    #[derive(Default)]
    struct FakeTransport {
        responses: HashMap<String, Result<HttpResponse, String>>,
        puts: RefCell<Vec<RecordedPut>>,
        fail_puts: bool,
    }

    impl FakeTransport {
        fn respond(mut self, path: &str, status: u16, body: &str) -> Self {
            self.responses.insert(
                format!("http://hvac.local:8080{path}"),
                Ok(HttpResponse {
                    status,
                    body: body.to_string(),
                }),
            );
            self
        }

        fn unreachable(mut self, path: &str) -> Self {
            self.responses
                .insert(format!("http://hvac.local:8080{path}"), Err("connection refused".to_string()));
            self
        }
    }

    impl Transport for FakeTransport {
        fn get(&self, url: &str) -> Result<HttpResponse, InfinitiveClientError> {
            match self.responses.get(url) {
                Some(Ok(res)) => Ok(res.clone()),
                Some(Err(e)) => Err(InfinitiveClientError::Transport(e.clone())),
                None => Ok(HttpResponse {
                    status: 404,
                    body: "404 page not found".to_string(),
                }),
            }
        }

        fn put_json(
            &self,
            url: &str,
            headers: &[(&str, &str)],
            body: &[u8],
        ) -> Result<HttpResponse, InfinitiveClientError> {
            if self.fail_puts {
                return Err(InfinitiveClientError::Transport("connection reset".to_string()));
            }
            self.puts.borrow_mut().push(RecordedPut {
                url: url.to_string(),
                headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                body: serde_json::from_slice(body).expect("put body is json"),
            });
            Ok(HttpResponse {
                status: 200,
                body: String::new(),
            })
        }
    }

    fn client(transport: FakeTransport) -> InfinitiveClient<FakeTransport> {
        InfinitiveClient::with_transport("hvac.local", 8080, TemperatureUnit::F, transport)
    }

    fn celsius_client(transport: FakeTransport) -> InfinitiveClient<FakeTransport> {
        InfinitiveClient::with_transport("hvac.local", 8080, TemperatureUnit::C, transport)
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/data/{name}")).expect("fixture present")
    }

    fn only_put(c: &InfinitiveClient<FakeTransport>) -> RecordedPut {
        let puts = c.transport.puts.borrow();
        assert_eq!(puts.len(), 1, "expected exactly one PUT, got {:?}", *puts);
        puts[0].clone()
    }

    #[test]
    fn construction_builds_endpoints_without_io() {
        let c = client(FakeTransport::default());
        assert_eq!(c.host(), "hvac.local");
        assert_eq!(c.port(), 8080);
        assert_eq!(c.temperature_unit(), TemperatureUnit::F);
        assert_eq!(c.endpoints().config_url, "http://hvac.local:8080/api/zone/1/config");
        assert!(c.transport.puts.borrow().is_empty());
    }

    #[test]
    fn status_merges_and_prefixes_heatpump() {
        let c = client(
            FakeTransport::default()
                .respond("/api/zone/1/config", 200, r#"{"a":1}"#)
                .respond("/api/airhandler", 200, r#"{"b":2}"#)
                .respond("/api/heatpump", 200, r#"{"c":3}"#),
        );
        assert_eq!(Value::Object(c.get_status()), json!({"a": 1, "b": 2, "heatpump_c": 3}));
    }

    #[test]
    fn zone_config_wins_on_collision() {
        let c = client(
            FakeTransport::default()
                .respond("/api/zone/1/config", 200, r#"{"x":"config"}"#)
                .respond("/api/airhandler", 200, r#"{"x":"airhandler","b":2}"#)
                .respond("/api/heatpump", 200, r#"{}"#),
        );
        let status = c.get_status();
        assert_eq!(status.get("x"), Some(&json!("config")));
        assert_eq!(status.get("b"), Some(&json!(2)));
    }

    #[test]
    fn broken_heatpump_contributes_nothing() {
        for heatpump in [
            FakeTransport::default().respond("/api/heatpump", 404, "not found"),
            FakeTransport::default().respond("/api/heatpump", 200, "{not json"),
            FakeTransport::default().respond("/api/heatpump", 200, "[1, 2]"),
            FakeTransport::default().respond("/api/heatpump", 500, r#"{"c":3}"#),
            FakeTransport::default().unreachable("/api/heatpump"),
        ] {
            let c = client(
                heatpump
                    .respond("/api/zone/1/config", 200, r#"{"a":1}"#)
                    .respond("/api/airhandler", 200, r#"{"b":2}"#),
            );
            assert_eq!(Value::Object(c.get_status()), json!({"a": 1, "b": 2}));
        }
    }

    #[test]
    fn unreachable_device_yields_empty_status() {
        let c = client(FakeTransport::default());
        assert!(c.get_status().is_empty());
        assert!(c.get_vacation_status().is_empty());
    }

    #[test]
    fn diagnostics_hook_sees_swallowed_failures() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let c = client(FakeTransport::default().respond("/api/zone/1/config", 200, r#"{"a":1}"#)).with_diagnostics(
            move |failure| {
                assert!(failure.url.starts_with("http://hvac.local:8080/api/"));
                assert!(matches!(failure.error, InfinitiveClientError::Http { status: 404, .. }));
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert_eq!(Value::Object(c.get_status()), json!({"a": 1}));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn try_fetch_section_reports_errors() {
        let c = client(
            FakeTransport::default()
                .respond("/api/airhandler", 503, "busy")
                .respond("/api/heatpump", 200, "oops"),
        );
        let e = c.try_fetch_section(&c.endpoints().airhandler_url, "").unwrap_err();
        assert!(matches!(e, InfinitiveClientError::Http { status: 503, ref message } if message == "busy"));
        let e = c.try_fetch_section(&c.endpoints().heatpump_url, "").unwrap_err();
        assert!(matches!(e, InfinitiveClientError::Json(_)));
    }

    #[test]
    fn typed_status_from_fixtures() {
        let c = client(
            FakeTransport::default()
                .respond("/api/zone/1/config", 200, &fixture("zone-config.json"))
                .respond("/api/airhandler", 200, &fixture("airhandler.json"))
                .respond("/api/heatpump", 200, &fixture("heatpump.json")),
        );
        let status = c.status().unwrap();
        assert_eq!(status.mode, Some(Mode::Heat));
        assert_eq!(status.fan_mode, Some(FanMode::Auto));
        assert_eq!(status.hold, Some(false));
        assert_eq!(status.heat_setpoint, Some(68.0));
        assert_eq!(status.blower_rpm, Some(620));
        assert_eq!(status.heatpump_coil_temp, Some(35.5));
        // heat pump stage is prefixed, so it does not collide with the zone stage
        assert_eq!(status.stage, Some(1));
        assert_eq!(status.heatpump_stage, Some(2));
    }

    #[test]
    fn vacation_status_passes_through() {
        let c = client(FakeTransport::default().respond("/api/zone/1/vacation", 200, &fixture("vacation.json")));
        let raw = c.get_vacation_status();
        assert_eq!(raw.get("active"), Some(&json!(false)));
        assert_eq!(c.vacation().unwrap().max_temp, Some(84.0));
    }

    #[test]
    fn set_mode_sends_one_put_per_valid_value() {
        for mode in Mode::ALLOWED {
            let c = client(FakeTransport::default());
            c.set_mode(mode).unwrap();
            let put = only_put(&c);
            assert_eq!(put.url, "http://hvac.local:8080/api/zone/1/config");
            assert_eq!(put.body, json!({"mode": mode}));
            assert_eq!(
                put.headers,
                vec![
                    ("Content-Type".to_string(), "application/json".to_string()),
                    ("Accept".to_string(), "application/json".to_string()),
                ]
            );
        }
    }

    #[test]
    fn set_mode_rejects_unknown_without_request() {
        let c = client(FakeTransport::default());
        for bad in ["dry", "Heat", ""] {
            let err = c.set_mode(bad).unwrap_err();
            assert!(matches!(err, InfinitiveClientError::InvalidArgument { field: "mode", .. }));
        }
        assert!(c.transport.puts.borrow().is_empty());
    }

    #[test]
    fn set_fan_mode_validates_and_sends() {
        for fan in FanMode::ALLOWED {
            let c = client(FakeTransport::default());
            c.set_fan_mode(fan).unwrap();
            assert_eq!(only_put(&c).body, json!({"fanMode": fan}));
        }

        let c = client(FakeTransport::default());
        let err = c.set_fan_mode("turbo").unwrap_err();
        assert!(matches!(err, InfinitiveClientError::InvalidArgument { field: "fan_mode", .. }));
        assert!(c.transport.puts.borrow().is_empty());
    }

    #[test]
    fn reset_fan_mode_sends_auto() {
        let c = client(FakeTransport::default());
        c.reset_fan_mode().unwrap();
        assert_eq!(only_put(&c).body, json!({"fanMode": "auto"}));
    }

    #[test]
    fn set_hold_coerces_literal_strings() {
        let cases = [
            (json!("True"), json!(true)),
            (json!("False"), json!(false)),
            (json!(true), json!(true)),
            (json!("yes"), json!("yes")),
            (json!(1), json!(1)),
        ];
        for (input, expected) in cases {
            let c = client(FakeTransport::default());
            c.set_hold(input).unwrap();
            assert_eq!(only_put(&c).body, json!({"hold": expected}));
        }
    }

    #[test]
    fn set_temperature_fahrenheit_passes_through() {
        let c = client(FakeTransport::default());
        c.set_temperature(70.0, "cool").unwrap();
        assert_eq!(only_put(&c).body, json!({"coolSetpoint": 70}));

        let c = client(FakeTransport::default());
        c.set_temperature(66.0, "heat").unwrap();
        assert_eq!(only_put(&c).body, json!({"heatSetpoint": 66}));
    }

    #[test]
    fn set_temperature_celsius_converts_from_fahrenheit() {
        let c = celsius_client(FakeTransport::default());
        c.set_temperature(70.0, "cool").unwrap();
        let sent = only_put(&c).body["coolSetpoint"].as_f64().expect("numeric setpoint");
        assert!((sent - (70.0 - 32.0) / 1.8).abs() < 1e-9);
        assert!((sent - 21.11).abs() < 0.01);
    }

    #[test]
    fn set_temperature_other_mode_still_sends() {
        for mode in ["auto", "off", "dry"] {
            let c = client(FakeTransport::default());
            c.set_temperature(70.0, mode).unwrap();
            assert_eq!(only_put(&c).body, json!({}));
        }
    }

    #[test]
    fn set_temperature_rejects_non_finite_without_request() {
        for unit in [TemperatureUnit::F, TemperatureUnit::C] {
            let c = InfinitiveClient::with_transport("hvac.local", 8080, unit, FakeTransport::default());
            for temp in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
                let err = c.set_temperature(temp, "cool").unwrap_err();
                assert!(matches!(err, InfinitiveClientError::InvalidArgument { field: "target_temp", .. }));
            }
            assert!(c.transport.puts.borrow().is_empty());
        }
    }

    #[test]
    fn write_transport_errors_propagate() {
        let c = client(FakeTransport {
            fail_puts: true,
            ..FakeTransport::default()
        });
        assert!(matches!(c.set_mode("off"), Err(InfinitiveClientError::Transport(_))));
    }

    #[test]
    fn error_messages_are_readable() {
        let err = "sideways".parse::<Mode>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid mode \"sideways\": expected one of auto, heat, cool, off"
        );
    }
}
