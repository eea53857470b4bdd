#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use zaprelay::remote_auth::{RetryConfig, UpstashRestBackend};

pub const TOKEN: &str = "test-token";

/// Stateful stand-in for an Upstash REST database. Answers GET, SET, DEL,
/// EXISTS, KEYS and PING against an in-memory map.
#[derive(Clone, Default)]
pub struct FakeUpstash {
    data: Arc<Mutex<BTreeMap<String, String>>>,
    max_value_len: Option<usize>,
    log: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeUpstash {
    pub fn with_max_value_len(max_value_len: usize) -> Self {
        Self {
            max_value_len: Some(max_value_len),
            ..Self::default()
        }
    }

    pub async fn mount(&self, server: &MockServer) {
        Mock::given(method("POST"))
            .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
            .respond_with(self.clone())
            .mount(server)
            .await;
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.data.lock().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.data.lock().unwrap().remove(key);
    }

    /// Command names received so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|args| args.first().cloned())
            .collect()
    }

    /// Keys written with SET, in order.
    pub fn set_keys(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|args| args.first().is_some_and(|c| c == "SET"))
            .filter_map(|args| args.get(1).cloned())
            .collect()
    }

    fn execute(&self, args: &[String]) -> Result<Value, String> {
        let mut data = self.data.lock().unwrap();
        let (command, rest) = args.split_first().ok_or("ERR empty command")?;
        match command.to_ascii_uppercase().as_str() {
            "PING" => Ok(json!("PONG")),
            "GET" => Ok(rest
                .first()
                .and_then(|k| data.get(k))
                .map_or(Value::Null, |v| json!(v))),
            "SET" => {
                let [key, value] = rest else {
                    return Err("ERR wrong number of arguments for 'set' command".into());
                };
                if let Some(max) = self.max_value_len
                    && value.len() > max
                {
                    return Err("ERR max request size exceeded".into());
                }
                data.insert(key.clone(), value.clone());
                Ok(json!("OK"))
            }
            "DEL" => Ok(json!(rest.iter().filter(|k| data.remove(*k).is_some()).count())),
            "EXISTS" => Ok(json!(rest.iter().filter(|k| data.contains_key(*k)).count())),
            "KEYS" => {
                let pattern = rest.first().ok_or("ERR wrong number of arguments")?;
                let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
                let matched: Vec<&String> = data
                    .keys()
                    .filter(|k| {
                        if pattern.ends_with('*') {
                            k.starts_with(prefix)
                        } else {
                            *k == pattern
                        }
                    })
                    .collect();
                Ok(json!(matched))
            }
            other => Err(format!("ERR unknown command '{other}'")),
        }
    }
}

impl Respond for FakeUpstash {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(args) = serde_json::from_slice::<Vec<String>>(&request.body) else {
            return ResponseTemplate::new(400).set_body_json(json!({"error": "ERR bad body"}));
        };
        self.log.lock().unwrap().push(args.clone());
        match self.execute(&args) {
            Ok(result) => ResponseTemplate::new(200).set_body_json(json!({ "result": result })),
            Err(error) => ResponseTemplate::new(400).set_body_json(json!({ "error": error })),
        }
    }
}

pub async fn start() -> (MockServer, FakeUpstash) {
    start_with(FakeUpstash::default()).await
}

pub async fn start_with(fake: FakeUpstash) -> (MockServer, FakeUpstash) {
    let server = MockServer::start().await;
    fake.mount(&server).await;
    (server, fake)
}

pub fn client(server: &MockServer) -> UpstashRestBackend {
    UpstashRestBackend::new(
        &server.uri(),
        TOKEN,
        Duration::from_secs(5),
        RetryConfig::none(),
    )
}
