//! Deterministic in-memory gateway for coordinator tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use skycast_weather::{
    Condition, CurrentConditions, GatewayError, LocationCandidate, LocationInfo, LocationStore,
    StoreError, WeatherGateway, WeatherSnapshot,
};
use tokio::sync::oneshot;

/// Scripted responses, optional per-request gates, and a log of every call.
#[derive(Default)]
pub struct FakeGateway {
    searches: Mutex<Vec<String>>,
    weather_calls: Mutex<Vec<i64>>,
    search_results: Mutex<HashMap<String, Vec<LocationCandidate>>>,
    failing_searches: Mutex<Vec<String>>,
    weather: Mutex<HashMap<i64, WeatherSnapshot>>,
    search_gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    weather_gates: Mutex<HashMap<i64, oneshot::Receiver<()>>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(self, query: &str, candidates: Vec<LocationCandidate>) -> Self {
        self.search_results
            .lock()
            .insert(query.to_string(), candidates);
        self
    }

    pub fn failing_search(self, query: &str) -> Self {
        self.failing_searches.lock().push(query.to_string());
        self
    }

    pub fn with_weather(self, id: i64, snapshot: WeatherSnapshot) -> Self {
        self.weather.lock().insert(id, snapshot);
        self
    }

    /// The next search for `query` waits until the returned sender fires.
    pub fn hold_search(&self, query: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.search_gates.lock().insert(query.to_string(), rx);
        tx
    }

    /// The next weather fetch for `id` waits until the returned sender fires.
    pub fn hold_weather(&self, id: i64) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.weather_gates.lock().insert(id, rx);
        tx
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().clone()
    }

    pub fn weather_calls(&self) -> Vec<i64> {
        let mut calls = self.weather_calls.lock().clone();
        calls.sort_unstable();
        calls
    }
}

#[async_trait]
impl WeatherGateway for FakeGateway {
    async fn search_locations(&self, query: &str) -> Result<Vec<LocationCandidate>, GatewayError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.searches.lock().push(query.to_string());

        let gate = self.search_gates.lock().remove(query);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.failing_searches.lock().iter().any(|q| q == query) {
            return Err(GatewayError::transport("connection refused"));
        }
        Ok(self
            .search_results
            .lock()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_weather(
        &self,
        candidate: &LocationCandidate,
    ) -> Result<WeatherSnapshot, GatewayError> {
        self.weather_calls.lock().push(candidate.id);

        let gate = self.weather_gates.lock().remove(&candidate.id);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        self.weather
            .lock()
            .get(&candidate.id)
            .cloned()
            .ok_or_else(|| GatewayError::decode("missing field `current`"))
    }
}

/// Store whose slot can be neither read nor written.
#[derive(Default)]
pub struct FailingStore {
    attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail(&self) -> StoreError {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        StoreError::persistence("read-only file system")
    }
}

impl LocationStore for FailingStore {
    fn save(&self, _candidate: &LocationCandidate) -> Result<(), StoreError> {
        Err(self.fail())
    }

    fn load(&self) -> Result<Option<LocationCandidate>, StoreError> {
        Err(self.fail())
    }

    fn clear(&self) -> Result<(), StoreError> {
        Err(self.fail())
    }
}

pub fn candidate(id: i64, name: &str) -> LocationCandidate {
    LocationCandidate {
        id,
        name: name.to_string(),
        region: format!("{} Region", name),
        country: "Testland".to_string(),
        lat: id as f64,
        lon: -(id as f64),
        url: name.to_lowercase(),
    }
}

pub fn snapshot(name: &str, temp_f: f64) -> WeatherSnapshot {
    WeatherSnapshot {
        location: LocationInfo {
            name: name.to_string(),
            region: format!("{} Region", name),
            country: "Testland".to_string(),
            lat: 0.0,
            lon: 0.0,
            tz_id: "UTC".to_string(),
            localtime_epoch: 1_733_580_000,
            localtime: "2024-12-07 14:00".to_string(),
        },
        current: CurrentConditions {
            temp_f,
            condition: Condition {
                text: "Sunny".to_string(),
                icon: "//cdn.weatherapi.com/weather/64x64/day/113.png".to_string(),
            },
            humidity: 40,
            feelslike_f: temp_f - 2.0,
            uv: 3.0,
        },
    }
}

/// Let every runnable task finish and any debounce timer elapse.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(2)).await;
}

/// Let woken tasks run without crossing a debounce boundary.
pub async fn tick() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
