//! The weather script: zip-code lookups against the World Weather Online
//! API, with results held in a rate-limited cache so a chatty channel
//! doesn't hammer the upstream.

use async_trait::async_trait;

use quip_core::{
    ParamDefault, ParamSpec, RateLimitedCache, Reply, ResolvedParams, Result, Script,
    ScriptDescriptor,
};

const DEFAULT_ZIP: &str = "90024";
const CONNECT_FAILURE: &str = "ERROR: Unable to connect to weather API!";

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("key", ParamDefault::Str("")),
    ParamSpec::new("cache_limit", ParamDefault::Int(100)),
    ParamSpec::new("cache_secs", ParamDefault::Int(600)),
];

pub const DESCRIPTOR: ScriptDescriptor = ScriptDescriptor {
    name: "weather",
    params: PARAMS,
    help: Some(
        "!w [zip code] - Provides weather information about the location \
         specified by the zip code. Defaults to searching 90024 (LA).",
    ),
    factory: Weather::factory,
};

pub struct Weather {
    key: String,
    cache: RateLimitedCache<String, String>,
}

impl Weather {
    fn factory(params: &ResolvedParams) -> Result<Box<dyn Script>> {
        // Keys are pasted into config files by hand; keep only the part
        // that can possibly be valid.
        let key: String = params
            .get_str("key")?
            .split_whitespace()
            .next()
            .unwrap_or("")
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        let limit = params.get_int("cache_limit")?.max(1) as usize;
        let ttl = params.get_int("cache_secs")?.max(0);
        Ok(Box::new(Self {
            key,
            cache: RateLimitedCache::new(Some(limit), ttl),
        }))
    }

    async fn lookup(&mut self, zipcode: &str) -> String {
        if zipcode.len() != 5 || !zipcode.chars().all(|c| c.is_ascii_digit()) {
            return "ERROR: Zip code is not in 5-digit format!".to_string();
        }
        self.cache.prune();
        if let Some(cached) = self.cache.get(&zipcode.to_string()) {
            return cached.clone();
        }
        let report = match self.fetch(zipcode).await {
            Some(report) => report,
            None => return CONNECT_FAILURE.to_string(),
        };
        self.cache.insert(zipcode.to_string(), report.clone());
        report
    }

    async fn fetch(&self, zipcode: &str) -> Option<String> {
        let url = format!(
            "http://api.worldweatheronline.com/free/v1/weather.ashx\
             ?q={zipcode}&format=json&fx=no&includelocation=yes&key={}",
            self.key
        );
        let body: serde_json::Value = reqwest::get(&url).await.ok()?.json().await.ok()?;
        let data = body.get("data")?;
        if data.get("error").is_some() {
            return Some(format!("ERROR: No data found for {zipcode}!"));
        }
        let area = &data["nearest_area"][0];
        let cond = &data["current_condition"][0];
        let city = area["areaName"][0]["value"].as_str()?;
        let state = area["region"][0]["value"].as_str()?;
        let desc = cond["weatherDesc"][0]["value"].as_str()?;
        let temp_f = cond["temp_F"].as_str()?;
        let temp_c = cond["temp_C"].as_str()?;
        let humidity = cond["humidity"].as_str()?;
        Some(format!(
            "{city}, {state}: {desc}. {temp_f}°F ({temp_c}°C). Humidity: {humidity}%."
        ))
    }
}

#[async_trait]
impl Script for Weather {
    fn name(&self) -> &'static str {
        "weather"
    }

    async fn on_message(
        &mut self,
        _sender: &str,
        _channel: &str,
        text: &str,
    ) -> Result<Option<Reply>> {
        let mut words = text.split_whitespace();
        if !matches!(words.next(), Some("!w") | Some("!weather")) {
            return Ok(None);
        }
        let zipcode = words.next().unwrap_or(DEFAULT_ZIP).to_string();
        let report = self.lookup(&zipcode).await;
        Ok(Some(Reply::One(report)))
    }
}
