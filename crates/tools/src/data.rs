//! Entity data: the per-symbol snapshot every analysis tool reads from, the
//! provider capability that produces it, and a shared TTL cache in front.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use parking_lot::Mutex;
use pr_domain::config::DataConfig;
use pr_domain::error::{Error, Result};
use pr_domain::trace::TraceEvent;
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Snapshot
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything known about one symbol at fetch time. Only `symbol` is
/// guaranteed; tools decide for themselves what is "enough".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    pub symbol: String,
    #[serde(default, alias = "companyInfo")]
    pub company: CompanyInfo,
    #[serde(default)]
    pub quote: Quote,
    #[serde(default)]
    pub fundamentals: Fundamentals,
    #[serde(default)]
    pub shareholding: Option<Shareholding>,
    /// Daily bars, oldest first.
    #[serde(default)]
    pub price_history: Vec<PriceBar>,
    #[serde(default)]
    pub events: Vec<UpcomingEvent>,
    #[serde(default)]
    pub news: Vec<NewsItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub change: Option<f64>,
    #[serde(default)]
    pub change_percent: Option<f64>,
}

/// Fundamentals as reported upstream. Margins, returns and growth rates are
/// percentages (`12.5` means 12.5%). Amounts are in rupees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fundamentals {
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<f64>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub price_to_sales: Option<f64>,

    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,

    pub revenue: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub ebitda: Option<f64>,

    pub total_cash: Option<f64>,
    pub total_debt: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,

    pub operating_cashflow: Option<f64>,
    pub free_cashflow: Option<f64>,

    pub beta: Option<f64>,
    pub short_ratio: Option<f64>,
    #[serde(rename = "52WeekChange")]
    pub week52_change: Option<f64>,

    pub target_mean_price: Option<f64>,
    pub target_high_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub recommendation_key: Option<String>,
    pub number_of_analyst_opinions: Option<u32>,
}

/// Percent held by each holder class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shareholding {
    pub promoters: Option<f64>,
    pub fii: Option<f64>,
    pub dii: Option<f64>,
    pub public: Option<f64>,
}

impl Shareholding {
    pub fn is_empty(&self) -> bool {
        self.promoters.is_none() && self.fii.is_none() && self.dii.is_none() && self.public.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingEvent {
    /// `YYYY-MM-DD` or a coarser label such as `2026-Q3`.
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default = "d_unknown")]
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published: Option<String>,
}

fn d_unknown() -> String {
    "Unknown".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider capability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Given a symbol, return its snapshot or nothing. Providers never fail:
/// an unreachable upstream and an unknown symbol both read as `None`.
#[async_trait::async_trait]
pub trait EntityDataProvider: Send + Sync {
    async fn snapshot(&self, symbol: &str) -> Option<Arc<EntitySnapshot>>;
}

/// Normalized cache/lookup key for a symbol.
pub fn symbol_key(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

// ── HTTP ────────────────────────────────────────────────────────────

/// Fetches `GET {base_url}/{SYMBOL}` and decodes the body as an
/// [`EntitySnapshot`].
pub struct HttpDataProvider {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpDataProvider {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        let base_url = reqwest::Url::parse(base_url.trim())
            .map_err(|e| Error::Config(format!("data.base_url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("data.base_url {base_url} cannot take a path")));
        }
        Ok(Self { client, base_url })
    }

    /// The request URL for `symbol`, or `None` when it is not ticker-shaped.
    /// The symbol is appended as one encoded path segment.
    fn symbol_url(&self, symbol: &str) -> Option<reqwest::Url> {
        let key = symbol_key(symbol);
        if !is_symbol_shaped(&key) {
            return None;
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut().ok()?.pop_if_empty().push(&key);
        Some(url)
    }
}

/// An uppercase letter followed by up to 14 letters, digits, `&` or `-`.
pub fn is_symbol_shaped(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && key.chars().count() <= 15
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '&' || c == '-')
}

#[async_trait::async_trait]
impl EntityDataProvider for HttpDataProvider {
    async fn snapshot(&self, symbol: &str) -> Option<Arc<EntitySnapshot>> {
        let Some(url) = self.symbol_url(symbol) else {
            tracing::debug!(symbol = %symbol, "not a ticker, skipping data fetch");
            return None;
        };
        let resp = match self.client.get(url.clone()).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "entity data request failed");
                return None;
            }
        };

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return None;
        }
        if !resp.status().is_success() {
            tracing::warn!(url = %url, status = %resp.status(), "entity data upstream error");
            return None;
        }

        match resp.json::<EntitySnapshot>().await {
            Ok(mut snap) => {
                if snap.symbol.is_empty() {
                    snap.symbol = symbol_key(symbol);
                }
                Some(Arc::new(snap))
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "entity data decode failed");
                None
            }
        }
    }
}

// ── In-memory ───────────────────────────────────────────────────────

/// Serves a fixed set of snapshots. Used offline and in tests.
#[derive(Default)]
pub struct StaticDataProvider {
    entries: HashMap<String, Arc<EntitySnapshot>>,
}

impl StaticDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, snapshot: EntitySnapshot) -> Self {
        self.entries
            .insert(symbol_key(&snapshot.symbol), Arc::new(snapshot));
        self
    }
}

#[async_trait::async_trait]
impl EntityDataProvider for StaticDataProvider {
    async fn snapshot(&self, symbol: &str) -> Option<Arc<EntitySnapshot>> {
        self.entries.get(&symbol_key(symbol)).cloned()
    }
}

// ── TTL cache ───────────────────────────────────────────────────────

struct CacheEntry {
    fetched_at: Instant,
    value: Option<Arc<EntitySnapshot>>,
}

/// Read-through cache keyed by uppercase symbol. Misses are cached too, so
/// an unknown symbol is not re-fetched until its entry expires. Expired
/// entries are swept on every insert.
pub struct CachedDataProvider {
    inner: Arc<dyn EntityDataProvider>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl CachedDataProvider {
    pub fn new(inner: Arc<dyn EntityDataProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn lookup(&self, key: &str) -> Option<Option<Arc<EntitySnapshot>>> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }
}

#[async_trait::async_trait]
impl EntityDataProvider for CachedDataProvider {
    async fn snapshot(&self, symbol: &str) -> Option<Arc<EntitySnapshot>> {
        let key = symbol_key(symbol);
        if key.is_empty() {
            return None;
        }

        if let Some(value) = self.lookup(&key) {
            TraceEvent::EntityDataFetched {
                symbol: key,
                cache_hit: true,
                found: value.is_some(),
            }
            .emit();
            return value;
        }

        // Not held across the fetch; two concurrent misses both go upstream
        // and the later write wins.
        let value = self.inner.snapshot(&key).await;
        {
            let mut entries = self.entries.lock();
            entries.retain(|_, e| e.fetched_at.elapsed() < self.ttl);
            entries.insert(
                key.clone(),
                CacheEntry {
                    fetched_at: Instant::now(),
                    value: value.clone(),
                },
            );
        }

        TraceEvent::EntityDataFetched {
            symbol: key,
            cache_hit: false,
            found: value.is_some(),
        }
        .emit();
        value
    }
}

/// Build the process-wide data provider from `[data]`. Without a
/// `base_url` the tools run against an empty in-memory source.
pub fn build_data_provider(cfg: &DataConfig) -> Result<Arc<dyn EntityDataProvider>> {
    let upstream: Arc<dyn EntityDataProvider> = match cfg.base_url.as_deref() {
        Some(url) if !url.trim().is_empty() => Arc::new(HttpDataProvider::new(url, cfg.timeout_ms)?),
        _ => Arc::new(StaticDataProvider::new()),
    };
    Ok(Arc::new(CachedDataProvider::new(
        upstream,
        Duration::from_secs(cfg.cache_ttl_secs),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        inner: StaticDataProvider,
    }

    #[async_trait::async_trait]
    impl EntityDataProvider for Counting {
        async fn snapshot(&self, symbol: &str) -> Option<Arc<EntitySnapshot>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.snapshot(symbol).await
        }
    }

    fn counting() -> Arc<Counting> {
        Arc::new(Counting {
            calls: AtomicUsize::new(0),
            inner: StaticDataProvider::new().with(EntitySnapshot {
                symbol: "TCS".into(),
                ..Default::default()
            }),
        })
    }

    #[tokio::test]
    async fn cache_is_keyed_by_uppercase_symbol() {
        let upstream = counting();
        let cache = CachedDataProvider::new(upstream.clone(), Duration::from_secs(300));

        assert!(cache.snapshot("tcs").await.is_some());
        assert!(cache.snapshot(" TCS ").await.is_some());
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn misses_are_cached_too() {
        let upstream = counting();
        let cache = CachedDataProvider::new(upstream.clone(), Duration::from_secs(300));

        assert!(cache.snapshot("NOPE").await.is_none());
        assert!(cache.snapshot("nope").await.is_none());
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let upstream = counting();
        let cache = CachedDataProvider::new(upstream.clone(), Duration::ZERO);

        cache.snapshot("TCS").await;
        cache.snapshot("TCS").await;
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_swept_on_insert() {
        let upstream = counting();
        let cache = CachedDataProvider::new(upstream.clone(), Duration::ZERO);

        for symbol in ["TCS", "MADEUP1", "MADEUP2", "MADEUP3"] {
            cache.snapshot(symbol).await;
        }
        assert_eq!(cache.len(), 1);

        let cache = CachedDataProvider::new(upstream, Duration::from_secs(300));
        for symbol in ["TCS", "MADEUP1", "MADEUP2"] {
            cache.snapshot(symbol).await;
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn request_url_takes_one_encoded_segment() {
        let http = HttpDataProvider::new("http://data.local/api/v1/", 1000).unwrap();
        assert_eq!(
            http.symbol_url(" tcs ").unwrap().as_str(),
            "http://data.local/api/v1/TCS"
        );
        let bare = HttpDataProvider::new("http://data.local/api", 1000).unwrap();
        assert_eq!(
            bare.symbol_url("BAJAJ-AUTO").unwrap().as_str(),
            "http://data.local/api/BAJAJ-AUTO"
        );
        assert!(http.symbol_url("M&M").unwrap().path().starts_with("/api/v1/M"));

        for hostile in ["../x", "A?b=c", "TCS/../../admin", "", "A B", "TCS#frag"] {
            assert!(http.symbol_url(hostile).is_none(), "{hostile:?} should be rejected");
        }
    }

    #[test]
    fn bad_base_url_is_a_config_error() {
        assert!(matches!(
            HttpDataProvider::new("not a url", 1000),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn snapshot_accepts_upstream_field_names() {
        let raw = r#"{
            "symbol": "INFY",
            "companyInfo": {"name": "Infosys", "sector": "IT"},
            "quote": {"price": 1500.5, "changePercent": 1.2},
            "fundamentals": {"trailingPE": 24.1, "52WeekChange": 8.0, "beta": 0.9},
            "priceHistory": [{"date": "2026-01-02", "open": 1, "high": 2, "low": 0.5, "close": 1.5}]
        }"#;
        let snap: EntitySnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snap.company.sector.as_deref(), Some("IT"));
        assert_eq!(snap.quote.change_percent, Some(1.2));
        assert_eq!(snap.fundamentals.trailing_pe, Some(24.1));
        assert_eq!(snap.fundamentals.week52_change, Some(8.0));
        assert_eq!(snap.price_history.len(), 1);
        assert!(snap.shareholding.is_none());
    }
}
