// src/tools/news.rs — News lookup with keyword sentiment aggregation

use std::sync::Arc;
use std::time::Duration;

use crate::agent::topic::TopicExtractor;
use crate::infra::cache::ResponseCache;
use crate::util::truncate_str;

const DEFAULT_BASE_URL: &str = "https://newsapi.org";

/// Articles requested from the provider per query.
const PAGE_SIZE: usize = 8;

/// Articles actually scored and rendered.
const MAX_ARTICLES: usize = 5;

/// Dominant label share required to headline a single sentiment.
const DOMINANT_SHARE: usize = 60;

const POSITIVE_WORDS: &[&str] = &[
    "gain", "gains", "rise", "rises", "surge", "surges", "rally", "record", "growth", "profit",
    "beat", "beats", "strong", "bullish", "soar", "soars", "jump", "jumps", "boost", "upbeat",
    "optimism", "recovery",
];

const NEGATIVE_WORDS: &[&str] = &[
    "loss", "losses", "fall", "falls", "drop", "drops", "decline", "declines", "weak", "miss",
    "misses", "crash", "bearish", "plunge", "plunges", "slump", "slumps", "fear", "fears",
    "concern", "concerns", "recession", "selloff", "cut", "cuts",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    fn label(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }
}

pub struct NewsTool {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
    cache: Arc<ResponseCache>,
    topics: TopicExtractor,
}

impl NewsTool {
    pub fn new(
        api_key: String,
        timeout: Duration,
        cache: Arc<ResponseCache>,
        topics: TopicExtractor,
    ) -> Self {
        Self::with_base_url(api_key, timeout, cache, topics, DEFAULT_BASE_URL.into())
    }

    pub fn with_base_url(
        api_key: String,
        timeout: Duration,
        cache: Arc<ResponseCache>,
        topics: TopicExtractor,
        base_url: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            timeout,
            cache,
            topics,
        }
    }

    /// Fetch recent headlines for whatever the user is asking about and
    /// render them with a sentiment summary. Never fails outward.
    pub async fn invoke(&self, query: &str) -> String {
        let topic = self.topics.extract(query).await.to_lowercase();

        let cache_key = format!("news:{topic}");
        let (body, from_cache) = if let Some(cached) = self.cache.get(&cache_key) {
            tracing::debug!(%topic, "News cache hit");
            (cached, true)
        } else {
            match self.fetch(&topic).await {
                Ok(body) => (body, false),
                Err(e) if e.is_timeout() => {
                    tracing::warn!(%topic, "News provider timed out");
                    return "The news service took too long to respond. Please try again.".into();
                }
                Err(e) => {
                    tracing::warn!(%topic, "News provider request failed: {e}");
                    return "I couldn't reach the news service. Please try again later.".into();
                }
            }
        };

        match render_news_body(&topic, &body) {
            Some(report) => {
                // Re-putting a cache hit would extend its TTL on every read
                if !from_cache {
                    self.cache.put(&cache_key, body);
                }
                report
            }
            None => {
                tracing::warn!(%topic, "Unparseable news payload");
                "Something went wrong while fetching the news.".into()
            }
        }
    }

    async fn fetch(&self, topic: &str) -> Result<String, reqwest::Error> {
        let page_size = PAGE_SIZE.to_string();
        self.client
            .get(format!("{}/v2/everything", self.base_url))
            .query(&[
                ("q", topic),
                ("pageSize", page_size.as_str()),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("apiKey", self.api_key.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// Turn a raw provider payload into the user-facing report. `None` means the
/// body is not a news payload at all (bad JSON or no `articles` field); an
/// empty article list is a valid answer and gets the fixed no-articles text.
fn render_news_body(topic: &str, body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    let articles = json.get("articles")?.as_array()?;
    if articles.is_empty() {
        return Some(format!("No recent news articles found for \"{topic}\"."));
    }
    Some(render_news(topic, articles))
}

/// Label one article by counting sentiment keyword hits over its
/// lowercased title + description. Ties are Neutral.
fn classify_article(article: &serde_json::Value) -> Sentiment {
    let text = format!(
        "{} {}",
        article["title"].as_str().unwrap_or(""),
        article["description"].as_str().unwrap_or("")
    )
    .to_lowercase();

    let tokens: Vec<&str> = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let count_hits =
        |words: &[&str]| -> usize { tokens.iter().filter(|t| words.contains(t)).count() };

    let positive = count_hits(POSITIVE_WORDS);
    let negative = count_hits(NEGATIVE_WORDS);

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

fn render_news(topic: &str, articles: &[serde_json::Value]) -> String {
    let scored: Vec<(&serde_json::Value, Sentiment)> = articles
        .iter()
        .take(MAX_ARTICLES)
        .map(|a| (a, classify_article(a)))
        .collect();

    let count_of = |s: Sentiment| scored.iter().filter(|(_, l)| *l == s).count();
    let positive = count_of(Sentiment::Positive);
    let negative = count_of(Sentiment::Negative);
    let neutral = count_of(Sentiment::Neutral);
    let total = scored.len();

    let (dominant, dominant_count) = [
        (Sentiment::Positive, positive),
        (Sentiment::Negative, negative),
        (Sentiment::Neutral, neutral),
    ]
    .into_iter()
    .max_by_key(|(_, n)| *n)
    .unwrap_or((Sentiment::Neutral, 0));

    let share = dominant_count * 100 / total.max(1);
    let headline = if share >= DOMINANT_SHARE {
        format!("{} sentiment ({share}% of {total} articles)", dominant.label())
    } else {
        format!("Mixed sentiment across {total} articles")
    };

    let mut out = format!(
        "📰 News for \"{topic}\" — {headline}\n\
         Breakdown: {positive} positive, {negative} negative, {neutral} neutral\n"
    );

    for (article, _) in &scored {
        let source = article["source"]["name"].as_str().unwrap_or("unknown");
        let title = article["title"].as_str().unwrap_or("(untitled)");
        let date = short_date(article["publishedAt"].as_str().unwrap_or(""));
        out.push_str(&format!(
            "• [{source}] {} ({date})\n",
            truncate_str(title, 80)
        ));
    }
    out.trim_end().to_string()
}

fn short_date(published_at: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(published_at) {
        Ok(dt) => dt.format("%b %d").to_string(),
        Err(_) => truncate_str(published_at, 10).to_string(),
    }
}
