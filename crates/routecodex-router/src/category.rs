//! Route-category classification and pipeline-pool selection for requests
//! that arrive without an explicit `provider/model` prefix.
//!
//! This mirrors the classic "virtual router" idea: a bare model name plus a
//! few signals (token count, tool presence, a `thinking` flag) picks a
//! *category*, and each category owns a small pool of concrete
//! `provider.model[.keyId]` targets selected round robin with health-aware
//! skipping.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arc_swap::ArcSwap;

const SHORT_MAX_TOKENS: usize = 1_000;
const MEDIUM_MAX_TOKENS: usize = 8_000;
const LONG_MAX_TOKENS: usize = 32_000;
const LONGCONTEXT_MIN_TOKENS: usize = 24_000;

/// Rough characters-per-token ratio used by the char-based fallback
/// estimator. tiktoken-grade counting happens in the provider layer (see
/// `routecodex-providers`'s `count_text_tiktoken`); the router only needs a
/// coarse bucket, so it avoids pulling a tokenizer dependency into this
/// crate.
const CHARS_PER_TOKEN: usize = 4;

/// Fixed per-message protocol overhead added on top of the raw character
/// estimate (role markers, delimiters, name fields).
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteCategory {
    Default,
    Coding,
    LongContext,
    Tools,
    Thinking,
    WebSearch,
}

impl RouteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteCategory::Default => "default",
            RouteCategory::Coding => "coding",
            RouteCategory::LongContext => "longcontext",
            RouteCategory::Tools => "tools",
            RouteCategory::Thinking => "thinking",
            RouteCategory::WebSearch => "webSearch",
        }
    }
}

/// Inputs that drive classification. `messages_text` is every piece of text
/// the request would send upstream (system + user + assistant turns); tool
/// schemas should be appended by the caller before estimation.
#[derive(Debug, Clone, Default)]
pub struct CategoryInput<'a> {
    pub messages_text: Vec<&'a str>,
    pub message_count: usize,
    pub has_tools: bool,
    pub has_web_search_tool: bool,
    pub thinking: bool,
}

/// Char-ratio token estimator: sums character length across every message,
/// converts at `CHARS_PER_TOKEN`, and adds a flat per-message overhead.
pub fn estimate_tokens(input: &CategoryInput<'_>) -> usize {
    let chars: usize = input.messages_text.iter().map(|s| s.chars().count()).sum();
    chars / CHARS_PER_TOKEN + input.message_count * MESSAGE_OVERHEAD_TOKENS
}

/// Applies spec thresholds in priority order: explicit signals (webSearch,
/// thinking) win over token-count buckets, and very-long token counts
/// override everything else except those explicit signals.
pub fn classify_category(input: &CategoryInput<'_>) -> RouteCategory {
    if input.has_web_search_tool {
        return RouteCategory::WebSearch;
    }
    if input.thinking {
        return RouteCategory::Thinking;
    }

    let tokens = estimate_tokens(input);
    if tokens >= LONGCONTEXT_MIN_TOKENS {
        return RouteCategory::LongContext;
    }
    if input.has_tools {
        return RouteCategory::Tools;
    }
    if tokens >= LONG_MAX_TOKENS {
        return RouteCategory::LongContext;
    }
    if tokens >= MEDIUM_MAX_TOKENS || tokens >= SHORT_MAX_TOKENS {
        // medium/long buckets without tools or explicit signals still route
        // through `default`; the bucket boundaries only matter for the
        // longcontext override above. Exposed via `token_bucket` for pools
        // that want to branch on bucket rather than category.
        return RouteCategory::Default;
    }
    RouteCategory::Default
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBucket {
    Short,
    Medium,
    Long,
    VeryLong,
}

pub fn token_bucket(tokens: usize) -> TokenBucket {
    if tokens >= LONG_MAX_TOKENS {
        TokenBucket::VeryLong
    } else if tokens >= MEDIUM_MAX_TOKENS {
        TokenBucket::Long
    } else if tokens >= SHORT_MAX_TOKENS {
        TokenBucket::Medium
    } else {
        TokenBucket::Short
    }
}

/// A single resolved `provider.model[.keyId]` pool entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub provider: String,
    pub model: String,
    pub key_id: String,
}

impl RouteTarget {
    /// Parses `"provider.model"` or `"provider.model.keyId"`. New-format
    /// entries (two segments) default `key_id` to `"default"`.
    pub fn parse(entry: &str) -> Option<RouteTarget> {
        let mut parts = entry.splitn(3, '.');
        let provider = parts.next()?.trim();
        let model = parts.next()?.trim();
        if provider.is_empty() || model.is_empty() {
            return None;
        }
        let key_id = parts.next().map(str::trim).unwrap_or("default");
        let key_id = if key_id.is_empty() { "default" } else { key_id };
        Some(RouteTarget {
            provider: provider.to_string(),
            model: model.to_string(),
            key_id: key_id.to_string(),
        })
    }
}

/// Round-robin pool of targets for one category, with health-aware skip.
pub struct RoutePool {
    targets: ArcSwap<Vec<RouteTarget>>,
    cursor: AtomicUsize,
}

impl RoutePool {
    pub fn new(targets: Vec<RouteTarget>) -> Self {
        Self {
            targets: ArcSwap::from_pointee(targets),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn replace(&self, targets: Vec<RouteTarget>) {
        self.targets.store(Arc::new(targets));
        self.cursor.store(0, Ordering::Relaxed);
    }

    pub fn is_empty(&self) -> bool {
        self.targets.load().is_empty()
    }

    /// Picks the next target, skipping any for which `is_healthy` returns
    /// false. Returns `None` if every target in the pool is unhealthy (or
    /// the pool is empty).
    pub fn pick_next(&self, is_healthy: impl Fn(&RouteTarget) -> bool) -> Option<RouteTarget> {
        let targets = self.targets.load();
        let len = targets.len();
        if len == 0 {
            return None;
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % len;
        for offset in 0..len {
            let idx = (start + offset) % len;
            let candidate = &targets[idx];
            if is_healthy(candidate) {
                return Some(candidate.clone());
            }
        }
        None
    }
}

/// Full set of category pools, rebuilt atomically on config reload.
pub struct RouterConfig {
    pools: HashMap<RouteCategory, RoutePool>,
}

impl RouterConfig {
    pub fn new(pools: HashMap<RouteCategory, Vec<RouteTarget>>) -> Self {
        Self {
            pools: pools
                .into_iter()
                .map(|(category, targets)| (category, RoutePool::new(targets)))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            pools: HashMap::new(),
        }
    }

    /// Builds pools from `{category_name: ["provider.model", ...]}`, as
    /// served by the admin config surface. Unknown category names and
    /// unparsable entries are skipped rather than failing the whole config.
    pub fn from_raw(raw: &HashMap<String, Vec<String>>) -> RouterConfig {
        let mut pools = HashMap::new();
        for (name, entries) in raw {
            let Some(category) = parse_category_name(name) else {
                continue;
            };
            let targets: Vec<RouteTarget> =
                entries.iter().filter_map(|e| RouteTarget::parse(e)).collect();
            pools.insert(category, targets);
        }
        RouterConfig::new(pools)
    }

    /// Resolves a category to a concrete target, falling back to the
    /// `default` pool when the category has no pool or every entry in its
    /// pool is unhealthy.
    pub fn resolve(
        &self,
        category: RouteCategory,
        is_healthy: impl Fn(&RouteTarget) -> bool + Copy,
    ) -> Option<RouteTarget> {
        if let Some(pool) = self.pools.get(&category) {
            if let Some(target) = pool.pick_next(is_healthy) {
                return Some(target);
            }
        }
        if category == RouteCategory::Default {
            return None;
        }
        self.pools.get(&RouteCategory::Default)?.pick_next(is_healthy)
    }
}

fn parse_category_name(name: &str) -> Option<RouteCategory> {
    match name {
        "default" => Some(RouteCategory::Default),
        "coding" => Some(RouteCategory::Coding),
        "longcontext" => Some(RouteCategory::LongContext),
        "tools" => Some(RouteCategory::Tools),
        "thinking" => Some(RouteCategory::Thinking),
        "webSearch" | "websearch" | "web_search" => Some(RouteCategory::WebSearch),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(texts: Vec<&'a str>) -> CategoryInput<'a> {
        CategoryInput {
            message_count: texts.len(),
            messages_text: texts,
            ..Default::default()
        }
    }

    #[test]
    fn short_request_is_default() {
        let got = classify_category(&input(vec!["hello there"]));
        assert_eq!(got, RouteCategory::Default);
    }

    #[test]
    fn web_search_tool_wins_regardless_of_size() {
        let mut i = input(vec!["short"]);
        i.has_web_search_tool = true;
        assert_eq!(classify_category(&i), RouteCategory::WebSearch);
    }

    #[test]
    fn thinking_flag_wins_over_tools() {
        let mut i = input(vec!["short"]);
        i.thinking = true;
        i.has_tools = true;
        assert_eq!(classify_category(&i), RouteCategory::Thinking);
    }

    #[test]
    fn very_long_token_count_overrides_tools() {
        let big = "x".repeat(CHARS_PER_TOKEN * 30_000);
        let mut i = input(vec![&big]);
        i.has_tools = true;
        assert_eq!(classify_category(&i), RouteCategory::LongContext);
    }

    #[test]
    fn tools_without_long_context_routes_tools() {
        let mut i = input(vec!["short body"]);
        i.has_tools = true;
        assert_eq!(classify_category(&i), RouteCategory::Tools);
    }

    #[test]
    fn token_count_at_24000_is_longcontext() {
        let text = "x".repeat(CHARS_PER_TOKEN * LONGCONTEXT_MIN_TOKENS);
        let i = input(vec![&text]);
        assert_eq!(classify_category(&i), RouteCategory::LongContext);
        assert_eq!(token_bucket(estimate_tokens(&i)), TokenBucket::VeryLong);
    }

    #[test]
    fn route_target_parses_two_and_three_segments() {
        let two = RouteTarget::parse("openai.gpt-4o").unwrap();
        assert_eq!(two.key_id, "default");
        let three = RouteTarget::parse("openai.gpt-4o.primary").unwrap();
        assert_eq!(three.key_id, "primary");
        assert!(RouteTarget::parse("openai").is_none());
    }

    #[test]
    fn pool_round_robins_and_skips_unhealthy() {
        let pool = RoutePool::new(vec![
            RouteTarget::parse("openai.a").unwrap(),
            RouteTarget::parse("openai.b").unwrap(),
            RouteTarget::parse("openai.c").unwrap(),
        ]);
        let first = pool.pick_next(|_| true).unwrap();
        let second = pool.pick_next(|_| true).unwrap();
        assert_ne!(first.model, second.model);

        let only_c_healthy = |t: &RouteTarget| t.model == "c";
        let picked = pool.pick_next(only_c_healthy).unwrap();
        assert_eq!(picked.model, "c");
    }

    #[test]
    fn pool_returns_none_when_all_unhealthy() {
        let pool = RoutePool::new(vec![RouteTarget::parse("openai.a").unwrap()]);
        assert!(pool.pick_next(|_| false).is_none());
    }

    #[test]
    fn router_config_falls_back_to_default_pool() {
        let mut raw = HashMap::new();
        raw.insert("default".to_string(), vec!["openai.gpt-4o-mini".to_string()]);
        let cfg = RouterConfig::from_raw(&raw);
        let resolved = cfg.resolve(RouteCategory::Coding, |_| true).unwrap();
        assert_eq!(resolved.provider, "openai");
        assert_eq!(resolved.model, "gpt-4o-mini");
    }

    #[test]
    fn router_config_empty_pool_yields_none() {
        let cfg = RouterConfig::empty();
        assert!(cfg.resolve(RouteCategory::Default, |_| true).is_none());
    }
}
