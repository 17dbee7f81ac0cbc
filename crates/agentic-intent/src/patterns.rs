//! Offline regex classifier.
//!
//! Each intent has a list of patterns with a base confidence. The best
//! matching pattern across all intents wins; entities are pulled out with a
//! second set of extractors.

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use agentic_core::error::ParseError;
use agentic_core::intent::{Entity, IntentClassifier, IntentType, ParsedIntent};

/// One compiled pattern linked to an intent.
struct IntentPattern {
    regex: Regex,
    intent_type: IntentType,
    base_confidence: f32,
}

/// Applications recognized as process names anywhere in a query.
pub const KNOWN_APPS: [&str; 18] = [
    "firefox", "chromium", "chrome", "slack", "discord", "spotify", "telegram", "signal",
    "steam", "zoom", "teams", "thunderbird", "vlc", "code", "docker", "java", "node", "python",
];

/// Words after "install"/"kill" that are never package or process names.
const STOPWORDS: [&str; 24] = [
    "a", "all", "an", "and", "any", "apps", "browser", "browsers", "distractions",
    "everything", "for", "it", "latest", "me", "my", "package", "packages", "please", "some",
    "stuff", "system", "the", "them", "updates",
];

pub struct PatternClassifier {
    patterns: Vec<IntentPattern>,
    install_re: Regex,
    command_re: Regex,
    min_confidence: f32,
}

impl PatternClassifier {
    /// Compile the built-in pattern set.
    pub fn new(min_confidence: f32) -> Result<Self, regex::Error> {
        let table: [(IntentType, &[(&str, f32)]); 3] = [
            (
                IntentType::Focus,
                &[
                    (r"(?i)\bfocus(?:ed|ing)?\b", 0.90),
                    (r"(?i)\bdeep\s+work\b", 0.88),
                    (r"(?i)\bdistract(?:ion|ions|ing|ed)?\b", 0.85),
                    (
                        r"(?i)\b(?:close|kill|quit|pause|suspend|stop)\s+(?:all\s+)?(?:my\s+)?(?:the\s+)?(?:browsers?|chat|apps|social\s+media|music|games?)\b",
                        0.85,
                    ),
                    (r"(?i)\b(?:need|want)\s+to\s+(?:concentrate|study|work)\b", 0.75),
                    (r"(?i)\b(?:pause|suspend)\b", 0.60),
                ],
            ),
            (
                IntentType::Update,
                &[
                    (r"(?i)\binstall\b", 0.90),
                    (r"(?i)\bupgrade\b", 0.90),
                    (r"(?i)\bupdate\b", 0.85),
                    (r"(?i)\bapt(?:-get)?\b", 0.80),
                    (r"(?i)\blatest\s+version\b", 0.70),
                ],
            ),
            (
                IntentType::CleanMemory,
                &[
                    (r"(?i)\b(?:free|clear|clean)\s+(?:up\s+)?(?:some\s+)?(?:ram|memory)\b", 0.95),
                    (r"(?i)\b(?:drop|clear|flush)\s+(?:the\s+)?caches?\b", 0.92),
                    (
                        r"(?i)\b(?:ram|memory)\b.*\b(?:full|low|hog|hogs|hogging|eating|leak)\b",
                        0.88,
                    ),
                    (r"(?i)\b(?:hog|hogs|hogging|eating)\b.*\b(?:ram|memory)\b", 0.88),
                    (r"(?i)\b(?:slow|sluggish|lagging)\b", 0.55),
                ],
            ),
        ];

        let mut patterns = Vec::new();
        for (intent_type, entries) in table {
            for (pattern, confidence) in entries {
                patterns.push(IntentPattern {
                    regex: Regex::new(pattern)?,
                    intent_type,
                    base_confidence: *confidence,
                });
            }
        }

        Ok(Self {
            patterns,
            install_re: Regex::new(r"(?i)\b(?:install|upgrade|update)\s+(.+)")?,
            command_re: Regex::new(r"(?i)\b(?:kill|close|quit|pause|suspend|stop)\s+([\w.-]+)")?,
            min_confidence,
        })
    }

    /// Best matching intent and the pattern that produced it.
    fn best_match(&self, query: &str) -> Option<(&IntentPattern, f32)> {
        let mut best: Option<(&IntentPattern, f32)> = None;
        for pattern in &self.patterns {
            if !pattern.regex.is_match(query) {
                continue;
            }
            let better = best.map_or(true, |(_, conf)| pattern.base_confidence > conf);
            if better {
                best = Some((pattern, pattern.base_confidence));
            }
        }
        best
    }

    fn extract_packages(&self, query: &str) -> Vec<String> {
        let Some(caps) = self.install_re.captures(query) else {
            return Vec::new();
        };
        let tail = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let mut packages: Vec<String> = Vec::new();
        for word in tail.split(|c: char| c.is_whitespace() || c == ',') {
            let word = word
                .trim_matches(|c: char| matches!(c, '.' | '!' | '?' | ';' | ':' | '"' | '\''))
                .to_lowercase();
            if is_package_name(&word) && !packages.contains(&word) {
                packages.push(word);
            }
        }
        packages
    }

    fn extract_processes(&self, query: &str) -> Vec<String> {
        let lower = query.to_lowercase();
        let mut found: Vec<(usize, String)> = Vec::new();

        for app in KNOWN_APPS {
            let re = format!(r"\b{}\b", regex::escape(app));
            if let Ok(word) = Regex::new(&re) {
                if let Some(m) = word.find(&lower) {
                    found.push((m.start(), app.to_string()));
                }
            }
        }
        for caps in self.command_re.captures_iter(&lower) {
            if let Some(m) = caps.get(1) {
                let name = m.as_str().trim_matches('.').to_string();
                if is_package_name(&name) && !found.iter().any(|(_, n)| *n == name) {
                    found.push((m.start(), name));
                }
            }
        }

        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, name)| name).collect()
    }
}

fn is_package_name(word: &str) -> bool {
    let mut chars = word.chars();
    let starts_ok = chars
        .next()
        .map(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .unwrap_or(false);
    starts_ok
        && word
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+-._".contains(c))
        && !STOPWORDS.contains(&word)
}

#[async_trait]
impl IntentClassifier for PatternClassifier {
    async fn classify(&self, query: &str, _context: &str) -> Result<ParsedIntent, ParseError> {
        let query_trimmed = query.trim();
        if query_trimmed.is_empty() {
            return Err(ParseError::EmptyQuery);
        }

        let Some((pattern, confidence)) = self.best_match(query_trimmed) else {
            debug!(query = %query_trimmed, "No intent pattern matched");
            return Ok(ParsedIntent::new(query, IntentType::Unknown, 0.0)
                .with_reasoning("No known pattern matched the request."));
        };

        if confidence < self.min_confidence {
            return Ok(ParsedIntent::new(query, IntentType::Unknown, confidence).with_reasoning(
                format!(
                    "Best match {} at {:.2} is below the {:.2} threshold.",
                    pattern.intent_type, confidence, self.min_confidence
                ),
            ));
        }

        let mut intent = ParsedIntent::new(query, pattern.intent_type, confidence)
            .with_reasoning(format!(
                "Matched {} pattern `{}`.",
                pattern.intent_type,
                pattern.regex.as_str()
            ));
        let entities: Vec<Entity> = match pattern.intent_type {
            IntentType::Update => self
                .extract_packages(query_trimmed)
                .into_iter()
                .map(|p| Entity::new("package", p))
                .collect(),
            IntentType::Focus | IntentType::CleanMemory => self
                .extract_processes(query_trimmed)
                .into_iter()
                .map(|p| Entity::new("process", p))
                .collect(),
            IntentType::Unknown => Vec::new(),
        };
        intent.entities = entities;
        debug!(
            intent = %intent.intent_type,
            confidence = confidence,
            entities = intent.entities.len(),
            "Pattern classification"
        );
        Ok(intent)
    }
}
