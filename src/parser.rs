//! # Record Parser
//!
//! Extracts `name="value"` attribute pairs from a single-element markup
//! fragment such as `<row Id="7" Reputation="101" />` and resolves the
//! identity and score fields into a [`Record`].
//!
//! Parsing never panics. Every structural problem comes back as a
//! [`ParseError`] so the caller can skip the record and move on.

use crate::config::SchemaConfig;
use crate::error::{ParseError, SkipReason};
use crate::model::{Fields, Record};

/// Shortest input that can hold a single attribute pair: `a=""`.
const MIN_RECORD_LEN: usize = 4;

/// Split a raw record into its attribute map.
pub fn parse_fields(raw: &str) -> Result<Fields, ParseError> {
    let trimmed = raw.trim();
    if trimmed.len() < MIN_RECORD_LEN {
        return Err(ParseError::TooShort { len: trimmed.len() });
    }

    let body = strip_tag(trimmed);
    let tokens: Vec<&str> = body.split('"').collect();
    // n tokens means n - 1 quotes; values need them in pairs
    if tokens.len() % 2 == 0 {
        return Err(ParseError::UnbalancedQuotes);
    }

    let mut fields = Fields::new();
    for pair in tokens.chunks_exact(2) {
        let token = pair[0].trim();
        let name = token
            .strip_suffix('=')
            .ok_or_else(|| ParseError::MissingEquals {
                token: token.to_string(),
            })?
            .trim_end();
        if name.is_empty() {
            return Err(ParseError::EmptyName);
        }
        fields.insert(name.to_string(), pair[1].to_string());
    }

    if fields.is_empty() {
        return Err(ParseError::NoAttributes);
    }
    Ok(fields)
}

/// Drop `<name` from the front and `/>` or `>` from the back.
fn strip_tag(s: &str) -> &str {
    let mut body = s;
    if let Some(rest) = body.strip_prefix('<') {
        let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        body = &rest[name_end..];
    }
    body.strip_suffix("/>")
        .or_else(|| body.strip_suffix('>'))
        .unwrap_or(body)
}

/// Names the identity and score fields and the identities to ignore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    pub id_field: String,
    pub score_field: String,
    pub excluded_ids: Vec<String>,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self::from(&SchemaConfig::default())
    }
}

impl From<&SchemaConfig> for RecordSchema {
    fn from(config: &SchemaConfig) -> Self {
        Self {
            id_field: config.id_field.clone(),
            score_field: config.score_field.clone(),
            excluded_ids: config.excluded_ids.clone(),
        }
    }
}

impl RecordSchema {
    pub fn new(id_field: impl Into<String>, score_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            score_field: score_field.into(),
            excluded_ids: Vec::new(),
        }
    }

    pub fn with_excluded_ids(mut self, ids: Vec<String>) -> Self {
        self.excluded_ids = ids;
        self
    }

    /// Resolve identity and score from a parsed field map.
    pub fn extract(&self, fields: Fields) -> Result<Record, SkipReason> {
        let id = fields
            .get(&self.id_field)
            .ok_or_else(|| SkipReason::MissingField(self.id_field.clone()))?;
        if self.excluded_ids.iter().any(|excluded| excluded == id) {
            return Err(SkipReason::ExcludedId(id.clone()));
        }
        let raw_score = fields
            .get(&self.score_field)
            .ok_or_else(|| SkipReason::MissingField(self.score_field.clone()))?;
        let score = raw_score
            .trim()
            .parse::<i64>()
            .map_err(|_| SkipReason::InvalidScore {
                field: self.score_field.clone(),
                value: raw_score.clone(),
            })?;
        let id = id.clone();
        Ok(Record::new(id, score, fields))
    }
}

/// Turns raw record text into a [`Record`] or a reason to skip it.
#[derive(Debug, Clone, Default)]
pub struct RecordParser {
    schema: RecordSchema,
}

impl RecordParser {
    pub fn new(schema: RecordSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn parse(&self, raw: &str) -> Result<Record, SkipReason> {
        let fields = parse_fields(raw)?;
        self.schema.extract(fields)
    }
}
