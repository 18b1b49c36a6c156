//! Pricing rule resolver for LLM cost calculations
//!
//! An ordered list of model matchers, each carrying per-token costs and the
//! context window size. Resolution is a linear scan where the first match
//! wins; no match yields the table's explicit fallback facts.
//!
//! The same list renders into a SQL `CASE` expression so cost aggregation in
//! a store agrees with `PricingTable::cost_for` for every model identifier.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::filters::{Scalar, SqlParams};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Embedded OpenAI pricing rules (compile-time)
const EMBEDDED_PRICING_JSON: &str = include_str!("../../../data/openai_pricing.json");

// ============================================================================
// ERROR TYPE
// ============================================================================

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Failed to parse pricing data: {0}")]
    ParseError(String),
    #[error("Invalid pricing rule #{index}: {reason}")]
    InvalidRule { index: usize, reason: String },
    #[error("Invalid fallback pricing: {0}")]
    InvalidFallback(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// PRICING RULES
// ============================================================================

/// How a rule compares its value with a model identifier (case-sensitive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOperator {
    Equals,
    #[serde(alias = "startsWith")]
    StartsWith,
    Includes,
}

impl MatchOperator {
    pub fn name(&self) -> &'static str {
        match self {
            MatchOperator::Equals => "equals",
            MatchOperator::StartsWith => "starts_with",
            MatchOperator::Includes => "includes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelMatcher {
    pub operator: MatchOperator,
    pub value: String,
}

impl ModelMatcher {
    pub fn matches(&self, model: &str) -> bool {
        match self.operator {
            MatchOperator::Equals => model == self.value,
            MatchOperator::StartsWith => model.starts_with(&self.value),
            MatchOperator::Includes => model.contains(&self.value),
        }
    }
}

/// Cost and window facts for one model family
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PricingFacts {
    /// Cost per prompt token (USD)
    pub prompt_token_cost: f64,
    /// Cost per completion token (USD)
    pub completion_token_cost: f64,
    /// Context window size in tokens
    pub max_window_size: u64,
}

impl PricingFacts {
    /// Cost of a request; negative token counts count as zero
    pub fn cost(&self, prompt_tokens: i64, completion_tokens: i64) -> f64 {
        self.prompt_token_cost * prompt_tokens.max(0) as f64
            + self.completion_token_cost * completion_tokens.max(0) as f64
    }

    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("prompt token cost", self.prompt_token_cost),
            ("completion token cost", self.completion_token_cost),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a finite non-negative number", name));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricingRule {
    pub matcher: ModelMatcher,
    pub facts: PricingFacts,
}

/// Rule as stored in pricing files
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleWire {
    model: ModelMatcher,
    cost: CostWire,
    #[serde(default)]
    max_window_size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CostWire {
    prompt_token: f64,
    completion_token: f64,
}

impl From<RuleWire> for PricingRule {
    fn from(wire: RuleWire) -> Self {
        Self {
            matcher: wire.model,
            facts: PricingFacts {
                prompt_token_cost: wire.cost.prompt_token,
                completion_token_cost: wire.cost.completion_token,
                max_window_size: wire.max_window_size,
            },
        }
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// How a model identifier was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// `equals` rule
    Exact,
    /// `starts_with` rule
    Prefix,
    /// `includes` rule
    Substring,
    /// No rule matched, fallback facts used
    Fallback,
}

impl From<MatchOperator> for MatchType {
    fn from(operator: MatchOperator) -> Self {
        match operator {
            MatchOperator::Equals => MatchType::Exact,
            MatchOperator::StartsWith => MatchType::Prefix,
            MatchOperator::Includes => MatchType::Substring,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedPricing {
    pub facts: PricingFacts,
    pub match_type: MatchType,
    /// Position of the matching rule, `None` for the fallback
    pub rule_index: Option<usize>,
}

/// Immutable, ordered pricing rule table
#[derive(Debug, Clone)]
pub struct PricingTable {
    rules: Vec<PricingRule>,
    fallback: PricingFacts,
}

impl PricingTable {
    /// Build a table, rejecting negative or non-finite costs and empty matchers
    pub fn new(rules: Vec<PricingRule>, fallback: PricingFacts) -> Result<Self, PricingError> {
        fallback.validate().map_err(PricingError::InvalidFallback)?;
        for (index, rule) in rules.iter().enumerate() {
            if rule.matcher.value.is_empty() {
                return Err(PricingError::InvalidRule {
                    index,
                    reason: "matcher value is empty".to_string(),
                });
            }
            rule.facts
                .validate()
                .map_err(|reason| PricingError::InvalidRule { index, reason })?;
        }
        Ok(Self { rules, fallback })
    }

    /// Built-in OpenAI rules with a zero-cost fallback
    pub fn builtin() -> Result<Self, PricingError> {
        Self::from_json(EMBEDDED_PRICING_JSON)
    }

    /// Parse a JSON rule list with a zero-cost fallback
    pub fn from_json(json: &str) -> Result<Self, PricingError> {
        let wire: Vec<RuleWire> =
            serde_json::from_str(json).map_err(|e| PricingError::ParseError(e.to_string()))?;
        Self::new(
            wire.into_iter().map(PricingRule::from).collect(),
            PricingFacts::default(),
        )
    }

    /// Load a JSON rule list from disk
    pub async fn load(path: &Path) -> Result<Self, PricingError> {
        let json = tokio::fs::read_to_string(path).await?;
        let table = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            rules = table.rules.len(),
            "Loaded pricing rules"
        );
        Ok(table)
    }

    pub fn rules(&self) -> &[PricingRule] {
        &self.rules
    }

    pub fn fallback(&self) -> PricingFacts {
        self.fallback
    }

    /// First matching rule, or the fallback
    pub fn resolve(&self, model: &str) -> ResolvedPricing {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matcher.matches(model))
            .map(|(index, rule)| ResolvedPricing {
                facts: rule.facts,
                match_type: rule.matcher.operator.into(),
                rule_index: Some(index),
            })
            .unwrap_or(ResolvedPricing {
                facts: self.fallback,
                match_type: MatchType::Fallback,
                rule_index: None,
            })
    }

    /// Cost of one request in USD
    pub fn cost_for(&self, model: &str, prompt_tokens: i64, completion_tokens: i64) -> f64 {
        self.resolve(model).facts.cost(prompt_tokens, completion_tokens)
    }

    /// Render the rule list as one `CASE` expression over the given columns
    ///
    /// Clauses keep rule order so the store picks the same rule as
    /// `resolve`. Model values are bound through `params`; costs are
    /// validated numbers and rendered inline. A NULL model takes the
    /// fallback branch. Token counts are clamped at zero as in
    /// `PricingFacts::cost`.
    pub fn render_cost_case(
        &self,
        params: &mut SqlParams,
        model_expr: &str,
        prompt_expr: &str,
        completion_expr: &str,
    ) -> String {
        let dialect = params.dialect();
        let prompt = dialect.non_negative(prompt_expr);
        let completion = dialect.non_negative(completion_expr);
        let cost = |facts: &PricingFacts| {
            format!(
                "{} * {} + {} * {}",
                dialect.cast_to_float(&facts.prompt_token_cost.to_string()),
                prompt,
                dialect.cast_to_float(&facts.completion_token_cost.to_string()),
                completion
            )
        };

        let fallback = cost(&self.fallback);
        if self.rules.is_empty() {
            return fallback;
        }

        let mut sql = String::from("CASE");
        for rule in &self.rules {
            let placeholder = params.push(Scalar::Text(rule.matcher.value.clone()));
            let condition = match rule.matcher.operator {
                MatchOperator::Equals => format!("{} = {}", model_expr, placeholder),
                MatchOperator::StartsWith => dialect.starts_with(model_expr, &placeholder),
                MatchOperator::Includes => dialect.contains(model_expr, &placeholder),
            };
            sql.push_str(&format!(" WHEN {} THEN {}", condition, cost(&rule.facts)));
        }
        sql.push_str(&format!(" ELSE {} END", fallback));
        sql
    }
}
