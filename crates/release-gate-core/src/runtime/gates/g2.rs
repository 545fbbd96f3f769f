// release-gate-core/src/runtime/gates/g2.rs
// ============================================================================
// Module: Release Gate G2 Research-Card Quality
// Description: Card count, field coverage, conflict, and traceability ratios.
// Purpose: Reject runs whose research evidence is too thin to admit.
// Dependencies: serde_json, crate::core, crate::runtime::gates
// ============================================================================

//! ## Overview
//! G2 reads the research cards document and evaluates five ratios against
//! the `research` profile group. Every breach maps to
//! `HARD_THRESHOLD_BREACH`; an absent file or empty card list maps to
//! `HARD_METRIC_MISSING`. Ratios divide by `max(card_count, 1)` so an empty
//! payload degrades to zeros instead of dividing by zero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::core::checkpoint::Gate;
use crate::core::value::as_nonempty_str;
use crate::core::value::push_unique;
use crate::runtime::gates::GateCheck;
use crate::runtime::gates::GateContext;
use crate::runtime::gates::GateOutcome;

// ============================================================================
// SECTION: Reason Codes
// ============================================================================

/// Threshold breach reason code.
const REASON_BREACH: &str = "HARD_THRESHOLD_BREACH";
/// Missing metric reason code.
const REASON_MISSING: &str = "HARD_METRIC_MISSING";

// ============================================================================
// SECTION: Gate Implementation
// ============================================================================

/// G2 research-card quality gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct G2Check;

impl GateCheck for G2Check {
    fn gate(&self) -> Gate {
        Gate::G2
    }

    fn run(&self, ctx: &GateContext) -> GateOutcome {
        let cfg = &ctx.profile.config.research;
        let cards_path = &ctx.evidence.research_cards;

        let payload = match crate::core::io::read_optional_json_object(cards_path) {
            Ok(Some(value)) => value,
            Ok(None) => {
                let mut details: Map<String, Value> = Map::new();
                details
                    .insert(String::from("cardsPath"), json!(cards_path.display().to_string()));
                return GateOutcome::policy_fail(
                    REASON_MISSING,
                    format!("research cards file not found: {}", cards_path.display()),
                    details,
                );
            }
            Err(err) => {
                let mut details: Map<String, Value> = Map::new();
                details
                    .insert(String::from("cardsPath"), json!(cards_path.display().to_string()));
                return GateOutcome::policy_fail(
                    REASON_MISSING,
                    format!("research cards unreadable: {err}"),
                    details,
                );
            }
        };

        let cards: Vec<Value> = match payload.get("cards") {
            Some(Value::Array(entries)) => entries.clone(),
            _ => Vec::new(),
        };
        let card_count = payload
            .get("card_count")
            .and_then(Value::as_i64)
            .unwrap_or_else(|| i64::try_from(cards.len()).unwrap_or(i64::MAX));

        let mut reasons: Vec<String> = Vec::new();
        let mut issues: Vec<String> = Vec::new();

        if card_count < cfg.min_cards {
            issues.push(format!("card_count below threshold: {card_count} < {}", cfg.min_cards));
            push_unique(&mut reasons, String::from(REASON_BREACH));
        }

        let missing_field_count = count_missing_fields(&cards, &cfg.required_fields);
        let denominator = (card_count.max(0) * i64::try_from(cfg.required_fields.len().max(1)).unwrap_or(1)).max(1);
        let missing_ratio = ratio(missing_field_count, denominator);
        if missing_ratio > cfg.required_field_missing_ratio_max {
            issues.push(format!(
                "required_field_missing_ratio exceeded: {missing_ratio:.6} > {:.6}",
                cfg.required_field_missing_ratio_max
            ));
            push_unique(&mut reasons, String::from(REASON_BREACH));
        }

        let mut unresolved_conflicts = 0_i64;
        let mut traceable_count = 0_i64;
        let mut citation_parse_count = 0_i64;
        for card in &cards {
            let Some(card_obj) = card.as_object() else {
                continue;
            };
            let conflict = card_obj
                .get("conflict_status")
                .and_then(Value::as_str)
                .map(str::to_lowercase);
            if matches!(conflict.as_deref(), Some("open" | "unresolved")) {
                unresolved_conflicts += 1;
            }
            let card_id = card_obj.get("card_id").and_then(as_nonempty_str);
            let paper_id = card_obj.get("source_paper_id").and_then(as_nonempty_str);
            let title = card_obj.get("source_title").and_then(as_nonempty_str);
            if card_id.is_some() && paper_id.is_some() && title.is_some() {
                traceable_count += 1;
            }
            if paper_id.is_some() {
                citation_parse_count += 1;
            }
        }

        let population = card_count.max(1);
        let unresolved_ratio = ratio(unresolved_conflicts, population);
        if unresolved_ratio > cfg.unresolved_conflict_ratio_max {
            issues.push(format!(
                "unresolved_conflict_ratio exceeded: {unresolved_ratio:.6} > {:.6}",
                cfg.unresolved_conflict_ratio_max
            ));
            push_unique(&mut reasons, String::from(REASON_BREACH));
        }

        let traceability_ratio = ratio(traceable_count, population);
        if traceability_ratio < cfg.traceability_ratio_min {
            issues.push(format!(
                "traceability_ratio below threshold: {traceability_ratio:.6} < {:.6}",
                cfg.traceability_ratio_min
            ));
            push_unique(&mut reasons, String::from(REASON_BREACH));
        }

        let citation_parse_ratio = ratio(citation_parse_count, population);
        if citation_parse_ratio < cfg.citation_parse_ratio_min {
            issues.push(format!(
                "citation_parse_ratio below threshold: {citation_parse_ratio:.6} < {:.6}",
                cfg.citation_parse_ratio_min
            ));
            push_unique(&mut reasons, String::from(REASON_BREACH));
        }

        if cards.is_empty() {
            push_unique(&mut reasons, String::from(REASON_MISSING));
            if issues.is_empty() {
                issues.push(String::from("cards list is empty"));
            }
        }

        let mut details: Map<String, Value> = Map::new();
        details.insert(String::from("cardsPath"), json!(cards_path.display().to_string()));
        details.insert(String::from("cardCount"), json!(card_count));
        details.insert(String::from("missingFieldCount"), json!(missing_field_count));
        details.insert(String::from("requiredFieldMissingRatio"), json!(round6(missing_ratio)));
        details.insert(String::from("unresolvedConflictRatio"), json!(round6(unresolved_ratio)));
        details.insert(String::from("traceabilityRatio"), json!(round6(traceability_ratio)));
        details.insert(String::from("citationParseRatio"), json!(round6(citation_parse_ratio)));

        GateOutcome::from_findings(reasons, issues, details)
    }
}

// ============================================================================
// SECTION: Ratio Helpers
// ============================================================================

/// Counts fields that are absent, null, or blank across all cards.
fn count_missing_fields(cards: &[Value], required_fields: &[String]) -> i64 {
    if required_fields.is_empty() {
        return 0;
    }
    let mut missing = 0_i64;
    for card in cards {
        let Some(card_obj) = card.as_object() else {
            missing += i64::try_from(required_fields.len()).unwrap_or(i64::MAX);
            continue;
        };
        for field in required_fields {
            let blank = match card_obj.get(field) {
                None | Some(Value::Null) => true,
                Some(Value::String(text)) => text.trim().is_empty(),
                Some(_) => false,
            };
            if blank {
                missing += 1;
            }
        }
    }
    missing
}

/// Divides two counts as floats.
#[allow(clippy::cast_precision_loss, reason = "card counts stay far below 2^52")]
fn ratio(numerator: i64, denominator: i64) -> f64 {
    numerator as f64 / denominator.max(1) as f64
}

/// Rounds a ratio to six decimal places for details reporting.
fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
