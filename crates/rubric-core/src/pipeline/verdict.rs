//! AI verdict parsing and repair.
//!
//! The model is asked for a strict one-object JSON answer but routinely
//! returns near-JSON: fenced blocks, a dangling `"confidence": ,`,
//! leading-dot numbers, missing commas between fields. This module
//! applies a fixed-order textual repair pass before decoding, retries
//! once with a broader missing-comma fix, and normalizes the confidence
//! value into `[0, 1]`.

use std::sync::OnceLock;

use regex::Regex;

use rubric_llm::gateway::strip_code_fences;
use rubric_types::{AiVerdict, ClassifyError, Result};

/// Fallback confidence for absent/degenerate values.
const DEFAULT_CONFIDENCE: f64 = 0.5;

fn re_dangling_confidence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""confidence"\s*:\s*,"#).expect("static regex"))
}

fn re_null_confidence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""confidence"\s*:\s*null"#).expect("static regex"))
}

fn re_leading_dot_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":\s*\.([0-9]+)").expect("static regex"))
}

fn re_newline_missing_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(["0-9\]}])[ \t]*\n[ \t]*""#).expect("static regex"))
}

fn re_inline_missing_comma_strings() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""[ \t]+""#).expect("static regex"))
}

fn re_inline_missing_comma_numbers() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([0-9\]}])[ \t]+""#).expect("static regex"))
}

/// Parse a (possibly malformed) model answer into a verdict.
///
/// Fails with [`ClassifyError::AiMalformed`] when no repair yields a
/// JSON object with a non-empty `selected_code`.
pub fn parse_verdict(text: &str) -> Result<AiVerdict> {
    let cleaned = strip_code_fences(text.trim());
    let repaired = apply_fixups(&cleaned);

    let value = match serde_json::from_str::<serde_json::Value>(&repaired) {
        Ok(value) => value,
        Err(_) => {
            // One broader pass: insert commas between adjacent fields on
            // the same line, then retry.
            let broader = re_inline_missing_comma_numbers()
                .replace_all(&repaired, r#"$1, ""#)
                .into_owned();
            let broader = re_inline_missing_comma_strings()
                .replace_all(&broader, r#"", ""#)
                .into_owned();
            serde_json::from_str::<serde_json::Value>(&broader).map_err(|e| {
                ClassifyError::AiMalformed(format!("unparseable verdict ({e}): {text}"))
            })?
        }
    };

    let selected_code = value
        .get("selected_code")
        .or_else(|| value.get("selectedCode"))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("");
    if selected_code.is_empty() {
        return Err(ClassifyError::AiMalformed(format!(
            "verdict without selected_code: {text}"
        )));
    }

    let confidence = repair_confidence(value.get("confidence"));
    let reasoning = value
        .get("reasoning")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    Ok(AiVerdict {
        selected_code: selected_code.to_string(),
        confidence,
        reasoning,
    })
}

/// The fixed-order textual fix-ups applied before the first decode.
fn apply_fixups(input: &str) -> String {
    let fixed = re_dangling_confidence().replace_all(input, r#""confidence": 0.5,"#);
    let fixed = re_null_confidence().replace_all(&fixed, r#""confidence": 0.5"#);
    let fixed = re_leading_dot_number().replace_all(&fixed, ": 0.$1");
    re_newline_missing_comma()
        .replace_all(&fixed, "$1,\n\"")
        .into_owned()
}

/// Normalize a raw confidence value into `[0, 1]`.
///
/// Percent-style values in `(1, 100]` are divided by 100. Zero,
/// negative, NaN, out-of-range and non-numeric values fall back to 0.5.
/// String values are parsed first ("0.95" → 0.95, "95" → 0.95).
pub fn repair_confidence(value: Option<&serde_json::Value>) -> f64 {
    let raw = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    let Some(raw) = raw else {
        return DEFAULT_CONFIDENCE;
    };
    if !raw.is_finite() || raw <= 0.0 {
        return DEFAULT_CONFIDENCE;
    }
    if raw <= 1.0 {
        return raw;
    }
    if raw <= 100.0 {
        return raw / 100.0;
    }
    DEFAULT_CONFIDENCE
}
