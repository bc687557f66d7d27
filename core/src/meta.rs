//! Base32 meta-output codec: smuggling structured JSON payloads through a
//! whitespace-free symbol alphabet.
use serde::{Deserialize, Serialize};

pub const OUTPUT_TAG: &str = "__output:";
pub const BEGIN_OUTPUT_TAG: &str = "__begin_output:";
pub const END_OUTPUT: &str = "__end_output";
pub const SENTENCE_OUTPUT_TAG: &str = "__sentence_output:";

const ALPHABET: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: false };

/// The payload carried by an `__output:` token: the spoken/decoded text and,
/// when the token resulted from a list reference, the slot it binds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPayload {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
}

/// Base32-encode `payload` (no padding) and prefix it with `tag`.
fn encode_tagged(tag: &str, payload: &str) -> String {
    format!("{tag}{}", base32::encode(ALPHABET, payload.as_bytes()))
}

/// Inverse of [`encode_tagged`]: strip `tag` and Base32-decode the remainder
/// as UTF-8. Returns `None` on malformed input rather than panicking, since
/// decoded text comes from an external FST-processing pipeline.
fn decode_tagged(tag: &str, token: &str) -> Option<String> {
    let rest = token.strip_prefix(tag)?;
    let bytes = base32::decode(ALPHABET, rest)?;
    String::from_utf8(bytes).ok()
}

/// Encode an `__output:` token for a value (list-bound or not).
pub fn encode_output(text: &str, list: Option<&str>) -> String {
    let payload = OutputPayload {
        text: text.to_string(),
        list: list.map(str::to_string),
    };
    let json = serde_json::to_string(&payload).expect("OutputPayload always serializes");
    encode_tagged(OUTPUT_TAG, &json)
}

/// Encode a `__sentence_output:` token from a raw template string.
pub fn encode_sentence_output(template: &str) -> String {
    encode_tagged(SENTENCE_OUTPUT_TAG, template)
}

/// Decode a single `__output:...` token's payload, if well-formed.
pub fn decode_output_token(token: &str) -> Option<OutputPayload> {
    let json = decode_tagged(OUTPUT_TAG, token)?;
    serde_json::from_str(&json).ok()
}

/// Decode a single `__sentence_output:...` token back to its raw template.
pub fn decode_sentence_output_token(token: &str) -> Option<String> {
    decode_tagged(SENTENCE_OUTPUT_TAG, token)
}

/// Result of [`decode_meta`]: the final decoded text, plus every
/// `{list: text}` binding observed along the way (exposed for callers that
/// also want the structured slot values, not just the final string).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedMeta {
    pub text: String,
    pub bindings: Vec<(String, String)>,
}

/// Decode the meta-output alphabet out of `text`, a space-joined sequence of
/// surface words possibly interleaved with `__output:` / `__sentence_output:`
/// tokens.
///
/// 1. Every `__output:XXX` token is Base32-decoded, parsed as
///    `{text, list?}`, and replaced in place by its plain `text`; any
///    `list` binding is remembered.
/// 2. The (at most one) `__sentence_output:YYY` token is decoded and its
///    `{slot}` placeholders are filled from step 1's bindings. When present
///    it replaces the whole result; otherwise step 1's substituted text is
///    returned verbatim.
pub fn decode_meta(text: &str) -> DecodedMeta {
    let mut bindings: Vec<(String, String)> = Vec::new();
    let mut sentence_template: Option<String> = None;
    let mut out_words: Vec<String> = Vec::new();

    for word in text.split_whitespace() {
        if let Some(payload) = decode_output_token(word) {
            if let Some(list) = &payload.list {
                bindings.push((list.clone(), payload.text.clone()));
            }
            out_words.push(payload.text);
        } else if let Some(template) = decode_sentence_output_token(word) {
            sentence_template = Some(template);
        } else {
            out_words.push(word.to_string());
        }
    }

    let substituted = out_words.join(" ");
    let final_text = match &sentence_template {
        Some(template) => format_with_bindings(template, &bindings),
        None => substituted,
    };

    DecodedMeta {
        text: final_text,
        bindings,
    }
}

fn format_with_bindings(template: &str, bindings: &[(String, String)]) -> String {
    let mut result = template.to_string();
    for (slot, value) in bindings {
        let placeholder = format!("{{{slot}}}");
        result = result.replace(&placeholder, value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_token_roundtrips() {
        let token = encode_output("kitchen light", Some("area"));
        assert!(token.starts_with(OUTPUT_TAG));
        assert!(!token.contains('='));
        let decoded = decode_output_token(&token).unwrap();
        assert_eq!(decoded.text, "kitchen light");
        assert_eq!(decoded.list.as_deref(), Some("area"));
    }

    #[test]
    fn sentence_output_token_roundtrips() {
        let token = encode_sentence_output("turn on {area}");
        let decoded = decode_sentence_output_token(&token).unwrap();
        assert_eq!(decoded, "turn on {area}");
    }

    #[test]
    fn decode_meta_substitutes_output_tokens() {
        let area = encode_output("kitchen", Some("area"));
        let text = format!("turn on the {area}");
        let decoded = decode_meta(&text);
        assert_eq!(decoded.text, "turn on the kitchen");
        assert_eq!(decoded.bindings, vec![("area".to_string(), "kitchen".to_string())]);
    }

    #[test]
    fn decode_meta_prefers_sentence_template_when_present() {
        let area = encode_output("kitchen", Some("area"));
        let sentence = encode_sentence_output("HassTurnOn({area})");
        let text = format!("turn on the {area} {sentence}");
        let decoded = decode_meta(&text);
        assert_eq!(decoded.text, "HassTurnOn(kitchen)");
    }

    #[test]
    fn decode_meta_passes_through_plain_text_untouched() {
        let decoded = decode_meta("turn on the kitchen light");
        assert_eq!(decoded.text, "turn on the kitchen light");
        assert!(decoded.bindings.is_empty());
    }

    #[test]
    fn malformed_token_decodes_to_none() {
        assert!(decode_output_token("__output:not-valid-base32!!").is_none());
    }
}
