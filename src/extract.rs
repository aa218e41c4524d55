//! Normalizes provider responses into an image, a text answer, or a
//! classified error.

use crate::error::{Result, UbahLansError};
use crate::types::ImagePayload;
use crate::wire::{Candidate, GenerateContentResponse, ResponseContent};
use serde_json::Value;

/// Case-insensitive substrings that mark a text part as a refusal.
const REFUSAL_MARKERS: [&str; 4] = ["cannot", "sorry", "apologize", "unable"];

/// Characters of a refusal quoted in the error.
const REFUSAL_EXCERPT: usize = 300;
/// Characters of a text-instead-of-image answer quoted in the error.
const TEXT_EXCERPT: usize = 200;

fn first_candidate(response: &GenerateContentResponse) -> Result<(&Candidate, &ResponseContent)> {
    let Some(candidate) = response.candidates.as_deref().and_then(|c| c.first()) else {
        let blocked = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref());
        return Err(match blocked {
            Some(reason) => UbahLansError::ContentBlocked(format!("Prompt blocked: {reason}")),
            None => UbahLansError::InvalidResponse("no candidates in response".into()),
        });
    };
    let content = candidate
        .content
        .as_ref()
        .ok_or_else(|| UbahLansError::InvalidResponse("candidate has no content".into()))?;
    Ok((candidate, content))
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Extracts the edited image from an image-editing response.
///
/// The first part with inline data wins, wherever it sits among the parts.
/// Only when no part carries an image does the first non-empty text part
/// fail the call: with a refusal marker as [`UbahLansError::Refused`],
/// otherwise as [`UbahLansError::TextInsteadOfImage`].
pub fn extract_image(response: &GenerateContentResponse) -> Result<ImagePayload> {
    let (candidate, content) = first_candidate(response)?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        match reason {
            "STOP" => {}
            "SAFETY" => {
                return Err(UbahLansError::ContentBlocked(
                    "Image generation blocked by safety filters. Try a different image or prompt."
                        .into(),
                ))
            }
            "RECITATION" => {
                return Err(UbahLansError::ContentBlocked(
                    "Image generation blocked due to recitation concerns. Try a different prompt."
                        .into(),
                ))
            }
            "MAX_TOKENS" => return Err(UbahLansError::Truncated),
            other => {
                tracing::warn!(finish_reason = other, "generation stopped early, inspecting parts");
            }
        }
    }

    let parts = content.parts.as_deref().unwrap_or_default();

    if let Some(blob) = parts.iter().find_map(|p| p.inline_data()) {
        let data = blob.data.as_deref().unwrap_or_default();
        let image = ImagePayload::from_base64(blob.mime_type(), data)?;
        tracing::debug!(mime_type = %image.mime_type, bytes = image.size(), "found image data");
        return Ok(image);
    }

    if let Some(text) = parts
        .iter()
        .find_map(|p| p.text.as_deref().filter(|t| !t.is_empty()))
    {
        let lower = text.to_lowercase();
        if REFUSAL_MARKERS.iter().any(|m| lower.contains(m)) {
            return Err(UbahLansError::Refused(excerpt(text, REFUSAL_EXCERPT)));
        }
        return Err(UbahLansError::TextInsteadOfImage(excerpt(text, TEXT_EXCERPT)));
    }

    Err(UbahLansError::NoImageData)
}

/// Extracts the answer from a text (or vision) response.
///
/// Returns the first non-empty text part of the first candidate.
pub fn extract_text(response: &GenerateContentResponse) -> Result<String> {
    let (_, content) = first_candidate(response).map_err(|e| match e {
        UbahLansError::InvalidResponse(_) => UbahLansError::InvalidResponse(
            "API returned no valid response. The model may not support this request.".into(),
        ),
        other => other,
    })?;

    content
        .parts
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find_map(|p| p.text.clone().filter(|t| !t.is_empty()))
        .ok_or_else(|| UbahLansError::InvalidResponse("response contained no text".into()))
}

/// Pulls a human-readable message out of a non-2xx JSON body.
///
/// Probes `error` (a string, or an object's `message`, else the object as
/// JSON), then `details`, then `message`, then falls back to `status_text`.
pub fn error_message(body: &Value, status_text: &str) -> String {
    if let Some(error) = body.get("error").filter(|v| is_truthy(v)) {
        return match error {
            Value::String(s) => s.clone(),
            Value::Object(obj) => match obj.get("message").filter(|v| is_truthy(v)) {
                Some(message) => value_to_message(message),
                None => error.to_string(),
            },
            other => other.to_string(),
        };
    }
    for key in ["details", "message"] {
        if let Some(value) = body.get(key).filter(|v| is_truthy(v)) {
            return value_to_message(value);
        }
    }
    status_text.to_string()
}

fn value_to_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    fn image_of(result: Result<ImagePayload>) -> ImagePayload {
        result.expect("expected image")
    }

    #[test]
    fn test_missing_candidates_is_invalid() {
        let err = extract_image(&parse(json!({}))).unwrap_err();
        assert!(matches!(err, UbahLansError::InvalidResponse(_)));

        let err = extract_image(&parse(json!({"candidates": []}))).unwrap_err();
        assert!(matches!(err, UbahLansError::InvalidResponse(_)));
    }

    #[test]
    fn test_missing_content_is_invalid() {
        let err = extract_image(&parse(json!({"candidates": [{"finishReason": "STOP"}]}))).unwrap_err();
        assert!(matches!(err, UbahLansError::InvalidResponse(_)));
    }

    #[test]
    fn test_image_part_returned() {
        let resp = parse(json!({"candidates": [{
            "content": {"parts": [{"inlineData": {"mimeType": "image/jpeg", "data": "AQID"}}]},
            "finishReason": "STOP"
        }]}));
        let image = image_of(extract_image(&resp));
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_snake_case_image_part_returned() {
        let resp = parse(json!({"candidates": [{
            "content": {"parts": [{"inline_data": {"mime_type": "image/png", "data": "AQID"}}]}
        }]}));
        assert_eq!(image_of(extract_image(&resp)).mime_type, "image/png");
    }

    #[test]
    fn test_image_before_text_wins() {
        let resp = parse(json!({"candidates": [{
            "content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": "AQID"}},
                {"text": "sorry"}
            ]}
        }]}));
        assert_eq!(image_of(extract_image(&resp)).data, vec![1, 2, 3]);
    }

    #[test]
    fn test_text_before_image_still_returns_image() {
        for caption in ["sorry, cannot edit", "Here is your redesigned garden."] {
            let resp = parse(json!({"candidates": [{
                "content": {"parts": [
                    {"text": caption},
                    {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
                ]},
                "finishReason": "STOP"
            }]}));
            assert_eq!(image_of(extract_image(&resp)).data, vec![1, 2, 3]);
        }
    }

    #[test]
    fn test_first_text_part_classifies_when_no_image() {
        let resp = parse(json!({"candidates": [{
            "content": {"parts": [
                {"text": "A calm courtyard."},
                {"text": "Sorry, that is all."}
            ]}
        }]}));
        assert!(matches!(
            extract_image(&resp).unwrap_err(),
            UbahLansError::TextInsteadOfImage(_)
        ));
    }

    #[test]
    fn test_blocked_prompt_without_candidates() {
        let resp = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        match extract_image(&resp).unwrap_err() {
            UbahLansError::ContentBlocked(msg) => assert_eq!(msg, "Prompt blocked: SAFETY"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            extract_text(&resp).unwrap_err(),
            UbahLansError::ContentBlocked(_)
        ));
    }

    #[test]
    fn test_empty_parts_skipped_before_image() {
        let resp = parse(json!({"candidates": [{
            "content": {"parts": [
                {},
                {"text": ""},
                {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
            ]}
        }]}));
        assert_eq!(image_of(extract_image(&resp)).data, vec![1, 2, 3]);
    }

    #[test]
    fn test_safety_finish_reason_wins_over_parts() {
        let resp = parse(json!({"candidates": [{
            "content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AQID"}}]},
            "finishReason": "SAFETY"
        }]}));
        let err = extract_image(&resp).unwrap_err();
        match err {
            UbahLansError::ContentBlocked(msg) => assert!(msg.contains("safety filters")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_recitation_and_max_tokens() {
        let recitation = parse(json!({"candidates": [{"content": {"parts": []}, "finishReason": "RECITATION"}]}));
        match extract_image(&recitation).unwrap_err() {
            UbahLansError::ContentBlocked(msg) => assert!(msg.contains("recitation")),
            other => panic!("unexpected error: {other:?}"),
        }

        let truncated = parse(json!({"candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]}));
        assert!(matches!(extract_image(&truncated).unwrap_err(), UbahLansError::Truncated));
    }

    #[test]
    fn test_other_finish_reason_falls_through_to_parts() {
        let resp = parse(json!({"candidates": [{
            "content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AQID"}}]},
            "finishReason": "OTHER"
        }]}));
        assert_eq!(image_of(extract_image(&resp)).data, vec![1, 2, 3]);
    }

    #[test]
    fn test_refusal_text() {
        let resp = parse(json!({"candidates": [{
            "content": {"parts": [{"text": "I'm Sorry, I CANNOT edit photos of people."}]}
        }]}));
        match extract_image(&resp).unwrap_err() {
            UbahLansError::Refused(text) => assert!(text.starts_with("I'm Sorry")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_text_instead_of_image_is_truncated() {
        let long = "A lovely garden with ".repeat(30);
        let resp = parse(json!({"candidates": [{"content": {"parts": [{"text": long}]}}]}));
        match extract_image(&resp).unwrap_err() {
            UbahLansError::TextInsteadOfImage(text) => assert_eq!(text.chars().count(), 200),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_image_data() {
        let resp = parse(json!({"candidates": [{"content": {"parts": [{}]}}]}));
        assert!(matches!(extract_image(&resp).unwrap_err(), UbahLansError::NoImageData));

        let resp = parse(json!({"candidates": [{"content": {}}]}));
        assert!(matches!(extract_image(&resp).unwrap_err(), UbahLansError::NoImageData));
    }

    #[test]
    fn test_extract_text() {
        let resp = parse(json!({"candidates": [{"content": {"parts": [{"text": "1. **Frangipani**: shade"}]}}]}));
        assert_eq!(extract_text(&resp).unwrap(), "1. **Frangipani**: shade");

        let err = extract_text(&parse(json!({"candidates": []}))).unwrap_err();
        assert!(err.to_string().contains("no valid response"));
    }

    #[test]
    fn test_error_message_string_error() {
        assert_eq!(error_message(&json!({"error": "boom"}), "Bad Request"), "boom");
    }

    #[test]
    fn test_error_message_object_error() {
        assert_eq!(
            error_message(&json!({"error": {"message": "boom2", "code": 400}}), "Bad Request"),
            "boom2"
        );
        assert_eq!(
            error_message(&json!({"error": {"code": 400}}), "Bad Request"),
            r#"{"code":400}"#
        );
    }

    #[test]
    fn test_error_message_details_then_message_then_status() {
        assert_eq!(error_message(&json!({"details": "boom3"}), "x"), "boom3");
        assert_eq!(error_message(&json!({"message": "boom4"}), "x"), "boom4");
        assert_eq!(
            error_message(&json!({"error": "", "details": "boom5"}), "x"),
            "boom5"
        );
        assert_eq!(error_message(&json!({}), "Service Unavailable"), "Service Unavailable");
        assert_eq!(error_message(&Value::Null, "Not Found"), "Not Found");
    }
}
