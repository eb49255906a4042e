//! Parsing and encoding between raw bytes and [`Message`] (spec §4.2).
//!
//! Shape, not a tag field, disambiguates requests from notifications from
//! responses, matching JSON-RPC 2.0 itself: a `method` member with no `id`
//! is a notification; a `method` member with an `id` is a request; a
//! `result` or `error` member is a response. Anything else is rejected as
//! an invalid envelope.

use serde_json::Value;

use crate::error::{CodecError, CodecResult, RpcError};
use crate::message::{JSONRPC_VERSION, Message, Notification, Request, Response, RpcId};

/// Parse raw bytes into a [`Message`].
///
/// A top-level JSON array is parsed as a [`Message::Batch`]; an empty array
/// is rejected outright per spec, since a batch with no members carries no
/// work to acknowledge. Individual malformed members of an otherwise valid
/// batch do not fail the whole batch — each becomes a
/// [`Message::Response`] carrying its own error, so the caller can still
/// answer the well-formed members.
///
/// # Errors
/// Returns [`CodecError::MalformedJson`] if `bytes` is not valid JSON,
/// [`CodecError::EmptyBatch`] for `[]`, or [`CodecError::InvalidEnvelope`]
/// if a single (non-batch) payload is valid JSON but not a valid
/// request/notification/response.
pub fn decode(bytes: &[u8]) -> CodecResult<Message> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| CodecError::MalformedJson(e.to_string()))?;
    decode_value(value)
}

fn decode_value(value: Value) -> CodecResult<Message> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(CodecError::EmptyBatch);
            }
            let messages = items.into_iter().map(decode_batch_member).collect();
            Ok(Message::Batch(messages))
        }
        Value::Object(_) => decode_single(value),
        _ => Err(CodecError::InvalidEnvelope("top-level value must be an object or array".into())),
    }
}

/// Decode one member of a batch, recovering its `id` for the error response
/// even when the envelope itself is invalid.
fn decode_batch_member(value: Value) -> Message {
    let recovered_id = recover_id(&value);
    match decode_single(value) {
        Ok(message) => message,
        Err(err) => Message::Response(Response::failure(recovered_id, err.to_rpc_error())),
    }
}

fn recover_id(value: &Value) -> Option<RpcId> {
    let id = value.get("id")?;
    serde_json::from_value(id.clone()).ok()
}

fn decode_single(value: Value) -> CodecResult<Message> {
    let Value::Object(obj) = &value else {
        return Err(CodecError::InvalidEnvelope("expected a JSON object".into()));
    };

    match obj.get("jsonrpc") {
        Some(Value::String(v)) if v == JSONRPC_VERSION => {}
        Some(_) => return Err(CodecError::InvalidEnvelope("unsupported jsonrpc version".into())),
        None => return Err(CodecError::InvalidEnvelope("missing jsonrpc member".into())),
    }

    let has_method = obj.contains_key("method");
    let has_id = obj.contains_key("id");
    let has_result_or_error = obj.contains_key("result") || obj.contains_key("error");

    if has_method && has_id {
        if matches!(obj.get("id"), Some(Value::Null)) {
            return Err(CodecError::InvalidEnvelope("request id must not be null".into()));
        }
        let request: Request = serde_json::from_value(value)
            .map_err(|e| CodecError::InvalidEnvelope(e.to_string()))?;
        Ok(Message::Request(request))
    } else if has_method {
        let notification: Notification = serde_json::from_value(value)
            .map_err(|e| CodecError::InvalidEnvelope(e.to_string()))?;
        Ok(Message::Notification(notification))
    } else if has_result_or_error {
        if obj.contains_key("result") && obj.contains_key("error") {
            return Err(CodecError::InvalidEnvelope(
                "response must not carry both result and error".into(),
            ));
        }
        let response: Response = serde_json::from_value(value)
            .map_err(|e| CodecError::InvalidEnvelope(e.to_string()))?;
        Ok(Message::Response(response))
    } else {
        Err(CodecError::InvalidEnvelope(
            "envelope is neither a request, notification, nor response".into(),
        ))
    }
}

/// Encode a [`Message`] back to its wire `Value` form.
#[must_use]
pub fn encode_value(message: &Message) -> Value {
    match message {
        Message::Request(r) => serde_json::to_value(r).unwrap_or(Value::Null),
        Message::Notification(n) => serde_json::to_value(n).unwrap_or(Value::Null),
        Message::Response(r) => serde_json::to_value(r).unwrap_or(Value::Null),
        Message::Batch(items) => Value::Array(items.iter().map(encode_value).collect()),
    }
}

/// Encode a [`Message`] to UTF-8 bytes, newline-terminated for framed
/// transports (spec §4.3 stdio/TCP framing).
#[must_use]
pub fn encode(message: &Message) -> Vec<u8> {
    let mut bytes = serde_json::to_vec(&encode_value(message)).unwrap_or_default();
    bytes.push(b'\n');
    bytes
}

/// Build the single `-32700`/`-32600` response for a payload that could not
/// be decoded at all (i.e. [`decode`] itself returned an error). Carries
/// `id: null`, since no request id could be recovered.
#[must_use]
pub fn error_response_for(err: &CodecError) -> Response {
    Response::failure(None, err.to_rpc_error())
}

/// Given a batch of requests/notifications, build the reply batch: one
/// [`Response`] per request, notifications omitted, preserving order.
///
/// `handle` is invoked once per request and must return its result or
/// error value.
pub fn build_batch_response<F>(messages: &[Message], mut handle: F) -> Option<Message>
where
    F: FnMut(&Request) -> Result<Value, RpcError>,
{
    let mut responses = Vec::new();
    for message in messages {
        match message {
            Message::Request(req) => {
                let response = match handle(req) {
                    Ok(result) => Response::success(req.id.clone(), result),
                    Err(err) => Response::failure(Some(req.id.clone()), err),
                };
                responses.push(Message::Response(response));
            }
            Message::Notification(_) => {}
            Message::Response(resp) => responses.push(Message::Response(resp.clone())),
            Message::Batch(_) => {}
        }
    }
    if responses.is_empty() {
        None
    } else if responses.len() == 1 {
        responses.into_iter().next()
    } else {
        Some(Message::Batch(responses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_a_request() {
        let req = Request::new(RpcId::Number(1), "tools/list", None);
        let msg = Message::Request(req);
        let bytes = encode(&msg);
        let decoded = decode(&bytes).unwrap();
        match decoded {
            Message::Request(r) => {
                assert_eq!(r.method, "tools/list");
                assert_eq!(r.id, RpcId::Number(1));
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn round_trips_a_notification() {
        let notif = Notification::new("notifications/cancelled", Some(json!({"reason": "x"})));
        let bytes = encode(&Message::Notification(notif));
        let decoded = decode(&bytes).unwrap();
        assert!(decoded.is_notification());
    }

    #[test]
    fn round_trips_a_success_response() {
        let resp = Response::success(RpcId::Number(7), json!({"ok": true}));
        let bytes = encode(&Message::Response(resp));
        let decoded = decode(&bytes).unwrap();
        match decoded {
            Message::Response(r) => assert!(r.is_success()),
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn malformed_bytes_do_not_panic() {
        let err = decode(b"not json at all {{{").unwrap_err();
        assert_eq!(err.kind(), aperture_core::ErrorKind::ParseError);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let err = decode(b"[]").unwrap_err();
        assert!(matches!(err, CodecError::EmptyBatch));
        assert_eq!(err.kind(), aperture_core::ErrorKind::InvalidRequest);
    }

    #[test]
    fn request_with_null_id_is_invalid() {
        let raw = json!({"jsonrpc": "2.0", "id": null, "method": "x"});
        let err = decode(raw.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::InvalidEnvelope(_)));
    }

    #[test]
    fn batch_of_two_requests_and_a_notification_yields_two_responses() {
        let batch = json!([
            {"jsonrpc": "2.0", "id": 1, "method": "ping"},
            {"jsonrpc": "2.0", "method": "notifications/log"},
            {"jsonrpc": "2.0", "id": 2, "method": "ping"},
        ]);
        let decoded = decode(batch.to_string().as_bytes()).unwrap();
        let Message::Batch(members) = decoded else { panic!("expected batch") };
        assert_eq!(members.len(), 3);

        let reply = build_batch_response(&members, |_req| Ok(json!("pong"))).unwrap();
        let Message::Batch(responses) = reply else { panic!("expected batch response") };
        assert_eq!(responses.len(), 2);
    }
}
