use serde_json::{Value, json};

use crate::error::ClientError;
use crate::types::{
    Document, Interaction, InteractionPage, JobHandle, JobSnapshot, JobStatus, MessageRequest,
    RankedResult, ThreadOptions,
};

pub const MIN_TEMPERATURE: f64 = 0.00001;
pub const MAX_TEMPERATURE: f64 = 0.99999;

/// Keeps the temperature strictly inside (0, 1); the backend misbehaves at the
/// exact bounds.
pub fn clamp_temperature(temperature: f64) -> f64 {
    if temperature.is_nan() {
        return MIN_TEMPERATURE;
    }
    temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
}

/// Builds the body of a create-thread request.
pub fn thread_request_body(options: &ThreadOptions) -> Value {
    json!({
        "default_options": {
            "knowledge_base_ids": options.knowledge_base_ids,
            "model": options.model,
            "temperature": clamp_temperature(options.temperature),
            "system_message": options.system_message,
        }
    })
}

/// Builds the body of a get-response request. Always asks for async mode.
pub fn message_request_body(request: &MessageRequest) -> Value {
    json!({
        "async": true,
        "input": request.input,
        "model": request.model,
        "temperature": clamp_temperature(request.temperature),
        "use_rse": request.use_rse,
        "segment_length": request.segment_length.to_string(),
        "response_length": request.response_length.to_string(),
        "system_message": request.system_message,
        "knowledge_base_ids": request.knowledge_base_ids,
    })
}

/// Reads a string or number field as a string id.
fn id_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

/// Extracts the id of a newly created thread.
pub fn parse_thread_id(body: &Value) -> Result<String, ClientError> {
    id_field(body, "id").ok_or_else(|| ClientError::Malformed("thread response has no id".to_string()))
}

/// Parses the 202 body of an accepted async generation.
pub fn parse_job_handle(body: &Value) -> Result<JobHandle, ClientError> {
    let status_url = str_field(body, "status_url")
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ClientError::Malformed("job response has no status_url".to_string()))?;
    let status = str_field(body, "status")
        .map(JobStatus::parse)
        .unwrap_or(JobStatus::Pending);

    Ok(JobHandle {
        status,
        status_url: status_url.to_string(),
    })
}

/// Parses one poll of a generation job.
pub fn parse_job_snapshot(body: &Value) -> Result<JobSnapshot, ClientError> {
    let status = str_field(body, "status")
        .map(JobStatus::parse)
        .ok_or_else(|| ClientError::Malformed("poll response has no status".to_string()))?;

    let interaction = body
        .get("response")
        .and_then(|r| r.get("interaction"))
        .map(parse_interaction)
        .unwrap_or_default();

    Ok(JobSnapshot { status, interaction })
}

/// Parses the 200 body of a synchronous generation (`{interaction: {...}}`).
pub fn parse_sync_interaction(body: &Value) -> Result<Interaction, ClientError> {
    body.get("interaction")
        .map(parse_interaction)
        .ok_or_else(|| ClientError::Malformed("response has no interaction".to_string()))
}

/// Parses a page of interactions. Unknown shapes give an empty page.
pub fn parse_interaction_page(body: &Value) -> InteractionPage {
    let interactions = body
        .get("interactions")
        .and_then(|i| i.as_array())
        .map(|arr| arr.iter().map(parse_interaction).collect())
        .unwrap_or_default();

    let next_page_token = str_field(body, "next_page_token")
        .filter(|t| !t.is_empty())
        .map(String::from);

    InteractionPage {
        interactions,
        next_page_token,
    }
}

/// Parses an interaction record, tolerating missing or null fields.
pub fn parse_interaction(value: &Value) -> Interaction {
    let user_input = match value.get("user_input") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(obj @ Value::Object(_)) => str_field(obj, "content").map(String::from),
        _ => None,
    };

    let model_response = value
        .get("model_response")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(String::from);

    let references = value
        .get("references")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(parse_reference).collect())
        .unwrap_or_default();

    let ranked_results = value
        .get("ranked_results")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().map(parse_ranked_result).collect())
        .unwrap_or_default();

    let search_queries = value
        .get("search_queries")
        .and_then(|q| q.as_array())
        .map(|arr| arr.iter().filter_map(parse_search_query).collect())
        .unwrap_or_default();

    Interaction {
        id: id_field(value, "id"),
        user_input,
        model_response,
        references,
        ranked_results,
        search_queries,
    }
}

/// A reference is either a bare index or an object carrying `result_index`.
fn parse_reference(value: &Value) -> Option<usize> {
    let index = match value {
        Value::Number(n) => n.as_u64(),
        Value::Object(_) => value.get("result_index").and_then(|i| i.as_u64()),
        _ => None,
    }?;
    usize::try_from(index).ok()
}

fn parse_ranked_result(value: &Value) -> RankedResult {
    let metadata = value.get("metadata");
    let title = metadata
        .and_then(|m| m.get("document"))
        .and_then(|d| str_field(d, "title"))
        .or_else(|| metadata.and_then(|m| str_field(m, "title")))
        .unwrap_or("")
        .to_string();
    let link_to_source = metadata
        .and_then(|m| m.get("document"))
        .and_then(|d| str_field(d, "link_to_source"))
        .or_else(|| metadata.and_then(|m| str_field(m, "link_to_source")))
        .unwrap_or("")
        .to_string();

    RankedResult {
        content: str_field(value, "content").unwrap_or("").to_string(),
        metadata: Document {
            title,
            link_to_source,
        },
    }
}

fn parse_search_query(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => str_field(value, "query").map(String::from),
        _ => None,
    }
}
