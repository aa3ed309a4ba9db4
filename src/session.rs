//! Session records - completed workouts as stored in the document database

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Label used when a session has no template name
pub const DEFAULT_TEMPLATE_NAME: &str = "Workout";

/// Timestamp as it arrives from the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Server-generated timestamp
    Server {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
    /// Epoch milliseconds
    Millis(f64),
    /// RFC 3339 or plain `YYYY-MM-DD`
    Text(String),
    /// Anything else; never convertible
    Other(Value),
}

impl Timestamp {
    /// Convert a server timestamp; other variants are not convertible
    pub fn server_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Server { seconds, nanoseconds } => {
                Utc.timestamp_opt(*seconds, *nanoseconds).single()
            }
            _ => None,
        }
    }

    /// Parse any representation into a calendar value
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Server { .. } => self.server_time(),
            Timestamp::Millis(ms) if ms.is_finite() => {
                Utc.timestamp_millis_opt(*ms as i64).single()
            }
            Timestamp::Text(text) => parse_date_text(text),
            _ => None,
        }
    }
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Logged result of one exercise inside a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseResult {
    #[serde(default)]
    pub weight: Value,
    #[serde(default)]
    pub reps: Value,
    #[serde(default)]
    pub target: Value,
}

impl ExerciseResult {
    /// Non-object values become an empty result
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }

    pub fn weight(&self) -> f64 {
        coerce_number(&self.weight)
    }

    pub fn reps(&self) -> f64 {
        coerce_number(&self.reps)
    }

    pub fn target(&self) -> String {
        coerce_text(&self.target)
    }
}

/// Completed workout session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient_results")]
    pub results: Option<BTreeMap<String, ExerciseResult>>,
}

/// `results` that is not a map counts as missing; each value is coerced on its own
fn lenient_results<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, ExerciseResult>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => Some(
            map.into_iter()
                .map(|(name, value)| (name, ExerciseResult::from_value(value)))
                .collect(),
        ),
        _ => None,
    })
}

impl WorkoutSession {
    pub fn template_name(&self) -> &str {
        self.template_name.as_deref().unwrap_or(DEFAULT_TEMPLATE_NAME)
    }

    /// Completion date: server `completedAt`, then `createdAt`, then `now`
    pub fn resolve_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        resolve_session_date(self.completed_at.as_ref(), self.created_at.as_ref(), now)
    }
}

/// Resolve a session date with the fixed priority chain.
///
/// A record with neither a server `completedAt` nor a parseable `createdAt`
/// gets `now`, so re-reading the same record later can yield a different date.
pub fn resolve_session_date(
    completed_at: Option<&Timestamp>,
    created_at: Option<&Timestamp>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    completed_at
        .and_then(Timestamp::server_time)
        .or_else(|| created_at.and_then(Timestamp::parse))
        .unwrap_or(now)
}

/// Parse an exported JSON array of session documents, skipping unreadable ones
pub fn sessions_from_json(raw: &str) -> serde_json::Result<Vec<WorkoutSession>> {
    let documents: Vec<Value> = serde_json::from_str(raw)?;
    let total = documents.len();

    let sessions: Vec<WorkoutSession> = documents
        .into_iter()
        .enumerate()
        .filter_map(|(i, doc)| match serde_json::from_value(doc) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("skipping session document #{}: {}", i, e);
                None
            }
        })
        .collect();

    if sessions.len() < total {
        warn!("{} of {} session documents skipped", total - sessions.len(), total);
    }
    Ok(sessions)
}

/// Coerce a loosely typed numeric field; anything unparseable becomes 0
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() { 0.0 } else { s.parse::<f64>().unwrap_or(0.0) }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

/// Coerce a loosely typed text field; missing becomes empty
pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_coerce_number_variants() {
        assert_eq!(coerce_number(&json!(80)), 80.0);
        assert_eq!(coerce_number(&json!(82.5)), 82.5);
        assert_eq!(coerce_number(&json!("60")), 60.0);
        assert_eq!(coerce_number(&json!(" 12.5 ")), 12.5);
        assert_eq!(coerce_number(&json!("")), 0.0);
        assert_eq!(coerce_number(&json!("heavy")), 0.0);
        assert_eq!(coerce_number(&json!("NaN")), 0.0);
        assert_eq!(coerce_number(&json!(null)), 0.0);
        assert_eq!(coerce_number(&json!([1, 2])), 0.0);
        assert_eq!(coerce_number(&json!(true)), 1.0);
    }

    #[test]
    fn test_coerce_text() {
        assert_eq!(coerce_text(&json!("8-10")), "8-10");
        assert_eq!(coerce_text(&json!(12)), "12");
        assert_eq!(coerce_text(&Value::Null), "");
    }

    #[test]
    fn test_deserialize_session_document() {
        let session: WorkoutSession = serde_json::from_value(json!({
            "id": "s1",
            "userId": "u1",
            "templateName": "Push A",
            "completedAt": { "seconds": 1_700_000_000, "nanoseconds": 0 },
            "results": {
                "Bench Press": { "weight": "80", "reps": 8, "target": "3x8" }
            }
        }))
        .unwrap();

        assert_eq!(session.template_name(), "Push A");
        let result = &session.results.as_ref().unwrap()["Bench Press"];
        assert_eq!(result.weight(), 80.0);
        assert_eq!(result.reps(), 8.0);
        assert_eq!(result.target(), "3x8");
        assert_eq!(
            session.resolve_date(now()),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_template_uses_default() {
        let session: WorkoutSession = serde_json::from_value(json!({ "id": "s1" })).unwrap();
        assert_eq!(session.template_name(), DEFAULT_TEMPLATE_NAME);
        assert!(session.results.is_none());
    }

    #[test]
    fn test_sessions_from_json_skips_bad_documents() {
        let raw = r#"[
            {"id": "a", "templateName": "Push", "results": {}},
            {"id": 7, "templateName": "Pull"},
            42,
            {"id": "c", "createdAt": "2024-01-01"}
        ]"#;
        let sessions = sessions_from_json(raw).unwrap();
        let ids: Vec<_> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        assert!(sessions_from_json("{\"id\": \"a\"}").is_err());
    }

    #[test]
    fn test_malformed_result_values_degrade() {
        let raw = r#"[{
            "id": "s1",
            "templateName": "Push",
            "createdAt": "2024-01-01",
            "results": {
                "Bench": {"weight": "80", "reps": 8},
                "Dips": null,
                "Plank": 80
            }
        }]"#;
        let sessions = sessions_from_json(raw).unwrap();
        assert_eq!(sessions.len(), 1);

        let results = sessions[0].results.as_ref().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results["Bench"].weight(), 80.0);
        assert_eq!(results["Dips"], ExerciseResult::default());
        assert_eq!(results["Plank"].reps(), 0.0);
        assert_eq!(results["Plank"].target(), "");
    }

    #[test]
    fn test_non_map_results_count_as_missing() {
        let session: WorkoutSession =
            serde_json::from_value(json!({ "id": "b", "templateName": "Legs", "results": "oops" }))
                .unwrap();
        assert!(session.results.is_none());
        assert_eq!(session.template_name(), "Legs");
    }

    #[test]
    fn test_underscore_server_timestamp() {
        let ts: Timestamp =
            serde_json::from_value(json!({ "_seconds": 86_400, "_nanoseconds": 0 })).unwrap();
        assert_eq!(ts.server_time(), Utc.timestamp_opt(86_400, 0).single());
    }

    #[test]
    fn test_resolve_prefers_server_completed_at() {
        let completed = Timestamp::Server { seconds: 100, nanoseconds: 0 };
        let created = Timestamp::Text("2020-01-01".into());
        let date = resolve_session_date(Some(&completed), Some(&created), now());
        assert_eq!(date, Utc.timestamp_opt(100, 0).unwrap());
    }

    #[test]
    fn test_resolve_text_completed_at_falls_through_to_created_at() {
        let completed = Timestamp::Text("2021-05-05".into());
        let created = Timestamp::Text("2020-01-01T10:00:00Z".into());
        let date = resolve_session_date(Some(&completed), Some(&created), now());
        assert_eq!(date, Utc.with_ymd_and_hms(2020, 1, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_resolve_created_at_formats() {
        let plain = Timestamp::Text("2020-03-04".into());
        assert_eq!(
            resolve_session_date(None, Some(&plain), now()),
            Utc.with_ymd_and_hms(2020, 3, 4, 0, 0, 0).unwrap()
        );

        let millis = Timestamp::Millis(1_000.0);
        assert_eq!(
            resolve_session_date(None, Some(&millis), now()),
            Utc.timestamp_millis_opt(1_000).unwrap()
        );
    }

    #[test]
    fn test_resolve_falls_back_to_now() {
        let garbage = Timestamp::Text("yesterday-ish".into());
        assert_eq!(resolve_session_date(None, Some(&garbage), now()), now());
        assert_eq!(resolve_session_date(None, None, now()), now());

        let odd: Timestamp = serde_json::from_value(json!(true)).unwrap();
        assert_eq!(odd, Timestamp::Other(json!(true)));
        assert_eq!(resolve_session_date(Some(&odd), Some(&odd), now()), now());
    }
}
