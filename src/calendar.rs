use chrono::NaiveDate;
use log::{debug, error, info, warn};
use serde_json::Value;

use crate::{
    error::FetchError,
    metrics::{Metrics, timed},
    requests::RequestClient,
};

// Resource type the portal uses for students.
const RES_TYPE_STUDENT: &str = "104";
const CAL_VIEW: &str = "month";

/// One raw event as the portal returns it. Only `description` is relied on.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntry {
    raw: Value,
}

impl CalendarEntry {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// `None` when the entry isn't an object or has no string `description`.
    pub fn description(&self) -> Option<&str> {
        self.raw.get("description").and_then(Value::as_str)
    }
}

#[derive(Debug, PartialEq)]
pub enum CalendarData {
    Entries(Vec<CalendarEntry>),
    /// The body didn't parse as JSON at all.
    InvalidJson,
    /// Parsed, but the top level isn't an array.
    NotAList,
}

fn decode_entries(body: &str) -> CalendarData {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => {
            CalendarData::Entries(items.into_iter().map(CalendarEntry::new).collect())
        }
        Ok(_) => CalendarData::NotAList,
        Err(_) => CalendarData::InvalidJson,
    }
}

async fn request_calendar(
    client: &RequestClient,
    endpoint: &str,
    federation_id: &str,
    date: NaiveDate,
) -> Result<CalendarData, FetchError> {
    let day = date.format("%Y-%m-%d").to_string();
    let form = [
        ("start", day.as_str()),
        ("end", day.as_str()),
        ("resType", RES_TYPE_STUDENT),
        ("calView", CAL_VIEW),
        ("federationIds[]", federation_id),
    ];
    let response = client.portal_post(endpoint).form(&form).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    let body = response.text().await?;
    let data = decode_entries(&body);
    if !matches!(data, CalendarData::Entries(_)) {
        debug!("unexpected calendar body: {:.200}", body);
    }
    Ok(data)
}

/// Asks the portal for one person's events on `date`.
pub async fn fetch_calendar_data(
    client: &RequestClient,
    endpoint: &str,
    federation_id: &str,
    date: NaiveDate,
    metrics: &dyn Metrics,
) -> Result<CalendarData, FetchError> {
    let result = timed(
        metrics,
        "fetch_calendar_data",
        request_calendar(client, endpoint, federation_id, date),
    )
    .await;
    match &result {
        Ok(CalendarData::Entries(entries)) => {
            metrics.incr("fetch_calendar_data.success");
            info!("Fetched {} calendar entries for {federation_id}", entries.len());
        }
        Ok(CalendarData::InvalidJson) => {
            metrics.incr("fetch_calendar_data.invalid_json");
            warn!("Calendar response for {federation_id} was not valid JSON");
        }
        Ok(CalendarData::NotAList) => {
            metrics.incr("fetch_calendar_data.unexpected_shape");
            error!("Calendar response for {federation_id} is JSON but not a list of entries");
        }
        Err(e) => {
            metrics.incr("fetch_calendar_data.failure");
            warn!("Fetching calendar for {federation_id} failed: {e}");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_array_of_objects() {
        let CalendarData::Entries(entries) =
            decode_entries(r#"[{"description": "A_b", "start": "x"}, {}]"#)
        else {
            panic!("expected entries");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description(), Some("A_b"));
        assert_eq!(entries[1].description(), None);
    }

    #[test]
    fn empty_array_is_no_entries() {
        assert_eq!(decode_entries("[]"), CalendarData::Entries(vec![]));
    }

    #[test]
    fn unparseable_body_is_invalid_json() {
        assert_eq!(decode_entries("<html>login</html>"), CalendarData::InvalidJson);
    }

    #[test]
    fn object_body_is_not_a_list() {
        assert_eq!(decode_entries(r#"{"description": "A"}"#), CalendarData::NotAList);
    }

    #[test]
    fn scalar_items_are_kept_for_the_extractor_to_reject() {
        let CalendarData::Entries(entries) = decode_entries(r#"[{"description": "A_b"}, 5]"#)
        else {
            panic!("expected entries");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].description(), None);
    }
}
