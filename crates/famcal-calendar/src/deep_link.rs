//! `famcal://event` links handed from a widget to the main app.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use url::{form_urlencoded, Url};
use uuid::Uuid;

use crate::error::CalendarError;
use crate::types::ResolvedEventView;

pub const DEEP_LINK_SCHEME: &str = "famcal";
const EVENT_HOST: &str = "event";

/// Event reference carried by a deep link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    pub title: String,
    /// Start of the event, whole seconds.
    pub date: DateTime<Utc>,
    pub member_id: Uuid,
}

impl DeepLink {
    pub fn for_view(view: &ResolvedEventView) -> Self {
        Self {
            title: view.event.display_title().to_string(),
            date: view.event.start.trunc_subsecs(0),
            member_id: view.member_id,
        }
    }

    pub fn to_url(&self) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("title", &self.title)
            .append_pair("date", &self.date.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("memberId", &self.member_id.to_string())
            .finish();
        format!("{}://{}?{}", DEEP_LINK_SCHEME, EVENT_HOST, query)
    }

    pub fn parse(link: &str) -> Result<Self, CalendarError> {
        let url = Url::parse(link).map_err(|e| CalendarError::InvalidDeepLink(e.to_string()))?;

        if url.scheme() != DEEP_LINK_SCHEME {
            return Err(CalendarError::InvalidDeepLink(format!(
                "unexpected scheme '{}'",
                url.scheme()
            )));
        }
        if url.host_str() != Some(EVENT_HOST) {
            return Err(CalendarError::InvalidDeepLink(format!(
                "unexpected target '{}'",
                url.host_str().unwrap_or_default()
            )));
        }

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let param = |name: &str| {
            params
                .get(name)
                .ok_or_else(|| CalendarError::InvalidDeepLink(format!("missing {}", name)))
        };

        let date = DateTime::parse_from_rfc3339(param("date")?)
            .map_err(|e| CalendarError::InvalidDeepLink(format!("date: {}", e)))?
            .with_timezone(&Utc);
        let member_id = Uuid::parse_str(param("memberId")?)
            .map_err(|e| CalendarError::InvalidDeepLink(format!("memberId: {}", e)))?;

        Ok(Self {
            title: param("title")?.clone(),
            date,
            member_id,
        })
    }
}
