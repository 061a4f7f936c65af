use anyhow::Result;
use url::{form_urlencoded, Url};

use crate::models::HorizonDays;

/// Initial values for a session. One day count serves both fixed cities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepLink {
    pub start_city: String,
    pub end_city: String,
    pub days: Option<HorizonDays>,
}

impl DeepLink {
    /// Parses a full URL, a path with a query, or a bare query string.
    ///
    /// Values are trimmed. Absent cities become empty names; a missing or
    /// unreadable `days` is left unset.
    pub fn parse(link: &str) -> Self {
        let query = match Url::parse(link) {
            Ok(url) => url.query().unwrap_or_default().to_string(),
            Err(_) => match link.split_once('?') {
                Some((_, query)) => query.to_string(),
                None => link.to_string(),
            },
        };

        let mut parsed = Self::default();
        let mut seen_start = false;
        let mut seen_end = false;
        let mut seen_days = false;

        // Only the first occurrence of each key counts.
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            match key.as_ref() {
                "start_city" if !seen_start => {
                    seen_start = true;
                    parsed.start_city = value.to_string();
                }
                "end_city" if !seen_end => {
                    seen_end = true;
                    parsed.end_city = value.to_string();
                }
                "days" if !seen_days => {
                    seen_days = true;
                    parsed.days = match value.parse::<i64>() {
                        Ok(days) => Some(HorizonDays::new(days)),
                        Err(_) => {
                            tracing::warn!("Ignoring unreadable days value: {:?}", value);
                            None
                        }
                    };
                }
                _ => {}
            }
        }

        parsed
    }

    /// Encodes the link as a query string without a leading `?`
    pub fn to_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer
            .append_pair("start_city", &self.start_city)
            .append_pair("end_city", &self.end_city);
        if let Some(days) = self.days {
            serializer.append_pair("days", &days.get().to_string());
        }
        serializer.finish()
    }

    /// Appends the query to `base`, e.g. `http://127.0.0.1:8050/dash/`
    pub fn to_url(&self, base: &str) -> Result<String> {
        let mut url = Url::parse(base)?;
        url.set_query(Some(&self.to_query()));
        Ok(url.to_string())
    }
}
