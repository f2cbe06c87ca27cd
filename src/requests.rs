use std::time::Duration;

use log::warn;
use reqwest::{
    Client, ClientBuilder, RequestBuilder,
    header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue},
};

use crate::session::CookieJar;

const CALENDAR_TIMEOUT: Duration = Duration::from_secs(30);
const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RequestClient {
    portal: Client,
    notifications: Client,
}

impl RequestClient {
    /// `cookies` get replayed on every request to the portal.
    pub fn new(cookies: &CookieJar) -> reqwest::Result<Self> {
        let mut portal_headers = HeaderMap::new();
        if let Some(value) = cookie_header(cookies) {
            portal_headers.insert(COOKIE, value);
        }
        let portal = ClientBuilder::new()
            .default_headers(portal_headers)
            .timeout(CALENDAR_TIMEOUT)
            .build()?;
        let notifications = ClientBuilder::new().timeout(NOTIFICATION_TIMEOUT).build()?;
        Ok(Self {
            portal,
            notifications,
        })
    }

    /// POST to the portal with the headers its calendar page sends.
    pub fn portal_post(&self, url: &str) -> RequestBuilder {
        self.portal.post(url).headers(calendar_headers())
    }

    pub fn notification_post(&self, url: &str) -> RequestBuilder {
        self.notifications.post(url)
    }
}

fn cookie_header(cookies: &CookieJar) -> Option<HeaderValue> {
    if cookies.is_empty() {
        warn!("No cookies from login, calendar requests will be anonymous");
        return None;
    }
    match HeaderValue::from_str(&cookies.header_value()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Dropping session cookies, they don't fit in a header: {e}");
            None
        }
    }
}

fn calendar_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    headers
}
