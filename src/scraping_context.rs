use crate::{
    config::ScraperConfig, error::RunError, extract::ClassRoomExtractor, requests::RequestClient,
    session::CookieJar,
};

/// Everything the per-person steps share once the login is done.
pub struct ScrapingContext<'a> {
    pub config: &'a ScraperConfig,
    pub extractor: ClassRoomExtractor,
    pub request_client: RequestClient,
}

impl<'a> ScrapingContext<'a> {
    pub fn new(config: &'a ScraperConfig, cookies: &CookieJar) -> Result<Self, RunError> {
        let extractor = ClassRoomExtractor::new()?;
        let request_client = RequestClient::new(cookies)?;
        Ok(ScrapingContext {
            config,
            extractor,
            request_client,
        })
    }
}
