//! Logging into the portal through a real browser and keeping the cookies it ends up with.

use fantoccini::{Client, ClientBuilder, Locator, error::CmdError, key::Key};
use log::{info, warn};
use serde_json::json;

use crate::{
    config::Credentials,
    error::LoginError,
    metrics::{Metrics, timed},
};

pub const USERNAME_FIELD: &str = "Name";
pub const PASSWORD_FIELD: &str = "Password";

const CHROME_ARGS: [&str; 5] = [
    "--no-sandbox",
    "--window-size=1920,1080",
    "--headless",
    "--disable-gpu",
    "--disable-dev-shm-usage",
];

/// Cookies captured from an authenticated browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<(String, String)>,
}

impl CookieJar {
    pub fn new(cookies: Vec<(String, String)>) -> Self {
        Self { cookies }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Value for a `Cookie` request header.
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// The bits of a browser the login needs.
#[allow(async_fn_in_trait)]
pub trait LoginForm {
    async fn open(&mut self, url: &str) -> Result<(), LoginError>;
    async fn type_into(&mut self, element_id: &str, text: &str) -> Result<(), LoginError>;
    /// Presses return inside the element, which submits its form.
    async fn submit(&mut self, element_id: &str) -> Result<(), LoginError>;
    async fn cookies(&mut self) -> Result<CookieJar, LoginError>;
    async fn close(self) -> Result<(), LoginError>;
}

/// Headless Chrome behind a WebDriver server (chromedriver).
pub struct WebDriverForm {
    client: Client,
}

impl WebDriverForm {
    pub async fn connect(webdriver_url: &str) -> Result<Self, LoginError> {
        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": CHROME_ARGS }),
        );
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(webdriver_url)
            .await
            .map_err(|e| LoginError::Session(e.to_string()))?;
        Ok(Self { client })
    }

    async fn find(&self, element_id: &str) -> Result<fantoccini::elements::Element, LoginError> {
        self.client
            .find(Locator::Id(element_id))
            .await
            .map_err(|e| lookup_error(element_id, e))
    }
}

fn lookup_error(element_id: &str, e: CmdError) -> LoginError {
    if e.is_no_such_element() {
        LoginError::ElementNotFound(element_id.to_string())
    } else {
        LoginError::Browser(e.to_string())
    }
}

fn browser_error(e: CmdError) -> LoginError {
    LoginError::Browser(e.to_string())
}

impl LoginForm for WebDriverForm {
    async fn open(&mut self, url: &str) -> Result<(), LoginError> {
        self.client.goto(url).await.map_err(browser_error)
    }

    async fn type_into(&mut self, element_id: &str, text: &str) -> Result<(), LoginError> {
        let element = self.find(element_id).await?;
        element.send_keys(text).await.map_err(browser_error)
    }

    async fn submit(&mut self, element_id: &str) -> Result<(), LoginError> {
        let element = self.find(element_id).await?;
        element
            .send_keys(&char::from(Key::Return).to_string())
            .await
            .map_err(browser_error)
    }

    async fn cookies(&mut self) -> Result<CookieJar, LoginError> {
        let cookies = self.client.get_all_cookies().await.map_err(browser_error)?;
        Ok(CookieJar::new(
            cookies
                .iter()
                .map(|c| (c.name().to_string(), c.value().to_string()))
                .collect(),
        ))
    }

    async fn close(self) -> Result<(), LoginError> {
        self.client.close().await.map_err(browser_error)
    }
}

async fn fill_login_form<F: LoginForm>(
    form: &mut F,
    login_url: &str,
    credentials: &Credentials,
) -> Result<CookieJar, LoginError> {
    form.open(login_url).await?;
    form.type_into(USERNAME_FIELD, &credentials.username).await?;
    form.type_into(PASSWORD_FIELD, &credentials.password).await?;
    form.submit(PASSWORD_FIELD).await?;
    form.cookies().await
}

/// Submits the login form and returns the cookies the browser holds afterwards.
/// Counts `login.success` or `login.failure` exactly once.
pub async fn login<F: LoginForm>(
    form: &mut F,
    login_url: &str,
    credentials: &Credentials,
    metrics: &dyn Metrics,
) -> Result<CookieJar, LoginError> {
    let result = timed(
        metrics,
        "login",
        fill_login_form(form, login_url, credentials),
    )
    .await;
    match &result {
        Ok(jar) => {
            metrics.incr("login.success");
            info!("Logged in as {}, got {} cookies", credentials.username, jar.len());
        }
        Err(e) => {
            metrics.incr("login.failure");
            warn!("Login failed: {e}");
        }
    }
    result
}

/// Logs in and shuts the browser down whatever the outcome.
pub async fn acquire_session<F: LoginForm>(
    mut form: F,
    login_url: &str,
    credentials: &Credentials,
    metrics: &dyn Metrics,
) -> Result<CookieJar, LoginError> {
    let result = login(&mut form, login_url, credentials, metrics).await;
    if let Err(e) = form.close().await {
        warn!("Could not close browser session: {e}");
    }
    result
}

#[cfg(test)]
mod tests {
    use fantoccini::error::{ErrorStatus, WebDriver};

    use super::*;
    use crate::metrics::RecordingMetrics;

    #[derive(Default)]
    struct ScriptedForm {
        missing: Option<&'static str>,
        typed: Vec<(String, String)>,
        submitted: Vec<String>,
    }

    impl LoginForm for ScriptedForm {
        async fn open(&mut self, _url: &str) -> Result<(), LoginError> {
            Ok(())
        }

        async fn type_into(&mut self, element_id: &str, text: &str) -> Result<(), LoginError> {
            if self.missing == Some(element_id) {
                return Err(LoginError::ElementNotFound(element_id.to_string()));
            }
            self.typed.push((element_id.to_string(), text.to_string()));
            Ok(())
        }

        async fn submit(&mut self, element_id: &str) -> Result<(), LoginError> {
            self.submitted.push(element_id.to_string());
            Ok(())
        }

        async fn cookies(&mut self) -> Result<CookieJar, LoginError> {
            Ok(CookieJar::new(vec![(
                "ASP.NET_SessionId".to_string(),
                "abc".to_string(),
            )]))
        }

        async fn close(self) -> Result<(), LoginError> {
            Ok(())
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "user".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn fills_both_fields_then_submits_on_password() {
        let metrics = RecordingMetrics::new();
        let mut form = ScriptedForm::default();
        let jar = login(&mut form, "http://portal/cal", &credentials(), &metrics)
            .await
            .unwrap();

        assert_eq!(jar.header_value(), "ASP.NET_SessionId=abc");
        assert_eq!(
            form.typed,
            vec![
                ("Name".to_string(), "user".to_string()),
                ("Password".to_string(), "hunter2".to_string()),
            ]
        );
        assert_eq!(form.submitted, vec!["Password".to_string()]);
        assert_eq!(metrics.count("login.success"), 1);
        assert_eq!(metrics.timers(), vec!["login.time".to_string()]);
    }

    #[tokio::test]
    async fn missing_field_counts_one_failure() {
        let metrics = RecordingMetrics::new();
        let form = ScriptedForm {
            missing: Some(PASSWORD_FIELD),
            ..Default::default()
        };
        let err = acquire_session(form, "http://portal/cal", &credentials(), &metrics)
            .await
            .unwrap_err();

        assert!(matches!(err, LoginError::ElementNotFound(ref id) if id == "Password"));
        assert_eq!(metrics.count("login.failure"), 1);
        assert_eq!(metrics.count("login.success"), 0);
    }

    #[test]
    fn webdriver_miss_becomes_element_not_found() {
        let miss = CmdError::Standard(WebDriver::new(
            ErrorStatus::NoSuchElement,
            "no such element: Unable to locate element: #Password",
        ));
        assert!(matches!(
            lookup_error(PASSWORD_FIELD, miss),
            LoginError::ElementNotFound(ref id) if id == "Password"
        ));
    }

    #[test]
    fn other_webdriver_errors_stay_browser_errors() {
        let stale = CmdError::Standard(WebDriver::new(
            ErrorStatus::StaleElementReference,
            "stale element reference",
        ));
        assert!(matches!(
            lookup_error(USERNAME_FIELD, stale),
            LoginError::Browser(_)
        ));
    }

    #[test]
    fn cookie_header_joins_pairs() {
        let jar = CookieJar::new(vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
        assert_eq!(jar.header_value(), "a=1; b=2");
    }
}
