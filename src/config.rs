use std::collections::HashSet;

use anyhow::{Context, bail};
use serde::{Deserialize, de::DeserializeOwned};

const DEFAULT_PORTAL_URL: &str = "https://timetable.nulondon.ac.uk";
const DEFAULT_NTFY_URL: &str = "https://ntfy.sh";
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_STATSD_SERVER: &str = "localhost";

// Used when PEOPLE isn't set.
const DEFAULT_PEOPLE: &str = "Lucas:02267113,Tanay:02256085";

/// The env vars needed for a run.
#[derive(Debug, Deserialize)]
pub struct ScraperEnv {
    ntfy_key: String,
    username: String,
    password: String,
    #[serde(default = "default_portal_url")]
    portal_url: String,
    #[serde(default = "default_ntfy_url")]
    ntfy_url: String,
    #[serde(default = "default_webdriver_url")]
    webdriver_url: String,
    #[serde(default)]
    people: Option<String>,
    #[serde(default)]
    ntfy_shared_topic: bool,
}

/// Where the statsd sink lives. Loaded on its own so that config errors can still be counted.
#[derive(Debug, Deserialize)]
pub struct MetricsEnv {
    #[serde(default = "default_statsd_server")]
    pub statsd_server: String,
}

fn default_portal_url() -> String {
    DEFAULT_PORTAL_URL.to_string()
}

fn default_ntfy_url() -> String {
    DEFAULT_NTFY_URL.to_string()
}

fn default_webdriver_url() -> String {
    DEFAULT_WEBDRIVER_URL.to_string()
}

fn default_statsd_server() -> String {
    DEFAULT_STATSD_SERVER.to_string()
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Someone whose timetable gets pushed to their own channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub federation_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    /// `<base>/<secret>-<name>`
    PerPerson,
    /// `<base>/<secret>`
    Shared,
}

#[derive(Debug, Clone)]
pub struct PortalUrls {
    base: String,
}

impl PortalUrls {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn login_page(&self) -> String {
        format!("{}/cal?vt=month", self.base)
    }

    pub fn calendar_data(&self) -> String {
        format!("{}/Home/GetCalendarData", self.base)
    }
}

#[derive(Clone)]
pub struct ScraperConfig {
    pub credentials: Credentials,
    pub ntfy_key: String,
    pub ntfy_url: String,
    pub channel_mode: ChannelMode,
    pub portal: PortalUrls,
    pub webdriver_url: String,
    pub people: Vec<Person>,
}

impl std::fmt::Debug for ScraperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperConfig")
            .field("credentials", &self.credentials)
            .field("ntfy_key", &"<redacted>")
            .field("ntfy_url", &self.ntfy_url)
            .field("channel_mode", &self.channel_mode)
            .field("portal", &self.portal)
            .field("webdriver_url", &self.webdriver_url)
            .field("people", &self.people)
            .finish()
    }
}

impl ScraperConfig {
    pub fn new() -> anyhow::Result<Self> {
        let env = ScraperEnv::load_from_env()?;
        Self::from_env(env)
    }

    fn from_env(env: ScraperEnv) -> anyhow::Result<Self> {
        if env.username.is_empty() || env.password.is_empty() {
            bail!("USERNAME and PASSWORD must not be empty");
        }
        if env.ntfy_key.is_empty() {
            bail!("NTFY_KEY must not be empty");
        }
        let people = parse_people(env.people.as_deref().unwrap_or(DEFAULT_PEOPLE))
            .context("invalid PEOPLE list")?;

        Ok(Self {
            credentials: Credentials {
                username: env.username,
                password: env.password,
            },
            ntfy_key: env.ntfy_key,
            ntfy_url: env.ntfy_url.trim_end_matches('/').to_string(),
            channel_mode: if env.ntfy_shared_topic {
                ChannelMode::Shared
            } else {
                ChannelMode::PerPerson
            },
            portal: PortalUrls::new(&env.portal_url),
            webdriver_url: env.webdriver_url,
            people,
        })
    }
}

/// Parses `Name:fedId,Name:fedId`. Federation ids have to be unique.
pub fn parse_people(raw: &str) -> anyhow::Result<Vec<Person>> {
    let mut seen = HashSet::new();
    let mut people = vec![];
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((name, federation_id)) = item.split_once(':') else {
            bail!("expected `name:federation_id`, got `{}`", item);
        };
        let (name, federation_id) = (name.trim(), federation_id.trim());
        if name.is_empty() || federation_id.is_empty() {
            bail!("empty name or federation id in `{}`", item);
        }
        if !seen.insert(federation_id.to_string()) {
            bail!("duplicate federation id {}", federation_id);
        }
        people.push(Person {
            name: name.to_string(),
            federation_id: federation_id.to_string(),
        });
    }
    if people.is_empty() {
        bail!("no people configured");
    }
    Ok(people)
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}
