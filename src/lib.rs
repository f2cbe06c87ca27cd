pub mod calendar;
pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod notify;
pub mod requests;
pub mod runner;
pub mod scraping_context;
pub mod session;

pub use config::{Credentials, Person, ScraperConfig};
pub use error::RunError;
pub use metrics::{Metrics, NoopMetrics, RecordingMetrics, StatsdMetrics};
pub use runner::{RunSummary, run};
pub use session::{CookieJar, LoginForm, WebDriverForm};
