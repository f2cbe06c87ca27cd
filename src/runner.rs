use chrono::NaiveDate;
use log::{info, warn};

use crate::{
    calendar::{CalendarData, fetch_calendar_data},
    config::{Person, ScraperConfig},
    error::{ExtractError, RunError},
    metrics::{Metrics, timed},
    notify::{channel_url, send_notifications},
    scraping_context::ScrapingContext,
    session::{LoginForm, acquire_session},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub people_processed: usize,
    pub notifications_sent: usize,
    pub notification_failures: usize,
    pub fetch_failures: usize,
    pub invalid_responses: usize,
}

async fn process_person(
    ctx: &ScrapingContext<'_>,
    person: &Person,
    date: NaiveDate,
    metrics: &dyn Metrics,
    summary: &mut RunSummary,
) -> Result<(), RunError> {
    let config = ctx.config;
    let data = fetch_calendar_data(
        &ctx.request_client,
        &config.portal.calendar_data(),
        &person.federation_id,
        date,
        metrics,
    )
    .await;

    let entries = match data {
        Ok(CalendarData::Entries(entries)) => entries,
        Ok(CalendarData::InvalidJson) => {
            summary.invalid_responses += 1;
            return Ok(());
        }
        Ok(CalendarData::NotAList) => {
            return Err(RunError::Extract {
                person: person.name.clone(),
                source: ExtractError::NotAList,
            });
        }
        Err(e) => {
            warn!("Skipping {}: {e}", person.name);
            summary.fetch_failures += 1;
            return Ok(());
        }
    };
    if entries.is_empty() {
        info!("No classes today for {}", person.name);
        return Ok(());
    }

    let classes = timed(metrics, "extract_class_and_rooms", async {
        ctx.extractor.extract_class_and_rooms(&entries)
    })
    .await
    .map_err(|source| RunError::Extract {
        person: person.name.clone(),
        source,
    })?;

    let channel = channel_url(
        &config.ntfy_url,
        &config.ntfy_key,
        &person.name,
        config.channel_mode,
    );
    let report = send_notifications(&ctx.request_client, &classes, &channel, metrics).await;
    summary.notifications_sent += report.sent;
    summary.notification_failures += report.failed;
    Ok(())
}

/// Logs in once, then fetches, extracts and notifies for each person in turn.
///
/// Fetch and delivery failures only affect the person they happened for. A failed login, a
/// calendar response that isn't a list or an entry without a description ends the run.
pub async fn run<F: LoginForm>(
    config: &ScraperConfig,
    form: F,
    date: NaiveDate,
    metrics: &dyn Metrics,
) -> Result<RunSummary, RunError> {
    let cookies = acquire_session(
        form,
        &config.portal.login_page(),
        &config.credentials,
        metrics,
    )
    .await?;
    let ctx = ScrapingContext::new(config, &cookies)?;

    let mut summary = RunSummary::default();
    for person in &config.people {
        info!("Checking timetable for {}", person.name);
        process_person(&ctx, person, date, metrics, &mut summary).await?;
        summary.people_processed += 1;
    }
    Ok(summary)
}
