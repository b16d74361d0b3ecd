// Yamcs REST archive client
use crate::application::archive_source::{AlarmRecord, ArchiveSource};
use crate::domain::telemetry::{ArchivedSample, EnumerationRange, Window};
use crate::infrastructure::yamcs_mapper::{
    AlarmsResponse, RangesResponse, SamplesResponse, alarm_to_domain, range_to_domain, sample_to_domain,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone)]
pub struct YamcsArchive {
    client: reqwest::Client,
    url: String,
    instance: String,
}

impl YamcsArchive {
    pub fn new(url: String, instance: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            instance,
        }
    }

    /// Qualified names contain '/', which stay path separators; each segment is encoded
    fn encode_name(name: &str) -> String {
        name.trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn window_query(window: Window) -> String {
        format!(
            "start={}&stop={}",
            urlencoding::encode(&window.start.to_rfc3339_opts(SecondsFormat::Millis, true)),
            urlencoding::encode(&window.stop.to_rfc3339_opts(SecondsFormat::Millis, true)),
        )
    }

    fn archive_url(&self, path: &str, query: &str) -> String {
        format!(
            "{}/api/archive/{}/{}?{}",
            self.url,
            urlencoding::encode(&self.instance),
            path,
            query
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("Requesting {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to Yamcs")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Yamcs request failed with status {}: {}", status, body);
        }

        response.json::<T>().await.context("Failed to parse Yamcs response")
    }
}

#[async_trait]
impl ArchiveSource for YamcsArchive {
    async fn fetch_samples(&self, parameter: &str, window: Window, count: usize) -> Result<Vec<ArchivedSample>> {
        let query = format!("{}&count={}", Self::window_query(window), count);
        let path = format!("parameters/{}/samples", Self::encode_name(parameter));
        let url = self.archive_url(&path, &query);
        let response: SamplesResponse = self.get_json(&url).await?;
        Ok(response.sample.into_iter().map(sample_to_domain).collect())
    }

    async fn fetch_enumeration_ranges(
        &self,
        parameter: &str,
        window: Window,
        min_range_ms: i64,
    ) -> Result<Vec<EnumerationRange>> {
        let query = format!("{}&minRange={}", Self::window_query(window), min_range_ms);
        let path = format!("parameters/{}/ranges", Self::encode_name(parameter));
        let url = self.archive_url(&path, &query);
        let response: RangesResponse = self.get_json(&url).await?;
        Ok(response.range.into_iter().map(range_to_domain).collect())
    }

    async fn fetch_alarms(&self, parameter: &str, window: Window) -> Result<Vec<AlarmRecord>> {
        let path = format!("alarms/{}", Self::encode_name(parameter));
        let url = self.archive_url(&path, &Self::window_query(window));
        let response: AlarmsResponse = self.get_json(&url).await?;
        Ok(response.alarms.into_iter().map(alarm_to_domain).collect())
    }
}
