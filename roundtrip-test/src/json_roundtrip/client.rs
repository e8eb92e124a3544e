use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use roundtrip_client::{
    Client, LoggingInterceptor, MetricStatus, MetricsInterceptor, MetricsSink, RequestMetric,
    set_default_client,
};
use serde::{Deserialize, Serialize};

use crate::report::CaseResult;

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: u32,
    name: String,
}

#[derive(Serialize)]
struct NewItem<'a> {
    name: &'a str,
}

#[derive(Default)]
struct CollectingSink {
    statuses: Mutex<Vec<MetricStatus>>,
    count: AtomicUsize,
}

impl MetricsSink for CollectingSink {
    fn record(&self, metric: &RequestMetric) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(metric.status);
    }
}

async fn crud_cycle(client: &Client) -> anyhow::Result<()> {
    let created: Item = client.post_json("/items", &NewItem { name: "bolt" }).await?;
    if created.name != "bolt" {
        anyhow::bail!("unexpected created item {created:?}");
    }
    let path = format!("/items/{}", created.id);

    let fetched: Item = client.get_json(&path).await?;
    if fetched != created {
        anyhow::bail!("fetched {fetched:?}, created {created:?}");
    }

    let updated: Item = client.put_json(&path, &NewItem { name: "nut" }).await?;
    if updated.name != "nut" || updated.id != created.id {
        anyhow::bail!("unexpected updated item {updated:?}");
    }

    let listed: Vec<Item> = client.get_json("/items").await?;
    if !listed.contains(&updated) {
        anyhow::bail!("updated item missing from list {listed:?}");
    }

    client.delete_json::<()>(&path).await?;
    Ok(())
}

async fn missing_item_is_status_error(client: &Client) -> anyhow::Result<()> {
    let err = client
        .get_json::<Item>("/items/999")
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected an error"))?;
    if err.to_string() != "http 404: item 999 not found" {
        anyhow::bail!("unexpected error: {err}");
    }
    Ok(())
}

async fn query_parameters(client: &Client) -> anyhow::Result<()> {
    let pairs: Vec<(String, String)> = client
        .get("/search")
        .query("q", "hex bolt")
        .query("tag", "m8")
        .query("tag", "steel")
        .send()
        .await
        .json()
        .await?;
    let expected = [("q", "hex bolt"), ("tag", "m8"), ("tag", "steel")];
    let matches = pairs.len() == expected.len()
        && pairs
            .iter()
            .zip(expected)
            .all(|((k, v), (ek, ev))| k == ek && v == ev);
    if !matches {
        anyhow::bail!("unexpected query echo {pairs:?}");
    }
    Ok(())
}

async fn metrics_record_each_call(base: &str) -> anyhow::Result<()> {
    let sink = Arc::new(CollectingSink::default());
    let client = Client::builder()
        .base_url(base)
        .interceptor(MetricsInterceptor::new("items").with_sink(sink.clone()))
        .build()?;

    let _: Vec<Item> = client.get_json("/items").await?;
    let _ = client.get_json::<Item>("/items/999").await;

    let statuses = sink.statuses.lock().unwrap_or_else(|e| e.into_inner()).clone();
    if statuses != [MetricStatus::Code(200), MetricStatus::Code(404)] {
        anyhow::bail!("unexpected recorded statuses {statuses:?}");
    }
    if sink.count.load(Ordering::SeqCst) != 2 {
        anyhow::bail!("expected two metrics");
    }
    Ok(())
}

async fn default_client_helpers(base: &str) -> anyhow::Result<()> {
    set_default_client(Client::builder().base_url(base).build()?);

    let created: Item =
        roundtrip_client::post_json("/items", &NewItem { name: "washer" }).await?;
    let fetched: Item = roundtrip_client::get_json(&format!("/items/{}", created.id)).await?;
    if fetched != created {
        anyhow::bail!("fetched {fetched:?}, created {created:?}");
    }
    Ok(())
}

pub async fn run_json_tests(base: &str) -> Vec<CaseResult> {
    let client = match Client::builder()
        .base_url(base)
        .interceptor(LoggingInterceptor::new())
        .build()
    {
        Ok(client) => client,
        Err(e) => return vec![CaseResult::new("build client", Err(e.into()))],
    };

    vec![
        CaseResult::new("create, read, update, delete", crud_cycle(&client).await),
        CaseResult::new(
            "missing item is a status error with body",
            missing_item_is_status_error(&client).await,
        ),
        CaseResult::new("query parameters", query_parameters(&client).await),
        CaseResult::new(
            "metrics record each call",
            metrics_record_each_call(base).await,
        ),
        CaseResult::new(
            "default client helpers",
            default_client_helpers(base).await,
        ),
    ]
}
