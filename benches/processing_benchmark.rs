use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use weather_warehouse::models::{MetricBinding, MetricCatalog};
use weather_warehouse::processors::{bind_metrics, build_fact_rows};
use weather_warehouse::readers::parse_hourly;

const VARIABLES: [&str; 4] = [
    "temperature_2m",
    "precipitation",
    "relative_humidity_2m",
    "wind_speed_10m",
];

// Forecast response with `hours` hourly timestamps
fn create_hourly_body(hours: usize) -> String {
    let start = NaiveDate::from_ymd_opt(2025, 12, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let times: Vec<String> = (0..hours)
        .map(|h| (start + Duration::hours(h as i64)).format("%Y-%m-%dT%H:%M").to_string())
        .collect();

    let mut hourly = serde_json::Map::new();
    hourly.insert("time".to_string(), json!(times));
    for (i, variable) in VARIABLES.iter().enumerate() {
        let values: Vec<Option<f64>> = (0..hours)
            .map(|h| {
                if h % 17 == 0 {
                    None
                } else {
                    Some((h * (i + 1)) as f64 * 0.1)
                }
            })
            .collect();
        hourly.insert(variable.to_string(), json!(values));
    }

    json!({
        "latitude": 27.7,
        "longitude": 85.32,
        "hourly": hourly,
    })
    .to_string()
}

fn benchmark_payload_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload_parsing");

    for hours in [24, 24 * 16, 24 * 92] {
        let body = create_hourly_body(hours);
        group.bench_with_input(BenchmarkId::new("parse_hourly", hours), &body, |b, body| {
            b.iter(|| parse_hourly(black_box(body), &VARIABLES).unwrap());
        });
    }

    group.finish();
}

fn benchmark_fact_pivot(c: &mut Criterion) {
    let mut group = c.benchmark_group("fact_pivot");

    let catalog: MetricCatalog = VARIABLES
        .iter()
        .enumerate()
        .map(|(i, v)| (*v, i as i32 + 1))
        .collect();
    let bindings: Vec<MetricBinding> = VARIABLES
        .iter()
        .map(|v| MetricBinding::new(*v, *v))
        .collect();
    let metrics = bind_metrics(&bindings, &catalog).unwrap();

    for hours in [24, 24 * 16, 24 * 92] {
        let series = parse_hourly(&create_hourly_body(hours), &VARIABLES).unwrap();
        let time_keys: Vec<i32> = (1..=hours as i32).collect();

        group.bench_with_input(
            BenchmarkId::new("build_fact_rows", hours),
            &series,
            |b, series| {
                b.iter(|| build_fact_rows(black_box(series), 1, &time_keys, &metrics));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_payload_parsing, benchmark_fact_pivot);
criterion_main!(benches);
