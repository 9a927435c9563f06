//! Benchmarks for policy resolution and label merging.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use config_relay::models::Artifact;
use config_relay::policy::{PolicyConfig, PolicyResolver};

/// Build a hierarchy with `accounts` AWS accounts, each with a few regions.
fn hierarchy(accounts: usize) -> PolicyConfig {
    let regions = ["us-east-1", "us-west-2", "eu-west-1", "ap-southeast-2"];
    let scopes: Vec<_> = (0..accounts)
        .map(|i| {
            json!({
                "id": format!("{:012}", i),
                "policy": format!("account-{}", i),
                "labels": {"owner": format!("team-{}", i % 7)},
                "regions": regions
                    .iter()
                    .map(|r| json!({"id": r, "policy": format!("account-{}-{}", i, r)}))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    serde_json::from_value(json!({
        "default_policy": "baseline",
        "labels": {"source": "bench"},
        "aws": {"policy": "aws-cloud", "accounts": scopes}
    }))
    .unwrap()
}

fn artifact(account: usize, region: &str) -> Artifact {
    Artifact::from_value(json!({
        "resource_id": format!("arn:aws:s3:::bucket-{}", account),
        "cloud_provider": "aws",
        "metadata": {"account_id": format!("{:012}", account), "region": region}
    }))
    .unwrap()
}

/// Benchmark resolution at each level of the hierarchy
fn bench_resolve_levels(c: &mut Criterion) {
    let resolver = PolicyResolver::new(&hierarchy(500));
    let mut group = c.benchmark_group("resolve_levels");

    let cases = [
        ("region", artifact(42, "eu-west-1")),
        ("account", artifact(42, "sa-east-1")),
        ("cloud", artifact(100_000, "eu-west-1")),
    ];

    for (name, artifact) in &cases {
        group.bench_with_input(BenchmarkId::new("resolve", name), artifact, |b, artifact| {
            b.iter(|| resolver.resolve(black_box(artifact)).len())
        });
    }

    group.finish();
}

/// Benchmark building the lookup tables for growing hierarchies
fn bench_build_resolver(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_resolver");

    for accounts in [10, 100, 1000] {
        let config = hierarchy(accounts);
        group.bench_with_input(BenchmarkId::from_parameter(accounts), &config, |b, config| {
            b.iter(|| PolicyResolver::new(black_box(config)))
        });
    }

    group.finish();
}

fn bench_labels(c: &mut Criterion) {
    let resolver = PolicyResolver::new(&hierarchy(500));
    let artifact = artifact(42, "us-west-2");

    c.bench_function("labels_for", |b| b.iter(|| resolver.labels_for(black_box(&artifact))));
}

criterion_group!(benches, bench_resolve_levels, bench_build_resolver, bench_labels);
criterion_main!(benches);
