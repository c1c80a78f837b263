use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use readability_arena::{is_probably_readerable, Readability, ReadabilityOptions};

const PARAGRAPH: &str = "The council met on Tuesday to discuss the new budget, which includes \
    funding for parks, libraries and road repairs across the city. Residents spoke for hours.";

/// A news-like page: navigation, sidebar, comments and `paragraphs` of prose.
fn synthetic_page(paragraphs: usize) -> String {
    let nav: String = (0..20)
        .map(|i| format!(r#"<li><a href="/section/{i}">Section {i}</a></li>"#))
        .collect();
    let body: String = (0..paragraphs)
        .map(|i| {
            if i % 7 == 3 {
                format!(r#"<figure><img data-src="/img/{i}.jpg"><figcaption>Photo {i}</figcaption></figure>"#)
            } else {
                format!("<p>{PARAGRAPH}</p>")
            }
        })
        .collect();
    let comments: String = (0..paragraphs / 4)
        .map(|i| format!(r#"<div class="comment"><a href="/u/{i}">user{i}</a> Great read.</div>"#))
        .collect();

    format!(
        r#"<html><head><title>Budget approved | City News</title>
        <meta property="og:site_name" content="City News"></head>
        <body><header class="masthead"><ul class="menu">{nav}</ul></header>
        <div id="main"><article class="post"><h1>Budget approved</h1>
        <p class="byline">By Sam Reporter</p>{body}</article>
        <aside class="sidebar"><ul>{nav}</ul></aside></div>
        <section class="comments">{comments}</section>
        <footer>Copyright</footer></body></html>"#
    )
}

fn bench_parse_by_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for (name, paragraphs) in [("small", 8), ("medium", 60), ("large", 400)] {
        let html = synthetic_page(paragraphs);
        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(BenchmarkId::new("doc", name), &html, |b, html| {
            b.iter(|| {
                let readability =
                    Readability::new(std::hint::black_box(html), None, None).unwrap();
                std::hint::black_box(readability.parse())
            });
        });
    }

    group.finish();
}

fn bench_retries(c: &mut Criterion) {
    // Unreachable threshold: every relaxation step runs.
    let html = synthetic_page(60);
    let options = ReadabilityOptions::builder().char_threshold(1_000_000).build();

    let mut group = c.benchmark_group("retries");
    group.throughput(Throughput::Bytes(html.len() as u64));
    group.bench_function("all_attempts", |b| {
        b.iter(|| {
            let readability =
                Readability::new(std::hint::black_box(&html), None, Some(options.clone()))
                    .unwrap();
            std::hint::black_box(readability.parse())
        });
    });
    group.finish();
}

fn bench_readerable_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("readerable");

    for (name, paragraphs) in [("small", 8), ("large", 400)] {
        let html = synthetic_page(paragraphs);
        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(BenchmarkId::new("check", name), &html, |b, html| {
            b.iter(|| {
                std::hint::black_box(is_probably_readerable(std::hint::black_box(html), None))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_by_size,
    bench_retries,
    bench_readerable_check
);
criterion_main!(benches);
