/// Benchmark runner for the sandboxed evaluator and template engine.
///
/// Wall-clock timings over repeated runs; compare against the host
/// runtime's template engines for a rough reference point.
extern crate brackish;

use brackish::runner::api::Sandbox;
use brackish::template::TemplateEngine;
use std::time::{Duration, Instant};

/// Run an evaluation benchmark and return the execution time.
fn run_eval_benchmark(name: &str, code: &str, iterations: u32) -> Duration {
    let sandbox = Sandbox::new();
    let program = sandbox
        .prepare(code)
        .unwrap_or_else(|e| panic!("failed to prepare benchmark {}: {}", name, e));

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = sandbox.eval_ast(&program, None);
    }
    start.elapsed()
}

/// Run a template rendering benchmark and return the execution time.
fn run_template_benchmark(name: &str, template: &str, iterations: u32) -> Duration {
    let engine = TemplateEngine::new();
    let data = serde_json::json!({
        "title": "benchmark",
        "items": [1, 2, 3, 4, 5],
        "active": true,
    });

    let start = Instant::now();
    for _ in 0..iterations {
        engine
            .render_json(template, &data)
            .unwrap_or_else(|e| panic!("failed to render benchmark {}: {}", name, e));
    }
    start.elapsed()
}

fn report(name: &str, iterations: u32, elapsed: Duration) {
    let per_iter = elapsed.as_micros() as f64 / iterations as f64;
    println!(
        "{:<28} {:>8} iters {:>10.1}us/iter {:>8}ms total",
        name,
        iterations,
        per_iter,
        elapsed.as_millis()
    );
}

fn main() {
    println!("brackish benchmarks");
    println!("===================");

    let benchmarks: [(&str, &str, u32); 4] = [
        ("arith-loop", "var n = 0; for (var i = 0; i < 1000; i++) { n += i } n", 200),
        (
            "function-calls",
            "function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2) } fib(12)",
            50,
        ),
        (
            "array-map",
            "[1,2,3,4,5,6,7,8].map(function (x) { return x * x }).join(',')",
            500,
        ),
        ("string-ops", "('abc' + 'def').toUpperCase().indexOf('DE')", 1000),
    ];

    for (name, code, iterations) in benchmarks.iter() {
        let elapsed = run_eval_benchmark(name, code, *iterations);
        report(name, *iterations, elapsed);
    }

    let templates: [(&str, &str, u32); 3] = [
        ("tmpl-text", "Title: { title }, { items.length } items", 1000),
        ("tmpl-raw", "{ items[2] + items[3] }", 1000),
        ("tmpl-shorthand", "{ on: active, off: !active }", 1000),
    ];

    for (name, template, iterations) in templates.iter() {
        let elapsed = run_template_benchmark(name, template, *iterations);
        report(name, *iterations, elapsed);
    }
}
