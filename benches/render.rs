use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use prompt_engine::logging::{LogEvent, LogSink};
use prompt_engine::{
    FactSnapshot, Fragment, GitStatus, LayoutEngine, Logger, LoggingResult, MarkupDialect,
    PromptConfig, RenderPipeline, VcsState,
};

#[derive(Clone, Default)]
struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _event: &LogEvent) -> LoggingResult<()> {
        Ok(())
    }
}

fn snapshot(width: u16) -> FactSnapshot {
    FactSnapshot::builder()
        .exit_code(1)
        .duration_ms(4_200)
        .job_count(2)
        .term_width(width)
        .cwd("/home/dev/src/prompt/crates/engine")
        .home("/home/dev")
        .vcs(VcsState::Git(
            GitStatus::on_branch("feature/layout")
                .with_dirty(true)
                .with_counts(3, 1)
                .with_divergence(2, 0),
        ))
        .build()
        .expect("snapshot")
}

fn pipeline(parallel: bool, dialect: MarkupDialect) -> Arc<RenderPipeline> {
    let config = PromptConfig {
        parallel,
        dialect,
        right: vec!["duration".to_string(), "jobs".to_string()],
        ..PromptConfig::default()
    };
    Arc::new(
        RenderPipeline::builder(config)
            .logger(Logger::new(NullSink))
            .build(),
    )
}

fn render_sequential(c: &mut Criterion) {
    let pipeline = pipeline(false, MarkupDialect::Ansi);
    let facts = snapshot(120);
    c.bench_function("render_sequential_ansi", |b| {
        b.iter(|| pipeline.render(black_box(&facts)).expect("render"));
    });
}

fn render_parallel(c: &mut Criterion) {
    let pipeline = pipeline(true, MarkupDialect::Xonsh);
    let facts = snapshot(120);
    c.bench_function("render_parallel_xonsh", |b| {
        b.iter(|| pipeline.render(black_box(&facts)).expect("render"));
    });
}

fn layout_pressure(c: &mut Criterion) {
    let engine = LayoutEngine::new(" ");
    let fragments: Vec<Fragment> = (0..32)
        .map(|idx| Fragment::new("x".repeat(idx % 9 + 1)).with_priority((idx * 13 % 7) as i32))
        .collect();
    c.bench_function("layout_drop_to_fit", |b| {
        b.iter(|| engine.compose(black_box(fragments.clone()), black_box(40)));
    });
}

criterion_group!(benches, render_sequential, render_parallel, layout_pressure);
criterion_main!(benches);
