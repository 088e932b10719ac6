use std::sync::Arc;
use std::time::Duration;

use meanstream::capture::FrameDescriptor;
use meanstream::pipeline::WorkerPool;
use meanstream::report::{ConsoleSink, ReportSink};
use meanstream::utils::ManualClock;
use meanstream::Pipeline;

#[test]
fn instant_rate_matches_synthetic_gaps() {
    let clock = ManualClock::new();
    let sink = ConsoleSink::new(Vec::new(), Arc::new(clock.clone()));

    sink.report(1.0);
    clock.advance(Duration::from_millis(100));
    sink.report(1.0);
    clock.advance(Duration::from_millis(50));
    sink.report(1.0);

    let text = String::from_utf8(sink.into_inner()).unwrap();
    let rates: Vec<f64> = text
        .lines()
        .map(|line| {
            line.rsplit("Instant FPS: ")
                .next()
                .unwrap()
                .parse()
                .unwrap()
        })
        .collect();
    assert_eq!(rates, vec![0.0, 10.0, 20.0]);
}

#[test]
fn reports_from_many_threads_are_all_counted() {
    let sink = Arc::new(ConsoleSink::new(Vec::new(), Arc::new(ManualClock::new())));

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let sink = sink.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    sink.report(3.0);
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(sink.frames_reported(), 800);
    let sink = Arc::try_unwrap(sink).ok().unwrap();
    let text = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(text.lines().count(), 800);
    assert!(text.contains("Frame #0800: Avg = 3.00"));
}

#[test]
fn console_sink_renders_pipeline_output() {
    let clock = ManualClock::new();
    let console = Arc::new(ConsoleSink::new(Vec::new(), Arc::new(clock.clone())));
    let pool = Arc::new(WorkerPool::with_threads(1, 1).unwrap());
    let pipeline = Pipeline::builder()
        .sink(console.clone())
        .dispatch(pool.clone())
        .build()
        .unwrap();

    let data = [100u8, 100, 100, 100];
    for _ in 0..3 {
        assert!(pipeline.wait_idle(Duration::from_secs(5)));
        clock.advance(Duration::from_millis(200));
        pipeline.deliver(FrameDescriptor::new(&data, 2, 2)).unwrap();
    }
    assert!(pipeline.wait_idle(Duration::from_secs(5)));
    pool.shutdown();
    drop(pipeline);

    let console = Arc::try_unwrap(console).ok().unwrap();
    let text = String::from_utf8(console.into_inner()).unwrap();
    assert_eq!(
        text.lines().collect::<Vec<_>>(),
        vec![
            "[0.2s] Frame #0001: Avg = 100.00 | Instant FPS: 0.0",
            "[0.4s] Frame #0002: Avg = 100.00 | Instant FPS: 5.0",
            "[0.6s] Frame #0003: Avg = 100.00 | Instant FPS: 5.0",
        ]
    );
}
