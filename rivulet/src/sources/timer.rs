use derive_new::new;
use std::time::Duration;

use crate::observer::Sink;
use crate::scheduler::{SchedulerOperators, SchedulerRef};
use crate::types::*;

#[derive(new)]
pub(crate) struct TimerObservable {
    delay: Duration,
    scheduler: SchedulerRef,
}

impl Observable<u64> for TimerObservable {
    fn subscribe_sink(&self, sink: Sink<u64>) -> Disposable {
        self.scheduler.schedule_after(self.delay, move || {
            sink.next(0);
            sink.completed();
        })
    }
}

#[derive(new)]
pub(crate) struct IntervalObservable {
    period: Duration,
    scheduler: SchedulerRef,
}

impl Observable<u64> for IntervalObservable {
    fn subscribe_sink(&self, sink: Sink<u64>) -> Disposable {
        let mut count = 0;
        self.scheduler.schedule_recurring(self.period, move || {
            sink.next(count);
            count += 1;
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::scheduler::*;
    use crate::sources::*;
    use crate::testing::Recorder;
    use crate::types::*;

    #[test]
    fn interval_counts_whole_periods() {
        let _ = env_logger::try_init();
        let scheduler = VirtualTimeScheduler::new();
        let recorder = Recorder::new();
        interval(Duration::from_nanos(100), &scheduler).subscribe(recorder.clone());
        for (time, expected) in [(90u64, 0), (111, 1), (222, 2), (2021, 20)] {
            scheduler.advance_to(time).unwrap();
            assert_eq!(recorder.len(), expected, "at {time}");
        }
        let expected: Vec<u64> = (0..20).collect();
        assert_eq!(recorder.values(), expected);
        assert!(!recorder.is_completed());
    }

    #[test]
    fn interval_stops_when_disposed() {
        let scheduler = VirtualTimeScheduler::new();
        let recorder = Recorder::with_scheduler(&scheduler);
        let subscription = interval(Duration::from_nanos(10), &scheduler).subscribe(recorder.clone());
        scheduler.advance_to(35u64).unwrap();
        subscription.dispose().unwrap();
        let delivered = recorder.len();
        scheduler.advance_by(Duration::from_nanos(1_000)).unwrap();
        assert_eq!(recorder.len(), delivered);
        assert_eq!(scheduler.pending(), 0);
        let times: Vec<NanoTime> = recorder.records().iter().map(|r| r.time).collect();
        assert_eq!(times, vec![NanoTime::new(10), NanoTime::new(20), NanoTime::new(30)]);
    }

    #[test]
    fn interval_counter_is_per_subscription() {
        let scheduler = VirtualTimeScheduler::new();
        let source = interval(Duration::from_nanos(10), &scheduler);
        let first = Recorder::new();
        source.subscribe(first.clone());
        scheduler.advance_to(25u64).unwrap();
        let second = Recorder::new();
        source.subscribe(second.clone());
        scheduler.advance_to(45u64).unwrap();
        assert_eq!(first.values(), vec![0, 1, 2, 3]);
        assert_eq!(second.values(), vec![0, 1]);
    }

    #[test]
    fn timer_emits_once_then_completes() {
        let scheduler = VirtualTimeScheduler::new();
        let recorder = Recorder::with_scheduler(&scheduler);
        let subscription = timer(Duration::from_nanos(50), &scheduler).subscribe(recorder.clone());
        scheduler.advance_to(49u64).unwrap();
        assert!(recorder.is_empty());
        scheduler.advance_to(50u64).unwrap();
        assert_eq!(
            recorder.notifications(),
            vec![Notification::Next(0), Notification::Completed]
        );
        assert_eq!(recorder.records()[0].time, NanoTime::new(50));
        subscription.dispose().unwrap();
        scheduler.advance_by(Duration::from_nanos(100)).unwrap();
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn timer_disposed_before_due_never_emits() {
        let scheduler = VirtualTimeScheduler::new();
        let recorder = Recorder::<u64>::new();
        let subscription = timer(Duration::from_nanos(50), &scheduler).subscribe(recorder.clone());
        scheduler.advance_to(49u64).unwrap();
        subscription.dispose().unwrap();
        scheduler.advance_to(500u64).unwrap();
        assert!(recorder.is_empty());
    }

    #[test]
    fn timer_on_real_time_scheduler() {
        let scheduler = RealTimeScheduler::new();
        let recorder = Recorder::<u64>::new();
        timer(Duration::from_millis(5), &scheduler).subscribe(recorder.clone());
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !recorder.is_completed() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(recorder.values(), vec![0]);
        assert!(recorder.is_completed());
    }
}
