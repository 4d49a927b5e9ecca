use log::info;
use rivulet::*;
use std::thread;
use std::time::Duration;

fn run(
    label: &str,
    scheduler: SchedulerRef,
    wait: impl FnOnce(Duration) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let period = Duration::from_millis(100);
    let start = scheduler.now();
    let clock = scheduler.clone();
    let label = label.to_string();
    let subscription = interval(period, &scheduler).subscribe_next(move |n| {
        info!("{label} {} tick {n}", (clock.now() - start).pretty());
    });
    wait(period * 3 + period / 2)?;
    subscription.dispose()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // logs immediately, the clock only moves when told to
    let virtual_time = VirtualTimeScheduler::new();
    run("virtual", virtual_time.clone().into_scheduler(), |duration| {
        virtual_time.advance_by(duration)?;
        Ok(())
    })?;

    // logs every 100ms
    let real_time = RealTimeScheduler::new();
    run("real", real_time.into_scheduler(), |duration| {
        thread::sleep(duration);
        Ok(())
    })?;
    Ok(())
}
