//! `tuyashadow watch`: run the poller and print every published cycle.

use std::time::Duration;

use tracing::{debug, info};

use tuyashadow_core::{Poller, Snapshot};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output::{self, CycleReport, SensorReading};

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = super::poller_config(global)?;
    if let Some(secs) = args.interval {
        config.poll_interval = Duration::from_secs(secs);
    }

    let poller = Poller::new(config)?;
    let mut published = poller.subscribe_published();
    let color = output::should_color(&global.color);

    poller.start().await;
    let mut printed = 0_u64;

    loop {
        let cycle = *published.borrow_and_update();
        debug!(cycle, "printing cycle");
        print_cycle(&poller, &poller.snapshot(), global, color);
        printed += 1;
        if args.count.is_some_and(|n| printed >= n) {
            break;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            changed = published.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    poller.stop().await;
    Ok(())
}

fn print_cycle(poller: &Poller, snapshot: &Snapshot, global: &GlobalOpts, color: bool) {
    let readings: Vec<SensorReading> = poller
        .sensors()
        .into_iter()
        .map(|sensor| SensorReading::new(sensor, snapshot))
        .collect();
    let report = CycleReport {
        cycle: snapshot.cycle,
        completed_at: snapshot.completed_at,
        readings: &readings,
        failures: &snapshot.failures,
    };

    output::print_output(&output::render_cycle(&global.output, &report), global.quiet);
    output::print_failures(snapshot, color);
}
