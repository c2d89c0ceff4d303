//! Progress reporting for long running simulations.

use std::fmt::Debug;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Emitted after every simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub realization: usize,
    /// Zero based index of the step within the realization.
    pub step: usize,
    pub total: usize,
    pub fit_time: Duration,
    pub interpolation_time: Duration,
}

/// Sink that consumes progress events.
pub trait ProgressSink: Send + Sync + Debug {
    fn emit(&self, event: &ProgressEvent);

    /// Called once a realization has visited every target.
    fn finish(&self, _realization: usize) {}
}

/// Progress sink that forwards events over a channel.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::SyncSender<ProgressEvent>,
}

impl ProgressSink for ChannelSink {
    #[inline]
    fn emit(&self, event: &ProgressEvent) {
        let _ = self.tx.try_send(*event);
    }
}

/// Spawns a listener thread that runs `handler` for each progress event.
///
/// Events are dropped when more than `buffer` are pending.
pub fn channel_sink<F>(
    buffer: usize,
    mut handler: F,
) -> (Arc<dyn ProgressSink>, thread::JoinHandle<()>)
where
    F: FnMut(ProgressEvent) + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<ProgressEvent>(buffer.max(1));
    let sink: Arc<dyn ProgressSink> = Arc::new(ChannelSink { tx });

    let handle = thread::spawn(move || {
        while let Ok(event) = rx.recv() {
            handler(event);
        }
    });

    (sink, handle)
}

/// One terminal progress bar per realization.
///
/// Bars are created up front so concurrent realizations only touch their own bar. A bar
/// takes its length from the first event of its realization.
#[derive(Debug)]
pub struct IndicatifProgress {
    // kept alive so the bars stay attached to the draw target
    _multi: MultiProgress,
    bars: Vec<ProgressBar>,
}

impl IndicatifProgress {
    /// Bars for realizations `0..realizations` drawn to stderr.
    pub fn new(realizations: usize) -> Self {
        Self::with_target(realizations, ProgressDrawTarget::stderr())
    }

    /// Bars that track state without drawing.
    pub fn hidden(realizations: usize) -> Self {
        Self::with_target(realizations, ProgressDrawTarget::hidden())
    }

    fn with_target(realizations: usize, target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let bars = (0..realizations)
            .map(|r| {
                let bar = multi.add(ProgressBar::new(0));
                bar.set_style(Self::style());
                bar.set_prefix(r.to_string());
                bar
            })
            .collect();

        Self {
            _multi: multi,
            bars,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "realization {prefix:>3} [{elapsed_precise}] {bar:40} {pos}/{len} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
    }

    /// Position of the bar for `realization`, `None` if there is no such bar.
    pub fn position(&self, realization: usize) -> Option<u64> {
        self.bars.get(realization).map(|bar| bar.position())
    }
}

impl ProgressSink for IndicatifProgress {
    fn emit(&self, event: &ProgressEvent) {
        let Some(bar) = self.bars.get(event.realization) else {
            return;
        };
        let total = event.total as u64;
        if bar.length() != Some(total) {
            bar.set_length(total);
        }
        bar.set_position(event.step as u64 + 1);
    }

    fn finish(&self, realization: usize) {
        if let Some(bar) = self.bars.get(realization) {
            bar.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(realization: usize, step: usize) -> ProgressEvent {
        ProgressEvent {
            realization,
            step,
            total: 10,
            fit_time: Duration::ZERO,
            interpolation_time: Duration::ZERO,
        }
    }

    #[test]
    fn indicatif_tracks_each_realization() {
        let progress = IndicatifProgress::hidden(2);
        progress.emit(&event(0, 0));
        progress.emit(&event(1, 4));
        progress.emit(&event(0, 2));

        assert_eq!(progress.position(0), Some(3));
        assert_eq!(progress.position(1), Some(5));
        assert_eq!(progress.position(2), None);

        //finishing fills the bar to its length
        progress.finish(0);
        assert_eq!(progress.position(0), Some(10));
        assert_eq!(progress.position(1), Some(5));
    }

    #[test]
    fn indicatif_ignores_unknown_realizations() {
        let progress = IndicatifProgress::hidden(1);
        progress.emit(&event(3, 1));
        progress.finish(3);
        assert_eq!(progress.position(0), Some(0));
        assert_eq!(progress.position(3), None);
    }

    #[test]
    fn indicatif_bars_advance_concurrently() {
        let progress = Arc::new(IndicatifProgress::hidden(4));
        let handles = (0..4)
            .map(|r| {
                let progress = progress.clone();
                thread::spawn(move || {
                    for step in 0..10 {
                        progress.emit(&event(r, step));
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!((0..4).all(|r| progress.position(r) == Some(10)));
    }

    #[test]
    fn channel_forwards_events() {
        let (tx, rx) = mpsc::channel();
        let (sink, handle) = channel_sink(16, move |e| {
            let _ = tx.send(e.step);
        });

        for step in 0..3 {
            sink.emit(&event(0, step));
        }
        drop(sink);
        handle.join().unwrap();

        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }
}
