use crate::color::Color;
use crate::error::SampleError;
use crate::picker::display::DisplayService;
use crate::picker::geometry::{global_to_local, select_display_for_point};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, sync_channel, RecvTimeoutError, Sender, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Reads the colour under a virtual desktop coordinate.
///
/// Every call re-resolves the display layout. When a capture timeout is set,
/// captures run on a dedicated worker thread and callers give up after the
/// timeout; the late result is discarded and requests queued behind a slow
/// capture are skipped once their caller has given up. Results are never
/// memoized, so a
/// commit always gets a fresh read.
pub struct PixelSampler {
    display: Arc<dyn DisplayService>,
    capture_timeout: Option<Duration>,
    worker: Mutex<Option<CaptureWorker>>,
}

struct CaptureRequest {
    point: (i32, i32),
    reply: SyncSender<Result<Color, SampleError>>,
    /// Set by the caller when it stops waiting.
    abandoned: Arc<AtomicBool>,
}

struct CaptureWorker {
    requests: Sender<CaptureRequest>,
    _thread: JoinHandle<()>,
}

impl CaptureWorker {
    fn spawn(display: Arc<dyn DisplayService>) -> Result<Self, SampleError> {
        let (requests, request_rx) = channel::<CaptureRequest>();
        let thread = thread::Builder::new()
            .name("capture-worker".to_string())
            .spawn(move || {
                while let Ok(request) = request_rx.recv() {
                    if request.abandoned.load(Ordering::Acquire) {
                        tracing::trace!(point = ?request.point, "skipping abandoned capture");
                        continue;
                    }
                    let result = sample_with(display.as_ref(), request.point);
                    // The caller may have timed out and gone away.
                    let _ = request.reply.send(result);
                }
                tracing::debug!("capture worker stopped");
            })
            .map_err(|err| SampleError::CaptureFault(format!("spawn capture worker: {err}")))?;
        Ok(Self {
            requests,
            _thread: thread,
        })
    }
}

impl PixelSampler {
    pub fn new(display: Arc<dyn DisplayService>) -> Self {
        Self {
            display,
            capture_timeout: None,
            worker: Mutex::new(None),
        }
    }

    pub fn with_capture_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.capture_timeout = timeout;
        self
    }

    pub fn capture_timeout(&self) -> Option<Duration> {
        self.capture_timeout
    }

    pub fn display(&self) -> &Arc<dyn DisplayService> {
        &self.display
    }

    /// Blocking; may take as long as one platform capture (bounded by the
    /// capture timeout when one is set).
    pub fn sample_at(&self, x: i32, y: i32) -> Result<Color, SampleError> {
        match self.capture_timeout {
            None => sample_with(self.display.as_ref(), (x, y)),
            Some(timeout) => self.sample_on_worker((x, y), timeout),
        }
    }

    fn sample_on_worker(&self, point: (i32, i32), timeout: Duration) -> Result<Color, SampleError> {
        let (reply, reply_rx) = sync_channel(1);
        let abandoned = Arc::new(AtomicBool::new(false));
        {
            let mut guard = self
                .worker
                .lock()
                .map_err(|_| SampleError::CaptureFault("capture worker lock poisoned".into()))?;
            let mut request = CaptureRequest {
                point,
                reply,
                abandoned: Arc::clone(&abandoned),
            };
            for _ in 0..2 {
                if guard.is_none() {
                    *guard = Some(CaptureWorker::spawn(Arc::clone(&self.display))?);
                }
                let Some(worker) = guard.as_ref() else {
                    break;
                };
                match worker.requests.send(request) {
                    Ok(()) => break,
                    Err(err) => {
                        tracing::warn!("capture worker exited; respawning");
                        request = err.0;
                        *guard = None;
                    }
                }
            }
        }

        match reply_rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                abandoned.store(true, Ordering::Release);
                tracing::warn!(?point, ?timeout, "screen capture timed out");
                Err(SampleError::CaptureFault(format!(
                    "capture timed out after {} ms",
                    timeout.as_millis()
                )))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(SampleError::CaptureFault("capture worker stopped".into()))
            }
        }
    }
}

/// Resolves the display under `point`, translates to display-local
/// coordinates and captures one pixel.
pub fn sample_with(display: &dyn DisplayService, point: (i32, i32)) -> Result<Color, SampleError> {
    let displays = display.displays()?;
    let target = select_display_for_point(&displays, point).ok_or(SampleError::OutOfBounds {
        x: point.0,
        y: point.1,
    })?;
    let local = global_to_local(point, target.geometry.origin());
    display.capture_pixel(&target, local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::display::VirtualDesktop;
    use crate::picker::geometry::ScreenGeometry;
    use std::time::Instant;

    fn two_monitor_desktop() -> Arc<VirtualDesktop> {
        Arc::new(
            VirtualDesktop::new()
                .with_display(
                    ScreenGeometry::new(-1920, 0, 1920, 1080),
                    false,
                    Color::rgb(10, 10, 10),
                )
                .with_display(
                    ScreenGeometry::new(0, 0, 2560, 1440),
                    true,
                    Color::rgb(20, 20, 20),
                ),
        )
    }

    #[test]
    fn samples_the_display_under_the_point() {
        let desktop = two_monitor_desktop();
        desktop.set_pixel((-1, 5), Color::rgb(255, 0, 128));
        let sampler = PixelSampler::new(desktop.clone());

        assert_eq!(sampler.sample_at(-1, 5), Ok(Color::rgb(255, 0, 128)));
        assert_eq!(sampler.sample_at(-1900, 5), Ok(Color::rgb(10, 10, 10)));
        assert_eq!(sampler.sample_at(100, 100), Ok(Color::rgb(20, 20, 20)));
    }

    #[test]
    fn points_outside_every_display_are_out_of_bounds() {
        let desktop = two_monitor_desktop();
        let sampler = PixelSampler::new(desktop.clone());
        for point in [(-1921, 0), (0, 1440), (2560, 0), (-5, 1080), (100, -1)] {
            assert_eq!(
                sampler.sample_at(point.0, point.1),
                Err(SampleError::OutOfBounds {
                    x: point.0,
                    y: point.1
                })
            );
        }
        assert_eq!(desktop.capture_count(), 0);
    }

    #[test]
    fn layout_changes_are_picked_up_between_samples() {
        let desktop = Arc::new(VirtualDesktop::new());
        let sampler = PixelSampler::new(desktop.clone());
        assert!(matches!(
            sampler.sample_at(10, 10),
            Err(SampleError::OutOfBounds { .. })
        ));

        desktop.add_display(ScreenGeometry::new(0, 0, 100, 100), true, Color::rgb(3, 4, 5));
        assert_eq!(sampler.sample_at(10, 10), Ok(Color::rgb(3, 4, 5)));

        desktop.clear_displays();
        assert!(matches!(
            sampler.sample_at(10, 10),
            Err(SampleError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn worker_path_returns_capture_results() {
        let desktop = two_monitor_desktop();
        let sampler =
            PixelSampler::new(desktop.clone()).with_capture_timeout(Some(Duration::from_secs(2)));
        assert_eq!(sampler.sample_at(5, 5), Ok(Color::rgb(20, 20, 20)));
        assert_eq!(sampler.sample_at(-5, 5), Ok(Color::rgb(10, 10, 10)));
    }

    #[test]
    fn hung_capture_times_out_without_blocking_the_caller() {
        let desktop = two_monitor_desktop();
        desktop.set_capture_delay(Some(Duration::from_millis(500)));
        let sampler = PixelSampler::new(desktop.clone())
            .with_capture_timeout(Some(Duration::from_millis(20)));

        let started = Instant::now();
        let result = sampler.sample_at(5, 5);
        assert!(matches!(result, Err(SampleError::CaptureFault(_))));
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn timed_out_requests_do_not_hold_up_later_samples() {
        let desktop = two_monitor_desktop();
        desktop.set_capture_delay(Some(Duration::from_millis(600)));
        let sampler = PixelSampler::new(desktop.clone())
            .with_capture_timeout(Some(Duration::from_millis(100)));
        assert!(matches!(
            sampler.sample_at(5, 5),
            Err(SampleError::CaptureFault(_))
        ));

        // Captures are healthy again, but the first one is still hanging.
        desktop.set_capture_delay(Some(Duration::from_millis(20)));
        let deadline = Instant::now() + Duration::from_secs(3);
        while sampler.sample_at(5, 5).is_err() {
            assert!(Instant::now() < deadline, "sampler never recovered");
        }

        let captures_before = desktop.capture_count();
        for _ in 0..10 {
            assert_eq!(sampler.sample_at(5, 5), Ok(Color::rgb(20, 20, 20)));
        }
        assert_eq!(desktop.capture_count(), captures_before + 10);
    }

    #[test]
    fn abandoned_requests_are_never_captured() {
        let desktop = two_monitor_desktop();
        desktop.set_capture_delay(Some(Duration::from_millis(300)));
        let sampler = PixelSampler::new(desktop.clone())
            .with_capture_timeout(Some(Duration::from_millis(30)));
        for _ in 0..5 {
            assert!(sampler.sample_at(5, 5).is_err());
        }

        desktop.set_capture_delay(None);
        let deadline = Instant::now() + Duration::from_secs(3);
        while sampler.sample_at(5, 5).is_err() {
            assert!(Instant::now() < deadline, "sampler never recovered");
        }
        // The hung capture plus the one that succeeded; the abandoned
        // requests in between were skipped.
        assert!(desktop.capture_count() <= 3, "captured {}", desktop.capture_count());
    }

    #[test]
    fn capture_faults_propagate() {
        let desktop = two_monitor_desktop();
        desktop.set_capture_fault(Some("permission denied"));
        let sampler = PixelSampler::new(desktop.clone());
        assert_eq!(
            sampler.sample_at(5, 5),
            Err(SampleError::CaptureFault("permission denied".into()))
        );
    }
}
