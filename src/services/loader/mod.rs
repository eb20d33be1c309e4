// Loader service module
// Fetches a day's appointments off the UI context and posts them back

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use chrono_tz::Tz;
use thiserror::Error;

use crate::models::appointment::Appointment;
use crate::services::appointment::AppointmentService;
use crate::services::database::Database;
use crate::utils::date::date_from_julian_day;

/// One day's worth of appointments to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    pub julian_day: i32,
    pub zone: Tz,
    /// Monotonic counter stamped by the requester.
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("julian day {0} is out of range")]
    InvalidDay(i32),
    #[error("appointment query failed: {0}")]
    Query(String),
    #[error("loader is not running")]
    Stopped,
}

#[derive(Debug)]
pub struct LoadResponse {
    pub request: LoadRequest,
    pub result: Result<Vec<Appointment>, LoadError>,
}

/// Channel the loader answers on. The receiving end lives with the grid and
/// is drained on the UI context.
pub type LoadReply = Sender<LoadResponse>;

/// Asynchronous appointment source. `load` must not block; the answer is
/// delivered through `reply` whenever it is ready.
#[cfg_attr(test, mockall::automock)]
pub trait AppointmentLoader {
    fn start(&mut self);
    fn stop(&mut self);
    fn load(&mut self, request: LoadRequest, reply: LoadReply);
}

struct Job {
    request: LoadRequest,
    reply: LoadReply,
}

type Waker = Arc<dyn Fn() + Send + Sync>;

/// Loads from the SQLite appointment store on a dedicated worker thread.
pub struct BackgroundLoader {
    database_path: PathBuf,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    waker: Option<Waker>,
}

impl BackgroundLoader {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            jobs: None,
            worker: None,
            waker: None,
        }
    }

    /// Called on the worker thread after every answered request, typically
    /// to ask the UI for a repaint.
    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }

    pub fn is_running(&self) -> bool {
        self.jobs.is_some()
    }

    fn run_worker(path: PathBuf, jobs: Receiver<Job>, waker: Option<Waker>) {
        let database = match Database::new(&path.to_string_lossy()) {
            Ok(database) => Some(database),
            Err(e) => {
                log::warn!("Loader could not open {}: {:#}", path.display(), e);
                None
            }
        };

        for job in jobs {
            let result = match &database {
                Some(database) => fetch_day(database, &job.request),
                None => Err(LoadError::Query("appointment store unavailable".to_string())),
            };
            if job
                .reply
                .send(LoadResponse {
                    request: job.request,
                    result,
                })
                .is_err()
            {
                log::debug!("Load reply receiver dropped, discarding result");
                continue;
            }
            if let Some(waker) = &waker {
                waker();
            }
        }

        log::info!("Appointment loader thread finished");
    }
}

fn fetch_day(database: &Database, request: &LoadRequest) -> Result<Vec<Appointment>, LoadError> {
    let date =
        date_from_julian_day(request.julian_day).ok_or(LoadError::InvalidDay(request.julian_day))?;
    AppointmentService::new(database.connection())
        .find_by_day(date, &request.zone)
        .map_err(|e| LoadError::Query(format!("{:#}", e)))
}

impl AppointmentLoader for BackgroundLoader {
    fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let (sender, receiver) = mpsc::channel();
        let path = self.database_path.clone();
        let waker = self.waker.clone();
        let spawned = std::thread::Builder::new()
            .name("appointment-loader".to_string())
            .spawn(move || Self::run_worker(path, receiver, waker));

        match spawned {
            Ok(handle) => {
                log::info!("Appointment loader thread started");
                self.jobs = Some(sender);
                self.worker = Some(handle);
            }
            Err(e) => log::warn!("Failed to spawn appointment loader: {}", e),
        }
    }

    fn stop(&mut self) {
        // Dropping the sender ends the worker's receive loop.
        self.jobs = None;
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::warn!("Appointment loader thread panicked");
            }
        }
    }

    fn load(&mut self, request: LoadRequest, reply: LoadReply) {
        let Some(jobs) = &self.jobs else {
            let _ = reply.send(LoadResponse {
                request,
                result: Err(LoadError::Stopped),
            });
            return;
        };

        if let Err(mpsc::SendError(job)) = jobs.send(Job { request, reply }) {
            let _ = job.reply.send(LoadResponse {
                request: job.request,
                result: Err(LoadError::Stopped),
            });
        }
    }
}

impl Drop for BackgroundLoader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Answers synchronously from a shared in-memory list. Clones share the
/// same list, so a host or test can keep one to swap the data.
#[derive(Clone, Default)]
pub struct InMemoryLoader {
    store: Arc<Mutex<Vec<Appointment>>>,
    running: bool,
}

impl InMemoryLoader {
    pub fn new(appointments: Vec<Appointment>) -> Self {
        Self {
            store: Arc::new(Mutex::new(appointments)),
            running: false,
        }
    }

    pub fn set_appointments(&self, appointments: Vec<Appointment>) {
        let mut store = self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *store = appointments;
    }
}

impl AppointmentLoader for InMemoryLoader {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn load(&mut self, request: LoadRequest, reply: LoadReply) {
        let result = if self.running {
            let store = self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Ok(store
                .iter()
                .cloned()
                .map(|mut appointment| {
                    appointment.project_into(&request.zone);
                    appointment
                })
                .filter(|appointment| {
                    appointment.start_day <= request.julian_day
                        && appointment.end_day >= request.julian_day
                })
                .collect())
        } else {
            Err(LoadError::Stopped)
        };

        let _ = reply.send(LoadResponse { request, result });
    }
}
