//! Roster records and the single background worker that serves them.
//!
//! Store calls may block, so they never run on the host thread. One worker
//! executes jobs strictly in submission order and reports each result as a
//! [`RecordEvent`].

use std::collections::BTreeMap;
use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info};
use rollcall_core::EntityId;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Student {
    pub id: EntityId,
    pub name: String,
    pub age: u32,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid record: {0}")]
    Invalid(String),

    #[error("record store exhausted its id space")]
    IdsExhausted,

    #[error("record service is closed")]
    Closed,
}

/// The four roster statements: select all by id, insert with a generated id,
/// update by id and delete by id. Update and delete report affected rows.
pub trait RecordStore: Send {
    fn list_all(&self) -> Result<Vec<Student>, StoreError>;
    fn insert(&mut self, name: &str, age: u32) -> Result<EntityId, StoreError>;
    fn update(&mut self, student: &Student) -> Result<usize, StoreError>;
    fn delete(&mut self, id: EntityId) -> Result<usize, StoreError>;
}

/// In-process record store with auto-increment ids starting at 1.
#[derive(Debug)]
pub struct MemoryStore {
    rows: BTreeMap<EntityId, Student>,
    next_id: EntityId,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::Invalid("name must not be empty".to_string()));
    }
    Ok(())
}

impl RecordStore for MemoryStore {
    fn list_all(&self) -> Result<Vec<Student>, StoreError> {
        Ok(self.rows.values().cloned().collect())
    }

    fn insert(&mut self, name: &str, age: u32) -> Result<EntityId, StoreError> {
        check(name)?;
        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(StoreError::IdsExhausted)?;
        self.rows.insert(id, Student { id, name: name.to_string(), age });
        Ok(id)
    }

    fn update(&mut self, student: &Student) -> Result<usize, StoreError> {
        check(&student.name)?;
        match self.rows.get_mut(&student.id) {
            Some(row) => {
                row.name.clone_from(&student.name);
                row.age = student.age;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete(&mut self, id: EntityId) -> Result<usize, StoreError> {
        Ok(usize::from(self.rows.remove(&id).is_some()))
    }
}

#[derive(Debug)]
enum Job {
    Load,
    Insert { name: String, age: u32 },
    Update(Student),
    Delete(EntityId),
}

/// Outcome of one job, delivered to the host in submission order.
#[derive(Debug)]
pub enum RecordEvent {
    Loaded(Vec<Student>),
    Inserted(Student),
    Updated { id: EntityId, rows: usize },
    Deleted { id: EntityId, rows: usize },
    Failed { op: &'static str, error: StoreError },
}

/// Handle on the record worker.
pub struct RecordService {
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl RecordService {
    pub fn start<S>(store: S) -> io::Result<(Self, Receiver<RecordEvent>)>
    where
        S: RecordStore + 'static,
    {
        let (jobs_tx, jobs_rx) = unbounded();
        let (events_tx, events_rx) = unbounded();
        let worker = thread::Builder::new()
            .name("record-worker".to_string())
            .spawn(move || work(store, jobs_rx, events_tx))?;

        let service = Self {
            jobs: Some(jobs_tx),
            worker: Some(worker),
        };
        Ok((service, events_rx))
    }

    pub fn load(&self) -> Result<(), StoreError> {
        self.submit(Job::Load)
    }

    pub fn add(&self, name: &str, age: u32) -> Result<(), StoreError> {
        self.submit(Job::Insert { name: name.to_string(), age })
    }

    pub fn update(&self, student: Student) -> Result<(), StoreError> {
        self.submit(Job::Update(student))
    }

    pub fn delete(&self, id: EntityId) -> Result<(), StoreError> {
        self.submit(Job::Delete(id))
    }

    /// Stops accepting jobs and waits for the worker to finish the queue.
    pub fn close(&mut self) {
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Record worker panicked");
            }
        }
    }

    fn submit(&self, job: Job) -> Result<(), StoreError> {
        let jobs = self.jobs.as_ref().ok_or(StoreError::Closed)?;
        jobs.send(job).map_err(|_| StoreError::Closed)
    }
}

impl Drop for RecordService {
    fn drop(&mut self) {
        self.close();
    }
}

fn work<S: RecordStore>(mut store: S, jobs: Receiver<Job>, events: Sender<RecordEvent>) {
    info!("Record worker started");
    for job in jobs.iter() {
        debug!("Running {:?}", job);
        let event = match job {
            Job::Load => match store.list_all() {
                Ok(list) => RecordEvent::Loaded(list),
                Err(error) => RecordEvent::Failed { op: "load", error },
            },
            Job::Insert { name, age } => match store.insert(&name, age) {
                Ok(id) => RecordEvent::Inserted(Student { id, name, age }),
                Err(error) => RecordEvent::Failed { op: "insert", error },
            },
            Job::Update(student) => match store.update(&student) {
                Ok(rows) => RecordEvent::Updated { id: student.id, rows },
                Err(error) => RecordEvent::Failed { op: "update", error },
            },
            Job::Delete(id) => match store.delete(id) {
                Ok(rows) => RecordEvent::Deleted { id, rows },
                Err(error) => RecordEvent::Failed { op: "delete", error },
            },
        };
        if events.send(event).is_err() {
            break;
        }
    }
    info!("Record worker stopped");
}
