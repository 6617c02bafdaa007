//! Contact session service.
//!
//! # Responsibility
//! - Dispatch insert/update/delete onto a background worker context.
//! - Hand hosts the live ordered contact list unchanged.
//!
//! # Invariants
//! - Dispatch never blocks the caller; writes run on one blocking worker.
//! - Writes apply in dispatch order (single FIFO queue per session).
//! - A service only exists after the contacts permission was granted.
//! - Dropping a `PendingWrite` detaches the write; it still runs to completion.

use crate::model::contact::{Contact, ContactId};
use crate::repo::contact_repo::ContactRepository;
use crate::service::permission::{ensure_granted, Permission, PermissionGate};
use crate::store::{ContactStore, ContactsSubscription, StoreError, StoreResult, WriteOutcome};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for contact sessions.
#[derive(Debug)]
pub enum ServiceError {
    /// User declined the permission; the session must end.
    PermissionDenied(Permission),
    /// Storage engine failure reported by a dispatched write.
    Store(StoreError),
    /// The write worker stopped before replying (panic or shutdown).
    Worker(String),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied(permission) => {
                write!(f, "permission denied: {}", permission.as_str())
            }
            Self::Store(err) => write!(f, "{err}"),
            Self::Worker(message) => write!(f, "contact worker failed: {message}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Handle to a dispatched write.
///
/// Await `outcome` to observe the result, or drop it for fire-and-forget.
#[derive(Debug)]
pub struct PendingWrite {
    op: &'static str,
    contact_id: ContactId,
    reply: oneshot::Receiver<StoreResult<WriteOutcome>>,
}

impl PendingWrite {
    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn contact_id(&self) -> ContactId {
        self.contact_id
    }

    /// Waits for the write to finish.
    pub async fn outcome(self) -> ServiceResult<WriteOutcome> {
        match self.reply.await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(_) => Err(ServiceError::Worker(
                "write worker stopped before replying".to_string(),
            )),
        }
    }

    /// Lets the write finish in the background without observing it.
    pub fn detach(self) {}
}

type WriteJob<S> = Box<dyn FnOnce(&ContactRepository<S>) + Send + 'static>;

/// Dispatcher between a presentation host and the repository.
pub struct ContactService<S: ContactStore + 'static> {
    repo: ContactRepository<S>,
    queue: mpsc::UnboundedSender<WriteJob<S>>,
    worker: JoinHandle<()>,
}

impl<S: ContactStore + 'static> ContactService<S> {
    /// Activates a session once `Permission::ReadContacts` is granted.
    ///
    /// The gate is prompted at most once. On success one blocking worker is
    /// started on `worker`; it lives until `shutdown` or until the service is
    /// dropped and its queue drained.
    ///
    /// # Errors
    /// - `ServiceError::PermissionDenied` when the user declines.
    pub fn activate<G: PermissionGate + ?Sized>(
        repo: ContactRepository<S>,
        worker: Handle,
        gate: &mut G,
    ) -> ServiceResult<Self> {
        if !ensure_granted(gate, Permission::ReadContacts) {
            return Err(ServiceError::PermissionDenied(Permission::ReadContacts));
        }

        let (queue, mut jobs) = mpsc::unbounded_channel::<WriteJob<S>>();
        let worker_repo = repo.clone();
        let worker = worker.spawn_blocking(move || {
            while let Some(job) = jobs.blocking_recv() {
                job(&worker_repo);
            }
            debug!("event=write_worker module=service status=stopped");
        });
        debug!("event=session_activate module=service status=ok");

        Ok(Self {
            repo,
            queue,
            worker,
        })
    }

    pub fn insert(&self, contact: Contact) -> PendingWrite {
        self.dispatch("insert", contact.id, move |repo| repo.insert(&contact))
    }

    pub fn update(&self, contact: Contact) -> PendingWrite {
        self.dispatch("update", contact.id, move |repo| repo.update(&contact))
    }

    pub fn delete(&self, contact: Contact) -> PendingWrite {
        self.dispatch("delete", contact.id, move |repo| repo.delete(&contact))
    }

    pub fn delete_by_id(&self, id: ContactId) -> PendingWrite {
        self.dispatch("delete", id, move |repo| repo.delete_by_id(id))
    }

    /// Live ordered contact list, exposed unchanged from the repository.
    pub fn all_contacts(&self) -> ContactsSubscription {
        self.repo.all_contacts()
    }

    /// Closes the write queue and waits until every queued write has run.
    pub async fn shutdown(self) -> ServiceResult<()> {
        let Self { queue, worker, .. } = self;
        drop(queue);
        worker
            .await
            .map_err(|err| ServiceError::Worker(err.to_string()))?;
        debug!("event=session_shutdown module=service status=ok");
        Ok(())
    }

    fn dispatch(
        &self,
        op: &'static str,
        contact_id: ContactId,
        write: impl FnOnce(&ContactRepository<S>) -> StoreResult<WriteOutcome> + Send + 'static,
    ) -> PendingWrite {
        let (reply_tx, reply) = oneshot::channel();
        let job: WriteJob<S> = Box::new(move |repo: &ContactRepository<S>| {
            let result = write(repo);
            if let Err(err) = &result {
                warn!(
                    "event=contact_dispatch module=service op={op} status=error contact_id={contact_id} error={err}"
                );
            }
            // A dropped receiver means the caller detached.
            let _ = reply_tx.send(result);
        });

        if self.queue.send(job).is_err() {
            // The rejected job drops its reply sender, so `outcome` reports it.
            warn!(
                "event=contact_dispatch module=service op={op} status=error contact_id={contact_id} error=worker_stopped"
            );
        } else {
            debug!("event=contact_dispatch module=service op={op} status=queued contact_id={contact_id}");
        }

        PendingWrite {
            op,
            contact_id,
            reply,
        }
    }
}
