//! Single-flight refresh coordination.
//!
//! [`RefreshCoordinator::ensure_refreshed_once`] coalesces every concurrent refresh request into
//! one call to [`AuthClient::refresh`]. The outstanding call is represented by a ticket, an
//! `Arc<OnceCell<RefreshResult>>` parked in a single slot: the first caller installs it, later
//! callers clone it, and all of them await the same cell, so the grant or the error they observe
//! is the same `Arc`. The slot is emptied as soon as the refresh settles, success or failure, and
//! also when the refreshing future is dropped or panics, so the next caller starts a new refresh.
//! No retries happen here.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AuthClient, AuthGrant},
	error::SharedError,
	http::HttpTransport,
};

/// Outcome shared by every caller of one refresh.
pub type RefreshResult = Result<Arc<AuthGrant>, SharedError>;

type Ticket = Arc<OnceCell<RefreshResult>>;

/// Ensures at most one refresh is in flight at any time.
pub struct RefreshCoordinator<C>
where
	C: ?Sized + HttpTransport,
{
	auth: AuthClient<C>,
	ticket: Mutex<Option<Ticket>>,
	metrics: Arc<RefreshMetrics>,
}
impl<C> RefreshCoordinator<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a coordinator that refreshes through `auth`.
	pub fn new(auth: AuthClient<C>) -> Self {
		Self { auth, ticket: Mutex::new(None), metrics: Default::default() }
	}

	/// Shared counters for refresh attempts and coalesced callers.
	pub fn metrics(&self) -> &Arc<RefreshMetrics> {
		&self.metrics
	}

	/// Returns `true` while a refresh is outstanding.
	pub fn is_refreshing(&self) -> bool {
		self.ticket.lock().is_some()
	}

	/// Joins the outstanding refresh, or starts one if none is in flight.
	///
	/// Every caller that arrives before the refresh settles receives a clone of the same
	/// [`RefreshResult`]. Dropping the refreshing future releases the slot, and a waiter that is
	/// still polling takes the refresh over; later callers start a fresh one.
	pub async fn ensure_refreshed_once(&self) -> RefreshResult {
		let ticket = self.acquire_ticket();

		ticket.get_or_init(|| self.run(&ticket)).await.clone()
	}

	fn acquire_ticket(&self) -> Ticket {
		let mut slot = self.ticket.lock();

		if let Some(ticket) = slot.as_ref() {
			self.metrics.record_coalesced();

			return ticket.clone();
		}

		let ticket: Ticket = Arc::new(OnceCell::new());

		*slot = Some(ticket.clone());

		ticket
	}

	async fn run(&self, ticket: &Ticket) -> RefreshResult {
		// Released when `run` returns, unwinds, or is dropped; always before the cell is filled.
		let _release = ReleaseOnDrop { coordinator: self, ticket };

		self.metrics.record_attempt();

		match self.auth.refresh().await {
			Ok(grant) => {
				self.metrics.record_success();

				Ok(Arc::new(grant))
			},
			Err(err) => {
				self.metrics.record_failure();

				Err(Arc::new(err))
			},
		}
	}

	fn release(&self, ticket: &Ticket) {
		let mut slot = self.ticket.lock();

		if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, ticket)) {
			*slot = None;
		}
	}
}
impl<C> Debug for RefreshCoordinator<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("refreshing", &self.is_refreshing())
			.field("metrics", &self.metrics)
			.finish()
	}
}

struct ReleaseOnDrop<'a, C>
where
	C: ?Sized + HttpTransport,
{
	coordinator: &'a RefreshCoordinator<C>,
	ticket: &'a Ticket,
}
impl<C> Drop for ReleaseOnDrop<'_, C>
where
	C: ?Sized + HttpTransport,
{
	fn drop(&mut self) {
		self.coordinator.release(self.ticket);
	}
}
