//! Observer registry for auth-state changes.
//!
//! Observers are invoked synchronously, in subscription order, on the task that produced the
//! event. The registry lock is never held while an observer runs, so observers may subscribe or
//! unsubscribe from inside a callback.

// std
use std::sync::{
	Weak,
	atomic::{AtomicU64, Ordering},
};
// self
use crate::{_prelude::*, auth::CredentialKind};

/// Auth-state change published by the broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
	/// A strategy produced a new credential which is now cached.
	Acquired {
		/// Strategy that minted the credential.
		kind: CredentialKind,
		/// Hard expiry of the new credential.
		expires_at: OffsetDateTime,
	},
	/// A strategy failed; the broker moves on to the next one.
	StrategyFailed {
		/// Strategy that failed.
		strategy: CredentialKind,
		/// Human-readable failure summary (never contains secrets).
		reason: String,
	},
	/// The cached credential was dropped ahead of a forced re-acquisition.
	Cleared,
	/// Every configured strategy failed.
	Unavailable,
}

/// Receives [`AuthEvent`]s.
pub trait AuthObserver
where
	Self: Send + Sync,
{
	/// Called once per published event.
	fn on_event(&self, event: &AuthEvent);
}
impl<F> AuthObserver for F
where
	F: Fn(&AuthEvent) + Send + Sync,
{
	fn on_event(&self, event: &AuthEvent) {
		self(event)
	}
}

#[derive(Default)]
struct Registry {
	next_id: AtomicU64,
	observers: RwLock<BTreeMap<u64, Arc<dyn AuthObserver>>>,
}

/// Shared handle to the observer registry.
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct AuthEvents(Arc<Registry>);
impl AuthEvents {
	/// Registers `observer` and returns the handle that keeps it subscribed.
	///
	/// Dropping the [`Subscription`] unsubscribes; call [`Subscription::detach`] to keep the
	/// observer for the lifetime of the registry.
	pub fn subscribe(&self, observer: Arc<dyn AuthObserver>) -> Subscription {
		let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);

		self.0.observers.write().insert(id, observer);

		Subscription { id, registry: Arc::downgrade(&self.0) }
	}

	/// Delivers `event` to every current observer in subscription order.
	pub fn publish(&self, event: &AuthEvent) {
		let observers = self.0.observers.read().values().cloned().collect::<Vec<_>>();

		for observer in observers {
			observer.on_event(event);
		}
	}

	/// Number of live subscriptions.
	pub fn observer_count(&self) -> usize {
		self.0.observers.read().len()
	}
}
impl Debug for AuthEvents {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthEvents").field("observers", &self.observer_count()).finish()
	}
}

/// Unsubscribe handle returned by [`AuthEvents::subscribe`].
#[must_use = "dropping a Subscription unsubscribes the observer immediately"]
#[derive(Debug)]
pub struct Subscription {
	id: u64,
	registry: Weak<Registry>,
}
impl Subscription {
	/// Removes the observer now.
	pub fn unsubscribe(self) {
		drop(self);
	}

	/// Keeps the observer registered until the registry itself is dropped.
	pub fn detach(mut self) {
		self.registry = Weak::new();
	}
}
impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(registry) = self.registry.upgrade() {
			registry.observers.write().remove(&self.id);
		}
	}
}
