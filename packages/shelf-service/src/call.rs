use std::{
	future::Future,
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};

use tokio::{
	sync::Mutex,
	time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use shelf_storage::{BoxFuture, Collection, SearchEngine};

use crate::{Error, Result};

/// Cancellation and deadline for one service call.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
	pub cancel: CancellationToken,
	pub deadline: Option<Instant>,
}
impl CallOptions {
	pub fn with_timeout(timeout: Duration) -> Self {
		Self { cancel: CancellationToken::new(), deadline: Some(Instant::now() + timeout) }
	}

	pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;

		self
	}

	/// Runs `fut` until it completes, the token fires, or the deadline passes. The future is
	/// dropped in the latter two cases, so no partial output escapes.
	pub async fn guard<F>(&self, fut: F) -> Result<F::Output>
	where
		F: Future,
	{
		let deadline = async {
			match self.deadline {
				Some(deadline) => time::sleep_until(deadline).await,
				None => std::future::pending::<()>().await,
			}
		};

		tokio::select! {
			biased;
			_ = self.cancel.cancelled() => Err(Error::Cancelled),
			_ = deadline => Err(Error::DeadlineExceeded),
			output = fut => Ok(output),
		}
	}
}

/// Serializes schema provisioning per collection.
///
/// Each collection carries an epoch that advances on every successful provisioning. A caller
/// that saw a missing schema provisions only if the epoch is still the one it read before its
/// call; otherwise a concurrent caller already did it and the caller only retries.
#[derive(Debug, Default)]
pub struct SchemaGate {
	item: GateSlot,
	container: GateSlot,
}
impl SchemaGate {
	pub fn epoch(&self, collection: Collection) -> u64 {
		self.slot(collection).epoch.load(Ordering::Acquire)
	}

	async fn provision(
		&self,
		engine: &dyn SearchEngine,
		collection: Collection,
		seen: u64,
	) -> shelf_storage::Result<()> {
		let slot = self.slot(collection);
		let _guard = slot.lock.lock().await;

		if slot.epoch.load(Ordering::Acquire) != seen {
			tracing::debug!(collection = %collection, "Collection was provisioned concurrently.");

			return Ok(());
		}

		engine.ensure_schema(collection).await?;
		slot.epoch.fetch_add(1, Ordering::AcqRel);

		Ok(())
	}

	fn slot(&self, collection: Collection) -> &GateSlot {
		match collection {
			Collection::Item => &self.item,
			Collection::Container => &self.container,
		}
	}
}

#[derive(Debug, Default)]
struct GateSlot {
	lock: Mutex<()>,
	epoch: AtomicU64,
}

/// Runs `call`; on a missing schema, provisions the collection and runs `call` exactly once more.
pub async fn with_schema_retry<'a, T, F>(
	engine: &'a dyn SearchEngine,
	gate: &SchemaGate,
	collection: Collection,
	call: F,
) -> shelf_storage::Result<T>
where
	F: Fn() -> BoxFuture<'a, shelf_storage::Result<T>>,
{
	let seen = gate.epoch(collection);

	match call().await {
		Err(shelf_storage::Error::SchemaMissing { .. }) => {
			tracing::warn!(
				collection = %collection,
				"Collection schema is missing; provisioning and retrying once."
			);

			gate.provision(engine, collection, seen).await?;

			call().await
		},
		result => result,
	}
}
