use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};

use crate::app::Result;
use crate::domain::{apply_folders, Entry};
use crate::store::Store;
use crate::sync::{SyncEngine, SyncReport};

// By-id batches requested at once while hydrating
const FETCH_CONCURRENCY: usize = 4;

impl<S: Store + Send + Sync> SyncEngine<S> {
    /// Re-read subscriptions and both state sets, then replace local state.
    ///
    /// The four reads are independent and run concurrently; each lands in its
    /// own slot of the joined tuple. Nothing is written until all of them
    /// have succeeded.
    pub(super) async fn full_reconcile(&self, report: &mut SyncReport) -> Result<()> {
        let (mut feeds, taggings, unread, starred) = tokio::try_join!(
            self.remote_call("fetch subscriptions", self.remote.list_subscriptions()),
            self.remote_call("fetch taggings", self.remote.list_taggings()),
            self.remote_call("fetch unread ids", self.remote.list_unread_entry_ids()),
            self.remote_call("fetch starred ids", self.remote.list_starred_entry_ids()),
        )?;

        apply_folders(&mut feeds, &taggings);
        self.store.save_subscriptions(&feeds)?;

        report.hydrated = self.hydrate(&unread, &starred).await?;
        self.replace_states(&unread, &starred, report)
    }

    /// Pull entries changed since `cursor`, then replace local state from the
    /// current full state sets.
    pub(super) async fn incremental_reconcile(
        &self,
        cursor: DateTime<Utc>,
        report: &mut SyncReport,
    ) -> Result<()> {
        let updated_ids = self
            .remote_call(
                "fetch updated ids",
                self.remote.list_updated_entry_ids_since(cursor),
            )
            .await?;

        let updated = self
            .fetch_entries_by_ids("fetch updated entries", &updated_ids)
            .await?;
        self.store.save_entries(&updated)?;
        report.updated = updated.len();

        let (unread, starred) = tokio::try_join!(
            self.remote_call("fetch unread ids", self.remote.list_unread_entry_ids()),
            self.remote_call("fetch starred ids", self.remote.list_starred_entry_ids()),
        )?;

        report.hydrated = self.hydrate(&unread, &starred).await?;
        self.replace_states(&unread, &starred, report)
    }

    fn replace_states(&self, unread: &[i64], starred: &[i64], report: &mut SyncReport) -> Result<()> {
        self.store.save_entry_states(unread, starred)?;
        report.unread = unread.len();
        report.starred = starred.len();
        Ok(())
    }

    /// Fetch and cache every entry named in the state sets that the cache
    /// does not hold yet, so filtered views never point at missing rows.
    async fn hydrate(&self, unread: &[i64], starred: &[i64]) -> Result<usize> {
        let mut wanted: Vec<i64> = unread.iter().chain(starred).copied().collect();
        wanted.sort_unstable();
        wanted.dedup();

        let cached = self.store.cached_entry_ids(&wanted)?;
        let missing: Vec<i64> = wanted
            .into_iter()
            .filter(|id| !cached.contains(id))
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        tracing::debug!("Hydrating {} entries missing from cache", missing.len());
        let entries = self.fetch_entries_by_ids("hydrate entries", &missing).await?;
        self.store.save_entries(&entries)?;
        Ok(entries.len())
    }

    async fn fetch_entries_by_ids(&self, stage: &'static str, ids: &[i64]) -> Result<Vec<Entry>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = ids.chunks(self.options.id_batch_size.max(1));
        let batches: Vec<Vec<Entry>> = futures::stream::iter(chunks)
            .map(|chunk| self.remote_call(stage, self.remote.list_entries_by_ids(chunk)))
            .buffered(FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }
}
