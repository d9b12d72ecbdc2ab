use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::BatchSink;
use crate::model::AttendanceRecord;

/// One not-yet-acknowledged batch submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBatch {
    pub id: String,
    pub enqueued_at: String,
    pub records: Vec<AttendanceRecord>,
}

/// Outcome of a drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub remaining: usize,
}

/// Durable buffer for batches whose immediate submission failed. Batches
/// are kept per enqueue (oldest first), not as a single replaceable slot,
/// so two failed sessions never overwrite each other.
pub struct OfflineQueue<'c> {
    conn: &'c Connection,
}

impl<'c> OfflineQueue<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn enqueue(&self, records: &[AttendanceRecord]) -> anyhow::Result<PendingBatch> {
        let batch = PendingBatch {
            id: Uuid::new_v4().to_string(),
            enqueued_at: Utc::now().to_rfc3339(),
            records: records.to_vec(),
        };
        self.conn.execute(
            "INSERT INTO pending_batches(id, enqueued_at, records_json) VALUES(?, ?, ?)",
            (
                &batch.id,
                &batch.enqueued_at,
                serde_json::to_string(&batch.records)?,
            ),
        )?;
        info!(batch = %batch.id, records = batch.records.len(), "chamadas pendentes enfileiradas");
        Ok(batch)
    }

    /// All pending batches, oldest first.
    pub fn pending(&self) -> anyhow::Result<Vec<PendingBatch>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, enqueued_at, records_json
             FROM pending_batches
             ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut batches = Vec::with_capacity(rows.len());
        for (id, enqueued_at, records_json) in rows {
            batches.push(PendingBatch {
                id,
                enqueued_at,
                records: serde_json::from_str(&records_json)?,
            });
        }
        Ok(batches)
    }

    /// Attempts delivery of every pending batch, oldest first. Each
    /// acknowledged batch is deleted; the first failure stops the pass and
    /// leaves the remainder untouched. Retry cadence is the host's
    /// concern (reconnect signal), not this component's.
    pub fn drain(&self, sink: &dyn BatchSink) -> anyhow::Result<DrainReport> {
        let batches = self.pending()?;
        let total = batches.len();
        let mut delivered = 0usize;

        for batch in batches {
            match sink.submit(&batch.records) {
                Ok(()) => {
                    self.conn
                        .execute("DELETE FROM pending_batches WHERE id = ?", [&batch.id])?;
                    delivered += 1;
                    info!(batch = %batch.id, "chamadas pendentes sincronizadas");
                }
                Err(e) => {
                    warn!(batch = %batch.id, error = %e, "sincronizacao falhou, lote mantido");
                    break;
                }
            }
        }

        Ok(DrainReport {
            delivered,
            remaining: total - delivered,
        })
    }

    pub fn is_empty(&self) -> anyhow::Result<bool> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM pending_batches", [], |r| r.get(0))?;
        Ok(count == 0)
    }
}
