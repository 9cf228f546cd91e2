use super::CrmStore;
use crate::error::CrmResult;
use chrono::NaiveDateTime;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

/// One committed import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadHistory {
    pub upload_id:       String,
    pub uploaded_by:     String,
    pub uploaded_at:     NaiveDateTime,
    pub file_name:       String,
    pub total_records:   i64,
    pub new_records:     i64,
    pub updated_records: i64,
    pub error_count:     i64,
    pub notes:           String,
}

fn upload_from_row(row: &Row<'_>) -> rusqlite::Result<UploadHistory> {
    Ok(UploadHistory {
        upload_id:       row.get(0)?,
        uploaded_by:     row.get(1)?,
        uploaded_at:     row.get(2)?,
        file_name:       row.get(3)?,
        total_records:   row.get(4)?,
        new_records:     row.get(5)?,
        updated_records: row.get(6)?,
        error_count:     row.get(7)?,
        notes:           row.get(8)?,
    })
}

impl CrmStore {
    // ── Upload history ────────────────────────────────────────────

    pub fn insert_upload_history(&self, upload: &UploadHistory) -> CrmResult<()> {
        self.conn.execute(
            "INSERT INTO upload_history (
                upload_id, uploaded_by, uploaded_at, file_name, total_records,
                new_records, updated_records, error_count, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                upload.upload_id,
                upload.uploaded_by,
                upload.uploaded_at,
                upload.file_name,
                upload.total_records,
                upload.new_records,
                upload.updated_records,
                upload.error_count,
                upload.notes,
            ],
        )?;
        Ok(())
    }

    /// Most recent uploads first.
    pub fn recent_uploads(&self, limit: usize) -> CrmResult<Vec<UploadHistory>> {
        let mut stmt = self.conn.prepare(
            "SELECT upload_id, uploaded_by, uploaded_at, file_name, total_records,
                    new_records, updated_records, error_count, notes
             FROM upload_history
             ORDER BY uploaded_at DESC, rowid DESC
             LIMIT ?1",
        )?;
        let uploads = stmt
            .query_map(params![limit as i64], upload_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(uploads)
    }

    pub fn upload_count(&self) -> CrmResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM upload_history", [], |row| row.get(0))?;
        Ok(count)
    }
}
