use super::{parse_column, CrmStore};
use crate::{
    assignment::{AssignmentStatus, CallAssignment, NewAssignment},
    error::{CrmError, CrmResult},
    types::CallAssignmentId,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, OptionalExtension, Row};

const ASSIGNMENT_COLUMNS: &str = "
    id, customer_id, assigned_to, assigned_by, assigned_at, priority,
    status, due_date, notes, completed_at";

/// Urgent first, then by due date with undated work last.
const QUEUE_ORDER: &str = "
    CASE priority
        WHEN 'urgent' THEN 0 WHEN 'high' THEN 1 WHEN 'normal' THEN 2 ELSE 3
    END ASC,
    due_date IS NULL ASC, due_date ASC, id ASC";

const OPEN_STATUSES: &str = "status IN ('pending', 'in_progress')";

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<CallAssignment> {
    Ok(CallAssignment {
        id:           row.get(0)?,
        customer_id:  row.get(1)?,
        assigned_to:  row.get(2)?,
        assigned_by:  row.get(3)?,
        assigned_at:  row.get(4)?,
        priority:     parse_column(5, row.get(5)?)?,
        status:       parse_column(6, row.get(6)?)?,
        due_date:     row.get(7)?,
        notes:        row.get(8)?,
        completed_at: row.get(9)?,
    })
}

impl CrmStore {
    // ── Call assignments ──────────────────────────────────────────

    pub fn insert_call_assignment(
        &self,
        a: &NewAssignment,
        assigned_by: &str,
        now: NaiveDateTime,
    ) -> CrmResult<CallAssignmentId> {
        self.conn.execute(
            "INSERT INTO call_assignment (
                customer_id, assigned_to, assigned_by, assigned_at,
                priority, due_date, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                a.customer_id,
                &a.assigned_to,
                assigned_by,
                now,
                a.priority.as_str(),
                a.due_date,
                &a.notes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_call_assignment(&self, id: CallAssignmentId) -> CrmResult<CallAssignment> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM call_assignment WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], assignment_from_row)
            .optional()?
            .ok_or(CrmError::AssignmentNotFound { id })
    }

    /// An agent's queue. With `open_only`, completed and cancelled work is
    /// left out.
    pub fn assignments_for_agent(
        &self,
        username: &str,
        open_only: bool,
    ) -> CrmResult<Vec<CallAssignment>> {
        let filter = if open_only { OPEN_STATUSES } else { "1 = 1" };
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM call_assignment
             WHERE assigned_to = ?1 AND {filter}
             ORDER BY {QUEUE_ORDER}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![username], assignment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Open assignments whose due date is before `today`.
    pub fn overdue_assignments(&self, today: NaiveDate) -> CrmResult<Vec<CallAssignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM call_assignment
             WHERE {OPEN_STATUSES} AND due_date IS NOT NULL AND due_date < ?1
             ORDER BY {QUEUE_ORDER}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![today], assignment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn open_assignment_count(&self) -> CrmResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM call_assignment WHERE {OPEN_STATUSES}");
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }

    /// Writes the new status; `completed_at` is stamped only on completion.
    pub fn set_assignment_status(
        &self,
        id: CallAssignmentId,
        status: AssignmentStatus,
        now: NaiveDateTime,
    ) -> CrmResult<()> {
        let completed_at = (status == AssignmentStatus::Completed).then_some(now);
        let updated = self.conn.execute(
            "UPDATE call_assignment SET status = ?1, completed_at = ?2 WHERE id = ?3",
            params![status.as_str(), completed_at, id],
        )?;
        if updated == 0 {
            return Err(CrmError::AssignmentNotFound { id });
        }
        Ok(())
    }
}
