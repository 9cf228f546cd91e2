use super::{parse_column, CrmStore};
use crate::{
    call_outcome::{CallFollowUp, CallRecord, FollowUpAction, NewCallRecord},
    error::{CrmError, CrmResult},
    types::{CallRecordId, CustomerId, FollowUpActionId},
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, OptionalExtension, Row};

const CALL_COLUMNS: &str = "
    id, customer_id, caller, call_date, call_result, interest_type,
    customer_attitude, notes, follow_up_date, requires_follow_up,
    follow_up_completed, follow_up_notes, parent_call_id, is_converted,
    is_deleted, deleted_at, deleted_by";

fn call_from_row(row: &Row<'_>) -> rusqlite::Result<CallRecord> {
    let interest: Option<String> = row.get(5)?;
    let attitude: Option<String> = row.get(6)?;
    Ok(CallRecord {
        id:                  row.get(0)?,
        customer_id:         row.get(1)?,
        caller:              row.get(2)?,
        call_date:           row.get(3)?,
        call_result:         parse_column(4, row.get(4)?)?,
        interest_type:       interest.map(|s| parse_column(5, s)).transpose()?,
        customer_attitude:   attitude.map(|s| parse_column(6, s)).transpose()?,
        notes:               row.get(7)?,
        follow_up_date:      row.get(8)?,
        requires_follow_up:  row.get(9)?,
        follow_up_completed: row.get(10)?,
        follow_up_notes:     row.get(11)?,
        parent_call_id:      row.get(12)?,
        is_converted:        row.get(13)?,
        is_deleted:          row.get(14)?,
        deleted_at:          row.get(15)?,
        deleted_by:          row.get(16)?,
    })
}

impl CrmStore {
    // ── Call records ──────────────────────────────────────────────

    pub fn insert_call_record(
        &self,
        call: &NewCallRecord,
        caller: &str,
        call_date: NaiveDateTime,
    ) -> CrmResult<CallRecordId> {
        self.conn.execute(
            "INSERT INTO call_record (
                customer_id, caller, call_date, call_result, interest_type,
                customer_attitude, notes, follow_up_date, requires_follow_up,
                follow_up_notes, parent_call_id, is_converted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                call.customer_id,
                caller,
                call_date,
                call.call_result.as_str(),
                call.interest_type.map(|i| i.as_str()),
                call.customer_attitude.map(|a| a.as_str()),
                &call.notes,
                call.follow_up_date,
                call.requires_follow_up,
                &call.follow_up_notes,
                call.parent_call_id,
                call.is_converted,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_call_record(&self, id: CallRecordId) -> CrmResult<CallRecord> {
        let sql = format!("SELECT {CALL_COLUMNS} FROM call_record WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], call_from_row)
            .optional()?
            .ok_or(CrmError::CallRecordNotFound { id })
    }

    pub fn calls_for_customer(&self, customer_id: CustomerId) -> CrmResult<Vec<CallRecord>> {
        let sql = format!(
            "SELECT {CALL_COLUMNS} FROM call_record
             WHERE customer_id = ?1 AND is_deleted = 0
             ORDER BY call_date DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![customer_id], call_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Open follow-ups of a customer, excluding `except` (the call that is
    /// answering them).
    pub fn open_follow_ups(
        &self,
        customer_id: CustomerId,
        except: CallRecordId,
    ) -> CrmResult<Vec<CallRecordId>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM call_record
             WHERE customer_id = ?1 AND requires_follow_up = 1
               AND follow_up_completed = 0 AND is_deleted = 0 AND id != ?2
             ORDER BY id ASC",
        )?;
        let ids = stmt
            .query_map(params![customer_id, except], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn mark_follow_up_completed(&self, id: CallRecordId) -> CrmResult<()> {
        let updated = self.conn.execute(
            "UPDATE call_record SET follow_up_completed = 1 WHERE id = ?1",
            params![id],
        )?;
        if updated == 0 {
            return Err(CrmError::CallRecordNotFound { id });
        }
        Ok(())
    }

    /// Parents that still await follow-up although a live child call exists.
    pub fn parents_with_open_follow_up_and_child(&self) -> CrmResult<Vec<CallRecordId>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT p.id
             FROM call_record c
             JOIN call_record p ON c.parent_call_id = p.id
             WHERE c.is_deleted = 0
               AND p.requires_follow_up = 1 AND p.follow_up_completed = 0
             ORDER BY p.id ASC",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// (calls requiring follow-up, of which completed), ignoring deleted calls.
    pub fn follow_up_totals(&self) -> CrmResult<(i64, i64)> {
        let totals = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(follow_up_completed), 0)
             FROM call_record
             WHERE requires_follow_up = 1 AND is_deleted = 0",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(totals)
    }

    pub fn soft_delete_call_record(
        &self,
        id: CallRecordId,
        deleted_by: &str,
        now: NaiveDateTime,
    ) -> CrmResult<()> {
        let updated = self.conn.execute(
            "UPDATE call_record SET is_deleted = 1, deleted_at = ?1, deleted_by = ?2
             WHERE id = ?3 AND is_deleted = 0",
            params![now, deleted_by, id],
        )?;
        if updated == 0 {
            return Err(CrmError::CallRecordNotFound { id });
        }
        Ok(())
    }

    /// Live calls placed on `day`, optionally only connected ones.
    pub fn call_count_on(&self, day: NaiveDate, connected_only: bool) -> CrmResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM call_record
             WHERE is_deleted = 0 AND date(call_date) = ?1
               AND (?2 = 0 OR call_result = 'connected')",
            params![day, connected_only],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Distinct customers with a live call on `day`.
    pub fn customers_called_on(&self, day: NaiveDate) -> CrmResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT customer_id) FROM call_record
             WHERE is_deleted = 0 AND date(call_date) = ?1",
            params![day],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Uncompleted follow-ups scheduled for exactly `day`.
    pub fn follow_ups_due_on(&self, day: NaiveDate) -> CrmResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM call_record
             WHERE is_deleted = 0 AND follow_up_completed = 0 AND follow_up_date = ?1",
            params![day],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Required follow-ups still open after their scheduled date.
    pub fn overdue_follow_ups(&self, today: NaiveDate) -> CrmResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM call_record
             WHERE is_deleted = 0 AND requires_follow_up = 1
               AND follow_up_completed = 0 AND follow_up_date < ?1",
            params![today],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Live calls on `day` that answer an earlier call.
    pub fn follow_up_calls_on(&self, day: NaiveDate) -> CrmResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM call_record
             WHERE is_deleted = 0 AND parent_call_id IS NOT NULL AND date(call_date) = ?1",
            params![day],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Live calls placed by `caller` on `day`.
    pub fn call_count_by_caller_on(&self, caller: &str, day: NaiveDate) -> CrmResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM call_record
             WHERE is_deleted = 0 AND caller = ?1 AND date(call_date) = ?2",
            params![caller, day],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── Follow-up actions ─────────────────────────────────────────

    pub fn insert_follow_up_action(
        &self,
        call_id: CallRecordId,
        action: &FollowUpAction,
        created_by: &str,
        now: NaiveDateTime,
    ) -> CrmResult<FollowUpActionId> {
        self.conn.execute(
            "INSERT INTO call_follow_up (
                call_record_id, created_by, created_at, action_type, notes, scheduled_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                call_id,
                created_by,
                now,
                action.action_type.map(|a| a.as_str()),
                &action.notes,
                action.scheduled_date,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Logged actions of one call, oldest first.
    pub fn follow_up_actions_for_call(&self, call_id: CallRecordId) -> CrmResult<Vec<CallFollowUp>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, call_record_id, created_by, created_at, action_type, notes, scheduled_date
             FROM call_follow_up WHERE call_record_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![call_id], |row| {
            let action: Option<String> = row.get(4)?;
            Ok(CallFollowUp {
                id:             row.get(0)?,
                call_id:        row.get(1)?,
                created_by:     row.get(2)?,
                created_at:     row.get(3)?,
                action_type:    action.map(|s| parse_column(4, s)).transpose()?,
                notes:          row.get(5)?,
                scheduled_date: row.get(6)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn pending_follow_up_count(&self) -> CrmResult<i64> {
        let (total, completed) = self.follow_up_totals()?;
        Ok(total - completed)
    }
}
