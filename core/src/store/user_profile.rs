use super::{parse_column, CrmStore};
use crate::{assignment::UserProfile, error::CrmResult};
use rusqlite::{params, OptionalExtension};

impl CrmStore {
    // ── User profiles ─────────────────────────────────────────────

    pub fn upsert_user_profile(&self, profile: &UserProfile) -> CrmResult<()> {
        self.conn.execute(
            "INSERT INTO user_profile (username, role, daily_call_target)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (username) DO UPDATE SET
                role = excluded.role,
                daily_call_target = excluded.daily_call_target",
            params![&profile.username, profile.role.as_str(), profile.daily_call_target],
        )?;
        Ok(())
    }

    pub fn get_user_profile(&self, username: &str) -> CrmResult<Option<UserProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT username, role, daily_call_target FROM user_profile WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserProfile {
                        username:          row.get(0)?,
                        role:              parse_column(1, row.get(1)?)?,
                        daily_call_target: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }
}
