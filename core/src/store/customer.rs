use super::{parse_column, CrmStore};
use crate::{
    customer::{
        ContactStatus, Customer, CustomerStatus, CustomerTags, HappyCallWindow, Priority,
    },
    error::{CrmError, CrmResult},
    types::{CustomerId, Days},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::{params, params_from_iter, types::Value, OptionalExtension, Row};

const CUSTOMER_COLUMNS: &str = "
    id, name, phone, vehicle_number, vehicle_name, vehicle_model, address,
    inspection_expiry_date, actual_inspection_date, data_extracted_date,
    last_inspection_completed, insurance_expiry_date,
    customer_grade, visit_count, contact_status, is_do_not_call,
    priority, customer_status, is_inspection_overdue, is_frequent_visitor,
    has_premium_vehicle, is_first_time_no_return, is_long_term_absent,
    is_active_customer, needs_3month_call, needs_6month_call,
    needs_12month_call, needs_18month_call, data_source";

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    let flags: [bool; 4] = [row.get(24)?, row.get(25)?, row.get(26)?, row.get(27)?];
    let happy_call = HappyCallWindow::ALL
        .into_iter()
        .zip(flags)
        .find_map(|(window, set)| set.then_some(window));

    Ok(Customer {
        id:             Some(row.get(0)?),
        name:           row.get(1)?,
        phone:          row.get(2)?,
        vehicle_number: row.get(3)?,
        vehicle_name:   row.get(4)?,
        vehicle_model:  row.get(5)?,
        address:        row.get(6)?,
        inspection_expiry_date:    row.get(7)?,
        actual_inspection_date:    row.get(8)?,
        data_extracted_date:       row.get(9)?,
        last_inspection_completed: row.get(10)?,
        insurance_expiry_date:     row.get(11)?,
        customer_grade: parse_column(12, row.get(12)?)?,
        visit_count:    row.get(13)?,
        contact_status: parse_column(14, row.get(14)?)?,
        is_do_not_call: row.get(15)?,
        data_source:    parse_column(28, row.get(28)?)?,
        tags: CustomerTags {
            priority:                parse_column(16, row.get(16)?)?,
            customer_status:         parse_column(17, row.get(17)?)?,
            is_inspection_overdue:   row.get(18)?,
            is_frequent_visitor:     row.get(19)?,
            has_premium_vehicle:     row.get(20)?,
            is_first_time_no_return: row.get(21)?,
            is_long_term_absent:     row.get(22)?,
            is_active_customer:      row.get(23)?,
            happy_call,
        },
    })
}

/// Predicates used by dashboards and jobs to count or select customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerFilter {
    All,
    HappyCall(HappyCallWindow),
    /// Expiry date strictly before today, whatever the tag says.
    InspectionOverdue,
    /// Expiry between today and today + `days`, inclusive.
    DueSoon { days: Days },
    /// Two or more visits.
    Returning,
    FrequentVisitor,
    Vip,
    Status(CustomerStatus),
    Priority(Priority),
    FirstTimeNoReturn,
    LongTermAbsent,
    ActiveCustomer,
    Contact(ContactStatus),
}

impl CustomerFilter {
    fn clause(&self, today: NaiveDate, values: &mut Vec<Value>) -> String {
        match self {
            Self::All => "1 = 1".into(),
            Self::HappyCall(window) => format!("{} = 1", window.column()),
            Self::InspectionOverdue => {
                values.push(Value::Text(today.to_string()));
                "inspection_expiry_date IS NOT NULL AND inspection_expiry_date < ?".into()
            }
            Self::DueSoon { days } => {
                let until = today + Duration::days(*days);
                values.push(Value::Text(today.to_string()));
                values.push(Value::Text(until.to_string()));
                "inspection_expiry_date IS NOT NULL
                 AND inspection_expiry_date >= ? AND inspection_expiry_date <= ?"
                    .into()
            }
            Self::Returning => "visit_count >= 2".into(),
            Self::FrequentVisitor => "is_frequent_visitor = 1".into(),
            Self::Vip => "customer_grade = 'vip'".into(),
            Self::Status(status) => {
                values.push(Value::Text(status.as_str().into()));
                "customer_status = ?".into()
            }
            Self::Priority(priority) => {
                values.push(Value::Text(priority.as_str().into()));
                "priority = ?".into()
            }
            Self::FirstTimeNoReturn => "is_first_time_no_return = 1".into(),
            Self::LongTermAbsent => "is_long_term_absent = 1".into(),
            Self::ActiveCustomer => "is_active_customer = 1".into(),
            Self::Contact(status) => {
                values.push(Value::Text(status.as_str().into()));
                "contact_status = ?".into()
            }
        }
    }
}

impl CrmStore {
    // ── Customer ──────────────────────────────────────────────────

    pub fn insert_customer(&self, c: &Customer, now: NaiveDateTime) -> CrmResult<CustomerId> {
        if self.find_customer_by_key(&c.phone, &c.vehicle_number)?.is_some() {
            return Err(CrmError::DuplicateCustomer {
                phone:          c.phone.clone(),
                vehicle_number: c.vehicle_number.clone(),
            });
        }
        self.conn.execute(
            "INSERT INTO customer (
                name, phone, vehicle_number, vehicle_name, vehicle_model, address,
                inspection_expiry_date, last_inspection_completed, insurance_expiry_date,
                customer_grade, visit_count, contact_status, is_do_not_call,
                data_source, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
            params![
                &c.name,
                &c.phone,
                &c.vehicle_number,
                &c.vehicle_name,
                &c.vehicle_model,
                &c.address,
                c.inspection_expiry_date,
                c.last_inspection_completed,
                c.insurance_expiry_date,
                c.customer_grade.as_str(),
                c.visit_count,
                c.contact_status.as_str(),
                c.is_do_not_call,
                c.data_source.as_str(),
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.save_derived_fields(id, c, now)?;
        Ok(id)
    }

    /// Insert or overwrite the input fields of the customer identified by
    /// (phone, vehicle_number). Derived fields, contact status and the
    /// original data source are left alone. Returns the id and whether it was new.
    pub fn upsert_customer_inputs(
        &self,
        c: &Customer,
        now: NaiveDateTime,
    ) -> CrmResult<(CustomerId, bool)> {
        let Some(existing) = self.find_customer_by_key(&c.phone, &c.vehicle_number)? else {
            return Ok((self.insert_customer(c, now)?, true));
        };
        let id = existing.id.ok_or(CrmError::InvalidInput("stored customer without id".into()))?;
        self.conn.execute(
            "UPDATE customer SET
                name = ?1, vehicle_name = ?2, vehicle_model = ?3, address = ?4,
                inspection_expiry_date = ?5, last_inspection_completed = ?6,
                insurance_expiry_date = ?7, customer_grade = ?8, visit_count = ?9,
                updated_at = ?10
             WHERE id = ?11",
            params![
                &c.name,
                &c.vehicle_name,
                &c.vehicle_model,
                &c.address,
                c.inspection_expiry_date,
                c.last_inspection_completed,
                c.insurance_expiry_date,
                c.customer_grade.as_str(),
                c.visit_count,
                now,
                id,
            ],
        )?;
        Ok((id, false))
    }

    /// Persist `actual_inspection_date`, `data_extracted_date` and every tag.
    pub fn save_derived_fields(
        &self,
        id: CustomerId,
        c: &Customer,
        now: NaiveDateTime,
    ) -> CrmResult<()> {
        let t = &c.tags;
        let updated = self.conn.execute(
            "UPDATE customer SET
                actual_inspection_date = ?1, data_extracted_date = ?2,
                priority = ?3, customer_status = ?4,
                is_inspection_overdue = ?5, is_frequent_visitor = ?6,
                has_premium_vehicle = ?7, is_first_time_no_return = ?8,
                is_long_term_absent = ?9, is_active_customer = ?10,
                needs_3month_call = ?11, needs_6month_call = ?12,
                needs_12month_call = ?13, needs_18month_call = ?14,
                updated_at = ?15
             WHERE id = ?16",
            params![
                c.actual_inspection_date,
                c.data_extracted_date,
                t.priority.as_str(),
                t.customer_status.as_str(),
                t.is_inspection_overdue,
                t.is_frequent_visitor,
                t.has_premium_vehicle,
                t.is_first_time_no_return,
                t.is_long_term_absent,
                t.is_active_customer,
                t.needs_3month_call(),
                t.needs_6month_call(),
                t.needs_12month_call(),
                t.needs_18month_call(),
                now,
                id,
            ],
        )?;
        if updated == 0 {
            return Err(CrmError::CustomerNotFound { id });
        }
        Ok(())
    }

    pub fn update_contact_status(
        &self,
        id: CustomerId,
        status: ContactStatus,
        now: NaiveDateTime,
    ) -> CrmResult<()> {
        let updated = self.conn.execute(
            "UPDATE customer SET contact_status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, id],
        )?;
        if updated == 0 {
            return Err(CrmError::CustomerNotFound { id });
        }
        Ok(())
    }

    pub fn get_customer(&self, id: CustomerId) -> CrmResult<Customer> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customer WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], customer_from_row)
            .optional()?
            .ok_or(CrmError::CustomerNotFound { id })
    }

    pub fn find_customer_by_key(
        &self,
        phone: &str,
        vehicle_number: &str,
    ) -> CrmResult<Option<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer WHERE phone = ?1 AND vehicle_number = ?2"
        );
        let found = self
            .conn
            .query_row(&sql, params![phone, vehicle_number], customer_from_row)
            .optional()?;
        Ok(found)
    }

    /// Customer ids in insertion order, optionally capped.
    pub fn customer_ids(&self, limit: Option<usize>) -> CrmResult<Vec<CustomerId>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM customer ORDER BY id ASC LIMIT ?1")?;
        let ids = stmt
            .query_map(params![limit], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn customers_matching(
        &self,
        filter: CustomerFilter,
        today: NaiveDate,
    ) -> CrmResult<Vec<Customer>> {
        let mut values = Vec::new();
        let clause = filter.clause(today, &mut values);
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customer WHERE {clause} ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), customer_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Count customers matching `filter`. With `exclude_called_today`, those
    /// who already received a (non-deleted) call on `today` are left out.
    pub fn count_customers(
        &self,
        filter: CustomerFilter,
        today: NaiveDate,
        exclude_called_today: bool,
    ) -> CrmResult<i64> {
        let mut values = Vec::new();
        let mut sql = format!(
            "SELECT COUNT(*) FROM customer WHERE ({})",
            filter.clause(today, &mut values)
        );
        if exclude_called_today {
            sql.push_str(
                " AND id NOT IN (
                    SELECT customer_id FROM call_record
                    WHERE is_deleted = 0 AND date(call_date) = ?)",
            );
            values.push(Value::Text(today.to_string()));
        }
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::{CustomerGrade, DataSource};

    fn store() -> CrmStore {
        let store = CrmStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    #[test]
    fn insert_then_get_round_trips_tags() {
        let store = store();
        let mut c = Customer::new("Yoon", "010-7777-8888", "90마1234")
            .with_grade(CustomerGrade::Vip)
            .with_visit_count(4);
        c.tags.happy_call = Some(HappyCallWindow::TwelveMonth);
        c.tags.priority = Priority::High;

        let id = store.insert_customer(&c, now()).unwrap();
        let loaded = store.get_customer(id).unwrap();

        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.tags, c.tags);
        assert_eq!(loaded.customer_grade, CustomerGrade::Vip);
        assert_eq!(loaded.data_source, DataSource::Import);
    }

    #[test]
    fn phone_and_vehicle_pair_is_unique() {
        let store = store();
        let c = Customer::new("Lim", "010-1212-3434", "11바2222");
        store.insert_customer(&c, now()).unwrap();
        let err = store.insert_customer(&c, now()).unwrap_err();
        assert!(matches!(err, CrmError::DuplicateCustomer { .. }));

        // Same phone, different vehicle is a different customer.
        let other = Customer::new("Lim", "010-1212-3434", "33사4444");
        store.insert_customer(&other, now()).unwrap();
    }

    #[test]
    fn upsert_updates_inputs_and_keeps_id() {
        let store = store();
        let c = Customer::new("Han", "010-9999-0000", "44아5555").with_visit_count(1);
        let (id, created) = store.upsert_customer_inputs(&c, now()).unwrap();
        assert!(created);

        let changed = c.clone().with_visit_count(6).with_data_source(DataSource::Manual);
        let (again, created) = store.upsert_customer_inputs(&changed, now()).unwrap();
        assert!(!created);
        assert_eq!(again, id);
        let stored = store.get_customer(id).unwrap();
        assert_eq!(stored.visit_count, 6);
        assert_eq!(stored.data_source, DataSource::Import, "first source sticks");
    }

    #[test]
    fn missing_customer_is_an_error() {
        let store = store();
        assert!(matches!(store.get_customer(42), Err(CrmError::CustomerNotFound { id: 42 })));
    }
}
