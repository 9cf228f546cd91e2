//! Bulk customer import.
//!
//! Rows arrive as raw spreadsheet strings. Each row is normalized, upserted
//! on (phone, vehicle_number), run through the tag engine and saved.
//!
//! RULES:
//!   - Rows are committed in batches of `ImportConfig::batch_size`.
//!   - Every row runs inside its own savepoint; a bad row is counted and
//!     skipped, its batch siblings still commit.
//!   - A dry run does all of the above inside one transaction that is
//!     rolled back, and writes no upload history.

use crate::{
    clock::Clock,
    config::{CrmConfig, ImportConfig},
    customer::Customer,
    engine::TagEngine,
    error::{CrmError, CrmResult},
    event::{CrmEvent, EventLogEntry},
    normalize::{clean_phone_number, map_customer_grade, parse_date, parse_visit_count},
    store::{CrmStore, UploadHistory},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const EVENT_SOURCE: &str = "import";

// ── Public types ─────────────────────────────────────────────────────────────

/// One spreadsheet row. Headers are accepted in English or in the Korean
/// labels of the dealer export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerImportRow {
    #[serde(alias = "고객명")]
    pub name:                      String,
    #[serde(alias = "휴대전화")]
    pub phone:                     String,
    #[serde(alias = "차량번호")]
    pub vehicle_number:            String,
    #[serde(alias = "차량명")]
    pub vehicle_name:              String,
    #[serde(alias = "모델명")]
    pub vehicle_model:             String,
    #[serde(alias = "주소")]
    pub address:                   String,
    #[serde(alias = "검사만료일")]
    pub inspection_expiry_date:    String,
    #[serde(alias = "최종검사일")]
    pub last_inspection_completed: String,
    #[serde(alias = "보험만기일")]
    pub insurance_expiry_date:     String,
    #[serde(alias = "고객등급")]
    pub customer_grade:            String,
    #[serde(alias = "방문수")]
    pub visit_count:               String,
}

impl CustomerImportRow {
    /// Normalize into a customer. `row` is the 1-based row number used in
    /// error messages.
    pub fn to_customer(&self, row: usize) -> CrmResult<Customer> {
        let name = self.name.trim();
        let phone = clean_phone_number(&self.phone);
        let vehicle_number = self.vehicle_number.trim();

        let missing: Vec<&str> = [
            ("name", name.is_empty()),
            ("phone", phone.is_empty()),
            ("vehicle_number", vehicle_number.is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, empty)| empty.then_some(field))
        .collect();
        if !missing.is_empty() {
            return Err(CrmError::InvalidRow {
                row,
                reason: format!("missing {}", missing.join(", ")),
            });
        }

        let mut customer = Customer::new(name, phone, vehicle_number);
        customer.vehicle_name = self.vehicle_name.trim().to_string();
        customer.vehicle_model = self.vehicle_model.trim().to_string();
        customer.address = self.address.trim().to_string();
        customer.inspection_expiry_date = parse_date(&self.inspection_expiry_date);
        customer.last_inspection_completed = parse_date(&self.last_inspection_completed);
        customer.insurance_expiry_date = parse_date(&self.insurance_expiry_date);
        customer.customer_grade = map_customer_grade(&self.customer_grade);
        customer.visit_count = parse_visit_count(&self.visit_count);
        Ok(customer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Date the spreadsheet was extracted from the dealer system.
    pub extract_date:   NaiveDate,
    /// "Today" for the tag engine.
    pub reference_date: NaiveDate,
    pub dry_run:        bool,
    pub file_name:      String,
}

impl ImportOptions {
    /// Extract and reference date both `today`, committing.
    pub fn on(today: NaiveDate, file_name: impl Into<String>) -> Self {
        Self {
            extract_date:   today,
            reference_date: today,
            dry_run:        false,
            file_name:      file_name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Set for committed runs only.
    pub upload_id:       Option<String>,
    pub total_rows:      usize,
    pub new_records:     usize,
    pub updated_records: usize,
    pub error_count:     usize,
    /// The first few row errors, verbatim.
    pub errors:          Vec<String>,
    pub dry_run:         bool,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.new_records + self.updated_records
    }

    fn record_error(&mut self, err: &CrmError, keep: usize) {
        self.error_count += 1;
        if self.errors.len() < keep {
            self.errors.push(err.to_string());
        }
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

pub struct ImportPipeline<'a> {
    store:  &'a CrmStore,
    engine: TagEngine,
    config: ImportConfig,
    clock:  &'a dyn Clock,
}

impl<'a> ImportPipeline<'a> {
    pub fn new(store: &'a CrmStore, config: &CrmConfig, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            engine: TagEngine::new(config.rules.clone()),
            config: config.import.clone(),
            clock,
        }
    }

    pub fn run(&self, rows: &[CustomerImportRow], options: &ImportOptions) -> CrmResult<ImportReport> {
        let mut report = ImportReport {
            total_rows: rows.len(),
            dry_run: options.dry_run,
            ..ImportReport::default()
        };
        let batch_size = self.config.batch_size.max(1);
        let now = self.clock.now();

        log::info!(
            "import: {} rows from '{}' (extract {}, reference {}, dry_run={})",
            rows.len(),
            options.file_name,
            options.extract_date,
            options.reference_date,
            options.dry_run
        );

        if options.dry_run {
            self.store.within_transaction(true, |store| {
                for (index, batch) in rows.chunks(batch_size).enumerate() {
                    self.process_batch(store, batch, index * batch_size, options, now, &mut report)?;
                }
                Ok(())
            })?;
        } else {
            for (index, batch) in rows.chunks(batch_size).enumerate() {
                self.store.within_transaction(false, |store| {
                    self.process_batch(store, batch, index * batch_size, options, now, &mut report)
                })?;
                log::debug!("import: committed batch {}", index + 1);
            }
            report.upload_id = Some(self.record_upload(&report, options, now)?);
        }

        log::info!(
            "import: done, {} new, {} updated, {} errors{}",
            report.new_records,
            report.updated_records,
            report.error_count,
            if options.dry_run { " (dry run, rolled back)" } else { "" }
        );
        Ok(report)
    }

    fn process_batch(
        &self,
        store: &CrmStore,
        batch: &[CustomerImportRow],
        offset: usize,
        options: &ImportOptions,
        now: NaiveDateTime,
        report: &mut ImportReport,
    ) -> CrmResult<()> {
        for (i, row) in batch.iter().enumerate() {
            let row_number = offset + i + 1;
            match store.within_savepoint("import_row", |store| {
                self.import_row(store, row, row_number, options, now)
            }) {
                Ok(true) => report.new_records += 1,
                Ok(false) => report.updated_records += 1,
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    log::warn!("import: row {row_number} skipped: {e}");
                    report.record_error(&e, self.config.max_reported_errors);
                    log_event(store, now, &CrmEvent::ImportRowRejected {
                        row:    row_number,
                        reason: e.to_string(),
                    })?;
                }
            }

            let progress_every = self.config.progress_every.max(1);
            if row_number % progress_every == 0 {
                log::info!("import: {row_number}/{} rows processed", report.total_rows);
            }
        }
        Ok(())
    }

    /// Returns whether the customer was newly created.
    fn import_row(
        &self,
        store: &CrmStore,
        row: &CustomerImportRow,
        row_number: usize,
        options: &ImportOptions,
        now: NaiveDateTime,
    ) -> CrmResult<bool> {
        let incoming = row.to_customer(row_number)?;
        let (id, created) = store.upsert_customer_inputs(&incoming, now)?;

        // Reload so the prior priority and status feed the engine.
        let mut customer = store.get_customer(id)?;
        self.engine.calculate_inspection_date(&mut customer, options.extract_date);
        let outcome = self.engine.update_priority_tags(&mut customer, options.reference_date);
        store.save_derived_fields(id, &customer, now)?;

        log::debug!(
            "import: row {row_number} -> customer {id} ({}, {})",
            outcome.tags.customer_status,
            outcome.tags.priority.as_str()
        );
        log_event(store, now, &CrmEvent::CustomerImported {
            customer_id: id,
            created,
            status:      outcome.tags.customer_status,
            priority:    outcome.tags.priority,
        })?;
        Ok(created)
    }

    fn record_upload(
        &self,
        report: &ImportReport,
        options: &ImportOptions,
        now: NaiveDateTime,
    ) -> CrmResult<String> {
        let upload = UploadHistory {
            upload_id:       uuid::Uuid::new_v4().to_string(),
            uploaded_by:     self.config.uploaded_by.clone(),
            uploaded_at:     now,
            file_name:       options.file_name.clone(),
            total_records:   report.imported() as i64,
            new_records:     report.new_records as i64,
            updated_records: report.updated_records as i64,
            error_count:     report.error_count as i64,
            notes:           format!("{} rows processed", report.total_rows),
        };
        self.store.within_transaction(false, |store| {
            store.insert_upload_history(&upload)?;
            log_event(store, now, &CrmEvent::ImportCompleted {
                upload_id:       upload.upload_id.clone(),
                new_records:     report.new_records,
                updated_records: report.updated_records,
                error_count:     report.error_count,
            })
        })?;
        Ok(upload.upload_id)
    }
}

/// Errors that mean the connection itself is unusable, as opposed to a
/// single bad row.
fn is_fatal(err: &CrmError) -> bool {
    use rusqlite::ErrorCode;
    match err {
        CrmError::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
            e.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::DiskFull | ErrorCode::ReadOnly
        ),
        _ => false,
    }
}

fn log_event(store: &CrmStore, now: NaiveDateTime, event: &CrmEvent) -> CrmResult<()> {
    store.append_event(&EventLogEntry::new(EVENT_SOURCE, event, now)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::CustomerGrade;

    fn row(name: &str, phone: &str, vehicle: &str) -> CustomerImportRow {
        CustomerImportRow {
            name: name.into(),
            phone: phone.into(),
            vehicle_number: vehicle.into(),
            ..CustomerImportRow::default()
        }
    }

    #[test]
    fn row_is_normalized_into_customer() {
        let mut r = row(" 김민수 ", "01012345678", " 12가3456 ");
        r.customer_grade = "정회원".into();
        r.visit_count = "4".into();
        r.inspection_expiry_date = "2024/05/01".into();

        let c = r.to_customer(1).unwrap();
        assert_eq!(c.name, "김민수");
        assert_eq!(c.phone, "010-1234-5678");
        assert_eq!(c.vehicle_number, "12가3456");
        assert_eq!(c.customer_grade, CustomerGrade::Regular);
        assert_eq!(c.visit_count, 4);
        assert_eq!(c.inspection_expiry_date, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn missing_required_fields_are_named() {
        let err = row("", "", "12가3456").to_customer(7).unwrap_err();
        match err {
            CrmError::InvalidRow { row, reason } => {
                assert_eq!(row, 7);
                assert_eq!(reason, "missing name, phone");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn korean_headers_deserialize() {
        let json = r#"{"고객명":"이영희","휴대전화":"010-9876-5432","차량번호":"34나5678","방문수":"2"}"#;
        let r: CustomerImportRow = serde_json::from_str(json).unwrap();
        assert_eq!(r.name, "이영희");
        assert_eq!(r.vehicle_number, "34나5678");
        assert_eq!(r.visit_count, "2");
    }
}
