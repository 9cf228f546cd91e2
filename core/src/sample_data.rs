//! Deterministic sample customers for demos and tests.
//!
//! Each generated customer has already been through
//! `calculate_inspection_date` and `update_priority_tags`, so it can be
//! inserted as-is.

use crate::{
    config::LifecycleRules,
    customer::{ContactStatus, Customer, CustomerGrade, DataSource},
    engine::TagEngine,
    error::{CrmError, CrmResult},
    name_generator::NameGenerator,
    rng::SampleRng,
    store::CrmStore,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};

const GRADES: [CustomerGrade; 5] = [
    CustomerGrade::Vip,
    CustomerGrade::Regular,
    CustomerGrade::Associate,
    CustomerGrade::New,
    CustomerGrade::None,
];

const CONTACT_STATUSES: [ContactStatus; 5] = [
    ContactStatus::Pending,
    ContactStatus::Contacted,
    ContactStatus::Interested,
    ContactStatus::NotInterested,
    ContactStatus::Callback,
];

pub struct SampleDataGenerator {
    rng:    SampleRng,
    engine: TagEngine,
}

impl SampleDataGenerator {
    pub fn new(seed: u64) -> Self {
        Self::with_rules(seed, LifecycleRules::default())
    }

    pub fn with_rules(seed: u64, rules: LifecycleRules) -> Self {
        Self {
            rng:    SampleRng::new(seed, 0).with_name("sample_customers"),
            engine: TagEngine::new(rules),
        }
    }

    /// One tagged customer. `index` is appended to the name so generated
    /// names stay distinguishable.
    pub fn next_customer(&mut self, index: usize, today: NaiveDate) -> Customer {
        let rng = &mut self.rng;
        let name = format!("{}{index}", NameGenerator::generate_full_name(rng));
        let phone = NameGenerator::generate_mobile(rng);
        let plate = NameGenerator::generate_plate(rng);

        let mut customer = Customer::new(name, phone, plate).with_data_source(DataSource::Sample);
        customer.vehicle_name = NameGenerator::generate_vehicle_name(rng).to_string();
        customer.vehicle_model = format!("{}년형", rng.range_i64(2012, 2024));
        customer.customer_grade = *rng.pick(&GRADES).unwrap_or(&CustomerGrade::None);
        customer.visit_count = rng.range_i64(0, 10);
        customer.contact_status = *rng.pick(&CONTACT_STATUSES).unwrap_or(&ContactStatus::Pending);
        customer.inspection_expiry_date = Some(today + Duration::days(rng.range_i64(-180, 365)));
        if rng.chance(0.6) {
            customer.last_inspection_completed = Some(today - Duration::days(rng.range_i64(0, 730)));
        }

        self.engine.calculate_inspection_date(&mut customer, today);
        self.engine.update_priority_tags(&mut customer, today);
        customer
    }

    pub fn generate(&mut self, count: usize, today: NaiveDate) -> Vec<Customer> {
        (0..count).map(|i| self.next_customer(i, today)).collect()
    }

    /// Insert `count` customers in one transaction. Key collisions with
    /// existing rows are skipped. Returns how many were inserted.
    pub fn seed_store(
        &mut self,
        store: &CrmStore,
        count: usize,
        today: NaiveDate,
        now: NaiveDateTime,
    ) -> CrmResult<usize> {
        let customers = self.generate(count, today);
        let inserted = store.within_transaction(false, |store| {
            let mut inserted = 0;
            for customer in &customers {
                match store.insert_customer(customer, now) {
                    Ok(_) => inserted += 1,
                    Err(CrmError::DuplicateCustomer { phone, vehicle_number }) => {
                        log::debug!("sample: skipped duplicate {phone} / {vehicle_number}");
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(inserted)
        })?;
        log::info!("sample: inserted {inserted} of {count} customers");
        Ok(inserted)
    }
}
