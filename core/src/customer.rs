//! Customer domain model.
//!
//! A customer is one (phone, vehicle) pair. Input fields come from imports
//! and manual edits; everything in `CustomerTags` is owned by the engine and
//! rebuilt from scratch on every pass.

use crate::{
    config::LifecycleRules,
    error::CrmError,
    inspection,
    types::CustomerId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// ── Enumerations ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerGrade {
    Vip,
    Regular,
    Associate,
    New,
    #[default]
    None,
}

impl CustomerGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vip       => "vip",
            Self::Regular   => "regular",
            Self::Associate => "associate",
            Self::New       => "new",
            Self::None      => "none",
        }
    }
}

impl FromStr for CustomerGrade {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vip"       => Ok(Self::Vip),
            "regular"   => Ok(Self::Regular),
            "associate" => Ok(Self::Associate),
            "new"       => Ok(Self::New),
            "none" | "" => Ok(Self::None),
            other => Err(CrmError::UnknownVariant { kind: "customer_grade", value: other.into() }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High   => "high",
            Self::Medium => "medium",
            Self::Low    => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high"   => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low"    => Ok(Self::Low),
            other => Err(CrmError::UnknownVariant { kind: "priority", value: other.into() }),
        }
    }
}

/// Churn classification. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    #[default]
    Active,
    FirstTimeLost,
    LongTermLost,
    PossiblyScrapped,
}

impl CustomerStatus {
    pub const ALL: [CustomerStatus; 4] = [
        Self::Active,
        Self::FirstTimeLost,
        Self::LongTermLost,
        Self::PossiblyScrapped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active           => "active",
            Self::FirstTimeLost    => "first_time_lost",
            Self::LongTermLost     => "long_term_lost",
            Self::PossiblyScrapped => "possibly_scrapped",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl FromStr for CustomerStatus {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active"            => Ok(Self::Active),
            "first_time_lost"   => Ok(Self::FirstTimeLost),
            "long_term_lost"    => Ok(Self::LongTermLost),
            "possibly_scrapped" => Ok(Self::PossiblyScrapped),
            other => Err(CrmError::UnknownVariant { kind: "customer_status", value: other.into() }),
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Happy-call outreach slot, counted from the last completed inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HappyCallWindow {
    #[serde(rename = "3month")]
    ThreeMonth,
    #[serde(rename = "6month")]
    SixMonth,
    #[serde(rename = "12month")]
    TwelveMonth,
    #[serde(rename = "18month")]
    EighteenMonth,
}

impl HappyCallWindow {
    pub const ALL: [HappyCallWindow; 4] = [
        Self::ThreeMonth,
        Self::SixMonth,
        Self::TwelveMonth,
        Self::EighteenMonth,
    ];

    pub fn months(&self) -> u32 {
        match self {
            Self::ThreeMonth    => 3,
            Self::SixMonth      => 6,
            Self::TwelveMonth   => 12,
            Self::EighteenMonth => 18,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThreeMonth    => "3month",
            Self::SixMonth      => "6month",
            Self::TwelveMonth   => "12month",
            Self::EighteenMonth => "18month",
        }
    }

    /// Column holding this window's flag in the customer table.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::ThreeMonth    => "needs_3month_call",
            Self::SixMonth      => "needs_6month_call",
            Self::TwelveMonth   => "needs_12month_call",
            Self::EighteenMonth => "needs_18month_call",
        }
    }
}

impl FromStr for HappyCallWindow {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "3month"  => Ok(Self::ThreeMonth),
            "6month"  => Ok(Self::SixMonth),
            "12month" => Ok(Self::TwelveMonth),
            "18month" => Ok(Self::EighteenMonth),
            other => Err(CrmError::UnknownVariant { kind: "happy_call_window", value: other.into() }),
        }
    }
}

/// Where the call center stands with this customer. Set by call outcomes,
/// never by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    Pending,
    Contacted,
    Interested,
    NotInterested,
    Callback,
    Converted,
    DoNotCall,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 7] = [
        Self::Pending,
        Self::Contacted,
        Self::Interested,
        Self::NotInterested,
        Self::Callback,
        Self::Converted,
        Self::DoNotCall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending       => "pending",
            Self::Contacted     => "contacted",
            Self::Interested    => "interested",
            Self::NotInterested => "not_interested",
            Self::Callback      => "callback",
            Self::Converted     => "converted",
            Self::DoNotCall     => "do_not_call",
        }
    }
}

impl FromStr for ContactStatus {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending"        => Ok(Self::Pending),
            "contacted"      => Ok(Self::Contacted),
            "interested"     => Ok(Self::Interested),
            "not_interested" => Ok(Self::NotInterested),
            "callback"       => Ok(Self::Callback),
            "converted"      => Ok(Self::Converted),
            "do_not_call"    => Ok(Self::DoNotCall),
            other => Err(CrmError::UnknownVariant { kind: "contact_status", value: other.into() }),
        }
    }
}

/// How a customer row entered the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    #[default]
    Import,
    Manual,
    Sample,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Manual => "manual",
            Self::Sample => "sample",
        }
    }
}

impl FromStr for DataSource {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "import" => Ok(Self::Import),
            "manual" => Ok(Self::Manual),
            "sample" => Ok(Self::Sample),
            other => Err(CrmError::UnknownVariant { kind: "data_source", value: other.into() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    Unknown,
    Overdue,
    DueSoon,
    Valid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    New,
    FirstTimeLost,
    Growing,
    Mature,
    Loyal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionRisk {
    Lost,
    AtRisk,
    Watch,
    Safe,
}

// ── Derived tags ─────────────────────────────────────────────────────────────

/// Engine-owned fields. Users never set these directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerTags {
    pub is_inspection_overdue:   bool,
    pub is_frequent_visitor:     bool,
    pub has_premium_vehicle:     bool,
    pub is_first_time_no_return: bool,
    pub is_long_term_absent:     bool,
    pub is_active_customer:      bool,
    pub happy_call:              Option<HappyCallWindow>,
    pub priority:                Priority,
    pub customer_status:         CustomerStatus,
}

impl Default for CustomerTags {
    fn default() -> Self {
        Self {
            is_inspection_overdue:   false,
            is_frequent_visitor:     false,
            has_premium_vehicle:     false,
            is_first_time_no_return: false,
            is_long_term_absent:     false,
            is_active_customer:      true,
            happy_call:              None,
            priority:                Priority::Medium,
            customer_status:         CustomerStatus::Active,
        }
    }
}

impl CustomerTags {
    pub fn needs_call(&self, window: HappyCallWindow) -> bool {
        self.happy_call == Some(window)
    }

    pub fn needs_3month_call(&self) -> bool  { self.needs_call(HappyCallWindow::ThreeMonth) }
    pub fn needs_6month_call(&self) -> bool  { self.needs_call(HappyCallWindow::SixMonth) }
    pub fn needs_12month_call(&self) -> bool { self.needs_call(HappyCallWindow::TwelveMonth) }
    pub fn needs_18month_call(&self) -> bool { self.needs_call(HappyCallWindow::EighteenMonth) }
}

// ── Customer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id:             Option<CustomerId>,
    pub name:           String,
    pub phone:          String,
    pub vehicle_number: String,
    pub vehicle_name:   String,
    pub vehicle_model:  String,
    pub address:        String,

    pub inspection_expiry_date:    Option<NaiveDate>,
    pub actual_inspection_date:    Option<NaiveDate>,
    pub data_extracted_date:       Option<NaiveDate>,
    pub last_inspection_completed: Option<NaiveDate>,
    pub insurance_expiry_date:     Option<NaiveDate>,

    pub customer_grade: CustomerGrade,
    /// Passed through as given; negative counts are not rejected.
    pub visit_count:    i64,

    pub contact_status: ContactStatus,
    pub is_do_not_call: bool,
    pub data_source:    DataSource,

    pub tags: CustomerTags,
}

impl Customer {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        vehicle_number: impl Into<String>,
    ) -> Self {
        Self {
            id:             None,
            name:           name.into(),
            phone:          phone.into(),
            vehicle_number: vehicle_number.into(),
            vehicle_name:   String::new(),
            vehicle_model:  String::new(),
            address:        String::new(),
            inspection_expiry_date:    None,
            actual_inspection_date:    None,
            data_extracted_date:       None,
            last_inspection_completed: None,
            insurance_expiry_date:     None,
            customer_grade: CustomerGrade::None,
            visit_count:    0,
            contact_status: ContactStatus::Pending,
            is_do_not_call: false,
            data_source:    DataSource::Import,
            tags:           CustomerTags::default(),
        }
    }

    pub fn with_inspection_expiry(mut self, date: NaiveDate) -> Self {
        self.inspection_expiry_date = Some(date);
        self
    }

    pub fn with_last_inspection_completed(mut self, date: NaiveDate) -> Self {
        self.last_inspection_completed = Some(date);
        self
    }

    pub fn with_visit_count(mut self, visits: i64) -> Self {
        self.visit_count = visits;
        self
    }

    pub fn with_grade(mut self, grade: CustomerGrade) -> Self {
        self.customer_grade = grade;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.tags.priority = priority;
        self
    }

    pub fn with_data_source(mut self, source: DataSource) -> Self {
        self.data_source = source;
        self
    }

    pub fn inspection_status(&self, reference: NaiveDate, rules: &LifecycleRules) -> InspectionStatus {
        inspection::inspection_status(self.inspection_expiry_date, reference, rules.due_soon_days)
    }

    pub fn is_inspection_due_soon(&self, reference: NaiveDate, rules: &LifecycleRules) -> bool {
        matches!(
            self.inspection_status(reference, rules),
            InspectionStatus::Overdue | InspectionStatus::DueSoon
        )
    }

    /// Negative visit counts fall through to `Growing`, like any count
    /// up to three.
    pub fn lifecycle_stage(&self) -> LifecycleStage {
        match self.visit_count {
            0 => LifecycleStage::New,
            1 if self.tags.is_first_time_no_return => LifecycleStage::FirstTimeLost,
            1 => LifecycleStage::New,
            i64::MIN..=3 => LifecycleStage::Growing,
            4..=10 => LifecycleStage::Mature,
            _ => LifecycleStage::Loyal,
        }
    }

    pub fn retention_risk(&self, reference: NaiveDate, rules: &LifecycleRules) -> RetentionRisk {
        if !self.tags.is_active_customer {
            RetentionRisk::Lost
        } else if self.tags.is_inspection_overdue {
            RetentionRisk::AtRisk
        } else if self.is_inspection_due_soon(reference, rules) {
            RetentionRisk::Watch
        } else {
            RetentionRisk::Safe
        }
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - {}", self.name, self.phone, self.vehicle_number)
    }
}
