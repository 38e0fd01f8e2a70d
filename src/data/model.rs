use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;

use crate::config::Thresholds;
use crate::error::DashboardError;

// ---------------------------------------------------------------------------
// Fixed catalogs
// ---------------------------------------------------------------------------

pub const PRIMARY_VOLTAGES_KV: [f64; 6] = [13.8, 23.0, 34.5, 69.0, 138.0, 230.0];
pub const SECONDARY_VOLTAGES_KV: [f64; 6] = [0.38, 0.48, 4.16, 13.8, 23.0, 34.5];
pub const RATED_POWERS_MVA: [f64; 8] = [0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 25.0, 50.0];

/// A closed set of labelled values (model, test type, status).
pub trait Category: Copy + Ord + fmt::Display + 'static {
    const ALL: &'static [Self];

    fn label(&self) -> &'static str;

    /// Older spreadsheets spell some values differently.
    fn legacy_labels(&self) -> &'static [&'static str] {
        &[]
    }

    fn from_label(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL.iter().copied().find(|c| {
            c.label().eq_ignore_ascii_case(text)
                || c.legacy_labels().iter().any(|l| l.eq_ignore_ascii_case(text))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransformerModel {
    Tsea1000,
    Tsea2500,
    Tsea5000,
    TseaSpecial,
    Tsea7500,
    Tsea10000,
}

impl Category for TransformerModel {
    const ALL: &'static [Self] = &[
        TransformerModel::Tsea1000,
        TransformerModel::Tsea2500,
        TransformerModel::Tsea5000,
        TransformerModel::TseaSpecial,
        TransformerModel::Tsea7500,
        TransformerModel::Tsea10000,
    ];

    fn label(&self) -> &'static str {
        match self {
            TransformerModel::Tsea1000 => "TSEA-1000",
            TransformerModel::Tsea2500 => "TSEA-2500",
            TransformerModel::Tsea5000 => "TSEA-5000",
            TransformerModel::TseaSpecial => "TSEA-SPECIAL",
            TransformerModel::Tsea7500 => "TSEA-7500",
            TransformerModel::Tsea10000 => "TSEA-10000",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TestType {
    Routine,
    Type,
    Special,
    Acceptance,
    Commissioning,
}

impl Category for TestType {
    const ALL: &'static [Self] = &[
        TestType::Routine,
        TestType::Type,
        TestType::Special,
        TestType::Acceptance,
        TestType::Commissioning,
    ];

    fn label(&self) -> &'static str {
        match self {
            TestType::Routine => "Routine Test",
            TestType::Type => "Type Test",
            TestType::Special => "Special Test",
            TestType::Acceptance => "Acceptance Test",
            TestType::Commissioning => "Commissioning Test",
        }
    }

    fn legacy_labels(&self) -> &'static [&'static str] {
        match self {
            TestType::Routine => &["Ensaio de Rotina", "Routine"],
            TestType::Type => &["Ensaio de Tipo", "Type"],
            TestType::Special => &["Ensaio Especial", "Special"],
            TestType::Acceptance => &["Ensaio de Aceitação", "Acceptance"],
            TestType::Commissioning => &["Ensaio de Comissionamento", "Commissioning"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApprovalStatus {
    Approved,
    Rejected,
}

impl Category for ApprovalStatus {
    const ALL: &'static [Self] = &[ApprovalStatus::Approved, ApprovalStatus::Rejected];

    fn label(&self) -> &'static str {
        match self {
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        }
    }

    fn legacy_labels(&self) -> &'static [&'static str] {
        match self {
            ApprovalStatus::Approved => &["Aprovado"],
            ApprovalStatus::Rejected => &["Reprovado"],
        }
    }
}

macro_rules! display_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        })*
    };
}

display_label!(TransformerModel, TestType, ApprovalStatus);

// ---------------------------------------------------------------------------
// PowerRating – orderable rated-power value
// ---------------------------------------------------------------------------

/// Rated power in MVA. Wrapped so it can live in a `BTreeSet`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerRating(pub f64);

impl Eq for PowerRating {}

impl PartialOrd for PowerRating {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PowerRating {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for PowerRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MVA", self.0)
    }
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Every column a test table may carry, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Id,
    Model,
    TestDate,
    TestType,
    Efficiency,
    TemperatureRise,
    TotalLosses,
    Status,
    PrimaryVoltage,
    SecondaryVoltage,
    RatedPower,
    ExcitationCurrent,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::Id,
        Column::Model,
        Column::TestDate,
        Column::TestType,
        Column::Efficiency,
        Column::TemperatureRise,
        Column::TotalLosses,
        Column::Status,
        Column::PrimaryVoltage,
        Column::SecondaryVoltage,
        Column::RatedPower,
        Column::ExcitationCurrent,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Column::Id => "transformer_id",
            Column::Model => "model",
            Column::TestDate => "test_date",
            Column::TestType => "test_type",
            Column::Efficiency => "efficiency_pct",
            Column::TemperatureRise => "temperature_rise_c",
            Column::TotalLosses => "total_losses_kw",
            Column::Status => "approval_status",
            Column::PrimaryVoltage => "primary_voltage_kv",
            Column::SecondaryVoltage => "secondary_voltage_kv",
            Column::RatedPower => "rated_power_mva",
            Column::ExcitationCurrent => "excitation_current_a",
        }
    }

    /// Header used by the first generation of exported spreadsheets.
    pub fn legacy_name(&self) -> &'static str {
        match self {
            Column::Id => "ID_Transformador",
            Column::Model => "Modelo",
            Column::TestDate => "Data_Teste",
            Column::TestType => "Tipo_Ensaio",
            Column::Efficiency => "Eficiencia_Percentual",
            Column::TemperatureRise => "Elevacao_Temperatura_C",
            Column::TotalLosses => "Perdas_Totais_kW",
            Column::Status => "Status_Aprovacao",
            Column::PrimaryVoltage => "Tensao_Primaria_kV",
            Column::SecondaryVoltage => "Tensao_Secundaria_kV",
            Column::RatedPower => "Potencia_Nominal_MVA",
            Column::ExcitationCurrent => "Corrente_Excitacao_A",
        }
    }

    /// Human-readable header for tables and charts.
    pub fn title(&self) -> &'static str {
        match self {
            Column::Id => "ID",
            Column::Model => "Model",
            Column::TestDate => "Test date",
            Column::TestType => "Test type",
            Column::Efficiency => "Efficiency (%)",
            Column::TemperatureRise => "Temp. rise (°C)",
            Column::TotalLosses => "Losses (kW)",
            Column::Status => "Status",
            Column::PrimaryVoltage => "Primary (kV)",
            Column::SecondaryVoltage => "Secondary (kV)",
            Column::RatedPower => "Rated power (MVA)",
            Column::ExcitationCurrent => "Excitation (A)",
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(
            self,
            Column::PrimaryVoltage
                | Column::SecondaryVoltage
                | Column::RatedPower
                | Column::ExcitationCurrent
        )
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(
            self,
            Column::Id | Column::Model | Column::TestDate | Column::TestType | Column::Status
        )
    }

    pub fn matches_header(&self, header: &str) -> bool {
        let header = header.trim();
        header.eq_ignore_ascii_case(self.name()) || header.eq_ignore_ascii_case(self.legacy_name())
    }
}

// ---------------------------------------------------------------------------
// TestRecord – one row of the table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    pub id: String,
    pub model: TransformerModel,
    pub test_date: NaiveDate,
    pub test_type: TestType,
    pub efficiency_pct: f64,
    pub temperature_rise_c: f64,
    pub total_losses_kw: f64,
    pub status: ApprovalStatus,
    pub primary_voltage_kv: Option<f64>,
    pub secondary_voltage_kv: Option<f64>,
    pub rated_power_mva: Option<f64>,
    pub excitation_current_a: Option<f64>,
}

impl TestRecord {
    pub fn efficiency_out_of_spec(&self, t: &Thresholds) -> bool {
        self.efficiency_pct < t.efficiency_min
    }

    pub fn temperature_out_of_spec(&self, t: &Thresholds) -> bool {
        self.temperature_rise_c > t.temperature_max
    }

    pub fn losses_out_of_spec(&self, t: &Thresholds) -> bool {
        self.total_losses_kw > t.losses_max
    }

    pub fn rated_power(&self) -> Option<PowerRating> {
        self.rated_power_mva.map(PowerRating)
    }

    /// Value of an optional column for this row.
    pub fn optional_value(&self, column: Column) -> Option<f64> {
        match column {
            Column::PrimaryVoltage => self.primary_voltage_kv,
            Column::SecondaryVoltage => self.secondary_voltage_kv,
            Column::RatedPower => self.rated_power_mva,
            Column::ExcitationCurrent => self.excitation_current_a,
            _ => None,
        }
    }
}

/// The authoritative approval status: any threshold violation rejects the
/// record, otherwise the recorded status stands.
pub fn derive_status(record: &TestRecord, thresholds: &Thresholds) -> ApprovalStatus {
    if record.efficiency_out_of_spec(thresholds)
        || record.temperature_out_of_spec(thresholds)
        || record.losses_out_of_spec(thresholds)
    {
        ApprovalStatus::Rejected
    } else {
        record.status
    }
}

// ---------------------------------------------------------------------------
// TableSchema – which optional columns a table carries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub primary_voltage: bool,
    pub secondary_voltage: bool,
    pub rated_power: bool,
    pub excitation_current: bool,
}

impl TableSchema {
    pub fn full() -> Self {
        Self {
            primary_voltage: true,
            secondary_voltage: true,
            rated_power: true,
            excitation_current: true,
        }
    }

    /// An optional column counts as present only if every row has a value.
    pub fn infer(records: &[TestRecord]) -> Self {
        let present = |column: Column| {
            !records.is_empty() && records.iter().all(|r| r.optional_value(column).is_some())
        };
        Self {
            primary_voltage: present(Column::PrimaryVoltage),
            secondary_voltage: present(Column::SecondaryVoltage),
            rated_power: present(Column::RatedPower),
            excitation_current: present(Column::ExcitationCurrent),
        }
    }

    pub fn has(&self, column: Column) -> bool {
        match column {
            Column::PrimaryVoltage => self.primary_voltage,
            Column::SecondaryVoltage => self.secondary_voltage,
            Column::RatedPower => self.rated_power,
            Column::ExcitationCurrent => self.excitation_current,
            _ => true,
        }
    }

    /// Columns present in a table with this schema, in export order.
    pub fn columns(&self) -> Vec<Column> {
        Column::ALL.into_iter().filter(|c| self.has(*c)).collect()
    }
}

// ---------------------------------------------------------------------------
// RecordTable – the complete in-memory table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    records: Vec<TestRecord>,
    schema: TableSchema,
}

impl RecordTable {
    /// Build a table and infer its schema. Ids must be unique.
    pub fn from_records(records: Vec<TestRecord>) -> Result<Self, DashboardError> {
        let schema = TableSchema::infer(&records);
        Self::with_schema(records, schema)
    }

    pub fn with_schema(records: Vec<TestRecord>, schema: TableSchema) -> Result<Self, DashboardError> {
        let mut seen = BTreeSet::new();
        for r in &records {
            if !seen.insert(r.id.as_str()) {
                return Err(DashboardError::DuplicateId(r.id.clone()));
            }
        }
        Ok(Self { records, schema })
    }

    /// Rows picked by index from this table, keeping the schema. Callers
    /// pass indices of existing rows, so uniqueness already holds.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            schema: self.schema,
        }
    }

    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    pub fn schema(&self) -> TableSchema {
        self.schema
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TestRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().map(|r| r.test_date).min()?;
        let last = self.records.iter().map(|r| r.test_date).max()?;
        Some((first, last))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn record(id: &str, efficiency: f64, temperature: f64, losses: f64) -> TestRecord {
        TestRecord {
            id: id.to_string(),
            model: TransformerModel::Tsea1000,
            test_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            test_type: TestType::Routine,
            efficiency_pct: efficiency,
            temperature_rise_c: temperature,
            total_losses_kw: losses,
            status: ApprovalStatus::Approved,
            primary_voltage_kv: Some(13.8),
            secondary_voltage_kv: Some(0.38),
            rated_power_mva: Some(5.0),
            excitation_current_a: Some(1.25),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::record;
    use super::*;

    #[test]
    fn categories_parse_current_and_legacy_labels() {
        assert_eq!(
            TransformerModel::from_label("tsea-special"),
            Some(TransformerModel::TseaSpecial)
        );
        assert_eq!(ApprovalStatus::from_label("Reprovado"), Some(ApprovalStatus::Rejected));
        assert_eq!(TestType::from_label(" Ensaio de Tipo "), Some(TestType::Type));
        assert_eq!(TestType::from_label("Commissioning Test"), Some(TestType::Commissioning));
        assert_eq!(TransformerModel::from_label("TSEA-9999"), None);
    }

    #[test]
    fn derive_status_rejects_any_threshold_violation() {
        let t = Thresholds::default();
        assert_eq!(derive_status(&record("a", 99.0, 55.0, 10.0), &t), ApprovalStatus::Approved);
        assert_eq!(derive_status(&record("b", 97.0, 55.0, 10.0), &t), ApprovalStatus::Rejected);
        assert_eq!(derive_status(&record("c", 99.0, 66.0, 10.0), &t), ApprovalStatus::Rejected);
        assert_eq!(derive_status(&record("d", 99.0, 55.0, 31.0), &t), ApprovalStatus::Rejected);
    }

    #[test]
    fn derive_status_keeps_a_recorded_rejection() {
        let mut r = record("a", 99.0, 55.0, 10.0);
        r.status = ApprovalStatus::Rejected;
        assert_eq!(derive_status(&r, &Thresholds::default()), ApprovalStatus::Rejected);
    }

    #[test]
    fn schema_requires_values_on_every_row() {
        let mut partial = record("b", 99.0, 55.0, 10.0);
        partial.rated_power_mva = None;
        let table = RecordTable::from_records(vec![record("a", 99.0, 55.0, 10.0), partial]).unwrap();
        assert!(!table.schema().rated_power);
        assert!(table.schema().excitation_current);
        assert!(!table.schema().columns().contains(&Column::RatedPower));
    }

    #[test]
    fn duplicate_ids_are_refused() {
        let err = RecordTable::from_records(vec![
            record("TR-1", 99.0, 55.0, 10.0),
            record("TR-1", 99.1, 54.0, 11.0),
        ])
        .unwrap_err();
        assert!(matches!(err, DashboardError::DuplicateId(id) if id == "TR-1"));
    }

    #[test]
    fn power_ratings_order_numerically() {
        let set: BTreeSet<PowerRating> = [PowerRating(25.0), PowerRating(0.5), PowerRating(10.0)]
            .into_iter()
            .collect();
        let ordered: Vec<f64> = set.iter().map(|p| p.0).collect();
        assert_eq!(ordered, vec![0.5, 10.0, 25.0]);
    }
}
