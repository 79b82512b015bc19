use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::SchemaMismatchError;

// ---------- Column names (training-time schema, case-sensitive) ----------

pub const GENDER: &str = "Gender";
pub const AGE: &str = "Age";
pub const HEIGHT: &str = "Height";
pub const WEIGHT: &str = "Weight";
pub const FAMILY_HISTORY: &str = "family_history_with_overweight";
pub const FAVC: &str = "FAVC";
pub const FCVC: &str = "FCVC";
pub const NCP: &str = "NCP";
pub const CAEC: &str = "CAEC";
pub const SMOKE: &str = "SMOKE";
pub const CH2O: &str = "CH2O";
pub const SCC: &str = "SCC";
pub const FAF: &str = "FAF";
pub const TUE: &str = "TUE";
pub const CALC: &str = "CALC";
pub const MTRANS: &str = "MTRANS";

/// Authoritative column order of the single-row table handed to the pipeline.
pub const COLUMNS: [&str; 16] = [
    GENDER, AGE, HEIGHT, WEIGHT, FAMILY_HISTORY, FAVC, FCVC, NCP, CAEC, SMOKE, CH2O, SCC, FAF, TUE,
    CALC, MTRANS,
];

// ---------- Categorical levels ----------

macro_rules! categorical {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $level:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const LEVELS: &'static [&'static str] = &[$($level),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $level),+
                }
            }

            pub fn parse(field: &str, value: &str) -> Result<Self, SchemaMismatchError> {
                match value {
                    $($level => Ok(Self::$variant),)+
                    other => Err(SchemaMismatchError::UnknownCategory {
                        field: field.to_string(),
                        value: other.to_string(),
                        expected: Self::LEVELS.to_vec(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

categorical!(Gender {
    Male => "Male",
    Female => "Female",
});

categorical!(
    /// Answer to the yes/no questions (family history, FAVC, SMOKE, SCC).
    YesNo {
        Yes => "yes",
        No => "no",
    }
);

categorical!(
    /// Shared by CAEC (eating between meals) and CALC (alcohol).
    Frequency {
        No => "no",
        Sometimes => "Sometimes",
        Frequently => "Frequently",
        Always => "Always",
    }
);

categorical!(Transport {
    Bike => "Bike",
    Walking => "Walking",
    Motorbike => "Motorbike",
    Automobile => "Automobile",
    PublicTransportation => "Public_Transportation",
});

// ---------- Numeric domains ----------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericDomain {
    pub min: f64,
    pub max: f64,
    pub integer: bool,
}

impl NumericDomain {
    const fn float(min: f64, max: f64) -> Self {
        Self { min, max, integer: false }
    }

    const fn int(min: f64, max: f64) -> Self {
        Self { min, max, integer: true }
    }

    fn check(&self, field: &str, value: f64) -> Result<f64, SchemaMismatchError> {
        if self.integer && value.fract() != 0.0 {
            return Err(SchemaMismatchError::NotInteger {
                field: field.to_string(),
                value,
            });
        }
        if !(self.min..=self.max).contains(&value) {
            return Err(SchemaMismatchError::OutOfRange {
                field: field.to_string(),
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value)
    }
}

pub const AGE_DOMAIN: NumericDomain = NumericDomain::int(1.0, 100.0);
pub const HEIGHT_DOMAIN: NumericDomain = NumericDomain::float(1.0, 3.0);
pub const WEIGHT_DOMAIN: NumericDomain = NumericDomain::float(30.0, 200.0);
// FCVC/CH2O/FAF/TUE accept both the integer levels and the continuous range.
pub const FCVC_DOMAIN: NumericDomain = NumericDomain::float(1.0, 3.0);
pub const NCP_DOMAIN: NumericDomain = NumericDomain::int(1.0, 4.0);
pub const CH2O_DOMAIN: NumericDomain = NumericDomain::float(0.5, 3.0);
pub const FAF_DOMAIN: NumericDomain = NumericDomain::float(0.0, 100.0);
pub const TUE_DOMAIN: NumericDomain = NumericDomain::float(0.0, 24.0);

// ---------- Single-row table ----------

/// One cell of the table the pipeline consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Named columns in insertion order; a one-row DataFrame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Cell)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, cell: Cell) -> Self {
        self.set(column, cell);
        self
    }

    /// Insert or replace a column.
    fn set(&mut self, column: impl Into<String>, cell: Cell) {
        let column = column.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = cell,
            None => self.cells.push((column, cell)),
        }
    }

    #[cfg(test)]
    pub(crate) fn remove(&mut self, column: &str) -> Option<Cell> {
        let idx = self.cells.iter().position(|(name, _)| name == column)?;
        Some(self.cells.remove(idx).1)
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ---------- FeatureRecord ----------

/// The 16 attributes collected for one prediction.
///
/// Deserializing goes through [`TryFrom<Map<String, Value>>`], so every
/// categorical is matched exhaustively and numeric fields are range-checked
/// before a record exists. Serialization uses the training column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct FeatureRecord {
    #[serde(rename = "Gender")]
    pub gender: Gender,
    #[serde(rename = "Age")]
    pub age: u8,
    #[serde(rename = "Height")]
    pub height: f64,
    #[serde(rename = "Weight")]
    pub weight: f64,
    #[serde(rename = "family_history_with_overweight")]
    pub family_history_with_overweight: YesNo,
    #[serde(rename = "FAVC")]
    pub favc: YesNo,
    #[serde(rename = "FCVC")]
    pub fcvc: f64,
    #[serde(rename = "NCP")]
    pub ncp: u8,
    #[serde(rename = "CAEC")]
    pub caec: Frequency,
    #[serde(rename = "SMOKE")]
    pub smoke: YesNo,
    #[serde(rename = "CH2O")]
    pub ch2o: f64,
    #[serde(rename = "SCC")]
    pub scc: YesNo,
    #[serde(rename = "FAF")]
    pub faf: f64,
    #[serde(rename = "TUE")]
    pub tue: f64,
    #[serde(rename = "CALC")]
    pub calc: Frequency,
    #[serde(rename = "MTRANS")]
    pub mtrans: Transport,
}

impl FeatureRecord {
    /// The values the input form starts with.
    pub fn form_default() -> Self {
        Self {
            gender: Gender::Male,
            age: 25,
            height: 1.70,
            weight: 70.0,
            family_history_with_overweight: YesNo::Yes,
            favc: YesNo::Yes,
            fcvc: 2.0,
            ncp: 3,
            caec: Frequency::Sometimes,
            smoke: YesNo::No,
            ch2o: 2.0,
            scc: YesNo::No,
            faf: 2.0,
            tue: 2.0,
            calc: Frequency::Sometimes,
            mtrans: Transport::PublicTransportation,
        }
    }

    /// Range-check a record that was built directly rather than parsed.
    pub fn validate(&self) -> Result<(), SchemaMismatchError> {
        AGE_DOMAIN.check(AGE, f64::from(self.age))?;
        HEIGHT_DOMAIN.check(HEIGHT, self.height)?;
        WEIGHT_DOMAIN.check(WEIGHT, self.weight)?;
        FCVC_DOMAIN.check(FCVC, self.fcvc)?;
        NCP_DOMAIN.check(NCP, f64::from(self.ncp))?;
        CH2O_DOMAIN.check(CH2O, self.ch2o)?;
        FAF_DOMAIN.check(FAF, self.faf)?;
        TUE_DOMAIN.check(TUE, self.tue)?;
        Ok(())
    }

    /// Lay the record out as the single-row table the pipeline was fit on.
    pub fn to_row(&self) -> Row {
        Row::new()
            .with(GENDER, Cell::text(self.gender.as_str()))
            .with(AGE, Cell::Number(f64::from(self.age)))
            .with(HEIGHT, Cell::Number(self.height))
            .with(WEIGHT, Cell::Number(self.weight))
            .with(
                FAMILY_HISTORY,
                Cell::text(self.family_history_with_overweight.as_str()),
            )
            .with(FAVC, Cell::text(self.favc.as_str()))
            .with(FCVC, Cell::Number(self.fcvc))
            .with(NCP, Cell::Number(f64::from(self.ncp)))
            .with(CAEC, Cell::text(self.caec.as_str()))
            .with(SMOKE, Cell::text(self.smoke.as_str()))
            .with(CH2O, Cell::Number(self.ch2o))
            .with(SCC, Cell::text(self.scc.as_str()))
            .with(FAF, Cell::Number(self.faf))
            .with(TUE, Cell::Number(self.tue))
            .with(CALC, Cell::text(self.calc.as_str()))
            .with(MTRANS, Cell::text(self.mtrans.as_str()))
    }

    /// Field descriptors for rendering an input form.
    pub fn schema() -> Vec<FieldSpec> {
        let defaults = Self::form_default().to_row();
        let levels = |column: &'static str| -> FieldDomain {
            FieldDomain::Categorical {
                levels: match column {
                    GENDER => Gender::LEVELS,
                    CAEC | CALC => Frequency::LEVELS,
                    MTRANS => Transport::LEVELS,
                    _ => YesNo::LEVELS,
                },
            }
        };
        let numeric = |domain: NumericDomain| FieldDomain::Numeric(domain);

        COLUMNS
            .iter()
            .map(|&name| {
                let domain = match name {
                    AGE => numeric(AGE_DOMAIN),
                    HEIGHT => numeric(HEIGHT_DOMAIN),
                    WEIGHT => numeric(WEIGHT_DOMAIN),
                    FCVC => numeric(FCVC_DOMAIN),
                    NCP => numeric(NCP_DOMAIN),
                    CH2O => numeric(CH2O_DOMAIN),
                    FAF => numeric(FAF_DOMAIN),
                    TUE => numeric(TUE_DOMAIN),
                    other => levels(other),
                };
                FieldSpec {
                    name,
                    domain,
                    default: defaults.get(name).cloned(),
                }
            })
            .collect()
    }
}

impl TryFrom<Map<String, Value>> for FeatureRecord {
    type Error = SchemaMismatchError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_map(&map)
    }
}

impl FeatureRecord {
    /// Build a record from a JSON object keyed by training column names.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, SchemaMismatchError> {
        let record = Self {
            gender: category(map, GENDER, Gender::parse)?,
            age: number(map, AGE, AGE_DOMAIN)? as u8,
            height: number(map, HEIGHT, HEIGHT_DOMAIN)?,
            weight: number(map, WEIGHT, WEIGHT_DOMAIN)?,
            family_history_with_overweight: category(map, FAMILY_HISTORY, YesNo::parse)?,
            favc: category(map, FAVC, YesNo::parse)?,
            fcvc: number(map, FCVC, FCVC_DOMAIN)?,
            ncp: number(map, NCP, NCP_DOMAIN)? as u8,
            caec: category(map, CAEC, Frequency::parse)?,
            smoke: category(map, SMOKE, YesNo::parse)?,
            ch2o: number(map, CH2O, CH2O_DOMAIN)?,
            scc: category(map, SCC, YesNo::parse)?,
            faf: number(map, FAF, FAF_DOMAIN)?,
            tue: number(map, TUE, TUE_DOMAIN)?,
            calc: category(map, CALC, Frequency::parse)?,
            mtrans: category(map, MTRANS, Transport::parse)?,
        };

        if let Some(extra) = map.keys().find(|k| !COLUMNS.contains(&k.as_str())) {
            return Err(SchemaMismatchError::UnexpectedField {
                field: extra.clone(),
            });
        }
        Ok(record)
    }
}

fn field<'a>(map: &'a Map<String, Value>, name: &str) -> Result<&'a Value, SchemaMismatchError> {
    map.get(name).ok_or_else(|| SchemaMismatchError::MissingField {
        field: name.to_string(),
    })
}

fn category<T>(
    map: &Map<String, Value>,
    name: &str,
    parse: fn(&str, &str) -> Result<T, SchemaMismatchError>,
) -> Result<T, SchemaMismatchError> {
    let s = field(map, name)?
        .as_str()
        .ok_or_else(|| SchemaMismatchError::WrongType {
            field: name.to_string(),
            expected: "string",
        })?;
    parse(name, s)
}

fn number(
    map: &Map<String, Value>,
    name: &str,
    domain: NumericDomain,
) -> Result<f64, SchemaMismatchError> {
    let n = field(map, name)?
        .as_f64()
        .ok_or_else(|| SchemaMismatchError::WrongType {
            field: name.to_string(),
            expected: "number",
        })?;
    domain.check(name, n)
}

// ---------- Form schema ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldDomain {
    Categorical { levels: &'static [&'static str] },
    Numeric(NumericDomain),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    #[serde(flatten)]
    pub domain: FieldDomain,
    pub default: Option<Cell>,
}

// ---------- Prediction output ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbability {
    pub label: String,
    /// Probability as a percentage rounded to 2 decimals.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: String,
    /// Every known class, most likely first.
    pub probabilities: Vec<ClassProbability>,
}

impl PredictionResult {
    pub fn top(&self) -> Option<&ClassProbability> {
        self.probabilities.first()
    }

    pub fn total_percent(&self) -> f64 {
        self.probabilities.iter().map(|p| p.percent).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn default_json() -> Value {
        serde_json::to_value(FeatureRecord::form_default()).unwrap()
    }

    fn with(key: &str, value: Value) -> Value {
        let mut v = default_json();
        v[key] = value;
        v
    }

    fn parse(v: Value) -> Result<FeatureRecord, SchemaMismatchError> {
        match v {
            Value::Object(map) => FeatureRecord::from_map(&map),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn serialized_record_uses_training_column_names() {
        let v = default_json();
        let keys: Vec<&str> = v.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        for col in COLUMNS {
            assert!(keys.contains(&col), "missing {col}");
        }
        assert_eq!(v[MTRANS], json!("Public_Transportation"));
        assert_eq!(v[FAMILY_HISTORY], json!("yes"));
    }

    #[test]
    fn default_record_parses_back() {
        let rec = parse(default_json()).unwrap();
        assert_eq!(rec, FeatureRecord::form_default());
    }

    #[test]
    fn deserialize_goes_through_validation() {
        let bad = with(CAEC, json!("Unknown"));
        let err = serde_json::from_value::<FeatureRecord>(bad).unwrap_err();
        assert!(err.to_string().contains("CAEC"));
    }

    #[test]
    fn unknown_category_is_typed() {
        let err = parse(with(CAEC, json!("Unknown"))).unwrap_err();
        match err {
            SchemaMismatchError::UnknownCategory { field, value, expected } => {
                assert_eq!(field, CAEC);
                assert_eq!(value, "Unknown");
                assert_eq!(expected, Frequency::LEVELS.to_vec());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn category_levels_are_case_sensitive() {
        let err = parse(with(SMOKE, json!("Yes"))).unwrap_err();
        assert!(matches!(err, SchemaMismatchError::UnknownCategory { .. }));
    }

    #[test]
    fn missing_field() {
        let mut v = default_json();
        v.as_object_mut().unwrap().remove(TUE);
        assert_eq!(
            parse(v).unwrap_err(),
            SchemaMismatchError::MissingField { field: TUE.into() }
        );
    }

    #[test]
    fn unexpected_field() {
        let v = with("FamilyHistory", json!("yes"));
        assert_eq!(
            parse(v).unwrap_err(),
            SchemaMismatchError::UnexpectedField {
                field: "FamilyHistory".into()
            }
        );
    }

    #[test]
    fn wrong_json_types() {
        assert!(matches!(
            parse(with(AGE, json!("25"))).unwrap_err(),
            SchemaMismatchError::WrongType { expected: "number", .. }
        ));
        assert!(matches!(
            parse(with(GENDER, json!(1))).unwrap_err(),
            SchemaMismatchError::WrongType { expected: "string", .. }
        ));
    }

    #[test]
    fn numeric_bounds_are_inclusive() {
        for (col, lo, hi) in [
            (AGE, 1.0, 100.0),
            (HEIGHT, 1.0, 3.0),
            (WEIGHT, 30.0, 200.0),
            (FCVC, 1.0, 3.0),
            (NCP, 1.0, 4.0),
            (CH2O, 0.5, 3.0),
            (FAF, 0.0, 100.0),
            (TUE, 0.0, 24.0),
        ] {
            assert!(parse(with(col, json!(lo))).is_ok(), "{col}={lo}");
            assert!(parse(with(col, json!(hi))).is_ok(), "{col}={hi}");
            assert!(matches!(
                parse(with(col, json!(hi + 1.0))).unwrap_err(),
                SchemaMismatchError::OutOfRange { .. }
            ));
        }
    }

    #[test]
    fn age_and_ncp_must_be_whole() {
        assert!(matches!(
            parse(with(AGE, json!(25.5))).unwrap_err(),
            SchemaMismatchError::NotInteger { .. }
        ));
        assert!(matches!(
            parse(with(NCP, json!(2.5))).unwrap_err(),
            SchemaMismatchError::NotInteger { .. }
        ));
        // integral floats are fine
        assert_eq!(parse(with(AGE, json!(40.0))).unwrap().age, 40);
    }

    #[test]
    fn fcvc_faf_tue_accept_levels_and_continuous() {
        let rec = parse(with(FCVC, json!(3))).unwrap();
        assert_eq!(rec.fcvc, 3.0);
        let rec = parse(with(FCVC, json!(2.37))).unwrap();
        assert_eq!(rec.fcvc, 2.37);
        let rec = parse(with(FAF, json!(12.5))).unwrap();
        assert_eq!(rec.faf, 12.5);
        let rec = parse(with(TUE, json!(1))).unwrap();
        assert_eq!(rec.tue, 1.0);
    }

    #[test]
    fn validate_catches_direct_construction() {
        let mut rec = FeatureRecord::form_default();
        assert!(rec.validate().is_ok());
        rec.weight = 250.0;
        assert!(matches!(
            rec.validate().unwrap_err(),
            SchemaMismatchError::OutOfRange { .. }
        ));
    }

    #[test]
    fn row_follows_column_order() {
        let row = FeatureRecord::form_default().to_row();
        let cols: Vec<&str> = row.columns().collect();
        assert_eq!(cols, COLUMNS.to_vec());
        assert_eq!(row.get(CAEC), Some(&Cell::text("Sometimes")));
        assert_eq!(row.get(AGE), Some(&Cell::Number(25.0)));
    }

    #[test]
    fn row_set_replaces_in_place() {
        let mut row = Row::new().with("a", Cell::Number(1.0)).with("b", Cell::Number(2.0));
        row.set("a", Cell::text("x"));
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("a"), Some(&Cell::text("x")));
        assert_eq!(row.remove("b"), Some(Cell::Number(2.0)));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn schema_covers_every_column() {
        let schema = FeatureRecord::schema();
        assert_eq!(schema.len(), 16);
        let caec = schema.iter().find(|f| f.name == CAEC).unwrap();
        assert_eq!(
            caec.domain,
            FieldDomain::Categorical {
                levels: Frequency::LEVELS
            }
        );
        let age = serde_json::to_value(schema.iter().find(|f| f.name == AGE).unwrap()).unwrap();
        assert_eq!(age["kind"], json!("numeric"));
        assert_eq!(age["integer"], json!(true));
        assert_eq!(age["default"], json!(25.0));
    }
}
