use std::fmt;
use std::str::FromStr;

use crate::error::TriageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Allowed codes for categorical fields, compared numerically.
    pub codes: Option<&'static [&'static str]>,
    /// Initial raw value of the form field.
    pub default: &'static str,
}

const fn int(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Integer,
        codes: None,
        default: "",
    }
}

const fn float(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Float,
        codes: None,
        default: "",
    }
}

const fn coded(name: &'static str, codes: &'static [&'static str], default: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Integer,
        codes: Some(codes),
        default,
    }
}

const BINARY: &[&str] = &["0", "1"];
const ZERO_TO_FIVE: &[&str] = &["0", "1", "2", "3", "4", "5"];

const CARDIAC: &[FieldSpec] = &[
    int("age"),
    coded("sex", BINARY, "1"),
    coded("chest_pain_type", &["0", "1", "2", "3"], "0"),
    int("resting_bp"),
    int("cholesterol"),
    coded("fasting_blood_sugar", BINARY, "0"),
    coded("resting_ecg", &["0", "1", "2"], "0"),
    int("max_heart_rate"),
    coded("exercise_angina", BINARY, "0"),
    float("st_depression"),
    coded("st_slope", &["0", "1", "2"], "1"),
    coded("major_vessels", &["0", "1", "2", "3"], "0"),
    coded("thalassemia", &["1", "2", "3"], "2"),
];

const HEPATIC: &[FieldSpec] = &[
    int("Age"),
    coded("Gender", BINARY, "1"),
    float("Total_Bilirubin"),
    float("Direct_Bilirubin"),
    int("Alkaline_Phosphotase"),
    int("Alamine_Aminotransferase"),
    int("Aspartate_Aminotransferase"),
    float("Total_Protiens"),
    float("Albumin"),
    float("Albumin_Globulin_Ratio"),
];

const RENAL: &[FieldSpec] = &[
    int("Age"),
    int("Blood_Pressure"),
    FieldSpec {
        name: "Specific_Gravity",
        kind: FieldKind::Float,
        codes: Some(&["1.005", "1.010", "1.015", "1.020", "1.025"]),
        default: "",
    },
    coded("Albumin", ZERO_TO_FIVE, "0"),
    coded("Sugar", ZERO_TO_FIVE, "0"),
    coded("Red_Blood_Cells", BINARY, "0"),
    coded("Pus_Cells", BINARY, "0"),
    coded("Pus_Cell_Clumps", BINARY, "0"),
    coded("Bacteria", BINARY, "0"),
    int("Blood_Glucose_Random"),
    int("Blood_Urea"),
    float("Serum_Creatinine"),
    int("Sodium"),
    float("Potassium"),
    float("Hemoglobin"),
    int("Packed_Cell_Volume"),
    int("White_Blood_Cell_Count"),
    float("Red_Blood_Cell_Count"),
    coded("Hypertension", BINARY, "0"),
    coded("Diabetes_Mellitus", BINARY, "0"),
    coded("Coronary_Artery_Disease", BINARY, "0"),
    coded("Appetite", BINARY, "0"),
    coded("Pedal_Edema", BINARY, "0"),
    coded("Anemia", BINARY, "0"),
];

const DIABETIC: &[FieldSpec] = &[
    int("Pregnancies"),
    int("Glucose"),
    int("BloodPressure"),
    int("SkinThickness"),
    int("Insulin"),
    float("BMI"),
    float("DiabetesPedigreeFunction"),
    int("Age"),
];

const VITALS: &[FieldSpec] = &[
    float("Body_Temperature"),
    int("Pulse_Rate"),
    int("Respiration_Rate"),
    int("Systolic_BP"),
    int("Diastolic_BP"),
    float("Oxygen_Saturation"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Cardiac,
    Hepatic,
    Renal,
    Diabetic,
    Vitals,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Cardiac,
        Domain::Hepatic,
        Domain::Renal,
        Domain::Diabetic,
        Domain::Vitals,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Domain::Cardiac => "heart",
            Domain::Hepatic => "liver",
            Domain::Renal => "kidney",
            Domain::Diabetic => "diabetes",
            Domain::Vitals => "vitals",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Domain::Cardiac => "Heart Disease",
            Domain::Hepatic => "Liver Disease",
            Domain::Renal => "Kidney Disease",
            Domain::Diabetic => "Diabetes",
            Domain::Vitals => "General Vitals",
        }
    }

    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Domain::Cardiac => CARDIAC,
            Domain::Hepatic => HEPATIC,
            Domain::Renal => RENAL,
            Domain::Diabetic => DIABETIC,
            Domain::Vitals => VITALS,
        }
    }

    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|spec| spec.name == name)
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            Domain::Cardiac => "/api/v1/ml/predict/heart-disease",
            Domain::Hepatic => "/api/v1/ml/predict/liver-disease",
            Domain::Renal => "/api/v1/ml/predict/kidney-disease",
            Domain::Diabetic => "/api/v1/ml/predict/diabetes",
            Domain::Vitals => "/api/v1/ml/predict/vitals",
        }
    }

    /// The cardiac model is patient-agnostic; every other payload references a patient.
    pub fn requires_patient(self) -> bool {
        !matches!(self, Domain::Cardiac)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Domain {
    type Err = TriageError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "heart" | "cardiac" => Ok(Domain::Cardiac),
            "liver" | "hepatic" => Ok(Domain::Hepatic),
            "kidney" | "renal" => Ok(Domain::Renal),
            "diabetes" | "diabetic" => Ok(Domain::Diabetic),
            "vitals" => Ok(Domain::Vitals),
            other => Err(TriageError::InvalidInput(format!("unknown domain {other:?}"))),
        }
    }
}
