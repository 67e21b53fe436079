//! Patient measurements entered through the input form

use serde::{Deserialize, Serialize};

/// Bounds and presentation data for one form field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Form field name (also the canonical dataset column)
    pub name: &'static str,
    /// Label shown next to the input
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    /// Integer-valued fields are rounded after clamping
    pub integer: bool,
}

impl FieldSpec {
    /// Step attribute for the HTML number input
    pub fn step(&self) -> &'static str {
        if self.integer {
            "1"
        } else {
            "0.01"
        }
    }

    /// Clamp a value into the field bounds, rounding integer fields.
    ///
    /// Non-finite values fall back to the default.
    pub fn clamp(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.default;
        }
        let value = value.clamp(self.min, self.max);
        if self.integer {
            value.round()
        } else {
            value
        }
    }

    /// Parse raw form text; blank or unparseable input becomes the default
    pub fn parse(&self, raw: Option<&str>) -> f64 {
        raw.map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .map(|v| self.clamp(v))
            .unwrap_or(self.default)
    }
}

/// The eight model inputs, in the order the model expects them.
pub const FIELDS: [FieldSpec; 8] = [
    FieldSpec {
        name: "Pregnancies",
        label: "Jumlah Kehamilan",
        min: 0.0,
        max: 20.0,
        default: 1.0,
        integer: true,
    },
    FieldSpec {
        name: "Glucose",
        label: "Glukosa",
        min: 0.0,
        max: 200.0,
        default: 120.0,
        integer: true,
    },
    FieldSpec {
        name: "BloodPressure",
        label: "Tekanan Darah",
        min: 0.0,
        max: 140.0,
        default: 70.0,
        integer: true,
    },
    FieldSpec {
        name: "SkinThickness",
        label: "Tebal Lipatan Kulit",
        min: 0.0,
        max: 100.0,
        default: 20.0,
        integer: true,
    },
    FieldSpec {
        name: "Insulin",
        label: "Insulin",
        min: 0.0,
        max: 900.0,
        default: 80.0,
        integer: true,
    },
    FieldSpec {
        name: "BMI",
        label: "BMI",
        min: 0.0,
        max: 70.0,
        default: 25.0,
        integer: false,
    },
    FieldSpec {
        name: "DiabetesPedigreeFunction",
        label: "Diabetes Pedigree Function",
        min: 0.0,
        max: 3.0,
        default: 0.5,
        integer: false,
    },
    FieldSpec {
        name: "Age",
        label: "Usia",
        min: 1.0,
        max: 120.0,
        default: 30.0,
        integer: true,
    },
];

/// One patient's measurements
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub pregnancies: u32,
    pub glucose: u32,
    pub blood_pressure: u32,
    pub skin_thickness: u32,
    pub insulin: u32,
    pub bmi: f64,
    pub pedigree_function: f64,
    pub age: u32,
}

impl PatientRecord {
    /// Build a record from raw values in [`FIELDS`] order, clamping each one.
    pub fn from_values(values: [f64; 8]) -> Self {
        let v: Vec<f64> = FIELDS
            .iter()
            .zip(values)
            .map(|(spec, value)| spec.clamp(value))
            .collect();

        Self {
            pregnancies: v[0] as u32,
            glucose: v[1] as u32,
            blood_pressure: v[2] as u32,
            skin_thickness: v[3] as u32,
            insulin: v[4] as u32,
            bmi: v[5],
            pedigree_function: v[6],
            age: v[7] as u32,
        }
    }

    /// Values in [`FIELDS`] order
    pub fn values(&self) -> [f64; 8] {
        [
            self.pregnancies as f64,
            self.glucose as f64,
            self.blood_pressure as f64,
            self.skin_thickness as f64,
            self.insulin as f64,
            self.bmi,
            self.pedigree_function,
            self.age as f64,
        ]
    }
}

impl Default for PatientRecord {
    fn default() -> Self {
        Self::from_values(FIELDS.map(|spec| spec.default))
    }
}

/// Raw form submission; every field is optional text
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientForm {
    #[serde(rename = "Pregnancies")]
    pub pregnancies: Option<String>,
    #[serde(rename = "Glucose")]
    pub glucose: Option<String>,
    #[serde(rename = "BloodPressure")]
    pub blood_pressure: Option<String>,
    #[serde(rename = "SkinThickness")]
    pub skin_thickness: Option<String>,
    #[serde(rename = "Insulin")]
    pub insulin: Option<String>,
    #[serde(rename = "BMI")]
    pub bmi: Option<String>,
    #[serde(rename = "DiabetesPedigreeFunction")]
    pub pedigree_function: Option<String>,
    #[serde(rename = "Age")]
    pub age: Option<String>,
}

impl PatientForm {
    /// Turn the submission into a bounded record. Never fails.
    pub fn into_record(self) -> PatientRecord {
        let raw = [
            self.pregnancies,
            self.glucose,
            self.blood_pressure,
            self.skin_thickness,
            self.insulin,
            self.bmi,
            self.pedigree_function,
            self.age,
        ];

        let mut values = [0.0; 8];
        for (i, (spec, raw)) in FIELDS.iter().zip(raw.iter()).enumerate() {
            values[i] = spec.parse(raw.as_deref());
        }
        PatientRecord::from_values(values)
    }
}
